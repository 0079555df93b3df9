//! Required column presence.

use crate::CompliancePolicy;
use crate::issue::Issue;
use crate::util::CaseInsensitiveSet;

pub fn check(policy: &CompliancePolicy, columns: &CaseInsensitiveSet) -> Vec<Issue> {
    policy
        .required_columns
        .iter()
        .filter(|required| !columns.contains(required.as_str()))
        .map(|required| Issue::RequiredMissing {
            column: required.clone(),
        })
        .collect()
}
