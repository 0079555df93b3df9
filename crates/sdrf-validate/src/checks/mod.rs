//! Compliance check modules.

mod format;
mod required;

use sdrf_model::MetadataColumn;

use crate::CompliancePolicy;
use crate::issue::Issue;
use crate::util::CaseInsensitiveSet;

/// Run all checks; missing-column issues come first, then per-column issues
/// in column order.
pub fn run_all(columns: &[MetadataColumn], policy: &CompliancePolicy) -> Vec<Issue> {
    let lookup = CaseInsensitiveSet::from_names(columns.iter().map(|column| column.name.as_str()));
    let mut issues = required::check(policy, &lookup);
    issues.extend(format::check(columns));
    issues
}
