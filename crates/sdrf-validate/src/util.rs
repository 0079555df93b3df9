//! Utility types for validation.

use std::collections::HashMap;

/// A set that performs case-insensitive lookups but preserves original names.
///
/// Keys are the repeat-suffix-free base names, so `comment[label].1` and
/// `Comment[Label]` both satisfy a lookup for `comment[label]`.
#[derive(Debug, Clone, Default)]
pub struct CaseInsensitiveSet {
    /// Maps lowercase base name -> first original name
    inner: HashMap<String, String>,
}

impl CaseInsensitiveSet {
    pub fn from_names<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for name in iter {
            set.insert(name);
        }
        set
    }

    pub fn insert(&mut self, value: impl AsRef<str>) {
        let original = value.as_ref().trim();
        self.inner
            .entry(key(original))
            .or_insert_with(|| original.to_string());
    }

    pub fn contains(&self, value: impl AsRef<str>) -> bool {
        self.inner.contains_key(&key(value.as_ref()))
    }

    /// Get the original column name (case-insensitive lookup).
    pub fn get(&self, value: impl AsRef<str>) -> Option<&str> {
        self.inner.get(&key(value.as_ref())).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn key(name: &str) -> String {
    sdrf_model::base_column_name(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case_and_repeat_suffix() {
        let set = CaseInsensitiveSet::from_names(["Comment[Label].1", "source name"]);
        assert!(set.contains("comment[label]"));
        assert_eq!(set.get("COMMENT[LABEL]"), Some("Comment[Label].1"));
        assert!(!set.contains("comment[instrument]"));
        assert_eq!(set.len(), 2);
    }
}
