//! Text normalization shared by the ontology index and the matcher.

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
///
/// Both index keys and extracted terms go through this function, so an exact
/// match means equality after normalization.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(
            ['_', '-', '.', '/', '\\', ',', ';', ':', '(', ')', '[', ']'],
            " ",
        )
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_case_and_separators() {
        assert_eq!(normalize_text("  Mus   musculus "), "mus musculus");
        assert_eq!(normalize_text("HEK-293_T"), "hek 293 t");
        assert_eq!(normalize_text("Lys-C (endoproteinase)"), "lys c endoproteinase");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(normalize_text(" \t\n"), "");
    }
}
