//! Sort keys for display names.

/// Leading articles ignored when sorting.
const ARTICLES: [&str; 3] = ["a ", "an ", "the "];

/// Generate a locale-naive sort key from a display name.
///
/// Lowercases the name, drops everything that is not an ASCII letter, digit or space,
/// and then strips a single leading article.
///
/// ```rust
/// use mv_organizer::sort_key;
///
/// assert_eq!(sort_key("The Great Escape"), "great escape");
/// assert_eq!(sort_key("A-Team!"), "ateam");
/// ```
#[must_use]
pub fn sort_key(name: &str) -> String {
    let filtered: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();

    ARTICLES
        .iter()
        .find_map(|article| filtered.strip_prefix(article))
        .map_or_else(|| filtered.clone(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_article() {
        assert_eq!(sort_key("The Great Escape"), "great escape");
        assert_eq!(sort_key("An Officer"), "officer");
        assert_eq!(sort_key("A Bug's Life"), "bugs life");
    }

    #[test]
    fn removes_punctuation_before_article_check() {
        assert_eq!(sort_key("A-Team!"), "ateam");
        assert_eq!(sort_key("The.Matrix"), "thematrix");
    }

    #[test]
    fn only_one_article_is_removed() {
        assert_eq!(sort_key("The The Band"), "the band");
    }

    #[test]
    fn article_without_trailing_space_is_kept() {
        assert_eq!(sort_key("Theory"), "theory");
        assert_eq!(sort_key("Anaconda"), "anaconda");
        assert_eq!(sort_key("the"), "the");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(sort_key("Åke Ölund"), "ke lund");
    }

    #[test]
    fn empty_input() {
        assert_eq!(sort_key(""), "");
        assert_eq!(sort_key("!?"), "");
    }
}
