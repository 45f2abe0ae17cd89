//! Person-name comparison used when checking assignees.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip accents: canonical decomposition, then combining marks dropped.
/// Composed and decomposed spellings of a name fold to the same text.
pub fn fold_diacritics(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_stroke)
        .collect()
}

/// Letters whose stroke does not decompose under NFD
fn fold_stroke(c: char) -> char {
    match c {
        'ø' => 'o',
        'Ø' => 'O',
        'ł' => 'l',
        'Ł' => 'L',
        'đ' => 'd',
        'Đ' => 'D',
        'ħ' => 'h',
        'Ħ' => 'H',
        other => other,
    }
}

/// Comparison key: first name, accents folded, lower-cased
pub fn first_name_key(name: &str) -> String {
    let first = name.split_whitespace().next().unwrap_or_default();
    fold_diacritics(first).to_lowercase()
}

/// Whether two assignee cells name the same person
pub fn same_person(a: &str, b: &str) -> bool {
    first_name_key(a) == first_name_key(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_portuguese_accents() {
        assert_eq!(fold_diacritics("Ítalo Conceição"), "Italo Conceicao");
        assert_eq!(fold_diacritics("João"), "Joao");
        assert_eq!(fold_diacritics("Søren Łukasz"), "Soren Lukasz");
    }

    #[test]
    fn decomposed_input_folds_like_composed() {
        assert_eq!(fold_diacritics("I\u{301}talo"), "Italo");
        assert_eq!(fold_diacritics("Conceic\u{327}a\u{303}o"), "Conceicao");
        assert!(same_person("Ítalo", "I\u{301}talo"));
    }

    #[test]
    fn compares_by_first_name() {
        assert!(same_person("ÍTALO", "italo"));
        assert!(same_person("Ana Souza", "ana"));
        assert!(same_person("  Octavio  ", "OCTAVIO Lima"));
        assert!(!same_person("Ana", "Bruno"));
    }

    #[test]
    fn blank_names_match_each_other() {
        assert!(same_person("", "   "));
        assert!(!same_person("", "Ana"));
    }
}
