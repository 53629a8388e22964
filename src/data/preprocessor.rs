// ============================================================
// Layer 4 — Text Normalizer
// ============================================================
// Cleans caption text before it is translated or re-tokenized
// against the word vocabulary.
//
// Cleaning steps (applied in order):
//   1. Lowercase
//   2. Punctuation, symbols and control characters → space
//   3. Collapse runs of whitespace into one space
//   4. Trim both ends
//
// Letters with accents are kept: the vocabulary holds Spanish words.

pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        let mapped: String = text
            .chars()
            .flat_map(char::to_lowercase)
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        mapped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let n = TextNormalizer::new();
        assert_eq!(n.clean("¡Hola, MUNDO!"), "hola mundo");
    }

    #[test]
    fn test_collapses_whitespace_and_control_chars() {
        let n = TextNormalizer::new();
        assert_eq!(n.clean("  uno\t\tdos\x01tres \n"), "uno dos tres");
    }

    #[test]
    fn test_keeps_accented_letters() {
        let n = TextNormalizer::new();
        assert_eq!(n.clean("Canción Ñandú"), "canción ñandú");
    }

    #[test]
    fn test_empty_string() {
        let n = TextNormalizer::new();
        assert_eq!(n.clean(""), "");
        assert_eq!(n.clean("  ...  "), "");
    }
}
