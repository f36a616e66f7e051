//! Canonical form of user text for matching.
//!
//! Lowercase, diacritics stripped (NFD + combining-mark removal), anything
//! outside `[a-z0-9/\- ]` dropped, whitespace collapsed and trimmed.

use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Text that has been through [`normalize`]. Only constructible via that
/// function, so every matcher downstream can assume the canonical alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whitespace-split tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn normalize(text: &str) -> NormalizedText {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfd().filter(|c| !is_combining_mark(*c)).flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '/' || c == '-') {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    NormalizedText(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_punctuation() {
        assert_eq!(normalize("¿Cómo cargo una Factura?").as_str(), "como cargo una factura");
        assert_eq!(normalize("Muéstrame el año 2023!").as_str(), "muestrame el ano 2023");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  flujo\tde \n\n caja  ").as_str(), "flujo de caja");
    }

    #[test]
    fn test_keeps_paths_and_dates() {
        assert_eq!(normalize("Ver /Flujo-De-Caja 03/2024").as_str(), "ver /flujo-de-caja 03/2024");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert!(normalize("").is_empty());
        assert!(normalize("¡¿?! ... 💸").is_empty());
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "¿Cuánto gasté en SETIEMBRE?",
            "  a  -  b / c ",
            "Ñandú_ñoño   conciliación\u{00A0}pendiente",
            "ﬁnal ǅ Ⅻ",
            "",
        ];
        for s in samples {
            let once = normalize(s);
            let twice = normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_tokens() {
        let text = normalize("resumen  de marzo");
        assert_eq!(text.tokens().collect::<Vec<_>>(), vec!["resumen", "de", "marzo"]);
    }
}
