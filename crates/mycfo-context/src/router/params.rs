//! Period parameters implied by the message. Nothing here ever defaults to
//! "now": an absent year or month stays `None`.

use std::sync::LazyLock;

use super::normalize::NormalizedText;
use crate::types::ExtractedParams;

static YEAR_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:19|20)\d{2}\b").expect("year regex is valid")
});
static NUMERIC_MONTH_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(0?[1-9]|1[0-2])[/-](?:19|20)\d{2}\b").expect("numeric month regex is valid")
});

const MONTH_NAMES: &[(&str, u32)] = &[
    ("enero", 1),
    ("ene", 1),
    ("febrero", 2),
    ("feb", 2),
    ("marzo", 3),
    ("mar", 3),
    ("abril", 4),
    ("abr", 4),
    ("mayo", 5),
    ("may", 5),
    ("junio", 6),
    ("jun", 6),
    ("julio", 7),
    ("jul", 7),
    ("agosto", 8),
    ("ago", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("sept", 9),
    ("sep", 9),
    ("set", 9),
    ("octubre", 10),
    ("oct", 10),
    ("noviembre", 11),
    ("nov", 11),
    ("diciembre", 12),
    ("dic", 12),
];

pub fn extract_year(text: &NormalizedText) -> Option<i32> {
    YEAR_RE
        .find(text.as_str())
        .and_then(|m| m.as_str().parse().ok())
}

pub fn extract_month(text: &NormalizedText) -> Option<u32> {
    if let Some(caps) = NUMERIC_MONTH_RE.captures(text.as_str()) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }

    text.tokens().find_map(|token| {
        MONTH_NAMES
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, month)| *month)
    })
}

pub fn extract_params(text: &NormalizedText, currency: &str) -> ExtractedParams {
    ExtractedParams {
        year: extract_year(text),
        month: extract_month(text),
        currency: currency.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::normalize;

    fn year(s: &str) -> Option<i32> {
        extract_year(&normalize(s))
    }

    fn month(s: &str) -> Option<u32> {
        extract_month(&normalize(s))
    }

    #[test]
    fn test_first_year_wins() {
        assert_eq!(year("tengo gastos de 2023 y 2024"), Some(2023));
    }

    #[test]
    fn test_year_bounds() {
        assert_eq!(year("en 1999"), Some(1999));
        assert_eq!(year("cuenta 120234"), None);
        assert_eq!(year("codigo 20245"), None);
        assert_eq!(year("en 2150"), None);
        assert_eq!(year("sin fecha"), None);
    }

    #[test]
    fn test_month_by_name() {
        assert_eq!(month("resumen de marzo"), Some(3));
        assert_eq!(month("gastos de Setiembre"), Some(9));
        assert_eq!(month("ventas sept 2024"), Some(9));
        assert_eq!(month("dic"), Some(12));
    }

    #[test]
    fn test_month_numeric() {
        assert_eq!(month("resultados 03/2024"), Some(3));
        assert_eq!(month("resultados 11-2023"), Some(11));
        assert_eq!(month("resultados 13/2024"), None);
    }

    #[test]
    fn test_month_numeric_beats_name() {
        assert_eq!(month("marzo o 05/2024"), Some(5));
    }

    #[test]
    fn test_no_silent_default() {
        assert_eq!(month("resumen"), None);
        // "mar" only matches as a whole token
        assert_eq!(month("marca mercado"), None);
    }

    #[test]
    fn test_extract_params_bundle() {
        let params = extract_params(&normalize("reporte mensual de abril 2022"), "USD");
        assert_eq!(params.year, Some(2022));
        assert_eq!(params.month, Some(4));
        assert_eq!(params.currency, "USD");
    }
}
