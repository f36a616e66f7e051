//! Target resolution: which screen a message is about.
//!
//! Explicit route paths in the text beat phrases. Among phrases the catalog
//! order decides, first hit wins. A carga hit is refined with the entry type
//! and input mode named anywhere in the message.

use std::sync::LazyLock;

use super::catalog::{RouteEntry, CARGA_MODO_VOCAB, CARGA_TIPO_VOCAB, PHRASE_CATALOG, ROUTES};
use super::normalize::NormalizedText;
use crate::types::{Screen, ScreenTarget};

static PATH_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"/[a-z0-9\-/]+").expect("path regex is valid"));

pub fn resolve_target(text: &NormalizedText) -> Option<ScreenTarget> {
    let target = match_route(text).or_else(|| match_phrase(text))?;
    if target.screen == Screen::Carga {
        return Some(refine_carga(text, target.modo));
    }
    Some(target)
}

fn match_route(text: &NormalizedText) -> Option<ScreenTarget> {
    let mut tokens: Vec<&str> = PATH_RE
        .find_iter(text.as_str())
        .map(|m| m.as_str().trim_end_matches('/'))
        .filter(|t| !t.is_empty())
        .collect();
    // Stable sort keeps text order among equal lengths.
    tokens.sort_by(|a, b| b.len().cmp(&a.len()));

    tokens.into_iter().find_map(|token| {
        let route = longest_route_for(token)?;
        tracing::debug!(token, route = route.path, "route path matched");
        let mut target = ScreenTarget::for_screen(route.screen);
        if let Some(modo) = route.modo {
            target.label = format!("{} > {}", target.label, capitalize(modo));
            target.modo = Some(modo.to_string());
        }
        Some(target)
    })
}

fn longest_route_for(token: &str) -> Option<&'static RouteEntry> {
    ROUTES
        .iter()
        .filter(|route| {
            token == route.path
                || (token.starts_with(route.path) && token[route.path.len()..].starts_with('/'))
        })
        .max_by_key(|route| route.path.len())
}

fn match_phrase(text: &NormalizedText) -> Option<ScreenTarget> {
    PHRASE_CATALOG
        .iter()
        .find(|entry| entry.matches(text.as_str()))
        .map(|entry| ScreenTarget::for_screen(entry.screen))
}

fn refine_carga(text: &NormalizedText, route_modo: Option<String>) -> ScreenTarget {
    let tipo = CARGA_TIPO_VOCAB
        .iter()
        .find(|v| v.matches(text.as_str()))
        .map(|v| v.canonical);
    let modo = CARGA_MODO_VOCAB
        .iter()
        .find(|v| v.matches(text.as_str()))
        .map(|v| v.canonical);

    let mut key = Screen::Carga.key().to_string();
    let mut label = Screen::Carga.label().to_string();
    for part in [tipo, modo].into_iter().flatten() {
        key.push('/');
        key.push_str(part);
        label.push_str(" > ");
        label.push_str(&capitalize(part));
    }

    ScreenTarget {
        screen: Screen::Carga,
        key,
        label,
        tipo: tipo.map(str::to_string),
        modo: modo.map(str::to_string).or(route_modo),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::normalize;

    fn resolve(s: &str) -> Option<ScreenTarget> {
        resolve_target(&normalize(s))
    }

    fn key(s: &str) -> Option<String> {
        resolve(s).map(|t| t.key)
    }

    #[test]
    fn test_phrase_targets() {
        assert_eq!(key("cuanto gasté en flujo de caja de 2023").as_deref(), Some("flujo-de-caja"));
        assert_eq!(key("muéstrame el estado de resultados").as_deref(), Some("estado-de-resultados"));
        assert_eq!(key("cuantos movimientos sin conciliar tengo").as_deref(), Some("conciliacion"));
        assert_eq!(key("reporte mensual de marzo").as_deref(), Some("reporte-mensual"));
        assert_eq!(key("mi saldo").as_deref(), Some("dashboard"));
    }

    #[test]
    fn test_multi_word_phrase_beats_generic_word() {
        assert_eq!(key("pronostico continuo 2024").as_deref(), Some("pronostico-continuo"));
        assert_eq!(key("dame el pronostico").as_deref(), Some("pronostico-fijo"));
    }

    #[test]
    fn test_route_beats_phrase() {
        let target = resolve("facturas en /flujo-de-caja").unwrap();
        assert_eq!(target.screen, Screen::FlujoDeCaja);
    }

    #[test]
    fn test_longest_route_wins() {
        let target = resolve("abri /presupuestos/nuevo").unwrap();
        assert_eq!(target.screen, Screen::Presupuestos);
        assert_eq!(target.modo.as_deref(), Some("nuevo"));
        assert_eq!(target.label, "Pronóstico > Presupuestos > Nuevo");

        let target = resolve("abri /presupuestos").unwrap();
        assert!(target.modo.is_none());
    }

    #[test]
    fn test_route_needs_segment_boundary() {
        assert_eq!(key("ir a /carga-movimientos").as_deref(), Some("carga-movimientos"));
        assert_eq!(key("ir a /dashboardx").as_deref(), None);
    }

    #[test]
    fn test_date_fragment_is_not_a_route() {
        // "/2024" is skipped, the phrase decides
        assert_eq!(key("resultados 03/2024 estado de resultados").as_deref(), Some("estado-de-resultados"));
    }

    #[test]
    fn test_carga_refinement() {
        let target = resolve("quiero cargar un ingreso con foto").unwrap();
        assert_eq!(target.key, "carga/ingreso/foto");
        assert_eq!(target.label, "Carga de Datos > Ingreso > Foto");
        assert_eq!(target.tipo.as_deref(), Some("ingreso"));
        assert_eq!(target.modo.as_deref(), Some("foto"));

        let target = resolve("cargar una deuda").unwrap();
        assert_eq!(target.key, "carga/deuda");
        assert!(target.modo.is_none());

        assert_eq!(key("/carga/egreso/audio").as_deref(), Some("carga/egreso/audio"));
    }

    #[test]
    fn test_carga_verb_refines_listing_words() {
        assert_eq!(key("quiero cargar ingresos").as_deref(), Some("carga/ingreso"));
        assert_eq!(key("cargar gastos con foto").as_deref(), Some("carga/egreso/foto"));
        assert_eq!(key("cargar una factura con foto").as_deref(), Some("carga/factura/foto"));
        assert_eq!(
            key("cargar movimientos por formulario").as_deref(),
            Some("carga/movimientos/formulario")
        );
        // singular and plural land on the same target
        assert_eq!(key("cargar facturas"), key("cargar factura"));
    }

    #[test]
    fn test_bulk_upload_phrase_beats_carga_verb() {
        assert_eq!(key("carga de movimientos desde excel").as_deref(), Some("carga-movimientos"));
        assert_eq!(key("ver mis facturas").as_deref(), Some("facturas"));
    }

    #[test]
    fn test_no_target() {
        assert!(resolve("hola que tal").is_none());
        assert!(resolve("").is_none());
    }
}
