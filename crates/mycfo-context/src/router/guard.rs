//! Redundancy guard between the ambient screen and the resolved target.

fn canonical(key: &str) -> String {
    key.to_lowercase()
        .replace(['-', '/'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when the ambient screen already covers the target, judged by
/// containment in either direction. An empty key on either side never
/// counts as redundant.
pub fn is_redundant(current: &str, target_key: &str) -> bool {
    let current = canonical(current);
    let target = canonical(target_key);
    if current.is_empty() || target.is_empty() {
        return false;
    }
    current.contains(&target) || target.contains(&current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_screen_is_redundant() {
        assert!(is_redundant("conciliacion", "conciliacion"));
        assert!(is_redundant("Flujo-De-Caja", "flujo-de-caja"));
    }

    #[test]
    fn test_containment_either_way() {
        assert!(is_redundant("carga", "carga/ingreso/foto"));
        assert!(is_redundant("carga/ingreso/foto", "carga"));
        assert!(!is_redundant("dashboard", "flujo-de-caja"));
    }

    #[test]
    fn test_empty_never_redundant() {
        assert!(!is_redundant("", "dashboard"));
        assert!(!is_redundant("dashboard", ""));
        assert!(!is_redundant(" - ", "dashboard"));
    }

    #[test]
    fn test_symmetric() {
        let keys = ["", "dashboard", "carga", "carga-movimientos", "carga/deuda", "conciliacion", "reporte-mensual"];
        for a in keys {
            for b in keys {
                assert_eq!(is_redundant(a, b), is_redundant(b, a), "{:?} vs {:?}", a, b);
            }
        }
    }
}
