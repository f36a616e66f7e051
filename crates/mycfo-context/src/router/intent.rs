//! Augmentation gate.
//!
//! Two independent keyword sets are evaluated over normalized text. Live data
//! is fetched only for data questions that are not procedural: a HOW_TO hit
//! always wins, whatever else the message contains.

use serde::Serialize;
use std::sync::LazyLock;

use super::normalize::NormalizedText;

static DATA_QUERY_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(concat!(
        r"\b(",
        r"cuant[oa]s?|total(es)?|saldos?|balances?|montos?|importes?",
        r"|gast(o|os|e|amos|aste|ado)|ingresos?|egresos?|ganancias?|perdidas?",
        r"|flujo de caja|cash ?flow|estado de resultados|resultados?",
        r"|presupuestos?|pronosticos?|forecast",
        r"|facturas?|conciliacion(es)?|conciliar|conciliad[oa]s?",
        r"|movimientos?|transacciones|reportes?|resumen(es)?",
        r"|deudas?|acreencias?|cobros?|pagos?|vencimientos?",
        r"|notificacion(es)?|recordatorios?|alertas?",
        r"|mercado ?pago|dashboard|tablero",
        r"|muestrame|mostrame|dame|decime|listame|ver",
        r")\b",
    ))
    .expect("data query regex is valid")
});

static HOW_TO_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(concat!(
        r"\b(",
        r"como|donde|pasos?|instrucciones",
        r"|configur(ar|o|as|a|en)|crear|creo|creas|agregar|agrego",
        r"|editar|edito|modificar|eliminar|elimino|borrar|borro",
        r"|ayuda|tutorial|explicame|explica|para que sirve|que significa",
        r")\b",
    ))
    .expect("how-to regex is valid")
});

/// Outcome of the gate, with both raw matches kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntentDecision {
    pub augment: bool,
    pub data_match: bool,
    pub how_to_match: bool,
}

impl IntentDecision {
    pub fn reason(&self) -> &'static str {
        match (self.data_match, self.how_to_match) {
            (_, true) => "procedural question, answered from help content",
            (false, false) => "no financial data requested",
            (true, false) => "asks for live data",
        }
    }
}

pub fn is_data_query(text: &NormalizedText) -> bool {
    DATA_QUERY_RE.is_match(text.as_str())
}

pub fn is_how_to(text: &NormalizedText) -> bool {
    HOW_TO_RE.is_match(text.as_str())
}

pub fn classify(text: &NormalizedText) -> IntentDecision {
    let data_match = is_data_query(text);
    let how_to_match = is_how_to(text);
    IntentDecision {
        augment: data_match && !how_to_match,
        data_match,
        how_to_match,
    }
}

pub fn should_augment(text: &NormalizedText) -> bool {
    classify(text).augment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::normalize;

    fn augment(s: &str) -> bool {
        should_augment(&normalize(s))
    }

    #[test]
    fn test_data_questions_augment() {
        assert!(augment("¿Cuánto gasté en flujo de caja de 2023?"));
        assert!(augment("Muéstrame el estado de resultados"));
        assert!(augment("cuantos movimientos sin conciliar tengo"));
        assert!(augment("saldo total en dolares"));
    }

    #[test]
    fn test_how_to_wins_over_data() {
        let text = normalize("¿Cómo cargo una factura?");
        assert!(is_data_query(&text));
        assert!(is_how_to(&text));
        assert!(!should_augment(&text));

        assert!(!augment("donde veo el saldo total"));
        assert!(!augment("pasos para crear un presupuesto"));
        assert!(!augment("como configuro las notificaciones"));
    }

    #[test]
    fn test_precedence_law_holds_for_samples() {
        let samples = [
            "como veo mis facturas de 2023",
            "explicame el flujo de caja",
            "ayuda con la conciliacion",
            "donde estan los movimientos",
            "para que sirve el presupuesto",
        ];
        for s in samples {
            let text = normalize(s);
            if is_how_to(&text) {
                assert!(!should_augment(&text), "{:?} should not augment", s);
            }
        }
    }

    #[test]
    fn test_small_talk_skips() {
        assert!(!augment("hola"));
        assert!(!augment("gracias!"));
        let decision = classify(&normalize("buen dia"));
        assert_eq!(decision.reason(), "no financial data requested");
    }

    #[test]
    fn test_configuration_noun_is_not_procedural() {
        assert!(augment("muestrame la configuracion de notificaciones"));
    }

    #[test]
    fn test_word_boundaries() {
        // "comodidad" contains "como" but is not the interrogative
        assert!(augment("total de gastos por comodidad"));
    }
}
