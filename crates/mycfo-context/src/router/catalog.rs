//! Fixed catalogs the target resolver matches against: in-app routes and the
//! ordered phrase sets, plus the carga entry-type / input-mode vocabulary.

use std::sync::LazyLock;

use crate::types::Screen;

/// A route the frontend serves, optionally pinned to a sub-mode.
pub struct RouteEntry {
    pub path: &'static str,
    pub screen: Screen,
    pub modo: Option<&'static str>,
}

pub const ROUTES: &[RouteEntry] = &[
    RouteEntry { path: "/dashboard", screen: Screen::Dashboard, modo: None },
    RouteEntry { path: "/reporte-mensual", screen: Screen::ReporteMensual, modo: None },
    RouteEntry { path: "/flujo-de-caja", screen: Screen::FlujoDeCaja, modo: None },
    RouteEntry { path: "/estado-de-resultados", screen: Screen::EstadoDeResultados, modo: None },
    RouteEntry { path: "/presupuestos", screen: Screen::Presupuestos, modo: None },
    RouteEntry { path: "/presupuestos/nuevo", screen: Screen::Presupuestos, modo: Some("nuevo") },
    RouteEntry { path: "/pronostico-continuo", screen: Screen::PronosticoContinuo, modo: None },
    RouteEntry { path: "/pronostico-fijo", screen: Screen::PronosticoFijo, modo: None },
    RouteEntry { path: "/ver-movimientos", screen: Screen::Movimientos, modo: None },
    RouteEntry { path: "/ver-facturas", screen: Screen::Facturas, modo: None },
    RouteEntry { path: "/conciliacion", screen: Screen::Conciliacion, modo: None },
    RouteEntry { path: "/carga-movimientos", screen: Screen::CargaMovimientos, modo: None },
    RouteEntry { path: "/mercado-pago", screen: Screen::MercadoPago, modo: None },
    RouteEntry { path: "/listado-notificaciones", screen: Screen::Notificaciones, modo: None },
    RouteEntry { path: "/recordatorios", screen: Screen::Recordatorios, modo: None },
    RouteEntry {
        path: "/configuracion-notificaciones",
        screen: Screen::ConfiguracionNotificaciones,
        modo: None,
    },
    RouteEntry { path: "/carga", screen: Screen::Carga, modo: None },
];

/// Phrase sets in priority order. Multi-word phrases sit before generic
/// single words. The carga verbs come right after the multi-word entries so
/// "cargar facturas" refines into a carga target instead of the listing.
const PHRASES: &[(Screen, &[&str])] = &[
    (
        Screen::ReporteMensual,
        &["reporte mensual", "reportes mensuales", "resumen mensual", "resumen del mes", "resumen de mes"],
    ),
    (Screen::FlujoDeCaja, &["flujo de caja", "flujos de caja", "cashflow", "cash flow"]),
    (
        Screen::EstadoDeResultados,
        &["estado de resultados", "estado de resultado", "perdidas y ganancias", "pyl", "p y l"],
    ),
    (
        Screen::PronosticoContinuo,
        &["pronostico continuo", "pronosticos continuos", "forecast continuo", "rolling forecast"],
    ),
    (
        Screen::PronosticoFijo,
        &["pronostico fijo", "pronosticos fijos", "forecast fijo", "pronostico", "pronosticos", "forecast"],
    ),
    (
        Screen::CargaMovimientos,
        &[
            "carga de movimientos",
            "carga masiva",
            "importar excel",
            "subir excel",
            "archivo excel",
            "excel bancario",
            "extracto bancario",
            "extractos bancarios",
        ],
    ),
    (Screen::MercadoPago, &["mercado pago", "mercadopago"]),
    (
        Screen::ConfiguracionNotificaciones,
        &[
            "configuracion de notificaciones",
            "configuracion de alertas",
            "preferencias de notificacion",
            "preferencias de notificaciones",
        ],
    ),
    (Screen::Carga, &["carga", "cargar", "cargo", "cargue", "cargas"]),
    (
        Screen::Conciliacion,
        &["sin conciliar", "conciliacion", "conciliaciones", "conciliar", "conciliado", "conciliados", "conciliadas"],
    ),
    (Screen::Presupuestos, &["presupuesto", "presupuestos"]),
    (Screen::Recordatorios, &["recordatorio", "recordatorios", "vencimiento", "vencimientos"]),
    (Screen::Notificaciones, &["notificacion", "notificaciones", "alerta", "alertas"]),
    (Screen::Facturas, &["factura", "facturas", "facturacion"]),
    (
        Screen::Movimientos,
        &["movimiento", "movimientos", "transacciones", "ingresos", "egresos", "gastos"],
    ),
    (
        Screen::Dashboard,
        &["dashboard", "tablero", "panel", "saldo", "saldos", "balance", "resumen general"],
    ),
];

pub struct PhraseEntry {
    pub screen: Screen,
    matcher: regex::Regex,
}

impl PhraseEntry {
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

fn alternation(words: &[&str]) -> regex::Regex {
    let body = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    regex::Regex::new(&format!(r"\b(?:{})\b", body)).expect("catalog phrases form a valid regex")
}

pub static PHRASE_CATALOG: LazyLock<Vec<PhraseEntry>> = LazyLock::new(|| {
    PHRASES
        .iter()
        .map(|(screen, phrases)| PhraseEntry {
            screen: *screen,
            matcher: alternation(phrases),
        })
        .collect()
});

/// Carga entry types: canonical name, then the words that select it.
const CARGA_TIPOS: &[(&str, &[&str])] = &[
    ("ingreso", &["ingreso", "ingresos", "cobro", "cobros", "venta", "ventas"]),
    ("egreso", &["egreso", "egresos", "gasto", "gastos", "pago", "pagos", "compra", "compras"]),
    ("acreencia", &["acreencia", "acreencias"]),
    ("deuda", &["deuda", "deudas"]),
    ("factura", &["factura", "facturas"]),
    ("movimientos", &["movimiento", "movimientos"]),
];

/// Carga input modes.
const CARGA_MODOS: &[(&str, &[&str])] = &[
    ("formulario", &["formulario", "manual", "manualmente", "a mano"]),
    ("documento", &["documento", "documentos", "pdf", "archivo"]),
    ("foto", &["foto", "fotos", "imagen", "imagenes", "ticket", "camara"]),
    ("audio", &["audio", "audios", "voz", "grabacion"]),
];

pub struct Vocabulary {
    pub canonical: &'static str,
    matcher: regex::Regex,
}

impl Vocabulary {
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

fn vocabulary(table: &[(&'static str, &[&str])]) -> Vec<Vocabulary> {
    table
        .iter()
        .map(|(canonical, words)| Vocabulary {
            canonical: *canonical,
            matcher: alternation(words),
        })
        .collect()
}

pub static CARGA_TIPO_VOCAB: LazyLock<Vec<Vocabulary>> = LazyLock::new(|| vocabulary(CARGA_TIPOS));
pub static CARGA_MODO_VOCAB: LazyLock<Vec<Vocabulary>> = LazyLock::new(|| vocabulary(CARGA_MODOS));
