use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Screens
// ============================================================================

/// Every application screen the router can target. Closed on purpose: the
/// fetcher registry is built with an exhaustive match over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Dashboard,
    ReporteMensual,
    FlujoDeCaja,
    EstadoDeResultados,
    Presupuestos,
    PronosticoContinuo,
    PronosticoFijo,
    Movimientos,
    Facturas,
    Conciliacion,
    CargaMovimientos,
    MercadoPago,
    Notificaciones,
    Recordatorios,
    ConfiguracionNotificaciones,
    Carga,
}

impl Screen {
    pub const ALL: [Screen; 16] = [
        Screen::Dashboard,
        Screen::ReporteMensual,
        Screen::FlujoDeCaja,
        Screen::EstadoDeResultados,
        Screen::Presupuestos,
        Screen::PronosticoContinuo,
        Screen::PronosticoFijo,
        Screen::Movimientos,
        Screen::Facturas,
        Screen::Conciliacion,
        Screen::CargaMovimientos,
        Screen::MercadoPago,
        Screen::Notificaciones,
        Screen::Recordatorios,
        Screen::ConfiguracionNotificaciones,
        Screen::Carga,
    ];

    /// Stable catalog identifier.
    pub fn key(self) -> &'static str {
        match self {
            Screen::Dashboard => "dashboard",
            Screen::ReporteMensual => "reporte-mensual",
            Screen::FlujoDeCaja => "flujo-de-caja",
            Screen::EstadoDeResultados => "estado-de-resultados",
            Screen::Presupuestos => "presupuestos",
            Screen::PronosticoContinuo => "pronostico-continuo",
            Screen::PronosticoFijo => "pronostico-fijo",
            Screen::Movimientos => "movimientos",
            Screen::Facturas => "facturas",
            Screen::Conciliacion => "conciliacion",
            Screen::CargaMovimientos => "carga-movimientos",
            Screen::MercadoPago => "mercado-pago",
            Screen::Notificaciones => "notificaciones",
            Screen::Recordatorios => "recordatorios",
            Screen::ConfiguracionNotificaciones => "configuracion-notificaciones",
            Screen::Carga => "carga",
        }
    }

    /// Breadcrumb shown to the assistant backend.
    pub fn label(self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::ReporteMensual => "Reportes > Reporte Mensual",
            Screen::FlujoDeCaja => "Reportes > Flujo de Caja",
            Screen::EstadoDeResultados => "Reportes > Estado de Resultados",
            Screen::Presupuestos => "Pronóstico > Presupuestos",
            Screen::PronosticoContinuo => "Pronóstico > Pronóstico Continuo",
            Screen::PronosticoFijo => "Pronóstico > Pronóstico Fijo",
            Screen::Movimientos => "Registro > Movimientos",
            Screen::Facturas => "Registro > Facturas",
            Screen::Conciliacion => "Consolidación > Conciliación",
            Screen::CargaMovimientos => "Consolidación > Carga de Movimientos",
            Screen::MercadoPago => "Consolidación > Mercado Pago",
            Screen::Notificaciones => "Notificaciones",
            Screen::Recordatorios => "Notificaciones > Recordatorios",
            Screen::ConfiguracionNotificaciones => "Notificaciones > Configuración",
            Screen::Carga => "Carga de Datos",
        }
    }

    /// Key under which the fetched snapshot lands in `externalData`.
    pub fn domain(self) -> &'static str {
        match self {
            Screen::Dashboard => "dashboard",
            Screen::ReporteMensual => "reporteMensual",
            Screen::FlujoDeCaja => "flujoDeCaja",
            Screen::EstadoDeResultados => "estadoDeResultados",
            Screen::Presupuestos => "presupuestos",
            Screen::PronosticoContinuo => "pronosticoContinuo",
            Screen::PronosticoFijo => "pronosticoFijo",
            Screen::Movimientos => "movimientos",
            Screen::Facturas => "facturas",
            Screen::Conciliacion => "conciliacion",
            Screen::CargaMovimientos => "cargaMovimientos",
            Screen::MercadoPago => "mercadoPago",
            Screen::Notificaciones => "notificaciones",
            Screen::Recordatorios => "recordatorios",
            Screen::ConfiguracionNotificaciones => "configuracionNotificaciones",
            Screen::Carga => "carga",
        }
    }

    /// Permission module guarding the screen's data. `None` means every
    /// signed-in user can read it.
    pub fn permission(self) -> Option<&'static str> {
        match self {
            Screen::Dashboard => Some("dashboard"),
            Screen::ReporteMensual | Screen::FlujoDeCaja | Screen::EstadoDeResultados => {
                Some("reps")
            }
            Screen::Presupuestos => Some("pres"),
            Screen::PronosticoContinuo | Screen::PronosticoFijo => Some("pron"),
            Screen::Movimientos => Some("movs"),
            Screen::Facturas => Some("facts"),
            Screen::Conciliacion => Some("concil"),
            Screen::CargaMovimientos | Screen::MercadoPago | Screen::Carga => Some("carga"),
            Screen::Notificaciones
            | Screen::Recordatorios
            | Screen::ConfiguracionNotificaciones => None,
        }
    }
}

// ============================================================================
// Targets and parameters
// ============================================================================

/// The screen the router believes a message is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenTarget {
    #[serde(skip)]
    pub screen: Screen,
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modo: Option<String>,
}

impl ScreenTarget {
    pub fn for_screen(screen: Screen) -> Self {
        Self {
            screen,
            key: screen.key().to_string(),
            label: screen.label().to_string(),
            tipo: None,
            modo: None,
        }
    }
}

/// Period parameters a fetcher may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Year,
    Month,
}

impl Param {
    /// Name the backends use for the query parameter.
    pub fn wire_name(self) -> &'static str {
        match self {
            Param::Year => "anio",
            Param::Month => "mes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedParams {
    pub year: Option<i32>,
    /// 1..=12 when present.
    pub month: Option<u32>,
    pub currency: String,
}

impl ExtractedParams {
    pub fn has(&self, param: Param) -> bool {
        match param {
            Param::Year => self.year.is_some(),
            Param::Month => self.month.is_some(),
        }
    }
}

// ============================================================================
// Ambient context and conversation
// ============================================================================

/// Snapshot pushed by whichever screen is mounted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientContext {
    #[serde(default)]
    pub screen: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AmbientContext {
    pub fn new(screen: impl Into<String>) -> Self {
        Self {
            screen: screen.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Build from an arbitrary JSON value. Only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    /// Flatten back into one JSON object, `screen` included when set.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut out = self.fields.clone();
        if !self.screen.is_empty() {
            out.insert("screen".to_string(), Value::String(self.screen.clone()));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub sender: Sender,
    pub text: String,
}

impl ConversationMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}
