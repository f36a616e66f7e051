//! Per-screen fetchers. Each one knows its endpoint, its required params and
//! how to reduce the response into a domain snapshot.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;

use super::registry::{FetchRequest, ScreenFetcher};
use super::shape::{annotate, shape};
use super::{Query, Service};
use crate::error::FetchError;
use crate::types::{ExtractedParams, Param, Screen};

/// The fetcher for `screen`. Exhaustive, so a new screen cannot ship
/// without one.
pub(crate) fn fetcher_for(screen: Screen) -> Arc<dyn ScreenFetcher> {
    match screen {
        Screen::Dashboard => Arc::new(DashboardFetcher),
        Screen::ReporteMensual => Arc::new(ReporteMensualFetcher),
        Screen::FlujoDeCaja => Arc::new(FlujoDeCajaFetcher),
        Screen::EstadoDeResultados => Arc::new(EstadoDeResultadosFetcher),
        Screen::Presupuestos => Arc::new(PresupuestosFetcher),
        Screen::PronosticoContinuo => Arc::new(PronosticoContinuoFetcher),
        Screen::PronosticoFijo => Arc::new(PronosticoFijoFetcher),
        Screen::Movimientos => Arc::new(MovimientosFetcher),
        Screen::Facturas => Arc::new(FacturasFetcher),
        Screen::Conciliacion => Arc::new(ConciliacionFetcher),
        Screen::CargaMovimientos => Arc::new(CargaMovimientosFetcher),
        Screen::MercadoPago => Arc::new(MercadoPagoFetcher),
        Screen::Notificaciones => Arc::new(NotificacionesFetcher),
        Screen::Recordatorios => Arc::new(RecordatoriosFetcher),
        Screen::ConfiguracionNotificaciones => Arc::new(ConfiguracionNotificacionesFetcher),
        Screen::Carga => Arc::new(CargaFetcher),
    }
}

fn q(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Optional period filters, added only when extracted.
fn period_query(query: &mut Query, params: &ExtractedParams) {
    if let Some(year) = params.year {
        query.push(q("anio", year));
    }
    if let Some(month) = params.month {
        query.push(q("mes", month));
    }
}

fn period_fields(params: &ExtractedParams) -> [(&'static str, Value); 3] {
    [
        ("year", json!(params.year)),
        ("month", json!(params.month)),
        ("currency", json!(params.currency)),
    ]
}

fn paging(size: usize) -> [(String, String); 2] {
    [q("page", 0), q("size", size)]
}

// ============================================================================
// Dashboard and reports
// ============================================================================

struct DashboardFetcher;

#[async_trait]
impl ScreenFetcher for DashboardFetcher {
    fn screen(&self) -> Screen {
        Screen::Dashboard
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Registro, "/movimientos/resumen/dashboard")?;
        let mut query = vec![
            q("meses", 12),
            q("limiteMovimientos", 6),
            q("limiteFacturas", 6),
            q("moneda", &req.params.currency),
        ];
        // Year alone anchors the summary at December of that year.
        if let Some(year) = req.params.year {
            let month = req.params.month.unwrap_or(12);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                query.push(q("fecha", date.format("%Y-%m-%d")));
            }
        }
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(shape(raw, req.env.list_cap), period_fields(req.params)))
    }
}

struct ReporteMensualFetcher;

#[async_trait]
impl ScreenFetcher for ReporteMensualFetcher {
    fn screen(&self) -> Screen {
        Screen::ReporteMensual
    }

    fn required(&self) -> &'static [Param] {
        &[Param::Year, Param::Month]
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Reporte, "/resumen")?;
        let mut query = Vec::new();
        period_query(&mut query, req.params);
        query.push(q("moneda", &req.params.currency));
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(shape(raw, req.env.list_cap), period_fields(req.params)))
    }
}

struct FlujoDeCajaFetcher;

#[async_trait]
impl ScreenFetcher for FlujoDeCajaFetcher {
    fn screen(&self) -> Screen {
        Screen::FlujoDeCaja
    }

    fn required(&self) -> &'static [Param] {
        &[Param::Year]
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Reporte, "/cashflow")?;
        let mut query = Vec::new();
        if let Some(year) = req.params.year {
            query.push(q("anio", year));
        }
        query.push(q("moneda", &req.params.currency));
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("year", json!(req.params.year)), ("currency", json!(req.params.currency))],
        ))
    }
}

struct EstadoDeResultadosFetcher;

#[async_trait]
impl ScreenFetcher for EstadoDeResultadosFetcher {
    fn screen(&self) -> Screen {
        Screen::EstadoDeResultados
    }

    fn required(&self) -> &'static [Param] {
        &[Param::Year]
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Reporte, "/pyl")?;
        let mut query = Vec::new();
        if let Some(year) = req.params.year {
            query.push(q("anio", year));
        }
        query.push(q("moneda", &req.params.currency));
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("year", json!(req.params.year)), ("currency", json!(req.params.currency))],
        ))
    }
}

// ============================================================================
// Forecasting
// ============================================================================

struct PresupuestosFetcher;

#[async_trait]
impl ScreenFetcher for PresupuestosFetcher {
    fn screen(&self) -> Screen {
        Screen::Presupuestos
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Pronostico, "/api/presupuestos")?;
        let mut query = vec![q("status", "active")];
        query.extend(paging(req.env.list_cap));
        query.push(q("moneda", &req.params.currency));
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("currency", json!(req.params.currency)), ("modo", json!(req.target.modo))],
        ))
    }
}

struct PronosticoContinuoFetcher;

#[async_trait]
impl ScreenFetcher for PronosticoContinuoFetcher {
    fn screen(&self) -> Screen {
        Screen::PronosticoContinuo
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Pronostico, "/api/forecasts/rolling")?;
        let mut query = vec![q("moneda", &req.params.currency)];
        if let Some(year) = req.params.year {
            query.push(q("anio", year));
        }
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("year", json!(req.params.year)), ("currency", json!(req.params.currency))],
        ))
    }
}

struct PronosticoFijoFetcher;

#[async_trait]
impl ScreenFetcher for PronosticoFijoFetcher {
    fn screen(&self) -> Screen {
        Screen::PronosticoFijo
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Pronostico, "/api/forecasts")?;
        let query = vec![q("moneda", &req.params.currency)];
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("currency", json!(req.params.currency))],
        ))
    }
}

// ============================================================================
// Registro
// ============================================================================

struct MovimientosFetcher;

#[async_trait]
impl ScreenFetcher for MovimientosFetcher {
    fn screen(&self) -> Screen {
        Screen::Movimientos
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Registro, "/movimientos")?;
        let mut query: Query = paging(req.env.list_cap).into();
        query.push(q("sortBy", "fechaEmision"));
        query.push(q("sortDir", "desc"));
        query.push(q("moneda", &req.params.currency));
        period_query(&mut query, req.params);
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(shape(raw, req.env.list_cap), period_fields(req.params)))
    }
}

struct FacturasFetcher;

#[async_trait]
impl ScreenFetcher for FacturasFetcher {
    fn screen(&self) -> Screen {
        Screen::Facturas
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Registro, "/facturas")?;
        let mut query: Query = paging(req.env.list_cap).into();
        query.push(q("moneda", &req.params.currency));
        period_query(&mut query, req.params);
        let raw = req.env.get(&url, &query).await?;
        Ok(annotate(shape(raw, req.env.list_cap), period_fields(req.params)))
    }
}

struct ConciliacionFetcher;

#[async_trait]
impl ScreenFetcher for ConciliacionFetcher {
    fn screen(&self) -> Screen {
        Screen::Conciliacion
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let base = req.env.url(Service::Registro, "/api/conciliacion/api")?;
        let moneda = q("moneda", &req.params.currency);

        let mut query: Query = paging(req.env.list_cap).into();
        query.push(moneda.clone());
        let pending = req
            .env
            .get(&format!("{}/movimientos/sin-conciliar", base), &query)
            .await?;
        let stats = req
            .env
            .get(&format!("{}/estadisticas", base), &[moneda])
            .await?;

        Ok(json!({
            "sinConciliar": shape(pending, req.env.list_cap),
            "estadisticas": shape(stats, req.env.list_cap),
            "currency": req.params.currency,
        }))
    }
}

struct CargaMovimientosFetcher;

#[async_trait]
impl ScreenFetcher for CargaMovimientosFetcher {
    fn screen(&self) -> Screen {
        Screen::CargaMovimientos
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Registro, "/api/carga-datos/historial")?;
        let raw = req.env.get(&url, &[q("moneda", &req.params.currency)]).await?;
        Ok(annotate(
            shape(raw, req.env.list_cap),
            [("currency", json!(req.params.currency))],
        ))
    }
}

struct MercadoPagoFetcher;

#[async_trait]
impl ScreenFetcher for MercadoPagoFetcher {
    fn screen(&self) -> Screen {
        Screen::MercadoPago
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Base, "/api/mp/status")?;
        let raw = req.env.get(&url, &[]).await?;
        Ok(shape(raw, req.env.list_cap))
    }
}

struct CargaFetcher;

#[async_trait]
impl ScreenFetcher for CargaFetcher {
    fn screen(&self) -> Screen {
        Screen::Carga
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let url = req.env.url(Service::Registro, "/api/categorias")?;
        let mut query = Vec::new();
        if let Some(tipo) = &req.target.tipo {
            query.push(q("tipo", tipo));
        }
        let raw = req.env.get(&url, &query).await?;
        Ok(json!({
            "categorias": shape(raw, req.env.list_cap),
            "tipo": req.target.tipo,
            "modo": req.target.modo,
        }))
    }
}

// ============================================================================
// Notifications (per user)
// ============================================================================

struct NotificacionesFetcher;

#[async_trait]
impl ScreenFetcher for NotificacionesFetcher {
    fn screen(&self) -> Screen {
        Screen::Notificaciones
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let sub = req.env.sub()?;
        let url = req
            .env
            .url(Service::Notificacion, &format!("/api/users/{}/notifications", sub))?;
        let raw = req.env.get(&url, &paging(req.env.list_cap)).await?;
        Ok(shape(raw, req.env.list_cap))
    }
}

struct RecordatoriosFetcher;

#[async_trait]
impl ScreenFetcher for RecordatoriosFetcher {
    fn screen(&self) -> Screen {
        Screen::Recordatorios
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let sub = req.env.sub()?;
        let url = req.env.url(Service::Notificacion, "/api/reminders")?;
        let raw = req.env.get(&url, &[q("usuarioSub", sub)]).await?;
        Ok(shape(raw, req.env.list_cap))
    }
}

struct ConfiguracionNotificacionesFetcher;

#[async_trait]
impl ScreenFetcher for ConfiguracionNotificacionesFetcher {
    fn screen(&self) -> Screen {
        Screen::ConfiguracionNotificaciones
    }

    async fn fetch(&self, req: FetchRequest<'_>) -> Result<Value, FetchError> {
        let sub = req.env.sub()?;
        let url = req.env.url(
            Service::Notificacion,
            &format!("/api/users/{}/notification-preferences", sub),
        )?;
        let raw = req.env.get(&url, &[]).await?;
        Ok(shape(raw, req.env.list_cap))
    }
}
