//! The per-message run: normalize, classify, resolve, guard, extract,
//! dispatch, merge, send.
//!
//! A router runs one message at a time. Augmentation problems never fail a
//! run; they show up as an early exit in the trace or as an `externalFetch`
//! marker in the payload. Only the assistant call can return an error.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::Instrument;
use uuid::Uuid;

use crate::ambient::AmbientContextProvider;
use crate::assistant::{AssistantBackend, AssistantReply, AssistantRequest};
use crate::config::AssistConfig;
use crate::error::PipelineError;
use crate::fetch::{BackendClient, FetchEnv, FetchOutcome, FetcherRegistry};
use crate::merge::merge;
use crate::router::{classify, extract_params, is_redundant, normalize, resolve_target, IntentDecision, NormalizedText};
use crate::session::{SessionProfile, SessionStore};
use crate::types::{AmbientContext, ConversationMessage, ExtractedParams, ScreenTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
    Idle,
    Normalized,
    Classified,
    Resolved,
    Guarded,
    Dispatched,
    Merged,
    Sent,
}

/// Why augmentation stopped before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EarlyExit {
    NoDataRequested,
    Procedural,
    NoTarget,
    Redundant,
}

/// What one run did. Logged at the end of the run, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct AugmentationTrace {
    pub run_id: Uuid,
    pub stages: Vec<RunStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_exit: Option<EarlyExit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ScreenTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ExtractedParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_status: Option<&'static str>,
}

impl AugmentationTrace {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: vec![RunStage::Idle],
            early_exit: None,
            intent: None,
            target: None,
            params: None,
            fetch_status: None,
        }
    }

    fn reach(&mut self, stage: RunStage) {
        tracing::debug!(?stage, "stage reached");
        self.stages.push(stage);
    }

    fn exit(&mut self, reason: EarlyExit) {
        self.early_exit = Some(reason);
    }

    pub fn last_stage(&self) -> RunStage {
        self.stages.last().copied().unwrap_or(RunStage::Idle)
    }

    pub fn reached(&self, stage: RunStage) -> bool {
        self.stages.contains(&stage)
    }
}

/// Everything up to, but not including, the assistant call.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: AssistantRequest,
    pub outcome: Option<FetchOutcome>,
    pub trace: AugmentationTrace,
}

#[derive(Debug, Clone)]
pub struct RouterReply {
    pub reply: AssistantReply,
    pub outcome: Option<FetchOutcome>,
    pub trace: AugmentationTrace,
}

pub struct ContextRouter {
    config: AssistConfig,
    registry: FetcherRegistry,
    backend: Arc<dyn BackendClient>,
    assistant: Arc<dyn AssistantBackend>,
    session: Arc<dyn SessionStore>,
    ambient: Arc<AmbientContextProvider>,
    route: RwLock<Option<String>>,
    in_flight: Semaphore,
}

impl ContextRouter {
    pub fn new(
        config: AssistConfig,
        backend: Arc<dyn BackendClient>,
        assistant: Arc<dyn AssistantBackend>,
        session: Arc<dyn SessionStore>,
        ambient: Arc<AmbientContextProvider>,
    ) -> Self {
        Self {
            config,
            registry: FetcherRegistry::standard(),
            backend,
            assistant,
            session,
            ambient,
            route: RwLock::new(None),
            in_flight: Semaphore::new(1),
        }
    }

    pub fn with_registry(mut self, registry: FetcherRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn ambient(&self) -> &Arc<AmbientContextProvider> {
        &self.ambient
    }

    /// Current in-app route, e.g. `/flujo-de-caja`.
    pub fn set_route(&self, route: Option<String>) {
        *self.route.write() = route.filter(|r| !r.trim().is_empty());
    }

    /// Run the full pipeline for one user message. `history` is the
    /// conversation before this message; only its tail is sent.
    pub async fn handle(
        &self,
        message: &str,
        history: &[ConversationMessage],
    ) -> Result<RouterReply, PipelineError> {
        if message.trim().is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        let _permit = self.in_flight.try_acquire().map_err(|_| PipelineError::Busy)?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("augment", run_id = %run_id);
        async move {
            let PreparedRequest {
                request,
                outcome,
                mut trace,
            } = self.prepare_run(run_id, message, history).await;

            let reply = self.assistant.chat(&request).await.map_err(|e| {
                tracing::error!(error = %e, "assistant call failed");
                PipelineError::Assistant(e)
            })?;
            trace.reach(RunStage::Sent);

            tracing::info!(
                stages = ?trace.stages,
                early_exit = ?trace.early_exit,
                fetch_status = trace.fetch_status.unwrap_or("none"),
                "augmentation run finished"
            );
            Ok(RouterReply {
                reply,
                outcome,
                trace,
            })
        }
        .instrument(span)
        .await
    }

    /// Everything `handle` does except calling the assistant.
    pub async fn prepare(
        &self,
        message: &str,
        history: &[ConversationMessage],
    ) -> Result<PreparedRequest, PipelineError> {
        if message.trim().is_empty() {
            return Err(PipelineError::EmptyMessage);
        }
        let _permit = self.in_flight.try_acquire().map_err(|_| PipelineError::Busy)?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("augment", run_id = %run_id);
        Ok(self
            .prepare_run(run_id, message, history)
            .instrument(span)
            .await)
    }

    async fn prepare_run(
        &self,
        run_id: Uuid,
        message: &str,
        history: &[ConversationMessage],
    ) -> PreparedRequest {
        let mut trace = AugmentationTrace::new(run_id);

        // One snapshot per run; screens may push a new one meanwhile.
        let ambient = self.ambient.current();
        let route = self.route.read().clone();
        let profile = self.session.profile();
        let currency = self
            .session
            .currency_preference()
            .unwrap_or_else(|| self.config.default_currency.clone());

        let text = normalize(message);
        trace.reach(RunStage::Normalized);
        tracing::debug!(normalized = %text, "message normalized");

        let outcome = self
            .augment(&text, ambient.as_ref(), &profile, &currency, &mut trace)
            .await;

        let context = merge(ambient.as_ref(), outcome.as_ref(), &profile, route.as_deref());
        trace.reach(RunStage::Merged);

        let window = self.config.limits.history_window;
        let request = AssistantRequest {
            message: message.to_string(),
            module: module_from_route(route.as_deref(), &self.config.assistant.module_default),
            context,
            history: history[history.len().saturating_sub(window)..].to_vec(),
        };

        PreparedRequest {
            request,
            outcome,
            trace,
        }
    }

    async fn augment(
        &self,
        text: &NormalizedText,
        ambient: Option<&AmbientContext>,
        profile: &SessionProfile,
        currency: &str,
        trace: &mut AugmentationTrace,
    ) -> Option<FetchOutcome> {
        let decision = classify(text);
        trace.intent = Some(decision);
        trace.reach(RunStage::Classified);
        if !decision.augment {
            trace.exit(if decision.how_to_match {
                EarlyExit::Procedural
            } else {
                EarlyExit::NoDataRequested
            });
            tracing::info!(reason = decision.reason(), "augmentation skipped");
            return None;
        }

        let Some(target) = resolve_target(text) else {
            trace.exit(EarlyExit::NoTarget);
            tracing::info!("no screen matched, sending without external data");
            return None;
        };
        trace.target = Some(target.clone());
        trace.reach(RunStage::Resolved);

        let current = ambient.map(|a| a.screen.as_str()).unwrap_or("");
        let redundant = is_redundant(current, &target.key);
        trace.reach(RunStage::Guarded);
        if redundant {
            trace.exit(EarlyExit::Redundant);
            tracing::info!(screen = %target.key, current, "ambient context already covers target");
            return None;
        }

        let params = extract_params(text, currency);
        trace.params = Some(params.clone());
        tracing::info!(
            screen = %target.key,
            year = ?params.year,
            month = ?params.month,
            currency = %params.currency,
            "routing to screen"
        );

        let env = FetchEnv {
            client: self.backend.clone(),
            urls: self.config.backends.clone(),
            auth: self.session.auth_headers(),
            profile: profile.clone(),
            list_cap: self.config.limits.list_cap,
        };
        let outcome = self.registry.dispatch(&target, &params, &env).await;
        trace.fetch_status = Some(outcome.status());
        trace.reach(RunStage::Dispatched);
        Some(outcome)
    }
}

/// First path segment of the route, or `default` when there is none.
pub fn module_from_route(route: Option<&str>, default: &str) -> String {
    route
        .map(|r| r.split(['?', '#']).next().unwrap_or(""))
        .and_then(|path| path.split('/').find(|segment| !segment.is_empty()))
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::FakeBackend;
    use crate::session::{AuthHeaders, MemorySession};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeAssistant {
        requests: Mutex<Vec<AssistantRequest>>,
        fail: bool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    #[async_trait]
    impl AssistantBackend for FakeAssistant {
        async fn chat(&self, request: &AssistantRequest) -> anyhow::Result<AssistantReply> {
            self.requests.lock().push(request.clone());
            if let Some((entered, release)) = &self.gate {
                entered.notify_one();
                release.notified().await;
            }
            if self.fail {
                return Err(anyhow!("HTTP 502"));
            }
            Ok(AssistantReply::new("Mirá [[/flujo-de-caja|Flujo de Caja]]"))
        }
    }

    struct Fixture {
        router: Arc<ContextRouter>,
        backend: Arc<FakeBackend>,
        assistant: Arc<FakeAssistant>,
    }

    fn fixture_with(backend: FakeBackend, assistant: FakeAssistant, session: MemorySession) -> Fixture {
        let backend = Arc::new(backend);
        let assistant = Arc::new(assistant);
        let router = ContextRouter::new(
            AssistConfig::for_gateway("http://gw.test"),
            backend.clone(),
            assistant.clone(),
            Arc::new(session),
            Arc::new(AmbientContextProvider::new()),
        );
        Fixture {
            router: Arc::new(router),
            backend,
            assistant,
        }
    }

    fn fixture(backend: FakeBackend) -> Fixture {
        let session = MemorySession::new().with_auth(AuthHeaders::bearer("user-1", "tok"));
        fixture_with(backend, FakeAssistant::default(), session)
    }

    fn context_of(prepared: &PreparedRequest) -> Value {
        serde_json::to_value(&prepared.request.context).unwrap()
    }

    #[tokio::test]
    async fn test_scenario_a_year_flows_into_external_data() {
        let fx = fixture(FakeBackend::new().respond("/cashflow", json!([{"mes": 1, "ingresos": 10}])));
        fx.router.ambient().set(AmbientContext::new("dashboard"));

        let prepared = fx
            .router
            .prepare("cuanto gasté en flujo de caja de 2023", &[])
            .await
            .unwrap();

        let context = context_of(&prepared);
        assert_eq!(context["externalData"]["flujoDeCaja"]["year"], json!(2023));
        assert_eq!(context["screen"], json!("dashboard"));
        assert_eq!(prepared.trace.last_stage(), RunStage::Merged);
        assert!(prepared.trace.reached(RunStage::Dispatched));
        assert_eq!(fx.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scenario_b_missing_year() {
        let fx = fixture(FakeBackend::new());
        let prepared = fx
            .router
            .prepare("muéstrame el estado de resultados", &[])
            .await
            .unwrap();

        let context = context_of(&prepared);
        assert_eq!(context["externalFetch"]["status"], json!("missing-params"));
        assert_eq!(context["externalFetch"]["missing"], json!(["anio"]));
        assert!(context.get("externalData").is_none());
        assert_eq!(fx.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_c_redundant_with_ambient() {
        let fx = fixture(FakeBackend::new());
        fx.router.ambient().set(
            AmbientContext::new("conciliacion").with_field("movimientosSinConciliar", json!(4)),
        );

        let prepared = fx
            .router
            .prepare("cuantos movimientos sin conciliar tengo", &[])
            .await
            .unwrap();

        assert_eq!(prepared.trace.early_exit, Some(EarlyExit::Redundant));
        assert!(prepared.trace.reached(RunStage::Guarded));
        assert!(!prepared.trace.reached(RunStage::Dispatched));
        assert!(prepared.outcome.is_none());
        assert_eq!(fx.backend.call_count(), 0);
        assert_eq!(
            context_of(&prepared),
            json!({"screen": "conciliacion", "movimientosSinConciliar": 4})
        );
    }

    #[tokio::test]
    async fn test_scenario_d_list_capped() {
        let content: Vec<Value> = (0..37).map(|i| json!({"id": i})).collect();
        let fx = fixture(
            FakeBackend::new().respond("/movimientos", json!({"content": content, "totalElements": 37})),
        );

        let prepared = fx.router.prepare("cuantos movimientos tengo", &[]).await.unwrap();

        let movimientos = &context_of(&prepared)["externalData"]["movimientos"];
        assert_eq!(movimientos["items"].as_array().unwrap().len(), 10);
        assert_eq!(movimientos["total"], json!(37));
    }

    #[tokio::test]
    async fn test_how_to_skips_augmentation() {
        let fx = fixture(FakeBackend::new());
        let prepared = fx.router.prepare("¿Cómo cargo una factura?", &[]).await.unwrap();

        assert_eq!(prepared.trace.early_exit, Some(EarlyExit::Procedural));
        assert_eq!(prepared.trace.last_stage(), RunStage::Merged);
        assert!(!prepared.trace.reached(RunStage::Resolved));
        assert_eq!(fx.backend.call_count(), 0);
        assert_eq!(context_of(&prepared), Value::Null);
    }

    #[tokio::test]
    async fn test_no_target_still_sends_ambient() {
        let fx = fixture(FakeBackend::new());
        fx.router.ambient().set(AmbientContext::new("dashboard"));
        let prepared = fx.router.prepare("cuanto es el total", &[]).await.unwrap();

        assert_eq!(prepared.trace.early_exit, Some(EarlyExit::NoTarget));
        assert!(!prepared.trace.reached(RunStage::Guarded));
        assert_eq!(context_of(&prepared), json!({"screen": "dashboard"}));
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades() {
        let fx = fixture(FakeBackend::new().reject("/cashflow", 500));
        let reply = fx
            .router
            .handle("cuanto gasté en flujo de caja de 2023", &[])
            .await
            .unwrap();

        assert_eq!(reply.outcome.as_ref().map(|o| o.status()), Some("failed"));
        let sent = fx.assistant.requests.lock()[0].clone();
        let context = serde_json::to_value(&sent.context).unwrap();
        assert_eq!(context["externalFetch"]["status"], json!("failed"));
        assert!(context.get("externalData").is_none());
        assert_eq!(reply.trace.last_stage(), RunStage::Sent);
    }

    #[tokio::test]
    async fn test_forbidden_module_is_not_fetched() {
        let profile = SessionProfile {
            rol: Some("NORMAL".to_string()),
            permisos: json!({"reps": {"view": false}}).as_object().cloned(),
            ..Default::default()
        };
        let session = MemorySession::new()
            .with_auth(AuthHeaders::bearer("user-1", "tok"))
            .with_profile(profile);
        let fx = fixture_with(
            FakeBackend::new().respond("/cashflow", json!([])),
            FakeAssistant::default(),
            session,
        );

        let prepared = fx
            .router
            .prepare("cuanto gasté en flujo de caja de 2023", &[])
            .await
            .unwrap();

        let context = context_of(&prepared);
        assert_eq!(context["externalFetch"]["status"], json!("forbidden"));
        assert_eq!(context["externalFetch"]["permission"], json!("reps"));
        assert_eq!(context["rol"], json!("NORMAL"));
        assert_eq!(fx.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_history_window_and_module() {
        let fx = fixture(FakeBackend::new());
        fx.router.set_route(Some("/reporte-mensual/detalle?anio=2024".to_string()));
        let history: Vec<ConversationMessage> = (0..8)
            .map(|i| ConversationMessage::user(format!("mensaje {}", i)))
            .collect();

        let prepared = fx.router.prepare("hola", &history).await.unwrap();

        assert_eq!(prepared.request.history.len(), 6);
        assert_eq!(prepared.request.history[0].text, "mensaje 2");
        assert_eq!(prepared.request.module, "reporte-mensual");
        assert_eq!(
            context_of(&prepared),
            json!({"route": "/reporte-mensual/detalle?anio=2024"})
        );
    }

    #[tokio::test]
    async fn test_currency_preference_used() {
        let session = MemorySession::new()
            .with_auth(AuthHeaders::bearer("user-1", "tok"))
            .with_currency("USD");
        let fx = fixture_with(
            FakeBackend::new().respond("/cashflow", json!([])),
            FakeAssistant::default(),
            session,
        );
        let prepared = fx
            .router
            .prepare("flujo de caja 2024 total", &[])
            .await
            .unwrap();
        assert_eq!(prepared.trace.params.as_ref().map(|p| p.currency.as_str()), Some("USD"));
        let call = fx.backend.last_call().unwrap();
        assert!(call.query.contains(&("moneda".to_string(), "USD".to_string())));
    }

    #[tokio::test]
    async fn test_handle_returns_reply_links() {
        let fx = fixture(FakeBackend::new());
        let reply = fx.router.handle("hola", &[]).await.unwrap();
        assert_eq!(reply.reply.links().len(), 1);
        assert_eq!(fx.assistant.requests.lock()[0].module, "dashboard");
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let fx = fixture(FakeBackend::new());
        assert!(matches!(
            fx.router.handle("   ", &[]).await,
            Err(PipelineError::EmptyMessage)
        ));
        assert!(fx.assistant.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_assistant_failure_is_an_error() {
        let session = MemorySession::new();
        let assistant = FakeAssistant {
            fail: true,
            ..Default::default()
        };
        let fx = fixture_with(FakeBackend::new(), assistant, session);
        assert!(matches!(
            fx.router.handle("hola", &[]).await,
            Err(PipelineError::Assistant(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_handle_is_busy() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let assistant = FakeAssistant {
            gate: Some((entered.clone(), release.clone())),
            ..Default::default()
        };
        let fx = fixture_with(FakeBackend::new(), assistant, MemorySession::new());

        let router = fx.router.clone();
        let first = tokio::spawn(async move { router.handle("hola", &[]).await.map(|_| ()) });
        entered.notified().await;

        assert!(matches!(
            fx.router.handle("otra pregunta", &[]).await,
            Err(PipelineError::Busy)
        ));

        release.notify_one();
        assert!(first.await.unwrap().is_ok());
        // permit is back once the first run is done
        release.notify_one();
        assert!(fx.router.handle("de nuevo", &[]).await.is_ok());
    }

    #[test]
    fn test_module_from_route() {
        assert_eq!(module_from_route(Some("/flujo-de-caja"), "dashboard"), "flujo-de-caja");
        assert_eq!(module_from_route(Some("/carga/ingreso?x=1"), "dashboard"), "carga");
        assert_eq!(module_from_route(Some("/"), "dashboard"), "dashboard");
        assert_eq!(module_from_route(None, "dashboard"), "dashboard");
    }
}
