pub mod ambient;
pub mod assistant;
pub mod config;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod pipeline;
pub mod router;
pub mod session;
pub mod types;

// Re-export primary types for convenience
pub use ambient::AmbientContextProvider;
pub use assistant::{AssistantBackend, AssistantReply, AssistantRequest, HttpAssistant, ReplyLink};
pub use config::AssistConfig;
pub use error::{ConfigError, FetchError, PipelineError};
pub use fetch::{BackendClient, FetchEnv, FetchOutcome, FetcherRegistry, HttpBackend, ScreenFetcher};
pub use merge::{merge, ContextPayload};
pub use pipeline::{
    module_from_route, AugmentationTrace, ContextRouter, EarlyExit, PreparedRequest, RouterReply, RunStage,
};
pub use router::{
    classify, extract_month, extract_params, extract_year, is_redundant, normalize,
    resolve_target, should_augment, IntentDecision, NormalizedText,
};
pub use session::{AuthHeaders, MemorySession, SessionProfile, SessionStore};
pub use types::{
    AmbientContext, ConversationMessage, ExtractedParams, Param, Screen, ScreenTarget, Sender,
};
