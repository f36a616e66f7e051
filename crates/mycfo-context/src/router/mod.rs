//! Message routing: normalization, intent gate, target resolution,
//! redundancy guard and period extraction. Everything here is pure.

mod catalog;
pub mod guard;
pub mod intent;
pub mod normalize;
pub mod params;
pub mod target;

pub use guard::is_redundant;
pub use intent::{classify, is_data_query, is_how_to, should_augment, IntentDecision};
pub use normalize::{normalize, NormalizedText};
pub use params::{extract_month, extract_params, extract_year};
pub use target::resolve_target;
