//! Plan domain
//!
//! The document model, the normalization pipeline, and the deterministic
//! fallback synthesizer - every code path that produces a plan goes
//! through the types in this module and honors the same invariants.

mod document;
mod fallback;
mod normalize;

pub use document::{Phase, PlanDocument, PlanMode, PlanRequest, Step};
pub use fallback::{fallback_phases, synthesize_fallback};
pub use normalize::{Normalizer, ParseFailurePolicy, UnparseableResponse};
