// Trace module - PROVENANCE
// Backward label resolution and amount-conserving flow tracing

mod flow;
mod origin;

pub use flow::{FlowAttribution, FlowTracer, LabelFlow};
pub use origin::{resolve_origin, TracedOrigin, DEFAULT_MAX_DEPTH};
