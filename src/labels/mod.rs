// Labels module - WHO IS WHO
// Address labeling with explicit custodial boundaries

mod registry;

pub use registry::{Label, LabelRegistry};
