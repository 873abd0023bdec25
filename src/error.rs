use thiserror::Error;

use crate::model::Component;

/// Fatal configuration-class errors. Data-quality problems (bad records,
/// missing joins, degenerate statistics) degrade locally instead and never
/// surface through this type.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("invalid ablation target {target} for ensemble {ensemble}")]
    Ablation {
        target: Component,
        ensemble: Component,
    },

    #[error("unsupported weighting mode '{0}'")]
    Weighting(String),
}
