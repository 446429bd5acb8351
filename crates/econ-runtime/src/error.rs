use econ_calc::CalcError;
use econ_core::ConfigurationError;
use thiserror::Error;

/// Per-well or per-group evaluation failure. Never aborts sibling evaluations.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("group '{group}' references unknown well '{well}'")]
    UnknownWell { group: String, well: String },
    #[error("group '{0}' has no member wells")]
    EmptyGroup(String),
    #[error("member well '{0}' failed to evaluate")]
    MemberFailed(String),
}
