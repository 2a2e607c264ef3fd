//! Errors raised while linking declarations.

use crate::model::TypeNode;
use crate::transition::TransitionKind;

/// Generation-time failure.
///
/// [`UnsupportedType`](JniError::UnsupportedType) and
/// [`UnsupportedScenario`](JniError::UnsupportedScenario) only cost the
/// declaration being linked; [`IncompleteLinkage`](JniError::IncompleteLinkage)
/// is a generator defect and aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JniError {
    #[error("type `{ty}` has no boundary representation")]
    UnsupportedType { ty: String },

    #[error("{0}")]
    UnsupportedScenario(String),

    #[error("incomplete linkage: {0}")]
    IncompleteLinkage(String),
}

impl JniError {
    pub fn unsupported_type(ty: &TypeNode) -> Self {
        JniError::UnsupportedType {
            ty: ty.spelling().to_string(),
        }
    }

    pub fn scenario(message: impl Into<String>) -> Self {
        JniError::UnsupportedScenario(message.into())
    }

    /// An action was asked for an edge it has no expression for.
    pub fn unsupported_edge(action: &str, edge: TransitionKind, verb: &str) -> Self {
        JniError::UnsupportedScenario(format!("{action} cannot {verb} a value on the {edge} edge"))
    }

    pub fn incomplete(message: impl Into<String>) -> Self {
        JniError::IncompleteLinkage(message.into())
    }

    /// Whether the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, JniError::IncompleteLinkage(_))
    }
}
