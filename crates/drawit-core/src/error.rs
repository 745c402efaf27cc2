//! Error types for diagram editing.

use crate::model::{EntityId, EntityKind};
use thiserror::Error;

/// Errors surfaced by structural edits, entity changes and layer rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiagramError {
    /// A record references an entity that does not exist, or an id collides
    /// with one already in use.
    #[error("Integrity error: {kind} {id}: {reason}")]
    Integrity {
        kind: EntityKind,
        id: EntityId,
        reason: String,
    },
    /// No renderer was supplied for an entity type found in the model.
    #[error("No renderer registered for type '{entity_type}' (entity {id})")]
    UnregisteredType { entity_type: String, id: EntityId },
    /// Caller input has the wrong shape or out-of-range values.
    #[error("Invalid {subject} input: {reason}")]
    Validation {
        subject: &'static str,
        reason: String,
    },
}

impl DiagramError {
    pub(crate) fn integrity(kind: EntityKind, id: EntityId, reason: impl Into<String>) -> Self {
        Self::Integrity {
            kind,
            id,
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(subject: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            subject,
            reason: reason.into(),
        }
    }
}

/// Result type for diagram operations.
pub type DiagramResult<T> = Result<T, DiagramError>;
