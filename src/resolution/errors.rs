//! Resolution errors

use thiserror::Error;

use crate::values::ValueKind;

/// Caller bugs: the engine was handed inputs that break its contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The record is local and cannot carry branch overrides.
    #[error("entity {id} is branch-local and cannot be overridden")]
    NotGeneral {
        /// Record id
        id: String,
    },

    /// The override belongs to a different record or branch.
    #[error("override for {override_entity} at {override_branch} does not belong to {entity} at {branch}")]
    OverrideMismatch {
        /// Record being resolved
        entity: String,

        /// Branch being resolved
        branch: String,

        /// Record the override points at
        override_entity: String,

        /// Branch the override belongs to
        override_branch: String,
    },
}

/// Why a value was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Value has the wrong kind for the field.
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        /// Kind the field requires
        expected: ValueKind,

        /// Kind that was supplied
        found: ValueKind,
    },

    /// Currency amount below zero.
    #[error("amount must not be negative")]
    NegativeAmount,

    /// Percentage outside `[0, 100]`.
    #[error("percentage must be between 0 and 100")]
    PercentageOutOfRange,

    /// NaN or infinite number.
    #[error("number must be finite")]
    NonFinite,

    /// Window end not after window start.
    #[error("end of the activation window must be after its start")]
    InvalidWindow,

    /// Field is not overridable for this entity kind.
    #[error("field cannot be overridden")]
    UnknownField,

    /// Value could not be read at all.
    #[error("malformed value: {0}")]
    Malformed(String),
}

/// A rejected field in an override update.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid `{field}`: {kind}")]
pub struct ValidationError {
    /// Wire name of the offending field
    pub field: String,

    /// What was wrong with it
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    /// Create a validation error for `field`.
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Errors from [`apply_override`](crate::resolution::apply_override).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverrideError {
    /// Contract violation by the caller.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// Rejected input; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
