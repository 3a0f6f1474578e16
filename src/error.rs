//! Typed errors for schema resolution, hydration and translation persistence.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate entity type: {0}")]
    DuplicateEntity(String),
    #[error("duplicate relation: {entity}.{property}")]
    DuplicateRelation { entity: String, property: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("unknown relation path '{path}' on {entity}")]
    UnknownRelation { entity: String, path: String },
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Malformed field-selection text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unterminated {0}")]
    Unterminated(&'static str),
    #[error("unexpected end of selection")]
    UnexpectedEnd,
}

/// Errors raised by a store collaborator. Carried through hydration unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("query cancelled")]
    Cancelled,
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("store backend: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// A requested relation path or entity type has no metadata. Programming fault.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The primary-key lookup found nothing for an entity that exists in memory.
    #[error("consistency fault: {entity_type} with id {id} no longer exists")]
    Consistency { entity_type: String, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{entity_type} {id} has no translation")]
    MissingTranslation { entity_type: String, id: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl EngineError {
    /// Short machine-readable code, used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "configuration_error",
            EngineError::Consistency { .. } => "consistency_fault",
            EngineError::Store(StoreError::Timeout(_)) => "store_timeout",
            EngineError::Store(_) => "store_error",
            EngineError::MissingTranslation { .. } => "missing_translation",
            EngineError::Internal(_) => "internal_error",
        }
    }
}
