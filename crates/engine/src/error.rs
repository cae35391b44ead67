//! The module contains the errors the engine can throw.
//!
//! The errors fall in three families:
//!
//! - input errors: [`Validation`], [`SelfExchange`], [`DuplicateProposal`],
//!   [`InvalidTransition`], [`ExistingKey`];
//! - authority errors: [`Forbidden`], [`Unauthorized`];
//! - lookup and storage errors: [`KeyNotFound`], [`Database`].
//!
//! None of them leaves a partial write behind: every mutating operation runs
//! inside one database transaction that is dropped (rolled back) on error.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`SelfExchange`]: EngineError::SelfExchange
//!  [`DuplicateProposal`]: EngineError::DuplicateProposal
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Unauthorized`]: EngineError::Unauthorized
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Self exchange: {0}")]
    SelfExchange(String),
    #[error("Duplicate proposal: {0}")]
    DuplicateProposal(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::SelfExchange(a), Self::SelfExchange(b)) => a == b,
            (Self::DuplicateProposal(a), Self::DuplicateProposal(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
