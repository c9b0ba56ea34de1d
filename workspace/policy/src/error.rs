use thiserror::Error;
use validator::ValidationErrors;

use crate::permissions::{Action, Resource};

/// Error types for the policy layer
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The actor's role does not allow the action on this kind of resource
    #[error("You do not have permission to {action} {resource}")]
    Forbidden { action: Action, resource: Resource },

    /// The row does not exist or lies outside the actor's visibility
    #[error("{0} not found")]
    NotFound(Resource),

    /// Field-keyed validation failures, collected together
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The row still has dependents that must not be cascaded
    #[error("Referential violation: {0}")]
    Referential(String),
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
