//! Error types for authorization operations
//!
//! This module defines every error the authorization core can raise while
//! building a decision. None of them escape [`Authorizer::authorize`]: the
//! engine converts them into a deny with reason `authorization_error` and
//! keeps the detail in the audit record.
//!
//! [`Authorizer::authorize`]: crate::engine::Authorizer::authorize

use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditError;
use crate::cache::CacheError;
use crate::config::ConfigError;

/// Authorization error types.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Role is not registered
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Role definition was rejected by the registry
    #[error("Invalid role definition for {role}: {message}")]
    InvalidRole {
        /// Role name.
        role: String,
        /// Why the definition was rejected.
        message: String,
    },

    /// Assignment, membership or subject data could not be read
    #[error("Failed to resolve assignments for subject {subject_id}: {message}")]
    AssignmentResolution {
        /// Subject being resolved.
        subject_id: Uuid,
        /// Underlying failure.
        message: String,
    },

    /// Resource context is missing data its scope requires
    #[error("Malformed resource context for {resource_id}: {message}")]
    BoundaryEvaluation {
        /// Resource being evaluated.
        resource_id: Uuid,
        /// What is missing or inconsistent.
        message: String,
    },

    /// Permission cache failure
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Audit sink failure
    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

impl AuthzError {
    /// Whether this error must fail the request closed.
    ///
    /// Cache, audit and configuration errors are raised outside the decision path
    /// and never decide an outcome on their own.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AuthzError::UnknownRole(_)
                | AuthzError::InvalidRole { .. }
                | AuthzError::AssignmentResolution { .. }
                | AuthzError::BoundaryEvaluation { .. }
        )
    }

    /// Get error code for audit records.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthzError::UnknownRole(_) => "UNKNOWN_ROLE",
            AuthzError::InvalidRole { .. } => "INVALID_ROLE",
            AuthzError::AssignmentResolution { .. } => "ASSIGNMENT_RESOLUTION",
            AuthzError::BoundaryEvaluation { .. } => "BOUNDARY_EVALUATION",
            AuthzError::Cache(_) => "CACHE_ERROR",
            AuthzError::Audit(_) => "AUDIT_ERROR",
            AuthzError::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AuthzError::UnknownRole("GHOST".into()).is_fatal());
        assert!(AuthzError::AssignmentResolution {
            subject_id: Uuid::now_v7(),
            message: "connection refused".into(),
        }
        .is_fatal());
        assert!(!AuthzError::Cache(CacheError::Unavailable("down".into())).is_fatal());
    }

    #[test]
    fn test_error_codes() {
        let err = AuthzError::BoundaryEvaluation {
            resource_id: Uuid::now_v7(),
            message: "local resource without team".into(),
        };
        assert_eq!(err.error_code(), "BOUNDARY_EVALUATION");
        assert!(err.to_string().contains("local resource without team"));
    }
}
