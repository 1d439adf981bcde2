//! Unified error type for the grant ledger.
//!
//! Validation and authorization failures are raised before any database or
//! network call. Remote failures wrap the underlying client error.

use crate::entities::Role;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic input validation failure, shown inline
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Amount is not a finite number in the accepted range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Disbursement would overshoot the grant's approved amount
    #[error("Amount cannot exceed remaining balance of {remaining:.2}")]
    ExceedsRemainingBalance {
        /// The rejected amount
        amount: f64,
        /// Remaining balance at validation time
        remaining: f64,
    },

    /// Grant year outside 1900-2100
    #[error("Year {year} is outside the accepted range 1900-2100")]
    InvalidYear {
        /// The rejected year
        year: i32,
    },

    /// Grant year already exists
    #[error("Grant year {year} already exists")]
    DuplicateYear {
        /// The duplicated year
        year: i32,
    },

    /// A profile with this email already exists
    #[error("A team member with email {email} already exists")]
    DuplicateEmail {
        /// The duplicated email
        email: String,
    },

    /// Operation needs an `active` profile
    #[error("{email} has not completed registration")]
    InactiveProfile {
        /// Email of the target profile
        email: String,
    },

    /// Deletion attempted without a reason
    #[error("A deletion reason is required")]
    MissingReason,

    /// Actor tried to change their own role
    #[error("You cannot change your own role")]
    SelfRoleChange,

    /// No authentication context is present
    #[error("Not signed in")]
    NotSignedIn,

    /// Role does not permit the requested action
    #[error("Role {role} is not permitted to {action}")]
    Forbidden {
        /// Action that was refused
        action: &'static str,
        /// Role of the actor
        role: Role,
    },

    /// Row not found
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// Delete blocked by a foreign-key reference
    #[error("Failed to delete {entity} {id}. It might be in use.")]
    InUse {
        /// Kind of row
        entity: &'static str,
        /// Requested id
        id: String,
    },

    /// Identity provider rejected or failed an admin call
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// A privileged function returned an error response
    #[error("{function} failed ({status}): {message}")]
    Function {
        /// Function name
        function: String,
        /// HTTP status returned
        status: u16,
        /// Error message from the response body
        message: String,
    },
}

impl Error {
    /// Classifies a failed delete, turning foreign-key violations into
    /// [`Error::InUse`].
    pub fn from_delete(entity: &'static str, id: impl ToString, err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::InUse {
                entity,
                id: id.to_string(),
            },
            _ => Self::Database(err),
        }
    }

    /// Whether this error was raised before touching the database or network.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::InvalidAmount { .. }
                | Self::ExceedsRemainingBalance { .. }
                | Self::InvalidYear { .. }
                | Self::MissingReason
                | Self::SelfRoleChange
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
