//! Error types for geoprompt
//!
//! `CoreError` is the service-level error returned by every persistence and
//! orchestration operation. The pipeline components have their own
//! `thiserror` enums, which convert into `CoreError` at the service boundary.
//!
//! # Error Categories
//!
//! - **LlmError**: chat-completion transport and response failures
//! - **GeocodeError**: address lookup failures (always absorbed by the adapter)
//! - **JoinError**: CSV parsing and join-column problems
//!
//! # Examples
//!
//! ```rust
//! use geoprompt::errors::{CoreError, CoreErrorKind, JoinError};
//!
//! let err: CoreError = JoinError::MissingColumn("insee".to_string()).into();
//! assert_eq!(err.kind(), CoreErrorKind::Validation);
//! ```

pub mod core_error;
pub mod geocode;
pub mod join;
pub mod llm;

pub use core_error::{CoreError, CoreErrorKind};
pub use geocode::GeocodeError;
pub use join::JoinError;
pub use llm::LlmError;

/// Result type alias for service operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for join operations
pub type JoinResult<T> = Result<T, JoinError>;
