//! Domain primitives, services and ports.
//!
//! Purpose: keep the application vocabulary (users, notification events and
//! the error taxonomy) free of transport and storage concerns. Inbound
//! adapters translate these types to HTTP or WebSocket payloads; outbound
//! adapters persist or publish them.

pub mod error;
pub mod ports;
pub mod realtime;
pub mod user;
pub mod user_service;

pub use self::error::{AppError, ErrorResponse, NotFoundResponse};
pub use self::realtime::{Envelope, NodeId, RealtimeEvent};
pub use self::user::{AuthId, NotificationSettings, TaskId, User, UserId};
pub use self::user_service::{UserService, UserServiceError};

/// Convenient result alias for handlers returning taxonomy errors.
///
/// # Examples
/// ```
/// use todo_backend::domain::{AppError, AppResult};
///
/// fn handler() -> AppResult<()> {
///     Err(AppError::forbidden("nope"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type AppResult<T> = Result<T, AppError>;
