//! Port for user document persistence.

use async_trait::async_trait;

use crate::domain::{NotificationSettings, TaskId, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// The database could not be reached.
        Connection => "user repository connection failed",
        /// A query or mutation failed.
        Query => "user repository query failed",
        /// The write collides with an existing user.
        Conflict => "user already exists",
    }
}

/// Storage contract for [`User`] documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user document.
    async fn create(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Fetch a user by storage identity.
    async fn find(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Append `task` to the user's task references in a single write.
    ///
    /// Returns the updated user, or `None` when nothing was appended because
    /// the user does not exist or already references `task`.
    async fn add_task(
        &self,
        id: &UserId,
        task: TaskId,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Replace the notification toggles without touching task references.
    /// Returns `None` when the user does not exist.
    async fn update_notifications(
        &self,
        id: &UserId,
        settings: NotificationSettings,
    ) -> Result<Option<User>, UserRepositoryError>;
}
