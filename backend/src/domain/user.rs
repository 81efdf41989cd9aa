//! User document model.
//!
//! A user links an authentication identity to the tasks it owns and carries
//! two notification toggles. Authentication data itself lives elsewhere; the
//! user only keeps the reference.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_reference {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_reference! {
    /// Storage identity of a user document.
    UserId
}

uuid_reference! {
    /// Reference to the authentication identity backing a user.
    AuthId
}

uuid_reference! {
    /// Reference to a task owned by a user.
    TaskId
}

/// Notification toggles. Both default to enabled.
///
/// # Examples
/// ```
/// use todo_backend::domain::NotificationSettings;
///
/// let settings: NotificationSettings = serde_json::from_str("{}").unwrap();
/// assert!(settings.messages && settings.comments);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Notify on new messages.
    pub messages: bool,
    /// Notify on new comments.
    pub comments: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            messages: true,
            comments: true,
        }
    }
}

/// Persisted user document.
///
/// ## Invariants
/// - `auth_id` is always present.
/// - `tasks` holds each task reference at most once; [`User::add_task`]
///   maintains this, storage does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Storage identity.
    pub id: UserId,
    /// Authentication identity reference.
    pub auth_id: AuthId,
    /// Owned task references.
    #[serde(default)]
    pub tasks: Vec<TaskId>,
    /// Notification toggles.
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl User {
    /// Create a user for a freshly registered authentication identity.
    ///
    /// # Examples
    /// ```
    /// use todo_backend::domain::{AuthId, User};
    ///
    /// let user = User::new(AuthId::random());
    /// assert!(user.tasks.is_empty());
    /// assert!(user.notifications.messages);
    /// assert!(user.notifications.comments);
    /// ```
    pub fn new(auth_id: AuthId) -> Self {
        Self {
            id: UserId::random(),
            auth_id,
            tasks: Vec::new(),
            notifications: NotificationSettings::default(),
        }
    }

    /// Whether the task is already referenced.
    pub fn references_task(&self, task: TaskId) -> bool {
        self.tasks.contains(&task)
    }

    /// Append a task reference; returns `false` when it was already present.
    pub fn add_task(&mut self, task: TaskId) -> bool {
        if self.references_task(task) {
            return false;
        }
        self.tasks.push(task);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn missing_notification_flags_default_to_enabled() {
        let user: User = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "authId": Uuid::nil(),
        }))
        .expect("deserialise user");

        assert!(user.notifications.messages);
        assert!(user.notifications.comments);
        assert!(user.tasks.is_empty());
    }

    #[rstest]
    fn partially_specified_notifications_keep_defaults() {
        let user: User = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "authId": Uuid::nil(),
            "notifications": {"comments": false},
        }))
        .expect("deserialise user");

        assert!(user.notifications.messages);
        assert!(!user.notifications.comments);
    }

    #[rstest]
    fn serialises_document_shape() {
        let mut user = User::new(AuthId::from_uuid(Uuid::nil()));
        user.id = UserId::from_uuid(Uuid::nil());
        let value = serde_json::to_value(&user).expect("serialise user");

        assert_eq!(
            value,
            json!({
                "id": Uuid::nil(),
                "authId": Uuid::nil(),
                "tasks": [],
                "notifications": {"messages": true, "comments": true},
            })
        );
    }

    #[rstest]
    fn add_task_keeps_references_unique() {
        let mut user = User::new(AuthId::random());
        let task = TaskId::random();

        assert!(user.add_task(task));
        assert!(!user.add_task(task));
        assert_eq!(user.tasks, vec![task]);
    }
}
