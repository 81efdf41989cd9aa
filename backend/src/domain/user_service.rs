//! User document use-cases.
//!
//! Users are created on registration, gain task references over time and
//! toggle their notification flags. Flag changes are pushed to connected
//! clients through the [`NotificationPublisher`] port; delivery failures are
//! logged and never fail the update.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{NotificationPublisher, UserRepository, UserRepositoryError};
use crate::domain::{AppError, NotificationSettings, RealtimeEvent, TaskId, User, UserId};

/// Event name published after notification toggles change.
pub const NOTIFICATIONS_UPDATED_EVENT: &str = "user.notifications.updated";

/// Failures surfaced by [`UserService`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserServiceError {
    /// The user does not exist.
    #[error("user {0} not found")]
    NotFound(UserId),
    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] UserRepositoryError),
}

impl From<UserServiceError> for AppError {
    fn from(value: UserServiceError) -> Self {
        match value {
            UserServiceError::NotFound(id) => Self::not_found(format!("user {id} not found")),
            UserServiceError::Repository(UserRepositoryError::Conflict { message }) => {
                Self::conflict(message)
            }
            UserServiceError::Repository(UserRepositoryError::Connection { .. }) => {
                Self::service_unavailable("database unavailable")
            }
            UserServiceError::Repository(error) => Self::internal(error.to_string()),
        }
    }
}

/// Application service for user documents.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    notifier: Arc<dyn NotificationPublisher>,
}

impl UserService {
    /// Build the service from explicit port implementations.
    pub fn new(
        repository: Arc<dyn UserRepository>,
        notifier: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Persist a newly registered user.
    pub async fn add_user_data(&self, user: &User) -> Result<(), UserServiceError> {
        self.repository.create(user).await?;
        info!(user_id = %user.id, auth_id = %user.auth_id, "user created");
        Ok(())
    }

    /// Fetch a user, failing when it does not exist.
    pub async fn find(&self, id: &UserId) -> Result<User, UserServiceError> {
        self.repository
            .find(id)
            .await?
            .ok_or(UserServiceError::NotFound(*id))
    }

    /// Reference a task from the user. Already referenced tasks are left as is.
    ///
    /// The append happens in the repository so concurrent calls for the same
    /// user cannot drop each other's references.
    pub async fn add_task(&self, id: &UserId, task: TaskId) -> Result<User, UserServiceError> {
        if let Some(user) = self.repository.add_task(id, task).await? {
            info!(user_id = %id, task_id = %task, "task referenced");
            return Ok(user);
        }
        // Nothing appended: either the task is already referenced or the user
        // is missing.
        self.find(id).await
    }

    /// Replace the user's notification toggles and notify connected clients.
    pub async fn update_notifications(
        &self,
        id: &UserId,
        settings: NotificationSettings,
    ) -> Result<User, UserServiceError> {
        let user = self
            .repository
            .update_notifications(id, settings)
            .await?
            .ok_or(UserServiceError::NotFound(*id))?;

        let event = RealtimeEvent::new(
            NOTIFICATIONS_UPDATED_EVENT,
            json!({ "userId": user.id, "notifications": user.notifications }),
        );
        if let Err(error) = self.notifier.publish(event).await {
            warn!(user_id = %user.id, %error, "failed to publish notification update");
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthId;
    use crate::domain::ports::{
        MockNotificationPublisher, MockUserRepository, NoOpNotificationPublisher,
        NotificationPublisherError,
    };
    use mockall::predicate::eq;
    use rstest::rstest;

    fn service(repository: MockUserRepository, notifier: MockNotificationPublisher) -> UserService {
        UserService::new(Arc::new(repository), Arc::new(notifier))
    }

    fn stored_user() -> User {
        User::new(AuthId::random())
    }

    #[rstest]
    #[tokio::test]
    async fn add_user_data_creates_document() {
        let user = stored_user();
        let mut repository = MockUserRepository::new();
        repository
            .expect_create()
            .with(eq(user.clone()))
            .times(1)
            .returning(|_| Ok(()));

        let svc = UserService::new(Arc::new(repository), Arc::new(NoOpNotificationPublisher));
        svc.add_user_data(&user).await.expect("create succeeds");
    }

    #[rstest]
    #[tokio::test]
    async fn add_task_returns_the_appended_user() {
        let mut user = stored_user();
        let task = TaskId::random();
        let id = user.id;
        user.add_task(task);
        let appended = user.clone();

        let mut repository = MockUserRepository::new();
        repository
            .expect_add_task()
            .with(eq(id), eq(task))
            .times(1)
            .returning(move |_, _| Ok(Some(appended.clone())));
        repository.expect_find().times(0);

        let svc = service(repository, MockNotificationPublisher::new());
        let updated = svc.add_task(&id, task).await.expect("add task");
        assert_eq!(updated.tasks, vec![task]);
    }

    #[rstest]
    #[tokio::test]
    async fn add_task_for_known_reference_returns_stored_user() {
        let mut user = stored_user();
        let task = TaskId::random();
        user.add_task(task);
        let found = user.clone();

        let mut repository = MockUserRepository::new();
        repository
            .expect_add_task()
            .times(1)
            .returning(|_, _| Ok(None));
        repository
            .expect_find()
            .times(1)
            .returning(move |_| Ok(Some(found.clone())));

        let svc = service(repository, MockNotificationPublisher::new());
        let updated = svc.add_task(&user.id, task).await.expect("add task");
        assert_eq!(updated.tasks, vec![task]);
    }

    #[rstest]
    #[tokio::test]
    async fn add_task_for_unknown_user_is_not_found() {
        let mut repository = MockUserRepository::new();
        repository.expect_add_task().returning(|_, _| Ok(None));
        repository.expect_find().returning(|_| Ok(None));

        let svc = service(repository, MockNotificationPublisher::new());
        let id = UserId::random();
        let error = svc
            .add_task(&id, TaskId::random())
            .await
            .expect_err("user is missing");

        assert_eq!(error, UserServiceError::NotFound(id));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_user_maps_to_not_found() {
        let mut repository = MockUserRepository::new();
        repository.expect_find().returning(|_| Ok(None));

        let svc = service(repository, MockNotificationPublisher::new());
        let id = UserId::random();
        let error = svc.find(&id).await.expect_err("user is missing");

        assert_eq!(error, UserServiceError::NotFound(id));
        assert_eq!(AppError::from(error).status_code(), 404);
    }

    #[rstest]
    #[tokio::test]
    async fn update_notifications_publishes_event_and_tolerates_delivery_failure() {
        let user = stored_user();
        let settings = NotificationSettings {
            messages: false,
            comments: true,
        };
        let mut updated_user = user.clone();
        updated_user.notifications = settings;
        let mut repository = MockUserRepository::new();
        repository
            .expect_update_notifications()
            .with(eq(user.id), eq(settings))
            .times(1)
            .returning(move |_, _| Ok(Some(updated_user.clone())));

        let mut notifier = MockNotificationPublisher::new();
        notifier
            .expect_publish()
            .withf(|event| event.event == NOTIFICATIONS_UPDATED_EVENT)
            .times(1)
            .returning(|_| Err(NotificationPublisherError::delivery("offline")));

        let svc = service(repository, notifier);
        let updated = svc
            .update_notifications(&user.id, settings)
            .await
            .expect("update succeeds despite delivery failure");
        assert_eq!(updated.notifications, settings);
    }

    #[rstest]
    #[tokio::test]
    async fn update_notifications_for_unknown_user_is_not_found() {
        let mut repository = MockUserRepository::new();
        repository
            .expect_update_notifications()
            .returning(|_, _| Ok(None));
        let mut notifier = MockNotificationPublisher::new();
        notifier.expect_publish().times(0);

        let svc = service(repository, notifier);
        let id = UserId::random();
        let error = svc
            .update_notifications(&id, NotificationSettings::default())
            .await
            .expect_err("user is missing");

        assert_eq!(error, UserServiceError::NotFound(id));
    }

    #[rstest]
    #[case(UserRepositoryError::connection("down"), 503)]
    #[case(UserRepositoryError::query("syntax"), 500)]
    #[case(UserRepositoryError::conflict("duplicate"), 409)]
    fn repository_errors_map_into_taxonomy(#[case] error: UserRepositoryError, #[case] code: u16) {
        let mapped = AppError::from(UserServiceError::from(error));
        assert_eq!(mapped.status_code(), code);
    }
}
