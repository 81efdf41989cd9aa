//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.
//!
//! The repository reads the pool through a [`DatabaseHandle`], so queries
//! issued after a reconnect use the replacement pool automatically. Updates
//! are single statements so concurrent writers never overwrite each other's
//! task references.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{AuthId, NotificationSettings, TaskId, User, UserId};

use super::connector::DatabaseHandle;
use super::models::{NewUserRow, NotificationUpdate, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    database: DatabaseHandle<DbPool>,
}

impl DieselUserRepository {
    /// Create a repository reading the current pool from `database`.
    pub fn new(database: DatabaseHandle<DbPool>) -> Self {
        Self { database }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    UserRepositoryError::connection(error.to_string())
}

fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    debug!(error = %error, "diesel operation failed");
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserRepositoryError::connection("database connection closed")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            UserRepositoryError::conflict("user already exists")
        }
        _ => UserRepositoryError::query("database error"),
    }
}

const APPEND_TASK: &str = "UPDATE users \
     SET task_ids = array_append(task_ids, $1) \
     WHERE id = $2 AND NOT ($1 = ANY(task_ids)) \
     RETURNING id, auth_id, task_ids, notify_messages, notify_comments";

fn task_uuids(user: &User) -> Vec<Uuid> {
    user.tasks.iter().map(|task| *task.as_uuid()).collect()
}

fn row_to_user(row: UserRow) -> User {
    User {
        id: UserId::from_uuid(row.id),
        auth_id: AuthId::from_uuid(row.auth_id),
        tasks: row.task_ids.into_iter().map(TaskId::from_uuid).collect(),
        notifications: NotificationSettings {
            messages: row.notify_messages,
            comments: row.notify_comments,
        },
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, user: &User) -> Result<(), UserRepositoryError> {
        let pool = self.database.current();
        let mut conn = pool.get().await.map_err(map_pool_error)?;
        let task_ids = task_uuids(user);

        let row = NewUserRow {
            id: *user.id.as_uuid(),
            auth_id: *user.auth_id.as_uuid(),
            task_ids: &task_ids,
            notify_messages: user.notifications.messages,
            notify_comments: user.notifications.comments,
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let pool = self.database.current();
        let mut conn = pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_user))
    }

    async fn add_task(
        &self,
        id: &UserId,
        task: TaskId,
    ) -> Result<Option<User>, UserRepositoryError> {
        let pool = self.database.current();
        let mut conn = pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = diesel::sql_query(APPEND_TASK)
            .bind::<sql_types::Uuid, _>(*task.as_uuid())
            .bind::<sql_types::Uuid, _>(*id.as_uuid())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_user))
    }

    async fn update_notifications(
        &self,
        id: &UserId,
        settings: NotificationSettings,
    ) -> Result<Option<User>, UserRepositoryError> {
        let pool = self.database.current();
        let mut conn = pool.get().await.map_err(map_pool_error)?;

        let update = NotificationUpdate {
            notify_messages: settings.messages,
            notify_comments: settings.comments,
        };
        let row: Option<UserRow> = diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set(&update)
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn row_mapping_preserves_task_order_and_flags() {
        let tasks = vec![Uuid::new_v4(), Uuid::new_v4()];
        let row = UserRow {
            id: Uuid::new_v4(),
            auth_id: Uuid::new_v4(),
            task_ids: tasks.clone(),
            notify_messages: false,
            notify_comments: true,
        };

        let user = row_to_user(row.clone());

        assert_eq!(*user.id.as_uuid(), row.id);
        assert_eq!(*user.auth_id.as_uuid(), row.auth_id);
        assert_eq!(task_uuids(&user), tasks);
        assert!(!user.notifications.messages);
        assert!(user.notifications.comments);
    }

    #[rstest]
    fn closed_connection_maps_to_connection_error() {
        let error = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ClosedConnection,
            Box::new(String::from("closed")),
        );
        assert!(matches!(
            map_diesel_error(error),
            UserRepositoryError::Connection { .. }
        ));
    }

    #[rstest]
    fn pool_errors_map_to_connection_error() {
        let mapped = map_pool_error(PoolError::checkout("timed out"));
        assert!(mapped.to_string().contains("timed out"));
    }

    #[rstest]
    fn unique_violation_maps_to_conflict() {
        let error = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        );
        assert!(matches!(
            map_diesel_error(error),
            UserRepositoryError::Conflict { .. }
        ));
    }

    #[rstest]
    fn append_only_touches_unreferenced_tasks() {
        assert!(APPEND_TASK.contains("array_append(task_ids, $1)"));
        assert!(APPEND_TASK.contains("NOT ($1 = ANY(task_ids))"));
        assert!(!APPEND_TASK.contains("notify_messages ="));
    }
}
