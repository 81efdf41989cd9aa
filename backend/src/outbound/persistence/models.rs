//! Row types mapping the `users` table.

use diesel::prelude::*;
use uuid::Uuid;

use super::schema::users;

#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub auth_id: Uuid,
    pub task_ids: Vec<Uuid>,
    pub notify_messages: bool,
    pub notify_comments: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub auth_id: Uuid,
    pub task_ids: &'a [Uuid],
    pub notify_messages: bool,
    pub notify_comments: bool,
}

#[derive(Debug, Clone, Copy, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct NotificationUpdate {
    pub notify_messages: bool,
    pub notify_comments: bool,
}
