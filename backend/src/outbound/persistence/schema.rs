//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly.

diesel::table! {
    /// User documents.
    ///
    /// `task_ids` holds task references in insertion order; uniqueness is
    /// maintained by the service layer, not by a constraint.
    users (id) {
        id -> Uuid,
        auth_id -> Uuid,
        task_ids -> Array<Uuid>,
        notify_messages -> Bool,
        notify_comments -> Bool,
        created_at -> Timestamptz,
    }
}
