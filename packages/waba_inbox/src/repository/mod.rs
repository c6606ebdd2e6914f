// Repository layer — each domain lives in its own file with `impl InboxRepository`.
//
// Mutations of the watched domains (conversation metadata, contact labels,
// contacts, note inserts) publish on the change bus so live sessions refetch.

use sqlx::sqlite::SqlitePool;

use crate::bus::ChangeBus;

mod analytics;
mod canned;
mod contacts;
mod labels;
mod metadata;
mod notes;
mod settings;
mod users;

#[cfg(test)]
pub(crate) mod test_helpers;

#[derive(Clone)]
pub struct InboxRepository {
    pub(crate) pool: SqlitePool,
    pub(crate) bus: ChangeBus,
}

impl InboxRepository {
    pub fn new(pool: SqlitePool, bus: ChangeBus) -> Self {
        Self { pool, bus }
    }
}
