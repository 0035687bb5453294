use rusqlite::Connection;

use super::Migration;
use crate::error::Result;
use crate::storage::database::schema;

pub struct V2LastRevision;

impl Migration for V2LastRevision {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "last_revision view over the newest revision of every item"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        schema::create_last_revision_view(conn)
    }
}
