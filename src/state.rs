//! Shared application state for all routes.

use crate::schema::Schema;
use crate::service::RecordService;
use crate::store::Database;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct AppState {
    pub records: RecordService,
}

impl AppState {
    pub fn new(db: Database, schema: Arc<Schema>) -> Self {
        AppState {
            records: RecordService::new(db, schema),
        }
    }

    pub fn db(&self) -> &Database {
        self.records.database()
    }

    pub fn schema(&self) -> &Schema {
        self.records.schema()
    }
}
