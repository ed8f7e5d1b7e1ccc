//! Local booking records and the stores that hold them

pub mod agenda;
pub mod models;
pub mod rest;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use anyhow::{Error, Result};

use crate::core::DatabaseConfig;
use crate::core::db::{async_db, migrate_db};

pub use agenda::{Agenda, partition_bookings};
pub use models::*;
pub use rest::RestStore;
pub use sqlite::SqliteStore;
pub use store::{AccountDirectory, BookingStore};

/// Both storage ports, backed by the same database.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountDirectory>,
    pub bookings: Arc<dyn BookingStore>,
}

/// Connect to the configured database. A local SQLite database is
/// migrated to the latest schema first.
pub async fn open_stores(config: &DatabaseConfig) -> Result<Stores, Error> {
    match config {
        DatabaseConfig::Sqlite { path } => {
            let db = async_db(path).await?;
            let applied = db.call(|conn| Ok(migrate_db(conn)?)).await?;
            if applied > 0 {
                tracing::info!("Applied {} migrations to {}", applied, path);
            }
            let store = Arc::new(SqliteStore::new(db));
            Ok(Stores {
                accounts: store.clone(),
                bookings: store,
            })
        }
        DatabaseConfig::Rest { url, service_key } => {
            let store = Arc::new(RestStore::new(url, service_key)?);
            Ok(Stores {
                accounts: store.clone(),
                bookings: store,
            })
        }
    }
}
