use anyhow::{Result, bail};

use crate::bookings::{Account, SqliteStore};
use crate::core::DatabaseConfig;
use crate::core::db::async_db;

pub async fn run(email: String, name: Option<String>, id: Option<String>) -> Result<()> {
    let DatabaseConfig::Sqlite { path } = DatabaseConfig::from_env()? else {
        bail!("Accounts on the hosted database are created by signing up");
    };

    let store = SqliteStore::new(async_db(&path).await?);
    let account = Account {
        id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        email,
        full_name: name,
    };
    let id = account.id.clone();
    store.register_account(account).await?;
    println!("Registered account {}", id);

    Ok(())
}
