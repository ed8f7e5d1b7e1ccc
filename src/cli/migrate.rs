use anyhow::{Result, bail};

use crate::core::DatabaseConfig;
use crate::core::db::{async_db, migrate_db};

pub async fn run() -> Result<()> {
    let DatabaseConfig::Sqlite { path } = DatabaseConfig::from_env()? else {
        bail!("migrate only supports a local SQLite database");
    };

    println!("Migrating db...");
    let db = async_db(&path).await?;
    let applied = db.call(|conn| Ok(migrate_db(conn)?)).await?;
    println!("Finished migrating db, applied {} migrations", applied);

    Ok(())
}
