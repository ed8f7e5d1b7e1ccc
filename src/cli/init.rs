use anyhow::{Result, bail};
use std::fs;
use std::path::Path;

use crate::core::DatabaseConfig;
use crate::core::db::{async_db, initialize_db};

pub async fn run() -> Result<()> {
    let DatabaseConfig::Sqlite { path } = DatabaseConfig::from_env()? else {
        bail!("init only supports a local SQLite database");
    };

    println!("Initializing db at {}...", path);
    if let Some(parent) = Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let db = async_db(&path).await?;
    db.call(|conn| Ok(initialize_db(conn)?)).await?;
    println!("Finished initializing db");

    Ok(())
}
