use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;

use crate::webhook::{SIGNATURE_HEADER, SignatureVerifier};

pub fn run(file: &Path, secret: Option<String>) -> Result<()> {
    let secret = match secret {
        Some(secret) => secret,
        None => env::var("CAL_WEBHOOK_SECRET").context("Missing env var CAL_WEBHOOK_SECRET")?,
    };
    let payload =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    println!(
        "{}: {}",
        SIGNATURE_HEADER,
        SignatureVerifier::new(secret).sign(&payload)
    );
    Ok(())
}
