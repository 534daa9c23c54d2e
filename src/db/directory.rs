use std::fs;
use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;
use serde::Deserialize;

use super::queries;
use crate::models::Centre;

#[derive(Debug, Deserialize)]
pub struct DirectoryFile {
    pub centres: Vec<Centre>,
}

pub fn validate_centre(centre: &Centre) -> anyhow::Result<()> {
    anyhow::ensure!(!centre.name.trim().is_empty(), "centre {} has no name", centre.id);
    anyhow::ensure!(
        (0.0..=5.0).contains(&centre.average_rating),
        "centre {} rating {} is outside 0-5",
        centre.id,
        centre.average_rating
    );
    centre
        .operating_hours
        .validate()
        .with_context(|| format!("centre {} has invalid operating hours", centre.id))?;
    for service in &centre.services {
        service.check_pricing().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

/// Loads centres and their services into the store in one transaction.
/// Nothing is written if any record is invalid.
pub fn import_directory(conn: &mut Connection, directory: &DirectoryFile) -> anyhow::Result<usize> {
    for centre in &directory.centres {
        validate_centre(centre)?;
    }

    let tx = conn.transaction().context("failed to start directory import")?;
    for centre in &directory.centres {
        queries::upsert_centre(&tx, centre)
            .with_context(|| format!("failed to import centre {}", centre.id))?;
    }
    tx.commit().context("failed to commit directory import")?;

    Ok(directory.centres.len())
}

pub fn import_directory_file(conn: &mut Connection, path: &Path) -> anyhow::Result<usize> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read directory file: {}", path.display()))?;
    let directory: DirectoryFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse directory file: {}", path.display()))?;

    let count = import_directory(conn, &directory)?;
    tracing::info!(centres = count, path = %path.display(), "imported centre directory");
    Ok(count)
}
