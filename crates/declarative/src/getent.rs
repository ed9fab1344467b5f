//! Lookups in colon-delimited identity databases (`/etc/group`, `/etc/passwd`)

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Return the fields of the first record accepted by `matches`.
///
/// `Ok(None)` means the database was readable but holds no such record.
pub fn lookup<F>(database: &Path, mut matches: F) -> Result<Option<Vec<String>>>
where
    F: FnMut(&[String]) -> bool,
{
    let content = read_database(database)?;
    let found = records(&content).find(|fields| matches(fields));
    log::trace!(
        "getent {}: {}",
        database.display(),
        if found.is_some() { "hit" } else { "miss" }
    );
    Ok(found)
}

/// Return the fields of every record accepted by `matches`, in file order.
pub fn scan<F>(database: &Path, mut matches: F) -> Result<Vec<Vec<String>>>
where
    F: FnMut(&[String]) -> bool,
{
    let content = read_database(database)?;
    Ok(records(&content).filter(|fields| matches(fields)).collect())
}

fn read_database(database: &Path) -> Result<String> {
    fs::read_to_string(database).map_err(|e| Error::io(database, e))
}

fn records(content: &str) -> impl Iterator<Item = Vec<String>> + '_ {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(':').map(str::to_string).collect())
}
