//! JSON-lines persistence of batch records.

use crate::error::Result;
use cikmap_domain::BatchRecord;
use cikmap_pipeline::dedup;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load a batch file. A missing file is an empty batch.
///
/// Malformed lines are skipped with a warning. After an interrupted run a key
/// may appear more than once; merging keeps the last line.
pub fn load(path: &Path) -> Result<Vec<BatchRecord>> {
    if !path.exists() {
        debug!("No existing batch at {}", path.display());
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<BatchRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                "Skipping malformed line {} of {}: {}",
                number + 1,
                path.display(),
                e
            ),
        }
    }

    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Load and concatenate several batch files, collapsing duplicate keys.
///
/// A later file wins over an earlier one for the same item key.
pub fn load_all(paths: &[impl AsRef<Path>]) -> Result<Vec<BatchRecord>> {
    let mut records = Vec::new();
    for path in paths {
        records.extend(load(path.as_ref())?);
    }
    Ok(dedup(records))
}

/// Write a batch file atomically (temporary file, then rename).
pub fn save(path: &Path, records: &[BatchRecord]) -> Result<()> {
    save_lines(path, records)
}

/// Write any serializable rows as JSON lines, atomically.
pub fn save_lines<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, path)?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Append records to a batch file, creating it when missing.
///
/// The file may then hold a key twice; loaders keep the last line for a key.
pub fn append(path: &Path, records: &[BatchRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    writer.get_ref().sync_data()?;

    debug!("Appended {} records to {}", records.len(), path.display());
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
