//! Durable storage for named layouts: one pretty-printed JSON file per layout.

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::layout::Layout;
use crate::common::collections::HashSet;

const EXTENSION: &str = "json";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("layout name must not be empty")]
    InvalidName,
    #[error("layout is invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("layout store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("layout record {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("layout record {path} holds {found:?}, not {expected:?}")]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("failed to serialize layout: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io { path: path.to_path_buf(), source }
}

/// File key for a layout name.
///
/// Lowercase ASCII letters, digits, space, `-`, `_` and any `.` that is not
/// leading pass through. An uppercase ASCII letter becomes `^` and its lowercase
/// form, and every other byte becomes `%XX`. Distinct names never share a key,
/// even on a filesystem that ignores case.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, b) in name.bytes().enumerate() {
        let keep = b.is_ascii_lowercase()
            || b.is_ascii_digit()
            || matches!(b, b' ' | b'-' | b'_')
            || (b == b'.' && i > 0);
        if keep {
            out.push(b as char);
        } else if b.is_ascii_uppercase() {
            out.push('^');
            out.push(b.to_ascii_lowercase() as char);
        } else {
            let _ = write!(out, "%{b:02X}");
        }
    }
    out
}

pub struct LayoutStore {
    dir: PathBuf,
}

impl LayoutStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { LayoutStore { dir: dir.into() } }

    pub fn default_location() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("zonesnap"))
            .or_else(|| dirs::home_dir().map(|h| h.join(".zonesnap")))
            .unwrap_or_else(|| PathBuf::from(".zonesnap"))
            .join("layouts")
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{EXTENSION}", sanitize_name(name)))
    }

    /// Writes `layout`, replacing any record with the same name.
    pub fn save(&self, layout: &Layout) -> Result<PathBuf, StoreError> {
        if layout.name.trim().is_empty() {
            return Err(StoreError::InvalidName);
        }
        let issues = layout.validate();
        if !issues.is_empty() {
            return Err(StoreError::Invalid(issues));
        }

        fs::create_dir_all(&self.dir).map_err(io_err(&self.dir))?;
        let path = self.record_path(&layout.name);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let body = serde_json::to_string_pretty(layout)?;
        fs::write(&tmp, body).map_err(io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err(&path)(e)
        })?;
        debug!(name = %layout.name, ?path, "saved layout");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<Option<Layout>, StoreError> {
        let path = self.record_path(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path)(e)),
        };
        let layout: Layout = serde_json::from_str(&text)
            .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;
        if layout.name != name {
            return Err(StoreError::NameMismatch {
                path,
                expected: name.to_string(),
                found: layout.name,
            });
        }
        Ok(Some(layout))
    }

    /// Every readable record, sorted by file name. Bad records are skipped with a warning.
    pub fn load_all(&self) -> Vec<Layout> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Cannot read layout store {:?}: {e}", self.dir);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == EXTENSION))
            .collect();
        paths.sort();

        let mut seen = HashSet::default();
        let mut layouts = Vec::with_capacity(paths.len());
        for path in paths {
            match read_record(&path) {
                Ok(layout) => {
                    if !seen.insert(layout.name.clone()) {
                        warn!("Skipping {path:?}: duplicate layout name {:?}", layout.name);
                        continue;
                    }
                    layouts.push(layout);
                }
                Err(e) => warn!("Skipping layout record: {e}"),
            }
        }
        layouts
    }

    /// Removes the record for `name`. Returns whether anything was removed.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(name, ?path, "deleted layout");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&path)(e)),
        }
    }
}

fn read_record(path: &Path) -> Result<Layout, StoreError> {
    let text = fs::read_to_string(path).map_err(io_err(path))?;
    let layout: Layout = serde_json::from_str(&text)
        .map_err(|source| StoreError::Corrupt { path: path.to_path_buf(), source })?;
    let issues = layout.validate();
    if !issues.is_empty() {
        return Err(StoreError::Invalid(issues));
    }
    Ok(layout)
}
