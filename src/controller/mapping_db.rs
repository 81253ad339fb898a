//! SDL controller mapping database
//!
//! The file format is owned by SDL: one device per line,
//! `GUID,name,key:value,...`, optionally tagged with `platform:<name>`.
//! This loader only splits lines far enough to index them by GUID and to
//! drop entries meant for other platforms; the entries themselves are handed
//! to gilrs untouched.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MappingDbError {
    #[error("Failed to read mapping database {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappingEntry {
    /// Lowercase GUID
    pub guid: String,
    pub name: String,
    pub platform: Option<String>,
    /// The line as it appeared in the file
    pub line: String,
}

#[derive(Debug, Clone, Default)]
pub struct MappingDatabase {
    entries: HashMap<String, MappingEntry>,
    skipped: usize,
    other_platform: usize,
}

impl MappingDatabase {
    /// Reads the database at `path`
    ///
    /// A missing file is not an error: the tool still runs on whatever
    /// mappings the backend ships with.
    pub fn load(path: &Path, platform: &str) -> Result<Self, MappingDbError> {
        if !path.exists() {
            warn!(
                "Mapping database {} not found, continuing without extra mappings",
                path.display()
            );
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| MappingDbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::parse(&content, platform);
        info!(
            "Loaded {} mappings from {} ({} malformed, {} for other platforms)",
            db.len(),
            path.display(),
            db.skipped,
            db.other_platform
        );
        Ok(db)
    }

    pub fn parse(content: &str, platform: &str) -> Self {
        let mut db = Self::default();

        for (number, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(entry) = parse_line(line) else {
                debug!("Skipping malformed mapping on line {}", number + 1);
                db.skipped += 1;
                continue;
            };

            if let Some(entry_platform) = &entry.platform {
                if !entry_platform.eq_ignore_ascii_case(platform) {
                    db.other_platform += 1;
                    continue;
                }
            }

            // Later lines win, same as SDL
            db.entries.insert(entry.guid.clone(), entry);
        }

        db
    }

    pub fn get(&self, guid: &str) -> Option<&MappingEntry> {
        self.entries.get(&guid.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// All accepted entries, one per line, in the form gilrs consumes
    pub fn to_sdl_mappings(&self) -> String {
        let mut lines: Vec<&str> = self.entries.values().map(|e| e.line.as_str()).collect();
        lines.sort_unstable();
        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

fn parse_line(line: &str) -> Option<MappingEntry> {
    let mut fields = line.split(',');
    let guid = fields.next()?.trim();
    let name = fields.next()?.trim();

    if guid.len() != 32 || !guid.chars().all(|c| c.is_ascii_hexdigit()) || name.is_empty() {
        return None;
    }

    let platform = fields
        .filter_map(|field| field.trim().strip_prefix("platform:"))
        .map(|p| p.trim().to_string())
        .next();

    Some(MappingEntry {
        guid: guid.to_ascii_lowercase(),
        name: name.to_string(),
        platform,
        line: line.to_string(),
    })
}

/// SDL's spelling of the current platform, as used in `platform:` fields
pub fn sdl_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "Mac OS X",
        "linux" => "Linux",
        "android" => "Android",
        "ios" => "iOS",
        other => other,
    }
}
