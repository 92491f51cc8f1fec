//! Loading and atomically persisting [`RuntimeState`] to the platform's
//! user-local state directory, with forward schema migration on load.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use directories::ProjectDirs;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::state::model::{RuntimeState, CURRENT_SCHEMA_VERSION};

/// `(from_version, migration)` pairs applied in order until the record's
/// version matches [`CURRENT_SCHEMA_VERSION`]. Currently holds only the
/// documented no-op identity migration for version 0; add the
/// next entry here rather than special-casing it at the call site.
pub const MIGRATIONS: &[(u32, fn(Value) -> Value)] = &[(0, |v| v)];

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "grid-ctl")
        .ok_or_else(|| Error::State("could not determine a home directory for this platform".into()))
}

/// The canonical path of the state file.
pub fn state_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("state.json"))
}

/// Load the runtime state, or a fresh empty one if the file does not
/// exist. A malformed existing file is a fatal `Error::State`.
pub fn load() -> Result<RuntimeState> {
    let path = state_path()?;
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<RuntimeState> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no runtime state file, starting fresh");
            return Ok(RuntimeState::empty(Utc::now()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    let mut raw: Value = serde_json::from_str(&text)
        .map_err(|e| Error::State(format!("parsing {}: {e}", path.display())))?;

    let version = raw
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .ok_or_else(|| Error::State(format!("{}: missing schemaVersion", path.display())))? as u32;

    for (from, migrate) in MIGRATIONS {
        if version <= *from {
            warn!(from_version = from, to_version = from + 1, "migrating runtime state schema");
            raw = migrate(raw);
            if let Some(obj) = raw.as_object_mut() {
                obj.insert("schemaVersion".into(), Value::from(from + 1));
            }
        }
    }

    serde_json::from_value(raw)
        .map_err(|e| Error::State(format!("parsing {} after migration: {e}", path.display())))
}

/// Write `state` to its canonical path, writing to a temporary sibling
/// file first and renaming over the target. The directory is
/// created as needed; the temp file is removed if the rename fails.
pub fn save(state: &RuntimeState) -> Result<()> {
    let path = state_path()?;
    save_to(&path, state)
}

pub fn save_to(path: &Path, state: &RuntimeState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_path = path.to_path_buf();
    let tmp_name = format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("state.json")
    );
    tmp_path.set_file_name(tmp_name);

    let json = serde_json::to_string_pretty(state)?;

    let write_result = (|| -> Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        Ok(())
    })();

    if write_result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return write_result;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(Error::Io(e));
    }

    debug!(path = %path.display(), version = CURRENT_SCHEMA_VERSION, "persisted runtime state");
    Ok(())
}
