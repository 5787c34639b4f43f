use std::fs;
use std::path::Path;

use tracing::debug;

use super::{StoreResult, Tables};

/// Read the snapshot at `path`; a missing file is an empty store.
pub(crate) fn load_snapshot(path: &Path) -> StoreResult<Tables> {
    if !path.exists() {
        return Ok(Tables::default());
    }
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(Tables::default());
    }
    let tables = serde_json::from_str(&text)?;
    debug!(target: "medrec::storage", "loaded snapshot '{}' ({} bytes)", path.display(), text.len());
    Ok(tables)
}

/// Write the snapshot next to its final name and rename over it, so a crash
/// mid-write leaves the previous snapshot intact. Blocking: async callers go
/// through the blocking pool.
pub(crate) fn save_snapshot(path: &Path, tables: &Tables) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    let text = serde_json::to_string_pretty(tables)?;
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
