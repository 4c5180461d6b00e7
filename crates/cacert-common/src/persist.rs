use serde::Serialize;
use std::io;
use std::path::Path;

/// Write `value` as pretty JSON via a sibling temp file and rename, so a
/// reader never observes a half-written report.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    tracing::debug!(path = %path.display(), "Report written");
    Ok(())
}
