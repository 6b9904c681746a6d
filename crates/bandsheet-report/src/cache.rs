//! Compiled template snapshots
//!
//! A snapshot sits next to its source with the `.bstc` extension:
//!
//! ```text
//! +----------+---------+---------------------------+
//! | BSTCACHE | version | bincode(ReportTemplate)   |
//! | 8 bytes  | u32 LE  |                           |
//! +----------+---------+---------------------------+
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReportError, ReportResult};
use crate::template::ReportTemplate;

const MAGIC: &[u8; 8] = b"BSTCACHE";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + 4;

/// Snapshot path for a template source
pub fn compiled_path(source: &Path) -> PathBuf {
    source.with_extension("bstc")
}

/// Whether the snapshot must be rebuilt: missing, truncated below the
/// header, or older than the source
pub fn needs_rebuild(source: &Path, compiled: &Path) -> bool {
    let compiled_meta = match fs::metadata(compiled) {
        Ok(meta) => meta,
        Err(_) => return true,
    };
    if compiled_meta.len() < HEADER_LEN as u64 {
        return true;
    }
    let source_time = fs::metadata(source).and_then(|m| m.modified());
    let compiled_time = compiled_meta.modified();
    match (source_time, compiled_time) {
        (Ok(source), Ok(compiled)) => compiled < source,
        _ => true,
    }
}

/// Serialize a template with the snapshot header
pub fn encode(template: &ReportTemplate) -> ReportResult<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(template, bincode::config::standard())
        .map_err(|e| ReportError::Cache(e.to_string()))?;
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a snapshot, checking magic and version
pub fn decode(bytes: &[u8]) -> ReportResult<ReportTemplate> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(ReportError::Cache("not a template snapshot".into()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(ReportError::Cache(format!(
            "snapshot format {} (expected {})",
            version, FORMAT_VERSION
        )));
    }
    let (template, _) = bincode::serde::decode_from_slice(&bytes[HEADER_LEN..], bincode::config::standard())
        .map_err(|e| ReportError::Cache(e.to_string()))?;
    Ok(template)
}

/// Write a snapshot through a temporary sibling
pub fn write_snapshot(template: &ReportTemplate, path: &Path) -> ReportResult<()> {
    let bytes = encode(template)?;
    let tmp = path.with_extension("bstc.tmp");
    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

pub fn read_snapshot(path: &Path) -> ReportResult<ReportTemplate> {
    decode(&fs::read(path)?)
}

/// Load the snapshot for `source` when fresh, otherwise compile and store it
///
/// A snapshot that cannot be decoded counts as stale. A failing compile
/// leaves any existing snapshot untouched. Failing to store the new
/// snapshot is only logged.
pub fn load_or_compile<F>(source: &Path, compile: F) -> ReportResult<ReportTemplate>
where
    F: FnOnce(&Path) -> ReportResult<ReportTemplate>,
{
    let compiled = compiled_path(source);
    if !needs_rebuild(source, &compiled) {
        match read_snapshot(&compiled) {
            Ok(template) => {
                log::debug!("template cache hit: {}", compiled.display());
                return Ok(template);
            }
            Err(e) => log::debug!("discarding stale snapshot {}: {}", compiled.display(), e),
        }
    } else {
        log::debug!("template cache miss: {}", compiled.display());
    }

    let template = compile(source)?;
    if let Err(e) = write_snapshot(&template, &compiled) {
        log::warn!("could not store template snapshot {}: {}", compiled.display(), e);
    }
    Ok(template)
}
