//! Output sinks: one variant per file format

use std::fs;
use std::path::{Path, PathBuf};

use bandsheet_core::Document;
use bandsheet_ods::{OdsWriteOptions, OdsWriter};
use bandsheet_xmlss::{XmlssWriteOptions, XmlssWriter};

use crate::error::{ReportError, ReportResult};

/// Where a generated document is written
#[derive(Debug, Clone)]
pub enum ReportSink {
    /// XML Spreadsheet 2003 (`.xml`)
    Xmlss(XmlssWriteOptions),
    /// OpenDocument spreadsheet (`.ods`)
    Ods(OdsWriteOptions),
}

impl ReportSink {
    /// Sink for a path, chosen by its extension
    pub fn for_path(path: &Path) -> ReportResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_hint(extension)
            .ok_or_else(|| ReportError::UnsupportedFormat(format!("no report sink for '{}'", path.display())))
    }

    /// Sink for a template `[generator]` hint or an extension
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().trim_start_matches('.').to_lowercase().as_str() {
            "xml" | "xmlss" => Some(ReportSink::Xmlss(XmlssWriteOptions::default())),
            "ods" => Some(ReportSink::Ods(OdsWriteOptions::default())),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportSink::Xmlss(_) => "xml",
            ReportSink::Ods(_) => "ods",
        }
    }

    /// Write through a temporary sibling, renamed over `path` on success
    ///
    /// Unreferenced styles are purged first, so the document is taken by
    /// mutable reference.
    pub fn write(&self, document: &mut Document, path: &Path) -> ReportResult<()> {
        let purged = document.purge_unused_styles();
        if purged > 0 {
            log::debug!("dropped {} unused styles before writing", purged);
        }

        let tmp = temp_sibling(path);
        let written = match self {
            ReportSink::Xmlss(options) => {
                XmlssWriter::write_file_with_options(document, &tmp, options).map_err(ReportError::from)
            }
            ReportSink::Ods(options) => {
                OdsWriter::write_file_with_options(document, &tmp, options).map_err(ReportError::from)
            }
        };
        if let Err(e) = written.and_then(|_| fs::rename(&tmp, path).map_err(ReportError::from)) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        log::debug!("wrote {} report to {}", self.extension(), path.display());
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
