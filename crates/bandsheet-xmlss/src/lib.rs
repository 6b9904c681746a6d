//! # bandsheet-xmlss
//!
//! XML Spreadsheet 2003 (XMLSS) reader and writer for bandsheet.
//!
//! XMLSS is a single flat XML file. Formulas are stored in R1C1 notation
//! and are translated to and from the canonical A1 form at this boundary.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XmlssError, XmlssResult};
pub use reader::XmlssReader;
pub use writer::{XmlssWriteOptions, XmlssWriter};

/// Default namespace of an XMLSS workbook
pub const NS_SPREADSHEET: &str = "urn:schemas-microsoft-com:office:spreadsheet";
/// `o:` namespace (document properties)
pub const NS_OFFICE: &str = "urn:schemas-microsoft-com:office:office";
/// `x:` namespace (worksheet options)
pub const NS_EXCEL: &str = "urn:schemas-microsoft-com:office:excel";
/// `html:` namespace (rich text inside `Data`)
pub const NS_HTML: &str = "http://www.w3.org/TR/REC-html40";
