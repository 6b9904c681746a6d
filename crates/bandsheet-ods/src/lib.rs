//! # bandsheet-ods
//!
//! OpenDocument spreadsheet (ODS) reader and writer for bandsheet.
//!
//! An ODS file is a zip package. Cell data and automatic styles live in
//! `content.xml`; the default cell style, page layouts and master pages live
//! in `styles.xml`. Style properties are translated through explicit lookup
//! tables in both directions (see the `styles` module).

pub mod error;
pub mod reader;
pub mod writer;

mod number_format;
mod page;
mod styles;

pub use error::{OdsError, OdsResult};
pub use reader::{OdsReadOptions, OdsReader};
pub use writer::{OdsWriteOptions, OdsWriter};

/// Media type stored uncompressed in the `mimetype` entry
pub const MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

pub(crate) const NAMESPACES: &str = concat!(
    r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
    r#"xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" "#,
    r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" "#,
    r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
    r#"xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" "#,
    r#"xmlns:svg="urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0" "#,
    r#"xmlns:number="urn:oasis:names:tc:opendocument:xmlns:datastyle:1.0" "#,
    r#"xmlns:of="urn:oasis:names:tc:opendocument:xmlns:of:1.2" "#,
    r#"xmlns:dc="http://purl.org/dc/elements/1.1/" "#,
    r#"xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0" "#,
    r#"office:version="1.2""#
);

pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
