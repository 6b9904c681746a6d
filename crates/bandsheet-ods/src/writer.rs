//! ODS writer

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::OdsResult;
use crate::number_format::number_style_xml;
use crate::page::page_layout_xml;
use crate::styles::{cell_properties_xml, Translation};
use crate::{escape_xml, MIMETYPE, NAMESPACES};
use bandsheet_core::address::formula_to_odf;
use bandsheet_core::style::{CompactFormat, StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::value::format_number;
use bandsheet_core::{Cell, CellValue, Document, MergeRegion, Row, Style, Table};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Writer options
#[derive(Debug, Clone, Default)]
pub struct OdsWriteOptions {
    /// Fail with [`crate::OdsError::StyleTranslation`] instead of degrading
    /// styles ODF cannot express
    pub strict_styles: bool,
}

/// ODS file writer
pub struct OdsWriter;

impl OdsWriter {
    /// Write a document to a file path
    pub fn write_file<P: AsRef<Path>>(document: &Document, path: P) -> OdsResult<()> {
        Self::write_file_with_options(document, path, &OdsWriteOptions::default())
    }

    /// Write a document to a file path with explicit options
    pub fn write_file_with_options<P: AsRef<Path>>(
        document: &Document,
        path: P,
        options: &OdsWriteOptions,
    ) -> OdsResult<()> {
        let file = File::create(path)?;
        Self::write_with_options(document, file, options)
    }

    /// Write a document to a writer
    pub fn write<W: Write + Seek>(document: &Document, writer: W) -> OdsResult<()> {
        Self::write_with_options(document, writer, &OdsWriteOptions::default())
    }

    /// Write a document to a writer with explicit options
    pub fn write_with_options<W: Write + Seek>(
        document: &Document,
        writer: W,
        options: &OdsWriteOptions,
    ) -> OdsResult<()> {
        let plan = StylePlan::build(document, options)?;
        let mut zip = ZipWriter::new(writer);

        // The mimetype entry must come first and stay uncompressed
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("mimetype", stored)?;
        zip.write_all(MIMETYPE.as_bytes())?;

        let deflated = SimpleFileOptions::default();
        zip.start_file("META-INF/manifest.xml", deflated)?;
        zip.write_all(Self::manifest_xml().as_bytes())?;

        zip.start_file("meta.xml", deflated)?;
        zip.write_all(Self::meta_xml(document).as_bytes())?;

        zip.start_file("styles.xml", deflated)?;
        zip.write_all(Self::styles_xml(document, &plan).as_bytes())?;

        zip.start_file("content.xml", deflated)?;
        zip.write_all(Self::content_xml(document, &plan)?.as_bytes())?;

        zip.finish()?;
        log::debug!(
            "wrote ODS document with {} tables and {} cell styles",
            document.table_count(),
            plan.cell_styles.len()
        );
        Ok(())
    }

    fn manifest_xml() -> String {
        let mut xml = format!(
            "{}\n<manifest:manifest xmlns:manifest=\"urn:oasis:names:tc:opendocument:xmlns:manifest:1.0\" manifest:version=\"1.2\">",
            XML_DECL
        );
        xml.push_str(&format!(
            "\n <manifest:file-entry manifest:full-path=\"/\" manifest:version=\"1.2\" manifest:media-type=\"{}\"/>",
            MIMETYPE
        ));
        for part in ["content.xml", "styles.xml", "meta.xml"] {
            xml.push_str(&format!(
                "\n <manifest:file-entry manifest:full-path=\"{}\" manifest:media-type=\"text/xml\"/>",
                part
            ));
        }
        xml.push_str("\n</manifest:manifest>");
        xml
    }

    fn meta_xml(document: &Document) -> String {
        let props = &document.properties;
        let mut meta = format!(
            "<meta:generator>bandsheet/{}</meta:generator>",
            env!("CARGO_PKG_VERSION")
        );
        if let Some(title) = &props.title {
            meta.push_str(&format!("<dc:title>{}</dc:title>", escape_xml(title)));
        }
        if let Some(subject) = &props.subject {
            meta.push_str(&format!("<dc:subject>{}</dc:subject>", escape_xml(subject)));
        }
        if let Some(author) = &props.author {
            meta.push_str(&format!(
                "<meta:initial-creator>{}</meta:initial-creator>",
                escape_xml(author)
            ));
        }
        let created = props.created.clone().unwrap_or_else(|| {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        });
        meta.push_str(&format!(
            "<meta:creation-date>{}</meta:creation-date>",
            escape_xml(&created)
        ));
        format!(
            "{}\n<office:document-meta {}><office:meta>{}</office:meta></office:document-meta>",
            XML_DECL, NAMESPACES, meta
        )
    }

    fn font_face_decls(plan: &StylePlan) -> String {
        let mut xml = String::from("<office:font-face-decls>");
        for font in &plan.fonts {
            let font = escape_xml(font);
            xml.push_str(&format!(
                "<style:font-face style:name=\"{0}\" svg:font-family=\"{0}\"/>",
                font
            ));
        }
        xml.push_str("</office:font-face-decls>");
        xml
    }

    fn styles_xml(document: &Document, plan: &StylePlan) -> String {
        let mut xml = format!("{}\n<office:document-styles {}>", XML_DECL, NAMESPACES);
        xml.push_str(&Self::font_face_decls(plan));

        xml.push_str("<office:styles>");
        if let Some((name, format)) = &plan.default_number_style {
            xml.push_str(&number_style_xml(name, format));
        }
        xml.push_str(&format!(
            "<style:style style:name=\"Default\" style:family=\"table-cell\"{}>{}</style:style>",
            plan.default_number_style
                .as_ref()
                .map(|(name, _)| format!(" style:data-style-name=\"{}\"", name))
                .unwrap_or_default(),
            plan.default_properties
        ));
        xml.push_str("</office:styles>");

        xml.push_str("<office:automatic-styles>");
        for (i, table) in document.tables().enumerate() {
            xml.push_str(&page_layout_xml(&format!("pm{}", i + 1), &table.page_setup));
        }
        xml.push_str("</office:automatic-styles>");

        xml.push_str("<office:master-styles>");
        for i in 1..=document.table_count() {
            xml.push_str(&format!(
                "<style:master-page style:name=\"mp{0}\" style:page-layout-name=\"pm{0}\"/>",
                i
            ));
        }
        xml.push_str("</office:master-styles>");
        xml.push_str("</office:document-styles>");
        xml
    }

    fn content_xml(document: &Document, plan: &StylePlan) -> OdsResult<String> {
        let mut xml = format!("{}\n<office:document-content {}>", XML_DECL, NAMESPACES);
        xml.push_str(&Self::font_face_decls(plan));

        let mut layout = LayoutStyles::default();
        let mut body = String::new();
        for (i, table) in document.tables().enumerate() {
            Self::write_table(&mut body, table, i, &mut layout)?;
        }

        xml.push_str("<office:automatic-styles>");
        for i in 1..=document.table_count() {
            xml.push_str(&format!(
                "<style:style style:name=\"ta{0}\" style:family=\"table\" style:master-page-name=\"mp{0}\"><style:table-properties table:display=\"true\" style:writing-mode=\"lr-tb\"/></style:style>",
                i
            ));
        }
        xml.push_str(&layout.xml);
        for (format, name) in &plan.number_styles {
            xml.push_str(&number_style_xml(name, format));
        }
        for (name, xml_style) in &plan.cell_styles {
            xml.push_str(&format!(
                "<style:style style:name=\"{}\" style:family=\"table-cell\" style:parent-style-name=\"Default\"{}</style:style>",
                name, xml_style
            ));
        }
        xml.push_str("</office:automatic-styles>");

        xml.push_str("<office:body><office:spreadsheet>");
        xml.push_str(&body);
        xml.push_str("</office:spreadsheet></office:body></office:document-content>");
        Ok(xml)
    }

    fn write_table(
        xml: &mut String,
        table: &Table,
        index: usize,
        layout: &mut LayoutStyles,
    ) -> OdsResult<()> {
        xml.push_str(&format!(
            "\n<table:table table:name=\"{}\" table:style-name=\"ta{}\">",
            escape_xml(table.name()),
            index + 1
        ));
        let (last_row, last_col) = table.used_extent();

        // Columns, folded into runs of identical attributes
        let mut runs: Vec<(String, u32)> = Vec::new();
        for col in 1..=last_col.max(1) {
            let attrs = match table.column(col) {
                Some(column) => {
                    let mut attrs = String::new();
                    if column.width.is_some() || column.auto_fit_width {
                        let name = layout.column_style(column.width, column.auto_fit_width);
                        attrs.push_str(&format!(" table:style-name=\"{}\"", name));
                    }
                    if column.hidden {
                        attrs.push_str(" table:visibility=\"collapse\"");
                    }
                    if column.style_id != DEFAULT_STYLE_ID {
                        attrs.push_str(&format!(
                            " table:default-cell-style-name=\"{}\"",
                            cell_style_name(column.style_id)
                        ));
                    }
                    attrs
                }
                None => String::new(),
            };
            match runs.last_mut() {
                Some((last, count)) if *last == attrs => *count += 1,
                _ => runs.push((attrs, 1)),
            }
        }
        for (attrs, count) in runs {
            xml.push_str(&format!("<table:table-column{}{}/>", attrs, repeated("columns", count)));
        }

        // Rows; consecutive empty rows with identical attributes share one element
        let merges = table.merges();
        let mut pending: Option<(String, u32)> = None;
        for r in 1..=last_row {
            let row = table.rows().get(r);
            let attrs = row.map(|row| Self::row_attrs(row, layout)).unwrap_or_default();
            let cells = Self::row_cells_xml(table, row, r, merges)?;
            if cells.is_empty() {
                match pending.as_mut() {
                    Some((last, count)) if *last == attrs => *count += 1,
                    _ => {
                        Self::flush_empty_rows(xml, pending.take());
                        pending = Some((attrs, 1));
                    }
                }
                continue;
            }
            Self::flush_empty_rows(xml, pending.take());
            xml.push_str(&format!("\n<table:table-row{}>{}</table:table-row>", attrs, cells));
        }
        Self::flush_empty_rows(xml, pending);
        if last_row == 0 {
            xml.push_str("\n<table:table-row><table:table-cell/></table:table-row>");
        }

        xml.push_str("\n</table:table>");
        Ok(())
    }

    fn flush_empty_rows(xml: &mut String, pending: Option<(String, u32)>) {
        if let Some((attrs, count)) = pending {
            xml.push_str(&format!(
                "\n<table:table-row{}{}><table:table-cell/></table:table-row>",
                attrs,
                repeated("rows", count)
            ));
        }
    }

    fn row_attrs(row: &Row, layout: &mut LayoutStyles) -> String {
        let mut attrs = String::new();
        if row.height.is_some() || row.auto_fit_height {
            let name = layout.row_style(row.height, row.auto_fit_height);
            attrs.push_str(&format!(" table:style-name=\"{}\"", name));
        }
        if row.hidden {
            attrs.push_str(" table:visibility=\"collapse\"");
        }
        if row.style_id != DEFAULT_STYLE_ID {
            attrs.push_str(&format!(
                " table:default-cell-style-name=\"{}\"",
                cell_style_name(row.style_id)
            ));
        }
        attrs
    }

    /// Cells of one row position, with gaps and covered cells filled in;
    /// empty when the row has nothing to write
    fn row_cells_xml(
        table: &Table,
        row: Option<&Row>,
        r: u32,
        merges: &[MergeRegion],
    ) -> OdsResult<String> {
        enum Entry<'a> {
            Cell(&'a Cell),
            Covered(u32),
        }

        let mut entries: Vec<(u32, Entry<'_>)> = Vec::new();
        if let Some(row) = row {
            for (col, cell) in row.cells.iter() {
                if cell.is_blank() {
                    continue;
                }
                entries.push((col, Entry::Cell(cell)));
                if cell.merge_across > 0 {
                    entries.push((col + 1, Entry::Covered(cell.merge_across)));
                }
            }
        }
        for m in merges.iter().filter(|m| m.row < r && r <= m.last_row()) {
            entries.push((m.col, Entry::Covered(m.across + 1)));
        }
        if entries.is_empty() {
            return Ok(String::new());
        }
        entries.sort_by_key(|(col, _)| *col);

        let mut xml = String::new();
        let mut next = 1;
        for (col, entry) in entries {
            if col < next {
                log::warn!(
                    "table '{}': overlapping content at R{}C{} skipped",
                    table.name(),
                    r,
                    col
                );
                continue;
            }
            if col > next {
                xml.push_str(&format!("<table:table-cell{}/>", repeated("columns", col - next)));
            }
            match entry {
                Entry::Cell(cell) => {
                    xml.push_str(&Self::cell_xml(cell)?);
                    next = col + 1;
                }
                Entry::Covered(count) => {
                    xml.push_str(&format!(
                        "<table:covered-table-cell{}/>",
                        repeated("columns", count)
                    ));
                    next = col + count;
                }
            }
        }
        Ok(xml)
    }

    fn cell_xml(cell: &Cell) -> OdsResult<String> {
        let mut attrs = String::new();
        if cell.style_id != DEFAULT_STYLE_ID {
            attrs.push_str(&format!(
                " table:style-name=\"{}\"",
                cell_style_name(cell.style_id)
            ));
        }
        if cell.is_merged() {
            attrs.push_str(&format!(
                " table:number-columns-spanned=\"{}\" table:number-rows-spanned=\"{}\"",
                cell.merge_across + 1,
                cell.merge_down + 1
            ));
        }
        if let Some(formula) = &cell.formula {
            attrs.push_str(&format!(
                " table:formula=\"{}\"",
                escape_xml(&formula_to_odf(formula)?)
            ));
        }

        let text = match &cell.value {
            CellValue::Empty => None,
            CellValue::Boolean(b) => {
                attrs.push_str(&format!(
                    " office:value-type=\"boolean\" office:boolean-value=\"{}\"",
                    b
                ));
                Some(cell.value.to_string())
            }
            CellValue::DateTime(s) => {
                attrs.push_str(&format!(
                    " office:value-type=\"date\" office:date-value=\"{}\"",
                    escape_xml(s)
                ));
                Some(s.clone())
            }
            CellValue::Error(s) => {
                attrs.push_str(" office:value-type=\"string\"");
                Some(s.clone())
            }
            value => match value.numeric() {
                Some(n) => {
                    attrs.push_str(&format!(
                        " office:value-type=\"float\" office:value=\"{}\"",
                        n
                    ));
                    Some(match value {
                        CellValue::Text(s) => s.clone(),
                        _ => format_number(n),
                    })
                }
                None => {
                    attrs.push_str(" office:value-type=\"string\"");
                    Some(value.to_string())
                }
            },
        };

        Ok(match text {
            None => format!("<table:table-cell{}/>", attrs),
            Some(text) => format!(
                "<table:table-cell{}>{}</table:table-cell>",
                attrs,
                paragraphs(&text)
            ),
        })
    }
}

fn repeated(axis: &str, count: u32) -> String {
    if count > 1 {
        format!(" table:number-{}-repeated=\"{}\"", axis, count)
    } else {
        String::new()
    }
}

pub(crate) fn cell_style_name(id: StyleId) -> String {
    format!("ce{}", id)
}

/// `text:p` elements for a cell text; space runs use `text:s`
fn paragraphs(text: &str) -> String {
    let mut xml = String::new();
    for line in text.split('\n') {
        xml.push_str("<text:p>");
        let mut spaces = 0u32;
        let mut at_start = true;
        for ch in line.chars() {
            if ch == ' ' {
                spaces += 1;
                continue;
            }
            flush_spaces(&mut xml, spaces, at_start);
            spaces = 0;
            at_start = false;
            match ch {
                '\t' => xml.push_str("<text:tab/>"),
                '&' => xml.push_str("&amp;"),
                '<' => xml.push_str("&lt;"),
                '>' => xml.push_str("&gt;"),
                c => xml.push(c),
            }
        }
        flush_spaces(&mut xml, spaces, true);
        xml.push_str("</text:p>");
    }
    xml
}

/// One literal space then `text:s` for the rest; all of them as `text:s`
/// at the edges of a paragraph, where whitespace would otherwise collapse
fn flush_spaces(xml: &mut String, spaces: u32, edge: bool) {
    match (spaces, edge) {
        (0, _) => {}
        (1, false) => xml.push(' '),
        (n, true) => xml.push_str(&format!("<text:s text:c=\"{}\"/>", n)),
        (n, false) => {
            xml.push(' ');
            xml.push_str(&format!("<text:s text:c=\"{}\"/>", n - 1));
        }
    }
}

/// Column and row styles, deduplicated by their properties
#[derive(Default)]
struct LayoutStyles {
    xml: String,
    columns: HashMap<(Option<u64>, bool), String>,
    rows: HashMap<(Option<u64>, bool), String>,
}

impl LayoutStyles {
    fn column_style(&mut self, width: Option<f64>, optimal: bool) -> String {
        let key = (width.map(f64::to_bits), optimal);
        if let Some(name) = self.columns.get(&key) {
            return name.clone();
        }
        let name = format!("co{}", self.columns.len() + 1);
        let width_attr = width
            .map(|w| format!(" style:column-width=\"{}pt\"", format_number(w)))
            .unwrap_or_default();
        self.xml.push_str(&format!(
            "<style:style style:name=\"{}\" style:family=\"table-column\"><style:table-column-properties fo:break-before=\"auto\"{} style:use-optimal-column-width=\"{}\"/></style:style>",
            name, width_attr, optimal
        ));
        self.columns.insert(key, name.clone());
        name
    }

    fn row_style(&mut self, height: Option<f64>, optimal: bool) -> String {
        let key = (height.map(f64::to_bits), optimal);
        if let Some(name) = self.rows.get(&key) {
            return name.clone();
        }
        let name = format!("ro{}", self.rows.len() + 1);
        let height_attr = height
            .map(|h| format!(" style:row-height=\"{}pt\"", format_number(h)))
            .unwrap_or_default();
        self.xml.push_str(&format!(
            "<style:style style:name=\"{}\" style:family=\"table-row\"><style:table-row-properties fo:break-before=\"auto\"{} style:use-optimal-row-height=\"{}\"/></style:style>",
            name, height_attr, optimal
        ));
        self.rows.insert(key, name.clone());
        name
    }
}

/// Cell and number styles of a document, translated once before writing
struct StylePlan {
    /// `(name, attributes and children after the opening tag name)`
    cell_styles: Vec<(String, String)>,
    number_styles: Vec<(CompactFormat, String)>,
    default_properties: String,
    default_number_style: Option<(String, CompactFormat)>,
    fonts: BTreeSet<String>,
}

impl StylePlan {
    fn build(document: &Document, options: &OdsWriteOptions) -> OdsResult<Self> {
        let mut used: Vec<StyleId> = document.used_styles().into_iter().collect();
        used.sort_unstable();

        let mut fonts = BTreeSet::new();
        let default = document.styles().default_style();
        fonts.insert(default.font.name.clone());
        let default_tr = Translation {
            name: "Default",
            strict: options.strict_styles,
        };
        let default_properties = cell_properties_xml(default, &default_tr)?;
        let default_number_style = Self::compact_format(default, &default_tr)?
            .map(|format| ("N0".to_string(), format));

        let mut number_styles: Vec<(CompactFormat, String)> = Vec::new();
        let mut cell_styles = Vec::new();
        for id in used {
            let style = document.style(id);
            let name = cell_style_name(id);
            let tr = Translation {
                name: &name,
                strict: options.strict_styles,
            };
            fonts.insert(style.font.name.clone());

            let mut data_style = String::new();
            if let Some(format) = Self::compact_format(style, &tr)? {
                let number_name = match number_styles.iter().find(|(f, _)| *f == format) {
                    Some((_, n)) => n.clone(),
                    None => {
                        let n = format!("N{}", number_styles.len() + 1);
                        number_styles.push((format, n.clone()));
                        n
                    }
                };
                data_style = format!(" style:data-style-name=\"{}\"", number_name);
            }
            let properties = cell_properties_xml(style, &tr)?;
            cell_styles.push((name, format!("{}>{}", data_style, properties)));
        }

        Ok(Self {
            cell_styles,
            number_styles,
            default_properties,
            default_number_style,
            fonts,
        })
    }

    fn compact_format(style: &Style, tr: &Translation<'_>) -> OdsResult<Option<CompactFormat>> {
        if style.number_format.is_general() {
            return Ok(None);
        }
        match style.number_format.compact() {
            Some(format) => Ok(Some(format)),
            None => {
                tr.degrade(format!(
                    "number format '{}' written as General",
                    style.number_format.code()
                ))?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paragraph_spaces_and_lines() {
        assert_eq!(paragraphs("a b"), "<text:p>a b</text:p>");
        assert_eq!(
            paragraphs("a   b"),
            "<text:p>a <text:s text:c=\"2\"/>b</text:p>"
        );
        assert_eq!(
            paragraphs(" x\ny<z"),
            "<text:p><text:s text:c=\"1\"/>x</text:p><text:p>y&lt;z</text:p>"
        );
    }

    #[test]
    fn test_row_cells_fill_gaps_and_covered_cells() {
        let mut table = Table::new("S");
        table.set_value(1, 2, "owner").unwrap();
        table.set_merge(1, 2, 2, 1).unwrap();
        table.set_value(1, 6, 1.5).unwrap();

        let xml = OdsWriter::row_cells_xml(&table, table.rows().get(1), 1, table.merges()).unwrap();
        assert_eq!(
            xml,
            concat!(
                "<table:table-cell/>",
                "<table:table-cell table:number-columns-spanned=\"3\" table:number-rows-spanned=\"2\" office:value-type=\"string\"><text:p>owner</text:p></table:table-cell>",
                "<table:covered-table-cell table:number-columns-repeated=\"2\"/>",
                "<table:table-cell/>",
                "<table:table-cell office:value-type=\"float\" office:value=\"1.5\"><text:p>1.5</text:p></table:table-cell>",
            )
        );

        let below = OdsWriter::row_cells_xml(&table, table.rows().get(2), 2, table.merges()).unwrap();
        assert_eq!(
            below,
            "<table:table-cell/><table:covered-table-cell table:number-columns-repeated=\"3\"/>"
        );
    }

    #[test]
    fn test_strict_styles_reject_custom_codes() {
        let mut doc = Document::new();
        let t = doc.add_table("S");
        let id = doc.find_or_create_style(Style::new().number_format("dd/mm/yyyy"));
        doc.table_mut(t).unwrap().set_cell_style(1, 1, id).unwrap();

        let strict = OdsWriteOptions {
            strict_styles: true,
        };
        assert!(StylePlan::build(&doc, &strict).is_err());
        let lenient = StylePlan::build(&doc, &OdsWriteOptions::default()).unwrap();
        assert!(lenient.number_styles.is_empty());
        assert_eq!(lenient.cell_styles.len(), 1);
    }
}
