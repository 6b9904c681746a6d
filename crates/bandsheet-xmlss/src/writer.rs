//! XMLSS writer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::XmlssResult;
use crate::styles::write_style;
use crate::{NS_EXCEL, NS_HTML, NS_OFFICE, NS_SPREADSHEET};
use bandsheet_core::address::formula_to_r1c1;
use bandsheet_core::page_setup::PageSetup;
use bandsheet_core::style::{style_name, DEFAULT_STYLE_ID};
use bandsheet_core::value::format_number;
use bandsheet_core::{Cell, CellValue, Column, Document, Row, Table};

/// Writer options
#[derive(Debug, Clone)]
pub struct XmlssWriteOptions {
    /// Spaces per nesting level
    pub indent: usize,
}

impl Default for XmlssWriteOptions {
    fn default() -> Self {
        Self { indent: 1 }
    }
}

/// XMLSS file writer
pub struct XmlssWriter;

impl XmlssWriter {
    /// Write a document to a file path
    pub fn write_file<P: AsRef<Path>>(document: &Document, path: P) -> XmlssResult<()> {
        Self::write_file_with_options(document, path, &XmlssWriteOptions::default())
    }

    /// Write a document to a file path with explicit options
    pub fn write_file_with_options<P: AsRef<Path>>(
        document: &Document,
        path: P,
        options: &XmlssWriteOptions,
    ) -> XmlssResult<()> {
        let mut file = BufWriter::new(File::create(path)?);
        Self::write_with_options(document, &mut file, options)?;
        file.flush()?;
        Ok(())
    }

    /// Write a document to a writer
    pub fn write<W: Write>(document: &Document, writer: W) -> XmlssResult<()> {
        Self::write_with_options(document, writer, &XmlssWriteOptions::default())
    }

    /// Write a document to a writer with explicit options
    pub fn write_with_options<W: Write>(
        document: &Document,
        writer: W,
        options: &XmlssWriteOptions,
    ) -> XmlssResult<()> {
        let mut xml = if options.indent > 0 {
            Writer::new_with_indent(writer, b' ', options.indent)
        } else {
            Writer::new(writer)
        };

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.get_mut()
            .write_all(b"\n<?mso-application progid=\"Excel.Sheet\"?>")?;

        let mut root = BytesStart::new("Workbook");
        root.push_attribute(("xmlns", NS_SPREADSHEET));
        root.push_attribute(("xmlns:o", NS_OFFICE));
        root.push_attribute(("xmlns:x", NS_EXCEL));
        root.push_attribute(("xmlns:ss", NS_SPREADSHEET));
        root.push_attribute(("xmlns:html", NS_HTML));
        xml.write_event(Event::Start(root))?;

        Self::write_properties(&mut xml, document)?;
        Self::write_styles(&mut xml, document)?;
        for table in document.tables() {
            Self::write_worksheet(&mut xml, table)?;
        }

        xml.write_event(Event::End(BytesEnd::new("Workbook")))?;
        xml.get_mut().write_all(b"\n")?;
        log::debug!("wrote XMLSS document with {} tables", document.table_count());
        Ok(())
    }

    fn write_text_element<W: Write>(
        xml: &mut Writer<W>,
        name: &str,
        text: &str,
    ) -> XmlssResult<()> {
        xml.write_event(Event::Start(BytesStart::new(name)))?;
        xml.write_event(Event::Text(BytesText::new(text)))?;
        xml.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_properties<W: Write>(xml: &mut Writer<W>, document: &Document) -> XmlssResult<()> {
        let props = &document.properties;
        let mut start = BytesStart::new("DocumentProperties");
        start.push_attribute(("xmlns", NS_OFFICE));
        xml.write_event(Event::Start(start))?;
        if let Some(title) = &props.title {
            Self::write_text_element(xml, "Title", title)?;
        }
        if let Some(subject) = &props.subject {
            Self::write_text_element(xml, "Subject", subject)?;
        }
        if let Some(author) = &props.author {
            Self::write_text_element(xml, "Author", author)?;
        }
        let created = props.created.clone().unwrap_or_else(|| {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string()
        });
        Self::write_text_element(xml, "Created", &created)?;
        xml.write_event(Event::End(BytesEnd::new("DocumentProperties")))?;
        Ok(())
    }

    /// Default style plus every referenced style, in id order
    fn write_styles<W: Write>(xml: &mut Writer<W>, document: &Document) -> XmlssResult<()> {
        let used = document.used_styles();
        xml.write_event(Event::Start(BytesStart::new("Styles")))?;
        for (id, style) in document.styles().iter() {
            if id == DEFAULT_STYLE_ID || used.contains(&id) {
                write_style(xml, id, style)?;
            }
        }
        xml.write_event(Event::End(BytesEnd::new("Styles")))?;
        Ok(())
    }

    fn write_worksheet<W: Write>(xml: &mut Writer<W>, table: &Table) -> XmlssResult<()> {
        let mut sheet = BytesStart::new("Worksheet");
        sheet.push_attribute(("ss:Name", table.name()));
        xml.write_event(Event::Start(sheet))?;

        let (rows, cols) = table.used_extent();
        let mut start = BytesStart::new("Table");
        start.push_attribute(("ss:ExpandedColumnCount", cols.max(1).to_string().as_str()));
        start.push_attribute(("ss:ExpandedRowCount", rows.max(1).to_string().as_str()));
        start.push_attribute(("x:FullColumns", "1"));
        start.push_attribute(("x:FullRows", "1"));
        if let Some(width) = table.default_column_width {
            start.push_attribute(("ss:DefaultColumnWidth", format_number(width).as_str()));
        }
        if let Some(height) = table.default_row_height {
            start.push_attribute(("ss:DefaultRowHeight", format_number(height).as_str()));
        }
        xml.write_event(Event::Start(start))?;

        Self::write_columns(xml, table)?;
        Self::write_rows(xml, table)?;

        xml.write_event(Event::End(BytesEnd::new("Table")))?;
        Self::write_worksheet_options(xml, &table.page_setup)?;
        xml.write_event(Event::End(BytesEnd::new("Worksheet")))?;
        Ok(())
    }

    /// Columns with settings, folding contiguous identical columns into one
    /// `ss:Span` run
    fn write_columns<W: Write>(xml: &mut Writer<W>, table: &Table) -> XmlssResult<()> {
        let mut runs: Vec<(u32, u32, &Column)> = Vec::new();
        for (start, column) in table.columns().iter() {
            if !column.has_custom_settings() {
                continue;
            }
            let end = start + column.span;
            match runs.last_mut() {
                Some((_, run_end, run)) if *run_end + 1 == start && run.same_format(column) => {
                    *run_end = end;
                }
                _ => runs.push((start, end, column)),
            }
        }

        let mut last_end = 0;
        for (start, end, column) in runs {
            let mut e = BytesStart::new("Column");
            if start != last_end + 1 {
                e.push_attribute(("ss:Index", start.to_string().as_str()));
            }
            if column.style_id != DEFAULT_STYLE_ID {
                e.push_attribute(("ss:StyleID", style_name(column.style_id).as_str()));
            }
            if column.hidden {
                e.push_attribute(("ss:Hidden", "1"));
            }
            e.push_attribute(("ss:AutoFitWidth", if column.auto_fit_width { "1" } else { "0" }));
            if let Some(width) = column.width {
                e.push_attribute(("ss:Width", format_number(width).as_str()));
            }
            if end > start {
                e.push_attribute(("ss:Span", (end - start).to_string().as_str()));
            }
            xml.write_event(Event::Empty(e))?;
            last_end = end;
        }
        Ok(())
    }

    /// Rows, folding contiguous identical empty rows into one `ss:Span` run
    fn write_rows<W: Write>(xml: &mut Writer<W>, table: &Table) -> XmlssResult<()> {
        let mut runs: Vec<(u32, u32, &Row)> = Vec::new();
        for (start, row) in table.rows().iter() {
            let has_cells = row.cells.iter().any(|(_, c)| !c.is_blank());
            if !has_cells && !row.has_custom_settings() {
                continue;
            }
            let end = start + row.span;
            match runs.last_mut() {
                Some((_, run_end, run))
                    if !has_cells
                        && run.cells.is_empty()
                        && *run_end + 1 == start
                        && run.same_format(row) =>
                {
                    *run_end = end;
                }
                _ => runs.push((start, end, row)),
            }
        }

        let mut last_end = 0;
        for (start, end, row) in runs {
            let mut e = BytesStart::new("Row");
            if start != last_end + 1 {
                e.push_attribute(("ss:Index", start.to_string().as_str()));
            }
            if let Some(height) = row.height {
                e.push_attribute(("ss:AutoFitHeight", "0"));
                e.push_attribute(("ss:Height", format_number(height).as_str()));
            } else if row.auto_fit_height {
                e.push_attribute(("ss:AutoFitHeight", "1"));
            }
            if row.style_id != DEFAULT_STYLE_ID {
                e.push_attribute(("ss:StyleID", style_name(row.style_id).as_str()));
            }
            if row.hidden {
                e.push_attribute(("ss:Hidden", "1"));
            }
            if end > start {
                e.push_attribute(("ss:Span", (end - start).to_string().as_str()));
            }

            let cells: Vec<(u32, &Cell)> = row.cells.iter().filter(|(_, c)| !c.is_blank()).collect();
            if cells.is_empty() {
                xml.write_event(Event::Empty(e))?;
            } else {
                xml.write_event(Event::Start(e))?;
                let mut last_col = 0;
                for (col, cell) in cells {
                    Self::write_cell(xml, start, col, last_col, cell)?;
                    last_col = col + cell.merge_across;
                }
                xml.write_event(Event::End(BytesEnd::new("Row")))?;
            }
            last_end = end;
        }
        Ok(())
    }

    fn write_cell<W: Write>(
        xml: &mut Writer<W>,
        row: u32,
        col: u32,
        last_col: u32,
        cell: &Cell,
    ) -> XmlssResult<()> {
        let mut e = BytesStart::new("Cell");
        if col != last_col + 1 {
            e.push_attribute(("ss:Index", col.to_string().as_str()));
        }
        if cell.merge_across > 0 {
            e.push_attribute(("ss:MergeAcross", cell.merge_across.to_string().as_str()));
        }
        if cell.merge_down > 0 {
            e.push_attribute(("ss:MergeDown", cell.merge_down.to_string().as_str()));
        }
        if cell.style_id != DEFAULT_STYLE_ID {
            e.push_attribute(("ss:StyleID", style_name(cell.style_id).as_str()));
        }
        if let Some(formula) = &cell.formula {
            let r1c1 = formula_to_r1c1(formula, row, col)?;
            e.push_attribute(("ss:Formula", r1c1.as_str()));
        }

        let data = match &cell.value {
            CellValue::Empty => None,
            CellValue::Boolean(b) => Some(("Boolean", if *b { "1" } else { "0" }.to_string())),
            CellValue::DateTime(s) => Some(("DateTime", s.clone())),
            CellValue::Error(s) => Some(("Error", s.clone())),
            value => match value.numeric() {
                Some(n) => Some(("Number", format_number(n))),
                None => Some(("String", value.to_string())),
            },
        };

        match data {
            None => xml.write_event(Event::Empty(e))?,
            Some((data_type, text)) => {
                xml.write_event(Event::Start(e))?;
                let mut d = BytesStart::new("Data");
                d.push_attribute(("ss:Type", data_type));
                xml.write_event(Event::Start(d))?;
                xml.write_event(Event::Text(BytesText::new(&text)))?;
                xml.write_event(Event::End(BytesEnd::new("Data")))?;
                xml.write_event(Event::End(BytesEnd::new("Cell")))?;
            }
        }
        Ok(())
    }

    fn write_worksheet_options<W: Write>(
        xml: &mut Writer<W>,
        setup: &PageSetup,
    ) -> XmlssResult<()> {
        let mut options = BytesStart::new("WorksheetOptions");
        options.push_attribute(("xmlns", NS_EXCEL));
        xml.write_event(Event::Start(options))?;
        xml.write_event(Event::Start(BytesStart::new("PageSetup")))?;

        let mut layout = BytesStart::new("Layout");
        layout.push_attribute(("x:Orientation", setup.orientation.xmlss_name()));
        if setup.center_horizontal {
            layout.push_attribute(("x:CenterHorizontal", "1"));
        }
        if setup.center_vertical {
            layout.push_attribute(("x:CenterVertical", "1"));
        }
        xml.write_event(Event::Empty(layout))?;

        let m = &setup.margins;
        let mut header = BytesStart::new("Header");
        header.push_attribute(("x:Margin", format_number(m.header).as_str()));
        xml.write_event(Event::Empty(header))?;
        let mut footer = BytesStart::new("Footer");
        footer.push_attribute(("x:Margin", format_number(m.footer).as_str()));
        xml.write_event(Event::Empty(footer))?;
        let mut margins = BytesStart::new("PageMargins");
        margins.push_attribute(("x:Bottom", format_number(m.bottom).as_str()));
        margins.push_attribute(("x:Left", format_number(m.left).as_str()));
        margins.push_attribute(("x:Right", format_number(m.right).as_str()));
        margins.push_attribute(("x:Top", format_number(m.top).as_str()));
        xml.write_event(Event::Empty(margins))?;

        xml.write_event(Event::End(BytesEnd::new("PageSetup")))?;
        xml.write_event(Event::Start(BytesStart::new("Print")))?;
        xml.write_event(Event::Empty(BytesStart::new("ValidPrinterInfo")))?;
        Self::write_text_element(xml, "PaperSizeIndex", &setup.paper_size_index.to_string())?;
        xml.write_event(Event::End(BytesEnd::new("Print")))?;
        xml.write_event(Event::End(BytesEnd::new("WorksheetOptions")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandsheet_core::Style;

    fn render(document: &Document) -> String {
        let mut out = Vec::new();
        XmlssWriter::write(document, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_contiguous_cells_omit_index() {
        let mut doc = Document::new();
        let t = doc.add_table("Sheet1");
        let table = doc.table_mut(t).unwrap();
        table.set_value(1, 1, "a").unwrap();
        table.set_value(1, 2, "b").unwrap();
        table.set_value(1, 5, "c").unwrap();
        table.set_value(4, 1, "d").unwrap();

        let xml = render(&doc);
        assert_eq!(xml.matches("ss:Index=\"5\"").count(), 1);
        assert_eq!(xml.matches("ss:Index=\"4\"").count(), 1);
        assert_eq!(xml.matches("ss:Index=").count(), 2);
        assert!(xml.contains("<?mso-application progid=\"Excel.Sheet\"?>"));
        assert!(xml.contains("xmlns:html=\"http://www.w3.org/TR/REC-html40\""));
    }

    #[test]
    fn test_numeric_text_is_written_as_number() {
        let mut doc = Document::new();
        let t = doc.add_table("Sheet1");
        let table = doc.table_mut(t).unwrap();
        table.set_value(1, 1, "42").unwrap();
        table.set_value(1, 2, "42 units").unwrap();

        let xml = render(&doc);
        assert!(xml.contains("<Data ss:Type=\"Number\">42</Data>"));
        assert!(xml.contains("<Data ss:Type=\"String\">42 units</Data>"));
    }

    #[test]
    fn test_formula_is_written_in_r1c1() {
        let mut doc = Document::new();
        let t = doc.add_table("Sheet1");
        let table = doc.table_mut(t).unwrap();
        table.set_formula(3, 2, "=SUM(B1:B2)").unwrap();

        let xml = render(&doc);
        assert!(xml.contains("ss:Formula=\"=SUM(R[-2]C:R[-1]C)\""));
    }

    #[test]
    fn test_empty_rows_fold_into_span() {
        let mut doc = Document::new();
        let t = doc.add_table("Sheet1");
        let table = doc.table_mut(t).unwrap();
        for row in 2..=6 {
            table.set_row_height(row, 30.0).unwrap();
        }
        table.set_value(7, 1, 1.0).unwrap();

        let xml = render(&doc);
        assert!(xml.contains("ss:Index=\"2\""));
        assert!(xml.contains("ss:Span=\"4\""));
        assert_eq!(xml.matches("<Row").count(), 2);
    }

    #[test]
    fn test_only_referenced_styles_are_written() {
        let mut doc = Document::new();
        let t = doc.add_table("Sheet1");
        let bold = doc.find_or_create_style(Style::new().bold(true));
        doc.find_or_create_style(Style::new().italic(true));
        let table = doc.table_mut(t).unwrap();
        for row in 1..=4 {
            table.set_value(row, 1, "x").unwrap();
            table.set_cell_style(row, 1, bold).unwrap();
        }

        let xml = render(&doc);
        assert_eq!(xml.matches("<Style ").count(), 2);
        assert_eq!(xml.matches("ss:StyleID=\"s21\"").count(), 4);
        assert!(!xml.contains("ss:Italic"));
    }
}
