//! XMLSS reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{XmlssError, XmlssResult};
use crate::styles::{
    apply_alignment, apply_border, apply_font, apply_interior, apply_number_format, attributes,
    parse_bool, parse_f64, parse_u32,
};
use bandsheet_core::address::formula_to_a1;
use bandsheet_core::page_setup::Orientation;
use bandsheet_core::style::{BorderStyle, StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::{Cell, CellValue, Column, Document, DocumentSettings, Row, Style, Table};

/// XMLSS file reader
pub struct XmlssReader;

impl XmlssReader {
    /// Read a document from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XmlssResult<Document> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a document with default settings
    pub fn read<R: BufRead>(reader: R) -> XmlssResult<Document> {
        Self::read_with_settings(reader, DocumentSettings::default())
    }

    /// Read a document, addressing its tables with `settings`
    pub fn read_with_settings<R: BufRead>(
        reader: R,
        settings: DocumentSettings,
    ) -> XmlssResult<Document> {
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(false);

        let mut state = ReadState::new(settings);
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(e) => state.open(&e)?,
                Event::Empty(e) => {
                    state.open(&e)?;
                    let name = local_name(&e);
                    state.close(&name)?;
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    state.close(&name)?;
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    state.text(&text);
                }
                Event::CData(t) => {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    state.text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        state.finish()
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Cell being rebuilt, with its formula still in R1C1 form
struct PendingCell {
    cell: Cell,
    formula: Option<String>,
    data_type: Option<String>,
    data: Option<String>,
}

struct ReadState {
    document: Document,
    settings: DocumentSettings,
    /// Open elements, outermost first
    stack: Vec<String>,
    seen_root: bool,
    /// XMLSS `ss:ID` -> registry id
    style_ids: HashMap<String, StyleId>,
    /// XMLSS `ss:ID` -> resolved style, for `ss:Parent`
    parents: HashMap<String, Style>,
    style: Option<(String, Style)>,
    table: Option<Table>,
    row: Option<(u32, Row)>,
    cell: Option<PendingCell>,
    text: String,
}

impl ReadState {
    fn new(settings: DocumentSettings) -> Self {
        Self {
            document: Document::with_settings(settings),
            settings,
            stack: Vec::new(),
            seen_root: false,
            style_ids: HashMap::new(),
            parents: HashMap::new(),
            style: None,
            table: None,
            row: None,
            cell: None,
            text: String::new(),
        }
    }

    fn in_data(&self) -> bool {
        self.cell.as_ref().map_or(false, |c| c.data.is_some())
    }

    fn parent(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    fn resolve_style(&self, name: &str) -> StyleId {
        match self.style_ids.get(name) {
            Some(&id) => id,
            None => {
                log::warn!("reference to undefined style '{}', using default", name);
                self.default_style()
            }
        }
    }

    /// Id of the workbook's `Default` style (the registry default when absent)
    fn default_style(&self) -> StyleId {
        self.style_ids
            .get("Default")
            .copied()
            .unwrap_or(DEFAULT_STYLE_ID)
    }

    fn open(&mut self, e: &BytesStart<'_>) -> XmlssResult<()> {
        let name = local_name(e);
        if !self.seen_root {
            if name != "Workbook" {
                return Err(XmlssError::InvalidFormat(format!(
                    "root element is <{}>, expected <Workbook>",
                    name
                )));
            }
            self.seen_root = true;
        }

        // Rich text inside Data only contributes its text
        if self.in_data() {
            self.stack.push(name);
            return Ok(());
        }

        let attrs = attributes(e)?;
        if let Some((_, style)) = self.style.as_mut() {
            match name.as_str() {
                "Alignment" => apply_alignment(style, &attrs)?,
                "Borders" => style.border = BorderStyle::default(),
                "Border" => apply_border(&mut style.border, &attrs)?,
                "Font" => apply_font(style, &attrs)?,
                "Interior" => apply_interior(style, &attrs),
                "NumberFormat" => apply_number_format(style, &attrs),
                _ => {}
            }
            self.stack.push(name);
            return Ok(());
        }

        match name.as_str() {
            "Style" => {
                let id = attr(&attrs, "ID").unwrap_or_default().to_string();
                let base = match attr(&attrs, "Parent") {
                    Some(parent) => self.parents.get(parent).cloned().unwrap_or_else(|| {
                        log::warn!("style '{}' inherits from unknown '{}'", id, parent);
                        Style::default()
                    }),
                    None => Style::default(),
                };
                self.style = Some((id, base));
            }
            "Worksheet" => {
                let sheet_name = attr(&attrs, "Name")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Sheet{}", self.document.table_count() + 1));
                self.table = Some(Table::with_settings(sheet_name, self.settings));
            }
            "Table" => {
                if let Some(table) = self.table.as_mut() {
                    if let Some(v) = attr(&attrs, "DefaultColumnWidth") {
                        table.default_column_width = Some(parse_f64("DefaultColumnWidth", v)?);
                    }
                    if let Some(v) = attr(&attrs, "DefaultRowHeight") {
                        table.default_row_height = Some(parse_f64("DefaultRowHeight", v)?);
                    }
                }
            }
            "Column" => self.open_column(&attrs)?,
            "Row" => self.open_row(&attrs)?,
            "Cell" => self.open_cell(&attrs)?,
            "Data" => {
                if let Some(cell) = self.cell.as_mut() {
                    cell.data_type = attr(&attrs, "Type").map(str::to_string);
                    cell.data = Some(String::new());
                }
            }
            "Layout" => {
                if let Some(table) = self.table.as_mut() {
                    let setup = &mut table.page_setup;
                    if let Some(v) = attr(&attrs, "Orientation") {
                        setup.orientation = Orientation::from_xmlss_name(v);
                    }
                    if let Some(v) = attr(&attrs, "CenterHorizontal") {
                        setup.center_horizontal = parse_bool(v);
                    }
                    if let Some(v) = attr(&attrs, "CenterVertical") {
                        setup.center_vertical = parse_bool(v);
                    }
                }
            }
            "Header" | "Footer" => {
                if let (Some(table), Some(v)) = (self.table.as_mut(), attr(&attrs, "Margin")) {
                    let margin = parse_f64("Margin", v)?;
                    if name == "Header" {
                        table.page_setup.margins.header = margin;
                    } else {
                        table.page_setup.margins.footer = margin;
                    }
                }
            }
            "PageMargins" => {
                if let Some(table) = self.table.as_mut() {
                    let margins = &mut table.page_setup.margins;
                    for (key, value) in &attrs {
                        match key.as_str() {
                            "Top" => margins.top = parse_f64(key, value)?,
                            "Bottom" => margins.bottom = parse_f64(key, value)?,
                            "Left" => margins.left = parse_f64(key, value)?,
                            "Right" => margins.right = parse_f64(key, value)?,
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
        self.text.clear();
        self.stack.push(name);
        Ok(())
    }

    fn open_column(&mut self, attrs: &[(String, String)]) -> XmlssResult<()> {
        let mut column = Column::new();
        for (key, value) in attrs {
            match key.as_str() {
                "Index" => column.index = Some(parse_u32(key, value)?),
                "Span" => column.span = parse_u32(key, value)?,
                "Width" => column.width = Some(parse_f64(key, value)?),
                "Hidden" => column.hidden = parse_bool(value),
                "AutoFitWidth" => column.auto_fit_width = parse_bool(value),
                "StyleID" => column.style_id = self.resolve_style(value),
                _ => {}
            }
        }
        if let Some(table) = self.table.as_mut() {
            table.columns_mut().push(column)?;
        }
        Ok(())
    }

    fn open_row(&mut self, attrs: &[(String, String)]) -> XmlssResult<()> {
        let mut row = Row::new();
        for (key, value) in attrs {
            match key.as_str() {
                "Index" => row.index = Some(parse_u32(key, value)?),
                "Span" => row.span = parse_u32(key, value)?,
                "Height" => row.height = Some(parse_f64(key, value)?),
                "Hidden" => row.hidden = parse_bool(value),
                "AutoFitHeight" => row.auto_fit_height = parse_bool(value),
                "StyleID" => row.style_id = self.resolve_style(value),
                _ => {}
            }
        }
        let last = self
            .table
            .as_ref()
            .map_or(0, |t| t.rows().last_position());
        let position = row.index.unwrap_or(last + 1);
        self.row = Some((position, row));
        Ok(())
    }

    fn open_cell(&mut self, attrs: &[(String, String)]) -> XmlssResult<()> {
        let mut cell = Cell::default();
        cell.style_id = self.default_style();
        let mut formula = None;
        for (key, value) in attrs {
            match key.as_str() {
                "Index" => cell.index = Some(parse_u32(key, value)?),
                "MergeAcross" => cell.merge_across = parse_u32(key, value)?,
                "MergeDown" => cell.merge_down = parse_u32(key, value)?,
                "StyleID" => cell.style_id = self.resolve_style(value),
                "Formula" => formula = Some(value.clone()),
                _ => {}
            }
        }
        self.cell = Some(PendingCell {
            cell,
            formula,
            data_type: None,
            data: None,
        });
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(data) = self.cell.as_mut().and_then(|c| c.data.as_mut()) {
            data.push_str(text);
        } else {
            self.text.push_str(text);
        }
    }

    fn close(&mut self, name: &str) -> XmlssResult<()> {
        self.stack.pop();

        if self.in_data() {
            if name == "Data" && self.parent() == Some("Cell") {
                self.close_data()?;
            }
            return Ok(());
        }

        match name {
            "Style" => {
                if let Some((id, style)) = self.style.take() {
                    let registry_id = self.document.find_or_create_style(style.clone());
                    self.style_ids.insert(id.clone(), registry_id);
                    self.parents.insert(id, style);
                }
            }
            "Cell" => self.close_cell()?,
            "Row" => {
                if let (Some(table), Some((_, row))) = (self.table.as_mut(), self.row.take()) {
                    table.rows_mut().push(row)?;
                }
            }
            "Worksheet" => {
                if let Some(table) = self.table.take() {
                    log::debug!(
                        "read XMLSS worksheet '{}' with {} rows",
                        table.name(),
                        table.rows().len()
                    );
                    self.document.push_table(table);
                }
            }
            "PaperSizeIndex" => {
                if let Some(table) = self.table.as_mut() {
                    table.page_setup.paper_size_index = parse_u32(name, &self.text)?;
                }
            }
            "Title" | "Subject" | "Author" | "Created"
                if self.parent() == Some("DocumentProperties") =>
            {
                let value = Some(self.text.trim().to_string());
                let props = &mut self.document.properties;
                match name {
                    "Title" => props.title = value,
                    "Subject" => props.subject = value,
                    "Author" => props.author = value,
                    _ => props.created = value,
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_data(&mut self) -> XmlssResult<()> {
        let Some(pending) = self.cell.as_mut() else {
            return Ok(());
        };
        let text = pending.data.take().unwrap_or_default();
        pending.cell.value = match pending.data_type.as_deref() {
            Some("Number") => CellValue::Number(parse_f64("Number", &text)?),
            Some("Boolean") => CellValue::Boolean(parse_bool(text.trim())),
            Some("DateTime") => CellValue::DateTime(text),
            Some("Error") => CellValue::Error(text),
            _ if text.is_empty() => CellValue::Empty,
            _ => CellValue::Text(text),
        };
        Ok(())
    }

    fn close_cell(&mut self) -> XmlssResult<()> {
        let (Some(pending), Some((row_pos, row))) = (self.cell.take(), self.row.as_mut()) else {
            return Ok(());
        };
        let PendingCell {
            mut cell, formula, ..
        } = pending;
        let col = cell.index.unwrap_or(row.cells.last_position() + 1);
        if let Some(r1c1) = formula {
            cell.formula = Some(formula_to_a1(&r1c1, *row_pos, col)?);
        }
        row.cells.push(cell)?;
        Ok(())
    }

    fn finish(self) -> XmlssResult<Document> {
        if !self.seen_root {
            return Err(XmlssError::InvalidFormat("document has no root element".into()));
        }
        log::debug!(
            "read XMLSS document: {} tables, {} styles",
            self.document.table_count(),
            self.document.styles().len()
        );
        Ok(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn read(xml: &str) -> Document {
        XmlssReader::read(xml.as_bytes()).unwrap()
    }

    const HEADER: &str = r#"<?xml version="1.0"?>
<Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet"
 xmlns:x="urn:schemas-microsoft-com:office:excel"
 xmlns:html="http://www.w3.org/TR/REC-html40">"#;

    #[test]
    fn test_rejects_foreign_root() {
        let err = XmlssReader::read("<html><body/></html>".as_bytes()).unwrap_err();
        assert!(matches!(err, XmlssError::InvalidFormat(_)));
    }

    #[test]
    fn test_implicit_and_explicit_indices() {
        let doc = read(&format!(
            r#"{HEADER}
<Worksheet ss:Name="S"><Table>
 <Row><Cell><Data ss:Type="String">a</Data></Cell><Cell ss:Index="4"><Data ss:Type="Number">4</Data></Cell><Cell><Data ss:Type="Boolean">1</Data></Cell></Row>
 <Row ss:Index="3"><Cell ss:MergeAcross="1"><Data ss:Type="String">m</Data></Cell><Cell><Data ss:Type="String">after</Data></Cell></Row>
</Table></Worksheet></Workbook>"#
        ));
        let table = doc.table(0).unwrap();
        assert_eq!(table.name(), "S");
        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("a"));
        assert_eq!(table.value(1, 4).unwrap(), CellValue::Number(4.0));
        assert_eq!(table.value(1, 5).unwrap(), CellValue::Boolean(true));
        assert_eq!(table.value(3, 3).unwrap(), CellValue::text("after"));
        assert!(table.value(3, 2).is_err());
    }

    #[test]
    fn test_rich_text_and_whitespace_preserved() {
        let doc = read(&format!(
            r##"{HEADER}
<Worksheet ss:Name="S"><Table><Row><Cell><ss:Data ss:Type="String"><Font html:Color="#FF0000">red</Font> and <B>bold</B>  </ss:Data></Cell></Row></Table></Worksheet></Workbook>"##
        ));
        let table = doc.table(0).unwrap();
        assert_eq!(table.value(1, 1).unwrap(), CellValue::text("red and bold  "));
    }

    #[test]
    fn test_style_parent_inheritance() {
        let doc = read(&format!(
            r##"{HEADER}
<Styles>
 <Style ss:ID="Default" ss:Name="Normal"><Font ss:FontName="Arial" ss:Size="10"/></Style>
 <Style ss:ID="base"><Font ss:Bold="1"/><Interior ss:Color="#FFFF00" ss:Pattern="Solid"/></Style>
 <Style ss:ID="child" ss:Parent="base"><Font ss:Bold="1" ss:Italic="1"/></Style>
</Styles>
<Worksheet ss:Name="S"><Table><Row><Cell ss:StyleID="child"><Data ss:Type="String">x</Data></Cell></Row></Table></Worksheet></Workbook>"##
        ));
        let table = doc.table(0).unwrap();
        let id = table.cell_style(1, 1).unwrap().unwrap();
        let style = doc.style(id);
        assert!(style.font.bold);
        assert!(style.font.italic);
        assert_eq!(style.fill.background_color(), Some(bandsheet_core::Color::YELLOW));
    }

    #[test]
    fn test_formula_is_converted_to_a1() {
        let doc = read(&format!(
            r#"{HEADER}
<Worksheet ss:Name="S"><Table>
 <Row ss:Index="3"><Cell ss:Index="2" ss:Formula="=SUM(R[-2]C:R[-1]C)"><Data ss:Type="Number">3</Data></Cell></Row>
</Table></Worksheet></Workbook>"#
        ));
        let cell = doc.table(0).unwrap().cell(3, 2).unwrap().unwrap();
        assert_eq!(cell.formula.as_deref(), Some("=SUM(B1:B2)"));
        assert_eq!(cell.value, CellValue::Number(3.0));
    }

    #[test]
    fn test_page_setup_and_properties() {
        let doc = read(&format!(
            r#"{HEADER}
<DocumentProperties xmlns="urn:schemas-microsoft-com:office:office"><Title>Sales</Title><Author>ops</Author></DocumentProperties>
<Worksheet ss:Name="S"><Table/>
<WorksheetOptions xmlns="urn:schemas-microsoft-com:office:excel"><PageSetup>
 <Layout x:Orientation="Landscape" x:CenterHorizontal="1"/>
 <Header x:Margin="0.3"/><Footer x:Margin="0.4"/>
 <PageMargins x:Bottom="1.5" x:Left="0.5" x:Right="0.5" x:Top="2"/>
</PageSetup><Print><PaperSizeIndex>8</PaperSizeIndex></Print></WorksheetOptions>
</Worksheet></Workbook>"#
        ));
        assert_eq!(doc.properties.title.as_deref(), Some("Sales"));
        assert_eq!(doc.properties.author.as_deref(), Some("ops"));
        let setup = &doc.table(0).unwrap().page_setup;
        assert_eq!(setup.orientation, Orientation::Landscape);
        assert!(setup.center_horizontal);
        assert_eq!(setup.margins.header, 0.3);
        assert_eq!(setup.margins.top, 2.0);
        assert_eq!(setup.paper_size_index, 8);
    }
}
