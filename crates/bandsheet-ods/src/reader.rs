//! ODS reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{OdsError, OdsResult};
use crate::number_format::NumberStyleBuilder;
use crate::page::PageLayoutBuilder;
use crate::styles::{
    apply_cell_properties, apply_paragraph_properties, apply_text_properties, length_to_points,
};
use crate::MIMETYPE;
use bandsheet_core::address::formula_from_odf;
use bandsheet_core::style::{NumberFormat, StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::value::parse_float;
use bandsheet_core::{
    Cell, CellValue, Column, Document, DocumentSettings, PageSetup, Row, Style, Table,
};

/// Error literals read back as [`CellValue::Error`]
const ERROR_LITERALS: [&str; 8] = [
    "#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#N/A", "Err:502",
];

/// Reader options
#[derive(Debug, Clone)]
pub struct OdsReadOptions {
    /// Addressing settings for the tables read
    pub settings: DocumentSettings,
    /// Most copies materialized for one repeated non-empty cell or
    /// formatted empty row run
    pub repeat_ceiling: u32,
}

impl Default for OdsReadOptions {
    fn default() -> Self {
        Self {
            settings: DocumentSettings::default(),
            repeat_ceiling: 1000,
        }
    }
}

/// ODS file reader
pub struct OdsReader;

impl OdsReader {
    /// Read a document from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> OdsResult<Document> {
        Self::read_file_with_options(path, &OdsReadOptions::default())
    }

    /// Read a document from a file path with explicit options
    pub fn read_file_with_options<P: AsRef<Path>>(
        path: P,
        options: &OdsReadOptions,
    ) -> OdsResult<Document> {
        let file = File::open(path)?;
        Self::read_with_options(BufReader::new(file), options)
    }

    /// Read a document from a reader
    pub fn read<R: Read + Seek>(reader: R) -> OdsResult<Document> {
        Self::read_with_options(reader, &OdsReadOptions::default())
    }

    /// Read a document from a reader with explicit options
    pub fn read_with_options<R: Read + Seek>(
        reader: R,
        options: &OdsReadOptions,
    ) -> OdsResult<Document> {
        let mut archive = ZipArchive::new(reader)?;

        let mut mimetype = String::new();
        match archive.by_name("mimetype") {
            Ok(mut file) => {
                file.read_to_string(&mut mimetype)?;
            }
            Err(ZipError::FileNotFound) => {
                return Err(OdsError::InvalidFormat("no mimetype entry".into()))
            }
            Err(e) => return Err(e.into()),
        }
        if mimetype.trim() != MIMETYPE {
            return Err(OdsError::InvalidFormat(format!(
                "unexpected mimetype '{}'",
                mimetype.trim()
            )));
        }

        let mut state = ReadState::new(options);

        match archive.by_name("styles.xml") {
            Ok(file) => state.parse(BufReader::new(file))?,
            Err(ZipError::FileNotFound) => log::debug!("package has no styles.xml"),
            Err(e) => return Err(e.into()),
        }
        match archive.by_name("content.xml") {
            Ok(file) => state.parse(BufReader::new(file))?,
            Err(ZipError::FileNotFound) => {
                return Err(OdsError::MissingPart("content.xml".into()))
            }
            Err(e) => return Err(e.into()),
        }
        match archive.by_name("meta.xml") {
            Ok(file) => state.parse(BufReader::new(file))?,
            Err(ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        log::debug!(
            "read ODS document with {} tables",
            state.document.table_count()
        );
        Ok(state.document)
    }
}

/// Qualified attributes of an element, unescaped
fn attributes(e: &BytesStart<'_>) -> OdsResult<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for a in e.attributes() {
        let a = a.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
        let value = a.unescape_value()?.into_owned();
        attrs.push((key, value));
    }
    Ok(attrs)
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn count_attr(attrs: &[(String, String)], key: &str) -> u32 {
    attr(attrs, key)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// A `table-cell` style before it is registered
#[derive(Debug, Clone, Default)]
struct CellStyleDef {
    style: Style,
    data_style: Option<String>,
}

/// Width or height of a column/row style
#[derive(Debug, Clone, Copy, Default)]
struct ExtentStyle {
    size: Option<f64>,
    optimal: bool,
}

/// Style element currently being read
enum OpenStyle {
    Cell(String, CellStyleDef),
    Column(String, ExtentStyle),
    Row(String, ExtentStyle),
    Table(String, Option<String>),
    Number(NumberStyleBuilder),
    Page(PageLayoutBuilder),
    Other,
}

/// Row being read, with the cells collected so far
struct RowCtx {
    repeat: u32,
    row: Row,
    default_style: Option<String>,
    col: u32,
}

/// Cell being read
struct CellCtx {
    col: u32,
    repeat: u32,
    attrs: Vec<(String, String)>,
    covered: bool,
    text: String,
    paragraphs: u32,
}

struct ReadState<'o> {
    options: &'o OdsReadOptions,
    document: Document,
    /// Default cell properties (`style:default-style`)
    base: Style,
    cell_styles: HashMap<String, CellStyleDef>,
    number_formats: HashMap<String, NumberFormat>,
    column_styles: HashMap<String, ExtentStyle>,
    row_styles: HashMap<String, ExtentStyle>,
    table_masters: HashMap<String, String>,
    master_layouts: HashMap<String, String>,
    page_layouts: HashMap<String, PageSetup>,
    style_ids: HashMap<String, StyleId>,
    /// Registry id of cells with no style reference
    default_id: Option<StyleId>,

    open_style: Option<OpenStyle>,
    table: Option<(Table, Option<String>)>,
    col_pos: u32,
    row_pos: u32,
    row: Option<RowCtx>,
    cell: Option<CellCtx>,
    paragraph_depth: u32,
    annotation_depth: u32,
    meta_field: Option<&'static str>,
    meta_text: String,
}

impl<'o> ReadState<'o> {
    fn new(options: &'o OdsReadOptions) -> Self {
        Self {
            options,
            document: Document::with_settings(options.settings),
            base: Style::default(),
            cell_styles: HashMap::new(),
            number_formats: HashMap::new(),
            column_styles: HashMap::new(),
            row_styles: HashMap::new(),
            table_masters: HashMap::new(),
            master_layouts: HashMap::new(),
            page_layouts: HashMap::new(),
            style_ids: HashMap::new(),
            default_id: None,
            open_style: None,
            table: None,
            col_pos: 1,
            row_pos: 1,
            row: None,
            cell: None,
            paragraph_depth: 0,
            annotation_depth: 0,
            meta_field: None,
            meta_text: String::new(),
        }
    }

    fn parse<R: BufRead>(&mut self, reader: R) -> OdsResult<()> {
        let mut xml = Reader::from_reader(reader);
        xml.trim_text(false);
        let mut buf = Vec::new();
        loop {
            match xml.read_event_into(&mut buf)? {
                Event::Start(e) => self.open(&e, false)?,
                Event::Empty(e) => {
                    self.open(&e, true)?;
                    self.close(e.name().as_ref())?;
                }
                Event::End(e) => self.close(e.name().as_ref())?,
                Event::Text(t) => {
                    let text = t.unescape()?;
                    self.text(&text);
                }
                Event::CData(t) => {
                    let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                    self.text(&text);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if self.meta_field.is_some() {
            self.meta_text.push_str(text);
            return;
        }
        if self.paragraph_depth > 0 && self.annotation_depth == 0 {
            if let Some(cell) = self.cell.as_mut() {
                cell.text.push_str(text);
            }
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> OdsResult<()> {
        let name = e.name();
        let name = name.as_ref();

        if self.cell.is_some() {
            return self.open_in_cell(e, name);
        }
        if self.open_style.is_some() {
            return self.open_in_style(e, name, empty);
        }

        match name {
            b"style:default-style" => {
                let attrs = attributes(e)?;
                self.open_style = Some(if attr(&attrs, "style:family") == Some("table-cell") {
                    OpenStyle::Cell(String::new(), CellStyleDef::default())
                } else {
                    OpenStyle::Other
                });
            }
            b"style:style" => {
                let attrs = attributes(e)?;
                let style_name = attr(&attrs, "style:name").unwrap_or_default().to_string();
                self.open_style = Some(match attr(&attrs, "style:family") {
                    Some("table-cell") => {
                        let mut def = match attr(&attrs, "style:parent-style-name") {
                            Some(parent) => match self.cell_styles.get(parent) {
                                Some(parent) => parent.clone(),
                                None => {
                                    log::warn!(
                                        "style {} has unknown parent '{}'",
                                        style_name,
                                        parent
                                    );
                                    self.base_def()
                                }
                            },
                            None => self.base_def(),
                        };
                        if let Some(data) = attr(&attrs, "style:data-style-name") {
                            def.data_style = Some(data.to_string());
                        }
                        OpenStyle::Cell(style_name, def)
                    }
                    Some("table-column") => OpenStyle::Column(style_name, ExtentStyle::default()),
                    Some("table-row") => OpenStyle::Row(style_name, ExtentStyle::default()),
                    Some("table") => OpenStyle::Table(
                        style_name,
                        attr(&attrs, "style:master-page-name").map(str::to_string),
                    ),
                    _ => OpenStyle::Other,
                });
            }
            b"number:number-style"
            | b"number:percentage-style"
            | b"number:currency-style"
            | b"number:date-style"
            | b"number:time-style"
            | b"number:boolean-style"
            | b"number:text-style" => {
                let attrs = attributes(e)?;
                let style_name = attr(&attrs, "style:name").unwrap_or_default().to_string();
                self.open_style = Some(OpenStyle::Number(NumberStyleBuilder::start(
                    name, style_name,
                )));
            }
            b"style:page-layout" => {
                let attrs = attributes(e)?;
                let style_name = attr(&attrs, "style:name").unwrap_or_default().to_string();
                self.open_style = Some(OpenStyle::Page(PageLayoutBuilder::new(style_name)));
            }
            b"style:master-page" => {
                let attrs = attributes(e)?;
                if let (Some(master), Some(layout)) = (
                    attr(&attrs, "style:name"),
                    attr(&attrs, "style:page-layout-name"),
                ) {
                    self.master_layouts
                        .insert(master.to_string(), layout.to_string());
                }
            }
            b"table:table" => {
                let attrs = attributes(e)?;
                let table_name = attr(&attrs, "table:name").unwrap_or("Sheet").to_string();
                let style = attr(&attrs, "table:style-name").map(str::to_string);
                self.table = Some((Table::with_settings(table_name, self.options.settings), style));
                self.col_pos = 1;
                self.row_pos = 1;
            }
            b"table:table-column" if self.table.is_some() => {
                let attrs = attributes(e)?;
                self.read_column(&attrs)?;
            }
            b"table:table-row" if self.table.is_some() => {
                let attrs = attributes(e)?;
                self.open_row(&attrs);
            }
            b"table:table-cell" | b"table:covered-table-cell" if self.row.is_some() => {
                let attrs = attributes(e)?;
                let col = self.row.as_ref().map_or(1, |r| r.col);
                self.cell = Some(CellCtx {
                    col,
                    repeat: count_attr(&attrs, "table:number-columns-repeated"),
                    attrs,
                    covered: name == b"table:covered-table-cell",
                    text: String::new(),
                    paragraphs: 0,
                });
            }
            b"dc:title" => self.meta_field = Some("title"),
            b"dc:subject" => self.meta_field = Some("subject"),
            b"meta:initial-creator" => self.meta_field = Some("author"),
            b"dc:creator" if self.document.properties.author.is_none() => {
                self.meta_field = Some("author")
            }
            b"meta:creation-date" => self.meta_field = Some("created"),
            _ => {}
        }
        Ok(())
    }

    fn base_def(&self) -> CellStyleDef {
        CellStyleDef {
            style: self.base.clone(),
            data_style: None,
        }
    }

    fn open_in_style(&mut self, e: &BytesStart<'_>, name: &[u8], empty: bool) -> OdsResult<()> {
        let Some(open) = self.open_style.as_mut() else {
            return Ok(());
        };
        match (open, name) {
            (OpenStyle::Cell(_, def), b"style:table-cell-properties") => {
                apply_cell_properties(&mut def.style, &attributes(e)?)
            }
            (OpenStyle::Cell(_, def), b"style:paragraph-properties") => {
                apply_paragraph_properties(&mut def.style, &attributes(e)?)
            }
            (OpenStyle::Cell(_, def), b"style:text-properties") => {
                apply_text_properties(&mut def.style, &attributes(e)?)
            }
            (OpenStyle::Column(_, ext), b"style:table-column-properties") => {
                let attrs = attributes(e)?;
                ext.size = attr(&attrs, "style:column-width").and_then(length_to_points);
                ext.optimal = attr(&attrs, "style:use-optimal-column-width") == Some("true");
            }
            (OpenStyle::Row(_, ext), b"style:table-row-properties") => {
                let attrs = attributes(e)?;
                ext.size = attr(&attrs, "style:row-height").and_then(length_to_points);
                ext.optimal = attr(&attrs, "style:use-optimal-row-height") == Some("true");
            }
            (OpenStyle::Number(builder), b"number:number") => builder.number(&attributes(e)?),
            (OpenStyle::Page(builder), b"style:page-layout-properties") => {
                builder.layout_properties(&attributes(e)?)
            }
            (OpenStyle::Page(builder), b"style:header-style") if !empty => {
                builder.enter_header(true)
            }
            (OpenStyle::Page(builder), b"style:footer-style") if !empty => {
                builder.enter_header(false)
            }
            (OpenStyle::Page(builder), b"style:header-footer-properties") => {
                builder.header_footer_properties(&attributes(e)?)
            }
            _ => {}
        }
        Ok(())
    }

    fn open_in_cell(&mut self, e: &BytesStart<'_>, name: &[u8]) -> OdsResult<()> {
        if name == b"office:annotation" {
            self.annotation_depth += 1;
            return Ok(());
        }
        if self.annotation_depth > 0 {
            return Ok(());
        }
        let Some(cell) = self.cell.as_mut() else {
            return Ok(());
        };
        match name {
            b"text:p" => {
                if cell.paragraphs > 0 {
                    cell.text.push('\n');
                }
                cell.paragraphs += 1;
                self.paragraph_depth += 1;
            }
            b"text:s" => {
                let attrs = attributes(e)?;
                let n = count_attr(&attrs, "text:c");
                cell.text.extend(std::iter::repeat(' ').take(n as usize));
            }
            b"text:tab" => cell.text.push('\t'),
            b"text:line-break" => cell.text.push('\n'),
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> OdsResult<()> {
        if self.meta_field.is_some() {
            return self.close_meta();
        }
        if self.cell.is_some() {
            match name {
                b"office:annotation" => self.annotation_depth -= 1,
                b"text:p" if self.annotation_depth == 0 => self.paragraph_depth -= 1,
                b"table:table-cell" | b"table:covered-table-cell"
                    if self.annotation_depth == 0 =>
                {
                    self.close_cell()?
                }
                _ => {}
            }
            return Ok(());
        }
        if self.open_style.is_some() {
            return self.close_style(name);
        }
        match name {
            b"table:table-row" if self.row.is_some() => self.close_row()?,
            b"table:table" => {
                if let Some((mut table, style)) = self.table.take() {
                    if let Some(setup) = style
                        .and_then(|s| self.table_masters.get(&s))
                        .and_then(|m| self.master_layouts.get(m))
                        .and_then(|l| self.page_layouts.get(l))
                    {
                        table.page_setup = setup.clone();
                    }
                    self.document.push_table(table);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_meta(&mut self) -> OdsResult<()> {
        let text = std::mem::take(&mut self.meta_text).trim().to_string();
        let props = &mut self.document.properties;
        match self.meta_field.take() {
            Some("title") => props.title = Some(text),
            Some("subject") => props.subject = Some(text),
            Some("author") => props.author = Some(text),
            Some("created") => props.created = Some(text),
            _ => {}
        }
        Ok(())
    }

    fn close_style(&mut self, name: &[u8]) -> OdsResult<()> {
        let done = match (&self.open_style, name) {
            (Some(OpenStyle::Cell(..)), b"style:style" | b"style:default-style") => true,
            (Some(OpenStyle::Column(..) | OpenStyle::Row(..) | OpenStyle::Table(..)), b"style:style") => true,
            (Some(OpenStyle::Other), b"style:style" | b"style:default-style") => true,
            (Some(OpenStyle::Number(_)), n) => n.starts_with(b"number:") && n.ends_with(b"-style"),
            (Some(OpenStyle::Page(_)), b"style:page-layout") => true,
            _ => false,
        };
        if !done {
            return Ok(());
        }
        match self.open_style.take() {
            Some(OpenStyle::Cell(name, def)) => {
                if name.is_empty() {
                    self.base = def.style;
                } else {
                    self.cell_styles.insert(name, def);
                }
            }
            Some(OpenStyle::Column(name, ext)) => {
                self.column_styles.insert(name, ext);
            }
            Some(OpenStyle::Row(name, ext)) => {
                self.row_styles.insert(name, ext);
            }
            Some(OpenStyle::Table(name, Some(master))) => {
                self.table_masters.insert(name, master);
            }
            Some(OpenStyle::Number(builder)) => {
                let name = builder.name.clone();
                self.number_formats.insert(name, builder.finish());
            }
            Some(OpenStyle::Page(builder)) => {
                let (name, setup) = builder.finish();
                self.page_layouts.insert(name, setup);
            }
            _ => {}
        }
        Ok(())
    }

    /// Registry id for a named cell style
    fn style_id(&mut self, name: &str) -> StyleId {
        if let Some(&id) = self.style_ids.get(name) {
            return id;
        }
        let style = match self.cell_styles.get(name) {
            Some(def) => {
                let mut style = def.style.clone();
                if let Some(data) = &def.data_style {
                    match self.number_formats.get(data) {
                        Some(format) => style.number_format = format.clone(),
                        None => log::warn!("style {} has unknown data style '{}'", name, data),
                    }
                }
                style
            }
            None => {
                log::warn!("unknown cell style '{}'", name);
                self.base.clone()
            }
        };
        let id = self.document.find_or_create_style(style);
        self.style_ids.insert(name.to_string(), id);
        id
    }

    /// Registry id of cells with no style of their own
    fn default_style_id(&mut self) -> StyleId {
        if let Some(id) = self.default_id {
            return id;
        }
        let id = if self.cell_styles.contains_key("Default") {
            self.style_id("Default")
        } else {
            self.document.find_or_create_style(self.base.clone())
        };
        self.default_id = Some(id);
        id
    }

    fn read_column(&mut self, attrs: &[(String, String)]) -> OdsResult<()> {
        let repeat = count_attr(attrs, "table:number-columns-repeated");
        let start = self.col_pos;
        self.col_pos = start.saturating_add(repeat);

        let max_col = self.options.settings.max_col;
        let ext = attr(attrs, "table:style-name")
            .and_then(|s| self.column_styles.get(s))
            .copied()
            .unwrap_or_default();
        let hidden = attr(attrs, "table:visibility").is_some_and(|v| v != "visible");
        let style_id = match attr(attrs, "table:default-cell-style-name") {
            Some(name) if name != "Default" => self.style_id(name),
            _ => DEFAULT_STYLE_ID,
        };
        let column = Column {
            index: Some(start),
            span: repeat.min(max_col.saturating_sub(start) + 1) - 1,
            width: ext.size,
            hidden,
            auto_fit_width: ext.optimal,
            style_id,
        };
        if start > max_col || !column.has_custom_settings() {
            return Ok(());
        }
        if let Some((table, _)) = self.table.as_mut() {
            table.columns_mut().push(column)?;
        }
        Ok(())
    }

    fn open_row(&mut self, attrs: &[(String, String)]) {
        let ext = attr(attrs, "table:style-name")
            .and_then(|s| self.row_styles.get(s))
            .copied()
            .unwrap_or_default();
        let default_style = attr(attrs, "table:default-cell-style-name").map(str::to_string);
        let style_id = match default_style.as_deref() {
            Some(name) if name != "Default" => self.style_id(name),
            _ => DEFAULT_STYLE_ID,
        };
        let row = Row {
            index: Some(self.row_pos),
            height: ext.size,
            hidden: attr(attrs, "table:visibility").is_some_and(|v| v != "visible"),
            auto_fit_height: ext.optimal,
            style_id,
            ..Row::default()
        };
        self.row = Some(RowCtx {
            repeat: count_attr(attrs, "table:number-rows-repeated"),
            row,
            default_style,
            col: 1,
        });
    }

    fn close_row(&mut self) -> OdsResult<()> {
        let Some(ctx) = self.row.take() else {
            return Ok(());
        };
        let start = self.row_pos;
        self.row_pos = start.saturating_add(ctx.repeat);

        let max_row = self.options.settings.max_row;
        let mut row = ctx.row;
        if start > max_row || (row.cells.is_empty() && !row.has_custom_settings()) {
            return Ok(());
        }
        if row.cells.is_empty() && ctx.repeat > self.options.repeat_ceiling {
            log::debug!(
                "skipping {} formatted empty rows at row {}",
                ctx.repeat,
                start
            );
            return Ok(());
        }
        row.span = ctx.repeat.min(max_row - start + 1) - 1;
        if let Some((table, _)) = self.table.as_mut() {
            table.rows_mut().push(row)?;
        }
        Ok(())
    }

    fn close_cell(&mut self) -> OdsResult<()> {
        let Some(ctx) = self.cell.take() else {
            return Ok(());
        };
        self.paragraph_depth = 0;
        if let Some(row) = self.row.as_mut() {
            row.col = ctx.col.saturating_add(ctx.repeat);
        }
        if ctx.covered {
            return Ok(());
        }

        let attrs = &ctx.attrs;
        let mut cell = Cell {
            value: Self::cell_value(attrs, ctx.text),
            ..Cell::default()
        };
        if let Some(formula) = attr(attrs, "table:formula") {
            cell.formula = Some(match formula_from_odf(formula) {
                Ok(f) => f,
                Err(err) => {
                    log::warn!("keeping untranslated formula '{}': {}", formula, err);
                    let stripped = formula.split_once(':').map_or(formula, |(_, f)| f);
                    stripped.to_string()
                }
            });
        }
        cell.merge_across = count_attr(attrs, "table:number-columns-spanned") - 1;
        cell.merge_down = count_attr(attrs, "table:number-rows-spanned") - 1;

        let style_name = attr(attrs, "table:style-name").map(str::to_string);
        let row_default = self.row.as_ref().and_then(|r| r.default_style.clone());
        cell.style_id = match style_name.or(row_default) {
            Some(name) => self.style_id(&name),
            None => {
                let column_style = self
                    .table
                    .as_ref()
                    .and_then(|(t, _)| t.column(ctx.col))
                    .map(|c| c.style_id)
                    .filter(|&id| id != DEFAULT_STYLE_ID);
                match column_style {
                    Some(id) => id,
                    None => self.default_style_id(),
                }
            }
        };
        let default_id = self.default_style_id();
        if cell.is_blank() || (cell.style_id == default_id && Cell {
            style_id: DEFAULT_STYLE_ID,
            ..cell.clone()
        }
        .is_blank())
        {
            return Ok(());
        }

        let max_col = self.options.settings.max_col;
        let mut copies = ctx.repeat;
        if copies > self.options.repeat_ceiling {
            log::warn!(
                "cell at column {} repeated {} times, keeping {}",
                ctx.col,
                copies,
                self.options.repeat_ceiling
            );
            copies = self.options.repeat_ceiling;
        }
        let Some(row) = self.row.as_mut() else {
            return Ok(());
        };
        for i in 0..copies {
            let col = ctx.col + i;
            if col > max_col {
                log::warn!("cell beyond column {} skipped", max_col);
                break;
            }
            let mut copy = cell.clone();
            copy.index = Some(col);
            row.row.cells.push(copy)?;
        }
        Ok(())
    }

    fn cell_value(attrs: &[(String, String)], text: String) -> CellValue {
        match attr(attrs, "office:value-type") {
            Some("float" | "percentage" | "currency") => {
                match attr(attrs, "office:value").and_then(parse_float) {
                    Some(n) => CellValue::Number(n),
                    None => {
                        log::warn!("numeric cell without a readable value, kept as text");
                        CellValue::Text(text)
                    }
                }
            }
            Some("boolean") => {
                CellValue::Boolean(attr(attrs, "office:boolean-value") == Some("true"))
            }
            Some("date") => match attr(attrs, "office:date-value") {
                Some(date) => CellValue::DateTime(date.to_string()),
                None => CellValue::Text(text),
            },
            Some("time") => match attr(attrs, "office:time-value") {
                Some(time) => CellValue::DateTime(time.to_string()),
                None => CellValue::Text(text),
            },
            Some(_) => {
                let text = attr(attrs, "office:string-value")
                    .map(str::to_string)
                    .unwrap_or(text);
                if ERROR_LITERALS.contains(&text.as_str()) {
                    CellValue::Error(text)
                } else {
                    CellValue::Text(text)
                }
            }
            None if text.is_empty() => CellValue::Empty,
            None => CellValue::Text(text),
        }
    }
}
