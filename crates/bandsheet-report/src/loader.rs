//! Template loader
//!
//! Reads an authoring spreadsheet and turns its first table into a
//! [`ReportTemplate`]. Section tags (`[header]`, `[detail]`,
//! `[head_grp:dept]`, ...) sit in the rightmost tagged column; every tagged
//! row opens a section that runs down to the next tagged row.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use bandsheet_core::style::{StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::{CellAddress, CellValue, Document, DocumentSettings, Table};
use bandsheet_ods::{OdsReadOptions, OdsReader};
use bandsheet_xmlss::XmlssReader;

use crate::cache;
use crate::error::{ReportError, ReportResult};
use crate::template::{Band, Group, ReportTemplate, TemplateCell};

static SECTION_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*\[\s*(description|var|generator|data_source|query|style_lib|header|footer|detail|upper|under|head_grp|foot_grp)\s*(?::\s*([^\]]*?)\s*)?\]\s*$",
    )
    .expect("section tag pattern is valid")
});

/// How templates are loaded
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Reuse and refresh the compiled `.bstc` snapshot next to the source
    pub use_cache: bool,
    /// Settings the authoring document is read with
    pub document_settings: DocumentSettings,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            document_settings: DocumentSettings::default(),
        }
    }
}

/// Load a template, going through the snapshot cache when enabled
pub fn load_template<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> ReportResult<ReportTemplate> {
    let path = path.as_ref();
    if options.use_cache {
        let settings = options.document_settings;
        cache::load_or_compile(path, |source| compile_template(source, &settings))
    } else {
        compile_template(path, &options.document_settings)
    }
}

/// Read and parse a template source file, bypassing the cache
pub fn compile_template(path: &Path, settings: &DocumentSettings) -> ReportResult<ReportTemplate> {
    let name = template_name(path);
    let unreadable = |message: String| ReportError::TemplateParse {
        template: name.clone(),
        cell: "-".to_string(),
        message,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let document = match extension.as_str() {
        "xml" => {
            let file = File::open(path).map_err(|e| unreadable(e.to_string()))?;
            XmlssReader::read_with_settings(BufReader::new(file), *settings)
                .map_err(|e| unreadable(e.to_string()))?
        }
        "ods" => {
            let options = OdsReadOptions {
                settings: *settings,
                ..OdsReadOptions::default()
            };
            OdsReader::read_file_with_options(path, &options).map_err(|e| unreadable(e.to_string()))?
        }
        other => return Err(ReportError::UnsupportedFormat(format!("template extension '{}'", other))),
    };

    log::debug!("parsing template '{}' from {}", name, path.display());
    parse_template(&name, &document)
}

/// Template name derived from the file stem
pub fn template_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
enum Section {
    Description,
    Var,
    Generator,
    DataSource,
    Query,
    StyleLib,
    Header,
    Footer,
    Detail,
    Upper,
    Under,
    HeadGroup(String),
    FootGroup(String),
}

/// Recognize a section tag; `Some(Err)` for a group tag without a field
fn section_tag(text: &str) -> Option<Result<Section, String>> {
    let caps = SECTION_TAG.captures(text)?;
    let kind = caps.get(1)?.as_str().to_lowercase();
    let arg = caps.get(2).map(|m| m.as_str().trim().to_string());

    let group_field = |arg: Option<String>| match arg {
        Some(field) if !field.is_empty() => Ok(field),
        _ => Err(format!("group tag '{}' names no field", text.trim())),
    };
    Some(Ok(match kind.as_str() {
        "description" => Section::Description,
        "var" => Section::Var,
        "generator" => Section::Generator,
        "data_source" => Section::DataSource,
        "query" => Section::Query,
        "style_lib" => Section::StyleLib,
        "header" => Section::Header,
        "footer" => Section::Footer,
        "detail" => Section::Detail,
        "upper" => Section::Upper,
        "under" => Section::Under,
        "head_grp" => match group_field(arg) {
            Ok(field) => Section::HeadGroup(field),
            Err(e) => return Some(Err(e)),
        },
        "foot_grp" => match group_field(arg) {
            Ok(field) => Section::FootGroup(field),
            Err(e) => return Some(Err(e)),
        },
        _ => return None,
    }))
}

fn cell_text(value: &CellValue) -> Option<&str> {
    match value {
        CellValue::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
        _ => None,
    }
}

struct TemplateBuilder<'a> {
    name: &'a str,
    document: &'a Document,
    table: &'a Table,
    template: ReportTemplate,
    /// Document style id -> template style index
    style_map: HashMap<StyleId, StyleId>,
    /// Columns to the left of the tag column
    width: u32,
}

impl<'a> TemplateBuilder<'a> {
    fn error(&self, row: u32, col: u32, message: String) -> ReportError {
        ReportError::TemplateParse {
            template: self.name.to_string(),
            cell: CellAddress::new(row, col).to_a1(),
            message,
        }
    }

    fn map_style(&mut self, id: StyleId) -> StyleId {
        if let Some(&mapped) = self.style_map.get(&id) {
            return mapped;
        }
        let mapped = self.template.styles.len() as StyleId;
        self.template.styles.push(self.document.style(id).clone());
        self.style_map.insert(id, mapped);
        mapped
    }

    /// Non-empty texts of a row, left to right, inside the band columns
    fn row_texts(&self, row: u32) -> Vec<String> {
        self.table
            .row(row)
            .map(|r| {
                r.cells
                    .iter()
                    .filter(|(col, _)| *col <= self.width)
                    .filter_map(|(_, cell)| match &cell.value {
                        CellValue::Empty => None,
                        v => Some(v.to_string()),
                    })
                    .filter(|s| !s.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn first_texts(&self, rows: (u32, u32)) -> Vec<String> {
        (rows.0..=rows.1)
            .filter_map(|r| self.row_texts(r).into_iter().next())
            .collect()
    }

    fn apply_meta(&mut self, section: &Section, rows: (u32, u32)) {
        match section {
            Section::Description => self.template.description = self.first_texts(rows).join("\n"),
            Section::Query => self.template.query = self.first_texts(rows).join("\n"),
            Section::Generator => {
                if let Some(hint) = self.first_texts(rows).into_iter().next() {
                    self.template.generator = Some(hint.trim().to_lowercase());
                }
            }
            Section::DataSource => {
                if let Some(source) = self.first_texts(rows).into_iter().next() {
                    self.template.data_source = source.trim().to_string();
                }
            }
            Section::Var => {
                for r in rows.0..=rows.1 {
                    let name = self.table.value(r, 1).unwrap_or_default().to_string();
                    if name.trim().is_empty() {
                        continue;
                    }
                    let value = if self.width >= 2 {
                        self.table.value(r, 2).unwrap_or_default().to_string()
                    } else {
                        String::new()
                    };
                    self.template.variables.insert(name.trim().to_string(), value);
                }
            }
            Section::StyleLib => {
                for r in rows.0..=rows.1 {
                    let entries: Vec<(String, StyleId)> = match self.table.row(r) {
                        Some(row) => row
                            .cells
                            .iter()
                            .filter(|(col, _)| *col <= self.width)
                            .filter_map(|(_, cell)| {
                                cell_text(&cell.value).map(|t| (t.trim().to_string(), cell.style_id))
                            })
                            .collect(),
                        None => continue,
                    };
                    for (style_name, id) in entries {
                        let mapped = self.map_style(id);
                        self.template.style_lib.insert(style_name, mapped);
                    }
                }
            }
            _ => {}
        }
    }

    /// Extend or create a band; `row` is the tagged row for error reporting
    fn place_band(&self, existing: Band, rows: (u32, u32), tag_col: u32, label: &str) -> ReportResult<Band> {
        let size = rows.1 - rows.0 + 1;
        if existing.row_size == 0 {
            return Ok(Band::new(rows.0, 1, size, self.width));
        }
        if existing.row + existing.row_size != rows.0 {
            return Err(self.error(
                rows.0,
                tag_col,
                format!("[{}] repeated but not contiguous with rows {}..{}", label, existing.row, existing.last_row()),
            ));
        }
        Ok(Band::new(existing.row, 1, existing.row_size + size, self.width))
    }

    fn group_index(&mut self, field: &str) -> usize {
        match self.template.groups.iter().position(|g| g.field == field) {
            Some(i) => i,
            None => {
                self.template.groups.push(Group {
                    field: field.to_string(),
                    ..Group::default()
                });
                self.template.groups.len() - 1
            }
        }
    }

    fn apply_band(&mut self, section: &Section, rows: (u32, u32), tag_col: u32) -> ReportResult<()> {
        match section {
            Section::Header => self.template.header = self.place_band(self.template.header, rows, tag_col, "header")?,
            Section::Footer => self.template.footer = self.place_band(self.template.footer, rows, tag_col, "footer")?,
            Section::Detail => self.template.detail = self.place_band(self.template.detail, rows, tag_col, "detail")?,
            Section::Upper => self.template.upper = self.place_band(self.template.upper, rows, tag_col, "upper")?,
            Section::Under => self.template.under = self.place_band(self.template.under, rows, tag_col, "under")?,
            Section::HeadGroup(field) => {
                let i = self.group_index(field);
                let label = format!("head_grp:{}", field);
                self.template.groups[i].header =
                    self.place_band(self.template.groups[i].header, rows, tag_col, &label)?;
            }
            Section::FootGroup(field) => {
                let i = self.group_index(field);
                let label = format!("foot_grp:{}", field);
                self.template.groups[i].footer =
                    self.place_band(self.template.groups[i].footer, rows, tag_col, &label)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Copy the cells, row heights and column widths that bands cover
    fn copy_grid(&mut self, band_rows: &[(u32, u32)]) {
        let in_band = |r: u32| band_rows.iter().any(|&(a, b)| (a..=b).contains(&r));

        let cells: Vec<(u32, u32, TemplateCell, StyleId)> = self
            .table
            .iter_cells()
            .filter(|&(r, c, _)| c <= self.width && in_band(r))
            .map(|(r, c, cell)| {
                let template_cell = TemplateCell {
                    value: cell.value.clone(),
                    formula: cell.formula.clone(),
                    style_id: DEFAULT_STYLE_ID,
                    merge_across: cell.merge_across.min(self.width - c),
                    merge_down: cell.merge_down,
                };
                (r, c, template_cell, cell.style_id)
            })
            .collect();
        for (r, c, mut cell, doc_style) in cells {
            cell.style_id = self.map_style(doc_style);
            self.template.cells.insert((r, c), cell);
        }

        for (start, row) in self.table.rows().iter() {
            if let Some(height) = row.height {
                for r in (start..=start + row.span).filter(|&r| in_band(r)) {
                    self.template.row_heights.insert(r, height);
                }
            }
        }
        for (start, column) in self.table.columns().iter() {
            if let Some(width) = column.width {
                for c in (start..=start + column.span).filter(|&c| c <= self.width) {
                    self.template.column_widths.insert(c, width);
                }
            }
        }
    }
}

/// Parse the first table of an authoring document
pub fn parse_template(name: &str, document: &Document) -> ReportResult<ReportTemplate> {
    let table = document.table(0).ok_or_else(|| ReportError::TemplateParse {
        template: name.to_string(),
        cell: "-".to_string(),
        message: "document has no tables".to_string(),
    })?;

    let tag_col = table
        .iter_cells()
        .filter(|(_, _, cell)| cell_text(&cell.value).map_or(false, |t| section_tag(t).is_some()))
        .map(|(_, c, _)| c)
        .max();

    let (last_row, last_col) = table.used_extent();
    let mut builder = TemplateBuilder {
        name,
        document,
        table,
        template: ReportTemplate {
            name: name.to_string(),
            styles: vec![document.style(DEFAULT_STYLE_ID).clone()],
            page_setup: table.page_setup.clone(),
            ..ReportTemplate::default()
        },
        style_map: HashMap::from([(DEFAULT_STYLE_ID, DEFAULT_STYLE_ID)]),
        width: last_col,
    };

    let tag_col = match tag_col {
        Some(col) => col,
        None => {
            log::debug!("template '{}' has no section tags, using one header band", name);
            if last_row > 0 && last_col > 0 {
                builder.template.header = Band::new(1, 1, last_row, last_col);
                builder.copy_grid(&[(1, last_row)]);
            }
            return Ok(builder.template);
        }
    };
    builder.width = tag_col - 1;
    if builder.width == 0 {
        log::warn!("template '{}' has its section tags in column A, bands are empty", name);
    }

    // Tagged rows in order
    let mut tagged: Vec<(u32, Section)> = Vec::new();
    for r in 1..=last_row {
        let value = table.value(r, tag_col).unwrap_or_default();
        if value.is_empty() {
            continue;
        }
        let text = value.to_string();
        match section_tag(&text) {
            Some(Ok(section)) => tagged.push((r, section)),
            Some(Err(message)) => return Err(builder.error(r, tag_col, message)),
            None if text.trim().is_empty() => {}
            None => {
                return Err(builder.error(r, tag_col, format!("unknown tag '{}' in the tag column", text.trim())))
            }
        }
    }

    if let Some(&(first, _)) = tagged.first() {
        if (1..first).any(|r| !builder.row_texts(r).is_empty()) {
            log::warn!(
                "template '{}': rows above the first tag (row {}) are ignored",
                name,
                first
            );
        }
    }

    let mut band_rows = Vec::new();
    for (i, (start, section)) in tagged.iter().enumerate() {
        let end = tagged.get(i + 1).map_or(last_row, |(next, _)| next - 1);
        let rows = (*start, end);
        match section {
            Section::Description
            | Section::Var
            | Section::Generator
            | Section::DataSource
            | Section::Query
            | Section::StyleLib => builder.apply_meta(section, rows),
            _ => {
                builder.apply_band(section, rows, tag_col)?;
                band_rows.push(rows);
            }
        }
    }

    for group in &builder.template.groups {
        if group.header.is_empty() {
            log::warn!("template '{}': group '{}' has no header band", name, group.field);
        }
        if group.footer.is_empty() {
            log::warn!("template '{}': group '{}' has no footer band", name, group.field);
        }
    }

    builder.copy_grid(&band_rows);
    log::debug!(
        "template '{}': {} bands, {} groups, {} cells, {} styles",
        name,
        builder.template.bands().len(),
        builder.template.groups.len(),
        builder.template.cells.len(),
        builder.template.styles.len()
    );
    Ok(builder.template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandsheet_core::Style;
    use pretty_assertions::assert_eq;

    fn sheet(rows: &[&[&str]]) -> Document {
        let mut doc = Document::new();
        let t = doc.add_table("Template");
        let table = doc.table_mut(t).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if !text.is_empty() {
                    table.set_value(r as u32 + 1, c as u32 + 1, *text).unwrap();
                }
            }
        }
        doc
    }

    #[test]
    fn test_section_tags() {
        assert_eq!(section_tag(" [ HEADER ] ").unwrap().unwrap(), Section::Header);
        assert_eq!(
            section_tag("[head_grp: dept ]").unwrap().unwrap(),
            Section::HeadGroup("dept".into())
        );
        assert!(section_tag("[foot_grp:]").unwrap().is_err());
        assert!(section_tag("[total]").is_none());
        assert!(section_tag("['name']").is_none());
    }

    #[test]
    fn test_bands_and_meta() {
        let doc = sheet(&[
            &["Payroll report", "", "[description]"],
            &["title", "Payroll", "[var]"],
            &["currency", "EUR", ""],
            &["ods", "", "[generator]"],
            &["SELECT *", "", "[query]"],
            &["FROM staff", "", ""],
            &["Name", "Amount", "[header]"],
            &["['dept']", "", "[head_grp:dept]"],
            &["['name']", "['amount']", "[detail]"],
            &["Total", "[^SUM(amount)^]", "[foot_grp:dept]"],
            &["End", "", "[footer]"],
        ]);
        let template = parse_template("payroll", &doc).unwrap();

        assert_eq!(template.description, "Payroll report");
        assert_eq!(template.variables["title"], "Payroll");
        assert_eq!(template.variables["currency"], "EUR");
        assert_eq!(template.generator.as_deref(), Some("ods"));
        assert_eq!(template.query, "SELECT *\nFROM staff");

        assert_eq!(template.header, Band::new(7, 1, 1, 2));
        assert_eq!(template.detail, Band::new(9, 1, 1, 2));
        assert_eq!(template.footer, Band::new(11, 1, 1, 2));
        assert_eq!(template.groups.len(), 1);
        assert_eq!(template.groups[0].field, "dept");
        assert_eq!(template.groups[0].header, Band::new(8, 1, 1, 2));
        assert_eq!(template.groups[0].footer, Band::new(10, 1, 1, 2));

        // Tag column stripped, meta rows not copied
        assert!(template.cells.keys().all(|&(r, c)| c <= 2 && r >= 7));
        assert_eq!(template.cell(9, 2).unwrap().text(), Some("['amount']"));
    }

    #[test]
    fn test_multi_row_and_repeated_bands() {
        let doc = sheet(&[
            &["a", "[detail]"],
            &["b", ""],
            &["c", "[detail]"],
            &["d", "[footer]"],
        ]);
        let template = parse_template("t", &doc).unwrap();
        assert_eq!(template.detail, Band::new(1, 1, 3, 1));

        let doc = sheet(&[&["a", "[detail]"], &["b", "[footer]"], &["c", "[detail]"]]);
        let err = parse_template("t", &doc).unwrap_err();
        assert!(matches!(err, ReportError::TemplateParse { ref cell, .. } if cell == "B3"));
    }

    #[test]
    fn test_untagged_template_is_one_header() {
        let doc = sheet(&[&["Title", ""], &["", "['x']"]]);
        let template = parse_template("plain", &doc).unwrap();
        assert_eq!(template.header, Band::new(1, 1, 2, 2));
        assert!(template.detail.is_empty());
        assert_eq!(template.cells.len(), 2);
    }

    #[test]
    fn test_unknown_tag_in_tag_column() {
        let doc = sheet(&[&["x", "[header]"], &["y", "oops"]]);
        let err = parse_template("t", &doc).unwrap_err();
        assert!(matches!(err, ReportError::TemplateParse { ref cell, .. } if cell == "B2"));
    }

    #[test]
    fn test_styles_and_style_lib() {
        let mut doc = sheet(&[&["bold", "[style_lib]"], &["Name", "[header]"]]);
        let bold = doc.find_or_create_style(Style::new().bold(true));
        let t = doc.table_mut(0).unwrap();
        t.set_cell_style(1, 1, bold).unwrap();
        t.set_cell_style(2, 1, bold).unwrap();
        t.set_column_width(1, 80.0).unwrap();

        let template = parse_template("t", &doc).unwrap();
        assert_eq!(template.styles.len(), 2);
        assert_eq!(template.style_lib["bold"], 1);
        assert_eq!(template.cell(2, 1).unwrap().style_id, 1);
        assert_eq!(template.style(1), Some(&Style::new().bold(true)));
        assert_eq!(template.column_widths.get(&1), Some(&80.0));
    }

    #[test]
    fn test_unpaired_group_gets_empty_band() {
        let doc = sheet(&[&["['k']", "[head_grp:k]"], &["x", "[detail]"]]);
        let template = parse_template("t", &doc).unwrap();
        assert_eq!(template.groups[0].header, Band::new(1, 1, 1, 1));
        assert!(template.groups[0].footer.is_empty());
    }
}
