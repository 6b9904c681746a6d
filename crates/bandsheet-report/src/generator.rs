//! Report generator
//!
//! Renders a [`ReportTemplate`] against a [`QueryTable`] into a new
//! [`Document`]. Bands are emitted top to bottom:
//!
//! ```text
//! upper, header
//! for each record:
//!     group footers (innermost first) for every group that broke
//!     group headers (outermost first) for every group that broke
//!     running sums take the record
//!     detail
//! group footers, footer, under
//! ```
//!
//! Bands outside the record loop see the first record (upper, header) or the
//! last one (footer, under).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use bandsheet_core::address::shift_formula;
use bandsheet_core::style::{StyleId, DEFAULT_STYLE_ID};
use bandsheet_core::{CellAddress, CellValue, Document, DocumentSettings, Table};

use crate::error::{ReportError, ReportResult};
use crate::expr::{parse_args, parse_block, parse_expr, CellInfo, Scope};
use crate::functions::FunctionRegistry;
use crate::loader::{load_template, LoaderOptions};
use crate::query::{QueryTable, Record};
use crate::sums::{Accumulator, SumKind, SumScope};
use crate::tag::{has_tags, tokenize, SysTag, Tag};
use crate::template::{Band, ReportTemplate, TemplateCell};
use crate::value::Value;

/// Sub-reports nested deeper than this are refused
const MAX_SUB_REPORT_DEPTH: usize = 8;

/// What to do when the query returns no records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnEmptyQuery {
    /// Fail with [`ReportError::EmptyQuery`]
    Abort,
    /// Render the bands that need no record
    #[default]
    ContinueEmpty,
}

/// Generator options
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub on_empty_query: OnEmptyQuery,
    /// How many times a tag's output is re-scanned for tags
    pub max_tag_depth: usize,
    /// Output table name (default: the template name)
    pub sheet_name: Option<String>,
    /// Settings of the generated document
    pub document_settings: DocumentSettings,
    /// How sub-report templates are loaded
    pub loader: LoaderOptions,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            on_empty_query: OnEmptyQuery::default(),
            max_tag_depth: 4,
            sheet_name: None,
            document_settings: DocumentSettings::default(),
            loader: LoaderOptions::default(),
        }
    }
}

/// Renders one template; reusable across queries
pub struct ReportGenerator<'a> {
    template: &'a ReportTemplate,
    functions: &'a FunctionRegistry,
    options: GeneratorOptions,
    /// Directory relative sub-report template paths resolve against
    base_dir: Option<PathBuf>,
    depth: usize,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(template: &'a ReportTemplate, functions: &'a FunctionRegistry) -> Self {
        Self {
            template,
            functions,
            options: GeneratorOptions::default(),
            base_dir: None,
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate a document holding one table
    pub fn generate(&self, query: &QueryTable) -> ReportResult<Document> {
        let template = self.template;
        if query.is_empty() && self.options.on_empty_query == OnEmptyQuery::Abort {
            return Err(ReportError::EmptyQuery(template.name.clone()));
        }

        let sheet_name = self
            .options
            .sheet_name
            .clone()
            .unwrap_or_else(|| match template.name.as_str() {
                "" => "Report".to_string(),
                name => name.to_string(),
            });
        let settings = self.options.document_settings;
        let mut document = Document::with_settings(settings);
        document.properties.title = Some(match query.variables.get("title") {
            Some(title) if !title.is_none() => title.to_string(),
            _ => template.name.clone(),
        });
        if !template.description.is_empty() {
            document.properties.subject = Some(template.description.clone());
        }

        let mut run = Run {
            generator: self,
            template,
            query,
            variables: merged_variables(template, query),
            document,
            table: Table::with_settings(sheet_name, settings),
            out_row: 1,
            style_cache: HashMap::from([(DEFAULT_STYLE_ID, DEFAULT_STYLE_ID)]),
            active_style: None,
            sums: BTreeMap::new(),
            snapshots: vec![None; template.groups.len()],
            pending_subs: Vec::new(),
        };
        run.prepare_sums()?;
        run.execute()?;
        run.finish()
    }
}

/// Template variables overridden by query variables
fn merged_variables(template: &ReportTemplate, query: &QueryTable) -> BTreeMap<String, Value> {
    let mut variables: BTreeMap<String, Value> = template
        .variables
        .iter()
        .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
        .collect();
    variables.extend(query.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
    variables
}

fn generate_error(template: &str, row: u32, col: u32, err: ReportError) -> ReportError {
    match err {
        e @ (ReportError::Generate { .. } | ReportError::TemplateParse { .. }) => e,
        other => ReportError::Generate {
            template: template.to_string(),
            cell: CellAddress::new(row, col).to_a1(),
            message: other.to_string(),
        },
    }
}

/// Where a template cell is being rendered
#[derive(Clone, Copy)]
struct CellCtx<'q> {
    record: Option<Record<'q>>,
    /// Template position
    tr: u32,
    tc: u32,
    /// Output position
    row: u32,
    col: u32,
}

/// State of one generation pass
struct Run<'g, 'q> {
    generator: &'g ReportGenerator<'g>,
    template: &'g ReportTemplate,
    query: &'q QueryTable,
    variables: BTreeMap<String, Value>,
    document: Document,
    table: Table,
    /// Next output row
    out_row: u32,
    /// Template style index -> document style id
    style_cache: HashMap<StyleId, StyleId>,
    /// Template style set by the last `[*name*]` tag
    active_style: Option<StyleId>,
    /// Accumulators keyed by template cell and sys-tag ordinal
    sums: BTreeMap<(u32, u32, usize), Accumulator>,
    /// Last grouping value per group
    snapshots: Vec<Option<Value>>,
    /// Sub-reports requested by the band being rendered: (name, row, col)
    pending_subs: Vec<(String, u32, u32)>,
}

impl<'g, 'q> Run<'g, 'q> {
    fn sum_scope(&self, row: u32, col: u32) -> SumScope {
        let template = self.template;
        for (i, group) in template.groups.iter().enumerate() {
            if group.header.contains(row, col) || group.footer.contains(row, col) {
                return SumScope::Group(i);
            }
        }
        if template.detail.contains(row, col) && !template.groups.is_empty() {
            return SumScope::Group(template.groups.len() - 1);
        }
        SumScope::Report
    }

    /// Create an accumulator for every sys tag of every band cell
    fn prepare_sums(&mut self) -> ReportResult<()> {
        let template = self.template;
        for (_, band) in template.bands() {
            for (r, c, cell) in template.band_cells(band) {
                let text = match cell.text() {
                    Some(text) => text,
                    None => continue,
                };
                let sys_tags = tokenize(text).into_iter().filter_map(|tag| match tag {
                    Tag::Sys(sys) => Some(sys),
                    _ => None,
                });
                for (i, sys) in sys_tags.enumerate() {
                    let (kind, expr) = match sys {
                        SysTag::Sum(src) => (SumKind::Sum, Some(src)),
                        SysTag::Avg(src) => (SumKind::Avg, Some(src)),
                        SysTag::Count => (SumKind::Count, None),
                    };
                    let expr = expr
                        .map(|src| parse_expr(&src))
                        .transpose()
                        .map_err(|e| generate_error(&template.name, r, c, e))?;
                    let scope = self.sum_scope(r, c);
                    self.sums.insert((r, c, i), Accumulator::new(kind, expr, scope));
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self) -> ReportResult<()> {
        let template = self.template;
        let query = self.query;
        let records: Vec<Record<'q>> = query.records().collect();
        log::debug!(
            "generating '{}' from {} records",
            template.name,
            records.len()
        );

        let first = records.first().copied();
        self.render_band(template.upper, first)?;
        self.render_band(template.header, first)?;

        let mut previous: Option<Record<'q>> = None;
        for record in &records {
            let record = *record;
            let break_at = template.groups.iter().enumerate().position(|(i, group)| {
                let value = record.get(&group.field).unwrap_or(&Value::None);
                !matches!(&self.snapshots[i], Some(seen) if seen.loose_eq(value))
            });

            if let Some(level) = break_at {
                if let Some(prev) = previous {
                    for i in (level..template.groups.len()).rev() {
                        self.render_band(template.groups[i].footer, Some(prev))?;
                    }
                }
                for i in level..template.groups.len() {
                    let group = &template.groups[i];
                    log::debug!("group '{}' starts at output row {}", group.field, self.out_row);
                    for acc in self.sums.values_mut().filter(|acc| acc.resets_at(i)) {
                        acc.reset();
                    }
                    self.render_band(group.header, Some(record))?;
                    self.snapshots[i] = Some(record.get(&group.field).cloned().unwrap_or_default());
                }
            }

            self.accumulate(record)?;
            self.render_band(template.detail, Some(record))?;
            previous = Some(record);
        }

        if let Some(last) = previous {
            for group in template.groups.iter().rev() {
                self.render_band(group.footer, Some(last))?;
            }
        }
        let last = records.last().copied();
        self.render_band(template.footer, last)?;
        self.render_band(template.under, last)?;
        Ok(())
    }

    fn accumulate(&mut self, record: Record<'q>) -> ReportResult<()> {
        let scope = Scope::new(
            Some(record),
            &self.variables,
            self.generator.functions,
            CellInfo::default(),
        );
        for (&(r, c, _), acc) in self.sums.iter_mut() {
            acc.update(&scope)
                .map_err(|e| generate_error(&self.template.name, r, c, e))?;
        }
        Ok(())
    }

    fn render_band(&mut self, band: Band, record: Option<Record<'q>>) -> ReportResult<()> {
        if band.is_empty() {
            return Ok(());
        }
        let template = self.template;
        let top = self.out_row;

        for r in band.row..=band.last_row() {
            if let Some(&height) = template.row_heights.get(&r) {
                self.table.set_row_height(top + r - band.row, height)?;
            }
        }

        for (tr, tc, cell) in template.band_cells(band) {
            let ctx = CellCtx {
                record,
                tr,
                tc,
                row: top + tr - band.row,
                col: tc - band.col + 1,
            };
            self.render_cell(cell, &ctx)
                .map_err(|e| generate_error(&template.name, tr, tc, e))?;
        }

        let mut bottom = top + band.row_size;
        for (name, row, col) in std::mem::take(&mut self.pending_subs) {
            let rows = self.splice_sub_report(&name, row, col)?;
            bottom = bottom.max(row + rows);
        }
        self.out_row = bottom;
        Ok(())
    }

    fn document_style(&mut self, template_style: StyleId) -> StyleId {
        if let Some(&id) = self.style_cache.get(&template_style) {
            return id;
        }
        let style = self
            .template
            .style(template_style)
            .cloned()
            .unwrap_or_default();
        let id = self.document.find_or_create_style(style);
        self.style_cache.insert(template_style, id);
        id
    }

    fn render_cell(&mut self, cell: &TemplateCell, ctx: &CellCtx<'q>) -> ReportResult<()> {
        let template = self.template;
        let value = match cell.text() {
            Some(text) if has_tags(text) => {
                let tags = tokenize(text);
                for tag in &tags {
                    match tag {
                        Tag::Style(name) => match template.style_lib.get(name) {
                            Some(&id) => self.active_style = Some(id),
                            None => log::warn!("unknown style '{}' in [*{}*]", name, name),
                        },
                        Tag::SubReport(name) => {
                            self.pending_subs.push((name.clone(), ctx.row, ctx.col));
                        }
                        _ => {}
                    }
                }
                self.render_tags(&tags, ctx, 0)?.into_cell_value()
            }
            _ => cell.value.clone(),
        };

        let template_style = if cell.is_styled() {
            cell.style_id
        } else {
            self.active_style.unwrap_or(DEFAULT_STYLE_ID)
        };
        let style_id = self.document_style(template_style);

        let formula = match &cell.formula {
            Some(f) => Some(shift_formula(f, (ctx.tr, ctx.tc), (ctx.row, ctx.col))?),
            None => None,
        };

        let merged = cell.merge_across > 0 || cell.merge_down > 0;
        if value.is_empty() && formula.is_none() && style_id == DEFAULT_STYLE_ID && !merged {
            return Ok(());
        }
        self.write_cell(ctx.row, ctx.col, value, formula, style_id)?;
        if merged {
            self.table
                .set_merge(ctx.row, ctx.col, cell.merge_across, cell.merge_down)?;
        }
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: u32,
        col: u32,
        value: CellValue,
        formula: Option<String>,
        style_id: StyleId,
    ) -> ReportResult<()> {
        let out = self.table.cell_mut(row, col)?.ok_or_else(|| {
            ReportError::eval(format!(
                "output cell {} is beyond the last addressable cell",
                CellAddress::new(row, col).to_a1()
            ))
        })?;
        out.value = value;
        out.formula = formula;
        out.style_id = style_id;
        Ok(())
    }

    /// Evaluate a tokenized text
    ///
    /// One value-producing tag with nothing but blanks around it keeps its
    /// type; anything else renders to a string.
    fn render_tags(&self, tags: &[Tag], ctx: &CellCtx<'q>, depth: usize) -> ReportResult<Value> {
        let producing = tags.iter().filter(|t| t.produces_value()).count();
        let has_text = tags
            .iter()
            .any(|t| matches!(t, Tag::Literal(s) if !s.trim().is_empty()));

        let mut sys_index = 0;
        let mut next_sys = || {
            let i = sys_index;
            sys_index += 1;
            i
        };

        if producing == 1 && !has_text {
            let mut value = Value::None;
            for tag in tags {
                if let Tag::Sys(_) = tag {
                    value = self.eval_sys(ctx, next_sys(), depth);
                } else if tag.produces_value() {
                    value = self.eval_tag(tag, ctx)?;
                }
            }
            return self.rescan(value, ctx, depth);
        }

        let mut out = String::new();
        for tag in tags {
            match tag {
                Tag::Literal(s) => out.push_str(s),
                Tag::Sys(_) => out.push_str(&self.eval_sys(ctx, next_sys(), depth).to_string()),
                Tag::Style(_) | Tag::SubReport(_) => {}
                other => out.push_str(&self.eval_tag(other, ctx)?.to_string()),
            }
        }
        self.rescan(Value::Str(out), ctx, depth)
    }

    /// Re-evaluate string output that itself contains tags
    fn rescan(&self, value: Value, ctx: &CellCtx<'q>, depth: usize) -> ReportResult<Value> {
        match value {
            Value::Str(s) if has_tags(&s) => {
                if depth >= self.generator.options.max_tag_depth {
                    log::warn!(
                        "tag output at {} still holds tags after {} passes, left as text",
                        CellAddress::new(ctx.row, ctx.col).to_a1(),
                        depth
                    );
                    return Ok(Value::Str(s));
                }
                self.render_tags(&tokenize(&s), ctx, depth + 1)
            }
            other => Ok(other),
        }
    }

    fn eval_sys(&self, ctx: &CellCtx<'q>, index: usize, depth: usize) -> Value {
        if depth > 0 {
            log::warn!("running sums cannot be produced by other tags");
            return Value::None;
        }
        self.sums
            .get(&(ctx.tr, ctx.tc, index))
            .map(Accumulator::value)
            .unwrap_or_default()
    }

    fn scope(&self, ctx: &CellCtx<'q>) -> Scope<'_> {
        Scope::new(
            ctx.record,
            &self.variables,
            self.generator.functions,
            CellInfo {
                row: ctx.row,
                col: ctx.col,
                value: Value::None,
            },
        )
    }

    fn eval_tag(&self, tag: &Tag, ctx: &CellCtx<'q>) -> ReportResult<Value> {
        Ok(match tag {
            Tag::Literal(s) => Value::Str(s.clone()),
            Tag::Field(field) => match ctx.record.and_then(|r| r.get(field)) {
                Some(v) => v.clone(),
                None => {
                    if ctx.record.is_some() {
                        log::warn!("record has no field '{}'", field);
                    }
                    Value::None
                }
            },
            Tag::Var(name) => match self.variables.get(name) {
                Some(v) => v.clone(),
                None => {
                    log::warn!("report variable '{}' is not defined", name);
                    Value::None
                }
            },
            Tag::Func { name, args } => {
                let scope = self.scope(ctx);
                let args = parse_args(args)?
                    .iter()
                    .map(|a| scope.eval(a))
                    .collect::<ReportResult<Vec<_>>>()?;
                self.generator
                    .functions
                    .call(name, &args, &scope.function_context())?
            }
            Tag::Lambda { param, body } => {
                let mut scope = self.scope(ctx);
                scope.record_alias = Some(param.as_str());
                scope.eval(&parse_expr(body)?)?
            }
            Tag::Exec(code) => {
                let mut scope = self.scope(ctx);
                scope.exec(&parse_block(code)?)?;
                scope.cell.value
            }
            Tag::Sys(_) | Tag::Style(_) | Tag::SubReport(_) => Value::None,
        })
    }

    /// Generate a named sub-report and copy its grid with its top-left at
    /// `(row, col)`; returns the rows it occupies
    fn splice_sub_report(&mut self, name: &str, row: u32, col: u32) -> ReportResult<u32> {
        let query = self.query;
        let sub = match query.sub_reports.get(name) {
            Some(sub) => sub,
            None => {
                log::warn!("no sub-report named '{}' in the query", name);
                return Ok(0);
            }
        };
        let generator = self.generator;
        if generator.depth >= MAX_SUB_REPORT_DEPTH {
            return Err(ReportError::eval(format!(
                "sub-report '{}' nested deeper than {} levels",
                name, MAX_SUB_REPORT_DEPTH
            )));
        }

        let path = match &generator.base_dir {
            Some(dir) if sub.template.is_relative() => dir.join(&sub.template),
            _ => sub.template.clone(),
        };
        log::debug!("splicing sub-report '{}' from {}", name, path.display());
        let template = load_template(&path, &generator.options.loader)?;
        let nested = ReportGenerator {
            template: &template,
            functions: generator.functions,
            options: GeneratorOptions {
                sheet_name: None,
                ..generator.options.clone()
            },
            base_dir: path.parent().map(Path::to_path_buf),
            depth: generator.depth + 1,
        };
        let sub_doc = nested.generate(&sub.query)?;
        let sub_table = match sub_doc.table(0) {
            Some(table) => table,
            None => return Ok(0),
        };

        let (rows, _) = sub_table.used_extent();
        for (r, c, cell) in sub_table.iter_cells() {
            let (out_r, out_c) = (row + r - 1, col + c - 1);
            let style_id = self.document.find_or_create_style(sub_doc.style(cell.style_id).clone());
            let formula = match &cell.formula {
                Some(f) => Some(shift_formula(f, (r, c), (out_r, out_c))?),
                None => None,
            };
            self.write_cell(out_r, out_c, cell.value.clone(), formula, style_id)?;
            if cell.is_merged() {
                self.table
                    .set_merge(out_r, out_c, cell.merge_across, cell.merge_down)?;
            }
        }
        for (start, sub_row) in sub_table.rows().iter() {
            if let Some(height) = sub_row.height {
                for r in start..=start + sub_row.span {
                    self.table.set_row_height(row + r - 1, height)?;
                }
            }
        }
        Ok(rows)
    }

    /// Apply coordinate fills, column widths and page setup; hand the
    /// document over
    fn finish(mut self) -> ReportResult<Document> {
        let template = self.template;
        let query = self.query;
        for (row, col, value) in query.coord_fills() {
            let style_id = self.table.cell_style(row, col)?.unwrap_or(DEFAULT_STYLE_ID);
            self.write_cell(row, col, value.clone().into_cell_value(), None, style_id)
                .map_err(|e| generate_error(&template.name, row, col, e))?;
        }
        for (&col, &width) in &template.column_widths {
            self.table.set_column_width(col, width)?;
        }
        self.table.page_setup = template.page_setup.clone();

        log::debug!(
            "generated '{}': {} rows, {} cells",
            template.name,
            self.out_row - 1,
            self.table.cell_count()
        );
        let mut document = self.document;
        document.push_table(self.table);
        Ok(document)
    }
}
