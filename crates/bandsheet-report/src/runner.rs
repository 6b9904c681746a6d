//! Orchestration of a full report run
//!
//! Query execution, the user's choice of action and opening the result in
//! an office suite live outside this crate. They are reached through the
//! [`QueryExecutor`], [`ActionChooser`] and [`ExternalOpener`] traits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ReportResult;
use crate::functions::FunctionRegistry;
use crate::generator::{GeneratorOptions, ReportGenerator};
use crate::loader::{load_template, LoaderOptions};
use crate::query::QueryTable;
use crate::sink::ReportSink;
use crate::value::Value;

/// Runs a template's query against its data source
pub trait QueryExecutor {
    fn execute(&mut self, data_source: &str, sql: &str) -> ReportResult<QueryTable>;
}

/// What to do with a generated report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAction {
    Print,
    Preview,
    /// Save to a file; the extension picks the format
    Export(PathBuf),
}

/// Asks which action to take; `None` cancels the run
pub trait ActionChooser {
    fn choose(&mut self, description: &str) -> Option<ReportAction>;
}

/// Hands a written report to an external viewer
pub trait ExternalOpener {
    fn open(&mut self, path: &Path) -> ReportResult<()>;

    fn print(&mut self, path: &Path) -> ReportResult<()> {
        self.open(path)
    }
}

/// Loads a template, runs its query, generates and delivers the report
pub struct ReportRunner<E, C, O> {
    executor: E,
    chooser: C,
    opener: O,
    functions: FunctionRegistry,
    loader: LoaderOptions,
    generator: GeneratorOptions,
    /// Where printed and previewed reports are written
    scratch_dir: PathBuf,
}

impl<E, C, O> ReportRunner<E, C, O>
where
    E: QueryExecutor,
    C: ActionChooser,
    O: ExternalOpener,
{
    pub fn new(executor: E, chooser: C, opener: O) -> Self {
        Self {
            executor,
            chooser,
            opener,
            functions: FunctionRegistry::new(),
            loader: LoaderOptions::default(),
            generator: GeneratorOptions::default(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_loader_options(mut self, options: LoaderOptions) -> Self {
        self.loader = options;
        self
    }

    pub fn with_generator_options(mut self, options: GeneratorOptions) -> Self {
        self.generator = options;
        self
    }

    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Run the template at `template_path`
    ///
    /// `variables` override both the template's `[var]` section and the
    /// variables the query returned. Returns the written file, or `None`
    /// when the chooser cancelled.
    pub fn run(
        &mut self,
        template_path: &Path,
        variables: BTreeMap<String, Value>,
    ) -> ReportResult<Option<PathBuf>> {
        let template = load_template(template_path, &self.loader)?;
        log::debug!("running report '{}'", template.name);

        let mut query = self.executor.execute(&template.data_source, &template.query)?;
        query.variables.extend(variables);

        let mut generator = ReportGenerator::new(&template, &self.functions)
            .with_options(self.generator.clone());
        if let Some(dir) = template_path.parent() {
            generator = generator.with_base_dir(dir);
        }
        let mut document = generator.generate(&query)?;

        let action = match self.chooser.choose(&template.description) {
            Some(action) => action,
            None => {
                log::debug!("report '{}' cancelled", template.name);
                return Ok(None);
            }
        };

        let (sink, path) = match &action {
            ReportAction::Export(path) => (ReportSink::for_path(path)?, path.clone()),
            ReportAction::Print | ReportAction::Preview => {
                let sink = template
                    .generator
                    .as_deref()
                    .and_then(ReportSink::from_hint)
                    .unwrap_or_else(|| ReportSink::Xmlss(Default::default()));
                let path = self
                    .scratch_dir
                    .join(format!("{}.{}", template.name, sink.extension()));
                (sink, path)
            }
        };
        sink.write(&mut document, &path)?;

        match action {
            ReportAction::Print => self.opener.print(&path)?,
            ReportAction::Preview => self.opener.open(&path)?,
            ReportAction::Export(_) => {}
        }
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandsheet_core::Document;
    use bandsheet_xmlss::{XmlssReader, XmlssWriter};
    use pretty_assertions::assert_eq;

    struct FixedQuery(QueryTable);

    impl QueryExecutor for FixedQuery {
        fn execute(&mut self, data_source: &str, sql: &str) -> ReportResult<QueryTable> {
            assert_eq!(data_source, "payroll");
            assert_eq!(sql, "select name from staff");
            Ok(self.0.clone())
        }
    }

    struct Choose(Option<ReportAction>);

    impl ActionChooser for Choose {
        fn choose(&mut self, _description: &str) -> Option<ReportAction> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct Recorder {
        opened: Vec<PathBuf>,
        printed: Vec<PathBuf>,
    }

    impl ExternalOpener for &mut Recorder {
        fn open(&mut self, path: &Path) -> ReportResult<()> {
            self.opened.push(path.to_path_buf());
            Ok(())
        }

        fn print(&mut self, path: &Path) -> ReportResult<()> {
            self.printed.push(path.to_path_buf());
            Ok(())
        }
    }

    fn write_template(dir: &Path) -> PathBuf {
        let mut doc = Document::new();
        let t = doc.add_table("staff");
        let table = doc.table_mut(t).unwrap();
        table.set_value(1, 3, "[data_source]").unwrap();
        table.set_value(1, 1, "payroll").unwrap();
        table.set_value(2, 3, "[query]").unwrap();
        table.set_value(2, 1, "select name from staff").unwrap();
        table.set_value(3, 3, "[header]").unwrap();
        table.set_value(3, 1, "[&title&]").unwrap();
        table.set_value(4, 3, "[detail]").unwrap();
        table.set_value(4, 1, "['name']").unwrap();
        let path = dir.join("staff.xml");
        XmlssWriter::write_file(&doc, &path).unwrap();
        path
    }

    fn query() -> QueryTable {
        QueryTable::new(["name"], vec![vec!["Ann".into()], vec!["Bob".into()]])
    }

    #[test]
    fn test_export_writes_requested_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let out = dir.path().join("staff-out.xml");
        let mut recorder = Recorder::default();

        let mut runner = ReportRunner::new(
            FixedQuery(query()),
            Choose(Some(ReportAction::Export(out.clone()))),
            &mut recorder,
        )
        .with_loader_options(LoaderOptions {
            use_cache: false,
            ..LoaderOptions::default()
        });
        let mut variables = BTreeMap::new();
        variables.insert("title".to_string(), Value::str("Staff"));
        let written = runner.run(&template, variables).unwrap();
        drop(runner);

        assert_eq!(written, Some(out.clone()));
        let doc = XmlssReader::read_file(&out).unwrap();
        let table = doc.table(0).unwrap();
        assert_eq!(table.value(1, 1).unwrap().as_text(), Some("Staff"));
        assert_eq!(table.value(2, 1).unwrap().as_text(), Some("Ann"));
        assert_eq!(table.value(3, 1).unwrap().as_text(), Some("Bob"));
        assert!(recorder.opened.is_empty());
    }

    #[test]
    fn test_preview_opens_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let scratch = tempfile::tempdir().unwrap();
        let mut recorder = Recorder::default();

        let mut runner = ReportRunner::new(FixedQuery(query()), Choose(Some(ReportAction::Preview)), &mut recorder)
            .with_scratch_dir(scratch.path())
            .with_loader_options(LoaderOptions {
                use_cache: false,
                ..LoaderOptions::default()
            });
        let written = runner.run(&template, BTreeMap::new()).unwrap();
        drop(runner);

        let expected = scratch.path().join("staff.xml");
        assert_eq!(written, Some(expected.clone()));
        assert_eq!(recorder.opened, vec![expected]);
        assert!(recorder.printed.is_empty());
    }

    #[test]
    fn test_cancel_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_template(dir.path());
        let mut recorder = Recorder::default();

        let mut runner = ReportRunner::new(FixedQuery(query()), Choose(None), &mut recorder)
            .with_scratch_dir(dir.path());
        assert_eq!(runner.run(&template, BTreeMap::new()).unwrap(), None);
    }
}
