//! # bandsheet-report
//!
//! Band template loader, tag language and report generator.
//!
//! A template is an ordinary spreadsheet whose rightmost used column holds
//! section tags (`[header]`, `[detail]`, `[head_grp:dept]`, ...). The rows
//! each tag covers form a band. Cells inside bands carry tags such as
//! `['field']`, `[&variable&]`, `[~expression~]` or `[^SUM(amount)^]` that
//! are evaluated once per record.
//!
//! ## Example
//!
//! ```rust
//! use bandsheet_core::{CellValue, Document};
//! use bandsheet_report::{parse_template, FunctionRegistry, QueryTable, ReportGenerator};
//!
//! let mut authoring = Document::new();
//! let t = authoring.add_table("staff");
//! let sheet = authoring.table_mut(t).unwrap();
//! sheet.set_value(1, 1, "['name']").unwrap();
//! sheet.set_value(1, 2, "[^SUM(amount)^]").unwrap();
//! sheet.set_value(1, 3, "[detail]").unwrap();
//!
//! let template = parse_template("staff", &authoring).unwrap();
//! let query = QueryTable::new(
//!     ["name", "amount"],
//!     vec![vec!["Ann".into(), 10.into()], vec!["Bob".into(), 5.into()]],
//! );
//!
//! let functions = FunctionRegistry::new();
//! let report = ReportGenerator::new(&template, &functions).generate(&query).unwrap();
//! let table = report.table(0).unwrap();
//! assert_eq!(table.value(2, 1).unwrap(), CellValue::Text("Bob".into()));
//! assert_eq!(table.value(2, 2).unwrap(), CellValue::Number(15.0));
//! ```

pub mod cache;
pub mod error;
pub mod expr;
pub mod format;
pub mod functions;
pub mod generator;
pub mod loader;
pub mod query;
pub mod runner;
pub mod sink;
pub mod sums;
pub mod tag;
pub mod template;
pub mod value;

pub use error::{ReportError, ReportResult};
pub use functions::{FunctionContext, FunctionDef, FunctionRegistry};
pub use generator::{GeneratorOptions, OnEmptyQuery, ReportGenerator};
pub use loader::{compile_template, load_template, parse_template, LoaderOptions};
pub use query::{QueryTable, Record, SubReport};
pub use runner::{ActionChooser, ExternalOpener, QueryExecutor, ReportAction, ReportRunner};
pub use sink::ReportSink;
pub use template::{Band, Group, ReportTemplate, TemplateCell};
pub use value::Value;
