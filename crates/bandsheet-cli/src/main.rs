//! bandsheet CLI - render band-template reports and convert spreadsheets

use anyhow::{bail, Context, Result};
use bandsheet::prelude::*;
use bandsheet::{
    cache, compile_template, load_template, FunctionRegistry, GeneratorOptions, LoaderOptions,
    OnEmptyQuery, Value,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bandsheet")]
#[command(author, version, about = "Band-template report renderer and spreadsheet converter")]
struct Cli {
    /// Print debug messages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template with query data and write the report
    Render {
        /// Template file (xml, ods)
        template: PathBuf,

        /// Query table as JSON (default: no records)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output file; the extension picks the format (xml, ods)
        #[arg(short, long)]
        output: PathBuf,

        /// Report variable, overriding template and query variables
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Fail when the query has no records
        #[arg(long)]
        abort_on_empty: bool,

        /// Name of the generated table (default: template name)
        #[arg(long)]
        sheet_name: Option<String>,

        /// Always parse the template source, never its compiled snapshot
        #[arg(long)]
        no_cache: bool,

        /// Resolve writes into merged regions instead of failing
        #[arg(long)]
        permissive: bool,
    },

    /// Compile a template and store its snapshot next to it
    Compile {
        /// Template file (xml, ods)
        template: PathBuf,
    },

    /// Convert a spreadsheet between XMLSS and ODS
    Convert {
        /// Input file (xml, ods)
        input: PathBuf,

        /// Output file (xml, ods)
        output: PathBuf,
    },

    /// Show information about a spreadsheet
    Info {
        /// Input spreadsheet file
        input: PathBuf,
    },
}

/// Writes log records to stderr
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}: {}", record.level().as_str().to_lowercase(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
            vars,
            abort_on_empty,
            sheet_name,
            no_cache,
            permissive,
        } => {
            let settings = DocumentSettings {
                merge_mode: if permissive {
                    MergeMode::Permissive
                } else {
                    MergeMode::Strict
                },
                ..DocumentSettings::default()
            };
            let loader = LoaderOptions {
                use_cache: !no_cache,
                document_settings: settings,
            };
            let options = GeneratorOptions {
                on_empty_query: if abort_on_empty {
                    OnEmptyQuery::Abort
                } else {
                    OnEmptyQuery::ContinueEmpty
                },
                sheet_name,
                document_settings: settings,
                loader: loader.clone(),
                ..GeneratorOptions::default()
            };
            render(&template, data.as_deref(), &output, &vars, &loader, options)
        }
        Commands::Compile { template } => compile(&template),
        Commands::Convert { input, output } => convert(&input, &output),
        Commands::Info { input } => show_info(&input),
    }
}

fn parse_var(spec: &str) -> Result<(String, Value)> {
    match spec.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), Value::str(value)))
        }
        _ => bail!("Invalid variable '{}', expected NAME=VALUE", spec),
    }
}

fn render(
    template_path: &Path,
    data: Option<&Path>,
    output: &Path,
    vars: &[String],
    loader: &LoaderOptions,
    options: GeneratorOptions,
) -> Result<()> {
    let sink = ReportSink::for_path(output)
        .with_context(|| format!("Cannot write '{}'", output.display()))?;

    let template = load_template(template_path, loader)
        .with_context(|| format!("Failed to load template '{}'", template_path.display()))?;

    let mut query = match data {
        Some(path) => QueryTable::from_json_file(path)
            .with_context(|| format!("Failed to read query data '{}'", path.display()))?,
        None => QueryTable::default(),
    };
    for spec in vars {
        let (name, value) = parse_var(spec)?;
        query.variables.insert(name, value);
    }

    let functions = FunctionRegistry::new();
    let mut generator = ReportGenerator::new(&template, &functions).with_options(options);
    if let Some(dir) = template_path.parent() {
        generator = generator.with_base_dir(dir);
    }
    let mut document = generator
        .generate(&query)
        .with_context(|| format!("Failed to generate '{}'", template.name))?;

    sink.write(&mut document, output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    let (rows, cols) = document
        .table(0)
        .map(|t| t.used_extent())
        .unwrap_or((0, 0));
    eprintln!(
        "Wrote {} rows x {} columns ({} records) to '{}'",
        rows,
        cols,
        query.rows.len(),
        output.display()
    );
    Ok(())
}

fn compile(template_path: &Path) -> Result<()> {
    let template = compile_template(template_path, &DocumentSettings::default())
        .with_context(|| format!("Failed to compile '{}'", template_path.display()))?;
    let snapshot = cache::compiled_path(template_path);
    cache::write_snapshot(&template, &snapshot)
        .with_context(|| format!("Failed to write '{}'", snapshot.display()))?;

    println!("Template: {}", template.name);
    if !template.description.is_empty() {
        println!("Description: {}", template.description);
    }
    if !template.data_source.is_empty() {
        println!("Data source: {}", template.data_source);
    }
    for (name, band) in template.bands().into_iter().filter(|(_, b)| !b.is_empty()) {
        println!(
            "  {:<16} rows {}..{} ({} columns)",
            name,
            band.row,
            band.last_row(),
            band.col_size
        );
    }
    println!("Snapshot: {}", snapshot.display());
    Ok(())
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let document =
        Document::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;
    document
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;
    eprintln!(
        "Converted {} tables from '{}' to '{}'",
        document.table_count(),
        input.display(),
        output.display()
    );
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let document =
        Document::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    println!("File: {}", input.display());
    if let Some(title) = &document.properties.title {
        println!("Title: {}", title);
    }
    println!("Tables: {}", document.table_count());
    println!("Styles: {}", document.styles().len());

    for (i, table) in document.tables().enumerate() {
        let merges = table.iter_cells().filter(|(_, _, cell)| cell.is_merged()).count();
        let formulas = table
            .iter_cells()
            .filter(|(_, _, cell)| cell.formula.is_some())
            .count();

        println!();
        println!("  Table {}: \"{}\"", i, table.name());
        match table.used_extent() {
            (0, _) | (_, 0) => println!("    Used range: empty"),
            (rows, cols) => println!("    Used range: {} rows x {} columns", rows, cols),
        }
        println!("    Cells: {}", table.cell_count());
        println!("    Formulas: {}", formulas);
        println!("    Merged regions: {}", merges);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        let (name, value) = parse_var("title=Q3 = final").unwrap();
        assert_eq!(name, "title");
        assert_eq!(value, Value::str("Q3 = final"));
        assert!(parse_var("=x").is_err());
        assert!(parse_var("novalue").is_err());
    }
}
