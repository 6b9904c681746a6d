//! Loading templates from files and the snapshot cache

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use bandsheet_core::{CellRange, Document, Style};
use bandsheet_ods::OdsWriter;
use bandsheet_report::cache::{compiled_path, read_snapshot, write_snapshot};
use bandsheet_report::{
    compile_template, load_template, Band, LoaderOptions, ReportError, ReportTemplate,
};
use bandsheet_xmlss::XmlssWriter;
use pretty_assertions::assert_eq;

fn payroll() -> Document {
    let mut doc = Document::new();
    let t = doc.add_table("payroll");
    let table = doc.table_mut(t).unwrap();
    table.set_value(1, 1, "Monthly payroll").unwrap();
    table.set_value(1, 3, "[description]").unwrap();
    table.set_value(2, 1, "select dept, amount from pay").unwrap();
    table.set_value(2, 3, "[query]").unwrap();
    table.set_value(3, 1, "Payroll").unwrap();
    table.set_value(3, 3, "[header]").unwrap();
    table.set_value(4, 1, "['dept']").unwrap();
    table.set_value(4, 2, "['amount']").unwrap();
    table.set_value(4, 3, "[detail]").unwrap();
    table.set_column_width(2, 80.0).unwrap();
    table.set_row_height(3, 24.0).unwrap();
    doc.range_mut(t, CellRange::new(3, 1, 3, 1))
        .unwrap()
        .set_style(Style::new().bold(true))
        .unwrap();
    doc
}

fn check_payroll(template: &ReportTemplate) {
    assert_eq!(template.name, "payroll");
    assert_eq!(template.description, "Monthly payroll");
    assert_eq!(template.query, "select dept, amount from pay");
    assert_eq!(template.header, Band::new(3, 1, 1, 2));
    assert_eq!(template.detail, Band::new(4, 1, 1, 2));
    assert_eq!(template.column_widths.get(&2), Some(&80.0));
    assert_eq!(template.row_heights.get(&3), Some(&24.0));
    let header_style = template.cell(3, 1).unwrap().style_id;
    assert!(template.style(header_style).unwrap().font.bold);
}

fn no_cache() -> LoaderOptions {
    LoaderOptions {
        use_cache: false,
        ..LoaderOptions::default()
    }
}

/// Set a file's modification time to `secs` after the epoch
fn set_mtime(path: &Path, secs: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

#[test]
fn test_load_xmlss_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    XmlssWriter::write_file(&payroll(), &path).unwrap();

    check_payroll(&load_template(&path, &no_cache()).unwrap());
    assert!(!compiled_path(&path).exists());
}

#[test]
fn test_load_ods_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.ods");
    OdsWriter::write_file(&payroll(), &path).unwrap();

    check_payroll(&compile_template(&path, &Default::default()).unwrap());
}

#[test]
fn test_unreadable_and_unsupported_sources() {
    let dir = tempfile::tempdir().unwrap();

    match load_template(dir.path().join("missing.xml"), &no_cache()) {
        Err(ReportError::TemplateParse { template, cell, .. }) => {
            assert_eq!(template, "missing");
            assert_eq!(cell, "-");
        }
        other => panic!("expected a parse error, got {:?}", other.map(|t| t.name)),
    }

    let csv = dir.path().join("payroll.csv");
    fs::write(&csv, "a,b").unwrap();
    assert!(matches!(
        load_template(&csv, &no_cache()),
        Err(ReportError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_first_load_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    XmlssWriter::write_file(&payroll(), &path).unwrap();

    let template = load_template(&path, &LoaderOptions::default()).unwrap();
    let snapshot = compiled_path(&path);
    assert!(snapshot.exists());
    assert_eq!(read_snapshot(&snapshot).unwrap(), template);
}

#[test]
fn test_fresh_snapshot_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    XmlssWriter::write_file(&payroll(), &path).unwrap();
    set_mtime(&path, 1_000);

    let cached = ReportTemplate {
        name: "from-snapshot".into(),
        ..ReportTemplate::default()
    };
    write_snapshot(&cached, &compiled_path(&path)).unwrap();

    let template = load_template(&path, &LoaderOptions::default()).unwrap();
    assert_eq!(template.name, "from-snapshot");
}

#[test]
fn test_stale_snapshot_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    XmlssWriter::write_file(&payroll(), &path).unwrap();

    let snapshot = compiled_path(&path);
    let outdated = ReportTemplate {
        name: "outdated".into(),
        ..ReportTemplate::default()
    };
    write_snapshot(&outdated, &snapshot).unwrap();
    set_mtime(&snapshot, 1_000);

    let template = load_template(&path, &LoaderOptions::default()).unwrap();
    check_payroll(&template);
    assert_eq!(read_snapshot(&snapshot).unwrap(), template);
}

#[test]
fn test_corrupt_snapshot_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    XmlssWriter::write_file(&payroll(), &path).unwrap();
    set_mtime(&path, 1_000);
    fs::write(compiled_path(&path), b"BSTCACHE\x01\x00\x00\x00garbage").unwrap();

    check_payroll(&load_template(&path, &LoaderOptions::default()).unwrap());
}

#[test]
fn test_parse_failure_keeps_old_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("payroll.xml");
    let mut broken = payroll();
    broken
        .table_mut(0)
        .unwrap()
        .set_value(5, 3, "not a section")
        .unwrap();
    XmlssWriter::write_file(&broken, &path).unwrap();

    let snapshot = compiled_path(&path);
    let previous = ReportTemplate {
        name: "previous".into(),
        ..ReportTemplate::default()
    };
    write_snapshot(&previous, &snapshot).unwrap();
    set_mtime(&snapshot, 1_000);
    let bytes = fs::read(&snapshot).unwrap();

    match load_template(&path, &LoaderOptions::default()) {
        Err(ReportError::TemplateParse { cell, .. }) => assert_eq!(cell, "C5"),
        other => panic!("expected a parse error, got {:?}", other.map(|t| t.name)),
    }
    assert_eq!(fs::read(&snapshot).unwrap(), bytes);
}
