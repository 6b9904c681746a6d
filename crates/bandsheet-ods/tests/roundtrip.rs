//! ODS write/read round trips

use std::io::{Cursor, Write};

use bandsheet_core::page_setup::paper;
use bandsheet_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, FillStyle, FontStyle, PatternType,
    Underline,
};
use bandsheet_core::{
    CellRange, CellValue, Color, Document, HorizontalAlignment, NumberFormat, Orientation, Style,
    VerticalAlignment,
};
use bandsheet_ods::{OdsError, OdsReader, OdsWriteOptions, OdsWriter, MIMETYPE};
use pretty_assertions::assert_eq;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn write(doc: &Document) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    OdsWriter::write(doc, &mut out).unwrap();
    out.into_inner()
}

fn round_trip(doc: &Document) -> Document {
    OdsReader::read(Cursor::new(write(doc))).unwrap()
}

#[test]
fn test_values_survive() {
    let mut doc = Document::new();
    let t = doc.add_table("Data");
    {
        let table = doc.table_mut(t).unwrap();
        table.set_value(1, 1, "name").unwrap();
        table.set_value(1, 2, 12.5).unwrap();
        table.set_value(2, 1, true).unwrap();
        table
            .set_value(2, 3, CellValue::DateTime("2024-01-31T00:00:00".into()))
            .unwrap();
        table.set_value(3, 2, CellValue::Error("#N/A".into())).unwrap();
        table.set_value(3, 3, "two  spaces\nand a line").unwrap();
        table.set_value(10, 40, "far <&> away").unwrap();
        table.set_formula(4, 2, "=SUM(B1:B3)").unwrap();
    }

    let back = round_trip(&doc);
    let table = back.table(0).unwrap();
    assert_eq!(table.name(), "Data");
    assert_eq!(table.value(1, 1).unwrap(), CellValue::text("name"));
    assert_eq!(table.value(1, 2).unwrap(), CellValue::Number(12.5));
    assert_eq!(table.value(2, 1).unwrap(), CellValue::Boolean(true));
    assert_eq!(
        table.value(2, 3).unwrap(),
        CellValue::DateTime("2024-01-31T00:00:00".into())
    );
    assert_eq!(table.value(3, 2).unwrap(), CellValue::Error("#N/A".into()));
    assert_eq!(
        table.value(3, 3).unwrap(),
        CellValue::text("two  spaces\nand a line")
    );
    assert_eq!(table.value(10, 40).unwrap(), CellValue::text("far <&> away"));
    assert_eq!(
        table.cell(4, 2).unwrap().unwrap().formula.as_deref(),
        Some("=SUM(B1:B3)")
    );
}

#[test]
fn test_numeric_text_is_written_as_float() {
    let mut doc = Document::new();
    let t = doc.add_table("S");
    doc.table_mut(t).unwrap().set_value(1, 1, "42").unwrap();

    let back = round_trip(&doc);
    assert_eq!(back.table(0).unwrap().value(1, 1).unwrap(), CellValue::Number(42.0));
}

#[test]
fn test_merges_survive() {
    let mut doc = Document::new();
    let t = doc.add_table("Sheet1");
    {
        let table = doc.table_mut(t).unwrap();
        table.set_value(2, 2, "title").unwrap();
        table.set_merge(2, 2, 3, 1).unwrap();
        table.set_value(2, 6, "next").unwrap();
        table.set_value(3, 7, "beside").unwrap();
        table.set_value(5, 1, "below").unwrap();
    }

    let back = round_trip(&doc);
    let table = back.table(0).unwrap();
    assert_eq!(table.merges().len(), 1);
    let merge = table.merges()[0];
    assert_eq!((merge.row, merge.col, merge.across, merge.down), (2, 2, 3, 1));
    assert!(table.value(3, 4).is_err());
    assert_eq!(table.value(2, 6).unwrap(), CellValue::text("next"));
    assert_eq!(table.value(3, 7).unwrap(), CellValue::text("beside"));
    assert_eq!(table.value(5, 1).unwrap(), CellValue::text("below"));
}

#[test]
fn test_translatable_style_survives() {
    let style = Style {
        font: FontStyle {
            name: "Verdana".into(),
            size: 12.5,
            bold: true,
            italic: true,
            underline: Underline::Single,
            strikethrough: true,
            color: Color::rgb(0x12, 0x34, 0x56),
            ..FontStyle::default()
        },
        fill: FillStyle::solid(Color::YELLOW),
        border: BorderStyle::new()
            .with_left(BorderEdge::thin())
            .with_top(BorderEdge::new(BorderLineStyle::Double, 3, Color::RED))
            .with_bottom(BorderEdge::new(BorderLineStyle::Dot, 2, Color::BLUE)),
        alignment: Alignment {
            horizontal: HorizontalAlignment::Center,
            vertical: VerticalAlignment::Top,
            wrap_text: true,
            shrink_to_fit: false,
            indent: 2,
            rotation: 45,
        },
        number_format: NumberFormat::thousands(2),
    };
    let percent = Style::new().number_format("0.0%");

    let mut doc = Document::new();
    let t = doc.add_table("Sheet1");
    doc.range_mut(t, CellRange::single(1, 1))
        .unwrap()
        .set_style(style.clone())
        .unwrap();
    {
        let mut range = doc.range_mut(t, CellRange::single(2, 1)).unwrap();
        range.set_values([0.25]).unwrap();
        range.set_style(percent.clone()).unwrap();
    }

    let back = round_trip(&doc);
    let table = back.table(0).unwrap();
    let first = table.cell_style(1, 1).unwrap().unwrap();
    let second = table.cell_style(2, 1).unwrap().unwrap();
    assert_eq!(back.style(first), &style);
    assert_eq!(back.style(second), &percent);
    assert_eq!(table.value(2, 1).unwrap(), CellValue::Number(0.25));
}

#[test]
fn test_number_styles_are_shared() {
    let mut doc = Document::new();
    let t = doc.add_table("Sheet1");
    for row in 1..=3 {
        let mut range = doc.range_mut(t, CellRange::single(row, 1)).unwrap();
        range.set_values([row as f64]).unwrap();
        range
            .set_style(Style::new().number_format("#,##0").font_size(9.0 + row as f64))
            .unwrap();
    }

    let bytes = write(&doc);
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut content = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("content.xml").unwrap(), &mut content)
        .unwrap();
    assert_eq!(content.matches("<number:number-style ").count(), 1);
    assert_eq!(content.matches("style:data-style-name=\"N1\"").count(), 3);
}

#[test]
fn test_strict_mode_rejects_untranslatable_style() {
    let mut doc = Document::new();
    let t = doc.add_table("Sheet1");
    let style = Style {
        fill: FillStyle::pattern(PatternType::Gray25, Color::BLACK, Color::WHITE),
        ..Style::default()
    };
    doc.range_mut(t, CellRange::single(1, 1))
        .unwrap()
        .set_style(style)
        .unwrap();

    let strict = OdsWriteOptions {
        strict_styles: true,
    };
    let err = OdsWriter::write_with_options(&doc, Cursor::new(Vec::new()), &strict).unwrap_err();
    assert!(matches!(err, OdsError::StyleTranslation { .. }));

    let back = round_trip(&doc);
    let id = back.table(0).unwrap().cell_style(1, 1).unwrap().unwrap();
    assert_eq!(back.style(id).fill, FillStyle::solid(Color::WHITE));
}

#[test]
fn test_rows_columns_and_page_setup_survive() {
    let mut doc = Document::new();
    doc.properties.title = Some("Quarterly".into());
    doc.properties.author = Some("Finance".into());
    let t = doc.add_table("Layout");
    {
        let table = doc.table_mut(t).unwrap();
        table.set_column_width(2, 80.0).unwrap();
        table.set_column_width(3, 80.0).unwrap();
        table.set_row_height(4, 25.5).unwrap();
        table.column_mut(6).unwrap().hidden = true;
        table.set_value(4, 1, 1.0).unwrap();
        table.page_setup.orientation = Orientation::Landscape;
        table.page_setup.paper_size_index = paper::LETTER;
        table.page_setup.margins.left = 0.4;
        table.page_setup.center_vertical = true;
    }
    doc.add_table("Second");

    let back = round_trip(&doc);
    assert_eq!(back.properties.title.as_deref(), Some("Quarterly"));
    assert_eq!(back.properties.author.as_deref(), Some("Finance"));
    assert_eq!(back.table_count(), 2);
    let table = back.table(0).unwrap();
    assert_eq!(table.column(2).unwrap().width, Some(80.0));
    assert_eq!(table.column(3).unwrap().width, Some(80.0));
    assert!(table.column(6).unwrap().hidden);
    assert_eq!(table.row(4).unwrap().height, Some(25.5));
    assert_eq!(table.page_setup, doc.table(t).unwrap().page_setup);
    assert_eq!(back.table(1).unwrap().name(), "Second");
    assert!(back.table(1).unwrap().page_setup.is_default());
}

#[test]
fn test_mimetype_is_first_and_stored() {
    let mut doc = Document::new();
    doc.add_table("Sheet1");
    let mut archive = ZipArchive::new(Cursor::new(write(&doc))).unwrap();
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), CompressionMethod::Stored);
}

fn package(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_foreign_packages_are_rejected() {
    let text = package(&[("mimetype", "application/vnd.oasis.opendocument.text")]);
    assert!(matches!(
        OdsReader::read(Cursor::new(text)),
        Err(OdsError::InvalidFormat(_))
    ));

    let no_content = package(&[("mimetype", MIMETYPE)]);
    assert!(matches!(
        OdsReader::read(Cursor::new(no_content)),
        Err(OdsError::MissingPart(_))
    ));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ods");
    let mut doc = Document::new();
    let t = doc.add_table("Sheet1");
    doc.table_mut(t).unwrap().set_value(1, 1, "saved").unwrap();

    OdsWriter::write_file(&doc, &path).unwrap();
    let back = OdsReader::read_file(&path).unwrap();
    assert_eq!(
        back.table(0).unwrap().value(1, 1).unwrap(),
        CellValue::text("saved")
    );
}
