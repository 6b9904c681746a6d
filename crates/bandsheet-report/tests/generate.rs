//! End-to-end generation over in-memory templates

use std::collections::BTreeMap;

use bandsheet_core::{CellValue, Document, Style, Table};
use bandsheet_report::{
    parse_template, FunctionRegistry, GeneratorOptions, OnEmptyQuery, QueryTable, ReportError,
    ReportGenerator, ReportTemplate, SubReport, Value,
};
use bandsheet_xmlss::XmlssWriter;
use pretty_assertions::assert_eq;

/// Authoring document: band cells on the left, the section tag in the
/// column right after the widest row
fn authoring(rows: &[(&str, &[&str])]) -> Document {
    let width = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0) as u32;
    let mut doc = Document::new();
    let t = doc.add_table("template");
    let table = doc.table_mut(t).unwrap();
    for (i, (tag, cells)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (j, text) in cells.iter().enumerate() {
            if !text.is_empty() {
                table.set_value(r, j as u32 + 1, *text).unwrap();
            }
        }
        if !tag.is_empty() {
            table.set_value(r, width + 1, *tag).unwrap();
        }
    }
    doc
}

fn template(rows: &[(&str, &[&str])]) -> ReportTemplate {
    parse_template("report", &authoring(rows)).unwrap()
}

fn generate(template: &ReportTemplate, query: &QueryTable) -> Document {
    let functions = FunctionRegistry::new();
    ReportGenerator::new(template, &functions).generate(query).unwrap()
}

fn column(table: &Table, col: u32) -> Vec<String> {
    let (rows, _) = table.used_extent();
    (1..=rows)
        .map(|r| table.value(r, col).unwrap().to_string())
        .collect()
}

#[test]
fn test_grouping_emits_one_header_and_footer_per_run() {
    let template = template(&[
        ("[head_grp:g]", &["H ['g']"]),
        ("[detail]", &["['g']"]),
        ("[foot_grp:g]", &["F ['g']"]),
    ]);
    let query = QueryTable::new(
        ["g"],
        ["A", "A", "B", "B", "C"].iter().map(|g| vec![Value::str(*g)]).collect(),
    );

    let doc = generate(&template, &query);
    assert_eq!(
        column(doc.table(0).unwrap(), 1),
        vec!["H A", "A", "A", "F A", "H B", "B", "B", "F B", "H C", "C", "F C"]
    );
}

#[test]
fn test_inner_footer_precedes_outer_footer() {
    let template = template(&[
        ("[head_grp:dept]", &["D ['dept']"]),
        ("[head_grp:team]", &["T ['team']"]),
        ("[detail]", &["-"]),
        ("[foot_grp:team]", &["/T ['team']"]),
        ("[foot_grp:dept]", &["/D ['dept']"]),
    ]);
    let query = QueryTable::new(
        ["dept", "team"],
        vec![
            vec!["X".into(), "a".into()],
            vec!["X".into(), "b".into()],
            vec!["Y".into(), "b".into()],
        ],
    );

    let doc = generate(&template, &query);
    assert_eq!(
        column(doc.table(0).unwrap(), 1),
        vec![
            "D X", "T a", "-", "/T a", "T b", "-", "/T b", "/D X", "D Y", "T b", "-", "/T b", "/D Y"
        ]
    );
}

#[test]
fn test_running_sum_per_detail_row() {
    let template = template(&[("[detail]", &["['x']", "[^SUM(x)^]"])]);
    let query = QueryTable::new(["x"], vec![vec![1.into()], vec![2.into()], vec![3.into()]]);

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    let sums: Vec<CellValue> = (1..=3).map(|r| table.value(r, 2).unwrap()).collect();
    assert_eq!(
        sums,
        vec![CellValue::Number(1.0), CellValue::Number(3.0), CellValue::Number(6.0)]
    );
}

#[test]
fn test_group_header_resets_sums_and_counter() {
    let template = template(&[
        ("[head_grp:g]", &["['g']", "[^SUM(x)^]"]),
        ("[detail]", &["[^N^]", "[^SUM(x)^]"]),
    ]);
    let query = QueryTable::new(
        ["g", "x"],
        vec![
            vec!["A".into(), 1.into()],
            vec!["A".into(), 2.into()],
            vec!["B".into(), 3.into()],
        ],
    );

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    // A header, two details, B header, one detail
    assert_eq!(table.value(1, 2).unwrap(), CellValue::Number(0.0));
    assert_eq!(table.value(2, 1).unwrap(), CellValue::Number(1.0));
    assert_eq!(table.value(3, 1).unwrap(), CellValue::Number(2.0));
    assert_eq!(table.value(3, 2).unwrap(), CellValue::Number(3.0));
    assert_eq!(table.value(4, 2).unwrap(), CellValue::Number(0.0));
    assert_eq!(table.value(5, 1).unwrap(), CellValue::Number(1.0));
    assert_eq!(table.value(5, 2).unwrap(), CellValue::Number(3.0));
}

#[test]
fn test_department_totals() {
    let template = template(&[
        ("[head_grp:dept]", &["['dept']", ""]),
        ("[detail]", &["['dept']", "['amount']"]),
        ("[foot_grp:dept]", &["['dept'] total", "[^SUM(amount)^]"]),
    ]);
    let query = QueryTable::new(
        ["dept", "amount"],
        vec![
            vec!["Eng".into(), 10.into()],
            vec!["Eng".into(), 20.into()],
            vec!["Sales".into(), 5.into()],
        ],
    );

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    assert_eq!(
        column(table, 1),
        vec!["Eng", "Eng", "Eng", "Eng total", "Sales", "Sales", "Sales total"]
    );
    assert_eq!(
        column(table, 2),
        vec!["", "10", "20", "30", "", "5", "5"]
    );
    assert_eq!(table.value(4, 2).unwrap(), CellValue::Number(30.0));
}

#[test]
fn test_empty_query_policy() {
    let template = template(&[
        ("[header]", &["Title [&title&]"]),
        ("[detail]", &["['x']"]),
        ("[footer]", &["End"]),
    ]);
    let empty = QueryTable::new(["x"], Vec::new());
    let functions = FunctionRegistry::new();

    let aborting = ReportGenerator::new(&template, &functions).with_options(GeneratorOptions {
        on_empty_query: OnEmptyQuery::Abort,
        ..GeneratorOptions::default()
    });
    assert!(matches!(
        aborting.generate(&empty),
        Err(ReportError::EmptyQuery(name)) if name == "report"
    ));

    let mut query = empty.clone();
    query.variables.insert("title".into(), Value::str("Q3"));
    let doc = ReportGenerator::new(&template, &functions).generate(&query).unwrap();
    assert_eq!(column(doc.table(0).unwrap(), 1), vec!["Title Q3", "End"]);
    assert_eq!(doc.properties.title.as_deref(), Some("Q3"));
}

#[test]
fn test_formulas_follow_their_cell() {
    let mut doc = authoring(&[("[header]", &["Total", ""]), ("[detail]", &["['x']", ""])]);
    doc.table_mut(0).unwrap().set_formula(2, 2, "=A2*2").unwrap();
    doc.table_mut(0).unwrap().set_formula(1, 2, "=SUM($A$2:$A$9)").unwrap();
    let template = parse_template("report", &doc).unwrap();
    let query = QueryTable::new(["x"], vec![vec![1.into()], vec![2.into()], vec![3.into()]]);

    let out = generate(&template, &query);
    let table = out.table(0).unwrap();
    let formula = |r, c| table.cell(r, c).unwrap().and_then(|cell| cell.formula.clone());
    assert_eq!(formula(1, 2).as_deref(), Some("=SUM($A$2:$A$9)"));
    assert_eq!(formula(2, 2).as_deref(), Some("=A2*2"));
    assert_eq!(formula(4, 2).as_deref(), Some("=A4*2"));
}

#[test]
fn test_coordinate_fill_overwrites_output() {
    let template = template(&[("[detail]", &["['x']"])]);
    let mut query = QueryTable::new(["x"], vec![vec![1.into()]]);
    query.coord_fill.insert("1,1".into(), Value::str("replaced"));
    query.coord_fill.insert("3,2".into(), 7.into());
    query.coord_fill.insert("nonsense".into(), 1.into());

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    assert_eq!(table.value(1, 1).unwrap(), CellValue::text("replaced"));
    assert_eq!(table.value(3, 2).unwrap(), CellValue::Number(7.0));
}

#[test]
fn test_expressions_and_functions_in_cells() {
    let template = template(&[(
        "[detail]",
        &[
            "[~r: r.name.upper()~]",
            "[@std.format('%05.1f', amount)@]",
            "[=value = amount * 2 if amount > 5 else 0=]",
            "[~r: 'big' if r.amount >= 10 else 'small'~] ['name']",
        ],
    )]);
    let query = QueryTable::new(
        ["name", "amount"],
        vec![vec!["ann".into(), 10.into()], vec!["bob".into(), 2.5.into()]],
    );

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    assert_eq!(column(table, 1), vec!["ANN", "BOB"]);
    assert_eq!(column(table, 2), vec!["010.0", "002.5"]);
    assert_eq!(table.value(1, 3).unwrap(), CellValue::Number(20.0));
    assert_eq!(table.value(2, 3).unwrap(), CellValue::Number(0.0));
    assert_eq!(column(table, 4), vec!["big ann", "small bob"]);
}

#[test]
fn test_evaluation_errors_name_the_template_cell() {
    let template = template(&[("[header]", &["Title"]), ("[detail]", &["[~r: undefined_name~]"])]);
    let query = QueryTable::new(["x"], vec![vec![1.into()]]);
    let functions = FunctionRegistry::new();

    match ReportGenerator::new(&template, &functions).generate(&query) {
        Err(ReportError::Generate { template, cell, .. }) => {
            assert_eq!(template, "report");
            assert_eq!(cell, "A2");
        }
        other => panic!("expected a generate error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_style_tag_applies_to_following_cells() {
    let mut template = template(&[("[detail]", &["[*hot*]['x']", "plain"])]);
    template.styles.push(Style::new().bold(true));
    let hot = (template.styles.len() - 1) as u32;
    template.style_lib.insert("hot".into(), hot);
    let query = QueryTable::new(["x"], vec![vec![1.into()]]);

    let doc = generate(&template, &query);
    let table = doc.table(0).unwrap();
    for col in 1..=2 {
        let style_id = table.cell_style(1, col).unwrap().unwrap();
        assert!(doc.style(style_id).font.bold, "column {} is not bold", col);
    }
}

#[test]
fn test_sub_report_is_spliced_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let items = authoring(&[("[detail]", &["['item']", "['qty']"])]);
    XmlssWriter::write_file(&items, dir.path().join("items.xml")).unwrap();

    let template = template(&[
        ("[header]", &["Order"]),
        ("[detail]", &["[$items$]"]),
        ("[footer]", &["End"]),
    ]);
    let mut query = QueryTable::new(["id"], vec![vec![1.into()]]);
    query.sub_reports.insert(
        "items".into(),
        SubReport {
            template: "items.xml".into(),
            query: QueryTable::new(
                ["item", "qty"],
                vec![vec!["bolt".into(), 4.into()], vec!["nut".into(), 8.into()]],
            ),
        },
    );

    let functions = FunctionRegistry::new();
    let doc = ReportGenerator::new(&template, &functions)
        .with_base_dir(dir.path())
        .generate(&query)
        .unwrap();
    let table = doc.table(0).unwrap();
    assert_eq!(column(table, 1), vec!["Order", "bolt", "nut", "End"]);
    assert_eq!(table.value(3, 2).unwrap(), CellValue::Number(8.0));
}

#[test]
fn test_variables_merge_template_and_query() {
    let mut template = template(&[("[header]", &["[&who&] [&when&]"])]);
    template.variables = BTreeMap::from([
        ("who".to_string(), "template".to_string()),
        ("when".to_string(), "today".to_string()),
    ]);
    let mut query = QueryTable::new(["x"], Vec::new());
    query.variables.insert("who".into(), Value::str("query"));

    let doc = generate(&template, &query);
    assert_eq!(column(doc.table(0).unwrap(), 1), vec!["query today"]);
}
