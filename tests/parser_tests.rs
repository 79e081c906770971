use finstat::{FinStatError, TableParser};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const BALANCE_SHEET_TABLE: &str = "\
Account | 2024 | 2023
Assets | |
  Cash and cash equivalents | 1,850 | 1,620
  Accounts receivable | 930 | 870
  Inventories | 410 | 385
Total assets | 3,190 | 2,875
Liabilities | |
  Accounts payable | 520 | 505
  Accrued liabilities | 310 | 295
Total liabilities | 830 | 800";

#[test]
fn parses_a_balance_sheet_region() {
    init_logging();
    let parsed = TableParser::new().parse(BALANCE_SHEET_TABLE).unwrap();

    assert_eq!(parsed.periods, vec!["2024", "2023"]);
    assert_eq!(parsed.line_items.len(), 9);

    let assets = &parsed.line_items[0];
    assert!(assets.is_section_header);
    assert!(assets.values.is_empty());
    assert_eq!(assets.indent_level, 0);

    let cash = &parsed.line_items[1];
    assert_eq!(cash.section.as_deref(), Some("Assets"));
    assert_eq!(cash.value_for("2024"), Some("1,850"));
    assert_eq!(cash.indent_level, 1);

    let total_assets = &parsed.line_items[4];
    assert!(total_assets.is_total);
    assert_eq!(total_assets.section.as_deref(), Some("Assets"));

    // "Total assets" closed the Assets section; Liabilities opens fresh.
    let liabilities = &parsed.line_items[5];
    assert!(liabilities.is_section_header);
    assert_eq!(liabilities.section, None);
    assert_eq!(liabilities.indent_level, 0);

    let payable = &parsed.line_items[6];
    assert_eq!(payable.section.as_deref(), Some("Liabilities"));
}

#[test]
fn section_headers_never_carry_values() {
    init_logging();
    let parsed = TableParser::new().parse(BALANCE_SHEET_TABLE).unwrap();
    for item in parsed.line_items.iter().filter(|i| i.is_section_header) {
        assert!(item.values.is_empty(), "{} carries values", item.name);
    }
}

#[test]
fn line_item_order_survives_the_parse() {
    init_logging();
    let parsed = TableParser::new().parse(BALANCE_SHEET_TABLE).unwrap();
    for (expected, item) in parsed.line_items.iter().enumerate() {
        assert_eq!(item.order as usize, expected);
    }
}

#[test]
fn input_without_tabular_rows_is_a_parse_error() {
    init_logging();
    let narrative = "The company reported strong results for the year.\n\
                     No tables appear anywhere in this text.";
    let err = TableParser::new().parse(narrative).unwrap_err();
    assert!(matches!(err, FinStatError::NoTabularRows));
}

#[test]
fn parses_are_independent_between_documents() {
    init_logging();
    let parser = TableParser::new();
    let first = "Account | 2024\n\
                 Operating | \n\
                 \u{20}\u{20}Wages | 100";
    let second = "Account | 2024\n\
                  Supplies | 40";

    let _ = parser.parse(first).unwrap();
    let parsed = parser.parse(second).unwrap();

    // No hierarchy leaks from the previous document.
    assert_eq!(parsed.line_items[0].section, None);
    assert_eq!(parsed.line_items[0].indent_level, 0);
}
