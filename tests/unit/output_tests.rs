//! Output formatting of extracted records

use chrono::NaiveDate;

use webpac_scraper::{
    BibRecord, HoldPlacement, LoanRecord, Output, OutputFormat, RenewalResult, VerbosityLevel,
};

fn loan(handle: &str, renewals: u32, ill: bool) -> LoanRecord {
    LoanRecord {
        handle: handle.to_string(),
        item_number: "1000001".to_string(),
        bib_number: None,
        title: "Nine stories".to_string(),
        barcode: "31234000".to_string(),
        is_interlibrary_loan: ill,
        renewals,
        due: NaiveDate::from_ymd_opt(2009, 6, 15),
        call_number: "FIC SMITH".to_string(),
    }
}

#[test]
fn test_loans_human() {
    let output = Output::plain(OutputFormat::Human, VerbosityLevel::Normal);
    let formatted = output
        .format_loans(&[loan("renew0", 2, false), loan("renew1", 0, true)])
        .unwrap();

    assert_eq!(
        formatted,
        "2 loans\n  [renew0] Nine stories (due 2009-06-15), renewed 2x\n  [renew1] Nine stories (due 2009-06-15), ILL\n"
    );
}

#[test]
fn test_loans_json() {
    let output = Output::plain(OutputFormat::Json, VerbosityLevel::Normal);
    let formatted = output.format_loans(&[loan("renew0", 2, false)]).unwrap();

    let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();
    assert_eq!(value[0]["handle"], "renew0");
    assert_eq!(value[0]["due"], "2009-06-15");
    assert_eq!(value[0]["bib_number"], serde_json::Value::Null);
}

#[test]
fn test_renewal_results() {
    let output = Output::plain(OutputFormat::Human, VerbosityLevel::Normal);
    let results = [
        RenewalResult {
            item_number: "1000001".to_string(),
            handle: "renew0".to_string(),
            renewals: 3,
            new_due: None,
            error: None,
        },
        RenewalResult {
            item_number: "1000002".to_string(),
            handle: "renew1".to_string(),
            renewals: 0,
            new_due: None,
            error: Some("Too Many Renewals".to_string()),
        },
    ];

    let formatted = output.format_renewals(&results).unwrap();
    assert!(formatted.contains("[renew0] i1000001 renewed 3x"));
    assert!(formatted.contains("[renew1] i1000002 Too Many Renewals"));
}

#[test]
fn test_bib_verbosity() {
    let bib = BibRecord {
        bib_number: "2000001".to_string(),
        title: "Nine stories".to_string(),
        author: "Salinger, J. D.".to_string(),
        subjects: vec!["Short stories".to_string()],
        ..BibRecord::default()
    };

    let normal = Output::plain(OutputFormat::Human, VerbosityLevel::Normal)
        .format_bib("2000001", Some(&bib))
        .unwrap();
    assert!(normal.starts_with("b2000001  Nine stories\n"));
    assert!(normal.contains("Author: Salinger, J. D."));
    assert!(!normal.contains("Subjects"));

    let verbose = Output::plain(OutputFormat::Human, VerbosityLevel::Verbose)
        .format_bib("2000001", Some(&bib))
        .unwrap();
    assert!(verbose.contains("Subjects: Short stories"));

    let missing = Output::plain(OutputFormat::Human, VerbosityLevel::Normal)
        .format_bib("42", None)
        .unwrap();
    assert_eq!(missing, "NOT FOUND b42");
}

#[test]
fn test_hold_rejection() {
    let placement = HoldPlacement {
        error: Some("No requestable items are available".to_string()),
        ..HoldPlacement::default()
    };
    let formatted = Output::plain(OutputFormat::Human, VerbosityLevel::Normal)
        .format_hold_placement(&placement)
        .unwrap();
    assert_eq!(formatted, "Hold rejected: No requestable items are available");
}
