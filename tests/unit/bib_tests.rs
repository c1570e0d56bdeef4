use chrono::NaiveDate;

use webpac_scraper::{CatalogConfig, SuppressionMode, build_bib_record, parse_xrecord};

use crate::common::fixtures;

#[test]
fn test_full_record() {
    let bib = build_bib_record(&fixtures::xrecord("-"), " 2000001 ", &CatalogConfig::default())
        .expect("record should be found");

    assert_eq!(bib.bib_number, "2000001");
    assert_eq!(bib.title, "Nine stories");
    assert_eq!(bib.standard_number, "0316769487 (pbk.)");
    assert_eq!(bib.edition, "1st ed.");
    assert_eq!(bib.language, "eng");
    assert_eq!(bib.location_code, "mn");
    assert_eq!(bib.material_code, "a");
    assert_eq!(bib.revisions, 7);
    assert_eq!(bib.created, NaiveDate::from_ymd_opt(1998, 3, 14));
    assert_eq!(bib.last_updated, NaiveDate::from_ymd_opt(2009, 6, 1));
    assert_eq!(bib.subjects, vec!["Short stories"]);
    assert!(bib.author.starts_with("Salinger, J. D."));
    assert!(!bib.suppressed);
    assert!(bib.cover_image.is_empty());
}

#[test]
fn test_suppression_codes() {
    let catalog = CatalogConfig::default();
    for code in ["n", "d", "p"] {
        assert!(
            build_bib_record(&fixtures::xrecord(code), "2000001", &catalog).is_none(),
            "bcode3 {} should hide the record",
            code
        );
    }
    assert!(build_bib_record(&fixtures::xrecord("-"), "2000001", &catalog).is_some());
    assert!(build_bib_record(&fixtures::xrecord(""), "2000001", &catalog).is_some());
}

#[test]
fn test_suppression_flag_mode() {
    let catalog = CatalogConfig {
        suppression_mode: SuppressionMode::Flag,
        ..CatalogConfig::default()
    };
    let bib = build_bib_record(&fixtures::xrecord("n"), "2000001", &catalog).unwrap();
    assert!(bib.suppressed);
    assert_eq!(bib.title, "Nine stories");
}

#[test]
fn test_not_found_exports() {
    let catalog = CatalogConfig::default();
    assert!(build_bib_record(fixtures::NULL_RECORD, "1", &catalog).is_none());
    assert!(build_bib_record("<IIIRECORD><broken", "1", &catalog).is_none());
    assert!(build_bib_record("", "1", &catalog).is_none());

    let record = parse_xrecord(fixtures::NULL_RECORD).unwrap();
    assert!(record.null_record.is_some());
    assert!(!record.has_marc());
}
