//! Extractor behavior on full catalog pages

use chrono::NaiveDate;

use webpac_scraper::extract::{
    classify_hold_response, classify_payment, extract_checksum, extract_fines,
    extract_holds, extract_item_bib_number, extract_loans, extract_renewals,
};
use webpac_scraper::markup::{format_ymd, parse_mdy_as_of, parse_mdy_windowed};
use webpac_scraper::{HoldOutcome, MarkupRules, PaymentProtocol, Release};

use crate::common::fixtures;

fn rules() -> MarkupRules {
    MarkupRules::for_release(Release::Millennium2007).unwrap()
}

#[test]
fn test_loans_follow_page_order() {
    let loans = extract_loans(&rules(), &fixtures::loans_page());

    let handles: Vec<&str> = loans.iter().map(|loan| loan.handle.as_str()).collect();
    assert_eq!(handles, vec!["renew0", "renew1", "renew2"]);

    assert_eq!(loans[0].title, "Nine stories / J.D. Salinger");
    assert_eq!(loans[0].item_number, "1000001");
    assert_eq!(loans[0].barcode, "31234000i1000001");
    assert_eq!(loans[0].renewals, 3);
    assert_eq!(loans[0].due, NaiveDate::from_ymd_opt(2009, 6, 15));
    assert_eq!(loans[0].call_number, "FIC SMITH");
    assert!(!loans[0].is_interlibrary_loan);

    assert_eq!(loans[1].renewals, 0);
    assert!(loans[2].is_interlibrary_loan);
    assert_eq!(loans[2].title, "Borrowed from another library");
}

#[test]
fn test_empty_listing() {
    assert!(extract_loans(&rules(), "<html><body>No items</body></html>").is_empty());
    assert!(extract_holds(&rules(), "").is_empty());
}

#[test]
fn test_hold_statuses() {
    let holds = extract_holds(&rules(), &fixtures::holds_page());
    assert_eq!(holds.len(), 3);

    assert_eq!(holds[0].status, "2 of 5 holds");
    assert_eq!(holds[0].bib_number.as_deref(), Some("2000001"));
    assert!(!holds[0].is_ready());

    assert!(holds[1].is_ready());
    assert_eq!(holds[1].pickup_location, "Branch Library");

    assert_eq!(holds[2].status, "Waiting for your copy");
    assert!(holds[2].is_interlibrary_loan);
    assert_eq!(holds[2].bib_number, None);

    // 2007 pages carry no freeze column
    assert!(holds.iter().all(|hold| hold.frozen.is_none()));
}

#[test]
fn test_hold_freeze_on_2009() {
    let rules = MarkupRules::for_release(Release::Millennium2009).unwrap();
    let page = r#"<tr class="patFuncEntry">
<td class="patFuncMark"><input type="checkbox" name="cancelb2000001x00" /></td>
<td class="patFuncTitle">Nine stories</td>
<td class="patFuncStatus"> 1 of 1 holds </td>
<td class="patFuncPickup">Main Library</td>
<td class="patFuncCancel">08-01-09</td>
<td class="patFuncFreeze"><input type="checkbox" name="freezeb2000001x00" checked /></td>
</tr>"#;
    let holds = extract_holds(&rules, page);
    assert_eq!(holds[0].frozen, Some(true));
}

#[test]
fn test_hold_placed() {
    let placement = classify_hold_response(&rules(), fixtures::HOLD_SUCCESS_PAGE);
    assert_eq!(placement.outcome(), HoldOutcome::Placed);
}

#[test]
fn test_hold_needs_one_of_three_copies() {
    let placement = classify_hold_response(&rules(), &fixtures::hold_choose_item_page());
    assert!(!placement.success);

    let HoldOutcome::NeedsSelection {
        candidates,
        pickup_locations,
    } = placement.outcome()
    else {
        panic!("expected a selection prompt, got {:?}", placement.outcome());
    };

    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0].handle, "i3000001");
    assert_eq!(candidates[0].location, "Main Library Fiction");
    assert_eq!(candidates[0].call_number, "FIC SALINGER");
    assert_eq!(candidates[0].status, "AVAILABLE");
    assert_eq!(candidates[1].status, "DUE 07-01-09");
    assert_eq!(candidates[2].call_number, "813.54 SAL");

    let codes: Vec<&str> = pickup_locations.iter().map(|loc| loc.code.as_str()).collect();
    assert_eq!(codes, vec!["mn", "br"]);
    assert_eq!(pickup_locations[1].name, "Branch Library");
}

#[test]
fn test_renew_all_counts() {
    let results = extract_renewals(&rules(), &fixtures::renew_all_page(), None);
    let counts: Vec<(&str, u32)> = results
        .iter()
        .map(|result| (result.handle.as_str(), result.renewals))
        .collect();
    assert_eq!(counts, vec![("renew0", 3), ("renew1", 0)]);
    assert_eq!(results[0].new_due, NaiveDate::from_ymd_opt(2009, 6, 29));
}

#[test]
fn test_renew_selection_keeps_requested_order() {
    let selection = vec![
        ("renew1".to_string(), "i1000002".to_string()),
        ("renew9".to_string(), "i1000009".to_string()),
    ];
    let results = extract_renewals(&rules(), &fixtures::renew_all_page(), Some(&selection));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].handle, "renew1");
    assert_eq!(results[0].new_due, NaiveDate::from_ymd_opt(2009, 7, 15));
    assert_eq!(results[1].item_number, "1000009");
    assert_eq!(results[1].new_due, None);
}

#[test]
fn test_session_key_fines() {
    let listing = extract_fines(
        &rules(),
        fixtures::SESSION_KEY_FINES_PAGE,
        PaymentProtocol::SessionKey,
    );
    assert_eq!(listing.session_key.as_deref(), Some("K-8842"));
    assert_eq!(listing.fines.len(), 2);
    assert_eq!(listing.fines[0].handle, "fee101");
    assert_eq!(listing.fines[0].description, "Overdue: Nine stories");
    assert_eq!(listing.fines[0].amount, 12.50);
    assert_eq!(listing.total(), 13.50);
}

#[test]
fn test_checksum_fines() {
    let listing = extract_fines(&rules(), fixtures::CHECKSUM_FINES_PAGE, PaymentProtocol::Checksum);
    assert_eq!(listing.session_key, None);
    assert_eq!(listing.fines.len(), 1);
    assert_eq!(listing.fines[0].handle, "charge1");
    assert_eq!(listing.fines[0].description, "Overdue: Nine stories");
    assert_eq!(listing.fines[0].amount, 12.50);
}

#[test]
fn test_payment_pages() {
    let rules = rules();
    assert_eq!(
        extract_checksum(&rules, fixtures::CHECKSUM_CONFIRM_PAGE).as_deref(),
        Some("9f2c1e")
    );
    assert_eq!(extract_checksum(&rules, "<p>nothing</p>"), None);

    let approved = classify_payment(&rules, fixtures::PAYMENT_APPROVED_PAGE, PaymentProtocol::Checksum);
    assert!(approved.approved);

    let declined = classify_payment(
        &rules,
        fixtures::PAYMENT_DECLINED_PAGE,
        PaymentProtocol::SessionKey,
    );
    assert!(!declined.approved);
    assert_eq!(declined.error.as_deref(), Some("Payment failed"));
    assert_eq!(declined.reason.as_deref(), Some("Card number invalid"));
}

#[test]
fn test_item_page_bib_number() {
    assert_eq!(
        extract_item_bib_number(&rules(), fixtures::ITEM_PAGE).as_deref(),
        Some("2000001")
    );
    assert_eq!(extract_item_bib_number(&rules(), "<html></html>"), None);
}

#[test]
fn test_date_century_resolution() {
    // Expiry dates: 20YY unless that is after the current year
    assert_eq!(
        parse_mdy_as_of("12-31-10", 2000, 2009),
        NaiveDate::from_ymd_opt(1910, 12, 31)
    );
    assert_eq!(
        parse_mdy_as_of("12-31-08", 2000, 2009),
        NaiveDate::from_ymd_opt(2008, 12, 31)
    );

    let due = parse_mdy_windowed("06-15-09").unwrap();
    assert_eq!(format_ymd(due), "2009-06-15");
    assert_eq!(
        parse_mdy_windowed(&due.format("%m-%d-%y").to_string()),
        Some(due)
    );
    assert_eq!(
        parse_mdy_windowed("03-14-98"),
        NaiveDate::from_ymd_opt(1998, 3, 14)
    );
    assert_eq!(parse_mdy_windowed("not a date"), None);
}
