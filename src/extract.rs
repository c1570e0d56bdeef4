//! Page extractors and response classifiers.
//!
//! Every function here is pure: markup in, typed records out. Output follows
//! document order and a missing field becomes an empty or absent value, never
//! an error.

use crate::config::PaymentProtocol;
use crate::markup::{
    clean_text, group, leading_number, optional_group, parse_amount, parse_mdy_windowed,
    plain_text, title_case,
};
use crate::records::{
    FineListing, FineRecord, HoldCandidate, HoldPlacement, HoldRecord, LoanRecord, PaymentResult,
    PickupLocation, RenewalResult,
};
use crate::rules::MarkupRules;

const WAITING_STATUS: &str = "Waiting for your copy";

/// Strip a leading `i` from an item number.
pub fn bare_item_number(item: &str) -> &str {
    let item = item.trim();
    item.strip_prefix('i').unwrap_or(item)
}

fn renewal_count(rules: &MarkupRules, text: &str) -> u32 {
    rules
        .renew_count
        .captures(text)
        .and_then(|caps| caps.name("count"))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Loans from the patron's checked-out items page.
///
/// `bib_number` is left empty; resolving it takes one request per loan.
pub fn extract_loans(rules: &MarkupRules, body: &str) -> Vec<LoanRecord> {
    rules
        .loan_block
        .captures_iter(body)
        .map(|caps| {
            let title_cell = group(&caps, "title");
            let (title, is_interlibrary_loan) = match rules.title_link.captures(&title_cell) {
                Some(link) => (plain_text(&group(&link, "title")), false),
                None => (plain_text(&title_cell), true),
            };

            LoanRecord {
                handle: group(&caps, "handle"),
                item_number: bare_item_number(&group(&caps, "item")).to_string(),
                bib_number: None,
                title,
                barcode: plain_text(&group(&caps, "barcode")),
                is_interlibrary_loan,
                renewals: renewal_count(rules, &group(&caps, "extra")),
                due: parse_mdy_windowed(&clean_text(&group(&caps, "due"))),
                call_number: plain_text(&group(&caps, "callnum")),
            }
        })
        .collect()
}

/// Keep informative statuses verbatim, collapse the rest.
pub fn normalize_hold_status(rules: &MarkupRules, raw: &str) -> String {
    let status = plain_text(raw);
    if rules.hold_status_kept.is_match(&status) {
        status
    } else {
        WAITING_STATUS.to_string()
    }
}

/// Holds from the patron's holds page.
pub fn extract_holds(rules: &MarkupRules, body: &str) -> Vec<HoldRecord> {
    rules
        .hold_block
        .captures_iter(body)
        .map(|caps| {
            let handle = group(&caps, "handle");
            let title_cell = group(&caps, "title");
            // Interlibrary requests are addressed by an email-like handle
            let is_interlibrary_loan = handle.contains('@');

            let (bib_number, title) = if is_interlibrary_loan {
                (None, plain_text(&title_cell))
            } else {
                match rules.hold_bib_link.captures(&title_cell) {
                    Some(link) => (
                        optional_group(&link, "bnum"),
                        plain_text(&group(&link, "title")),
                    ),
                    None => (None, plain_text(&title_cell)),
                }
            };

            let cancel_by = Some(plain_text(&group(&caps, "cancel"))).filter(|s| !s.is_empty());
            let frozen = rules.hold_frozen.as_ref().map(|freeze| {
                freeze
                    .captures(&group(&caps, "rest"))
                    .map(|cell| group(&cell, "freeze").to_lowercase().contains("checked"))
                    .unwrap_or(false)
            });

            HoldRecord {
                handle,
                bib_number,
                title,
                is_interlibrary_loan,
                status: normalize_hold_status(rules, &group(&caps, "status")),
                pickup_location: plain_text(&group(&caps, "pickup")),
                cancel_by,
                frozen,
            }
        })
        .collect()
}

/// Classify the page returned by a hold request.
pub fn classify_hold_response(rules: &MarkupRules, body: &str) -> HoldPlacement {
    let success = rules.hold_success.is_match(body);

    let error = rules
        .hold_error
        .captures(body)
        .map(|caps| plain_text(&group(&caps, "error")))
        .filter(|error| !error.is_empty());

    let candidates = if rules.hold_choose_item.is_match(body) {
        rules
            .hold_candidate
            .captures_iter(body)
            .map(|caps| {
                let handle = rules
                    .hold_candidate_handle
                    .captures(&group(&caps, "radio"))
                    .map(|radio| group(&radio, "handle"))
                    .unwrap_or_default();
                let call_number = format!(
                    "{} {}",
                    plain_text(&group(&caps, "callnum")),
                    plain_text(&group(&caps, "volume"))
                );
                HoldCandidate {
                    handle,
                    location: plain_text(&group(&caps, "location")),
                    call_number: call_number.trim().to_string(),
                    status: plain_text(&group(&caps, "status")),
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    let pickup_locations = extract_pickup_locations(rules, body);

    HoldPlacement {
        success,
        error,
        candidates,
        pickup_locations,
    }
}

fn extract_pickup_locations(rules: &MarkupRules, body: &str) -> Vec<PickupLocation> {
    let Some(form) = rules.pickup_form.captures(body) else {
        return Vec::new();
    };
    let form = group(&form, "form");

    let mut locations: Vec<PickupLocation> = Vec::new();
    for option in rules.pickup_option.captures_iter(&form) {
        let option = group(&option, "option");
        let code = rules
            .pickup_value
            .captures(&option)
            .map(|caps| group(&caps, "code"));
        let name = rules
            .pickup_name
            .captures(&option)
            .map(|caps| plain_text(&group(&caps, "name")));

        if let (Some(code), Some(name)) = (code, name)
            && code.chars().any(|c| c.is_alphanumeric() || c == '_')
            && !locations.iter().any(|loc| loc.code == code)
        {
            locations.push(PickupLocation { code, name });
        }
    }
    locations
}

/// Per-item results from the page returned by a renewal request.
///
/// With `selection`, results follow the requested `(handle, item)` order and
/// requested loans missing from the page get an empty result. Without it,
/// every loan on the page is reported in page order.
pub fn extract_renewals(
    rules: &MarkupRules,
    body: &str,
    selection: Option<&[(String, String)]>,
) -> Vec<RenewalResult> {
    let on_page: Vec<RenewalResult> = rules
        .renew_block
        .captures_iter(body)
        .map(|caps| {
            let extra = group(&caps, "extra");
            let error = rules
                .renew_error
                .captures(&extra)
                .map(|err| title_case(&clean_text(&group(&err, "error"))))
                .filter(|err| !err.is_empty());

            RenewalResult {
                item_number: bare_item_number(&group(&caps, "item")).to_string(),
                handle: group(&caps, "handle"),
                renewals: renewal_count(rules, &extra),
                new_due: parse_mdy_windowed(&clean_text(&group(&caps, "due"))),
                error,
            }
        })
        .collect();

    let Some(selection) = selection else {
        return on_page;
    };

    selection
        .iter()
        .map(|(handle, item)| {
            let item = bare_item_number(item);
            on_page
                .iter()
                .find(|result| result.handle == *handle && result.item_number == item)
                .cloned()
                .unwrap_or_else(|| RenewalResult {
                    item_number: item.to_string(),
                    handle: handle.clone(),
                    renewals: 0,
                    new_due: None,
                    error: None,
                })
        })
        .collect()
}

/// Outstanding fines from the fines page of the given payment protocol.
pub fn extract_fines(rules: &MarkupRules, body: &str, protocol: PaymentProtocol) -> FineListing {
    match protocol {
        PaymentProtocol::SessionKey => FineListing {
            session_key: rules
                .fine_session_key
                .captures(body)
                .and_then(|caps| optional_group(&caps, "key")),
            fines: rules
                .fine_selected_fee
                .captures_iter(body)
                .map(|caps| FineRecord {
                    handle: group(&caps, "handle"),
                    description: plain_text(&group(&caps, "desc")),
                    amount: parse_amount(&group(&caps, "amount")),
                })
                .collect(),
        },
        PaymentProtocol::Checksum => FineListing {
            session_key: None,
            fines: rules
                .fine_charge
                .captures_iter(body)
                .map(|caps| FineRecord {
                    handle: format!("charge{}", group(&caps, "handle")),
                    description: plain_text(&group(&caps, "desc")),
                    amount: parse_amount(&group(&caps, "amount")),
                })
                .collect(),
        },
    }
}

/// Checksum token handed back by the first payment phase
pub fn extract_checksum(rules: &MarkupRules, body: &str) -> Option<String> {
    rules
        .payment_checksum
        .captures(body)
        .and_then(|caps| optional_group(&caps, "cksum"))
}

/// Classify the page returned by the final payment phase.
pub fn classify_payment(
    rules: &MarkupRules,
    body: &str,
    protocol: PaymentProtocol,
) -> PaymentResult {
    if rules.payment_approved.is_match(body) {
        return PaymentResult {
            approved: true,
            error: None,
            reason: None,
        };
    }

    let pattern = match protocol {
        PaymentProtocol::Checksum => &rules.payment_error_checksum,
        PaymentProtocol::SessionKey => &rules.payment_error_session_key,
    };
    let (error, reason) = match pattern.captures(body) {
        Some(caps) => (
            Some(plain_text(&group(&caps, "error"))).filter(|s| !s.is_empty()),
            Some(plain_text(&group(&caps, "reason"))).filter(|s| !s.is_empty()),
        ),
        None => (None, None),
    };

    PaymentResult {
        approved: false,
        error,
        reason,
    }
}

/// Bib number shown on an item record page, without its check digit.
pub fn extract_item_bib_number(rules: &MarkupRules, body: &str) -> Option<String> {
    let raw = rules
        .item_bib_number
        .captures(body)
        .map(|caps| group(&caps, "bnum"))?;
    let mut chars = raw.chars();
    chars.next_back()?;
    let bnum = chars.as_str().trim();
    (!bnum.is_empty()).then(|| bnum.to_string())
}

/// Leading copy count of an order note, e.g. `2 copies being processed`.
pub fn order_copy_count(note: &str) -> u32 {
    match note.find("cop") {
        Some(end) => leading_number(&note[..end]).unwrap_or(0),
        None => 0,
    }
}
