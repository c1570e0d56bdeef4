//! Typed records produced by the extraction layer.
//!
//! Every optional vendor field is an `Option`, so a markup change that makes a
//! field disappear shows up as `None` instead of a missing map key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One checked-out item from the patron's loan listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Form-control name used to address this loan in renewal requests
    pub handle: String,
    /// Item record number without its `i` prefix
    pub item_number: String,
    /// Bib record number, when it could be resolved
    pub bib_number: Option<String>,
    pub title: String,
    pub barcode: String,
    /// Interlibrary loans have no local record link
    pub is_interlibrary_loan: bool,
    pub renewals: u32,
    pub due: Option<NaiveDate>,
    pub call_number: String,
}

/// One request from the patron's holds listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldRecord {
    pub handle: String,
    /// Absent for interlibrary requests
    pub bib_number: Option<String>,
    pub title: String,
    pub is_interlibrary_loan: bool,
    /// Vendor status text, or "Waiting for your copy" when it carries no position
    pub status: String,
    pub pickup_location: String,
    /// Date the request lapses, when the catalog shows one
    pub cancel_by: Option<String>,
    /// Only reported by releases that support frozen holds
    pub frozen: Option<bool>,
}

impl HoldRecord {
    pub fn is_ready(&self) -> bool {
        self.status.to_lowercase().contains("ready")
    }
}

/// A physical copy offered when the catalog asks the patron to pick one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldCandidate {
    pub handle: String,
    pub location: String,
    pub call_number: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupLocation {
    pub code: String,
    pub name: String,
}

/// Raw result of a hold placement attempt.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HoldPlacement {
    pub success: bool,
    pub error: Option<String>,
    /// Non-empty when the catalog wants one copy chosen, in page order
    pub candidates: Vec<HoldCandidate>,
    /// Non-empty when the catalog wants a pickup location chosen, in page order
    pub pickup_locations: Vec<PickupLocation>,
}

/// The three ways a hold placement can end.
#[derive(Debug, Clone, PartialEq)]
pub enum HoldOutcome<'a> {
    Placed,
    /// A follow-up `place_hold` with a copy and/or pickup location is needed
    NeedsSelection {
        candidates: &'a [HoldCandidate],
        pickup_locations: &'a [PickupLocation],
    },
    Rejected { reason: Option<&'a str> },
}

impl HoldPlacement {
    pub fn outcome(&self) -> HoldOutcome<'_> {
        if self.success {
            HoldOutcome::Placed
        } else if !self.candidates.is_empty() || !self.pickup_locations.is_empty() {
            HoldOutcome::NeedsSelection {
                candidates: &self.candidates,
                pickup_locations: &self.pickup_locations,
            }
        } else {
            HoldOutcome::Rejected {
                reason: self.error.as_deref(),
            }
        }
    }
}

/// Per-item result of a renewal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenewalResult {
    pub item_number: String,
    pub handle: String,
    pub renewals: u32,
    pub new_due: Option<NaiveDate>,
    /// Catalog's refusal message, e.g. "Renewed Max Times"
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineRecord {
    pub handle: String,
    pub description: String,
    pub amount: f64,
}

/// Outstanding fines plus the opaque key some releases require to pay them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FineListing {
    pub session_key: Option<String>,
    pub fines: Vec<FineRecord>,
}

impl FineListing {
    pub fn total(&self) -> f64 {
        let cents: i64 = self
            .fines
            .iter()
            .map(|fine| (fine.amount * 100.0).round() as i64)
            .sum();
        cents as f64 / 100.0
    }
}

/// Billing details for a fine payment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Fine handles being paid, as returned by `fetch_fines`
    pub fine_handles: Vec<String>,
    pub total: f64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub email: String,
    pub card_number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub security_code: String,
}

impl PaymentDetails {
    /// Amount in the catalog's display format, e.g. `$12.50`
    pub fn formatted_total(&self) -> String {
        format!("${:.2}", self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentResult {
    pub approved: bool,
    pub error: Option<String>,
    pub reason: Option<String>,
}

/// Normalized bibliographic record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BibRecord {
    pub bib_number: String,
    pub created: Option<NaiveDate>,
    pub last_updated: Option<NaiveDate>,
    pub previous_updated: Option<NaiveDate>,
    pub revisions: u32,
    pub language: String,
    pub location_code: String,
    pub material_code: String,
    pub suppressed: bool,
    pub author: String,
    pub non_romanized_author: String,
    pub additional_authors: Vec<String>,
    pub title: String,
    pub title_medium: String,
    pub additional_titles: Vec<String>,
    pub non_romanized_title: String,
    pub edition: String,
    pub series: Vec<String>,
    pub call_number: String,
    pub publisher_info: String,
    pub publication_year: String,
    pub standard_number: String,
    pub upc: String,
    pub lccn: String,
    pub description: String,
    pub notes: Vec<String>,
    pub subjects: Vec<String>,
    pub cover_image: String,
}

/// Status of one physical copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyStatus {
    pub location: String,
    pub location_code: Option<String>,
    pub call_number: String,
    pub status: String,
    pub available: bool,
    pub due: Option<NaiveDate>,
    pub age: String,
    pub branch: String,
}

/// Availability summary for one bib record. Never cached.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Availability {
    pub total: usize,
    pub available: usize,
    pub holds: u32,
    pub on_order: u32,
    /// Order notes as shown by the catalog, e.g. "2 copies ordered for Main"
    pub orders: Vec<String>,
    pub items: Vec<CopyStatus>,
}
