//! Patron attributes and the lookup service that provides them.

use crate::error::{Result, ScrapeError};
use crate::markup::{parse_amount, parse_mdy_in_century};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Read-only snapshot of a patron record, fetched once per session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatronAttributes {
    pub record_number: String,
    pub card_number: String,
    pub name: String,
    pub checkouts: u32,
    pub home_library: String,
    /// Amount owed, in currency units
    pub balance: f64,
    pub expires: Option<NaiveDate>,
    /// Multi-line postal address
    pub address: String,
    pub phone: String,
    pub phone2: Option<String>,
    pub email: String,
    pub patron_type: String,
}

impl PatronAttributes {
    /// Map the raw patron-record field names onto typed attributes.
    ///
    /// Returns `None` when the record number is missing, since no patron
    /// page can be addressed without it.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let field = |key: &str| {
            fields
                .get(key)
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        let record_number = field("RECORDNUM");
        if record_number.is_empty() {
            return None;
        }

        let expires = Some(field("EXPDATE"))
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| parse_mdy_in_century(&raw, 2000));
        let phone2 = Some(field("TELEPHONE2")).filter(|phone| !phone.is_empty());

        Some(Self {
            record_number,
            card_number: field("PBARCODE"),
            name: field("PATRNNAME"),
            checkouts: field("CURCHKOUT").parse().unwrap_or(0),
            home_library: field("HOMELIBR"),
            balance: parse_amount(&field("MONEYOWED")),
            expires,
            address: field("ADDRESS").replace('$', "\n"),
            phone: field("TELEPHONE"),
            phone2,
            email: field("EMAILADDR"),
            patron_type: field("PTYPE"),
        })
    }

    /// True when `identifier` names this patron by card or record number
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        identifier == self.card_number || identifier == self.record_number
    }
}

/// Source of patron attributes, keyed by card number or record number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatronLookup: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<Option<PatronAttributes>>;
}

/// Fixed set of patron records
#[derive(Debug, Clone, Default)]
pub struct StaticPatronLookup {
    patrons: Vec<PatronAttributes>,
}

impl StaticPatronLookup {
    pub fn new(patrons: Vec<PatronAttributes>) -> Self {
        Self { patrons }
    }

    /// Load records from a JSON array of raw field maps.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let raw: Vec<HashMap<String, String>> = serde_json::from_str(&content).map_err(|e| {
            ScrapeError::Config(format!("invalid patron file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(
            raw.iter().filter_map(PatronAttributes::from_fields).collect(),
        ))
    }

    pub fn len(&self) -> usize {
        self.patrons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patrons.is_empty()
    }
}

#[async_trait]
impl PatronLookup for StaticPatronLookup {
    async fn lookup(&self, identifier: &str) -> Result<Option<PatronAttributes>> {
        Ok(self
            .patrons
            .iter()
            .find(|patron| patron.is_identified_by(identifier))
            .cloned())
    }
}
