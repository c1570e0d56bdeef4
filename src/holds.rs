//! Hold listing, placement, cancellation and updates.

use crate::error::{ContractViolation, Result};
use crate::extract::{classify_hold_response, extract_holds};
use crate::records::{HoldOutcome, HoldPlacement, HoldRecord};
use crate::session::Session;
use chrono::{Datelike, Local, NaiveDate};
use tracing::{info, instrument, warn};

/// Changes to existing holds, sent as one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldUpdate {
    /// Handles of holds to cancel
    pub cancel: Vec<String>,
    /// `(handle, frozen)` toggles
    pub freeze: Vec<(String, bool)>,
    /// `(handle, pickup location code)` changes
    pub pickup: Vec<(String, String)>,
}

impl HoldUpdate {
    pub fn cancel(handles: &[String]) -> Self {
        Self {
            cancel: handles.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cancel.is_empty() && self.freeze.is_empty() && self.pickup.is_empty()
    }

    /// Form fields for the holds page.
    ///
    /// Hold handles carry a `cancel` prefix; the freeze and pickup controls of
    /// the same hold use `freeze` and `loc` in its place.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("updateholdssome".to_string(), "TRUE".to_string())];
        form.extend(
            self.cancel
                .iter()
                .map(|handle| (handle.clone(), "1".to_string())),
        );
        form.extend(self.freeze.iter().map(|(handle, frozen)| {
            let value = if *frozen { "on" } else { "off" };
            (sibling_control(handle, "freeze"), value.to_string())
        }));
        form.extend(
            self.pickup
                .iter()
                .map(|(handle, code)| (sibling_control(handle, "loc"), code.clone())),
        );
        form
    }
}

fn sibling_control(handle: &str, prefix: &str) -> String {
    let key = handle.strip_prefix("cancel").unwrap_or(handle);
    format!("{}{}", prefix, key)
}

/// Needed-by date sent with a hold request: one year from `today`
pub fn needed_by(today: NaiveDate) -> NaiveDate {
    today
        .with_year(today.year() + 1)
        // Feb 29
        .or_else(|| NaiveDate::from_ymd_opt(today.year() + 1, today.month(), 28))
        .unwrap_or(today)
}

impl Session {
    /// Holds on the patron's record, in page order.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn list_holds(&mut self) -> Result<Vec<HoldRecord>> {
        let pnum = self.patron_number()?;
        let path = self.paths().holds(&pnum);
        let response = self.request(&path, None).await?;

        let holds = extract_holds(self.rules(), &response.body);
        info!(count = holds.len(), "holds listed");
        Ok(holds)
    }

    /// Request a bib record, optionally naming a copy and a pickup location.
    ///
    /// When the catalog wants a choice first, the returned placement lists the
    /// candidates and pickup locations to retry with.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn place_hold(
        &mut self,
        bib_number: &str,
        item: Option<&str>,
        pickup_location: Option<&str>,
    ) -> Result<HoldPlacement> {
        let today = Local::now().date_naive();
        let needed = needed_by(today);

        let mut form = self.identity_form()?;
        form.extend([
            ("neededby_Month".to_string(), format!("{:02}", needed.month())),
            ("neededby_Day".to_string(), format!("{:02}", needed.day())),
            ("neededby_Year".to_string(), needed.year().to_string()),
        ]);
        if let Some(item) = item.filter(|item| !item.trim().is_empty()) {
            form.push(("submit".to_string(), "SUBMIT".to_string()));
            form.push(("radio".to_string(), item.trim().to_string()));
        }
        if let Some(code) = pickup_location.filter(|code| !code.trim().is_empty()) {
            form.push(("loc".to_string(), code.trim().to_string()));
        }

        let path = self.paths().place_hold(bib_number.trim());
        self.ensure_authenticated().await?;
        self.race_delay().await;
        let response = self.request(&path, Some(&form)).await?;

        let placement = classify_hold_response(self.rules(), &response.body);
        match placement.outcome() {
            HoldOutcome::Placed => info!(bib_number, "hold placed"),
            HoldOutcome::NeedsSelection {
                candidates,
                pickup_locations,
            } => info!(
                bib_number,
                candidates = candidates.len(),
                pickup_locations = pickup_locations.len(),
                "hold needs a selection"
            ),
            HoldOutcome::Rejected { reason } => {
                info!(bib_number, reason = reason.unwrap_or(""), "hold rejected")
            }
        }
        Ok(placement)
    }

    /// Cancel holds by handle.
    pub async fn cancel_holds(&mut self, handles: &[String]) -> Result<()> {
        if handles.is_empty() {
            return Err(ContractViolation::EmptySelection { what: "holds" }.into());
        }
        self.update_holds(&HoldUpdate::cancel(handles)).await
    }

    /// Cancel, freeze or move holds in one request.
    #[instrument(skip(self, update), fields(session = %self.id()))]
    pub async fn update_holds(&mut self, update: &HoldUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(ContractViolation::EmptySelection { what: "hold changes" }.into());
        }
        if !update.freeze.is_empty() && !self.rules().release.supports_hold_freeze() {
            warn!(release = %self.rules().release, "release has no hold freeze controls");
        }

        let pnum = self.patron_number()?;
        let path = self.paths().holds(&pnum);
        let form = update.to_form();

        self.ensure_authenticated().await?;
        self.race_delay().await;
        self.request(&path, Some(&form)).await?;

        info!(
            cancelled = update.cancel.len(),
            freeze_changes = update.freeze.len(),
            pickup_changes = update.pickup.len(),
            "holds updated"
        );
        Ok(())
    }
}
