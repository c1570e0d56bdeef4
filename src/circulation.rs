//! Loan listing and renewals.

use crate::error::{ContractViolation, Result};
use crate::extract::{bare_item_number, extract_item_bib_number, extract_loans, extract_renewals};
use crate::records::{LoanRecord, RenewalResult};
use crate::session::Session;
use tracing::{debug, info, instrument};

/// Which loans to renew
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewRequest {
    All,
    /// `(handle, item number)` pairs as listed by [`Session::list_loans`]
    Items(Vec<(String, String)>),
}

impl RenewRequest {
    /// Renew the given loans, or everything when the list is empty.
    pub fn for_loans(loans: &[LoanRecord]) -> Self {
        if loans.is_empty() {
            return RenewRequest::All;
        }
        RenewRequest::Items(
            loans
                .iter()
                .map(|loan| (loan.handle.clone(), loan.item_number.clone()))
                .collect(),
        )
    }
}

/// Item numbers as the renewal form expects them, with an `i` prefix
fn prefixed_item(item: &str) -> String {
    format!("i{}", bare_item_number(item))
}

impl Session {
    /// Loans on the patron's record, in the order the catalog lists them.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn list_loans(&mut self) -> Result<Vec<LoanRecord>> {
        let pnum = self.patron_number()?;
        let sorted = self.config().workflow.sort_loans_by_due;
        let path = self.paths().loans(&pnum, sorted);
        let response = self.request(&path, None).await?;

        let mut loans = extract_loans(self.rules(), &response.body);
        if self.config().workflow.resolve_bib_numbers {
            for loan in loans.iter_mut().filter(|loan| !loan.is_interlibrary_loan) {
                loan.bib_number = self.item_to_bib(&loan.item_number).await?;
            }
        }

        info!(count = loans.len(), "loans listed");
        Ok(loans)
    }

    /// Bib number for an item record, read from the item's public page.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn item_to_bib(&mut self, item_number: &str) -> Result<Option<String>> {
        let path = self.paths().item_record(bare_item_number(item_number));
        let response = self.transport()?.execute(&path, None).await?;
        let bib_number = extract_item_bib_number(self.rules(), &response.body);
        debug!(item_number, bib_number = ?bib_number, "item resolved");
        Ok(bib_number)
    }

    /// Renew loans and report the per-item outcome.
    ///
    /// Refusals come back as [`RenewalResult::error`]; only transport
    /// failures and caller mistakes are errors.
    #[instrument(skip(self, request), fields(session = %self.id()))]
    pub async fn renew_items(&mut self, request: &RenewRequest) -> Result<Vec<RenewalResult>> {
        let pnum = self.patron_number()?;
        let (path, selection) = match request {
            RenewRequest::All => (self.paths().renew_all(&pnum), None),
            RenewRequest::Items(items) if items.is_empty() => {
                return Err(ContractViolation::EmptySelection { what: "loans" }.into());
            }
            RenewRequest::Items(items) => {
                let pairs: Vec<(String, String)> = items
                    .iter()
                    .map(|(handle, item)| (handle.clone(), prefixed_item(item)))
                    .collect();
                (self.paths().renew_some(&pnum, &pairs), Some(pairs))
            }
        };

        self.ensure_authenticated().await?;
        self.race_delay().await;
        let response = self.request(&path, None).await?;

        let results = extract_renewals(self.rules(), &response.body, selection.as_deref());
        let refused = results.iter().filter(|result| result.error.is_some()).count();
        info!(count = results.len(), refused, "renewal processed");
        Ok(results)
    }
}
