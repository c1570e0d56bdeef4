//! Outstanding fines and the two-phase payment flow.

use crate::config::PaymentProtocol;
use crate::error::{ContractViolation, Result};
use crate::extract::{classify_payment, extract_checksum, extract_fines};
use crate::records::{FineListing, PaymentDetails, PaymentResult};
use crate::session::Session;
use tracing::{info, instrument, warn};

fn field(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}

/// Billing fields in the shape the checksum confirmation pages expect
fn checksum_details(details: &PaymentDetails) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = details
        .fine_handles
        .iter()
        .map(|handle| field(handle, "on"))
        .collect();
    form.extend([
        field("amount", &details.formatted_total()),
        field("ccname", &details.name),
        field("address1", &details.address),
        field("city", &details.city),
        field("state", &details.state),
        field("zip", &details.zip),
        field("emailaddr", &details.email),
        field("ccnum", &details.card_number),
        field("ccexpmonth", &details.expiry_month),
        field("ccexpyear", &details.expiry_year),
        field("cc_cvv2", &details.security_code),
    ]);
    form
}

/// Billing fields for the session-key validation page
fn session_key_details(key: &str, details: &PaymentDetails) -> Vec<(String, String)> {
    let mut form = vec![
        field("action", "confirmInfo"),
        field("key", key),
        field("parsedMoneyfmt", ",.2"),
        field("currencySymbol", "$"),
        field("serviceCharge", "0"),
        field("amount", "0"),
    ];
    form.extend(
        details
            .fine_handles
            .iter()
            .map(|handle| field("selectedFees", handle)),
    );
    form.extend([
        field("amount", &details.formatted_total()),
        field("name", &details.name),
        field("address1", &details.address),
        field("city", &details.city),
        field("state", &details.state),
        field("zip", &details.zip),
        field("email", &details.email),
        field("ccnum", &details.card_number),
        field("ccexp_month", &details.expiry_month),
        field("ccexp_year", &details.expiry_year),
        field("cvv", &details.security_code),
    ]);
    form
}

impl Session {
    fn payment_protocol(&self) -> PaymentProtocol {
        self.config().payment_protocol()
    }

    /// Outstanding fines, with the payment key when the protocol uses one.
    #[instrument(skip(self), fields(session = %self.id()))]
    pub async fn fetch_fines(&mut self) -> Result<FineListing> {
        let protocol = self.payment_protocol();
        let (pnum, patron_type) = {
            let (patron, _) = self.credentials()?;
            (patron.record_number.clone(), patron.patron_type.clone())
        };
        let path = self.paths().fines(protocol, &pnum, &patron_type);
        let response = self.request(&path, None).await?;

        let listing = extract_fines(self.rules(), &response.body, protocol);
        info!(count = listing.fines.len(), total = listing.total(), "fines listed");
        Ok(listing)
    }

    /// Pay the fines named in `details`.
    ///
    /// A declined card is an unapproved [`PaymentResult`], not an error.
    #[instrument(skip(self, details), fields(session = %self.id(), fines = details.fine_handles.len()))]
    pub async fn pay_fines(&mut self, details: &PaymentDetails) -> Result<PaymentResult> {
        if details.fine_handles.is_empty() {
            return Err(ContractViolation::EmptySelection { what: "fines" }.into());
        }
        let pnum = self.patron_number()?;
        let protocol = self.payment_protocol();

        let result = match protocol {
            PaymentProtocol::Checksum => self.pay_with_checksum(&pnum, details).await?,
            PaymentProtocol::SessionKey => self.pay_with_session_key(&pnum, details).await?,
        };

        if result.approved {
            info!(amount = %details.formatted_total(), "payment approved");
        } else {
            info!(error = ?result.error, reason = ?result.reason, "payment declined");
        }
        Ok(result)
    }

    async fn pay_with_checksum(&mut self, pnum: &str, details: &PaymentDetails) -> Result<PaymentResult> {
        let protocol = PaymentProtocol::Checksum;
        let billing = checksum_details(details);

        let mut confirm = vec![field("entered", "Y")];
        confirm.extend(billing.iter().cloned());
        let confirm_path = self.paths().payment_confirm(protocol, pnum);
        let confirmation = self.request(&confirm_path, Some(&confirm)).await?;

        let Some(checksum) = extract_checksum(self.rules(), &confirmation.body) else {
            warn!("no checksum on the confirmation page");
            return Ok(classify_payment(self.rules(), &confirmation.body, protocol));
        };

        let mut submit = vec![
            field("cksum", &checksum),
            field("entered", "Y"),
            field("confirmed", "Y"),
        ];
        submit.extend(billing);
        let submit_path = self.paths().payment_submit(protocol, pnum);
        let outcome = self.request(&submit_path, Some(&submit)).await?;
        self.settle_delay().await;

        Ok(classify_payment(self.rules(), &outcome.body, protocol))
    }

    async fn pay_with_session_key(
        &mut self,
        pnum: &str,
        details: &PaymentDetails,
    ) -> Result<PaymentResult> {
        let protocol = PaymentProtocol::SessionKey;
        let Some(key) = self.fetch_fines().await?.session_key else {
            warn!("fines page carried no payment key");
            return Ok(PaymentResult {
                approved: false,
                error: Some("Payment session unavailable".to_string()),
                reason: None,
            });
        };

        let validate = session_key_details(&key, details);
        let validate_path = self.paths().payment_confirm(protocol, pnum);
        self.request(&validate_path, Some(&validate)).await?;

        let submit = vec![field("action", "submitData"), field("key", &key)];
        let submit_path = self.paths().payment_submit(protocol, pnum);
        let outcome = self.request(&submit_path, Some(&submit)).await?;
        self.settle_delay().await;

        Ok(classify_payment(self.rules(), &outcome.body, protocol))
    }
}
