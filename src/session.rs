//! Authenticated patron sessions.
//!
//! A [`Session`] owns one transport and therefore one cookie store. It is
//! created for one interaction with the catalog and closed at the end of it.
//! Workflows live in `circulation`, `holds` and `fines` as further `impl
//! Session` blocks; they all go through [`Session::request`], which logs in on
//! demand.

use crate::config::{Config, ConfigManager};
use crate::error::{ContractViolation, Result, ScrapeError};
use crate::patron::{PatronAttributes, PatronLookup};
use crate::rules::{MarkupRules, Paths};
use crate::transport::{RawResponse, SessionTransport};
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// PIN submitted when the caller has none
pub const UNUSED_PIN: &str = "unused";

/// Identifies a session in logs: the card number, or a random id without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn for_card(card: &str) -> Self {
        let card = card.trim();
        if card.is_empty() {
            Self(Uuid::new_v4().to_string())
        } else {
            Self(card.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The login request could not be delivered; the next request retries it
    Failed,
    Closed,
}

pub struct Session {
    id: SessionId,
    config: Config,
    card: String,
    pin: Option<String>,
    patron: Option<PatronAttributes>,
    state: SessionState,
    transport: Option<SessionTransport>,
    rules: MarkupRules,
    paths: Paths,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("patron_loaded", &self.patron.is_some())
            .field("pin_set", &self.pin.is_some())
            .finish()
    }
}

impl Session {
    /// Session over a fresh HTTP client against the secure base URL.
    pub fn new(config: &Config, card: &str) -> Result<Self> {
        Self::check_host(config)?;
        let transport = SessionTransport::http(config, config.server.secure_base_url())?;
        Self::with_transport(config, card, transport)
    }

    /// Session over a caller-supplied transport
    pub fn with_transport(config: &Config, card: &str, transport: SessionTransport) -> Result<Self> {
        Self::check_host(config)?;
        let release = config.catalog.release;
        Ok(Self {
            id: SessionId::for_card(card),
            config: config.clone(),
            card: card.trim().to_string(),
            pin: None,
            patron: None,
            state: SessionState::Unauthenticated,
            transport: Some(transport),
            rules: MarkupRules::for_release(release)?,
            paths: Paths::new(release, config.catalog.search_scope),
        })
    }

    fn check_host(config: &Config) -> Result<()> {
        if config.server.host.trim().is_empty() {
            return Err(ContractViolation::NoHost.into());
        }
        Ok(())
    }

    /// Set the PIN. A missing or empty PIN is sent as [`UNUSED_PIN`].
    pub fn with_pin(mut self, pin: Option<&str>) -> Self {
        self.set_pin(pin);
        self
    }

    pub fn set_pin(&mut self, pin: Option<&str>) {
        let pin = pin.map(str::trim).filter(|pin| !pin.is_empty());
        self.pin = Some(pin.unwrap_or(UNUSED_PIN).to_string());
    }

    /// Fetch the patron attributes for this session's card.
    #[instrument(skip(self, lookup), fields(session = %self.id))]
    pub async fn load_patron(&mut self, lookup: &dyn PatronLookup) -> Result<&PatronAttributes> {
        self.ensure_open()?;
        let patron = lookup
            .lookup(&self.card)
            .await?
            .ok_or_else(|| ScrapeError::PatronNotFound {
                identifier: self.card.clone(),
            })?;
        debug!(record_number = %patron.record_number, "patron attributes loaded");
        Ok(self.patron.insert(patron))
    }

    /// Use already known patron attributes.
    pub fn set_patron(&mut self, patron: PatronAttributes) {
        self.patron = Some(patron);
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn patron(&self) -> Option<&PatronAttributes> {
        self.patron.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn rules(&self) -> &MarkupRules {
        &self.rules
    }

    pub(crate) fn paths(&self) -> &Paths {
        &self.paths
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ContractViolation::SessionClosed.into());
        }
        Ok(())
    }

    pub(crate) fn transport(&self) -> Result<&SessionTransport> {
        self.transport
            .as_ref()
            .ok_or_else(|| ContractViolation::SessionClosed.into())
    }

    /// Patron and PIN, or the contract violation that prevents a login.
    pub(crate) fn credentials(&self) -> Result<(&PatronAttributes, &str)> {
        self.ensure_open()?;
        let patron = self
            .patron
            .as_ref()
            .ok_or(ContractViolation::PatronNotLoaded)?;
        let pin = self.pin.as_deref().ok_or(ContractViolation::MissingPin)?;
        Ok((patron, pin))
    }

    /// Record number of the loaded patron
    pub(crate) fn patron_number(&self) -> Result<String> {
        Ok(self.credentials()?.0.record_number.clone())
    }

    /// `name`, `code` and `pin` fields identifying the patron to the catalog
    pub(crate) fn identity_form(&self) -> Result<Vec<(String, String)>> {
        let (patron, pin) = self.credentials()?;
        Ok(vec![
            ("name".to_string(), patron.name.clone()),
            ("code".to_string(), self.card.clone()),
            ("pin".to_string(), pin.to_string()),
        ])
    }

    /// Log in to the patron pages.
    ///
    /// Any response counts as success: the catalog answers a bad PIN with an
    /// ordinary page, so a failed login only shows up as empty listings later.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn login(&mut self) -> Result<()> {
        let form = self.identity_form()?;
        self.state = SessionState::Authenticating;

        let outcome = self
            .transport()?
            .execute(self.paths.login(), Some(&form))
            .await;
        match outcome {
            Ok(_) => {
                self.state = SessionState::Authenticated;
                info!("logged in");
                Ok(())
            }
            Err(error) => {
                self.state = SessionState::Failed;
                warn!(error = %error, "login failed");
                Err(error)
            }
        }
    }

    pub async fn ensure_authenticated(&mut self) -> Result<()> {
        self.credentials()?;
        if !self.is_authenticated() {
            self.login().await?;
        }
        Ok(())
    }

    /// Authenticated request through this session's transport.
    pub(crate) async fn request(
        &mut self,
        path_suffix: &str,
        form: Option<&[(String, String)]>,
    ) -> Result<RawResponse> {
        self.ensure_authenticated().await?;
        self.transport()?.execute(path_suffix, form).await
    }

    /// Sleep before a request that touches a record the catalog may still hold locked.
    pub(crate) async fn race_delay(&self) {
        pause(ConfigManager::get_race_delay_duration(&self.config)).await;
    }

    pub(crate) async fn settle_delay(&self) {
        pause(ConfigManager::get_payment_settle_duration(&self.config)).await;
    }

    /// Log out and drop the transport with its cookies. Safe to call repeatedly.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        if self.is_authenticated()
            && let Some(transport) = &self.transport
            && let Err(error) = transport.execute_once(self.paths.logout(), Some(&[])).await
        {
            warn!(error = %error, "logout failed, dropping session anyway");
        }

        self.transport = None;
        self.state = SessionState::Closed;
        debug!("session closed");
    }

    /// Run `work` against this session, then close it whatever the outcome.
    pub async fn scoped<T, F>(mut self, work: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T>>,
    {
        let result = work(&mut self).await;
        self.close().await;
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.transport.take().is_some() && self.is_authenticated() {
            debug!(session = %self.id, "session dropped without logout");
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
