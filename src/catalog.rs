//! Anonymous catalog access: bib records, availability and item lookups.

use crate::availability::{AvailabilityRules, extract_availability};
use crate::bib::build_bib_record;
use crate::config::Config;
use crate::error::{ContractViolation, Result};
use crate::extract::extract_item_bib_number;
use crate::records::{Availability, BibRecord};
use crate::rules::{MarkupRules, Paths};
use crate::transport::SessionTransport;
use async_trait::async_trait;
use tracing::{debug, info, instrument};

/// Source of cover image references, keyed by standard number.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoverLookup: Send + Sync {
    async fn cover_url(&self, standard_number: &str) -> Option<String>;
}

/// Fills `{stdnum}` in a URL template. Without a template there are no covers.
#[derive(Debug, Clone, Default)]
pub struct TemplateCoverLookup {
    template: Option<String>,
}

impl TemplateCoverLookup {
    pub fn new(template: Option<String>) -> Self {
        Self { template }
    }
}

#[async_trait]
impl CoverLookup for TemplateCoverLookup {
    async fn cover_url(&self, standard_number: &str) -> Option<String> {
        // "0316769487 (pbk.)" -> "0316769487"
        let stdnum = standard_number.split_whitespace().next()?;
        let template = self.template.as_ref()?;
        Some(template.replace(
            "{stdnum}",
            &url::form_urlencoded::byte_serialize(stdnum.as_bytes()).collect::<String>(),
        ))
    }
}

/// Client for the public, unauthenticated catalog pages.
///
/// Has its own transport and cookie store; nothing is shared with patron sessions.
pub struct CatalogClient {
    transport: SessionTransport,
    config: Config,
    rules: MarkupRules,
    paths: Paths,
    availability: AvailabilityRules,
    covers: Box<dyn CoverLookup>,
}

impl CatalogClient {
    /// Client over HTTP against the configured host's insecure base URL.
    pub fn new(config: &Config) -> Result<Self> {
        if config.server.host.trim().is_empty() {
            return Err(ContractViolation::NoHost.into());
        }
        let transport = SessionTransport::http(config, config.server.insecure_base_url())?;
        let covers = TemplateCoverLookup::new(config.catalog.cover_url_template.clone());
        Self::with_transport(config, transport, Box::new(covers))
    }

    pub fn with_transport(
        config: &Config,
        transport: SessionTransport,
        covers: Box<dyn CoverLookup>,
    ) -> Result<Self> {
        let catalog = &config.catalog;
        Ok(Self {
            transport,
            rules: MarkupRules::for_release(catalog.release)?,
            paths: Paths::new(catalog.release, catalog.search_scope),
            availability: AvailabilityRules::from_config(catalog)?,
            config: config.clone(),
            covers,
        })
    }

    /// Fetch and normalize one bib record. `Ok(None)` means not found or suppressed.
    #[instrument(skip(self), fields(release = %self.config.catalog.release))]
    pub async fn scrape_bib(&self, bib_number: &str, skip_cover: bool) -> Result<Option<BibRecord>> {
        let bib_number = bib_number.trim();
        let response = self
            .transport
            .execute(&self.paths.xrecord(bib_number), None)
            .await?;

        let Some(mut bib) = build_bib_record(&response.body, bib_number, &self.config.catalog)
        else {
            info!(bib_number, "bib record not found");
            return Ok(None);
        };

        if !skip_cover
            && !bib.standard_number.is_empty()
            && let Some(cover) = self.covers.cover_url(&bib.standard_number).await
        {
            bib.cover_image = cover;
        }

        debug!(bib_number, title = %bib.title, "bib record scraped");
        Ok(Some(bib))
    }

    /// Live copy status for one bib record. Never cached.
    #[instrument(skip(self))]
    pub async fn item_status(&self, bib_number: &str) -> Result<Availability> {
        let bib_number = bib_number.trim();
        let summary = self
            .transport
            .execute(&self.paths.summary(bib_number), None)
            .await?;
        let holdings = self
            .transport
            .execute(&self.paths.holdings(bib_number), None)
            .await?;

        let availability =
            extract_availability(&self.rules, &self.availability, &holdings.body, &summary.body);
        info!(
            bib_number,
            total = availability.total,
            available = availability.available,
            holds = availability.holds,
            "availability fetched"
        );
        Ok(availability)
    }

    /// Bib number of the record an item belongs to.
    #[instrument(skip(self))]
    pub async fn item_to_bib(&self, item_number: &str) -> Result<Option<String>> {
        let response = self
            .transport
            .execute(&self.paths.item_record(item_number.trim()), None)
            .await?;
        Ok(extract_item_bib_number(&self.rules, &response.body))
    }
}
