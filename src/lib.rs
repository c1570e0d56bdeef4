//! # webpac-scraper Library
//!
//! Session-driven scraping of III Millennium WebPAC catalogs: patron loans,
//! holds, renewals and fines over an authenticated session, plus anonymous
//! bib record and availability lookups, all returned as typed records.

pub mod availability;
pub mod bib;
pub mod catalog;
pub mod circulation;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fines;
pub mod holds;
pub mod markup;
pub mod output;
pub mod patron;
pub mod records;
pub mod rules;
pub mod session;
pub mod transport;

pub use availability::{AvailabilityRules, CategoryMatcher, CategoryRules};
pub use bib::{XRecord, build_bib_record, parse_xrecord};
pub use catalog::{CatalogClient, CoverLookup, TemplateCoverLookup};
pub use circulation::RenewRequest;
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use config::{
    CatalogConfig, Config, ConfigError, ConfigManager, NetworkConfig, PaymentProtocol,
    ServerConfig, SuppressionMode, WorkflowConfig,
};
pub use error::{ContractViolation, Result, ScrapeError};
pub use holds::HoldUpdate;
pub use output::Output;
pub use patron::{PatronAttributes, PatronLookup, StaticPatronLookup};
pub use records::{
    Availability, BibRecord, CopyStatus, FineListing, FineRecord, HoldCandidate, HoldOutcome,
    HoldPlacement, HoldRecord, LoanRecord, PaymentDetails, PaymentResult, PickupLocation,
    RenewalResult,
};
pub use rules::{MarkupRules, Paths, Release};
pub use session::{Session, SessionId, SessionState};
pub use transport::{Backend, HttpBackend, RawResponse, RetryPolicy, SessionTransport};
