use crate::rules::Release;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show per-copy and per-field detail
    Verbose,
}

impl VerbosityLevel {
    /// Log filter used when neither `RUST_LOG` nor `--log-level` is set
    pub fn default_log_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Scrape bib records, availability and patron accounts from a WebPAC catalog
#[derive(Parser, Debug, Clone)]
#[command(name = "webpac-scraper")]
#[command(about = "Scrape records and patron accounts from a III Millennium WebPAC catalog")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Catalog host name, without scheme
    #[arg(long = "host", global = true)]
    pub host: Option<String>,

    /// Catalog software release
    #[arg(long = "release", value_enum, global = true)]
    pub release: Option<Release>,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout: Option<u64>,

    /// Attempts per request before giving up
    #[arg(long = "retry-attempts", global = true)]
    pub retry_attempts: Option<u32>,

    /// Use plain HTTP for patron sessions
    #[arg(long = "insecure", global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Log filter (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Patron identity for account commands
#[derive(Args, Debug, Clone)]
pub struct PatronArgs {
    /// Library card number
    #[arg(long = "card")]
    pub card: String,

    /// PIN, for catalogs that require one
    #[arg(long = "pin")]
    pub pin: Option<String>,

    /// JSON file of patron records (array of raw patron field maps)
    #[arg(long = "patron")]
    pub patron_file: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch and normalize one bib record
    Bib {
        bib_number: String,
        /// Do not look up a cover image
        #[arg(long = "skip-cover")]
        skip_cover: bool,
    },
    /// Live copy availability for a bib record
    Status { bib_number: String },
    /// Bib number an item record belongs to
    ItemBib { item_number: String },
    /// List the patron's loans
    Loans {
        #[command(flatten)]
        patron: PatronArgs,
    },
    /// List the patron's holds
    Holds {
        #[command(flatten)]
        patron: PatronArgs,
    },
    /// Renew loans by handle, or every loan when none are given
    Renew {
        #[command(flatten)]
        patron: PatronArgs,
        handles: Vec<String>,
    },
    /// Cancel holds by handle
    CancelHolds {
        #[command(flatten)]
        patron: PatronArgs,
        #[arg(required = true)]
        handles: Vec<String>,
    },
    /// Request a bib record
    PlaceHold {
        #[command(flatten)]
        patron: PatronArgs,
        bib_number: String,
        /// Copy to request, when the catalog asked for one
        #[arg(long = "item")]
        item: Option<String>,
        /// Pickup location code
        #[arg(long = "pickup")]
        pickup: Option<String>,
    },
    /// List outstanding fines, or pay them
    Fines {
        #[command(flatten)]
        patron: PatronArgs,
        /// JSON payment details; pays the listed fine handles
        #[arg(long = "pay")]
        pay: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn log_filter(&self) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| self.verbosity().default_log_filter().to_string())
    }
}
