use std::path::Path;
use std::process;

use anyhow::{Context, bail};
use futures::FutureExt;
use tracing::{debug, error};

use webpac_scraper::cli::{Cli, Command, PatronArgs};
use webpac_scraper::config::{Config, ConfigManager};
use webpac_scraper::output::Output;
use webpac_scraper::{
    CatalogClient, PaymentDetails, RenewRequest, Session, StaticPatronLookup,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;
    debug!(host = %config.server.host, release = %config.catalog.release, "configuration loaded");

    let output = Output::new(cli.format, cli.verbosity());

    let rendered = match cli.command {
        Command::Bib {
            bib_number,
            skip_cover,
        } => {
            let client = CatalogClient::new(&config)?;
            let bib = client.scrape_bib(&bib_number, skip_cover).await?;
            output.format_bib(&bib_number, bib.as_ref())?
        }
        Command::Status { bib_number } => {
            let client = CatalogClient::new(&config)?;
            output.format_availability(&client.item_status(&bib_number).await?)?
        }
        Command::ItemBib { item_number } => {
            let client = CatalogClient::new(&config)?;
            let bib = client.item_to_bib(&item_number).await?;
            output.format_item_bib(&item_number, bib.as_deref())?
        }
        Command::Loans { patron } => {
            let session = open_session(&config, &patron).await?;
            let loans = session
                .scoped(|session| async move { session.list_loans().await }.boxed())
                .await?;
            output.format_loans(&loans)?
        }
        Command::Holds { patron } => {
            let session = open_session(&config, &patron).await?;
            let holds = session
                .scoped(|session| async move { session.list_holds().await }.boxed())
                .await?;
            output.format_holds(&holds)?
        }
        Command::Renew { patron, handles } => {
            let session = open_session(&config, &patron).await?;
            let results = session
                .scoped(|session| {
                    async move {
                        let request = if handles.is_empty() {
                            RenewRequest::All
                        } else {
                            let loans = session.list_loans().await?;
                            let selected: Vec<_> = loans
                                .into_iter()
                                .filter(|loan| handles.contains(&loan.handle))
                                .collect();
                            RenewRequest::Items(
                                selected
                                    .into_iter()
                                    .map(|loan| (loan.handle, loan.item_number))
                                    .collect(),
                            )
                        };
                        session.renew_items(&request).await
                    }
                    .boxed()
                })
                .await?;
            output.format_renewals(&results)?
        }
        Command::CancelHolds { patron, handles } => {
            let count = handles.len();
            let session = open_session(&config, &patron).await?;
            session
                .scoped(|session| async move { session.cancel_holds(&handles).await }.boxed())
                .await?;
            format!("Cancelled {} holds", count)
        }
        Command::PlaceHold {
            patron,
            bib_number,
            item,
            pickup,
        } => {
            let session = open_session(&config, &patron).await?;
            let placement = session
                .scoped(|session| {
                    async move {
                        session
                            .place_hold(&bib_number, item.as_deref(), pickup.as_deref())
                            .await
                    }
                    .boxed()
                })
                .await?;
            output.format_hold_placement(&placement)?
        }
        Command::Fines { patron, pay } => {
            let details = match &pay {
                Some(path) => Some(read_payment_details(path).await?),
                None => None,
            };
            let session = open_session(&config, &patron).await?;
            match details {
                Some(details) => {
                    let result = session
                        .scoped(|session| async move { session.pay_fines(&details).await }.boxed())
                        .await?;
                    output.format_payment(&result)?
                }
                None => {
                    let listing = session
                        .scoped(|session| async move { session.fetch_fines().await }.boxed())
                        .await?;
                    output.format_fines(&listing)?
                }
            }
        }
    };

    println!("{}", rendered.trim_end());
    Ok(())
}

async fn open_session(config: &Config, patron: &PatronArgs) -> anyhow::Result<Session> {
    let lookup = StaticPatronLookup::from_json_file(&patron.patron_file)
        .await
        .with_context(|| format!("failed to read {}", patron.patron_file.display()))?;
    if lookup.is_empty() {
        bail!("no patron records in {}", patron.patron_file.display());
    }

    let mut session = Session::new(config, &patron.card)?.with_pin(patron.pin.as_deref());
    session.load_patron(&lookup).await?;
    Ok(session)
}

async fn read_payment_details(path: &Path) -> anyhow::Result<PaymentDetails> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid payment details in {}", path.display()))
}
