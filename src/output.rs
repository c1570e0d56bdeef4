//! Human-readable and JSON rendering of scrape results.

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::records::{
    Availability, BibRecord, FineListing, HoldOutcome, HoldPlacement, HoldRecord, LoanRecord,
    PaymentResult, RenewalResult,
};

pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Formatter with colors off, for piping and tests
    pub fn plain(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn render<T: Serialize + ?Sized>(
        &self,
        value: &T,
        human: impl FnOnce() -> String,
    ) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(value),
            OutputFormat::Human => Ok(human()),
        }
    }

    pub fn format_bib(&self, bib_number: &str, bib: Option<&BibRecord>) -> serde_json::Result<String> {
        self.render(&bib, || match bib {
            None => format!("{} b{}", self.colorize("NOT FOUND", "33"), bib_number),
            Some(bib) => self.format_bib_human(bib),
        })
    }

    fn format_bib_human(&self, bib: &BibRecord) -> String {
        let mut output = String::new();
        output.push_str(&format!("b{}  {}\n", bib.bib_number, bib.title));
        if bib.suppressed {
            output.push_str(&format!("  {}\n", self.colorize("SUPPRESSED", "33")));
        }
        let lines = [
            ("Author", bib.author.as_str()),
            ("Medium", bib.title_medium.as_str()),
            ("Edition", bib.edition.as_str()),
            ("Call number", bib.call_number.as_str()),
            ("Published", bib.publisher_info.as_str()),
            ("Year", bib.publication_year.as_str()),
            ("ISBN/ISSN", bib.standard_number.as_str()),
            ("Cover", bib.cover_image.as_str()),
        ];
        for (label, value) in lines.into_iter().filter(|(_, value)| !value.is_empty()) {
            output.push_str(&format!("  {}: {}\n", label, value));
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!(
                "  Material: {}  Location: {}  Language: {}\n",
                bib.material_code, bib.location_code, bib.language
            ));
            for (label, values) in [
                ("Series", &bib.series),
                ("Additional authors", &bib.additional_authors),
                ("Additional titles", &bib.additional_titles),
                ("Subjects", &bib.subjects),
                ("Notes", &bib.notes),
            ] {
                for value in values {
                    output.push_str(&format!("  {}: {}\n", label, value));
                }
            }
        }
        output
    }

    pub fn format_availability(&self, availability: &Availability) -> serde_json::Result<String> {
        self.render(availability, || {
            let mut output = format!(
                "{} of {} copies available, {} holds",
                availability.available, availability.total, availability.holds
            );
            if availability.on_order > 0 {
                output.push_str(&format!(", {} on order", availability.on_order));
            }
            output.push('\n');

            if self.verbosity >= VerbosityLevel::Verbose {
                for copy in &availability.items {
                    let status = if copy.available {
                        self.colorize(&copy.status, "32")
                    } else {
                        copy.status.clone()
                    };
                    output.push_str(&format!(
                        "  {} | {} | {} [{} / {}]\n",
                        copy.location, copy.call_number, status, copy.age, copy.branch
                    ));
                }
                for order in &availability.orders {
                    output.push_str(&format!("  {}\n", order));
                }
            }
            output
        })
    }

    pub fn format_item_bib(&self, item_number: &str, bib_number: Option<&str>) -> serde_json::Result<String> {
        self.render(&bib_number, || match bib_number {
            Some(bib) => format!("i{} -> b{}", item_number, bib),
            None => format!("{} i{}", self.colorize("NOT FOUND", "33"), item_number),
        })
    }

    pub fn format_loans(&self, loans: &[LoanRecord]) -> serde_json::Result<String> {
        self.render(loans, || {
            let mut output = format!("{} loans\n", loans.len());
            for loan in loans {
                let due = loan
                    .due
                    .map(|due| due.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "?".to_string());
                output.push_str(&format!("  [{}] {} (due {})", loan.handle, loan.title, due));
                if loan.renewals > 0 {
                    output.push_str(&format!(", renewed {}x", loan.renewals));
                }
                if loan.is_interlibrary_loan {
                    output.push_str(", ILL");
                }
                output.push('\n');
            }
            output
        })
    }

    pub fn format_holds(&self, holds: &[HoldRecord]) -> serde_json::Result<String> {
        self.render(holds, || {
            let mut output = format!("{} holds\n", holds.len());
            for hold in holds {
                let status = if hold.is_ready() {
                    self.colorize(&hold.status, "32")
                } else {
                    hold.status.clone()
                };
                output.push_str(&format!(
                    "  [{}] {} - {} @ {}",
                    hold.handle, hold.title, status, hold.pickup_location
                ));
                if hold.frozen == Some(true) {
                    output.push_str(" (frozen)");
                }
                output.push('\n');
            }
            output
        })
    }

    pub fn format_renewals(&self, results: &[RenewalResult]) -> serde_json::Result<String> {
        self.render(results, || {
            let mut output = String::new();
            for result in results {
                match &result.error {
                    None => output.push_str(&format!(
                        "{}  [{}] i{} renewed {}x\n",
                        self.colorize("✓", "32"),
                        result.handle,
                        result.item_number,
                        result.renewals
                    )),
                    Some(error) => output.push_str(&format!(
                        "{}  [{}] i{} {}\n",
                        self.colorize("✗", "31"),
                        result.handle,
                        result.item_number,
                        error
                    )),
                }
            }
            output
        })
    }

    pub fn format_hold_placement(&self, placement: &HoldPlacement) -> serde_json::Result<String> {
        self.render(placement, || match placement.outcome() {
            HoldOutcome::Placed => self.colorize("Hold placed", "32"),
            HoldOutcome::Rejected { reason } => format!(
                "{}: {}",
                self.colorize("Hold rejected", "31"),
                reason.unwrap_or("no reason given")
            ),
            HoldOutcome::NeedsSelection {
                candidates,
                pickup_locations,
            } => {
                let mut output = String::from("Choose with --item and/or --pickup:\n");
                for candidate in candidates {
                    output.push_str(&format!(
                        "  item {}  {} | {} | {}\n",
                        candidate.handle, candidate.location, candidate.call_number, candidate.status
                    ));
                }
                for location in pickup_locations {
                    output.push_str(&format!("  pickup {}  {}\n", location.code, location.name));
                }
                output
            }
        })
    }

    pub fn format_fines(&self, listing: &FineListing) -> serde_json::Result<String> {
        self.render(listing, || {
            let mut output = format!("{} fines, ${:.2} total\n", listing.fines.len(), listing.total());
            for fine in &listing.fines {
                output.push_str(&format!(
                    "  [{}] {} ${:.2}\n",
                    fine.handle, fine.description, fine.amount
                ));
            }
            output
        })
    }

    pub fn format_payment(&self, result: &PaymentResult) -> serde_json::Result<String> {
        self.render(result, || {
            if result.approved {
                return self.colorize("Payment approved", "32");
            }
            let mut output = self.colorize("Payment declined", "31");
            for detail in [&result.error, &result.reason].into_iter().flatten() {
                output.push_str(&format!("\n  {}", detail));
            }
            output
        })
    }
}
