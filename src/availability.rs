//! Copy-level availability from the public holdings and summary pages.

use crate::config::{CatalogConfig, CategoryRule};
use crate::extract::order_copy_count;
use crate::markup::{clean_text, group, parse_mdy_in_century, plain_text, strip_tags};
use crate::records::{Availability, CopyStatus};
use crate::rules::MarkupRules;
use regex::{Regex, RegexBuilder};

/// Matches a location code against one configured category rule.
#[derive(Debug, Clone)]
pub enum CategoryMatcher {
    /// Comma-separated literal codes
    Codes(Vec<String>),
    /// `/pattern/` with optional trailing `i`
    Pattern(Regex),
}

impl CategoryMatcher {
    pub fn compile(rule: &CategoryRule) -> Result<Self, regex::Error> {
        let raw = rule.matcher.trim();
        if let Some(body) = raw.strip_prefix('/')
            && let Some(end) = body.rfind('/')
        {
            let flags = &body[end + 1..];
            let regex = RegexBuilder::new(&body[..end])
                .case_insensitive(flags.contains('i'))
                .build()?;
            return Ok(CategoryMatcher::Pattern(regex));
        }

        Ok(CategoryMatcher::Codes(
            raw.split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
        ))
    }

    pub fn matches(&self, location_code: &str) -> bool {
        match self {
            CategoryMatcher::Codes(codes) => codes.iter().any(|code| code == location_code),
            CategoryMatcher::Pattern(regex) => regex.is_match(location_code),
        }
    }
}

/// Ordered category rules with a fallback. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<(String, CategoryMatcher)>,
    default: String,
}

impl CategoryRules {
    pub fn compile(rules: &[CategoryRule], default: &str) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| Ok((rule.category.clone(), CategoryMatcher::compile(rule)?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            rules,
            default: default.to_string(),
        })
    }

    pub fn categorize(&self, location_code: Option<&str>) -> String {
        location_code
            .and_then(|code| {
                self.rules
                    .iter()
                    .find(|(_, matcher)| matcher.matches(code))
            })
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Everything needed to turn holdings rows into [`CopyStatus`] values.
#[derive(Debug, Clone)]
pub struct AvailabilityRules {
    available_tokens: Vec<String>,
    /// Display name to location code
    location_codes: Vec<(String, String)>,
    ages: CategoryRules,
    branches: CategoryRules,
}

impl AvailabilityRules {
    pub fn from_config(catalog: &CatalogConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            available_tokens: catalog.available_tokens.clone(),
            location_codes: catalog
                .location_names
                .iter()
                .map(|(code, name)| (name.clone(), code.clone()))
                .collect(),
            ages: CategoryRules::compile(&catalog.age_rules, &catalog.default_age)?,
            branches: CategoryRules::compile(&catalog.branch_rules, &catalog.default_branch)?,
        })
    }

    fn location_code(&self, location: &str) -> Option<String> {
        self.location_codes
            .iter()
            .find(|(name, _)| name == location)
            .map(|(_, code)| code.clone())
    }

    fn copy_status(&self, location: String, call_number: String, status: String) -> CopyStatus {
        let available = self.available_tokens.iter().any(|token| *token == status);
        let due = if available {
            None
        } else {
            due_date(&status)
        };
        let location_code = self.location_code(&location);

        CopyStatus {
            age: self.ages.categorize(location_code.as_deref()),
            branch: self.branches.categorize(location_code.as_deref()),
            location,
            location_code,
            call_number,
            status,
            available,
            due,
        }
    }
}

/// `DUE 06-15-09 +1 HOLD` -> 2009-06-15. Every two-digit year is read as 20YY.
fn due_date(status: &str) -> Option<chrono::NaiveDate> {
    if !status.to_uppercase().contains("DUE") {
        return None;
    }
    let date = status.split_whitespace().nth(1)?;
    parse_mdy_in_century(date, 2000)
}

fn cell_text(cell: &str) -> String {
    clean_text(&strip_tags(cell))
}

/// Copies listed on the holdings page, in row order.
pub fn extract_copies(
    rules: &MarkupRules,
    availability: &AvailabilityRules,
    holdings_body: &str,
) -> Vec<CopyStatus> {
    rules
        .holdings_row
        .captures_iter(holdings_body)
        .map(|row| {
            let row = group(&row, "row");
            let mut cells = rules
                .holdings_cell
                .find_iter(&row)
                .map(|cell| cell_text(cell.as_str()));
            let location = cells.next().unwrap_or_default();
            let call_number = cells.next().unwrap_or_default();
            let status = cells.next().unwrap_or_default();
            availability.copy_status(location, call_number, status)
        })
        .collect()
}

/// Combine the holdings page and the record summary page into one snapshot.
pub fn extract_availability(
    rules: &MarkupRules,
    availability: &AvailabilityRules,
    holdings_body: &str,
    summary_body: &str,
) -> Availability {
    let items = extract_copies(rules, availability, holdings_body);

    let holds = rules
        .summary_holds
        .captures(summary_body)
        .and_then(|caps| group(&caps, "holds").parse().ok())
        .unwrap_or(0);

    let orders: Vec<String> = rules
        .summary_order
        .captures_iter(summary_body)
        .map(|caps| plain_text(&group(&caps, "order")))
        .filter(|order| !order.is_empty())
        .collect();
    let on_order = orders.iter().map(|order| order_copy_count(order)).sum();

    Availability {
        total: items.len(),
        available: items.iter().filter(|item| item.available).count(),
        holds,
        on_order,
        orders,
        items,
    }
}
