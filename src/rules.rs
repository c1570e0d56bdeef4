//! Per-release markup patterns and URL paths.
//!
//! The catalog pages change between vendor releases. Everything that depends
//! on the release lives here, so the extractors and workflows stay the same.

use crate::config::PaymentProtocol;
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Catalog software release
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
pub enum Release {
    #[serde(rename = "2006")]
    #[value(name = "2006")]
    Millennium2006,
    #[default]
    #[serde(rename = "2007")]
    #[value(name = "2007")]
    Millennium2007,
    #[serde(rename = "2009")]
    #[value(name = "2009")]
    Millennium2009,
}

impl Release {
    /// Payment protocol the release ships with
    pub fn payment_protocol(self) -> PaymentProtocol {
        match self {
            Release::Millennium2006 => PaymentProtocol::Checksum,
            Release::Millennium2007 | Release::Millennium2009 => PaymentProtocol::SessionKey,
        }
    }

    /// Whether record exports carry `{uXXXX}` escapes for non-ASCII text
    pub fn decodes_unicode_escapes(self) -> bool {
        matches!(self, Release::Millennium2009)
    }

    pub fn supports_hold_freeze(self) -> bool {
        matches!(self, Release::Millennium2009)
    }

    /// Whether the patron pages live under the `~S3` scope
    fn scoped_patron_pages(self) -> bool {
        !matches!(self, Release::Millennium2006)
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self {
            Release::Millennium2006 => "2006",
            Release::Millennium2007 => "2007",
            Release::Millennium2009 => "2009",
        };
        write!(f, "Millennium {}", year)
    }
}

impl FromStr for Release {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().trim_start_matches("millennium") {
            "2006" => Ok(Release::Millennium2006),
            "2007" => Ok(Release::Millennium2007),
            "2009" => Ok(Release::Millennium2009),
            other => Err(format!("unknown release: {}", other)),
        }
    }
}

/// URL path suffixes, relative to the configured base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    release: Release,
    search_scope: Option<u32>,
}

impl Paths {
    pub fn new(release: Release, search_scope: Option<u32>) -> Self {
        Self {
            release,
            search_scope,
        }
    }

    pub fn login(&self) -> &'static str {
        "patroninfo/"
    }

    pub fn logout(&self) -> &'static str {
        "logout"
    }

    fn patron(&self, pnum: &str) -> String {
        if self.release.scoped_patron_pages() {
            format!("patroninfo~S3/{}", pnum)
        } else {
            format!("patroninfo/{}", pnum)
        }
    }

    pub fn loans(&self, pnum: &str, sorted: bool) -> String {
        let listing = if sorted { "sorteditems" } else { "items" };
        format!("{}/{}", self.patron(pnum), listing)
    }

    pub fn holds(&self, pnum: &str) -> String {
        format!("patroninfo/{}/holds", pnum)
    }

    pub fn renew_all(&self, pnum: &str) -> String {
        format!("patroninfo/{}/sorteditems?renewall", pnum)
    }

    /// Renewal of selected loans, one `<handle>=i<item>` pair per loan
    pub fn renew_some(&self, pnum: &str, pairs: &[(String, String)]) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("renewsome", "TRUE");
        for (handle, item) in pairs {
            query.append_pair(handle, item);
        }
        format!("patroninfo/{}/sorteditems?{}", pnum, query.finish())
    }

    pub fn place_hold(&self, bnum: &str) -> String {
        format!("search~S3/.b{0}/.b{0}/1,1,1,B/request~b{0}", bnum)
    }

    pub fn item_record(&self, inum: &str) -> String {
        format!("record=i{}", inum)
    }

    pub fn xrecord(&self, bnum: &str) -> String {
        format!("xrecord=b{}", bnum)
    }

    fn scope(&self) -> String {
        self.search_scope
            .map(|scope| format!("~S{}", scope))
            .unwrap_or_default()
    }

    /// Copy-level holdings table
    pub fn holdings(&self, bnum: &str) -> String {
        format!(
            "search{1}/.b{0}/.b{0}/1,1,1,B/holdings~{0}&FF=&1,0,",
            bnum,
            self.scope()
        )
    }

    /// Record summary carrying hold and order counts
    pub fn summary(&self, bnum: &str) -> String {
        format!(
            "search{1}/.b{0}/.b{0}/1,1,1,B/marc~{0}&FF=&1,0,",
            bnum,
            self.scope()
        )
    }

    pub fn fines(&self, protocol: PaymentProtocol, pnum: &str, patron_type: &str) -> String {
        match protocol {
            PaymentProtocol::SessionKey => format!(
                "webapp/iii/ecom/pay.do?scope=3&ptype={}&tty=300",
                patron_type
            ),
            PaymentProtocol::Checksum => format!("patroninfo/{}/overdues?pay=1", pnum),
        }
    }

    /// Phase one of a payment
    pub fn payment_confirm(&self, protocol: PaymentProtocol, pnum: &str) -> String {
        match protocol {
            PaymentProtocol::SessionKey => "webapp/iii/ecom/validatePay.do".to_string(),
            PaymentProtocol::Checksum => format!(
                "payconfirm/{0}/%2Fpatroninfo%2F{0}%2Foverdues%3Fpay%3D1/%2Fpatroninfo%2F{0}%2Foverdues",
                pnum
            ),
        }
    }

    /// Phase two of a payment
    pub fn payment_submit(&self, protocol: PaymentProtocol, pnum: &str) -> String {
        match protocol {
            PaymentProtocol::SessionKey => "webapp/iii/ecom/submitPay.do".to_string(),
            PaymentProtocol::Checksum => format!("patroninfo/{}/overdues?pay=1", pnum),
        }
    }
}

/// Compiled extraction patterns for one release.
///
/// Block patterns use named groups; the extractors read groups by name so a
/// release may reorder or add columns without touching them.
#[derive(Debug, Clone)]
pub struct MarkupRules {
    pub release: Release,

    pub loan_block: Regex,
    pub title_link: Regex,
    pub renew_count: Regex,

    pub hold_block: Regex,
    pub hold_bib_link: Regex,
    pub hold_status_kept: Regex,
    /// Present for releases that show a freeze checkbox per hold
    pub hold_frozen: Option<Regex>,

    pub hold_success: Regex,
    pub hold_error: Regex,
    pub hold_choose_item: Regex,
    pub hold_candidate: Regex,
    pub hold_candidate_handle: Regex,
    pub pickup_form: Regex,
    pub pickup_option: Regex,
    pub pickup_value: Regex,
    pub pickup_name: Regex,

    pub renew_block: Regex,
    pub renew_error: Regex,

    pub fine_selected_fee: Regex,
    pub fine_session_key: Regex,
    pub fine_charge: Regex,

    pub payment_approved: Regex,
    pub payment_checksum: Regex,
    pub payment_error_checksum: Regex,
    pub payment_error_session_key: Regex,

    pub item_bib_number: Regex,

    pub holdings_row: Regex,
    pub holdings_cell: Regex,
    pub summary_holds: Regex,
    pub summary_order: Regex,
}

impl MarkupRules {
    pub fn for_release(release: Release) -> Result<Self, regex::Error> {
        let hold_frozen = if release.supports_hold_freeze() {
            Some(Regex::new(r#"(?is)patFuncFreeze">(?P<freeze>.*?)</td>"#)?)
        } else {
            None
        };

        Ok(Self {
            release,

            loan_block: Regex::new(concat!(
                r#"(?s)<input type="checkbox" name="(?P<handle>.+?)" value="(?P<item>.+?)" />"#,
                r#".+?patFuncTitle">(?P<title>.+?)</td>"#,
                r#".+?patFuncBarcode">(?P<barcode>.*?)</td>"#,
                r#".+?patFuncStatus">\s*DUE\s+(?P<due>[0-9-]+)(?P<extra>.*?)</td>"#,
                r#".+?patFuncCallNo">(?P<callnum>.*?)</td>"#,
            ))?,
            title_link: Regex::new(r#"(?s)<a\s[^>]*href[^>]*>(?P<title>.+?)</a>"#)?,
            renew_count: Regex::new(r"(?i)Renewed\s*(?P<count>\d+)\s*time")?,

            hold_block: Regex::new(concat!(
                r#"(?s)<input type="checkbox" name="(?P<handle>.+?)" /></td>"#,
                r#".+?patFuncTitle">(?P<title>.+?)</td>"#,
                r#".+?patFuncStatus">(?P<status>.*?)</td>"#,
                r#".+?patFuncPickup">(?P<pickup>.*?)</td>"#,
                r#".+?patFuncCancel">(?P<cancel>.*?)</td>"#,
                r#"(?P<rest>.*?)</tr>"#,
            ))?,
            hold_bib_link: Regex::new(
                r#"(?s)href="[^"]*?(?:record=b|item&)(?P<bnum>[0-9a-z]+)[^"]*"[^>]*>(?P<title>.+?)</a>"#,
            )?,
            hold_status_kept: Regex::new(r"(?i)of|ready|received")?,
            hold_frozen,

            hold_success: Regex::new(r"(?is)Your request for(?P<title>.*?)was successful")?,
            hold_error: Regex::new(r#"(?is)<font color="red" size="(?:.+?)">(?P<error>.+?)</font>"#)?,
            hold_choose_item: Regex::new(r"(?is)Choose one item from the list below")?,
            hold_candidate: Regex::new(concat!(
                r#"(?is)<tr\s+class="bibItemsEntry">(?P<radio>.+?)</td>"#,
                r#".+?<!-- field 1 -->&nbsp;(?P<location>.+?)</td>"#,
                r#".+?<!-- field C -->&nbsp;(?P<callnum>.+?)&nbsp;\s*<!-- field v -->(?P<volume>.*?)&nbsp;"#,
                r#".+?field % -->&nbsp;(?P<status>.+?)<"#,
            ))?,
            hold_candidate_handle: Regex::new(r#"(?is)value="(?P<handle>.+?)""#)?,
            pickup_form: Regex::new(r"(?is)select name=loc(?P<form>.*?)</form>")?,
            pickup_option: Regex::new(r"(?is)<option (?P<option>.*?)</option")?,
            pickup_value: Regex::new(r#"(?is)value="(?P<code>.*?)""#)?,
            pickup_name: Regex::new(r"(?is)>(?P<name>.*)$")?,

            renew_block: Regex::new(concat!(
                r#"(?s)<input type="checkbox" name="(?P<handle>.*?)" value="i(?P<item>.*?)" />"#,
                r#"(?P<before>.*?)DUE(?P<due>.*?)<(?P<extra>.+?)td"#,
            ))?,
            renew_error: Regex::new(r#"(?i)color="red">(?P<error>.*?)<"#)?,

            fine_selected_fee: Regex::new(
                r#"(?s)type="checkbox" name="selectedFees" value="(?P<handle>.+?)"(?:.+?)>(?P<desc>.+?)\$(?P<amount>.+?)<"#,
            )?,
            fine_session_key: Regex::new(r#"(?s)name="key" value="(?P<key>.+?)""#)?,
            fine_charge: Regex::new(
                r#"(?s)type="checkbox" name="charge(?P<handle>.+?)" checked>(?P<desc>.+?)</td>(?:.+?)right">\$(?P<amount>.+?)<"#,
            )?,

            payment_approved: Regex::new(
                r"Your payment has been approved|Your payment has been accepted",
            )?,
            payment_checksum: Regex::new(r#"name="cksum" value="(?P<cksum>.*?)">"#)?,
            payment_error_checksum: Regex::new(
                r#"(?s)errormessage">(?P<error>.+?)<(?:.+?)class="msg">(?P<reason>.+?)<"#,
            )?,
            payment_error_session_key: Regex::new(
                r#"(?s)key="creditForm.error"/-->(?P<reason>.+?)<(?:.+?)error">(?P<error>.+?)<"#,
            )?,

            item_bib_number: Regex::new(r#"(?s)">B(?P<bnum>.*?)</"#)?,

            holdings_row: Regex::new(r"(?s)<tr.+?bibItemsEntry.+?>(?P<row>.+?)</tr>")?,
            holdings_cell: Regex::new(r"(?s)<td.+?</td>")?,
            summary_holds: Regex::new(r"(?P<holds>\d+) hold")?,
            summary_order: Regex::new(r"(?s)bibOrderEntry(?:.*?)td(?:.*?)>(?P<order>.*?)<")?,
        })
    }
}
