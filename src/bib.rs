//! XRECORD export parsing and MARC field mapping.
//!
//! The export is deserialized as is, flattened into [`MarcFields`] and then
//! read through a fixed field table into a [`BibRecord`].

use crate::config::{CatalogConfig, SuppressionMode};
use crate::markup::parse_mdy_windowed;
use crate::records::BibRecord;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static UNICODE_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{u([0-9a-fA-F]{4})\}").ok());
static BRACED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\{.*?\}").ok());

const UPC_PLACEHOLDER: &str = "000000000000";
const SERIES_TAGS: [&str; 8] = ["490", "440", "400", "410", "730", "800", "810", "830"];
const ADDITIONAL_TITLE_TAGS: [&str; 4] = ["730", "740", "246", "240"];
const NOTE_TAGS: [&str; 5] = ["500", "505", "511", "520", "538"];
const SUBJECT_TAGS: [&str; 21] = [
    "600", "610", "611", "630", "650", "651", "653", "654", "655", "656", "657", "658", "690",
    "691", "692", "693", "694", "696", "697", "698", "699",
];
const SUBJECT_SUBFIELDS: [&str; 9] = ["a", "b", "c", "d", "e", "v", "x", "y", "z"];

/// Root of an `xrecord=b<bnum>` export
#[derive(Debug, Default, Deserialize)]
pub struct XRecord {
    #[serde(rename = "NULLRECORD")]
    pub null_record: Option<NullRecord>,
    #[serde(rename = "RECORDINFO", default)]
    pub record_info: RecordInfo,
    #[serde(rename = "TYPEINFO", default)]
    pub type_info: TypeInfo,
    #[serde(rename = "VARFLD", default)]
    pub var_fields: Vec<VarField>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NullRecord {
    #[serde(rename = "MESSAGE", default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordInfo {
    #[serde(rename = "CREATEDATE", default)]
    pub created: String,
    #[serde(rename = "LASTUPDATEDATE", default)]
    pub last_updated: String,
    #[serde(rename = "PREVUPDATEDATE", default)]
    pub previous_updated: String,
    #[serde(rename = "REVISIONS", default)]
    pub revisions: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TypeInfo {
    #[serde(rename = "BIBLIOGRAPHIC", default)]
    pub bibliographic: Bibliographic,
}

#[derive(Debug, Default, Deserialize)]
pub struct Bibliographic {
    #[serde(rename = "FIXFLD", default)]
    pub fixed_fields: Vec<FixedField>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FixedField {
    #[serde(rename = "FIXLABEL", default)]
    pub label: String,
    #[serde(rename = "FIXVALUE", default)]
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VarField {
    #[serde(rename = "MARCINFO")]
    pub marc_info: Option<MarcInfo>,
    #[serde(rename = "MARCSUBFLD", default)]
    pub subfields: Vec<MarcSubfield>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarcInfo {
    #[serde(rename = "MARCTAG", default)]
    pub tag: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarcSubfield {
    #[serde(rename = "SUBFIELDINDICATOR", default)]
    pub indicator: String,
    #[serde(rename = "SUBFIELDDATA", default)]
    pub data: String,
}

/// Parse an export. Malformed XML is logged and treated as no record.
pub fn parse_xrecord(xml: &str) -> Option<XRecord> {
    match quick_xml::de::from_str::<XRecord>(xml) {
        Ok(record) => Some(record),
        Err(error) => {
            warn!(error = %error, "unparseable record export");
            None
        }
    }
}

impl XRecord {
    /// Whether the export describes a live MARC record
    pub fn has_marc(&self) -> bool {
        self.null_record.is_none()
            && self
                .var_fields
                .first()
                .is_some_and(|field| field.marc_info.is_some())
    }

    pub fn fixed_value(&self, label: &str) -> Option<&str> {
        self.type_info
            .bibliographic
            .fixed_fields
            .iter()
            .find(|field| field.label.trim() == label)
            .map(|field| field.value.trim())
    }
}

type SubfieldEntries = BTreeMap<usize, Vec<String>>;

/// Tag -> subfield -> entry index -> values.
///
/// The entry index is the position of the variable field in the export, so
/// values of one occurrence of a repeated tag stay together.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarcFields {
    tags: BTreeMap<String, BTreeMap<String, SubfieldEntries>>,
}

impl MarcFields {
    pub fn from_var_fields(fields: &[VarField]) -> Self {
        let mut marc = Self::default();
        for (entry, field) in fields.iter().enumerate() {
            let Some(info) = &field.marc_info else {
                continue;
            };
            for subfield in &field.subfields {
                marc.insert(&info.tag, &subfield.indicator, entry, &subfield.data);
            }
        }
        marc
    }

    pub fn insert(&mut self, tag: &str, subfield: &str, entry: usize, value: &str) {
        self.tags
            .entry(tag.trim().to_string())
            .or_default()
            .entry(subfield.trim().to_string())
            .or_default()
            .entry(entry)
            .or_default()
            .push(value.trim().to_string());
    }

    pub fn subfield(&self, tag: &str, subfield: &str) -> Option<&SubfieldEntries> {
        self.tags.get(tag)?.get(subfield)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }
}

/// Reads assembled values out of [`MarcFields`]
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    fields: &'a MarcFields,
    decode_unicode: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a MarcFields, decode_unicode: bool) -> Self {
        Self {
            fields,
            decode_unicode,
        }
    }

    fn normalize(&self, raw: &str) -> String {
        let mut value = raw.trim().to_string();
        if self.decode_unicode {
            value = decode_unicode_escapes(&value);
        }
        if let Some(braced) = BRACED.as_ref() {
            value = braced.replace_all(&value, "").into_owned();
        }
        value
            .replace("\\\"", "\"")
            .replace("&quot;", "\"")
            .trim()
            .to_string()
    }

    /// One string per occurrence of `tag`, joining the requested subfields.
    ///
    /// Values come in subfield request order within an occurrence; blank
    /// values are skipped and occurrences with nothing left are dropped.
    pub fn prepare_values(&self, tag: &str, subfields: &[&str], delimiter: &str) -> Vec<String> {
        let mut occurrences: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for subfield in subfields {
            let Some(entries) = self.fields.subfield(tag, subfield) else {
                continue;
            };
            for (entry, values) in entries {
                let parts = occurrences.entry(*entry).or_default();
                parts.extend(
                    values
                        .iter()
                        .map(|value| self.normalize(value))
                        .filter(|value| !value.is_empty()),
                );
            }
        }

        occurrences
            .into_values()
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join(delimiter))
            .collect()
    }

    /// First occurrence of [`prepare_values`](Self::prepare_values), or empty
    pub fn first(&self, tag: &str, subfields: &[&str], delimiter: &str) -> String {
        self.prepare_values(tag, subfields, delimiter)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// Alternate-script `$a` of every 880 whose `$6` links to `reference`.
    pub fn prepare_880(&self, reference: &str) -> Vec<String> {
        let Some(links) = self.fields.subfield("880", "6") else {
            return Vec::new();
        };
        links
            .iter()
            .filter(|(_, values)| values.first().is_some_and(|link| link.contains(reference)))
            .filter_map(|(entry, _)| {
                self.fields
                    .subfield("880", "a")?
                    .get(entry)?
                    .first()
                    .map(|value| trim_linkage(&self.normalize(value)))
            })
            .filter(|value| !value.is_empty())
            .collect()
    }
}

fn decode_unicode_escapes(value: &str) -> String {
    match UNICODE_ESCAPE.as_ref() {
        Some(escape) => escape
            .replace_all(value, |caps: &Captures<'_>| {
                u32::from_str_radix(&caps[1], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_default()
            })
            .into_owned(),
        None => value.to_string(),
    }
}

fn trim_linkage(value: &str) -> String {
    value
        .trim_matches(|c| matches!(c, ' ' | '=' | ','))
        .to_string()
}

fn trim_trailing_slash(value: &str) -> String {
    let value = value.trim();
    value.strip_suffix('/').unwrap_or(value).trim().to_string()
}

/// Cut a series statement at its first `;`, `:` or `.` past the leading character.
fn truncate_series(value: &str) -> String {
    match value
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, ';' | ':' | '.'))
    {
        Some((position, _)) => value[..position].trim().to_string(),
        None => value.to_string(),
    }
}

/// Text between the first `[` and the following `]`
fn bracketed(value: &str) -> Option<String> {
    let start = value.find('[')? + 1;
    let end = start + value[start..].find(']')?;
    let inner = value[start..end].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Last four digits of the final comma-separated segment, e.g. `c1998, p2001.` -> `2001`
fn publication_year(imprint_date: &str) -> String {
    let segment = imprint_date.rsplit(',').next().unwrap_or_default();
    let digits: String = segment.chars().filter(|c| c.is_ascii_digit()).collect();
    digits[digits.len().saturating_sub(4)..].to_string()
}

/// First word of the uniform title with punctuation blanked out
fn shelving_token(uniform_title: &str) -> String {
    uniform_title
        .split(' ')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_string()
}

fn title_medium(reader: &FieldReader<'_>) -> String {
    let volume = trim_trailing_slash(&reader.first("245", &["n"], " "));
    let part = trim_trailing_slash(&reader.first("245", &["p"], " "));
    let medium = [volume, part]
        .into_iter()
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !medium.is_empty() {
        return medium;
    }
    bracketed(&reader.first("245", &["h"], " ")).unwrap_or_default()
}

fn call_number(reader: &FieldReader<'_>, material_code: &str, catalog: &CatalogConfig) -> String {
    let mut call_number = reader.prepare_values("099", &["a"], " ").join(" ");
    if catalog
        .shelving_material_codes
        .iter()
        .any(|code| code == material_code)
    {
        let token = shelving_token(&reader.first("130", &["a"], " "));
        if !token.is_empty() {
            if !call_number.is_empty() {
                call_number.push(' ');
            }
            call_number.push_str(&token);
        }
    }
    call_number.trim().to_string()
}

/// Build a bib record from an export.
///
/// `None` means "not found": a null record, an export without MARC fields, or
/// a suppressed record while suppression hides records. The cover image is
/// left empty for the caller to fill.
pub fn build_bib_record(xml: &str, bib_number: &str, catalog: &CatalogConfig) -> Option<BibRecord> {
    let record = parse_xrecord(xml)?;
    if !record.has_marc() {
        debug!(bib_number, "no MARC record in export");
        return None;
    }

    let bcode3 = match record.fixed_value("BCODE3") {
        Some(code) if !code.is_empty() => code,
        _ => "-",
    };
    let suppressed = catalog.suppress_codes.iter().any(|code| code == bcode3);
    if suppressed && catalog.suppression_mode == SuppressionMode::Hide {
        debug!(bib_number, bcode3, "record suppressed");
        return None;
    }

    let marc = MarcFields::from_var_fields(&record.var_fields);
    let reader = FieldReader::new(&marc, catalog.release.decodes_unicode_escapes());
    let material_code = record.fixed_value("MAT TYPE").unwrap_or_default().to_string();

    let mut author = reader.first("100", &["a", "b", "c", "d"], " ");
    if author.is_empty() {
        author = reader.first("110", &["a"], " ");
    }

    let mut additional_authors = reader.prepare_values("700", &["a", "b", "c", "d"], " ");
    additional_authors.extend(reader.prepare_values("710", &["a"], " "));
    additional_authors.extend(reader.prepare_880("700"));

    let mut non_romanized_title = reader.prepare_880("245");
    if non_romanized_title.is_empty() {
        non_romanized_title = reader.prepare_880("246");
    }

    let series = SERIES_TAGS
        .iter()
        .map(|tag| reader.prepare_values(tag, &["a", "v"], " "))
        .find(|values| !values.is_empty())
        .unwrap_or_default()
        .iter()
        .map(|value| truncate_series(value))
        .collect();

    let standard_number = reader.first("020", &["a"], " ");
    let upc = Some(reader.first("024", &["a"], " "))
        .filter(|upc| !upc.is_empty())
        .unwrap_or_else(|| UPC_PLACEHOLDER.to_string());

    let info = &record.record_info;
    Some(BibRecord {
        bib_number: bib_number.trim().to_string(),
        created: parse_mdy_windowed(&info.created),
        last_updated: parse_mdy_windowed(&info.last_updated),
        previous_updated: parse_mdy_windowed(&info.previous_updated),
        revisions: info.revisions.trim().parse().unwrap_or(0),
        language: record.fixed_value("LANG").unwrap_or_default().to_string(),
        location_code: record.fixed_value("LOCATION").unwrap_or_default().to_string(),
        call_number: call_number(&reader, &material_code, catalog),
        material_code,
        suppressed,
        author,
        non_romanized_author: reader.prepare_880("100").into_iter().next().unwrap_or_default(),
        additional_authors,
        title: trim_trailing_slash(&reader.first("245", &["a", "b"], " : ")),
        title_medium: title_medium(&reader),
        additional_titles: ADDITIONAL_TITLE_TAGS
            .iter()
            .flat_map(|tag| reader.prepare_values(tag, &["a", "t", "p"], " "))
            .collect(),
        non_romanized_title: non_romanized_title.into_iter().next().unwrap_or_default(),
        edition: reader.first("250", &["a"], " "),
        series,
        publisher_info: reader.first("260", &["a", "b", "c"], " "),
        publication_year: publication_year(&reader.first("260", &["c"], " ")),
        standard_number,
        upc,
        lccn: reader.first("010", &["a"], " "),
        description: reader.first("300", &["a", "b", "c"], " "),
        notes: NOTE_TAGS
            .iter()
            .flat_map(|tag| reader.prepare_values(tag, &["a", "t"], " -- "))
            .collect(),
        subjects: SUBJECT_TAGS
            .iter()
            .flat_map(|tag| reader.prepare_values(tag, &SUBJECT_SUBFIELDS, " -- "))
            .collect(),
        cover_image: String::new(),
    })
}
