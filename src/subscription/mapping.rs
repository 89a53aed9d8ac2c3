//! The enabled-forms mapping mini-language.
//!
//! Each settings line wires one host form to MailChimp:
//!
//! ```text
//! FORM_ID|EMAIL:email_field|TAG:type:field,TAG:type:field,...
//! ```
//!
//! Sections are separated by `|`, properties by `:`, merge entries by `,`.
//! The `address` type takes a composite source of `part-field` pairs joined
//! by `--`, e.g. `addr1-address_thoroughfare--city-address_locality`.
//!
//! Example:
//!
//! ```text
//! warranty_form|EMAIL:field_email|FNAME:text:field_fname,MMERGE6:birthday:field_birthday
//! ```
//!
//! Lines are parsed at submission time; nothing is cached between requests.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::subscription::normalize::{normalize_date, normalize_zip_code};

/// Errors raised while parsing mapping lines.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Line starts with a section separator or is only separators.
    #[error("Form mapping line has no form id: '{line}'")]
    MissingFormId {
        /// Offending line, verbatim.
        line: String,
    },
    /// Second section must be `EMAIL:<field>`.
    #[error("Form '{form_id}' is missing its EMAIL section")]
    MissingEmailSection {
        /// Form the line belongs to.
        form_id: String,
    },
    /// Merge entry did not have the `TAG:type:field` shape.
    #[error("Form '{form_id}' merge entry '{entry}' is not TAG:type:field")]
    MalformedMergeEntry {
        /// Form the entry belongs to.
        form_id: String,
        /// Offending entry, verbatim.
        entry: String,
    },
    /// Merge entry named an unsupported field type.
    #[error("Form '{form_id}' uses unknown field type '{kind}'")]
    UnknownFieldKind {
        /// Form the entry belongs to.
        form_id: String,
        /// Unrecognized type name.
        kind: String,
    },
    /// Address source entry did not have the `part-field` shape.
    #[error("Form '{form_id}' address entry '{entry}' is not part-field")]
    MalformedAddressPart {
        /// Form the entry belongs to.
        form_id: String,
        /// Offending address entry, verbatim.
        entry: String,
    },
    /// Address source named an unsupported address part.
    #[error("Form '{form_id}' uses unknown address part '{part}'")]
    UnknownAddressPart {
        /// Form the entry belongs to.
        form_id: String,
        /// Unrecognized part name.
        part: String,
    },
}

/// MailChimp merge field types supported by the mapping language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeFieldKind {
    /// Free text, passed through trimmed.
    Text,
    /// Five-digit US zip code.
    ZipCode,
    /// Numeric value.
    Number,
    /// Composite US postal address.
    Address,
    /// Calendar date, normalized to `MM/DD`.
    Date,
    /// Phone number, passed through trimmed.
    Phone,
    /// Birthday, normalized to `MM/DD`.
    Birthday,
    /// Website URL, passed through trimmed.
    Website,
}

impl FromStr for MergeFieldKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "zip_code" => Ok(Self::ZipCode),
            "number" => Ok(Self::Number),
            "address" => Ok(Self::Address),
            "date" => Ok(Self::Date),
            "phone" => Ok(Self::Phone),
            "birthday" => Ok(Self::Birthday),
            "website" => Ok(Self::Website),
            _ => Err(()),
        }
    }
}

/// Parts of MailChimp's composite address merge field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressPart {
    /// Street address line 1.
    Addr1,
    /// Street address line 2.
    Addr2,
    /// City.
    City,
    /// State or administrative area.
    State,
    /// Postal code.
    Zip,
    /// Country.
    Country,
}

impl AddressPart {
    /// Key used in the merge payload object.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Addr1 => "addr1",
            Self::Addr2 => "addr2",
            Self::City => "city",
            Self::State => "state",
            Self::Zip => "zip",
            Self::Country => "country",
        }
    }
}

impl FromStr for AddressPart {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addr1" => Ok(Self::Addr1),
            "addr2" => Ok(Self::Addr2),
            "city" => Ok(Self::City),
            "state" => Ok(Self::State),
            "zip" => Ok(Self::Zip),
            "country" => Ok(Self::Country),
            _ => Err(()),
        }
    }
}

/// Where a merge value is read from in the submitted form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSource {
    /// A single named form field.
    Field(String),
    /// A composite address assembled from several form fields.
    Address(Vec<AddressPartBinding>),
}

/// One `part-field` pair inside an address source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressPartBinding {
    /// Address part the value lands in.
    pub part: AddressPart,
    /// Form field the value is read from.
    pub field: String,
}

/// One `TAG:type:source` merge entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeEntry {
    /// MailChimp merge tag, e.g. `FNAME`.
    pub tag: String,
    /// Declared field type.
    pub kind: MergeFieldKind,
    /// Source the value is read from.
    pub source: FieldSource,
}

/// A fully parsed enabled-form line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormMapping {
    /// Host form identifier.
    pub form_id: String,
    /// Form field carrying the subscriber email.
    pub email_field: String,
    /// Merge entries, in declaration order.
    pub merge_fields: Vec<MergeEntry>,
}

/// Parse every non-blank settings line.
pub fn parse_form_mappings(lines: &[String]) -> Result<Vec<FormMapping>, MappingError> {
    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(parse_form_mapping)
        .collect()
}

/// Parse a single mapping line.
pub fn parse_form_mapping(line: &str) -> Result<FormMapping, MappingError> {
    let mut sections = line.trim().split('|');

    let form_id = sections.next().unwrap_or_default().trim();
    if form_id.is_empty() {
        return Err(MappingError::MissingFormId { line: line.into() });
    }

    let email_field = sections
        .next()
        .and_then(|section| section.trim().strip_prefix("EMAIL:"))
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .ok_or_else(|| MappingError::MissingEmailSection {
            form_id: form_id.into(),
        })?;

    let mut merge_fields = Vec::new();
    for section in sections {
        for entry in section.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            merge_fields.push(parse_merge_entry(form_id, entry)?);
        }
    }

    Ok(FormMapping {
        form_id: form_id.into(),
        email_field: email_field.into(),
        merge_fields,
    })
}

fn parse_merge_entry(form_id: &str, entry: &str) -> Result<MergeEntry, MappingError> {
    let mut properties = entry.splitn(3, ':');
    let (Some(tag), Some(kind), Some(source)) =
        (properties.next(), properties.next(), properties.next())
    else {
        return Err(MappingError::MalformedMergeEntry {
            form_id: form_id.into(),
            entry: entry.into(),
        });
    };

    let kind: MergeFieldKind = kind
        .trim()
        .parse()
        .map_err(|()| MappingError::UnknownFieldKind {
            form_id: form_id.into(),
            kind: kind.trim().into(),
        })?;

    let source = if kind == MergeFieldKind::Address {
        FieldSource::Address(parse_address_source(form_id, source.trim())?)
    } else {
        FieldSource::Field(source.trim().into())
    };

    Ok(MergeEntry {
        tag: tag.trim().into(),
        kind,
        source,
    })
}

fn parse_address_source(
    form_id: &str,
    source: &str,
) -> Result<Vec<AddressPartBinding>, MappingError> {
    let mut bindings = Vec::new();
    for pair in source.split("--") {
        let (part, field) =
            pair.split_once('-')
                .ok_or_else(|| MappingError::MalformedAddressPart {
                    form_id: form_id.into(),
                    entry: pair.into(),
                })?;
        let part: AddressPart =
            part.trim()
                .parse()
                .map_err(|()| MappingError::UnknownAddressPart {
                    form_id: form_id.into(),
                    part: part.trim().into(),
                })?;
        bindings.push(AddressPartBinding {
            part,
            field: field.trim().into(),
        });
    }
    Ok(bindings)
}

/// Look up the mapping for a submitted form id.
pub fn find_mapping<'a>(mappings: &'a [FormMapping], form_id: &str) -> Option<&'a FormMapping> {
    mappings.iter().find(|mapping| mapping.form_id == form_id)
}

/// Resolve every merge entry against the submitted values.
///
/// Missing fields, empty values, and values that fail their type's
/// normalization are dropped rather than sent as empty strings.
pub fn build_merge_fields(
    mapping: &FormMapping,
    values: &HashMap<String, String>,
) -> Map<String, Value> {
    let mut merged = Map::new();
    for entry in &mapping.merge_fields {
        match resolve_source(entry, values) {
            Some(value) => {
                merged.insert(entry.tag.clone(), value);
            }
            None => {
                tracing::debug!(tag = %entry.tag, kind = ?entry.kind, "Merge field skipped");
            }
        }
    }
    merged
}

fn resolve_source(entry: &MergeEntry, values: &HashMap<String, String>) -> Option<Value> {
    match &entry.source {
        FieldSource::Field(name) => {
            let raw = values.get(name)?.trim();
            if raw.is_empty() {
                return None;
            }
            coerce(entry.kind, raw)
        }
        FieldSource::Address(bindings) => {
            let mut address = Map::new();
            for binding in bindings {
                if let Some(raw) = values.get(&binding.field) {
                    let trimmed = raw.trim();
                    if !trimmed.is_empty() {
                        address.insert(binding.part.as_str().into(), Value::String(trimmed.into()));
                    }
                }
            }
            (!address.is_empty()).then(|| Value::Object(address))
        }
    }
}

fn coerce(kind: MergeFieldKind, raw: &str) -> Option<Value> {
    match kind {
        MergeFieldKind::Text
        | MergeFieldKind::Phone
        | MergeFieldKind::Website
        | MergeFieldKind::Address => Some(Value::String(raw.into())),
        MergeFieldKind::ZipCode => normalize_zip_code(raw).map(Value::String),
        MergeFieldKind::Date | MergeFieldKind::Birthday => normalize_date(raw).map(Value::String),
        MergeFieldKind::Number => number_value(raw),
    }
}

fn number_value(raw: &str) -> Option<Value> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::from(int));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}
