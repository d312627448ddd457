//! Phone classifier: raw user input → canonical number, region and number type.
//!
//! Pure and table driven. Calling codes are matched against the ITU set in
//! [`tables`], `+1` is split between Canada and the United States by area
//! code, and a small per-code numbering plan supplies length checks and the
//! mobile/fixed hint.

mod tables;

use serde::{Deserialize, Serialize};

use crate::{errors::Error, Result};

pub const UNKNOWN_COUNTRY_CODE: &str = "unknown";
pub const UNKNOWN_COUNTRY_NAME: &str = "Unknown";

const MIN_NSN_LEN: usize = 4;
const MAX_NSN_LEN: usize = 14;
const MAX_E164_LEN: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberType {
    FixedLine,
    Mobile,
    FixedLineOrMobile,
    TollFree,
    Unknown,
}

impl NumberType {
    pub fn is_mobile(self) -> bool {
        matches!(self, NumberType::Mobile | NumberType::FixedLineOrMobile)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub ok: bool,
    /// `+<code><nsn>` on success; the cleaned input otherwise.
    pub canonical_number: String,
    /// Calling code digits without `+`; empty on failure.
    pub calling_code: String,
    pub national_number: String,
    pub country_code: String,
    pub country_name: String,
    pub is_mobile: bool,
    pub number_type: NumberType,
    pub error_kind: Option<ErrorKind>,
    pub detail: Option<String>,
}

impl Classification {
    fn invalid(cleaned: String, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            canonical_number: cleaned,
            calling_code: String::new(),
            national_number: String::new(),
            country_code: UNKNOWN_COUNTRY_CODE.to_string(),
            country_name: UNKNOWN_COUNTRY_NAME.to_string(),
            is_mobile: false,
            number_type: NumberType::Unknown,
            error_kind: Some(ErrorKind::InvalidFormat),
            detail: Some(detail.into()),
        }
    }

    /// International display form, `+98 9123456789`.
    pub fn formatted(&self) -> String {
        if !self.ok {
            return self.canonical_number.clone();
        }
        format!("+{} {}", self.calling_code, self.national_number)
    }

    pub fn flag(&self) -> String {
        flag_emoji(&self.country_code)
    }

    pub fn into_result(self) -> Result<Self> {
        if self.ok {
            return Ok(self);
        }
        let detail = self
            .detail
            .clone()
            .unwrap_or_else(|| "invalid phone number".to_string());
        Err(Error::InvalidFormat(detail))
    }
}

/// Strip visual separators and make sure the result starts with `+`.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();
    if cleaned.starts_with('+') {
        cleaned
    } else {
        format!("+{cleaned}")
    }
}

pub fn classify(raw: &str) -> Classification {
    let cleaned = normalize(raw);
    let digits = &cleaned[1..];

    if digits.is_empty() {
        return Classification::invalid(cleaned, "empty phone number");
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Classification::invalid(cleaned, "phone number must contain only digits");
    }

    let Some(code_len) = (1..=3)
        .filter(|n| *n <= digits.len())
        .find(|n| tables::is_recognized(&digits[..*n]))
    else {
        return Classification::invalid(cleaned, "unrecognized country calling code");
    };

    let (code, nsn) = digits.split_at(code_len);

    if nsn.len() < MIN_NSN_LEN || nsn.len() > MAX_NSN_LEN || digits.len() > MAX_E164_LEN {
        return Classification::invalid(cleaned, "phone number has an invalid length");
    }

    let resolved = if code == "1" {
        classify_nanp(nsn)
    } else {
        classify_international(code, nsn)
    };

    let Some((country_code, country_name, number_type)) = resolved else {
        let detail = format!("not a valid number for calling code +{code}");
        return Classification::invalid(cleaned, detail);
    };

    Classification {
        ok: true,
        canonical_number: format!("+{code}{nsn}"),
        calling_code: code.to_string(),
        national_number: nsn.to_string(),
        country_code,
        country_name,
        is_mobile: number_type.is_mobile(),
        number_type,
        error_kind: None,
        detail: None,
    }
}

pub fn is_valid_phone(raw: &str) -> bool {
    classify(raw).ok
}

fn classify_nanp(nsn: &str) -> Option<(String, String, NumberType)> {
    let first = nsn.as_bytes().first()?;
    if nsn.len() != 10 || !(b'2'..=b'9').contains(first) {
        return None;
    }

    let area = &nsn[..3];
    let number_type = if tables::NANP_TOLL_FREE.contains(&area) {
        NumberType::TollFree
    } else {
        NumberType::FixedLineOrMobile
    };

    let (iso, name) = if tables::CANADIAN_AREA_CODES.contains(&area) {
        ("CA", "Canada")
    } else {
        ("US", "United States")
    };
    Some((iso.to_string(), name.to_string(), number_type))
}

fn classify_international(code: &str, nsn: &str) -> Option<(String, String, NumberType)> {
    let number_type = match tables::plan_for(code) {
        Some(plan) => {
            if !plan.lengths.contains(&nsn.len()) {
                return None;
            }
            if plan.fixed_or_mobile {
                NumberType::FixedLineOrMobile
            } else if plan.mobile_prefixes.iter().any(|p| nsn.starts_with(p)) {
                NumberType::Mobile
            } else {
                NumberType::FixedLine
            }
        }
        None => NumberType::Unknown,
    };

    let (iso, name) = match tables::lookup_country(code) {
        Some((iso, name)) => (iso.to_string(), name.to_string()),
        None => (
            UNKNOWN_COUNTRY_CODE.to_string(),
            format!("{UNKNOWN_COUNTRY_NAME} (+{code})"),
        ),
    };
    Some((iso, name, number_type))
}

/// Regional-indicator flag for an ISO alpha-2 code, 🌍 otherwise.
pub fn flag_emoji(country_code: &str) -> String {
    let upper = country_code.to_ascii_uppercase();
    if upper.len() != 2 || !upper.bytes().all(|b| b.is_ascii_uppercase()) {
        return "🌍".to_string();
    }
    upper
        .bytes()
        .filter_map(|b| char::from_u32(0x1F1E6 + u32::from(b - b'A')))
        .collect()
}

/// Display name for a stored country code.
pub fn country_name_for(country_code: &str) -> String {
    tables::name_for_iso(country_code)
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_COUNTRY_NAME.to_string())
}
