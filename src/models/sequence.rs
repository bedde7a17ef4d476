use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number sequence ("Nummernkreis") types, one document per type under
/// `companies/{cid}/number_sequences/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    Invoice,
    Storno,
    Quote,
    OrderConfirmation,
    Customer,
    Supplier,
}

impl SequenceType {
    pub const ALL: [SequenceType; 6] = [
        SequenceType::Invoice,
        SequenceType::Storno,
        SequenceType::Quote,
        SequenceType::OrderConfirmation,
        SequenceType::Customer,
        SequenceType::Supplier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::Invoice => "invoice",
            SequenceType::Storno => "storno",
            SequenceType::Quote => "quote",
            SequenceType::OrderConfirmation => "order_confirmation",
            SequenceType::Customer => "customer",
            SequenceType::Supplier => "supplier",
        }
    }

    pub fn default_format(&self) -> &'static str {
        match self {
            SequenceType::Invoice => "RE-{number}",
            SequenceType::Storno => "ST-{number}",
            SequenceType::Quote => "AN-{number}",
            SequenceType::OrderConfirmation => "AB-{number}",
            SequenceType::Customer => "KD-%NUMBER",
            SequenceType::Supplier => "LF-%NUMBER",
        }
    }

    pub fn first_number(&self) -> u64 {
        match self {
            SequenceType::Quote | SequenceType::Customer => 1001,
            _ => 1,
        }
    }
}

impl FromStr for SequenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SequenceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || (s == "order-confirmation" && *t == SequenceType::OrderConfirmation))
            .ok_or_else(|| format!("unknown sequence type '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberSequence {
    #[serde(rename = "type")]
    pub kind: SequenceType,
    pub format: String,
    pub next_number: u64,
    #[serde(default)]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NumberSequence {
    pub fn default_for(kind: SequenceType) -> Self {
        let format = kind.default_format().to_string();
        Self {
            kind,
            prefix: prefix_of(&format),
            format,
            next_number: kind.first_number(),
            updated_at: None,
        }
    }

    /// The number the next reservation will hand out, formatted.
    pub fn preview(&self) -> String {
        format_number(&self.format, self.next_number)
    }
}

/// Highest value a sequence hands out.
pub const MAX_SEQUENCE_NUMBER: u64 = 999_999_999_999;

/// Widest `{number:N}` padding; a `u64` has at most 20 digits.
pub const MAX_PAD_WIDTH: usize = 20;

/// Render `number` into `format`.
///
/// `{number}` inserts the plain value, `{number:N}` pads to N digits and
/// `%NUMBER` pads to three digits for customer/supplier formats. A format
/// without any placeholder is used as a prefix.
pub fn format_number(format: &str, number: u64) -> String {
    if let Some(start) = format.find("{number:") {
        let rest = &format[start + "{number:".len()..];
        if let Some(end) = rest.find('}') {
            if let Ok(width) = rest[..end].parse::<usize>() {
                let token = &format[start..start + "{number:".len() + end + 1];
                let width = width.min(MAX_PAD_WIDTH);
                return format.replacen(token, &format!("{:0width$}", number, width = width), 1);
            }
        }
    }
    if format.contains("{number}") {
        return format.replace("{number}", &number.to_string());
    }
    if format.contains("%NUMBER") {
        let padded = if format.starts_with("KD-") || format.starts_with("LF-") {
            format!("{:03}", number)
        } else {
            number.to_string()
        };
        return format.replace("%NUMBER", &padded);
    }
    format!("{}{}", format, number)
}

pub fn has_placeholder(format: &str) -> bool {
    format.contains("{number}") || format.contains("%NUMBER") || parse_padded(format).is_some()
}

fn parse_padded(format: &str) -> Option<usize> {
    let start = format.find("{number:")?;
    let rest = &format[start + "{number:".len()..];
    let end = rest.find('}')?;
    rest[..end].parse().ok().filter(|width| *width <= MAX_PAD_WIDTH)
}

/// A usable format has a placeholder or at least a non-blank prefix. A
/// `{number:` token must carry a width of at most `MAX_PAD_WIDTH`.
pub fn is_valid_format(format: &str) -> bool {
    if format.contains("{number:") && parse_padded(format).is_none() {
        return false;
    }
    has_placeholder(format) || !format.trim().is_empty()
}

/// Literal text in front of the placeholder.
pub fn prefix_of(format: &str) -> String {
    let cut = ["{number", "%NUMBER"]
        .iter()
        .filter_map(|p| format.find(p))
        .min()
        .unwrap_or(format.len());
    format[..cut].to_string()
}
