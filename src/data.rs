use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Line number of a record in the source CSV (the header is line 1).
pub(crate) type Line = u64;

pub(crate) const SIGNIFICANT_DIGITS: u32 = 4;

/// Identifier of a client or a merchant. Ledgers use plain integers most of the
/// time but nothing forbids alphanumeric ids, so we keep both. Only canonical
/// integers (no leading zeros or `+`) become `Numeric`, which means writing a key
/// back always yields the exact text we read. The flip side is that ids spelled
/// differently are never merged: `01` and `1` are two distinct keys and get two rows.
///
/// The derived ordering puts every numeric id before every textual one; numeric ids
/// compare as numbers and textual ids lexically. Summary tables rely on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub(crate) enum GroupKey {
    Numeric(i64),
    Text(String),
}

impl TryFrom<String> for GroupKey {
    type Error = Error;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        if text.trim().is_empty() {
            return Err(Error::BlankIdentifier);
        }
        match text.parse::<i64>() {
            Ok(n) if n.to_string() == text => Ok(GroupKey::Numeric(n)),
            _ => Ok(GroupKey::Text(text)),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Numeric(n) => write!(f, "{n}"),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One ledger row as read from the CSV. The amount is kept as the raw text; turning
/// it into a number is the normalizer's job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Transaction {
    #[serde(skip)]
    pub line: Line,
    pub client_id: GroupKey,
    pub merchant_id: GroupKey,
    pub amount: String,
}

/// A `Transaction` whose amount has been parsed. The original record is kept
/// untouched next to the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NormalizedTransaction {
    pub record: Transaction,
    pub value: Decimal,
}

/// Column a summary table is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum GroupBy {
    Client,
    Merchant,
}

impl GroupBy {
    /// Name of the key column, both in the ledger and in the summary output.
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Client => "client_id",
            GroupBy::Merchant => "merchant_id",
        }
    }

    pub(crate) fn key(self, tx: &Transaction) -> &GroupKey {
        match self {
            GroupBy::Client => &tx.client_id,
            GroupBy::Merchant => &tx.merchant_id,
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupBy::Client => "client",
            GroupBy::Merchant => "merchant",
        })
    }
}

/// Errors on a single ledger field, surfaced through the CSV deserializer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Error {
    #[error("identifier is blank")]
    BlankIdentifier,
}

/// Why a piece of text is not a currency amount.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("no digits before the decimal point")]
    MissingDigits,
    #[error("no digits after the decimal point")]
    MissingFraction,
    #[error("thousands separators must split the integer part in groups of three")]
    Grouping,
    #[error("amount does not fit in a decimal")]
    OutOfRange,
}

/// An amount that could not be normalized, with enough context to find it in the
/// source file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed amount {value:?} on line {line}: {reason}")]
pub(crate) struct MalformedAmount {
    pub line: Line,
    pub value: String,
    #[source]
    pub reason: AmountError,
}

/// Normalization stops the job as soon as the whole table has been scanned; we keep
/// the first offender for the diagnostic and count the others.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{first} ({} malformed amount(s) in total)", .others + 1)]
pub(crate) struct NormalizationFailed {
    #[source]
    pub first: MalformedAmount,
    pub others: usize,
}

/// The running total of one key went past what a `Decimal` can hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("total spent for {group_by} {key} exceeds the decimal range")]
pub(crate) struct AggregationFailed {
    pub group_by: GroupBy,
    pub key: GroupKey,
}
