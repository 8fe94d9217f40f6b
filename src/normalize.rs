use crate::data::{
    AmountError, MalformedAmount, NormalizationFailed, NormalizedTransaction, Transaction,
    SIGNIFICANT_DIGITS,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const CURRENCY_SYMBOL: char = '$';
const THOUSANDS_SEPARATOR: char = ',';

/// Parse a currency-formatted amount such as `$1,234.56` into a `Decimal`.
///
/// Surrounding whitespace is ignored and the currency symbol is optional. Refunds are
/// written with a leading minus sign in front of the symbol (`-$12.00`); accounting
/// parentheses are not accepted. Thousands separators, when present, must split the
/// integer part in proper groups of three, so `1,23` is an error and not `123`.
pub(crate) fn parse_amount(text: &str) -> Result<Decimal, AmountError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AmountError::Empty);
    }
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let rest = rest.strip_prefix(CURRENCY_SYMBOL).unwrap_or(rest);
    let (integer, fraction) = match rest.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rest, None),
    };

    let mut plain = String::with_capacity(text.len());
    if negative {
        plain.push('-');
    }
    push_integer_digits(integer, &mut plain)?;
    if let Some(fraction) = fraction {
        if fraction.is_empty() {
            return Err(AmountError::MissingFraction);
        }
        check_digits(fraction)?;
        plain.push('.');
        plain.push_str(fraction);
    }
    Decimal::from_str(&plain).map_err(|_| AmountError::OutOfRange)
}

fn check_digits(digits: &str) -> Result<(), AmountError> {
    match digits.chars().find(|c| !c.is_ascii_digit()) {
        Some(c) => Err(AmountError::UnexpectedCharacter(c)),
        None => Ok(()),
    }
}

fn push_integer_digits(integer: &str, out: &mut String) -> Result<(), AmountError> {
    if integer.is_empty() {
        return Err(AmountError::MissingDigits);
    }
    let groups: Vec<&str> = integer.split(THOUSANDS_SEPARATOR).collect();
    for (i, group) in groups.iter().enumerate() {
        check_digits(group)?;
        let valid = match (groups.len(), i) {
            (1, _) => true,
            (_, 0) => (1..=3).contains(&group.len()),
            _ => group.len() == 3,
        };
        if !valid {
            return Err(AmountError::Grouping);
        }
        out.push_str(group);
    }
    Ok(())
}

/// Normalize every amount of the table into a new one. The whole table is scanned so
/// the diagnostic can tell how many rows are affected, but a single bad amount is
/// enough to fail.
pub(crate) fn normalize_transactions(
    transactions: &[Transaction],
) -> Result<Vec<NormalizedTransaction>, NormalizationFailed> {
    let mut normalized = Vec::with_capacity(transactions.len());
    let mut malformed: Vec<MalformedAmount> = Vec::new();
    for tx in transactions {
        match parse_amount(&tx.amount) {
            Ok(mut value) => {
                value.rescale(SIGNIFICANT_DIGITS);
                normalized.push(NormalizedTransaction {
                    record: tx.clone(),
                    value,
                });
            }
            Err(reason) => {
                tracing::debug!(line = tx.line, amount = %tx.amount, "{reason}");
                malformed.push(MalformedAmount {
                    line: tx.line,
                    value: tx.amount.clone(),
                    reason,
                });
            }
        }
    }
    let mut malformed = malformed.into_iter();
    match malformed.next() {
        Some(first) => Err(NormalizationFailed {
            first,
            others: malformed.len(),
        }),
        None => Ok(normalized),
    }
}
