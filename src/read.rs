use crate::data::{GroupBy, Transaction};
use thiserror::Error;

const AMOUNT_COLUMN: &str = "amount";

/// Why the ledger could not be turned into a transaction table.
#[derive(Error, Debug)]
pub(crate) enum ReadError {
    #[error("required column `{0}` is missing from the header")]
    MissingColumn(&'static str),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// CSV importer for the ledger. Columns are matched by header name, extra columns
/// are ignored and every field is trimmed. Each `Transaction` remembers the line it
/// was read from.
pub(crate) fn read_transactions<R: std::io::Read>(
    reader: R,
) -> Result<Vec<Transaction>, ReadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    for column in [
        GroupBy::Client.column(),
        GroupBy::Merchant.column(),
        AMOUNT_COLUMN,
    ] {
        if !headers.iter().any(|h| h == column) {
            return Err(ReadError::MissingColumn(column));
        }
    }

    let mut transactions = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let mut tx: Transaction = record.deserialize(Some(&headers))?;
        tx.line = record.position().map_or(0, |p| p.line());
        transactions.push(tx);
    }
    Ok(transactions)
}
