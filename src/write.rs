use crate::{
    compute::{Summary, SummaryTable},
    data::GroupKey,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// Output row. The average is computed here, just before serialization, from the
/// exact total and count kept in `Summary`.
#[derive(Serialize)]
struct SummaryRow<'a> {
    key: &'a GroupKey,
    total_spent: Decimal,
    average_transaction: Decimal,
    transaction_count: u64,
}

impl<'a> From<(&'a GroupKey, &'a Summary)> for SummaryRow<'a> {
    fn from((key, summary): (&'a GroupKey, &'a Summary)) -> Self {
        Self {
            key,
            total_spent: summary.total_spent,
            average_transaction: summary.average_transaction(),
            transaction_count: summary.transaction_count,
        }
    }
}

/// CSV exporter for a `SummaryTable`. The header is written by hand since the key
/// column is named after the grouping column; rows follow in ascending key order.
pub(crate) fn write_summary<W: std::io::Write>(
    writer: W,
    table: &SummaryTable,
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record([
        table.group_by.column(),
        "total_spent",
        "average_transaction",
        "transaction_count",
    ])?;
    for row in &table.rows {
        wtr.serialize(SummaryRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}
