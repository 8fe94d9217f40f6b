use crate::data::{AggregationFailed, GroupBy, GroupKey, NormalizedTransaction, SIGNIFICANT_DIGITS};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;

/// Running totals for one key. There is no `average` field: it's derived from the
/// exact sum and count when needed, so it can never drift from them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Summary {
    pub total_spent: Decimal,
    pub transaction_count: u64,
}

impl Summary {
    /// Returns `None`, leaving the summary untouched, when the total would overflow.
    fn add(&mut self, value: Decimal) -> Option<()> {
        self.total_spent = self.total_spent.checked_add(value)?;
        self.transaction_count += 1;
        Some(())
    }

    /// Mean transaction value, rounded half away from zero to `SIGNIFICANT_DIGITS`.
    pub fn average_transaction(&self) -> Decimal {
        let mut average = (self.total_spent / Decimal::from(self.transaction_count))
            .round_dp_with_strategy(SIGNIFICANT_DIGITS, RoundingStrategy::MidpointAwayFromZero);
        average.rescale(SIGNIFICANT_DIGITS);
        average
    }
}

/// Per-key statistics for one grouping column. A `BTreeMap` keeps rows in ascending
/// key order, which is the order they are written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SummaryTable {
    pub group_by: GroupBy,
    pub rows: BTreeMap<GroupKey, Summary>,
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Group the normalized transactions by `group_by` and compute sum and count for each
/// key. Keys only exist because some transaction carries them, so no summary is ever
/// empty; an empty table simply gives an empty summary. Amounts are valid one by one
/// but their sum may still not fit in a `Decimal`, which fails the whole table.
pub(crate) fn summarize(
    transactions: &[NormalizedTransaction],
    group_by: GroupBy,
) -> Result<SummaryTable, AggregationFailed> {
    let mut rows: BTreeMap<GroupKey, Summary> = BTreeMap::new();
    for tx in transactions {
        let key = group_by.key(&tx.record);
        let added = match rows.get_mut(key) {
            Some(summary) => summary.add(tx.value),
            None => {
                let mut summary = Summary::default();
                let added = summary.add(tx.value);
                rows.insert(key.clone(), summary);
                added
            }
        };
        if added.is_none() {
            return Err(AggregationFailed {
                group_by,
                key: key.clone(),
            });
        }
    }
    Ok(SummaryTable { group_by, rows })
}

#[cfg(test)]
mod tests {
    use super::{summarize, Summary};
    use crate::data::{AggregationFailed, GroupBy, GroupKey, NormalizedTransaction, Transaction};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ntx(client: i64, merchant: &str, value: Decimal) -> NormalizedTransaction {
        NormalizedTransaction {
            record: Transaction {
                line: 0,
                client_id: GroupKey::Numeric(client),
                merchant_id: GroupKey::Text(merchant.into()),
                amount: value.to_string(),
            },
            value,
        }
    }

    fn scenario() -> Vec<NormalizedTransaction> {
        vec![
            ntx(1, "A", dec!(10.00)),
            ntx(1, "B", dec!(5.50)),
            ntx(2, "A", dec!(20.00)),
        ]
    }

    #[test]
    fn test_by_client() {
        let table = summarize(&scenario(), GroupBy::Client).unwrap();
        assert_eq!(table.len(), 2);
        let one = &table.rows[&GroupKey::Numeric(1)];
        assert_eq!(one.total_spent, dec!(15.50));
        assert_eq!(one.average_transaction(), dec!(7.75));
        assert_eq!(one.transaction_count, 2);
        let two = &table.rows[&GroupKey::Numeric(2)];
        assert_eq!(two.total_spent, dec!(20.00));
        assert_eq!(two.average_transaction(), dec!(20.00));
        assert_eq!(two.transaction_count, 1);
    }

    #[test]
    fn test_by_merchant() {
        let table = summarize(&scenario(), GroupBy::Merchant).unwrap();
        assert_eq!(table.group_by, GroupBy::Merchant);
        let keys: Vec<_> = table.rows.keys().cloned().collect();
        assert_eq!(
            keys,
            [GroupKey::Text("A".into()), GroupKey::Text("B".into())]
        );
        let a = &table.rows[&GroupKey::Text("A".into())];
        assert_eq!(
            (a.total_spent, a.average_transaction(), a.transaction_count),
            (dec!(30.00), dec!(15.00), 2)
        );
        let b = &table.rows[&GroupKey::Text("B".into())];
        assert_eq!(
            (b.total_spent, b.average_transaction(), b.transaction_count),
            (dec!(5.50), dec!(5.50), 1)
        );
    }

    #[test]
    fn test_empty_table() {
        assert!(summarize(&[], GroupBy::Client).unwrap().rows.is_empty());
    }

    #[test]
    fn test_single_record() {
        let table = summarize(&[ntx(9, "Z", dec!(3.21))], GroupBy::Client).unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows[&GroupKey::Numeric(9)];
        assert_eq!(row.total_spent, row.average_transaction());
        assert_eq!(row.transaction_count, 1);
    }

    #[test]
    fn test_rows_sorted_numerically() {
        let table = summarize(
            &[
                ntx(10, "A", dec!(1)),
                ntx(2, "A", dec!(1)),
                ntx(-1, "A", dec!(1)),
            ],
            GroupBy::Client,
        )
        .unwrap();
        let keys: Vec<_> = table.rows.keys().cloned().collect();
        assert_eq!(
            keys,
            [
                GroupKey::Numeric(-1),
                GroupKey::Numeric(2),
                GroupKey::Numeric(10)
            ]
        );
    }

    #[test]
    fn test_group_invariants() {
        // 1000 transactions spread over 7 clients, with refunds mixed in.
        let transactions: Vec<_> = (0..1000i64)
            .map(|i| {
                let cents = Decimal::new((i * 7919) % 100_000 - 20_000, 2);
                ntx(i % 7, "M", cents)
            })
            .collect();
        let table = summarize(&transactions, GroupBy::Client).unwrap();
        assert_eq!(table.len(), 7);
        for (key, summary) in &table.rows {
            let group: Vec<_> = transactions
                .iter()
                .filter(|tx| &tx.record.client_id == key)
                .collect();
            let sum: Decimal = group.iter().map(|tx| tx.value).sum();
            assert_eq!(summary.total_spent, sum);
            assert_eq!(summary.transaction_count, group.len() as u64);
            let drift = summary.total_spent / Decimal::from(summary.transaction_count)
                - summary.average_transaction();
            assert!(drift.abs() <= dec!(0.00005), "{key}: {drift}");
        }
        let counted: u64 = table.rows.values().map(|s| s.transaction_count).sum();
        assert_eq!(counted, 1000);
    }

    #[test]
    fn test_total_overflow() {
        let huge = Decimal::MAX - dec!(1);
        let transactions = [
            ntx(1, "A", dec!(5)),
            ntx(2, "A", huge),
            ntx(2, "B", huge),
        ];
        assert_eq!(
            summarize(&transactions, GroupBy::Client),
            Err(AggregationFailed {
                group_by: GroupBy::Client,
                key: GroupKey::Numeric(2),
            })
        );
        assert_eq!(
            summarize(&transactions, GroupBy::Merchant),
            Err(AggregationFailed {
                group_by: GroupBy::Merchant,
                key: GroupKey::Text("A".into()),
            })
        );
    }

    #[test]
    fn test_refund_brings_total_back_in_range() {
        let huge = Decimal::MAX - dec!(1);
        let table = summarize(
            &[ntx(1, "A", huge), ntx(1, "A", -huge), ntx(1, "A", huge)],
            GroupBy::Client,
        )
        .unwrap();
        assert_eq!(table.rows[&GroupKey::Numeric(1)].total_spent, huge);
    }

    #[test]
    fn test_average_rounding() {
        let summary = Summary {
            total_spent: dec!(10.0000),
            transaction_count: 3,
        };
        assert_eq!(summary.average_transaction(), dec!(3.3333));
        assert_eq!(summary.average_transaction().scale(), 4);
        let summary = Summary {
            total_spent: dec!(-0.0001),
            transaction_count: 2,
        };
        assert_eq!(summary.average_transaction(), dec!(-0.0001));
    }
}
