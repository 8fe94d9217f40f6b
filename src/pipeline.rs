use crate::{
    compute::{summarize, SummaryTable},
    data::{AggregationFailed, GroupBy, NormalizationFailed},
    normalize::normalize_transactions,
    read::{read_transactions, ReadError},
    store::{BlobLocation, BlobStore, StoreError},
    write::write_summary,
};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Rows of each summary echoed to the debug log.
const PREVIEW_ROWS: usize = 5;

/// Where the job reads the ledger and writes the two summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Job {
    pub source: BlobLocation,
    pub client_summary: BlobLocation,
    pub merchant_summary: BlobLocation,
}

impl Job {
    fn destination(&self, group_by: GroupBy) -> &BlobLocation {
        match group_by {
            GroupBy::Client => &self.client_summary,
            GroupBy::Merchant => &self.merchant_summary,
        }
    }
}

/// Steps of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Loading,
    Normalizing,
    Aggregating,
    Storing(GroupBy),
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loading => f.write_str("loading"),
            Stage::Normalizing => f.write_str("normalizing"),
            Stage::Aggregating => f.write_str("aggregating"),
            Stage::Storing(group_by) => write!(f, "storing {group_by} summary"),
            Stage::Done => f.write_str("done"),
        }
    }
}

#[derive(Error, Debug)]
pub(crate) enum SourceError {
    #[error(transparent)]
    Fetch(#[from] StoreError),
    #[error(transparent)]
    Parse(#[from] ReadError),
}

#[derive(Error, Debug)]
pub(crate) enum SinkError {
    #[error("cannot encode summary: {0}")]
    Encode(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A failed run. Every variant is fatal; nothing is retried.
#[derive(Error, Debug)]
pub(crate) enum PipelineError {
    #[error("cannot read transactions from {location}: {source}")]
    SourceUnreadable {
        location: BlobLocation,
        #[source]
        source: SourceError,
    },
    #[error("amount normalization failed: {0}")]
    NormalizationFailed(#[from] NormalizationFailed),
    #[error("aggregation failed: {0}")]
    AggregationFailed(#[from] AggregationFailed),
    /// Summaries are stored one after the other, so the client summary may already be
    /// persisted when the merchant one fails. `persisted` lists what was written.
    #[error("cannot write {group_by} summary to {location}: {source}{}", persisted_note(.persisted))]
    SinkUnwritable {
        group_by: GroupBy,
        location: BlobLocation,
        #[source]
        source: SinkError,
        persisted: Vec<BlobLocation>,
    },
}

fn persisted_note(persisted: &[BlobLocation]) -> String {
    if persisted.is_empty() {
        return String::new();
    }
    let locations: Vec<String> = persisted.iter().map(ToString::to_string).collect();
    format!(" (already written: {})", locations.join(", "))
}

impl PipelineError {
    /// Stage the run was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::SourceUnreadable { .. } => Stage::Loading,
            PipelineError::NormalizationFailed(_) => Stage::Normalizing,
            PipelineError::AggregationFailed(_) => Stage::Aggregating,
            PipelineError::SinkUnwritable { group_by, .. } => Stage::Storing(*group_by),
        }
    }
}

/// What a successful run did, for the final log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Report {
    pub transactions: usize,
    pub clients: usize,
    pub merchants: usize,
}

/// Load the ledger, normalize amounts, summarize by client and by merchant and store
/// both summaries. Nothing is written unless every amount is valid, every total fits
/// and both summaries encode.
pub(crate) fn run<S: BlobStore>(store: &mut S, job: &Job) -> Result<Report, PipelineError> {
    info!(stage = %Stage::Loading, source = %job.source, "fetching transactions");
    let source_unreadable = |source: SourceError| PipelineError::SourceUnreadable {
        location: job.source.clone(),
        source,
    };
    let raw = store
        .fetch(&job.source)
        .map_err(|e| source_unreadable(e.into()))?;
    let transactions =
        read_transactions(raw.as_slice()).map_err(|e| source_unreadable(e.into()))?;
    info!(rows = transactions.len(), "transactions loaded");

    info!(stage = %Stage::Normalizing, "normalizing amounts");
    let normalized = normalize_transactions(&transactions)?;

    info!(stage = %Stage::Aggregating, "summarizing");
    let summaries = [
        summarize(&normalized, GroupBy::Client)?,
        summarize(&normalized, GroupBy::Merchant)?,
    ];

    let mut encoded = Vec::with_capacity(summaries.len());
    for table in &summaries {
        preview(table);
        let mut bytes = Vec::new();
        write_summary(&mut bytes, table).map_err(|e| PipelineError::SinkUnwritable {
            group_by: table.group_by,
            location: job.destination(table.group_by).clone(),
            source: e.into(),
            persisted: Vec::new(),
        })?;
        encoded.push((table.group_by, bytes));
    }

    let mut persisted = Vec::new();
    for (group_by, bytes) in encoded {
        let location = job.destination(group_by);
        info!(stage = %Stage::Storing(group_by), destination = %location, "storing summary");
        if let Err(e) = store.store(location, bytes) {
            if !persisted.is_empty() {
                warn!("{group_by} summary not stored but earlier summaries were kept");
            }
            return Err(PipelineError::SinkUnwritable {
                group_by,
                location: location.clone(),
                source: e.into(),
                persisted,
            });
        }
        persisted.push(location.clone());
    }

    let [clients, merchants] = &summaries;
    let report = Report {
        transactions: normalized.len(),
        clients: clients.len(),
        merchants: merchants.len(),
    };
    info!(
        stage = %Stage::Done,
        transactions = report.transactions,
        clients = report.clients,
        merchants = report.merchants,
        "spending summaries written"
    );
    Ok(report)
}

fn preview(table: &SummaryTable) {
    debug!("{} spending summary ({} rows):", table.group_by, table.len());
    for (key, summary) in table.rows.iter().take(PREVIEW_ROWS) {
        debug!(
            "  {}={key} total_spent={} average_transaction={} transaction_count={}",
            table.group_by.column(),
            summary.total_spent,
            summary.average_transaction(),
            summary.transaction_count
        );
    }
}
