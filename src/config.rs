use crate::{pipeline::Job, store::BlobLocation};
use clap::{builder::NonEmptyStringValueParser, Parser};
use std::path::PathBuf;

/// Summarize a transaction ledger by client and by merchant
#[derive(Parser, Debug, Clone)]
#[command(name = "spending-summary", version)]
pub(crate) struct Settings {
    /// Bucket holding the transaction ledger
    #[arg(long, env = "S3_BUCKET_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub source_bucket: String,

    /// Key of the transaction ledger inside the source bucket
    #[arg(long, env = "S3_FILE_KEY", value_parser = NonEmptyStringValueParser::new())]
    pub source_key: String,

    /// Bucket receiving the summaries (defaults to the source bucket)
    #[arg(long, env = "DEST_BUCKET_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub dest_bucket: Option<String>,

    /// Key of the per-client summary
    #[arg(long, env = "CLIENT_SUMMARY_KEY", default_value = "client_summary.csv", value_parser = NonEmptyStringValueParser::new())]
    pub client_summary_key: String,

    /// Key of the per-merchant summary
    #[arg(long, env = "MERCHANT_SUMMARY_KEY", default_value = "merchant_summary.csv", value_parser = NonEmptyStringValueParser::new())]
    pub merchant_summary_key: String,

    /// Directory under which buckets are stored
    #[arg(long, env = "BLOB_STORE_ROOT", default_value = ".")]
    pub store_root: PathBuf,

    /// Logging level or tracing filter directive
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    pub fn job(&self) -> Job {
        let dest_bucket = self.dest_bucket.as_ref().unwrap_or(&self.source_bucket);
        Job {
            source: BlobLocation::new(&self.source_bucket, &self.source_key),
            client_summary: BlobLocation::new(dest_bucket, &self.client_summary_key),
            merchant_summary: BlobLocation::new(dest_bucket, &self.merchant_summary_key),
        }
    }
}
