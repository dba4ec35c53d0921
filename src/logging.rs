use std::time::Duration;

use anyhow::{Result, anyhow};
use time::OffsetDateTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogFormat;
use crate::store::ResourceClass;

const DEFAULT_FILTER: &str = "info";

pub fn init_logger(format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match format {
        LogFormat::Json => fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .try_init()
            .map_err(|err| anyhow!(err))?,
        LogFormat::Text => fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init()
            .map_err(|err| anyhow!(err))?,
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Store,
    Retrieve,
    Delete,
}

impl StoreOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOperation::Store => "store",
            StoreOperation::Retrieve => "retrieve",
            StoreOperation::Delete => "delete",
        }
    }
}

/// One completed store operation.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub operation: StoreOperation,
    pub class: ResourceClass,
    pub digest: String,
    /// `ok` or a [`crate::store::StoreError::kind`] label.
    pub outcome: &'static str,
    pub overwrite: Option<bool>,
    pub bytes: Option<u64>,
    pub elapsed: Duration,
}

impl StoreEvent {
    pub fn new(operation: StoreOperation, class: ResourceClass, digest: impl Into<String>) -> Self {
        Self {
            operation,
            class,
            digest: digest.into(),
            outcome: "ok",
            overwrite: None,
            bytes: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn outcome(mut self, outcome: &'static str) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    pub fn bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn log(self) {
        log_operation(self);
    }
}

pub fn log_operation(event: StoreEvent) {
    let StoreEvent {
        operation,
        class,
        digest,
        outcome,
        overwrite,
        bytes,
        elapsed,
    } = event;

    let now = OffsetDateTime::now_utc();
    let (year, month, day) = now.to_calendar_date();
    let (hour, minute, second) = now.to_hms();
    let millisecond = now.millisecond();
    let month_number: u8 = month.into();
    let ts = format!(
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millisecond:03}Z",
        month = month_number
    );

    let operation = operation.as_str();
    let class_label = class.prefix();
    let elapsed_ms = elapsed.as_millis();

    tracing::info!(
        target = "store_log",
        ts,
        operation,
        class = class_label,
        digest,
        outcome,
        overwrite,
        bytes,
        elapsed_ms
    );

    crate::metrics::record_store_operation(operation, class_label, outcome, elapsed);
}
