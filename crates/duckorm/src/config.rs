//! Session configuration.

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::time::Duration;

/// How [`Session`](crate::Session) turns a batch of records into INSERT statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Multi-row statements when the dialect supports them.
    #[default]
    Auto,
    /// One statement per row.
    PerRow,
}

/// Configuration for a [`Session`](crate::Session).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// batch_size = 1000
/// insert_mode = "per_row"
/// slow_query_threshold_ms = 250
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum rows per multi-row INSERT.
    pub batch_size: usize,
    pub insert_mode: InsertMode,
    /// Truncate logged SQL to this many bytes. `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statements slower than this are logged at `warn`.
    pub slow_query_threshold_ms: Option<u64>,
    /// Include bound values in statement logs.
    pub log_params: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            insert_mode: InsertMode::Auto,
            max_sql_length: Some(200),
            slow_query_threshold_ms: None,
            log_params: false,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> OrmResult<Self> {
        let config: SessionConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.batch_size == 0 {
            return Err(OrmError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_insert_mode(mut self, mode: InsertMode) -> Self {
        self.insert_mode = mode;
        self
    }

    /// Set maximum SQL length to log.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold_ms = Some(u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.slow_query_threshold_ms.map(Duration::from_millis)
    }

    /// Rows per INSERT statement after applying the insert mode.
    pub fn effective_batch_size(&self) -> usize {
        match self.insert_mode {
            InsertMode::Auto => self.batch_size.max(1),
            InsertMode::PerRow => 1,
        }
    }
}
