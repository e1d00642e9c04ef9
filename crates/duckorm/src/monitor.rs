//! Statement logging through `tracing`.
//!
//! Every statement a [`Session`](crate::Session) runs is reported on target
//! `duckorm.sql`: at `debug` when it succeeds, at `warn` when it fails or exceeds the
//! configured slow-query threshold. Schema changes are reported on target
//! `duckorm.migrate`.

use crate::config::SessionConfig;
use crate::engine::EngineError;
use crate::statement::Statement;
use std::borrow::Cow;
use std::time::Duration;

/// Truncate `sql` to at most `max_bytes`, respecting char boundaries.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// SQL as it should appear in logs.
pub(crate) fn display_sql<'a>(sql: &'a str, max: Option<usize>) -> Cow<'a, str> {
    match max {
        Some(max) if sql.len() > max => Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max))),
        _ => Cow::Borrowed(sql),
    }
}

/// Report a finished statement.
pub(crate) fn log_statement(
    config: &SessionConfig,
    statement: &Statement,
    elapsed: Duration,
    outcome: Result<u64, &EngineError>,
) {
    let sql = display_sql(&statement.sql, config.max_sql_length);
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let params = config
        .log_params
        .then(|| tracing::field::debug(&statement.params));

    let rows = match outcome {
        Ok(rows) => rows,
        Err(err) => {
            tracing::warn!(
                target: "duckorm.sql",
                kind = %statement.kind,
                table = %statement.table,
                param_count = statement.params.len(),
                params,
                elapsed_ms,
                error = %err,
                sql = %sql,
                "statement failed"
            );
            return;
        }
    };

    tracing::debug!(
        target: "duckorm.sql",
        kind = %statement.kind,
        table = %statement.table,
        param_count = statement.params.len(),
        params,
        rows,
        elapsed_ms,
        sql = %sql,
        "statement"
    );

    if let Some(threshold) = config.slow_query_threshold()
        && elapsed > threshold
    {
        tracing::warn!(
            target: "duckorm.sql",
            kind = %statement.kind,
            table = %statement.table,
            elapsed_ms,
            threshold_ms = threshold.as_secs_f64() * 1000.0,
            sql = %sql,
            "slow statement"
        );
    }
}
