//! Rendering of execution results.
//!
//! `Reporter::render` produces the human-readable report, `render_key_values`
//! the flat pairs used for log capture. JSON comes from
//! `ExecutionResult::to_json`.

use crate::core::{ExecutionAttempt, ExecutionResult};
use std::fmt::{self, Write};
use tracing::{error, info, warn};

/// Renders `ExecutionResult`s for callers and logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter;

impl Reporter {
    /// Renders a multi-line text report.
    ///
    /// Successful results name the rank that satisfied the request and list
    /// any ranks that fell through. Exhausted and cancelled results list
    /// every attempt in order with its diagnostic and cause chain.
    #[must_use]
    pub fn render(result: &ExecutionResult) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = Self::write_report(&mut out, result);
        out
    }

    fn write_report(out: &mut String, result: &ExecutionResult) -> fmt::Result {
        match result {
            ExecutionResult::Succeeded {
                operation,
                rank,
                implementation,
                attempts,
                ..
            } => {
                let cost = attempts.last().map_or(0.0, |a| a.duration_ms);
                writeln!(
                    out,
                    "'{operation}' succeeded via rank {rank} ({implementation}) in {cost:.1}ms"
                )?;
                let fallen: Vec<_> = attempts.iter().filter(|a| !a.is_success()).collect();
                if !fallen.is_empty() {
                    writeln!(out, "  Fell through {} implementation(s):", fallen.len())?;
                    for (i, attempt) in fallen.into_iter().enumerate() {
                        write_attempt(out, i + 1, attempt)?;
                    }
                }
            }
            ExecutionResult::Exhausted {
                operation,
                attempts,
                ..
            } => {
                writeln!(
                    out,
                    "All {} implementation(s) of '{operation}' failed:",
                    attempts.len()
                )?;
                for (i, attempt) in attempts.iter().enumerate() {
                    write_attempt(out, i + 1, attempt)?;
                }
            }
            ExecutionResult::Cancelled {
                operation,
                reason,
                attempts,
                ..
            } => {
                writeln!(
                    out,
                    "'{operation}' cancelled ({reason}) after {} attempt(s)",
                    attempts.len()
                )?;
                for (i, attempt) in attempts.iter().enumerate() {
                    write_attempt(out, i + 1, attempt)?;
                }
            }
        }
        Ok(())
    }

    /// Renders the result as flat key-value pairs.
    ///
    /// Diagnostics appear as `diagnostic.N` in attempt order, starting at 1.
    #[must_use]
    pub fn render_key_values(result: &ExecutionResult) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("outcome".to_string(), result.outcome_label().to_string()),
            ("operation".to_string(), result.operation().to_string()),
            ("execution_id".to_string(), result.execution_id().to_string()),
            ("attempts".to_string(), result.attempts().len().to_string()),
            (
                "total_duration_ms".to_string(),
                format!("{:.1}", result.total_duration_ms()),
            ),
        ];

        match result {
            ExecutionResult::Succeeded {
                rank, implementation, ..
            } => {
                pairs.push(("rank".to_string(), rank.to_string()));
                pairs.push(("implementation".to_string(), implementation.clone()));
            }
            ExecutionResult::Cancelled { reason, .. } => {
                pairs.push(("reason".to_string(), reason.clone()));
            }
            ExecutionResult::Exhausted { .. } => {}
        }

        for (i, diagnostic) in result.diagnostics().into_iter().enumerate() {
            pairs.push((format!("diagnostic.{}", i + 1), diagnostic.to_string()));
        }
        pairs
    }

    /// Renders the key-value pairs as a single logfmt line.
    #[must_use]
    pub fn render_logfmt(result: &ExecutionResult) -> String {
        Self::render_key_values(result)
            .iter()
            .map(|(key, value)| format!("{key}={}", logfmt_value(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Logs the report at a level matching the outcome.
    pub fn log(result: &ExecutionResult) {
        let report = Self::render(result);
        match result {
            ExecutionResult::Succeeded { .. } => info!(
                execution_id = %result.execution_id(),
                "{}",
                report.trim_end()
            ),
            ExecutionResult::Exhausted { .. } => error!(
                execution_id = %result.execution_id(),
                "{}",
                report.trim_end()
            ),
            ExecutionResult::Cancelled { .. } => warn!(
                execution_id = %result.execution_id(),
                "{}",
                report.trim_end()
            ),
        }
    }
}

fn write_attempt(out: &mut String, index: usize, attempt: &ExecutionAttempt) -> fmt::Result {
    writeln!(
        out,
        "    {index}. rank {} {} [{}, {:.1}ms]",
        attempt.rank, attempt.implementation, attempt.status, attempt.duration_ms
    )?;
    if let Some(diagnostic) = &attempt.diagnostic {
        writeln!(out, "       {}: {}", diagnostic.category, diagnostic.message)?;
        for cause in diagnostic.causes() {
            writeln!(out, "       caused by {}: {}", cause.category, cause.message)?;
        }
    }
    Ok(())
}

fn logfmt_value(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || c == '"' || c == '=') {
        return value.to_string();
    }
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Reporter::render(self).trim_end())
    }
}
