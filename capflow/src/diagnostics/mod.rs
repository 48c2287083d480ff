//! Diagnostics collector.
//!
//! Turns a failed attempt's error into a `Diagnostic`: a stable category,
//! the message, the originating call, and the unwrapped `source()` chain.

use crate::core::{Diagnostic, DiagnosticContext, ErrorCategory};
use crate::errors::ImplementationError;
use std::any::Any;
use std::error::Error;
use std::io::ErrorKind;

/// Builds diagnostics from failed attempts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagnosticsCollector;

impl DiagnosticsCollector {
    /// Builds a diagnostic from an error and the call it came from.
    ///
    /// Every `source()` layer becomes a cause, outermost first. If the outer
    /// error carries no recognizable category, the first classified cause
    /// provides it.
    #[must_use]
    pub fn from_error(err: &(dyn Error + 'static), context: DiagnosticContext) -> Diagnostic {
        let layers: Vec<Diagnostic> = std::iter::successors(err.source(), |&cause| cause.source())
            .map(|cause| Diagnostic::new(classify(cause), cause.to_string()))
            .collect();

        let mut category = classify(err);
        if category.is_unknown() {
            category = layers
                .iter()
                .map(|d| d.category)
                .find(|c| !c.is_unknown())
                .unwrap_or(ErrorCategory::Unknown);
        }

        let cause = layers.into_iter().rev().fold(None, |inner, mut layer: Diagnostic| {
            layer.cause = inner.map(Box::new);
            Some(layer)
        });

        Diagnostic {
            category,
            message: err.to_string(),
            context: Some(context),
            cause: cause.map(Box::new),
        }
    }

    /// Builds a diagnostic for an implementation that panicked.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send), context: DiagnosticContext) -> Diagnostic {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        Diagnostic::new(
            ErrorCategory::Internal,
            format!("implementation panicked: {detail}"),
        )
        .with_context(context)
    }
}

/// Classifies a single error by its concrete type or kind.
#[must_use]
pub fn classify(err: &(dyn Error + 'static)) -> ErrorCategory {
    if let Some(e) = err.downcast_ref::<ImplementationError>() {
        return e.category();
    }
    if let Some(e) = err.downcast_ref::<std::io::Error>() {
        return classify_io(e.kind());
    }
    if err.is::<serde_json::Error>() {
        return ErrorCategory::Serialization;
    }
    if err.is::<tokio::time::error::Elapsed>() {
        return ErrorCategory::Timeout;
    }
    ErrorCategory::Unknown
}

/// Returns the first recognizable category along an error chain.
pub fn classify_chain<'a, I>(chain: I) -> ErrorCategory
where
    I: IntoIterator<Item = &'a (dyn Error + 'static)>,
{
    chain
        .into_iter()
        .map(classify)
        .find(|c| !c.is_unknown())
        .unwrap_or(ErrorCategory::Unknown)
}

fn classify_io(kind: ErrorKind) -> ErrorCategory {
    match kind {
        ErrorKind::NotFound => ErrorCategory::NotFound,
        ErrorKind::PermissionDenied => ErrorCategory::PermissionDenied,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrInUse
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe => ErrorCategory::Network,
        ErrorKind::TimedOut => ErrorCategory::Timeout,
        ErrorKind::InvalidInput | ErrorKind::InvalidData => ErrorCategory::InvalidInput,
        ErrorKind::Unsupported => ErrorCategory::Unsupported,
        _ => ErrorCategory::Io,
    }
}
