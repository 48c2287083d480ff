//! Cooperative cancellation for fallback execution.

mod token;

pub use token::CancellationToken;
