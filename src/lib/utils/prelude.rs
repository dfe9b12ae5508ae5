//! Glob-imported in nearly every module: the error alias, the `anyhow::Context`
//! extension trait, and the tracing macros.

pub use anyhow::Context as _;
pub use tracing::{debug, error, info, trace, warn};

/// Catch-all result type for glue code and background tasks.
pub type AnyResult<T> = anyhow::Result<T>;

/// Extension trait for turning a chained [`anyhow::Error`] into a single line,
/// suitable for a Discord message or a compact log line.
pub trait ErrorOneliner {
    fn oneliner(&self) -> String;
}

impl ErrorOneliner for anyhow::Error {
    fn oneliner(&self) -> String {
        self.chain()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }
}
