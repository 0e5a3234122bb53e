//! Diagnostic logging setup for the driver.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Resolves the filter from an explicit directive, then `RUST_LOG`, then
/// [`DEFAULT_LOG_FILTER`].
pub fn build_filter(directive: Option<&str>) -> Result<EnvFilter, String> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .map_err(|error| format!("invalid log filter `{directive}`: {error}")),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))),
    }
}

/// Installs a stderr `fmt` subscriber so stdout carries only the report.
pub fn init_logging(directive: Option<&str>) -> Result<(), String> {
    let filter = build_filter(directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| format!("failed to install logger: {error}"))
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn explicit_directive_is_validated() {
        assert!(build_filter(Some("virtfuzz_core=trace,warn")).is_ok());
        let error = build_filter(Some("virtfuzz=loud")).expect_err("malformed directive");
        assert!(error.starts_with("invalid log filter"));
    }
}
