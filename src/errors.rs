use std::time::Duration;

/// Fatal problems with the operator-supplied input files. Any of these aborts
/// the run before a single network call is made.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("INVALID private key #{line}: {reason}")]
    InvalidPrivateKey { line: usize, reason: String },
    #[error("remove example proxy from list (line #{line}): {placeholder}")]
    PlaceholderProxy {
        line: usize,
        placeholder: &'static str,
    },
}

/// Returned by the optionally bounded polling loops once their deadline passes.
#[derive(Debug, thiserror::Error)]
#[error("{what} did not complete within {waited:?}")]
pub struct WaitTimeout {
    pub what: &'static str,
    pub waited: Duration,
}
