use serde::de::StdError;
use std::fmt;
use std::sync::PoisonError;
use thiserror::Error;

pub type TaintResult<T, E = TaintError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum TaintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("markup parse error: {0}")]
    Markup(#[from] quick_xml::Error),

    #[error("parser failed for {0}")]
    Parse(String),

    #[error("PDG construction timed out")]
    BuildTimeout,

    #[error("poisoned lock: {0}")]
    Poison(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync + 'static>),

    #[error("{0}")]
    Msg(String),
}

impl<T> From<PoisonError<T>> for TaintError
where
    T: fmt::Debug,
{
    fn from(err: PoisonError<T>) -> Self {
        TaintError::Poison(err.to_string())
    }
}

impl From<&str> for TaintError {
    fn from(s: &str) -> Self {
        TaintError::Msg(s.to_owned())
    }
}

impl From<String> for TaintError {
    fn from(s: String) -> Self {
        TaintError::Msg(s)
    }
}

#[test]
fn io_conversion_retains_message() {
    let e = std::io::Error::other("boom!");
    let n: TaintError = e.into();
    assert!(matches!(n, TaintError::Io(_)));
    assert!(n.to_string().contains("boom"));
}

#[test]
fn simple_string_into_msg() {
    let n: TaintError = "plain msg".into();
    assert!(matches!(n, TaintError::Msg(s) if s == "plain msg"));
}

#[test]
fn timeout_has_a_readable_message() {
    let n = TaintError::BuildTimeout;
    assert!(n.to_string().contains("timed out"));
}
