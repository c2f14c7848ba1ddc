use crate::errors::TaintResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Pseudo-source accepted in the `sources` filter: matches any
/// `[data from …]` source produced by the resolver.
pub const DOUBLE_BINDING_FILTER: &str = "[double_binding]";

/// Taint filter loaded from the JSON config file. Missing keys (or an empty
/// array) mean "no filter on that side".
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TaintConfig {
    pub sources: Vec<String>,
    pub sinks: Vec<String>,
}

impl TaintConfig {
    pub fn load(path: &Path) -> TaintResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn has_source_filter(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn has_sink_filter(&self) -> bool {
        !self.sinks.is_empty()
    }
}

/// Bounding knobs for symbolic evaluation and traversal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Limits {
    /// Max times a function scope may re-enter itself.
    pub retraverse: usize,

    /// Max iterations of a for/while symbolic expansion.
    pub loop_iterations: usize,

    /// Max characters retained in any symbolic value.
    pub value_size: usize,

    /// Max nested value-computation calls.
    pub value_depth: u32,

    /// Max recursion depth of the data-flow traversal.
    pub traversal_depth: u32,

    /// Max wall time per PDG build, in seconds.
    pub page_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            retraverse: 1,
            loop_iterations: 1,
            value_size: 10_000,
            value_depth: 1_000,
            traversal_depth: 10_000,
            page_timeout_secs: 600,
        }
    }
}

/// Cooperative deadline: the data-flow engine checks it at every
/// statement-scope entry and bails with `TaintError::BuildTimeout`.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    end: Option<Instant>,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            end: Some(Instant::now() + timeout),
        }
    }

    /// A deadline that never expires, for tests and one-shot builds.
    pub fn none() -> Self {
        Self { end: None }
    }

    pub fn expired(&self) -> bool {
        self.end.is_some_and(|end| Instant::now() >= end)
    }
}

#[test]
fn config_missing_keys_mean_no_filter() {
    let cfg: TaintConfig = serde_json::from_str("{}").unwrap();
    assert!(!cfg.has_source_filter());
    assert!(!cfg.has_sink_filter());
}

#[test]
fn config_reads_sources_and_sinks() {
    let cfg: TaintConfig =
        serde_json::from_str(r#"{"sources": ["wx.getStorageSync"], "sinks": ["wx.request"]}"#)
            .unwrap();
    assert_eq!(cfg.sources, vec!["wx.getStorageSync"]);
    assert_eq!(cfg.sinks, vec!["wx.request"]);
}

#[test]
fn deadline_none_never_expires() {
    assert!(!Deadline::none().expired());
}

#[test]
fn deadline_expires() {
    let d = Deadline::after(Duration::from_secs(0));
    std::thread::sleep(Duration::from_millis(2));
    assert!(d.expired());
}
