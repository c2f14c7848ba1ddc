//! Per-page analysis records and the cross-page accumulator. Only these
//! serialisable summaries travel between workers and the listener; graph
//! nodes never cross the channel.

use crate::config::{TaintConfig, DOUBLE_BINDING_FILTER};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One resolved source→sink pair inside a page method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub method: String,
    pub ident: String,
    pub source: String,
    pub sink: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    On,
    Emit,
}

/// A classified event-channel call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub method: String,
    pub event_name: String,
    pub kind: EventKind,
    /// Dotted path of the `on`/`emit` callee, e.g. `ch.on`.
    pub callee_path: String,
    /// Graph handle of the originating call expression (process-local).
    pub call_expr: u32,
    /// Sources flowing into an emission.
    pub sources: BTreeSet<String>,
    /// Sink a subscription's data flows into.
    pub sink: Option<String>,
    /// Resolved emitter identity, e.g. `wx.navigateTo`.
    pub emitter: String,
}

/// Everything a worker ships for one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: String,
    pub flows: Vec<FlowRecord>,
    pub events: Vec<EventRecord>,
    pub started: u64,
    pub finished: u64,
    pub timed_out: bool,
}

/// Per-page context threaded through the resolver.
#[derive(Debug, Default)]
pub struct Storage {
    pub page_path: String,
    pub results: Vec<FlowRecord>,
    pub events: Vec<EventRecord>,
}

impl Storage {
    pub fn new(page_path: impl Into<String>) -> Self {
        Self {
            page_path: page_path.into(),
            ..Self::default()
        }
    }
}

/// Cross-page accumulator owned by the listener.
#[derive(Debug, Default)]
pub struct InterPageStore {
    pub page_results: BTreeMap<String, Vec<FlowRecord>>,
    pub page_events: BTreeMap<String, Vec<EventRecord>>,
}

impl InterPageStore {
    pub fn add_page(&mut self, summary: &PageSummary) {
        self.page_results
            .insert(summary.page.clone(), summary.flows.clone());
        self.page_events
            .insert(summary.page.clone(), summary.events.clone());
    }
}

/// A stitched cross-page flow over a named event channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterPageFlow {
    pub from_page: String,
    pub to_page: String,
    pub event_name: String,
    pub source: String,
    pub sink: String,
}

/// Keep the flows the config admits. An empty filter side admits everything;
/// the `[double_binding]` pseudo-source matches any `[data from …]` source.
pub fn filter_flows(flows: Vec<FlowRecord>, config: &TaintConfig) -> Vec<FlowRecord> {
    if !config.has_source_filter() && !config.has_sink_filter() {
        return flows;
    }
    let double_binding = config
        .sources
        .iter()
        .any(|s| s == DOUBLE_BINDING_FILTER);

    flows
        .into_iter()
        .filter(|flow| {
            let sink_ok = !config.has_sink_filter() || config.sinks.contains(&flow.sink);
            let source_ok = !config.has_source_filter()
                || config.sources.contains(&flow.source)
                || (double_binding && flow.source.starts_with("[data from"));
            sink_ok && source_ok
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(source: &str, sink: &str) -> FlowRecord {
        FlowRecord {
            method: "onLoad".into(),
            ident: "v".into(),
            source: source.into(),
            sink: sink.into(),
        }
    }

    #[test]
    fn empty_config_retains_everything() {
        let cfg = TaintConfig::default();
        let flows = vec![flow("a", "b"), flow("c", "d")];
        assert_eq!(filter_flows(flows.clone(), &cfg), flows);
    }

    #[test]
    fn source_and_sink_filter_must_both_match() {
        let cfg = TaintConfig {
            sources: vec!["wx.getStorageSync".into()],
            sinks: vec!["wx.request".into()],
        };
        let kept = filter_flows(
            vec![
                flow("wx.getStorageSync", "wx.request"),
                flow("wx.getStorageSync", "console.log"),
                flow("other", "wx.request"),
            ],
            &cfg,
        );
        assert_eq!(kept, vec![flow("wx.getStorageSync", "wx.request")]);
    }

    #[test]
    fn double_binding_pseudo_source_matches_tagged_sources() {
        let cfg = TaintConfig {
            sources: vec![DOUBLE_BINDING_FILTER.into()],
            sinks: vec!["wx.request".into()],
        };
        let kept = filter_flows(
            vec![
                flow("[data from double binding: u, type: text]", "wx.request"),
                flow("wx.getStorageSync", "wx.request"),
            ],
            &cfg,
        );
        assert_eq!(kept.len(), 1);
        assert!(kept[0].source.starts_with("[data from"));
    }

    #[test]
    fn sink_only_filter_applies() {
        let cfg = TaintConfig {
            sources: vec![],
            sinks: vec!["wx.request".into()],
        };
        let kept = filter_flows(
            vec![flow("a", "wx.request"), flow("a", "console.log")],
            &cfg,
        );
        assert_eq!(kept, vec![flow("a", "wx.request")]);
    }
}
