//! Cross-page stitcher: joins per-page event records into flows travelling
//! over a named event channel. The whole event set is resolved atomically
//! once every page has been analyzed.

use crate::storage::{EventKind, EventRecord, InterPageFlow, InterPageStore};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// The only channel pairing handled today: a page opened through
/// `wx.navigateTo` emitting into the opener's channel, received in the
/// target page's `onLoad` via `this.getOpenerEventChannel`.
const OPENER_CHANNEL: &str = "this.getOpenerEventChannel";
const NAVIGATE_EMITTER: &str = "wx.navigateTo";

pub fn resolve_inter_page_flows(store: &InterPageStore) -> Vec<InterPageFlow> {
    let page_events = &store.page_events;
    if page_events.values().all(Vec::is_empty) {
        debug!(target: "interpage", "no events found in pages, skipping");
        return Vec::new();
    }

    let mut results = Vec::new();
    for (page, events) in page_events {
        for event in events {
            let receives = event.method == "onLoad"
                && event.kind == EventKind::On
                && event.emitter == OPENER_CHANNEL
                && event.sink.as_deref().is_some_and(|s| !s.is_empty());
            if !receives {
                continue;
            }
            let sink = event.sink.clone().expect("checked above");
            for (from_page, source) in find_event_emit_sources(page_events, &event.event_name) {
                info!(
                    target: "interpage",
                    "inter-page flow {from_page} --> {page}, event {}, {source} to {sink}",
                    event.event_name
                );
                results.push(InterPageFlow {
                    from_page,
                    to_page: page.clone(),
                    event_name: event.event_name.clone(),
                    source,
                    sink: sink.clone(),
                });
            }
        }
    }
    debug!(target: "interpage", flows = results.len(), "inter-page resolution finished");
    results
}

/// All emission sources of `event_name` across pages, restricted to the
/// `wx.navigateTo` channel and stripped of the emitter's self-reference.
fn find_event_emit_sources(
    page_events: &BTreeMap<String, Vec<EventRecord>>,
    event_name: &str,
) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (page, events) in page_events {
        for event in events {
            if event.kind != EventKind::Emit || event.event_name != event_name {
                continue;
            }
            if event.emitter != NAVIGATE_EMITTER {
                continue;
            }
            for source in &event.sources {
                if source != NAVIGATE_EMITTER {
                    out.push((page.clone(), source.clone()));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PageSummary;
    use std::collections::BTreeSet;

    fn on_event(method: &str, name: &str, emitter: &str, sink: Option<&str>) -> EventRecord {
        EventRecord {
            method: method.into(),
            event_name: name.into(),
            kind: EventKind::On,
            callee_path: "ch.on".into(),
            call_expr: 0,
            sources: BTreeSet::new(),
            sink: sink.map(str::to_owned),
            emitter: emitter.into(),
        }
    }

    fn emit_event(name: &str, emitter: &str, sources: &[&str]) -> EventRecord {
        EventRecord {
            method: "go".into(),
            event_name: name.into(),
            kind: EventKind::Emit,
            callee_path: "res.eventChannel.emit".into(),
            call_expr: 1,
            sources: sources.iter().map(|s| s.to_string()).collect(),
            sink: None,
            emitter: emitter.into(),
        }
    }

    fn summary(page: &str, events: Vec<EventRecord>) -> PageSummary {
        PageSummary {
            page: page.into(),
            flows: Vec::new(),
            events,
            started: 0,
            finished: 0,
            timed_out: false,
        }
    }

    #[test]
    fn matching_emit_and_on_stitch_into_a_flow() {
        let mut store = InterPageStore::default();
        store.add_page(&summary(
            "sender",
            vec![emit_event("msg", "wx.navigateTo", &["userData", "wx.navigateTo"])],
        ));
        store.add_page(&summary(
            "receiver",
            vec![on_event("onLoad", "msg", "this.getOpenerEventChannel", Some("wx.request"))],
        ));

        let flows = resolve_inter_page_flows(&store);
        assert_eq!(
            flows,
            vec![InterPageFlow {
                from_page: "sender".into(),
                to_page: "receiver".into(),
                event_name: "msg".into(),
                source: "userData".into(),
                sink: "wx.request".into(),
            }]
        );
    }

    #[test]
    fn merging_is_commutative_across_page_order() {
        let emit = summary("sender", vec![emit_event("msg", "wx.navigateTo", &["d"])]);
        let on = summary(
            "receiver",
            vec![on_event("onLoad", "msg", "this.getOpenerEventChannel", Some("wx.request"))],
        );

        let mut a = InterPageStore::default();
        a.add_page(&emit);
        a.add_page(&on);
        let mut b = InterPageStore::default();
        b.add_page(&on);
        b.add_page(&emit);

        assert_eq!(resolve_inter_page_flows(&a), resolve_inter_page_flows(&b));
    }

    #[test]
    fn mismatched_event_names_do_not_stitch() {
        let mut store = InterPageStore::default();
        store.add_page(&summary(
            "sender",
            vec![emit_event("other", "wx.navigateTo", &["d"])],
        ));
        store.add_page(&summary(
            "receiver",
            vec![on_event("onLoad", "msg", "this.getOpenerEventChannel", Some("wx.request"))],
        ));
        assert!(resolve_inter_page_flows(&store).is_empty());
    }

    #[test]
    fn non_onload_subscriptions_are_ignored() {
        let mut store = InterPageStore::default();
        store.add_page(&summary(
            "sender",
            vec![emit_event("msg", "wx.navigateTo", &["d"])],
        ));
        store.add_page(&summary(
            "receiver",
            vec![on_event("ready", "msg", "this.getOpenerEventChannel", Some("wx.request"))],
        ));
        assert!(resolve_inter_page_flows(&store).is_empty());
    }

    #[test]
    fn subscriptions_without_a_sink_are_ignored() {
        let mut store = InterPageStore::default();
        store.add_page(&summary(
            "sender",
            vec![emit_event("msg", "wx.navigateTo", &["d"])],
        ));
        store.add_page(&summary(
            "receiver",
            vec![on_event("onLoad", "msg", "this.getOpenerEventChannel", None)],
        ));
        assert!(resolve_inter_page_flows(&store).is_empty());
    }
}
