//! Taint resolver: walks a finished page PDG, finds source→sink flows per
//! page method, and classifies event-channel subscriptions and emissions.

use crate::pdg::node::{Category, NodeId, Pdg, SymValue};
use crate::pdg::value::computed_value;
use crate::storage::{EventKind, EventRecord, FlowRecord, Storage};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// -------------------------------------------------------------------------
///  Dotted paths
/// -------------------------------------------------------------------------

/// Render a callee as a dotted path: `a.b.c`, `this.a.b`. Unresolvable
/// pieces contribute nothing.
pub fn dotted_path(g: &Pdg, node: NodeId) -> String {
    let mut parts = Vec::new();
    dotted_parts(g, node, &mut parts);
    parts.join(".")
}

fn dotted_parts(g: &Pdg, node: NodeId, out: &mut Vec<String>) {
    match g[node].name.as_str() {
        "MemberExpression" => {
            for &child in &g[node].children {
                dotted_parts(g, child, out);
            }
        }
        "ThisExpression" => out.push("this".to_owned()),
        "Identifier" => out.push(g[node].ident_name().unwrap_or_default().to_owned()),
        "Literal" => {
            // bracket access: obj["prop"]
            if let Some(SymValue::Str(s)) = g[node].literal_attribute() {
                out.push(s);
            }
        }
        _ => {}
    }
}

/// Dotted callee of a call expression. The top-level `Page` registration is
/// never a callee of interest.
pub fn callee_path(g: &Pdg, call: NodeId) -> String {
    let Some(&callee) = g[call].children.first() else {
        return String::new();
    };
    if g[callee].is_leaf() && g[callee].attr_str("name") == Some("Page") {
        return String::new();
    }
    dotted_path(g, callee)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Nearest call-expression ancestor (the node itself included).
fn nearest_call_expr(g: &Pdg, node: NodeId) -> Option<NodeId> {
    let mut cur = Some(node);
    while let Some(n) = cur {
        if g[n].cat == Category::ValueExpr && g[n].name == "CallExpression" {
            return Some(n);
        }
        cur = g[n].parent;
    }
    None
}

/// -------------------------------------------------------------------------
///  Source resolution
/// -------------------------------------------------------------------------

/// A data-dep parent sitting directly under a declarator or assignment:
/// the right-hand side's callee is the source.
fn immediate_source(g: &Pdg, node: NodeId) -> Option<String> {
    let parent = g[node].parent?;
    if !matches!(
        g[parent].name.as_str(),
        "VariableDeclarator" | "AssignmentExpression"
    ) {
        return None;
    }
    let &rhs = g[parent].children.get(1)?;
    if g[rhs].cat != Category::ValueExpr {
        return None;
    }
    let path = if g[rhs].name == "CallExpression" {
        callee_path(g, rhs)
    } else {
        // e.g. new X.Y(...) or a value expression wrapping the callee
        g[rhs]
            .children
            .first()
            .map(|&c| dotted_path(g, c))
            .unwrap_or_default()
    };
    (!path.is_empty()).then(|| {
        debug!(target: "taint", "immediate data-flow source: {path}");
        path
    })
}

/// A page-method parameter sits at `ident → FunctionExpression → Property →
/// ObjectExpression → CallExpression(Page)`.
fn is_page_method_parameter(g: &Pdg, node: NodeId) -> bool {
    if g[node].cat != Category::Identifier {
        return false;
    }
    let mut cur = node;
    for _ in 0..4 {
        match g[cur].parent {
            Some(p) => cur = p,
            None => return false,
        }
    }
    g[cur]
        .children
        .first()
        .is_some_and(|&callee| g[callee].attr_str("name") == Some("Page"))
}

/// Double-binding resolution for a flow rooted at a page-method parameter.
/// Matches `…detail.value.<id>` patterns from the terminal's symbolic value
/// (or its enclosing member chain) against the tagged input map.
fn double_binding_sources(g: &Pdg, terminal: NodeId, param: NodeId) -> BTreeSet<String> {
    let mut sources = BTreeSet::new();

    let mut candidates: Vec<String> = Vec::new();
    match g.value_of(terminal) {
        SymValue::Str(s) if s.contains("detail.value") => candidates.push(s),
        SymValue::Map(m) => {
            for v in m.values() {
                if let SymValue::Str(s) = v
                    && s.contains("detail.value")
                {
                    candidates.push(s.clone());
                }
            }
        }
        _ => {}
    }
    if candidates.is_empty()
        && g[terminal]
            .parent
            .is_some_and(|p| g[p].name == "MemberExpression")
    {
        // Render the chain the terminal sits in, e.g. e.detail.value.u
        let mut outermost = g[terminal].parent.expect("checked above");
        while let Some(p) = g[outermost].parent {
            if g[p].name != "MemberExpression" {
                break;
            }
            outermost = p;
        }
        let rendered = dotted_path(g, outermost);
        if rendered.contains("detail.value") {
            candidates.push(rendered);
        }
    }

    let binding_map = g[param]
        .attr("double_binding_values")
        .and_then(|v| v.as_object());
    for candidate in candidates {
        let input_name = candidate.rsplit('.').next().unwrap_or_default();
        if let Some(map) = binding_map
            && let Some(input_type) = map.get(input_name).and_then(|v| v.as_str())
        {
            sources.insert(format!(
                "[data from double binding: {input_name}, type: {input_type}]"
            ));
        }
    }

    if sources.is_empty() {
        sources.insert(format!(
            "[data from page parameter: {}]",
            g.value_of(terminal)
        ));
    }
    sources
}

/// Resolve the sources behind one data-dep parent of a terminal node:
/// immediate declarator/assignment first, then the nearest enclosing call,
/// then the provenance walk (where a parameter counts as its own entry
/// point). The call-expression early exit is load-bearing against blowup.
fn resolve_sources(g: &mut Pdg, dep_parent: NodeId, terminal: NodeId) -> BTreeSet<String> {
    if let Some(source) = immediate_source(g, dep_parent) {
        return BTreeSet::from([source]);
    }
    if let Some(call) = nearest_call_expr(g, dep_parent) {
        let path = callee_path(g, call);
        if !path.is_empty() {
            return BTreeSet::from([path]);
        }
    }

    let mut sources = BTreeSet::new();
    let mut walk: Vec<NodeId> = vec![dep_parent];
    if let Some(cell) = g[dep_parent].value.as_ref() {
        walk.extend(cell.provenance_parents.iter().copied());
    }
    for n in walk {
        if g[n].cat != Category::Identifier {
            continue;
        }
        if is_page_method_parameter(g, n) {
            // resolve against the original terminal, not the parameter
            sources.extend(double_binding_sources(g, terminal, n));
            continue;
        }
        let found = immediate_source(g, n).or_else(|| {
            nearest_call_expr(g, n)
                .map(|call| callee_path(g, call))
                .filter(|p| !p.is_empty())
        });
        if let Some(found) = found {
            sources.insert(found);
        }
    }
    sources
}

/// Flow identifier column: the terminal's own name, or the enclosing
/// property key when the terminal sits inside a member chain used as a
/// property value (`url: e.detail.value.u` reports `url`).
fn flow_ident(g: &Pdg, terminal: NodeId) -> String {
    let own = g[terminal].ident_name().unwrap_or_default().to_owned();
    let Some(parent) = g[terminal].parent else {
        return own;
    };
    if g[parent].name != "MemberExpression" {
        return own;
    }
    let mut outermost = parent;
    while let Some(p) = g[outermost].parent {
        if g[p].name != "MemberExpression" {
            break;
        }
        outermost = p;
    }
    if let Some(prop) = g[outermost].parent
        && g[prop].name == "Property"
        && let Some(&key) = g[prop].children.first()
    {
        if let Some(name) = g[key].ident_name() {
            return name.to_owned();
        }
    }
    own
}

/// -------------------------------------------------------------------------
///  Event classification
/// -------------------------------------------------------------------------

/// First literal argument of the call: the event name.
fn event_name_of(g: &Pdg, call: NodeId) -> Option<String> {
    let &arg = g[call].children.get(1)?;
    if g[arg].name != "Literal" {
        return None;
    }
    match g[arg].literal_attribute()? {
        SymValue::Str(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Resolve the object an `on`/`emit` is called on: first the enclosing
/// `success: function(...)` pattern (the call that produced the callback
/// container), then the provenance parents of the callee's root identifier
/// for a member expression in callee position.
fn resolve_emitter(g: &Pdg, call: NodeId) -> String {
    let mut cur = call;
    while let Some(p) = g[cur].parent {
        if g[cur].cat == Category::FunctionExpression
            && g[p].name == "Property"
            && g[p]
                .children
                .first()
                .is_some_and(|&k| g[k].ident_name() == Some("success"))
            && let Some(obj_expr) = g[p].parent
            && let Some(outer) = g[obj_expr].parent
            && g[outer].name == "CallExpression"
        {
            return callee_path(g, outer);
        }
        cur = p;
    }

    let Some(&callee) = g[call].children.first() else {
        return String::new();
    };
    if g[callee].name != "MemberExpression" {
        return String::new();
    }
    let mut root = callee;
    while g[root].name == "MemberExpression" {
        match g[root].children.first() {
            Some(&c) => root = c,
            None => break,
        }
    }
    if g[root].cat != Category::Identifier {
        return String::new();
    }
    let prov = g[root]
        .value
        .as_ref()
        .map(|c| c.provenance_parents.clone())
        .unwrap_or_default();
    for n in prov {
        let mut member = n;
        while let Some(p) = g[member].parent {
            if g[p].name != "MemberExpression" {
                break;
            }
            member = p;
        }
        if g[member].name == "MemberExpression" && g[member].role.as_deref() == Some("callee") {
            return dotted_path(g, member);
        }
    }
    String::new()
}

/// Sources carried by an emission: the triggering flow's sources plus every
/// argument after the event-name literal (an identifier with no data-dep
/// history contributes its computed value, i.e. its name).
fn emit_arg_sources(g: &mut Pdg, call: NodeId, sources: &mut BTreeSet<String>) {
    let args: Vec<NodeId> = g[call].children.iter().skip(2).copied().collect();
    for arg in args {
        if g[arg].cat != Category::Identifier {
            continue;
        }
        let deps = g[arg].data_dep_parents.clone();
        if deps.is_empty() {
            sources.insert(computed_value(g, arg, None).to_string());
        } else {
            for dep in deps {
                sources.extend(resolve_sources(g, dep, arg));
            }
        }
    }
}

/// -------------------------------------------------------------------------
///  Page traversal
/// -------------------------------------------------------------------------

/// Properties of the top-level `Page({...})` call whose value is a function
/// expression, in document order.
pub fn page_methods(g: &Pdg, root: NodeId) -> Vec<(String, NodeId)> {
    let mut methods = Vec::new();
    for &child in &g[root].children {
        if g[child].name != "ExpressionStatement" {
            continue;
        }
        let Some(&call) = g[child].children.first() else {
            continue;
        };
        if g[call].name != "CallExpression" {
            continue;
        }
        if g[call]
            .children
            .first()
            .is_none_or(|&c| g[c].attr_str("name") != Some("Page"))
        {
            continue;
        }
        let Some(&obj) = g[call].children.get(1) else {
            continue;
        };
        for &method_node in &g[obj].children {
            let Some(&value) = g[method_node].children.get(1) else {
                continue;
            };
            if g[value].cat != Category::FunctionExpression {
                continue;
            }
            let name = g[method_node]
                .children
                .first()
                .and_then(|&k| g[k].ident_name())
                .unwrap_or_default()
                .to_owned();
            methods.push((name, method_node));
        }
    }
    methods
}

/// Resolve all flows and events of one page into `storage`.
pub fn handle_page(g: &mut Pdg, root: NodeId, storage: &mut Storage) {
    for (method_name, method_node) in page_methods(g, root) {
        debug!(target: "taint", page = %storage.page_path, method = %method_name, "resolving page method");
        let (mut flows, mut events) = resolve_method(g, method_node, &method_name);

        // Fold subscription data sinks: a flow sourced at the `on` callee is
        // the data leaving the subscription callback.
        for ev in events.iter_mut().filter(|e| e.kind == EventKind::On) {
            if let Some(flow) = flows.iter().find(|f| f.source == ev.callee_path) {
                ev.sink = Some(flow.sink.clone());
            }
        }
        let on_paths: BTreeSet<String> = events
            .iter()
            .filter(|e| e.kind == EventKind::On)
            .map(|e| e.callee_path.clone())
            .collect();
        flows.retain(|f| !on_paths.contains(&f.source));

        storage.results.extend(flows);
        storage.events.extend(events);
    }
}

fn resolve_method(
    g: &mut Pdg,
    method_node: NodeId,
    method_name: &str,
) -> (Vec<FlowRecord>, Vec<EventRecord>) {
    let mut flows = Vec::new();
    let mut events: Vec<EventRecord> = Vec::new();
    let mut seen_events: HashSet<(u32, EventKind)> = HashSet::new();

    // iterative DFS; the visited set guards shared subtrees
    let mut stack = VecDeque::new();
    stack.push_back(method_node);
    let mut visited: HashSet<NodeId> = HashSet::new();

    while let Some(node) = stack.pop_back() {
        if !visited.insert(node) {
            continue;
        }
        for &child in g[node].children.clone().iter().rev() {
            if !visited.contains(&child) {
                stack.push_back(child);
            }
        }

        if g[node].cat != Category::Identifier
            || g[node].data_dep_parents.is_empty()
            || !g[node].data_dep_children.is_empty()
        {
            continue;
        }
        // a terminal data-flow node
        handle_terminal(
            g,
            node,
            method_name,
            &mut flows,
            &mut events,
            &mut seen_events,
        );
    }
    (flows, events)
}

fn handle_terminal(
    g: &mut Pdg,
    node: NodeId,
    method_name: &str,
    flows: &mut Vec<FlowRecord>,
    events: &mut Vec<EventRecord>,
    seen_events: &mut HashSet<(u32, EventKind)>,
) {
    let Some(call) = nearest_call_expr(g, node) else {
        return;
    };
    let sink = callee_path(g, call);
    if sink.is_empty() {
        debug!(target: "taint", "no sink api resolved, passing");
        return;
    }

    let mut sources = BTreeSet::new();
    for dep in g[node].data_dep_parents.clone() {
        sources.extend(resolve_sources(g, dep, node));
    }

    match last_segment(&sink) {
        "on" => {
            if seen_events.insert((call.0, EventKind::On))
                && let Some(event_name) = event_name_of(g, call)
            {
                let emitter = resolve_emitter(g, call);
                debug!(target: "taint", event = %event_name, %emitter, "event subscription");
                events.push(EventRecord {
                    method: method_name.to_owned(),
                    event_name,
                    kind: EventKind::On,
                    callee_path: sink,
                    call_expr: call.0,
                    sources,
                    sink: None,
                    emitter,
                });
            }
        }
        "emit" => {
            if seen_events.insert((call.0, EventKind::Emit))
                && let Some(event_name) = event_name_of(g, call)
            {
                let emitter = resolve_emitter(g, call);
                let mut all_sources = sources;
                emit_arg_sources(g, call, &mut all_sources);
                debug!(target: "taint", event = %event_name, %emitter, "event emission");
                events.push(EventRecord {
                    method: method_name.to_owned(),
                    event_name,
                    kind: EventKind::Emit,
                    callee_path: sink,
                    call_expr: call.0,
                    sources: all_sources,
                    sink: None,
                    emitter,
                });
            }
        }
        _ => {
            if sources.is_empty() {
                debug!(target: "taint", "no valid source found");
                return;
            }
            let ident = flow_ident(g, node);
            for source in sources {
                flows.push(FlowRecord {
                    method: method_name.to_owned(),
                    ident: ident.clone(),
                    source,
                    sink: sink.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Deadline, Limits};
    use crate::markup::apply_markup;
    use crate::pdg::build_pdg;
    use serde_json::{json, Value as Json};

    // small esprima-document builders -------------------------------------

    fn ident(name: &str) -> Json {
        json!({"type": "Identifier", "name": name})
    }

    fn lit(v: Json) -> Json {
        json!({"type": "Literal", "value": v, "raw": v.to_string()})
    }

    fn member(object: Json, property: Json) -> Json {
        json!({"type": "MemberExpression", "computed": false,
               "object": object, "property": property})
    }

    fn call(callee: Json, args: Vec<Json>) -> Json {
        json!({"type": "CallExpression", "callee": callee, "arguments": args})
    }

    fn prop(key: &str, value: Json) -> Json {
        json!({"type": "Property", "kind": "init", "computed": false,
               "method": false, "shorthand": false,
               "key": ident(key), "value": value})
    }

    fn object(props: Vec<Json>) -> Json {
        json!({"type": "ObjectExpression", "properties": props})
    }

    fn fun(params: Vec<Json>, body: Vec<Json>) -> Json {
        json!({"type": "FunctionExpression", "id": null, "params": params,
               "body": {"type": "BlockStatement", "body": body}})
    }

    fn expr_stmt(e: Json) -> Json {
        json!({"type": "ExpressionStatement", "expression": e})
    }

    fn var_decl(kind: &str, name: &str, init: Json) -> Json {
        json!({"type": "VariableDeclaration", "kind": kind, "declarations": [{
            "type": "VariableDeclarator", "id": ident(name), "init": init
        }]})
    }

    fn page(methods: Vec<Json>) -> Json {
        json!({"type": "Program", "body": [
            expr_stmt(call(ident("Page"), vec![object(methods)]))
        ]})
    }

    fn analyze(doc: Json, wxml: Option<&str>) -> Storage {
        let out = build_pdg(&doc, Limits::default(), Deadline::none());
        let mut g = out.graph;
        if let Some(text) = wxml {
            apply_markup(&mut g, out.root, text).unwrap();
        }
        let mut storage = Storage::new("page");
        handle_page(&mut g, out.root, &mut storage);
        storage
    }

    // scenarios ------------------------------------------------------------

    #[test]
    fn direct_flow_from_storage_to_request() {
        // Page({ onLoad(e) { const v = wx.getStorageSync('k');
        //                    wx.request({ url: v }); } })
        let doc = page(vec![prop(
            "onLoad",
            fun(
                vec![ident("e")],
                vec![
                    var_decl(
                        "const",
                        "v",
                        call(
                            member(ident("wx"), ident("getStorageSync")),
                            vec![lit(json!("k"))],
                        ),
                    ),
                    expr_stmt(call(
                        member(ident("wx"), ident("request")),
                        vec![object(vec![prop("url", ident("v"))])],
                    )),
                ],
            ),
        )]);
        let storage = analyze(doc, None);
        assert_eq!(
            storage.results,
            vec![FlowRecord {
                method: "onLoad".into(),
                ident: "v".into(),
                source: "wx.getStorageSync".into(),
                sink: "wx.request".into(),
            }]
        );
        assert!(storage.events.is_empty());
    }

    #[test]
    fn double_binding_form_input_becomes_the_source() {
        // Page({ sub(e) { wx.request({ url: e.detail.value.u }); } })
        let doc = page(vec![prop(
            "sub",
            fun(
                vec![ident("e")],
                vec![expr_stmt(call(
                    member(ident("wx"), ident("request")),
                    vec![object(vec![prop(
                        "url",
                        member(
                            member(member(ident("e"), ident("detail")), ident("value")),
                            ident("u"),
                        ),
                    )])],
                ))],
            ),
        )]);
        let wxml = r#"<form bind:submit="sub"><input name="u" type="text"/></form>"#;
        let storage = analyze(doc, Some(wxml));
        assert_eq!(
            storage.results,
            vec![FlowRecord {
                method: "sub".into(),
                ident: "url".into(),
                source: "[data from double binding: u, type: text]".into(),
                sink: "wx.request".into(),
            }]
        );
    }

    #[test]
    fn event_subscription_is_classified_not_reported() {
        // Page({ onLoad() { var ch = this.getOpenerEventChannel();
        //                   ch.on('msg', function(d){ wx.request({url: d}); }); } })
        let doc = page(vec![prop(
            "onLoad",
            fun(
                vec![],
                vec![
                    var_decl(
                        "var",
                        "ch",
                        call(
                            member(json!({"type": "ThisExpression"}), ident("getOpenerEventChannel")),
                            vec![],
                        ),
                    ),
                    expr_stmt(call(
                        member(ident("ch"), ident("on")),
                        vec![
                            lit(json!("msg")),
                            fun(
                                vec![ident("d")],
                                vec![expr_stmt(call(
                                    member(ident("wx"), ident("request")),
                                    vec![object(vec![prop("url", ident("d"))])],
                                ))],
                            ),
                        ],
                    )),
                ],
            ),
        )]);
        let storage = analyze(doc, None);
        assert!(storage.results.is_empty(), "no plain flow before stitching");
        assert_eq!(storage.events.len(), 1);
        let ev = &storage.events[0];
        assert_eq!(ev.kind, EventKind::On);
        assert_eq!(ev.event_name, "msg");
        assert_eq!(ev.method, "onLoad");
        assert_eq!(ev.emitter, "this.getOpenerEventChannel");
        assert_eq!(ev.sink.as_deref(), Some("wx.request"));
    }

    #[test]
    fn event_emission_collects_argument_sources() {
        // Page({ go() { wx.navigateTo({ url: 'p',
        //     success: function(res){ res.eventChannel.emit('msg', userData); } }); } })
        let doc = page(vec![prop(
            "go",
            fun(
                vec![],
                vec![expr_stmt(call(
                    member(ident("wx"), ident("navigateTo")),
                    vec![object(vec![
                        prop("url", lit(json!("p"))),
                        prop(
                            "success",
                            fun(
                                vec![ident("res")],
                                vec![expr_stmt(call(
                                    member(
                                        member(ident("res"), ident("eventChannel")),
                                        ident("emit"),
                                    ),
                                    vec![lit(json!("msg")), ident("userData")],
                                ))],
                            ),
                        ),
                    ])],
                ))],
            ),
        )]);
        let storage = analyze(doc, None);
        assert!(storage.results.is_empty());
        assert_eq!(storage.events.len(), 1);
        let ev = &storage.events[0];
        assert_eq!(ev.kind, EventKind::Emit);
        assert_eq!(ev.event_name, "msg");
        assert_eq!(ev.emitter, "wx.navigateTo");
        assert!(ev.sources.contains("userData"));
        assert!(ev.sources.contains("wx.navigateTo"));
    }

    #[test]
    fn subscription_and_emission_stitch_across_pages() {
        use crate::interpage::resolve_inter_page_flows;
        use crate::storage::{InterPageStore, PageSummary};

        let receiver = page(vec![prop(
            "onLoad",
            fun(
                vec![],
                vec![
                    var_decl(
                        "var",
                        "ch",
                        call(
                            member(json!({"type": "ThisExpression"}), ident("getOpenerEventChannel")),
                            vec![],
                        ),
                    ),
                    expr_stmt(call(
                        member(ident("ch"), ident("on")),
                        vec![
                            lit(json!("msg")),
                            fun(
                                vec![ident("d")],
                                vec![expr_stmt(call(
                                    member(ident("wx"), ident("request")),
                                    vec![object(vec![prop("url", ident("d"))])],
                                ))],
                            ),
                        ],
                    )),
                ],
            ),
        )]);
        let sender = page(vec![prop(
            "go",
            fun(
                vec![],
                vec![expr_stmt(call(
                    member(ident("wx"), ident("navigateTo")),
                    vec![object(vec![
                        prop("url", lit(json!("p"))),
                        prop(
                            "success",
                            fun(
                                vec![ident("res")],
                                vec![expr_stmt(call(
                                    member(
                                        member(ident("res"), ident("eventChannel")),
                                        ident("emit"),
                                    ),
                                    vec![lit(json!("msg")), ident("userData")],
                                ))],
                            ),
                        ),
                    ])],
                ))],
            ),
        )]);

        let mut store = InterPageStore::default();
        for (name, doc) in [("receiver", receiver), ("sender", sender)] {
            let storage = analyze(doc, None);
            store.add_page(&PageSummary {
                page: name.into(),
                flows: storage.results,
                events: storage.events,
                started: 0,
                finished: 0,
                timed_out: false,
            });
        }

        let flows = resolve_inter_page_flows(&store);
        assert_eq!(flows.len(), 1);
        let flow = &flows[0];
        assert_eq!(flow.from_page, "sender");
        assert_eq!(flow.to_page, "receiver");
        assert_eq!(flow.event_name, "msg");
        assert_eq!(flow.source, "userData");
        assert_eq!(flow.sink, "wx.request");
    }

    #[test]
    fn config_filter_keeps_matching_flows_only() {
        use crate::config::TaintConfig;
        use crate::storage::filter_flows;

        let doc = page(vec![prop(
            "onLoad",
            fun(
                vec![ident("e")],
                vec![
                    var_decl(
                        "const",
                        "v",
                        call(member(ident("wx"), ident("getStorageSync")), vec![lit(json!("k"))]),
                    ),
                    expr_stmt(call(
                        member(ident("wx"), ident("request")),
                        vec![object(vec![prop("url", ident("v"))])],
                    )),
                ],
            ),
        )]);
        let storage = analyze(doc, None);
        let cfg = TaintConfig {
            sources: vec!["wx.getStorageSync".into()],
            sinks: vec!["wx.request".into()],
        };
        assert_eq!(filter_flows(storage.results.clone(), &cfg).len(), 1);

        let other = TaintConfig {
            sources: vec!["wx.getLocation".into()],
            sinks: vec!["wx.request".into()],
        };
        assert!(filter_flows(storage.results, &other).is_empty());
    }

    #[test]
    fn resolver_is_deterministic_across_runs() {
        let doc = page(vec![prop(
            "onLoad",
            fun(
                vec![ident("e")],
                vec![
                    var_decl(
                        "const",
                        "v",
                        call(member(ident("wx"), ident("getStorageSync")), vec![lit(json!("k"))]),
                    ),
                    expr_stmt(call(
                        member(ident("wx"), ident("request")),
                        vec![object(vec![prop("url", ident("v"))])],
                    )),
                ],
            ),
        )]);
        let a = analyze(doc.clone(), None);
        let b = analyze(doc, None);
        assert_eq!(a.results, b.results);
        assert_eq!(a.events, b.events);
    }

    #[test]
    fn dotted_path_renders_this_chains() {
        let doc = json!({"type": "Program", "body": [expr_stmt(call(
            member(member(json!({"type": "ThisExpression"}), ident("a")), ident("b")),
            vec![]
        ))]});
        let out = build_pdg(&doc, Limits::default(), Deadline::none());
        let g = out.graph;
        let call_node = g
            .node_ids()
            .find(|&id| g[id].name == "CallExpression")
            .unwrap();
        assert_eq!(callee_path(&g, call_node), "this.a.b");
    }
}
