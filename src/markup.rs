//! Markup-input extractor: reads a page's markup file, collects each form's
//! submit handler and input types, and tags the handler's first parameter
//! node with the `double_binding_values` mapping.

use crate::errors::TaintResult;
use crate::pdg::node::{Category, NodeId, Pdg};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct FormProps {
    bind_submit: Option<String>,
    /// input name (or id) → input type
    inputs: BTreeMap<String, String>,
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        (a.key.as_ref() == name.as_bytes())
            .then(|| String::from_utf8_lossy(&a.value).into_owned())
    })
}

fn has_attr(e: &BytesStart<'_>, name: &str) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == name.as_bytes())
}

fn is_form_tag(name: &[u8]) -> bool {
    name == b"form" || name == b"g-form"
}

fn is_input_tag(name: &[u8]) -> bool {
    name == b"input" || name == b"g-input"
}

fn record_input(form: &mut FormProps, e: &BytesStart<'_>) {
    let Some(key) = attr_value(e, "name").or_else(|| attr_value(e, "id")) else {
        return;
    };
    // Password inputs are always typed "password".
    if has_attr(e, "password") || attr_value(e, "type").as_deref() == Some("safe-password") {
        form.inputs.insert(key, "password".to_owned());
    } else if let Some(t) = attr_value(e, "type") {
        form.inputs.insert(key, t);
    }
}

/// Parse the markup text and collect every form's submit handler and inputs.
fn collect_forms(text: &str) -> TaintResult<Vec<FormProps>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut open_forms: Vec<FormProps> = Vec::new();
    let mut done: Vec<FormProps> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if is_form_tag(&name) {
                    open_forms.push(FormProps {
                        bind_submit: attr_value(&e, "bind:submit"),
                        inputs: BTreeMap::new(),
                    });
                } else if is_input_tag(&name) {
                    for form in &mut open_forms {
                        record_input(form, &e);
                    }
                }
            }
            Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                if is_form_tag(&name) {
                    done.push(FormProps {
                        bind_submit: attr_value(&e, "bind:submit"),
                        inputs: BTreeMap::new(),
                    });
                } else if is_input_tag(&name) {
                    for form in &mut open_forms {
                        record_input(form, &e);
                    }
                }
            }
            Event::End(e) => {
                if is_form_tag(e.name().as_ref())
                    && let Some(form) = open_forms.pop()
                {
                    done.push(form);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    done.extend(open_forms);
    Ok(done)
}

/// Find the `Page({...})` method property named `name`.
fn find_page_method_node(g: &Pdg, root: NodeId, name: &str) -> Option<NodeId> {
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
        let Some(&callee) = g[call].children.first() else {
            continue;
        };
        if g[callee].attr_str("name") != Some("Page") {
            continue;
        }
        let Some(&obj) = g[call].children.get(1) else {
            continue;
        };
        for &method_node in &g[obj].children {
            let key = g[method_node].children.first();
            if key.is_some_and(|&k| g[k].ident_name() == Some(name)) {
                return Some(method_node);
            }
        }
    }
    None
}

/// Attach the inputs map to the handler's first parameter identifier
/// (method property → function expression → first parameter).
fn tag_double_binding(g: &mut Pdg, method_node: NodeId, inputs: &BTreeMap<String, String>) {
    let Some(&fun) = g[method_node].children.get(1) else {
        return;
    };
    if !g[fun].cat.is_function() {
        return;
    }
    let param = g[fun]
        .children
        .iter()
        .copied()
        .find(|&c| g[c].role.as_deref() == Some("params") && g[c].cat == Category::Identifier);
    let Some(param) = param else {
        debug!(target: "taint", "submit handler takes no parameter, nothing to tag");
        return;
    };
    let mut map = Map::new();
    for (k, v) in inputs {
        map.insert(k.clone(), Json::String(v.clone()));
    }
    g.set_attr(param, "double_binding_values", Json::Object(map));
}

/// Apply the form/input mapping of `text` onto the page graph.
pub fn apply_markup(g: &mut Pdg, root: NodeId, text: &str) -> TaintResult<()> {
    for form in collect_forms(text)? {
        let Some(bind_submit) = form.bind_submit else {
            continue;
        };
        match find_page_method_node(g, root, &bind_submit) {
            Some(method_node) => tag_double_binding(g, method_node, &form.inputs),
            None => debug!(target: "taint", "no page method named {bind_submit}"),
        }
    }
    Ok(())
}

/// Read and apply a markup file; a broken file only costs its own bindings.
pub fn handle_markup(g: &mut Pdg, root: NodeId, path: &Path) {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            warn!(target: "taint", "cannot read {}: {e}", path.display());
            return;
        }
    };
    if let Err(e) = apply_markup(g, root, &text) {
        warn!(target: "taint", "markup error in {}: {e}", path.display());
    }
}
