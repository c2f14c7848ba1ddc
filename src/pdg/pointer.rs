use crate::pdg::node::{Category, NodeId, Pdg, SymValue, GLOBAL_VAR};
use crate::pdg::value::{computed_value, compute_member_no_compute, compute_operators, Operand};
use std::collections::BTreeMap;
use tracing::debug;

/// Child-index path from `begin` down to `destination`.
fn get_node_path(g: &Pdg, begin: NodeId, destination: NodeId, path: &mut Vec<usize>) -> bool {
    if begin == destination {
        return true;
    }
    for (i, &child) in g[begin].children.iter().enumerate() {
        path.push(i);
        if get_node_path(g, child, destination, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Walk `path` from `begin`; on asymmetric destructuring (an identifier on
/// one side against a shorter structure on the other) the walk stops at the
/// deepest reachable node.
fn find_node(g: &Pdg, begin: NodeId, path: &[usize]) -> NodeId {
    let mut current = begin;
    for &child_nb in path {
        match g[current].children.get(child_nb) {
            Some(&next) => current = next,
            None => return current,
        }
    }
    current
}

/// Climb out of a member chain. Returns (found a member ancestor, the
/// furthest member-expression node or the identifier itself, whether the
/// chain roots at `window`/`this`).
fn get_member_expression(g: &mut Pdg, node: NodeId) -> (bool, NodeId, bool) {
    let Some(parent) = g[node].parent else {
        return (false, node, false);
    };
    if g[parent].name != "MemberExpression" {
        return (false, node, false);
    }
    let mut current = node;
    while let Some(parent) = g[current].parent {
        if g[parent].name != "MemberExpression" {
            break;
        }
        let root = g[parent].children[0];
        let root_is_global = g[root].name == "ThisExpression" || {
            let v = computed_value(g, root, None);
            v.as_str().is_some_and(|s| GLOBAL_VAR.contains(s))
        };
        if root_is_global {
            return (false, current, true);
        }
        current = parent;
    }
    (true, current, false)
}

/// Map identifiers of a declarator / assignment / property to the value on
/// the other side, walking symmetric paths on both sides so destructuring
/// patterns land on the right leaves.
pub fn map_var2value(
    g: &mut Pdg,
    node: NodeId,
    identifiers: &[NodeId],
    operator: Option<&str>,
) {
    if !matches!(
        g[node].name.as_str(),
        "VariableDeclarator" | "AssignmentExpression" | "Property"
    ) {
        // Callers also hand over right-hand-side constructs that are no
        // declarations anymore.
        return;
    }
    let children = g[node].children.clone();
    let (Some(&var), Some(&init)) = (children.first(), children.get(1)) else {
        return;
    };

    for &decl in identifiers {
        g.set_stale(decl, true);
        let (member_expr, decl, this_window) = get_member_expression(g, decl);

        let mut path = Vec::new();
        get_node_path(g, var, decl, &mut path);
        if this_window {
            // Jump over the member-expression parent to keep the symmetry.
            path.pop();
        }

        // An identifier initializer already carrying a node reference: walk
        // the path from the referenced node instead.
        let init_ref = (g[init].cat == Category::Identifier)
            .then(|| match g.value_of(init) {
                SymValue::Ref(r) => Some(r),
                _ => None,
            })
            .flatten();
        let value_node = find_node(g, init_ref.unwrap_or(init), &path);

        let value = match operator {
            None => computed_value(g, value_node, Some(decl)),
            // Augmented assignment: old value ⊕ right-hand side.
            Some(op) => compute_operators(
                g,
                op,
                Operand::Node(decl),
                Operand::Node(value_node),
                Some(decl),
            ),
        };

        if !member_expr {
            debug!(
                target: "pdg",
                "assigning {value} to {}", g[decl].ident_name().unwrap_or("?")
            );
            g.set_value(decl, value);
            if g[value_node].cat == Category::FunctionExpression {
                g.set_fun_name(value_node, decl);
            }
        } else {
            let resolved = compute_member_no_compute(g, decl, Some(decl));
            match resolved {
                SymValue::Ref(leaf) if g[leaf].value.is_some() => {
                    // The object is known: write into the resolved leaf.
                    g.set_value(leaf, value);
                    g.set_provenance_rec(leaf, value_node);
                }
                _ => {
                    // Host-provided object: synthesize the property chain as
                    // a mapping on the root identifier.
                    let (obj, all_props) = define_obj_properties(g, decl, value);
                    if let Some(obj) = obj {
                        g.set_value(obj, all_props);
                        g.set_provenance_rec(obj, value_node);
                    }
                }
            }
        }
    }
}

/// `x++` / `x--`: apply the operator to the stored value.
pub fn compute_update_expression(g: &mut Pdg, node: NodeId, identifier: NodeId) {
    g.set_stale(identifier, true);
    let operator = g[node].attr_str("operator").unwrap_or_default().to_owned();
    let value = compute_operators(
        g,
        &operator,
        Operand::Node(identifier),
        Operand::Val(SymValue::Num(0.0)),
        None,
    );
    g.set_value(identifier, value);
}

/// Identifier / literal members of a member chain, skipping the globals.
fn search_properties(g: &mut Pdg, node: NodeId, found: &mut Vec<NodeId>) {
    if g[node].cat == Category::Identifier || g[node].name == "Literal" {
        let v = computed_value(g, node, None);
        if !v.as_str().is_some_and(|s| GLOBAL_VAR.contains(s)) {
            found.push(node);
        }
    }
    for child in g[node].children.clone() {
        search_properties(g, child, found);
    }
}

/// Build `{prop0: {prop1: {…: value}}}` for a write into an object we have
/// no definition for, merging into whatever the root already holds.
fn define_obj_properties(
    g: &mut Pdg,
    member_node: NodeId,
    value: SymValue,
) -> (Option<NodeId>, SymValue) {
    let mut properties = Vec::new();
    search_properties(g, member_node, &mut properties);
    if properties.is_empty() {
        return (None, SymValue::Null);
    }

    let obj = properties[0];
    let obj_init = computed_value(g, obj, None);
    let property_values: Vec<String> = properties[1..]
        .iter()
        .map(|&p| computed_value(g, p, None).to_string())
        .collect();
    if property_values.is_empty() {
        return (Some(obj), value);
    }

    let mut all_props: BTreeMap<String, SymValue> = match obj_init {
        SymValue::Map(m) => m,
        // A previous scalar value survives as a property of its own.
        SymValue::Str(s) => BTreeMap::from([(s, SymValue::Map(BTreeMap::new()))]),
        _ => BTreeMap::new(),
    };

    {
        let mut cursor = &mut all_props;
        for prop in &property_values[..property_values.len() - 1] {
            let entry = cursor
                .entry(prop.clone())
                .or_insert_with(|| SymValue::Map(BTreeMap::new()));
            if !matches!(entry, SymValue::Map(_)) {
                *entry = SymValue::Map(BTreeMap::new());
            }
            let SymValue::Map(next) = entry else { unreachable!() };
            cursor = next;
        }
        cursor.insert(property_values[property_values.len() - 1].clone(), value);
    }

    (Some(obj), SymValue::Map(all_props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::pdg::ast::build_graph;
    use serde_json::json;

    #[test]
    fn path_walks_are_symmetric() {
        // const [a, b] = [1, 2];
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "VariableDeclaration", "kind": "const",
                "declarations": [{
                    "type": "VariableDeclarator",
                    "id": {"type": "ArrayPattern", "elements": [
                        {"type": "Identifier", "name": "a"},
                        {"type": "Identifier", "name": "b"}
                    ]},
                    "init": {"type": "ArrayExpression", "elements": [
                        {"type": "Literal", "value": 1, "raw": "1"},
                        {"type": "Literal", "value": 2, "raw": "2"}
                    ]}
                }]
            }]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        let declarator = g[g[g[root].children[0]].children[0]].id;
        let pattern = g[declarator].children[0];
        let b = g[pattern].children[1];

        map_var2value(&mut g, declarator, &[b], None);
        assert_eq!(g.value_of(b), SymValue::Num(2.0));
    }

    #[test]
    fn identifier_alias_keeps_reference() {
        // const o = {}; (o gets a Ref value) then x = o resolves through it
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "VariableDeclaration", "kind": "var",
                "declarations": [{
                    "type": "VariableDeclarator",
                    "id": {"type": "Identifier", "name": "x"},
                    "init": {"type": "ObjectExpression", "properties": []}
                }]
            }]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        let declarator = g[g[g[root].children[0]].children[0]].id;
        let x = g[declarator].children[0];
        let obj = g[declarator].children[1];
        map_var2value(&mut g, declarator, &[x], None);
        assert_eq!(g.value_of(x), SymValue::Ref(obj));
    }

    #[test]
    fn update_expression_applies_operator() {
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "UpdateExpression", "operator": "++", "prefix": false,
                    "argument": {"type": "Identifier", "name": "i"}
                }
            }]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        let update = g[g[root].children[0]].children[0];
        let i = g[update].children[0];
        g.set_value(i, SymValue::Num(1.0));
        compute_update_expression(&mut g, update, i);
        assert_eq!(g.value_of(i), SymValue::Num(2.0));
    }

    #[test]
    fn member_write_on_builtin_synthesizes_property_chain() {
        // app.globalData.token = "s"
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "AssignmentExpression", "operator": "=",
                    "left": {
                        "type": "MemberExpression", "computed": false,
                        "object": {
                            "type": "MemberExpression", "computed": false,
                            "object": {"type": "Identifier", "name": "app"},
                            "property": {"type": "Identifier", "name": "globalData"}
                        },
                        "property": {"type": "Identifier", "name": "token"}
                    },
                    "right": {"type": "Literal", "value": "s", "raw": "\"s\""}
                }
            }]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        let assign = g[g[root].children[0]].children[0];
        let outer_member = g[assign].children[0];
        let inner_member = g[outer_member].children[0];
        let app = g[inner_member].children[0];

        map_var2value(&mut g, assign, &[app], None);
        let SymValue::Map(m) = g.value_of(app) else {
            panic!("expected a synthesized map on the root identifier");
        };
        let SymValue::Map(inner) = &m["globalData"] else {
            panic!("expected nested map");
        };
        assert_eq!(inner["token"], SymValue::Str("s".into()));
    }
}
