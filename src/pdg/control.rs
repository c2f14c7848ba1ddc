use crate::pdg::node::{CtrlLabel, NodeId, Pdg, CONDITIONAL, EPSILON, UNSTRUCTURED};

/// Attach a non-statement child to its nearest enclosing statement.
fn link_expression(g: &mut Pdg, node: NodeId, parent: NodeId) {
    if !g[node].is_comment() {
        g.set_statement_dep(parent, node);
    }
}

/// Non-conditional statements: statement children chain with ε labels,
/// everything else hangs off the statement.
fn epsilon_statement_cf(g: &mut Pdg, node: NodeId) {
    for child in g[node].children.clone() {
        if g[child].is_statement() {
            g.set_control_dep(node, child, CtrlLabel::Eps);
        } else {
            link_expression(g, child, node);
        }
    }
}

/// DoWhileStatement: body, then test.
fn do_while_cf(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if let Some(&body) = children.first() {
        g.set_control_dep(node, body, CtrlLabel::True);
    }
    if let Some(&test) = children.get(1) {
        link_expression(g, test, node);
    }
}

/// For / ForIn / ForOf: every non-body child is a statement dependency,
/// the body runs under `true`.
fn for_cf(g: &mut Pdg, node: NodeId) {
    for child in g[node].children.clone() {
        if g[child].role.as_deref() != Some("body") {
            link_expression(g, child, node);
        } else if !g[child].is_comment() {
            g.set_control_dep(node, child, CtrlLabel::True);
        }
    }
}

/// IfStatement / ConditionalExpression: test, consequent, optional alternate.
fn if_cf(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if let Some(&test) = children.first() {
        link_expression(g, test, node);
    }
    if let Some(&consequent) = children.get(1) {
        g.set_control_dep(node, consequent, CtrlLabel::True);
        if let Some(&alternate) = children.get(2)
            && !g[alternate].is_comment()
        {
            g.set_control_dep(node, alternate, CtrlLabel::False);
        }
    }
}

/// TryStatement: block under `true`, handler under `false`, finalizer ε.
fn try_cf(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if let Some(&block) = children.first() {
        g.set_control_dep(node, block, CtrlLabel::True);
    }
    if let Some(&second) = children.get(1) {
        if g[second].role.as_deref() == Some("handler") {
            g.set_control_dep(node, second, CtrlLabel::False);
        } else {
            g.set_control_dep(node, second, CtrlLabel::Eps);
        }
    }
    if let Some(&third) = children.get(2)
        && g[third].role.as_deref() == Some("finalizer")
    {
        g.set_control_dep(node, third, CtrlLabel::Eps);
    }
}

/// WhileStatement: test, body under `true`.
fn while_cf(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if let Some(&test) = children.first() {
        link_expression(g, test, node);
    }
    if let Some(&body) = children.get(1) {
        g.set_control_dep(node, body, CtrlLabel::True);
    }
}

/// SwitchStatement: discriminant, then the case chain. The first case hangs
/// off the switch with ε; each following case is the `false` continuation of
/// the previous one. The last case is wired as the unconditional default
/// fall-through, a known approximation of real switch semantics.
fn switch_cf(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    let Some(&discriminant) = children.first() else {
        return;
    };
    link_expression(g, discriminant, node);
    if children.len() > 1 {
        g.set_control_dep(node, children[1], CtrlLabel::Eps);
        switch_case_cf(g, children[1], false);
        for i in 2..children.len() {
            if g[children[i]].is_comment() {
                continue;
            }
            g.set_control_dep(children[i - 1], children[i], CtrlLabel::False);
            switch_case_cf(g, children[i], i == children.len() - 1);
        }
    }
}

fn switch_case_cf(g: &mut Pdg, node: NodeId, last: bool) {
    let children = g[node].children.clone();
    match children.len() {
        0 => {}
        1 => g.set_control_dep(node, children[0], CtrlLabel::True),
        _ => {
            let start = if last {
                0
            } else {
                link_expression(g, children[0], node);
                1
            };
            for &child in &children[start..] {
                if !g[child].is_comment() {
                    g.set_control_dep(node, child, CtrlLabel::True);
                }
            }
        }
    }
}

fn conditional_statement_cf(g: &mut Pdg, node: NodeId) {
    match g[node].name.as_str() {
        "DoWhileStatement" => do_while_cf(g, node),
        "ForStatement" | "ForOfStatement" | "ForInStatement" => for_cf(g, node),
        "IfStatement" | "ConditionalExpression" => if_cf(g, node),
        "WhileStatement" => while_cf(g, node),
        "TryStatement" => try_cf(g, node),
        "SwitchStatement" => switch_cf(g, node),
        "SwitchCase" => {} // handled by the enclosing switch
        _ => {}
    }
}

/// Enhance the graph with statement and control dependencies.
pub fn control_flow(g: &mut Pdg, node: NodeId) {
    for child in g[node].children.clone() {
        let name = g[child].name.as_str();
        if EPSILON.contains(name) || UNSTRUCTURED.contains(name) {
            epsilon_statement_cf(g, child);
        } else if CONDITIONAL.contains(name) {
            conditional_statement_cf(g, child);
        } else {
            for grandchild in g[child].children.clone() {
                link_expression(g, grandchild, child);
            }
        }
        control_flow(g, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::pdg::ast::build_graph;
    use serde_json::json;

    fn graph_for(doc: serde_json::Value) -> (Pdg, NodeId) {
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        control_flow(&mut g, root);
        (g, root)
    }

    #[test]
    fn if_branches_get_boolean_labels() {
        let (g, root) = graph_for(json!({
            "type": "Program",
            "body": [{
                "type": "IfStatement",
                "test": {"type": "Literal", "value": true, "raw": "true"},
                "consequent": {"type": "BlockStatement", "body": []},
                "alternate": {"type": "BlockStatement", "body": []}
            }]
        }));
        let if_stmt = g[root].children[0];
        let labels: Vec<CtrlLabel> = g[if_stmt]
            .control_dep_children
            .iter()
            .map(|(_, l)| *l)
            .collect();
        assert_eq!(labels, vec![CtrlLabel::True, CtrlLabel::False]);
        assert_eq!(g[if_stmt].statement_dep_children.len(), 1, "test is a statement dep");
    }

    #[test]
    fn statement_dep_targets_are_descendants() {
        let (g, root) = graph_for(json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "callee": {"type": "Identifier", "name": "f"},
                    "arguments": []
                }
            }]
        }));
        for id in g.node_ids() {
            for &dep in &g[id].statement_dep_children {
                assert!(g.is_descendant(id, dep));
            }
        }
        let stmt = g[root].children[0];
        assert_eq!(g[stmt].statement_dep_children.len(), 1);
    }

    #[test]
    fn switch_cases_chain_on_false() {
        let (g, root) = graph_for(json!({
            "type": "Program",
            "body": [{
                "type": "SwitchStatement",
                "discriminant": {"type": "Identifier", "name": "x"},
                "cases": [
                    {"type": "SwitchCase",
                     "test": {"type": "Literal", "value": 1, "raw": "1"},
                     "consequent": [{"type": "BreakStatement", "label": null}]},
                    {"type": "SwitchCase", "test": null,
                     "consequent": [{"type": "BreakStatement", "label": null}]}
                ]
            }]
        }));
        let switch = g[root].children[0];
        let first_case = g[switch].children[1];
        let second_case = g[switch].children[2];
        assert!(g[switch]
            .control_dep_children
            .iter()
            .any(|(n, l)| *n == first_case && *l == CtrlLabel::Eps));
        assert!(g[first_case]
            .control_dep_children
            .iter()
            .any(|(n, l)| *n == second_case && *l == CtrlLabel::False));
    }

    #[test]
    fn while_body_runs_under_true() {
        let (g, root) = graph_for(json!({
            "type": "Program",
            "body": [{
                "type": "WhileStatement",
                "test": {"type": "Literal", "value": true, "raw": "true"},
                "body": {"type": "BlockStatement", "body": []}
            }]
        }));
        let w = g[root].children[0];
        assert_eq!(g[w].control_dep_children.len(), 1);
        assert_eq!(g[w].control_dep_children[0].1, CtrlLabel::True);
    }
}
