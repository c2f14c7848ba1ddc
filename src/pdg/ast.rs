use crate::pdg::node::{Category, NodeId, Pdg};
use serde_json::{Map, Value as Json};
use tracing::debug;

/// Attribute keys that stay on the node even when their payload is a
/// mapping or a list.
const ATTR_KEYS: [&str; 5] = ["filename", "loc", "range", "value", "regex"];

/// Convert a parser-produced AST document into the node graph, under `root`.
///
/// Rules:
/// - `filename`, `loc`, `range`, `value`, `regex` and every leaf scalar
///   become attributes of the current node;
/// - mapping-valued keys carrying a `type` field become one child with the
///   key as role label;
/// - list-valued keys become N children with the same role, each flagged as
///   a list member so singleton lists survive the rebuild;
/// - `null` inside a list becomes a placeholder `None` node (sparse
///   destructuring such as `[, a] = arr`);
/// - comments are never attached.
pub fn ast_to_nodes(g: &mut Pdg, ast: &Map<String, Json>, node: NodeId) {
    for (key, val) in ast {
        let is_attr = ATTR_KEYS.contains(&key.as_str())
            || (key != "type" && !val.is_array() && !val.is_object());
        if is_attr {
            g.set_attr(node, key, val.clone());
        }
        match val {
            Json::Object(inner) => {
                if key == "range" {
                    // leadingComments store range as a mapping
                    g.set_attr(node, key, val.clone());
                } else {
                    create_node(g, Some(inner), key, node, false);
                }
            }
            Json::Array(items) => {
                if items.is_empty() {
                    // e.g. params: []
                    g.set_attr(node, key, val.clone());
                }
                for el in items {
                    match el {
                        Json::Object(inner) => create_node(g, Some(inner), key, node, true),
                        Json::Null => create_node(g, None, key, node, true),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
}

fn create_node(
    g: &mut Pdg,
    dico: Option<&Map<String, Json>>,
    role: &str,
    parent: NodeId,
    in_list: bool,
) {
    match dico {
        // Placeholder keeping the slot of a sparse destructuring element.
        None => {
            let node = g.add_node("None", Some(parent));
            g.attach(parent, node);
            g[node].role = Some(role.to_owned());
            g[node].in_list = in_list;
        }
        Some(dico) => {
            let Some(type_name) = dico.get("type").and_then(Json::as_str) else {
                return; // `loc` and friends carry no type
            };
            if super::node::COMMENTS.contains(type_name) {
                return;
            }
            let node = g.add_node(type_name, Some(parent));
            g.attach(parent, node);
            g[node].role = Some(role.to_owned());
            g[node].in_list = in_list;
            ast_to_nodes(g, dico, node);
        }
    }
}

/// Build the graph for a whole parser document. The document's own `type` is
/// discarded; the fresh `Program` root stands for it.
pub fn build_graph(g: &mut Pdg, doc: &Json) -> NodeId {
    let root = g.add_node("Program", None);
    if let Json::Object(map) = doc {
        ast_to_nodes(g, map, root);
    } else {
        debug!(target: "pdg", "AST document is not an object, producing an empty program");
    }
    root
}

/// Hoist `FunctionDeclaration` nodes to the front of their enclosing
/// function block, so calls placed before the declaration still resolve.
pub fn function_hoisting(g: &mut Pdg, node: NodeId, entry: NodeId) {
    for child in g[node].children.clone() {
        match g[child].cat {
            Category::FunctionDeclaration => {
                g.adopt_child(child, entry);
                function_hoisting(g, child, child);
            }
            Category::FunctionExpression => {
                function_hoisting(g, child, child);
            }
            _ => function_hoisting(g, child, entry),
        }
    }
}

/// Rebuild an AST JSON document from the graph (self-check path). Attribute
/// payloads win over re-assembled children, which restores the original
/// leaf data untouched.
pub fn to_json(g: &Pdg, node: NodeId) -> Json {
    let n = &g[node];
    let mut dico = Map::new();
    if n.name != "None" {
        dico.insert("type".to_owned(), Json::String(n.name.clone()));
    }
    for &child in &n.children {
        let role = g[child].role.clone().unwrap_or_default();
        let mut rebuilt = to_json(g, child);
        if g[child].in_list {
            // An empty rebuild stands for the sparse-destructuring hole.
            if rebuilt.as_object().is_some_and(Map::is_empty) {
                rebuilt = Json::Null;
            }
            dico.entry(role)
                .or_insert_with(|| Json::Array(Vec::new()))
                .as_array_mut()
                .expect("list role holds an array")
                .push(rebuilt);
        } else {
            dico.insert(role, rebuilt);
        }
    }
    for (k, v) in &n.attributes {
        dico.insert(k.clone(), v.clone());
    }
    Json::Object(dico)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use serde_json::json;

    fn sample_program() -> Json {
        json!({
            "type": "Program",
            "body": [
                {
                    "type": "VariableDeclaration",
                    "declarations": [
                        {
                            "type": "VariableDeclarator",
                            "id": {"type": "Identifier", "name": "x", "range": [6, 7]},
                            "init": {"type": "Literal", "value": 1, "raw": "1", "range": [10, 11]},
                            "range": [6, 11]
                        }
                    ],
                    "kind": "const",
                    "range": [0, 12]
                }
            ],
            "sourceType": "script",
            "range": [0, 12]
        })
    }

    #[test]
    fn adapter_classifies_and_attaches() {
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &sample_program());
        assert_eq!(g[root].children.len(), 1);
        let decl = g[root].children[0];
        assert_eq!(g[decl].name, "VariableDeclaration");
        assert!(g[decl].is_statement());
        assert_eq!(g[decl].attr_str("kind"), Some("const"));
        let declarator = g[decl].children[0];
        let id = g[declarator].children[0];
        assert_eq!(g[id].cat, Category::Identifier);
        assert_eq!(g[id].ident_name(), Some("x"));
        assert_eq!(g[id].role.as_deref(), Some("id"));
        assert!(!g[id].in_list);
        assert!(g[declarator].in_list, "declarations are list children");
    }

    #[test]
    fn round_trip_preserves_document() {
        let doc = sample_program();
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        assert_eq!(to_json(&g, root), doc);
    }

    #[test]
    fn sparse_destructuring_keeps_placeholder() {
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "AssignmentExpression",
                    "operator": "=",
                    "left": {
                        "type": "ArrayPattern",
                        "elements": [null, {"type": "Identifier", "name": "a"}]
                    },
                    "right": {"type": "Identifier", "name": "arr"}
                }
            }]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        assert_eq!(to_json(&g, root), doc);
    }

    #[test]
    fn hoisting_moves_function_declarations_first() {
        let doc = json!({
            "type": "Program",
            "body": [
                {"type": "ExpressionStatement", "expression": {
                    "type": "CallExpression",
                    "callee": {"type": "Identifier", "name": "f"},
                    "arguments": []
                }},
                {"type": "FunctionDeclaration",
                 "id": {"type": "Identifier", "name": "f"},
                 "params": [],
                 "body": {"type": "BlockStatement", "body": []}}
            ]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        function_hoisting(&mut g, root, root);
        let first = g[root].children[0];
        assert_eq!(g[first].name, "FunctionDeclaration");
    }

    #[test]
    fn comments_are_dropped() {
        let doc = json!({
            "type": "Program",
            "body": [],
            "comments": [{"type": "Line", "value": " hi"}]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        assert!(g[root].children.is_empty());
    }
}
