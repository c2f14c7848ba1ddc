use crate::config::Limits;
use phf::phf_set;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::{Index, IndexMut};

/// -------------------------------------------------------------------------
///  Node taxonomy
/// -------------------------------------------------------------------------

pub static EPSILON: phf::Set<&'static str> = phf_set! {
    "BlockStatement", "DebuggerStatement", "EmptyStatement",
    "ExpressionStatement", "LabeledStatement", "ReturnStatement",
    "ThrowStatement", "WithStatement", "CatchClause", "VariableDeclaration",
    "FunctionDeclaration", "ClassDeclaration",
};

pub static CONDITIONAL: phf::Set<&'static str> = phf_set! {
    "DoWhileStatement", "ForStatement", "ForOfStatement", "ForInStatement",
    "IfStatement", "SwitchCase", "SwitchStatement", "TryStatement",
    "WhileStatement", "ConditionalExpression",
};

pub static UNSTRUCTURED: phf::Set<&'static str> = phf_set! {
    "BreakStatement", "ContinueStatement",
};

pub static CALL_EXPR: phf::Set<&'static str> = phf_set! {
    "CallExpression", "TaggedTemplateExpression", "NewExpression",
};

pub static VALUE_EXPR: phf::Set<&'static str> = phf_set! {
    "Literal", "ArrayExpression", "ObjectExpression", "ObjectPattern",
    "CallExpression", "TaggedTemplateExpression", "NewExpression",
};

pub static COMMENTS: phf::Set<&'static str> = phf_set! { "Line", "Block" };

pub static GLOBAL_VAR: phf::Set<&'static str> = phf_set! {
    "window", "this", "self", "top", "global", "that",
};

pub fn is_statement_type(t: &str) -> bool {
    EPSILON.contains(t) || CONDITIONAL.contains(t) || UNSTRUCTURED.contains(t)
}

/// Capability class of a node; decides which inline mixins it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Plain,
    Identifier,
    ValueExpr,
    Statement,
    ReturnStatement,
    FunctionDeclaration,
    FunctionExpression,
}

impl Category {
    pub fn of(type_name: &str) -> Self {
        match type_name {
            "FunctionDeclaration" => Category::FunctionDeclaration,
            "FunctionExpression" | "ArrowFunctionExpression" => Category::FunctionExpression,
            "ReturnStatement" => Category::ReturnStatement,
            "Identifier" => Category::Identifier,
            t if is_statement_type(t) => Category::Statement,
            t if VALUE_EXPR.contains(t) => Category::ValueExpr,
            _ => Category::Plain,
        }
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            Category::Statement | Category::ReturnStatement | Category::FunctionDeclaration
        )
    }

    pub fn has_value(self) -> bool {
        matches!(
            self,
            Category::Identifier | Category::ValueExpr | Category::ReturnStatement
        )
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            Category::FunctionDeclaration | Category::FunctionExpression
        )
    }
}

/// -------------------------------------------------------------------------
///  Symbolic values
/// -------------------------------------------------------------------------

/// Late-bound symbolic value of an expression. `Null` is a value of its own,
/// standing for both the JS `null` and "statically unknown".
#[derive(Debug, Clone, PartialEq)]
pub enum SymValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<SymValue>),
    Map(BTreeMap<String, SymValue>),
    /// The value lives on another node (array/object expressions, functions).
    Ref(NodeId),
}

impl SymValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SymValue::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            SymValue::Null => false,
            SymValue::Bool(b) => *b,
            SymValue::Num(n) => *n != 0.0,
            SymValue::Str(s) => !s.is_empty(),
            SymValue::List(l) => !l.is_empty(),
            SymValue::Map(m) => !m.is_empty(),
            SymValue::Ref(_) => true,
        }
    }

    /// Integer index, if the value is a whole number.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            SymValue::Num(n) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SymValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

pub fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for SymValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymValue::Null => write!(f, "null"),
            SymValue::Bool(b) => write!(f, "{b}"),
            SymValue::Num(n) => write!(f, "{}", fmt_num(*n)),
            SymValue::Str(s) => write!(f, "{s}"),
            SymValue::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            SymValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            SymValue::Ref(_) => write!(f, "<node>"),
        }
    }
}

/// Convert an AST attribute (a JSON scalar) into a symbolic value.
pub fn json_to_sym(v: &Json) -> SymValue {
    match v {
        Json::Null => SymValue::Null,
        Json::Bool(b) => SymValue::Bool(*b),
        Json::Number(n) => SymValue::Num(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => SymValue::Str(s.clone()),
        Json::Array(a) => SymValue::List(a.iter().map(json_to_sym).collect()),
        Json::Object(o) => SymValue::Map(
            o.iter()
                .map(|(k, v)| (k.clone(), json_to_sym(v)))
                .collect(),
        ),
    }
}

fn scalar_cost(v: &SymValue) -> usize {
    match v {
        SymValue::Str(s) => s.len(),
        other => other.to_string().len(),
    }
}

fn truncate_list(list: &[SymValue], out: &mut Vec<SymValue>, counter: &mut usize, limit: usize) {
    for el in list {
        match el {
            SymValue::List(inner) => {
                let mut shortened = Vec::new();
                truncate_list(inner, &mut shortened, counter, limit);
                out.push(SymValue::List(shortened));
                if *counter >= limit {
                    return;
                }
            }
            other => {
                *counter += scalar_cost(other);
                if *counter < limit {
                    out.push(other.clone());
                }
            }
        }
    }
}

fn truncate_map(
    map: &BTreeMap<String, SymValue>,
    out: &mut BTreeMap<String, SymValue>,
    counter: &mut usize,
    limit: usize,
) {
    for (k, v) in map {
        *counter += k.len();
        match v {
            SymValue::List(inner) => {
                let mut shortened = Vec::new();
                truncate_list(inner, &mut shortened, counter, limit);
                out.insert(k.clone(), SymValue::List(shortened));
                if *counter >= limit {
                    return;
                }
            }
            SymValue::Map(inner) => {
                let mut shortened = BTreeMap::new();
                truncate_map(inner, &mut shortened, counter, limit);
                out.insert(k.clone(), SymValue::Map(shortened));
                if *counter >= limit {
                    return;
                }
            }
            other => {
                *counter += scalar_cost(other);
                if *counter < limit {
                    out.insert(k.clone(), other.clone());
                }
            }
        }
    }
}

/// Bound a symbolic value to roughly `limit` characters, shape preserved.
/// The flag reports whether anything was cut.
pub fn truncate_value(value: SymValue, limit: usize) -> (SymValue, bool) {
    match value {
        SymValue::Str(s) if s.len() > limit => {
            let cut = (0..=limit).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
            (SymValue::Str(s[..cut].to_owned()), true)
        }
        SymValue::List(l) => {
            let mut counter = 0usize;
            let mut shortened = Vec::new();
            truncate_list(&l, &mut shortened, &mut counter, limit);
            if counter >= limit {
                (SymValue::List(shortened), true)
            } else {
                (SymValue::List(l), false)
            }
        }
        SymValue::Map(m) => {
            let mut counter = 0usize;
            let mut shortened = BTreeMap::new();
            truncate_map(&m, &mut shortened, &mut counter, limit);
            if counter >= limit {
                (SymValue::Map(shortened), true)
            } else {
                (SymValue::Map(m), false)
            }
        }
        v => (v, false),
    }
}

/// -------------------------------------------------------------------------
///  Graph entities
/// -------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlLabel {
    True,
    False,
    Eps,
}

/// Symbolic-value cell plus provenance bookkeeping, only on value-bearing
/// nodes (identifiers, value expressions, return statements).
#[derive(Debug, Default, Clone)]
pub struct ValueCell {
    pub value: SymValue,
    /// Forces recomputation of the cached value on next read.
    pub stale: bool,
    pub provenance_parents: Vec<NodeId>,
    pub provenance_children: Vec<NodeId>,
    pub provenance_parents_set: HashSet<NodeId>,
    pub provenance_children_set: HashSet<NodeId>,
    pub seen_provenance: HashSet<NodeId>,
}

impl Default for SymValue {
    fn default() -> Self {
        SymValue::Null
    }
}

/// Function metadata, on function-declaration and function-expression nodes.
#[derive(Debug, Default, Clone)]
pub struct FunMeta {
    pub name: Option<NodeId>,
    /// Name a FunctionExpression is referenced by inside itself.
    pub intern_name: Option<NodeId>,
    pub params: Vec<NodeId>,
    pub returns: Vec<NodeId>,
    pub retraverse: bool,
    pub called: bool,
}

impl FunMeta {
    /// Duplicates are fine, only the last return is read; consecutive
    /// repeats of the same node are skipped.
    pub fn add_return(&mut self, ret: NodeId) {
        if self.returns.last() != Some(&ret) {
            self.returns.push(ret);
        }
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    /// AST `type` of this node (`Identifier`, `CallExpression`, …).
    pub name: String,
    pub cat: Category,
    /// Field name under which this node sits in its parent (`init`, `test`,
    /// `body`, `callee`, …). Needed to rebuild the AST document.
    pub role: Option<String>,
    /// The parent stores this child inside a list, possibly a singleton one.
    pub in_list: bool,
    pub attributes: serde_json::Map<String, Json>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    pub statement_dep_parents: Vec<NodeId>,
    pub statement_dep_children: Vec<NodeId>,
    pub control_dep_parents: Vec<(NodeId, CtrlLabel)>,
    pub control_dep_children: Vec<(NodeId, CtrlLabel)>,
    pub data_dep_parents: Vec<NodeId>,
    pub data_dep_children: Vec<NodeId>,
    pub fun_param_parents: Vec<NodeId>,
    pub fun_param_children: Vec<NodeId>,

    pub value: Option<Box<ValueCell>>,
    pub fun: Option<Box<FunMeta>>,
    /// On identifiers: the function node this name stands for.
    pub fun_ref: Option<NodeId>,
}

impl Node {
    pub fn is_comment(&self) -> bool {
        COMMENTS.contains(self.name.as_str())
    }

    pub fn is_statement(&self) -> bool {
        self.cat.is_statement()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn attr(&self, key: &str) -> Option<&Json> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Json::as_str)
    }

    /// Identifier name, if any.
    pub fn ident_name(&self) -> Option<&str> {
        self.attr_str("name")
    }

    /// The attribute carrying this node's literal payload: regex pattern
    /// (rendered `/pattern/`), literal value (raw text for regex literals),
    /// or identifier name.
    pub fn literal_attribute(&self) -> Option<SymValue> {
        if let Some(regex) = self.attr("regex")
            && let Some(pattern) = regex.get("pattern")
        {
            return Some(SymValue::Str(format!(
                "/{}/",
                pattern.as_str().unwrap_or_default()
            )));
        }
        if let Some(value) = self.attr("value") {
            if let Some(raw) = value.get("raw") {
                return Some(json_to_sym(raw));
            }
            return Some(json_to_sym(value));
        }
        self.attr("name").map(json_to_sym)
    }
}

/// -------------------------------------------------------------------------
///  The arena
/// -------------------------------------------------------------------------

/// Program dependence graph: an arena of nodes addressed by stable handles.
/// Children are owned through the arena; every cross edge is a handle.
#[derive(Debug)]
pub struct Pdg {
    nodes: Vec<Node>,
    pub limits: Limits,
}

impl Index<NodeId> for Pdg {
    type Output = Node;
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Pdg {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

impl Pdg {
    pub fn new(limits: Limits) -> Self {
        Self {
            nodes: Vec::with_capacity(256),
            limits,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn add_node(&mut self, type_name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let cat = Category::of(type_name);
        self.nodes.push(Node {
            id,
            name: type_name.to_owned(),
            cat,
            role: None,
            in_list: false,
            attributes: serde_json::Map::new(),
            parent,
            children: Vec::new(),
            statement_dep_parents: Vec::new(),
            statement_dep_children: Vec::new(),
            control_dep_parents: Vec::new(),
            control_dep_children: Vec::new(),
            data_dep_parents: Vec::new(),
            data_dep_children: Vec::new(),
            fun_param_parents: Vec::new(),
            fun_param_children: Vec::new(),
            value: cat.has_value().then(Box::<ValueCell>::default),
            fun: cat.is_function().then(Box::<FunMeta>::default),
            fun_ref: None,
        });
        id
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self[parent].children.push(child);
        self[child].parent = Some(parent);
    }

    /// Re-parent `child` to the front of `step_parent`'s children (hoisting).
    pub fn adopt_child(&mut self, child: NodeId, step_parent: NodeId) {
        if let Some(old) = self[child].parent {
            let pos = self[old].children.iter().position(|c| *c == child);
            if let Some(pos) = pos {
                self[old].children.remove(pos);
            }
        }
        self[step_parent].children.insert(0, child);
        self[child].parent = Some(step_parent);
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: Json) {
        self[id].attributes.insert(key.to_owned(), value);
    }

    // ── value cell ─────────────────────────────────────────────────────

    pub fn value_of(&self, id: NodeId) -> SymValue {
        self[id]
            .value
            .as_ref()
            .map(|c| c.value.clone())
            .unwrap_or(SymValue::Null)
    }

    pub fn set_value(&mut self, id: NodeId, value: SymValue) {
        let limit = self.limits.value_size;
        if let Some(cell) = self[id].value.as_mut() {
            let (bounded, cut) = truncate_value(value, limit);
            if cut {
                tracing::warn!(target: "pdg", node = %id, "shortened an oversized symbolic value");
            }
            cell.value = bounded;
        }
    }

    pub fn set_stale(&mut self, id: NodeId, stale: bool) {
        if let Some(cell) = self[id].value.as_mut() {
            cell.stale = stale;
        }
    }

    // ── statement / control edges ──────────────────────────────────────

    pub fn set_statement_dep(&mut self, from: NodeId, to: NodeId) {
        self[from].statement_dep_children.push(to);
        self[to].statement_dep_parents.push(from);
    }

    pub fn set_control_dep(&mut self, from: NodeId, to: NodeId, label: CtrlLabel) {
        self[from].control_dep_children.push((to, label));
        self[to].control_dep_parents.push((from, label));
    }

    // ── data edges ─────────────────────────────────────────────────────

    /// Draw a data dependency from the last defining occurrence to a use.
    /// Deduplicated by destination id; provenance propagates alongside.
    pub fn set_data_dependency(&mut self, from: NodeId, to: NodeId) {
        if from == to {
            return;
        }
        if !self[from].data_dep_children.contains(&to) {
            self[from].data_dep_children.push(to);
            self[to].data_dep_parents.push(from);
        }
        self.set_provenance_dd(from, to);
    }

    pub fn set_fun_param(&mut self, def_param: NodeId, call_param: NodeId) {
        if !self[def_param].fun_param_children.contains(&call_param) {
            self[def_param].fun_param_children.push(call_param);
            self[call_param].fun_param_parents.push(def_param);
        }
    }

    // ── provenance ─────────────────────────────────────────────────────

    fn add_prov_parent(&mut self, on: NodeId, parent: NodeId) {
        if let Some(cell) = self[on].value.as_mut()
            && cell.provenance_parents_set.insert(parent)
        {
            cell.provenance_parents.push(parent);
        }
    }

    fn add_prov_child(&mut self, on: NodeId, child: NodeId) {
        if let Some(cell) = self[on].value.as_mut()
            && cell.provenance_children_set.insert(child)
        {
            cell.provenance_children.push(child);
        }
    }

    fn prov_parents(&self, id: NodeId) -> Vec<NodeId> {
        self[id]
            .value
            .as_ref()
            .map(|c| c.provenance_parents.clone())
            .unwrap_or_default()
    }

    fn prov_children(&self, id: NodeId) -> Vec<NodeId> {
        self[id]
            .value
            .as_ref()
            .map(|c| c.provenance_children.clone())
            .unwrap_or_default()
    }

    /// Provenance propagation along a data dependency `origin → dest`.
    fn set_provenance_dd(&mut self, origin: NodeId, dest: NodeId) {
        let dest_children = self.prov_children(dest);
        if dest_children.is_empty() {
            self.add_prov_child(origin, dest);
        } else {
            for child in dest_children {
                self.add_prov_child(origin, child);
            }
        }
        let origin_parents = self.prov_parents(origin);
        if origin_parents.is_empty() {
            self.add_prov_parent(dest, origin);
        } else {
            for parent in origin_parents {
                self.add_prov_parent(dest, parent);
            }
        }
    }

    /// `extremity` was consulted to compute the value of `on`.
    pub fn set_provenance(&mut self, on: NodeId, extremity: NodeId) {
        if on == extremity {
            return;
        }
        if let Some(cell) = self[on].value.as_mut() {
            if !cell.seen_provenance.insert(extremity) {
                return;
            }
        } else {
            return;
        }

        if self[extremity].value.is_some() {
            let ext_parents = self.prov_parents(extremity);
            if ext_parents.is_empty() {
                self.add_prov_parent(on, extremity);
            } else {
                for parent in ext_parents {
                    self.add_prov_parent(on, parent);
                }
            }
            let on_children = self.prov_children(on);
            if on_children.is_empty() {
                self.add_prov_child(extremity, on);
            } else {
                for child in on_children {
                    self.add_prov_child(extremity, child);
                }
            }
        } else {
            self.add_prov_parent(on, extremity);
            for child in self[extremity].children.clone() {
                self.set_provenance(on, child);
            }
        }
    }

    pub fn set_provenance_rec(&mut self, on: NodeId, extremity: NodeId) {
        self.set_provenance(on, extremity);
        for child in self[extremity].children.clone() {
            self.set_provenance_rec(on, child);
        }
    }

    // ── function metadata ──────────────────────────────────────────────

    /// Bind an identifier as the declared name of a function node; the
    /// identifier gets a back-handle to the function.
    pub fn set_fun_name(&mut self, fun: NodeId, name: NodeId) {
        if let Some(meta) = self[fun].fun.as_mut() {
            meta.name = Some(name);
        }
        self[name].fun_ref = Some(fun);
    }

    pub fn set_fun_intern_name(&mut self, fun: NodeId, name: NodeId) {
        if let Some(meta) = self[fun].fun.as_mut() {
            meta.intern_name = Some(name);
        }
        self[name].fun_ref = Some(fun);
    }

    // ── tree queries ───────────────────────────────────────────────────

    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = self[node].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self[p].parent;
        }
        false
    }

    /// Nearest statement ancestor (the node itself included). With
    /// `fun_expr`, a FunctionExpression counts as a boundary too.
    pub fn nearest_statement(&self, node: NodeId, fun_expr: bool) -> NodeId {
        let mut cur = node;
        loop {
            let n = &self[cur];
            if n.is_statement() || (fun_expr && n.cat == Category::FunctionExpression) {
                return cur;
            }
            match n.parent {
                Some(p) => cur = p,
                None => return cur,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_graph() -> (Pdg, NodeId, NodeId, NodeId) {
        let mut g = Pdg::new(Limits::default());
        let root = g.add_node("Program", None);
        let a = g.add_node("Identifier", Some(root));
        let b = g.add_node("Identifier", Some(root));
        g.attach(root, a);
        g.attach(root, b);
        (g, root, a, b)
    }

    #[test]
    fn data_dep_is_deduplicated_and_mirrored() {
        let (mut g, _, a, b) = tiny_graph();
        g.set_data_dependency(a, b);
        g.set_data_dependency(a, b);
        assert_eq!(g[a].data_dep_children, vec![b]);
        assert_eq!(g[b].data_dep_parents, vec![a]);
    }

    #[test]
    fn self_data_dep_is_rejected() {
        let (mut g, _, a, _) = tiny_graph();
        g.set_data_dependency(a, a);
        assert!(g[a].data_dep_children.is_empty());
    }

    #[test]
    fn provenance_propagates_transitively() {
        let (mut g, root, a, b) = tiny_graph();
        let c = g.add_node("Identifier", Some(root));
        g.attach(root, c);
        g.set_data_dependency(a, b);
        g.set_data_dependency(b, c);
        let parents = &g[c].value.as_ref().unwrap().provenance_parents;
        assert!(parents.contains(&a), "c inherits a through b");
    }

    #[test]
    fn adopt_child_moves_to_front() {
        let (mut g, root, a, b) = tiny_graph();
        g.adopt_child(b, root);
        assert_eq!(g[root].children, vec![b, a]);
        assert_eq!(g[b].parent, Some(root));
    }

    #[test]
    fn string_values_are_truncated() {
        let mut limits = Limits::default();
        limits.value_size = 8;
        let mut g = Pdg::new(limits);
        let root = g.add_node("Program", None);
        let a = g.add_node("Identifier", Some(root));
        g.set_value(a, SymValue::Str("0123456789abcdef".into()));
        assert_eq!(g.value_of(a), SymValue::Str("01234567".into()));
    }

    #[test]
    fn literal_attribute_renders_regex() {
        let mut g = Pdg::new(Limits::default());
        let lit = g.add_node("Literal", None);
        g.set_attr(lit, "regex", serde_json::json!({"pattern": "ab+", "flags": ""}));
        assert_eq!(
            g[lit].literal_attribute(),
            Some(SymValue::Str("/ab+/".into()))
        );
    }

    #[test]
    fn nearest_statement_walks_up() {
        let mut g = Pdg::new(Limits::default());
        let root = g.add_node("Program", None);
        let stmt = g.add_node("ExpressionStatement", Some(root));
        g.attach(root, stmt);
        let call = g.add_node("CallExpression", Some(stmt));
        g.attach(stmt, call);
        let ident = g.add_node("Identifier", Some(call));
        g.attach(call, ident);
        assert_eq!(g.nearest_statement(ident, false), stmt);
    }
}
