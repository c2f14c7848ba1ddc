use crate::pdg::node::{Category, NodeId, Pdg, SymValue, CALL_EXPR, GLOBAL_VAR};
use std::collections::HashSet;
use tracing::debug;

/// Per-top-level-call evaluation state: the visited set breaks value cycles
/// (`a = b; b = a`), the depth counter bounds nesting.
pub struct EvalCtx {
    visited: HashSet<NodeId>,
}

impl EvalCtx {
    fn new() -> Self {
        Self {
            visited: HashSet::new(),
        }
    }
}

/// An operand is either a node still to be evaluated or an already-computed
/// value (augmented assignments feed the old value back in).
pub enum Operand {
    Node(NodeId),
    Val(SymValue),
}

/// Force symbolic evaluation of `node`, recording provenance onto
/// `initial` for every node consulted along the way.
pub fn computed_value(g: &mut Pdg, node: NodeId, initial: Option<NodeId>) -> SymValue {
    let mut ctx = EvalCtx::new();
    compute(g, node, initial, false, &mut ctx, 0)
}

/// The "known" value of `node`, bypassing the cached cell (used to force a
/// recomputation of function returns at call time).
pub fn node_value(g: &mut Pdg, node: NodeId, initial: Option<NodeId>) -> SymValue {
    let mut ctx = EvalCtx::new();
    raw_value(g, node, initial, &mut ctx, 0)
}

pub fn compute_operators(
    g: &mut Pdg,
    operator: &str,
    a: Operand,
    b: Operand,
    initial: Option<NodeId>,
) -> SymValue {
    let mut ctx = EvalCtx::new();
    compute_operators_in(g, operator, a, b, initial, &mut ctx, 0)
}

/// Resolve a member expression without computing the final leaf, so an
/// assignment can write into the node the chain lands on.
pub fn compute_member_no_compute(g: &mut Pdg, node: NodeId, initial: Option<NodeId>) -> SymValue {
    let mut ctx = EvalCtx::new();
    compute_member(g, node, initial, false, &mut ctx, 0)
}

// -------------------------------------------------------------------------
//  Core evaluation
// -------------------------------------------------------------------------

fn compute(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    keep_null: bool,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    if ctx.visited.contains(&node) {
        // A revisit returns whatever is cached, or null.
        return g.value_of(node);
    }
    ctx.visited.insert(node);
    if depth > g.limits.value_depth {
        debug!(target: "pdg", node = %node, "value recursion depth exceeded");
        return g.value_of(node);
    }

    if let Some(init) = initial
        && g[init].value.is_some()
    {
        g.set_provenance(init, node);
    }

    let mut value = SymValue::Null;
    if g[node].value.is_some() {
        value = g.value_of(node);
        if let SymValue::Ref(target) = value
            && target != node
        {
            // The value lives on another node, chase it.
            value = compute(g, target, initial, false, ctx, depth + 1);
        }
    }

    if value.is_null() && !keep_null {
        value = raw_value(g, node, initial, ctx, depth);
    }

    // Calls are never cached: their value must be recomputed per call site.
    if g[node].value.is_some() && !CALL_EXPR.contains(g[node].name.as_str()) {
        g.set_value(node, value.clone());
    }
    value
}

fn raw_value(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    if g[node].cat == Category::ValueExpr {
        let cached = g.value_of(node);
        if !cached.is_null() {
            return cached;
        }
    }
    if let Some(attr) = g[node].literal_attribute() {
        return attr;
    }

    let name = g[node].name.clone();
    match name.as_str() {
        "UnaryExpression" => compute_unary(g, node, initial, ctx, depth + 1),
        "BinaryExpression" | "LogicalExpression" => {
            let operator = g[node].attr_str("operator").unwrap_or_default().to_owned();
            let children = g[node].children.clone();
            if children.len() < 2 {
                return SymValue::Null;
            }
            compute_operators_in(
                g,
                &operator,
                Operand::Node(children[0]),
                Operand::Node(children[1]),
                initial,
                ctx,
                depth,
            )
        }
        "ArrayExpression" | "ObjectExpression" | "ObjectPattern" => SymValue::Ref(node),
        "MemberExpression" => compute_member(g, node, initial, true, ctx, depth + 1),
        "ThisExpression" => SymValue::Str("this".to_owned()),
        _ if g[node].cat == Category::FunctionExpression => {
            // A named function maps to its name, an anonymous one to itself.
            match g[node].fun.as_ref().and_then(|f| f.name) {
                Some(fun_name) => SymValue::Ref(fun_name),
                None => SymValue::Ref(node),
            }
        }
        "CallExpression"
            if g[node]
                .children
                .first()
                .is_some_and(|c| g[*c].cat == Category::FunctionExpression) =>
        {
            let callee = g[node].children[0];
            match g[callee].fun.as_ref().and_then(|f| f.name) {
                Some(fun_name) => SymValue::Ref(fun_name),
                None => SymValue::Null,
            }
        }
        n if CALL_EXPR.contains(n) => compute_call(g, node, initial, ctx, depth),
        "ReturnStatement" | "BlockStatement" => match g[node].children.first().copied() {
            Some(child) => compute(g, child, initial, false, ctx, depth + 1),
            None => SymValue::Null,
        },
        "TemplateLiteral" => compute_template_literal(g, node, initial, ctx, depth),
        "ConditionalExpression" => compute_conditional(g, node, initial, ctx, depth),
        "AssignmentExpression" => compute_assignment(g, node, initial, ctx, depth),
        "UpdateExpression" => match g[node].children.first().copied() {
            Some(child) => compute(g, child, initial, false, ctx, depth + 1),
            None => SymValue::Null,
        },
        _ => {
            for child in g[node].children.clone() {
                compute(g, child, initial, false, ctx, depth + 1);
            }
            debug!(target: "pdg", node = %node, kind = %name, "no value rule for node");
            SymValue::Null
        }
    }
}

// -------------------------------------------------------------------------
//  Operators
// -------------------------------------------------------------------------

/// Numeric view of a value; booleans coerce the way the language promotes
/// them in arithmetic.
fn arith(v: &SymValue) -> Option<f64> {
    match v {
        SymValue::Num(n) => Some(*n),
        SymValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn sym_eq(a: &SymValue, b: &SymValue) -> bool {
    match (arith(a), arith(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn operator_plus(a: &SymValue, b: &SymValue) -> SymValue {
    if matches!(a, SymValue::Str(_)) || matches!(b, SymValue::Str(_)) {
        return SymValue::Str(format!("{a}{b}"));
    }
    if let (SymValue::List(x), SymValue::List(y)) = (a, b) {
        let mut joined = x.clone();
        joined.extend(y.iter().cloned());
        return SymValue::List(joined);
    }
    match (arith(a), arith(b)) {
        (Some(x), Some(y)) => SymValue::Num(x + y),
        _ => SymValue::Null,
    }
}

fn numeric_op(a: &SymValue, b: &SymValue, f: impl Fn(f64, f64) -> SymValue) -> SymValue {
    match (arith(a), arith(b)) {
        (Some(x), Some(y)) => f(x, y),
        _ => SymValue::Null,
    }
}

fn comparison(a: &SymValue, b: &SymValue, f: impl Fn(std::cmp::Ordering) -> bool) -> SymValue {
    if let (Some(x), Some(y)) = (arith(a), arith(b)) {
        return match x.partial_cmp(&y) {
            Some(ord) => SymValue::Bool(f(ord)),
            None => SymValue::Null,
        };
    }
    if let (SymValue::Str(x), SymValue::Str(y)) = (a, b) {
        return SymValue::Bool(f(x.cmp(y)));
    }
    SymValue::Null
}

fn compute_operators_in(
    g: &mut Pdg,
    operator: &str,
    a: Operand,
    b: Operand,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    let resolve = |g: &mut Pdg, op: Operand, ctx: &mut EvalCtx| match op {
        Operand::Val(v) => v,
        Operand::Node(n) => {
            // An identifier should keep its (possibly null) stored value
            // rather than decay to its own name.
            let keep_null = g[n].cat == Category::Identifier;
            compute(g, n, initial, keep_null, ctx, depth + 1)
        }
    };
    let a = resolve(g, a, ctx);
    let b = resolve(g, b, ctx);

    let both_num = arith(&a).is_some() && arith(&b).is_some();
    if !both_num {
        if matches!(operator, "+" | "+=")
            && (matches!(a, SymValue::Str(_)) || matches!(b, SymValue::Str(_)))
        {
            return operator_plus(&a, &b);
        }
        if a.is_null() || b.is_null() {
            return SymValue::Null;
        }
        // A dotted string is an unresolved member path; comparing it would
        // take a hasty decision, e.g. data.msg.split(-).1 == POST.
        let undecidable = |v: &SymValue| v.as_str().is_some_and(|s| s.contains('.'));
        if undecidable(&a) || undecidable(&b) {
            debug!(target: "pdg", "unable to compute {a} {operator} {b}");
            return SymValue::Null;
        }
    }

    match operator {
        "+" | "+=" => operator_plus(&a, &b),
        "-" | "-=" => numeric_op(&a, &b, |x, y| SymValue::Num(x - y)),
        "*" | "*=" => numeric_op(&a, &b, |x, y| SymValue::Num(x * y)),
        "/" | "/=" => numeric_op(&a, &b, |x, y| {
            if y == 0.0 {
                SymValue::Null
            } else {
                SymValue::Num(x / y)
            }
        }),
        "**" | "**=" => numeric_op(&a, &b, |x, y| SymValue::Num(x.powf(y))),
        "%" | "%=" => numeric_op(&a, &b, |x, y| {
            if y == 0.0 {
                SymValue::Null
            } else {
                SymValue::Num(x % y)
            }
        }),
        "++" => numeric_op(&a, &SymValue::Num(1.0), |x, y| SymValue::Num(x + y)),
        "--" => numeric_op(&a, &SymValue::Num(1.0), |x, y| SymValue::Num(x - y)),
        "==" | "===" => SymValue::Bool(sym_eq(&a, &b)),
        "!=" | "!==" => SymValue::Bool(!sym_eq(&a, &b)),
        "!" => SymValue::Bool(!a.truthy()),
        ">=" => comparison(&a, &b, std::cmp::Ordering::is_ge),
        ">" => comparison(&a, &b, std::cmp::Ordering::is_gt),
        "<=" => comparison(&a, &b, std::cmp::Ordering::is_le),
        "<" => comparison(&a, &b, std::cmp::Ordering::is_lt),
        "&&" => {
            if a.truthy() {
                b
            } else {
                a
            }
        }
        "||" => {
            if a.truthy() {
                a
            } else {
                b
            }
        }
        "&" | ">>" | ">>>" | "<<" | "^" | "|" | "&=" | ">>=" | ">>>=" | "<<=" | "^=" | "|="
        | "in" | "instanceof" => {
            debug!(target: "pdg", operator, "operator not handled");
            SymValue::Null
        }
        _ => {
            debug!(target: "pdg", operator, "unknown operator");
            SymValue::Null
        }
    }
}

fn compute_unary(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    let Some(&operand) = g[node].children.first() else {
        return SymValue::Null;
    };
    let operator = g[node].attr_str("operator").unwrap_or_default().to_owned();
    match compute(g, operand, initial, false, ctx, depth + 1) {
        SymValue::Null => SymValue::Null,
        SymValue::Bool(b) => SymValue::Bool(!b),
        SymValue::Num(n) => SymValue::Num(-n),
        SymValue::Str(s) => SymValue::Str(format!("{operator}{s}")),
        other => {
            debug!(target: "pdg", "no unary rule for {operator} on {other}");
            SymValue::Null
        }
    }
}

// -------------------------------------------------------------------------
//  Member expressions
// -------------------------------------------------------------------------

fn is_global_name(v: &SymValue) -> bool {
    v.as_str().is_some_and(|s| GLOBAL_VAR.contains(s))
}

/// Evaluate `obj.prop` / `obj[prop]`. With `compute_final` false, the
/// resolved node reference is returned instead of its value, which lets an
/// assignment write into the resolved leaf.
fn compute_member(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    compute_final: bool,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    let children = g[node].children.clone();
    let (Some(&obj), Some(&prop)) = (children.first(), children.get(1)) else {
        return SymValue::Null;
    };
    let prop_value = compute(g, prop, initial, false, ctx, depth + 1);
    let obj_value = compute(g, obj, initial, false, ctx, depth + 1);

    if g[obj].name == "ThisExpression" || is_global_name(&obj_value) {
        return prop_value;
    }

    let member_value = match obj_value {
        SymValue::Ref(obj_node) => {
            if g[obj_node].name == "Literal" || g[obj_node].name == "Identifier" {
                SymValue::Ref(obj_node)
            } else {
                match &prop_value {
                    SymValue::Str(prop_name) => {
                        let mut found = Vec::new();
                        search_object_property(g, obj_node, prop_name, &mut found);
                        if found.is_empty() {
                            debug!(
                                target: "pdg",
                                "no property {prop_name} on the {} object", g[obj].name
                            );
                            SymValue::Null
                        } else {
                            // Several same-named matches: take the first one
                            // that resolves (later definitions may shadow).
                            let mut value = SymValue::Null;
                            for candidate in found {
                                let (v, worked) =
                                    get_property_value(g, candidate, initial, ctx, depth);
                                value = v;
                                if worked {
                                    break;
                                }
                            }
                            value
                        }
                    }
                    v => match v.as_index() {
                        Some(idx) => {
                            let obj_children = g[obj_node].children.clone();
                            match obj_children.get(idx) {
                                Some(&el) => SymValue::Ref(el),
                                None => SymValue::Str(member_path_display(
                                    g, node, initial, ctx, depth,
                                )),
                            }
                        }
                        None => {
                            debug!(target: "pdg", "expected a string or an index, got {v}");
                            SymValue::Null
                        }
                    },
                }
            }
        }
        SymValue::List(list) => match prop_value.as_index() {
            // Tagged-template parameters travel as a list.
            Some(idx) => list.get(idx).cloned().unwrap_or(SymValue::Null),
            None => SymValue::Null,
        },
        SymValue::Map(map) => match prop_value.as_str() {
            Some(key) => map.get(key).cloned().unwrap_or(SymValue::Null),
            None => SymValue::Null,
        },
        // The object resolved to a scalar or nothing: render the chain as an
        // unresolved dotted path, e.g. `wx.request`.
        _ => SymValue::Str(member_path_display(g, node, initial, ctx, depth)),
    };

    if compute_final
        && let SymValue::Ref(n) = member_value
    {
        // Deliberately evaluated with a fresh visited set: the resolved leaf
        // may legitimately revisit nodes consulted during the lookup.
        let mut fresh = EvalCtx::new();
        return compute(g, n, initial, false, &mut fresh, depth + 1);
    }
    member_value
}

/// Collect, in document order, every node of the object subtree whose name
/// or literal value equals `prop`. All matches are kept: with mutually
/// recursive properties the first match can be the wrong one.
fn search_object_property(g: &Pdg, node: NodeId, prop: &str, found: &mut Vec<NodeId>) {
    if g[node].attr_str("name") == Some(prop) || g[node].attr_str("value") == Some(prop) {
        found.push(node);
    }
    for &child in &g[node].children {
        search_object_property(g, child, prop, found);
    }
}

/// Value of an object's property: the matched key's sibling value node.
fn get_property_value(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> (SymValue, bool) {
    let is_key_like = g[node].cat == Category::Identifier || g[node].name == "Literal";
    let parent = g[node].parent;
    if let Some(parent) = parent
        && is_key_like
        && g[parent].name == "Property"
        && g[parent].children.len() > 1
    {
        let value_node = g[parent].children[1];
        if g[value_node].name == "Literal" {
            return (SymValue::Ref(value_node), true);
        }
        return (
            compute(g, value_node, initial, false, ctx, depth + 1),
            true,
        );
    }
    debug!(
        target: "pdg",
        "cannot take the property value of a {} node", g[node].name
    );
    (SymValue::Null, false)
}

/// Render a member chain with computed leaves: `wx.request`, `this.a.b`.
fn member_path_display(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> String {
    let mut out = member_display_acc(g, node, initial, ctx, depth);
    out.pop(); // trailing dot
    out
}

fn member_display_acc(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> String {
    let mut out = String::new();
    for child in g[node].children.clone() {
        if g[child].name == "MemberExpression" {
            out.push_str(&member_display_acc(g, child, initial, ctx, depth));
        } else {
            let v = compute(g, child, initial, false, ctx, depth + 1);
            out.push_str(&v.to_string());
            out.push('.');
        }
    }
    out
}

// -------------------------------------------------------------------------
//  Calls, templates, conditionals, assignments
// -------------------------------------------------------------------------

fn compute_call(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    if let Some(init) = initial
        && g[init].value.is_some()
    {
        g.set_provenance(init, node);
    }

    let children = g[node].children.clone();
    let Some(&callee) = children.first() else {
        return SymValue::Null;
    };

    let mut params = String::from("(");
    for (i, &arg) in children[1..].iter().enumerate() {
        let v = compute(g, arg, initial, false, ctx, depth + 1);
        params.push_str(&v.to_string());
        if i + 2 < children.len() {
            params.push_str(", ");
        }
    }
    params.push(')');

    match g[callee].name.as_str() {
        "Identifier" => {
            let v = compute(g, callee, initial, false, ctx, depth + 1);
            SymValue::Str(format!("{v}{params}"))
        }
        "MemberExpression" => {
            let path = member_path_display(g, callee, initial, ctx, depth);
            SymValue::Str(format!("{path}{params}"))
        }
        n if CALL_EXPR.contains(n) => {
            let v = compute(g, callee, initial, false, ctx, depth + 1);
            if v.is_null() {
                SymValue::Null
            } else {
                SymValue::Str(format!("{v}{params}"))
            }
        }
        "LogicalExpression" => {
            // a || b: a unless it is statically false.
            let callee_children = g[callee].children.clone();
            if callee_children.len() < 2 {
                return SymValue::Null;
            }
            let first = compute(g, callee_children[0], initial, false, ctx, depth + 1);
            if first == SymValue::Bool(false) {
                compute(g, callee_children[1], initial, false, ctx, depth + 1)
            } else {
                first
            }
        }
        other => {
            debug!(target: "pdg", node = %node, callee = other, "call on an unexpected callee");
            SymValue::Null
        }
    }
}

fn compute_template_literal(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    let mut elements = Vec::new();
    let mut expressions = Vec::new();
    for child in g[node].children.clone() {
        if g[child].name == "TemplateElement" {
            elements.push(child);
        } else {
            expressions.push(child);
        }
    }
    if elements.len() != expressions.len() + 1 {
        debug!(
            target: "pdg",
            "template literal with {} elements and {} expressions", elements.len(), expressions.len()
        );
        return SymValue::Null;
    }
    let mut out = String::new();
    for i in 0..expressions.len() {
        let e = compute(g, elements[i], initial, false, ctx, depth + 1);
        let x = compute(g, expressions[i], initial, false, ctx, depth + 1);
        out.push_str(&e.to_string());
        out.push_str(&x.to_string());
    }
    let last = compute(g, elements[elements.len() - 1], initial, false, ctx, depth + 1);
    out.push_str(&last.to_string());
    SymValue::Str(out)
}

fn compute_conditional(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    let children = g[node].children.clone();
    if children.len() < 3 {
        return SymValue::Null;
    }
    let test = compute(g, children[0], initial, false, ctx, depth + 1);
    let consequent = compute(g, children[1], initial, false, ctx, depth + 1);
    let alternate = compute(g, children[2], initial, false, ctx, depth + 1);
    match test {
        SymValue::Bool(true) => consequent,
        SymValue::Bool(false) => alternate,
        // Statically unknown test: both branches stay reachable.
        _ => SymValue::List(vec![alternate, consequent]),
    }
}

fn compute_assignment(
    g: &mut Pdg,
    node: NodeId,
    initial: Option<NodeId>,
    ctx: &mut EvalCtx,
    depth: u32,
) -> SymValue {
    // a = b = value: a's value comes through b.
    let Some(&var) = g[node].children.first() else {
        return SymValue::Null;
    };
    if g[var].value.is_some() {
        let v = g.value_of(var);
        if !v.is_null() {
            return v;
        }
    }
    compute(g, var, initial, false, ctx, depth + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::pdg::ast::build_graph;
    use serde_json::json;

    fn eval_expr(expr: serde_json::Value) -> SymValue {
        let doc = json!({
            "type": "Program",
            "body": [{"type": "ExpressionStatement", "expression": expr}]
        });
        let mut g = Pdg::new(Limits::default());
        let root = build_graph(&mut g, &doc);
        let stmt = g[root].children[0];
        let expr = g[stmt].children[0];
        computed_value(&mut g, expr, None)
    }

    fn lit(v: serde_json::Value) -> serde_json::Value {
        json!({"type": "Literal", "value": v, "raw": v.to_string()})
    }

    fn binary(op: &str, l: serde_json::Value, r: serde_json::Value) -> serde_json::Value {
        json!({"type": "BinaryExpression", "operator": op, "left": l, "right": r})
    }

    #[test]
    fn plus_promotes_to_string() {
        assert_eq!(
            eval_expr(binary("+", lit(json!("a")), lit(json!(1)))),
            SymValue::Str("a1".into())
        );
        assert_eq!(
            eval_expr(binary("+", lit(json!(2)), lit(json!(3)))),
            SymValue::Num(5.0)
        );
    }

    #[test]
    fn division_and_modulo_by_zero_are_null() {
        assert_eq!(eval_expr(binary("/", lit(json!(1)), lit(json!(0)))), SymValue::Null);
        assert_eq!(eval_expr(binary("%", lit(json!(1)), lit(json!(0)))), SymValue::Null);
    }

    #[test]
    fn bitwise_operators_are_unsupported() {
        assert_eq!(eval_expr(binary("&", lit(json!(1)), lit(json!(3)))), SymValue::Null);
        assert_eq!(eval_expr(binary("<<", lit(json!(1)), lit(json!(3)))), SymValue::Null);
    }

    #[test]
    fn unary_rules() {
        assert_eq!(
            eval_expr(json!({"type": "UnaryExpression", "operator": "!",
                             "argument": lit(json!(true)), "prefix": true})),
            SymValue::Bool(false)
        );
        assert_eq!(
            eval_expr(json!({"type": "UnaryExpression", "operator": "-",
                             "argument": lit(json!(4)), "prefix": true})),
            SymValue::Num(-4.0)
        );
    }

    #[test]
    fn this_member_returns_property() {
        let v = eval_expr(json!({
            "type": "MemberExpression", "computed": false,
            "object": {"type": "ThisExpression"},
            "property": {"type": "Identifier", "name": "data"}
        }));
        assert_eq!(v, SymValue::Str("data".into()));
    }

    #[test]
    fn unknown_member_renders_dotted_path() {
        let v = eval_expr(json!({
            "type": "MemberExpression", "computed": false,
            "object": {"type": "Identifier", "name": "wx"},
            "property": {"type": "Identifier", "name": "request"}
        }));
        assert_eq!(v, SymValue::Str("wx.request".into()));
    }

    #[test]
    fn call_on_member_renders_callee_and_args() {
        let v = eval_expr(json!({
            "type": "CallExpression",
            "callee": {
                "type": "MemberExpression", "computed": false,
                "object": {"type": "Identifier", "name": "wx"},
                "property": {"type": "Identifier", "name": "getStorageSync"}
            },
            "arguments": [lit(json!("k"))]
        }));
        assert_eq!(v, SymValue::Str("wx.getStorageSync(k)".into()));
    }

    #[test]
    fn template_literal_concatenates() {
        let v = eval_expr(json!({
            "type": "TemplateLiteral",
            "quasis": [
                {"type": "TemplateElement", "value": {"raw": "a=", "cooked": "a="}, "tail": false},
                {"type": "TemplateElement", "value": {"raw": "!", "cooked": "!"}, "tail": true}
            ],
            "expressions": [lit(json!(7))]
        }));
        assert_eq!(v, SymValue::Str("a=7!".into()));
    }

    #[test]
    fn conditional_with_unknown_test_keeps_both_branches() {
        let v = eval_expr(json!({
            "type": "ConditionalExpression",
            "test": {"type": "Identifier", "name": "cond"},
            "consequent": lit(json!("yes")),
            "alternate": lit(json!("no"))
        }));
        // identifier test computes to its own name, which is not a boolean
        assert_eq!(
            v,
            SymValue::List(vec![SymValue::Str("no".into()), SymValue::Str("yes".into())])
        );
    }

    #[test]
    fn object_property_lookup_takes_first_working_match() {
        let v = eval_expr(json!({
            "type": "MemberExpression", "computed": false,
            "object": {
                "type": "ObjectExpression",
                "properties": [{
                    "type": "Property", "kind": "init", "computed": false,
                    "method": false, "shorthand": false,
                    "key": {"type": "Identifier", "name": "u"},
                    "value": lit(json!("x"))
                }]
            },
            "property": {"type": "Identifier", "name": "u"}
        }));
        assert_eq!(v, SymValue::Str("x".into()));
    }

    #[test]
    fn value_cycles_terminate() {
        // a node whose value refers to itself through another node
        let mut g = Pdg::new(Limits::default());
        let root = g.add_node("Program", None);
        let a = g.add_node("Identifier", Some(root));
        let b = g.add_node("Identifier", Some(root));
        g.attach(root, a);
        g.attach(root, b);
        g.set_attr(a, "name", json!("a"));
        g.set_attr(b, "name", json!("b"));
        g.set_value(a, SymValue::Ref(b));
        g.set_value(b, SymValue::Ref(a));
        // must not hang; the visited set breaks the cycle
        let _ = computed_value(&mut g, a, None);
    }
}
