use crate::config::Deadline;
use crate::errors::{TaintError, TaintResult};
use crate::pdg::node::{Category, CtrlLabel, NodeId, Pdg, SymValue, CALL_EXPR, GLOBAL_VAR};
use crate::pdg::pointer::{compute_update_expression, map_var2value};
use crate::pdg::reserved::is_known_word;
use crate::pdg::scope::{get_pos_identifier, Scope};
use crate::pdg::value::{computed_value, node_value};
use std::collections::HashSet;
use tracing::debug;

/// Traversal state threaded through the engine: the cooperative deadline
/// and a recursion guard for deeply nested programs.
pub struct DfCtx {
    pub deadline: Deadline,
    depth: u32,
    max_depth: u32,
}

impl DfCtx {
    pub fn new(deadline: Deadline, max_depth: u32) -> Self {
        Self {
            deadline,
            depth: 0,
            max_depth,
        }
    }
}

pub type IdList = HashSet<NodeId>;

/// Data-dependency pass over the whole graph. `entry == 1` means global
/// context.
pub fn df_scoping(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    for child in g[node].children.clone() {
        data_flow(g, child, scopes, id_list, entry, ctx)?;
    }
    Ok(())
}

fn data_flow(
    g: &mut Pdg,
    child: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    ctx.depth += 1;
    if ctx.depth > ctx.max_depth {
        ctx.depth -= 1;
        debug!(target: "dataflow", node = %child, "traversal depth exceeded, skipping subtree");
        return Ok(());
    }
    let out = build_dfg_content(g, child, scopes, id_list, entry, ctx);
    ctx.depth -= 1;
    out
}

// -------------------------------------------------------------------------
//  Identifier harvesting
// -------------------------------------------------------------------------

/// Collect the identifier nodes below `node` that stand for variables.
/// Object expressions and call arguments are not descended into; of a
/// member chain, only the side that names the variable is kept.
fn search_identifiers(
    g: &mut Pdg,
    node: NodeId,
    id_list: &mut IdList,
    tab: &mut Vec<NodeId>,
    rec: bool,
) {
    let name = g[node].name.clone();
    if name == "ObjectExpression" || CALL_EXPR.contains(name.as_str()) {
        return;
    }
    if g[node].cat == Category::Identifier {
        let Some(parent) = g[node].parent else {
            tab.push(node);
            return;
        };
        if g[parent].name != "MemberExpression" {
            tab.push(node);
            return;
        }
        let left = g[parent].children.first().copied();
        let right = g[parent].children.get(1).copied();
        if left == Some(node) {
            // obj.prop…: only the object names a variable, and the globals
            // (`window` & co) never do.
            if is_global_value(g, node) {
                id_list.insert(node);
                debug!(target: "dataflow", "{:?} is not a variable name", g[node].ident_name());
            } else {
                tab.push(node);
            }
        } else if right == Some(node) {
            let left_node = left.expect("member expression has an object");
            if g[left_node].name == "ThisExpression" || is_global_value(g, left_node) {
                // this.something / window.something: the property is the
                // variable, unless it is itself a global.
                if is_global_value(g, node) {
                    id_list.insert(node);
                } else {
                    tab.push(node);
                }
            } else if g[parent].attr("computed").and_then(|v| v.as_bool()) == Some(true) {
                // bracket access may be an index variable
                tab.push(node);
            }
        }
    } else if rec {
        for child in g[node].children.clone() {
            search_identifiers(g, child, id_list, tab, rec);
        }
    }
}

fn is_global_value(g: &mut Pdg, node: NodeId) -> bool {
    let v = computed_value(g, node, None);
    v.as_str().is_some_and(|s| GLOBAL_VAR.contains(s))
}

// -------------------------------------------------------------------------
//  Drawing data dependencies
// -------------------------------------------------------------------------

/// Draw the edge, carry the value over, and retraverse the function when the
/// data flow starts at a function name used outside a call position (the
/// promise / callback case).
fn set_data_dep(
    g: &mut Pdg,
    begin: NodeId,
    identifier_node: NodeId,
    scopes: &mut Vec<Scope>,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    g.set_data_dependency(begin, identifier_node);
    let carried = g.value_of(begin);
    g.set_value(identifier_node, carried);

    if let Some(fun) = g[begin].fun_ref {
        let call_position = g[identifier_node].parent.is_some_and(|p| {
            CALL_EXPR.contains(g[p].name.as_str())
                && g[p].children.first() == Some(&identifier_node)
        });
        if !call_position {
            debug!(target: "dataflow", "retraversing the function referenced by a bare name");
            if let Some(meta) = g[fun].fun.as_mut() {
                meta.retraverse = true;
            }
            let mut fresh = IdList::new();
            function_scope(g, fun, scopes, &mut fresh, ctx)?;
        }
    }
    Ok(())
}

/// Data dependency from the binding at (scope_index, var_index) to a use.
fn set_df(
    g: &mut Pdg,
    scopes: &mut Vec<Scope>,
    scope_index: usize,
    var_index: usize,
    identifier_node: NodeId,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let if2 = scopes[scope_index].var_if2_list[var_index].clone();
    match if2 {
        // The variable was written in both arms: join on either writer.
        Some(writers) => {
            for begin in writers {
                set_data_dep(g, begin, identifier_node, scopes, ctx)?;
            }
        }
        None => {
            let begin = scopes[scope_index].var_list[var_index];
            set_data_dep(g, begin, identifier_node, scopes, ctx)?;
        }
    }
    Ok(())
}

/// Resolve a use against the scope stack and draw the dependency. With
/// `update`, this occurrence becomes the new last writer (member-call
/// receivers: `arr.push(x)` advances `arr`).
fn assignment_df(
    g: &mut Pdg,
    identifier_node: NodeId,
    scopes: &mut Vec<Scope>,
    update: bool,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    match get_pos_identifier(g, identifier_node, scopes) {
        Some((var_index, scope_index)) => {
            set_df(g, scopes, scope_index, var_index, identifier_node, ctx)?;
            if update {
                scopes[scope_index].update_var(g, var_index, identifier_node);
            }
        }
        None => {
            let name = g[identifier_node].ident_name().unwrap_or_default();
            if !is_known_word(name) {
                debug!(target: "dataflow", "the variable {name} is unknown");
                scopes[0].add_unknown_var(identifier_node);
            }
        }
    }
    Ok(())
}

/// Declare or update a binding. The target frame follows the declaration
/// kind: let/const go to the innermost block scope, everything else to the
/// global frame on first sight or the nearest local frame otherwise.
/// `upto` bounds the visible portion of the stack (a function-declaration
/// name is declared in the outer scopes only).
#[allow(clippy::too_many_arguments)]
fn var_decl_df(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    upto: usize,
    entry: u32,
    assignt: bool,
    obj: bool,
    let_const: bool,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let last = upto;
    let range = if let_const || scopes[last - 1].name.starts_with("let_const") {
        (last - 1, last)
    } else if last == 1
        || entry == 1
        || (assignt && get_pos_in_range(g, node, scopes, 1, last).is_none())
    {
        (0, 1)
    } else {
        (1, last)
    };

    match get_pos_in_range(g, node, scopes, range.0, range.1) {
        None => {
            scopes[range.1 - 1].add_var(g, node);
            debug!(
                target: "dataflow",
                "the variable {:?} was declared", g[node].ident_name()
            );
        }
        Some((var_index, scope_index)) => {
            let mut if_else_assignt = false;
            if assignt {
                if obj {
                    // Objects keep their AST order: read-then-write.
                    set_df(g, scopes, scope_index, var_index, node, ctx)?;
                } else {
                    scopes[scope_index].add_var_if2(var_index, node);
                    if_else_assignt = true;
                }
            }
            if !if_else_assignt {
                scopes[scope_index].update_var(g, var_index, node);
            }
        }
    }
    Ok(())
}

/// Innermost-out lookup restricted to `scopes[start..end]`, returning an
/// absolute scope index.
fn get_pos_in_range(
    g: &Pdg,
    node: NodeId,
    scopes: &[Scope],
    start: usize,
    end: usize,
) -> Option<(usize, usize)> {
    for scope_index in (start..end).rev() {
        if let Some(var_index) = scopes[scope_index].get_pos_identifier(g, node) {
            return Some((var_index, scope_index));
        }
    }
    None
}

// -------------------------------------------------------------------------
//  Declarations and assignments
// -------------------------------------------------------------------------

/// VariableDeclarator: id, then optional init.
fn var_declaration_df(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    let_const: bool,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    if g[node].name != "VariableDeclarator" {
        return Ok(());
    }
    let children = g[node].children.clone();
    let Some(&target) = children.first() else {
        return Ok(());
    };

    let mut identifiers = Vec::new();
    search_identifiers(g, target, id_list, &mut identifiers, true);

    if g[target].name != "ObjectPattern" {
        for &decl in &identifiers {
            id_list.insert(decl);
            let upto = scopes.len();
            var_decl_df(g, decl, scopes, upto, entry, false, false, let_const, ctx)?;
        }
        if identifiers.is_empty() {
            debug!(target: "dataflow", "no identifier variable found");
        }
    } else {
        obj_pattern_scope(g, target, scopes, id_list, ctx)?;
    }

    if children.len() > 1 {
        data_flow(g, children[1], scopes, id_list, entry, ctx)?;
        map_var2value(g, node, &identifiers, None);
    }
    Ok(())
}

/// AssignmentExpression: assignee(s), then the right-hand side.
fn assignment_expr_df(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let children = g[node].children.clone();
    let Some(&target) = children.first() else {
        return Ok(());
    };

    let mut operator: Option<String> = None;
    let mut identifiers = Vec::new();
    search_identifiers(g, target, id_list, &mut identifiers, true);

    for &assignee in &identifiers {
        id_list.insert(assignee);
        let Some(parent) = g[assignee].parent else {
            continue;
        };

        // Augmented operators read the previous version first.
        if let Some(op) = g[parent].attr_str("operator")
            && op != "="
        {
            operator = Some(op.to_owned());
            assignment_df(g, assignee, scopes, false, ctx)?;
        }

        let parent_is_member = g[parent].name == "MemberExpression";
        let grandparent_is_member = g[parent]
            .parent
            .is_some_and(|gp| g[gp].name == "MemberExpression");
        let left = g[parent].children.first().copied();
        let left_is_this = left.is_some_and(|l| g[l].name == "ThisExpression");
        let left_is_window = left.is_some_and(|l| g[l].attr_str("name") == Some("window"));

        let object_write = (parent_is_member && !left_is_this && !left_is_window)
            || (parent_is_member && grandparent_is_member);
        if object_write {
            // window.var and this.var are global writes and skipped above;
            // obj.prop (and window.obj.prop) update the object binding.
            var_decl_df(g, assignee, scopes, scopes.len(), entry, true, true, false, ctx)?;
        } else {
            var_decl_df(g, assignee, scopes, scopes.len(), entry, true, false, false, ctx)?;
        }
    }
    if identifiers.is_empty() {
        debug!(target: "dataflow", "no identifier assignee found");
    }

    for &rhs in &children[1..] {
        data_flow(g, rhs, scopes, id_list, entry, ctx)?;
        map_var2value(g, node, &identifiers, operator.as_deref());
    }
    Ok(())
}

/// UpdateExpression: a read, a write, and a read of the new value.
fn update_expr_df(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let Some(&target) = g[node].children.first() else {
        return Ok(());
    };
    let mut arguments = Vec::new();
    search_identifiers(g, target, id_list, &mut arguments, true);
    for &argument in &arguments {
        assignment_df(g, argument, scopes, false, ctx)?;
        var_decl_df(g, argument, scopes, scopes.len(), entry, true, false, false, ctx)?;
        assignment_df(g, argument, scopes, false, ctx)?;
        compute_update_expression(g, node, argument);
    }
    if arguments.is_empty() {
        debug!(target: "dataflow", "no identifier argument found");
    }
    Ok(())
}

/// A free identifier occurrence.
fn identifier_update(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let mut identifiers = Vec::new();
    // rec=false: do not pick the same identifier up again via its family
    search_identifiers(g, node, id_list, &mut identifiers, false);
    for &identifier in &identifiers {
        let parent = g[identifier].parent;
        if parent.is_some_and(|p| g[p].name == "CatchClause") {
            // catch (err) {}: err is defined right here
            var_decl_df(g, node, scopes, scopes.len(), entry, false, false, false, ctx)?;
        } else {
            // The callee receiver of a member call becomes the new last
            // writer, so reads after arr.push(x) see the mutated arr.
            let mut check_callee = identifier;
            while let Some(p) = g[check_callee].parent {
                if g[p].name != "MemberExpression" {
                    break;
                }
                check_callee = p;
            }
            let update = g[check_callee].name == "MemberExpression"
                && g[check_callee].role.as_deref() == Some("callee");
            assignment_df(g, identifier, scopes, update, ctx)?;
        }
    }
    Ok(())
}

/// Link pending unknown uses of `node`'s name to this declaration.
fn hoisting(g: &mut Pdg, node: NodeId, scopes: &mut [Scope]) {
    let Some(name) = g[node].ident_name().map(str::to_owned) else {
        return;
    };
    for scope in scopes.iter_mut() {
        let pending: Vec<NodeId> = scope
            .unknown_var
            .iter()
            .copied()
            .filter(|&u| g[u].ident_name() == Some(name.as_str()))
            .collect();
        for unknown in pending {
            debug!(target: "dataflow", "hoisting: {name} was first used, then defined");
            g.set_data_dependency(node, unknown);
            scope.remove_unknown_var(unknown);
        }
    }
}

// -------------------------------------------------------------------------
//  Functions
// -------------------------------------------------------------------------

fn function_scope(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let fun_expr = g[node].cat == Category::FunctionExpression;
    let retraverse = g[node].fun.as_ref().is_some_and(|f| f.retraverse);

    // Count pairs of identical function frames already on the stack; two
    // frames of the same function may be separated by a branch scope.
    let mut rec = 0;
    for i in 0..scopes.len() {
        for j in i + 1..scopes.len() {
            if let (Some(a), Some(b)) = (scopes[i].function, scopes[j].function)
                && a == b
            {
                rec += 1;
            }
        }
    }
    if rec >= g.limits.retraverse {
        return Ok(());
    }

    let mut frame = Scope::new("Function");
    frame.function = Some(node);
    scopes.push(frame);

    for child in g[node].children.clone() {
        let role = g[child].role.clone().unwrap_or_default();
        if role == "id" {
            id_list.insert(child);
            if !fun_expr {
                if !retraverse {
                    g.set_fun_name(node, child);
                }
                // The declaration's name lives in the outer scope.
                let upto = scopes.len() - 1;
                var_decl_df(g, child, scopes, upto, 0, false, false, false, ctx)?;
                if !retraverse {
                    hoisting(g, child, scopes);
                }
            } else {
                // A named function expression is visible inside itself only.
                if !retraverse {
                    g.set_fun_intern_name(node, child);
                }
                let upto = scopes.len();
                var_decl_df(g, child, scopes, upto, 0, false, false, false, ctx)?;
            }
        }
        if role == "params" {
            id_list.insert(child);
            if !retraverse
                && let Some(meta) = g[node].fun.as_mut()
            {
                meta.params.push(child);
            }
            if g[child].cat == Category::Identifier {
                // Parameters are defined here, no dependency is drawn.
                scopes
                    .last_mut()
                    .expect("function frame was just pushed")
                    .add_var(g, child);
            } else {
                // e.g. an object pattern
                build_dfg_content(g, child, scopes, id_list, 0, ctx)?;
            }
        } else {
            data_flow(g, child, scopes, id_list, 0, ctx)?;
        }
    }

    let_const_scope(g, node, scopes);
    scopes.pop();

    if !retraverse {
        let returns = g[node]
            .fun
            .as_ref()
            .map(|f| f.returns.clone())
            .unwrap_or_default();
        for ret in returns {
            let v = node_value(g, ret, Some(node));
            g.set_value(ret, v);
        }
    }
    Ok(())
}

/// Bind the definition-site parameter to the call-site argument.
fn handle_function_params(g: &mut Pdg, def_param: NodeId, call_param: NodeId) {
    g.set_provenance(def_param, call_param);
    g.set_fun_param(def_param, call_param);
}

/// Tagged templates pass the template-element list as the first parameter,
/// the interpolations fill the rest in order.
fn handle_arg_tagged_template_expr(
    g: &mut Pdg,
    node: NodeId,
    callee: NodeId,
    saved_params: &mut Vec<(NodeId, SymValue)>,
) {
    let Some(&template_literal) = g[node].children.get(1) else {
        return;
    };
    let mut element_nodes = Vec::new();
    let mut element_values = Vec::new();
    let mut standard_param = Vec::new();
    for child in g[template_literal].children.clone() {
        if g[child].name == "TemplateElement" {
            element_nodes.push(child);
            element_values.push(computed_value(g, child, Some(node)));
        } else {
            standard_param.push(child);
        }
    }

    let fun_params = g[callee]
        .fun
        .as_ref()
        .map(|f| f.params.clone())
        .unwrap_or_default();
    if fun_params.is_empty() {
        return;
    }

    for arg in 1..fun_params.len() {
        let value = if arg <= standard_param.len() {
            let v = computed_value(g, standard_param[arg - 1], Some(node));
            handle_function_params(g, fun_params[arg], standard_param[arg - 1]);
            v
        } else {
            SymValue::Null
        };
        saved_params.push((fun_params[arg], computed_value(g, fun_params[arg], Some(node))));
        g.set_value(fun_params[arg], value);
    }
    saved_params.push((fun_params[0], computed_value(g, fun_params[0], Some(node))));
    g.set_value(fun_params[0], SymValue::List(element_values));
    for element in element_nodes {
        handle_function_params(g, fun_params[0], element);
    }
}

/// Bind arguments, retraverse the body, and adopt the last recorded return
/// as the call's value.
fn handle_call_expr(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    callee: NodeId,
    fun_expr: bool,
    tagged_template: bool,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    if !fun_expr
        && let Some(meta) = g[callee].fun.as_mut()
    {
        meta.called = true;
    }

    // A function called inside itself with different arguments needs the
    // outer parameter values back afterwards.
    let mut saved_params: Vec<(NodeId, SymValue)> = Vec::new();
    let fun_params = g[callee]
        .fun
        .as_ref()
        .map(|f| f.params.clone())
        .unwrap_or_default();

    if tagged_template {
        handle_arg_tagged_template_expr(g, node, callee, &mut saved_params);
    } else {
        let children = g[node].children.clone();
        for (arg, &param) in fun_params.iter().enumerate() {
            let value = if 1 + arg < children.len() {
                saved_params.push((param, computed_value(g, param, Some(node))));
                let v = computed_value(g, children[1 + arg], Some(node));
                handle_function_params(g, param, children[1 + arg]);
                v
            } else {
                // fewer call arguments than declared parameters
                SymValue::Null
            };
            if g[param].value.is_some() {
                g.set_value(param, value);
            }
        }
    }

    if let Some(meta) = g[callee].fun.as_mut() {
        meta.retraverse = true;
    }
    let mut fresh = IdList::new();
    function_scope(g, callee, scopes, &mut fresh, ctx)?;

    let last_return = g[callee].fun.as_ref().and_then(|f| f.returns.last().copied());
    let return_value = match last_return {
        // Recomputed, not read from the cache: the stored value predates the
        // parameter binding.
        Some(ret) => node_value(g, ret, Some(node)),
        None => SymValue::Null,
    };
    g.set_value(node, return_value);

    if saved_params.len() == fun_params.len() {
        for (param, value) in saved_params {
            g.set_value(param, value);
        }
    }
    Ok(())
}

/// arr.forEach(cb): the callback parameters depend on the receiver object.
fn handle_foreach(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if children.len() < 2
        || !matches!(g[children[0]].role.as_deref(), Some("callee") | Some("tag"))
    {
        return;
    }
    let value = computed_value(g, node, None);
    if !value.as_str().is_some_and(|s| s.contains(".forEach(")) {
        return;
    }
    let mut identifiers = Vec::new();
    let mut scratch = IdList::new();
    for child in g[children[0]].children.clone() {
        search_identifiers(g, child, &mut scratch, &mut identifiers, true);
    }
    let callback = children[1];
    if g[callback].cat != Category::FunctionExpression {
        return;
    }
    for param in g[callback].children.clone() {
        if g[param].role.as_deref() == Some("params") {
            for &arr in &identifiers {
                g.set_provenance(param, arr);
            }
        }
    }
}

/// arr.push(elt…): the receiver depends on every pushed element.
fn handle_push(g: &mut Pdg, node: NodeId) {
    let children = g[node].children.clone();
    if children.len() < 2
        || !matches!(g[children[0]].role.as_deref(), Some("callee") | Some("tag"))
    {
        return;
    }
    let value = computed_value(g, node, None);
    if !value.as_str().is_some_and(|s| s.contains(".push(")) {
        return;
    }
    let mut identifiers = Vec::new();
    let mut scratch = IdList::new();
    for child in g[children[0]].children.clone() {
        search_identifiers(g, child, &mut scratch, &mut identifiers, true);
    }
    for &element in &children[1..] {
        for &arr in &identifiers {
            g.set_provenance_rec(arr, element);
        }
    }
}

// -------------------------------------------------------------------------
//  Scopes for objects and branches
// -------------------------------------------------------------------------

fn obj_expr_scope(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    scopes.push(Scope::new("ObjectExpression"));

    for prop in g[node].children.clone() {
        for child in g[prop].children.clone() {
            if g[child].role.as_deref() == Some("key") {
                // Keys are local labels, not variables; only hoist-check them.
                let mut identifiers = Vec::new();
                search_identifiers(g, child, id_list, &mut identifiers, true);
                for param in identifiers {
                    id_list.insert(param);
                    hoisting(g, param, scopes);
                }
            } else {
                data_flow(g, child, scopes, id_list, 0, ctx)?;
                g.set_provenance(node, child);
            }
        }
    }

    let_const_scope(g, node, scopes);
    scopes.pop();
    Ok(())
}

fn obj_pattern_scope(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    for prop in g[node].children.clone() {
        for child in g[prop].children.clone() {
            match g[child].role.as_deref() {
                Some("value") => {
                    if g[child].cat != Category::Identifier {
                        data_flow(g, child, scopes, id_list, 0, ctx)?;
                    } else {
                        // The value leaf is the declared variable.
                        id_list.insert(child);
                        let upto = scopes.len();
                        var_decl_df(g, child, scopes, upto, 0, false, false, false, ctx)?;
                    }
                }
                Some("key") => {}
                role => {
                    debug!(
                        target: "dataflow",
                        "unexpected role {role:?} on a {} inside an object pattern", g[child].name
                    );
                }
            }
        }
    }
    let_const_scope(g, node, scopes);
    Ok(())
}

/// Run one branch in its own scope shadowing the global frame. Returns the
/// branch-local frame and the branch's view of the global frame.
fn get_var_branch(
    g: &mut Pdg,
    node_list: &[NodeId],
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    scope_name: &str,
    ctx: &mut DfCtx,
) -> TaintResult<(Scope, Scope)> {
    scopes.push(Scope::new(scope_name));
    let global_before = scopes[0].clone();

    for &node in node_list {
        data_flow(g, node, scopes, id_list, entry, ctx)?;
    }

    let local_cf = scopes.pop().expect("branch frame was just pushed");
    let global_cf = scopes.remove(0);
    scopes.insert(0, global_before);
    Ok((local_cf, global_cf))
}

/// Merge the `false`-branch bindings into the `true` scope: a variable
/// changed in one arm keeps that arm's writer; changed in both arms, it
/// records the pair so later reads join on either.
fn merge_var_boolean_cf(g: &Pdg, current_scope: &Scope, scope_true: &mut Scope, scope_false: &Scope) {
    for &node_false in &scope_false.var_list {
        let name_false = g[node_false].ident_name().unwrap_or_default().to_owned();
        if scope_true.get_pos_name(&name_false).is_none() {
            scope_true.add_var(g, node_false);
        }

        for node_true in scope_true.var_list.clone() {
            if g[node_true].ident_name() != Some(name_false.as_str()) || node_true == node_false {
                continue;
            }
            let Some(var_index) = scope_true.get_pos_identifier(g, node_true) else {
                continue;
            };
            if current_scope.var_list.contains(&node_true) {
                // unchanged in the true arm: the false writer wins
                scope_true.update_var(g, var_index, node_false);
            } else if current_scope.var_list.contains(&node_false) {
                // unchanged in the false arm: already the true writer
            } else {
                scope_true.update_var_if2(var_index, vec![node_true, node_false]);
            }
        }
    }
}

fn handle_several_branches(
    g: &mut Pdg,
    todo_true: &[NodeId],
    todo_false: &[NodeId],
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    if todo_true.is_empty() && todo_false.is_empty() {
        return Ok(());
    }
    let (local_true, global_true) =
        get_var_branch(g, todo_true, scopes, id_list, entry, "Branch_true", ctx)?;
    let (local_false, global_false) =
        get_var_branch(g, todo_false, scopes, id_list, entry, "Branch_false", ctx)?;

    if !global_true.is_equal(&global_false) {
        let current = scopes[0].clone();
        let mut merged = global_true;
        merge_var_boolean_cf(g, &current, &mut merged, &global_false);
        scopes.remove(0);
        scopes.insert(0, merged);
    }

    if !local_true.is_equal(&local_false) {
        let current = scopes
            .last()
            .expect("at least the global frame is present")
            .clone();
        let mut cond_scope = local_true;
        merge_var_boolean_cf(g, &current, &mut cond_scope, &local_false);

        let last = scopes.len() - 1;
        for (i, &cond_node) in cond_scope.var_list.clone().iter().enumerate() {
            let name = g[cond_node].ident_name().unwrap_or_default().to_owned();
            if scopes[last].get_pos_name(&name).is_none() {
                scopes[last].add_var(g, cond_node);
            }
            // carry the both-arm writer pairs over to the surviving entry
            if let Some(pair) = cond_scope.var_if2_list[i].clone()
                && let Some(pos) = scopes[last].get_pos_name(&name)
            {
                scopes[last].update_var_if2(pos, pair);
            }
        }
    }
    Ok(())
}

/// Statement-level traversal: statement deps first (with a static look at an
/// if-test), then the labelled control deps.
fn statement_scope(
    g: &mut Pdg,
    node: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    if ctx.deadline.expired() {
        return Err(TaintError::BuildTimeout);
    }

    let mut todo_true = Vec::new();
    let mut todo_false = Vec::new();
    let mut if_test: Option<bool> = None;

    for dep in g[node].statement_dep_children.clone() {
        data_flow(g, dep, scopes, id_list, entry, ctx)?;
        let parent_name = g[dep].parent.map(|p| g[p].name.clone());
        if matches!(
            parent_name.as_deref(),
            Some("IfStatement") | Some("ConditionalExpression")
        ) {
            if_test = match computed_value(g, dep, Some(node)) {
                SymValue::Bool(b) => Some(b),
                _ => None,
            };
            debug!(target: "dataflow", "the if test is {if_test:?}");
        }
    }

    for (child_cf, label) in g[node].control_dep_children.clone() {
        match label {
            CtrlLabel::True => {
                if if_test != Some(false) {
                    todo_true.push(child_cf);
                }
            }
            CtrlLabel::False => {
                if if_test != Some(true) {
                    todo_false.push(child_cf);
                }
            }
            CtrlLabel::Eps => data_flow(g, child_cf, scopes, id_list, entry, ctx)?,
        }
    }

    handle_several_branches(g, &todo_true, &todo_false, scopes, id_list, entry, ctx)?;
    let_const_scope(g, node, scopes);
    Ok(())
}

/// Pop the let/const scope of the block being left, if still present.
fn let_const_scope(g: &Pdg, node: NodeId, scopes: &mut Vec<Scope>) {
    let scope_name = format!("let_const{}", g[node].id.0);
    let len = scopes.len();
    if len > 1 && scopes[len - 1].name == scope_name {
        scopes.pop();
    } else if len > 2 && scopes[len - 1].name.contains("Branch") && scopes[len - 2].name == scope_name
    {
        scopes.remove(len - 2);
    }
}

fn go_out_bloc(scopes: &mut [Scope], already_in_bloc: bool) {
    if already_in_bloc {
        return; // still inside an enclosing block
    }
    for scope in scopes.iter_mut().rev() {
        if scope.bloc {
            scope.bloc = false;
            break;
        }
    }
}

// -------------------------------------------------------------------------
//  The dispatcher
// -------------------------------------------------------------------------

fn build_dfg_content(
    g: &mut Pdg,
    child: NodeId,
    scopes: &mut Vec<Scope>,
    id_list: &mut IdList,
    entry: u32,
    ctx: &mut DfCtx,
) -> TaintResult<()> {
    let name = g[child].name.clone();
    match name.as_str() {
        "VariableDeclaration" => {
            let mut let_const = false;
            let kind_is_var = g[child].attr_str("kind") == Some("var");
            if !kind_is_var && scopes.last().is_some_and(|s| s.bloc) {
                let_const = true;
                let parent_id = g[child].parent.map(|p| p.0).unwrap_or_default();
                let scope_name = format!("let_const{parent_id}");
                if scopes.last().is_some_and(|s| s.name != scope_name) {
                    scopes.push(Scope::new(scope_name));
                }
            }
            for grandchild in g[child].children.clone() {
                var_declaration_df(g, grandchild, scopes, id_list, entry, let_const, ctx)?;
            }
        }

        "AssignmentExpression" => {
            assignment_expr_df(g, child, scopes, id_list, entry, ctx)?;
        }

        n if CALL_EXPR.contains(n) => {
            df_scoping(g, child, scopes, id_list, 0, ctx)?;
            let Some(&callee) = g[child].children.first() else {
                return Ok(());
            };
            let tagged_template = n == "TaggedTemplateExpression";

            if g[callee].cat == Category::FunctionExpression {
                // immediately invoked function expression
                handle_call_expr(g, child, scopes, callee, true, tagged_template, ctx)?;
            } else if let SymValue::Ref(resolved) = computed_value(g, callee, Some(child))
                && g[resolved].cat == Category::FunctionExpression
            {
                // a = {}; a['b'] = function(){}; a['b']()
                handle_call_expr(g, child, scopes, resolved, true, tagged_template, ctx)?;
            } else {
                let mut identifiers = Vec::new();
                let mut scratch = IdList::new();
                search_identifiers(g, callee, &mut scratch, &mut identifiers, true);
                for &identifier in &identifiers {
                    for dep_parent in g[identifier].data_dep_parents.clone() {
                        if let Some(fun) = g[dep_parent].fun_ref {
                            // calling a function defined (or hoisted) before
                            handle_call_expr(g, child, scopes, fun, false, tagged_template, ctx)?;
                            break;
                        }
                    }
                }
                handle_foreach(g, child);
                handle_push(g, child);
            }
        }

        "UpdateExpression" => {
            update_expr_df(g, child, scopes, id_list, entry, ctx)?;
        }

        _ if g[child].cat.is_function() => {
            function_scope(g, child, scopes, id_list, ctx)?;
        }

        "ReturnStatement" => {
            let already_in_bloc = scopes.last().is_some_and(|s| s.bloc);
            if let Some(s) = scopes.last_mut() {
                s.bloc = true;
            }
            for scope_index in (0..scopes.len()).rev() {
                if scopes[scope_index].name != "Function" {
                    continue;
                }
                match scopes[scope_index].function {
                    Some(fun) if g[fun].fun.is_some() => {
                        g[fun].fun.as_mut().expect("checked above").add_return(child);
                    }
                    other => {
                        debug!(
                            target: "dataflow",
                            "expected a function behind the Function scope, got {other:?}"
                        );
                    }
                }
                break;
            }
            df_scoping(g, child, scopes, id_list, 0, ctx)?;
            go_out_bloc(scopes, already_in_bloc);
        }

        "ForStatement" => {
            let already_in_bloc = scopes.last().is_some_and(|s| s.bloc);
            if let Some(s) = scopes.last_mut() {
                s.bloc = true;
            }
            let children = g[child].children.clone();
            if matches!(children.len(), 3 | 4) {
                data_flow(g, children[0], scopes, id_list, entry, ctx)?; // init
                data_flow(g, children[1], scopes, id_list, entry, ctx)?; // test
                let mut identifiers = Vec::new();
                let mut scratch = IdList::new();
                search_identifiers(g, children[0], &mut scratch, &mut identifiers, true);

                // Expand the loop symbolically, at most `loop_iterations`
                // times; an undecidable test still runs the body once.
                let mut first_round = true;
                let mut loops = 0usize;
                loop {
                    let test = computed_value(g, children[1], Some(child));
                    if !(test.truthy() || first_round) {
                        break;
                    }
                    first_round = false;
                    loops += 1;
                    if loops > g.limits.loop_iterations {
                        break;
                    }
                    if children.len() == 4 {
                        data_flow(g, children[3], scopes, id_list, entry, ctx)?; // body
                    }
                    data_flow(g, children[2], scopes, id_list, entry, ctx)?; // update
                    for &identifier in &identifiers {
                        // chain the freshly written value back into the test
                        let deps = g[identifier].data_dep_children.clone();
                        if deps.len() >= 3 {
                            g.set_value(deps[0], SymValue::Ref(deps[2]));
                        }
                    }
                }
                let_const_scope(g, child, scopes);
            } else {
                debug!(
                    target: "dataflow",
                    "expected a for statement with 3 or 4 children, got {}", children.len()
                );
                statement_scope(g, child, scopes, id_list, entry, ctx)?;
            }
            go_out_bloc(scopes, already_in_bloc);
        }

        "ForOfStatement" | "ForInStatement" => {
            let already_in_bloc = scopes.last().is_some_and(|s| s.bloc);
            if let Some(s) = scopes.last_mut() {
                s.bloc = true;
            }
            let children = g[child].children.clone();
            if children.len() == 3 {
                data_flow(g, children[0], scopes, id_list, entry, ctx)?; // variable
                data_flow(g, children[1], scopes, id_list, entry, ctx)?; // collection
                let mut identifiers = Vec::new();
                let mut scratch = IdList::new();
                search_identifiers(g, children[0], &mut scratch, &mut identifiers, true);
                if identifiers.len() > 1 {
                    debug!(
                        target: "dataflow",
                        "{} variables declared in a {}", identifiers.len(), name
                    );
                }
                let obj_value = computed_value(g, children[1], Some(child));
                let obj_children = match obj_value {
                    SymValue::Ref(obj) => g[obj].children.clone(),
                    _ => Vec::new(),
                };
                for &identifier in &identifiers {
                    for &element in &obj_children {
                        // bind each element and walk the body with it
                        let prop_value = if g[element].name == "Property" {
                            let key = g[element].children.first().copied();
                            match key {
                                Some(k) => computed_value(g, k, Some(child)),
                                None => SymValue::Null,
                            }
                        } else {
                            computed_value(g, element, Some(child))
                        };
                        g.set_value(identifier, prop_value);
                        data_flow(g, children[2], scopes, id_list, entry, ctx)?;
                    }
                }
                if identifiers.is_empty() || obj_children.is_empty() {
                    // exercise the body anyway
                    data_flow(g, children[2], scopes, id_list, entry, ctx)?;
                }
                let_const_scope(g, child, scopes);
            } else {
                debug!(
                    target: "dataflow",
                    "expected a for-in/of statement with 3 children, got {}", children.len()
                );
                statement_scope(g, child, scopes, id_list, entry, ctx)?;
            }
            go_out_bloc(scopes, already_in_bloc);
        }

        _ if g[child].is_statement() || name == "ConditionalExpression" => {
            let already_in_bloc = scopes.last().is_some_and(|s| s.bloc);
            if let Some(s) = scopes.last_mut() {
                s.bloc = true;
            }
            statement_scope(g, child, scopes, id_list, entry, ctx)?;
            go_out_bloc(scopes, already_in_bloc);
        }

        "ObjectExpression" => {
            obj_expr_scope(g, child, scopes, id_list, ctx)?;
        }

        "ObjectPattern" => {
            obj_pattern_scope(g, child, scopes, id_list, ctx)?;
        }

        "Identifier" => {
            if !id_list.contains(&child) {
                identifier_update(g, child, scopes, id_list, entry, ctx)?;
            }
        }

        _ => {
            df_scoping(g, child, scopes, id_list, 0, ctx)?;
        }
    }
    Ok(())
}
