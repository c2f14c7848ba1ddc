use crate::pdg::node::{NodeId, Pdg};

/// One frame of the scope stack: the identifiers visible at this level and
/// their current "last writer" occurrence. The name index is maintained
/// eagerly on every mutation.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub name: String,
    pub var_list: Vec<NodeId>,
    /// Parallel to `var_list`: variables assigned in both arms of a
    /// conditional, so later reads join on either writer.
    pub var_if2_list: Vec<Option<Vec<NodeId>>>,
    /// Uses without a visible binding, in first-seen order.
    pub unknown_var: Vec<NodeId>,
    /// Back-reference to the function node owning this frame.
    pub function: Option<NodeId>,
    /// Whether traversal currently sits inside a block statement.
    pub bloc: bool,
    names: Vec<String>,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_var(&mut self, g: &Pdg, node: NodeId) {
        self.var_list.push(node);
        self.var_if2_list.push(None);
        self.names
            .push(g[node].ident_name().unwrap_or_default().to_owned());
    }

    pub fn update_var(&mut self, g: &Pdg, index: usize, node: NodeId) {
        self.var_list[index] = node;
        self.var_if2_list[index] = None;
        self.names[index] = g[node].ident_name().unwrap_or_default().to_owned();
    }

    pub fn update_var_if2(&mut self, index: usize, nodes: Vec<NodeId>) {
        self.var_if2_list[index] = Some(nodes);
    }

    pub fn add_var_if2(&mut self, index: usize, node: NodeId) {
        self.var_if2_list[index]
            .get_or_insert_with(Vec::new)
            .push(node);
    }

    pub fn add_unknown_var(&mut self, node: NodeId) {
        if !self.unknown_var.contains(&node) {
            self.unknown_var.push(node);
        }
    }

    pub fn remove_unknown_var(&mut self, node: NodeId) {
        self.unknown_var.retain(|n| *n != node);
    }

    /// Position of an identifier (by name) in this frame.
    pub fn get_pos_identifier(&self, g: &Pdg, node: NodeId) -> Option<usize> {
        let name = g[node].ident_name()?;
        self.get_pos_name(name)
    }

    pub fn get_pos_name(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn is_equal(&self, other: &Scope) -> bool {
        self.var_list == other.var_list && self.var_if2_list == other.var_if2_list
    }
}

/// Position of `node` in the stack, searching from the innermost scope out
/// to the global one. Returns (variable index, scope index).
pub fn get_pos_identifier(g: &Pdg, node: NodeId, scopes: &[Scope]) -> Option<(usize, usize)> {
    for (scope_index, scope) in scopes.iter().enumerate().rev() {
        if let Some(var_index) = scope.get_pos_identifier(g, node) {
            return Some((var_index, scope_index));
        }
    }
    None
}
