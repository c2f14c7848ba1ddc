pub mod ast;
pub mod control;
pub mod dataflow;
pub mod node;
pub mod pointer;
pub mod reserved;
pub mod scope;
pub mod value;

use crate::config::{Deadline, Limits};
use crate::errors::TaintError;
use dataflow::{DfCtx, IdList};
use node::{NodeId, Pdg};
use scope::Scope;
use tracing::{debug, error};

/// Result of one page's PDG construction. A timed-out build yields an empty
/// `Program` so the resolver sees no flows.
pub struct BuildOutcome {
    pub graph: Pdg,
    pub root: NodeId,
    pub timed_out: bool,
}

/// An empty `Program` graph, the degraded stand-in for unparseable pages.
pub fn empty_pdg(limits: Limits) -> (Pdg, NodeId) {
    let mut g = Pdg::new(limits);
    let root = g.add_node("Program", None);
    (g, root)
}

/// Build the PDG for one parsed page: adapt the AST document, hoist function
/// declarations, add control flow, then run the scope-aware data-flow pass
/// under the cooperative deadline.
pub fn build_pdg(doc: &serde_json::Value, limits: Limits, deadline: Deadline) -> BuildOutcome {
    let mut g = Pdg::new(limits);
    let root = ast::build_graph(&mut g, doc);
    ast::function_hoisting(&mut g, root, root);
    control::control_flow(&mut g, root);

    let mut scopes = vec![Scope::new("Global")];
    let mut id_list = IdList::new();
    let mut ctx = DfCtx::new(deadline, limits.traversal_depth);

    match dataflow::df_scoping(&mut g, root, &mut scopes, &mut id_list, 1, &mut ctx) {
        Ok(()) => {
            report_unknown_vars(&g, &scopes);
            debug!(target: "pdg", nodes = g.len(), "PDG build complete");
            BuildOutcome {
                graph: g,
                root,
                timed_out: false,
            }
        }
        Err(TaintError::BuildTimeout) => {
            error!(target: "pdg", "building the PDG timed out");
            let (graph, root) = empty_pdg(limits);
            BuildOutcome {
                graph,
                root,
                timed_out: true,
            }
        }
        Err(e) => {
            error!(target: "pdg", "data-flow pass failed: {e}");
            let (graph, root) = empty_pdg(limits);
            BuildOutcome {
                graph,
                root,
                timed_out: false,
            }
        }
    }
}

/// Variables that stayed unknown after the whole pass. A hoisted function
/// resolves its forward uses, so only edge-less entries are reported.
fn report_unknown_vars(g: &Pdg, scopes: &[Scope]) {
    for scope in scopes {
        for &unknown in &scope.unknown_var {
            if g[unknown].data_dep_parents.is_empty() {
                debug!(
                    target: "pdg",
                    "the variable {:?} is not declared in the scope {}",
                    g[unknown].ident_name(),
                    scope.name
                );
            }
        }
    }
}
