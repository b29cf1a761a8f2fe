//! `FormulaGraph`: an arena-indexed DAG equivalent to a [`Formula`]'s
//! straight-line code (spec.md §4.3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/graph.py`'s
//! `CodeFormulaGraph`: `node_index`/`to_formula`/`levels`/`reindex`/
//! `find_all_paths` all have a direct counterpart here, adapted to the
//! arena-of-ids shape the rest of this workspace uses instead of Python's
//! graph of cross-referencing objects.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rustc_hash::FxHashMap;

use ec_core::{Assumption, CodeOp, CoordinateModel, Formula, FormulaKind, OpKind, Operand};

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};

/// The DAG representation of one formula's code, plus enough metadata
/// (parameters, assumptions, coordinate model) to turn it back into a
/// runnable [`Formula`] after being rewritten by a transform.
#[derive(Clone, Debug)]
pub struct FormulaGraph {
    /// The coordinate system the underlying formula operates in.
    pub coordinate_model: Rc<CoordinateModel>,
    /// The formula shape (addition, doubling, ...).
    pub kind: FormulaKind,
    /// Free parameters carried over from the source formula.
    pub parameters: Vec<String>,
    /// Assumptions carried over from the source formula.
    pub assumptions: Vec<Assumption>,
    /// Whether the source formula was unified.
    pub unified: bool,
    /// Provenance string, purely informational.
    pub source: Option<String>,
    nodes: Vec<Node>,
    labels: Vec<String>,
    /// Output variable name → producing node, in the source formula's
    /// output order.
    outputs: Vec<(String, NodeId)>,
}

impl FormulaGraph {
    /// Build the DAG from `formula.code`, resolving each `CodeOp`'s
    /// operands to the node that produced them (creating an `Input` leaf
    /// the first time a free variable is referenced).
    pub fn new(formula: &Formula) -> Result<Self> {
        let mut graph = FormulaGraph {
            coordinate_model: formula.coordinate_model.clone(),
            kind: formula.kind,
            parameters: formula.parameters.clone(),
            assumptions: formula.assumptions.clone(),
            unified: formula.unified,
            source: formula.source.clone(),
            nodes: Vec::new(),
            labels: Vec::new(),
            outputs: Vec::new(),
        };
        let mut name_to_id: FxHashMap<String, NodeId> = FxHashMap::default();
        for op in &formula.code {
            let left = graph.resolve(&mut name_to_id, &op.left);
            let right = op.right.as_ref().map(|r| graph.resolve(&mut name_to_id, r));
            let id = graph.push(
                Node::Operation {
                    op: op.op,
                    left,
                    right,
                },
                op.result.clone(),
            );
            name_to_id.insert(op.result.clone(), id);
        }

        let output_index = formula.output_index();
        for i in 0..formula.kind.num_outputs() {
            for var in &formula.coordinate_model.variables {
                let full = ec_core::point::suffixed(var, output_index + i);
                let id = *name_to_id
                    .get(&full)
                    .ok_or_else(|| Error::MissingOutput(full.clone()))?;
                graph.outputs.push((full, id));
            }
        }
        Ok(graph)
    }

    fn push(&mut self, node: Node, label: String) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        self.labels.push(label);
        id
    }

    fn resolve(&mut self, name_to_id: &mut FxHashMap<String, NodeId>, operand: &Operand) -> NodeId {
        match operand {
            Operand::Var(name) => {
                if let Some(&id) = name_to_id.get(name) {
                    id
                } else {
                    let id = self.push(Node::Input { name: name.clone() }, name.clone());
                    name_to_id.insert(name.clone(), id);
                    id
                }
            }
            Operand::Literal(value) => self.push(Node::Constant { value: *value }, value.to_string()),
        }
    }

    /// Every node, in the topological (definition) order they were built
    /// in.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The current label of `id` — a variable name for `Input`/`Operation`
    /// nodes, or the literal's decimal text for `Constant`.
    pub fn label(&self, id: NodeId) -> &str {
        &self.labels[id]
    }

    /// The nodes this formula's declared outputs resolve to, in order.
    pub fn output_nodes(&self) -> &[(String, NodeId)] {
        &self.outputs
    }

    pub(crate) fn is_output(&self, id: NodeId) -> bool {
        self.outputs.iter().any(|(_, out_id)| *out_id == id)
    }

    /// Rename every `Operation` node that is not a declared output to a
    /// fresh `iv0, iv1, ...` label, in topological order. `Input` labels
    /// (free variable names) and output labels are left untouched.
    pub fn reindex(&mut self) {
        let mut counter = 0usize;
        for id in 0..self.nodes.len() {
            if matches!(self.nodes[id], Node::Operation { .. }) && !self.is_output(id) {
                self.labels[id] = format!("iv{counter}");
                counter += 1;
            }
        }
    }

    fn operand_for(&self, id: NodeId) -> Operand {
        match &self.nodes[id] {
            Node::Constant { value } => Operand::Literal(*value),
            _ => Operand::Var(self.labels[id].clone()),
        }
    }

    /// Materialize a runnable [`Formula`] by emitting one `CodeOp` per
    /// `Operation` node in topological order. With `suffix` set, every
    /// intermediate (non-input, non-output) label is suffixed, so the
    /// result can be spliced next to other formulas' code without name
    /// collisions.
    pub fn to_formula(&self, name: impl Into<String>, suffix: Option<&str>) -> Formula {
        let rename = |id: NodeId| -> String {
            // A declared output keeps its canonical name regardless of
            // which node currently produces it — a transform that
            // repoints an output at a freshly built node must not change
            // the name `Formula::call` looks the result up under.
            if let Some((out_name, _)) = self.outputs.iter().find(|(_, out_id)| *out_id == id) {
                return out_name.clone();
            }
            let label = &self.labels[id];
            match suffix {
                Some(s) if matches!(self.nodes[id], Node::Operation { .. }) => format!("{label}{s}"),
                _ => label.clone(),
            }
        };
        let operand = |id: NodeId| -> Operand {
            match &self.nodes[id] {
                Node::Constant { value } => Operand::Literal(*value),
                _ => Operand::Var(rename(id)),
            }
        };
        let mut code = Vec::with_capacity(self.nodes.len());
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Operation { op, left, right } = node {
                let result = rename(id);
                code.push(match right {
                    Some(right) => CodeOp::binary(result, *op, operand(*left), operand(*right)),
                    None => CodeOp::unary(result, *op, operand(*left)),
                });
            }
        }
        Formula {
            name: name.into(),
            kind: self.kind,
            coordinate_model: self.coordinate_model.clone(),
            parameters: self.parameters.clone(),
            assumptions: self.assumptions.clone(),
            code,
            unified: self.unified,
            source: self.source.clone(),
        }
    }

    /// Depth of every node from the nearest leaf (`Input`/`Constant` nodes
    /// are depth 0), grouped by depth — `levels()[d]` is every node whose
    /// longest dependency chain has length `d`. Mirrors `graph.py`'s
    /// `levels` (there built from `networkx`'s longest-path layering).
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut depth = alloc::vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Operation { left, right, .. } = node {
                let mut d = depth[*left] + 1;
                if let Some(right) = right {
                    d = d.max(depth[*right] + 1);
                }
                depth[id] = d;
                max_depth = max_depth.max(d);
            }
        }
        let mut levels = alloc::vec![Vec::new(); max_depth + 1];
        for (id, &d) in depth.iter().enumerate() {
            levels[d].push(id);
        }
        levels
    }

    /// Every simple path (by node id) from `from` back to `to` following
    /// dependency edges (a node to the operands it reads), i.e. `to` must
    /// be a dependency of `from`. Mirrors `graph.py`'s `find_all_paths`,
    /// which enumerates consumer→producer chains for a given input/output
    /// pair.
    pub fn find_all_paths(&self, from: NodeId, to: NodeId) -> Vec<Vec<NodeId>> {
        let mut paths = Vec::new();
        let mut stack = alloc::vec![from];
        self.walk_paths(from, to, &mut stack, &mut paths);
        paths
    }

    fn walk_paths(&self, current: NodeId, to: NodeId, stack: &mut Vec<NodeId>, paths: &mut Vec<Vec<NodeId>>) {
        if current == to {
            paths.push(stack.clone());
            return;
        }
        if let Node::Operation { left, right, .. } = &self.nodes[current] {
            let children: Vec<NodeId> = core::iter::once(*left).chain(right.iter().copied()).collect();
            for child in children {
                if stack.contains(&child) {
                    continue;
                }
                stack.push(child);
                self.walk_paths(child, to, stack, paths);
                stack.pop();
            }
        }
    }

    /// Remove a node with no remaining dependents (neither an output nor
    /// referenced as an operand of any surviving node). Returns whether
    /// anything was removed; removing a node with dependents is a no-op to
    /// keep the graph a valid DAG.
    pub fn remove_dangling(&mut self, id: NodeId) -> bool {
        if self.is_output(id) {
            return false;
        }
        let referenced = self.nodes.iter().enumerate().any(|(other, node)| {
            other != id
                && match node {
                    Node::Operation { left, right, .. } => *left == id || *right == Some(id),
                    _ => false,
                }
        });
        if referenced {
            return false;
        }
        // Arena slots are never physically compacted (ids must stay
        // stable for every other node's edges); a dangling node is
        // neutralized into an unreferenced input leaf instead.
        self.nodes[id] = Node::Input {
            name: format!("__removed_{id}"),
        };
        true
    }

    /// Drop every node `remove_dangling` can reach, repeating until none
    /// remain. Used after a transform prunes an output's producer chain
    /// (e.g. after `partition` folds two additions into one).
    pub fn prune_dangling(&mut self) {
        loop {
            let mut changed = false;
            for id in 0..self.nodes.len() {
                if matches!(self.nodes[id], Node::Operation { .. }) && self.remove_dangling(id) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Append a new `Operation` node and return its id, without touching
    /// any existing node. Used by transforms to splice in replacement
    /// code before repointing outputs at it.
    pub fn add_operation(&mut self, label: impl Into<String>, op: OpKind, left: NodeId, right: Option<NodeId>) -> NodeId {
        self.push(Node::Operation { op, left, right }, label.into())
    }

    /// Add a fresh `Input` leaf (used by transforms that need a dummy
    /// placeholder node, e.g. fliparoo's zero leaf for an odd chain).
    pub fn add_input(&mut self, name: impl Into<String>) -> NodeId {
        self.push(Node::Input { name: name.into() }, String::new())
    }

    /// Re-point a declared output at a different producing node (e.g.
    /// after a transform rewrites the subgraph feeding it).
    pub fn set_output(&mut self, name: &str, id: NodeId) {
        if let Some(entry) = self.outputs.iter_mut().find(|(n, _)| n == name) {
            entry.1 = id;
        }
    }

    pub(crate) fn node_at(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Append a new `Constant` leaf and return its id.
    pub(crate) fn push_constant(&mut self, value: i64) -> NodeId {
        self.push(Node::Constant { value }, value.to_string())
    }

    /// Overwrite an existing `Operation` node's operands in place, keeping
    /// its id (and thus every other node's edges into it) stable. Used by
    /// `sign_switch`/`switch_sides`, which rewrite a node without
    /// disturbing the rest of the graph.
    pub(crate) fn set_operands(&mut self, id: NodeId, left: NodeId, right: Option<NodeId>) {
        if let Node::Operation { op, .. } = &self.nodes[id] {
            let op = *op;
            self.nodes[id] = Node::Operation { op, left, right };
        }
    }

    /// Repoint every edge (operand references and declared outputs)
    /// currently aimed at `old` to `new`. `old` is left in the arena as an
    /// orphan, to be swept by `prune_dangling`. Used by transforms that
    /// splice a freshly built subgraph in place of an existing one.
    pub(crate) fn replace_references(&mut self, old: NodeId, new: NodeId) {
        for node in &mut self.nodes {
            if let Node::Operation { left, right, .. } = node {
                if *left == old {
                    *left = new;
                }
                if *right == Some(old) {
                    *right = Some(new);
                }
            }
        }
        for (_, id) in &mut self.outputs {
            if *id == old {
                *id = new;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_core::CurveModel;
    use modfield::symbolic::Expr;

    fn toy_formula() -> Formula {
        // x3 = -(x1 + 2), a doubling-shaped toy with one input coordinate.
        let curve_model = CurveModel::new(
            "shortw",
            alloc::vec!["a".into(), "b".into()],
            alloc::vec!["x".into()],
            Assumption::new(Expr::Var("y2".into()), Expr::Var("rhs".into())),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let coordinate_model = Rc::new(CoordinateModel::affine(curve_model));
        Formula {
            name: "dbl-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model,
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: alloc::vec![
                CodeOp::binary("t0".to_string(), OpKind::Add, Operand::Var("x1".into()), Operand::Literal(2)),
                CodeOp::unary("x3".to_string(), OpKind::Neg, Operand::Var("t0".into())),
            ],
            unified: false,
            source: None,
        }
    }

    #[test]
    fn builds_one_input_one_constant_two_ops() {
        let formula = toy_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        assert_eq!(graph.nodes().len(), 4);
        assert_eq!(graph.output_nodes().len(), 1);
        assert_eq!(graph.output_nodes()[0].0, "x3");
    }

    #[test]
    fn reindex_leaves_inputs_and_outputs_but_renames_intermediate() {
        let formula = toy_formula();
        let mut graph = FormulaGraph::new(&formula).unwrap();
        graph.reindex();
        // t0 is neither input nor output, so it gets an iv-label.
        let t0_id = graph
            .nodes()
            .iter()
            .position(|n| matches!(n, Node::Operation { op: OpKind::Add, .. }))
            .unwrap();
        assert_eq!(graph.label(t0_id), "iv0");
    }

    #[test]
    fn to_formula_round_trips_code_shape() {
        let formula = toy_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let rebuilt = graph.to_formula("dbl-toy-rebuilt", None);
        assert_eq!(rebuilt.code.len(), 2);
        assert_eq!(rebuilt.code.last().unwrap().result, "x3");
    }

    #[test]
    fn levels_place_input_and_constant_at_depth_zero() {
        let formula = toy_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let levels = graph.levels();
        assert_eq!(levels[0].len(), 2); // x1, literal 2
        assert_eq!(levels[1].len(), 1); // t0
        assert_eq!(levels[2].len(), 1); // x3
    }

    #[test]
    fn find_all_paths_reaches_the_input_from_the_output() {
        let formula = toy_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let x3 = graph.output_nodes()[0].1;
        let x1 = graph
            .nodes()
            .iter()
            .position(|n| matches!(n, Node::Input { name } if name == "x1"))
            .unwrap();
        let paths = graph.find_all_paths(x3, x1);
        assert_eq!(paths.len(), 1);
    }
}
