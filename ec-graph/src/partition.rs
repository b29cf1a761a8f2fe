//! The partition/expand and reduce-all transforms (spec.md §4.3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/fliparoo.py`'s
//! constant-multiplication rewrites: `expand` replaces `c * v` by a sum of
//! `v` added to itself according to an integer partition of `c` (useful
//! for deriving formulas that trade a multiplication for cheaper
//! additions), and `reduce_all` is its inverse closure, folding `X + X`
//! back into `2 * X` and collapsing nested constant multiplications.

use alloc::format;
use alloc::vec::Vec;

use ec_core::OpKind;

use crate::error::{Error, Result};
use crate::graph::FormulaGraph;
use crate::node::{Node, NodeId};

/// Replace the constant multiplication at `mult_id` (`c * v` or `v * c`)
/// with an addition tree over `partition`, a list of positive integers
/// summing to `c`. A part equal to `1` contributes `v` directly; any other
/// part `p` contributes a fresh `p * v` leaf.
pub fn expand(graph: &FormulaGraph, mult_id: NodeId, partition: &[u64]) -> Result<FormulaGraph> {
    let Node::Operation { op: OpKind::Mult, left, right: Some(right) } = graph.node_at(mult_id).clone() else {
        return Err(Error::NoMatch("constant multiplication"));
    };
    let (const_id, var_id) = match (graph.node_at(left), graph.node_at(right)) {
        (Node::Constant { .. }, _) => (left, right),
        (_, Node::Constant { .. }) => (right, left),
        _ => return Err(Error::NoMatch("constant multiplication")),
    };
    let c: u64 = match graph.node_at(const_id) {
        Node::Constant { value } if *value >= 0 => *value as u64,
        _ => return Err(Error::NoMatch("non-negative constant multiplier")),
    };
    if partition.is_empty() || partition.iter().any(|&p| p == 0) || partition.iter().sum::<u64>() != c {
        return Err(Error::NoMatch("partition summing to the constant"));
    }

    let mut g = graph.clone();
    let parts: Vec<NodeId> = partition
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if p == 1 {
                var_id
            } else {
                let lit = g.push_constant(p as i64);
                g.add_operation(format!("part{mult_id}_{i}"), OpKind::Mult, lit, Some(var_id))
            }
        })
        .collect();
    let mut acc = parts[0];
    for (i, &leaf) in parts.iter().enumerate().skip(1) {
        acc = g.add_operation(format!("sum{mult_id}_{i}"), OpKind::Add, acc, Some(leaf));
    }
    g.replace_references(mult_id, acc);
    g.prune_dangling();
    Ok(g)
}

/// Fold `X + X` into `2 * X` and collapse `c1 * (c2 * v)` into
/// `(c1 * c2) * v`, repeating until no further fold applies.
pub fn reduce_all(graph: &FormulaGraph) -> FormulaGraph {
    let mut g = graph.clone();
    loop {
        let mut changed = false;
        for id in 0..g.len() {
            match g.node_at(id).clone() {
                Node::Operation { op: OpKind::Add, left, right: Some(right) } if left == right => {
                    let two = g.push_constant(2);
                    let new = g.add_operation(format!("reduce{id}"), OpKind::Mult, two, Some(left));
                    g.replace_references(id, new);
                    changed = true;
                }
                Node::Operation { op: OpKind::Mult, left, right: Some(right) } => {
                    if let Node::Constant { value: c1 } = g.node_at(left).clone() {
                        if let Node::Operation { op: OpKind::Mult, left: inner_left, right: Some(inner_right) } =
                            g.node_at(right).clone()
                        {
                            if let Node::Constant { value: c2 } = g.node_at(inner_left).clone() {
                                let prod = g.push_constant(c1 * c2);
                                let new = g.add_operation(format!("reduce{id}"), OpKind::Mult, prod, Some(inner_right));
                                g.replace_references(id, new);
                                changed = true;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        if !changed {
            break;
        }
        g.prune_dangling();
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;
    use ec_core::{Assumption, CodeOp, CoordinateModel, CurveModel, Formula, FormulaKind, Operand};
    use modfield::symbolic::Expr;

    fn toy_model() -> Rc<CoordinateModel> {
        let curve_model = CurveModel::new(
            "shortw",
            vec!["a".into(), "b".into()],
            vec!["x".into()],
            Assumption::new(Expr::Var("y2".into()), Expr::Var("rhs".into())),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        Rc::new(CoordinateModel::affine(curve_model))
    }

    fn triple_formula() -> Formula {
        // x3 = 3 * x1
        Formula {
            name: "triple-toy".into(),
            kind: FormulaKind::Tripling,
            coordinate_model: toy_model(),
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![CodeOp::binary(
                "x3".to_string(),
                OpKind::Mult,
                Operand::Literal(3),
                Operand::Var("x1".into()),
            )],
            unified: false,
            source: None,
        }
    }

    #[test]
    fn expand_splits_a_constant_multiplication_into_an_addition_tree() {
        let formula = triple_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let mult_id = graph
            .nodes()
            .iter()
            .position(|n| matches!(n, Node::Operation { op: OpKind::Mult, .. }))
            .unwrap();
        let expanded = expand(&graph, mult_id, &[1, 2]).unwrap();
        let rebuilt = expanded.to_formula("triple-toy-expanded", None);
        assert!(rebuilt.code.iter().any(|op| op.op == OpKind::Add));
        assert_eq!(rebuilt.code.last().unwrap().result, "x3");
    }

    #[test]
    fn reduce_all_folds_x_plus_x_into_a_doubling() {
        let formula = Formula {
            name: "double-add-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model: toy_model(),
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![CodeOp::binary(
                "x3".to_string(),
                OpKind::Add,
                Operand::Var("x1".into()),
                Operand::Var("x1".into()),
            )],
            unified: false,
            source: None,
        };
        let graph = FormulaGraph::new(&formula).unwrap();
        let reduced = reduce_all(&graph);
        let rebuilt = reduced.to_formula("double-add-toy-reduced", None);
        assert_eq!(rebuilt.code.len(), 1);
        assert_eq!(rebuilt.code[0].op, OpKind::Mult);
    }

    #[test]
    fn reduce_all_collapses_chained_constant_multiplication() {
        let formula = Formula {
            name: "chained-mult-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model: toy_model(),
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![
                CodeOp::binary("t0".to_string(), OpKind::Mult, Operand::Literal(2), Operand::Var("x1".into())),
                CodeOp::binary("x3".to_string(), OpKind::Mult, Operand::Literal(3), Operand::Var("t0".into())),
            ],
            unified: false,
            source: None,
        };
        let graph = FormulaGraph::new(&formula).unwrap();
        let reduced = reduce_all(&graph);
        let rebuilt = reduced.to_formula("chained-mult-toy-reduced", None);
        assert_eq!(rebuilt.code.len(), 1);
        assert_eq!(rebuilt.code[0].right, Some(Operand::Var("x1".into())));
    }
}
