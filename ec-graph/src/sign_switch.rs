//! The sign-switch and switch-sides transforms (spec.md §4.3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/fliparoo.py`'s
//! sibling sign-rewriting passes. `sign_switch` swaps a subtraction node's
//! operands (`a - b` becomes `b - a`, negating its value) and accepts the
//! candidate only if that negation provably cancels out by the time it
//! reaches every declared output — checked here by propagating an exact
//! `+1`/`-1` multiplier through each downstream op rather than by
//! re-evaluating the formula numerically.

use alloc::vec::Vec;

use ec_core::OpKind;

use crate::error::{Error, Result};
use crate::graph::FormulaGraph;
use crate::node::{Node, NodeId};

/// Every `Sub` node in `graph`, in node-id order — the candidates a
/// `sign_switch` subset is drawn from.
pub fn sub_nodes(graph: &FormulaGraph) -> Vec<NodeId> {
    (0..graph.len())
        .filter(|&id| matches!(graph.node_at(id), Node::Operation { op: OpKind::Sub, .. }))
        .collect()
}

/// Propagate the sign multiplier each node's value carries relative to the
/// original graph, given that every id in `swapped` has had its operands
/// reversed. `None` if an `Add`/`Sub` node would mix a flipped and an
/// unflipped operand, which breaks the clean multiplicative relationship
/// this transform requires.
fn propagate_signs(graph: &FormulaGraph, swapped: &[NodeId]) -> Option<Vec<i8>> {
    let mut sign = alloc::vec![1i8; graph.len()];
    // Nodes only ever reference lower ids, so an ascending pass is already
    // topological.
    for id in 0..graph.len() {
        let Node::Operation { op, left, right } = graph.node_at(id) else {
            continue;
        };
        let sl = sign[*left];
        sign[id] = match op {
            OpKind::Id | OpKind::Inv | OpKind::Neg => sl,
            OpKind::Sqr => 1,
            OpKind::Pow => {
                let exp = match right.map(|r| graph.node_at(r)) {
                    Some(Node::Constant { value }) => *value,
                    _ => return None,
                };
                if exp.rem_euclid(2) == 0 {
                    1
                } else {
                    sl
                }
            }
            OpKind::Add => {
                let sr = sign[right.unwrap()];
                if sl != sr {
                    return None;
                }
                sl
            }
            OpKind::Sub => {
                let sr = sign[right.unwrap()];
                if sl != sr {
                    return None;
                }
                // A node whose operands are exchanged computes
                // `right - left` instead of `left - right`: an extra
                // negation on top of whatever sign its (now-swapped)
                // children already carry.
                if swapped.contains(&id) {
                    -sl
                } else {
                    sl
                }
            }
            OpKind::Mult | OpKind::Div => sl * sign[right.unwrap()],
        };
    }
    Some(sign)
}

/// Swap the operands of every `Sub` node in `subset`, accepting the result
/// only if every declared output's sign multiplier comes out to `+1`.
/// Returns `Ok(None)` (not an error) for a subset that fails that check —
/// it is a legitimate candidate that simply does not yield an equivalent
/// formula, not a malformed request.
pub fn sign_switch(graph: &FormulaGraph, subset: &[NodeId]) -> Result<Option<FormulaGraph>> {
    for &id in subset {
        if !matches!(graph.node_at(id), Node::Operation { op: OpKind::Sub, .. }) {
            return Err(Error::NoMatch("subtraction node"));
        }
    }
    let Some(sign) = propagate_signs(graph, subset) else {
        return Ok(None);
    };
    if graph.output_nodes().iter().any(|(_, id)| sign[*id] != 1) {
        return Ok(None);
    }
    let mut g = graph.clone();
    for &id in subset {
        if let Node::Operation { left, right: Some(right), .. } = graph.node_at(id).clone() {
            g.set_operands(id, right, Some(left));
        }
    }
    Ok(Some(g))
}

/// Every non-empty subset of `graph`'s subtraction nodes whose `sign_switch`
/// is accepted. Bounded to formulas with at most 12 subtraction nodes (the
/// EFD's largest formulas have a handful), since the candidate count is
/// `2^n - 1`.
pub fn generate_sign_switches(graph: &FormulaGraph) -> Result<Vec<FormulaGraph>> {
    let subs = sub_nodes(graph);
    let mut out = Vec::new();
    if subs.is_empty() || subs.len() > 12 {
        return Ok(out);
    }
    for mask in 1u32..(1u32 << subs.len()) {
        let subset: Vec<NodeId> = (0..subs.len()).filter(|i| mask & (1 << i) != 0).map(|i| subs[i]).collect();
        if let Some(g) = sign_switch(graph, &subset)? {
            out.push(g);
        }
    }
    Ok(out)
}

/// Swap the operand order of a commutative binary node (`Add` or `Mult`).
/// Always value-preserving, unlike `sign_switch`.
pub fn switch_sides(graph: &FormulaGraph, id: NodeId) -> Result<FormulaGraph> {
    let Node::Operation { op, left, right: Some(right) } = graph.node_at(id).clone() else {
        return Err(Error::NoMatch("commutative binary operation"));
    };
    if !matches!(op, OpKind::Add | OpKind::Mult) {
        return Err(Error::NoMatch("commutative binary operation"));
    }
    let mut g = graph.clone();
    g.set_operands(id, right, Some(left));
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;
    use ec_core::{Assumption, CodeOp, CoordinateModel, CurveModel, Formula, FormulaKind, Operand};
    use modfield::symbolic::Expr;

    fn sub_formula() -> Formula {
        // x3 = 2 * (x1 - x2) : flipping the inner subtraction requires the
        // outer multiplication's sign to absorb it, which it does exactly.
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
        let coordinate_model = Rc::new(CoordinateModel::affine(curve_model));
        Formula {
            name: "sub-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model,
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![
                CodeOp::binary("t0".to_string(), OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x2".into())),
                CodeOp::binary("x3".to_string(), OpKind::Mult, Operand::Literal(2), Operand::Var("t0".into())),
            ],
            unified: false,
            source: None,
        }
    }

    #[test]
    fn swapping_a_subtraction_under_a_bare_mult_is_rejected() {
        let formula = sub_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let subs = sub_nodes(&graph);
        assert_eq!(subs.len(), 1);
        // Mult's sign is sign(2-literal)=+1 times sign(t0)=-1 => -1 at the
        // output, so this candidate must be rejected.
        assert!(sign_switch(&graph, &subs).unwrap().is_none());
    }

    #[test]
    fn double_subtraction_cancels_back_to_a_valid_formula() {
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
        let coordinate_model = Rc::new(CoordinateModel::affine(curve_model));
        // x3 = (x1 - x2) - (x3in - x4in): flipping all three subtractions
        // (both inner differences and the outer one combining them)
        // negates, then re-negates, the value unchanged.
        let formula = Formula {
            name: "double-sub-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model,
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![
                CodeOp::binary("t0".to_string(), OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x2".into())),
                CodeOp::binary("t1".to_string(), OpKind::Sub, Operand::Var("x3in".into()), Operand::Var("x4in".into())),
                CodeOp::binary("x3".to_string(), OpKind::Sub, Operand::Var("t0".into()), Operand::Var("t1".into())),
            ],
            unified: false,
            source: None,
        };
        let graph = FormulaGraph::new(&formula).unwrap();
        let subs = sub_nodes(&graph);
        assert_eq!(subs.len(), 3);
        assert!(sign_switch(&graph, &subs).unwrap().is_some());
        // Swapping only the two inner differences, without the outer
        // combiner, leaves a net sign flip and must be rejected.
        let inner_two: Vec<NodeId> = subs[..2].to_vec();
        assert!(sign_switch(&graph, &inner_two).unwrap().is_none());
    }

    #[test]
    fn switch_sides_swaps_a_commutative_operand_pair() {
        let formula = sub_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let mult_id = graph
            .nodes()
            .iter()
            .position(|n| matches!(n, Node::Operation { op: OpKind::Mult, .. }))
            .unwrap();
        let swapped = switch_sides(&graph, mult_id).unwrap();
        let rebuilt = swapped.to_formula("sub-toy-swapped", None);
        assert_eq!(rebuilt.code.last().unwrap().result, "x3");
    }
}
