//! The fliparoo transform: re-bracketing a maximal chain of same-polarity
//! operations (spec.md §4.3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/fliparoo.py`'s
//! `FliparooSwap`/`recursive_fliparoo`. Where the original walks Python
//! object references to find a maximal chain and then enumerates its
//! `MultSwap`/`AddSwap` rebracketings by hand, this builds the chain's
//! signed leaf list once and enumerates every full binary-tree shape over
//! it (a standard Catalan-number construction), so additive chains with a
//! `Sub` node are realized as a single upfront `Neg` per negative leaf
//! followed by pure `Add` combinators — any bracketing of those is
//! automatically value-preserving, which is why this construction never
//! needs fliparoo.py's separate "reject if the net sign changed" check.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use ec_core::{Formula, OpKind};

use crate::error::Result;
use crate::graph::FormulaGraph;
use crate::node::{Node, NodeId};

/// A maximal chain of `≥ 2` consecutive same-polarity operations,
/// collapsed to its ordered signed leaves.
#[derive(Clone, Debug)]
pub struct Fliparoo {
    /// The chain's topmost node — the one whose output feeds the rest of
    /// the formula (or is itself a declared output).
    pub top: NodeId,
    /// Every `Operation` node in the chain, top-first.
    pub chain: Vec<NodeId>,
    /// The chain's operands in left-to-right order, each tagged `true` if
    /// it contributes positively to the chain's value.
    pub leaves: Vec<(bool, NodeId)>,
    /// `true` for a `*` chain, `false` for a `+`/`-` chain.
    pub multiplicative: bool,
}

fn polarity_class(op: OpKind) -> Option<bool> {
    match op {
        OpKind::Add | OpKind::Sub => Some(true),
        OpKind::Mult => Some(false),
        _ => None,
    }
}

fn consumers(graph: &FormulaGraph, id: NodeId) -> Vec<NodeId> {
    (0..graph.len())
        .filter(|&other| {
            other != id
                && match graph.node_at(other) {
                    Node::Operation { left, right, .. } => *left == id || *right == Some(id),
                    _ => false,
                }
        })
        .collect()
}

fn continues_chain(graph: &FormulaGraph, id: NodeId, cur: NodeId, class: bool) -> bool {
    match graph.node_at(id) {
        Node::Operation { op, .. } => {
            polarity_class(*op) == Some(class) && !graph.is_output(id) && consumers(graph, id) == [cur]
        }
        _ => false,
    }
}

/// Every maximal same-polarity chain in `graph`, in node-id order.
pub fn find_fliparoos(graph: &FormulaGraph) -> Vec<Fliparoo> {
    let mut out = Vec::new();
    for id in 0..graph.len() {
        let Node::Operation { op, .. } = graph.node_at(id) else {
            continue;
        };
        let Some(class) = polarity_class(*op) else {
            continue;
        };
        let cons = consumers(graph, id);
        // `id` is the top of its own chain unless it would itself be
        // swallowed into a longer chain rooted at its sole consumer.
        let is_top = graph.is_output(id) || cons.len() != 1 || !continues_chain(graph, id, cons[0], class);
        if !is_top {
            continue;
        }

        let mut chain = Vec::new();
        let mut leaves: Vec<(bool, NodeId)> = Vec::new();
        let mut cur = id;
        loop {
            chain.push(cur);
            let Node::Operation { op: cur_op, left, right } = graph.node_at(cur).clone() else {
                unreachable!("chain walk only ever visits Operation nodes")
            };
            let positive = !matches!(cur_op, OpKind::Sub);
            if let Some(r) = right {
                leaves.push((positive, r));
            }
            if continues_chain(graph, left, cur, class) {
                cur = left;
            } else {
                leaves.push((true, left));
                break;
            }
        }
        if chain.len() < 2 {
            continue;
        }
        leaves.reverse();
        out.push(Fliparoo {
            top: id,
            chain,
            leaves,
            multiplicative: !class,
        });
    }
    out
}

enum Shape {
    Leaf(usize),
    Node(Box<Shape>, Box<Shape>),
}

fn shift(shape: &Shape, by: usize) -> Shape {
    match shape {
        Shape::Leaf(i) => Shape::Leaf(i + by),
        Shape::Node(l, r) => Shape::Node(Box::new(shift(l, by)), Box::new(shift(r, by))),
    }
}

/// Every full binary-tree shape over `n` ordered leaves (Catalan(n-1) of
/// them).
fn tree_shapes(n: usize) -> Vec<Shape> {
    if n == 1 {
        return alloc::vec![Shape::Leaf(0)];
    }
    let mut out = Vec::new();
    for split in 1..n {
        for left in tree_shapes(split) {
            for right in tree_shapes(n - split) {
                out.push(Shape::Node(Box::new(shift(&left, 0)), Box::new(shift(&right, split))));
            }
        }
    }
    out
}

fn build_tree(g: &mut FormulaGraph, shape: &Shape, leaf_ids: &[NodeId], op: OpKind, tag: usize) -> NodeId {
    match shape {
        Shape::Leaf(i) => leaf_ids[*i],
        Shape::Node(l, r) => {
            let left = build_tree(g, l, leaf_ids, op, tag);
            let right = build_tree(g, r, leaf_ids, op, tag);
            g.add_operation(format!("flip{tag}n{}", g.len()), op, left, Some(right))
        }
    }
}

/// Every re-bracketing of `chain`'s leaves, as standalone graphs with the
/// chain's top output repointed at the new tree's root. Negative additive
/// leaves are negated once up front, so every internal node of the new
/// tree is a plain `Add` (or `Mult`, for a multiplicative chain).
pub fn generate_fliparood_formulas(graph: &FormulaGraph, fliparoo: &Fliparoo, base_name: &str) -> Vec<Formula> {
    let shapes = tree_shapes(fliparoo.leaves.len());
    let op_kind = if fliparoo.multiplicative { OpKind::Mult } else { OpKind::Add };
    let mut out = Vec::with_capacity(shapes.len());
    for (i, shape) in shapes.iter().enumerate() {
        let mut g = graph.clone();
        let leaf_ids: Vec<NodeId> = fliparoo
            .leaves
            .iter()
            .map(|&(positive, id)| {
                if fliparoo.multiplicative || positive {
                    id
                } else {
                    g.add_operation(format!("flip{i}neg{id}"), OpKind::Neg, id, None)
                }
            })
            .collect();
        let root = build_tree(&mut g, shape, &leaf_ids, op_kind, i);
        g.replace_references(fliparoo.top, root);
        g.prune_dangling();
        out.push(g.to_formula(format!("{base_name}-flip{i}"), Some(&format!("f{i}"))));
    }
    out
}

/// Repeatedly apply every fliparoo found at each round, up to `depth`
/// rounds, accumulating every formula discovered along the way (mirrors
/// `fliparoo.py`'s `recursive_fliparoo`).
pub fn recursive_fliparoo(formula: &Formula, depth: usize) -> Result<Vec<Formula>> {
    let mut frontier = alloc::vec![formula.clone()];
    let mut all = Vec::new();
    for _ in 0..depth {
        let mut next = Vec::new();
        for f in &frontier {
            let g = FormulaGraph::new(f)?;
            for fl in find_fliparoos(&g) {
                next.extend(generate_fliparood_formulas(&g, &fl, &f.name));
            }
        }
        if next.is_empty() {
            break;
        }
        all.extend(next.clone());
        frontier = next;
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;
    use ec_core::{Assumption, CodeOp, CoordinateModel, CurveModel, FormulaKind, Operand};
    use modfield::symbolic::Expr;

    fn chain_formula() -> Formula {
        // x3 = ((x1 + x2) + x3in) + x4in : a length-3 additive chain.
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
            name: "chain-toy".into(),
            kind: FormulaKind::Doubling,
            coordinate_model,
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: vec![
                CodeOp::binary("t0".to_string(), OpKind::Add, Operand::Var("x1".into()), Operand::Var("x2".into())),
                CodeOp::binary("t1".to_string(), OpKind::Add, Operand::Var("t0".into()), Operand::Var("x3in".into())),
                CodeOp::binary("x3".to_string(), OpKind::Add, Operand::Var("t1".into()), Operand::Var("x4in".into())),
            ],
            unified: false,
            source: None,
        }
    }

    #[test]
    fn finds_the_whole_additive_chain() {
        let formula = chain_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let chains = find_fliparoos(&graph);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].leaves.len(), 4);
        assert!(!chains[0].multiplicative);
    }

    #[test]
    fn rebracketings_cover_every_binary_tree_shape() {
        let formula = chain_formula();
        let graph = FormulaGraph::new(&formula).unwrap();
        let chain = &find_fliparoos(&graph)[0];
        let variants = generate_fliparood_formulas(&graph, chain, "chain-toy");
        // Catalan(3) = 5 distinct full binary trees over 4 leaves.
        assert_eq!(variants.len(), 5);
        for variant in &variants {
            assert_eq!(variant.code.last().unwrap().result, "x3");
        }
    }
}
