//! Context & Action: an observation channel nested `Formula`/multiplier
//! code reports into, without branching on whether anyone is listening
//! (spec.md §4.6).
//!
//! Grounded on `examples/original_source/pyecsca/ec/context.py`'s
//! `Context`/`Action`/`DefaultContext`/`NullContext` classes, but passed
//! as an explicit `&mut dyn Context` argument rather than recovered from a
//! `ContextVar` thread-local singleton — spec.md §9 flags the original's
//! "current context" global as something a from-scratch design should
//! make an explicit, passable channel instead.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use num_bigint::BigUint;
use rustc_hash::FxHashMap;

use crate::op::CodeOp;
use crate::point::Point;
use modfield::Mod;

/// One nested unit of work a `Context` observes. Each variant carries just
/// enough to identify what ran; the richer `FormulaAction` payload
/// (intermediates, outputs) is built up via [`Context::log_operation`] and
/// [`Context::log_result`] calls between the matching enter/exit pair.
#[derive(Clone, Debug)]
pub enum Action {
    /// A complete `[scalar]point` multiplication.
    ScalarMultiplication {
        /// The point being multiplied.
        point: Point<Mod>,
        /// The scalar.
        scalar: BigUint,
    },
    /// A multiplier's precomputation phase.
    Precomputation {
        /// The point precomputation is based on.
        point: Point<Mod>,
    },
    /// Execution of one formula call.
    Formula {
        /// The formula's shortname (`"add"`, `"dbl"`, ...).
        shortname: &'static str,
        /// The formula's name, as looked up in the coordinate model.
        name: String,
        /// Input points, in order.
        input_points: Vec<Point<Mod>>,
    },
    /// Derivation of a keypair under some domain parameters.
    Keygen,
    /// Sampling a uniformly random element of `Z/orderZ`.
    RandomMod {
        /// The modulus sampled under.
        order: BigUint,
    },
}

/// The outcome of an [`Action`], reported to [`Context::exit_action`].
#[derive(Clone, Debug)]
pub enum ActionResult {
    /// A single output point.
    Point(Point<Mod>),
    /// Multiple output points (ladder formulas, precomputation tables).
    Points(Vec<Point<Mod>>),
    /// A single field element (random sampling).
    Value(Mod),
}

/// Observation hooks a `Formula`/`ScalarMultiplier` invocation reports
/// into. Implementations never change what gets computed — only what gets
/// recorded — so passing `&mut NullContext` must be behaviorally
/// equivalent to any other context but the empty log.
pub trait Context {
    /// An action has begun.
    fn enter_action(&mut self, action: &Action);
    /// One op inside the current (innermost open) formula action has been
    /// executed, producing `value`.
    fn log_operation(&mut self, op: &CodeOp, value: &Mod);
    /// One output point of the current formula action has been produced.
    fn log_result(&mut self, point: &Point<Mod>);
    /// The innermost open action has finished with `result`.
    fn exit_action(&mut self, result: &ActionResult);
}

/// No-op context: formula execution is identical with or without
/// observation, so this is a real, usable `Context`, not a placeholder.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullContext;

impl Context for NullContext {
    fn enter_action(&mut self, _action: &Action) {}
    fn log_operation(&mut self, _op: &CodeOp, _value: &Mod) {}
    fn log_result(&mut self, _point: &Point<Mod>) {}
    fn exit_action(&mut self, _result: &ActionResult) {}
}

/// One recorded node of a [`DefaultContext`]'s action tree.
#[derive(Clone, Debug)]
pub struct ActionNode {
    /// The action this node records.
    pub action: Action,
    /// Ops executed directly inside this action (empty for non-`Formula`
    /// actions).
    pub operations: Vec<(String, Mod)>,
    /// Output points reported directly inside this action.
    pub outputs: Vec<Point<Mod>>,
    /// Nested actions opened while this one was still open.
    pub children: Vec<ActionNode>,
    /// This action's final result, set on exit.
    pub result: Option<ActionResult>,
}

impl ActionNode {
    fn new(action: Action) -> Self {
        ActionNode {
            action,
            operations: Vec::new(),
            outputs: Vec::new(),
            children: Vec::new(),
            result: None,
        }
    }
}

/// Records every action, keeping the full nested tree — the general-
/// purpose context used for post-hoc inspection and debugging. Mirrors
/// `DefaultContext` in `examples/original_source/pyecsca/ec/context.py`,
/// generalized from its flat `actions: List[Action]` to the nested tree
/// spec.md §4.6 calls for.
#[derive(Clone, Debug, Default)]
pub struct DefaultContext {
    roots: Vec<ActionNode>,
    /// Stack of currently-open action paths, as indices from a root.
    open: Vec<Vec<usize>>,
}

impl DefaultContext {
    /// A fresh, empty context.
    pub fn new() -> Self {
        DefaultContext::default()
    }

    /// The recorded top-level actions, in order.
    pub fn roots(&self) -> &[ActionNode] {
        &self.roots
    }

    fn node_mut(&mut self, path: &[usize]) -> &mut ActionNode {
        let mut node = &mut self.roots[path[0]];
        for &i in &path[1..] {
            node = &mut node.children[i];
        }
        node
    }

    /// Non-panicking lookup of the node at `path`, if it exists.
    fn node_at(&self, path: &[usize]) -> Option<&ActionNode> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.roots.get(first)?;
        for &i in rest {
            node = node.children.get(i)?;
        }
        Some(node)
    }

    fn current_mut(&mut self) -> Option<&mut ActionNode> {
        let path = self.open.last()?.clone();
        Some(self.node_mut(&path))
    }
}

impl Context for DefaultContext {
    fn enter_action(&mut self, action: &Action) {
        let node = ActionNode::new(action.clone());
        match self.open.last().cloned() {
            None => {
                self.roots.push(node);
                self.open.push(alloc::vec![self.roots.len() - 1]);
            }
            Some(parent_path) => {
                let parent = self.node_mut(&parent_path);
                parent.children.push(node);
                let mut child_path = parent_path;
                child_path.push(parent.children.len() - 1);
                self.open.push(child_path);
            }
        }
    }

    fn log_operation(&mut self, op: &CodeOp, value: &Mod) {
        if let Some(node) = self.current_mut() {
            node.operations.push((op.result.clone(), value.clone()));
        }
    }

    fn log_result(&mut self, point: &Point<Mod>) {
        if let Some(node) = self.current_mut() {
            node.outputs.push(point.clone());
        }
    }

    fn exit_action(&mut self, result: &ActionResult) {
        if let Some(path) = self.open.pop() {
            self.node_mut(&path).result = Some(result.clone());
        }
    }
}

/// Captures only the single action living at a fixed path in the tree
/// (spec.md §4.6), for deterministic inspection of e.g. "the third
/// doubling inside this multiplication" without materializing the whole
/// tree.
#[derive(Clone, Debug)]
pub struct PathContext {
    target: Vec<usize>,
    /// The captured node, once the target path has closed.
    pub captured: Option<ActionNode>,
    inner: DefaultContext,
}

impl PathContext {
    /// Watch the action at `target` (a path of child indices from the
    /// tree root).
    pub fn new(target: Vec<usize>) -> Self {
        PathContext {
            target,
            captured: None,
            inner: DefaultContext::new(),
        }
    }
}

impl Context for PathContext {
    fn enter_action(&mut self, action: &Action) {
        self.inner.enter_action(action);
    }

    fn log_operation(&mut self, op: &CodeOp, value: &Mod) {
        self.inner.log_operation(op, value);
    }

    fn log_result(&mut self, point: &Point<Mod>) {
        self.inner.log_result(point);
    }

    fn exit_action(&mut self, result: &ActionResult) {
        self.inner.exit_action(result);
        if self.captured.is_none() {
            if let Some(node) = self.inner.node_at(&self.target) {
                if node.result.is_some() {
                    self.captured = Some(node.clone());
                }
            }
        }
    }
}

/// Tracks, for every `Point` observed while a `ScalarMultiplication` or
/// `Precomputation` action is open, which integer multiple of the base
/// point it represents — the mechanism RPA distinguishing is built on
/// (spec.md §4.7). Only `FormulaAction`s nested inside those two action
/// kinds are tracked; anything else is ignored, matching spec.md §4.6's
/// description of `MultipleContext`.
#[derive(Clone, Debug, Default)]
pub struct MultipleContext {
    /// Every point seen, mapped to the base-point multiple it represents.
    pub points: FxHashMap<PointKey, i128>,
    /// Direct formula parents of each point (by key).
    pub parents: FxHashMap<PointKey, Vec<PointKey>>,
    /// The formula shortname that produced each point (absent for the
    /// base point / precomputed inputs).
    pub formulas: FxHashMap<PointKey, &'static str>,
    /// Precomputed points, by multiple.
    pub precomp: FxHashMap<i128, Point<Mod>>,
    base_multiple: i128,
    tracking_depth: usize,
    pending_inputs: Vec<Vec<PointKey>>,
    pending_shortname: Vec<&'static str>,
    /// One entry per currently open `ScalarMultiplication`/`Precomputation`,
    /// `true` when it is a `Precomputation`. The top tells a closing
    /// `Formula` action whether its outputs belong in `precomp`.
    track_kind: Vec<bool>,
}

/// A hashable stand-in for a `Point<Mod>`, since `Mod`/`BigUint` do not
/// implement `Hash`. Built from the point's coordinates' decimal textual
/// form, which is stable for a given `Point` value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PointKey(String);

impl PointKey {
    /// The key a given point maps to in a [`MultipleContext`]'s maps.
    /// Public so downstream crates (`ec-analysis`'s EPA implementation)
    /// can look up `graph_to_check_inputs`'s `out` point in `points`/
    /// `parents` without re-running the multiplication.
    pub fn of(point: &Point<Mod>) -> Self {
        use core::fmt::Write;
        let mut s = String::new();
        if point.is_infinity() {
            let _ = write!(s, "inf");
        } else if let Point::Finite { coords, .. } = point {
            let mut names: Vec<&String> = coords.keys().collect();
            names.sort();
            for name in names {
                let _ = write!(s, "{name}={}|", coords[name]);
            }
        }
        PointKey(s)
    }
}

impl MultipleContext {
    /// A fresh context tracking multiples of `base`, itself representing
    /// multiple `1`.
    pub fn new(base: Point<Mod>) -> Self {
        let mut ctx = MultipleContext {
            points: FxHashMap::default(),
            parents: FxHashMap::default(),
            formulas: FxHashMap::default(),
            precomp: FxHashMap::default(),
            base_multiple: 1,
            tracking_depth: 0,
            pending_inputs: Vec::new(),
            pending_shortname: Vec::new(),
            track_kind: Vec::new(),
        };
        ctx.points.insert(PointKey::of(&base), 1);
        ctx
    }

    /// The recorded multiple of `point`, if it has been observed.
    pub fn multiple_of(&self, point: &Point<Mod>) -> Option<i128> {
        self.points.get(&PointKey::of(point)).copied()
    }

    fn compose(&self, shortname: &str, input_keys: &[PointKey]) -> Option<i128> {
        let m = |k: &PointKey| self.points.get(k).copied();
        match shortname {
            "dbl" => m(&input_keys[0]).map(|a| a * 2),
            "tpl" => m(&input_keys[0]).map(|a| a * 3),
            "neg" => m(&input_keys[0]).map(|a| -a),
            "scl" => m(&input_keys[0]),
            "add" => {
                let a = m(input_keys.first()?)?;
                let b = m(input_keys.get(1)?)?;
                Some(a + b)
            }
            "dadd" => {
                // inputs are [diff, P, Q]; result represents P + Q.
                let p = m(input_keys.get(1)?)?;
                let q = m(input_keys.get(2)?)?;
                Some(p + q)
            }
            _ => None,
        }
    }
}

impl Context for MultipleContext {
    fn enter_action(&mut self, action: &Action) {
        match action {
            Action::ScalarMultiplication { .. } => {
                self.tracking_depth += 1;
                self.track_kind.push(false);
            }
            Action::Precomputation { .. } => {
                self.tracking_depth += 1;
                self.track_kind.push(true);
            }
            Action::Formula {
                shortname,
                input_points,
                ..
            } if self.tracking_depth > 0 => {
                let keys: Vec<PointKey> = input_points.iter().map(PointKey::of).collect();
                self.pending_inputs.push(keys);
                self.pending_shortname.push(shortname);
            }
            _ => {}
        }
    }

    fn log_operation(&mut self, _op: &CodeOp, _value: &Mod) {}

    fn log_result(&mut self, _point: &Point<Mod>) {}

    fn exit_action(&mut self, result: &ActionResult) {
        let Some(shortname) = self.pending_shortname.pop() else {
            if self.tracking_depth > 0 {
                self.tracking_depth -= 1;
            }
            self.track_kind.pop();
            return;
        };
        let input_keys = self.pending_inputs.pop().unwrap_or_default();
        let in_precomp = self.track_kind.last().copied().unwrap_or(false);

        let outputs: Vec<Point<Mod>> = match result {
            ActionResult::Point(p) => alloc::vec![p.clone()],
            ActionResult::Points(ps) => ps.clone(),
            ActionResult::Value(_) => Vec::new(),
        };

        if shortname == "ladd" {
            if let [out_dbl, out_add] = outputs.as_slice() {
                if let Some(m) = self.compose("dbl", &input_keys[1..2]) {
                    self.record(out_dbl, m, "dbl", &input_keys[1..2]);
                    if in_precomp {
                        self.precomp.insert(m, out_dbl.clone());
                    }
                }
                if let Some(m) = self.compose("dadd", &input_keys) {
                    self.record(out_add, m, "ladd", &input_keys);
                    if in_precomp {
                        self.precomp.insert(m, out_add.clone());
                    }
                }
            }
        } else {
            for out in &outputs {
                if let Some(m) = self.compose(shortname, &input_keys) {
                    self.record(out, m, shortname, &input_keys);
                    if in_precomp {
                        self.precomp.insert(m, out.clone());
                    }
                }
            }
        }
    }
}

impl MultipleContext {
    fn record(&mut self, point: &Point<Mod>, multiple: i128, shortname: &'static str, parents: &[PointKey]) {
        let key = PointKey::of(point);
        self.points.insert(key.clone(), multiple);
        self.parents.insert(key.clone(), parents.to_vec());
        self.formulas.insert(key, shortname);
    }
}

/// Boxed-trait-object convenience alias, for call sites that want to pick
/// a context at runtime.
pub type DynContext = Box<dyn Context>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assumption, CurveModel};
    use alloc::rc::Rc;
    use modfield::symbolic::Expr;

    fn toy_point(n: &BigUint, x: u64) -> Point<Mod> {
        let curve_model = CurveModel::new(
            "shortw",
            alloc::vec!["a".into(), "b".into()],
            alloc::vec!["x".into(), "y".into()],
            Assumption::new(Expr::Var("y2".into()), Expr::Var("rhs".into())),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let model = Rc::new(crate::model::CoordinateModel::affine(curve_model));
        let mut coords = FxHashMap::default();
        coords.insert("x".to_string(), Mod::from_u64(x, n.clone()));
        coords.insert("y".to_string(), Mod::from_u64(1, n.clone()));
        Point::new(model, coords).unwrap()
    }

    #[test]
    fn null_context_drops_everything() {
        let mut ctx = NullContext;
        let n = BigUint::from(23u8);
        let p = toy_point(&n, 4);
        ctx.enter_action(&Action::ScalarMultiplication {
            point: p.clone(),
            scalar: BigUint::from(3u8),
        });
        ctx.exit_action(&ActionResult::Point(p));
    }

    #[test]
    fn default_context_records_nested_formula_action() {
        let mut ctx = DefaultContext::new();
        let n = BigUint::from(23u8);
        let p = toy_point(&n, 4);
        ctx.enter_action(&Action::ScalarMultiplication {
            point: p.clone(),
            scalar: BigUint::from(3u8),
        });
        ctx.enter_action(&Action::Formula {
            shortname: "dbl",
            name: "dbl-2007-bl".into(),
            input_points: alloc::vec![p.clone()],
        });
        ctx.exit_action(&ActionResult::Point(p.clone()));
        ctx.exit_action(&ActionResult::Point(p));
        assert_eq!(ctx.roots().len(), 1);
        assert_eq!(ctx.roots()[0].children.len(), 1);
    }

    #[test]
    fn multiple_context_composes_doubling_and_addition() {
        let n = BigUint::from(23u8);
        let base = toy_point(&n, 4);
        let mut ctx = MultipleContext::new(base.clone());
        ctx.enter_action(&Action::ScalarMultiplication {
            point: base.clone(),
            scalar: BigUint::from(3u8),
        });
        let doubled = toy_point(&n, 8);
        ctx.enter_action(&Action::Formula {
            shortname: "dbl",
            name: "dbl".into(),
            input_points: alloc::vec![base.clone()],
        });
        ctx.exit_action(&ActionResult::Point(doubled.clone()));
        assert_eq!(ctx.multiple_of(&doubled), Some(2));

        let summed = toy_point(&n, 12);
        ctx.enter_action(&Action::Formula {
            shortname: "add",
            name: "add".into(),
            input_points: alloc::vec![base.clone(), doubled.clone()],
        });
        ctx.exit_action(&ActionResult::Point(summed.clone()));
        assert_eq!(ctx.multiple_of(&summed), Some(3));
    }

    #[test]
    fn multiple_context_fills_precomp_only_inside_precomputation() {
        let n = BigUint::from(23u8);
        let base = toy_point(&n, 4);
        let mut ctx = MultipleContext::new(base.clone());

        ctx.enter_action(&Action::Precomputation { point: base.clone() });
        let tripled = toy_point(&n, 12);
        ctx.enter_action(&Action::Formula {
            shortname: "tpl",
            name: "tpl".into(),
            input_points: alloc::vec![base.clone()],
        });
        ctx.exit_action(&ActionResult::Point(tripled.clone()));
        ctx.exit_action(&ActionResult::Points(alloc::vec![tripled.clone()]));
        assert!(ctx.precomp.get(&3).is_some_and(|p| p.equals(&tripled)));

        let doubled = toy_point(&n, 8);
        ctx.enter_action(&Action::ScalarMultiplication {
            point: base.clone(),
            scalar: BigUint::from(5u8),
        });
        ctx.enter_action(&Action::Formula {
            shortname: "dbl",
            name: "dbl".into(),
            input_points: alloc::vec![base.clone()],
        });
        ctx.exit_action(&ActionResult::Point(doubled.clone()));
        ctx.exit_action(&ActionResult::Point(doubled));
        assert_eq!(ctx.multiple_of(&toy_point(&n, 8)), Some(2));
        assert!(!ctx.precomp.contains_key(&2));
    }
}
