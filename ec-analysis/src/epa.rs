//! Error/erasure-propagation analysis (EPA): given a trace of a
//! multiplier's precomputation and/or multiplication phase, decide which
//! formula-call inputs would need to be checked to catch a fault before
//! it can leak through an unconverted intermediate (spec.md §4.7).
//!
//! Grounded on `examples/original_source/pyecsca/sca/re/epa.py`, a
//! near-direct port: Python's `dict[str, set[tuple[int, ...]]]` becomes
//! `FxHashMap<String, FxHashSet<Vec<i128>>>`, and the analysis is driven
//! directly off `ec_core::context::MultipleContext`'s already-`PointKey`-
//! keyed `points`/`parents`/`formulas`/`precomp` maps rather than any new
//! graph structure.

use alloc::string::String;
use alloc::vec::Vec;
use rustc_hash::{FxHashMap, FxHashSet};

use ec_core::context::{MultipleContext, PointKey};
use ec_core::Point;
use modfield::Mod;

use crate::error::{Error, Result};

/// Which points are scanned for formula-check inputs: every point ever
/// observed (`All`), or only those reachable backward from the points
/// actually consumed downstream (`Necessary`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckCondition {
    /// Scan every point the relevant context(s) recorded.
    All,
    /// Scan only points that are ancestors (transitively) of the affine
    /// output set.
    Necessary,
}

fn necessary(ctx: &MultipleContext, out: &PointKey, for_what: &FxHashSet<PointKey>) -> FxHashSet<PointKey> {
    let mut res: FxHashSet<PointKey> = FxHashSet::default();
    res.insert(out.clone());
    let mut queue: Vec<PointKey> = for_what.iter().cloned().collect();
    while let Some(point) = queue.pop() {
        let Some(parents) = ctx.parents.get(&point) else {
            continue;
        };
        for parent in parents {
            if res.insert(parent.clone()) {
                queue.push(parent.clone());
            }
        }
    }
    res
}

/// Build, per formula shortname, the set of distinct input-multiple
/// tuples that formula was called with anywhere in the scanned scope,
/// plus a synthetic `"affine"` entry holding the multiples of whichever
/// points end up converted to affine.
///
/// `precomp_ctx` is the trace of the multiplier's `init` (precomputation)
/// phase; `full_ctx` is the trace of the whole `init` + `multiply` run
/// that produced `out`. Set `use_init`/`use_multiply` to scope the scan
/// to just one phase; at least one must be `true`. `precomp_to_affine`
/// additionally counts every precomputed point as converted to affine
/// (true for multipliers that convert their whole table up front).
/// `check_formulas`, if given, restricts which formula shortnames are
/// collected at all.
#[allow(clippy::too_many_arguments)]
pub fn graph_to_check_inputs(
    precomp_ctx: &MultipleContext,
    full_ctx: &MultipleContext,
    out: &Point<Mod>,
    check_condition: CheckCondition,
    precomp_to_affine: bool,
    use_init: bool,
    use_multiply: bool,
    check_formulas: Option<&FxHashSet<&str>>,
) -> Result<FxHashMap<String, FxHashSet<Vec<i128>>>> {
    if !use_init && !use_multiply {
        return Err(Error::NoCheckScope);
    }
    let out_key = PointKey::of(out);

    let precomp_keys = || -> FxHashSet<PointKey> { precomp_ctx.precomp.values().map(PointKey::of).collect() };

    let affine_points: FxHashSet<PointKey> = if use_init && use_multiply {
        if precomp_to_affine {
            let mut set = precomp_keys();
            set.insert(out_key.clone());
            set
        } else {
            core::iter::once(out_key.clone()).collect()
        }
    } else if use_init {
        if precomp_to_affine {
            precomp_keys()
        } else {
            FxHashSet::default()
        }
    } else {
        core::iter::once(out_key.clone()).collect()
    };

    let precomp_point_keys: FxHashSet<PointKey> = precomp_ctx.points.keys().cloned().collect();
    let full_point_keys: FxHashSet<PointKey> = full_ctx.points.keys().cloned().collect();

    let points: FxHashSet<PointKey> = match check_condition {
        CheckCondition::All => {
            if use_init && use_multiply {
                full_point_keys
            } else if use_init {
                precomp_point_keys
            } else {
                full_point_keys.difference(&precomp_point_keys).cloned().collect()
            }
        }
        CheckCondition::Necessary => {
            let reachable = necessary(full_ctx, &out_key, &affine_points);
            if use_init && use_multiply {
                reachable
            } else if use_init {
                reachable.intersection(&precomp_point_keys).cloned().collect()
            } else {
                reachable.difference(&precomp_point_keys).cloned().collect()
            }
        }
    };

    let mut formula_checks: FxHashMap<String, FxHashSet<Vec<i128>>> = FxHashMap::default();
    formula_checks.insert(
        "affine".into(),
        affine_points
            .iter()
            .filter_map(|key| full_ctx.points.get(key).map(|m| alloc::vec![*m]))
            .collect(),
    );

    for point in &points {
        let Some(formula) = full_ctx.formulas.get(point) else {
            continue;
        };
        if let Some(restrict) = check_formulas {
            if !restrict.contains(formula) {
                continue;
            }
        }
        let Some(parents) = full_ctx.parents.get(point) else {
            continue;
        };
        let inputs: Option<Vec<i128>> = parents.iter().map(|p| full_ctx.points.get(p).copied()).collect();
        let Some(inputs) = inputs else { continue };
        formula_checks.entry((*formula).into()).or_default().insert(inputs);
    }

    Ok(formula_checks)
}

/// Apply a named predicate per formula shortname to every recorded input
/// tuple for that formula; `true` as soon as any predicate accepts any of
/// its formula's recorded inputs. Formulas absent from `check_inputs`, or
/// whose predicate is absent from `check_funcs`, are skipped.
pub fn evaluate_checks(
    check_funcs: &FxHashMap<String, fn(&[i128]) -> bool>,
    check_inputs: &FxHashMap<String, FxHashSet<Vec<i128>>>,
) -> bool {
    for (name, func) in check_funcs {
        let Some(inputs) = check_inputs.get(name) else {
            continue;
        };
        if inputs.iter().any(|tuple| func(tuple)) {
            return true;
        }
    }
    false
}

/// Whether a fault occurring anywhere the scanned scope's formula calls
/// would escape undetected: builds the check-input sets via
/// [`graph_to_check_inputs`] and evaluates `check_funcs` over them.
#[allow(clippy::too_many_arguments)]
pub fn errors_out(
    precomp_ctx: &MultipleContext,
    full_ctx: &MultipleContext,
    out: &Point<Mod>,
    check_funcs: &FxHashMap<String, fn(&[i128]) -> bool>,
    check_condition: CheckCondition,
    precomp_to_affine: bool,
    use_init: bool,
    use_multiply: bool,
) -> Result<bool> {
    let formula_checks = graph_to_check_inputs(
        precomp_ctx,
        full_ctx,
        out,
        check_condition,
        precomp_to_affine,
        use_init,
        use_multiply,
        None,
    )?;
    Ok(evaluate_checks(check_funcs, &formula_checks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ec_core::{
        Action, ActionResult, Assumption, CodeOp, Context, CoordinateModel, CurveModel,
        EllipticCurve, Formula, FormulaKind, OpKind, Operand,
    };
    use ec_core::curve::DomainParameters;
    use ec_mult::naf_mult::WindowNafMultiplier;
    use ec_mult::{Formulas, ScalarMultiplier};
    use alloc::rc::Rc;
    use alloc::string::ToString;
    use alloc::vec;
    use num_bigint::BigUint;
    use rustc_hash::FxHashMap as Map;

    fn toy_point(n: &BigUint, x: u64) -> Point<Mod> {
        let curve_model = ec_core::CurveModel::new(
            "shortw",
            vec!["a".into(), "b".into()],
            vec!["x".into(), "y".into()],
            ec_core::Assumption::new(
                modfield::symbolic::Expr::Var("y2".into()),
                modfield::symbolic::Expr::Var("rhs".into()),
            ),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let model = alloc::rc::Rc::new(ec_core::CoordinateModel::affine(curve_model));
        let mut coords = Map::default();
        coords.insert("x".into(), Mod::from_u64(x, n.clone()));
        coords.insert("y".into(), Mod::from_u64(1, n.clone()));
        Point::new(model, coords).unwrap()
    }

    /// Hand-built trace shaped like a `WindowNAFMultiplier(width=4)` run:
    /// precomputes the odd multiples `1, 3, 5, 7` (each via one `"add"`
    /// call chaining off the doubled base; width 4's
    /// `max_odd = (1 << (4 - 1)) - 1 == 7`), then multiplies by scanning
    /// those digits, reusing `5` directly as `out`. Exercises
    /// [`graph_to_check_inputs`] against a synthetic, easy-to-hand-check
    /// trace; [`real_width_3_window_naf_trace_matches_odd_multiples_one_and_three`]
    /// below drives an actual [`ec_mult::naf_mult::WindowNafMultiplier`]
    /// instead.
    fn naf_width_4_trace(n: &BigUint) -> (MultipleContext, MultipleContext, Point<Mod>) {
        let base = toy_point(n, 2);
        let doubled = toy_point(n, 4);
        let mut precomp_ctx = MultipleContext::new(base.clone());
        precomp_ctx.enter_action(&Action::Precomputation { point: base.clone() });
        precomp_ctx.enter_action(&Action::Formula {
            shortname: "dbl",
            name: "dbl".into(),
            input_points: vec![base.clone()],
        });
        precomp_ctx.exit_action(&ActionResult::Point(doubled.clone()));

        let mut odd = vec![base.clone()];
        let mut acc = base.clone();
        for k in [3i128, 5, 7] {
            let next = toy_point(n, 2 * k as u64);
            precomp_ctx.enter_action(&Action::Formula {
                shortname: "add",
                name: "add".into(),
                input_points: vec![acc.clone(), doubled.clone()],
            });
            precomp_ctx.exit_action(&ActionResult::Point(next.clone()));
            acc = next.clone();
            odd.push(acc.clone());
        }
        precomp_ctx.exit_action(&ActionResult::Points(odd));

        let mut full_ctx = precomp_ctx.clone();
        let out = toy_point(n, 10); // multiple 5, reused straight from precomp.
        full_ctx.enter_action(&Action::ScalarMultiplication {
            point: base,
            scalar: BigUint::from(5u8),
        });
        full_ctx.exit_action(&ActionResult::Point(out.clone()));

        (precomp_ctx, full_ctx, out)
    }

    #[test]
    fn synthetic_affine_set_matches_odd_multiples_up_to_seven() {
        let n = BigUint::from(9973u32);
        let (precomp_ctx, full_ctx, out) = naf_width_4_trace(&n);
        let checks = graph_to_check_inputs(
            &precomp_ctx,
            &full_ctx,
            &out,
            CheckCondition::All,
            true,
            true,
            true,
            None,
        )
        .unwrap();
        let mut affine: Vec<i128> = checks["affine"].iter().flatten().copied().collect();
        affine.sort_unstable();
        assert_eq!(affine, vec![1, 3, 5, 7]);
    }

    #[test]
    fn add_set_contains_the_chained_precomputation_inputs() {
        let n = BigUint::from(9973u32);
        let (precomp_ctx, full_ctx, out) = naf_width_4_trace(&n);
        let checks = graph_to_check_inputs(
            &precomp_ctx,
            &full_ctx,
            &out,
            CheckCondition::All,
            true,
            true,
            true,
            None,
        )
        .unwrap();
        assert!(checks["add"].contains(&vec![1, 2]));
    }

    fn toy_curve_formulas(model: &Rc<CoordinateModel>) -> Formulas {
        let add_code = vec![
            CodeOp::binary("t0", OpKind::Sub, Operand::Var("y2".into()), Operand::Var("y1".into())),
            CodeOp::binary("t1", OpKind::Sub, Operand::Var("x2".into()), Operand::Var("x1".into())),
            CodeOp::binary("lambda", OpKind::Div, Operand::Var("t0".into()), Operand::Var("t1".into())),
            CodeOp::unary("t2", OpKind::Sqr, Operand::Var("lambda".into())),
            CodeOp::binary("t3", OpKind::Sub, Operand::Var("t2".into()), Operand::Var("x1".into())),
            CodeOp::binary("x3", OpKind::Sub, Operand::Var("t3".into()), Operand::Var("x2".into())),
            CodeOp::binary("t4", OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x3".into())),
            CodeOp::binary("t5", OpKind::Mult, Operand::Var("lambda".into()), Operand::Var("t4".into())),
            CodeOp::binary("y3", OpKind::Sub, Operand::Var("t5".into()), Operand::Var("y1".into())),
        ];
        let dbl_code = vec![
            CodeOp::unary("t0", OpKind::Sqr, Operand::Var("x1".into())),
            CodeOp::binary("t1", OpKind::Mult, Operand::Var("t0".into()), Operand::Literal(3)),
            CodeOp::binary("t2", OpKind::Add, Operand::Var("t1".into()), Operand::Var("a".into())),
            CodeOp::binary("t3", OpKind::Mult, Operand::Var("y1".into()), Operand::Literal(2)),
            CodeOp::binary("lambda", OpKind::Div, Operand::Var("t2".into()), Operand::Var("t3".into())),
            CodeOp::unary("t4", OpKind::Sqr, Operand::Var("lambda".into())),
            CodeOp::binary("t5", OpKind::Mult, Operand::Var("x1".into()), Operand::Literal(2)),
            CodeOp::binary("x3", OpKind::Sub, Operand::Var("t4".into()), Operand::Var("t5".into())),
            CodeOp::binary("t6", OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x3".into())),
            CodeOp::binary("t7", OpKind::Mult, Operand::Var("lambda".into()), Operand::Var("t6".into())),
            CodeOp::binary("y3", OpKind::Sub, Operand::Var("t7".into()), Operand::Var("y1".into())),
        ];
        let neg_code = vec![
            CodeOp::unary("x3", OpKind::Id, Operand::Var("x1".into())),
            CodeOp::unary("y3", OpKind::Neg, Operand::Var("y1".into())),
        ];
        Formulas {
            add: Some(Formula {
                name: "toy-add".into(),
                kind: FormulaKind::Addition,
                coordinate_model: model.clone(),
                parameters: Vec::new(),
                assumptions: Vec::new(),
                code: add_code,
                unified: false,
                source: None,
            }),
            dbl: Some(Formula {
                name: "toy-dbl".into(),
                kind: FormulaKind::Doubling,
                coordinate_model: model.clone(),
                parameters: Vec::new(),
                assumptions: Vec::new(),
                code: dbl_code,
                unified: false,
                source: None,
            }),
            tpl: None,
            neg: Some(Formula {
                name: "toy-neg".into(),
                kind: FormulaKind::Negation,
                coordinate_model: model.clone(),
                parameters: Vec::new(),
                assumptions: Vec::new(),
                code: neg_code,
                unified: true,
                source: None,
            }),
            scl: None,
            dadd: None,
            ladd: None,
        }
    }

    fn toy_window_naf_params() -> DomainParameters {
        let p = BigUint::from(97u32);
        let equation = Assumption::new(
            modfield::symbolic::Expr::Pow(alloc::boxed::Box::new(modfield::symbolic::Expr::Var("y".into())), 2),
            modfield::symbolic::Expr::Add(
                alloc::boxed::Box::new(modfield::symbolic::Expr::Add(
                    alloc::boxed::Box::new(modfield::symbolic::Expr::Pow(
                        alloc::boxed::Box::new(modfield::symbolic::Expr::Var("x".into())),
                        3,
                    )),
                    alloc::boxed::Box::new(modfield::symbolic::Expr::Mul(
                        alloc::boxed::Box::new(modfield::symbolic::Expr::Var("a".into())),
                        alloc::boxed::Box::new(modfield::symbolic::Expr::Var("x".into())),
                    )),
                )),
                alloc::boxed::Box::new(modfield::symbolic::Expr::Var("b".into())),
            ),
        );
        let model = CurveModel::new(
            "shortw",
            vec!["a".into(), "b".into()],
            vec!["x".into(), "y".into()],
            equation,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        let coordinate_model = Rc::new(CoordinateModel::affine(model.clone()));
        let mut parameters = Map::default();
        parameters.insert("a".to_string(), Mod::from_u64(2, p.clone()));
        parameters.insert("b".to_string(), Mod::from_u64(3, p.clone()));
        let neutral = Point::infinity(coordinate_model.clone());
        let curve = EllipticCurve::new(model, coordinate_model.clone(), p.clone(), parameters, neutral).unwrap();
        let mut coords = Map::default();
        coords.insert("x".to_string(), Mod::from_u64(3, p.clone()));
        coords.insert("y".to_string(), Mod::from_u64(6, p.clone()));
        let generator = Point::new(coordinate_model, coords).unwrap();
        DomainParameters {
            curve: Rc::new(curve),
            generator,
            order: BigUint::from(5u32),
            cofactor: BigUint::from(1u32),
            name: None,
            category: None,
        }
    }

    /// Runs an actual [`WindowNafMultiplier`] (width 3) through `init`
    /// and `multiply` over a real [`MultipleContext`], and feeds the
    /// resulting traces straight into [`graph_to_check_inputs`] — unlike
    /// every other test in this module, this one exercises the real §4.7
    /// pipeline end to end instead of a hand-built trace. Width-3 NAF's
    /// `max_odd = (1 << (3 - 1)) - 1 == 3`, so precomputation only ever
    /// reaches the odd multiples `1` and `3`.
    #[test]
    fn real_width_3_window_naf_trace_matches_odd_multiples_one_and_three() {
        let params = toy_window_naf_params();
        let point = params.generator.clone();
        let formulas = toy_curve_formulas(&params.curve.coordinate_model);
        let mut mult = WindowNafMultiplier::new(formulas, 3, false, true).unwrap();

        let mut precomp_ctx = MultipleContext::new(point.clone());
        mult.init(params.clone(), point.clone(), None, &mut precomp_ctx).unwrap();

        let mut full_ctx = precomp_ctx.clone();
        let out = mult.multiply(&BigUint::from(3u8), &mut full_ctx).unwrap();

        let checks = graph_to_check_inputs(
            &precomp_ctx,
            &full_ctx,
            &out,
            CheckCondition::All,
            true,
            true,
            true,
            None,
        )
        .unwrap();
        let mut affine: Vec<i128> = checks["affine"].iter().flatten().copied().collect();
        affine.sort_unstable();
        assert_eq!(affine, vec![1, 3]);
    }

    #[test]
    fn evaluate_checks_fires_when_a_predicate_accepts_an_input_tuple() {
        let mut checks: FxHashMap<String, FxHashSet<Vec<i128>>> = FxHashMap::default();
        checks.insert("add".into(), core::iter::once(vec![1, 2]).collect());
        let mut funcs: FxHashMap<String, fn(&[i128]) -> bool> = FxHashMap::default();
        funcs.insert("add".into(), |inputs| inputs == [1, 2]);
        assert!(evaluate_checks(&funcs, &checks));
    }

    #[test]
    fn requiring_both_init_and_multiply_false_is_rejected() {
        let n = BigUint::from(23u32);
        let (precomp_ctx, full_ctx, out) = naf_width_4_trace(&n);
        let err = graph_to_check_inputs(
            &precomp_ctx,
            &full_ctx,
            &out,
            CheckCondition::All,
            true,
            false,
            false,
            None,
        );
        assert!(matches!(err, Err(Error::NoCheckScope)));
    }
}
