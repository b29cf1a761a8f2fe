//! Formula equivalence checking (spec.md §4.3's closing paragraph).
//!
//! The reference algorithm unrolls each formula's code into a polynomial
//! over its free inputs and compares the output polynomial sets up to
//! per-coordinate sign. Doing that exactly needs a small computer-algebra
//! system (`ec-core::formula`'s own assumption solver only goes as far as
//! degree-2 univariate polynomials, deliberately — see its doc comment).
//! This instead checks equivalence the way property-based tests check a
//! polynomial identity: evaluate both formulas at several random field
//! assignments (a Schwartz–Zippel-style check) and require their outputs
//! to agree, up to sign, every time neither formula's assumptions reject
//! the sample outright.

use alloc::vec::Vec;
use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};
use rustc_hash::FxHashMap;

use ec_core::{Formula, NullContext, Point};
use modfield::Mod;

use crate::error::Result;

fn negate_point(point: &Point<Mod>) -> Result<Point<Mod>> {
    Ok(match point {
        Point::Infinity { coordinate_model } => Point::Infinity {
            coordinate_model: coordinate_model.clone(),
        },
        Point::Finite { coordinate_model, coords } => {
            let mut negated = FxHashMap::default();
            for (name, value) in coords {
                negated.insert(name.clone(), value.neg()?);
            }
            Point::Finite {
                coordinate_model: coordinate_model.clone(),
                coords: negated,
            }
        }
    })
}

fn equals_up_to_sign(a: &Point<Mod>, b: &Point<Mod>) -> Result<bool> {
    if a.equals(b) {
        return Ok(true);
    }
    Ok(a.equals(&negate_point(b)?))
}

/// Whether `a` and `b` compute the same points (each output coordinate
/// matching up to an overall sign) across `trials` random field
/// assignments. `curve_params` binds whatever curve constants (`a`, `b`,
/// ...) the formulas' codes read beyond their point inputs.
///
/// A sample where either formula's assumptions reject the random input
/// (division by an unlucky zero, an unsatisfied `Z1 == 1`-style
/// precondition) is skipped rather than counted as a mismatch — such
/// samples are simply outside both formulas' domain and carry no
/// information about their equivalence elsewhere.
pub fn formulas_equivalent(
    a: &Formula,
    b: &Formula,
    p: &BigUint,
    curve_params: &FxHashMap<String, Mod>,
    rng: &mut (impl CryptoRng + RngCore),
    trials: usize,
) -> Result<bool> {
    if a.kind != b.kind || a.coordinate_model != b.coordinate_model {
        return Ok(false);
    }
    let mut evaluated_any = false;
    for _ in 0..trials {
        let mut points = Vec::with_capacity(a.kind.num_inputs());
        for _ in 0..a.kind.num_inputs() {
            let mut coords = FxHashMap::default();
            for var in &a.coordinate_model.variables {
                coords.insert(var.clone(), Mod::random(p.clone(), &mut *rng));
            }
            points.push(Point::new(a.coordinate_model.clone(), coords)?);
        }
        let out_a = a.call(p, &points, curve_params, &mut NullContext);
        let out_b = b.call(p, &points, curve_params, &mut NullContext);
        match (out_a, out_b) {
            (Ok(oa), Ok(ob)) => {
                if oa.len() != ob.len() {
                    return Ok(false);
                }
                for (pa, pb) in oa.iter().zip(ob.iter()) {
                    if !equals_up_to_sign(pa, pb)? {
                        return Ok(false);
                    }
                }
                evaluated_any = true;
            }
            (Err(_), Err(_)) => continue,
            _ => return Ok(false),
        }
    }
    Ok(evaluated_any || trials == 0)
}
