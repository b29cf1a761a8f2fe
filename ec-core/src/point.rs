//! `Point`: a coordinate-name → value map tagged by coordinate model
//! (spec.md §3), plus the `InfinityPoint` sentinel for the neutral element
//! in coordinate systems that have no finite representative for it.
//!
//! Grounded on `examples/original_source/pyecsca/ec/point.py`'s
//! `coords: Mapping[str, Mod]` shape, generalized over [`FieldValue`] the
//! same way `crate::op` is so a point can hold either `Mod` or
//! `SymbolicMod` coordinates.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use modfield::FieldValue;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::model::CoordinateModel;

/// A point on a curve, represented in some [`CoordinateModel`].
///
/// Either a finite point carrying one value per coordinate variable, or
/// the `InfinityPoint` sentinel used by coordinate systems (like plain
/// affine) that have no finite representative for the neutral element.
#[derive(Clone, Debug)]
pub enum Point<T: FieldValue> {
    /// A finite point: one value per coordinate variable name.
    Finite {
        /// The coordinate model this point is expressed in.
        coordinate_model: Rc<CoordinateModel>,
        /// Coordinate name → value (e.g. `"X" -> ..., "Y" -> ..., "Z" -> ...`).
        coords: FxHashMap<String, T>,
    },
    /// The neutral element, represented abstractly rather than by
    /// concrete coordinates.
    Infinity {
        /// The coordinate model this sentinel stands in for.
        coordinate_model: Rc<CoordinateModel>,
    },
}

impl<T: FieldValue> Point<T> {
    /// Build a finite point, checking that `coords` covers exactly the
    /// coordinate model's variable set.
    pub fn new(
        coordinate_model: Rc<CoordinateModel>,
        coords: FxHashMap<String, T>,
    ) -> Result<Self> {
        if coordinate_model.variables.len() != coords.len()
            || !coordinate_model
                .variables
                .iter()
                .all(|v| coords.contains_key(v.as_str()))
        {
            return Err(Error::InputMismatch);
        }
        Ok(Point::Finite {
            coordinate_model,
            coords,
        })
    }

    /// The infinity sentinel for `coordinate_model`.
    pub fn infinity(coordinate_model: Rc<CoordinateModel>) -> Self {
        Point::Infinity { coordinate_model }
    }

    /// This point's coordinate model.
    pub fn coordinate_model(&self) -> &Rc<CoordinateModel> {
        match self {
            Point::Finite {
                coordinate_model, ..
            } => coordinate_model,
            Point::Infinity { coordinate_model } => coordinate_model,
        }
    }

    /// Whether this is the `InfinityPoint` sentinel.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity { .. })
    }

    /// Look up a coordinate by name. `None` for the infinity sentinel.
    pub fn coord(&self, name: &str) -> Option<&T> {
        match self {
            Point::Finite { coords, .. } => coords.get(name),
            Point::Infinity { .. } => None,
        }
    }

    /// Structural equality: same coordinate model and identical coordinate
    /// values (spec.md §3's `equals`).
    pub fn equals(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (Point::Infinity { coordinate_model: a }, Point::Infinity { coordinate_model: b }) => {
                Rc::ptr_eq(a, b) || a == b
            }
            (
                Point::Finite {
                    coordinate_model: a,
                    coords: ca,
                },
                Point::Finite {
                    coordinate_model: b,
                    coords: cb,
                },
            ) => (Rc::ptr_eq(a, b) || a == b) && ca == cb,
            _ => false,
        }
    }
}

impl Point<modfield::Mod> {
    /// Projectively-consistent equality: two finite points are equal iff
    /// there is a nonzero scale factor relating their coordinates
    /// (spec.md §3's `equals_scaled`). `scaled_coords` names which
    /// coordinates scale with weight `i` (e.g. Jacobian: `X` weight 2,
    /// `Y` weight 3, `Z` weight 1).
    pub fn equals_scaled(&self, other: &Self, scaled_coords: &[(&str, u32)]) -> bool {
        match (self, other) {
            (Point::Infinity { .. }, Point::Infinity { .. }) => self.equals(other),
            (
                Point::Finite {
                    coords: ca,
                    coordinate_model: model_a,
                },
                Point::Finite {
                    coords: cb,
                    coordinate_model: model_b,
                },
            ) => {
                if !(Rc::ptr_eq(model_a, model_b) || model_a == model_b) {
                    return false;
                }
                let scale = scaled_coords.iter().find_map(|(name, weight)| {
                    let a = ca.get(*name)?;
                    let b = cb.get(*name)?;
                    if a.is_undefined() || b.is_undefined() {
                        return None;
                    }
                    Some((*weight, a.clone(), b.clone()))
                });
                let Some((_, sample_a, sample_b)) = scale else {
                    return ca == cb;
                };
                let lambda = match sample_b.div(&sample_a) {
                    Ok(lambda) => lambda,
                    Err(_) => return false,
                };
                for (name, weight) in scaled_coords {
                    let (Some(a), Some(b)) = (ca.get(*name), cb.get(*name)) else {
                        continue;
                    };
                    let Ok(scaled) = lambda.pow_i64(*weight as i64).and_then(|p| p.mul(a)) else {
                        return false;
                    };
                    if scaled != *b {
                        return false;
                    }
                }
                ca.iter().all(|(name, value)| {
                    scaled_coords.iter().any(|(n, _)| n == name) || cb.get(name) == Some(value)
                })
            }
            _ => false,
        }
    }
}

impl Point<modfield::Mod> {
    /// Affine-conversion equality: divide out the scale coordinate on each
    /// side, then compare plain coordinates (spec.md §3's third equality
    /// mode). Where [`Point::equals_scaled`] cross-multiplies to avoid an
    /// inversion, this one actually inverts `scale` — useful once a single
    /// canonical affine representative is wanted rather than just a
    /// yes/no comparison.
    pub fn equals_affine(&self, other: &Self, scale: &str, scaled_coords: &[(&str, &str, u32)]) -> bool {
        match (self.to_affine(scale, scaled_coords), other.to_affine(scale, scaled_coords)) {
            (Ok(a), Ok(b)) => a.equals(&b),
            _ => matches!((self, other), (Point::Infinity { .. }, Point::Infinity { .. })) && self.equals(other),
        }
    }

    /// Convert to the universal affine coordinate model. Each entry of
    /// `scaled_coords` names a weighted coordinate, the affine name it maps
    /// to, and its weight; the result holds `value / scale^weight` under
    /// the affine name. Infinity passes through unchanged.
    pub fn to_affine(&self, scale: &str, scaled_coords: &[(&str, &str, u32)]) -> Result<Self> {
        match self {
            Point::Infinity { coordinate_model } => Ok(Point::Infinity {
                coordinate_model: coordinate_model.clone(),
            }),
            Point::Finite { coordinate_model, coords } => {
                let curve_model = coordinate_model.curve_model.clone();
                let affine_model = Rc::new(CoordinateModel::affine(curve_model));
                let Some(z) = coords.get(scale) else {
                    return Err(Error::InputMismatch);
                };
                let mut affine_coords = FxHashMap::default();
                for (name, affine_name, weight) in scaled_coords {
                    let Some(value) = coords.get(*name) else {
                        continue;
                    };
                    let denom = z.pow_i64(*weight as i64)?;
                    affine_coords.insert((*affine_name).to_string(), value.div(&denom)?);
                }
                Ok(Point::Finite {
                    coordinate_model: affine_model,
                    coords: affine_coords,
                })
            }
        }
    }
}

/// A point and its coordinate weight convention, used by
/// [`Point::equals_scaled`]. Mirrors spec.md §3's "projectively-consistent"
/// equality, where e.g. Jacobian `(X, Y, Z)` represents affine
/// `(X/Z^2, Y/Z^3)`.
pub fn jacobian_weights() -> [(&'static str, u32); 2] {
    [("X", 2), ("Y", 3)]
}

/// Like [`jacobian_weights`] but naming each weighted coordinate's affine
/// target, for [`Point::to_affine`]/[`Point::equals_affine`].
pub fn jacobian_affine_weights() -> [(&'static str, &'static str, u32); 2] {
    [("X", "x", 2), ("Y", "y", 3)]
}

/// Helper used to suffix a coordinate/variable name with a 1-based index,
/// the convention formula execution inlines input points under (spec.md
/// §4.2 step 2: `X1, Y1, Z1, X2, ...`).
pub fn suffixed(name: &str, index: usize) -> String {
    let mut s = name.to_string();
    s.push_str(&index.to_string());
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Assumption, CurveModel};
    use modfield::symbolic::Expr;
    use num_bigint::BigUint;

    fn toy_model() -> Rc<CoordinateModel> {
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
        Rc::new(CoordinateModel::affine(curve_model))
    }

    #[test]
    fn rejects_coordinate_sets_that_do_not_match_the_model() {
        let model = toy_model();
        let n = BigUint::from(17u8);
        let mut coords = FxHashMap::default();
        coords.insert("x".to_string(), modfield::Mod::from_u64(1, n));
        assert!(matches!(
            Point::new(model, coords),
            Err(Error::InputMismatch)
        ));
    }

    #[test]
    fn infinity_sentinel_has_no_coordinates() {
        let model = toy_model();
        let inf: Point<modfield::Mod> = Point::infinity(model);
        assert!(inf.is_infinity());
        assert_eq!(inf.coord("x"), None);
    }

    #[test]
    fn suffixed_names_match_formula_inlining_convention() {
        assert_eq!(suffixed("X", 1), "X1");
        assert_eq!(suffixed("Z", 2), "Z2");
    }

    fn jacobian_model() -> Rc<CoordinateModel> {
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
        Rc::new(CoordinateModel {
            name: "jacobian".into(),
            full_name: "Jacobian coordinates".into(),
            curve_model,
            variables: alloc::vec!["X".into(), "Y".into(), "Z".into()],
            parameters: Vec::new(),
            assumptions: Vec::new(),
            neutral: Vec::new(),
        })
    }

    fn jacobian_point(model: &Rc<CoordinateModel>, n: &BigUint, x: u64, y: u64, z: u64) -> Point<modfield::Mod> {
        let mut coords = FxHashMap::default();
        coords.insert("X".to_string(), modfield::Mod::from_u64(x, n.clone()));
        coords.insert("Y".to_string(), modfield::Mod::from_u64(y, n.clone()));
        coords.insert("Z".to_string(), modfield::Mod::from_u64(z, n.clone()));
        Point::new(model.clone(), coords).unwrap()
    }

    #[test]
    fn equals_affine_agrees_across_different_scale_factors() {
        let n = BigUint::from(23u8);
        let model = jacobian_model();
        // Both represent affine (x=1, y=1): one with Z=2 (4, 8, 2), the
        // other already reduced with Z=1 (1, 1, 1).
        let a = jacobian_point(&model, &n, 4, 8, 2);
        let b = jacobian_point(&model, &n, 1, 1, 1);
        assert!(a.equals_affine(&b, "Z", &jacobian_affine_weights()));

        let c = jacobian_point(&model, &n, 4, 9, 2);
        assert!(!a.equals_affine(&c, "Z", &jacobian_affine_weights()));
    }
}
