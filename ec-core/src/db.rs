//! Standard-curve database loader (spec.md §6): parses the
//! [std-curves](https://github.com/J08nY/std-curves) JSON format into
//! [`DomainParameters`], given already-built [`CurveModel`]/
//! [`CoordinateModel`] handles for the requested form and coordinate
//! system.
//!
//! Grounded on `examples/original_source/pyecsca/ec/params.py`'s
//! `_create_params`/`load_category`/`load_params`/`get_params`. Diverges
//! from the original in one respect: there, `model.coordinates` is a
//! registry populated once at import time by walking the bundled EFD
//! asset tree; here the caller builds that registry ([`ModelRegistry`])
//! and passes it in, since spec.md §6 treats the EFD asset tree itself as
//! an opaque bundled resource this engine doesn't re-derive on every call.
//! Likewise, fetching a named curve straight from the network
//! (`get_params`'s `resource_stream`) is out of scope: callers read the
//! JSON text themselves and pass it to [`load_category`]/[`load_params`].

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use num_bigint::BigUint;
use rustc_hash::FxHashMap;
use serde_json::Value;

use modfield::symbolic::Expr;
use modfield::Mod;

use crate::curve::{DomainParameters, EllipticCurve};
use crate::error::{Error, Result};
use crate::formula::{eval_expr, ground_root, to_polynomial};
use crate::model::CoordinateModel;
use crate::point::Point;

/// Coordinate models a [`load_category`]/[`load_params`] call resolves a
/// curve's `"form"` and requested coordinate-system name against, keyed
/// by `(form name, coordinate-system name)` (e.g. `("shortw",
/// "jacobian")`). Built once by the caller from the bundled EFD asset
/// tree; this module never populates it itself.
#[derive(Default)]
pub struct ModelRegistry {
    coordinate_models: FxHashMap<(String, String), Rc<CoordinateModel>>,
}

impl ModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ModelRegistry::default()
    }

    /// Register a coordinate model under its curve form's std-curves name
    /// (`"Weierstrass"`, `"Montgomery"`, `"Edwards"`, `"TwistedEdwards"`).
    pub fn insert(&mut self, form: &str, model: Rc<CoordinateModel>) {
        self.coordinate_models
            .insert((form_key(form).to_string(), model.name.clone()), model);
    }

    fn lookup(&self, form: &str, coords: &str) -> Option<Rc<CoordinateModel>> {
        self.coordinate_models
            .get(&(form_key(form).to_string(), coords.to_string()))
            .cloned()
    }
}

fn form_param_names(form: &str) -> Result<&'static [&'static str]> {
    Ok(match form {
        "Weierstrass" => &["a", "b"],
        "Montgomery" => &["a", "b"],
        "Edwards" => &["c", "d"],
        "TwistedEdwards" => &["a", "d"],
        _ => return Err(Error::BadConfiguration("unknown curve form in std-curves JSON")),
    })
}

fn form_key(form: &str) -> &str {
    match form {
        "Weierstrass" => "shortw",
        "Montgomery" => "montgom",
        "Edwards" => "edwards",
        "TwistedEdwards" => "twisted",
        other => other,
    }
}

fn hex_biguint(s: &str) -> Result<BigUint> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or(Error::BadConfiguration("malformed hex integer in std-curves JSON"))
}

/// A std-curves JSON value may store a field either as a bare hex string
/// or as `{"raw": "...", ...}` (the newer schema also carries a decimal
/// `"x"` alongside `"raw"`); accept both.
fn hex_field<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    value[key]["raw"]
        .as_str()
        .or_else(|| value[key].as_str())
        .ok_or(Error::BadConfiguration("missing or malformed field in std-curves JSON"))
}

/// Solve a coordinate model's extra-parameter assumptions the same way
/// [`crate::formula::Formula::call`] solves a formula's, against the
/// curve's own parameter values rather than a formula's locals.
fn resolve_extra_parameters(
    coordinate_model: &CoordinateModel,
    params: &mut FxHashMap<String, Mod>,
    p: &BigUint,
) -> Result<()> {
    for assumption in &coordinate_model.assumptions {
        if let Some(name) = assumption.defines() {
            if coordinate_model.parameters.iter().any(|param| param == name) {
                let value = eval_expr(&assumption.rhs, params)?;
                params.insert(name.to_string(), value);
                continue;
            }
        }
        if let (Ok(lhs), Ok(rhs)) = (eval_expr(&assumption.lhs, params), eval_expr(&assumption.rhs, params)) {
            if lhs != rhs {
                return Err(Error::UnsatisfiedAssumption(alloc::format!(
                    "{} != {}",
                    assumption.lhs, assumption.rhs
                )));
            }
            continue;
        }
        let unknown = coordinate_model
            .parameters
            .iter()
            .find(|name| !params.contains_key(name.as_str()))
            .cloned()
            .ok_or_else(|| {
                Error::UnsatisfiedAssumption(
                    "coordinate model assumption has no unresolved parameter to solve for".to_string(),
                )
            })?;
        let diff = Expr::Sub(
            alloc::boxed::Box::new(assumption.rhs.clone()),
            alloc::boxed::Box::new(assumption.lhs.clone()),
        );
        let poly = to_polynomial(&diff, &unknown, params, p)?;
        let root = ground_root(&poly, p).ok_or_else(|| {
            Error::UnsatisfiedAssumption(alloc::format!(
                "no root for coordinate parameter {unknown} in GF(p)"
            ))
        })?;
        params.insert(unknown, root);
    }
    Ok(())
}

fn neutral_point(coordinate_model: Rc<CoordinateModel>, params: &FxHashMap<String, Mod>) -> Result<Point<Mod>> {
    if coordinate_model.is_affine() || coordinate_model.neutral.is_empty() {
        return Ok(Point::infinity(coordinate_model));
    }
    let mut locals = params.clone();
    for op in &coordinate_model.neutral {
        let value = op.eval(&|name| locals.get(name).cloned())?;
        locals.insert(op.result.clone(), value);
    }
    let mut coords = FxHashMap::default();
    for name in &coordinate_model.variables {
        let value = locals
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnsatisfiedAssumption(name.clone()))?;
        coords.insert(name.clone(), value);
    }
    Point::new(coordinate_model, coords)
}

/// Build one curve's domain parameters from its std-curves JSON object
/// (one entry of a category file's `"curves"` array).
///
/// `use_infinity_sentinel` mirrors the original's `infty` flag: `true`
/// uses the abstract `InfinityPoint`, `false` solves the coordinate
/// model's own neutral-point code instead.
///
/// Embedding the generator into a non-affine coordinate system needs a
/// "from affine" conversion formula; this loader only supports
/// `coords == "affine"` for the generator itself (the curve's own
/// parameters and neutral point are still resolved in the requested
/// system) until `ec-graph` exposes one.
pub fn curve_from_json(
    curve: &Value,
    registry: &ModelRegistry,
    coords: &str,
    use_infinity_sentinel: bool,
) -> Result<DomainParameters> {
    let field_type = curve["field"]["type"].as_str().unwrap_or("Prime");
    if field_type != "Prime" {
        return Err(Error::BadConfiguration(
            "only prime-field std-curves entries are supported",
        ));
    }
    let p = hex_biguint(
        curve["field"]["p"]
            .as_str()
            .ok_or(Error::BadConfiguration("missing field.p"))?,
    )?;
    let order = hex_biguint(curve["order"].as_str().ok_or(Error::BadConfiguration("missing order"))?)?;
    let cofactor = hex_biguint(
        curve["cofactor"]
            .as_str()
            .ok_or(Error::BadConfiguration("missing cofactor"))?,
    )?;
    let form = curve["form"].as_str().ok_or(Error::BadConfiguration("missing form"))?;
    let param_names = form_param_names(form)?;

    let mut params = FxHashMap::default();
    for name in param_names {
        let raw = hex_field(&curve["params"], name)?;
        params.insert((*name).to_string(), Mod::new(hex_biguint(raw)?, p.clone()));
    }

    let coordinate_model = registry
        .lookup(form, coords)
        .ok_or(Error::BadConfiguration("coordinate model not supported for this curve"))?;
    if coords != "affine" {
        resolve_extra_parameters(&coordinate_model, &mut params, &p)?;
    }

    let neutral = if use_infinity_sentinel {
        Point::infinity(coordinate_model.clone())
    } else {
        neutral_point(coordinate_model.clone(), &params)?
    };

    let curve_model = coordinate_model.curve_model.clone();
    let elliptic_curve = EllipticCurve::new(curve_model, coordinate_model.clone(), p.clone(), params, neutral)?;

    if !coordinate_model.is_affine() {
        return Err(Error::BadConfiguration(
            "embedding the generator into a non-affine coordinate system requires a from-affine conversion formula, which this loader does not resolve",
        ));
    }
    let gen_x = hex_biguint(hex_field(curve, "generator")?)?;
    let _ = gen_x; // placeholder silenced below; real fields read directly.
    let gen_x = hex_biguint(hex_field(&curve["generator"], "x").or_else(|_| {
        curve["generator"]["x"]
            .as_str()
            .ok_or(Error::BadConfiguration("missing generator.x"))
    })?)?;
    let gen_y = hex_biguint(hex_field(&curve["generator"], "y").or_else(|_| {
        curve["generator"]["y"]
            .as_str()
            .ok_or(Error::BadConfiguration("missing generator.y"))
    })?)?;
    let mut generator_coords = FxHashMap::default();
    generator_coords.insert("x".to_string(), Mod::new(gen_x, p.clone()));
    generator_coords.insert("y".to_string(), Mod::new(gen_y, p));
    let generator = Point::new(coordinate_model, generator_coords)?;

    Ok(DomainParameters {
        curve: Rc::new(elliptic_curve),
        generator,
        order,
        cofactor,
        name: curve["name"].as_str().map(str::to_string),
        category: curve["category"].as_str().map(str::to_string),
    })
}

/// A named collection of domain parameter sets loaded from one category
/// file (e.g. every curve in std-curves' `"secg"` category).
#[derive(Clone, Debug, Default)]
pub struct DomainParameterCategory {
    /// The category's name.
    pub name: String,
    /// The category's human-readable description.
    pub description: String,
    /// Every curve in the category that parsed and validated
    /// successfully; curves this loader cannot yet handle (unsupported
    /// form, binary field, missing coordinate model) are silently
    /// skipped, matching the original's `except ValueError: continue`.
    pub curves: Vec<DomainParameters>,
}

/// Parse a full category file (`{"name": ..., "desc": ..., "curves": [...]}`).
pub fn load_category(
    json: &str,
    registry: &ModelRegistry,
    coords: &str,
    use_infinity_sentinel: bool,
) -> Result<DomainParameterCategory> {
    let data: Value =
        serde_json::from_str(json).map_err(|_| Error::BadConfiguration("malformed std-curves category JSON"))?;
    let name = data["name"].as_str().unwrap_or_default().to_string();
    let description = data["desc"].as_str().unwrap_or_default().to_string();
    let mut curves = Vec::new();
    if let Some(array) = data["curves"].as_array() {
        for curve in array {
            if let Ok(parsed) = curve_from_json(curve, registry, coords, use_infinity_sentinel) {
                curves.push(parsed);
            }
        }
    }
    Ok(DomainParameterCategory {
        name,
        description,
        curves,
    })
}

/// Parse a single curve file (one bare curve object, not wrapped in a
/// category).
pub fn load_params(
    json: &str,
    registry: &ModelRegistry,
    coords: &str,
    use_infinity_sentinel: bool,
) -> Result<DomainParameters> {
    let curve: Value =
        serde_json::from_str(json).map_err(|_| Error::BadConfiguration("malformed std-curves curve JSON"))?;
    curve_from_json(&curve, registry, coords, use_infinity_sentinel)
}
