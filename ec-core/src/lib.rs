//! Curve/coordinate models, formulas, points, domain parameters, and the
//! context/action tracing subsystem for a runtime-configurable
//! elliptic-curve execution engine.
//!
//! Layered the way `examples/RustCrypto-elliptic-curves`'s
//! `elliptic-curve`/`weierstrass`/`primeorder` crates split concerns, but
//! every layer here is data-driven (curve model, coordinate system, and
//! formula are chosen at runtime from `crate::db`, not baked in via
//! const-generic curve types), per spec.md's requirement to select all of
//! that at runtime.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

extern crate alloc;

pub mod context;
pub mod curve;
pub mod db;
pub mod error;
pub mod formula;
pub mod model;
pub mod op;
pub mod point;

pub use context::{Action, ActionResult, Context, DefaultContext, MultipleContext, NullContext, PathContext};
pub use curve::{DomainParameters, EllipticCurve};
pub use error::{Error, Result};
pub use formula::{Formula, FormulaKind};
pub use model::{Assumption, CoordinateModel, CurveModel};
pub use op::{CodeOp, OpKind, Operand};
pub use point::Point;

pub use modfield;
