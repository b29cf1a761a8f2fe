//! Formula dependency graphs and the equivalence-preserving rewrites used
//! to derive alternate `Formula`s from one EFD-sourced original (spec.md
//! §4.3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/graph.py` and
//! `fliparoo.py`: this crate is the arena-indexed Rust shape of that
//! module, layered next to `ec-core` the way `ec-mult` is — a sibling
//! crate consuming `ec-core`'s public `Formula`/`CodeOp`/`OpKind` rather
//! than folding graph rewriting into `ec-core` itself.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

extern crate alloc;

pub mod equivalence;
pub mod error;
pub mod fliparoo;
pub mod graph;
pub mod node;
pub mod partition;
pub mod sign_switch;

pub use equivalence::formulas_equivalent;
pub use error::{Error, Result};
pub use fliparoo::{find_fliparoos, generate_fliparood_formulas, recursive_fliparoo, Fliparoo};
pub use graph::FormulaGraph;
pub use node::{Node, NodeId};
pub use partition::{expand, reduce_all};
pub use sign_switch::{generate_sign_switches, sign_switch, sub_nodes, switch_sides};
