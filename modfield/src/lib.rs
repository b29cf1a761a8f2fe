//! Runtime prime-field element (`Mod`), its symbolic twin (`SymbolicMod`),
//! and the `FieldValue` seam the formula interpreter (see the `ec-core`
//! crate) is generic over.
//!
//! Grounded on `primefield`'s `ByteOrder` enum and minimal `Error` style,
//! but backed by `num_bigint::BigUint` instead of the teacher's
//! const-generic Montgomery types, because here the modulus is chosen at
//! runtime (an arbitrary curve's field prime), not baked into a type via
//! `monty_field_params!`. The backend is a Cargo feature (`backend-bignum`)
//! in the shape of `examples/CokieMiner-SymbAnaFis`'s `num-anafis` crate,
//! which selects its arithmetic backend the same way.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

extern crate alloc;

pub mod config;
pub mod error;
mod raw;
pub mod symbolic;

pub use error::{Error, FailAction, Result, Warning};
pub use num_bigint;
pub use raw::Mod;
pub use rand_core;
pub use subtle;
pub use symbolic::SymbolicMod;

/// Byte order used when encoding/decoding field elements as bytestrings.
///
/// Mirrors `primefield::ByteOrder`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    /// Big endian.
    BigEndian,
    /// Little endian.
    LittleEndian,
}

/// The arithmetic surface the formula interpreter needs, implemented by
/// both [`Mod`] (concrete) and [`SymbolicMod`] (symbolic), so a `Formula`
/// (see `ec-core`) can execute its code either way without caring which.
///
/// Corresponds to spec.md §4.2's "executable symbolically or concretely".
pub trait FieldValue: Clone + core::fmt::Debug + Sized {
    /// Build a value representing the small integer literal `value`,
    /// in the same field/class as `like` (same modulus, same backend).
    fn from_literal(value: i64, like: &Self) -> Self;

    /// `self + other`.
    fn op_add(&self, other: &Self) -> Result<Self>;
    /// `self - other`.
    fn op_sub(&self, other: &Self) -> Result<Self>;
    /// `self * other`.
    fn op_mul(&self, other: &Self) -> Result<Self>;
    /// `self / other`.
    fn op_div(&self, other: &Self) -> Result<Self>;
    /// `-self`.
    fn op_neg(&self) -> Result<Self>;
    /// `self * self`.
    fn op_sqr(&self) -> Result<Self> {
        self.op_mul(self)
    }
    /// `self^e` for a (possibly negative) integer exponent.
    fn op_pow(&self, e: i64) -> Result<Self>;
    /// `1 / self`.
    fn op_inv(&self) -> Result<Self>;
    /// Identity/copy (the `Id` code op).
    fn op_id(&self) -> Result<Self> {
        Ok(self.clone())
    }
}
