//! Errors produced by RPA/EPA analysis, keygen, ECDH, and the ECDSA
//! primitive.

use core::fmt::{self, Display};

/// Errors from `ec-analysis`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Propagated from `ec-core` formula execution or point construction.
    Core(ec_core::Error),
    /// Propagated from `ec-mult` multiplier setup or execution.
    Mult(ec_mult::Error),
    /// Propagated from `modfield` field arithmetic.
    Field(modfield::Error),
    /// An RPA synthetic point could not be built on this curve (e.g. the
    /// cubic `x^3 + a*x + b` has no root in the field, or the curve model
    /// is not short Weierstrass).
    NoRpaPoint,
    /// At least one of `use_init`/`use_multiply` must be set when
    /// building EPA check inputs.
    NoCheckScope,
    /// A DER-encoded signature did not parse.
    Der(&'static str),
    /// A signature component (`r` or `s`) was zero or out of range.
    InvalidSignature,
}

impl From<ec_core::Error> for Error {
    fn from(value: ec_core::Error) -> Self {
        Error::Core(value)
    }
}

impl From<ec_mult::Error> for Error {
    fn from(value: ec_mult::Error) -> Self {
        Error::Mult(value)
    }
}

impl From<modfield::Error> for Error {
    fn from(value: modfield::Error) -> Self {
        Error::Field(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Core(e) => write!(f, "{e}"),
            Error::Mult(e) => write!(f, "{e}"),
            Error::Field(e) => write!(f, "{e}"),
            Error::NoRpaPoint => f.write_str("no RPA synthetic point exists on this curve"),
            Error::NoCheckScope => f.write_str("at least one of use_init or use_multiply must be set"),
            Error::Der(msg) => write!(f, "malformed DER signature: {msg}"),
            Error::InvalidSignature => f.write_str("signature component out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type used throughout `ec-analysis`.
pub type Result<T> = core::result::Result<T, Error>;
