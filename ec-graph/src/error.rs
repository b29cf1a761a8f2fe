//! Errors produced by graph construction and transform application.

use alloc::string::String;
use core::fmt::{self, Display};

/// Errors from `ec-graph`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Propagated from `ec-core` formula execution or point construction.
    Core(ec_core::Error),
    /// Propagated from `modfield` field arithmetic, during symbolic
    /// unrolling.
    Field(modfield::Error),
    /// A formula's code does not bind every output coordinate it claims to
    /// produce.
    MissingOutput(String),
    /// A transform found no matching subgraph to rewrite (e.g. `fliparoo`
    /// on a formula with no same-polarity chain of length ≥ 2).
    NoMatch(&'static str),
    /// A `sign_switch` candidate failed the post-propagation sign-product
    /// check and was rejected.
    SignMismatch,
}

impl From<ec_core::Error> for Error {
    fn from(value: ec_core::Error) -> Self {
        Error::Core(value)
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
            Error::Field(e) => write!(f, "{e}"),
            Error::MissingOutput(name) => write!(f, "formula code never binds output {name}"),
            Error::NoMatch(what) => write!(f, "no {what} found to transform"),
            Error::SignMismatch => f.write_str("sign-switch candidate does not preserve output signs"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type used throughout `ec-graph`.
pub type Result<T> = core::result::Result<T, Error>;
