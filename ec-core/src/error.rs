//! Structured error kinds for the execution engine (spec.md §7).

use alloc::string::String;
use core::fmt::{self, Display};

/// Errors produced by formula execution, multiplier setup, or curve lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Propagated from a [`modfield`] arithmetic failure.
    Field(modfield::Error),
    /// Wrong number or coordinate model of inputs to a formula or
    /// multiplier.
    InputMismatch,
    /// A formula assumption fails and cannot be satisfied by parameter
    /// solving.
    UnsatisfiedAssumption(String),
    /// A multiplier needs a formula kind it was not given.
    MissingFormula(&'static str),
    /// `multiply` called before `init`.
    Uninitialized,
    /// Invalid configuration value.
    BadConfiguration(&'static str),
}

impl From<modfield::Error> for Error {
    fn from(value: modfield::Error) -> Self {
        Error::Field(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Field(e) => write!(f, "field error: {e}"),
            Error::InputMismatch => f.write_str("wrong number or coordinate model of inputs"),
            Error::UnsatisfiedAssumption(msg) => {
                write!(f, "unsatisfied formula assumption: {msg}")
            }
            Error::MissingFormula(kind) => write!(f, "multiplier is missing a {kind} formula"),
            Error::Uninitialized => f.write_str("multiply() called before init()"),
            Error::BadConfiguration(msg) => write!(f, "bad configuration: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type used throughout `ec-core` and its dependents.
pub type Result<T> = core::result::Result<T, Error>;
