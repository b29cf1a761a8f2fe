//! Errors produced by multiplier construction, initialization, and
//! countermeasure setup.

use core::fmt::{self, Display};

/// Errors from `ec-mult`, wrapping `ec-core`'s own execution-engine errors
/// with the handful of conditions specific to multiplier/countermeasure
/// setup.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Propagated from formula execution or point construction.
    Core(ec_core::Error),
    /// A required formula kind was not supplied.
    MissingFormula(&'static str),
    /// Two or more supplied formulas disagree on coordinate model.
    MixedCoordinateModel,
    /// `multiply` called before `init`.
    Uninitialized,
    /// A countermeasure's randomization parameter is out of range (e.g.
    /// `rand_bits == 0`).
    BadConfiguration(&'static str),
}

impl From<ec_core::Error> for Error {
    fn from(value: ec_core::Error) -> Self {
        Error::Core(value)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Core(e) => write!(f, "{e}"),
            Error::MissingFormula(kind) => write!(f, "multiplier is missing a {kind} formula"),
            Error::MixedCoordinateModel => {
                f.write_str("supplied formulas do not share one coordinate model")
            }
            Error::Uninitialized => f.write_str("multiply() called before init()"),
            Error::BadConfiguration(msg) => write!(f, "bad configuration: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type used throughout `ec-mult`.
pub type Result<T> = core::result::Result<T, Error>;
