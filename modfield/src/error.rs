//! Error types and the configurable failure-action policy.

use core::fmt::{self, Display};

/// Structured error kinds produced by [`crate::Mod`] arithmetic.
///
/// Mirrors the minimal, no-`thiserror`, unit-struct-per-crate error style
/// used throughout the teacher crates (e.g. `primefield::error::Error`),
/// widened to the small enum of kinds spec.md §7 actually needs at this
/// layer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Arithmetic attempted between two `Mod`s with different moduli.
    ModulusMismatch,
    /// Attempted to invert zero, or a non-unit under a composite modulus.
    NonInvertible,
    /// `sqrt`/`cube_root` of a non-residue.
    NonResidue,
    /// Residue tests/roots requested against a composite modulus.
    NotImplementedForComposite,
    /// Arithmetic attempted on the `Undefined` sentinel element.
    Undefined,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::ModulusMismatch => "modulus mismatch between operands",
            Error::NonInvertible => "element is not invertible",
            Error::NonResidue => "element is not a residue",
            Error::NotImplementedForComposite => "operation requires a prime modulus",
            Error::Undefined => "arithmetic on an undefined element",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type used throughout `modfield`.
pub type Result<T> = core::result::Result<T, Error>;

/// Policy applied when a fallible operation (non-invertible inverse,
/// non-residue sqrt/cube-root) would otherwise fail.
///
/// See spec.md §4.1 and the `no_inverse_action`/`non_residue_action` knobs
/// of spec.md §6.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum FailAction {
    /// Raise the structured [`Error`].
    #[default]
    Error,
    /// Record a [`Warning`] and return a default/unchanged value.
    Warning,
    /// Silently return a default/unchanged value.
    Ignore,
}

/// A recorded non-fatal event, emitted when a [`FailAction::Warning`]
/// policy fires. Observable through [`take_warnings`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Warning {
    /// Which kind of failure this warning stands in for.
    pub kind: Error,
    /// Human-readable context, e.g. which operation raised it.
    pub context: &'static str,
}

#[cfg(feature = "std")]
mod sink {
    use super::Warning;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    std::thread_local! {
        static WARNINGS: RefCell<Vec<Warning>> = const { RefCell::new(Vec::new()) };
    }

    pub(super) fn push(w: Warning) {
        WARNINGS.with(|cell| cell.borrow_mut().push(w));
    }

    /// Drain and return all warnings recorded on the current thread so far.
    pub fn take_warnings() -> Vec<Warning> {
        WARNINGS.with(|cell| cell.take())
    }
}

#[cfg(feature = "std")]
pub use sink::take_warnings;

/// Apply `action` to a failure of `kind` occurring in `context`.
///
/// - [`FailAction::Error`] returns `Err(kind)`.
/// - [`FailAction::Warning`] records the event (see [`take_warnings`]) and
///   returns `Ok(default)`.
/// - [`FailAction::Ignore`] silently returns `Ok(default)`.
pub fn dispatch<T>(action: FailAction, kind: Error, context: &'static str, default: T) -> Result<T> {
    match action {
        FailAction::Error => Err(kind),
        FailAction::Warning => {
            #[cfg(feature = "std")]
            sink::push(Warning { kind, context });
            #[cfg(not(feature = "std"))]
            let _ = context;
            Ok(default)
        }
        FailAction::Ignore => Ok(default),
    }
}
