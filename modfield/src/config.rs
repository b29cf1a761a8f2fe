//! Process-wide configuration surface.
//!
//! Grounded on the "global mutable configuration -> scoped config" redesign
//! note of spec.md §9: a [`TemporaryConfig`] guard installs a snapshot on
//! construction and restores the previous one on every exit path (including
//! unwinding, via `Drop`), rather than leaving a single global mutated in
//! place. Backed by `core::sync::atomic` rather than a `std::thread_local!`,
//! so the same knob is available with or without the `std` feature — `raw`
//! (the `Mod` backend) is itself `no_std` and dispatches through this config
//! on every fallible `inverse`/`sqrt`/`cube_root`.

pub use crate::error::FailAction;
use core::sync::atomic::{AtomicU8, Ordering};

/// Which `Mod` backend implementation to prefer.
///
/// Corresponds to spec.md §6's `mod_implementation` knob. Only `Bignum` and
/// `Symbolic` are actually implemented in this crate (the heap-allocated
/// `crypto-bigint` backend, and the symbolic-expression backend); `Raw` and
/// `Flint` are accepted for source compatibility and silently fall back to
/// `Bignum`, per spec.md §6's "falls back in order if the chosen one is
/// absent".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ModImplementation {
    /// Fixed-width backend. Not implemented; falls back to `Bignum`.
    Raw,
    /// Heap-allocated arbitrary-precision backend (`crypto-bigint::BoxedUint`).
    #[default]
    Bignum,
    /// FLINT-backed implementation. Not implemented; falls back to `Bignum`.
    Flint,
    /// Symbolic-expression backend (see [`crate::SymbolicMod`]).
    Symbolic,
}

impl ModImplementation {
    fn to_code(self) -> u8 {
        match self {
            ModImplementation::Raw => 0,
            ModImplementation::Bignum => 1,
            ModImplementation::Flint => 2,
            ModImplementation::Symbolic => 3,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => ModImplementation::Raw,
            2 => ModImplementation::Flint,
            3 => ModImplementation::Symbolic,
            _ => ModImplementation::Bignum,
        }
    }
}

impl FailAction {
    fn to_code(self) -> u8 {
        match self {
            FailAction::Error => 0,
            FailAction::Warning => 1,
            FailAction::Ignore => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => FailAction::Warning,
            2 => FailAction::Ignore,
            _ => FailAction::Error,
        }
    }
}

/// Snapshot of the process-wide configuration.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// Selected `Mod` backend.
    pub mod_implementation: ModImplementation,
    /// Policy for inverting a non-invertible element.
    pub no_inverse_action: FailAction,
    /// Policy for `sqrt`/`cube_root` of a non-residue.
    pub non_residue_action: FailAction,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mod_implementation: ModImplementation::default(),
            no_inverse_action: FailAction::Error,
            non_residue_action: FailAction::Error,
        }
    }
}

static MOD_IMPLEMENTATION: AtomicU8 = AtomicU8::new(1);
static NO_INVERSE_ACTION: AtomicU8 = AtomicU8::new(0);
static NON_RESIDUE_ACTION: AtomicU8 = AtomicU8::new(0);

fn set_config(config: Config) {
    MOD_IMPLEMENTATION.store(config.mod_implementation.to_code(), Ordering::Relaxed);
    NO_INVERSE_ACTION.store(config.no_inverse_action.to_code(), Ordering::Relaxed);
    NON_RESIDUE_ACTION.store(config.non_residue_action.to_code(), Ordering::Relaxed);
}

/// Read the currently active configuration.
pub fn getconfig() -> Config {
    Config {
        mod_implementation: ModImplementation::from_code(MOD_IMPLEMENTATION.load(Ordering::Relaxed)),
        no_inverse_action: FailAction::from_code(NO_INVERSE_ACTION.load(Ordering::Relaxed)),
        non_residue_action: FailAction::from_code(NON_RESIDUE_ACTION.load(Ordering::Relaxed)),
    }
}

/// Scoped configuration override. Installs `config` for its lifetime and
/// restores the previous configuration when dropped, on every exit path.
///
/// ```
/// use modfield::config::{Config, TemporaryConfig, FailAction};
/// let mut cfg = modfield::config::getconfig();
/// cfg.no_inverse_action = FailAction::Ignore;
/// {
///     let _guard = TemporaryConfig::install(cfg);
///     assert_eq!(modfield::config::getconfig().no_inverse_action, FailAction::Ignore);
/// }
/// assert_eq!(modfield::config::getconfig().no_inverse_action, FailAction::Error);
/// ```
pub struct TemporaryConfig {
    previous: Config,
}

impl TemporaryConfig {
    /// Install `config` as the active configuration for this scope.
    pub fn install(config: Config) -> Self {
        let previous = getconfig();
        set_config(config);
        TemporaryConfig { previous }
    }
}

impl Drop for TemporaryConfig {
    fn drop(&mut self) {
        set_config(self.previous);
    }
}
