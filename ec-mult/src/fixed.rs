//! Full-table precomputation multiplier.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/fixed.py`'s
//! `FullPrecompMultiplier`.

use alloc::collections::BTreeMap;
use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::{Action, ActionResult, Context, DomainParameters, FormulaKind, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ProcessingDirection, ScalarMultiplier};
use crate::error::{Error, Result};

/// Precomputes `[2^i] point` for every `i` in `0..=bits` inside a
/// `PrecomputationAction`, so the main loop performs only accumulations —
/// no doublings. `always` inserts a dummy accumulation on zero bits.
#[derive(Clone, Debug)]
pub struct FullPrecompMultiplier {
    core: MultiplierCore,
    direction: ProcessingDirection,
    always: bool,
    table: BTreeMap<u64, Point<Mod>>,
}

impl FullPrecompMultiplier {
    /// Build a full-precomputation multiplier.
    pub fn new(
        formulas: Formulas,
        direction: ProcessingDirection,
        always: bool,
        short_circuit: bool,
    ) -> Result<Self> {
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(FullPrecompMultiplier {
            core,
            direction,
            always,
            table: BTreeMap::new(),
        })
    }
}

impl ScalarMultiplier for FullPrecompMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        let bits = self.core.bits()?;
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let mut table = BTreeMap::new();
        let mut current = point;
        table.insert(0u64, current.clone());
        for i in 1..=bits {
            current = self.core.dbl(&current, ctx)?;
            table.insert(i, current.clone());
        }
        ctx.exit_action(&ActionResult::Points(table.values().cloned().collect()));
        self.table = table;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let point = self.core.point()?.clone();
        ctx.enter_action(&Action::ScalarMultiplication {
            point,
            scalar: scalar.clone(),
        });
        let bits = self.core.bits()?;
        let mut q = self.core.neutral()?;
        let indices: alloc::vec::Vec<u64> = match self.direction {
            ProcessingDirection::LeftToRight => (0..bits).rev().collect(),
            ProcessingDirection::RightToLeft => (0..bits).collect(),
        };
        for i in indices {
            let term = self.table.get(&i).ok_or(Error::Uninitialized)?.clone();
            if scalar.bit(i) {
                q = self.core.accumulate(&q, &term, ctx)?;
            } else if self.always {
                let _ = self.core.accumulate(&q, &term, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}
