//! Symbolic twin of [`crate::Mod`]: same arithmetic contract, but `x` is a
//! symbolic expression over a named alphabet instead of a concrete residue.
//!
//! Grounded in *shape* on `examples/CokieMiner-SymbAnaFis` (a symbolic
//! expression engine), reduced to the small op set spec.md §3 actually asks
//! for: full arithmetic, but `sqrt`/`is_residue` always fail since there is
//! no concrete value to take a root of.

use crate::error::{Error, Result};
use crate::raw::Mod;
use crate::FieldValue;
use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;
use num_bigint::BigUint;

/// A symbolic expression node over field operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// A named free variable.
    Var(String),
    /// An integer constant.
    Const(BigUint),
    /// `-a`.
    Neg(Box<Expr>),
    /// `a + b`.
    Add(Box<Expr>, Box<Expr>),
    /// `a - b`.
    Sub(Box<Expr>, Box<Expr>),
    /// `a * b`.
    Mul(Box<Expr>, Box<Expr>),
    /// `a / b`.
    Div(Box<Expr>, Box<Expr>),
    /// `a^e`.
    Pow(Box<Expr>, i64),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => f.write_str(name),
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Neg(a) => write!(f, "(-{a})"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Div(a, b) => write!(f, "({a} / {b})"),
            Expr::Pow(a, e) => write!(f, "({a}^{e})"),
        }
    }
}

/// An element of the symbolic field extension `GF(n)(alphabet)`: an
/// [`Expr`] tree paired with the modulus it will eventually be evaluated
/// under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolicMod {
    /// The expression.
    pub expr: Expr,
    /// The modulus this expression will be reduced under once evaluated.
    pub n: BigUint,
}

impl SymbolicMod {
    /// A free variable named `name`.
    pub fn var(name: impl Into<String>, n: BigUint) -> Self {
        SymbolicMod {
            expr: Expr::Var(name.into()),
            n,
        }
    }

    /// A constant, reduced modulo `n`.
    pub fn constant(value: BigUint, n: BigUint) -> Self {
        let value = value % &n;
        SymbolicMod { expr: Expr::Const(value), n }
    }

    fn same_field(&self, other: &Self) -> Result<()> {
        if self.n == other.n {
            Ok(())
        } else {
            Err(Error::ModulusMismatch)
        }
    }

    /// Substitute every free variable using `lookup`, producing a concrete
    /// [`Mod`]. Fails if `lookup` does not cover every variable referenced.
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<Mod>) -> Result<Mod> {
        eval(&self.expr, &self.n, lookup)
    }
}

fn eval(expr: &Expr, n: &BigUint, lookup: &dyn Fn(&str) -> Option<Mod>) -> Result<Mod> {
    match expr {
        Expr::Var(name) => lookup(name).ok_or(Error::Undefined),
        Expr::Const(c) => Ok(Mod::new(c.clone(), n.clone())),
        Expr::Neg(a) => eval(a, n, lookup)?.neg(),
        Expr::Add(a, b) => eval(a, n, lookup)?.add(&eval(b, n, lookup)?),
        Expr::Sub(a, b) => eval(a, n, lookup)?.sub(&eval(b, n, lookup)?),
        Expr::Mul(a, b) => eval(a, n, lookup)?.mul(&eval(b, n, lookup)?),
        Expr::Div(a, b) => eval(a, n, lookup)?.div(&eval(b, n, lookup)?),
        Expr::Pow(a, e) => eval(a, n, lookup)?.pow_i64(*e),
    }
}

impl fmt::Display for SymbolicMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mod {})", self.expr, self.n)
    }
}

impl FieldValue for SymbolicMod {
    fn from_literal(value: i64, like: &Self) -> Self {
        let n = like.n.clone();
        if value >= 0 {
            SymbolicMod::constant(BigUint::from(value as u64), n)
        } else {
            SymbolicMod {
                expr: Expr::Neg(Box::new(Expr::Const(BigUint::from((-value) as u64)))),
                n,
            }
        }
    }

    fn op_add(&self, other: &Self) -> Result<Self> {
        self.same_field(other)?;
        Ok(SymbolicMod {
            expr: Expr::Add(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
            n: self.n.clone(),
        })
    }

    fn op_sub(&self, other: &Self) -> Result<Self> {
        self.same_field(other)?;
        Ok(SymbolicMod {
            expr: Expr::Sub(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
            n: self.n.clone(),
        })
    }

    fn op_mul(&self, other: &Self) -> Result<Self> {
        self.same_field(other)?;
        Ok(SymbolicMod {
            expr: Expr::Mul(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
            n: self.n.clone(),
        })
    }

    fn op_div(&self, other: &Self) -> Result<Self> {
        self.same_field(other)?;
        Ok(SymbolicMod {
            expr: Expr::Div(Box::new(self.expr.clone()), Box::new(other.expr.clone())),
            n: self.n.clone(),
        })
    }

    fn op_neg(&self) -> Result<Self> {
        Ok(SymbolicMod {
            expr: Expr::Neg(Box::new(self.expr.clone())),
            n: self.n.clone(),
        })
    }

    fn op_pow(&self, e: i64) -> Result<Self> {
        Ok(SymbolicMod {
            expr: Expr::Pow(Box::new(self.expr.clone()), e),
            n: self.n.clone(),
        })
    }

    fn op_inv(&self) -> Result<Self> {
        self.op_pow(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_and_residue_are_not_part_of_the_symbolic_surface() {
        // SymbolicMod deliberately has no sqrt()/is_residue(): spec.md §3
        // requires those to fail, which we enforce by simply not exposing
        // them on this type rather than returning a runtime error.
        let n = BigUint::from(17u8);
        let x = SymbolicMod::var("X1", n.clone());
        let y = SymbolicMod::constant(BigUint::from(3u8), n);
        let sum = x.op_add(&y).unwrap();
        assert_eq!(format!("{}", sum.expr), "(X1 + 3)");
    }
}
