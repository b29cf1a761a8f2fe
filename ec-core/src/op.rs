//! `CodeOp`: a single field-operation assignment, the atom a [`crate::Formula`]'s
//! code is built from (spec.md §3/§4.2).

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use modfield::FieldValue;

use crate::error::{Error, Result};

/// An operand of a [`CodeOp`]: either a reference to a previously assigned
/// variable/input/parameter, or a small integer literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// A variable name (input coordinate, parameter, or prior result).
    Var(String),
    /// A small integer literal, coerced into the field at evaluation time.
    Literal(i64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(name) => f.write_str(name),
            Operand::Literal(n) => write!(f, "{n}"),
        }
    }
}

/// The operator of a [`CodeOp`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// Unary identity (`result = a`).
    Id,
    /// Unary negation (`result = -a`).
    Neg,
    /// Unary square (`result = a * a`).
    Sqr,
    /// Unary inverse (`result = 1 / a`).
    Inv,
    /// Binary addition.
    Add,
    /// Binary subtraction.
    Sub,
    /// Binary multiplication.
    Mult,
    /// Binary division.
    Div,
    /// Binary exponentiation (`result = a ^ b`, `b` is always a literal).
    Pow,
}

impl OpKind {
    /// Whether this operator takes a single operand.
    pub fn is_unary(self) -> bool {
        matches!(self, OpKind::Id | OpKind::Neg | OpKind::Sqr | OpKind::Inv)
    }

    /// The infix/prefix symbol used when rendering a [`CodeOp`], matching
    /// the teacher-adjacent pyecsca `OpType.op_str` convention.
    pub fn symbol(self) -> &'static str {
        match self {
            OpKind::Id => "",
            OpKind::Neg => "-",
            OpKind::Sqr => "^2",
            OpKind::Inv => "^-1",
            OpKind::Add => "+",
            OpKind::Sub => "-",
            OpKind::Mult => "*",
            OpKind::Div => "/",
            OpKind::Pow => "^",
        }
    }
}

/// A single assignment `result = expr` in a formula's straight-line code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeOp {
    /// The name the result of this op is bound to.
    pub result: String,
    /// The operator.
    pub op: OpKind,
    /// Left (or only, for unary ops) operand.
    pub left: Operand,
    /// Right operand; `None` for unary ops, `Some(Literal(e))` for `Pow`.
    pub right: Option<Operand>,
}

impl CodeOp {
    /// Build a unary op.
    pub fn unary(result: impl Into<String>, op: OpKind, arg: Operand) -> Self {
        debug_assert!(op.is_unary());
        CodeOp {
            result: result.into(),
            op,
            left: arg,
            right: None,
        }
    }

    /// Build a binary op.
    pub fn binary(result: impl Into<String>, op: OpKind, left: Operand, right: Operand) -> Self {
        debug_assert!(!op.is_unary());
        CodeOp {
            result: result.into(),
            op,
            left,
            right: Some(right),
        }
    }

    /// Names of every variable operand this op reads (excludes literals).
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Operand::Var(name) = &self.left {
            out.push(name.as_str());
        }
        if let Some(Operand::Var(name)) = &self.right {
            out.push(name.as_str());
        }
        out
    }

    /// Evaluate this op against a `locals` lookup, returning the result
    /// value. Generic over [`FieldValue`] so a formula can be executed
    /// either concretely (`Mod`) or symbolically (`SymbolicMod`), per
    /// spec.md §4.2.
    ///
    /// The left operand of every op must reference a bound variable (an
    /// input, parameter, or prior result) — spec.md §3's well-formedness
    /// invariant guarantees this for any formula actually loaded from the
    /// EFD; literals only ever appear as the right operand (e.g.
    /// `Z3 = Z1 * 2`).
    pub fn eval<T: FieldValue>(&self, locals: &dyn Fn(&str) -> Option<T>) -> Result<T> {
        let left_name = match &self.left {
            Operand::Var(name) => name.as_str(),
            Operand::Literal(_) => {
                return Err(Error::UnsatisfiedAssumption(
                    "left operand of a CodeOp must reference a bound variable".to_string(),
                ))
            }
        };
        let a = locals(left_name)
            .ok_or_else(|| Error::UnsatisfiedAssumption(left_name.to_string()))?;

        let resolve_right = |a: &T| -> Result<T> {
            let right = self
                .right
                .as_ref()
                .ok_or(Error::BadConfiguration("binary op missing right operand"))?;
            match right {
                Operand::Var(name) => locals(name)
                    .ok_or_else(|| Error::UnsatisfiedAssumption(name.to_string())),
                Operand::Literal(value) => Ok(T::from_literal(*value, a)),
            }
        };

        let result = match self.op {
            OpKind::Id => a.op_id(),
            OpKind::Neg => a.op_neg(),
            OpKind::Sqr => a.op_sqr(),
            OpKind::Inv => a.op_inv(),
            OpKind::Add => a.op_add(&resolve_right(&a)?),
            OpKind::Sub => a.op_sub(&resolve_right(&a)?),
            OpKind::Mult => a.op_mul(&resolve_right(&a)?),
            OpKind::Div => a.op_div(&resolve_right(&a)?),
            OpKind::Pow => {
                let right = self
                    .right
                    .as_ref()
                    .ok_or(Error::BadConfiguration("Pow missing exponent operand"))?;
                match right {
                    Operand::Literal(e) => a.op_pow(*e),
                    Operand::Var(_) => {
                        return Err(Error::UnsatisfiedAssumption(
                            "Pow exponent must be a literal".to_string(),
                        ))
                    }
                }
            }
        };
        result.map_err(Error::from)
    }
}

impl fmt::Display for CodeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.right {
            None => write!(f, "{} = {}{}", self.result, self.op.symbol(), self.left),
            Some(ref right) => write!(
                f,
                "{} = {} {} {}",
                self.result,
                self.left,
                self.op.symbol(),
                right
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use modfield::Mod;
    use num_bigint::BigUint;

    fn locals_of(map: &BTreeMap<String, Mod>) -> impl Fn(&str) -> Option<Mod> + '_ {
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn addition_reads_both_operands() {
        let n = BigUint::from(17u8);
        let mut locals = BTreeMap::new();
        locals.insert("X1".to_string(), Mod::from_u64(5, n.clone()));
        locals.insert("Y1".to_string(), Mod::from_u64(9, n));
        let op = CodeOp::binary(
            "t0",
            OpKind::Add,
            Operand::Var("X1".to_string()),
            Operand::Var("Y1".to_string()),
        );
        let result = op.eval(&locals_of(&locals)).unwrap();
        assert_eq!(result, Mod::from_u64(14, result.modulus().unwrap().clone()));
    }

    #[test]
    fn literal_multiplication_coerces_into_the_field() {
        let n = BigUint::from(17u8);
        let mut locals = BTreeMap::new();
        locals.insert("Z1".to_string(), Mod::from_u64(5, n));
        let op = CodeOp::binary(
            "Z3",
            OpKind::Mult,
            Operand::Var("Z1".to_string()),
            Operand::Literal(2),
        );
        let result = op.eval(&locals_of(&locals)).unwrap();
        assert_eq!(result, Mod::from_u64(10, result.modulus().unwrap().clone()));
    }

    #[test]
    fn unbound_variable_is_unsatisfied_assumption() {
        let locals: BTreeMap<String, Mod> = BTreeMap::new();
        let op = CodeOp::unary("t0", OpKind::Neg, Operand::Var("X1".to_string()));
        assert!(matches!(
            op.eval(&locals_of(&locals)),
            Err(Error::UnsatisfiedAssumption(_))
        ));
    }
}
