//! Scalar recoding helpers: digit expansion, sliding windows, and
//! width-`w` NAF.
//!
//! Grounded on `examples/original_source/pyecsca/ec/scalar.py`'s
//! `convert_base`/`sliding_window_ltr`/`sliding_window_rtl`/`wnaf`/`naf`.

use alloc::vec::Vec;
use num_bigint::BigUint;
use num_traits::Zero;

/// Little-endian digit expansion of `i` in `base`. `base < 2` panics, as
/// does the zero case elsewhere being represented by `[0]`.
pub fn convert_base(i: &BigUint, base: u32) -> Vec<u32> {
    assert!(base >= 2, "base must be at least 2");
    if i.is_zero() {
        return alloc::vec![0];
    }
    let base_big = BigUint::from(base);
    let mut digits = Vec::new();
    let mut n = i.clone();
    while !n.is_zero() {
        let (q, r) = (&n / &base_big, &n % &base_big);
        // r < base <= u32::MAX by construction.
        digits.push(r.to_u32_digits().first().copied().unwrap_or(0));
        n = q;
    }
    digits
}

/// One digit of a windowed recoding: a run of `width` bit-positions,
/// either all-zero (`Zero`) or a single nonzero odd window value
/// (`Value`), together with how many bit-positions it occupies so the
/// digit stream can be walked back into the original scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Digit {
    /// A single zero bit-position.
    Zero,
    /// A nonzero odd window value spanning `width` bit-positions.
    Value {
        /// The window's value (always odd).
        value: i64,
        /// Number of bit-positions this window spans.
        width: usize,
    },
}

/// Maximum-width odd window recoding, scanning most-significant bit
/// first, greedily taking the widest odd window at each nonzero bit
/// (`sliding_window_ltr` in the source).
pub fn sliding_window_ltr(k: &BigUint, w: u32) -> Vec<Digit> {
    assert!(w >= 1, "window width must be at least 1");
    let bits = bit_vec_msb_first(k);
    let mut out = Vec::new();
    let mut i = 0usize;
    let n = bits.len();
    while i < n {
        if !bits[i] {
            out.push(Digit::Zero);
            i += 1;
            continue;
        }
        let max_window = (n - i).min(w as usize);
        let mut width = max_window;
        while width > 1 && !bits[i + width - 1] {
            width -= 1;
        }
        let value = bits_to_value(&bits[i..i + width]);
        out.push(Digit::Value { value, width });
        i += width;
    }
    out
}

/// As [`sliding_window_ltr`], scanning least-significant bit first
/// (`sliding_window_rtl`), with fixed width `w` once a `1` bit is hit.
/// Returned in MSB-first digit order, matching [`sliding_window_ltr`],
/// so both can be walked the same way by callers.
pub fn sliding_window_rtl(k: &BigUint, w: u32) -> Vec<Digit> {
    assert!(w >= 1, "window width must be at least 1");
    let bits = bit_vec_lsb_first(k);
    let mut out = Vec::new();
    let mut i = 0usize;
    let n = bits.len();
    while i < n {
        if !bits[i] {
            out.push(Digit::Zero);
            i += 1;
            continue;
        }
        let width = w.min((n - i) as u32) as usize;
        let window: Vec<bool> = bits[i..i + width].iter().rev().copied().collect();
        let value = bits_to_value(&window);
        out.push(Digit::Value { value, width });
        i += width;
    }
    out.reverse();
    out
}

/// Width-`w` non-adjacent form: the unique signed-digit representation
/// with digits in `(-2^(w-1), 2^(w-1))`, all odd, each followed by at
/// least `w-1` zeros. `naf(k) == wnaf(k, 2)`.
pub fn wnaf(k: &BigUint, w: u32) -> Vec<i64> {
    assert!(w >= 2, "wnaf width must be at least 2");
    let modulus = 1i128 << w;
    let half = modulus / 2;
    let mut d = k.clone();
    let mut out = Vec::new();
    while !d.is_zero() {
        if d.bit(0) {
            let digits = d.to_u32_digits();
            let low = digits.first().copied().unwrap_or(0) as i128 & (modulus - 1);
            let m = if low >= half { low - modulus } else { low };
            out.push(m as i64);
            if m >= 0 {
                d -= BigUint::from(m as u64);
            } else {
                d += BigUint::from((-m) as u64);
            }
        } else {
            out.push(0);
        }
        d >>= 1u32;
    }
    out
}

/// `naf(k) = wnaf(k, 2)`.
pub fn naf(k: &BigUint) -> Vec<i64> {
    wnaf(k, 2)
}

/// Radix-`2^w` Booth recoding: little-endian signed digits in
/// `(-2^(w-1), 2^(w-1)]`, dense (unlike [`wnaf`], consecutive digits may
/// both be nonzero). Has no dedicated multiplier in the source this crate
/// is grounded on; built from the standard carry-propagating Booth
/// technique (GECC §3.3's signed-digit recoding) since `WindowBoothMultiplier`
/// only needs *a* width-w digit stream, not specifically the NAF one.
pub fn booth_recode(k: &BigUint, w: u32) -> Vec<i64> {
    assert!(w >= 1, "booth recoding width must be at least 1");
    let base = 1i128 << w;
    let half = base / 2;
    let raw = convert_base(k, base as u32);
    let mut out = Vec::with_capacity(raw.len() + 1);
    let mut carry = 0i128;
    for d in raw {
        let val = d as i128 + carry;
        if val >= half {
            out.push(val - base);
            carry = 1;
        } else {
            out.push(val);
            carry = 0;
        }
    }
    if carry != 0 {
        out.push(carry);
    }
    out
}

fn bit_vec_msb_first(k: &BigUint) -> Vec<bool> {
    let bits = k.bits().max(1);
    (0..bits).rev().map(|i| k.bit(i)).collect()
}

fn bit_vec_lsb_first(k: &BigUint) -> Vec<bool> {
    let bits = k.bits().max(1);
    (0..bits).map(|i| k.bit(i)).collect()
}

/// Interpret `bits` (MSB first, leading and trailing bits both `1`) as the
/// odd integer it spells out.
fn bits_to_value(bits: &[bool]) -> i64 {
    let mut value: i64 = 0;
    for &bit in bits {
        value = (value << 1) | bit as i64;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_base_round_trips_via_horner() {
        let k = BigUint::from(12345u32);
        let digits = convert_base(&k, 16);
        let mut acc = BigUint::zero();
        for &d in digits.iter().rev() {
            acc = acc * 16u32 + d;
        }
        assert_eq!(acc, k);
    }

    #[test]
    fn convert_base_of_zero_is_single_zero_digit() {
        assert_eq!(convert_base(&BigUint::zero(), 4), alloc::vec![0]);
    }

    #[test]
    fn naf_digits_are_all_odd_or_zero() {
        for k in [13u32, 200, 1_000_003] {
            let digits = naf(&BigUint::from(k));
            for d in digits {
                assert!(d == 0 || d % 2 != 0, "NAF digit {d} is neither zero nor odd");
            }
        }
    }

    #[test]
    fn naf_recombines_to_original_value() {
        for k in [13u32, 200, 1_000_003] {
            let digits = naf(&BigUint::from(k));
            let mut acc: i128 = 0;
            let mut scale: i128 = 1;
            for d in digits {
                acc += d as i128 * scale;
                scale <<= 1;
            }
            assert_eq!(acc, k as i128);
        }
    }

    #[test]
    fn wnaf_respects_adjacency_rule() {
        let k = BigUint::from(0xABCDEFu32);
        let digits = wnaf(&k, 4);
        let mut gap = usize::MAX;
        for &d in &digits {
            if d != 0 {
                assert!(gap >= 3, "nonzero digits closer than w-1 apart");
                gap = 0;
            } else {
                gap = gap.saturating_add(1);
            }
        }
    }

    #[test]
    fn sliding_window_ltr_recombines_to_original_value() {
        for k in [13u32, 200, 1_000_003] {
            let digits = sliding_window_ltr(&BigUint::from(k), 3);
            let mut acc: i128 = 0;
            for d in digits {
                match d {
                    Digit::Zero => acc <<= 1,
                    Digit::Value { value, width } => {
                        acc = (acc << width) + value as i128;
                    }
                }
            }
            assert_eq!(acc, k as i128);
        }
    }

    #[test]
    fn booth_recode_digits_are_in_range_and_recombine() {
        for k in [13u32, 200, 1_000_003] {
            let w = 4;
            let digits = booth_recode(&BigUint::from(k), w);
            let half = 1i128 << (w - 1);
            for &d in &digits {
                assert!(d > -half && d <= half, "digit {d} out of range for w={w}");
            }
            let mut acc: i128 = 0;
            let mut scale: i128 = 1;
            for d in digits {
                acc += d as i128 * scale;
                scale <<= w;
            }
            assert_eq!(acc, k as i128);
        }
    }

    #[test]
    fn sliding_window_rtl_recombines_to_original_value() {
        for k in [13u32, 200, 1_000_003] {
            let digits = sliding_window_rtl(&BigUint::from(k), 3);
            let mut acc: i128 = 0;
            for d in digits {
                match d {
                    Digit::Zero => acc <<= 1,
                    Digit::Value { value, width } => {
                        acc = (acc << width) + value as i128;
                    }
                }
            }
            assert_eq!(acc, k as i128);
        }
    }
}
