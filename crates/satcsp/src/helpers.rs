//! Small arithmetic helpers shared between the bit-vector encoder, the
//! solution accessors, and the objective search.

use crate::IntVal;

/// Largest bit width supported for bit-vector variables.
///
/// Weights and two's complement patterns of a vector of this width still fit in
/// an [`IntVal`].
pub(crate) const MAX_BIT_WIDTH: u32 = 62;

/// Returns `2^exp`.
#[inline]
pub(crate) fn pow2(exp: u32) -> IntVal {
	debug_assert!(exp <= MAX_BIT_WIDTH);
	1 << exp
}

/// Returns the bit pattern of `value` when it is stored in a two's complement
/// bit-vector of the given `width`.
#[inline]
pub(crate) fn bit_pattern(value: IntVal, width: u32) -> IntVal {
	value.rem_euclid(pow2(width))
}

/// Returns `(lb + ub) / 2`, rounded towards positive infinity.
#[inline]
pub(crate) fn midpoint_ceil(lb: IntVal, ub: IntVal) -> IntVal {
	(lb >> 1) + (ub >> 1) + ((lb | ub) & 1)
}

/// Returns `(lb + ub) / 2`, rounded towards negative infinity.
#[inline]
pub(crate) fn midpoint_floor(lb: IntVal, ub: IntVal) -> IntVal {
	(lb >> 1) + (ub >> 1) + (lb & ub & 1)
}

#[cfg(test)]
mod tests {
	use crate::{
		helpers::{bit_pattern, midpoint_ceil, midpoint_floor, pow2},
		IntVal,
	};

	#[test]
	fn test_bit_pattern() {
		assert_eq!(pow2(0), 1);
		assert_eq!(pow2(4), 16);
		assert_eq!(bit_pattern(5, 4), 5);
		assert_eq!(bit_pattern(-3, 4), 13);
		assert_eq!(bit_pattern(-8, 4), 8);
		assert_eq!(bit_pattern(-1, 3), 7);
	}

	#[test]
	fn test_midpoint() {
		assert_eq!(midpoint_floor(1, 2), 1);
		assert_eq!(midpoint_ceil(1, 2), 2);
		assert_eq!(midpoint_floor(-3, -2), -3);
		assert_eq!(midpoint_ceil(-3, -2), -2);
		assert_eq!(midpoint_floor(-5, 5), 0);
		assert_eq!(midpoint_ceil(-4, 4), 0);
		assert_eq!(midpoint_floor(IntVal::MIN, 0), IntVal::MIN / 2);
		assert_eq!(midpoint_floor(IntVal::MIN, IntVal::MAX), -1);
		assert_eq!(midpoint_ceil(IntVal::MIN, IntVal::MAX), 0);
		assert_eq!(midpoint_ceil(IntVal::MAX - 1, IntVal::MAX), IntVal::MAX);
	}
}
