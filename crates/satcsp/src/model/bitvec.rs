//! Bit-blasting of bitwise operations and shifts on bit-vector terms.
//!
//! Every operation decomposes its operands into fresh `{0, 1}` variables and
//! links them to the integer value of the operand using a weighted sum. The
//! resulting constraints only use the ordinary integer operators of the model.

use tracing::debug;

use crate::{
	add_int,
	helpers::{bit_pattern, pow2, MAX_BIT_WIDTH},
	mod_int,
	model::term::{unify_bitvec, BitVecInfo},
	sub_int, times_int, Constraint, Domain, IntVal, IntVar, Model, ModelError, Term,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// The bitwise operators supported by the encoder.
enum BitwiseOp {
	/// Bitwise conjunction.
	And,
	/// Bitwise disjunction.
	Or,
	/// Bitwise exclusive disjunction.
	Xor,
}

impl Model {
	/// Declare a bit-vector variable with `width` bits.
	///
	/// The domain of the variable is `[0, 2^width - 1]` for unsigned vectors and
	/// `[-2^(width-1), 2^(width-1) - 1]` for signed vectors.
	pub fn bit_vec(&mut self, name: &str, width: u32, signed: bool) -> Result<IntVar, ModelError> {
		let info = checked_info(width, signed)?;
		Ok(self.declare_bit_vec(IntVar::new(name), info))
	}

	/// Create a term whose value is the bitwise conjunction of `x` and `y`.
	///
	/// At least one of the operands must be a bit-vector, and all bit-vector
	/// operands must have the same width and signedness.
	pub fn bit_and(&mut self, x: impl Into<Term>, y: impl Into<Term>) -> Result<Term, ModelError> {
		self.bitwise(BitwiseOp::And, x.into(), y.into())
	}

	/// Create a term whose value is the bitwise disjunction of `x` and `y`.
	pub fn bit_or(&mut self, x: impl Into<Term>, y: impl Into<Term>) -> Result<Term, ModelError> {
		self.bitwise(BitwiseOp::Or, x.into(), y.into())
	}

	/// Decompose a (new) bit-vector into named bit variables.
	///
	/// Declares the bits `{name}_1` (least significant) to `{name}_{width}` and
	/// returns a term that evaluates to the value represented by the bits,
	/// together with the bits. When `value` is given, the bits are constrained
	/// to represent `value` (modulo `2^width`).
	pub fn bit_vec_with_bits(
		&mut self,
		name: &str,
		width: u32,
		signed: bool,
		value: Option<&Term>,
	) -> Result<(Term, Vec<IntVar>), ModelError> {
		let info = checked_info(width, signed)?;
		self.decompose(name, info, value, false)
	}

	/// Create a term whose value is the bitwise exclusive disjunction of `x` and
	/// `y`.
	pub fn bit_xor(&mut self, x: impl Into<Term>, y: impl Into<Term>) -> Result<Term, ModelError> {
		self.bitwise(BitwiseOp::Xor, x.into(), y.into())
	}

	/// Declare an auxiliary bit-vector variable with `width` bits and a fresh
	/// name.
	pub fn new_bit_vec(&mut self, width: u32, signed: bool) -> Result<IntVar, ModelError> {
		let info = checked_info(width, signed)?;
		Ok(self.aux_bit_vec(info))
	}

	/// Shift the bits of `x` to the right by the literal `amount`, filling the
	/// vacated bits with copies of the sign bit.
	///
	/// Unsigned vectors are shifted logically.
	pub fn arithmetic_shift_right(
		&mut self,
		x: impl Into<Term>,
		amount: impl Into<Term>,
	) -> Result<Term, ModelError> {
		let x = x.into();
		let (info, shift) = shift_operands(&x, &amount.into())?;
		if !info.signed {
			return self.logical_shift(x, info, shift);
		}
		debug!(width = info.width, shift, "bit-blast arithmetic shift right");
		let (n, s) = (info.width as usize, shift as usize);
		let (source, xbits) = self.aux_decompose(info, Some(&x))?;
		let (result, rbits) = self.aux_decompose(info, None)?;

		let mut zero_fill = Vec::with_capacity(n);
		let mut one_fill = Vec::with_capacity(n);
		for i in 0..n - s {
			let copy = Term::from(&rbits[i]).eq(&xbits[i + s]);
			zero_fill.push(copy.clone());
			one_fill.push(copy);
		}
		for r in &rbits[n - s..] {
			zero_fill.push(Term::from(r).eq(0));
			one_fill.push(Term::from(r).eq(1));
		}
		self.add_constraints([
			Constraint::implies(source.ge(0), Constraint::and(zero_fill)),
			Constraint::implies(source.lt(0), Constraint::and(one_fill)),
		])?;
		Ok(result)
	}

	/// Shared implementation of the bitwise operators.
	fn bitwise(&mut self, op: BitwiseOp, x: Term, y: Term) -> Result<Term, ModelError> {
		let info = unify_bitvec([&x, &y])?.ok_or(ModelError::NotBitVector)?;
		debug!(?op, width = info.width, signed = info.signed, "bit-blast bitwise operation");
		// A literal operand is always handled as the right-hand side.
		let (x, y) = if x.as_constant().is_some() { (y, x) } else { (x, y) };

		let (_, xbits) = self.aux_decompose(info, Some(&x))?;
		let (result, rbits) = self.aux_decompose(info, None)?;
		let mut constraints = Vec::with_capacity(2 * xbits.len());
		if let Some(lit) = y.as_constant() {
			let pattern = bit_pattern(lit, info.width);
			for (i, (a, r)) in xbits.iter().zip(&rbits).enumerate() {
				let set = (pattern >> i) & 1 == 1;
				constraints.push(match (op, set) {
					(BitwiseOp::And, true) | (BitwiseOp::Or | BitwiseOp::Xor, false) => {
						Term::from(r).eq(a)
					}
					(BitwiseOp::And, false) => Term::from(r).eq(0),
					(BitwiseOp::Or, true) => Term::from(r).eq(1),
					(BitwiseOp::Xor, true) => add_int([a, r])?.eq(1),
				});
			}
		} else {
			let (_, ybits) = self.aux_decompose(info, Some(&y))?;
			for ((a, b), r) in xbits.iter().zip(&ybits).zip(&rbits) {
				match op {
					BitwiseOp::And => constraints.push(times_int([a, b])?.eq(r)),
					BitwiseOp::Or => {
						let count = add_int([a, b])?;
						constraints.push(Constraint::implies(count.gt(0), Term::from(r).eq(1)));
						constraints.push(Constraint::implies(count.eq(0), Term::from(r).eq(0)));
					}
					BitwiseOp::Xor => constraints.push(mod_int(add_int([a, b])?, 2)?.eq(r)),
				}
			}
		}
		self.add_constraints(constraints)?;
		Ok(result)
	}

	/// Declare a fresh auxiliary bit-vector variable.
	fn aux_bit_vec(&mut self, info: BitVecInfo) -> IntVar {
		let name = self.fresh_name("BV");
		self.declare_bit_vec(IntVar::new(name).with_auxiliary(true), info)
	}

	/// Decompose a bit-vector into fresh auxiliary bits.
	fn aux_decompose(
		&mut self,
		info: BitVecInfo,
		value: Option<&Term>,
	) -> Result<(Term, Vec<IntVar>), ModelError> {
		let name = loop {
			let name = self.fresh_name("BV");
			if self.declared_bit(&name, info.width).is_none() {
				break name;
			}
		};
		self.decompose(&name, info, value, true)
	}

	/// The first of the bit names `{name}_1` to `{name}_{width}` that is
	/// already declared, if any.
	fn declared_bit(&self, name: &str, width: u32) -> Option<String> {
		(1..=width)
			.map(|k| format!("{name}_{k}"))
			.find(|bit| self.is_declared(bit))
	}

	/// Declare a bit-vector variable with the domain implied by `info`.
	fn declare_bit_vec(&mut self, var: IntVar, info: BitVecInfo) -> IntVar {
		self.declare_int(var.with_bitvec(info), Domain::from_bit_vec(info))
	}

	/// Declare the bits `{name}_1` to `{name}_{width}`, and link them to the
	/// weighted sum returned as the first element of the result.
	///
	/// The weight of bit `i` is `2^i`, except for the most significant bit of a
	/// signed vector, which has weight `-2^(width-1)`. Returns
	/// [`ModelError::DuplicateVariable`] if any of the bit names is taken.
	fn decompose(
		&mut self,
		name: &str,
		info: BitVecInfo,
		value: Option<&Term>,
		auxiliary: bool,
	) -> Result<(Term, Vec<IntVar>), ModelError> {
		if let Some(name) = self.declared_bit(name, info.width) {
			return Err(ModelError::DuplicateVariable { name });
		}
		let bits: Vec<IntVar> = (1..=info.width)
			.map(|k| {
				let bit = IntVar::new(format!("{name}_{k}")).with_auxiliary(auxiliary);
				self.declare_int(bit, Domain::boolean())
			})
			.collect();

		let mut weighted = bits
			.iter()
			.zip(0..)
			.map(|(b, i)| times_int([Term::from(b), Term::from(pow2(i))]))
			.collect::<Result<Vec<_>, _>>()?;
		let sum = if info.signed {
			let top = weighted.pop();
			sub_int([add_int(weighted)?].into_iter().chain(top))?
		} else {
			add_int(weighted)?
		}
		.with_bitvec(info);

		if let Some(value) = value {
			let modulus = pow2(info.width);
			let wrapped = mod_int(value, modulus)?;
			if info.signed {
				let half = pow2(info.width - 1);
				self.add_constraints([
					Constraint::implies(wrapped.lt(half), wrapped.eq(&sum)),
					Constraint::implies(
						wrapped.ge(half),
						sub_int([wrapped.clone(), Term::from(modulus)])?.eq(&sum),
					),
				])?;
			} else {
				self.add_constraint(wrapped.eq(&sum))?;
			}
		}
		Ok((sum, bits))
	}

	/// Shift the bits of `x` to the right by the literal `amount`, filling the
	/// vacated bits with zeros.
	pub fn logical_shift_right(
		&mut self,
		x: impl Into<Term>,
		amount: impl Into<Term>,
	) -> Result<Term, ModelError> {
		let x = x.into();
		let (info, shift) = shift_operands(&x, &amount.into())?;
		self.logical_shift(x, info, shift)
	}

	/// Shared implementation of the logical right shift.
	fn logical_shift(&mut self, x: Term, info: BitVecInfo, shift: u32) -> Result<Term, ModelError> {
		debug!(width = info.width, shift, "bit-blast logical shift right");
		let (n, s) = (info.width as usize, shift as usize);
		let (result, rbits) = self.aux_decompose(info, None)?;

		// (x mod 2^n) - (x mod 2^s) == sum_{i < n-s} r_i * 2^(i+s)
		let high = sub_int([mod_int(&x, pow2(info.width))?, mod_int(&x, pow2(shift))?])?;
		let shifted = rbits[..n - s]
			.iter()
			.zip(shift..)
			.map(|(r, i)| times_int([Term::from(r), Term::from(pow2(i))]))
			.collect::<Result<Vec<_>, _>>()?;
		let mut constraints = vec![high.eq(add_int(shifted)?)];
		constraints.extend(rbits[n - s..].iter().map(|r| Term::from(r).eq(0)));
		self.add_constraints(constraints)?;
		Ok(result)
	}

	/// Shift the bits of `x` to the left by the literal `amount`, filling the
	/// vacated bits with zeros and discarding the bits shifted out.
	pub fn shift_left(
		&mut self,
		x: impl Into<Term>,
		amount: impl Into<Term>,
	) -> Result<Term, ModelError> {
		let x = x.into();
		let (info, shift) = shift_operands(&x, &amount.into())?;
		debug!(width = info.width, shift, "bit-blast shift left");
		if info.signed {
			let s = shift as usize;
			let (_, xbits) = self.aux_decompose(info, Some(&x))?;
			let (result, rbits) = self.aux_decompose(info, None)?;
			let constraints = rbits
				.iter()
				.enumerate()
				.map(|(i, r)| {
					if i < s {
						Term::from(r).eq(0)
					} else {
						Term::from(r).eq(&xbits[i - s])
					}
				})
				.collect::<Vec<_>>();
			self.add_constraints(constraints)?;
			Ok(result)
		} else {
			let result = self.aux_bit_vec(info);
			let shifted = mod_int(times_int([x, Term::from(pow2(shift))])?, pow2(info.width))?;
			self.add_constraint(shifted.eq(&result))?;
			Ok(Term::from(result))
		}
	}

	/// Shift the bits of `x` to the right by the literal `amount`.
	///
	/// Signed vectors are shifted arithmetically, unsigned vectors logically.
	pub fn shift_right(
		&mut self,
		x: impl Into<Term>,
		amount: impl Into<Term>,
	) -> Result<Term, ModelError> {
		self.arithmetic_shift_right(x, amount)
	}
}

/// Validate a bit-vector width.
fn checked_info(width: u32, signed: bool) -> Result<BitVecInfo, ModelError> {
	if !(1..=MAX_BIT_WIDTH).contains(&width) {
		return Err(ModelError::InvalidBitWidth {
			width,
			max: MAX_BIT_WIDTH,
		});
	}
	Ok(BitVecInfo { width, signed })
}

/// Validate the operands of a shift, returning the metadata of the shifted
/// vector and the shift amount.
fn shift_operands(x: &Term, amount: &Term) -> Result<(BitVecInfo, u32), ModelError> {
	let info = x.bitvec().ok_or(ModelError::NotBitVector)?;
	let amount = amount
		.as_constant()
		.ok_or(ModelError::NonLiteralShiftAmount)?;
	if amount < 1 || amount >= IntVal::from(info.width) {
		return Err(ModelError::InvalidShiftAmount {
			amount,
			width: info.width,
		});
	}
	Ok((info, amount as u32))
}
