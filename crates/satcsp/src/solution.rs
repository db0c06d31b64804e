//! Assignments of values to the variables of a model, as found by a backend.

use std::{
	collections::BTreeMap,
	fmt::{self, Display},
};

use itertools::Itertools;

use crate::{
	helpers::bit_pattern,
	model::{
		constraint::{BoolVar, Constraint},
		term::{IntVar, Term},
	},
	Decision, IntVal,
};

/// Source of values for the variables of terms and constraints under
/// evaluation.
pub trait Valuation {
	/// The value assigned to an integer variable, if any.
	fn int_value(&self, var: &IntVar) -> Option<IntVal>;
	/// The value assigned to a Boolean variable, if any.
	fn bool_value(&self, var: &BoolVar) -> Option<bool>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// An assignment of values to variables.
///
/// A solution holds the values of all variables assigned by the backend,
/// including the auxiliary variables introduced by the bit-vector encoder, so
/// that any term of the model can be evaluated. The listing methods and the
/// [`Display`] implementation only show the variables declared by the user.
pub struct Solution {
	/// Values of the integer variables.
	ints: BTreeMap<IntVar, IntVal>,
	/// Values of the Boolean variables.
	bools: BTreeMap<BoolVar, bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(
	variant_size_differences,
	reason = "`bool` is smaller than all other variants"
)]
/// The value of a decision variable in a [`Solution`].
pub enum Value {
	/// Value of a Boolean variable.
	Bool(bool),
	/// Value of an integer variable.
	Int(IntVal),
}

impl Solution {
	/// The bits of a bit-vector term under this solution, least significant
	/// first.
	///
	/// Negative values of signed vectors are given in two's complement.
	/// Returns `None` if the term is not a bit-vector or cannot be evaluated.
	pub fn bit_values(&self, term: &Term) -> Option<Vec<bool>> {
		let info = term.bitvec()?;
		let pattern = bit_pattern(self.value(term)?, info.width);
		Some((0..info.width).map(|i| (pattern >> i) & 1 == 1).collect())
	}

	/// The value of a Boolean variable in the solution.
	pub fn bool_value(&self, var: &BoolVar) -> Option<bool> {
		self.bools.get(var).copied()
	}

	/// Iterate over the values of the Boolean variables declared by the user.
	pub fn bool_values(&self) -> impl Iterator<Item = (&BoolVar, bool)> + '_ {
		self.bools
			.iter()
			.filter(|(var, _)| !var.is_auxiliary())
			.map(|(var, &val)| (var, val))
	}

	/// Whether the constraint holds under the solution.
	///
	/// Returns `None` if the constraint cannot be evaluated.
	pub fn check(&self, constraint: &Constraint) -> Option<bool> {
		constraint.value(self)
	}

	/// The value of an integer variable in the solution.
	pub fn int_value(&self, var: &IntVar) -> Option<IntVal> {
		self.ints.get(var).copied()
	}

	/// Iterate over the values of the integer variables declared by the user.
	pub fn int_values(&self) -> impl Iterator<Item = (&IntVar, IntVal)> + '_ {
		self.ints
			.iter()
			.filter(|(var, _)| !var.is_auxiliary())
			.map(|(var, &val)| (var, val))
	}

	/// Create a solution from the values of integer and Boolean variables.
	pub fn new<I, B>(ints: I, bools: B) -> Self
	where
		I: IntoIterator<Item = (IntVar, IntVal)>,
		B: IntoIterator<Item = (BoolVar, bool)>,
	{
		Self {
			ints: ints.into_iter().collect(),
			bools: bools.into_iter().collect(),
		}
	}

	/// The value of a term under the solution.
	pub fn value(&self, term: &Term) -> Option<IntVal> {
		term.value(self)
	}

	/// Iterate over the values of all variables declared by the user: integer
	/// variables first, each group ordered by name.
	pub fn values(&self) -> impl Iterator<Item = (Decision, Value)> + '_ {
		self.int_values()
			.map(|(var, val)| (Decision::Int(var.clone()), Value::Int(val)))
			.chain(
				self.bool_values()
					.map(|(var, val)| (Decision::Bool(var.clone()), Value::Bool(val))),
			)
	}
}

impl Display for Solution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{}",
			self.values()
				.format_with(", ", |(var, val), f| f(&format_args!("{var}={val}")))
		)
	}
}

impl Valuation for Solution {
	fn int_value(&self, var: &IntVar) -> Option<IntVal> {
		Solution::int_value(self, var)
	}

	fn bool_value(&self, var: &BoolVar) -> Option<bool> {
		Solution::bool_value(self, var)
	}
}

impl Value {
	/// Returns the value as a Boolean, if it is one.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Returns the value as an integer, if it is one.
	pub fn as_int(&self) -> Option<IntVal> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Bool(b) => write!(f, "{b}"),
			Value::Int(i) => write!(f, "{i}"),
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<IntVal> for Value {
	fn from(value: IntVal) -> Self {
		Self::Int(value)
	}
}
