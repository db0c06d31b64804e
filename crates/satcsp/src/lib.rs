//! # satcsp - Integer and Boolean Constraint Models with Bit-Vector Reasoning
//!
//! This crate is used to describe constraint satisfaction and optimization
//! problems over finite-domain integer variables and Boolean variables. A
//! [`Model`] holds variable declarations and constraints built from [`Term`]s
//! (integer expressions) and [`Constraint`]s (Boolean expressions). Bitwise
//! operations and shifts on fixed-width bit-vectors are supported by
//! decomposing ("bit-blasting") them into `{0, 1}` variables and linear
//! constraints.
//!
//! A [`Session`] drives a [`Backend`] to find a solution, to enumerate all
//! solutions, or to find an optimal solution using a binary search over the
//! objective value. The backend only needs to support incremental encoding of
//! the items added since the last commit. [`SearchBackend`] is a complete
//! depth-first search backend that is always available.

pub mod backend;
pub(crate) mod helpers;
pub mod model;
pub mod session;
pub mod solution;

use std::fmt::{self, Display};

use itertools::Itertools;
use rangelist::RangeList;

pub use crate::{
	backend::{
		search::{SearchBackend, SearchConfig, ValueOrder},
		Backend, BackendError, BackendStatistics,
	},
	model::{
		constraint::{BoolVar, Constraint, ConstraintKind},
		domain::Domain,
		term::{BitVecInfo, IntVar, Term, TermKind},
		Goal, IntVarDef, Model, ModelError, ModelSize, Objective,
	},
	session::{DumpFormat, Session, SolveError, SolveResult},
	solution::{Solution, Valuation, Value},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Reference to a decision variable in a [`Model`].
pub enum Decision {
	/// Reference to a Boolean variable.
	Bool(BoolVar),
	/// Reference to an integer variable.
	Int(IntVar),
}

/// Type alias for the type used to represent integer values.
pub type IntVal = i64;

/// Type alias for a set of integers parameter value.
pub type IntSetVal = RangeList<IntVal>;

/// Create a term for the absolute value of `x`.
pub fn abs_int(x: impl Into<Term>) -> Term {
	let x = x.into();
	let bitvec = x.bitvec();
	Term::new(TermKind::Abs(x), bitvec)
}

/// Create a term for the sum of the given terms.
///
/// The sum of no terms is `0`.
pub fn add_int<Iter>(terms: Iter) -> Result<Term, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	Term::nary(TermKind::Add, terms.into_iter().map_into().collect())
}

/// Create a constraint that enforces that all given terms take different
/// values.
pub fn all_different_int<Iter>(terms: Iter) -> Result<Constraint, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	let terms = non_empty("Alldifferent", terms.into_iter().map_into().collect())?;
	Ok(Constraint::new(ConstraintKind::AllDifferent(terms)))
}

/// Create a term for the Euclidean division of `x` by `y`.
///
/// The quotient `q` and remainder `r` (see [`mod_int`]) of the division
/// satisfy `x = y * q + r` and `0 <= r < |y|`.
pub fn div_int(x: impl Into<Term>, y: impl Into<Term>) -> Result<Term, ModelError> {
	Term::binary(TermKind::Div, x.into(), y.into())
}

/// Create a term that takes the value of `then` when `cond` holds, and the
/// value of `els` otherwise.
pub fn if_then_else(
	cond: impl Into<Constraint>,
	then: impl Into<Term>,
	els: impl Into<Term>,
) -> Result<Term, ModelError> {
	let (then, els) = (then.into(), els.into());
	let bitvec = model::term::unify_bitvec([&then, &els])?;
	Ok(Term::new(TermKind::If(cond.into(), then, els), bitvec))
}

/// Create a term for the maximum of the given (non-empty) terms.
pub fn max_int<Iter>(terms: Iter) -> Result<Term, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	let terms = non_empty("Max", terms.into_iter().map_into().collect())?;
	Term::nary(TermKind::Max, terms)
}

/// Create a term for the minimum of the given (non-empty) terms.
pub fn min_int<Iter>(terms: Iter) -> Result<Term, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	let terms = non_empty("Min", terms.into_iter().map_into().collect())?;
	Term::nary(TermKind::Min, terms)
}

/// Create a term for the Euclidean remainder of `x` divided by `y`.
pub fn mod_int(x: impl Into<Term>, y: impl Into<Term>) -> Result<Term, ModelError> {
	Term::binary(TermKind::Mod, x.into(), y.into())
}

/// Create a term for the negation of `x`.
pub fn neg_int(x: impl Into<Term>) -> Term {
	let x = x.into();
	let bitvec = x.bitvec();
	Term::new(TermKind::Neg(x), bitvec)
}

/// Return the given operands, or [`ModelError::InvalidArity`] if there are
/// none.
fn non_empty(operator: &'static str, terms: Vec<Term>) -> Result<Vec<Term>, ModelError> {
	if terms.is_empty() {
		return Err(ModelError::InvalidArity { operator, found: 0 });
	}
	Ok(terms)
}

/// Create a term for the first term minus all other terms.
///
/// The difference of no terms is `0`.
pub fn sub_int<Iter>(terms: Iter) -> Result<Term, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	Term::nary(TermKind::Sub, terms.into_iter().map_into().collect())
}

/// Create a term for the product of the given (non-empty) terms.
pub fn times_int<Iter>(terms: Iter) -> Result<Term, ModelError>
where
	Iter: IntoIterator,
	Iter::Item: Into<Term>,
{
	let terms = non_empty("Mul", terms.into_iter().map_into().collect())?;
	Term::nary(TermKind::Mul, terms)
}

impl Display for Decision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Decision::Bool(var) => write!(f, "{var}"),
			Decision::Int(var) => write!(f, "{var}"),
		}
	}
}

impl From<BoolVar> for Decision {
	fn from(var: BoolVar) -> Self {
		Self::Bool(var)
	}
}

impl From<IntVar> for Decision {
	fn from(var: IntVar) -> Self {
		Self::Int(var)
	}
}
