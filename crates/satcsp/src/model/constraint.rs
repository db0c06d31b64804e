//! Boolean-valued expressions and the Boolean variables they are built from.

use std::{
	cmp::Ordering,
	collections::BTreeSet,
	fmt::{self, Display},
	hash::{Hash, Hasher},
	ops::Not,
	rc::Rc,
};

use itertools::Itertools;

use crate::{
	model::term::{IntVar, Term, TermKind},
	solution::Valuation,
};

#[derive(Clone, Debug)]
/// A named Boolean decision variable.
///
/// Like [`IntVar`], Boolean variables are identified by their name.
pub struct BoolVar {
	/// Unique name of the variable.
	name: Rc<str>,
	/// Whether the variable was introduced by the library itself.
	auxiliary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// A Boolean expression over [`BoolVar`]s and integer [`Term`]s.
///
/// Constraints are immutable and can be cloned cheaply.
pub struct Constraint(Rc<ConstraintKind>);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The operator of a [`Constraint`] node, together with its operands.
pub enum ConstraintKind {
	/// All (non-empty) operands take pairwise distinct values.
	AllDifferent(Vec<Term>),
	/// Conjunction, the empty conjunction is `true`.
	And(Vec<Constraint>),
	/// Boolean constant.
	Const(bool),
	/// Equality of two terms.
	Eq(Term, Term),
	/// The first term is greater than or equal to the second.
	Ge(Term, Term),
	/// The first term is greater than the second.
	Gt(Term, Term),
	/// Both operands have the same truth value.
	Iff(Constraint, Constraint),
	/// The first operand implies the second.
	Imp(Constraint, Constraint),
	/// The first term is less than or equal to the second.
	Le(Term, Term),
	/// The first term is less than the second.
	Lt(Term, Term),
	/// Disequality of two terms.
	Ne(Term, Term),
	/// Negation.
	Not(Constraint),
	/// Disjunction, the empty disjunction is `false`.
	Or(Vec<Constraint>),
	/// Reference to a Boolean variable.
	Var(BoolVar),
	/// Exactly one of the operands holds.
	Xor(Constraint, Constraint),
}

impl BoolVar {
	/// Create a reference to the Boolean variable with the given name.
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		Self {
			name: name.into(),
			auxiliary: false,
		}
	}

	/// Whether the variable was introduced by the library instead of by the
	/// user.
	pub fn is_auxiliary(&self) -> bool {
		self.auxiliary
	}

	/// Name of the variable.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Mark whether the variable is auxiliary.
	pub(crate) fn with_auxiliary(mut self, auxiliary: bool) -> Self {
		self.auxiliary = auxiliary;
		self
	}
}

impl Display for BoolVar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl Eq for BoolVar {}

impl Hash for BoolVar {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl Not for &BoolVar {
	type Output = Constraint;

	fn not(self) -> Self::Output {
		!Constraint::from(self)
	}
}

impl Ord for BoolVar {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name.cmp(&other.name)
	}
}

impl PartialEq for BoolVar {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl PartialOrd for BoolVar {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Constraint {
	/// Create the conjunction of the given constraints.
	pub fn and<Iter>(constraints: Iter) -> Self
	where
		Iter: IntoIterator,
		Iter::Item: Into<Constraint>,
	{
		Self::new(ConstraintKind::And(constraints.into_iter().map_into().collect()))
	}

	/// Add all variables occurring in the constraint to the given sets.
	pub(crate) fn collect_vars(&self, ints: &mut BTreeSet<IntVar>, bools: &mut BTreeSet<BoolVar>) {
		match self.kind() {
			ConstraintKind::AllDifferent(xs) => {
				for x in xs {
					x.collect_vars(ints, bools);
				}
			}
			ConstraintKind::And(cs) | ConstraintKind::Or(cs) => {
				for c in cs {
					c.collect_vars(ints, bools);
				}
			}
			ConstraintKind::Const(_) => {}
			ConstraintKind::Eq(x, y)
			| ConstraintKind::Ge(x, y)
			| ConstraintKind::Gt(x, y)
			| ConstraintKind::Le(x, y)
			| ConstraintKind::Lt(x, y)
			| ConstraintKind::Ne(x, y) => {
				x.collect_vars(ints, bools);
				y.collect_vars(ints, bools);
			}
			ConstraintKind::Iff(a, b) | ConstraintKind::Imp(a, b) | ConstraintKind::Xor(a, b) => {
				a.collect_vars(ints, bools);
				b.collect_vars(ints, bools);
			}
			ConstraintKind::Not(c) => c.collect_vars(ints, bools),
			ConstraintKind::Var(p) => {
				let _ = bools.insert(p.clone());
			}
		}
	}

	/// The set of Boolean variables occurring in the constraint.
	pub fn bool_vars(&self) -> BTreeSet<BoolVar> {
		let mut ints = BTreeSet::new();
		let mut bools = BTreeSet::new();
		self.collect_vars(&mut ints, &mut bools);
		bools
	}

	/// Create the constraint that `lhs` and `rhs` have the same truth value.
	pub fn iff(lhs: impl Into<Constraint>, rhs: impl Into<Constraint>) -> Self {
		Self::new(ConstraintKind::Iff(lhs.into(), rhs.into()))
	}

	/// Create the constraint that `antecedent` implies `consequent`.
	pub fn implies(antecedent: impl Into<Constraint>, consequent: impl Into<Constraint>) -> Self {
		Self::new(ConstraintKind::Imp(antecedent.into(), consequent.into()))
	}

	/// The set of integer variables occurring in the constraint.
	pub fn int_vars(&self) -> BTreeSet<IntVar> {
		let mut ints = BTreeSet::new();
		let mut bools = BTreeSet::new();
		self.collect_vars(&mut ints, &mut bools);
		ints
	}

	/// The operator and operands of the constraint.
	pub fn kind(&self) -> &ConstraintKind {
		&self.0
	}

	/// Wrap a constraint node.
	pub(crate) fn new(kind: ConstraintKind) -> Self {
		Self(Rc::new(kind))
	}

	/// Create the disjunction of the given constraints.
	pub fn or<Iter>(constraints: Iter) -> Self
	where
		Iter: IntoIterator,
		Iter::Item: Into<Constraint>,
	{
		Self::new(ConstraintKind::Or(constraints.into_iter().map_into().collect()))
	}

	/// Create a binary relation between two terms.
	pub(crate) fn relation(kind: fn(Term, Term) -> ConstraintKind, lhs: Term, rhs: Term) -> Self {
		Self::new(kind(lhs, rhs))
	}

	/// The integer term that is `1` when the constraint holds, and `0`
	/// otherwise.
	pub fn to_int(&self) -> Term {
		Term::new(TermKind::If(self.clone(), 1.into(), 0.into()), None)
	}

	/// Evaluate the constraint under the given assignment.
	///
	/// Returns `None` when the truth value depends on an unassigned variable or
	/// an undefined term (e.g., division by zero).
	pub fn value<V: Valuation + ?Sized>(&self, valuation: &V) -> Option<bool> {
		match self.kind() {
			ConstraintKind::AllDifferent(xs) => Some(
				xs.iter()
					.map(|x| x.value(valuation))
					.collect::<Option<Vec<_>>>()?
					.into_iter()
					.all_unique(),
			),
			ConstraintKind::And(cs) => {
				for c in cs {
					if !c.value(valuation)? {
						return Some(false);
					}
				}
				Some(true)
			}
			ConstraintKind::Const(b) => Some(*b),
			ConstraintKind::Eq(x, y) => Some(x.value(valuation)? == y.value(valuation)?),
			ConstraintKind::Ge(x, y) => Some(x.value(valuation)? >= y.value(valuation)?),
			ConstraintKind::Gt(x, y) => Some(x.value(valuation)? > y.value(valuation)?),
			ConstraintKind::Iff(a, b) => Some(a.value(valuation)? == b.value(valuation)?),
			ConstraintKind::Imp(a, b) => Some(!a.value(valuation)? || b.value(valuation)?),
			ConstraintKind::Le(x, y) => Some(x.value(valuation)? <= y.value(valuation)?),
			ConstraintKind::Lt(x, y) => Some(x.value(valuation)? < y.value(valuation)?),
			ConstraintKind::Ne(x, y) => Some(x.value(valuation)? != y.value(valuation)?),
			ConstraintKind::Not(c) => Some(!c.value(valuation)?),
			ConstraintKind::Or(cs) => {
				for c in cs {
					if c.value(valuation)? {
						return Some(true);
					}
				}
				Some(false)
			}
			ConstraintKind::Var(p) => valuation.bool_value(p),
			ConstraintKind::Xor(a, b) => Some(a.value(valuation)? != b.value(valuation)?),
		}
	}

	/// Create the constraint that exactly one of `lhs` and `rhs` holds.
	pub fn xor(lhs: impl Into<Constraint>, rhs: impl Into<Constraint>) -> Self {
		Self::new(ConstraintKind::Xor(lhs.into(), rhs.into()))
	}
}

impl Display for Constraint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (name, x, y) = match self.kind() {
			ConstraintKind::AllDifferent(xs) => {
				return write!(f, "Alldifferent({})", xs.iter().format(","))
			}
			ConstraintKind::And(cs) => return write!(f, "And({})", cs.iter().format(",")),
			ConstraintKind::Const(true) => return f.write_str("True"),
			ConstraintKind::Const(false) => return f.write_str("False"),
			ConstraintKind::Eq(x, y) => ("Eq", x, y),
			ConstraintKind::Ge(x, y) => ("Ge", x, y),
			ConstraintKind::Gt(x, y) => ("Gt", x, y),
			ConstraintKind::Iff(a, b) => return write!(f, "Iff({a},{b})"),
			ConstraintKind::Imp(a, b) => return write!(f, "Imp({a},{b})"),
			ConstraintKind::Le(x, y) => ("Le", x, y),
			ConstraintKind::Lt(x, y) => ("Lt", x, y),
			ConstraintKind::Ne(x, y) => ("Ne", x, y),
			ConstraintKind::Not(c) => return write!(f, "Not({c})"),
			ConstraintKind::Or(cs) => return write!(f, "Or({})", cs.iter().format(",")),
			ConstraintKind::Var(p) => return write!(f, "{p}"),
			ConstraintKind::Xor(a, b) => return write!(f, "Xor({a},{b})"),
		};
		write!(f, "{name}({x},{y})")
	}
}

impl From<&BoolVar> for Constraint {
	fn from(var: &BoolVar) -> Self {
		var.clone().into()
	}
}

impl From<&Constraint> for Constraint {
	fn from(constraint: &Constraint) -> Self {
		constraint.clone()
	}
}

impl From<bool> for Constraint {
	fn from(value: bool) -> Self {
		Self::new(ConstraintKind::Const(value))
	}
}

impl From<BoolVar> for Constraint {
	fn from(var: BoolVar) -> Self {
		Self::new(ConstraintKind::Var(var))
	}
}

impl Not for Constraint {
	type Output = Self;

	fn not(self) -> Self::Output {
		Self::new(ConstraintKind::Not(self))
	}
}

impl Not for BoolVar {
	type Output = Constraint;

	fn not(self) -> Self::Output {
		!Constraint::from(self)
	}
}
