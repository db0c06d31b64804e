//! Integer-valued expression trees and the integer variables they are built
//! from.

use std::{
	cmp::Ordering,
	collections::BTreeSet,
	fmt::{self, Display},
	hash::{Hash, Hasher},
	rc::Rc,
};

use itertools::Itertools;

use crate::{
	model::{
		constraint::{BoolVar, Constraint, ConstraintKind},
		ModelError,
	},
	solution::Valuation,
	IntVal,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Metadata marking an integer term as a fixed-width bit-vector.
pub struct BitVecInfo {
	/// Number of bits in the vector.
	pub width: u32,
	/// Whether the bits are interpreted as a two's complement number.
	pub signed: bool,
}

#[derive(Clone, Debug)]
/// A named integer decision variable.
///
/// Variables are identified by their name: two variables with the same name
/// are the same variable, even if they were created separately.
pub struct IntVar {
	/// Unique name of the variable.
	name: Rc<str>,
	/// Whether the variable was introduced by the library itself.
	auxiliary: bool,
	/// Bit-vector metadata, if the variable was declared as a bit-vector.
	bitvec: Option<BitVecInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// An integer expression over [`IntVar`]s, built using the functions in the
/// crate root (e.g., [`add_int`](crate::add_int)).
///
/// Terms are immutable and can be cloned cheaply.
pub struct Term {
	/// The operator and operands of the expression.
	kind: Rc<TermKind>,
	/// Bit-vector metadata derived from the operands.
	bitvec: Option<BitVecInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The operator of a [`Term`] node, together with its operands.
pub enum TermKind {
	/// Absolute value.
	Abs(Term),
	/// Sum of all operands, the empty sum is `0`.
	Add(Vec<Term>),
	/// Integer constant.
	Const(IntVal),
	/// Euclidean division, the result is undefined when the divisor is `0`.
	Div(Term, Term),
	/// The second operand if the condition holds, the third otherwise.
	If(Constraint, Term, Term),
	/// Maximum of the (non-empty) operands.
	Max(Vec<Term>),
	/// Minimum of the (non-empty) operands.
	Min(Vec<Term>),
	/// Euclidean remainder, always non-negative. Undefined when the divisor is
	/// `0`.
	Mod(Term, Term),
	/// Product of the (non-empty) operands.
	Mul(Vec<Term>),
	/// Negation.
	Neg(Term),
	/// The first operand minus all other operands, the empty difference is `0`.
	Sub(Vec<Term>),
	/// Reference to an integer variable.
	Var(IntVar),
}

impl BitVecInfo {
	/// Smallest value representable by the vector.
	pub fn min_value(&self) -> IntVal {
		if self.signed {
			-(1 << (self.width - 1))
		} else {
			0
		}
	}

	/// Largest value representable by the vector.
	pub fn max_value(&self) -> IntVal {
		if self.signed {
			(1 << (self.width - 1)) - 1
		} else {
			(1 << self.width) - 1
		}
	}
}

impl Display for BitVecInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sign = if self.signed { "signed" } else { "unsigned" };
		write!(f, "{}-bit {sign}", self.width)
	}
}

impl IntVar {
	/// Create a reference to the integer variable with the given name.
	///
	/// The variable must be declared in a [`Model`](crate::Model) before it
	/// can be used in its constraints.
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		Self {
			name: name.into(),
			auxiliary: false,
			bitvec: None,
		}
	}

	/// Bit-vector metadata of the variable, if any.
	pub fn bitvec(&self) -> Option<BitVecInfo> {
		self.bitvec
	}

	/// Whether the variable was introduced by the library (e.g., by the
	/// bit-vector encoder) instead of by the user.
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

	/// Attach bit-vector metadata to the variable.
	pub(crate) fn with_bitvec(mut self, info: BitVecInfo) -> Self {
		self.bitvec = Some(info);
		self
	}
}

impl Display for IntVar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

impl Eq for IntVar {}

impl Hash for IntVar {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.name.hash(state);
	}
}

impl Ord for IntVar {
	fn cmp(&self, other: &Self) -> Ordering {
		self.name.cmp(&other.name)
	}
}

impl PartialEq for IntVar {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

impl PartialOrd for IntVar {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Term {
	/// Create a term from its operator and the bit-vector metadata derived
	/// from its operands.
	pub(crate) fn new(kind: TermKind, bitvec: Option<BitVecInfo>) -> Self {
		Self {
			kind: Rc::new(kind),
			bitvec,
		}
	}

	/// Create a n-ary term, unifying the bit-vector metadata of the operands.
	pub(crate) fn nary(
		kind: fn(Vec<Term>) -> TermKind,
		operands: Vec<Term>,
	) -> Result<Self, ModelError> {
		let bitvec = unify_bitvec(&operands)?;
		Ok(Self::new(kind(operands), bitvec))
	}

	/// Create a binary term, unifying the bit-vector metadata of the operands.
	pub(crate) fn binary(
		kind: fn(Term, Term) -> TermKind,
		lhs: Term,
		rhs: Term,
	) -> Result<Self, ModelError> {
		let bitvec = unify_bitvec([&lhs, &rhs])?;
		Ok(Self::new(kind(lhs, rhs), bitvec))
	}

	/// The integer literal represented by the term, if it is a literal.
	pub fn as_constant(&self) -> Option<IntVal> {
		match *self.kind {
			TermKind::Const(v) => Some(v),
			_ => None,
		}
	}

	/// The variable referenced by the term, if it is a variable reference.
	pub fn as_var(&self) -> Option<&IntVar> {
		match &*self.kind {
			TermKind::Var(v) => Some(v),
			_ => None,
		}
	}

	/// Bit-vector metadata of the term, if any of its operands is a
	/// bit-vector.
	pub fn bitvec(&self) -> Option<BitVecInfo> {
		self.bitvec
	}

	/// Compute conservative bounds of the values the term can take, given the
	/// bounds of its variables.
	///
	/// Returns `None` when the bounds of a variable are unknown or when the
	/// computation overflows.
	pub(crate) fn bounds<F>(&self, var_bounds: &F) -> Option<(IntVal, IntVal)>
	where
		F: Fn(&IntVar) -> Option<(IntVal, IntVal)>,
	{
		match &*self.kind {
			TermKind::Abs(x) => {
				let (lo, hi) = x.bounds(var_bounds)?;
				if lo >= 0 {
					Some((lo, hi))
				} else if hi <= 0 {
					Some((hi.checked_neg()?, lo.checked_neg()?))
				} else {
					Some((0, hi.max(lo.checked_neg()?)))
				}
			}
			TermKind::Add(xs) => xs.iter().try_fold((0, 0), |(lo, hi): (IntVal, IntVal), x| {
				let (l, h) = x.bounds(var_bounds)?;
				Some((lo.checked_add(l)?, hi.checked_add(h)?))
			}),
			TermKind::Const(v) => Some((*v, *v)),
			TermKind::Div(x, _) => {
				// |x div y| <= |x| for any non-zero divisor
				let (lo, hi) = x.bounds(var_bounds)?;
				let m = lo.checked_abs()?.max(hi.checked_abs()?);
				Some((-m, m))
			}
			TermKind::If(_, t, e) => {
				let (tl, th) = t.bounds(var_bounds)?;
				let (el, eh) = e.bounds(var_bounds)?;
				Some((tl.min(el), th.max(eh)))
			}
			TermKind::Max(xs) => {
				let bounds: Vec<_> = xs.iter().map(|x| x.bounds(var_bounds)).collect::<Option<_>>()?;
				let lo = bounds.iter().map(|b| b.0).max()?;
				let hi = bounds.iter().map(|b| b.1).max()?;
				Some((lo, hi))
			}
			TermKind::Min(xs) => {
				let bounds: Vec<_> = xs.iter().map(|x| x.bounds(var_bounds)).collect::<Option<_>>()?;
				let lo = bounds.iter().map(|b| b.0).min()?;
				let hi = bounds.iter().map(|b| b.1).min()?;
				Some((lo, hi))
			}
			TermKind::Mod(_, y) => {
				let (lo, hi) = y.bounds(var_bounds)?;
				let m = lo.checked_abs()?.max(hi.checked_abs()?);
				Some((0, (m - 1).max(0)))
			}
			TermKind::Mul(xs) => xs.iter().try_fold((1, 1), |(lo, hi): (IntVal, IntVal), x| {
				let (l, h) = x.bounds(var_bounds)?;
				let corners = [
					lo.checked_mul(l)?,
					lo.checked_mul(h)?,
					hi.checked_mul(l)?,
					hi.checked_mul(h)?,
				];
				Some((*corners.iter().min()?, *corners.iter().max()?))
			}),
			TermKind::Neg(x) => {
				let (lo, hi) = x.bounds(var_bounds)?;
				Some((hi.checked_neg()?, lo.checked_neg()?))
			}
			TermKind::Sub(xs) => match xs.split_first() {
				None => Some((0, 0)),
				Some((first, rest)) => {
					let init = first.bounds(var_bounds)?;
					rest.iter().try_fold(init, |(lo, hi), x| {
						let (l, h) = x.bounds(var_bounds)?;
						Some((lo.checked_sub(h)?, hi.checked_sub(l)?))
					})
				}
			},
			TermKind::Var(v) => var_bounds(v),
		}
	}

	/// Add all variables occurring in the term to the given sets.
	pub(crate) fn collect_vars(&self, ints: &mut BTreeSet<IntVar>, bools: &mut BTreeSet<BoolVar>) {
		match &*self.kind {
			TermKind::Abs(x) | TermKind::Neg(x) => x.collect_vars(ints, bools),
			TermKind::Add(xs)
			| TermKind::Max(xs)
			| TermKind::Min(xs)
			| TermKind::Mul(xs)
			| TermKind::Sub(xs) => {
				for x in xs {
					x.collect_vars(ints, bools);
				}
			}
			TermKind::Const(_) => {}
			TermKind::Div(x, y) | TermKind::Mod(x, y) => {
				x.collect_vars(ints, bools);
				y.collect_vars(ints, bools);
			}
			TermKind::If(c, t, e) => {
				c.collect_vars(ints, bools);
				t.collect_vars(ints, bools);
				e.collect_vars(ints, bools);
			}
			TermKind::Var(v) => {
				let _ = ints.insert(v.clone());
			}
		}
	}

	/// The set of Boolean variables occurring in the term.
	pub fn bool_vars(&self) -> BTreeSet<BoolVar> {
		let mut ints = BTreeSet::new();
		let mut bools = BTreeSet::new();
		self.collect_vars(&mut ints, &mut bools);
		bools
	}

	/// The set of integer variables occurring in the term.
	pub fn int_vars(&self) -> BTreeSet<IntVar> {
		let mut ints = BTreeSet::new();
		let mut bools = BTreeSet::new();
		self.collect_vars(&mut ints, &mut bools);
		ints
	}

	/// The operator and operands of the term.
	pub fn kind(&self) -> &TermKind {
		&self.kind
	}

	/// Evaluate the term under the given assignment.
	///
	/// Returns `None` when a variable is unassigned, when dividing by zero, or
	/// when the result does not fit in an [`IntVal`].
	pub fn value<V: Valuation + ?Sized>(&self, valuation: &V) -> Option<IntVal> {
		match &*self.kind {
			TermKind::Abs(x) => x.value(valuation)?.checked_abs(),
			TermKind::Add(xs) => xs.iter().try_fold(0, |acc: IntVal, x| {
				acc.checked_add(x.value(valuation)?)
			}),
			TermKind::Const(v) => Some(*v),
			TermKind::Div(x, y) => x.value(valuation)?.checked_div_euclid(y.value(valuation)?),
			TermKind::If(c, t, e) => {
				if c.value(valuation)? {
					t.value(valuation)
				} else {
					e.value(valuation)
				}
			}
			TermKind::Max(xs) => xs
				.iter()
				.map(|x| x.value(valuation))
				.collect::<Option<Vec<_>>>()?
				.into_iter()
				.max(),
			TermKind::Min(xs) => xs
				.iter()
				.map(|x| x.value(valuation))
				.collect::<Option<Vec<_>>>()?
				.into_iter()
				.min(),
			TermKind::Mod(x, y) => x.value(valuation)?.checked_rem_euclid(y.value(valuation)?),
			TermKind::Mul(xs) => xs.iter().try_fold(1, |acc: IntVal, x| {
				acc.checked_mul(x.value(valuation)?)
			}),
			TermKind::Neg(x) => x.value(valuation)?.checked_neg(),
			TermKind::Sub(xs) => match xs.split_first() {
				None => Some(0),
				Some((first, rest)) => rest.iter().try_fold(first.value(valuation)?, |acc, x| {
					acc.checked_sub(x.value(valuation)?)
				}),
			},
			TermKind::Var(v) => valuation.int_value(v),
		}
	}

	/// Attach bit-vector metadata to the term.
	pub(crate) fn with_bitvec(mut self, info: BitVecInfo) -> Self {
		self.bitvec = Some(info);
		self
	}

	/// Create a constraint enforcing that the term is equal to `rhs`.
	pub fn eq(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Eq, self.clone(), rhs.into())
	}

	/// Create a constraint enforcing that the term is greater than or equal to
	/// `rhs`.
	pub fn ge(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Ge, self.clone(), rhs.into())
	}

	/// Create a constraint enforcing that the term is greater than `rhs`.
	pub fn gt(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Gt, self.clone(), rhs.into())
	}

	/// Create a constraint enforcing that the term is less than or equal to
	/// `rhs`.
	pub fn le(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Le, self.clone(), rhs.into())
	}

	/// Create a constraint enforcing that the term is less than `rhs`.
	pub fn lt(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Lt, self.clone(), rhs.into())
	}

	/// Create a constraint enforcing that the term is not equal to `rhs`.
	pub fn ne(&self, rhs: impl Into<Term>) -> Constraint {
		Constraint::relation(ConstraintKind::Ne, self.clone(), rhs.into())
	}
}

impl Display for Term {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (name, operands) = match &*self.kind {
			TermKind::Abs(x) => return write!(f, "Abs({x})"),
			TermKind::Add(xs) => ("Add", xs),
			TermKind::Const(v) => return write!(f, "{v}"),
			TermKind::Div(x, y) => return write!(f, "Div({x},{y})"),
			TermKind::If(c, t, e) => return write!(f, "If({c},{t},{e})"),
			TermKind::Max(xs) => ("Max", xs),
			TermKind::Min(xs) => ("Min", xs),
			TermKind::Mod(x, y) => return write!(f, "Mod({x},{y})"),
			TermKind::Mul(xs) => ("Mul", xs),
			TermKind::Neg(x) => return write!(f, "Neg({x})"),
			TermKind::Sub(xs) => ("Sub", xs),
			TermKind::Var(v) => return write!(f, "{v}"),
		};
		write!(f, "{name}({})", operands.iter().format(","))
	}
}

impl From<&IntVar> for Term {
	fn from(var: &IntVar) -> Self {
		var.clone().into()
	}
}

impl From<&Term> for Term {
	fn from(term: &Term) -> Self {
		term.clone()
	}
}

impl From<IntVal> for Term {
	fn from(value: IntVal) -> Self {
		Self::new(TermKind::Const(value), None)
	}
}

impl From<IntVar> for Term {
	fn from(var: IntVar) -> Self {
		let bitvec = var.bitvec;
		Self::new(TermKind::Var(var), bitvec)
	}
}

/// Determine the bit-vector metadata of a term with the given operands.
///
/// All bit-vector operands must agree on their width and signedness, operands
/// without metadata are ignored.
pub(crate) fn unify_bitvec<'a, Iter>(terms: Iter) -> Result<Option<BitVecInfo>, ModelError>
where
	Iter: IntoIterator<Item = &'a Term>,
{
	let mut result = None;
	for found in terms.into_iter().filter_map(Term::bitvec) {
		match result {
			None => result = Some(found),
			Some(expected) if expected != found => {
				return Err(ModelError::MismatchedBitVector { expected, found })
			}
			Some(_) => {}
		}
	}
	Ok(result)
}

#[cfg(test)]
mod tests {
	use expect_test::expect;

	use crate::{
		add_int, div_int, if_then_else, max_int, mod_int, neg_int, sub_int, times_int,
		BitVecInfo, BoolVar, IntVal, IntVar, ModelError, Solution, Term,
	};

	#[test]
	fn test_term_display() {
		let a = IntVar::new("a");
		let b = IntVar::new("b");
		let p = BoolVar::new("p");
		let t = add_int([
			Term::from(&a),
			times_int([Term::from(2), Term::from(&b)]).unwrap(),
			if_then_else(&p, neg_int(&a), Term::from(0)).unwrap(),
		])
		.unwrap();
		expect!["Add(a,Mul(2,b),If(p,Neg(a),0))"].assert_eq(&t.to_string());
		expect!["Add(a)"].assert_eq(&add_int([&a]).unwrap().to_string());
		expect!["Sub()"].assert_eq(&sub_int(Vec::<Term>::new()).unwrap().to_string());
	}

	#[test]
	fn test_term_value() {
		let a = IntVar::new("a");
		let b = IntVar::new("b");
		let sol = Solution::new([(a.clone(), 7), (b.clone(), -2)], []);
		assert_eq!(add_int([&a, &b]).unwrap().value(&sol), Some(5));
		assert_eq!(sub_int([&a, &b]).unwrap().value(&sol), Some(9));
		assert_eq!(add_int(Vec::<Term>::new()).unwrap().value(&sol), Some(0));
		assert_eq!(max_int([&a, &b]).unwrap().value(&sol), Some(7));
		assert_eq!(
			div_int(IntVar::new("missing"), &a).unwrap().value(&sol),
			None
		);
		assert_eq!(div_int(&a, 0).unwrap().value(&sol), None);
	}

	#[test]
	fn test_euclidean_division() {
		let sol = Solution::default();
		let mut rows = String::new();
		let cases: [(IntVal, IntVal); 4] = [(7, 2), (-7, 2), (7, -2), (-7, -2)];
		for (x, y) in cases {
			let q = div_int(x, y).unwrap().value(&sol).unwrap();
			let r = mod_int(x, y).unwrap().value(&sol).unwrap();
			assert_eq!(y * q + r, x);
			rows.push_str(&format!("{x} {y}: {q} {r}\n"));
		}
		expect![[r#"
    7 2: 3 1
    -7 2: -4 1
    7 -2: -3 1
    -7 -2: 4 1
    "#]]
		.assert_eq(&rows);
	}

	#[test]
	fn test_bitvec_unification() {
		let four = BitVecInfo {
			width: 4,
			signed: false,
		};
		let five = BitVecInfo {
			width: 5,
			signed: false,
		};
		let x = IntVar::new("x").with_bitvec(four);
		let y = IntVar::new("y").with_bitvec(five);
		let z = IntVar::new("z");

		let sum = add_int([&x, &z]).unwrap();
		assert_eq!(sum.bitvec(), Some(four));
		assert_eq!(add_int([&z, &z]).unwrap().bitvec(), None);
		assert_eq!(
			add_int([&x, &y]),
			Err(ModelError::MismatchedBitVector {
				expected: four,
				found: five
			})
		);
		assert_eq!(
			mod_int(&sum, IntVar::new("s").with_bitvec(BitVecInfo {
				width: 4,
				signed: true
			})),
			Err(ModelError::MismatchedBitVector {
				expected: four,
				found: BitVecInfo {
					width: 4,
					signed: true
				}
			})
		);
	}

	#[test]
	fn test_term_variables() {
		let a = IntVar::new("a");
		let b = IntVar::new("b");
		let p = BoolVar::new("p");
		let t = if_then_else(
			Term::from(&a).lt(&b),
			times_int([&b, &a]).unwrap(),
			Term::from(3),
		)
		.unwrap();
		assert_eq!(t.int_vars().into_iter().collect::<Vec<_>>(), vec![a.clone(), b]);
		assert!(t.bool_vars().is_empty());
		let t = if_then_else(&p, &a, &a).unwrap();
		assert_eq!(t.bool_vars().into_iter().collect::<Vec<_>>(), vec![p]);
	}

	#[test]
	fn test_term_bounds() {
		let a = IntVar::new("a");
		let b = IntVar::new("b");
		let dom = |v: &IntVar| -> Option<(IntVal, IntVal)> {
			match v.name() {
				"a" => Some((-2, 3)),
				"b" => Some((1, 4)),
				_ => None,
			}
		};
		assert_eq!(add_int([&a, &b]).unwrap().bounds(&dom), Some((-1, 7)));
		assert_eq!(sub_int([&a, &b]).unwrap().bounds(&dom), Some((-6, 2)));
		assert_eq!(times_int([&a, &b]).unwrap().bounds(&dom), Some((-8, 12)));
		assert_eq!(neg_int(&a).bounds(&dom), Some((-3, 2)));
		assert_eq!(mod_int(&a, &b).unwrap().bounds(&dom), Some((0, 3)));
		assert_eq!(add_int([&a, &IntVar::new("c")]).unwrap().bounds(&dom), None);
	}
}
