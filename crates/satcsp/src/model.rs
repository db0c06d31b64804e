//! Module containing the central constraint model, the declarations of its
//! variables, and the staging of its constraints.

pub(crate) mod bitvec;
pub(crate) mod constraint;
pub(crate) mod domain;
pub(crate) mod term;

use std::{
	collections::{BTreeSet, HashMap},
	fmt::{self, Display},
	io,
	rc::Rc,
};

use itertools::Itertools;
use thiserror::Error;
use tracing::trace;

use crate::{
	model::{
		constraint::{BoolVar, Constraint},
		domain::Domain,
		term::{BitVecInfo, IntVar, Term},
	},
	solution::Solution,
	IntVal,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Direction of the objective of a [`Model`].
pub enum Goal {
	/// Search for the solution with the largest objective value.
	Maximize,
	/// Search for the solution with the smallest objective value.
	Minimize,
}

#[derive(Clone, Debug, Default)]
/// A constraint satisfaction (or optimization) problem over integer and
/// Boolean variables.
///
/// Constraints added to the model are staged until [`Model::commit`] is
/// called. Staged items can be retracted using [`Model::cancel`], which allows
/// a backend to encode only the items added since the last commit.
pub struct Model {
	/// Declared integer variables in declaration order.
	int_vars: Vec<IntVarDef>,
	/// Declared Boolean variables in declaration order.
	bool_vars: Vec<BoolVar>,
	/// Constraints in the order they were added.
	constraints: Vec<Constraint>,
	/// Position of each integer variable in `int_vars`, by name.
	int_index: HashMap<Rc<str>, usize>,
	/// Position of each Boolean variable in `bool_vars`, by name.
	bool_index: HashMap<Rc<str>, usize>,
	/// The optimization objective, if any.
	objective: Option<Objective>,
	/// Lengths of the item lists at the last commit.
	checkpoint: ModelSize,
	/// Counter used to generate fresh variable names.
	fresh: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Error type used when constructing terms, constraints, or variables.
pub enum ModelError {
	#[error("a variable named `{name}` is already declared")]
	/// Error used when the bits of a bit-vector would reuse the name of an
	/// existing variable.
	DuplicateVariable {
		/// Name of the existing variable.
		name: String,
	},
	#[error("a variable domain must contain at least one value")]
	/// Error used when a domain is created without any values.
	EmptyDomain,
	#[error("`{operator}` requires at least one operand, but {found} were given")]
	/// Error used when an operator is given an unsupported number of operands.
	InvalidArity {
		/// Name of the operator.
		operator: &'static str,
		/// Number of operands given.
		found: usize,
	},
	#[error("bit-vectors must have between 1 and {max} bits, but {width} were requested")]
	/// Error used when a bit-vector width is out of range.
	InvalidBitWidth {
		/// The requested width.
		width: u32,
		/// The largest supported width.
		max: u32,
	},
	#[error("cannot shift a {width}-bit vector by {amount} positions")]
	/// Error used when a shift amount is not in `1..width`.
	InvalidShiftAmount {
		/// The requested shift amount.
		amount: IntVal,
		/// Width of the shifted vector.
		width: u32,
	},
	#[error("mismatched bit-vector operands: expected {expected}, found {found}")]
	/// Error used when bit-vector operands disagree on width or signedness.
	MismatchedBitVector {
		/// Metadata of the first bit-vector operand.
		expected: BitVecInfo,
		/// Metadata of the conflicting operand.
		found: BitVecInfo,
	},
	#[error("shift amounts must be integer literals")]
	/// Error used when a shift amount is not an integer literal.
	NonLiteralShiftAmount,
	#[error("bitwise operations require at least one bit-vector operand")]
	/// Error used when no operand of a bitwise operation is a bit-vector.
	NotBitVector,
	#[error("constraint uses undeclared variables (integer: {ints:?}, Boolean: {bools:?})")]
	/// Error used when a constraint refers to variables that have not been
	/// declared in the model.
	UndeclaredVariable {
		/// Names of the undeclared integer variables.
		ints: Vec<String>,
		/// Names of the undeclared Boolean variables.
		bools: Vec<String>,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// The number of items in a [`Model`], used to mark and restore its state.
pub struct ModelSize {
	/// Number of declared integer variables.
	pub int_vars: usize,
	/// Number of declared Boolean variables.
	pub bool_vars: usize,
	/// Number of constraints.
	pub constraints: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A declared integer variable together with its domain.
pub struct IntVarDef {
	/// The declared variable.
	var: IntVar,
	/// The values the variable may take.
	domain: Domain,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The optimization objective of a [`Model`].
pub struct Objective {
	/// The term to optimize.
	term: Term,
	/// Whether to minimize or maximize `term`.
	goal: Goal,
}

impl IntVarDef {
	/// The values the variable may take.
	pub fn domain(&self) -> &Domain {
		&self.domain
	}

	/// The declared variable.
	pub fn var(&self) -> &IntVar {
		&self.var
	}
}

impl Model {
	/// Add a constraint to the model.
	///
	/// Returns [`ModelError::UndeclaredVariable`] (and leaves the model
	/// unchanged) when the constraint refers to a variable that has not been
	/// declared.
	pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ModelError> {
		self.add_constraints([constraint])
	}

	/// Add a collection of constraints to the model.
	///
	/// Either all constraints are added, or (when any of them refers to an
	/// undeclared variable) none of them are.
	pub fn add_constraints<Iter>(&mut self, constraints: Iter) -> Result<(), ModelError>
	where
		Iter: IntoIterator<Item = Constraint>,
	{
		let constraints = constraints.into_iter().collect_vec();
		let mut ints = BTreeSet::new();
		let mut bools = BTreeSet::new();
		for c in &constraints {
			c.collect_vars(&mut ints, &mut bools);
		}
		let ints = ints
			.iter()
			.filter(|v| !self.int_index.contains_key(v.name()))
			.map(|v| v.name().to_owned())
			.collect_vec();
		let bools = bools
			.iter()
			.filter(|v| !self.bool_index.contains_key(v.name()))
			.map(|v| v.name().to_owned())
			.collect_vec();
		if !ints.is_empty() || !bools.is_empty() {
			return Err(ModelError::UndeclaredVariable { ints, bools });
		}
		self.constraints.extend(constraints);
		Ok(())
	}

	/// Declare an integer variable that is named `{name}` and that can take the
	/// values `{0, 1}`.
	pub fn bit_var(&mut self, name: &str) -> IntVar {
		self.int_var(name, Domain::boolean())
	}

	/// Declare `len` bit variables named `{prefix}_1` to `{prefix}_{len}`.
	pub fn bit_var_list(&mut self, prefix: &str, len: usize) -> Vec<IntVar> {
		(1..=len)
			.map(|i| self.bit_var(&format!("{prefix}_{i}")))
			.collect()
	}

	/// Declare a Boolean variable with the given name.
	///
	/// If a Boolean variable with the same name was already declared, then the
	/// existing variable is returned.
	pub fn bool_var(&mut self, name: &str) -> BoolVar {
		self.declare_bool(BoolVar::new(name))
	}

	/// Declare `len` Boolean variables named `{prefix}_1` to `{prefix}_{len}`.
	pub fn bool_var_list(&mut self, prefix: &str, len: usize) -> Vec<BoolVar> {
		(1..=len)
			.map(|i| self.bool_var(&format!("{prefix}_{i}")))
			.collect()
	}

	/// Declared Boolean variables, in declaration order.
	pub fn bool_vars(&self) -> &[BoolVar] {
		&self.bool_vars
	}

	/// Boolean variables declared since the last commit.
	pub fn bool_vars_since_commit(&self) -> &[BoolVar] {
		&self.bool_vars[self.checkpoint.bool_vars.min(self.bool_vars.len())..]
	}

	/// Compute the bounds of the values a term can take in the model, based on
	/// the domains of its variables.
	///
	/// Returns `None` if the term refers to an undeclared variable or if the
	/// bounds do not fit in an [`IntVal`].
	pub fn bounds(&self, term: &Term) -> Option<(IntVal, IntVal)> {
		term.bounds(&|v: &IntVar| self.domain(v).map(Domain::bounds))
	}

	/// Retract all items added since the last commit.
	pub fn cancel(&mut self) {
		self.cancel_to(self.checkpoint);
	}

	/// Retract all items beyond the given sizes.
	///
	/// The commit checkpoint is lowered when it lies beyond the new sizes.
	pub fn cancel_to(&mut self, size: ModelSize) {
		let start = size.int_vars.min(self.int_vars.len());
		for def in self.int_vars.drain(start..) {
			let _ = self.int_index.remove(def.var.name());
		}
		let start = size.bool_vars.min(self.bool_vars.len());
		for var in self.bool_vars.drain(start..) {
			let _ = self.bool_index.remove(var.name());
		}
		self.constraints.truncate(size.constraints);
		self.checkpoint = ModelSize {
			int_vars: self.checkpoint.int_vars.min(self.int_vars.len()),
			bool_vars: self.checkpoint.bool_vars.min(self.bool_vars.len()),
			constraints: self.checkpoint.constraints.min(self.constraints.len()),
		};
		trace!(size = ?self.size(), "cancel model items");
	}

	/// The sizes recorded by the last commit.
	pub fn checkpoint(&self) -> ModelSize {
		self.checkpoint
	}

	/// Remove the optimization objective, making the model a satisfaction
	/// problem.
	pub fn clear_objective(&mut self) {
		self.objective = None;
	}

	/// Mark all items currently in the model as committed.
	pub fn commit(&mut self) {
		self.checkpoint = self.size();
	}

	/// Constraints of the model, in the order they were added.
	pub fn constraints(&self) -> &[Constraint] {
		&self.constraints
	}

	/// Constraints added since the last commit.
	pub fn constraints_since_commit(&self) -> &[Constraint] {
		&self.constraints[self.checkpoint.constraints.min(self.constraints.len())..]
	}

	/// Declare a Boolean variable.
	///
	/// Declaring a variable whose name is already used by a Boolean variable
	/// returns the existing variable.
	pub fn declare_bool(&mut self, var: BoolVar) -> BoolVar {
		if let Some(&i) = self.bool_index.get(var.name()) {
			return self.bool_vars[i].clone();
		}
		trace!(name = var.name(), "declare Boolean variable");
		let _ = self
			.bool_index
			.insert(Rc::from(var.name()), self.bool_vars.len());
		self.bool_vars.push(var.clone());
		var
	}

	/// Declare an integer variable with the given domain.
	///
	/// Declaring a variable whose name is already used by an integer variable
	/// returns the existing variable, the new domain is ignored.
	pub fn declare_int(&mut self, var: IntVar, domain: Domain) -> IntVar {
		if let Some(&i) = self.int_index.get(var.name()) {
			return self.int_vars[i].var.clone();
		}
		trace!(name = var.name(), domain = %domain, "declare integer variable");
		let _ = self
			.int_index
			.insert(Rc::from(var.name()), self.int_vars.len());
		self.int_vars.push(IntVarDef {
			var: var.clone(),
			domain,
		});
		var
	}

	/// The domain of a declared integer variable.
	pub fn domain(&self, var: &IntVar) -> Option<&Domain> {
		self.int_index
			.get(var.name())
			.map(|&i| &self.int_vars[i].domain)
	}

	/// Write the model in a human-readable line-based format.
	pub fn dump<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
		write!(out, "{self}")
	}

	/// Generate a name that is not used by any declared variable.
	pub(crate) fn fresh_name(&mut self, prefix: &str) -> String {
		loop {
			let name = format!("_{prefix}{}", self.fresh);
			self.fresh += 1;
			if !self.is_declared(&name) {
				return name;
			}
		}
	}

	/// Whether an integer or Boolean variable named `name` has been declared.
	fn is_declared(&self, name: &str) -> bool {
		self.int_index.contains_key(name) || self.bool_index.contains_key(name)
	}

	/// Declare an integer variable with the given name and domain.
	pub fn int_var(&mut self, name: &str, domain: Domain) -> IntVar {
		self.declare_int(IntVar::new(name), domain)
	}

	/// Declare `len` integer variables named `{prefix}_0` to
	/// `{prefix}_{len - 1}`, all with the same domain.
	pub fn int_var_list(&mut self, prefix: &str, len: usize, domain: &Domain) -> Vec<IntVar> {
		(0..len)
			.map(|i| self.int_var(&format!("{prefix}_{i}"), domain.clone()))
			.collect()
	}

	/// Declared integer variables, in declaration order.
	pub fn int_vars(&self) -> &[IntVarDef] {
		&self.int_vars
	}

	/// Integer variables declared since the last commit.
	pub fn int_vars_since_commit(&self) -> &[IntVarDef] {
		&self.int_vars[self.checkpoint.int_vars.min(self.int_vars.len())..]
	}

	/// Whether the objective of the model is to be maximized.
	pub fn is_maximize(&self) -> bool {
		matches!(self.objective, Some(Objective { goal: Goal::Maximize, .. }))
	}

	/// Whether the objective of the model is to be minimized.
	pub fn is_minimize(&self) -> bool {
		matches!(self.objective, Some(Objective { goal: Goal::Minimize, .. }))
	}

	/// Set the objective of the model to maximize the value of `term`.
	pub fn maximize<T: Into<Term>>(&mut self, term: T) {
		self.objective = Some(Objective {
			term: term.into(),
			goal: Goal::Maximize,
		});
	}

	/// Set the objective of the model to minimize the value of `term`.
	pub fn minimize<T: Into<Term>>(&mut self, term: T) {
		self.objective = Some(Objective {
			term: term.into(),
			goal: Goal::Minimize,
		});
	}

	/// Declare a fresh auxiliary bit variable.
	pub fn new_bit_var(&mut self) -> IntVar {
		let name = self.fresh_name("BI");
		self.declare_int(IntVar::new(name).with_auxiliary(true), Domain::boolean())
	}

	/// Declare a fresh auxiliary Boolean variable.
	pub fn new_bool_var(&mut self) -> BoolVar {
		let name = self.fresh_name("B");
		self.declare_bool(BoolVar::new(name).with_auxiliary(true))
	}

	/// Declare a fresh auxiliary integer variable with the given domain.
	pub fn new_int_var(&mut self, domain: Domain) -> IntVar {
		let name = self.fresh_name("I");
		self.declare_int(IntVar::new(name).with_auxiliary(true), domain)
	}

	/// The optimization objective of the model, if any.
	pub fn objective(&self) -> Option<&Objective> {
		self.objective.as_ref()
	}

	/// Whether the solution assigns every declared integer variable a value
	/// from its domain, and satisfies every constraint of the model.
	pub fn satisfied_by(&self, solution: &Solution) -> bool {
		self.int_vars.iter().all(|def| {
			solution
				.int_value(&def.var)
				.is_some_and(|v| def.domain.contains(v))
		}) && self
			.constraints
			.iter()
			.all(|c| solution.check(c) == Some(true))
	}

	/// The current number of items in the model.
	pub fn size(&self) -> ModelSize {
		ModelSize {
			int_vars: self.int_vars.len(),
			bool_vars: self.bool_vars.len(),
			constraints: self.constraints.len(),
		}
	}
}

impl Display for Model {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for def in &self.int_vars {
			match def.domain.as_interval() {
				Some((lo, hi)) => writeln!(f, "int({},{lo},{hi})", def.var)?,
				None => writeln!(f, "int({},{{{}}})", def.var, def.domain.values().join(","))?,
			}
		}
		for var in &self.bool_vars {
			writeln!(f, "bool({var})")?;
		}
		for c in &self.constraints {
			writeln!(f, "{c}")?;
		}
		if let Some(obj) = &self.objective {
			let goal = match obj.goal {
				Goal::Maximize => "maximize",
				Goal::Minimize => "minimize",
			};
			writeln!(f, "{goal}({})", obj.term)?;
		}
		Ok(())
	}
}

impl Objective {
	/// Whether the objective is minimized or maximized.
	pub fn goal(&self) -> Goal {
		self.goal
	}

	/// The optimized term.
	pub fn term(&self) -> &Term {
		&self.term
	}
}

#[cfg(test)]
mod tests {
	use expect_test::expect;
	use tracing_test::traced_test;

	use crate::{
		add_int, BoolVar, Constraint, Domain, IntVar, Model, ModelError, ModelSize, Solution,
		Term,
	};

	#[test]
	fn test_model_dump() {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let s = model.int_var("s", Domain::from_values([5, 1, 3]).unwrap());
		let p = model.bool_var("p");
		model
			.add_constraints([
				add_int([&a, &s]).unwrap().eq(3),
				Constraint::implies(&p, Term::from(&a).ne(0)),
			])
			.unwrap();
		model.minimize(&a);
		expect![[r#"
    int(a,0,4)
    int(s,{1,3,5})
    bool(p)
    Eq(Add(a,s),3)
    Imp(p,Ne(a,0))
    minimize(a)
    "#]]
		.assert_eq(&model.to_string());
		assert!(model.is_minimize());
		model.maximize(add_int([&a, &s]).unwrap());
		assert!(model.is_maximize());
		model.clear_objective();
		assert!(model.objective().is_none());
	}

	#[test]
	fn test_declare_idempotent() {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let again = model.int_var("a", Domain::from_bounds(7, 9).unwrap());
		assert_eq!(a, again);
		assert_eq!(model.size().int_vars, 1);
		assert_eq!(model.domain(&a), Some(&Domain::from_bounds(0, 4).unwrap()));

		let _ = model.bool_var("p");
		let _ = model.bool_var("p");
		assert_eq!(model.size().bool_vars, 1);
	}

	#[test]
	fn test_fresh_names() {
		let mut model = Model::default();
		let _ = model.int_var("_I0", Domain::boolean());
		let x = model.new_int_var(Domain::boolean());
		let p = model.new_bool_var();
		let b = model.new_bit_var();
		assert_eq!(x.name(), "_I1");
		assert!(x.is_auxiliary());
		assert_eq!(p.name(), "_B2");
		assert_eq!(b.name(), "_BI3");
		assert_eq!(model.domain(&b), Some(&Domain::boolean()));

		let xs = model.int_var_list("x", 3, &Domain::from_bounds(1, 2).unwrap());
		let ps = model.bool_var_list("p", 2);
		let bs = model.bit_var_list("b", 2);
		assert_eq!(
			xs.iter().map(IntVar::name).collect::<Vec<_>>(),
			vec!["x_0", "x_1", "x_2"]
		);
		assert_eq!(ps[1].name(), "p_2");
		assert_eq!(bs[0].name(), "b_1");
	}

	#[test]
	#[traced_test]
	fn test_undeclared_variable() {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let before = model.size();
		let err = model
			.add_constraints([
				Term::from(&a).eq(1),
				add_int([&a, &IntVar::new("z")]).unwrap().eq(IntVar::new("y")),
				Constraint::from(BoolVar::new("q")),
			])
			.unwrap_err();
		assert_eq!(
			err,
			ModelError::UndeclaredVariable {
				ints: vec!["y".to_owned(), "z".to_owned()],
				bools: vec!["q".to_owned()],
			}
		);
		assert_eq!(model.size(), before);
		assert!(logs_contain("declare integer variable"));
	}

	#[test]
	fn test_commit_cancel() {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		model.add_constraint(Term::from(&a).ge(1)).unwrap();
		model.commit();
		let committed = model.size();
		assert_eq!(model.checkpoint(), committed);
		assert!(model.constraints_since_commit().is_empty());

		let b = model.int_var("b", Domain::from_bounds(0, 4).unwrap());
		model.add_constraint(Term::from(&b).ge(&a)).unwrap();
		assert_eq!(model.int_vars_since_commit().len(), 1);
		assert_eq!(model.constraints_since_commit().len(), 1);

		model.cancel();
		assert_eq!(model.size(), committed);
		assert_eq!(model.domain(&b), None);
		// Cancelling right after a commit keeps everything
		model.commit();
		model.cancel();
		assert_eq!(model.size(), committed);
		assert_eq!(model.checkpoint(), committed);
		assert_eq!(model.domain(&a), Some(&Domain::from_bounds(0, 4).unwrap()));
		// Cancelled names can be declared again
		let _ = model.int_var("b", Domain::from_bounds(2, 3).unwrap());
		assert_eq!(model.domain(&b), Some(&Domain::from_bounds(2, 3).unwrap()));

		model.cancel_to(ModelSize::default());
		assert_eq!(model.size(), ModelSize::default());
		assert_eq!(model.checkpoint(), ModelSize::default());
	}

	#[test]
	fn test_satisfied_by() {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let b = model.int_var("b", Domain::from_bounds(0, 4).unwrap());
		model
			.add_constraint(add_int([&a, &b]).unwrap().eq(3))
			.unwrap();
		assert!(model.satisfied_by(&Solution::new([(a.clone(), 1), (b.clone(), 2)], [])));
		assert!(!model.satisfied_by(&Solution::new([(a.clone(), 2), (b.clone(), 2)], [])));
		assert!(!model.satisfied_by(&Solution::new([(a.clone(), 5), (b.clone(), -2)], [])));
		assert!(!model.satisfied_by(&Solution::new([(a, 3)], [])));
		assert_eq!(
			model.bounds(&add_int([&b, &IntVar::new("a")]).unwrap()),
			Some((0, 8))
		);
	}
}
