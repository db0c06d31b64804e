//! Driver that uses a [`Backend`] to solve a [`Model`]: finding a solution,
//! enumerating all solutions, or optimizing an objective.

use std::io;

use delegate::delegate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
	backend::{search::SearchBackend, Backend, BackendError, BackendStatistics},
	helpers::{midpoint_ceil, midpoint_floor},
	model::{
		constraint::{BoolVar, Constraint},
		domain::Domain,
		term::{IntVar, Term},
		Goal, Model, ModelError, ModelSize, Objective,
	},
	solution::Solution,
	IntVal,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Format used by [`Session::dump`].
pub enum DumpFormat {
	/// The compiled state of the backend.
	Compiled,
	/// The variable declarations, constraints, and objective of the model.
	Csp,
}

#[derive(Debug, Default)]
/// A solving session for a [`Model`], using a [`Backend`] to find solutions.
///
/// Consecutive calls to [`Session::solve`] on a model without objective
/// enumerate different solutions: after each solution, a constraint excluding
/// the values of the user variables of that solution is added to the model.
pub struct Session<B = SearchBackend> {
	/// The model being solved.
	model: Model,
	/// The backend used to find solutions.
	backend: B,
	/// The last solution found.
	solution: Option<Solution>,
	/// Whether the next call to solve continues an enumeration, and must thus
	/// exclude the last solution.
	enumerating: bool,
	/// Whether the backend holds an encoding of the committed model.
	encoded: bool,
	/// Statistics of the backend after the last search.
	statistics: BackendStatistics,
}

#[derive(Error, Debug)]
/// Error type used when solving a [`Model`] fails.
pub enum SolveError {
	#[error(transparent)]
	/// Error reported by the backend.
	Backend(#[from] BackendError),
	#[error(transparent)]
	/// Error caused by an invalid model item.
	Model(#[from] ModelError),
	#[error("objective `{objective}` cannot be evaluated in the found solution")]
	/// Error used when the objective term has no value in a solution (e.g.,
	/// because it divides by zero).
	UndefinedObjective {
		/// The objective term.
		objective: String,
	},
	#[error("unable to compute bounds for objective `{objective}`")]
	/// Error used when no finite bounds can be computed for the objective term.
	UnboundedObjective {
		/// The objective term.
		objective: String,
	},
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Result of a call to [`Session::solve`].
pub enum SolveResult {
	/// A solution was found, and is available using [`Session::solution`].
	Satisfied,
	/// A solution with the given optimal objective value was found, and is
	/// available using [`Session::solution`].
	Optimal(IntVal),
	/// No (further) solution exists.
	Unsatisfiable,
}

impl<B: Backend> Session<B> {
	delegate! {
		to self.model {
			/// Add a constraint to the model.
			pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), ModelError>;
			/// Add a collection of constraints to the model.
			pub fn add_constraints<Iter: IntoIterator<Item = Constraint>>(&mut self, constraints: Iter) -> Result<(), ModelError>;
			/// Declare a bit-vector variable with `width` bits.
			pub fn bit_vec(&mut self, name: &str, width: u32, signed: bool) -> Result<IntVar, ModelError>;
			/// Declare a Boolean variable with the given name.
			pub fn bool_var(&mut self, name: &str) -> BoolVar;
			/// Remove the optimization objective of the model.
			pub fn clear_objective(&mut self);
			/// Declare an integer variable with the given name and domain.
			pub fn int_var(&mut self, name: &str, domain: Domain) -> IntVar;
			/// Set the objective of the model to maximize the value of `term`.
			pub fn maximize<T: Into<Term>>(&mut self, term: T);
			/// Set the objective of the model to minimize the value of `term`.
			pub fn minimize<T: Into<Term>>(&mut self, term: T);
			/// Whether the solution satisfies the model.
			pub fn satisfied_by(&self, solution: &Solution) -> bool;
			/// The current number of items in the model.
			pub fn size(&self) -> ModelSize;
		}
	}

	/// The backend used by the session.
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// The bits of a bit-vector term in the last solution, least significant
	/// first.
	pub fn bit_values(&self, term: &Term) -> Option<Vec<bool>> {
		self.solution.as_ref()?.bit_values(term)
	}

	/// The value of a Boolean variable in the last solution.
	pub fn bool_value(&self, var: &BoolVar) -> Option<bool> {
		self.solution.as_ref()?.bool_value(var)
	}

	/// Evaluate a constraint in the last solution.
	pub fn check(&self, constraint: &Constraint) -> Option<bool> {
		self.solution.as_ref()?.check(constraint)
	}

	/// Write the model or the compiled state of the backend.
	///
	/// Dumping the compiled state encodes the model first, if it has not been
	/// encoded yet.
	pub fn dump<W: io::Write>(&mut self, out: &mut W, format: DumpFormat) -> Result<(), SolveError> {
		match format {
			DumpFormat::Csp => self.model.dump(out).map_err(BackendError::Io)?,
			DumpFormat::Compiled => {
				if !self.encoded {
					let _ = self.encode()?;
				}
				self.backend.export(out)?;
			}
		}
		Ok(())
	}

	/// Discard the compiled state of the backend and encode the complete model,
	/// committing both.
	fn encode(&mut self) -> Result<bool, SolveError> {
		let sat = self.backend.encode(&self.model)?;
		self.encoded = true;
		self.model.commit();
		self.backend.commit();
		let stats = self.backend.statistics();
		debug!(
			variables = stats.variables(),
			clauses = stats.clauses(),
			size = stats.size(),
			sat,
			"encode model"
		);
		Ok(sat)
	}

	/// Encode the items staged in the model, returning `false` if the model is
	/// found to be unsatisfiable.
	///
	/// When the backend reports that its state is inconsistent, it is renewed
	/// and the committed model is encoded again before the staged items.
	fn encode_staged(&mut self) -> Result<bool, SolveError> {
		match self.backend.encode_delta(&self.model) {
			Ok(()) => Ok(true),
			Err(BackendError::InconsistentState) => {
				warn!("backend state is inconsistent, renewing and encoding the full model");
				self.backend.renew();
				let mut committed = self.model.clone();
				committed.cancel();
				let sat = self.backend.encode(&committed)?;
				self.backend.commit();
				self.backend.encode_delta(&self.model)?;
				Ok(sat)
			}
			Err(err) => Err(err.into()),
		}
	}

	/// The value of an integer variable in the last solution.
	pub fn int_value(&self, var: &IntVar) -> Option<IntVal> {
		self.solution.as_ref()?.int_value(var)
	}

	/// Deconstruct the session into its model and backend.
	pub fn into_parts(self) -> (Model, B) {
		(self.model, self.backend)
	}

	/// The model being solved.
	pub fn model(&self) -> &Model {
		&self.model
	}

	/// Mutable access to the model being solved.
	///
	/// Items added through this reference are staged, and encoded by the next
	/// call to solve.
	pub fn model_mut(&mut self) -> &mut Model {
		&mut self.model
	}

	/// Create a new session for the given model and backend.
	pub fn new(model: Model, backend: B) -> Self {
		Self {
			model,
			backend,
			solution: None,
			enumerating: false,
			encoded: false,
			statistics: BackendStatistics::default(),
		}
	}

	/// Find the optimal solution for `objective` using a binary search over
	/// its value.
	///
	/// The bounds added during the search are retracted before returning, also
	/// when the search fails.
	fn optimize(&mut self, objective: Objective) -> Result<SolveResult, SolveError> {
		self.enumerating = false;
		self.solution = None;
		let term = objective.term().clone();
		let goal = objective.goal();
		let (lower, upper) = self
			.model
			.bounds(&term)
			.ok_or_else(|| SolveError::UnboundedObjective {
				objective: term.to_string(),
			})?;

		if !self.encode()? {
			return Ok(self.unsatisfiable());
		}
		let Some(best) = self.search()? else {
			return Ok(self.unsatisfiable());
		};
		let value = objective_value(&best, &term)?;
		let (lb, ub) = match goal {
			Goal::Maximize => (value, upper),
			Goal::Minimize => (lower, value),
		};
		debug!(lb, ub, value, "start objective search");

		let outcome = self.search_objective(&term, goal, (lb, ub), best);
		self.model.cancel();
		self.backend.cancel();
		match outcome {
			Ok((best, value)) => {
				debug!(value, "optimal objective value");
				self.solution = Some(best);
				Ok(SolveResult::Optimal(value))
			}
			Err(err) => {
				self.encoded = false;
				self.backend.renew();
				Err(err)
			}
		}
	}

	/// Narrow the objective bounds `(lb, ub)` until the best solution found is
	/// proven optimal, returning it together with its objective value.
	///
	/// Each step stages a bound on the objective in the model and the backend.
	/// The caller is responsible for cancelling the last staged bound.
	fn search_objective(
		&mut self,
		term: &Term,
		goal: Goal,
		(mut lb, mut ub): (IntVal, IntVal),
		mut best: Solution,
	) -> Result<(Solution, IntVal), SolveError> {
		while lb < ub {
			let mid = match goal {
				Goal::Maximize => midpoint_ceil(lb, ub),
				Goal::Minimize => midpoint_floor(lb, ub),
			};
			self.model.cancel();
			self.backend.cancel();
			let bound = match goal {
				Goal::Maximize => Constraint::and([term.ge(mid), term.le(ub)]),
				Goal::Minimize => Constraint::and([term.ge(lb), term.le(mid)]),
			};
			self.model.add_constraint(bound)?;
			let found = if self.encode_staged()? {
				self.search()?
			} else {
				None
			};
			debug!(lb, ub, mid, sat = found.is_some(), "check objective bound");
			match (goal, found) {
				(Goal::Maximize, Some(sol)) => {
					lb = objective_value(&sol, term)?;
					best = sol;
				}
				(Goal::Maximize, None) => ub = mid - 1,
				(Goal::Minimize, Some(sol)) => {
					ub = objective_value(&sol, term)?;
					best = sol;
				}
				(Goal::Minimize, None) => lb = mid + 1,
			}
		}
		let value = objective_value(&best, term)?;
		Ok((best, value))
	}

	/// Find a solution that differs from the last solution of the current
	/// enumeration, if any.
	fn satisfy(&mut self) -> Result<Option<Solution>, SolveError> {
		let sat = match self.solution.take() {
			Some(last) if self.enumerating => {
				let nogood = blocking_clause(&self.model, &last);
				debug!(clause = %nogood, "add solution nogood");
				self.model.add_constraint(nogood)?;
				if self.encoded {
					self.encode_staged()?
				} else {
					self.encode()?
				}
			}
			_ => self.encode()?,
		};
		if !sat {
			let _ = self.unsatisfiable();
			return Ok(None);
		}
		match self.search()? {
			Some(sol) => {
				self.model.commit();
				self.backend.commit();
				self.enumerating = true;
				self.solution = Some(sol.clone());
				Ok(Some(sol))
			}
			None => {
				let _ = self.unsatisfiable();
				Ok(None)
			}
		}
	}

	/// The last solution found.
	pub fn solution(&self) -> Option<&Solution> {
		self.solution.as_ref()
	}

	/// Solve the model.
	///
	/// When the model has an objective, the optimal solution is searched for.
	/// Otherwise, each call finds a solution that differs (in the values of the
	/// user variables) from the solutions found by earlier calls, until
	/// [`SolveResult::Unsatisfiable`] is returned.
	pub fn solve(&mut self) -> Result<SolveResult, SolveError> {
		if let Some(objective) = self.model.objective().cloned() {
			return self.optimize(objective);
		}
		Ok(match self.satisfy()? {
			Some(_) => SolveResult::Satisfied,
			None => SolveResult::Unsatisfiable,
		})
	}

	/// Find all solutions of the model, ignoring its objective.
	///
	/// The constraints added to exclude the found solutions are removed
	/// afterwards, leaving the model as it was before the call.
	pub fn solve_all(&mut self) -> Result<Vec<Solution>, SolveError> {
		self.enumerating = false;
		self.solution = None;
		let snapshot = self.model.size();
		let mut solutions = Vec::new();
		let result = loop {
			match self.satisfy() {
				Ok(Some(sol)) => solutions.push(sol),
				Ok(None) => break Ok(()),
				Err(err) => break Err(err),
			}
		};
		self.model.cancel_to(snapshot);
		self.backend.renew();
		self.encoded = false;
		self.enumerating = false;
		self.solution = None;
		debug!(solutions = solutions.len(), "enumerated all solutions");
		result.map(|()| solutions)
	}

	/// Run the backend search, recording its statistics.
	fn search(&mut self) -> Result<Option<Solution>, SolveError> {
		let found = self.backend.solve()?;
		self.statistics = self.backend.statistics();
		Ok(found)
	}

	/// Statistics of the backend after the last search.
	///
	/// The statistics are kept when the backend is renewed after the search
	/// finds no solution.
	pub fn statistics(&self) -> BackendStatistics {
		self.statistics
	}

	/// Reset the session after the model has been found unsatisfiable.
	fn unsatisfiable(&mut self) -> SolveResult {
		self.solution = None;
		self.enumerating = false;
		self.encoded = false;
		self.backend.renew();
		SolveResult::Unsatisfiable
	}

	/// The value of a term in the last solution.
	pub fn value(&self, term: &Term) -> Option<IntVal> {
		self.solution.as_ref()?.value(term)
	}
}

/// Create the constraint excluding the values that the user variables of the
/// model take in `solution`.
fn blocking_clause(model: &Model, solution: &Solution) -> Constraint {
	let ints = model
		.int_vars()
		.iter()
		.map(|def| def.var())
		.filter(|var| !var.is_auxiliary())
		.filter_map(|var| Some(Term::from(var).eq(solution.int_value(var)?)));
	let bools = model
		.bool_vars()
		.iter()
		.filter(|var| !var.is_auxiliary())
		.filter_map(|var| {
			Some(if solution.bool_value(var)? {
				Constraint::from(var)
			} else {
				!var
			})
		});
	!Constraint::and(ints.chain(bools))
}

/// Evaluate the objective term in a solution.
fn objective_value(solution: &Solution, term: &Term) -> Result<IntVal, SolveError> {
	solution
		.value(term)
		.ok_or_else(|| SolveError::UndefinedObjective {
			objective: term.to_string(),
		})
}

#[cfg(test)]
mod tests {
	use delegate::delegate;
	use expect_test::expect;
	use itertools::Itertools;
	use tracing_test::traced_test;

	use crate::{
		add_int, all_different_int, sub_int, times_int, Backend, BackendError, BackendStatistics,
		BoolVar, Constraint, Domain, DumpFormat, IntVal, IntVar, Model, SearchBackend, Session,
		Solution, SolveError, SolveResult, Term,
	};

	#[derive(Debug, Default)]
	/// Backend that reports an inconsistent state on the first incremental
	/// encoding.
	struct FlakyBackend {
		/// Backend used for all other operations.
		inner: SearchBackend,
		/// Whether the inconsistency has been reported.
		failed: bool,
	}

	impl Backend for FlakyBackend {
		delegate! {
			to self.inner {
				fn encode(&mut self, model: &Model) -> Result<bool, BackendError>;
				fn solve(&mut self) -> Result<Option<Solution>, BackendError>;
				fn commit(&mut self);
				fn cancel(&mut self);
				fn renew(&mut self);
				fn statistics(&self) -> BackendStatistics;
				fn export(&self, out: &mut dyn std::io::Write) -> Result<(), BackendError>;
			}
		}

		fn encode_delta(&mut self, model: &Model) -> Result<(), BackendError> {
			if !self.failed {
				self.failed = true;
				return Err(BackendError::InconsistentState);
			}
			self.inner.encode_delta(model)
		}
	}

	#[derive(Debug)]
	/// Backend whose `n`th call to solve fails with a reached node limit.
	struct InterruptedBackend {
		/// Backend used for all other operations.
		inner: SearchBackend,
		/// Number of calls to solve so far.
		solves: usize,
		/// The call to solve that fails.
		fail_at: usize,
	}

	impl Backend for InterruptedBackend {
		delegate! {
			to self.inner {
				fn encode(&mut self, model: &Model) -> Result<bool, BackendError>;
				fn encode_delta(&mut self, model: &Model) -> Result<(), BackendError>;
				fn commit(&mut self);
				fn cancel(&mut self);
				fn renew(&mut self);
				fn statistics(&self) -> BackendStatistics;
				fn export(&self, out: &mut dyn std::io::Write) -> Result<(), BackendError>;
			}
		}

		fn solve(&mut self) -> Result<Option<Solution>, BackendError> {
			self.solves += 1;
			if self.solves == self.fail_at {
				return Err(BackendError::LimitReached { nodes: 0 });
			}
			self.inner.solve()
		}
	}

	/// Model with two variables in `0..=4` that sum to 3.
	fn sum_model() -> (Model, IntVar, IntVar) {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let b = model.int_var("b", Domain::from_bounds(0, 4).unwrap());
		model
			.add_constraint(add_int([&a, &b]).unwrap().eq(3))
			.unwrap();
		(model, a, b)
	}

	/// Render one solution per line.
	fn listing(solutions: &[Solution]) -> String {
		solutions.iter().map(|sol| format!("{sol}\n")).collect()
	}

	#[test]
	#[traced_test]
	fn test_solve_sequence() {
		let (model, a, b) = sum_model();
		let mut slv = Session::new(model, SearchBackend::default());
		assert_eq!(slv.solve().unwrap(), SolveResult::Satisfied);
		assert_eq!(slv.int_value(&a), Some(0));
		assert_eq!(slv.int_value(&b), Some(3));

		let mut found = vec![slv.solution().unwrap().clone()];
		while slv.solve().unwrap() == SolveResult::Satisfied {
			found.push(slv.solution().unwrap().clone());
		}
		expect![[r#"
    a=0, b=3
    a=1, b=2
    a=2, b=1
    a=3, b=0
    "#]]
		.assert_eq(&listing(&found));
		assert!(slv.solution().is_none());
		assert!(logs_contain("add solution nogood"));

		// The exhausted session starts a new enumeration with all nogoods in place
		assert_eq!(slv.solve().unwrap(), SolveResult::Unsatisfiable);
		assert_eq!(slv.statistics().variables(), 2);
		assert_eq!(slv.statistics().clauses(), 5);
		assert_eq!(slv.backend().statistics().variables(), 0);
	}

	#[test]
	fn test_solve_all() {
		let (model, _, _) = sum_model();
		let mut slv = Session::new(model, SearchBackend::default());
		let before = slv.size();
		let sols = slv.solve_all().unwrap();
		assert_eq!(sols.len(), 4);
		assert!(sols.iter().all(|sol| slv.satisfied_by(sol)));
		assert_eq!(slv.size(), before);
		assert!(slv.solution().is_none());

		// The model is unchanged, so the enumeration can be repeated
		assert_eq!(slv.solve_all().unwrap(), sols);
		assert_eq!(slv.solve().unwrap(), SolveResult::Satisfied);
	}

	#[test]
	fn test_solve_all_distinct() {
		let mut slv = Session::<SearchBackend>::default();
		let xs = (0..3)
			.map(|i| slv.int_var(&format!("x{i}"), Domain::from_bounds(0, 2).unwrap()))
			.collect_vec();
		slv.add_constraint(all_different_int(&xs).unwrap()).unwrap();
		let sols = slv.solve_all().unwrap();
		expect![[r#"
    x0=0, x1=1, x2=2
    x0=0, x1=2, x2=1
    x0=1, x1=0, x2=2
    x0=1, x1=2, x2=0
    x0=2, x1=0, x2=1
    x0=2, x1=1, x2=0
    "#]]
		.assert_eq(&listing(&sols));
		assert!(sols.iter().tuple_combinations().all(|(s, t)| s != t));
	}

	#[test]
	fn test_solve_booleans() {
		let mut slv = Session::<SearchBackend>::default();
		let p = slv.bool_var("p");
		let q = slv.bool_var("q");
		slv.add_constraint(Constraint::xor(&p, &q)).unwrap();
		let sols = slv.solve_all().unwrap();
		expect![[r#"
    p=false, q=true
    p=true, q=false
    "#]]
		.assert_eq(&listing(&sols));
		assert_eq!(slv.solve().unwrap(), SolveResult::Satisfied);
		assert_eq!(slv.bool_value(&p), Some(false));
		assert_eq!(slv.bool_value(&BoolVar::new("r")), None);
	}

	#[test]
	fn test_unsatisfiable() {
		let (mut model, a, _) = sum_model();
		model.add_constraint(Term::from(&a).gt(3)).unwrap();
		let mut slv = Session::new(model, SearchBackend::default());
		assert_eq!(slv.solve().unwrap(), SolveResult::Unsatisfiable);
		assert!(slv.solution().is_none());
		assert_eq!(slv.solve_all().unwrap(), Vec::new());

		let (mut model, _, _) = sum_model();
		model.add_constraint(Constraint::from(false)).unwrap();
		let mut slv = Session::new(model, SearchBackend::default());
		assert_eq!(slv.solve().unwrap(), SolveResult::Unsatisfiable);
	}

	#[test]
	#[traced_test]
	fn test_inconsistent_backend_recovery() {
		let (model, _, _) = sum_model();
		let mut slv = Session::new(model, FlakyBackend::default());
		let sols = slv.solve_all().unwrap();
		assert_eq!(sols.len(), 4);
		assert!(slv.backend().failed);
		assert!(logs_contain("backend state is inconsistent"));
	}

	#[test]
	#[traced_test]
	fn test_minimize() {
		let mut slv = Session::<SearchBackend>::default();
		let x = slv.int_var("x", Domain::from_bounds(0, 6).unwrap());
		let y = slv.int_var("y", Domain::from_bounds(0, 6).unwrap());
		slv.add_constraint(times_int([&x, &y]).unwrap().ge(8)).unwrap();
		slv.minimize(add_int([&x, &y]).unwrap());
		let before = slv.size();

		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(6));
		expect!["x=2, y=4"].assert_eq(&slv.solution().unwrap().to_string());
		assert_eq!(slv.size(), before);
		assert!(logs_contain("check objective bound"));

		// Clearing the objective turns the session back into enumeration
		slv.clear_objective();
		assert_eq!(slv.solve().unwrap(), SolveResult::Satisfied);
		expect!["x=2, y=4"].assert_eq(&slv.solution().unwrap().to_string());
	}

	#[test]
	fn test_maximize() {
		let (model, a, b) = sum_model();
		let mut slv = Session::new(model, SearchBackend::default());
		slv.maximize(&a);
		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(3));
		assert_eq!(slv.int_value(&a), Some(3));
		assert_eq!(slv.int_value(&b), Some(0));
		assert_eq!(slv.check(&Term::from(&a).gt(&b)), Some(true));
		assert_eq!(slv.value(&add_int([&a, &b]).unwrap()), Some(3));
	}

	#[test]
	fn test_optimum_matches_enumeration() {
		let mut model = Model::default();
		let xs = model.int_var_list("x", 3, &Domain::from_bounds(0, 3).unwrap());
		model
			.add_constraints([
				add_int(&xs).unwrap().eq(5),
				Term::from(&xs[0]).ne(&xs[1]),
			])
			.unwrap();
		let objective = sub_int([
			times_int([Term::from(2), Term::from(&xs[0])]).unwrap(),
			Term::from(&xs[1]),
			Term::from(&xs[2]),
		])
		.unwrap();

		let mut slv = Session::new(model, SearchBackend::default());
		let best = slv
			.solve_all()
			.unwrap()
			.iter()
			.map(|sol| sol.value(&objective).unwrap())
			.min()
			.unwrap();
		slv.minimize(&objective);
		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(best));
		assert!(slv.satisfied_by(slv.solution().unwrap()));
	}

	#[test]
	fn test_minimize_full_range() {
		let mut slv = Session::<SearchBackend>::default();
		let x = slv.int_var("x", Domain::from_bounds(-2, 1).unwrap());
		slv.add_constraint(Term::from(&x).ge(0)).unwrap();
		let objective = times_int([Term::from(&x), Term::from(1 << 62)]).unwrap();
		assert_eq!(slv.model().bounds(&objective), Some((IntVal::MIN, 1 << 62)));
		slv.minimize(&objective);
		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(0));
		assert_eq!(slv.int_value(&x), Some(0));

		let y = slv.int_var("y", Domain::from_bounds(-1, 2).unwrap());
		slv.add_constraint(Term::from(&y).ge(0)).unwrap();
		let objective = times_int([Term::from(&y), Term::from(-(1 << 62))]).unwrap();
		assert_eq!(slv.model().bounds(&objective), Some((IntVal::MIN, 1 << 62)));
		slv.maximize(&objective);
		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(0));
		assert_eq!(slv.int_value(&y), Some(0));
	}

	#[test]
	fn test_optimize_error_rollback() {
		let backend = InterruptedBackend {
			inner: SearchBackend::default(),
			solves: 0,
			fail_at: 2,
		};
		let mut slv = Session::new(Model::default(), backend);
		let x = slv.int_var("x", Domain::from_bounds(0, 6).unwrap());
		slv.add_constraint(Term::from(&x).ge(5)).unwrap();
		slv.minimize(&x);
		let before = slv.size();

		assert!(matches!(
			slv.solve(),
			Err(SolveError::Backend(BackendError::LimitReached { .. }))
		));
		assert_eq!(slv.size(), before);
		assert_eq!(slv.solution(), None);

		assert_eq!(slv.solve().unwrap(), SolveResult::Optimal(5));
		assert_eq!(slv.int_value(&x), Some(5));
		assert_eq!(slv.size(), before);
	}

	#[test]
	fn test_dump() {
		let (model, a, _) = sum_model();
		let mut slv = Session::new(model, SearchBackend::default());
		slv.minimize(&a);
		let mut out = Vec::new();
		slv.dump(&mut out, DumpFormat::Csp).unwrap();
		expect![[r#"
    int(a,0,4)
    int(b,0,4)
    Eq(Add(a,b),3)
    minimize(a)
    "#]]
		.assert_eq(&String::from_utf8(out).unwrap());

		let mut out = Vec::new();
		slv.dump(&mut out, DumpFormat::Compiled).unwrap();
		expect![[r#"
    c search 2 variables 1 constraints
    v 0 int a 0..=4
    v 1 int b 0..=4
    k 1 Eq(Add(a,b),3)
    "#]]
		.assert_eq(&String::from_utf8(out).unwrap());
		assert_eq!(slv.backend().statistics().variables(), 2);
		assert_eq!(slv.statistics().variables(), 0);

		let (model, backend) = slv.into_parts();
		assert_eq!(model.size().constraints, 1);
		assert_eq!(backend.statistics().clauses(), 1);
	}
}
