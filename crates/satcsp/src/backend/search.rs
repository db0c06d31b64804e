//! A complete depth-first search backend that evaluates the constraints of the
//! model directly.
//!
//! Variables are assigned in declaration order, and every constraint is checked
//! as soon as the last of its variables has been assigned.

use std::{collections::HashMap, io};

use index_vec::{define_index_type, IndexVec};
use itertools::Either;
use tracing::{debug, trace};

use crate::{
	backend::{Backend, BackendError, BackendStatistics},
	model::{
		constraint::{BoolVar, Constraint},
		domain::Domain,
		term::IntVar,
		IntVarDef, Model,
	},
	solution::{Solution, Valuation},
	IntVal,
};

define_index_type! {
	/// Identifies a variable slot in a [`SearchBackend`].
	struct SlotIndex = u32;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
/// Configuration object for the [`SearchBackend`].
pub struct SearchConfig {
	/// The maximum number of search nodes explored by a single call to solve.
	node_limit: Option<u64>,
	/// The order in which the values of a variable are tried.
	value_order: ValueOrder,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// Order in which the [`SearchBackend`] tries the values of a variable.
pub enum ValueOrder {
	#[default]
	/// Try the smallest value first.
	Ascending,
	/// Try the largest value first.
	Descending,
}

#[derive(Clone, Debug, Default)]
/// Backend that finds solutions using a depth-first search over the values of
/// all variables.
///
/// The search is complete, but its run time is exponential in the number of
/// variables. It is intended for small models and for testing.
pub struct SearchBackend {
	/// Configuration of the search.
	config: SearchConfig,
	/// Compiled variables, in the order they are assigned during search.
	slots: IndexVec<SlotIndex, Slot>,
	/// Slot of each compiled integer variable.
	int_slots: HashMap<IntVar, SlotIndex>,
	/// Slot of each compiled Boolean variable.
	bool_slots: HashMap<BoolVar, SlotIndex>,
	/// Compiled constraints.
	checks: Vec<Check>,
	/// Number of slots and checks at the last commit.
	checkpoint: (usize, usize),
	/// Number of search nodes explored by the last call to solve.
	nodes: u64,
}

#[derive(Clone, Debug)]
/// A variable compiled into a [`SearchBackend`].
enum Slot {
	/// An integer variable and the values it can take.
	Int(IntVar, Domain),
	/// A Boolean variable.
	Bool(BoolVar),
}

#[derive(Clone, Debug)]
/// A constraint compiled into a [`SearchBackend`].
struct Check {
	/// The constraint to evaluate.
	constraint: Constraint,
	/// Slot after which all variables of the constraint are assigned, `None` if
	/// the constraint has no variables.
	level: Option<SlotIndex>,
}

#[derive(Debug)]
/// State of a single depth-first search.
struct Search<'a> {
	/// The backend being searched.
	backend: &'a SearchBackend,
	/// Constraints to check after assigning each slot.
	checks: IndexVec<SlotIndex, Vec<&'a Constraint>>,
	/// Current value of each slot, Booleans are stored as `0` or `1`.
	assignment: IndexVec<SlotIndex, Option<IntVal>>,
	/// Number of nodes explored.
	nodes: u64,
}

/// Values tried for Boolean slots.
const BOOL_VALUES: [IntVal; 2] = [0, 1];

impl SearchConfig {
	/// Get the maximum number of search nodes explored by a single call to
	/// solve, if any.
	pub fn node_limit(&self) -> Option<u64> {
		self.node_limit
	}

	/// Get the order in which the values of a variable are tried.
	pub fn value_order(&self) -> ValueOrder {
		self.value_order
	}

	/// Change the maximum number of search nodes explored by a single call to
	/// solve.
	pub fn with_node_limit(mut self, limit: u64) -> Self {
		self.node_limit = Some(limit);
		self
	}

	/// Change the order in which the values of a variable are tried.
	pub fn with_value_order(mut self, order: ValueOrder) -> Self {
		self.value_order = order;
		self
	}
}

impl SearchBackend {
	/// Compile variables and constraints, skipping variables that are already
	/// compiled.
	fn compile(
		&mut self,
		int_vars: &[IntVarDef],
		bool_vars: &[BoolVar],
		constraints: &[Constraint],
	) -> Result<(), BackendError> {
		for def in int_vars {
			if self.int_slots.contains_key(def.var()) {
				continue;
			}
			let idx = self.slots.push(Slot::Int(def.var().clone(), def.domain().clone()));
			let _ = self.int_slots.insert(def.var().clone(), idx);
		}
		for var in bool_vars {
			if self.bool_slots.contains_key(var) {
				continue;
			}
			let idx = self.slots.push(Slot::Bool(var.clone()));
			let _ = self.bool_slots.insert(var.clone(), idx);
		}
		for c in constraints {
			let ints = c.int_vars().into_iter().map(|v| self.int_slots.get(&v).copied());
			let bools = c
				.bool_vars()
				.into_iter()
				.map(|v| self.bool_slots.get(&v).copied());
			let level = ints
				.chain(bools)
				.collect::<Option<Vec<_>>>()
				.ok_or(BackendError::InconsistentState)?
				.into_iter()
				.max();
			self.checks.push(Check {
				constraint: c.clone(),
				level,
			});
		}
		Ok(())
	}

	/// The configuration of the backend.
	pub fn config(&self) -> &SearchConfig {
		&self.config
	}

	/// Whether all constraints without variables hold.
	fn ground_consistent(&self) -> bool {
		let empty = Solution::default();
		self.checks
			.iter()
			.filter(|c| c.level.is_none())
			.all(|c| c.constraint.value(&empty) == Some(true))
	}

	/// Create a new backend with the given configuration.
	pub fn new(config: SearchConfig) -> Self {
		Self {
			config,
			..Self::default()
		}
	}

	/// Number of search nodes explored by the last call to solve.
	pub fn nodes(&self) -> u64 {
		self.nodes
	}

	/// Remove all slots beyond the first `len`.
	fn truncate_slots(&mut self, len: usize) {
		if len >= self.slots.len() {
			return;
		}
		for slot in &self.slots.raw[len..] {
			match slot {
				Slot::Int(var, _) => {
					let _ = self.int_slots.remove(var);
				}
				Slot::Bool(var) => {
					let _ = self.bool_slots.remove(var);
				}
			}
		}
		self.slots.raw.truncate(len);
	}
}

impl Backend for SearchBackend {
	fn encode(&mut self, model: &Model) -> Result<bool, BackendError> {
		self.renew();
		self.compile(model.int_vars(), model.bool_vars(), model.constraints())?;
		trace!(
			slots = self.slots.len(),
			checks = self.checks.len(),
			"compile model"
		);
		Ok(self.ground_consistent())
	}

	fn encode_delta(&mut self, model: &Model) -> Result<(), BackendError> {
		self.cancel();
		self.compile(
			model.int_vars_since_commit(),
			model.bool_vars_since_commit(),
			model.constraints_since_commit(),
		)?;
		trace!(
			slots = self.slots.len(),
			checks = self.checks.len(),
			"compile model delta"
		);
		Ok(())
	}

	fn solve(&mut self) -> Result<Option<Solution>, BackendError> {
		let (result, nodes) = if self.ground_consistent() {
			let mut search = Search::new(self);
			let found = search.dfs(0).map(|found| found.then(|| search.solution()));
			(found, search.nodes)
		} else {
			(Ok(None), 0)
		};
		self.nodes = nodes;
		let result = result?;
		let stats = self.statistics();
		debug!(
			variables = stats.variables(),
			clauses = stats.clauses(),
			size = stats.size(),
			nodes = self.nodes,
			sat = result.is_some(),
			"search backend solve"
		);
		Ok(result)
	}

	fn commit(&mut self) {
		self.checkpoint = (self.slots.len(), self.checks.len());
	}

	fn cancel(&mut self) {
		let (slots, checks) = self.checkpoint;
		self.truncate_slots(slots);
		self.checks.truncate(checks);
	}

	fn renew(&mut self) {
		self.slots.raw.clear();
		self.int_slots.clear();
		self.bool_slots.clear();
		self.checks.clear();
		self.checkpoint = (0, 0);
	}

	fn statistics(&self) -> BackendStatistics {
		let size = self
			.slots
			.iter()
			.map(|slot| match slot {
				Slot::Int(_, domain) => usize::try_from(domain.card()).unwrap_or(usize::MAX),
				Slot::Bool(_) => BOOL_VALUES.len(),
			})
			.fold(0, usize::saturating_add);
		BackendStatistics::new(self.slots.len(), self.checks.len(), size)
	}

	fn export(&self, out: &mut dyn io::Write) -> Result<(), BackendError> {
		writeln!(
			out,
			"c search {} variables {} constraints",
			self.slots.len(),
			self.checks.len()
		)?;
		for (idx, slot) in self.slots.iter_enumerated() {
			match slot {
				Slot::Int(var, domain) => writeln!(out, "v {} int {var} {domain}", idx.index())?,
				Slot::Bool(var) => writeln!(out, "v {} bool {var}", idx.index())?,
			}
		}
		for check in &self.checks {
			match check.level {
				Some(level) => writeln!(out, "k {} {}", level.index(), check.constraint)?,
				None => writeln!(out, "k - {}", check.constraint)?,
			}
		}
		Ok(())
	}
}

impl<'a> Search<'a> {
	/// Prepare a search over the compiled state of `backend`.
	fn new(backend: &'a SearchBackend) -> Self {
		let mut checks = IndexVec::from_vec(vec![Vec::new(); backend.slots.len()]);
		for check in &backend.checks {
			if let Some(level) = check.level {
				checks[level].push(&check.constraint);
			}
		}
		Self {
			backend,
			checks,
			assignment: IndexVec::from_vec(vec![None; backend.slots.len()]),
			nodes: 0,
		}
	}

	/// Assign the slots from `depth` onwards, returning whether a satisfying
	/// assignment was found.
	fn dfs(&mut self, depth: usize) -> Result<bool, BackendError> {
		if depth == self.backend.slots.len() {
			return Ok(true);
		}
		let idx = SlotIndex::from_usize(depth);
		let backend = self.backend;
		let ints = |domain: &'a Domain| match backend.config.value_order {
			ValueOrder::Ascending => Either::Left(domain.values()),
			ValueOrder::Descending => Either::Right(domain.values_rev()),
		};
		let values = match &backend.slots[idx] {
			Slot::Int(_, domain) => Either::Left(ints(domain)),
			Slot::Bool(_) => Either::Right(match backend.config.value_order {
				ValueOrder::Ascending => Either::Left(BOOL_VALUES.iter().copied()),
				ValueOrder::Descending => Either::Right(BOOL_VALUES.iter().rev().copied()),
			}),
		};
		for val in values {
			self.nodes += 1;
			if let Some(limit) = backend.config.node_limit {
				if self.nodes > limit {
					return Err(BackendError::LimitReached { nodes: self.nodes });
				}
			}
			self.assignment[idx] = Some(val);
			let consistent = self.checks[idx]
				.iter()
				.all(|c| c.value(&*self) == Some(true));
			if consistent && self.dfs(depth + 1)? {
				return Ok(true);
			}
		}
		self.assignment[idx] = None;
		Ok(false)
	}

	/// The solution represented by the current (complete) assignment.
	fn solution(&self) -> Solution {
		let mut ints = Vec::new();
		let mut bools = Vec::new();
		for (slot, val) in self.backend.slots.iter().zip(self.assignment.iter()) {
			match (slot, val) {
				(Slot::Int(var, _), Some(v)) => ints.push((var.clone(), *v)),
				(Slot::Bool(var), Some(v)) => bools.push((var.clone(), *v != 0)),
				(_, None) => {}
			}
		}
		Solution::new(ints, bools)
	}
}

impl Valuation for Search<'_> {
	fn int_value(&self, var: &IntVar) -> Option<IntVal> {
		self.assignment[*self.backend.int_slots.get(var)?]
	}

	fn bool_value(&self, var: &BoolVar) -> Option<bool> {
		self.assignment[*self.backend.bool_slots.get(var)?].map(|v| v != 0)
	}
}

#[cfg(test)]
mod tests {
	use expect_test::expect;
	use tracing_test::traced_test;

	use crate::{
		add_int, Backend, BackendError, Constraint, Domain, Model, SearchBackend, SearchConfig,
		Term, ValueOrder,
	};

	/// Model with two variables in `0..=4` that sum to 3.
	fn sum_model() -> Model {
		let mut model = Model::default();
		let a = model.int_var("a", Domain::from_bounds(0, 4).unwrap());
		let b = model.int_var("b", Domain::from_bounds(0, 4).unwrap());
		model
			.add_constraint(add_int([&a, &b]).unwrap().eq(3))
			.unwrap();
		model
	}

	#[test]
	#[traced_test]
	fn test_search_solve() {
		let model = sum_model();
		let mut backend = SearchBackend::default();
		assert!(backend.encode(&model).unwrap());
		let sol = backend.solve().unwrap().unwrap();
		expect!["a=0, b=3"].assert_eq(&sol.to_string());
		assert!(model.satisfied_by(&sol));
		assert!(logs_contain("search backend solve"));

		let mut backend =
			SearchBackend::new(SearchConfig::default().with_value_order(ValueOrder::Descending));
		assert!(backend.encode(&model).unwrap());
		let sol = backend.solve().unwrap().unwrap();
		expect!["a=3, b=0"].assert_eq(&sol.to_string());
	}

	#[test]
	fn test_search_delta() {
		let mut model = sum_model();
		let mut backend = SearchBackend::default();
		assert!(backend.encode(&model).unwrap());
		model.commit();
		backend.commit();
		let stats = backend.statistics();
		assert_eq!((stats.variables(), stats.clauses(), stats.size()), (2, 1, 10));

		let a = model.int_vars()[0].var().clone();
		let c = model.int_var("c", Domain::from_bounds(1, 2).unwrap());
		model
			.add_constraints([Term::from(&a).ge(2), Term::from(&c).gt(&a)])
			.unwrap();
		backend.encode_delta(&model).unwrap();
		assert_eq!(backend.statistics().variables(), 3);
		assert_eq!(backend.solve().unwrap(), None);

		backend.cancel();
		model.cancel();
		assert_eq!(backend.statistics().clauses(), 1);
		assert!(backend.solve().unwrap().is_some());
	}

	#[test]
	fn test_search_inconsistent_state() {
		let mut model = sum_model();
		let mut backend = SearchBackend::default();
		assert!(backend.encode(&model).unwrap());
		model.commit();
		// The backend never saw the new variable, because it was not committed
		let x = model.int_var("x", Domain::from_bounds(0, 1).unwrap());
		model.commit();
		model.add_constraint(Term::from(&x).eq(1)).unwrap();
		assert!(matches!(
			backend.encode_delta(&model),
			Err(BackendError::InconsistentState)
		));
	}

	#[test]
	fn test_search_trivial() {
		let mut model = sum_model();
		model.add_constraint(Constraint::from(false)).unwrap();
		let mut backend = SearchBackend::default();
		assert!(!backend.encode(&model).unwrap());
		assert_eq!(backend.solve().unwrap(), None);
		assert_eq!(backend.nodes(), 0);
	}

	#[test]
	fn test_search_node_limit() {
		let mut model = sum_model();
		let a = model.int_vars()[0].var().clone();
		model.add_constraint(Term::from(&a).gt(3)).unwrap();
		let mut backend = SearchBackend::new(SearchConfig::default().with_node_limit(3));
		assert!(backend.encode(&model).unwrap());
		assert!(matches!(
			backend.solve(),
			Err(BackendError::LimitReached { nodes: 4 })
		));
	}

	#[test]
	fn test_search_large_domain() {
		let mut model = Model::default();
		let x = model.int_var("x", Domain::from_bounds(0, 1_000_000_000_000).unwrap());
		model.add_constraint(Term::from(&x).lt(0)).unwrap();
		let mut backend = SearchBackend::new(SearchConfig::default().with_node_limit(100));
		assert!(backend.encode(&model).unwrap());
		assert_eq!(backend.statistics().size(), 1_000_000_000_001);
		assert!(matches!(
			backend.solve(),
			Err(BackendError::LimitReached { nodes: 101 })
		));

		let mut backend =
			SearchBackend::new(SearchConfig::default().with_value_order(ValueOrder::Descending));
		let mut model = Model::default();
		let x = model.int_var("x", Domain::from_bounds(0, 1_000_000_000_000).unwrap());
		model.add_constraint(Term::from(&x).ne(3)).unwrap();
		assert!(backend.encode(&model).unwrap());
		let sol = backend.solve().unwrap().unwrap();
		expect!["x=1000000000000"].assert_eq(&sol.to_string());
	}

	#[test]
	fn test_search_export() {
		let mut model = sum_model();
		let p = model.bool_var("p");
		model.add_constraint(Constraint::or([&p])).unwrap();
		let mut backend = SearchBackend::default();
		assert!(backend.encode(&model).unwrap());
		let mut out = Vec::new();
		backend.export(&mut out).unwrap();
		expect![[r#"
    c search 3 variables 2 constraints
    v 0 int a 0..=4
    v 1 int b 0..=4
    v 2 bool p
    k 1 Eq(Add(a,b),3)
    k 2 Or(p)
    "#]]
		.assert_eq(&String::from_utf8(out).unwrap());
	}
}
