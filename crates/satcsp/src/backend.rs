//! The interface between a [`Session`](crate::Session) and the engine used to
//! find solutions of a [`Model`].

pub mod search;

use std::io;

use thiserror::Error;

use crate::{model::Model, solution::Solution};

/// An engine that can find solutions of the (compiled) constraints of a
/// [`Model`].
///
/// A backend maintains its own commit checkpoint, mirroring the one of the
/// model: [`Backend::encode_delta`] only compiles the items the model has
/// added since its last commit, and [`Backend::cancel`] retracts everything
/// compiled since the last [`Backend::commit`].
pub trait Backend {
	/// Discard all compiled state, then compile the complete model.
	///
	/// Returns `false` if the model is found to be unsatisfiable while it is
	/// compiled.
	fn encode(&mut self, model: &Model) -> Result<bool, BackendError>;

	/// Compile the items of the model that were added since the model's last
	/// commit.
	///
	/// Returns [`BackendError::InconsistentState`] when the compiled state no
	/// longer matches the model. The state of the backend is unspecified after
	/// this error, and it should be renewed.
	fn encode_delta(&mut self, model: &Model) -> Result<(), BackendError>;

	/// Search for an assignment satisfying all compiled constraints.
	///
	/// Returns `None` if no such assignment exists.
	fn solve(&mut self) -> Result<Option<Solution>, BackendError>;

	/// Mark the current compiled state as the one to return to on cancel.
	fn commit(&mut self);

	/// Retract everything compiled since the last commit.
	fn cancel(&mut self);

	/// Discard all compiled state.
	fn renew(&mut self);

	/// Statistics of the compiled state.
	fn statistics(&self) -> BackendStatistics;

	/// Write the compiled state in a human-readable format.
	fn export(&self, out: &mut dyn io::Write) -> Result<(), BackendError>;
}

#[derive(Error, Debug)]
/// Error type used for failures reported by a [`Backend`].
pub enum BackendError {
	#[error("the compiled state of the backend does not match the model")]
	/// Error used when the compiled state does not correspond to the model.
	InconsistentState,
	#[error("search limit reached after {nodes} nodes")]
	/// Error used when the search was aborted because of a configured limit.
	LimitReached {
		/// Number of search nodes explored.
		nodes: u64,
	},
	#[error("unable to write backend output: {0}")]
	/// Error used when writing the compiled state fails.
	Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// Statistics about the compiled state of a [`Backend`].
pub struct BackendStatistics {
	/// Number of compiled variables.
	variables: usize,
	/// Number of compiled clauses (or constraints).
	clauses: usize,
	/// Backend specific measure of the size of the compiled state.
	size: usize,
}

impl BackendStatistics {
	/// Number of compiled clauses (or constraints).
	pub fn clauses(&self) -> usize {
		self.clauses
	}

	/// Create a new statistics record.
	pub fn new(variables: usize, clauses: usize, size: usize) -> Self {
		Self {
			variables,
			clauses,
			size,
		}
	}

	/// Backend specific measure of the size of the compiled state.
	pub fn size(&self) -> usize {
		self.size
	}

	/// Number of compiled variables.
	pub fn variables(&self) -> usize {
		self.variables
	}
}
