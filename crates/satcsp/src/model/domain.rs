//! Finite domains of integer variables.

use std::fmt::{self, Display};

use itertools::{Either, Itertools};
use rangelist::RangeList;

use crate::{
	model::{term::BitVecInfo, ModelError},
	IntSetVal, IntVal,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// The finite set of values an integer variable may take.
///
/// A domain always contains at least one value. It is created using
/// [`Domain::from_bounds`], [`Domain::from_values`], or [`Domain::singleton`].
pub struct Domain(DomainRepr);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
/// Internal representation of a [`Domain`].
enum DomainRepr {
	/// All values from `lo` to `hi` (inclusive), where `lo <= hi`.
	Interval {
		/// Smallest value of the domain.
		lo: IntVal,
		/// Largest value of the domain.
		hi: IntVal,
	},
	/// A non-empty explicit set of values.
	Set(IntSetVal),
}

impl Domain {
	/// Domain `{0, 1}`, used for bit variables.
	pub fn boolean() -> Self {
		Self(DomainRepr::Interval { lo: 0, hi: 1 })
	}

	/// The bounds of the domain when it is an interval, or `None` when it is an
	/// explicit set of values.
	pub fn as_interval(&self) -> Option<(IntVal, IntVal)> {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => Some((*lo, *hi)),
			DomainRepr::Set(_) => None,
		}
	}

	/// Domain of all values representable by a bit-vector.
	pub(crate) fn from_bit_vec(info: BitVecInfo) -> Self {
		Self(DomainRepr::Interval {
			lo: info.min_value(),
			hi: info.max_value(),
		})
	}

	/// Create the interval domain `lo..=hi`.
	///
	/// Returns [`ModelError::EmptyDomain`] when `lo > hi`.
	pub fn from_bounds(lo: IntVal, hi: IntVal) -> Result<Self, ModelError> {
		if lo > hi {
			return Err(ModelError::EmptyDomain);
		}
		Ok(Self(DomainRepr::Interval { lo, hi }))
	}

	/// Create a domain containing exactly the given values.
	///
	/// The values may be given in any order and may contain duplicates. Returns
	/// [`ModelError::EmptyDomain`] when no values are given.
	pub fn from_values<Iter: IntoIterator<Item = IntVal>>(values: Iter) -> Result<Self, ModelError> {
		let values = values.into_iter().sorted_unstable().dedup().collect_vec();
		if values.is_empty() {
			return Err(ModelError::EmptyDomain);
		}
		let ranges = values
			.into_iter()
			.map(|v| (v, v))
			.coalesce(|(lo, hi), (l, h)| {
				if hi + 1 == l {
					Ok((lo, h))
				} else {
					Err(((lo, hi), (l, h)))
				}
			})
			.map(|(lo, hi)| lo..=hi)
			.collect_vec();
		Ok(Self(DomainRepr::Set(RangeList::from_iter(ranges))))
	}

	/// Domain containing only `value`.
	pub fn singleton(value: IntVal) -> Self {
		Self(DomainRepr::Interval {
			lo: value,
			hi: value,
		})
	}

	/// Number of values in the domain.
	///
	/// The result is wide enough to count every value of `IntVal::MIN..=IntVal::MAX`.
	pub fn card(&self) -> u128 {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => range_card(*lo, *hi),
			DomainRepr::Set(set) => set.iter().map(|r| range_card(*r.start(), *r.end())).sum(),
		}
	}

	/// Whether `value` is a member of the domain.
	pub fn contains(&self, value: IntVal) -> bool {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => (*lo..=*hi).contains(&value),
			DomainRepr::Set(set) => set.contains(&value),
		}
	}

	/// Smallest value of the domain.
	pub fn lb(&self) -> IntVal {
		self.bounds().0
	}

	/// Both the smallest and largest value of the domain.
	pub fn bounds(&self) -> (IntVal, IntVal) {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => (*lo, *hi),
			DomainRepr::Set(set) => (
				*set.lower_bound().expect("domain sets are never empty"),
				*set.upper_bound().expect("domain sets are never empty"),
			),
		}
	}

	/// Largest value of the domain.
	pub fn ub(&self) -> IntVal {
		self.bounds().1
	}

	/// Iterate over all values of the domain in ascending order.
	pub fn values(&self) -> impl Iterator<Item = IntVal> + '_ {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => Either::Left(*lo..=*hi),
			DomainRepr::Set(set) => Either::Right(set.iter().flat_map(|r| *r.start()..=*r.end())),
		}
	}

	/// Iterate over all values of the domain in descending order.
	pub fn values_rev(&self) -> impl Iterator<Item = IntVal> + '_ {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => Either::Left((*lo..=*hi).rev()),
			DomainRepr::Set(set) => {
				let ranges = set.iter().map(|r| (*r.start(), *r.end())).collect_vec();
				Either::Right(ranges.into_iter().rev().flat_map(|(lo, hi)| (lo..=hi).rev()))
			}
		}
	}
}

impl Display for Domain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			DomainRepr::Interval { lo, hi } => write!(f, "{lo}..={hi}"),
			DomainRepr::Set(_) => write!(f, "{{{}}}", self.values().join(",")),
		}
	}
}

/// Number of values in `lo..=hi`, where `lo <= hi`.
fn range_card(lo: IntVal, hi: IntVal) -> u128 {
	(i128::from(hi) - i128::from(lo)).unsigned_abs() + 1
}

#[cfg(test)]
mod tests {
	use itertools::Itertools;

	use crate::{Domain, ModelError};

	#[test]
	fn test_interval_domain() {
		let dom = Domain::from_bounds(-2, 3).unwrap();
		assert_eq!(dom.bounds(), (-2, 3));
		assert_eq!(dom.card(), 6);
		assert!(dom.contains(-2));
		assert!(dom.contains(3));
		assert!(!dom.contains(4));
		assert_eq!(dom.to_string(), "-2..=3");
		assert_eq!(Domain::from_bounds(1, 0), Err(ModelError::EmptyDomain));
		assert_eq!(dom.as_interval(), Some((-2, 3)));
		assert_eq!(dom.values_rev().collect_vec(), vec![3, 2, 1, 0, -1, -2]);
	}

	#[test]
	fn test_full_range_card() {
		let dom = Domain::from_bounds(i64::MIN, i64::MAX).unwrap();
		assert_eq!(dom.card(), 1 << 64);
		assert_eq!(dom.bounds(), (i64::MIN, i64::MAX));
		let dom = Domain::from_values([i64::MIN, 0, i64::MAX]).unwrap();
		assert_eq!(dom.card(), 3);
		assert_eq!(dom.values_rev().collect_vec(), vec![i64::MAX, 0, i64::MIN]);
	}

	#[test]
	fn test_set_domain() {
		let dom = Domain::from_values([5, 1, 3, 2, 3, 9]).unwrap();
		assert_eq!(dom.lb(), 1);
		assert_eq!(dom.ub(), 9);
		assert_eq!(dom.card(), 5);
		assert!(dom.contains(2));
		assert!(!dom.contains(4));
		assert_eq!(dom.values().collect_vec(), vec![1, 2, 3, 5, 9]);
		assert_eq!(dom.to_string(), "{1,2,3,5,9}");
		assert_eq!(dom.as_interval(), None);
		assert_eq!(dom.values_rev().collect_vec(), vec![9, 5, 3, 2, 1]);
		assert_eq!(Domain::from_values([]), Err(ModelError::EmptyDomain));
		assert_eq!(Domain::singleton(4).values().collect_vec(), vec![4]);
	}
}
