//! Enumeration of every outcome branch of a measurement value.
//!
//! Branch `i` of a value with `n` dependencies is the `n`-bit binary
//! representation of `i`, most significant bit first, aligned with
//! [`MeasurementValue::measurements`]. Both enumerators are restartable: each
//! call to `iter` starts again from branch 0.
//!
//! Enumeration is exponential in the dependency count and is refused beyond
//! [`Config::max_branch_dependencies`].

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::config::{Config, MAX_SUPPORTED_BRANCH_DEPENDENCIES};
use crate::error::{Error, Result};
use crate::plan::Plan;
use crate::scalar::Value;
use crate::value::MeasurementValue;

/// One concrete bit per enumerated measurement.
pub type Branch = SmallVec<[bool; 8]>;

fn branch_bits(index: u64, width: usize) -> Branch {
    (0..width)
        .rev()
        .map(|shift| {
            let shifted = u32::try_from(shift).ok().and_then(|shift| index.checked_shr(shift));
            shifted.unwrap_or(0) & 1 == 1
        })
        .collect()
}

fn check_limit(dependencies: usize, config: &Config) -> Result<()> {
    let limit = config.branch_limit();
    if dependencies > limit {
        tracing::warn!(dependencies, limit, "refusing exponential branch enumeration");
        return Err(Error::TooManyBranches { dependencies, limit });
    }
    Ok(())
}

/// All `2^n` branches of a value paired with the value's output on them.
#[derive(Clone, Copy)]
pub struct Branches<'a> {
    value: &'a MeasurementValue,
}

impl<'a> Branches<'a> {
    #[must_use]
    pub fn len(&self) -> u64 {
        1 << self.value.dependency_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> BranchIter<'a> {
        BranchIter {
            plan: self.value.plan(),
            width: self.value.dependency_count(),
            next: 0,
            end: self.len(),
        }
    }
}

impl<'a> IntoIterator for Branches<'a> {
    type Item = Result<(Branch, Value)>;
    type IntoIter = BranchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Branches<'a> {
    type Item = Result<(Branch, Value)>;
    type IntoIter = BranchIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct BranchIter<'a> {
    plan: &'a Plan,
    width: usize,
    next: u64,
    end: u64,
}

impl Iterator for BranchIter<'_> {
    type Item = Result<(Branch, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let branch = branch_bits(self.next, self.width);
        self.next += 1;
        Some(self.plan.evaluate(&branch).map(|value| (branch, value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BranchIter<'_> {}

/// Branches over the measurements without a postselection constraint.
#[derive(Clone)]
pub struct PostselectedBranches<'a> {
    plan: &'a Plan,
    /// Fixed bit for each postselected dependency, `None` for free ones.
    fixed: SmallVec<[Option<bool>; 8]>,
    free_count: usize,
}

impl<'a> PostselectedBranches<'a> {
    #[must_use]
    pub fn len(&self) -> u64 {
        1 << self.free_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of dependencies left free by postselection.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn iter(&self) -> PostselectedBranchIter<'_> {
        PostselectedBranchIter {
            branches: self,
            next: 0,
            end: self.len(),
        }
    }

    /// The full dependency-aligned bit vector for a free assignment.
    fn expand(&self, free: &[bool]) -> Branch {
        let mut free_bits = free.iter().copied();
        self.fixed
            .iter()
            .map(|fixed| fixed.unwrap_or_else(|| free_bits.next().unwrap_or_default()))
            .collect()
    }
}

impl<'b> IntoIterator for &'b PostselectedBranches<'_> {
    type Item = Result<(Branch, Value)>;
    type IntoIter = PostselectedBranchIter<'b>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PostselectedBranchIter<'b> {
    branches: &'b PostselectedBranches<'b>,
    next: u64,
    end: u64,
}

impl Iterator for PostselectedBranchIter<'_> {
    type Item = Result<(Branch, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let free = branch_bits(self.next, self.branches.free_count);
        self.next += 1;
        let full = self.branches.expand(&free);
        Some(self.branches.plan.evaluate(&full).map(|value| (free, value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.end - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PostselectedBranchIter<'_> {}

impl MeasurementValue {
    /// Every branch with its output, under the default [`Config`].
    ///
    /// # Errors
    ///
    /// [`Error::TooManyBranches`] beyond the configured dependency bound.
    pub fn items(&self) -> Result<Branches<'_>> {
        self.items_with(&Config::default())
    }

    /// # Errors
    ///
    /// [`Error::TooManyBranches`] beyond `config.max_branch_dependencies`.
    pub fn items_with(&self, config: &Config) -> Result<Branches<'_>> {
        check_limit(self.dependency_count(), config)?;
        Ok(Branches { value: self })
    }

    /// Branches over free measurements only; postselected measurements are
    /// held at their required outcome.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyBranches`] if the free dependencies exceed the default bound.
    pub fn postselected_items(&self) -> Result<PostselectedBranches<'_>> {
        self.postselected_items_with(&Config::default())
    }

    /// # Errors
    ///
    /// [`Error::TooManyBranches`] if the free dependencies exceed
    /// `config.max_branch_dependencies`.
    pub fn postselected_items_with(&self, config: &Config) -> Result<PostselectedBranches<'_>> {
        let fixed: SmallVec<[Option<bool>; 8]> = self.measurements().iter().map(|record| record.postselect()).collect();
        let free_count = fixed.iter().filter(|bit| bit.is_none()).count();
        check_limit(free_count, config)?;
        Ok(PostselectedBranches {
            plan: self.plan(),
            fixed,
            free_count,
        })
    }

    /// All branches collected into a map.
    ///
    /// # Errors
    ///
    /// Enumeration bound or evaluation errors.
    pub fn branches(&self) -> Result<BTreeMap<Branch, Value>> {
        self.items()?.iter().collect()
    }

    /// The output on branch `index` without enumerating the others.
    ///
    /// # Errors
    ///
    /// [`Error::BranchIndexOutOfRange`] for `index >= 2^n`, or evaluation errors.
    pub fn branch(&self, index: u64) -> Result<Value> {
        let width = self.dependency_count();
        if width <= MAX_SUPPORTED_BRANCH_DEPENDENCIES && index >> width != 0 {
            return Err(Error::BranchIndexOutOfRange {
                index,
                dependencies: width,
            });
        }
        self.plan().evaluate(&branch_bits(index, width))
    }
}

/// One `if id=bit,... => output` line per branch.
///
/// Values beyond the enumeration bound render as a one-line summary
/// instead; the refusal is logged as a warning.
impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(items) = self.items() else {
            return write!(f, "MeasurementValue over {} measurements", self.dependency_count());
        };
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let (branch, value) = match item {
                Ok((branch, value)) => (branch, value.to_string()),
                Err(error) => (branch_bits(index as u64, self.dependency_count()), format!("<{error}>")),
            };
            let assignments: Vec<String> = self
                .measurements()
                .iter()
                .zip(branch.iter())
                .map(|(record, bit)| format!("{}={}", record.id(), u8::from(*bit)))
                .collect();
            write!(f, "if {} => {value}", assignments.join(","))?;
        }
        Ok(())
    }
}
