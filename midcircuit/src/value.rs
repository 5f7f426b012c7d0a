//! Symbolic measurement values.
//!
//! A [`MeasurementValue`] is a deferred computation over the outcomes of an
//! identity-sorted, duplicate-free list of mid-circuit measurements. Values are
//! immutable; every operator returns a new value and leaves its inputs usable.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, OnceLock};

use sorted_iter::assume::AssumeSortedByItemExt;
use sorted_iter::SortedIterator;

use crate::error::{Error, Result};
use crate::plan::{Node, Plan};
use crate::record::{MidMeasure, QubitId};
use crate::scalar::{BinaryOp, UnaryOp, Value};

/// Source of concrete outcomes for [`MeasurementValue::concretize`].
pub trait OutcomeLookup {
    fn outcome(&self, record: &MidMeasure) -> Option<bool>;
}

impl OutcomeLookup for HashMap<MidMeasure, bool> {
    fn outcome(&self, record: &MidMeasure) -> Option<bool> {
        self.get(record).copied()
    }
}

impl OutcomeLookup for BTreeMap<MidMeasure, bool> {
    fn outcome(&self, record: &MidMeasure) -> Option<bool> {
        self.get(record).copied()
    }
}

impl<Lookup: OutcomeLookup + ?Sized> OutcomeLookup for &Lookup {
    fn outcome(&self, record: &MidMeasure) -> Option<bool> {
        (**self).outcome(record)
    }
}

struct Inner {
    dependencies: Arc<[MidMeasure]>,
    root: Arc<Node>,
    plan: OnceLock<Plan>,
}

#[derive(Clone)]
#[must_use]
pub struct MeasurementValue(Arc<Inner>);

/// Right-hand side of a binary combinator.
#[derive(Clone)]
pub enum Operand {
    Value(Value),
    Measurement(MeasurementValue),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Value(value.into())
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Value(value.into())
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Value(value.into())
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Value(value.into())
    }
}

impl From<MeasurementValue> for Operand {
    fn from(value: MeasurementValue) -> Self {
        Operand::Measurement(value)
    }
}

impl From<&MeasurementValue> for Operand {
    fn from(value: &MeasurementValue) -> Self {
        Operand::Measurement(value.clone())
    }
}

impl Operand {
    fn into_parts(self) -> (Arc<[MidMeasure]>, Arc<Node>) {
        match self {
            Operand::Value(value) => (Arc::from([]), Node::constant(value)),
            Operand::Measurement(value) => (value.0.dependencies.clone(), value.0.root.clone()),
        }
    }
}

/// Perform a mid-circuit measurement of a single qubit and return its outcome
/// as a symbolic value.
///
/// # Errors
///
/// See [`MidMeasure::new`].
pub fn measure(wires: &[QubitId], reset: bool, postselect: Option<u8>) -> Result<MeasurementValue> {
    MidMeasure::new(wires, reset, postselect).map(MeasurementValue::from_record)
}

/// Identity-ordered union of two sorted dependency lists.
fn union_dependencies(first: &Arc<[MidMeasure]>, second: &Arc<[MidMeasure]>) -> Arc<[MidMeasure]> {
    if second.is_empty() || Arc::ptr_eq(first, second) {
        return first.clone();
    }
    if first.is_empty() {
        return second.clone();
    }
    first
        .iter()
        .cloned()
        .assume_sorted_by_item()
        .union(second.iter().cloned().assume_sorted_by_item())
        .collect()
}

impl MeasurementValue {
    fn from_parts(dependencies: Arc<[MidMeasure]>, root: Arc<Node>) -> Self {
        debug_assert!(dependencies.windows(2).all(|pair| pair[0] < pair[1]));
        MeasurementValue(Arc::new(Inner {
            dependencies,
            root,
            plan: OnceLock::new(),
        }))
    }

    /// The outcome of `record` itself.
    pub fn from_record(record: MidMeasure) -> Self {
        Self::from_parts(Arc::from([record.clone()]), Node::bit(record))
    }

    /// The measurements this value depends on, sorted by identity.
    #[must_use]
    pub fn measurements(&self) -> &[MidMeasure] {
        &self.0.dependencies
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.0.dependencies.len()
    }

    /// Measured wires, one per dependency in dependency order.
    #[must_use]
    pub fn wires(&self) -> Vec<QubitId> {
        self.0.dependencies.iter().map(MidMeasure::target).collect()
    }

    /// Same computation with every dependency retargeted through `wire_map`.
    pub fn map_wires(&self, wire_map: &HashMap<QubitId, QubitId>) -> Self {
        let dependencies = self.0.dependencies.iter().map(|record| record.map_wires(wire_map)).collect();
        Self::from_parts(dependencies, self.0.root.clone())
    }

    pub(crate) fn plan(&self) -> &Plan {
        self.0.plan.get_or_init(|| Plan::compile(&self.0.root, &self.0.dependencies))
    }

    /// Post-process with an arbitrary pure function.
    pub fn apply<F>(&self, function: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::from_parts(self.0.dependencies.clone(), Node::map(Arc::new(function), self.0.root.clone()))
    }

    pub fn unary(&self, op: UnaryOp) -> Self {
        Self::from_parts(self.0.dependencies.clone(), Node::unary(op, self.0.root.clone()))
    }

    /// `op(self, other)`. A symbolic `other` is merged first.
    pub fn combine(&self, other: impl Into<Operand>, op: BinaryOp) -> Self {
        match other.into() {
            Operand::Value(value) => Self::from_parts(
                self.0.dependencies.clone(),
                Node::binary(op, self.0.root.clone(), Node::constant(value)),
            ),
            Operand::Measurement(other) => {
                let dependencies = self.merged_dependencies(&other);
                Self::from_parts(dependencies, Node::binary(op, self.0.root.clone(), other.0.root.clone()))
            }
        }
    }

    /// `op(lhs, self)` for a plain left operand.
    pub fn rcombine(&self, lhs: impl Into<Value>, op: BinaryOp) -> Self {
        Self::from_parts(
            self.0.dependencies.clone(),
            Node::binary(op, Node::constant(lhs.into()), self.0.root.clone()),
        )
    }

    fn merged_dependencies(&self, other: &MeasurementValue) -> Arc<[MidMeasure]> {
        let dependencies = union_dependencies(&self.0.dependencies, &other.0.dependencies);
        tracing::trace!(
            lhs = self.0.dependencies.len(),
            rhs = other.0.dependencies.len(),
            merged = dependencies.len(),
            "merged measurement dependencies"
        );
        dependencies
    }

    /// A value over the union of both dependency lists producing the pair
    /// `(self, other)`.
    pub fn merge(&self, other: &MeasurementValue) -> Self {
        let dependencies = self.merged_dependencies(other);
        Self::from_parts(dependencies, Node::pair(self.0.root.clone(), other.0.root.clone()))
    }

    /// `on_true` where `predicate` holds, `on_false` elsewhere. Evaluation
    /// errors of the arm not taken are discarded.
    pub fn select(predicate: &MeasurementValue, on_true: impl Into<Operand>, on_false: impl Into<Operand>) -> Self {
        let (true_dependencies, true_root) = on_true.into().into_parts();
        let (false_dependencies, false_root) = on_false.into().into_parts();
        let dependencies = union_dependencies(
            &union_dependencies(&predicate.0.dependencies, &true_dependencies),
            &false_dependencies,
        );
        Self::from_parts(dependencies, Node::select(predicate.0.root.clone(), true_root, false_root))
    }

    pub fn logical_not(&self) -> Self {
        self.unary(UnaryOp::Not)
    }

    pub fn logical_and(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::And)
    }

    pub fn logical_or(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Or)
    }

    pub fn logical_xor(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Xor)
    }

    pub fn equal(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Eq)
    }

    pub fn not_equal(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Ne)
    }

    pub fn less(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Lt)
    }

    pub fn less_equal(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Le)
    }

    pub fn greater(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Gt)
    }

    pub fn greater_equal(&self, other: impl Into<Operand>) -> Self {
        self.combine(other, BinaryOp::Ge)
    }

    /// Always fails: a measurement value has no truth value until its
    /// outcomes are known.
    ///
    /// # Errors
    ///
    /// Always [`Error::AmbiguousTruthValue`].
    pub fn truth_value(&self) -> Result<bool> {
        Err(Error::AmbiguousTruthValue)
    }

    /// Evaluate on concrete outcomes for every dependency.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOutcome`] for the first dependency `outcomes` lacks, or
    /// any evaluation error of the composed operators.
    pub fn concretize(&self, outcomes: &impl OutcomeLookup) -> Result<Value> {
        let bits = self
            .0
            .dependencies
            .iter()
            .map(|record| {
                outcomes
                    .outcome(record)
                    .ok_or_else(|| Error::MissingOutcome { id: record.id().clone() })
            })
            .collect::<Result<Vec<bool>>>()?;
        self.plan().evaluate(&bits)
    }

    /// Evaluate on one bit per dependency, in dependency order.
    ///
    /// # Errors
    ///
    /// [`Error::BitCountMismatch`] if `bits` has the wrong length, or any
    /// evaluation error of the composed operators.
    pub fn concretize_bits(&self, bits: &[bool]) -> Result<Value> {
        if bits.len() != self.0.dependencies.len() {
            return Err(Error::BitCountMismatch {
                expected: self.0.dependencies.len(),
                actual: bits.len(),
            });
        }
        self.plan().evaluate(bits)
    }
}

impl TryFrom<&MeasurementValue> for bool {
    type Error = Error;

    fn try_from(value: &MeasurementValue) -> Result<bool> {
        value.truth_value()
    }
}

impl fmt::Debug for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasurementValue(wires={:?})", self.wires())
    }
}

impl From<MidMeasure> for MeasurementValue {
    fn from(record: MidMeasure) -> Self {
        MeasurementValue::from_record(record)
    }
}

macro_rules! unary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait for MeasurementValue {
            type Output = MeasurementValue;
            fn $method(self) -> MeasurementValue {
                self.unary($op)
            }
        }

        impl std::ops::$trait for &MeasurementValue {
            type Output = MeasurementValue;
            fn $method(self) -> MeasurementValue {
                self.unary($op)
            }
        }
    };
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<Rhs: Into<Operand>> std::ops::$trait<Rhs> for MeasurementValue {
            type Output = MeasurementValue;
            fn $method(self, rhs: Rhs) -> MeasurementValue {
                self.combine(rhs, $op)
            }
        }

        impl<Rhs: Into<Operand>> std::ops::$trait<Rhs> for &MeasurementValue {
            type Output = MeasurementValue;
            fn $method(self, rhs: Rhs) -> MeasurementValue {
                self.combine(rhs, $op)
            }
        }

        binary_operator!(@reflected $trait, $method, $op, bool);
        binary_operator!(@reflected $trait, $method, $op, i32);
        binary_operator!(@reflected $trait, $method, $op, i64);
        binary_operator!(@reflected $trait, $method, $op, f64);
    };
    (@reflected $trait:ident, $method:ident, $op:expr, $scalar:ty) => {
        impl std::ops::$trait<MeasurementValue> for $scalar {
            type Output = MeasurementValue;
            fn $method(self, rhs: MeasurementValue) -> MeasurementValue {
                rhs.rcombine(self, $op)
            }
        }

        impl std::ops::$trait<&MeasurementValue> for $scalar {
            type Output = MeasurementValue;
            fn $method(self, rhs: &MeasurementValue) -> MeasurementValue {
                rhs.rcombine(self, $op)
            }
        }
    };
}

unary_operator!(Not, not, UnaryOp::Not);
unary_operator!(Neg, neg, UnaryOp::Neg);

binary_operator!(Add, add, BinaryOp::Add);
binary_operator!(Sub, sub, BinaryOp::Sub);
binary_operator!(Mul, mul, BinaryOp::Mul);
binary_operator!(Div, div, BinaryOp::Div);
binary_operator!(Rem, rem, BinaryOp::Rem);
binary_operator!(BitAnd, bitand, BinaryOp::And);
binary_operator!(BitOr, bitor, BinaryOp::Or);
binary_operator!(BitXor, bitxor, BinaryOp::Xor);

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: &str) -> MeasurementValue {
        MeasurementValue::from_record(MidMeasure::with_id(id, &[0], false, None).unwrap())
    }

    fn ids(value: &MeasurementValue) -> Vec<String> {
        value.measurements().iter().map(|record| record.id().to_string()).collect()
    }

    // ========== Construction ==========

    #[test]
    fn from_record_is_identity() {
        let m = value("a");
        assert_eq!(m.concretize_bits(&[false]).unwrap(), Value::Int(0));
        assert_eq!(m.concretize_bits(&[true]).unwrap(), Value::Int(1));
    }

    #[test]
    fn measure_validates_wires() {
        assert_eq!(measure(&[0, 1], false, None).unwrap_err(), Error::InvalidTarget { count: 2 });
        let m = measure(&[5], true, Some(0)).unwrap();
        assert_eq!(m.wires(), vec![5]);
        assert!(m.measurements()[0].reset());
    }

    #[test]
    fn truth_value_is_always_an_error() {
        let m = value("a");
        assert_eq!(m.truth_value(), Err(Error::AmbiguousTruthValue));
        assert_eq!(bool::try_from(&m), Err(Error::AmbiguousTruthValue));
        assert_eq!(bool::try_from(&(m.clone() & true)), Err(Error::AmbiguousTruthValue));
    }

    // ========== Composition ==========

    #[test]
    fn scalar_operands_keep_dependencies() {
        let m = value("a");
        let shifted = &m + 2;
        assert_eq!(ids(&shifted), vec!["a"]);
        assert_eq!(shifted.concretize_bits(&[true]).unwrap(), Value::Int(3));
        let reflected = 10_i32 - &m;
        assert_eq!(reflected.concretize_bits(&[true]).unwrap(), Value::Int(9));
    }

    #[test]
    fn composition_leaves_inputs_untouched() {
        let m = value("a");
        let negated = !&m;
        assert_eq!(m.concretize_bits(&[true]).unwrap(), Value::Int(1));
        assert_eq!(negated.concretize_bits(&[true]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn apply_post_processes() {
        let m = value("a");
        let doubled = m.apply(|v| Value::Float(v.as_f64().unwrap_or_default() * 2.5));
        assert_eq!(doubled.concretize_bits(&[true]).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn merge_sorts_and_deduplicates() {
        let (a, b, c) = (value("a"), value("b"), value("c"));
        let left = c.merge(&a);
        assert_eq!(ids(&left), vec!["a", "c"]);
        let both = left.merge(&(&b + &a));
        assert_eq!(ids(&both), vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_pairs_sub_results() {
        let (a, b) = (value("a"), value("b"));
        let merged = b.merge(&!&a);
        assert_eq!(
            merged.concretize_bits(&[true, false]).unwrap(),
            Value::pair(Value::Int(0), Value::Bool(false))
        );
    }

    #[test]
    fn merge_is_order_independent() {
        let (a, b, c) = (value("a"), value("b"), value("c"));
        assert_eq!(ids(&a.merge(&b).merge(&c)), ids(&b.merge(&c).merge(&a)));
        assert_eq!(ids(&a.merge(&b)), ids(&b.merge(&a)));
    }

    #[test]
    fn remapped_copies_merge_as_one() {
        let a = value("a");
        let remapped = a.map_wires(&HashMap::from([(0, 3)]));
        assert_eq!(remapped.wires(), vec![3]);
        let merged = &a + &remapped;
        assert_eq!(merged.dependency_count(), 1);
        assert_eq!(merged.concretize_bits(&[true]).unwrap(), Value::Int(2));
    }

    #[test]
    fn and_over_two_measurements() {
        let conjunction = value("a") & value("b");
        let expected = [(false, false, false), (false, true, false), (true, false, false), (true, true, true)];
        for (first, second, result) in expected {
            assert_eq!(conjunction.concretize_bits(&[first, second]).unwrap(), Value::Bool(result));
        }
    }

    #[test]
    fn comparisons() {
        let sum = value("a") + value("b");
        let at_least_one = sum.greater_equal(1);
        assert_eq!(at_least_one.concretize_bits(&[false, false]).unwrap(), Value::Bool(false));
        assert_eq!(at_least_one.concretize_bits(&[false, true]).unwrap(), Value::Bool(true));
        assert_eq!(sum.equal(2).concretize_bits(&[true, true]).unwrap(), Value::Bool(true));
        assert_eq!(sum.less(value("c")).concretize_bits(&[false, false, true]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn select_merges_all_operands() {
        let (a, b) = (value("a"), value("b"));
        let chosen = MeasurementValue::select(&a, &b, 7);
        assert_eq!(ids(&chosen), vec!["a", "b"]);
        assert_eq!(chosen.concretize_bits(&[true, true]).unwrap(), Value::Int(1));
        assert_eq!(chosen.concretize_bits(&[false, true]).unwrap(), Value::Int(7));
    }

    #[test]
    fn select_ignores_errors_in_the_rejected_arm() {
        let m = value("a");
        let guarded = MeasurementValue::select(&m, 1 / &m, 0);
        assert_eq!(guarded.concretize_bits(&[true]).unwrap(), Value::Float(1.0));
        assert_eq!(guarded.concretize_bits(&[false]).unwrap(), Value::Int(0));
        assert!(guarded.items().unwrap().iter().all(|item| item.is_ok()));

        let unguarded = MeasurementValue::select(&m, 0, 1 / &m);
        assert_eq!(unguarded.concretize_bits(&[false]), Err(Error::DivisionByZero));
    }

    // ========== Concretize ==========

    #[test]
    fn concretize_looks_up_by_identity() {
        let a = MidMeasure::with_id("a", &[0], false, None).unwrap();
        let b = MidMeasure::with_id("b", &[1], false, None).unwrap();
        let difference = MeasurementValue::from(b.clone()) - MeasurementValue::from(a.clone());
        let outcomes = HashMap::from([(a.map_wires(&HashMap::from([(0, 9)])), true), (b, false)]);
        assert_eq!(difference.concretize(&outcomes).unwrap(), Value::Int(-1));
    }

    #[test]
    fn concretize_reports_missing_outcomes() {
        let a = MidMeasure::with_id("a", &[0], false, None).unwrap();
        let value = value("b") | MeasurementValue::from(a.clone());
        let outcomes = HashMap::from([(a, true)]);
        assert_eq!(value.concretize(&outcomes), Err(Error::MissingOutcome { id: "b".into() }));
    }

    #[test]
    fn concretize_bits_checks_length() {
        assert_eq!(
            value("a").concretize_bits(&[true, false]),
            Err(Error::BitCountMismatch { expected: 1, actual: 2 })
        );
    }

    #[test]
    fn long_chains_evaluate() {
        let a = value("a");
        let b = value("b");
        let mut accumulated = a.clone();
        for index in 0..10_000 {
            accumulated = if index % 2 == 0 { &accumulated ^ &b } else { &accumulated + 0 };
        }
        assert_eq!(accumulated.dependency_count(), 2);
        assert_eq!(accumulated.concretize_bits(&[true, true]).unwrap(), Value::Int(1));
    }

    #[test]
    fn debug_lists_wires() {
        let m = measure(&[4], false, None).unwrap();
        assert_eq!(format!("{m:?}"), "MeasurementValue(wires=[4])");
    }
}
