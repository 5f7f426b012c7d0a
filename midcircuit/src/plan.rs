//! Expression DAG behind a measurement value and its flat evaluation plan.
//!
//! Composition only allocates a node pointing at existing nodes, so repeated
//! composition shares structure instead of wrapping closures. A value compiles
//! its DAG once into a post-ordered list of [`Step`]s over a slot vector;
//! shared sub-expressions get a single step. Compilation, evaluation and drop
//! are all iterative, so long composition chains never deepen the call stack.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};
use crate::record::MidMeasure;
use crate::scalar::{BinaryOp, UnaryOp, Value};

pub(crate) type MapFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub(crate) enum NodeOp {
    /// The outcome of one measurement, as `Int(0|1)`.
    Bit(MidMeasure),
    Const(Value),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Pair,
    /// Inputs: predicate, value if truthy, value otherwise.
    Select,
    Map(MapFn),
}

pub(crate) struct Node {
    op: NodeOp,
    inputs: SmallVec<[Arc<Node>; 3]>,
}

impl Node {
    pub fn bit(record: MidMeasure) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Bit(record),
            inputs: SmallVec::new(),
        })
    }

    pub fn constant(value: Value) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Const(value),
            inputs: SmallVec::new(),
        })
    }

    pub fn unary(op: UnaryOp, operand: Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Unary(op),
            inputs: smallvec![operand],
        })
    }

    pub fn binary(op: BinaryOp, lhs: Arc<Node>, rhs: Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Binary(op),
            inputs: smallvec![lhs, rhs],
        })
    }

    pub fn pair(first: Arc<Node>, second: Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Pair,
            inputs: smallvec![first, second],
        })
    }

    pub fn select(predicate: Arc<Node>, on_true: Arc<Node>, on_false: Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Select,
            inputs: smallvec![predicate, on_true, on_false],
        })
    }

    pub fn map(function: MapFn, operand: Arc<Node>) -> Arc<Node> {
        Arc::new(Node {
            op: NodeOp::Map(function),
            inputs: smallvec![operand],
        })
    }
}

// Dropping a long chain recursively would overflow the stack.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending: Vec<Arc<Node>> = self.inputs.drain(..).collect();
        while let Some(node) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                pending.extend(node.inputs.drain(..));
            }
        }
    }
}

#[derive(Clone)]
enum Step {
    Load(usize),
    Missing(MidMeasure),
    Const(Value),
    Unary(UnaryOp, usize),
    Binary(BinaryOp, usize, usize),
    Pair(usize, usize),
    Select(usize, usize, usize),
    Map(MapFn, usize),
}

/// Post-ordered steps; the last step produces the output.
#[derive(Clone)]
pub(crate) struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// `dependencies` must be sorted, which every measurement value guarantees.
    pub fn compile(root: &Arc<Node>, dependencies: &[MidMeasure]) -> Plan {
        let mut slots: HashMap<*const Node, usize> = HashMap::new();
        let mut steps = Vec::new();
        let mut stack: Vec<(&Arc<Node>, bool)> = vec![(root, false)];

        while let Some((node, inputs_done)) = stack.pop() {
            let key = Arc::as_ptr(node);
            if slots.contains_key(&key) {
                continue;
            }
            if !inputs_done {
                stack.push((node, true));
                for input in node.inputs.iter().rev() {
                    if !slots.contains_key(&Arc::as_ptr(input)) {
                        stack.push((input, false));
                    }
                }
                continue;
            }
            let slot = |index: usize| slots[&Arc::as_ptr(&node.inputs[index])];
            let step = match &node.op {
                NodeOp::Bit(record) => match dependencies.binary_search(record) {
                    Ok(position) => Step::Load(position),
                    Err(_) => Step::Missing(record.clone()),
                },
                NodeOp::Const(value) => Step::Const(value.clone()),
                NodeOp::Unary(op) => Step::Unary(*op, slot(0)),
                NodeOp::Binary(op) => Step::Binary(*op, slot(0), slot(1)),
                NodeOp::Pair => Step::Pair(slot(0), slot(1)),
                NodeOp::Select => Step::Select(slot(0), slot(1), slot(2)),
                NodeOp::Map(function) => Step::Map(function.clone(), slot(0)),
            };
            slots.insert(key, steps.len());
            steps.push(step);
        }

        tracing::debug!(steps = steps.len(), dependencies = dependencies.len(), "compiled evaluation plan");
        Plan { steps }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Evaluate on one bit per dependency, in dependency order.
    ///
    /// A failing step only fails the output if a later step consumes it.
    /// `Select` consumes its predicate and the chosen arm, so an error in the
    /// arm it rejects is discarded.
    pub fn evaluate(&self, bits: &[bool]) -> Result<Value> {
        let mut slots: Vec<Result<Value>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let input = |index: usize| slots[index].as_ref().map_err(Clone::clone);
            let value = match step {
                Step::Load(position) => Ok(Value::bit(bits[*position])),
                Step::Missing(record) => Err(Error::MissingOutcome { id: record.id().clone() }),
                Step::Const(value) => Ok(value.clone()),
                Step::Unary(op, operand) => input(*operand).and_then(|operand| op.evaluate(operand)),
                Step::Binary(op, lhs, rhs) => {
                    input(*lhs).and_then(|lhs| input(*rhs).and_then(|rhs| op.evaluate(lhs, rhs)))
                }
                Step::Pair(first, second) => {
                    input(*first).and_then(|first| input(*second).map(|second| Value::pair(first.clone(), second.clone())))
                }
                Step::Select(predicate, on_true, on_false) => input(*predicate).and_then(|predicate| {
                    if predicate.is_truthy() {
                        slots[*on_true].clone()
                    } else {
                        slots[*on_false].clone()
                    }
                }),
                Step::Map(function, operand) => input(*operand).map(|operand| function(operand)),
            };
            slots.push(value);
        }
        slots.pop().unwrap_or_else(|| Ok(Value::Tuple(Arc::from([]))))
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan").field("steps", &self.steps.len()).finish()
    }
}
