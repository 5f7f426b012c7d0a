//! Concrete outputs of measurement-value post-processing and the operators on them.
//!
//! Measurement bits enter as `Int(0)` or `Int(1)`. Arithmetic promotes
//! `Bool` < `Int` < `Float`, logical and comparison operators produce `Bool`,
//! and true division always produces `Float`.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Tuple(Arc<[Value]>),
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl Value {
    #[must_use]
    pub fn bit(bit: bool) -> Self {
        Value::Int(i64::from(bit))
    }

    #[must_use]
    pub fn pair(first: Value, second: Value) -> Self {
        Value::Tuple(Arc::from([first, second]))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Truthiness used by the logical operators: non-zero numbers and non-empty tuples.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Tuple(items) => !items.is_empty(),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self.numeric()? {
            Numeric::Int(value) => Some(value as f64),
            Numeric::Float(value) => Some(value),
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Bool(value) => Some(Numeric::Int(i64::from(*value))),
            Value::Int(value) => Some(Numeric::Int(*value)),
            Value::Float(value) => Some(Numeric::Float(*value)),
            Value::Tuple(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Tuple(lhs), Value::Tuple(rhs)) => lhs == rhs,
            (Value::Tuple(_), _) | (_, Value::Tuple(_)) => false,
            _ => compare_numbers(self, other) == Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) if value.fract() == 0.0 && value.is_finite() => write!(f, "{value:.1}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

#[allow(clippy::cast_precision_loss)]
fn compare_numbers(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs.numeric()?, rhs.numeric()?) {
        (Numeric::Int(lhs), Numeric::Int(rhs)) => Some(lhs.cmp(&rhs)),
        (Numeric::Int(lhs), Numeric::Float(rhs)) => (lhs as f64).partial_cmp(&rhs),
        (Numeric::Float(lhs), Numeric::Int(rhs)) => lhs.partial_cmp(&(rhs as f64)),
        (Numeric::Float(lhs), Numeric::Float(rhs)) => lhs.partial_cmp(&rhs),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl UnaryOp {
    pub(crate) fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
        }
    }

    /// # Errors
    ///
    /// Negating a tuple, or `i64::MIN`.
    pub fn evaluate(self, operand: &Value) -> Result<Value> {
        match self {
            UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
            UnaryOp::Neg => match operand.numeric() {
                Some(Numeric::Int(value)) => value
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or(Error::Overflow { op: self.name() }),
                Some(Numeric::Float(value)) => Ok(Value::Float(-value)),
                None => Err(Error::TypeMismatch {
                    op: self.name(),
                    lhs: operand.type_name(),
                    rhs: operand.type_name(),
                }),
            },
        }
    }
}

impl BinaryOp {
    pub(crate) fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    /// # Errors
    ///
    /// Arithmetic or ordering on tuples, integer division by zero and integer overflow.
    pub fn evaluate(self, lhs: &Value, rhs: &Value) -> Result<Value> {
        match self {
            BinaryOp::Eq => Ok(Value::Bool(lhs == rhs)),
            BinaryOp::Ne => Ok(Value::Bool(lhs != rhs)),
            BinaryOp::And => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
            BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() || rhs.is_truthy())),
            BinaryOp::Xor => Ok(Value::Bool(lhs.is_truthy() != rhs.is_truthy())),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lhs.numeric().is_none() || rhs.numeric().is_none() {
                    return Err(Error::TypeMismatch {
                        op: self.name(),
                        lhs: lhs.type_name(),
                        rhs: rhs.type_name(),
                    });
                }
                let ordering = compare_numbers(lhs, rhs);
                Ok(Value::Bool(match (self, ordering) {
                    (_, None) => false,
                    (BinaryOp::Lt, Some(ordering)) => ordering.is_lt(),
                    (BinaryOp::Le, Some(ordering)) => ordering.is_le(),
                    (BinaryOp::Gt, Some(ordering)) => ordering.is_gt(),
                    (_, Some(ordering)) => ordering.is_ge(),
                }))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.arithmetic(lhs, rhs)
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn arithmetic(self, lhs: &Value, rhs: &Value) -> Result<Value> {
        let mismatch = || Error::TypeMismatch {
            op: self.name(),
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        };
        let (lhs_num, rhs_num) = (lhs.numeric().ok_or_else(mismatch)?, rhs.numeric().ok_or_else(mismatch)?);
        let overflow = Error::Overflow { op: self.name() };
        match (lhs_num, rhs_num) {
            (Numeric::Int(a), Numeric::Int(b)) => match self {
                BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(overflow),
                BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(overflow),
                BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(overflow),
                BinaryOp::Div if b == 0 => Err(Error::DivisionByZero),
                BinaryOp::Div => Ok(Value::Float(a as f64 / b as f64)),
                _ if b == 0 => Err(Error::DivisionByZero),
                // floored remainder: the result takes the divisor's sign.
                // `i64::MIN % -1` wraps to the exact answer, 0.
                _ => {
                    let remainder = a.wrapping_rem(b);
                    Ok(Value::Int(if remainder != 0 && (remainder < 0) != (b < 0) {
                        remainder + b
                    } else {
                        remainder
                    }))
                }
            },
            (lhs_num, rhs_num) => {
                let to_float = |number: Numeric| match number {
                    Numeric::Int(value) => value as f64,
                    Numeric::Float(value) => value,
                };
                let (a, b) = (to_float(lhs_num), to_float(rhs_num));
                match self {
                    BinaryOp::Add => Ok(Value::Float(a + b)),
                    BinaryOp::Sub => Ok(Value::Float(a - b)),
                    BinaryOp::Mul => Ok(Value::Float(a * b)),
                    BinaryOp::Div if b == 0.0 => Err(Error::DivisionByZero),
                    BinaryOp::Div => Ok(Value::Float(a / b)),
                    _ if b == 0.0 => Err(Error::DivisionByZero),
                    _ => Ok(Value::Float(a - b * (a / b).floor())),
                }
            }
        }
    }
}
