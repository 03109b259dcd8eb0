//! In-memory implementations of the standard operators.
//!
//! These are used by [`MemoryQuerySet`](crate::queryset::MemoryQuerySet)
//! to evaluate a resolved lookup against stored values. Each
//! [`Operator`] has a [`Condition`] implementation which is created
//! from the typed right hand side by [`instantiate`]:
//!
//! [`Condition`]      | [`Operator`]                   | Right hand side
//! -------------------|--------------------------------|----------------
//! [`ExactImpl`]      | [`Exact`](Operator::Exact)         | any
//! [`IExactImpl`]     | [`IExact`](Operator::IExact)       | any
//! [`IsNullImpl`]     | [`IsNull`](Operator::IsNull)       | bool
//! [`ContainsImpl`]   | [`Contains`](Operator::Contains)   | any
//! [`IContainsImpl`]  | [`IContains`](Operator::IContains) | any
//! [`CompareImpl`]    | `gt`, `gte`, `lt`, `lte`           | any
//! [`InImpl`]         | [`In`](Operator::In)               | list
//! [`RangeImpl`]      | [`Range`](Operator::Range)         | list of two

use std::cmp::Ordering;

use thiserror::Error;

use crate::operators::Operator;
use crate::value::Value;

/// Errors produced when a right hand side does not suit its operator.
#[derive(Debug, Error)]
pub enum ConditionError {
    #[error("operator '{operator}' cannot take {value}")]
    BadOperand { operator: Operator, value: String },
}

/// Take a single value and produce a true/false result.
///
/// Conditions are applied by [`evaluate`], which distributes them over
/// lists and handles nulls, so the conditions themselves can be naive
/// about both. For conditions that need to know about those cases,
/// there are [`empty_collection`](Condition::empty_collection) and
/// [`null_value`](Condition::null_value), which both return `false` by
/// default.
pub trait Condition {
    /// Apply this condition to a single non-null value.
    fn apply(&self, value: &Value) -> bool;
    /// The result for an empty list of values. Conditions are
    /// distributed over lists with `any` semantics, so `false` is
    /// consistent with that.
    fn empty_collection(&self) -> bool {
        false
    }
    /// The result for a null value.
    fn null_value(&self) -> bool {
        false
    }
}

/// Apply `cond` to `value`, handling nulls and lists.
pub fn evaluate(cond: &dyn Condition, value: &Value) -> bool {
    match value {
        Value::Null => cond.null_value(),
        Value::List(items) if items.is_empty() => cond.empty_collection(),
        Value::List(items) => items.iter().any(|x| evaluate(cond, x)),
        other => cond.apply(other),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn equal(a: &Value, b: &Value) -> bool {
    a.compare(b) == Some(Ordering::Equal) || a == b
}

/// Match when the value is equal to the target. A null target matches
/// only null values.
pub struct ExactImpl {
    target: Value,
}

impl Condition for ExactImpl {
    fn apply(&self, value: &Value) -> bool {
        equal(value, &self.target)
    }
    fn null_value(&self) -> bool {
        self.target.is_null()
    }
}

/// Match when the string representation of the value is exactly the
/// target, case insensitively.
pub struct IExactImpl {
    target: String,
}

impl Condition for IExactImpl {
    fn apply(&self, value: &Value) -> bool {
        text(value).to_lowercase() == self.target
    }
}

/// Match when there is no value.
pub struct IsNullImpl {
    target: bool,
}

impl Condition for IsNullImpl {
    fn apply(&self, _value: &Value) -> bool {
        !self.target
    }
    fn empty_collection(&self) -> bool {
        self.target
    }
    fn null_value(&self) -> bool {
        self.target
    }
}

/// Match when the string representation of the value contains the target.
pub struct ContainsImpl {
    target: String,
}

impl Condition for ContainsImpl {
    fn apply(&self, value: &Value) -> bool {
        text(value).contains(&self.target)
    }
}

/// Match when the string representation of the value contains the
/// target case insensitively.
pub struct IContainsImpl {
    target: String,
}

impl Condition for IContainsImpl {
    fn apply(&self, value: &Value) -> bool {
        text(value).to_lowercase().contains(&self.target)
    }
}

/// Match when the value compares to the target with one of the
/// accepted orderings. Incomparable values never match.
pub struct CompareImpl {
    target: Value,
    accept: &'static [Ordering],
}

impl Condition for CompareImpl {
    fn apply(&self, value: &Value) -> bool {
        value
            .compare(&self.target)
            .map(|o| self.accept.contains(&o))
            .unwrap_or(false)
    }
}

/// Match when the value is equal to one of the targets.
pub struct InImpl {
    targets: Vec<Value>,
}

impl Condition for InImpl {
    fn apply(&self, value: &Value) -> bool {
        self.targets.iter().any(|t| equal(value, t))
    }
}

/// Match when the value lies between the two targets, inclusively.
pub struct RangeImpl {
    low: Value,
    high: Value,
}

impl Condition for RangeImpl {
    fn apply(&self, value: &Value) -> bool {
        matches!(
            value.compare(&self.low),
            Some(Ordering::Greater | Ordering::Equal)
        ) && matches!(
            value.compare(&self.high),
            Some(Ordering::Less | Ordering::Equal)
        )
    }
}

/// Create the [`Condition`] for `operator` with right hand side `rhs`.
pub fn instantiate(operator: Operator, rhs: &Value) -> Result<Box<dyn Condition>, ConditionError> {
    let bad = || ConditionError::BadOperand {
        operator,
        value: rhs.to_string(),
    };

    let cond: Box<dyn Condition> = match operator {
        Operator::Exact => Box::new(ExactImpl {
            target: rhs.clone(),
        }),
        Operator::IExact => Box::new(IExactImpl {
            target: text(rhs).to_lowercase(),
        }),
        Operator::IsNull => match rhs {
            Value::Bool(target) => Box::new(IsNullImpl { target: *target }),
            _ => return Err(bad()),
        },
        Operator::Contains => Box::new(ContainsImpl { target: text(rhs) }),
        Operator::IContains => Box::new(IContainsImpl {
            target: text(rhs).to_lowercase(),
        }),
        Operator::Greater => Box::new(CompareImpl {
            target: rhs.clone(),
            accept: &[Ordering::Greater],
        }),
        Operator::GreaterEq => Box::new(CompareImpl {
            target: rhs.clone(),
            accept: &[Ordering::Greater, Ordering::Equal],
        }),
        Operator::Less => Box::new(CompareImpl {
            target: rhs.clone(),
            accept: &[Ordering::Less],
        }),
        Operator::LessEq => Box::new(CompareImpl {
            target: rhs.clone(),
            accept: &[Ordering::Less, Ordering::Equal],
        }),
        Operator::In => match rhs {
            Value::List(targets) => Box::new(InImpl {
                targets: targets.clone(),
            }),
            _ => return Err(bad()),
        },
        Operator::Range => match rhs {
            Value::List(bounds) if bounds.len() == 2 => Box::new(RangeImpl {
                low: bounds[0].clone(),
                high: bounds[1].clone(),
            }),
            _ => return Err(bad()),
        },
    };
    Ok(cond)
}
