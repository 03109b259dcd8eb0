//! Standard lookup operators from Django.
//!
//! These have short names, matching their Django names, which appear
//! as the trailing `__`-separated token of a clause key. The operator
//! decides how the right hand side of a clause is decoded:
//!
//! [`Operator`]             | Token       | Right hand side
//! -------------------------|-------------|-----------------------------
//! [`Exact`](Operator::Exact)         | `exact`     | scalar
//! [`IExact`](Operator::IExact)       | `iexact`    | scalar
//! [`IsNull`](Operator::IsNull)       | `isnull`    | `true` or `false`
//! [`Contains`](Operator::Contains)   | `contains`  | scalar
//! [`IContains`](Operator::IContains) | `icontains` | scalar
//! [`Greater`](Operator::Greater)     | `gt`        | scalar
//! [`GreaterEq`](Operator::GreaterEq) | `gte`       | scalar
//! [`Less`](Operator::Less)           | `lt`        | scalar
//! [`LessEq`](Operator::LessEq)       | `lte`       | scalar
//! [`In`](Operator::In)               | `in`        | list
//! [`Range`](Operator::Range)         | `range`     | list of two

use std::str::FromStr;

use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The separator between path segments and the operator in a clause key.
pub const LOOKUP_SEP: &str = "__";

/// One of the built-in lookup operators.
///
/// ```rust
/// use queryset_cmd::operators::Operator;
/// use strum::IntoEnumIterator;
///
/// for op in Operator::iter() {
///     assert_eq!(op.to_string().parse::<Operator>().unwrap(), op);
/// }
/// assert_eq!("gte".parse::<Operator>().unwrap(), Operator::GreaterEq);
/// assert!("year".parse::<Operator>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString)]
pub enum Operator {
    #[strum(serialize = "exact")]
    Exact,
    #[strum(serialize = "iexact")]
    IExact,
    #[strum(serialize = "isnull")]
    IsNull,
    #[strum(serialize = "contains")]
    Contains,
    #[strum(serialize = "icontains")]
    IContains,
    #[strum(serialize = "gt")]
    Greater,
    #[strum(serialize = "gte")]
    GreaterEq,
    #[strum(serialize = "lt")]
    Less,
    #[strum(serialize = "lte")]
    LessEq,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "range")]
    Range,
}

impl Default for Operator {
    fn default() -> Self {
        Operator::Exact
    }
}

impl Operator {
    /// Whether the right hand side is decoded as a list of values.
    pub fn is_iterable(&self) -> bool {
        matches!(self, Operator::In | Operator::Range)
    }
}

/// A clause key broken into its field path and operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<'a> {
    pub path: Vec<&'a str>,
    pub operator: Operator,
}

impl<'a> Lookup<'a> {
    /// Split a clause key such as `user__username__icontains`.
    ///
    /// A trailing token that names an operator is consumed as the
    /// operator. Otherwise the whole key is the field path and the
    /// operator is `exact`, so `user__username` and `age__gt` are
    /// told apart without consulting the schema.
    ///
    /// ```rust
    /// use queryset_cmd::operators::{Lookup, Operator};
    ///
    /// let l = Lookup::split("age__gt");
    /// assert_eq!(l.path, vec!["age"]);
    /// assert_eq!(l.operator, Operator::Greater);
    ///
    /// let l = Lookup::split("user__username");
    /// assert_eq!(l.path, vec!["user", "username"]);
    /// assert_eq!(l.operator, Operator::Exact);
    /// ```
    pub fn split(key: &'a str) -> Self {
        let mut path = key.split(LOOKUP_SEP).collect::<Vec<_>>();
        let operator = match path.last() {
            Some(&"") if path.len() > 1 => {
                path.pop();
                Operator::Exact
            }
            Some(last) => match Operator::from_str(last) {
                Ok(op) if path.len() > 1 => {
                    path.pop();
                    op
                }
                _ => Operator::default(),
            },
            None => Operator::default(),
        };
        Self { path, operator }
    }

    /// The fully qualified key, always carrying an explicit operator.
    pub fn qualified(&self) -> String {
        format!("{}{}{}", self.path.join(LOOKUP_SEP), LOOKUP_SEP, self.operator)
    }
}
