//! Boolean and scalar expressions.
//!
//! Expressions are plain trees. Literal values always become bound
//! parameters when rendered, so a tree built from untrusted input cannot
//! change the shape of the generated SQL.

use chrono::{DateTime, Utc};

use super::schema::ColumnRef;
use super::value::SqlValue;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `LIKE`
    Like,
}

impl BinaryOp {
    /// Returns the SQL token for this operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Like => "LIKE",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column reference.
    Column(ColumnRef),
    /// A bound literal.
    Value(SqlValue),
    /// A binary comparison.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Conjunction. An empty conjunction is true.
    And(Vec<Expr>),
    /// Disjunction. An empty disjunction is false.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// `expr IS NULL`
    IsNull(Box<Expr>),
    /// `expr IS NOT NULL`
    IsNotNull(Box<Expr>),
    /// `expr [NOT] IN (list)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// `COALESCE(a, b, ...)`
    Coalesce(Vec<Expr>),
    /// `COUNT(*)`
    CountAll,
}

impl Expr {
    fn binary(self, op: BinaryOp, right: impl Into<Expr>) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right.into()),
        }
    }

    /// `self = right`
    pub fn eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, right)
    }

    /// `self <> right`
    pub fn not_eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::NotEq, right)
    }

    /// `self < right`
    pub fn lt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, right)
    }

    /// `self <= right`
    pub fn lt_eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::LtEq, right)
    }

    /// `self > right`
    pub fn gt(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, right)
    }

    /// `self >= right`
    pub fn gt_eq(self, right: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::GtEq, right)
    }

    /// `self LIKE pattern`
    pub fn like(self, pattern: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Like, pattern)
    }

    /// `self IS NULL`
    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    /// `self IS NOT NULL`
    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    /// `self IN (values...)`
    pub fn in_list<I, E>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::InList {
            expr: Box::new(self),
            list: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `self NOT IN (values...)`
    pub fn not_in_list<I, E>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Expr::InList {
            expr: Box::new(self),
            list: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::And(mut left), Expr::And(right)) => {
                left.extend(right);
                Expr::And(left)
            }
            (Expr::And(mut left), right) => {
                left.push(right);
                Expr::And(left)
            }
            (left, Expr::And(mut right)) => {
                right.insert(0, left);
                Expr::And(right)
            }
            (left, right) => Expr::And(vec![left, right]),
        }
    }

    /// `self OR other`
    pub fn or(self, other: Expr) -> Expr {
        match self {
            Expr::Or(mut terms) => {
                terms.push(other);
                Expr::Or(terms)
            }
            left => Expr::Or(vec![left, other]),
        }
    }

    /// `NOT self`
    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    /// Visits every column reference in the tree.
    pub fn for_each_column<'a>(&'a self, f: &mut impl FnMut(&'a ColumnRef)) {
        match self {
            Expr::Column(c) => f(c),
            Expr::Value(_) | Expr::CountAll => {}
            Expr::Binary { left, right, .. } => {
                left.for_each_column(f);
                right.for_each_column(f);
            }
            Expr::And(terms) | Expr::Or(terms) | Expr::Coalesce(terms) => {
                for term in terms {
                    term.for_each_column(f);
                }
            }
            Expr::Not(inner) | Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                inner.for_each_column(f)
            }
            Expr::InList { expr, list, .. } => {
                expr.for_each_column(f);
                for item in list {
                    item.for_each_column(f);
                }
            }
        }
    }
}

/// An unqualified column.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef::bare(name))
}

/// A literal value.
pub fn lit(value: impl Into<SqlValue>) -> Expr {
    Expr::Value(value.into())
}

/// `COALESCE(terms...)`
pub fn coalesce<I>(terms: I) -> Expr
where
    I: IntoIterator<Item = Expr>,
{
    Expr::Coalesce(terms.into_iter().collect())
}

/// ANDs all predicates together, returning `None` when there are none.
pub fn and_all<I>(predicates: I) -> Option<Expr>
where
    I: IntoIterator<Item = Expr>,
{
    predicates.into_iter().reduce(Expr::and)
}

impl From<ColumnRef> for Expr {
    fn from(c: ColumnRef) -> Self {
        Expr::Column(c)
    }
}

impl From<SqlValue> for Expr {
    fn from(v: SqlValue) -> Self {
        Expr::Value(v)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Value(SqlValue::from(s))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Value(SqlValue::from(s))
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Self {
        Expr::Value(SqlValue::from(i))
    }
}

impl From<f64> for Expr {
    fn from(f: f64) -> Self {
        Expr::Value(SqlValue::from(f))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Value(SqlValue::from(b))
    }
}

impl From<DateTime<Utc>> for Expr {
    fn from(dt: DateTime<Utc>) -> Self {
        Expr::Value(SqlValue::from(dt))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Explicit null placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    /// `NULLS FIRST`
    First,
    /// `NULLS LAST`
    Last,
}

/// An `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The sort key.
    pub expr: Expr,
    /// The direction.
    pub direction: SortDirection,
    /// Explicit null placement. Not every dialect can render this.
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    /// Ascending order on `expr`.
    pub fn asc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Asc,
            nulls: None,
        }
    }

    /// Descending order on `expr`.
    pub fn desc(expr: impl Into<Expr>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Desc,
            nulls: None,
        }
    }

    /// Places nulls last.
    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }

    /// Places nulls first.
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let expr = col("a").eq(1i64).and(col("b").eq(2i64)).and(col("c").eq(3i64));
        match expr {
            Expr::And(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_and_all_empty() {
        assert!(and_all(Vec::new()).is_none());
        let single = and_all(vec![col("a").is_null()]).unwrap();
        assert!(matches!(single, Expr::IsNull(_)));
    }

    #[test]
    fn test_for_each_column() {
        let expr = col("a")
            .eq("x")
            .or(col("b").in_list(["1", "2"]))
            .and(coalesce([col("c"), lit(0.0)]).gt(1.0));
        let mut seen = Vec::new();
        expr.for_each_column(&mut |c| seen.push(c.name.clone()));
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
