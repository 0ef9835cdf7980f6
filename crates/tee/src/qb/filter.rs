//! Shared WHERE-clause methods for every builder.

use crate::condition::{Condition, ConditionTree, Logic, Operator};
use crate::value::Value;

/// Fluent predicate methods shared by all query builders and [`Where`].
///
/// Each call appends one child to the builder's condition tree, so the
/// compiled argument order follows call order.
pub trait Filter: Sized {
    /// The condition tree predicates are appended to.
    fn conditions_mut(&mut self) -> &mut ConditionTree;

    /// Append a prebuilt condition.
    fn filter(mut self, condition: Condition) -> Self {
        self.conditions_mut().add_condition(condition);
        self
    }

    /// Add WHERE: column = value
    fn eq(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Eq, value)
    }

    /// Add WHERE: column = value, only when `value` is `Some`.
    fn eq_opt<T: Into<Value>>(self, column: impl AsRef<str>, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(column, v),
            None => self,
        }
    }

    /// Add WHERE: column != value
    fn ne(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Ne, value)
    }

    /// Add WHERE: column > value
    fn gt(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Gt, value)
    }

    /// Add WHERE: column >= value
    fn ge(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Ge, value)
    }

    /// Add WHERE: column < value
    fn lt(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Lt, value)
    }

    /// Add WHERE: column <= value
    fn le(self, column: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.compare(column, Operator::Le, value)
    }

    /// Add WHERE: column IN ?
    ///
    /// The whole list binds to a single placeholder; the driver decides how a
    /// list value is sent.
    fn in_list<T: Into<Value>>(self, column: impl AsRef<str>, values: Vec<T>) -> Self {
        self.compare(column, Operator::In, Value::from(values))
    }

    /// Add WHERE: column LIKE '%pattern%'
    fn like(self, column: impl AsRef<str>, pattern: &str) -> Self {
        self.compare(column, Operator::Like, format!("%{pattern}%"))
    }

    /// Add WHERE: column LIKE 'pattern%' (anchored at the start)
    fn l_like(self, column: impl AsRef<str>, pattern: &str) -> Self {
        self.compare(column, Operator::Like, format!("{pattern}%"))
    }

    /// Add WHERE: column LIKE '%pattern' (anchored at the end)
    fn r_like(self, column: impl AsRef<str>, pattern: &str) -> Self {
        self.compare(column, Operator::Like, format!("%{pattern}"))
    }

    /// Append a nested AND/OR group, rendered in parentheses.
    fn group(mut self, group: Where) -> Self {
        self.conditions_mut().add_tree(group.into_tree());
        self
    }

    #[doc(hidden)]
    fn compare(mut self, column: impl AsRef<str>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions_mut()
            .add_condition(Condition::new(column.as_ref(), op, value));
        self
    }
}

/// A standalone predicate group for [`Filter::group`].
///
/// ```ignore
/// User::select()
///     .eq(User::STATUS, "active")
///     .group(Where::or().eq(User::ROLE, "admin").eq(User::ROLE, "owner"))
/// // status = ? AND (role = ? OR role = ?)
/// ```
#[derive(Debug, Clone, Default)]
pub struct Where {
    tree: ConditionTree,
}

impl Where {
    pub fn new(logic: Logic) -> Self {
        Self {
            tree: ConditionTree::new(logic),
        }
    }

    /// Children joined with AND.
    pub fn and() -> Self {
        Self::new(Logic::And)
    }

    /// Children joined with OR.
    pub fn or() -> Self {
        Self::new(Logic::Or)
    }

    pub fn tree(&self) -> &ConditionTree {
        &self.tree
    }

    pub fn into_tree(self) -> ConditionTree {
        self.tree
    }
}

impl Filter for Where {
    fn conditions_mut(&mut self) -> &mut ConditionTree {
        &mut self.tree
    }
}
