//! Query condition types for WHERE clauses.
//!
//! A [`Condition`] is a single `field op value` predicate. A [`ConditionTree`]
//! combines conditions and nested trees with one [`Logic`] operator and
//! compiles to a SQL fragment plus its arguments in placeholder order.

use crate::value::Value;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal: column = value
    Eq,
    /// Not equal: column != value
    Ne,
    /// Greater than: column > value
    Gt,
    /// Greater than or equal: column >= value
    Ge,
    /// Less than: column < value
    Lt,
    /// Less than or equal: column <= value
    Le,
    /// IN: column IN value (one placeholder for the whole value)
    In,
    /// LIKE pattern match
    Like,
}

impl Operator {
    /// SQL text of the operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::Like => "LIKE",
        }
    }
}

/// A single `field op value` predicate. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Render `"{field} {op} {placeholder}"` and return the bound value.
    pub fn parse(&self, placeholder: &str) -> (String, Value) {
        (
            format!("{} {} {}", self.field, self.operator.as_sql(), placeholder),
            self.value.clone(),
        )
    }
}

/// Boolean operator joining the children of a [`ConditionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    pub fn as_sql(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

/// A child of a [`ConditionTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Condition),
    Tree(ConditionTree),
}

/// An ordered, boolean-combined collection of predicates.
///
/// Children are kept in insertion order; that order decides argument
/// positions in the compiled output.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    logic: Logic,
    children: Vec<Node>,
}

impl ConditionTree {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            children: Vec::new(),
        }
    }

    /// An AND tree.
    pub fn and() -> Self {
        Self::new(Logic::And)
    }

    /// An OR tree.
    pub fn or() -> Self {
        Self::new(Logic::Or)
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Number of direct children.
    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Whether the tree compiles to nothing.
    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|node| match node {
            Node::Leaf(_) => false,
            Node::Tree(tree) => tree.is_empty(),
        })
    }

    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.children.push(Node::Leaf(condition));
        self
    }

    pub fn add_tree(&mut self, tree: ConditionTree) -> &mut Self {
        self.children.push(Node::Tree(tree));
        self
    }

    /// Compile the tree into a fragment and its arguments.
    ///
    /// An empty tree yields `("", [])`; callers must then omit the clause.
    /// Nested trees are parenthesized, empty nested trees are skipped.
    pub fn compile(&self, placeholder: &str) -> (String, Vec<Value>) {
        let mut args = Vec::new();
        let sql = self.compile_into(placeholder, &mut args);
        (sql, args)
    }

    fn compile_into(&self, placeholder: &str, args: &mut Vec<Value>) -> String {
        let mut parts = Vec::with_capacity(self.children.len());
        for node in &self.children {
            match node {
                Node::Leaf(condition) => {
                    let (sql, value) = condition.parse(placeholder);
                    parts.push(sql);
                    args.push(value);
                }
                Node::Tree(tree) => {
                    let sql = tree.compile_into(placeholder, args);
                    if !sql.is_empty() {
                        parts.push(format!("({sql})"));
                    }
                }
            }
        }
        parts.join(&format!(" {} ", self.logic.as_sql()))
    }

    /// Values of every leaf in pre-order.
    pub fn values(&self) -> Vec<&Value> {
        let mut out = Vec::new();
        self.collect_values(&mut out);
        out
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a Value>) {
        for node in &self.children {
            match node {
                Node::Leaf(condition) => out.push(condition.value()),
                Node::Tree(tree) => tree.collect_values(out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_compiles_to_nothing() {
        let tree = ConditionTree::and();
        assert_eq!(tree.compile("?"), (String::new(), Vec::new()));
        assert!(tree.is_empty());
    }

    #[test]
    fn leaf_renders_field_op_placeholder() {
        let c = Condition::new("age", Operator::Ge, 18);
        assert_eq!(c.parse("%s"), ("age >= %s".to_string(), Value::Int(18)));
    }

    #[test]
    fn nested_trees_are_parenthesized_in_preorder() {
        let mut inner = ConditionTree::or();
        inner
            .add_condition(Condition::new("role", Operator::Eq, "admin"))
            .add_condition(Condition::new("role", Operator::Eq, "owner"));

        let mut tree = ConditionTree::and();
        tree.add_condition(Condition::new("status", Operator::Eq, "active"))
            .add_tree(inner)
            .add_condition(Condition::new("age", Operator::Gt, 18));

        let (sql, args) = tree.compile("?");
        assert_eq!(sql, "status = ? AND (role = ? OR role = ?) AND age > ?");
        assert_eq!(
            args,
            vec![
                Value::from("active"),
                Value::from("admin"),
                Value::from("owner"),
                Value::Int(18),
            ]
        );
        assert_eq!(
            tree.values().into_iter().cloned().collect::<Vec<_>>(),
            args
        );
    }

    #[test]
    fn empty_subtree_is_skipped() {
        let mut tree = ConditionTree::and();
        tree.add_condition(Condition::new("id", Operator::Eq, 1))
            .add_tree(ConditionTree::or());
        assert_eq!(tree.compile("?").0, "id = ?");
    }

    #[test]
    fn in_binds_one_placeholder_for_a_list() {
        let mut tree = ConditionTree::and();
        tree.add_condition(Condition::new("id", Operator::In, vec![1, 2, 3]));
        let (sql, args) = tree.compile("?");
        assert_eq!(sql, "id IN ?");
        assert_eq!(args.len(), 1);
    }
}
