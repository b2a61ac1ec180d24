//! Composable query fragments: columns, conditions, tables and joins.
//!
//! Every fragment renders through a single `write` method per context, so the
//! text and parameter passes share one traversal. Fragments that own a nested
//! [`QueryWrapper`] own it by value; cloning a fragment clones the nested
//! query with it.

use std::sync::Arc;

use sea_query::Value;

use crate::descriptor::TableDescriptor;
use crate::dialect::Postgres;
use crate::entity::Entity;
use crate::error::Result;
use crate::query::{ParamWriter, RenderContext, SqlWriter, literal, write_raw};
use crate::resolver::table_descriptor;
use crate::wrapper::QueryWrapper;

/// A column, expression or sub-select usable in projections and predicates.
#[derive(Debug, Clone)]
pub enum QueryColumn {
    /// `[table.]name`
    Column {
        /// Owning table name or alias.
        table: Option<String>,
        /// Column name.
        name: String,
        /// Projection alias.
        alias: Option<String>,
    },
    /// `[table.]*`
    All {
        /// Owning table name or alias.
        table: Option<String>,
    },
    /// Raw SQL with `?` parameter markers.
    Raw {
        /// SQL text.
        sql: String,
        /// Values for the markers, in order.
        params: Vec<Value>,
        /// Projection alias.
        alias: Option<String>,
    },
    /// `NAME(arg, ...)`
    Function {
        /// Function name.
        name: String,
        /// Arguments.
        args: Vec<Self>,
        /// Projection alias.
        alias: Option<String>,
    },
    /// `(SELECT ...)`
    Select {
        /// The nested query.
        query: Box<QueryWrapper>,
        /// Projection alias.
        alias: Option<String>,
    },
}

/// Shorthand for an unqualified [`QueryColumn::Column`].
#[must_use]
pub fn column(name: impl Into<String>) -> QueryColumn {
    QueryColumn::Column {
        table: None,
        name: name.into(),
        alias: None,
    }
}

impl QueryColumn {
    /// `table.name`
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column {
            table: Some(table.into()),
            name: name.into(),
            alias: None,
        }
    }

    /// `*`
    #[must_use]
    pub const fn all() -> Self {
        Self::All { table: None }
    }

    /// `table.*`
    #[must_use]
    pub fn all_of(table: impl Into<String>) -> Self {
        Self::All {
            table: Some(table.into()),
        }
    }

    /// Raw SQL expression with `?` markers bound to `params`.
    #[must_use]
    pub fn raw(sql: impl Into<String>, params: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::Raw {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
            alias: None,
        }
    }

    /// `name(args...)`
    #[must_use]
    pub fn function(name: impl Into<String>, args: impl IntoIterator<Item = Self>) -> Self {
        Self::Function {
            name: name.into(),
            args: args.into_iter().collect(),
            alias: None,
        }
    }

    /// `COUNT(column)`
    #[must_use]
    pub fn count(column: Self) -> Self {
        Self::function("COUNT", [column])
    }

    /// `SUM(column)`
    #[must_use]
    pub fn sum(column: Self) -> Self {
        Self::function("SUM", [column])
    }

    /// `MAX(column)`
    #[must_use]
    pub fn max(column: Self) -> Self {
        Self::function("MAX", [column])
    }

    /// `MIN(column)`
    #[must_use]
    pub fn min(column: Self) -> Self {
        Self::function("MIN", [column])
    }

    /// `AVG(column)`
    #[must_use]
    pub fn avg(column: Self) -> Self {
        Self::function("AVG", [column])
    }

    /// A sub-select column.
    #[must_use]
    pub fn select(query: QueryWrapper) -> Self {
        Self::Select {
            query: Box::new(query),
            alias: None,
        }
    }

    /// Sets the projection alias. `*` columns cannot be aliased and are
    /// returned unchanged.
    #[must_use]
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Self::Column { alias, .. }
            | Self::Raw { alias, .. }
            | Self::Function { alias, .. }
            | Self::Select { alias, .. } => *alias = Some(name.into()),
            Self::All { .. } => {}
        }
        self
    }

    /// The projection alias, if any.
    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Self::Column { alias, .. }
            | Self::Raw { alias, .. }
            | Self::Function { alias, .. }
            | Self::Select { alias, .. } => alias.as_deref(),
            Self::All { .. } => None,
        }
    }

    /// The nested query of a sub-select column.
    #[must_use]
    pub fn sub_query(&self) -> Option<&QueryWrapper> {
        match self {
            Self::Select { query, .. } => Some(query.as_ref()),
            _ => None,
        }
    }

    /// Mutable access to the nested query of a sub-select column.
    pub fn sub_query_mut(&mut self) -> Option<&mut QueryWrapper> {
        match self {
            Self::Select { query, .. } => Some(query.as_mut()),
            _ => None,
        }
    }

    /// Write the column as a projection item, with its alias.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn write_selection(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        self.write_predicate(cx, out)?;
        if let Some(alias) = self.alias_name().map(str::trim).filter(|a| !a.is_empty()) {
            out.push_sql(" AS ");
            cx.write_identifier(out, alias);
        }
        Ok(())
    }

    /// Write the column as an operand. Aliases are never written and
    /// sub-selects are always parenthesized.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn write_predicate(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        match self {
            Self::Column { table, name, .. } => cx.write_column(out, table.as_deref(), name),
            Self::All { table } => cx.write_column(out, table.as_deref(), "*"),
            Self::Raw { sql, params, .. } => write_raw(out, sql, params)?,
            Self::Function { name, args, .. } => {
                out.push_sql(name);
                out.push_sql("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_sql(", ");
                    }
                    arg.write_predicate(cx, out)?;
                }
                out.push_sql(")");
            }
            Self::Select { query, .. } => {
                out.push_sql("(");
                query.write(cx.dialect(), out)?;
                out.push_sql(")");
            }
        }
        Ok(())
    }

    /// Values bound by this column, in rendering order. For a sub-select this
    /// is exactly the nested query's bound values.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn bound_values(&self) -> Result<Vec<Value>> {
        let dialect = Postgres::new();
        let mut params = ParamWriter::default();
        self.write_predicate(&RenderContext::detached(&dialect), &mut params)?;
        Ok(params.into_values())
    }

    fn compare(self, op: CompareOp, operand: Operand) -> QueryCondition {
        QueryCondition::Compare {
            column: self,
            op,
            operand,
        }
    }

    /// `column = value`
    #[must_use]
    pub fn eq(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Eq, Operand::Value(value.into()))
    }

    /// `column <> value`
    #[must_use]
    pub fn ne(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Ne, Operand::Value(value.into()))
    }

    /// `column > value`
    #[must_use]
    pub fn gt(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Gt, Operand::Value(value.into()))
    }

    /// `column >= value`
    #[must_use]
    pub fn ge(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Ge, Operand::Value(value.into()))
    }

    /// `column < value`
    #[must_use]
    pub fn lt(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Lt, Operand::Value(value.into()))
    }

    /// `column <= value`
    #[must_use]
    pub fn le(self, value: impl Into<Value>) -> QueryCondition {
        self.compare(CompareOp::Le, Operand::Value(value.into()))
    }

    /// `column LIKE pattern`
    #[must_use]
    pub fn like(self, pattern: impl Into<String>) -> QueryCondition {
        self.compare(CompareOp::Like, Operand::Value(Value::from(pattern.into())))
    }

    /// `column NOT LIKE pattern`
    #[must_use]
    pub fn not_like(self, pattern: impl Into<String>) -> QueryCondition {
        self.compare(CompareOp::NotLike, Operand::Value(Value::from(pattern.into())))
    }

    /// `column = other`
    #[must_use]
    pub fn eq_column(self, other: Self) -> QueryCondition {
        self.compare(CompareOp::Eq, Operand::Column(other))
    }

    /// `column <op> other`, where `other` may be a sub-select.
    #[must_use]
    pub fn compare_column(self, op: CompareOp, other: Self) -> QueryCondition {
        self.compare(op, Operand::Column(other))
    }

    /// `column IN (values...)`. An empty list makes the condition ineffective.
    #[must_use]
    pub fn in_list(self, values: impl IntoIterator<Item = impl Into<Value>>) -> QueryCondition {
        QueryCondition::In {
            column: self,
            source: InSource::List(values.into_iter().map(Into::into).collect()),
            negated: false,
        }
    }

    /// `column NOT IN (values...)`. An empty list makes the condition ineffective.
    #[must_use]
    pub fn not_in_list(self, values: impl IntoIterator<Item = impl Into<Value>>) -> QueryCondition {
        QueryCondition::In {
            column: self,
            source: InSource::List(values.into_iter().map(Into::into).collect()),
            negated: true,
        }
    }

    /// `column IN (SELECT ...)`
    #[must_use]
    pub fn in_query(self, query: QueryWrapper) -> QueryCondition {
        QueryCondition::In {
            column: self,
            source: InSource::Query(Box::new(query)),
            negated: false,
        }
    }

    /// `column NOT IN (SELECT ...)`
    #[must_use]
    pub fn not_in_query(self, query: QueryWrapper) -> QueryCondition {
        QueryCondition::In {
            column: self,
            source: InSource::Query(Box::new(query)),
            negated: true,
        }
    }

    /// `column BETWEEN low AND high`
    #[must_use]
    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> QueryCondition {
        QueryCondition::Between {
            column: self,
            low: low.into(),
            high: high.into(),
            negated: false,
        }
    }

    /// `column NOT BETWEEN low AND high`
    #[must_use]
    pub fn not_between(self, low: impl Into<Value>, high: impl Into<Value>) -> QueryCondition {
        QueryCondition::Between {
            column: self,
            low: low.into(),
            high: high.into(),
            negated: true,
        }
    }

    /// `column IS NULL`
    #[must_use]
    pub const fn is_null(self) -> QueryCondition {
        QueryCondition::Null {
            column: self,
            negated: false,
        }
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub const fn is_not_null(self) -> QueryCondition {
        QueryCondition::Null {
            column: self,
            negated: true,
        }
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
}

impl CompareOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => " = ",
            Self::Ne => " <> ",
            Self::Gt => " > ",
            Self::Ge => " >= ",
            Self::Lt => " < ",
            Self::Le => " <= ",
            Self::Like => " LIKE ",
            Self::NotLike => " NOT LIKE ",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A bound value.
    Value(Value),
    /// Another column, expression or sub-select.
    Column(QueryColumn),
}

/// Values tested by an `IN` condition.
#[derive(Debug, Clone)]
pub enum InSource {
    /// Literal values, each bound.
    List(Vec<Value>),
    /// A sub-select.
    Query(Box<QueryWrapper>),
}

/// A boolean expression tree.
#[derive(Debug, Clone)]
pub enum QueryCondition {
    /// `column <op> operand`
    Compare {
        /// Left-hand side.
        column: QueryColumn,
        /// Operator.
        op: CompareOp,
        /// Right-hand side.
        operand: Operand,
    },
    /// `column IS [NOT] NULL`
    Null {
        /// Tested column.
        column: QueryColumn,
        /// `IS NOT NULL`
        negated: bool,
    },
    /// `column [NOT] BETWEEN low AND high`
    Between {
        /// Tested column.
        column: QueryColumn,
        /// Lower bound.
        low: Value,
        /// Upper bound.
        high: Value,
        /// `NOT BETWEEN`
        negated: bool,
    },
    /// `column [NOT] IN (...)`
    In {
        /// Tested column.
        column: QueryColumn,
        /// Values or sub-select.
        source: InSource,
        /// `NOT IN`
        negated: bool,
    },
    /// `[NOT] EXISTS (SELECT ...)`
    Exists {
        /// The nested query.
        query: Box<QueryWrapper>,
        /// `NOT EXISTS`
        negated: bool,
    },
    /// Raw SQL with `?` parameter markers.
    Raw {
        /// SQL text.
        sql: String,
        /// Values for the markers, in order.
        params: Vec<Value>,
    },
    /// Conjunction of the effective children.
    And(Vec<Self>),
    /// Disjunction of the effective children.
    Or(Vec<Self>),
    /// Negation.
    Not(Box<Self>),
}

impl QueryCondition {
    /// Raw SQL predicate with `?` markers bound to `params`.
    #[must_use]
    pub fn raw(sql: impl Into<String>, params: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::Raw {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `EXISTS (SELECT ...)`
    #[must_use]
    pub fn exists(query: QueryWrapper) -> Self {
        Self::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    /// `NOT EXISTS (SELECT ...)`
    #[must_use]
    pub fn not_exists(query: QueryWrapper) -> Self {
        Self::Exists {
            query: Box::new(query),
            negated: true,
        }
    }

    /// Conjunction of `conditions`.
    #[must_use]
    pub fn all(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    /// Disjunction of `conditions`.
    #[must_use]
    pub fn any(conditions: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut children) => {
                children.push(other);
                Self::And(children)
            }
            this => Self::And(vec![this, other]),
        }
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut children) => {
                children.push(other);
                Self::Or(children)
            }
            this => Self::Or(vec![this, other]),
        }
    }

    /// `NOT self`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Keep the condition only when `enabled`; otherwise it renders nothing.
    #[must_use]
    pub fn when(self, enabled: bool) -> Self {
        if enabled { self } else { Self::And(Vec::new()) }
    }

    /// `false` for conditions that render nothing: empty groups, groups of
    /// ineffective children and empty `IN` lists.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.iter().any(Self::is_effective),
            Self::Not(inner) => inner.is_effective(),
            Self::In {
                source: InSource::List(values),
                ..
            } => !values.is_empty(),
            _ => true,
        }
    }

    // Whether the condition needs parentheses next to a sibling.
    fn is_compound(&self) -> bool {
        match self {
            // a group of one writes that child bare, so it inherits the answer
            Self::And(children) | Self::Or(children) => {
                let mut effective = children.iter().filter(|c| c.is_effective());
                match (effective.next(), effective.next()) {
                    (Some(only), None) => only.is_compound(),
                    (Some(_), Some(_)) => true,
                    _ => false,
                }
            }
            Self::Raw { .. } => true,
            _ => false,
        }
    }

    /// Write the condition. Ineffective conditions write nothing; callers
    /// check [`is_effective`](Self::is_effective) before writing a keyword.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn write(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        if !self.is_effective() {
            return Ok(());
        }
        match self {
            Self::Compare {
                column,
                op,
                operand,
            } => {
                column.write_predicate(cx, out)?;
                out.push_sql(op.as_str());
                match operand {
                    Operand::Value(value) => out.push_param(value),
                    Operand::Column(other) => other.write_predicate(cx, out)?,
                }
            }
            Self::Null { column, negated } => {
                column.write_predicate(cx, out)?;
                out.push_sql(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Self::Between {
                column,
                low,
                high,
                negated,
            } => {
                column.write_predicate(cx, out)?;
                out.push_sql(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                out.push_param(low);
                out.push_sql(" AND ");
                out.push_param(high);
            }
            Self::In {
                column,
                source,
                negated,
            } => {
                column.write_predicate(cx, out)?;
                out.push_sql(if *negated { " NOT IN (" } else { " IN (" });
                match source {
                    InSource::List(values) => {
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                out.push_sql(", ");
                            }
                            out.push_param(value);
                        }
                    }
                    InSource::Query(query) => query.write(cx.dialect(), out)?,
                }
                out.push_sql(")");
            }
            Self::Exists { query, negated } => {
                out.push_sql(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                query.write(cx.dialect(), out)?;
                out.push_sql(")");
            }
            Self::Raw { sql, params } => write_raw(out, sql, params)?,
            Self::And(children) => Self::write_group(children, " AND ", cx, out)?,
            Self::Or(children) => Self::write_group(children, " OR ", cx, out)?,
            Self::Not(inner) => {
                out.push_sql("NOT (");
                inner.write(cx, out)?;
                out.push_sql(")");
            }
        }
        Ok(())
    }

    /// Write the condition, parenthesized if it joins several predicates.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn write_nested(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        if self.is_compound() {
            out.push_sql("(");
            self.write(cx, out)?;
            out.push_sql(")");
            Ok(())
        } else {
            self.write(cx, out)
        }
    }

    fn write_group(
        children: &[Self], separator: &str, cx: &RenderContext<'_>, out: &mut dyn SqlWriter,
    ) -> Result<()> {
        let effective: Vec<&Self> = children.iter().filter(|c| c.is_effective()).collect();
        if let [only] = effective.as_slice() {
            return only.write(cx, out);
        }
        for (i, child) in effective.iter().enumerate() {
            if i > 0 {
                out.push_sql(separator);
            }
            child.write_nested(cx, out)?;
        }
        Ok(())
    }

    /// Values bound by this condition, in rendering order.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn bound_values(&self) -> Result<Vec<Value>> {
        let dialect = Postgres::new();
        let mut params = ParamWriter::default();
        self.write(&RenderContext::detached(&dialect), &mut params)?;
        Ok(params.into_values())
    }
}

/// A table reference: a named table or a derived table.
#[derive(Debug, Clone)]
pub enum QueryTable {
    /// `[schema.]name [AS alias]`
    Named {
        /// Schema.
        schema: Option<String>,
        /// Table name.
        name: String,
        /// Alias.
        alias: Option<String>,
        /// Metadata, for tables derived from an entity.
        descriptor: Option<Arc<TableDescriptor>>,
    },
    /// `(SELECT ...) AS alias`
    Select {
        /// The nested query.
        query: Box<QueryWrapper>,
        /// Alias.
        alias: String,
    },
}

impl QueryTable {
    /// A plain table.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            schema: None,
            name: name.into(),
            alias: None,
            descriptor: None,
        }
    }

    /// The table of an entity, carrying its resolved metadata.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the entity cannot be resolved.
    pub fn entity<E: Entity>() -> Result<Self> {
        Ok(Self::from_descriptor(table_descriptor::<E>()?))
    }

    /// The table described by `descriptor`.
    #[must_use]
    pub fn from_descriptor(descriptor: Arc<TableDescriptor>) -> Self {
        Self::Named {
            schema: descriptor.schema().map(ToString::to_string),
            name: descriptor.table_name().to_string(),
            alias: None,
            descriptor: Some(descriptor),
        }
    }

    /// A derived table.
    #[must_use]
    pub fn select(query: QueryWrapper, alias: impl Into<String>) -> Self {
        Self::Select {
            query: Box::new(query),
            alias: alias.into(),
        }
    }

    /// Sets the schema of a named table.
    #[must_use]
    pub fn schema(mut self, value: impl Into<String>) -> Self {
        if let Self::Named { schema, .. } = &mut self {
            *schema = Some(value.into());
        }
        self
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Self::Named { alias, .. } => *alias = Some(value.into()),
            Self::Select { alias, .. } => *alias = value.into(),
        }
        self
    }

    /// The alias, if any. Derived tables always have one.
    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Self::Named { alias, .. } => alias.as_deref(),
            Self::Select { alias, .. } => Some(alias),
        }
    }

    /// Name used to qualify the table's columns: the alias, else the name.
    #[must_use]
    pub fn reference(&self) -> &str {
        match self {
            Self::Named { name, alias, .. } => alias.as_deref().unwrap_or(name),
            Self::Select { alias, .. } => alias,
        }
    }

    /// `true` if `name` refers to this table by name or alias.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Named {
                name: table, alias, ..
            } => table == name || alias.as_deref() == Some(name),
            Self::Select { alias, .. } => alias == name,
        }
    }

    /// Entity metadata, for entity tables.
    #[must_use]
    pub fn descriptor(&self) -> Option<&Arc<TableDescriptor>> {
        match self {
            Self::Named { descriptor, .. } => descriptor.as_ref(),
            Self::Select { .. } => None,
        }
    }

    /// A column of this table, qualified by its alias or name.
    #[must_use]
    pub fn column(&self, name: impl Into<String>) -> QueryColumn {
        QueryColumn::new(self.reference(), name)
    }

    /// The live-row predicate `col = <normal value>` of entity tables with a
    /// logical-delete column. Writes nothing for other tables.
    pub(crate) fn write_logic_delete(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) {
        let Some(descriptor) = self.descriptor() else {
            return;
        };
        if let Some(column) = descriptor.logic_delete_column() {
            cx.write_column(out, Some(self.reference()), column);
            out.push_sql(" = ");
            out.push_sql(&literal(descriptor.logic_normal_value()));
        }
    }

    pub(crate) fn has_logic_delete(&self) -> bool {
        self.descriptor().is_some_and(|d| d.logic_delete_column().is_some())
    }

    /// Write the table as a FROM or JOIN target.
    ///
    /// # Errors
    ///
    /// Returns an error if a derived table cannot be rendered.
    pub fn write(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        match self {
            Self::Named {
                schema,
                name,
                alias,
                ..
            } => {
                if let Some(schema) = schema {
                    cx.write_identifier(out, schema);
                    out.push_sql(".");
                }
                cx.write_identifier(out, name);
                if let Some(alias) = alias {
                    out.push_sql(" AS ");
                    cx.write_identifier(out, alias);
                }
            }
            Self::Select { query, alias } => {
                out.push_sql("(");
                query.write(cx.dialect(), out)?;
                out.push_sql(") AS ");
                cx.write_identifier(out, alias);
            }
        }
        Ok(())
    }
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
}

impl JoinKind {
    const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => " INNER JOIN ",
            Self::Left => " LEFT JOIN ",
            Self::Right => " RIGHT JOIN ",
            Self::Full => " FULL JOIN ",
            Self::Cross => " CROSS JOIN ",
        }
    }
}

/// A joined table and its join condition.
#[derive(Debug, Clone)]
pub struct Join {
    kind: JoinKind,
    table: QueryTable,
    on: Option<QueryCondition>,
}

impl Join {
    /// Creates a JOIN of the given kind.
    #[must_use]
    pub const fn new(kind: JoinKind, table: QueryTable, on: Option<QueryCondition>) -> Self {
        Self { kind, table, on }
    }

    /// Creates an INNER JOIN.
    #[must_use]
    pub const fn inner(table: QueryTable, on: QueryCondition) -> Self {
        Self::new(JoinKind::Inner, table, Some(on))
    }

    /// Creates a LEFT JOIN.
    #[must_use]
    pub const fn left(table: QueryTable, on: QueryCondition) -> Self {
        Self::new(JoinKind::Left, table, Some(on))
    }

    /// Creates a RIGHT JOIN.
    #[must_use]
    pub const fn right(table: QueryTable, on: QueryCondition) -> Self {
        Self::new(JoinKind::Right, table, Some(on))
    }

    /// Creates a FULL OUTER JOIN.
    #[must_use]
    pub const fn full(table: QueryTable, on: QueryCondition) -> Self {
        Self::new(JoinKind::Full, table, Some(on))
    }

    /// Creates a CROSS JOIN.
    #[must_use]
    pub const fn cross(table: QueryTable) -> Self {
        Self::new(JoinKind::Cross, table, None)
    }

    /// Join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Joined table.
    #[must_use]
    pub const fn table(&self) -> &QueryTable {
        &self.table
    }

    /// Write the join. Entity tables with a logical-delete column get the
    /// live-row predicate added to the ON clause unless `with_deleted`.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested fragment cannot be rendered.
    pub fn write(
        &self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter, with_deleted: bool,
    ) -> Result<()> {
        out.push_sql(self.kind.keyword());
        self.table.write(cx, out)?;

        let on = self.on.as_ref().filter(|c| c.is_effective());
        let logic_delete = !with_deleted && self.table.has_logic_delete();
        if self.kind == JoinKind::Cross || (on.is_none() && !logic_delete) {
            return Ok(());
        }

        out.push_sql(" ON ");
        if let Some(on) = on {
            if logic_delete {
                on.write_nested(cx, out)?;
                out.push_sql(" AND ");
            } else {
                on.write(cx, out)?;
            }
        }
        if logic_delete {
            self.table.write_logic_delete(cx, out);
        }
        Ok(())
    }
}
