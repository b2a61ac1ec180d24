use sea_query::Value;

use crate::dialect::{Dialect, Postgres};
use crate::entity::Entity;
use crate::error::Result;
use crate::fragment::{Join, QueryColumn, QueryCondition, QueryTable};
use crate::query::{ParamWriter, Query, RenderContext, SqlWriter, render};

/// Builder for SELECT queries.
///
/// A wrapper owns every fragment added to it, nested queries included, so a
/// clone is fully independent of the original. Wrappers are not meant to be
/// shared between threads; clone one instead.
#[derive(Debug, Clone, Default)]
pub struct QueryWrapper {
    columns: Vec<QueryColumn>,
    distinct: bool,
    tables: Vec<QueryTable>,
    joins: Vec<Join>,
    condition: Option<QueryCondition>,
    group_by: Vec<QueryColumn>,
    having: Option<QueryCondition>,
    order_by: Vec<(QueryColumn, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
    with_deleted: bool,
}

impl QueryWrapper {
    /// Creates an empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds projection columns.
    #[must_use]
    pub fn select(mut self, columns: impl IntoIterator<Item = QueryColumn>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// `SELECT DISTINCT`
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a FROM table.
    #[must_use]
    pub fn from(mut self, table: QueryTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds the table of entity `E` as a FROM table.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the entity cannot be resolved.
    pub fn from_entity<E: Entity>(self) -> Result<Self> {
        Ok(self.from(QueryTable::entity::<E>()?))
    }

    /// Adds a derived table `(query) AS alias` as a FROM table.
    #[must_use]
    pub fn from_query(self, query: Self, alias: impl Into<String>) -> Self {
        self.from(QueryTable::select(query, alias))
    }

    /// Adds a JOIN clause to the query.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Sets the WHERE condition, AND-ing it with any condition already set.
    #[must_use]
    pub fn r#where(self, condition: QueryCondition) -> Self {
        self.and(condition)
    }

    /// `... AND condition`
    #[must_use]
    pub fn and(mut self, condition: QueryCondition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// `... OR condition`
    #[must_use]
    pub fn or(mut self, condition: QueryCondition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.or(condition),
            None => condition,
        });
        self
    }

    /// Adds GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: impl IntoIterator<Item = QueryColumn>) -> Self {
        self.group_by.extend(columns);
        self
    }

    /// Sets the HAVING condition, AND-ing it with any condition already set.
    #[must_use]
    pub fn having(mut self, condition: QueryCondition) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by_asc(mut self, column: QueryColumn) -> Self {
        self.order_by.push((column, false));
        self
    }

    /// Adds descending ORDER BY clause.
    #[must_use]
    pub fn order_by_desc(mut self, column: QueryColumn) -> Self {
        self.order_by.push((column, true));
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Include logically deleted rows.
    #[must_use]
    pub const fn with_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }

    /// Projection columns.
    #[must_use]
    pub fn columns(&self) -> &[QueryColumn] {
        &self.columns
    }

    /// Mutable access to the projection columns, e.g. to reach a nested query.
    pub fn columns_mut(&mut self) -> &mut [QueryColumn] {
        &mut self.columns
    }

    /// FROM tables.
    #[must_use]
    pub fn tables(&self) -> &[QueryTable] {
        &self.tables
    }

    /// The WHERE condition.
    #[must_use]
    pub const fn condition(&self) -> Option<&QueryCondition> {
        self.condition.as_ref()
    }

    /// Pagination as `(limit, offset)`.
    #[must_use]
    pub const fn pagination(&self) -> (Option<u64>, Option<u64>) {
        (self.limit, self.offset)
    }

    /// Build the SELECT query.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered by `dialect`.
    pub fn build(&self, dialect: &dyn Dialect) -> Result<Query> {
        let query = render(dialect, |out| self.write(dialect, out))?;

        tracing::debug!(
            table = self.tables.first().map(QueryTable::reference),
            dialect = dialect.name(),
            sql = %query.sql,
            param_count = query.params.len(),
            "QueryWrapper generated SQL"
        );

        Ok(query)
    }

    /// SQL text only.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered by `dialect`.
    pub fn to_sql(&self, dialect: &dyn Dialect) -> Result<String> {
        Ok(self.build(dialect)?.sql)
    }

    /// Bound values in placeholder order. Values never depend on the dialect.
    ///
    /// # Errors
    ///
    /// Returns an error if a fragment cannot be rendered.
    pub fn bound_values(&self) -> Result<Vec<Value>> {
        let mut params = ParamWriter::default();
        self.write(&Postgres::new(), &mut params)?;
        Ok(params.into_values())
    }

    /// Write the query through `dialect`, with its own table scope.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered by `dialect`.
    pub fn write(&self, dialect: &dyn Dialect, out: &mut dyn SqlWriter) -> Result<()> {
        let tables: Vec<&QueryTable> =
            self.tables.iter().chain(self.joins.iter().map(Join::table)).collect();
        let cx = RenderContext::new(dialect, &tables);
        dialect.write_select(&cx, self, out)
    }

    /// The shared SELECT production: projection, FROM, joins, WHERE, GROUP
    /// BY, HAVING, ORDER BY, then the dialect's pagination clause.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered.
    pub fn write_clauses(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        out.push_sql(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });
        self.write_projection(cx, out)?;

        if !self.tables.is_empty() {
            out.push_sql(" FROM ");
            for (i, table) in self.tables.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                table.write(cx, out)?;
            }
        }
        for join in &self.joins {
            join.write(cx, out, self.with_deleted)?;
        }

        self.write_where(cx, out)?;

        if !self.group_by.is_empty() {
            out.push_sql(" GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                column.write_predicate(cx, out)?;
            }
        }
        if let Some(having) = self.having.as_ref().filter(|c| c.is_effective()) {
            out.push_sql(" HAVING ");
            having.write(cx, out)?;
        }
        if !self.order_by.is_empty() {
            out.push_sql(" ORDER BY ");
            for (i, (column, descending)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                column.write_predicate(cx, out)?;
                out.push_sql(if *descending { " DESC" } else { " ASC" });
            }
        }
        if self.limit.is_some() || self.offset.is_some() {
            cx.dialect().write_pagination(out, self.limit, self.offset);
        }
        Ok(())
    }

    // Explicit columns, else each entity table's default projection, else `*`.
    fn write_projection(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        if !self.columns.is_empty() {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    out.push_sql(", ");
                }
                column.write_selection(cx, out)?;
            }
            return Ok(());
        }

        let mut written = 0usize;
        for table in cx.tables() {
            let Some(descriptor) = table.descriptor() else {
                continue;
            };
            for name in descriptor.default_projection() {
                if written > 0 {
                    out.push_sql(", ");
                }
                cx.write_column(out, Some(table.reference()), name);
                if let Some(alias) = descriptor.column(name).and_then(|c| c.alias()) {
                    out.push_sql(" AS ");
                    cx.write_identifier(out, alias);
                }
                written += 1;
            }
        }
        if written == 0 {
            out.push_sql("*");
        }
        Ok(())
    }

    fn write_where(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) -> Result<()> {
        let condition = self.condition.as_ref().filter(|c| c.is_effective());
        let guarded: Vec<&QueryTable> = if self.with_deleted {
            Vec::new()
        } else {
            self.tables.iter().filter(|t| t.has_logic_delete()).collect()
        };
        if condition.is_none() && guarded.is_empty() {
            return Ok(());
        }

        out.push_sql(" WHERE ");
        if let Some(condition) = condition {
            if guarded.is_empty() {
                condition.write(cx, out)?;
            } else {
                condition.write_nested(cx, out)?;
            }
        }
        for (i, table) in guarded.iter().enumerate() {
            if i > 0 || condition.is_some() {
                out.push_sql(" AND ");
            }
            table.write_logic_delete(cx, out);
        }
        Ok(())
    }
}
