use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::Value;

use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::{Result, render_error};
use crate::fragment::{QueryCondition, QueryTable};
use crate::listener::Assignments;
use crate::query::{Query, RenderContext, render};
use crate::resolver::table_descriptor;
use crate::statement::{Assigned, ColumnValues, Guard, write_where};

/// Builder for constructing UPDATE queries.
pub struct UpdateBuilder<E: Entity> {
    values: Assignments,
    raw: Vec<(String, String)>,
    condition: Option<QueryCondition>,
    version: Option<Value>,
    _marker: PhantomData<E>,
}

impl<E: Entity> Default for UpdateBuilder<E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            raw: Vec::new(),
            condition: None,
            version: None,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> UpdateBuilder<E> {
    /// Creates a new UPDATE query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column to a new value. `column` may also be a field name.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Sets a column to a SQL expression, written as is.
    #[must_use]
    pub fn set_raw(mut self, column: impl Into<String>, sql: impl Into<String>) -> Self {
        self.raw.push((column.into(), sql.into()));
        self
    }

    /// Adds a WHERE clause condition, AND-ed with any already set.
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

    /// Only update rows still at `version`. Ignored for entities without a
    /// version column.
    #[must_use]
    pub fn expect_version(mut self, version: impl Into<Value>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Build the UPDATE query.
    ///
    /// Update listeners run first. Columns with an update default that were
    /// not assigned get the default expression. The version column is always
    /// incremented and never assigned directly; rows are limited to live rows
    /// for entities with a logical-delete column.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is assigned, the entity cannot be resolved,
    /// a column is unknown or a handler rejects a value.
    pub fn build(&self, dialect: &dyn Dialect) -> Result<Query> {
        let descriptor = table_descriptor::<E>()?;

        let mut values = self.values.clone();
        for listener in descriptor.update_listeners() {
            listener.on_update(&mut values);
        }

        let mut columns = ColumnValues::resolve(&descriptor, values, &self.raw)?;
        if let Some(version) = descriptor.version_column()
            && columns.remove(version).is_some()
        {
            tracing::debug!(
                entity = descriptor.entity(),
                column = version,
                "version column is managed, dropping assignment"
            );
        }
        if columns.is_empty() {
            return Err(render_error!("{}: UPDATE without assignments", descriptor.entity()));
        }
        for (column, expression) in descriptor.on_update_defaults() {
            columns.set_default(column, Assigned::Raw(expression.clone()));
        }

        let mut guards = Vec::new();
        if let Some(version) = descriptor.version_column() {
            columns.set(version, Assigned::Increment);
            if let Some(expected) = &self.version {
                guards.push(Guard::Param(version, expected));
            }
        }
        guards.extend(Guard::live_rows(&descriptor));

        let table = QueryTable::from_descriptor(Arc::clone(&descriptor));
        let tables = [&table];
        let query = render(dialect, |out| {
            let cx = RenderContext::new(dialect, &tables);
            out.push_sql("UPDATE ");
            table.write(&cx, out)?;
            out.push_sql(" SET ");
            columns.write_set(&cx, out);
            write_where(&cx, out, self.condition.as_ref(), &guards)
        })?;

        tracing::debug!(
            table = descriptor.table_name(),
            sql = %query.sql,
            param_count = query.params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(query)
    }
}
