use std::marker::PhantomData;
use std::sync::Arc;

use sea_query::Value;

use crate::dialect::{ConflictAction, Dialect, Upsert};
use crate::entity::Entity;
use crate::error::Result;
use crate::fragment::QueryTable;
use crate::listener::Assignments;
use crate::query::{Query, RenderContext, literal, render};
use crate::resolver::table_descriptor;
use crate::statement::{Assigned, ColumnValues, resolve_columns};

/// Builder for constructing INSERT queries.
pub struct InsertBuilder<E: Entity> {
    values: Assignments,
    raw: Vec<(String, String)>,
    conflict: Option<ConflictStrategy>,
    _marker: PhantomData<E>,
}

#[derive(Debug, Clone)]
enum ConflictStrategy {
    DoNothing { target: Vec<String> },
    DoUpdate { target: Vec<String>, columns: Vec<String> },
    DoUpdateAll { target: Vec<String> },
}

impl<E: Entity> Default for InsertBuilder<E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            raw: Vec::new(),
            conflict: None,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> InsertBuilder<E> {
    /// Creates a new INSERT query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value for the insert. `column` may also be a field name.
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

    /// Handle conflicts on specified columns. Call ``do_update()`` or ``do_nothing()`` after.
    #[must_use]
    pub fn on_conflict_columns(mut self, columns: &[&str]) -> Self {
        self.conflict = Some(ConflictStrategy::DoNothing {
            target: columns.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// Shorthand for single column conflict
    #[must_use]
    pub fn on_conflict(self, column: &str) -> Self {
        self.on_conflict_columns(&[column])
    }

    /// On conflict, do nothing (ignore the insert)
    #[must_use]
    pub fn do_nothing(mut self) -> Self {
        let target = self.take_target();
        self.conflict = Some(ConflictStrategy::DoNothing { target });
        self
    }

    /// On conflict, update the specified columns with the inserted values
    #[must_use]
    pub fn do_update(mut self, columns: &[&str]) -> Self {
        let target = self.take_target();
        self.conflict = Some(ConflictStrategy::DoUpdate {
            target,
            columns: columns.iter().map(ToString::to_string).collect(),
        });
        self
    }

    /// On conflict, update every inserted column except the conflict target
    #[must_use]
    pub fn do_update_all(mut self) -> Self {
        let target = self.take_target();
        self.conflict = Some(ConflictStrategy::DoUpdateAll { target });
        self
    }

    fn take_target(&mut self) -> Vec<String> {
        match self.conflict.take() {
            Some(
                ConflictStrategy::DoNothing { target }
                | ConflictStrategy::DoUpdate { target, .. }
                | ConflictStrategy::DoUpdateAll { target },
            ) => target,
            None => Vec::new(),
        }
    }

    /// Build the INSERT query.
    ///
    /// Insert listeners run first and see the assignments as given. Columns
    /// with an insert default that were not assigned get the default
    /// expression, and the logical-delete column gets the live-row value.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be resolved, a column is unknown,
    /// a handler rejects a value or `dialect` cannot render the statement.
    pub fn build(&self, dialect: &dyn Dialect) -> Result<Query> {
        let descriptor = table_descriptor::<E>()?;

        let mut values = self.values.clone();
        for listener in descriptor.insert_listeners() {
            listener.on_insert(&mut values);
        }

        let mut columns = ColumnValues::resolve(&descriptor, values, &self.raw)?;
        for (column, expression) in descriptor.on_insert_defaults() {
            columns.set_default(column, Assigned::Raw(expression.clone()));
        }
        if let Some(column) = descriptor.logic_delete_column() {
            columns.set_default(column, Assigned::Raw(literal(descriptor.logic_normal_value())));
        }

        let upsert = match &self.conflict {
            None => None,
            Some(ConflictStrategy::DoNothing { target }) => Some(Upsert {
                target: resolve_columns(&descriptor, target)?,
                action: ConflictAction::Nothing,
            }),
            Some(ConflictStrategy::DoUpdate { target, columns: updated }) => Some(Upsert {
                target: resolve_columns(&descriptor, target)?,
                action: ConflictAction::Update(resolve_columns(&descriptor, updated)?),
            }),
            Some(ConflictStrategy::DoUpdateAll { target }) => {
                let target = resolve_columns(&descriptor, target)?;
                let updated = columns
                    .columns()
                    .filter(|c| !target.iter().any(|t| t.as_str() == *c))
                    .map(ToString::to_string)
                    .collect();
                Some(Upsert {
                    target,
                    action: ConflictAction::Update(updated),
                })
            }
        };

        let table = QueryTable::from_descriptor(Arc::clone(&descriptor));
        let tables = [&table];
        let query = render(dialect, |out| {
            let cx = RenderContext::new(dialect, &tables);
            out.push_sql("INSERT INTO ");
            table.write(&cx, out)?;
            if columns.is_empty() {
                dialect.write_insert_default_values(out)?;
            } else {
                out.push_sql(" (");
                columns.write_columns(&cx, out);
                out.push_sql(") VALUES (");
                columns.write_values(&cx, out);
                out.push_sql(")");
            }
            if let Some(upsert) = &upsert {
                dialect.write_upsert(&cx, upsert, out)?;
            }
            Ok(())
        })?;

        tracing::debug!(
            table = descriptor.table_name(),
            sql = %query.sql,
            param_count = query.params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(query)
    }
}
