use std::marker::PhantomData;
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::Result;
use crate::fragment::{QueryCondition, QueryTable};
use crate::query::{Query, RenderContext, literal, render};
use crate::resolver::table_descriptor;
use crate::statement::{Guard, write_where};

/// Builder for constructing DELETE queries.
///
/// Entities with a logical-delete column are deleted by marking the column
/// unless [`physical`](Self::physical) is requested.
pub struct DeleteBuilder<E: Entity> {
    condition: Option<QueryCondition>,
    physical: bool,
    _marker: PhantomData<E>,
}

impl<E: Entity> Default for DeleteBuilder<E> {
    fn default() -> Self {
        Self {
            condition: None,
            physical: false,
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> DeleteBuilder<E> {
    /// Creates a new DELETE query builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Remove rows even when the entity has a logical-delete column.
    #[must_use]
    pub const fn physical(mut self) -> Self {
        self.physical = true;
        self
    }

    /// Build the DELETE query.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be resolved or a condition
    /// cannot be rendered.
    pub fn build(&self, dialect: &dyn Dialect) -> Result<Query> {
        let descriptor = table_descriptor::<E>()?;
        let table = QueryTable::from_descriptor(Arc::clone(&descriptor));
        let tables = [&table];

        let logical = descriptor.logic_delete_column().filter(|_| !self.physical);
        let guards: Vec<Guard<'_>> =
            logical.and_then(|_| Guard::live_rows(&descriptor)).into_iter().collect();

        let query = render(dialect, |out| {
            let cx = RenderContext::new(dialect, &tables);
            if let Some(column) = logical {
                out.push_sql("UPDATE ");
                table.write(&cx, out)?;
                out.push_sql(" SET ");
                cx.write_identifier(out, column);
                out.push_sql(" = ");
                out.push_sql(&literal(descriptor.logic_deleted_value()));
            } else {
                out.push_sql("DELETE FROM ");
                table.write(&cx, out)?;
            }
            write_where(&cx, out, self.condition.as_ref(), &guards)
        })?;

        tracing::debug!(
            table = descriptor.table_name(),
            logical = logical.is_some(),
            sql = %query.sql,
            param_count = query.params.len(),
            "DeleteBuilder generated SQL"
        );

        Ok(query)
    }
}
