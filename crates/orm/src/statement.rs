//! Pieces shared by the INSERT, UPDATE and DELETE builders.

use sea_query::Value;

use crate::descriptor::TableDescriptor;
use crate::error::{Result, render_error};
use crate::fragment::QueryCondition;
use crate::listener::Assignments;
use crate::query::{RenderContext, SqlWriter, literal};

/// Resolve column or field names to column names.
pub(crate) fn resolve_columns(
    descriptor: &TableDescriptor, names: &[String],
) -> Result<Vec<String>> {
    names
        .iter()
        .map(|name| {
            descriptor.lookup(name).map(|c| c.column().to_string()).ok_or_else(|| {
                render_error!("{}: unknown column `{name}`", descriptor.entity())
            })
        })
        .collect()
}

/// Right-hand side of a column assignment.
#[derive(Debug, Clone)]
pub(crate) enum Assigned {
    /// Bound value.
    Param(Value),
    /// SQL expression written as is.
    Raw(String),
    /// `column + 1`
    Increment,
}

/// Ordered column assignments of one statement.
#[derive(Debug, Default)]
pub(crate) struct ColumnValues {
    items: Vec<(String, Assigned)>,
}

impl ColumnValues {
    /// Resolve caller-supplied names to columns and run value handlers.
    ///
    /// Names may be column or field names. Ignored columns are dropped; a
    /// later assignment to the same column replaces an earlier one.
    pub(crate) fn resolve(
        descriptor: &TableDescriptor, values: Assignments, raw: &[(String, String)],
    ) -> Result<Self> {
        let mut resolved = Self::default();
        let assignments = values
            .into_iter()
            .map(|(name, value)| (name, Assigned::Param(value)))
            .chain(raw.iter().map(|(name, sql)| (name.clone(), Assigned::Raw(sql.clone()))));

        for (name, assigned) in assignments {
            let Some(column) = descriptor.lookup(&name) else {
                return Err(render_error!("{}: unknown column `{name}`", descriptor.entity()));
            };
            if column.is_ignored() {
                tracing::debug!(
                    entity = descriptor.entity(),
                    column = column.column(),
                    "dropping assignment to ignored column"
                );
                continue;
            }
            let assigned = match (assigned, column.handler()) {
                (Assigned::Param(value), Some(handler)) => {
                    Assigned::Param(handler.to_sql(value).map_err(|e| {
                        render_error!(
                            "{}: {} rejected the value for `{}`: {e}",
                            descriptor.entity(),
                            handler.name(),
                            column.column()
                        )
                    })?)
                }
                (assigned, _) => assigned,
            };
            resolved.set(column.column(), assigned);
        }
        Ok(resolved)
    }

    pub(crate) fn set(&mut self, column: &str, assigned: Assigned) {
        match self.items.iter_mut().find(|(c, _)| c == column) {
            Some(existing) => existing.1 = assigned,
            None => self.items.push((column.to_string(), assigned)),
        }
    }

    /// Add `assigned` unless the column already has a value.
    pub(crate) fn set_default(&mut self, column: &str, assigned: Assigned) {
        if !self.contains(column) {
            self.items.push((column.to_string(), assigned));
        }
    }

    pub(crate) fn remove(&mut self, column: &str) -> Option<Assigned> {
        let index = self.items.iter().position(|(c, _)| c == column)?;
        Some(self.items.remove(index).1)
    }

    pub(crate) fn contains(&self, column: &str) -> bool {
        self.items.iter().any(|(c, _)| c == column)
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn columns(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|(c, _)| c.as_str())
    }

    /// `a, b, c`
    pub(crate) fn write_columns(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) {
        for (i, column) in self.columns().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            cx.write_identifier(out, column);
        }
    }

    /// `$1, now(), ...`
    pub(crate) fn write_values(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) {
        for (i, (column, assigned)) in self.items.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            Self::write_value(cx, out, column, assigned);
        }
    }

    /// `a = $1, b = now(), ...`
    pub(crate) fn write_set(&self, cx: &RenderContext<'_>, out: &mut dyn SqlWriter) {
        for (i, (column, assigned)) in self.items.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            cx.write_identifier(out, column);
            out.push_sql(" = ");
            Self::write_value(cx, out, column, assigned);
        }
    }

    fn write_value(cx: &RenderContext<'_>, out: &mut dyn SqlWriter, column: &str, assigned: &Assigned) {
        match assigned {
            Assigned::Param(value) => out.push_param(value),
            Assigned::Raw(sql) => out.push_sql(sql),
            Assigned::Increment => {
                cx.write_identifier(out, column);
                out.push_sql(" + 1");
            }
        }
    }
}

/// Predicate the builder adds on top of the caller's condition.
#[derive(Debug)]
pub(crate) enum Guard<'a> {
    /// `column = <bound value>`
    Param(&'a str, &'a Value),
    /// `column = <literal>`
    Literal(&'a str, String),
}

impl<'a> Guard<'a> {
    /// `column = <normal value>` for entities with a logical-delete column.
    pub(crate) fn live_rows(descriptor: &'a TableDescriptor) -> Option<Self> {
        descriptor
            .logic_delete_column()
            .map(|column| Self::Literal(column, literal(descriptor.logic_normal_value())))
    }
}

/// ` WHERE condition AND guard AND ...`; nothing when there is neither.
pub(crate) fn write_where(
    cx: &RenderContext<'_>, out: &mut dyn SqlWriter, condition: Option<&QueryCondition>,
    guards: &[Guard<'_>],
) -> Result<()> {
    let condition = condition.filter(|c| c.is_effective());
    if condition.is_none() && guards.is_empty() {
        return Ok(());
    }

    out.push_sql(" WHERE ");
    if let Some(condition) = condition {
        if guards.is_empty() {
            condition.write(cx, out)?;
        } else {
            condition.write_nested(cx, out)?;
        }
    }
    for (i, guard) in guards.iter().enumerate() {
        if i > 0 || condition.is_some() {
            out.push_sql(" AND ");
        }
        match guard {
            Guard::Param(column, value) => {
                cx.write_identifier(out, column);
                out.push_sql(" = ");
                out.push_param(value);
            }
            Guard::Literal(column, literal) => {
                cx.write_identifier(out, column);
                out.push_sql(" = ");
                out.push_sql(literal);
            }
        }
    }
    Ok(())
}
