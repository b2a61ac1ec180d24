//! Rendering backend shared by every statement.
//!
//! A statement is written by a single traversal into a [`SqlWriter`]. The same
//! traversal runs twice: once into a [`TextWriter`], which emits SQL with
//! placeholders, and once into a [`ParamWriter`], which collects the bound
//! values. Placeholders and parameters therefore always line up.

use sea_query::Value;

use crate::dialect::{Dialect, Placeholder};
use crate::error::{Result, render_error};
use crate::fragment::QueryTable;

/// Rendered statement: SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// SQL text.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<Value>,
}

/// Sink for one rendering pass.
pub trait SqlWriter {
    /// Append SQL text.
    fn push_sql(&mut self, sql: &str);

    /// Append a bound parameter.
    fn push_param(&mut self, value: &Value);
}

/// Collects SQL text, writing a placeholder for each parameter.
#[derive(Debug)]
pub struct TextWriter {
    sql: String,
    placeholder: Placeholder,
    count: usize,
}

impl TextWriter {
    /// An empty writer using `placeholder` markers.
    #[must_use]
    pub const fn new(placeholder: Placeholder) -> Self {
        Self {
            sql: String::new(),
            placeholder,
            count: 0,
        }
    }

    /// Number of placeholders written.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The rendered text.
    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }
}

impl SqlWriter for TextWriter {
    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_param(&mut self, _: &Value) {
        self.count += 1;
        self.placeholder.write(&mut self.sql, self.count);
    }
}

/// Collects bound values and discards text.
#[derive(Debug, Default)]
pub struct ParamWriter {
    values: Vec<Value>,
}

impl ParamWriter {
    /// The collected values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl SqlWriter for ParamWriter {
    fn push_sql(&mut self, _: &str) {}

    fn push_param(&mut self, value: &Value) {
        self.values.push(value.clone());
    }
}

/// Run `write` as a text pass and a parameter pass and pair the results.
///
/// # Errors
///
/// Returns the first error raised by `write`.
pub fn render<F>(dialect: &dyn Dialect, write: F) -> Result<Query>
where
    F: Fn(&mut dyn SqlWriter) -> Result<()>,
{
    let mut text = TextWriter::new(dialect.placeholder());
    write(&mut text)?;

    let mut params = ParamWriter::default();
    write(&mut params)?;

    let placeholders = text.count();
    let query = Query {
        sql: text.into_sql(),
        params: params.into_values(),
    };
    if placeholders != query.params.len() {
        return Err(render_error!(
            "{placeholders} placeholders rendered for {} parameters",
            query.params.len()
        ));
    }
    Ok(query)
}

/// Tables participating in the statement being rendered, and its dialect.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    dialect: &'a dyn Dialect,
    tables: &'a [&'a QueryTable],
}

impl<'a> RenderContext<'a> {
    /// Context over `tables`.
    #[must_use]
    pub const fn new(dialect: &'a dyn Dialect, tables: &'a [&'a QueryTable]) -> Self {
        Self { dialect, tables }
    }

    /// Context with no participating tables. Columns are written as given.
    #[must_use]
    pub const fn detached(dialect: &'a dyn Dialect) -> Self {
        Self { dialect, tables: &[] }
    }

    /// Dialect in use.
    #[must_use]
    pub const fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Participating tables, FROM tables first, then joined tables.
    #[must_use]
    pub const fn tables(&self) -> &'a [&'a QueryTable] {
        self.tables
    }

    /// Write a quoted identifier.
    pub fn write_identifier(&self, out: &mut dyn SqlWriter, name: &str) {
        out.push_sql(&self.dialect.quote_identifier(name));
    }

    /// Write a column reference.
    ///
    /// A column is qualified with its table (or the table's alias) when more
    /// than one table participates or the table is aliased. A table that does
    /// not participate, such as an outer table referenced from a sub-select,
    /// is always written.
    pub fn write_column(&self, out: &mut dyn SqlWriter, table: Option<&str>, column: &str) {
        if let Some(qualifier) = table.and_then(|t| self.qualifier(t)) {
            self.write_identifier(out, qualifier);
            out.push_sql(".");
        }
        if column == "*" {
            out.push_sql("*");
        } else {
            self.write_identifier(out, column);
        }
    }

    fn qualifier<'b>(&self, table: &'b str) -> Option<&'b str>
    where
        'a: 'b,
    {
        match self.tables.iter().find(|t| t.matches(table)) {
            Some(found) => {
                (self.tables.len() > 1 || found.alias_name().is_some()).then(|| found.reference())
            }
            None => Some(table),
        }
    }
}

/// Render a configured literal inline. Numbers and booleans are written as
/// is, anything else as a quoted string.
#[must_use]
pub fn literal(value: &str) -> String {
    let value = value.trim();
    if value.parse::<i64>().is_ok()
        || value.parse::<f64>().is_ok()
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Write raw SQL, replacing each `?` with the next of `params`. A `?` inside
/// a single-quoted literal is text, not a marker.
///
/// # Errors
///
/// Returns an error if the number of markers and parameters differ.
pub fn write_raw(out: &mut dyn SqlWriter, sql: &str, params: &[Value]) -> Result<()> {
    let markers = marker_offsets(sql);
    if markers.len() != params.len() {
        return Err(render_error!(
            "raw sql `{sql}` has {} markers but {} parameters",
            markers.len(),
            params.len()
        ));
    }
    let mut start = 0;
    for (offset, value) in markers.into_iter().zip(params) {
        out.push_sql(&sql[start..offset]);
        out.push_param(value);
        start = offset + 1;
    }
    out.push_sql(&sql[start..]);
    Ok(())
}

// Byte offsets of `?` outside quotes. A doubled `''` closes and reopens the
// literal, so it needs no special case.
fn marker_offsets(sql: &str) -> Vec<usize> {
    let mut quoted = false;
    let mut offsets = Vec::new();
    for (i, byte) in sql.bytes().enumerate() {
        match byte {
            b'\'' => quoted = !quoted,
            b'?' if !quoted => offsets.push(i),
            _ => {}
        }
    }
    offsets
}
