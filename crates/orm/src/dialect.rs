//! SQL dialects.
//!
//! A dialect supplies the productions that differ between databases:
//! identifier quoting, placeholders, pagination and upsert syntax. Every
//! other production is shared through the trait's provided methods.

use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::config::global_config;
use crate::error::{Result, render_error};
use crate::query::{Query, RenderContext, SqlWriter};
use crate::wrapper::QueryWrapper;

static REGISTRY: LazyLock<DashMap<String, Arc<dyn Dialect>>> = LazyLock::new(|| {
    let dialects: DashMap<String, Arc<dyn Dialect>> = DashMap::new();
    dialects.insert("postgres".to_string(), Arc::new(Postgres::new()));
    dialects.insert("mysql".to_string(), Arc::new(MySql::new()));
    dialects.insert("sqlite".to_string(), Arc::new(Sqlite::new()));
    dialects.insert("oracle".to_string(), Arc::new(Oracle::new()));
    dialects
});

/// Register (or replace) the dialect used for `id`.
pub fn register_dialect(id: &str, dialect: Arc<dyn Dialect>) {
    REGISTRY.insert(id.trim().to_ascii_lowercase(), dialect);
}

/// The dialect registered under `id`, ignoring case.
///
/// # Errors
///
/// Returns a render error if no dialect is registered under `id`.
pub fn dialect(id: &str) -> Result<Arc<dyn Dialect>> {
    REGISTRY
        .get(&id.trim().to_ascii_lowercase())
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| render_error!("unknown dialect `{id}`"))
}

/// The dialect named by the global configuration.
///
/// # Errors
///
/// Returns a render error if the configured dialect is not registered.
pub fn default_dialect() -> Result<Arc<dyn Dialect>> {
    dialect(&global_config().dialect)
}

/// Characters wrapped around identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordWrap {
    prefix: &'static str,
    suffix: &'static str,
}

impl KeywordWrap {
    /// Identifiers are written as given.
    pub const NONE: Self = Self::new("", "");
    /// `"name"`
    pub const DOUBLE_QUOTE: Self = Self::new("\"", "\"");
    /// `` `name` ``
    pub const BACK_QUOTE: Self = Self::new("`", "`");
    /// `[name]`
    pub const SQUARE_BRACKETS: Self = Self::new("[", "]");

    /// Custom wrapping.
    #[must_use]
    pub const fn new(prefix: &'static str, suffix: &'static str) -> Self {
        Self { prefix, suffix }
    }

    /// Wrap `name`, doubling any embedded closing character. `*` is never
    /// wrapped.
    #[must_use]
    pub fn wrap(&self, name: &str) -> String {
        if name == "*" || self.prefix.is_empty() {
            return name.to_string();
        }
        let escaped = if self.suffix.is_empty() {
            name.to_string()
        } else {
            name.replace(self.suffix, &self.suffix.repeat(2))
        };
        format!("{}{escaped}{}", self.prefix, self.suffix)
    }
}

/// Parameter marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`
    Question,
    /// A prefix followed by the 1-based position, e.g. `$1`.
    Numbered(&'static str),
}

impl Placeholder {
    /// Append the marker for the `index`th (1-based) parameter.
    pub fn write(self, out: &mut String, index: usize) {
        match self {
            Self::Question => out.push('?'),
            Self::Numbered(prefix) => {
                out.push_str(prefix);
                out.push_str(&index.to_string());
            }
        }
    }
}

/// What an upsert does when the row already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    /// Keep the existing row.
    Nothing,
    /// Overwrite these columns with the inserted values.
    Update(Vec<String>),
}

/// Conflict handling of an INSERT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    /// Columns identifying the conflicting row.
    pub target: Vec<String>,
    /// Action taken on conflict.
    pub action: ConflictAction,
}

/// Access to a dialect as a trait object, for provided methods.
pub trait AsDialect {
    /// `self` as `&dyn Dialect`.
    fn as_dialect(&self) -> &dyn Dialect;
}

impl<T: Dialect> AsDialect for T {
    fn as_dialect(&self) -> &dyn Dialect {
        self
    }
}

/// A database's SQL flavour.
///
/// Provided methods render the standard productions; implementations
/// override only where their database differs.
pub trait Dialect: AsDialect + Send + Sync + fmt::Debug {
    /// Identifier used in diagnostics and the registry.
    fn name(&self) -> &str;

    /// Identifier quoting.
    fn keyword_wrap(&self) -> KeywordWrap;

    /// Parameter marker style.
    fn placeholder(&self) -> Placeholder;

    /// Quote a single identifier.
    fn quote_identifier(&self, name: &str) -> String {
        self.keyword_wrap().wrap(name)
    }

    /// ` LIMIT n OFFSET m`. Values are written inline.
    fn write_pagination(&self, out: &mut dyn SqlWriter, limit: Option<u64>, offset: Option<u64>) {
        if let Some(limit) = limit {
            out.push_sql(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            out.push_sql(&format!(" OFFSET {offset}"));
        }
    }

    /// ` ON CONFLICT (target) DO NOTHING | DO UPDATE SET c = EXCLUDED.c`.
    ///
    /// # Errors
    ///
    /// Returns a render error if an update is requested without a target.
    fn write_upsert(
        &self, cx: &RenderContext<'_>, upsert: &Upsert, out: &mut dyn SqlWriter,
    ) -> Result<()> {
        out.push_sql(" ON CONFLICT");
        if !upsert.target.is_empty() {
            out.push_sql(" (");
            write_list(cx, out, &upsert.target);
            out.push_sql(")");
        }
        match &upsert.action {
            ConflictAction::Update(columns) if !columns.is_empty() => {
                if upsert.target.is_empty() {
                    return Err(render_error!(
                        "{}: ON CONFLICT DO UPDATE requires conflict columns",
                        self.name()
                    ));
                }
                out.push_sql(" DO UPDATE SET ");
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        out.push_sql(", ");
                    }
                    cx.write_identifier(out, column);
                    out.push_sql(" = EXCLUDED.");
                    cx.write_identifier(out, column);
                }
            }
            _ => out.push_sql(" DO NOTHING"),
        }
        Ok(())
    }

    /// Tail of an INSERT that supplies no columns.
    ///
    /// # Errors
    ///
    /// Returns a render error if the database cannot insert a row of defaults.
    fn write_insert_default_values(&self, out: &mut dyn SqlWriter) -> Result<()> {
        out.push_sql(" DEFAULT VALUES");
        Ok(())
    }

    /// Write a SELECT statement.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered.
    fn write_select(
        &self, cx: &RenderContext<'_>, query: &QueryWrapper, out: &mut dyn SqlWriter,
    ) -> Result<()> {
        query.write_clauses(cx, out)
    }

    /// Render a SELECT statement and its parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if any fragment cannot be rendered.
    fn select_by_query(&self, query: &QueryWrapper) -> Result<Query> {
        query.build(self.as_dialect())
    }
}

fn write_list(cx: &RenderContext<'_>, out: &mut dyn SqlWriter, columns: &[String]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_sql(", ");
        }
        cx.write_identifier(out, column);
    }
}

macro_rules! dialect_type {
    ($(#[$meta:meta])* $name:ident, $wrap:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name {
            wrap: KeywordWrap,
        }

        impl $name {
            /// The dialect with its usual identifier quoting.
            #[must_use]
            pub const fn new() -> Self {
                Self { wrap: $wrap }
            }

            /// The dialect with custom identifier quoting.
            #[must_use]
            pub const fn with_keyword_wrap(wrap: KeywordWrap) -> Self {
                Self { wrap }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

dialect_type!(
    /// PostgreSQL: `"` quoting, `$n` placeholders.
    Postgres,
    KeywordWrap::DOUBLE_QUOTE
);
dialect_type!(
    /// MySQL: backquote quoting, `?` placeholders.
    MySql,
    KeywordWrap::BACK_QUOTE
);
dialect_type!(
    /// SQLite: `"` quoting, `?` placeholders.
    Sqlite,
    KeywordWrap::DOUBLE_QUOTE
);
dialect_type!(
    /// Oracle 12c and later.
    Oracle,
    KeywordWrap::DOUBLE_QUOTE
);

impl Dialect for Postgres {
    fn name(&self) -> &str {
        "postgres"
    }

    fn keyword_wrap(&self) -> KeywordWrap {
        self.wrap
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Numbered("$")
    }
}

impl Dialect for MySql {
    fn name(&self) -> &str {
        "mysql"
    }

    fn keyword_wrap(&self) -> KeywordWrap {
        self.wrap
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    // LIMIT [offset,] count; an offset alone needs the largest row count
    fn write_pagination(&self, out: &mut dyn SqlWriter, limit: Option<u64>, offset: Option<u64>) {
        match (offset, limit) {
            (Some(offset), Some(limit)) => out.push_sql(&format!(" LIMIT {offset}, {limit}")),
            (None, Some(limit)) => out.push_sql(&format!(" LIMIT {limit}")),
            (Some(offset), None) => out.push_sql(&format!(" LIMIT {offset}, {}", u64::MAX)),
            (None, None) => {}
        }
    }

    fn write_upsert(
        &self, cx: &RenderContext<'_>, upsert: &Upsert, out: &mut dyn SqlWriter,
    ) -> Result<()> {
        let columns: &[String] = match &upsert.action {
            ConflictAction::Update(columns) if !columns.is_empty() => columns.as_slice(),
            _ => match upsert.target.first() {
                Some(first) => std::slice::from_ref(first),
                None => {
                    return Err(render_error!(
                        "mysql: ignoring duplicates requires a conflict column"
                    ));
                }
            },
        };

        out.push_sql(" ON DUPLICATE KEY UPDATE ");
        let keep = !matches!(&upsert.action, ConflictAction::Update(c) if !c.is_empty());
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                out.push_sql(", ");
            }
            cx.write_identifier(out, column);
            out.push_sql(" = ");
            if keep {
                cx.write_identifier(out, column);
            } else {
                out.push_sql("VALUES(");
                cx.write_identifier(out, column);
                out.push_sql(")");
            }
        }
        Ok(())
    }

    fn write_insert_default_values(&self, out: &mut dyn SqlWriter) -> Result<()> {
        out.push_sql(" () VALUES ()");
        Ok(())
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn keyword_wrap(&self) -> KeywordWrap {
        self.wrap
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    // an OFFSET must follow a LIMIT; -1 means no limit
    fn write_pagination(&self, out: &mut dyn SqlWriter, limit: Option<u64>, offset: Option<u64>) {
        match limit {
            Some(limit) => out.push_sql(&format!(" LIMIT {limit}")),
            None if offset.is_some() => out.push_sql(" LIMIT -1"),
            None => {}
        }
        if let Some(offset) = offset {
            out.push_sql(&format!(" OFFSET {offset}"));
        }
    }
}

impl Dialect for Oracle {
    fn name(&self) -> &str {
        "oracle"
    }

    fn keyword_wrap(&self) -> KeywordWrap {
        self.wrap
    }

    fn placeholder(&self) -> Placeholder {
        Placeholder::Question
    }

    fn write_pagination(&self, out: &mut dyn SqlWriter, limit: Option<u64>, offset: Option<u64>) {
        out.push_sql(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            out.push_sql(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
    }

    fn write_upsert(&self, _: &RenderContext<'_>, _: &Upsert, _: &mut dyn SqlWriter) -> Result<()> {
        Err(render_error!("oracle: INSERT conflict handling is not supported, use MERGE"))
    }

    fn write_insert_default_values(&self, _: &mut dyn SqlWriter) -> Result<()> {
        Err(render_error!("oracle: an INSERT must supply at least one column"))
    }
}
