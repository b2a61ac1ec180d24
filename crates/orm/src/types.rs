//! Column type registry.
//!
//! Field types are recorded by name when an entity is registered. The
//! registry decides which of those names map straight onto a column and which
//! are query-building helpers that must never be persisted.

use std::fmt;
use std::sync::LazyLock;

use dashmap::DashSet;

const SUPPORTED: &[&str] = &[
    "bool",
    "char",
    "i8",
    "i16",
    "i32",
    "i64",
    "i128",
    "isize",
    "u8",
    "u16",
    "u32",
    "u64",
    "u128",
    "usize",
    "f32",
    "f64",
    "String",
    "str",
    "Vec<u8>",
    "Bytes",
    "NaiveDate",
    "NaiveTime",
    "NaiveDateTime",
    "DateTime<Utc>",
    "DateTime<FixedOffset>",
    "DateTime<Local>",
    "Date",
    "Time",
    "PrimitiveDateTime",
    "OffsetDateTime",
    "Decimal",
    "BigDecimal",
    "Uuid",
];

const IGNORED: &[&str] = &["QueryWrapper", "QueryColumn", "QueryCondition", "QueryTable"];

const COLLECTIONS: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet"];

const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

static REGISTRY: LazyLock<ColumnTypeRegistry> = LazyLock::new(ColumnTypeRegistry::seeded);

/// Declared type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A plain named type, e.g. `i64` or `NaiveDate`.
    Scalar(String),
    /// A unit-only enum, persisted by name.
    Enum(String),
    /// A sequence or set, with its element type.
    Collection {
        /// Container name, e.g. `Vec`.
        container: String,
        /// Element type name.
        element: String,
    },
    /// A key/value map.
    Map(String),
    /// A fixed-size array or slice.
    Array(String),
}

impl FieldType {
    /// Classify a type as written in source, e.g. `Option<Vec<String>>`.
    ///
    /// `Option` is unwrapped, module paths are dropped and standard
    /// containers are recognised by name. `Vec<u8>` is treated as a scalar.
    #[must_use]
    pub fn parse(written: &str) -> Self {
        let ty = normalize(written);

        if let Some(inner) = generic_argument(&ty, "Option") {
            return Self::parse(inner);
        }
        if ty.starts_with('[') {
            return Self::Array(ty);
        }
        if ty == "Vec<u8>" {
            return Self::Scalar(ty);
        }

        let base = ty.split('<').next().unwrap_or_default();
        if COLLECTIONS.contains(&base)
            && let Some(element) = generic_argument(&ty, base)
        {
            return Self::Collection {
                container: base.to_string(),
                element: element.to_string(),
            };
        }
        if MAPS.contains(&base) {
            return Self::Map(ty);
        }
        Self::Scalar(ty)
    }

    /// Type name as recorded, with any `Option` removed.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Scalar(name) | Self::Enum(name) | Self::Map(name) | Self::Array(name) => {
                name.clone()
            }
            Self::Collection { container, element } => format!("{container}<{element}>"),
        }
    }

    /// Element type for collections.
    #[must_use]
    pub fn element(&self) -> Option<&str> {
        match self {
            Self::Collection { element, .. } => Some(element),
            _ => None,
        }
    }

    /// `true` for `String`/`str` fields.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Scalar(name) if name == "String" || name == "str")
    }

    /// `true` for enum fields.
    #[must_use]
    pub const fn is_enum(&self) -> bool {
        matches!(self, Self::Enum(_))
    }

    /// `true` for collection fields.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection { .. })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// Removes whitespace, leading references and module paths (outside and
// inside generic arguments).
fn normalize(written: &str) -> String {
    let compact: String = written.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.trim_start_matches('&').trim_start_matches("'static");

    let mut out = String::with_capacity(compact.len());
    let mut segment = String::new();
    let mut chars = compact.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
            continue;
        }
        if ch.is_alphanumeric() || ch == '_' {
            segment.push(ch);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(&segment);
    out
}

fn generic_argument<'a>(ty: &'a str, base: &str) -> Option<&'a str> {
    ty.strip_prefix(base)?.strip_prefix('<')?.strip_suffix('>')
}

/// Append-only sets of natively persisted and ignored type names.
#[derive(Debug, Default)]
pub struct ColumnTypeRegistry {
    supported: DashSet<String>,
    ignored: DashSet<String>,
}

impl ColumnTypeRegistry {
    /// Registry seeded with the built-in scalar and helper types.
    #[must_use]
    pub fn seeded() -> Self {
        let registry = Self::default();
        for name in SUPPORTED {
            registry.supported.insert((*name).to_string());
        }
        for name in IGNORED {
            registry.ignored.insert((*name).to_string());
        }
        registry
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Mark a type name as directly persistable.
    pub fn register_supported(&self, name: &str) {
        self.supported.insert(normalize(name));
    }

    /// Mark a type name as a query-building helper to drop from entities.
    pub fn register_ignored(&self, name: &str) {
        self.ignored.insert(normalize(name));
    }

    /// `true` if the field type maps onto a column without a handler.
    #[must_use]
    pub fn is_supported(&self, field_type: &FieldType) -> bool {
        match field_type {
            FieldType::Scalar(name) => self.supported.contains(name),
            _ => false,
        }
    }

    /// `true` if fields of this type are dropped entirely.
    #[must_use]
    pub fn is_ignored(&self, field_type: &FieldType) -> bool {
        match field_type {
            FieldType::Scalar(name) => {
                let base = name.split('<').next().unwrap_or_default();
                self.ignored.contains(name) || self.ignored.contains(base)
            }
            _ => false,
        }
    }
}

/// Mark a type name as directly persistable in the process-wide registry.
pub fn register_supported_type(name: &str) {
    ColumnTypeRegistry::global().register_supported(name);
}

/// Mark a type name as ignored in the process-wide registry.
pub fn register_ignored_type(name: &str) {
    ColumnTypeRegistry::global().register_ignored(name);
}
