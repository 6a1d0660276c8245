//! Physical schema snapshots and the type-compatibility matrix

use crate::error::{OntologyError, Result};
use crate::ontology::SemanticType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Bumped whenever `SemanticType::accepts` changes. Severity classification
/// depends on the matrix, so reports are only comparable across equal versions.
pub const COMPATIBILITY_MATRIX_VERSION: u32 = 1;

/// Physical column type, parsed from the free-form tag a caller supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhysicalType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Guid,
    Binary,
}

impl PhysicalType {
    /// Parse a type tag such as `"GUID"`, `"Decimal"` or `"nvarchar(50)"`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lowered = tag.trim().to_lowercase();
        let base = lowered.split('(').next().unwrap_or("").trim();

        let ty = match base {
            "string" | "text" | "varchar" | "nvarchar" | "char" | "nchar" | "ntext"
            | "character varying" | "utf8" => PhysicalType::Text,
            "int" | "integer" | "int64" | "int32" | "int16" | "bigint" | "smallint"
            | "tinyint" | "long" | "whole number" => PhysicalType::Integer,
            "decimal" | "double" | "float" | "real" | "numeric" | "number" | "money"
            | "smallmoney" | "currency" | "fixed decimal number" => PhysicalType::Decimal,
            "boolean" | "bool" | "bit" | "true/false" => PhysicalType::Boolean,
            "date" => PhysicalType::Date,
            "datetime" | "datetime2" | "datetimeoffset" | "smalldatetime" | "timestamp"
            | "date/time" => PhysicalType::DateTime,
            "guid" | "uuid" | "uniqueidentifier" => PhysicalType::Guid,
            "binary" | "varbinary" | "image" | "bytes" | "blob" => PhysicalType::Binary,
            _ => return None,
        };
        Some(ty)
    }
}

impl FromStr for PhysicalType {
    type Err = OntologyError;

    fn from_str(s: &str) -> Result<Self> {
        PhysicalType::from_tag(s)
            .ok_or_else(|| OntologyError::InvalidSnapshot(format!("Unknown type tag '{}'", s)))
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalType::Text => write!(f, "Text"),
            PhysicalType::Integer => write!(f, "Integer"),
            PhysicalType::Decimal => write!(f, "Decimal"),
            PhysicalType::Boolean => write!(f, "Boolean"),
            PhysicalType::Date => write!(f, "Date"),
            PhysicalType::DateTime => write!(f, "DateTime"),
            PhysicalType::Guid => write!(f, "GUID"),
            PhysicalType::Binary => write!(f, "Binary"),
        }
    }
}

impl SemanticType {
    /// Compatibility matrix, version `COMPATIBILITY_MATRIX_VERSION`.
    ///
    /// | semantic | accepted physical types |
    /// |----------|-------------------------|
    /// | STRING   | Text                    |
    /// | INTEGER  | Integer                 |
    /// | DECIMAL  | Decimal, Integer        |
    /// | BOOLEAN  | Boolean                 |
    /// | DATETIME | DateTime, Date          |
    /// | GUID     | Guid, Text              |
    pub fn accepts(self, physical: PhysicalType) -> bool {
        use PhysicalType as P;
        match self {
            SemanticType::String => matches!(physical, P::Text),
            SemanticType::Integer => matches!(physical, P::Integer),
            SemanticType::Decimal => matches!(physical, P::Decimal | P::Integer),
            SemanticType::Boolean => matches!(physical, P::Boolean),
            SemanticType::DateTime => matches!(physical, P::DateTime | P::Date),
            SemanticType::Guid => matches!(physical, P::Guid | P::Text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotColumn {
    pub name: String,
    pub physical_type: PhysicalType,
}

/// Observed physical schema of one table: column name → type.
///
/// Columns are kept sorted by normalized name, so anything derived from a
/// snapshot is independent of the order the caller produced columns in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    columns: Vec<SnapshotColumn>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// Snapshot file layouts: a flat column map, or one column map per table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Flat(BTreeMap<String, String>),
    Tables(BTreeMap<String, BTreeMap<String, String>>),
}

/// Key used to compare column names: physical names are case-insensitive.
pub fn column_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl SchemaSnapshot {
    /// Build a snapshot from raw `(column, type tag)` pairs.
    ///
    /// Fails with `InvalidSnapshot` on unknown type tags, blank column names,
    /// or two columns that collide once normalized.
    pub fn from_columns<I, K, V>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (name, tag) in columns {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(OntologyError::InvalidSnapshot(
                    "Column with empty name".to_string(),
                ));
            }
            let physical_type: PhysicalType = tag.as_ref().parse().map_err(|_| {
                OntologyError::InvalidSnapshot(format!(
                    "Unknown type tag '{}' for column '{}'",
                    tag.as_ref(),
                    name
                ))
            })?;
            parsed.push(SnapshotColumn {
                name: name.to_string(),
                physical_type,
            });
        }
        Self::from_typed(parsed)
    }

    pub fn from_typed(mut columns: Vec<SnapshotColumn>) -> Result<Self> {
        columns.sort_by(|a, b| {
            column_key(&a.name)
                .cmp(&column_key(&b.name))
                .then(a.name.cmp(&b.name))
        });

        let mut index = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if let Some(prev) = index.insert(column_key(&column.name), idx) {
                return Err(OntologyError::InvalidSnapshot(format!(
                    "Columns '{}' and '{}' collide after normalization",
                    columns[prev].name, column.name
                )));
            }
        }

        Ok(Self { columns, index })
    }

    /// Load a snapshot JSON file. Per-table files are resolved by `table`,
    /// trying the full identifier first and then its last dotted segment.
    pub fn load(path: impl AsRef<Path>, table: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let file: SnapshotFile = serde_json::from_str(&content).map_err(|e| {
            OntologyError::InvalidSnapshot(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        match file {
            SnapshotFile::Flat(columns) => Self::from_columns(columns),
            SnapshotFile::Tables(mut tables) => {
                let table = table.ok_or_else(|| {
                    OntologyError::InvalidSnapshot(format!(
                        "{} holds several tables; a table name is required",
                        path.display()
                    ))
                })?;
                let short = table.rsplit('.').next().unwrap_or(table);
                let columns = tables
                    .remove(table)
                    .or_else(|| tables.remove(short))
                    .ok_or_else(|| {
                        OntologyError::InvalidSnapshot(format!(
                            "Table '{}' not present in {}",
                            table,
                            path.display()
                        ))
                    })?;
                Self::from_columns(columns)
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&SnapshotColumn> {
        self.index.get(&column_key(column)).map(|&idx| &self.columns[idx])
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(&column_key(column))
    }

    pub fn columns(&self) -> &[SnapshotColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
