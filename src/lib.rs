//! Query engine, result accumulator, typed column store and encoder that sit
//! between a decoded BUFR archive and a rectangular, grouped, dimensioned
//! scientific output file.
//!
//! The low-level bit-stream decoding (sections, descriptors, table B/C/D
//! lookup) lives in [`descriptor`], [`sections`], [`reader`] and [`tables`]
//! and is treated as an external collaborator by everything built on top of
//! it: [`provider`] adapts it to the structural-array interface the rest of
//! the crate consumes, [`query`] compiles path expressions against a
//! [`subset_table::SubsetTable`], [`query_runner`] walks decoded messages and
//! fills a [`result_set::ResultSet`], [`data_object`] and [`data_container`]
//! hold the resulting typed columns, and [`encoder`] writes them out.

mod descriptor;
mod reader;
pub mod sections;
pub mod tables;

pub mod collective;
pub mod data_container;
pub mod data_object;
pub mod encoder;
pub mod exporter;
pub mod mapping;
pub mod provider;
pub mod query;
pub mod query_runner;
pub mod result_set;
pub mod subset_table;
pub mod target;

pub use descriptor::*;
pub use reader::{DataEvent, DataReader, DataSpec};
pub use sections::{HeaderSections, ensure_end_section};
pub use tables::{TableBEntry, TableCEntry, TableDEntry, Tables};

pub use data_container::{CategoryMap, DataContainer, SubCategory};
pub use data_object::DataObject;
pub use query::{Query, QuerySet};
pub use query_runner::QueryRunner;
pub use result_set::ResultSet;

/// The error type used by this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Table error: {0}")]
    Table(String),
    #[error("Invalid data: {0}")]
    Invalid(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// The query parser rejected an input string.
    #[error("Malformed query \"{query}\": {reason}")]
    MalformedQuery { query: String, reason: String },

    /// A name lookup in a container or result set missed.
    #[error("Unknown field \"{0}\"")]
    UnknownField(String),

    /// A group-by field's dim path is incompatible with the target field.
    #[error("Bad group-by field \"{group_by}\" for field \"{field}\": dim paths diverge")]
    BadGroupByField { field: String, group_by: String },

    /// Append or other shape-sensitive operation across incompatible shapes.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A field chosen as a dimension scale has values that don't repeat.
    #[error("Dimension \"{0}\" has a non-repeating source field")]
    NonRepeatingDimensionSource(String),

    /// Scalar multiplication of an integer column by a non-integer value.
    #[error("Field \"{0}\" is integer-typed; cannot scale by a non-integer factor")]
    NonIntegerScalingOfIntField(String),

    /// Request to read a string column as numeric, or vice versa.
    #[error("Invalid type override \"{0}\" for field \"{1}\"")]
    InvalidTypeOverride(String, String),

    /// Two dimensions declared with the same name.
    #[error("Duplicate dimension \"{0}\"")]
    DuplicateDimension(String),

    /// A declared dimension's source path doesn't match any observed dim path.
    #[error("Invalid dimension path for dimension \"{0}\"")]
    InvalidDimensionPath(String),

    /// A `{key}` placeholder in the output path template had no substitution.
    #[error("Missing substitution for placeholder \"{0}\" in output path template")]
    MissingSubstitution(String),

    /// Compression level outside `[0, 9]`.
    #[error("Invalid compression level {0}, must be in 0..=9")]
    InvalidCompression(i32),

    /// A second file was opened on a file unit before the first was closed.
    #[error("File unit is already open; close it before opening another file")]
    FileUnitBusy,

    /// An encoder variable's `source` names a field absent from the container.
    #[error("Unknown variable source \"{0}\"")]
    UnknownVariableSource(String),

    #[error(transparent)]
    Hdf5(#[from] hdf5::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Primitive value in BUFR data.
#[derive(Clone, PartialEq, Eq)]
pub enum Value {
    /// Missing value
    Missing,
    /// Scaled decimal value
    Decimal(i32, i8),
    /// Integer value
    Integer(i32),
    /// String value
    String(String),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Missing => write!(f, "Missing"),
            &Value::Decimal(v, s) => {
                write!(
                    f,
                    "{:.1$}",
                    v as f64 * 10f64.powi(s as i32),
                    if s < 0 { -s } else { 0 } as usize
                )
            }
            Value::Integer(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl Value {
    /// Converts to a double, or `None` for [`Value::Missing`] and strings.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Missing => None,
            Value::Decimal(v, s) => Some(*v as f64 * 10f64.powi(*s as i32)),
            Value::Integer(v) => Some(*v as f64),
            Value::String(_) => None,
        }
    }

    /// Returns the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}
