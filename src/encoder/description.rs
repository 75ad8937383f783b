//! The encoder's declarative layout: dimensions, variables and global
//! attributes. Grounded on
//! `original_source/core/include/bufr/encoders/Description.h`
//! (`DimensionDescription`/`VariableDescription`/`GlobalDescription`),
//! built here from a parsed [`crate::mapping::EncoderConfig`] rather than
//! `eckit::LocalConfiguration`.

use crate::Error;
use crate::mapping::EncoderConfig;

#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Clone)]
pub struct DimensionDescription {
    pub name: String,
    /// Dim paths (as joined mnemonic strings) this dimension may be sourced
    /// from; a variable's own dim path must match one of these.
    pub paths: Vec<String>,
    /// Field to build the dimension's coordinate values from, via
    /// `DataObject::create_dimension_from_data`.
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VariableDescription {
    pub name: String,
    pub source: String,
    pub long_name: String,
    pub units: String,
    pub coordinates: Option<String>,
    pub range: Option<Range>,
    pub chunks: Vec<usize>,
    pub compression_level: Option<i32>,
}

#[derive(Debug, Clone)]
pub enum GlobalValue {
    String(String),
    Int(i64),
    Float(f64),
    IntVector(Vec<i64>),
    FloatVector(Vec<f64>),
}

#[derive(Debug, Clone)]
pub struct GlobalDescription {
    pub name: String,
    pub value: GlobalValue,
}

/// Declares the output file's whole shape: one instance is built per
/// mapping file and shared (read-only) across every category tuple's file.
#[derive(Debug, Clone, Default)]
pub struct Description {
    pub output_path_template: String,
    pub dimensions: Vec<DimensionDescription>,
    pub variables: Vec<VariableDescription>,
    pub globals: Vec<GlobalDescription>,
}

impl Description {
    pub fn from_config(config: &EncoderConfig) -> Result<Description, Error> {
        let mut seen_dims = hashbrown::HashSet::new();
        let mut dimensions = Vec::with_capacity(config.dimensions.len());
        for dim in &config.dimensions {
            if !seen_dims.insert(dim.name.clone()) {
                return Err(Error::DuplicateDimension(dim.name.clone()));
            }
            dimensions.push(DimensionDescription {
                name: dim.name.clone(),
                paths: dim.paths(),
                source: dim.source.clone(),
            });
        }

        let variables = config
            .variables
            .iter()
            .map(|v| {
                let compression_level = v.compression_level;
                if let Some(level) = compression_level {
                    if !(0..=9).contains(&level) {
                        return Err(Error::InvalidCompression(level));
                    }
                }
                Ok(VariableDescription {
                    name: v.name.clone(),
                    source: v.source.clone(),
                    long_name: v.long_name.clone(),
                    units: v.units.clone(),
                    coordinates: v.coordinates.clone(),
                    range: v.range.as_ref().map(|r| Range { start: r.start, end: r.end }),
                    chunks: v.chunks.clone(),
                    compression_level,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let globals = config
            .globals
            .iter()
            .map(|g| GlobalDescription {
                name: g.name().to_string(),
                value: match g {
                    crate::mapping::GlobalConfig::String { value, .. } => GlobalValue::String(value.clone()),
                    crate::mapping::GlobalConfig::Int { value, .. } => GlobalValue::Int(*value),
                    crate::mapping::GlobalConfig::Float { value, .. } => GlobalValue::Float(*value),
                    crate::mapping::GlobalConfig::IntVector { value, .. } => GlobalValue::IntVector(value.clone()),
                    crate::mapping::GlobalConfig::FloatVector { value, .. } => {
                        GlobalValue::FloatVector(value.clone())
                    }
                },
            })
            .collect();

        Ok(Description {
            output_path_template: config.output_path_template.clone(),
            dimensions,
            variables,
            globals,
        })
    }

    /// Splits `Group/var` or `Group@var` into `(Some(group), var)`, or
    /// `(None, name)` when no separator is present.
    pub fn split_group(name: &str) -> (Option<&str>, &str) {
        let sep_pos = name.find(['/', '@']);
        match sep_pos {
            Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
            None => (None, name),
        }
    }

    /// Substitutes every `{key}` placeholder in `output_path_template` with
    /// `category`'s labels, keyed by `category_map`'s axis names in the
    /// same order `category` lists them.
    pub fn render_output_path(
        &self,
        category_names: &[String],
        category: &[String],
    ) -> Result<String, Error> {
        let mut path = self.output_path_template.clone();
        for (name, value) in category_names.iter().zip(category) {
            path = path.replace(&format!("{{{name}}}"), value);
        }
        if let Some(start) = path.find('{') {
            let end = path[start..].find('}').map(|e| start + e + 1).unwrap_or(path.len());
            return Err(Error::MissingSubstitution(path[start..end].to_string()));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_group_handles_both_separators() {
        assert_eq!(Description::split_group("MetaData/latitude"), (Some("MetaData"), "latitude"));
        assert_eq!(Description::split_group("MetaData@latitude"), (Some("MetaData"), "latitude"));
        assert_eq!(Description::split_group("latitude"), (None, "latitude"));
    }

    #[test]
    fn render_output_path_substitutes_placeholders() {
        let desc = Description {
            output_path_template: "out_{Region}.nc".to_string(),
            ..Description::default()
        };
        let rendered = desc.render_output_path(&["Region".to_string()], &["North".to_string()]).unwrap();
        assert_eq!(rendered, "out_North.nc");
    }

    #[test]
    fn render_output_path_errors_on_unfilled_placeholder() {
        let desc = Description {
            output_path_template: "out_{Region}.nc".to_string(),
            ..Description::default()
        };
        assert!(matches!(
            desc.render_output_path(&[], &[]),
            Err(Error::MissingSubstitution(_))
        ));
    }
}
