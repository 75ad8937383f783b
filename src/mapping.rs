//! Parses the declarative YAML mapping file describing which BUFR fields to
//! query, how to filter/split/transform them, and how the encoder should
//! lay out the output file. Grounded on
//! `original_source/core/src/bufr/BufrReader/BufrDescription.cpp` (the
//! `bufr:` half) and `core/src/encoders/netcdf/Description.cpp` (the
//! `encoder:` half); parsed with `serde` + `serde_yaml`, the same pairing
//! already used for `serde` elsewhere (`sections.rs`'s `Serialize` derive).

use std::collections::HashMap;

use serde::Deserialize;

use crate::Error;
use crate::exporter::filter::{BoundingFilter, Filter};
use crate::exporter::split::{Split, ValueSplit};
use crate::exporter::transforms::Transform;
use crate::exporter::variable::Variable;
use crate::exporter::Exporter;

#[derive(Debug, Deserialize)]
pub struct Mapping {
    pub bufr: BufrConfig,
    pub encoder: EncoderConfig,
}

impl Mapping {
    pub fn from_yaml_str(s: &str) -> Result<Mapping, Error> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_path(path: &std::path::Path) -> Result<Mapping, Error> {
        let content = std::fs::read_to_string(path)?;
        Mapping::from_yaml_str(&content)
    }
}

#[derive(Debug, Deserialize)]
pub struct BufrConfig {
    pub subsets: Vec<String>,
    pub variables: Vec<QueryVariableConfig>,
    #[serde(default)]
    pub splits: Vec<SplitConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

#[derive(Debug, Deserialize)]
pub struct QueryVariableConfig {
    pub name: String,
    pub query: String,
    #[serde(rename = "groupBy", default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformConfig {
    Identity,
    Scale(f64),
    Offset(f64),
}

impl From<&TransformConfig> for Transform {
    fn from(cfg: &TransformConfig) -> Self {
        match cfg {
            TransformConfig::Identity => Transform::Identity,
            TransformConfig::Scale(f) => Transform::Scale(*f),
            TransformConfig::Offset(f) => Transform::Offset(*f),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SplitConfig {
    pub name: String,
    pub variable: String,
}

#[derive(Debug, Deserialize)]
pub struct FilterConfig {
    pub variable: String,
    #[serde(rename = "lowerBound", default)]
    pub lower_bound: Option<f64>,
    #[serde(rename = "upperBound", default)]
    pub upper_bound: Option<f64>,
}

impl BufrConfig {
    /// Builds the exporter pipeline (filter → split → variable) declared
    /// by this `bufr:` section. The query-resolution side (`variables`'
    /// `query` strings) is driven separately, by feeding them into a
    /// [`crate::query::QuerySet`] before results reach the exporter.
    pub fn to_exporter(&self) -> Exporter {
        let filters: Vec<Box<dyn Filter>> = self
            .filters
            .iter()
            .map(|f| -> Box<dyn Filter> {
                Box::new(BoundingFilter {
                    variable: f.variable.clone(),
                    lower_bound: f.lower_bound,
                    upper_bound: f.upper_bound,
                })
            })
            .collect();

        let splits: Vec<Box<dyn Split>> = self
            .splits
            .iter()
            .map(|s| -> Box<dyn Split> {
                Box::new(ValueSplit {
                    name: s.name.clone(),
                    variable: s.variable.clone(),
                })
            })
            .collect();

        let variables = self
            .variables
            .iter()
            .map(|v| {
                let mut var = Variable::new(v.name.clone(), v.name.clone());
                if let Some(gb) = &v.group_by {
                    var = var.with_group_by(gb.clone());
                }
                var.with_transforms(v.transforms.iter().map(Transform::from).collect())
            })
            .collect();

        Exporter { filters, splits, variables }
    }
}

#[derive(Debug, Deserialize)]
pub struct EncoderConfig {
    #[serde(rename = "outputPathTemplate")]
    pub output_path_template: String,
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
    pub variables: Vec<OutputVariableConfig>,
    #[serde(default)]
    pub globals: Vec<GlobalConfig>,
}

#[derive(Debug, Deserialize)]
pub struct DimensionConfig {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl DimensionConfig {
    pub fn paths(&self) -> Vec<String> {
        if let Some(p) = &self.path {
            vec![p.clone()]
        } else {
            self.paths.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RangeConfig {
    pub start: f32,
    pub end: f32,
}

#[derive(Debug, Deserialize)]
pub struct OutputVariableConfig {
    pub name: String,
    pub source: String,
    #[serde(rename = "longName")]
    pub long_name: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub coordinates: Option<String>,
    #[serde(default)]
    pub range: Option<RangeConfig>,
    #[serde(default)]
    pub chunks: Vec<usize>,
    #[serde(rename = "compressionLevel", default)]
    pub compression_level: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GlobalConfig {
    String { name: String, value: String },
    Int { name: String, value: i64 },
    Float { name: String, value: f64 },
    IntVector { name: String, value: Vec<i64> },
    FloatVector { name: String, value: Vec<f64> },
}

impl GlobalConfig {
    pub fn name(&self) -> &str {
        match self {
            GlobalConfig::String { name, .. }
            | GlobalConfig::Int { name, .. }
            | GlobalConfig::Float { name, .. }
            | GlobalConfig::IntVector { name, .. }
            | GlobalConfig::FloatVector { name, .. } => name,
        }
    }
}

/// Flattens a split's name to its declared values, for validating a mapping
/// before it drives an actual run (e.g. checking a dimension's declared
/// `source` resolves to a known query variable).
pub fn variable_names(config: &BufrConfig) -> HashMap<String, &QueryVariableConfig> {
    config.variables.iter().map(|v| (v.name.clone(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
bufr:
  subsets: [ATMS]
  variables:
    - name: latitude
      query: "*/CLAT"
    - name: brightnessTemperature
      query: "*/BRIT/TMBR"
      groupBy: channelNumber
      transforms:
        - scale: 0.1
  splits: []
  filters:
    - variable: latitude
      lowerBound: -90.0
      upperBound: 90.0
encoder:
  outputPathTemplate: "out.nc"
  dimensions:
    - name: Channel
      path: "*/BRIT/CHNM"
      source: channelNumber
  variables:
    - name: MetaData/latitude
      source: latitude
      longName: Latitude
      units: degrees_north
  globals:
    - type: string
      name: platform
      value: NOAA-20
"#;

    #[test]
    fn parses_full_mapping() {
        let mapping = Mapping::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(mapping.bufr.variables.len(), 2);
        assert_eq!(mapping.encoder.variables[0].name, "MetaData/latitude");
        assert_eq!(mapping.encoder.globals[0].name(), "platform");
    }

    #[test]
    fn to_exporter_builds_matching_shape() {
        let mapping = Mapping::from_yaml_str(SAMPLE).unwrap();
        let exporter = mapping.bufr.to_exporter();
        assert_eq!(exporter.variables.len(), 2);
        assert_eq!(exporter.filters.len(), 1);
    }
}
