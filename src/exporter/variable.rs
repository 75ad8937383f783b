//! A declared output variable: a raw field, an optional group-by, and a
//! transform chain. Grounded on the `bufr.variables` mapping entries'
//! `{name, query, groupBy?, transforms?}` shape.

use crate::exporter::transforms::{Transform, apply_chain};
use crate::{DataContainer, DataObject, Error};

#[derive(Debug, Clone)]
pub struct Variable {
    /// The name this variable is exported under.
    pub export_name: String,
    /// The raw field name to read from the source container.
    pub source: String,
    pub group_by: Option<String>,
    pub transforms: Vec<Transform>,
}

impl Variable {
    pub fn new(export_name: impl Into<String>, source: impl Into<String>) -> Self {
        Variable {
            export_name: export_name.into(),
            source: source.into(),
            group_by: None,
            transforms: vec![],
        }
    }

    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = Some(group_by.into());
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = transforms;
        self
    }

    /// Resolves this variable's column out of `container`'s `category`,
    /// tagged with its group-by field name, then runs its transform chain.
    pub fn resolve(&self, container: &DataContainer, category: &crate::data_container::SubCategory) -> Result<DataObject, Error> {
        let mut obj = container
            .get(&self.source, category)
            .map_err(|_| Error::UnknownVariableSource(self.source.clone()))?
            .clone();
        obj.set_field_name(self.export_name.clone());
        if let Some(gb) = &self.group_by {
            obj.set_group_by_field_name(Some(gb.clone()));
        }
        apply_chain(&self.transforms, &mut obj)?;
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::DataContainer;

    #[test]
    fn resolve_applies_rename_and_transforms() {
        let mut dc = DataContainer::new();
        dc.add(
            "raw_temp",
            DataObject::from_f64("raw_temp".to_string(), vec![2], vec![1.0, 2.0]),
            &vec![],
        )
        .unwrap();
        let v = Variable::new("ObsValue/brightnessTemperature", "raw_temp")
            .with_transforms(vec![Transform::Scale(10.0)]);
        let obj = v.resolve(&dc, &vec![]).unwrap();
        assert_eq!(obj.field_name(), "ObsValue/brightnessTemperature");
    }

    #[test]
    fn resolve_errors_on_unknown_source() {
        let dc = DataContainer::new();
        let v = Variable::new("x", "nope");
        assert!(matches!(v.resolve(&dc, &vec![]), Err(Error::UnknownVariableSource(_))));
    }
}
