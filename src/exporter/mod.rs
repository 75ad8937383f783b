//! Turns a raw `field-name -> DataObject` map (as produced by
//! [`crate::result_set::ResultSet`]) into a [`DataContainer`] of declared
//! output variables, split into category tuples, via a three-step pipeline
//! (filter, split, variable).

pub mod filter;
pub mod split;
pub mod transforms;
pub mod variable;

use filter::Filter;
use split::Split;
use variable::Variable;

use crate::data_container::{CategoryMap, DataContainer, SubCategory};
use crate::Error;

#[derive(Default)]
pub struct Exporter {
    pub filters: Vec<Box<dyn Filter>>,
    pub splits: Vec<Box<dyn Split>>,
    pub variables: Vec<Variable>,
}

impl Exporter {
    pub fn new() -> Self {
        Exporter::default()
    }

    /// Runs the filter → split → variable pipeline against `raw`'s single
    /// (typically empty) category, producing a fresh container whose
    /// category map reflects the declared splits.
    pub fn export(&self, raw: &DataContainer) -> Result<DataContainer, Error> {
        let source_category: SubCategory = vec![];

        let kept_rows = self.apply_filters(raw, &source_category)?;
        let filtered = slice_category(raw, &source_category, &kept_rows)?;

        let (category_map, row_tuples) = split::partition(&filtered, &source_category, &self.splits)?;
        self.build_output(&filtered, &source_category, &category_map, &row_tuples)
    }

    fn apply_filters(&self, raw: &DataContainer, category: &SubCategory) -> Result<Vec<usize>, Error> {
        let num_rows = raw.size(category);
        let mut keep: Vec<usize> = (0..num_rows).collect();
        for filter in &self.filters {
            let kept_here = filter.keep_rows(raw, category)?;
            let kept_set: hashbrown::HashSet<usize> = kept_here.into_iter().collect();
            keep.retain(|r| kept_set.contains(r));
        }
        Ok(keep)
    }

    fn build_output(
        &self,
        filtered: &DataContainer,
        source_category: &SubCategory,
        category_map: &CategoryMap,
        row_tuples: &[SubCategory],
    ) -> Result<DataContainer, Error> {
        let mut out = DataContainer::with_category_map(category_map.clone());
        for variable in &self.variables {
            let resolved = variable.resolve(filtered, source_category)?;
            for tuple in out.all_sub_categories() {
                let rows: Vec<usize> = row_tuples
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| **t == tuple)
                    .map(|(r, _)| r)
                    .collect();
                let sliced = resolved.slice(&rows);
                out.add(&variable.export_name, sliced, &tuple)?;
            }
        }
        Ok(out)
    }
}

fn slice_category(container: &DataContainer, category: &SubCategory, rows: &[usize]) -> Result<DataContainer, Error> {
    let mut out = DataContainer::new();
    for name in container.field_names(category) {
        let obj = container.get(&name, category)?;
        out.add(&name, obj.slice(rows), &vec![])?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataObject;
    use filter::BoundingFilter;
    use split::ValueSplit;

    fn sample_container() -> DataContainer {
        let mut dc = DataContainer::new();
        dc.add(
            "lat",
            DataObject::from_f64("lat".to_string(), vec![4], vec![10.0, 50.0, -90.0, 25.0]),
            &vec![],
        )
        .unwrap();
        dc.add(
            "region",
            DataObject::from_strings(
                "region".to_string(),
                vec![4],
                vec!["N".to_string(), "N".to_string(), "S".to_string(), "N".to_string()],
            ),
            &vec![],
        )
        .unwrap();
        dc
    }

    #[test]
    fn export_filters_splits_and_renames() {
        let dc = sample_container();
        let exporter = Exporter {
            filters: vec![Box::new(BoundingFilter {
                variable: "lat".to_string(),
                lower_bound: Some(0.0),
                upper_bound: Some(60.0),
            })],
            splits: vec![Box::new(ValueSplit {
                name: "Region".to_string(),
                variable: "region".to_string(),
            })],
            variables: vec![Variable::new("MetaData/latitude", "lat")],
        };
        let out = exporter.export(&dc).unwrap();
        let n_cat = out.get("MetaData/latitude", &vec!["N".to_string()]).unwrap().dims()[0];
        assert_eq!(n_cat, 2);
    }
}
