//! Splits partition rows into sub-categories by inspecting one column's
//! per-row value: each split inspects one column and produces a label per
//! row, partitioning all columns into sub-maps keyed by cross-product
//! tuple.

use crate::Error;
use crate::data_container::{DataContainer, SubCategory};

/// Produces one string label per row, used as a category axis's value.
pub trait Split {
    fn name(&self) -> &str;
    fn labels(&self, container: &DataContainer, category: &SubCategory) -> Result<Vec<String>, Error>;
}

/// Labels rows by the stringified value of one column.
#[derive(Debug, Clone)]
pub struct ValueSplit {
    pub name: String,
    pub variable: String,
}

impl Split for ValueSplit {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self, container: &DataContainer, category: &SubCategory) -> Result<Vec<String>, Error> {
        let obj = container.get(&self.variable, category)?;
        Ok(column_labels(obj))
    }
}

fn column_labels(obj: &crate::DataObject) -> Vec<String> {
    use crate::DataObject::*;
    let stride = obj.dims().iter().skip(1).product::<usize>().max(1);
    match obj {
        I32(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        U32(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        I64(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        U64(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        F32(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        F64(c) => c.data.chunks(stride).map(|chunk| chunk[0].to_string()).collect(),
        String(c) => c.data.chunks(stride).map(|chunk| chunk[0].clone()).collect(),
    }
}

/// Builds the [`crate::data_container::CategoryMap`] and a per-row tuple
/// assignment for `splits`, applied (in declaration order) to
/// `category`'s rows in `container`.
pub fn partition(
    container: &DataContainer,
    category: &SubCategory,
    splits: &[Box<dyn Split>],
) -> Result<(crate::data_container::CategoryMap, Vec<SubCategory>), Error> {
    let mut labels_by_name = std::collections::HashMap::new();
    for split in splits {
        labels_by_name.insert(split.name().to_string(), split.labels(container, category)?);
    }

    // `CategoryMap` is key-ordered (alphabetical by split name); row tuples
    // must use that same axis order so a tuple built here matches one built
    // from `DataContainer::all_sub_categories` (which walks the same map).
    let mut category_map = crate::data_container::CategoryMap::new();
    for (name, labels) in &labels_by_name {
        let mut distinct: Vec<String> = labels.clone();
        distinct.sort();
        distinct.dedup();
        category_map.insert(name.clone(), distinct);
    }

    let num_rows = labels_by_name.values().next().map(|l| l.len()).unwrap_or(0);
    let mut row_tuples = Vec::with_capacity(num_rows);
    for row in 0..num_rows {
        row_tuples.push(
            category_map
                .keys()
                .map(|name| labels_by_name[name][row].clone())
                .collect::<SubCategory>(),
        );
    }

    Ok((category_map, row_tuples))
}
