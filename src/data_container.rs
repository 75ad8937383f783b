//! A category-tuple-keyed map of field name to [`DataObject`]. Grounded on
//! `original_source/core/include/bufr/DataContainer.h` /
//! `core/src/bufr/DataContainer.cpp`: one [`DataSetMap`] per subcategory
//! combination, pre-populated from the cartesian product of a
//! [`CategoryMap`]'s value lists so every combination exists (possibly
//! empty) from construction.

use indexmap::IndexMap;

use crate::Error;
use crate::data_object::DataObject;

/// One category's possible values, e.g. `SatId -> ["GOES-16", "GOES-17"]`.
pub type SubCategory = Vec<String>;

/// Category name to its possible sub-values.
pub type CategoryMap = std::collections::BTreeMap<String, SubCategory>;

/// Field name to [`DataObject`], order-preserving (insertion order drives
/// the encoder's variable order).
type DataSetMap = IndexMap<String, DataObject>;

/// Collection of [`DataObject`]s, partitioned by category combination.
#[derive(Debug, Default)]
pub struct DataContainer {
    category_map: CategoryMap,
    data_sets: std::collections::HashMap<SubCategory, DataSetMap>,
}

impl DataContainer {
    pub fn new() -> Self {
        let mut dc = DataContainer {
            category_map: CategoryMap::new(),
            data_sets: std::collections::HashMap::new(),
        };
        dc.data_sets.insert(vec![], DataSetMap::new());
        dc
    }

    pub fn with_category_map(category_map: CategoryMap) -> Self {
        let mut dc = DataContainer {
            category_map,
            data_sets: std::collections::HashMap::new(),
        };
        dc.make_data_sets();
        dc
    }

    fn make_data_sets(&mut self) {
        let combos = cartesian_product(&self.category_map);
        self.data_sets = combos.into_iter().map(|c| (c, DataSetMap::new())).collect();
        if self.data_sets.is_empty() {
            self.data_sets.insert(vec![], DataSetMap::new());
        }
    }

    pub fn category_map(&self) -> &CategoryMap {
        &self.category_map
    }

    pub fn add(&mut self, field_name: &str, data: DataObject, category_id: &SubCategory) -> Result<(), Error> {
        if self.has_key(field_name, category_id) {
            return Err(Error::Invalid(format!(
                "field \"{field_name}\" already exists for subcategory {}",
                make_sub_category_str(category_id)
            )));
        }
        let set = self
            .data_sets
            .entry(category_id.clone())
            .or_insert_with(DataSetMap::new);
        set.insert(field_name.to_string(), data);
        Ok(())
    }

    pub fn set(&mut self, field_name: &str, data: DataObject, category_id: &SubCategory) -> Result<(), Error> {
        if !self.has_key(field_name, category_id) {
            return Err(Error::UnknownField(field_name.to_string()));
        }
        self.data_sets.get_mut(category_id).unwrap().insert(field_name.to_string(), data);
        Ok(())
    }

    pub fn get(&self, field_name: &str, category_id: &SubCategory) -> Result<&DataObject, Error> {
        self.data_sets
            .get(category_id)
            .and_then(|s| s.get(field_name))
            .ok_or_else(|| Error::UnknownField(field_name.to_string()))
    }

    pub fn get_paths(&self, field_name: &str, category_id: &SubCategory) -> Result<Vec<String>, Error> {
        Ok(self.get(field_name, category_id)?.dim_paths().to_vec())
    }

    /// The `DataObject` this field is grouped by, if it declares one.
    pub fn get_group_by_object(&self, field_name: &str, category_id: &SubCategory) -> Result<&DataObject, Error> {
        let field = self.get(field_name, category_id)?;
        match field.group_by_field_name() {
            Some(gb) => self.get(gb, category_id),
            None => Ok(field),
        }
    }

    pub fn has_key(&self, field_name: &str, category_id: &SubCategory) -> bool {
        self.data_sets.get(category_id).is_some_and(|s| s.contains_key(field_name))
    }

    pub fn has_category(&self, category_id: &SubCategory) -> bool {
        self.data_sets.contains_key(category_id)
    }

    pub fn get_sub_container(&self, category_id: &SubCategory) -> Result<DataContainer, Error> {
        if !self.has_category(category_id) {
            return Err(Error::Invalid(format!(
                "unknown subcategory {}",
                make_sub_category_str(category_id)
            )));
        }
        let mut sub = DataContainer::new();
        sub.category_map = self.category_map.clone();
        sub.data_sets = std::collections::HashMap::new();
        sub.data_sets
            .insert(category_id.clone(), self.data_sets[category_id].clone());
        Ok(sub)
    }

    /// The row count of the first field in `category_id`'s data set, or 0 if
    /// it has no fields.
    pub fn size(&self, category_id: &SubCategory) -> usize {
        self.data_sets
            .get(category_id)
            .and_then(|s| s.values().next())
            .map(|obj| obj.dims().first().copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn all_sub_categories(&self) -> Vec<SubCategory> {
        self.data_sets.keys().cloned().collect()
    }

    pub fn field_names(&self, category_id: &SubCategory) -> Vec<String> {
        self.data_sets
            .get(category_id)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends `other`'s matching (category, field) columns onto this
    /// container's. `other` must declare the same categories and, for any
    /// category already holding fields, exactly the same field names —
    /// mismatched field sets error rather than silently adding or dropping
    /// columns.
    pub fn append(&mut self, other: &DataContainer) -> Result<(), Error> {
        for (category, set) in &other.data_sets {
            let mine = self
                .data_sets
                .entry(category.clone())
                .or_insert_with(DataSetMap::new);
            if !mine.is_empty() {
                let mine_names: std::collections::HashSet<&str> = mine.keys().map(String::as_str).collect();
                let other_names: std::collections::HashSet<&str> = set.keys().map(String::as_str).collect();
                if mine_names != other_names {
                    return Err(Error::Invalid(format!(
                        "cannot append mismatched field sets for subcategory {}",
                        make_sub_category_str(category)
                    )));
                }
            }
            for (name, obj) in set {
                match mine.get_mut(name) {
                    Some(existing) => existing.append(obj)?,
                    None => {
                        mine.insert(name.clone(), obj.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Deduplicates rows within every category, keyed by the composite hash
    /// of `dedup_fields`'s columns, keeping the first occurrence of each key.
    pub fn deduplicate(&mut self, dedup_fields: &[String]) -> Result<(), Error> {
        let categories: Vec<SubCategory> = self.data_sets.keys().cloned().collect();
        for category in categories {
            let set = self.data_sets.get(&category).unwrap();
            let Some(num_rows) = set.values().next().map(|o| o.dims().first().copied().unwrap_or(0)) else {
                continue;
            };

            let mut row_hashes = vec![0u64; num_rows];
            for field in dedup_fields {
                let Some(obj) = set.get(field) else {
                    return Err(Error::UnknownField(field.clone()));
                };
                let hashes = obj.hash_rows();
                for (acc, h) in row_hashes.iter_mut().zip(hashes) {
                    *acc = acc.wrapping_mul(31).wrapping_add(h);
                }
            }

            let mut seen = hashbrown::HashSet::new();
            let keep_rows: Vec<usize> = (0..num_rows).filter(|&r| seen.insert(row_hashes[r])).collect();

            let set = self.data_sets.get_mut(&category).unwrap();
            for obj in set.values_mut() {
                *obj = obj.slice(&keep_rows);
            }
        }
        Ok(())
    }

    /// Collective gather onto `root_rank` (writes only on that rank under
    /// the `mpi` feature).
    #[cfg(feature = "mpi")]
    pub fn gather(&mut self, comm: &crate::collective::Comm, root_rank: i32) -> Result<(), Error> {
        for set in self.data_sets.values_mut() {
            for obj in set.values_mut() {
                *obj = crate::collective::gather(comm, obj, root_rank)?;
            }
        }
        Ok(())
    }

    /// Collective gather onto every rank.
    #[cfg(feature = "mpi")]
    pub fn all_gather(&mut self, comm: &crate::collective::Comm) -> Result<(), Error> {
        for set in self.data_sets.values_mut() {
            for obj in set.values_mut() {
                *obj = crate::collective::all_gather(comm, obj)?;
            }
        }
        Ok(())
    }
}

pub fn make_sub_category_str(category_id: &SubCategory) -> String {
    category_id.join("/")
}

fn cartesian_product(category_map: &CategoryMap) -> Vec<SubCategory> {
    let mut combos: Vec<SubCategory> = vec![vec![]];
    for values in category_map.values() {
        let mut next = vec![];
        for combo in &combos {
            for value in values {
                let mut c = combo.clone();
                c.push(value.clone());
                next.push(c);
            }
        }
        combos = next;
    }
    combos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(name: &str, n: usize) -> DataObject {
        DataObject::from_i32(name.to_string(), vec![n], (0..n as i32).collect())
    }

    #[test]
    fn default_container_has_one_empty_subcategory() {
        let dc = DataContainer::new();
        assert!(dc.has_category(&vec![]));
    }

    #[test]
    fn with_category_map_builds_cartesian_product() {
        let mut map = CategoryMap::new();
        map.insert("SatId".to_string(), vec!["GOES-16".to_string(), "GOES-17".to_string()]);
        map.insert("Region".to_string(), vec!["N".to_string(), "S".to_string()]);
        let dc = DataContainer::with_category_map(map);
        assert_eq!(dc.all_sub_categories().len(), 4);
    }

    #[test]
    fn add_then_get_round_trips() {
        let mut dc = DataContainer::new();
        dc.add("lat", obj("lat", 3), &vec![]).unwrap();
        assert!(dc.has_key("lat", &vec![]));
        assert_eq!(dc.get("lat", &vec![]).unwrap().dims(), &[3]);
    }

    #[test]
    fn add_twice_errors() {
        let mut dc = DataContainer::new();
        dc.add("lat", obj("lat", 3), &vec![]).unwrap();
        assert!(dc.add("lat", obj("lat", 3), &vec![]).is_err());
    }

    #[test]
    fn append_grows_row_count() {
        let mut a = DataContainer::new();
        a.add("lat", obj("lat", 2), &vec![]).unwrap();
        let mut b = DataContainer::new();
        b.add("lat", obj("lat", 3), &vec![]).unwrap();
        a.append(&b).unwrap();
        assert_eq!(a.get("lat", &vec![]).unwrap().dims(), &[5]);
    }

    #[test]
    fn append_with_mismatched_fields_errors() {
        let mut a = DataContainer::new();
        a.add("lat", obj("lat", 2), &vec![]).unwrap();
        let mut b = DataContainer::new();
        b.add("lon", obj("lon", 2), &vec![]).unwrap();
        assert!(a.append(&b).is_err());
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let mut dc = DataContainer::new();
        dc.add(
            "id",
            DataObject::from_i32("id".to_string(), vec![4], vec![1, 2, 1, 3]),
            &vec![],
        )
        .unwrap();
        dc.deduplicate(&["id".to_string()]).unwrap();
        assert_eq!(dc.get("id", &vec![]).unwrap().dims(), &[3]);
    }
}
