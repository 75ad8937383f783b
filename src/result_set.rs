//! Accumulates raw, jagged per-subset-instance cells and reshapes them into
//! rectangular [`DataObject`]s on request. Grounded on
//! `core/include/bufr/ResultSet.h` / `core/src/bufr/BufrReader/Query/ResultSet.cpp`
//! (a thin façade over an impl) and `DataContainer.cpp`'s dimension
//! bookkeeping for the padding/group-by behavior.

use hashbrown::HashMap;

use crate::Error;
use crate::Value;
use crate::data_object::DataObject;
use crate::target::Target;

#[derive(Debug, Clone)]
struct Instance {
    values: Vec<Value>,
    /// Per-axis occurrence count observed for *this* field in this
    /// instance, outermost axis first.
    counts: Vec<u32>,
}

#[derive(Debug, Clone)]
struct FieldAccumulator {
    leaf_type: crate::subset_table::TypeInfo,
    /// Repeating-ancestor node indices gating this field's occurrences,
    /// outermost first — the same chain `Target::dim_paths`' last entry
    /// carries. Two fields share an axis iff one's deepest entry appears in
    /// the other's chain.
    axis_nodes: Vec<usize>,
    /// `axis_nodes`' query-path strings, same order — `Target::dim_path_names`.
    /// Recorded on the built `DataObject` so an encoder can match it against
    /// a declared dimension's path.
    axis_names: Vec<String>,
    instances: Vec<Instance>,
}

/// Accumulated raw cells for every field a [`crate::query_runner::QueryRunner`]
/// has resolved so far, across however many messages/subsets it has walked.
#[derive(Debug, Default)]
pub struct ResultSet {
    fields: HashMap<String, FieldAccumulator>,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet::default()
    }

    pub(crate) fn push_instance(
        &mut self,
        name: &str,
        target: &Target,
        values: Vec<Value>,
        counts: Vec<u32>,
    ) {
        let entry = self.fields.entry(name.to_string()).or_insert_with(|| FieldAccumulator {
            leaf_type: target.leaf_type.clone(),
            axis_nodes: target.dim_paths.last().cloned().unwrap_or_default(),
            axis_names: target.dim_path_names.clone(),
            instances: vec![],
        });
        entry.instances.push(Instance { values, counts });
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn row_count(&self, name: &str) -> Option<usize> {
        self.fields.get(name).map(|f| f.instances.len())
    }

    /// Reshapes `field_name`'s accumulated raw cells into a rectangular
    /// [`DataObject`].
    ///
    /// With no `group_by_field_name`, each instance becomes one row, padded
    /// with missing cells up to the widest instance's count (jagged-to-
    /// rectangular).
    ///
    /// With a `group_by_field_name`, the two fields must share an axis: the
    /// group-by field's deepest repeating ancestor must also appear in this
    /// field's own ancestor chain, or resolution fails with
    /// [`Error::BadGroupByField`]. The leading dimension then flattens: it
    /// becomes the sum, across instances, of the group-by field's
    /// per-instance count at that axis, rather than one row per instance —
    /// e.g. a field grouped by a 5-channel then a 3-channel instance
    /// produces shape `[8]`, not `[2, 5]`.
    pub fn get(
        &self,
        field_name: &str,
        group_by_field_name: Option<&str>,
    ) -> Result<DataObject, Error> {
        let field = self
            .fields
            .get(field_name)
            .ok_or_else(|| Error::UnknownField(field_name.to_string()))?;

        match group_by_field_name {
            None => self.get_own_shape(field_name, field),
            Some(gb_name) => self.get_grouped(field_name, field, gb_name),
        }
    }

    fn get_own_shape(&self, field_name: &str, field: &FieldAccumulator) -> Result<DataObject, Error> {
        let num_rows = field.instances.len();
        let has_axis = !field.axis_nodes.is_empty();

        let per_row_count: Vec<u32> =
            field.instances.iter().map(|i| i.counts.first().copied().unwrap_or(0)).collect();

        let max_count = per_row_count.iter().copied().max().unwrap_or(0).max(1) as usize;
        let dims: Vec<usize> = if has_axis { vec![num_rows, max_count] } else { vec![num_rows] };
        let row_stride = if has_axis { max_count } else { 1 };

        let mut flat: Vec<Value> = vec![Value::Missing; num_rows * row_stride];
        for (row, inst) in field.instances.iter().enumerate() {
            let own_count = inst.values.len().min(row_stride);
            flat[row * row_stride..row * row_stride + own_count]
                .clone_from_slice(&inst.values[..own_count]);
        }

        let mut obj = DataObject::from_values(field_name.to_string(), dims, field.leaf_type.clone(), flat)?;
        obj.set_dim_paths(field.axis_names.clone());
        Ok(obj)
    }

    fn get_grouped(
        &self,
        field_name: &str,
        field: &FieldAccumulator,
        gb_name: &str,
    ) -> Result<DataObject, Error> {
        let gb = self
            .fields
            .get(gb_name)
            .ok_or_else(|| Error::UnknownField(gb_name.to_string()))?;

        let bad_group_by = || Error::BadGroupByField {
            field: field_name.to_string(),
            group_by: gb_name.to_string(),
        };

        if gb.instances.len() != field.instances.len() {
            return Err(bad_group_by());
        }
        // The group-by field's leaf sits at the end of its own ancestor
        // chain; that node must also gate this field's occurrences, or the
        // two fields' dim paths diverge.
        let gb_axis = *gb.axis_nodes.last().ok_or_else(bad_group_by)?;
        if !field.axis_nodes.contains(&gb_axis) {
            return Err(bad_group_by());
        }

        let per_instance_rows: Vec<usize> =
            gb.instances.iter().map(|i| i.counts.last().copied().unwrap_or(0) as usize).collect();
        let num_rows: usize = per_instance_rows.iter().sum();

        let mut flat: Vec<Value> = vec![Value::Missing; num_rows];
        let mut offset = 0usize;
        for (inst, &count) in field.instances.iter().zip(&per_instance_rows) {
            let own_count = inst.values.len().min(count);
            flat[offset..offset + own_count].clone_from_slice(&inst.values[..own_count]);
            offset += count;
        }

        let mut obj =
            DataObject::from_values(field_name.to_string(), vec![num_rows], field.leaf_type.clone(), flat)?;
        obj.set_dim_paths(field.axis_names.clone());
        Ok(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subset_table::TypeInfo;
    use crate::target::Target;

    fn scalar_target(path: &str) -> Target {
        Target {
            path: path.to_string(),
            node_path: vec![1],
            filters: vec![],
            leaf_type: TypeInfo {
                bit_width: 15,
                is_string: false,
                unit: "DEGREE".to_string(),
                scale: 2,
                reference: -9000,
            },
            dim_paths: vec![],
            dim_path_names: vec![],
            default_group_by: None,
        }
    }

    fn vector_target(path: &str) -> Target {
        Target {
            dim_paths: vec![vec![2]],
            dim_path_names: vec![format!("*/{path}")],
            default_group_by: Some(0),
            ..scalar_target(path)
        }
    }

    #[test]
    fn scalar_field_reshapes_to_one_row_per_instance() {
        let mut rs = ResultSet::new();
        let t = scalar_target("*/CLAT");
        rs.push_instance("lat", &t, vec![Value::Decimal(4500, -2)], vec![]);
        rs.push_instance("lat", &t, vec![Value::Decimal(-1000, -2)], vec![]);
        let obj = rs.get("lat", None).unwrap();
        assert_eq!(obj.dims(), &[2]);
    }

    #[test]
    fn jagged_vector_field_pads_to_max_count() {
        let mut rs = ResultSet::new();
        let t = vector_target("*/BRIT/TMBR");
        rs.push_instance(
            "tb",
            &t,
            vec![Value::Integer(1), Value::Integer(2)],
            vec![2],
        );
        rs.push_instance(
            "tb",
            &t,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)],
            vec![3],
        );
        let obj = rs.get("tb", None).unwrap();
        assert_eq!(obj.dims(), &[2, 3]);
    }

    #[test]
    fn unknown_field_errors() {
        let rs = ResultSet::new();
        assert!(matches!(rs.get("nope", None), Err(Error::UnknownField(_))));
    }

    #[test]
    fn group_by_flattens_and_sums_instance_counts() {
        let mut rs = ResultSet::new();
        let chnm = vector_target("*/BRIT/CHNM");
        let tmbr = vector_target("*/BRIT/TMBR");
        // Message 1: 5 channels. Message 2: 3 channels.
        rs.push_instance(
            "chnm",
            &chnm,
            (1..=5).map(Value::Integer).collect(),
            vec![5],
        );
        rs.push_instance(
            "chnm",
            &chnm,
            (1..=3).map(Value::Integer).collect(),
            vec![3],
        );
        rs.push_instance(
            "tmbr",
            &tmbr,
            (100..105).map(Value::Integer).collect(),
            vec![5],
        );
        rs.push_instance(
            "tmbr",
            &tmbr,
            (200..203).map(Value::Integer).collect(),
            vec![3],
        );

        let obj = rs.get("tmbr", Some("chnm")).unwrap();
        // Flattened into one axis: 5 + 3 rows, not [2, 5].
        assert_eq!(obj.dims(), &[8]);
    }

    #[test]
    fn group_by_on_an_unrelated_axis_errors() {
        let mut rs = ResultSet::new();
        let chnm = vector_target("*/BRIT/CHNM");
        let mut unrelated = vector_target("*/OTHER/SEQ");
        unrelated.dim_paths = vec![vec![99]];
        rs.push_instance("chnm", &chnm, vec![Value::Integer(1), Value::Integer(2)], vec![2]);
        rs.push_instance("unrelated", &unrelated, vec![Value::Integer(9)], vec![1]);
        assert!(matches!(
            rs.get("unrelated", Some("chnm")),
            Err(Error::BadGroupByField { .. })
        ));
    }
}
