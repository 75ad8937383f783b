//! A [`Target`] is a [`crate::query::Query`] resolved against one
//! [`crate::subset_table::SubsetTable`] shape: the concrete ancestor chain it
//! matched, the dim paths that gate its occurrences, and the leaf's decoded
//! type. Grounded on the (header-only, not retrieved) original `Target.h`
//! referenced from `QueryRunner.h`; the field set below is inferred from how
//! `ResultSet`/`DataObject` consume a target (dim paths, group-by index,
//! leaf type) in `core/include/bufr/ResultSet.h` and `DataObject.h`.

use crate::subset_table::TypeInfo;

/// A fully resolved path from a subset's root to one leaf node.
#[derive(Debug, Clone)]
pub struct Target {
    /// The original query path string, used as the field's identity in
    /// logs and the `Targets` cache.
    pub path: String,
    /// Root-to-leaf node indices, root excluded, leaf included.
    pub node_path: Vec<usize>,
    /// Per-ancestor occurrence filters (`{a,b,c}` components), parallel to
    /// the repeating entries of `node_path`; `None` where no filter applied.
    pub filters: Vec<(usize, Vec<u32>)>,
    pub leaf_type: TypeInfo,
    /// Ancestor dim paths (outermost first) gating this leaf's occurrences.
    pub dim_paths: Vec<Vec<usize>>,
    /// `dim_paths`' axis-node query-path strings (see
    /// `crate::subset_table::SubsetTable::axis_path`), same order and
    /// length. Two targets sharing an axis node get the same string at that
    /// position, which is what lets a grouped field's output column carry
    /// the dimension path a declared dimension was defined against.
    pub dim_path_names: Vec<String>,
    /// Index into `dim_paths` chosen as the default group-by axis: the
    /// outermost (lowest-depth) one.
    pub default_group_by: Option<usize>,
}

impl Target {
    pub fn leaf_node(&self) -> usize {
        *self.node_path.last().expect("a target always has a leaf")
    }

    /// The filter set that applies to repeating node `node_idx`, if any.
    pub fn filter_for(&self, node_idx: usize) -> Option<&[u32]> {
        self.filters
            .iter()
            .find(|(idx, _)| *idx == node_idx)
            .map(|(_, f)| f.as_slice())
    }
}
