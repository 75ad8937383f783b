//! Resolves a [`crate::query::QuerySet`] against a
//! [`crate::subset_table::SubsetTable`] into [`Target`]s, walks a decoded
//! subset's event stream to collect raw cells, and feeds them into a
//! [`ResultSet`]. Grounded on
//! `core/src/bufr/BufrReader/Query/QueryRunner.h`: a `targetsCache_` keyed
//! by subset variant, and an `accumulate()` entry point run once per open
//! message.

use hashbrown::HashMap;
use log::warn;

use crate::DataEvent;
use crate::Error;
use crate::Value;
use crate::query::QuerySet;
use crate::result_set::ResultSet;
use crate::subset_table::{NodeType, SubsetTable};
use crate::target::Target;

/// Targets resolved for one subset variant, in `QuerySet` field-name order.
type Targets = Vec<(String, Target)>;

/// Drives query resolution and raw-cell accumulation across many messages.
pub struct QueryRunner {
    query_set: QuerySet,
    targets_cache: HashMap<(String, u64), Targets>,
}

impl QueryRunner {
    pub fn new(query_set: QuerySet) -> Self {
        QueryRunner {
            query_set,
            targets_cache: HashMap::new(),
        }
    }

    pub fn query_set(&self) -> &QuerySet {
        &self.query_set
    }

    /// Targets for `table`'s (subset name, variant) pair, resolving and
    /// caching them on first use.
    fn targets_for(&mut self, table: &SubsetTable) -> &Targets {
        self.targets_cache
            .entry((table.subset_name.clone(), table.variant_id))
            .or_insert_with(|| resolve_all(&self.query_set, table))
    }

    /// Runs every registered query against one open message, pulling events
    /// from `next_event` until [`DataEvent::Eof`], and writes resolved raw
    /// cells into `result_set`.
    pub fn accumulate(
        &mut self,
        table: &SubsetTable,
        next_event: &mut impl FnMut() -> Result<DataEvent, Error>,
        result_set: &mut ResultSet,
    ) -> Result<(), Error> {
        // A subset outside every query's scope still has to be walked to
        // keep the decoder's bit cursor in sync; `commit` below is then a
        // no-op since `targets_for` returns nothing for it.
        loop {
            match next_event()? {
                DataEvent::Eof => return Ok(()),
                DataEvent::SubsetStart(_) => {
                    let mut walker = Walker::new(table);
                    walker.drain(next_event, false)?;
                    self.commit(table, &walker.into_plain(), result_set);
                }
                DataEvent::CompressedStart => {
                    let mut walker = Walker::new(table);
                    let n = walker.drain_compressed(next_event)?;
                    for subset_idx in 0..n {
                        let instance = walker.slice_compressed(subset_idx);
                        self.commit(table, &instance, result_set);
                    }
                }
                other => {
                    warn!("unexpected top-level event while accumulating: {other:?}");
                }
            }
        }
    }

    fn commit(&mut self, table: &SubsetTable, instance: &InstanceData, result_set: &mut ResultSet) {
        for (name, target) in self.targets_for(table).clone() {
            let Some(values) = instance.leaf_values.get(&target.leaf_node()) else {
                warn!("target \"{name}\" ({}) did not resolve in this subset instance", target.path);
                continue;
            };
            let values = apply_filters(&target, values);
            let counts: Vec<u32> = target
                .dim_paths
                .iter()
                .map(|path| {
                    let node = *path.last().unwrap();
                    instance
                        .rep_counts
                        .get(&node)
                        .and_then(|c| c.first())
                        .copied()
                        .unwrap_or(0)
                })
                .collect();
            result_set.push_instance(&name, &target, values, counts);
        }
    }
}

fn apply_filters(target: &Target, values: &[Value]) -> Vec<Value> {
    let Some(axis) = target.dim_paths.last().and_then(|p| p.last()) else {
        return values.to_vec();
    };
    let Some(filter) = target.filter_for(*axis) else {
        return values.to_vec();
    };
    filter
        .iter()
        .filter_map(|&n| values.get((n as usize).wrapping_sub(1)).cloned())
        .collect()
}

fn resolve_all(query_set: &QuerySet, table: &SubsetTable) -> Targets {
    let mut out = vec![];
    for name in query_set.names() {
        let Some(queries) = query_set.queries_for(&name) else {
            continue;
        };
        for query in queries {
            if !query.applies_to(&table.subset_name) {
                continue;
            }
            if let Some(target) = resolve_target(table, query) {
                out.push((name.clone(), target));
                break;
            }
        }
    }
    out
}

fn resolve_target(table: &SubsetTable, query: &crate::query::Query) -> Option<Target> {
    let mut current = SubsetTable::ROOT;
    let mut node_path = vec![];
    let mut filters = vec![];
    for component in &query.components {
        let (matched, crossed) = find_named_child(table, current, &component.mnemonic, component.index)?;
        node_path.extend(crossed.iter().copied());
        node_path.push(matched);
        if let Some(filter) = &component.filter {
            let axis = crossed.last().copied().unwrap_or(matched);
            filters.push((axis, filter.clone()));
        }
        current = matched;
    }
    let leaf = *node_path.last()?;
    let leaf_node = table.node(leaf);
    if !leaf_node.node_type.is_leaf() {
        return None;
    }
    let leaf_type = leaf_node.type_info.clone()?;
    let full_axis_chain = table.dim_path(leaf);
    let dim_paths: Vec<Vec<usize>> = (1..=full_axis_chain.len())
        .map(|i| full_axis_chain[..i].to_vec())
        .collect();
    let dim_path_names: Vec<String> = full_axis_chain.iter().map(|&node| table.axis_path(node)).collect();
    let default_group_by = if dim_paths.is_empty() { None } else { Some(0) };
    Some(Target {
        path: query.raw.clone(),
        node_path,
        filters,
        leaf_type,
        dim_paths,
        dim_path_names,
        default_group_by,
    })
}

/// Finds `mnemonic` (disambiguated by `want_index` when duplicated) among
/// `node_idx`'s children, transparently descending through repeating
/// (unnamed) nodes. Returns the matched node and the repeating ancestors
/// crossed to reach it, outermost first.
fn find_named_child(
    table: &SubsetTable,
    node_idx: usize,
    mnemonic: &str,
    want_index: Option<u32>,
) -> Option<(usize, Vec<usize>)> {
    for &child in &table.node(node_idx).children {
        let n = table.node(child);
        if n.mnemonic == mnemonic && !n.node_type.is_repeating() && n.node_type != NodeType::Operator {
            if !n.has_duplicates || n.copy_idx == want_index.unwrap_or(1) {
                return Some((child, vec![]));
            }
        }
    }
    for &child in &table.node(node_idx).children {
        if table.node(child).node_type.is_repeating() {
            if let Some((found, mut crossed)) = find_named_child(table, child, mnemonic, want_index) {
                crossed.insert(0, child);
                return Some((found, crossed));
            }
        }
    }
    None
}

/// Per-subset-instance raw cells collected while walking its event stream.
#[derive(Debug, Default, Clone)]
pub struct InstanceData {
    pub leaf_values: HashMap<usize, Vec<Value>>,
    pub rep_counts: HashMap<usize, Vec<u32>>,
}

struct Walker<'t> {
    table: &'t SubsetTable,
    stack: Vec<Vec<usize>>,
    leaf_values: HashMap<usize, Vec<Value>>,
    leaf_values_compressed: HashMap<usize, Vec<Vec<Value>>>,
    rep_counts: HashMap<usize, Vec<u32>>,
}

impl<'t> Walker<'t> {
    fn new(table: &'t SubsetTable) -> Self {
        Walker {
            table,
            stack: vec![table.root().children.clone()],
            leaf_values: HashMap::new(),
            leaf_values_compressed: HashMap::new(),
            rep_counts: HashMap::new(),
        }
    }

    fn current(&self, idx: u16) -> usize {
        self.stack.last().expect("walker stack not empty")[idx as usize]
    }

    fn drain(&mut self, next_event: &mut impl FnMut() -> Result<DataEvent, Error>, compressed: bool) -> Result<(), Error> {
        loop {
            match next_event()? {
                DataEvent::SubsetEnd | DataEvent::Eof => return Ok(()),
                DataEvent::SequenceStart { idx, .. } => {
                    let node = self.current(idx);
                    self.stack.push(self.table.node(node).children.clone());
                }
                DataEvent::SequenceEnd => {
                    self.stack.pop();
                }
                DataEvent::ReplicationStart { idx, count } => {
                    let node = self.current(idx);
                    self.rep_counts.entry(node).or_default().push(count);
                    self.stack.push(self.table.node(node).children.clone());
                }
                DataEvent::ReplicationItemStart | DataEvent::ReplicationItemEnd => {}
                DataEvent::ReplicationEnd => {
                    self.stack.pop();
                }
                DataEvent::OperatorHandled { .. } => {}
                DataEvent::Data { idx, value, .. } => {
                    let node = self.current(idx);
                    self.leaf_values.entry(node).or_default().push(value);
                }
                DataEvent::CompressedData { idx, values, .. } => {
                    let node = self.current(idx);
                    self.leaf_values_compressed.entry(node).or_default().push(values);
                }
                DataEvent::SubsetStart(_) | DataEvent::CompressedStart => {
                    if compressed {
                        // nested, shouldn't occur
                    }
                }
            }
        }
    }

    fn drain_compressed(&mut self, next_event: &mut impl FnMut() -> Result<DataEvent, Error>) -> Result<usize, Error> {
        self.drain(next_event, true)?;
        Ok(self
            .leaf_values_compressed
            .values()
            .map(|v| v.first().map(|row| row.len()).unwrap_or(0))
            .max()
            .unwrap_or(0))
    }

    fn into_plain(self) -> InstanceData {
        InstanceData {
            leaf_values: self.leaf_values,
            rep_counts: self.rep_counts,
        }
    }

    fn slice_compressed(&self, subset_idx: usize) -> InstanceData {
        let leaf_values = self
            .leaf_values_compressed
            .iter()
            .map(|(node, occurrences)| {
                let vals = occurrences
                    .iter()
                    .filter_map(|row| row.get(subset_idx).cloned())
                    .collect();
                (*node, vals)
            })
            .collect();
        InstanceData {
            leaf_values,
            rep_counts: self.rep_counts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QuerySet;
    use crate::tables::Tables;
    use crate::{Descriptor, resolve_descriptors};

    fn atms_table() -> SubsetTable {
        let tables = Tables::default();
        let descriptors = vec![Descriptor { f: 3, x: 1, y: 2 }];
        let resolved = resolve_descriptors(&tables, &descriptors).unwrap();
        SubsetTable::from_resolved("ATMS".to_string(), &resolved)
    }

    #[test]
    fn resolves_scalar_target() {
        let table = atms_table();
        let mut qs = QuerySet::new();
        qs.add("lat", "*/CLAT").unwrap();
        let targets = resolve_all(&qs, &table);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].1.dim_paths.is_empty());
    }

    #[test]
    fn resolves_through_transparent_replicator() {
        let table = atms_table();
        let mut qs = QuerySet::new();
        qs.add("tb", "*/BRIT/TMBR").unwrap();
        let targets = resolve_all(&qs, &table);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].1.dim_paths.len(), 1);
    }

    #[test]
    fn unresolvable_target_is_silently_dropped() {
        let table = atms_table();
        let mut qs = QuerySet::new();
        qs.add("nope", "*/NOSUCHFIELD").unwrap();
        let targets = resolve_all(&qs, &table);
        assert!(targets.is_empty());
    }
}
