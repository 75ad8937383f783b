//! The per-(subset name, variant) structural tree a [`crate::query::Query`]
//! is resolved against.
//!
//! Grounded on `core/include/bufr/SubsetVariant.h` and the way
//! `resolve_descriptors` (`descriptor.rs`) turns a flat descriptor list into
//! a nested tree with an explicit position cursor rather than plain
//! recursion — [`SubsetTable::from_resolved`] walks the same
//! [`crate::ResolvedDescriptor`] shapes `reader::DataReader`
//! walks, so a node's position among its siblings is exactly the `idx` the
//! reader reports in [`crate::DataEvent`].

use hashbrown::HashMap;

use crate::ResolvedDescriptor;

/// What kind of structural element a [`BufrNode`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// The root of a subset instance.
    Subset,
    /// A Table D sequence.
    Sequence,
    /// A delayed-count replication (`Y = 0`).
    Replicator,
    /// A fixed-count replication (`Y != 0`).
    FixedReplicator,
    /// A replicator whose sole child is itself a replicator with no
    /// intervening sequence; collapsed so it contributes one dim-path axis
    /// instead of two nested ones.
    StackedRepeater,
    /// A numeric Table B leaf.
    Number,
    /// A character (CCITT IA5) Table B leaf.
    String,
    /// A Table C operator. Carries no data of its own but still occupies a
    /// position in its parent's children list, matching the position
    /// cursor `crate::reader::DataEvent::idx` counts against.
    Operator,
}

impl NodeType {
    pub fn is_repeating(self) -> bool {
        matches!(
            self,
            NodeType::Replicator | NodeType::FixedReplicator | NodeType::StackedRepeater
        )
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, NodeType::Number | NodeType::String)
    }
}

/// Field width, signedness, unit and decoded scale/reference for a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub bit_width: u32,
    pub is_string: bool,
    pub unit: String,
    pub scale: i8,
    pub reference: i64,
}

impl TypeInfo {
    /// Whether this leaf needs a 64-bit integer column (width > 32 bits).
    pub fn needs_wide_int(&self) -> bool {
        self.bit_width > 32
    }
}

/// One node of a [`SubsetTable`].
#[derive(Debug, Clone)]
pub struct BufrNode {
    pub index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub mnemonic: String,
    pub node_type: NodeType,
    pub type_info: Option<TypeInfo>,
    /// 1-based position among siblings sharing this mnemonic.
    pub copy_idx: u32,
    /// True on every sibling when more than one shares this mnemonic.
    pub has_duplicates: bool,
    /// True when this node is the inner repeater of a stacked pair whose
    /// outer node was relabelled [`NodeType::StackedRepeater`] — it
    /// contributes no separate entry to [`SubsetTable::dim_path`].
    pub absorbed: bool,
}

/// A rooted tree of [`BufrNode`]s describing one distinct structural shape
/// observed for a subset name.
#[derive(Debug, Clone)]
pub struct SubsetTable {
    pub subset_name: String,
    pub variant_id: u64,
    pub nodes: Vec<BufrNode>,
}

impl SubsetTable {
    pub const ROOT: usize = 0;

    /// Builds a table from a message's resolved root descriptors.
    pub fn from_resolved(subset_name: String, descriptors: &[ResolvedDescriptor<'_>]) -> Self {
        let mut nodes = vec![BufrNode {
            index: 0,
            parent: None,
            children: vec![],
            mnemonic: subset_name.clone(),
            node_type: NodeType::Subset,
            type_info: None,
            copy_idx: 1,
            has_duplicates: false,
            absorbed: false,
        }];
        let variant_id = variant_hash(descriptors);
        push_children(&mut nodes, 0, descriptors);
        assign_duplicates(&mut nodes, 0);
        collapse_stacked_repeaters(&mut nodes);
        SubsetTable {
            subset_name,
            variant_id,
            nodes,
        }
    }

    pub fn root(&self) -> &BufrNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, idx: usize) -> &BufrNode {
        &self.nodes[idx]
    }

    /// Display form used in logs and the `Targets` cache key: `NAME[n]` when
    /// more than one structural variant of `NAME` has been observed,
    /// otherwise just `NAME`.
    pub fn display_name(&self, variant_count: usize) -> String {
        if variant_count > 1 {
            format!("{}[{}]", self.subset_name, self.variant_id)
        } else {
            self.subset_name.clone()
        }
    }

    /// The ancestor chain of repeating nodes (root-to-leaf order) that gate
    /// occurrences of `node_idx`. The outermost (lowest-depth) entry is
    /// first.
    pub fn dim_path(&self, node_idx: usize) -> Vec<usize> {
        let mut path = vec![];
        let mut cur = self.nodes[node_idx].parent;
        while let Some(p) = cur {
            if self.nodes[p].node_type.is_repeating() && !self.nodes[p].absorbed {
                path.push(p);
            }
            cur = self.nodes[p].parent;
        }
        path.reverse();
        path
    }

    /// The query-path string identifying the axis `node_idx` (a repeating
    /// node) gates, in the same `*/seq/.../mnemonic` form a query uses to
    /// address its first-declared field, e.g. `"*/BRIT/CHNM"`. Two fields
    /// gated by the same repeating node always get the same string back,
    /// which is what lets a group-by field and the field it groups share a
    /// dimension's declared path.
    pub fn axis_path(&self, node_idx: usize) -> String {
        let mut segments = vec![];
        let mut cur = self.nodes[node_idx].parent;
        while let Some(p) = cur {
            if p == Self::ROOT {
                break;
            }
            let node = &self.nodes[p];
            if node.parent != Some(Self::ROOT) && !node.node_type.is_repeating() {
                segments.push(node.mnemonic.clone());
            }
            cur = node.parent;
        }
        segments.reverse();
        segments.push(self.nodes[node_idx].mnemonic.clone());
        format!("*/{}", segments.join("/"))
    }

    /// All descendant node indices of `node_idx`, `node_idx` included,
    /// preorder.
    pub fn subtree(&self, node_idx: usize) -> Vec<usize> {
        let mut out = vec![node_idx];
        let mut stack = self.nodes[node_idx].children.clone();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().copied());
        }
        out
    }
}

fn push_children(nodes: &mut Vec<BufrNode>, parent: usize, descriptors: &[ResolvedDescriptor<'_>]) {
    for desc in descriptors {
        let idx = nodes.len();
        match desc {
            ResolvedDescriptor::Data(b) => {
                nodes.push(BufrNode {
                    index: idx,
                    parent: Some(parent),
                    children: vec![],
                    mnemonic: b.mnemonic.to_string(),
                    node_type: if b.unit == "CCITT IA5" {
                        NodeType::String
                    } else {
                        NodeType::Number
                    },
                    type_info: Some(TypeInfo {
                        bit_width: b.bits as u32,
                        is_string: b.unit == "CCITT IA5",
                        unit: b.unit.to_string(),
                        scale: b.scale,
                        reference: b.reference_value as i64,
                    }),
                    copy_idx: 1,
                    has_duplicates: false,
                    absorbed: false,
                });
                nodes[parent].children.push(idx);
            }
            ResolvedDescriptor::Operator(xy) => {
                nodes.push(BufrNode {
                    index: idx,
                    parent: Some(parent),
                    children: vec![],
                    mnemonic: format!("OP{}-{}", xy.x, xy.y),
                    node_type: NodeType::Operator,
                    type_info: None,
                    copy_idx: 1,
                    has_duplicates: false,
                    absorbed: false,
                });
                nodes[parent].children.push(idx);
            }
            ResolvedDescriptor::Sequence(d, elements) => {
                nodes.push(BufrNode {
                    index: idx,
                    parent: Some(parent),
                    children: vec![],
                    mnemonic: d.mnemonic.to_string(),
                    node_type: NodeType::Sequence,
                    type_info: None,
                    copy_idx: 1,
                    has_duplicates: false,
                    absorbed: false,
                });
                nodes[parent].children.push(idx);
                push_children(nodes, idx, elements);
            }
            ResolvedDescriptor::Replication {
                y,
                delayed_bits: _,
                descriptors: elements,
            } => {
                let mnemonic = elements
                    .first()
                    .map(descriptor_mnemonic)
                    .unwrap_or_else(|| "REP".to_string());
                nodes.push(BufrNode {
                    index: idx,
                    parent: Some(parent),
                    children: vec![],
                    mnemonic,
                    node_type: if *y == 0 {
                        NodeType::Replicator
                    } else {
                        NodeType::FixedReplicator
                    },
                    type_info: None,
                    copy_idx: 1,
                    has_duplicates: false,
                    absorbed: false,
                });
                nodes[parent].children.push(idx);
                push_children(nodes, idx, elements);
            }
        }
    }
}

fn descriptor_mnemonic(desc: &ResolvedDescriptor<'_>) -> String {
    match desc {
        ResolvedDescriptor::Data(b) => b.mnemonic.to_string(),
        ResolvedDescriptor::Sequence(d, _) => d.mnemonic.to_string(),
        ResolvedDescriptor::Replication { .. } => "REP".to_string(),
        ResolvedDescriptor::Operator(xy) => format!("OP{}-{}", xy.x, xy.y),
    }
}

fn assign_duplicates(nodes: &mut [BufrNode], parent: usize) {
    let children = nodes[parent].children.clone();
    let mut counts: HashMap<String, u32> = HashMap::new();
    for &c in &children {
        *counts.entry(nodes[c].mnemonic.clone()).or_insert(0) += 1;
    }
    let mut seen: HashMap<String, u32> = HashMap::new();
    for &c in &children {
        let total = counts[&nodes[c].mnemonic];
        let n = seen.entry(nodes[c].mnemonic.clone()).or_insert(0);
        *n += 1;
        nodes[c].copy_idx = *n;
        nodes[c].has_duplicates = total > 1;
    }
    for c in children {
        assign_duplicates(nodes, c);
    }
}

/// Relabels a repeating node whose only child is itself a repeating node as
/// a [`NodeType::StackedRepeater`] and marks that child `absorbed`, so
/// [`SubsetTable::dim_path`] pushes the outer node but skips the inner one,
/// counting the pair as a single axis.
fn collapse_stacked_repeaters(nodes: &mut [BufrNode]) {
    for i in 0..nodes.len() {
        if !nodes[i].node_type.is_repeating() {
            continue;
        }
        if let [only] = nodes[i].children.as_slice() {
            let only = *only;
            if nodes[only].node_type.is_repeating() {
                nodes[i].node_type = NodeType::StackedRepeater;
                nodes[only].absorbed = true;
            }
        }
    }
}

/// A stable hash of a descriptor tree's shape (mnemonics and nesting only),
/// used to distinguish structural variants observed under the same subset
/// name across messages.
fn variant_hash(descriptors: &[ResolvedDescriptor<'_>]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;
    let mut hasher = DefaultHasher::new();
    hash_shape(descriptors, &mut hasher);
    hasher.finish()
}

fn hash_shape<H: std::hash::Hasher>(descriptors: &[ResolvedDescriptor<'_>], hasher: &mut H) {
    use std::hash::Hash;
    for desc in descriptors {
        match desc {
            ResolvedDescriptor::Data(b) => {
                0u8.hash(hasher);
                b.mnemonic.hash(hasher);
            }
            ResolvedDescriptor::Operator(xy) => {
                1u8.hash(hasher);
                xy.x.hash(hasher);
                xy.y.hash(hasher);
            }
            ResolvedDescriptor::Sequence(d, elements) => {
                2u8.hash(hasher);
                d.mnemonic.hash(hasher);
                hash_shape(elements, hasher);
            }
            ResolvedDescriptor::Replication { y, descriptors, .. } => {
                3u8.hash(hasher);
                y.hash(hasher);
                hash_shape(descriptors, hasher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Tables;
    use crate::{Descriptor, resolve_descriptors};

    fn atms_table() -> SubsetTable {
        let tables = Tables::default();
        let descriptors = vec![Descriptor { f: 3, x: 1, y: 2 }];
        let resolved = resolve_descriptors(&tables, &descriptors).unwrap();
        SubsetTable::from_resolved("ATMS".to_string(), &resolved)
    }

    #[test]
    fn builds_expected_shape() {
        let table = atms_table();
        assert_eq!(table.root().node_type, NodeType::Subset);
        // root -> ATMS sequence -> [SAID,YEAR,MNTH,DAYS,HOUR,MINU,CLAT,CLON,HSMSL,BRIT]
        let atms_seq = table.root().children[0];
        assert_eq!(table.node(atms_seq).node_type, NodeType::Sequence);
        assert_eq!(table.node(atms_seq).children.len(), 10);
    }

    #[test]
    fn brit_is_a_sequence_wrapping_a_delayed_replicator() {
        let table = atms_table();
        let atms_seq = table.root().children[0];
        let brit_seq = *table.node(atms_seq).children.last().unwrap();
        assert_eq!(table.node(brit_seq).node_type, NodeType::Sequence);
        assert_eq!(table.node(brit_seq).children.len(), 1);
        let rep = table.node(brit_seq).children[0];
        assert_eq!(table.node(rep).node_type, NodeType::Replicator);
        assert_eq!(table.node(rep).children.len(), 2);
    }

    #[test]
    fn dim_path_of_channel_number_includes_the_replicator() {
        let table = atms_table();
        let atms_seq = table.root().children[0];
        let brit_seq = *table.node(atms_seq).children.last().unwrap();
        let rep = table.node(brit_seq).children[0];
        let chnm = table.node(rep).children[0];
        assert_eq!(table.dim_path(chnm), vec![rep]);
        let clat = table.node(atms_seq).children[6];
        assert!(table.dim_path(clat).is_empty());
    }

    #[test]
    fn axis_path_names_the_replicators_first_field() {
        let table = atms_table();
        let atms_seq = table.root().children[0];
        let brit_seq = *table.node(atms_seq).children.last().unwrap();
        let rep = table.node(brit_seq).children[0];
        let chnm = table.node(rep).children[0];
        assert_eq!(table.axis_path(rep), "*/BRIT/CHNM");
        assert_eq!(table.node(chnm).mnemonic, "CHNM");
    }

    fn leaf_node(index: usize, parent: usize, mnemonic: &str) -> BufrNode {
        BufrNode {
            index,
            parent: Some(parent),
            children: vec![],
            mnemonic: mnemonic.to_string(),
            node_type: NodeType::Number,
            type_info: Some(TypeInfo {
                bit_width: 8,
                is_string: false,
                unit: "CODE TABLE".to_string(),
                scale: 0,
                reference: 0,
            }),
            copy_idx: 1,
            has_duplicates: false,
            absorbed: false,
        }
    }

    fn rep_node(index: usize, parent: usize, mnemonic: &str) -> BufrNode {
        BufrNode {
            index,
            parent: Some(parent),
            children: vec![],
            mnemonic: mnemonic.to_string(),
            node_type: NodeType::Replicator,
            type_info: None,
            copy_idx: 1,
            has_duplicates: false,
            absorbed: false,
        }
    }

    /// Builds `root(0) -> outer_rep(1) -> inner_rep(2) -> leaf(3)` by hand,
    /// a shape `resolve_descriptors` produces for back-to-back replications
    /// with no intervening sequence.
    fn stacked_table() -> SubsetTable {
        let mut nodes = vec![BufrNode {
            index: 0,
            parent: None,
            children: vec![1],
            mnemonic: "TEST".to_string(),
            node_type: NodeType::Subset,
            type_info: None,
            copy_idx: 1,
            has_duplicates: false,
            absorbed: false,
        }];
        let mut outer = rep_node(1, 0, "LEAF");
        outer.children = vec![2];
        nodes.push(outer);
        let mut inner = rep_node(2, 1, "LEAF");
        inner.children = vec![3];
        nodes.push(inner);
        nodes.push(leaf_node(3, 2, "LEAF"));
        collapse_stacked_repeaters(&mut nodes);
        SubsetTable {
            subset_name: "TEST".to_string(),
            variant_id: 0,
            nodes,
        }
    }

    #[test]
    fn stacked_repeaters_collapse_to_one_dim_path_entry() {
        let table = stacked_table();
        assert_eq!(table.node(1).node_type, NodeType::StackedRepeater);
        assert!(table.node(2).absorbed);
        assert_eq!(table.dim_path(3), vec![1]);
    }
}
