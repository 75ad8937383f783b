//! Compiled shape of one query path.
//!
//! Grounded on `core/include/bufr/QuerySet.h`'s `Query`/`Subset` pair: a
//! parsed query always carries exactly one subset (never a list) — a
//! comma-separated subset selector expands into several sibling [`Query`]
//! values sharing the same path, which is what [`super::parser::parse`]
//! returns.

use std::fmt;

/// The single subset a [`Query`] applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subset {
    pub name: String,
    /// True for the `*` wildcard selector.
    pub is_any: bool,
}

/// One `IDENT[idx]{filter}` path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub mnemonic: String,
    /// `[n]` — 1-based occurrence among same-mnemonic siblings.
    pub index: Option<u32>,
    /// `{a,b,c}` — 1-based occurrence numbers to keep when this component is
    /// a repeating node; `None` keeps every occurrence.
    pub filter: Option<Vec<u32>>,
}

/// A compiled query path for one subset, e.g. `ATMS/BRIT/TMBR{1,3,5}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw: String,
    pub subset: Subset,
    pub components: Vec<Component>,
}

impl Query {
    pub fn applies_to(&self, subset_name: &str) -> bool {
        self.subset.is_any || self.subset.name == subset_name
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
