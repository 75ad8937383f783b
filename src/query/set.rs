//! A named collection of queries, grounded on
//! `core/src/bufr/BufrReader/Query/QuerySetImpl.{h,cpp}`.

use hashbrown::{HashMap, HashSet};

use crate::Error;

use super::parser;
use super::types::Query;

/// Maps field names to one or more alternative [`Query`] paths and tracks
/// which subsets any of them could possibly touch, so
/// [`QuerySet::includes_subset`] can let the runner skip a subset without
/// evaluating any query against it.
#[derive(Debug, Clone)]
pub struct QuerySet {
    query_map: HashMap<String, Vec<Query>>,
    includes_all_subsets: bool,
    add_has_been_called: bool,
    limit_subsets: HashSet<String>,
    present_subsets: HashSet<String>,
}

impl Default for QuerySet {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySet {
    /// A query set with no subset restriction: every subset is in scope
    /// until the first [`QuerySet::add`] call narrows it.
    pub fn new() -> Self {
        QuerySet {
            query_map: HashMap::new(),
            includes_all_subsets: true,
            add_has_been_called: false,
            limit_subsets: HashSet::new(),
            present_subsets: HashSet::new(),
        }
    }

    /// A query set restricted up front to `subsets`. An empty list behaves
    /// like [`QuerySet::new`].
    pub fn with_subsets(subsets: impl IntoIterator<Item = String>) -> Self {
        let limit_subsets: HashSet<String> = subsets.into_iter().collect();
        let includes_all_subsets = limit_subsets.is_empty();
        QuerySet {
            query_map: HashMap::new(),
            includes_all_subsets,
            add_has_been_called: false,
            limit_subsets,
            present_subsets: HashSet::new(),
        }
    }

    /// Parses `query_str` and registers its alternatives under `name`,
    /// replacing any prior registration for that name.
    pub fn add(&mut self, name: &str, query_str: &str) -> Result<(), Error> {
        if !self.add_has_been_called {
            self.add_has_been_called = true;
            self.includes_all_subsets = false;
        }

        let queries = parser::parse(query_str)?;
        for query in &queries {
            if self.limit_subsets.is_empty() {
                self.includes_all_subsets |= query.subset.is_any;
                self.present_subsets.insert(query.subset.name.clone());
            } else if query.subset.is_any {
                self.present_subsets = self.limit_subsets.clone();
            } else {
                self.present_subsets.insert(query.subset.name.clone());
                self.present_subsets
                    .retain(|s| self.limit_subsets.contains(s));
            }
        }

        self.query_map.insert(name.to_string(), queries);
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.query_map.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.query_map.keys().cloned().collect()
    }

    /// True if any query in this set could possibly match `subset`.
    pub fn includes_subset(&self, subset: &str) -> bool {
        if self.includes_all_subsets {
            return true;
        }
        if self.query_map.is_empty() {
            return self.limit_subsets.contains(subset);
        }
        self.present_subsets.contains(subset)
    }

    /// The alternative query paths registered under `name`.
    pub fn queries_for(&self, name: &str) -> Option<&[Query]> {
        self.query_map.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_includes_every_subset_until_add() {
        let qs = QuerySet::new();
        assert!(qs.includes_subset("ATMS"));
        assert!(qs.includes_subset("ANYTHING"));
    }

    #[test]
    fn adding_a_named_query_narrows_scope() {
        let mut qs = QuerySet::new();
        qs.add("lat", "ATMS/CLAT").unwrap();
        assert!(qs.includes_subset("ATMS"));
        assert!(!qs.includes_subset("AMSU"));
    }

    #[test]
    fn wildcard_query_keeps_all_subsets_in_scope() {
        let mut qs = QuerySet::new();
        qs.add("lat", "*/CLAT").unwrap();
        assert!(qs.includes_subset("ANYTHING"));
    }

    #[test]
    fn with_subsets_restricts_up_front() {
        let mut qs = QuerySet::with_subsets(["ATMS".to_string()]);
        assert!(qs.includes_subset("ATMS"));
        assert!(!qs.includes_subset("AMSU"));
        qs.add("lat", "*/CLAT").unwrap();
        assert!(qs.includes_subset("ATMS"));
        assert!(!qs.includes_subset("AMSU"));
    }

    #[test]
    fn queries_for_returns_all_comma_alternatives() {
        let mut qs = QuerySet::new();
        qs.add("lat", "ATMS,AMSU/CLAT").unwrap();
        assert_eq!(qs.queries_for("lat").unwrap().len(), 2);
        assert_eq!(qs.size(), 1);
        assert_eq!(qs.names(), vec!["lat".to_string()]);
    }
}
