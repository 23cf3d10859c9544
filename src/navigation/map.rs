use crate::case::{NavigationCase, NavigationRule};
use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Navigation cases indexed by from-view-id pattern.
///
/// Patterns ending in `*` also register their prefix. Prefixes iterate in
/// descending string order, so `/foobar` is tried before `/foo`.
#[derive(Debug, Clone, Default)]
pub struct NavigationMap {
    cases: AHashMap<String, Vec<NavigationCase>>,
    wildcards: BTreeSet<Reverse<String>>,
}

impl NavigationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds cases under `pattern`, merging with any cases already there.
    pub fn put<I>(&mut self, pattern: impl Into<String>, cases: I)
    where
        I: IntoIterator<Item = NavigationCase>,
    {
        let pattern = pattern.into();
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.wildcards.insert(Reverse(prefix.to_string()));
        }
        let existing = self.cases.entry(pattern).or_default();
        for case in cases {
            if !existing.contains(&case) {
                existing.push(case);
            }
        }
    }

    pub fn put_rule(&mut self, rule: &NavigationRule) {
        self.put(rule.from_view_id.clone(), rule.cases.iter().cloned());
    }

    pub fn put_all(&mut self, other: &NavigationMap) {
        for (pattern, cases) in &other.cases {
            self.put(pattern.clone(), cases.iter().cloned());
        }
    }

    pub fn get(&self, pattern: &str) -> Option<&[NavigationCase]> {
        self.cases.get(pattern).map(Vec::as_slice)
    }

    /// Registered wildcard prefixes, most specific first.
    pub fn wildcard_prefixes(&self) -> impl Iterator<Item = &str> {
        self.wildcards.iter().map(|Reverse(prefix)| prefix.as_str())
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.cases.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NavigationCase])> {
        self.cases
            .iter()
            .map(|(pattern, cases)| (pattern.as_str(), cases.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
