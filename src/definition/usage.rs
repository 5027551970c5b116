//! Usage tags: why a table takes part in a query's join set.

use crate::definition::TableId;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Usage {
    Select,
    Search,
    Filter,
    Sort,
    Mandatory,
}

impl Usage {
    fn bit(self) -> u8 {
        match self {
            Usage::Select => 1,
            Usage::Search => 1 << 1,
            Usage::Filter => 1 << 2,
            Usage::Sort => 1 << 3,
            Usage::Mandatory => 1 << 4,
        }
    }
}

/// Small bitset of [`Usage`] tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UsageSet(u8);

impl UsageSet {
    pub const fn empty() -> Self {
        UsageSet(0)
    }

    pub fn of(usages: &[Usage]) -> Self {
        usages.iter().fold(UsageSet::empty(), |mut set, u| {
            set.insert(*u);
            set
        })
    }

    pub fn insert(&mut self, usage: Usage) {
        self.0 |= usage.bit();
    }

    pub fn remove(&mut self, usage: Usage) {
        self.0 &= !usage.bit();
    }

    pub fn contains(&self, usage: Usage) -> bool {
        self.0 & usage.bit() != 0
    }

    pub fn intersects(&self, other: UsageSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when the set holds exactly this one tag.
    pub fn is_only(&self, usage: Usage) -> bool {
        self.0 == usage.bit()
    }
}

/// Table → usage tags. Tables with no usage are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsageMap(HashMap<TableId, UsageSet>);

impl UsageMap {
    pub fn new() -> Self {
        UsageMap(HashMap::new())
    }

    pub fn mark(&mut self, table: TableId, usage: Usage) {
        self.0.entry(table).or_default().insert(usage);
    }

    /// Drop one tag from every table, removing tables left without usage.
    pub fn unmark_all(&mut self, usage: Usage) {
        self.0.retain(|_, set| {
            set.remove(usage);
            !set.is_empty()
        });
    }

    pub fn get(&self, table: TableId) -> UsageSet {
        self.0.get(&table).copied().unwrap_or_default()
    }

    /// Tables carrying at least one of the given tags.
    pub fn tables_with_any(&self, usages: UsageSet) -> Vec<TableId> {
        let mut tables: Vec<TableId> = self
            .0
            .iter()
            .filter(|(_, set)| set.intersects(usages))
            .map(|(t, _)| *t)
            .collect();
        tables.sort();
        tables
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_set_tracks_tags() {
        let mut set = UsageSet::empty();
        set.insert(Usage::Filter);
        assert!(set.is_only(Usage::Filter));
        set.insert(Usage::Select);
        assert!(!set.is_only(Usage::Filter));
        assert!(set.intersects(UsageSet::of(&[Usage::Select, Usage::Sort])));
        set.remove(Usage::Select);
        assert!(set.contains(Usage::Filter));
        assert!(!set.contains(Usage::Select));
    }

    #[test]
    fn unmark_all_drops_empty_tables() {
        let mut map = UsageMap::new();
        map.mark(TableId(0), Usage::Select);
        map.mark(TableId(1), Usage::Select);
        map.mark(TableId(1), Usage::Sort);
        map.unmark_all(Usage::Select);
        assert!(map.get(TableId(0)).is_empty());
        assert!(map.get(TableId(1)).is_only(Usage::Sort));
        assert_eq!(map.tables_with_any(UsageSet::of(&[Usage::Sort, Usage::Select])), vec![TableId(1)]);
    }
}
