use std::collections::HashMap;

/// Accumulators keyed by string, iterated in first-insertion order
///
/// Aggregations sort their output with stable sorts, so the order in which
/// keys were first seen decides ties. Keeping that order explicit makes the
/// tie-breaks deterministic.
#[derive(Debug, Clone)]
pub struct OrderedGroups<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for OrderedGroups<V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<V> OrderedGroups<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulator for `key`, creating it with `init` on first sight
    pub fn entry_or_insert_with(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.to_string(), init()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn into_values(self) -> Vec<V> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

/// Most frequent value; on equal counts the value seen first wins
pub fn mode<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: OrderedGroups<u64> = OrderedGroups::new();
    for value in values {
        *counts.entry_or_insert_with(value, || 0) += 1;
    }

    let mut best: Option<(&str, u64)> = None;
    for (value, &count) in counts.iter() {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| value.to_string())
}
