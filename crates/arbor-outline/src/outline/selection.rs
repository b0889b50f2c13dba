//! Index-based selection over the display list.
//!
//! [`Selection`] tracks which display indexes are selected plus an anchor
//! used for range extension. It is a plain data structure; the model
//! wraps every mutating call with the `selection_will_change` /
//! `selection_did_change` signals when the call actually changes state,
//! which is why all mutators report whether they did anything.

use std::collections::BTreeSet;

/// Selection state: membership per display index, plus an anchor.
///
/// Membership is order-independent, but first/last/next queries expose
/// the display order for range semantics.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    size: usize,
    selected: BTreeSet<usize>,
    anchor: Option<usize>,
}

impl Selection {
    /// Creates an empty selection over zero rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of rows the selection ranges over.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Resizes the index space, pruning entries that fall outside.
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        self.selected.retain(|&index| index < size);
        if self.anchor.is_some_and(|anchor| anchor >= size) {
            self.anchor = None;
        }
    }

    /// The anchor index used when extending selections.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    /// Sets the anchor index.
    pub fn set_anchor(&mut self, anchor: Option<usize>) {
        self.anchor = anchor.filter(|&index| index < self.size);
    }

    /// Whether the given index is selected.
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Number of selected indexes.
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// Whether at least one index is not yet selected.
    pub fn can_select_all(&self) -> bool {
        self.selected.len() < self.size
    }

    /// The smallest selected index.
    pub fn first_selected(&self) -> Option<usize> {
        self.selected.first().copied()
    }

    /// The largest selected index.
    pub fn last_selected(&self) -> Option<usize> {
        self.selected.last().copied()
    }

    /// The smallest selected index at or after `from`.
    pub fn next_selected(&self, from: usize) -> Option<usize> {
        self.selected.range(from..).next().copied()
    }

    /// All selected indexes in ascending order.
    pub fn selected_indexes(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// Selects every index. Anchors at 0. Returns whether anything changed.
    pub fn select_all(&mut self) -> bool {
        if !self.can_select_all() {
            return false;
        }
        self.selected.extend(0..self.size);
        self.anchor = (self.size > 0).then_some(0);
        true
    }

    /// Selects one index, optionally adding to the current selection.
    ///
    /// With `add == false` the previous selection is replaced and the
    /// anchor moves to `index`; with `add == true` the anchor moves only
    /// if there was none. Returns whether anything changed.
    pub fn select(&mut self, index: usize, add: bool) -> bool {
        if index >= self.size {
            return false;
        }
        let already_exact = self.selected.len() == 1 && self.selected.contains(&index);
        if add {
            let inserted = self.selected.insert(index);
            if self.anchor.is_none() {
                self.anchor = Some(index);
            }
            inserted
        } else {
            if already_exact {
                self.anchor = Some(index);
                return false;
            }
            self.selected.clear();
            self.selected.insert(index);
            self.anchor = Some(index);
            true
        }
    }

    /// Selects an inclusive range. Returns whether anything changed.
    pub fn select_range(&mut self, from: usize, to: usize, add: bool) -> bool {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        if lo >= self.size {
            return false;
        }
        let hi = hi.min(self.size.saturating_sub(1));
        let mut changed = false;
        if !add && !self.selected.is_empty() {
            let outside = self
                .selected
                .iter()
                .any(|&index| index < lo || index > hi);
            if outside {
                self.selected.retain(|&index| index >= lo && index <= hi);
                changed = true;
            }
        }
        for index in lo..=hi {
            changed |= self.selected.insert(index);
        }
        if changed || self.anchor.is_none() {
            self.anchor = Some(from.min(self.size - 1));
        }
        changed
    }

    /// Selects several indexes. Returns whether anything changed.
    pub fn select_many(&mut self, indexes: &[usize], add: bool) -> bool {
        let mut changed = false;
        if !add && !self.selected.is_empty() {
            let keep: BTreeSet<usize> = indexes
                .iter()
                .copied()
                .filter(|&index| index < self.size)
                .collect();
            if self.selected.iter().any(|index| !keep.contains(index)) {
                self.selected.retain(|index| keep.contains(index));
                changed = true;
            }
        }
        for &index in indexes {
            if index < self.size {
                changed |= self.selected.insert(index);
            }
        }
        if self.anchor.is_none() {
            self.anchor = self.first_selected();
        }
        changed
    }

    /// Clears the selection. Returns whether anything changed.
    pub fn deselect_all(&mut self) -> bool {
        self.anchor = None;
        if self.selected.is_empty() {
            return false;
        }
        self.selected.clear();
        true
    }

    /// Deselects one index. Returns whether anything changed.
    pub fn deselect(&mut self, index: usize) -> bool {
        self.selected.remove(&index)
    }

    /// Deselects an inclusive range. Returns whether anything changed.
    pub fn deselect_range(&mut self, from: usize, to: usize) -> bool {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        let before = self.selected.len();
        self.selected.retain(|&index| index < lo || index > hi);
        self.selected.len() != before
    }

    /// Deselects several indexes. Returns whether anything changed.
    pub fn deselect_many(&mut self, indexes: &[usize]) -> bool {
        let mut changed = false;
        for &index in indexes {
            changed |= self.selected.remove(&index);
        }
        changed
    }
}
