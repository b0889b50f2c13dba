//! Columns.

/// Width value meaning "not yet resolved".
pub(crate) const WIDTH_UNRESOLVED: i32 = -1;

/// Sort sequence value meaning "not part of the active sort".
pub(crate) const SORT_NONE: i32 = -1;

/// An ordered, named column slot.
///
/// The `id` is user-assigned and stable across sessions; it is what the
/// configuration string refers to. `width` starts unresolved (−1) until
/// the first pack; `preferred_width` and `minimum_width` are supplied by
/// the view (a column's minimum is its header's preferred width).
#[derive(Debug, Clone)]
pub struct Column {
    id: u32,
    name: String,
    width: i32,
    preferred_width: i32,
    minimum_width: i32,
    visible: bool,
    shrinks: bool,
    sort_sequence: i32,
    sort_ascending: bool,
}

impl Column {
    /// Creates a visible, shrink-participating, unsorted column.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            width: WIDTH_UNRESOLVED,
            preferred_width: 0,
            minimum_width: 0,
            visible: true,
            shrinks: true,
            sort_sequence: SORT_NONE,
            sort_ascending: true,
        }
    }

    /// The user-assigned stable id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Current width, or `None` while unresolved.
    pub fn width(&self) -> Option<i32> {
        (self.width != WIDTH_UNRESOLVED).then_some(self.width)
    }

    pub(crate) fn raw_width(&self) -> i32 {
        self.width
    }

    /// Sets the current width.
    pub fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    /// The width the column wants when space allows.
    pub fn preferred_width(&self) -> i32 {
        self.preferred_width
    }

    /// Sets the preferred width.
    pub fn set_preferred_width(&mut self, width: i32) {
        self.preferred_width = width;
    }

    /// The floor below which packing never shrinks this column.
    pub fn minimum_width(&self) -> i32 {
        self.minimum_width
    }

    /// Sets the minimum width.
    pub fn set_minimum_width(&mut self, width: i32) {
        self.minimum_width = width;
    }

    /// Whether the column is displayed.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Sets visibility.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Whether the column participates in overflow shrinking.
    pub fn shrinks(&self) -> bool {
        self.shrinks
    }

    /// Sets shrink participation.
    pub fn set_shrinks(&mut self, shrinks: bool) {
        self.shrinks = shrinks;
    }

    /// Rank among active sort columns (0 = primary), or `None` when the
    /// column is not part of the active sort.
    pub fn sort_sequence(&self) -> Option<u32> {
        (self.sort_sequence >= 0).then_some(self.sort_sequence as u32)
    }

    pub(crate) fn raw_sort_sequence(&self) -> i32 {
        self.sort_sequence
    }

    /// Whether this column sorts ascending.
    pub fn is_sort_ascending(&self) -> bool {
        self.sort_ascending
    }

    /// Sets the sort rank and direction. Pass `None` to remove the
    /// column from the active sort (the direction is still remembered).
    pub fn set_sort_criteria(&mut self, sequence: Option<u32>, ascending: bool) {
        self.sort_sequence = sequence.map_or(SORT_NONE, |seq| seq as i32);
        self.sort_ascending = ascending;
    }

    pub(crate) fn set_raw_sort_criteria(&mut self, sequence: i32, ascending: bool) {
        self.sort_sequence = sequence.max(SORT_NONE);
        self.sort_ascending = ascending;
    }
}
