//! Rows and the data-provider capability.
//!
//! A [`Row`] is a node in the outline's tree. Rows live in an arena keyed
//! by [`RowId`]; the parent link is a plain id and the child list is an
//! owned `Vec` of ids, so ownership is unambiguous and cycles are
//! impossible by construction. Cell content comes from an external
//! [`RowData`] provider; the model never interprets values beyond
//! comparing them for sorting and handing them to the view boundary.

use std::cmp::Ordering;

use slotmap::{SlotMap, new_key_type};

use super::column::Column;
use super::error::Result;

new_key_type! {
    /// Stable handle to a row within one [`OutlineModel`]'s arena.
    ///
    /// Ids are never reused while the row record is allocated; a removed
    /// (detached) row keeps its id until explicitly destroyed, so undo
    /// snapshots can re-link children by id.
    ///
    /// [`OutlineModel`]: super::OutlineModel
    pub struct RowId;
}

pub(crate) type RowArena = SlotMap<RowId, Row>;

/// Cached row height value meaning "unknown, must recompute".
pub(crate) const HEIGHT_UNKNOWN: i32 = -1;

/// A cell value handed across the model boundary.
///
/// This is a closed set of content kinds; rendering stays outside the
/// core, so the model only needs comparison and text conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value. Sorts before every other kind.
    None,
    /// A boolean flag.
    Bool(bool),
    /// An integer quantity.
    Integer(i64),
    /// A floating-point quantity.
    Number(f64),
    /// Text content.
    Text(String),
}

impl CellValue {
    /// Returns the value as display text.
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    /// Total order used by the sorter.
    ///
    /// `None` sorts first. Integers and numbers compare numerically with
    /// each other; otherwise kinds compare by rank. Text compares
    /// case-insensitively, falling back to byte order to keep the result
    /// a strict weak ordering.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::None, Self::None) => Ordering::Equal,
            (Self::None, _) => Ordering::Less,
            (_, Self::None) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Integer(a), Self::Number(b)) => (*a as f64).total_cmp(b),
            (Self::Number(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => {
                let folded = a.to_lowercase().cmp(&b.to_lowercase());
                if folded != Ordering::Equal {
                    folded
                } else {
                    a.cmp(b)
                }
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Number(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

/// The capability a host implements to supply a row's cell content.
///
/// The undo system additionally needs deterministic content
/// serialization: [`encode_content`] must produce identical bytes for
/// identical observable state, and [`restore_content`] must either fully
/// apply the bytes or fail without touching the row.
///
/// [`encode_content`]: RowData::encode_content
/// [`restore_content`]: RowData::restore_content
pub trait RowData {
    /// Returns the value for the given column.
    fn data(&self, column: &Column) -> CellValue;

    /// Returns the value for the given column as display text.
    fn data_as_text(&self, column: &Column) -> String {
        self.data(column).to_text()
    }

    /// Sets the value for the given column.
    fn set_data(&mut self, column: &Column, value: CellValue);

    /// Appends a deterministic encoding of this row's editable content.
    fn encode_content(&self, buf: &mut Vec<u8>);

    /// Restores content previously produced by [`encode_content`].
    ///
    /// Must be all-or-nothing: on error the row's content is unchanged.
    ///
    /// [`encode_content`]: RowData::encode_content
    fn restore_content(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A single row of an outline.
///
/// Structural state (parent, children, open flag) is owned by the row
/// record; cell content is delegated to the [`RowData`] provider. Rows
/// are created through [`OutlineModel::new_row`] and addressed by
/// [`RowId`].
///
/// [`OutlineModel::new_row`]: super::OutlineModel::new_row
pub struct Row {
    data: Box<dyn RowData>,
    parent: Option<RowId>,
    /// Present only when the row can have children.
    children: Option<Vec<RowId>>,
    open: bool,
    height: i32,
}

impl Row {
    pub(crate) fn new(data: Box<dyn RowData>, can_have_children: bool) -> Self {
        Self {
            data,
            parent: None,
            children: if can_have_children {
                Some(Vec::new())
            } else {
                None
            },
            open: false,
            height: HEIGHT_UNKNOWN,
        }
    }

    /// Read access to the row's data provider.
    pub fn data(&self) -> &dyn RowData {
        &*self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut dyn RowData {
        &mut *self.data
    }

    /// The parent row, if any.
    pub fn parent(&self) -> Option<RowId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<RowId>) {
        self.parent = parent;
    }

    /// Whether this row may hold children. Fixed at construction.
    pub fn can_have_children(&self) -> bool {
        self.children.is_some()
    }

    /// The direct children, empty for rows that cannot have children.
    pub fn children(&self) -> &[RowId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<RowId>> {
        self.children.as_mut()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Whether this row currently has children.
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    /// Index of `child` among the direct children, if it is one.
    pub fn index_of_child(&self, child: RowId) -> Option<usize> {
        self.children().iter().position(|&id| id == child)
    }

    /// Whether this row is open, showing its children.
    ///
    /// Always `false` for rows that cannot have children.
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open_flag(&mut self, open: bool) {
        // Invariant: a row without a children container is never open.
        self.open = open && self.children.is_some();
    }

    /// Cached display height, or `None` when it must be recomputed.
    pub fn height(&self) -> Option<i32> {
        (self.height != HEIGHT_UNKNOWN).then_some(self.height)
    }

    /// Stores a computed display height.
    pub(crate) fn set_height(&mut self, height: i32) {
        self.height = height;
    }

    pub(crate) fn invalidate_height(&mut self) {
        self.height = HEIGHT_UNKNOWN;
    }
}
