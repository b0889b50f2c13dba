//! Snapshot-based undo and redo.
//!
//! A [`RowSnapshot`] is a compressed, deterministic serialization of one
//! row's editable content plus its immediate structural shape (parent
//! identity, open flag, direct children). Because the encoding is
//! deterministic, two snapshots of identical observable state compare
//! equal byte-for-byte, which is how [`RowUndo::finish`] detects no-op
//! edits. Restores are shallow: descendants changed since the capture
//! keep their own state and are covered by their own undo entries.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use slotmap::{Key, KeyData};
use tracing::debug;

use arbor_outline_core::logging::targets;

use super::error::{OutlineError, Result};
use super::model::OutlineModel;
use super::row::RowId;

/// A point-in-time capture of one row's content and structural shape.
///
/// Immutable once created; equality is byte equality of the compressed
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSnapshot {
    bytes: Vec<u8>,
}

struct DecodedSnapshot {
    content: Vec<u8>,
    parent: Option<RowId>,
    open: bool,
    children: Vec<RowId>,
}

impl RowSnapshot {
    /// Captures the current state of `row`.
    pub fn capture(model: &OutlineModel, row: RowId) -> Self {
        let mut raw = Vec::new();
        let mut content = Vec::new();
        let (parent, open, children): (Option<RowId>, bool, Vec<RowId>) = match model.row(row) {
            Some(record) => {
                record.data().encode_content(&mut content);
                (record.parent(), record.is_open(), record.children().to_vec())
            }
            None => (None, false, Vec::new()),
        };
        debug_assert!(model.row(row).is_some(), "capturing a destroyed row");

        raw.extend_from_slice(&(content.len() as u32).to_le_bytes());
        raw.extend_from_slice(&content);
        match parent {
            Some(parent) => {
                raw.push(1);
                raw.extend_from_slice(&parent.data().as_ffi().to_le_bytes());
            }
            None => raw.push(0),
        }
        raw.push(u8::from(open));
        raw.extend_from_slice(&(children.len() as u32).to_le_bytes());
        for child in children {
            raw.extend_from_slice(&child.data().as_ffi().to_le_bytes());
        }

        Self {
            bytes: compress(&raw),
        }
    }

    /// Restores the captured state onto `row`.
    ///
    /// All-or-nothing: the snapshot is fully decoded and every referenced
    /// row validated before anything is touched, and content restore
    /// happens before structure, so a failure leaves the model in its
    /// pre-restore state.
    pub fn apply(&self, model: &mut OutlineModel, row: RowId) -> Result<()> {
        let decoded = self.decode()?;
        if model.row(row).is_none() {
            return Err(OutlineError::snapshot_corrupt("target row no longer exists"));
        }
        if let Some(parent) = decoded.parent {
            if model.row(parent).is_none() {
                return Err(OutlineError::snapshot_corrupt(
                    "snapshot references a destroyed parent",
                ));
            }
        }
        for &child in &decoded.children {
            if model.row(child).is_none() {
                return Err(OutlineError::snapshot_corrupt(
                    "snapshot references a destroyed child",
                ));
            }
        }
        let data = model
            .row_data_mut(row)
            .ok_or_else(|| OutlineError::snapshot_corrupt("target row no longer exists"))?;
        data.restore_content(&decoded.content)?;
        model.apply_snapshot_links(row, decoded.parent, decoded.open, &decoded.children);
        Ok(())
    }

    /// The opaque compressed form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Rebuilds a snapshot from its compressed form. Corruption is only
    /// detected when the snapshot is applied.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    fn decode(&self) -> Result<DecodedSnapshot> {
        let raw = decompress(&self.bytes)?;
        let mut cursor = Cursor::new(&raw);
        let content_len = cursor.take_u32()? as usize;
        let content = cursor.take_bytes(content_len)?.to_vec();
        let parent = match cursor.take_u8()? {
            0 => None,
            1 => Some(RowId::from(KeyData::from_ffi(cursor.take_u64()?))),
            _ => {
                return Err(OutlineError::snapshot_corrupt("bad parent marker"));
            }
        };
        let open = cursor.take_u8()? != 0;
        let child_count = cursor.take_u32()? as usize;
        let mut children = Vec::with_capacity(child_count.min(raw.len()));
        for _ in 0..child_count {
            children.push(RowId::from(KeyData::from_ffi(cursor.take_u64()?)));
        }
        if !cursor.is_at_end() {
            return Err(OutlineError::snapshot_corrupt("trailing bytes"));
        }
        Ok(DecodedSnapshot {
            content,
            parent,
            open,
            children,
        })
    }
}

fn compress(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    encoder.write_all(raw).expect("in-memory write");
    encoder.finish().expect("in-memory write")
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(|err| OutlineError::snapshot_corrupt(format!("decompression failed: {err}")))?;
    Ok(raw)
}

/// Bounds-checked reader over the raw snapshot bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.offset..self.offset + len)
            .ok_or_else(|| OutlineError::snapshot_corrupt("snapshot truncated"))?;
        self.offset += len;
        Ok(slice)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take_bytes(1)?[0])
    }

    fn take_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_bytes(4)?.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_bytes(8)?.try_into().unwrap()))
    }

    fn is_at_end(&self) -> bool {
        self.offset == self.bytes.len()
    }
}

/// Undo record for one row's edit.
///
/// Capture the "before" state with [`new`], make the edit, then call
/// [`finish`]; a `false` return means the edit was a no-op and the
/// record should be discarded.
///
/// [`new`]: RowUndo::new
/// [`finish`]: RowUndo::finish
pub struct RowUndo {
    row: RowId,
    before: RowSnapshot,
    after: Option<RowSnapshot>,
}

impl RowUndo {
    /// Captures the "before" state of `row`.
    pub fn new(model: &OutlineModel, row: RowId) -> Self {
        Self {
            row,
            before: RowSnapshot::capture(model, row),
            after: None,
        }
    }

    /// The row this record covers.
    pub fn row(&self) -> RowId {
        self.row
    }

    /// Captures the "after" state and reports whether the row actually
    /// changed. Once finished the record is immutable.
    pub fn finish(&mut self, model: &OutlineModel) -> bool {
        let after = RowSnapshot::capture(model, self.row);
        let changed = after != self.before;
        self.after = Some(after);
        changed
    }

    /// Rolls the row back to its "before" state.
    pub fn undo(&self, model: &mut OutlineModel) -> Result<()> {
        model.emit_undo_will_happen();
        self.apply_before(model)?;
        model.emit_undo_did_happen();
        Ok(())
    }

    /// Rolls the row forward to its "after" state.
    pub fn redo(&self, model: &mut OutlineModel) -> Result<()> {
        model.emit_undo_will_happen();
        self.apply_after(model)?;
        model.emit_undo_did_happen();
        Ok(())
    }

    pub(crate) fn apply_before(&self, model: &mut OutlineModel) -> Result<()> {
        debug!(target: targets::UNDO, row = ?self.row, "undoing row edit");
        self.before.apply(model, self.row)
    }

    pub(crate) fn apply_after(&self, model: &mut OutlineModel) -> Result<()> {
        let Some(after) = &self.after else {
            debug_assert!(false, "redo requested before finish()");
            return Ok(());
        };
        debug!(target: targets::UNDO, row = ?self.row, "redoing row edit");
        after.apply(model, self.row)
    }
}

/// An ordered batch of row undos forming one logical user action.
///
/// Undo replays members in reverse order and redo in forward order,
/// since later members may depend on structure established by earlier
/// ones.
#[derive(Default)]
pub struct MultipleRowUndo {
    undos: Vec<RowUndo>,
}

impl MultipleRowUndo {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes `undo` and adds it to the batch unless it was a no-op.
    pub fn finish_and_add(&mut self, model: &OutlineModel, mut undo: RowUndo) {
        if undo.finish(model) {
            self.undos.push(undo);
        }
    }

    /// Adds an already-finished record.
    pub fn add(&mut self, undo: RowUndo) {
        debug_assert!(undo.after.is_some(), "adding an unfinished row undo");
        self.undos.push(undo);
    }

    /// Whether the batch recorded any actual change.
    pub fn is_empty(&self) -> bool {
        self.undos.is_empty()
    }

    /// Number of row records in the batch.
    pub fn len(&self) -> usize {
        self.undos.len()
    }

    /// Rolls every member back, last first.
    pub fn undo(&self, model: &mut OutlineModel) -> Result<()> {
        model.emit_undo_will_happen();
        for undo in self.undos.iter().rev() {
            undo.apply_before(model)?;
        }
        model.emit_undo_did_happen();
        Ok(())
    }

    /// Rolls every member forward, first first.
    pub fn redo(&self, model: &mut OutlineModel) -> Result<()> {
        model.emit_undo_will_happen();
        for undo in &self.undos {
            undo.apply_after(model)?;
        }
        model.emit_undo_did_happen();
        Ok(())
    }
}
