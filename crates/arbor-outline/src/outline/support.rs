//! Shared test fixtures.

use super::column::Column;
use super::error::{OutlineError, Result};
use super::model::OutlineModel;
use super::row::{CellValue, RowData};

/// Column id for the name column in test models.
pub(crate) const COL_NAME: u32 = 0;
/// Column id for the value column in test models.
pub(crate) const COL_VALUE: u32 = 1;

/// A minimal data provider: one text field, one integer field.
pub(crate) struct SampleRow {
    pub name: String,
    pub value: i64,
}

impl SampleRow {
    pub fn boxed(name: &str, value: i64) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl RowData for SampleRow {
    fn data(&self, column: &Column) -> CellValue {
        match column.id() {
            COL_NAME => CellValue::Text(self.name.clone()),
            COL_VALUE => CellValue::Integer(self.value),
            _ => CellValue::None,
        }
    }

    fn set_data(&mut self, column: &Column, value: CellValue) {
        match (column.id(), value) {
            (COL_NAME, CellValue::Text(text)) => self.name = text,
            (COL_VALUE, CellValue::Integer(number)) => self.value = number,
            _ => {}
        }
    }

    fn encode_content(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&self.value.to_le_bytes());
    }

    fn restore_content(&mut self, bytes: &[u8]) -> Result<()> {
        let too_short = || OutlineError::snapshot_corrupt("sample row content truncated");
        let len_bytes: [u8; 4] = bytes.get(..4).ok_or_else(too_short)?.try_into().unwrap();
        let len = u32::from_le_bytes(len_bytes) as usize;
        let name_bytes = bytes.get(4..4 + len).ok_or_else(too_short)?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| OutlineError::snapshot_corrupt("sample row name is not utf-8"))?
            .to_string();
        let value_bytes: [u8; 8] = bytes
            .get(4 + len..4 + len + 8)
            .ok_or_else(too_short)?
            .try_into()
            .unwrap();
        self.name = name;
        self.value = i64::from_le_bytes(value_bytes);
        Ok(())
    }
}

/// A model with the standard two-column test layout.
pub(crate) fn sample_model() -> OutlineModel {
    let mut model = OutlineModel::new();
    model.add_column(Column::new(COL_NAME, "Name"));
    model.add_column(Column::new(COL_VALUE, "Value"));
    model
}
