//! Serialized column configuration.
//!
//! A configuration string captures column order, visibility, width and
//! sort state in a versioned, tab-delimited form:
//!
//! ```text
//! <version>\t<count>\t(<id>\t<visible>\t<width>\t<sortSequence>\t<sortAscending>)*
//! ```
//!
//! Widths and sort sequences use the raw encoding, where `-1` means
//! "unresolved" / "not part of the sort".

use tracing::debug;

use arbor_outline_core::logging::targets;

use super::column::SORT_NONE;
use super::error::{OutlineError, Result};
use super::model::OutlineModel;

/// Version tag emitted by [`OutlineModel::config`]; configurations with
/// any other version are rejected.
pub const CONFIG_VERSION: u32 = 1;

struct ConfigEntry {
    id: u32,
    visible: bool,
    width: i32,
    sort_sequence: i32,
    sort_ascending: bool,
}

impl OutlineModel {
    /// Serializes the column configuration.
    pub fn config(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("{CONFIG_VERSION}\t{}", self.column_count());
        for column in self.columns() {
            let _ = write!(
                out,
                "\t{}\t{}\t{}\t{}\t{}",
                column.id(),
                u8::from(column.is_visible()),
                column.raw_width(),
                column.raw_sort_sequence(),
                u8::from(column.is_sort_ascending()),
            );
        }
        out
    }

    /// Restores a configuration produced by [`config`].
    ///
    /// The string is parsed and validated in full before anything is
    /// touched, so a rejected configuration (wrong version, unknown
    /// column id, malformed field) leaves the model unchanged. On
    /// success the columns are reordered to match and, if the restored
    /// state carries a sort, the model re-sorts with the `restoring`
    /// flag set on the `sorted` signal.
    ///
    /// [`config`]: OutlineModel::config
    pub fn apply_config(&mut self, config: &str) -> Result<()> {
        let mut fields = config.split('\t');
        let version: u32 = parse_field(&mut fields, "version")?;
        if version != CONFIG_VERSION {
            return Err(OutlineError::malformed_config(format!(
                "unsupported version {version}"
            )));
        }
        let count: usize = parse_field(&mut fields, "column count")?;

        let mut entries = Vec::with_capacity(count.min(config.len()));
        for _ in 0..count {
            let id: u32 = parse_field(&mut fields, "column id")?;
            if self.column_with_id(id).is_none() {
                return Err(OutlineError::InvalidColumnReference { id });
            }
            if entries.iter().any(|entry: &ConfigEntry| entry.id == id) {
                return Err(OutlineError::malformed_config(format!(
                    "duplicate column id {id}"
                )));
            }
            entries.push(ConfigEntry {
                id,
                visible: parse_flag(&mut fields, "visible")?,
                width: parse_field(&mut fields, "width")?,
                sort_sequence: parse_field(&mut fields, "sort sequence")?,
                sort_ascending: parse_flag(&mut fields, "sort ascending")?,
            });
        }
        if fields.next().is_some() {
            return Err(OutlineError::malformed_config("trailing fields"));
        }
        // Partial configs would leave the unlisted columns' sort state
        // stale, so every column must be covered.
        if entries.len() != self.column_count() {
            return Err(OutlineError::malformed_config(format!(
                "expected {} columns, got {}",
                self.column_count(),
                entries.len()
            )));
        }
        if entries
            .iter()
            .any(|entry| entry.sort_sequence < SORT_NONE)
        {
            return Err(OutlineError::malformed_config("bad sort sequence"));
        }
        // Active sort ranks must be exactly 0..k, no gaps or duplicates,
        // or the restored sort order would be ambiguous.
        let mut sequences: Vec<i32> = entries
            .iter()
            .map(|entry| entry.sort_sequence)
            .filter(|&seq| seq != SORT_NONE)
            .collect();
        sequences.sort_unstable();
        if sequences
            .iter()
            .enumerate()
            .any(|(rank, &seq)| seq != rank as i32)
        {
            return Err(OutlineError::malformed_config(
                "sort sequences must be unique and contiguous from 0",
            ));
        }

        let had_sort = self.has_active_sort();
        let order: Vec<u32> = entries.iter().map(|entry| entry.id).collect();
        self.reorder_columns(&order);
        for entry in &entries {
            let column = self
                .column_with_id_mut(entry.id)
                .expect("validated before mutation");
            column.set_visible(entry.visible);
            column.set_width(entry.width);
            column.set_raw_sort_criteria(entry.sort_sequence, entry.sort_ascending);
        }
        debug!(target: targets::MODEL, columns = entries.len(), "applied configuration");

        if self.has_active_sort() {
            self.sort_internal(true);
        } else if had_sort {
            self.signals().sort_cleared.emit(());
        }
        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(
    fields: &mut std::str::Split<'_, char>,
    what: &str,
) -> Result<T> {
    let field = fields
        .next()
        .ok_or_else(|| OutlineError::malformed_config(format!("missing {what}")))?;
    field
        .parse()
        .map_err(|_| OutlineError::malformed_config(format!("bad {what}: {field:?}")))
}

fn parse_flag(fields: &mut std::str::Split<'_, char>, what: &str) -> Result<bool> {
    match parse_field::<u8>(fields, what)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(OutlineError::malformed_config(format!(
            "bad {what}: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::support::{sample_model, SampleRow, COL_NAME, COL_VALUE};
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_config_round_trip() {
        let mut model = sample_model();
        model.column_with_id_mut(COL_VALUE).unwrap().set_width(120);
        model.set_sort_column(COL_NAME, false, false);

        let config = model.config();
        let mut restored = sample_model();
        restored.apply_config(&config).unwrap();
        assert_eq!(restored.config(), config);
        assert_eq!(
            restored.column_with_id(COL_VALUE).unwrap().width(),
            Some(120)
        );
        let name = restored.column_with_id(COL_NAME).unwrap();
        assert_eq!(name.sort_sequence(), Some(0));
        assert!(!name.is_sort_ascending());
    }

    #[test]
    fn test_apply_config_reorders_and_hides() {
        let mut source = sample_model();
        source.remove_column(COL_NAME);
        source.add_column({
            let mut col = super::super::column::Column::new(COL_NAME, "Name");
            col.set_visible(false);
            col
        });
        // Source order: Value, Name(hidden).
        let config = source.config();

        let mut model = sample_model();
        model.apply_config(&config).unwrap();
        assert_eq!(model.column_at(0).unwrap().id(), COL_VALUE);
        assert_eq!(model.column_at(1).unwrap().id(), COL_NAME);
        assert!(!model.column_at(1).unwrap().is_visible());
        assert_eq!(model.visible_column_count(), 1);
    }

    #[test]
    fn test_version_mismatch_is_rejected_without_effect() {
        let mut model = sample_model();
        let before = model.config();
        let stale = before.replacen('1', "9", 1);
        assert!(matches!(
            model.apply_config(&stale),
            Err(OutlineError::MalformedConfig { .. })
        ));
        assert_eq!(model.config(), before);
    }

    #[test]
    fn test_unknown_column_id_is_rejected_without_effect() {
        let mut model = sample_model();
        let before = model.config();
        let foreign = format!("{CONFIG_VERSION}\t1\t42\t1\t100\t-1\t1");
        assert_eq!(
            model.apply_config(&foreign),
            Err(OutlineError::InvalidColumnReference { id: 42 })
        );
        assert_eq!(model.config(), before);
    }

    #[test]
    fn test_malformed_fields_are_rejected() {
        let mut model = sample_model();
        assert!(model.apply_config("").is_err());
        assert!(model.apply_config("1\tnope").is_err());
        assert!(model
            .apply_config(&format!("{CONFIG_VERSION}\t1\t0\t1\t100\t-1"))
            .is_err());
        assert!(model
            .apply_config(&format!("{CONFIG_VERSION}\t1\t0\t2\t100\t-1\t1"))
            .is_err());
        // Covers only one of the two columns.
        assert!(model
            .apply_config(&format!("{CONFIG_VERSION}\t1\t0\t1\t100\t-1\t1"))
            .is_err());
    }

    #[test]
    fn test_sort_sequences_must_be_unique_and_contiguous() {
        let mut model = sample_model();
        let before = model.config();

        // Both columns claim sort rank 3.
        let duplicate = format!("{CONFIG_VERSION}\t2\t0\t1\t100\t3\t1\t1\t1\t100\t3\t0");
        assert!(matches!(
            model.apply_config(&duplicate),
            Err(OutlineError::MalformedConfig { .. })
        ));
        assert_eq!(model.config(), before);
        assert!(!model.has_active_sort());

        // A single sorted column must carry rank 0.
        let gapped = format!("{CONFIG_VERSION}\t2\t0\t1\t100\t1\t1\t1\t1\t100\t-1\t1");
        assert!(model.apply_config(&gapped).is_err());

        // Anything below -1 is not a valid raw sequence.
        let negative = format!("{CONFIG_VERSION}\t2\t0\t1\t100\t-2\t1\t1\t1\t100\t-1\t1");
        assert!(model.apply_config(&negative).is_err());
        assert_eq!(model.config(), before);
    }

    #[test]
    fn test_restored_sort_reapplies_with_flag() {
        let mut source = sample_model();
        source.set_sort_column(COL_NAME, true, false);
        let config = source.config();

        let mut model = sample_model();
        let b = model.new_row(SampleRow::boxed("b", 0), false);
        let a = model.new_row(SampleRow::boxed("a", 0), false);
        model.add_row(0, b, false).unwrap();
        model.add_row(1, a, false).unwrap();

        let restoring = Arc::new(Mutex::new(None));
        let seen = restoring.clone();
        model
            .signals()
            .sorted
            .connect(move |&flag| *seen.lock() = Some(flag));

        model.apply_config(&config).unwrap();
        assert_eq!(model.display_rows(), &[a, b]);
        assert_eq!(*restoring.lock(), Some(true));
    }
}
