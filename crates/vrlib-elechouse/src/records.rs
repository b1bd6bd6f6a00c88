//! Record list normalization.
//!
//! The module treats every list of record IDs in a command as a set, so lists
//! are sorted ascending and de-duplicated before they go into a frame.

use vrlib_core::{EMPTY_SLOT, Error, RecordId, Result};

/// Sort ascending and drop duplicates.
///
/// # Example
///
/// ```
/// use vrlib_elechouse::records::normalize;
///
/// assert_eq!(normalize(&[5, 2, 2, 9, 1]), vec![1, 2, 5, 9]);
/// ```
pub fn normalize(ids: &[RecordId]) -> Vec<RecordId> {
    let mut out = ids.to_vec();
    out.sort();
    out.dedup();
    out
}

/// Constraints applied to a record list argument after normalization.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ListRules {
    /// Reject an empty list.
    pub non_empty: bool,
    /// Maximum number of distinct records.
    pub max: Option<usize>,
}

/// Normalize a caller-supplied record list and check it against `rules`.
///
/// `0xFF` is never a valid record; on the wire it means "no record" or
/// "all records".
pub(crate) fn prepare(ids: &[RecordId], rules: ListRules) -> Result<Vec<RecordId>> {
    let records = normalize(ids);
    if records.last() == Some(&EMPTY_SLOT) {
        return Err(Error::InvalidParameter(format!(
            "record 0x{EMPTY_SLOT:02X} is reserved"
        )));
    }
    if rules.non_empty && records.is_empty() {
        return Err(Error::InvalidParameter("no records given".into()));
    }
    if let Some(max) = rules.max {
        if records.len() > max {
            return Err(Error::InvalidParameter(format!(
                "{} records given, at most {max} allowed",
                records.len()
            )));
        }
    }
    Ok(records)
}
