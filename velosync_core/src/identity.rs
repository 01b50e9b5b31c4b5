//! Device-identity patching of the tabular (CSV) activity form
//!
//! FitCSVTool renders a FIT file as rows of
//! `Type, Local Number, Message, Field 1, Value 1, Units 1, Field 2, ...`.
//! The patcher rewrites the manufacturer, product, and software-version
//! fields of the device identification (`file_id`) and hardware entry
//! (`device_info`) records so the destination platform accepts the upload
//! as coming from a supported device. Everything else passes through
//! untouched.
//!
//! Field positions are resolved by name inside each row's
//! `(Field, Value, Units)` triplets after the header row is validated, so a
//! change in upstream column ordering fails loudly instead of silently
//! writing to the wrong cells.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};

/// Column index of the row kind marker (`Definition` / `Data`)
const TYPE_COLUMN: usize = 0;
/// Column index of the message name (`file_id`, `device_info`, ...)
const MESSAGE_COLUMN: usize = 2;
/// Column index of the first `(Field, Value, Units)` triplet
const FIRST_FIELD_COLUMN: usize = 3;
/// Cells per field triplet
const CELLS_PER_FIELD: usize = 3;

/// Expected labels of the fixed leading columns, checked before any indexing
const EXPECTED_HEADER: [&str; 4] = ["Type", "Local Number", "Message", "Field 1"];

/// The identity values written into matching rows
///
/// Defaults correspond to a Garmin Edge 530 running firmware 9.75, a
/// device profile Garmin Connect accepts without complaint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// FIT manufacturer code (1 = Garmin)
    pub manufacturer: u16,
    /// FIT garmin_product code (3570 = Edge 530)
    pub product: u16,
    /// Reported firmware version
    pub software_version: f64,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            manufacturer: 1,
            product: 3570,
            software_version: 9.75,
        }
    }
}

/// Validate the header row of the tabular form
///
/// Returns a schema mismatch error when the leading column labels are not
/// the ones this patcher was written against.
pub fn validate_header(header: &[String]) -> Result<()> {
    for (index, expected) in EXPECTED_HEADER.iter().enumerate() {
        match header.get(index) {
            Some(label) if label == expected => {}
            Some(label) => {
                return Err(TransformError::schema_mismatch(format!(
                    "expected column {index} to be '{expected}', found '{label}'"
                ))
                .into());
            }
            None => {
                return Err(TransformError::schema_mismatch(format!(
                    "header has {} columns, expected at least {}",
                    header.len(),
                    EXPECTED_HEADER.len()
                ))
                .into());
            }
        }
    }
    Ok(())
}

/// Rewrites identity fields in rows of the tabular record set
#[derive(Debug, Clone)]
pub struct IdentityPatcher {
    identity: DeviceIdentity,
}

impl IdentityPatcher {
    /// Create a patcher writing the given identity
    pub fn new(identity: DeviceIdentity) -> Self {
        Self { identity }
    }

    /// Patch a single row in place
    ///
    /// Returns `Ok(true)` when the row was a target and its identity
    /// fields were rewritten, `Ok(false)` when it passed through
    /// unchanged. A target row missing a value cell for a named field is a
    /// hard failure, never skipped. `index` is the zero-based row number,
    /// used for error reporting only.
    pub fn patch_row(&self, index: usize, row: &mut [String]) -> Result<bool> {
        if !self.is_target(row) {
            return Ok(false);
        }

        let mut field = FIRST_FIELD_COLUMN;
        while field < row.len() {
            let value = field + 1;
            match row[field].as_str() {
                "manufacturer" => {
                    self.write_value(index, row, value, self.identity.manufacturer.to_string())?;
                }
                // `product` is the generic field name; once the manufacturer
                // is Garmin the value is read through the garmin_product
                // subfield, so the field name is rewritten along with it.
                "product" | "garmin_product" => {
                    row[field] = "garmin_product".to_string();
                    self.write_value(index, row, value, self.identity.product.to_string())?;
                }
                "software_version" => {
                    self.write_value(index, row, value, self.identity.software_version.to_string())?;
                }
                _ => {}
            }
            field += CELLS_PER_FIELD;
        }

        Ok(true)
    }

    /// Row targeting rule
    ///
    /// Device identification: a value-bearing `file_id` row carrying a
    /// `manufacturer` field. Hardware entry: a `Data` row of `device_info`
    /// carrying one. Definition rows hold field sizes, not values, and are
    /// never touched.
    fn is_target(&self, row: &[String]) -> bool {
        let is_data = row.get(TYPE_COLUMN).is_some_and(|kind| kind == "Data");
        if !is_data {
            return false;
        }

        let message = match row.get(MESSAGE_COLUMN) {
            Some(message) => message.as_str(),
            None => return false,
        };
        if message != "file_id" && message != "device_info" {
            return false;
        }

        row[FIRST_FIELD_COLUMN.min(row.len())..]
            .iter()
            .step_by(CELLS_PER_FIELD)
            .any(|name| name == "manufacturer")
    }

    fn write_value(
        &self,
        index: usize,
        row: &mut [String],
        cell: usize,
        value: String,
    ) -> Result<()> {
        let slot = row.get_mut(cell).ok_or_else(|| {
            TransformError::malformed_row(
                index,
                format!("no value cell at column {cell} for a named identity field"),
            )
        })?;
        *slot = value;
        Ok(())
    }
}
