//! Builders for activity references and tabular fixtures

use velosync_core::ActivityRef;

/// Build an [`ActivityRef`] with a Zwift-shaped start date string
///
/// `start_date` uses the platform's wire format, e.g.
/// `2026-08-01T09:30:00.000+0000`.
pub fn activity_ref(id: u64, start_date: &str) -> ActivityRef {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "fitFileBucket": "s3-fit-prd-uswest2-test",
        "fitFileKey": format!("prod/{id}/{id}.fit"),
        "startDate": start_date,
    }))
    .expect("fixture activity must deserialize")
}

/// Builds CSV text in the FitCSVTool tabular layout
///
/// Rows are `Type, Local Number, Message, Field 1, Value 1, Units 1, ...`,
/// matching what the decode step hands to the identity patcher.
#[derive(Debug, Clone)]
pub struct TabularFixture {
    rows: Vec<Vec<String>>,
}

impl TabularFixture {
    /// Start a fixture with the standard header row
    pub fn new() -> Self {
        Self {
            rows: vec![to_row(&[
                "Type",
                "Local Number",
                "Message",
                "Field 1",
                "Value 1",
                "Units 1",
                "Field 2",
                "Value 2",
                "Units 2",
                "Field 3",
                "Value 3",
                "Units 3",
                "Field 4",
                "Value 4",
                "Units 4",
            ])],
        }
    }

    /// Start a fixture without any header row
    pub fn headerless() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a `file_id` definition/data pair with the given identity
    pub fn with_file_id(mut self, manufacturer: &str, product: &str) -> Self {
        self.rows.push(to_row(&[
            "Definition",
            "0",
            "file_id",
            "serial_number",
            "1",
            "",
            "manufacturer",
            "1",
            "",
            "product",
            "1",
            "",
            "type",
            "1",
            "",
        ]));
        self.rows.push(to_row(&[
            "Data",
            "0",
            "file_id",
            "serial_number",
            "3452584520",
            "",
            "manufacturer",
            manufacturer,
            "",
            "product",
            product,
            "",
            "type",
            "4",
            "",
        ]));
        self
    }

    /// Append a `device_info` data row with the given identity
    pub fn with_device_info(
        mut self,
        manufacturer: &str,
        product: &str,
        software_version: &str,
    ) -> Self {
        self.rows.push(to_row(&[
            "Data",
            "1",
            "device_info",
            "timestamp",
            "1094963981",
            "s",
            "manufacturer",
            manufacturer,
            "",
            "product",
            product,
            "",
            "software_version",
            software_version,
            "",
        ]));
        self
    }

    /// Append an unrelated `record` data row
    pub fn with_record_row(mut self, power: &str) -> Self {
        self.rows.push(to_row(&[
            "Data", "3", "record", "power", power, "watts", "cadence", "92", "rpm",
        ]));
        self
    }

    /// Append an arbitrary row
    pub fn with_row(mut self, cells: &[&str]) -> Self {
        self.rows.push(to_row(cells));
        self
    }

    /// Render as CSV text
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    /// Rows, including the header
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl Default for TabularFixture {
    fn default() -> Self {
        Self::new()
            .with_file_id("260", "15")
            .with_device_info("260", "15", "1.13")
            .with_record_row("250")
    }
}

fn to_row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}
