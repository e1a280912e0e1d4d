//! Spreadsheet rendering of the export projection.

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use curator_inventory::{ExportRow, EXPORT_COLUMNS};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLSX_CONTENT_DISPOSITION: &str = r#"attachment; filename="InventoryReport.xlsx""#;

const SHEET_NAME: &str = "Inventory";

/// One bold header row, then one row per item. Position is written as a
/// number so the sheet sorts numerically; every other cell is text.
pub fn render_xlsx(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in (0u16..).zip(EXPORT_COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header)?;
    }
    for (row_num, row) in (1u32..).zip(rows) {
        sheet.write_number(row_num, 0, row.position as f64)?;
        for (col, cell) in (1u16..).zip(row.cells().into_iter().skip(1)) {
            sheet.write_string(row_num, col, cell)?;
        }
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_inventory::MISSING_REFERENCE;

    fn row(position: i64) -> ExportRow {
        ExportRow {
            position,
            asset_code: "A1".to_string(),
            item_name: "Chair".to_string(),
            brand: String::new(),
            model: "No. 14".to_string(),
            location: MISSING_REFERENCE.to_string(),
            serial_number: String::new(),
            situation: "storage".to_string(),
            conservation_state: "Good".to_string(),
            observations: String::new(),
        }
    }

    #[test]
    fn renders_a_zip_container() {
        let bytes = render_xlsx(&[row(1), row(3)]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_export_still_has_a_sheet() {
        let bytes = render_xlsx(&[]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
