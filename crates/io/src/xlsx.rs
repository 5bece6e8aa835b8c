// Excel/ODS import via calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;

use tally_recon::config::SheetLayout;
use tally_recon::model::{date_from_excel_serial, RawCell, SalesSheet};

use crate::grid::sales_sheet;

/// Read every worksheet of an Excel file (xlsx, xls, xlsb, ods).
pub fn read_workbook(path: &Path, layout: &SheetLayout) -> Result<Vec<SalesSheet>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let (start_row, start_col) = (start_row as usize, start_col as usize);

        let mut grid: Vec<Vec<RawCell>> = vec![Vec::new(); start_row];
        for row in range.rows() {
            let mut cells = vec![RawCell::Empty; start_col];
            cells.extend(row.iter().map(to_raw_cell));
            grid.push(cells);
        }

        let sheet = sales_sheet(sheet_name, &grid, layout);
        log::debug!(
            "{}: sheet '{}' has {} store columns, {} rows",
            path.display(),
            sheet.label,
            sheet.stores.len(),
            sheet.rows.len()
        );
        sheets.push(sheet);
    }

    Ok(sheets)
}

fn to_raw_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) if s.trim().is_empty() => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(n) => RawCell::Number(*n),
        Data::Int(n) => RawCell::Number(*n as f64),
        // 1900 date system assumed; calamine does not expose the 1904 flag.
        Data::DateTime(dt) => date_from_excel_serial(dt.as_f64())
            .map(RawCell::Date)
            .unwrap_or(RawCell::Empty),
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
            .map(RawCell::Date)
            .unwrap_or_else(|| RawCell::Text(s.clone())),
        Data::Bool(_) | Data::Error(_) | Data::DurationIso(_) => RawCell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_mapping() {
        assert_eq!(to_raw_cell(&Data::Float(3.0)), RawCell::Number(3.0));
        assert_eq!(to_raw_cell(&Data::Int(7)), RawCell::Number(7.0));
        assert_eq!(to_raw_cell(&Data::String("  ".into())), RawCell::Empty);
        assert_eq!(
            to_raw_cell(&Data::String("Peach".into())),
            RawCell::Text("Peach".into())
        );
        assert_eq!(
            to_raw_cell(&Data::DateTimeIso("2024-01-05T00:00:00".into())),
            RawCell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(to_raw_cell(&Data::Bool(true)), RawCell::Empty);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_workbook(Path::new("/nonexistent/sales.xlsx"), &SheetLayout::default())
            .unwrap_err();
        assert!(err.contains("Failed to open Excel file"), "{err}");
    }
}
