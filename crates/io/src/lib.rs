// Sales sheet and catalog file readers

pub mod catalog;
pub mod csv;
pub mod grid;
pub mod xlsx;

use std::path::Path;

use tally_recon::config::SheetLayout;
use tally_recon::model::SalesSheet;
use tally_recon::normalize::normalize;

/// Extensions read as delimited text; everything else goes to the workbook reader.
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Read every sales sheet in `path`.
///
/// Workbooks yield one sheet per worksheet, labelled by the worksheet name;
/// a `label` keeps only the worksheet whose name normalizes to the same key.
/// Delimited files yield a single sheet labelled `label`, or the file stem
/// when no label is given.
pub fn read_sales(
    path: &Path,
    label: Option<&str>,
    layout: &SheetLayout,
) -> Result<Vec<SalesSheet>, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if DELIMITED_EXTENSIONS.contains(&ext.as_str()) {
        let label = match label {
            Some(l) => l.to_string(),
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("sheet")
                .to_string(),
        };
        return Ok(vec![csv::read_delimited(path, &label, layout)?]);
    }

    let sheets = xlsx::read_workbook(path, layout)?;
    match label {
        Some(wanted) => {
            let wanted = wanted.trim();
            let key = normalize(wanted);
            let filtered: Vec<SalesSheet> = sheets
                .into_iter()
                .filter(|s| normalize(&s.label) == key)
                .collect();
            if filtered.is_empty() {
                return Err(format!("no sheet named '{wanted}' in {}", path.display()));
            }
            Ok(filtered)
        }
        None => Ok(sheets),
    }
}
