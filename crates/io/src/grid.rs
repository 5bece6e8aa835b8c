// Cell grid -> SalesSheet, shared by the workbook and delimited readers

use tally_recon::config::SheetLayout;
use tally_recon::model::{RawCell, SalesRow, SalesSheet};

/// Cut a sales sheet out of a dense grid anchored at A1.
///
/// The header row gives the store names from `first_store_col` on; trailing
/// blank headers are dropped. Every row below the header becomes a
/// [`SalesRow`] with one quantity cell per store column, padded with
/// [`RawCell::Empty`] where the source row is short.
pub fn sales_sheet(label: &str, grid: &[Vec<RawCell>], layout: &SheetLayout) -> SalesSheet {
    let mut stores: Vec<String> = grid
        .get(layout.header_row)
        .map(|header| {
            header
                .iter()
                .skip(layout.first_store_col)
                .map(|c| c.to_text().trim().to_string())
                .collect()
        })
        .unwrap_or_default();
    while stores.last().is_some_and(|s| s.is_empty()) {
        stores.pop();
    }

    let rows = grid
        .iter()
        .enumerate()
        .skip(layout.header_row + 1)
        .map(|(idx, row)| SalesRow {
            row: idx + 1,
            date: cell_at(row, layout.date_col),
            product: cell_at(row, layout.product_col),
            quantities: (0..stores.len())
                .map(|i| cell_at(row, layout.first_store_col + i))
                .collect(),
        })
        .collect();

    SalesSheet {
        label: label.trim().to_string(),
        stores,
        rows,
    }
}

fn cell_at(row: &[RawCell], col: usize) -> RawCell {
    row.get(col).cloned().unwrap_or(RawCell::Empty)
}
