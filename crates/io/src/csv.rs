// CSV/TSV import

use std::io::Read;
use std::path::Path;

use tally_recon::config::SheetLayout;
use tally_recon::model::{RawCell, SalesSheet};

use crate::grid::sales_sheet;

/// Read a delimited export of one chain sheet.
pub fn read_delimited(path: &Path, label: &str, layout: &SheetLayout) -> Result<SalesSheet, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!(
        "{}: delimiter {:?}",
        path.display(),
        char::from(delimiter)
    );
    parse_delimited(&content, delimiter, label, layout)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by width
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel exports are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let bytes = match String::from_utf8(bytes) {
        Ok(s) => return Ok(strip_bom(s)),
        Err(e) => e.into_bytes(),
    };
    log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
    Ok(decoded.into_owned())
}

fn strip_bom(s: String) -> String {
    match s.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

fn parse_delimited(
    content: &str,
    delimiter: u8,
    label: &str,
    layout: &SheetLayout,
) -> Result<SalesSheet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<RawCell>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        grid.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(sales_sheet(label, &grid, layout))
}
