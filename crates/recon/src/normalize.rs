//! Text key canonicalization shared by every lookup table.
//!
//! Spreadsheet authors type the same name many ways ("Krónan", "KRONAN",
//! " kronan "). All alias keys, catalog names and raw cell text pass through
//! [`normalize`] before they are compared, so the fold must be idempotent.

/// Lowercase, fold Latin-1/Icelandic letters to ASCII, collapse whitespace.
pub fn normalize(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        fold_char(c, &mut folded);
    }

    let mut out = String::with_capacity(folded.len());
    for word in folded.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Catalog slug form of a display name: normalized, spaces become dashes.
pub fn slugify(raw: &str) -> String {
    normalize(raw).replace(' ', "-")
}

fn fold_char(c: char, out: &mut String) {
    // Combining diacritical marks (decomposed input like "o\u{301}").
    if ('\u{0300}'..='\u{036f}').contains(&c) {
        return;
    }
    match c {
        'á' | 'à' | 'â' | 'ä' | 'å' | 'ã' => out.push('a'),
        'é' | 'è' | 'ê' | 'ë' => out.push('e'),
        'í' | 'ì' | 'î' | 'ï' => out.push('i'),
        'ó' | 'ò' | 'ô' | 'ö' | 'ø' | 'õ' => out.push('o'),
        'ú' | 'ù' | 'û' | 'ü' => out.push('u'),
        'ý' | 'ÿ' => out.push('y'),
        'ñ' => out.push('n'),
        'ç' => out.push('c'),
        'ð' => out.push('d'),
        'þ' => out.push_str("th"),
        'æ' => out.push_str("ae"),
        'ß' => out.push_str("ss"),
        'ς' => out.push('σ'),
        _ => out.push(c),
    }
}
