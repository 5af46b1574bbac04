//! Address-book exports (Outlook/Google style CSV) reduced to name and phone
//! columns.

use crate::error::{ChatleadError, Result};

const NAME_HEADERS: &[&str] = &["First Name", "Nombre", "Full Name", "Display Name"];
const PHONE1_HEADERS: &[&str] = &["Phone 1 - Value", "Teléfono 1 - Valor", "Telefono 1 - Valor"];
const PHONE2_HEADERS: &[&str] = &["Phone 2 - Value", "Teléfono 2 - Valor", "Telefono 2 - Valor"];

/// One address-book row, values as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRow {
    pub name: String,
    pub phone1: String,
    pub phone2: String,
}

/// Decode and parse an address-book export. Fails when the file has no
/// recognizable name column.
pub fn read_contact_rows(bytes: &[u8]) -> Result<Vec<ContactRow>> {
    let text = decode_text(bytes);
    let text = text.trim_start_matches('\u{FEFF}');
    if text.trim().is_empty() {
        return Err(ChatleadError::InputRejected("Empty contacts file".to_string()));
    }

    let delimiter = detect_delimiter(text.as_bytes());
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{FEFF}').to_string())
        .collect();

    let name_columns = column_positions(&headers, NAME_HEADERS);
    if name_columns.is_empty() {
        return Err(ChatleadError::InputRejected(format!(
            "Contacts file has no name column (expected one of: {})",
            NAME_HEADERS.join(", ")
        )));
    }
    let phone1_columns = column_positions(&headers, PHONE1_HEADERS);
    let phone2_columns = column_positions(&headers, PHONE2_HEADERS);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(ContactRow {
            name: first_value(&record, &name_columns),
            phone1: first_value(&record, &phone1_columns),
            phone2: first_value(&record, &phone2_columns),
        });
    }

    tracing::debug!(
        rows = rows.len(),
        delimiter = %(delimiter as char).escape_default(),
        "Parsed contacts file"
    );
    Ok(rows)
}

/// UTF-8 (BOM optional) or UTF-16 with a BOM. Bytes that are not valid UTF-8
/// and carry no BOM are read as UTF-16LE, the usual Windows export.
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => decode_utf16(bytes, u16::from_le_bytes),
        },
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Alias order decides priority: the first alias present wins for a row.
fn column_positions(headers: &[String], aliases: &[&str]) -> Vec<usize> {
    aliases
        .iter()
        .filter_map(|alias| headers.iter().position(|h| h == alias))
        .collect()
}

fn first_value(record: &csv::StringRecord, columns: &[usize]) -> String {
    columns
        .iter()
        .filter_map(|&i| record.get(i))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Try common delimiters and keep the one that yields the most consistent
/// multi-column layout.
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let candidates = [b',', b';', b'\t'];
    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delimiter in &candidates {
        let score = evaluate_delimiter(bytes, delimiter);
        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

fn evaluate_delimiter(bytes: &[u8], delimiter: u8) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let mut column_counts: Vec<usize> = Vec::new();
    if let Ok(headers) = reader.headers() {
        column_counts.push(headers.len());
    }
    for result in reader.records().take(5) {
        if let Ok(record) = result {
            column_counts.push(record.len());
        }
    }

    let Some(&first_count) = column_counts.first() else {
        return 0;
    };
    let consistent = column_counts.iter().all(|&c| c == first_count);

    match (consistent, first_count > 1) {
        (true, true) => first_count * 10,
        (false, true) => first_count,
        _ => 0,
    }
}
