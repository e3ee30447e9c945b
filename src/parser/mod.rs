//! Delimited-text reader with encoding and delimiter auto-detection.
//!
//! Produces a [`RawTable`]: ordered rows over an untrusted, variable set of
//! named columns. No grant-specific logic here; column semantics are the
//! normalization pipeline's job.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{SourceError, SourceResult};

/// An ordered sequence of raw rows with no schema guarantees.
///
/// Headers keep their original casing and spacing; cell values are trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column headers in file order, as they appeared in the source.
    pub headers: Vec<String>,
    /// One map per row, keyed by the raw header text.
    pub rows: Vec<BTreeMap<String, String>>,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected delimiter.
    pub delimiter: char,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Detect the encoding of raw bytes using chardet, normalized to the labels
/// `encoding_rs` understands.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _lang) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the detected encoding, falling back to
/// lossy UTF-8 for anything unrecognized.
pub fn decode_content(bytes: &[u8], encoding: &str) -> SourceResult<String> {
    let decoded = match encoding_rs::Encoding::for_label(encoding.as_bytes()) {
        Some(enc) => enc.decode(bytes).0.into_owned(),
        None => String::from_utf8_lossy(bytes).into_owned(),
    };
    // NUL bytes mean this was never delimited text to begin with.
    if decoded.contains('\0') {
        return Err(SourceError::Encoding(format!(
            "binary content cannot be decoded as {}",
            encoding
        )));
    }
    Ok(decoded)
}

/// Detect the delimiter by counting candidate occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read a tabular file with auto-detection of encoding and delimiter.
pub fn read_file<P: AsRef<Path>>(path: P) -> SourceResult<RawTable> {
    let bytes = std::fs::read(path.as_ref())?;
    read_bytes(&bytes)
}

/// Read tabular bytes (e.g. an in-memory upload) with auto-detection.
pub fn read_bytes(bytes: &[u8]) -> SourceResult<RawTable> {
    if bytes.is_empty() {
        return Err(SourceError::EmptyInput);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    read_str(&content, delimiter, encoding)
}

/// Read decoded tabular text with an explicit delimiter.
pub fn read_str(content: &str, delimiter: char, encoding: String) -> SourceResult<RawTable> {
    if content.trim().is_empty() {
        return Err(SourceError::EmptyInput);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("").trim().to_string();
            row.insert(header.clone(), value);
        }
        // Blank lines come back as single empty fields; keep them out here,
        // the pipeline drops all-empty rows with real cells itself.
        if row.values().all(|v| v.is_empty()) && record.len() <= 1 {
            continue;
        }
        rows.push(row);
    }

    Ok(RawTable {
        headers,
        rows,
        encoding,
        delimiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table() {
        let csv = "name,age\nAlice,30\nBob,25";
        let table = read_bytes(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["name"], "Alice");
        assert_eq!(table.rows[0]["age"], "30");
        assert_eq!(table.rows[1]["name"], "Bob");
    }

    #[test]
    fn test_detect_delimiter_variants() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_quoted_values_with_embedded_delimiter() {
        let csv = "name,notes\nAlice,\"one, two\"";
        let table = read_str(csv, ',', "utf-8".to_string()).unwrap();
        assert_eq!(table.rows[0]["notes"], "one, two");
    }

    #[test]
    fn test_missing_trailing_cells_become_empty() {
        let csv = "a,b,c\n1,2";
        let table = read_str(csv, ',', "utf-8".to_string()).unwrap();
        assert_eq!(table.rows[0]["a"], "1");
        assert_eq!(table.rows[0]["c"], "");
    }

    #[test]
    fn test_empty_input_is_fatal() {
        assert!(matches!(
            read_bytes(b""),
            Err(SourceError::EmptyInput)
        ));
        assert!(matches!(
            read_str("   \n  ", ',', "utf-8".to_string()),
            Err(SourceError::EmptyInput)
        ));
    }

    #[test]
    fn test_binary_input_is_fatal() {
        let bytes = [0x47u8, 0x00, 0x01, 0x02, 0x00, 0xFF];
        assert!(read_bytes(&bytes).is_err());
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_headers_preserve_raw_casing() {
        let csv = "Grant Req Date,Amount\n01/05/2024,500";
        let table = read_str(csv, ',', "utf-8".to_string()).unwrap();
        assert_eq!(table.headers, vec!["Grant Req Date", "Amount"]);
        assert_eq!(table.rows[0]["Grant Req Date"], "01/05/2024");
    }
}
