//! Local CSV source and sink.
//!
//! Reads a sheet export from disk (encoding and delimiter auto-detected) as
//! [`RawRow`]s, and writes flattened output rows back as CSV.

use std::io::Write;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::models::{Cell, RawRow};

/// Rows read from a local file, with detection metadata.
#[derive(Debug, Clone)]
pub struct SourceRows {
    /// All rows, header first.
    pub rows: Vec<RawRow>,
    pub encoding: String,
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using `encoding`, falling back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Pick the delimiter occurring most often in the header line.
///
/// Ties keep the earlier candidate, so comma wins.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Split decoded CSV text into rows. Rows may have different widths. Rows of
/// empty cells are kept so sheet row numbers stay aligned.
pub fn parse_rows(content: &str, delimiter: char) -> SourceResult<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(|field| field.to_string()).collect());
    }

    Ok(rows)
}

/// Read a local CSV file with auto-detection of encoding and delimiter.
pub fn read_csv_rows(path: impl AsRef<Path>) -> SourceResult<SourceRows> {
    let bytes = std::fs::read(path.as_ref())?;
    read_csv_bytes(&bytes)
}

/// Same as [`read_csv_rows`] for in-memory bytes.
pub fn read_csv_bytes(bytes: &[u8]) -> SourceResult<SourceRows> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let rows = parse_rows(&content, delimiter)?;
    if rows.is_empty() {
        return Err(SourceError::EmptyFile);
    }

    Ok(SourceRows {
        rows,
        encoding,
        delimiter,
    })
}

/// Write flattened rows as CSV. Null cells become empty fields.
pub fn write_csv_rows<W: Write>(writer: W, rows: &[Vec<Cell>], delimiter: char) -> SourceResult<()> {
    let mut out = csv::WriterBuilder::new()
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_writer(writer);

    for row in rows {
        out.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1,5;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_parse_rows_flexible_widths() {
        let rows = parse_rows("a;b;c\n1;2\n;;\n4;5;6;7\n", ';').unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["1", "2"]);
        assert_eq!(rows[2], vec!["", "", ""]);
        assert_eq!(rows[3].len(), 4);
    }

    #[test]
    fn test_quoted_decimal_comma() {
        let rows = parse_rows("lat,long\n\"40,1\",\"-73,9\"\n", ',').unwrap();
        assert_eq!(rows[1], vec!["40,1", "-73,9"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_empty_bytes_rejected() {
        assert!(matches!(read_csv_bytes(b""), Err(SourceError::EmptyFile)));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let rows = vec![
            vec![Cell::from("date"), Cell::from("value_1"), Cell::from("lat")],
            vec![Cell::from("2024-01-01"), Cell::Int(1), Cell::Null],
        ];
        let file = std::fs::File::create(&path).unwrap();
        write_csv_rows(file, &rows, ',').unwrap();

        let source = read_csv_rows(&path).unwrap();
        assert_eq!(source.delimiter, ',');
        assert_eq!(source.rows.len(), 2);
        assert_eq!(source.rows[1], vec!["2024-01-01", "1", ""]);
    }
}
