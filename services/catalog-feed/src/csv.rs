//!
//! src/csv.rs  Andrew Belles  Oct 3rd, 2025
//!
//! Quote-aware csv decoding into raw records. Titles and band names
//! regularly carry commas so a plain split(',') is not enough
//!

use serde_json::Value;

use crate::mapping::Mapper;
use crate::types::{RawRecord, Track};

/// Splits on commas that sit outside a double-quoted span.
/// A quote only opens a span as the first non-space char of a cell,
/// so `12" Remix` stays a plain cell. Cells are returned untrimmed
/// and still quoted
pub fn split_quoted(line: &str) -> Vec<&str> {
    let mut cells = Vec::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' if quoted => in_quotes = !in_quotes,
            '"' if line[start..i].trim().is_empty() => {
                quoted = true;
                in_quotes = true;
            }
            ',' if !in_quotes => {
                cells.push(&line[start..i]);
                start = i + 1;
                quoted = false;
            }
            _ => {}
        }
    }
    cells.push(&line[start..]);
    cells
}

/// Removes one layer of surrounding quotes, if both ends carry one
fn strip_quotes(cell: &str) -> &str {
    if cell.len() >= 2 && cell.starts_with('"') && cell.ends_with('"') {
        &cell[1..cell.len() - 1]
    } else {
        cell
    }
}

fn header_cell(cell: &str) -> String {
    strip_quotes(cell.trim()).to_string()
}

/// Only quoted cells carry `""` escapes
fn value_cell(cell: &str) -> String {
    let cell = cell.trim();
    let inner = strip_quotes(cell);
    if inner.len() == cell.len() {
        inner.to_string()
    } else {
        inner.replace("\"\"", "\"")
    }
}

/// Header plus rows as raw records, each tagged with its line index
/// (header is line 0). Fewer than two non-blank lines yields nothing
pub fn records(text: &str) -> Vec<(usize, RawRecord)> {
    // lines() handles both \n and \r\n
    let lines: Vec<&str> = text.lines()
        .filter(|l| !l.trim().is_empty())
        .collect();

    let Some((header, rows)) = lines.split_first() else {
        return Vec::new();
    };
    if rows.is_empty() {
        return Vec::new();
    }

    let headers: Vec<String> = split_quoted(header)
        .into_iter()
        .map(header_cell)
        .collect();

    rows.iter()
        .enumerate()
        .map(|(i, line)| {
            let values = split_quoted(line);
            let mut record = RawRecord::new();
            for (col, name) in headers.iter().enumerate() {
                // short rows pad with "", extra cells are ignored
                let value = values.get(col).map(|v| value_cell(v)).unwrap_or_default();
                record.insert(name.clone(), Value::String(value));
            }
            (i + 1, record)
        })
        .collect()
}

/// Decodes csv text and maps every row, keeping only admitted tracks
pub fn decode(text: &str, mapper: &Mapper<'_>) -> Vec<Track> {
    records(text)
        .iter()
        .filter_map(|(index, record)| mapper.map(record, *index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingDefaults;
    use crate::types::IngestStamp;

    fn quote(field: &str) -> String {
        format!("\"{}\"", field.replace('"', "\"\""))
    }

    #[test]
    fn quoted_commas_stay_inside_the_cell() {
        let cells = split_quoted(r#"a,"b, c",d"#);
        assert_eq!(cells, vec!["a", "\"b, c\"", "d"]);
    }

    #[test]
    fn stray_quote_inside_plain_cell_is_literal() {
        let cells = split_quoted(r#"12" Remix,Banda,http://x/a.zip"#);
        assert_eq!(cells, vec!["12\" Remix", "Banda", "http://x/a.zip"]);

        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, IngestStamp::now());
        let text = "title,artist,link\n12\" Remix,Banda,http://x/a.zip\n7\" Single,\"Coral, Ao Vivo\",\n";
        let tracks = decode(text, &mapper);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "12\" Remix");
        assert_eq!(tracks[0].artist, "Banda");
        assert_eq!(tracks[0].download_url, "http://x/a.zip");
        assert_eq!(tracks[1].title, "7\" Single");
        assert_eq!(tracks[1].artist, "Coral, Ao Vivo");
    }

    #[test]
    fn embedded_comma_and_quotes_survive_a_round_trip() {
        let title = "Tua Graça, Me Basta";
        let artist = "Banda \"Ao Vivo\", Coral";
        let text = format!(
            "musica,banda,views\r\n{},{},5\r\n",
            quote(title), quote(artist)
        );

        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, IngestStamp::now());
        let tracks = decode(&text, &mapper);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, title);
        assert_eq!(tracks[0].artist, artist);
        assert_eq!(tracks[0].search_count, 5);
    }

    #[test]
    fn header_only_or_empty_input_yields_nothing() {
        assert!(records("").is_empty());
        assert!(records("musica,banda\n\n   \n").is_empty());
    }

    #[test]
    fn short_rows_pad_and_long_rows_truncate() {
        let rows = records("\"Musica\",Banda,Link\nSo Tu,Fernandinho\nA,B,C,D,E\n");
        assert_eq!(rows.len(), 2);

        let (index, short) = &rows[0];
        assert_eq!(*index, 1);
        assert_eq!(short.get("Musica"), Some(&Value::String("So Tu".into())));
        assert_eq!(short.get("Link"), Some(&Value::String(String::new())));

        let (_, long) = &rows[1];
        assert_eq!(long.len(), 3);
        assert_eq!(long.get("Link"), Some(&Value::String("C".into())));
    }

    #[test]
    fn blank_lines_are_skipped_and_untitled_rows_dropped() {
        let text = "title,artist\n\nOne,A\n,B\n\r\nThree,C\n";
        let defaults = MappingDefaults::default();
        let mapper = Mapper::new(&defaults, IngestStamp::now());
        let titles: Vec<String> = decode(text, &mapper)
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["One", "Three"]);
    }
}
