//! FILENAME: app/src/clipboard.rs
// PURPOSE: Tab-separated clipboard text for copy and paste.
// CONTEXT: Copy uses display text, so select ids come out as option names
// and paste can resolve them back through input coercion.

use std::ops::Range;
use std::sync::Arc;

use engine::{Field, Row};

/// A rectangular selection in displayed coordinates: row indices into the
/// visible rows, column indices into the visible fields. Both exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub rows: Range<usize>,
    pub columns: Range<usize>,
}

impl CellRange {
    pub fn new(rows: Range<usize>, columns: Range<usize>) -> Self {
        CellRange { rows, columns }
    }

    pub fn single(row: usize, column: usize) -> Self {
        CellRange {
            rows: row..row + 1,
            columns: column..column + 1,
        }
    }
}

/// Tabs and line breaks inside a value would split the cell on paste.
pub fn sanitize_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

pub fn to_tsv(cells: &[Vec<String>]) -> String {
    cells
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| sanitize_cell(c))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits clipboard text into rows of cells. `\r\n` line endings are
/// accepted and a single trailing line break is ignored.
pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    if lines.len() > 1 && lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }

    lines
        .into_iter()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Display text of the selected cells as TSV. The range is clipped to the
/// available rows and fields.
pub fn copy_range(rows: &[Arc<Row>], fields: &[Field], range: &CellRange) -> String {
    let row_end = range.rows.end.min(rows.len());
    let col_end = range.columns.end.min(fields.len());
    if range.rows.start >= row_end || range.columns.start >= col_end {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows[range.rows.start..row_end]
        .iter()
        .map(|row| {
            fields[range.columns.start..col_end]
                .iter()
                .map(|field| field.display_text(row.get(&field.name)))
                .collect()
        })
        .collect();

    to_tsv(&cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{FieldType, SelectChoice};

    #[test]
    fn test_parse_tsv() {
        assert!(parse_tsv("").is_empty());
        assert_eq!(parse_tsv("a"), vec![vec!["a"]]);
        assert_eq!(parse_tsv("a\tb\r\nc\td\r\n"), vec![vec!["a", "b"], vec!["c", "d"]]);
        // Only one trailing break is dropped; blank cells survive.
        assert_eq!(parse_tsv("a\t\n\n"), vec![vec!["a", ""], vec![""]]);
    }

    #[test]
    fn test_to_tsv_sanitizes() {
        let cells = vec![vec!["a\tb".to_string(), "line1\nline2".to_string()]];
        assert_eq!(to_tsv(&cells), "a b\tline1 line2");
    }

    #[test]
    fn test_copy_range_uses_display_text() {
        let fields = vec![
            Field::new("1", "Name", FieldType::Text),
            Field::new("2", "Status", FieldType::SingleSelect)
                .with_choices(vec![SelectChoice::new("s1", "Open")]),
            Field::new("3", "Done", FieldType::Checkbox),
        ];
        let rows = vec![
            Arc::new(Row::new(1).with("Name", "Alpha").with("Status", "s1").with("Done", true)),
            Arc::new(Row::new(2).with("Name", "Beta")),
        ];

        let text = copy_range(&rows, &fields, &CellRange::new(0..5, 0..3));
        assert_eq!(text, "Alpha\tOpen\tchecked\nBeta\t\t");

        assert_eq!(copy_range(&rows, &fields, &CellRange::single(1, 0)), "Beta");
        assert_eq!(copy_range(&rows, &fields, &CellRange::new(4..6, 0..1)), "");
    }
}
