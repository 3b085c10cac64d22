//! FILENAME: core/view-engine/src/filter.rs
//! Search stage - client-side text search over the visible fields.

use std::sync::Arc;

use engine::{Field, Row};

/// Fields shown by the grid, in column order. Hidden fields are skipped;
/// fields missing from `column_order` follow in their given order.
pub fn visible_fields(fields: &[Field], column_order: &[String]) -> Vec<Field> {
    let mut out: Vec<Field> = column_order
        .iter()
        .filter_map(|name| fields.iter().find(|f| &f.name == name))
        .filter(|f| !f.hidden)
        .cloned()
        .collect();

    for field in fields.iter().filter(|f| !f.hidden) {
        if !out.iter().any(|f| f.name == field.name) {
            out.push(field.clone());
        }
    }
    out
}

/// Keeps rows where any visible field's display text contains `query`,
/// ignoring case. A blank query keeps everything. Input order is preserved.
pub fn filter_rows(rows: &[Arc<Row>], fields: &[Field], query: &str) -> Vec<Arc<Row>> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows.to_vec();
    }

    rows.iter()
        .filter(|row| row_matches(row, fields, &needle))
        .cloned()
        .collect()
}

fn row_matches(row: &Row, fields: &[Field], needle: &str) -> bool {
    fields.iter().any(|field| {
        let value = row.get(&field.name);
        !value.is_blank() && field.display_text(value).to_lowercase().contains(needle)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{FieldType, SelectChoice};

    fn fields() -> Vec<Field> {
        vec![
            Field::new("f1", "Name", FieldType::Text),
            Field::new("f2", "Status", FieldType::SingleSelect)
                .with_choices(vec![SelectChoice::new("s1", "In Progress")]),
            {
                let mut secret = Field::new("f3", "Notes", FieldType::LongText);
                secret.hidden = true;
                secret
            },
        ]
    }

    fn rows() -> Vec<Arc<Row>> {
        vec![
            Arc::new(Row::new(1).with("Name", "Alice").with("Notes", "zebra")),
            Arc::new(Row::new(2).with("Name", "Bob").with("Status", "s1")),
            Arc::new(Row::new(3).with("Name", "alicia")),
        ]
    }

    #[test]
    fn test_blank_query_keeps_all() {
        let visible = visible_fields(&fields(), &[]);
        assert_eq!(filter_rows(&rows(), &visible, "   ").len(), 3);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let visible = visible_fields(&fields(), &[]);
        let hits = filter_rows(&rows(), &visible, "ALI");
        let ids: Vec<String> = hits.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_matches_display_text_not_raw_key() {
        let visible = visible_fields(&fields(), &[]);
        assert_eq!(filter_rows(&rows(), &visible, "progress").len(), 1);
        assert!(filter_rows(&rows(), &visible, "s1").is_empty());
    }

    #[test]
    fn test_hidden_fields_not_searched() {
        let visible = visible_fields(&fields(), &[]);
        assert!(filter_rows(&rows(), &visible, "zebra").is_empty());
    }

    #[test]
    fn test_filtered_rows_are_subset_in_order() {
        let all = rows();
        let visible = visible_fields(&fields(), &[]);
        let hits = filter_rows(&all, &visible, "b");
        assert!(hits.iter().all(|h| all.iter().any(|r| Arc::ptr_eq(r, h))));
    }

    #[test]
    fn test_visible_fields_follow_column_order() {
        let order = vec!["Status".to_string(), "Gone".to_string()];
        let visible = visible_fields(&fields(), &order);
        let names: Vec<&str> = visible.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Status", "Name"]);
    }
}
