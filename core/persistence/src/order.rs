//! FILENAME: core/persistence/src/order.rs
//! PURPOSE: Column order defaults and repair against the current field set.
//! CONTEXT: A persisted order may predate added or removed fields. Repair
//! keeps it usable without hiding new fields.

use engine::Field;
use rustc_hash::FxHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Fields by declared order index, then name. Unindexed fields go last.
pub fn default_column_order(fields: &[Field]) -> Vec<String> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by(|a, b| {
        (a.order_index.is_none(), a.order_index, &a.name)
            .cmp(&(b.order_index.is_none(), b.order_index, &b.name))
    });
    sorted.into_iter().map(|f| f.name.clone()).collect()
}

/// Drops unknown and duplicate names, then appends fields missing from the
/// persisted order in default order. Applying it twice changes nothing.
pub fn repair_column_order(persisted: &[String], fields: &[Field]) -> Vec<String> {
    let known: HashSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(persisted.len());
    let mut order: Vec<String> = Vec::with_capacity(fields.len());

    for name in persisted {
        if known.contains(name.as_str()) && seen.insert(name.as_str()) {
            order.push(name.clone());
        }
    }

    for name in default_column_order(fields) {
        if !seen.contains(name.as_str()) {
            order.push(name);
        }
    }

    order
}

/// Content fingerprint of a field set. Equal for equal content even when
/// the caller hands over a fresh vector.
pub fn fields_fingerprint(fields: &[Field]) -> u64 {
    let mut hasher = FxHasher::default();
    fields.len().hash(&mut hasher);
    for field in fields {
        field.id.hash(&mut hasher);
        field.name.hash(&mut hasher);
        field.field_type.hash(&mut hasher);
        field.order_index.hash(&mut hasher);
        field.hidden.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::FieldType;

    fn fields() -> Vec<Field> {
        vec![
            Field::new("1", "Zeta", FieldType::Text).with_order(0),
            Field::new("2", "Beta", FieldType::Number),
            Field::new("3", "Alpha", FieldType::Text),
            Field::new("4", "Gamma", FieldType::Text).with_order(1),
        ]
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_order() {
        assert_eq!(default_column_order(&fields()), names(&["Zeta", "Gamma", "Alpha", "Beta"]));
    }

    #[test]
    fn test_repair_drops_unknown_and_appends_missing() {
        let persisted = names(&["Beta", "Removed", "Zeta", "Beta"]);
        let repaired = repair_column_order(&persisted, &fields());
        assert_eq!(repaired, names(&["Beta", "Zeta", "Gamma", "Alpha"]));
    }

    #[test]
    fn test_repair_empty_is_default() {
        assert_eq!(repair_column_order(&[], &fields()), default_column_order(&fields()));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let cases = vec![
            names(&[]),
            names(&["Alpha"]),
            names(&["x", "Gamma", "Gamma", "y", "Zeta"]),
            names(&["Beta", "Alpha", "Gamma", "Zeta"]),
        ];
        for persisted in cases {
            let once = repair_column_order(&persisted, &fields());
            let twice = repair_column_order(&once, &fields());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = fields();
        let b = fields();
        assert_eq!(fields_fingerprint(&a), fields_fingerprint(&b));

        let mut c = fields();
        c.push(Field::new("5", "Delta", FieldType::Date));
        assert_ne!(fields_fingerprint(&a), fields_fingerprint(&c));
    }
}
