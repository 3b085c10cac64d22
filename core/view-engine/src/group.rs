//! FILENAME: core/view-engine/src/group.rs
//! Group builder - turns flat rows into a tree of group nodes.
//!
//! One level of nesting per group rule. Groups keep the order in which their
//! keys are first seen while scanning rows; only the empty bucket may be
//! moved, and only when `empty_last` is set.

use std::sync::Arc;

use engine::{parse_date, CellValue, DateBucket, Field, FieldType, GroupRule, Row};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Joins ancestor segments into a group's path key.
pub const PATH_SEPARATOR: &str = "::";

/// Path segment of the empty bucket. Escaped values never contain `\e`.
pub const EMPTY_SEGMENT: &str = "\\empty";

pub const DEFAULT_EMPTY_LABEL: &str = "(Empty)";

// ============================================================================
// BUCKET KEYS
// ============================================================================

/// Grouping key at one level. Blank cells get their own variant, so no
/// cell text can land in the empty bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    Empty,
    Value(String),
}

impl BucketKey {
    pub fn value(key: impl Into<String>) -> Self {
        BucketKey::Value(key.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BucketKey::Empty)
    }

    pub fn as_value(&self) -> Option<&str> {
        match self {
            BucketKey::Value(v) => Some(v),
            BucketKey::Empty => None,
        }
    }

    /// This key as one segment of a path key.
    pub fn segment(&self) -> String {
        match self {
            BucketKey::Empty => EMPTY_SEGMENT.to_string(),
            BucketKey::Value(v) => escape_segment(v),
        }
    }
}

/// Escapes `\` and `:` so a value can never produce `PATH_SEPARATOR`
/// or `EMPTY_SEGMENT`.
pub fn escape_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ============================================================================
// LABEL MAPS
// ============================================================================

/// Raw key -> display label lookup, per field name.
/// Select option ids and linked record ids resolve through here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMaps {
    maps: FxHashMap<String, FxHashMap<String, String>>,
}

impl LabelMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choice id -> choice name for every select field.
    pub fn from_fields(fields: &[Field]) -> Self {
        let mut maps = LabelMaps::new();
        for field in fields.iter().filter(|f| f.field_type.is_select()) {
            for choice in &field.options.choices {
                maps.insert(&field.name, &choice.id, &choice.name);
            }
        }
        maps
    }

    pub fn insert(&mut self, field: &str, key: &str, label: &str) {
        self.maps
            .entry(field.to_string())
            .or_default()
            .insert(key.to_string(), label.to_string());
    }

    /// Merges resolved labels for one field, overwriting existing keys.
    pub fn merge<I, K, V>(&mut self, field: &str, labels: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = self.maps.entry(field.to_string()).or_default();
        for (k, v) in labels {
            map.insert(k.into(), v.into());
        }
    }

    /// Copies every entry of `other` into this map; `other` wins on conflicts.
    pub fn extend_from(&mut self, other: &LabelMaps) {
        for (field, labels) in &other.maps {
            self.merge(field, labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    pub fn label(&self, field: &str, key: &str) -> Option<&str> {
        self.maps.get(field)?.get(key).map(String::as_str)
    }

    pub fn field_len(&self, field: &str) -> usize {
        self.maps.get(field).map(|m| m.len()).unwrap_or(0)
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOptions {
    /// Label shown for the empty bucket.
    pub empty_label: String,
    /// Force the empty bucket to the end of its level.
    pub empty_last: bool,
    pub label_maps: LabelMaps,
}

impl Default for GroupOptions {
    fn default() -> Self {
        GroupOptions {
            empty_label: DEFAULT_EMPTY_LABEL.to_string(),
            empty_last: true,
            label_maps: LabelMaps::default(),
        }
    }
}

// ============================================================================
// GROUP NODE
// ============================================================================

/// Children of a group node: rows at the leaf level, groups above it.
#[derive(Debug, Clone)]
pub enum GroupChildren {
    Rows(Vec<Arc<Row>>),
    Groups(Vec<GroupNode>),
}

/// A node of the group tree.
#[derive(Debug, Clone)]
pub struct GroupNode {
    /// Path key: escaped segments from the root down, joined by `PATH_SEPARATOR`.
    pub key: String,

    /// Escaped segments from the root down to this node.
    pub path: SmallVec<[String; 4]>,

    /// Raw key at this level.
    pub value_key: BucketKey,

    /// Display label.
    pub label: String,

    /// Number of leaf rows under this node.
    pub size: usize,

    /// Nesting level (0 = top).
    pub level: usize,

    /// Index of the rule in the caller's rule list.
    pub rule_index: usize,

    pub children: GroupChildren,
}

impl GroupNode {
    pub fn is_empty_bucket(&self) -> bool {
        self.value_key.is_empty()
    }

    /// All leaf rows under this node, in tree order.
    pub fn leaf_rows(&self) -> Vec<&Arc<Row>> {
        let mut out = Vec::with_capacity(self.size);
        self.collect_rows(&mut out);
        out
    }

    fn collect_rows<'a>(&'a self, out: &mut Vec<&'a Arc<Row>>) {
        match &self.children {
            GroupChildren::Rows(rows) => out.extend(rows.iter()),
            GroupChildren::Groups(groups) => {
                for g in groups {
                    g.collect_rows(out);
                }
            }
        }
    }

    /// Finds a descendant (or self) by path key.
    pub fn find(&self, key: &str) -> Option<&GroupNode> {
        if self.key == key {
            return Some(self);
        }
        match &self.children {
            GroupChildren::Groups(groups) => groups.iter().find_map(|g| g.find(key)),
            GroupChildren::Rows(_) => None,
        }
    }
}

/// Every path key in the tree, depth-first. Used by collapse-all.
pub fn all_group_keys(groups: &[GroupNode]) -> Vec<String> {
    let mut keys = Vec::new();
    fn walk(nodes: &[GroupNode], keys: &mut Vec<String>) {
        for node in nodes {
            keys.push(node.key.clone());
            if let GroupChildren::Groups(children) = &node.children {
                walk(children, keys);
            }
        }
    }
    walk(groups, &mut keys);
    keys
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builds the group tree. Returns an empty list when no rule is usable,
/// in which case callers render rows ungrouped.
pub fn build_groups(
    rows: &[Arc<Row>],
    fields: &[Field],
    rules: &[GroupRule],
    options: &GroupOptions,
) -> Vec<GroupNode> {
    // Malformed rules are skipped, not fatal.
    let active: Vec<(usize, &GroupRule)> = rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.is_valid())
        .collect();

    if active.is_empty() {
        return Vec::new();
    }

    let builder = GroupBuilder {
        fields,
        rules: &active,
        options,
    };
    builder.build_level(rows.to_vec(), 0, &[])
}

struct GroupBuilder<'a> {
    fields: &'a [Field],
    rules: &'a [(usize, &'a GroupRule)],
    options: &'a GroupOptions,
}

/// Rows collected under one key while scanning.
struct Bucket {
    key: BucketKey,
    label: String,
    rows: Vec<Arc<Row>>,
}

impl<'a> GroupBuilder<'a> {
    fn field(&self, name: &str) -> Option<&'a Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Recursively builds one level of the tree.
    fn build_level(
        &self,
        rows: Vec<Arc<Row>>,
        depth: usize,
        parent_path: &[String],
    ) -> Vec<GroupNode> {
        let (rule_index, rule) = self.rules[depth];
        let field = self.field(rule.field_name());

        let mut buckets: Vec<Bucket> = Vec::new();
        let mut positions: FxHashMap<BucketKey, usize> = FxHashMap::default();

        for row in rows {
            let (key, label) = self.extract_key(&row, rule, field);
            match positions.get(&key) {
                Some(&idx) => buckets[idx].rows.push(row),
                None => {
                    positions.insert(key.clone(), buckets.len());
                    buckets.push(Bucket {
                        key,
                        label,
                        rows: vec![row],
                    });
                }
            }
        }

        if self.options.empty_last {
            if let Some(idx) = positions.get(&BucketKey::Empty) {
                let empty = buckets.remove(*idx);
                buckets.push(empty);
            }
        }

        let is_leaf_level = depth + 1 >= self.rules.len();

        buckets
            .into_iter()
            .map(|bucket| {
                let mut path: SmallVec<[String; 4]> = parent_path.iter().cloned().collect();
                path.push(bucket.key.segment());
                let key = path.join(PATH_SEPARATOR);
                let size = bucket.rows.len();

                let children = if is_leaf_level {
                    GroupChildren::Rows(bucket.rows)
                } else {
                    GroupChildren::Groups(self.build_level(bucket.rows, depth + 1, &path))
                };

                GroupNode {
                    key,
                    path,
                    value_key: bucket.key,
                    label: bucket.label,
                    size,
                    level: depth,
                    rule_index,
                    children,
                }
            })
            .collect()
    }

    /// Grouping key and label of a row under a rule.
    /// Unresolvable values land in the empty bucket.
    fn extract_key(&self, row: &Row, rule: &GroupRule, field: Option<&Field>) -> (BucketKey, String) {
        let value = row.get(rule.field_name()).first();
        if value.is_blank() {
            return self.empty();
        }

        match rule {
            GroupRule::Field { field: name } => {
                let key = match value {
                    CellValue::Record(_) => match value.record_key() {
                        Some(k) => k,
                        None => return self.empty(),
                    },
                    other => other.plain_text(),
                };
                let label = self.resolve_label(name, &key, value, field);
                (BucketKey::Value(key), label)
            }
            GroupRule::Date { bucket, .. } => {
                let parsed = value.as_str().and_then(parse_date);
                match parsed {
                    Some(dt) => match bucket {
                        DateBucket::Year => {
                            let key = dt.format("%Y").to_string();
                            (BucketKey::Value(key.clone()), key)
                        }
                        DateBucket::Month => (
                            BucketKey::Value(dt.format("%Y-%m").to_string()),
                            dt.format("%B %Y").to_string(),
                        ),
                    },
                    None => self.empty(),
                }
            }
        }
    }

    fn resolve_label(&self, field_name: &str, key: &str, value: &CellValue, field: Option<&Field>) -> String {
        if let Some(label) = self.options.label_maps.label(field_name, key) {
            return label.to_string();
        }
        match field {
            // Links stay on their raw id until labels are resolved.
            Some(f) if f.field_type != FieldType::Link => {
                let text = f.display_text(value);
                if text.is_empty() { key.to_string() } else { text }
            }
            _ => key.to_string(),
        }
    }

    fn empty(&self) -> (BucketKey, String) {
        (BucketKey::Empty, self.options.empty_label.clone())
    }
}
