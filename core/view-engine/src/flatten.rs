//! FILENAME: core/view-engine/src/flatten.rs
//! Flattener - walks the group tree into an ordered list of render items.
//!
//! Depth-first, keeping each group's child order as built. A collapsed
//! group emits its own header and nothing below it.

use std::collections::HashSet;
use std::sync::Arc;

use engine::{Row, RowId};

use crate::group::{escape_segment, GroupChildren, GroupNode};

/// One displayable line of the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    GroupHeader {
        /// Path key of the group.
        key: String,
        label: String,
        /// Leaf row count.
        size: usize,
        level: usize,
        collapsed: bool,
        rule_index: usize,
    },
    Row {
        row: Arc<Row>,
        level: usize,
        /// Path key of the owning group; `None` when ungrouped.
        group_key: Option<String>,
    },
}

impl RenderItem {
    pub fn level(&self) -> usize {
        match self {
            RenderItem::GroupHeader { level, .. } | RenderItem::Row { level, .. } => *level,
        }
    }

    pub fn is_row(&self) -> bool {
        matches!(self, RenderItem::Row { .. })
    }

    pub fn row(&self) -> Option<&Arc<Row>> {
        match self {
            RenderItem::Row { row, .. } => Some(row),
            RenderItem::GroupHeader { .. } => None,
        }
    }

    pub fn row_id(&self) -> Option<&RowId> {
        self.row().map(|r| &r.id)
    }

    /// Stable identity for the renderer. Rows include their group path so
    /// the same row under two paths never collides.
    pub fn identity(&self) -> String {
        match self {
            RenderItem::GroupHeader { key, .. } => format!("group:{}", key),
            RenderItem::Row { row, group_key: Some(g), .. } => {
                format!("row:{}:{}", escape_segment(&row.id.to_string()), g)
            }
            RenderItem::Row { row, group_key: None, .. } => format!("row:{}", row.id),
        }
    }
}

/// Flattens the group tree, honoring collapsed path keys.
pub fn flatten_groups(groups: &[GroupNode], collapsed: &HashSet<String>) -> Vec<RenderItem> {
    let mut items = Vec::new();
    flatten_nodes(groups, collapsed, &mut items);
    items
}

/// Recursively flattens nodes with DFS traversal.
fn flatten_nodes(nodes: &[GroupNode], collapsed: &HashSet<String>, items: &mut Vec<RenderItem>) {
    for node in nodes {
        let is_collapsed = collapsed.contains(&node.key);

        items.push(RenderItem::GroupHeader {
            key: node.key.clone(),
            label: node.label.clone(),
            size: node.size,
            level: node.level,
            collapsed: is_collapsed,
            rule_index: node.rule_index,
        });

        if is_collapsed {
            continue;
        }

        match &node.children {
            GroupChildren::Groups(children) => flatten_nodes(children, collapsed, items),
            GroupChildren::Rows(rows) => {
                items.extend(rows.iter().map(|row| RenderItem::Row {
                    row: Arc::clone(row),
                    level: node.level + 1,
                    group_key: Some(node.key.clone()),
                }));
            }
        }
    }
}

/// Render items for an ungrouped view.
pub fn flatten_rows(rows: &[Arc<Row>]) -> Vec<RenderItem> {
    rows.iter()
        .map(|row| RenderItem::Row {
            row: Arc::clone(row),
            level: 0,
            group_key: None,
        })
        .collect()
}
