//! FILENAME: core/view-engine/src/lib.rs
//! Grid view pipeline for the table front end.
//!
//! Every stage is a pure function over the previous stage's output. The
//! crate depends on `engine` only for the data model (Row, Field, rules).
//!
//! Layers:
//! - `filter`: Client-side text search over visible fields
//! - `group`: Builds the group tree from flat rows and group rules
//! - `flatten`: Walks the tree with collapse state into render items
//! - `window`: Computes the visible slice for virtual scrolling

pub mod filter;
pub mod flatten;
pub mod group;
pub mod window;

pub use filter::{filter_rows, visible_fields};
pub use flatten::{flatten_groups, flatten_rows, RenderItem};
pub use group::{
    all_group_keys, build_groups, escape_segment, BucketKey, GroupChildren, GroupNode, GroupOptions,
    LabelMaps, DEFAULT_EMPTY_LABEL, EMPTY_SEGMENT, PATH_SEPARATOR,
};
pub use window::{
    compute_column_window, compute_window, ColumnWindow, HeightModel, VirtualWindow,
    WindowConfig, DEFAULT_GROUP_HEADER_HEIGHT,
};
