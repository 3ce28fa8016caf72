//! Selection Context - 文本选区限界上下文
//!
//! 职责:
//! - 选区快照与选区状态
//! - 弹出按钮的几何定位

mod positioning;
mod value_objects;

pub use positioning::{compute_anchor, FloatingAnchor, FloatingRequest, Placement, DEFAULT_OFFSET};
pub use value_objects::{Point, Rect, Selection, SelectionSnapshot, Size};
