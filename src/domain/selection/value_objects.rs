//! Selection Context - Value Objects

use serde::{Deserialize, Serialize};

/// 屏幕坐标点（视口坐标系）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 尺寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// 选区第一个 range 的包围盒
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// 顶边中点，作为弹出按钮的参考点
    pub fn top_center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top)
    }
}

/// `selectionchange` 事件发生时的选区快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// 选中的原始文本（未 trim）
    pub text: String,
    /// 第一个 range 的包围盒；没有 range 时为 None
    pub first_range_rect: Option<Rect>,
    /// 事件发生时的视口尺寸
    pub viewport: Size,
}

impl SelectionSnapshot {
    pub fn new(text: impl Into<String>, first_range_rect: Option<Rect>, viewport: Size) -> Self {
        Self {
            text: text.into(),
            first_range_rect,
            viewport,
        }
    }
}

/// 当前文本选区
///
/// 不变量:
/// - `position` 非空当且仅当 `text` 非空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    text: String,
    position: Option<Point>,
    #[serde(default)]
    pub is_loading: bool,
}

impl Selection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由快照计算选区；文本为空或没有 range 时返回空选区
    pub fn from_snapshot(snapshot: &SelectionSnapshot) -> Self {
        let text = snapshot.text.trim();
        match snapshot.first_range_rect {
            Some(rect) if !text.is_empty() => Self {
                text: text.to_string(),
                position: Some(rect.top_center()),
                is_loading: false,
            },
            _ => Self::empty(),
        }
    }

    /// 清空选区（文本被消费或取消选择）
    pub fn clear(&mut self) {
        self.text.clear();
        self.position = None;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Size {
        Size::new(1280.0, 800.0)
    }

    #[test]
    fn test_position_is_top_center_of_rect() {
        let snapshot = SelectionSnapshot::new(
            "  Hello world ",
            Some(Rect::new(100.0, 240.0, 80.0, 18.0)),
            viewport(),
        );
        let selection = Selection::from_snapshot(&snapshot);

        assert_eq!(selection.text(), "Hello world");
        assert_eq!(selection.position(), Some(Point::new(140.0, 240.0)));
    }

    #[test]
    fn test_whitespace_selection_is_empty() {
        let snapshot =
            SelectionSnapshot::new("   ", Some(Rect::new(0.0, 0.0, 5.0, 5.0)), viewport());
        let selection = Selection::from_snapshot(&snapshot);

        assert_eq!(selection.text(), "");
        assert_eq!(selection.position(), None);
    }

    #[test]
    fn test_missing_range_is_empty() {
        let snapshot = SelectionSnapshot::new("text", None, viewport());
        assert!(Selection::from_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn test_clear_keeps_invariant() {
        let snapshot = SelectionSnapshot::new(
            "abc",
            Some(Rect::new(10.0, 10.0, 10.0, 10.0)),
            viewport(),
        );
        let mut selection = Selection::from_snapshot(&snapshot);
        selection.clear();

        assert_eq!(selection.text(), "");
        assert!(selection.position().is_none());
    }
}
