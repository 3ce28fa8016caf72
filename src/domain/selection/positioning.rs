//! 浮动按钮定位
//!
//! 纯几何计算：给定选区顶边中点，计算弹出按钮的固定定位坐标。
//! 默认放在参考点上方并水平居中；上方放不下时翻转到下方（flip），
//! 水平方向夹紧在视口内（shift）。

use serde::{Deserialize, Serialize};

use super::{Point, Size};

/// 参考点与浮层之间的默认间距（像素）
pub const DEFAULT_OFFSET: f64 = 10.0;

/// 浮层相对参考点的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Top,
    Bottom,
}

/// 定位请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatingRequest {
    /// 参考点（选区顶边中点）
    pub reference: Point,
    /// 浮层尺寸
    pub floating: Size,
    /// 视口尺寸
    pub viewport: Size,
    /// 参考点与浮层的间距
    pub offset: f64,
    /// shift 时与视口边缘保留的最小距离
    pub padding: f64,
}

impl FloatingRequest {
    pub fn new(reference: Point, floating: Size, viewport: Size) -> Self {
        Self {
            reference,
            floating,
            viewport,
            offset: DEFAULT_OFFSET,
            padding: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding;
        self
    }
}

/// 计算结果：浮层左上角的固定定位坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatingAnchor {
    pub x: f64,
    pub y: f64,
    pub placement: Placement,
}

/// 计算浮层锚点
pub fn compute_anchor(request: &FloatingRequest) -> FloatingAnchor {
    let placement = choose_placement(request);

    let y = match placement {
        Placement::Top => request.reference.y - request.offset - request.floating.height,
        Placement::Bottom => request.reference.y + request.offset,
    };

    let centered_x = request.reference.x - request.floating.width / 2.0;

    FloatingAnchor {
        x: shift_x(centered_x, request),
        y,
        placement,
    }
}

/// flip：首选 Top；Top 溢出时选择溢出更少的一侧（best fit）
fn choose_placement(request: &FloatingRequest) -> Placement {
    let top_overflow = overflow(Placement::Top, request);
    if top_overflow <= 0.0 {
        return Placement::Top;
    }

    let bottom_overflow = overflow(Placement::Bottom, request);
    if bottom_overflow < top_overflow {
        Placement::Bottom
    } else {
        Placement::Top
    }
}

/// 主轴方向超出视口的像素数
fn overflow(placement: Placement, request: &FloatingRequest) -> f64 {
    match placement {
        Placement::Top => {
            let top = request.reference.y - request.offset - request.floating.height;
            (-top).max(0.0)
        }
        Placement::Bottom => {
            let bottom = request.reference.y + request.offset + request.floating.height;
            (bottom - request.viewport.height).max(0.0)
        }
    }
}

/// shift：把 x 夹紧到 [padding, viewport.width - floating.width - padding]
fn shift_x(x: f64, request: &FloatingRequest) -> f64 {
    let min = request.padding;
    let max = request.viewport.width - request.floating.width - request.padding;
    if max < min {
        return min;
    }
    x.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(x: f64, y: f64) -> FloatingRequest {
        FloatingRequest::new(
            Point::new(x, y),
            Size::new(120.0, 32.0),
            Size::new(1000.0, 700.0),
        )
    }

    #[test]
    fn test_centered_above_reference() {
        let anchor = compute_anchor(&request(500.0, 300.0));
        assert_eq!(anchor.placement, Placement::Top);
        assert_eq!(anchor.x, 440.0);
        assert_eq!(anchor.y, 300.0 - 10.0 - 32.0);
    }

    #[test]
    fn test_flips_below_near_top_edge() {
        let anchor = compute_anchor(&request(500.0, 20.0));
        assert_eq!(anchor.placement, Placement::Bottom);
        assert_eq!(anchor.y, 30.0);
    }

    #[test]
    fn test_keeps_top_when_bottom_is_worse() {
        // 视口很矮，两侧都放不下；上方溢出更少
        let req = FloatingRequest::new(
            Point::new(100.0, 30.0),
            Size::new(40.0, 30.0),
            Size::new(400.0, 60.0),
        );
        let anchor = compute_anchor(&req);
        assert_eq!(anchor.placement, Placement::Top);
    }

    #[test]
    fn test_shift_clamps_left_and_right() {
        let anchor = compute_anchor(&request(10.0, 300.0));
        assert_eq!(anchor.x, 0.0);

        let anchor = compute_anchor(&request(995.0, 300.0).with_padding(8.0));
        assert_eq!(anchor.x, 1000.0 - 120.0 - 8.0);
    }

    #[test]
    fn test_wider_than_viewport_pins_to_padding() {
        let req = FloatingRequest::new(
            Point::new(50.0, 300.0),
            Size::new(500.0, 32.0),
            Size::new(300.0, 700.0),
        )
        .with_padding(4.0);
        assert_eq!(compute_anchor(&req).x, 4.0);
    }

    #[test]
    fn test_custom_offset() {
        let anchor = compute_anchor(&request(500.0, 300.0).with_offset(0.0));
        assert_eq!(anchor.y, 268.0);
    }
}
