//! 视口归一化：把 CAD 的 Y 轴向上坐标映射到 SVG 的 Y 轴向下画布。

use cadthumb_core::geometry::{Bounds2D, Point2, Transform2, Vector2};
use cadthumb_core::units::Unit;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSettings {
    /// 每侧留白占较长边的比例。
    pub margin_percent: f64,
    pub min_dimension: f64,
    pub max_dimension: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            margin_percent: 0.1,
            min_dimension: 100.0,
            max_dimension: 4096.0,
        }
    }
}

/// 输出画布及其与图纸坐标的对应关系。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// 留白后范围的最小角（图纸单位）。
    pub origin_x: f64,
    pub origin_y: f64,
    /// 画布尺寸（输出单位）。
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    #[serde(skip)]
    pub transform: Transform2,
    /// 未留白的原始包围盒，写入元数据。
    #[serde(skip)]
    pub bounds: Bounds2D,
    pub unit: Unit,
}

impl Viewport {
    /// 图纸坐标 → 画布坐标。
    #[inline]
    pub fn project(&self, point: Point2) -> Point2 {
        self.transform.apply(point)
    }
}

pub fn normalize(bounds: &Bounds2D, unit: Unit, settings: &ViewportSettings) -> Viewport {
    let raw_width = bounds.width();
    let raw_height = bounds.height();
    let margin = raw_width.max(raw_height) * settings.margin_percent;

    let mut padded_width = raw_width + 2.0 * margin;
    let mut padded_height = raw_height + 2.0 * margin;
    if padded_width <= 0.0 {
        padded_width = settings.min_dimension;
    }
    if padded_height <= 0.0 {
        padded_height = settings.min_dimension;
    }

    let larger = padded_width.max(padded_height);
    let scale = if larger > settings.max_dimension {
        settings.max_dimension / larger
    } else if larger < settings.min_dimension {
        settings.min_dimension / larger
    } else {
        1.0
    };

    let center = if bounds.is_empty() {
        Point2::new(0.0, 0.0)
    } else {
        bounds.center()
    };
    let width = padded_width * scale;
    let height = padded_height * scale;

    // 先移到原点，再翻转 Y 轴并缩放，最后移到画布中心
    let transform = Transform2::translation(Vector2::new(width / 2.0, height / 2.0))
        .compose(Transform2::scale(scale, -scale))
        .compose(Transform2::translation(Vector2::new(-center.x(), -center.y())));

    Viewport {
        origin_x: center.x() - padded_width / 2.0,
        origin_y: center.y() - padded_height / 2.0,
        width,
        height,
        scale,
        transform,
        bounds: *bounds,
        unit,
    }
}
