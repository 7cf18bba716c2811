use cadthumb_core::document::Document;
use cadthumb_core::geometry::Bounds2D;
use cadthumb_core::units::Unit;
use tracing::debug;

use crate::extract::Extractor;

/// 没有任何实体贡献点时使用的默认范围。
pub const DEFAULT_EXTENT: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub max_block_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_block_depth: 16 }
    }
}

/// 包围盒与单位的解析结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub bounds: Bounds2D,
    pub unit: Unit,
    /// 实际贡献了点的实体数量。
    pub contributed: usize,
}

impl Resolved {
    /// 是否落到了默认范围。
    pub fn is_default(&self) -> bool {
        self.contributed == 0
    }
}

/// 按实体顺序遍历一次，累计包围盒并解析图纸单位。
pub fn resolve(document: &Document, options: &ResolveOptions) -> Resolved {
    let extractor = Extractor::new(document, options.max_block_depth);
    let mut bounds = Bounds2D::empty();
    let mut contributed = 0;

    for entity in document.entities() {
        let mut touched = false;
        for point in extractor.points_of(entity) {
            bounds.include_point(point);
            touched = true;
        }
        if touched {
            contributed += 1;
        }
    }

    if contributed == 0 {
        debug!("没有实体贡献坐标，使用默认范围");
        bounds = Bounds2D::from_extents(0.0, 0.0, DEFAULT_EXTENT, DEFAULT_EXTENT);
    }

    let unit = Unit::from_code(document.header().insertion_units());
    debug!(
        min_x = bounds.min().x(),
        min_y = bounds.min().y(),
        max_x = bounds.max().x(),
        max_y = bounds.max().y(),
        unit = unit.symbol(),
        contributed,
        "包围盒解析完成"
    );

    Resolved {
        bounds,
        unit,
        contributed,
    }
}
