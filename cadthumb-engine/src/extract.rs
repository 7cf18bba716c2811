//! 实体取点：为包围盒计算提供每个实体的近似点集。

use std::iter;

use cadthumb_core::document::{Document, Entity, Insert};
use cadthumb_core::geometry::{Bounds2D, Point2, ccw_sweep_degrees};
use tracing::{info, warn};

use crate::errors::ExtractionError;

/// 圆周采样表：0° 起每 30° 一点，轴向四点取精确值。
static RING: [(f64, f64); 12] = [
    (1.0, 0.0),
    (0.866_025_403_784_438_6, 0.5),
    (0.5, 0.866_025_403_784_438_6),
    (0.0, 1.0),
    (-0.5, 0.866_025_403_784_438_6),
    (-0.866_025_403_784_438_6, 0.5),
    (-1.0, 0.0),
    (-0.866_025_403_784_438_6, -0.5),
    (-0.5, -0.866_025_403_784_438_6),
    (0.0, -1.0),
    (0.5, -0.866_025_403_784_438_6),
    (0.866_025_403_784_438_6, -0.5),
];

/// 圆弧每隔多少图纸单位采一个点。
pub const ARC_SAMPLE_SPACING: f64 = 5.0;
const MIN_ARC_SAMPLES: usize = 4;
const MAX_ARC_SAMPLES: usize = 1024;
/// 文字宽度估算：字符数 × 字高 × 0.6。
pub const TEXT_WIDTH_FACTOR: f64 = 0.6;
pub const LINE_SPACING_FACTOR: f64 = 1.5;

pub type PointIter<'e> = Box<dyn Iterator<Item = Point2> + 'e>;

/// 取点器持有文档以解析块参照。
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    document: &'a Document,
    max_block_depth: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(document: &'a Document, max_block_depth: usize) -> Self {
        Self {
            document,
            max_block_depth,
        }
    }

    /// 永不失败：错误降级为一条警告并返回空序列。
    pub fn points_of<'e>(&self, entity: &'e Entity) -> PointIter<'e>
    where
        'a: 'e,
    {
        match self.try_points(entity) {
            Ok(points) => points,
            Err(err) => {
                warn!(
                    kind = entity.dxf_type(),
                    layer = entity.layer_name(),
                    error = %err,
                    "实体取点失败，已从包围盒中排除"
                );
                Box::new(iter::empty())
            }
        }
    }

    pub fn try_points<'e>(&self, entity: &'e Entity) -> Result<PointIter<'e>, ExtractionError>
    where
        'a: 'e,
    {
        self.points_at_depth(entity, 0)
    }

    fn points_at_depth<'e>(
        &self,
        entity: &'e Entity,
        depth: usize,
    ) -> Result<PointIter<'e>, ExtractionError>
    where
        'a: 'e,
    {
        ensure_finite(entity)?;
        let points: PointIter<'e> = match entity {
            Entity::Line(line) => Box::new([line.start, line.end].into_iter()),
            Entity::Circle(circle) => {
                let center = circle.center;
                let radius = circle.radius;
                Box::new(
                    RING.iter()
                        .map(move |&(cos, sin)| Point2::new(center.x() + radius * cos, center.y() + radius * sin)),
                )
            }
            Entity::Arc(arc) => {
                let center = arc.center;
                let radius = arc.radius;
                let start = arc.start_angle;
                let sweep = ccw_sweep_degrees(arc.start_angle, arc.end_angle);
                let samples = arc_sample_count(radius, sweep);
                Box::new((0..=samples).map(move |i| {
                    let angle = (start + sweep * i as f64 / samples as f64).to_radians();
                    Point2::new(
                        center.x() + radius * angle.cos(),
                        center.y() + radius * angle.sin(),
                    )
                }))
            }
            Entity::Polyline(polyline) => {
                Box::new(polyline.vertices.iter().map(|vertex| vertex.position))
            }
            Entity::Text(text) => {
                let width = text.content.chars().count() as f64 * text.height * TEXT_WIDTH_FACTOR;
                let corners = text_corners(text.insert, width, text.height);
                Box::new(corners.into_iter())
            }
            Entity::MText(mtext) => {
                let longest = mtext
                    .lines()
                    .map(|line| line.chars().count())
                    .max()
                    .unwrap_or(0);
                let line_count = mtext.lines().count() as f64;
                let width = longest as f64 * mtext.height * TEXT_WIDTH_FACTOR;
                let height = line_count * mtext.height * LINE_SPACING_FACTOR;
                // 多行文字自插入点向下堆叠
                let corners = text_corners(mtext.insert, width, -height);
                Box::new(corners.into_iter())
            }
            Entity::Insert(insert) => Box::new(self.insert_corners(insert, depth)?.into_iter()),
            Entity::Hatch(hatch) => Box::new(
                hatch
                    .loops
                    .iter()
                    .flat_map(|ring| ring.vertices.iter().copied()),
            ),
            Entity::Dimension(dimension) => Box::new(
                dimension
                    .definition_points()
                    .chain(dimension.text_midpoint),
            ),
            Entity::Unsupported(other) => {
                info!(kind = %other.kind, layer = %other.layer, "不支持的实体类型，跳过");
                Box::new(iter::empty())
            }
        };
        Ok(points)
    }

    /// 块参照：递归收集块内点，依次施加基点偏移、缩放与平移（忽略旋转），返回变换后的四角。
    fn insert_corners(&self, insert: &Insert, depth: usize) -> Result<Vec<Point2>, ExtractionError> {
        if depth >= self.max_block_depth {
            return Err(ExtractionError::DepthExceeded {
                name: insert.name.clone(),
                limit: self.max_block_depth,
            });
        }
        let block = self
            .document
            .block(&insert.name)
            .ok_or_else(|| ExtractionError::MissingBlock(insert.name.clone()))?;

        let base = block.base_point;
        let mut bounds = Bounds2D::empty();
        for entity in &block.entities {
            for point in self.points_at_depth(entity, depth + 1)? {
                let local = point.as_vec2() - base.as_vec2();
                let scaled = local * insert.scale.as_vec2();
                bounds.include_point(Point2::from_vec(scaled + insert.insert.as_vec2()));
            }
        }

        if bounds.is_empty() {
            return Ok(vec![insert.insert]);
        }
        Ok(bounds.corners().to_vec())
    }
}

/// 采样数与弧长成正比，至少 4 段；返回值为段数，点数为段数 + 1。
fn arc_sample_count(radius: f64, sweep_degrees: f64) -> usize {
    let length = radius.abs() * sweep_degrees.to_radians();
    let by_length = (length / ARC_SAMPLE_SPACING).floor();
    if by_length.is_finite() && by_length > MIN_ARC_SAMPLES as f64 {
        (by_length as usize).min(MAX_ARC_SAMPLES)
    } else {
        MIN_ARC_SAMPLES
    }
}

fn text_corners(insert: Point2, width: f64, height: f64) -> [Point2; 4] {
    [
        insert,
        Point2::new(insert.x() + width, insert.y()),
        Point2::new(insert.x() + width, insert.y() + height),
        Point2::new(insert.x(), insert.y() + height),
    ]
}

fn ensure_finite(entity: &Entity) -> Result<(), ExtractionError> {
    let finite = match entity {
        Entity::Line(line) => line.start.is_finite() && line.end.is_finite(),
        Entity::Circle(circle) => circle.center.is_finite() && circle.radius.is_finite(),
        Entity::Arc(arc) => {
            arc.center.is_finite()
                && arc.radius.is_finite()
                && arc.start_angle.is_finite()
                && arc.end_angle.is_finite()
        }
        Entity::Polyline(polyline) => polyline
            .vertices
            .iter()
            .all(|vertex| vertex.position.is_finite()),
        Entity::Text(text) => text.insert.is_finite() && text.height.is_finite(),
        Entity::MText(mtext) => mtext.insert.is_finite() && mtext.height.is_finite(),
        Entity::Insert(insert) => insert.insert.is_finite() && insert.scale.as_vec2().is_finite(),
        Entity::Hatch(hatch) => hatch
            .loops
            .iter()
            .all(|ring| ring.vertices.iter().all(|point| point.is_finite())),
        Entity::Dimension(dimension) => dimension
            .definition_points()
            .chain(dimension.text_midpoint)
            .all(Point2::is_finite),
        Entity::Unsupported(_) => true,
    };
    if finite {
        Ok(())
    } else {
        Err(ExtractionError::NonFinite(entity.dxf_type().to_string()))
    }
}
