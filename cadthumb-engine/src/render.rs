//! 实体渲染：把文档实体映射为画布坐标下的绘制图元。
//!
//! 所有坐标都经过同一个 `Transform2`（视口变换叠加块参照变换），
//! 因此 Y 轴翻转对文字旋转与圆弧方向的影响在同一处体现。

use cadthumb_core::document::{
    Arc, Circle, DEFAULT_LAYER, Dimension, Document, Entity, Hatch, Insert, MText, Polyline,
    PolylineVertex, Text,
};
use cadthumb_core::geometry::{Point2, Transform2, Vector2, ccw_sweep_degrees};
use glam::DMat2;
use tracing::{debug, warn};

use crate::errors::RenderError;
use crate::extract::LINE_SPACING_FACTOR;
use crate::style::{LayerStyles, LinePattern, Stroke};
use crate::viewport::Viewport;

/// 标注文字高度（图纸单位）。
pub const DIMENSION_TEXT_HEIGHT: f64 = 2.5;
/// 凸度圆弧每段最大张角（度）。
const BULGE_STEP_DEGREES: f64 = 10.0;
const MIN_BULGE_SEGMENTS: usize = 4;
const BULGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    Middle,
}

/// 画布坐标系下的绘制图元，顺序与实体顺序一致。
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line {
        start: Point2,
        end: Point2,
        stroke: Stroke,
    },
    /// 半径相等时即为圆。`rotation` 为长轴方向（度）。
    Ellipse {
        center: Point2,
        rx: f64,
        ry: f64,
        rotation: f64,
        stroke: Stroke,
    },
    /// SVG 椭圆弧参数。
    Arc {
        start: Point2,
        end: Point2,
        rx: f64,
        ry: f64,
        x_axis_rotation: f64,
        large_arc: bool,
        sweep: bool,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Point2>,
        closed: bool,
        fill: Option<Fill>,
        stroke: Stroke,
    },
    Text {
        position: Point2,
        content: String,
        size: f64,
        rotation: f64,
        anchor: TextAnchor,
        stroke: Stroke,
    },
}

impl Primitive {
    pub fn stroke(&self) -> &Stroke {
        match self {
            Primitive::Line { stroke, .. }
            | Primitive::Ellipse { stroke, .. }
            | Primitive::Arc { stroke, .. }
            | Primitive::Polyline { stroke, .. }
            | Primitive::Text { stroke, .. } => stroke,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Primitive::Line { start, end, .. } => start.is_finite() && end.is_finite(),
            Primitive::Ellipse {
                center,
                rx,
                ry,
                rotation,
                ..
            } => center.is_finite() && rx.is_finite() && ry.is_finite() && rotation.is_finite(),
            Primitive::Arc {
                start,
                end,
                rx,
                ry,
                x_axis_rotation,
                ..
            } => {
                start.is_finite()
                    && end.is_finite()
                    && rx.is_finite()
                    && ry.is_finite()
                    && x_axis_rotation.is_finite()
            }
            Primitive::Polyline { points, .. } => points.iter().all(|point| point.is_finite()),
            Primitive::Text {
                position,
                size,
                rotation,
                ..
            } => position.is_finite() && size.is_finite() && rotation.is_finite(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub max_block_depth: usize,
    pub hatch_opacity: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_block_depth: 16,
            hatch_opacity: 0.3,
        }
    }
}

/// 渲染一个实体所需的上下文。块参照内的实体使用派生出的子上下文。
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub document: &'a Document,
    pub styles: &'a LayerStyles,
    pub options: &'a RenderOptions,
    pub transform: Transform2,
    pub depth: usize,
    /// 块内 "0" 图层上的实体继承块参照所在图层。
    pub layer_override: Option<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        document: &'a Document,
        styles: &'a LayerStyles,
        options: &'a RenderOptions,
        transform: Transform2,
    ) -> Self {
        Self {
            document,
            styles,
            options,
            transform,
            depth: 0,
            layer_override: None,
        }
    }

    fn effective_layer<'l>(&'l self, layer: &'l str) -> &'l str {
        match &self.layer_override {
            Some(parent) if layer == DEFAULT_LAYER => parent.as_str(),
            _ => layer,
        }
    }

    fn stroke_for(&self, layer: &str) -> Stroke {
        self.styles.lookup(self.effective_layer(layer)).clone()
    }

    fn project(&self, point: Point2) -> Point2 {
        self.transform.apply(point)
    }

    /// 图纸长度在画布上的平均缩放。
    fn length_scale(&self) -> f64 {
        self.transform.determinant().abs().sqrt()
    }
}

/// 渲染整个文档。单个实体失败只记录警告，不影响其余实体。
pub fn render_document(
    document: &Document,
    viewport: &Viewport,
    styles: &LayerStyles,
    options: &RenderOptions,
) -> Vec<Primitive> {
    let ctx = RenderContext::new(document, styles, options, viewport.transform);
    let mut primitives = Vec::new();
    for entity in document.entities() {
        match render_entity(entity, &ctx) {
            Ok(rendered) => primitives.extend(rendered),
            Err(err) => warn!(
                kind = entity.dxf_type(),
                layer = entity.layer_name(),
                error = %err,
                "实体渲染失败，已跳过"
            ),
        }
    }
    debug!(primitives = primitives.len(), "渲染完成");
    primitives
}

pub fn render_entity(entity: &Entity, ctx: &RenderContext<'_>) -> Result<Vec<Primitive>, RenderError> {
    let primitives = match entity {
        Entity::Line(line) => vec![Primitive::Line {
            start: ctx.project(line.start),
            end: ctx.project(line.end),
            stroke: ctx.stroke_for(&line.layer),
        }],
        Entity::Circle(circle) => vec![render_circle(circle, ctx)],
        Entity::Arc(arc) => vec![render_arc(arc, ctx)],
        Entity::Polyline(polyline) => render_polyline(polyline, ctx),
        Entity::Text(text) => vec![render_text(text, ctx)],
        Entity::MText(mtext) => render_mtext(mtext, ctx),
        Entity::Insert(insert) => render_insert(insert, ctx)?,
        Entity::Hatch(hatch) => render_hatch(hatch, ctx),
        Entity::Dimension(dimension) => render_dimension(dimension, ctx),
        Entity::Unsupported(other) => {
            debug!(kind = %other.kind, "跳过不支持的实体");
            Vec::new()
        }
    };

    if primitives.iter().all(Primitive::is_finite) {
        Ok(primitives)
    } else {
        Err(RenderError::NonFinite(entity.dxf_type().to_string()))
    }
}

fn render_circle(circle: &Circle, ctx: &RenderContext<'_>) -> Primitive {
    let (rx, ry, rotation) = ellipse_axes(ctx.transform.0.matrix2, circle.radius);
    Primitive::Ellipse {
        center: ctx.project(circle.center),
        rx,
        ry,
        rotation,
        stroke: ctx.stroke_for(&circle.layer),
    }
}

fn render_arc(arc: &Arc, ctx: &RenderContext<'_>) -> Primitive {
    let sweep = ccw_sweep_degrees(arc.start_angle, arc.end_angle);
    let stroke = ctx.stroke_for(&arc.layer);
    let (rx, ry, rotation) = ellipse_axes(ctx.transform.0.matrix2, arc.radius);
    if sweep >= 360.0 {
        return Primitive::Ellipse {
            center: ctx.project(arc.center),
            rx,
            ry,
            rotation,
            stroke,
        };
    }

    let point_at = |degrees: f64| {
        let radians = degrees.to_radians();
        Point2::new(
            arc.center.x() + arc.radius * radians.cos(),
            arc.center.y() + arc.radius * radians.sin(),
        )
    };
    Primitive::Arc {
        start: ctx.project(point_at(arc.start_angle)),
        end: ctx.project(point_at(arc.start_angle + sweep)),
        rx,
        ry,
        x_axis_rotation: rotation,
        large_arc: sweep > 180.0,
        // 镜像变换（Y 轴翻转）使逆时针弧在画布上变为负角度方向
        sweep: !ctx.transform.is_mirroring(),
        stroke,
    }
}

fn render_polyline(polyline: &Polyline, ctx: &RenderContext<'_>) -> Vec<Primitive> {
    let vertices = &polyline.vertices;
    if vertices.len() < 2 {
        return Vec::new();
    }
    let points = flatten_bulges(vertices, polyline.is_closed)
        .into_iter()
        .map(|point| ctx.project(point))
        .collect();
    vec![Primitive::Polyline {
        points,
        closed: polyline.is_closed,
        fill: None,
        stroke: ctx.stroke_for(&polyline.layer),
    }]
}

/// 展开凸度段。闭合多段线最后一个顶点的凸度作用于回到首点的闭合段。
fn flatten_bulges(vertices: &[PolylineVertex], closed: bool) -> Vec<Point2> {
    let mut points = Vec::with_capacity(vertices.len());
    for (index, vertex) in vertices.iter().enumerate() {
        points.push(vertex.position);
        let next = match vertices.get(index + 1) {
            Some(next) => next,
            None if closed => &vertices[0],
            None => break,
        };
        if vertex.bulge.abs() > BULGE_EPSILON {
            points.extend(bulge_interior(vertex.position, next.position, vertex.bulge));
        }
    }
    points
}

/// 凸度段内部的采样点（不含两端）。凸度为正表示逆时针。
fn bulge_interior(start: Point2, end: Point2, bulge: f64) -> Vec<Point2> {
    let chord = end.as_vec2() - start.as_vec2();
    let length = chord.length();
    if length <= f64::EPSILON {
        return Vec::new();
    }
    let included = 4.0 * bulge.atan();
    let radius = length * (1.0 + bulge * bulge) / (4.0 * bulge.abs());
    let left = chord.perp() / length;
    let offset = length * (1.0 - bulge * bulge) / (4.0 * bulge);
    let center = (start.as_vec2() + end.as_vec2()) * 0.5 + left * offset;

    let from = start.as_vec2() - center;
    let start_angle = from.y.atan2(from.x);
    let segments = ((included.abs().to_degrees() / BULGE_STEP_DEGREES).ceil() as usize)
        .max(MIN_BULGE_SEGMENTS);
    (1..segments)
        .map(|step| {
            let angle = start_angle + included * step as f64 / segments as f64;
            Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

fn render_text(text: &Text, ctx: &RenderContext<'_>) -> Primitive {
    Primitive::Text {
        position: ctx.project(text.insert),
        content: text.content.clone(),
        size: text.height * ctx.length_scale(),
        rotation: projected_rotation(ctx.transform, text.rotation),
        anchor: TextAnchor::Start,
        stroke: ctx.stroke_for(&text.layer),
    }
}

fn render_mtext(mtext: &MText, ctx: &RenderContext<'_>) -> Vec<Primitive> {
    let stroke = ctx.stroke_for(&mtext.layer);
    let size = mtext.height * ctx.length_scale();
    let rotation = projected_rotation(ctx.transform, mtext.rotation);
    // 行间距沿文字自身的“向下”方向
    let down = Transform2::rotation_degrees(mtext.rotation).apply_vector(Vector2::new(0.0, -1.0));

    mtext
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(index, line)| {
            let distance = index as f64 * mtext.height * LINE_SPACING_FACTOR;
            let anchor = Point2::from_vec(mtext.insert.as_vec2() + down.as_vec2() * distance);
            Primitive::Text {
                position: ctx.project(anchor),
                content: line.to_string(),
                size,
                rotation,
                anchor: TextAnchor::Start,
                stroke: stroke.clone(),
            }
        })
        .collect()
}

fn render_insert(insert: &Insert, ctx: &RenderContext<'_>) -> Result<Vec<Primitive>, RenderError> {
    if ctx.depth >= ctx.options.max_block_depth {
        return Err(RenderError::DepthExceeded {
            name: insert.name.clone(),
            limit: ctx.options.max_block_depth,
        });
    }
    let block = ctx
        .document
        .block(&insert.name)
        .ok_or_else(|| RenderError::MissingBlock(insert.name.clone()))?;

    let placement = Transform2::translation(Vector2::from(insert.insert.as_vec2()))
        .compose(Transform2::rotation_degrees(insert.rotation))
        .compose(Transform2::scale(insert.scale.x(), insert.scale.y()))
        .compose(Transform2::translation(Vector2::from(-block.base_point.as_vec2())));

    let child = RenderContext {
        transform: ctx.transform.compose(placement),
        depth: ctx.depth + 1,
        layer_override: Some(ctx.effective_layer(&insert.layer).to_string()),
        ..*ctx
    };

    let mut primitives = Vec::new();
    for entity in &block.entities {
        primitives.extend(render_entity(entity, &child)?);
    }
    Ok(primitives)
}

fn render_hatch(hatch: &Hatch, ctx: &RenderContext<'_>) -> Vec<Primitive> {
    let stroke = ctx.stroke_for(&hatch.layer);
    hatch
        .loops
        .iter()
        .filter(|ring| ring.vertices.len() >= 3)
        .map(|ring| Primitive::Polyline {
            points: ring.vertices.iter().map(|point| ctx.project(*point)).collect(),
            closed: true,
            fill: Some(Fill {
                color: stroke.color.clone(),
                opacity: ctx.options.hatch_opacity,
            }),
            stroke: stroke.clone(),
        })
        .collect()
}

fn render_dimension(dimension: &Dimension, ctx: &RenderContext<'_>) -> Vec<Primitive> {
    let stroke = ctx.stroke_for(&dimension.layer).with_pattern(LinePattern::Dashed);
    let mut primitives = Vec::new();

    let segments = [
        (dimension.definition_point, dimension.definition_point2),
        (dimension.definition_point2, dimension.definition_point3),
    ];
    for (start, end) in segments {
        if let (Some(start), Some(end)) = (start, end) {
            primitives.push(Primitive::Line {
                start: ctx.project(start),
                end: ctx.project(end),
                stroke: stroke.clone(),
            });
        }
    }

    let position = dimension.text_midpoint.or(dimension.definition_point2);
    if let (Some(label), Some(position)) = (dimension_label(dimension), position) {
        primitives.push(Primitive::Text {
            position: ctx.project(position),
            content: label,
            size: DIMENSION_TEXT_HEIGHT * ctx.length_scale(),
            rotation: projected_rotation(ctx.transform, 0.0),
            anchor: TextAnchor::Middle,
            stroke: stroke.with_pattern(LinePattern::Solid),
        });
    }
    primitives
}

/// 标注文字：`<>` 替换为测量值；无文字时直接使用测量值。
fn dimension_label(dimension: &Dimension) -> Option<String> {
    let measurement = dimension.measurement.map(format_measurement);
    match dimension.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => match &measurement {
            Some(value) => Some(text.replace("<>", value)),
            None => Some(text.replace("<>", "")),
        },
        _ => measurement,
    }
}

fn format_measurement(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// 文字基线方向经变换后的角度（度，画布坐标）。
fn projected_rotation(transform: Transform2, degrees: f64) -> f64 {
    let radians = degrees.to_radians();
    let direction = transform.apply_vector(Vector2::new(radians.cos(), radians.sin()));
    direction.angle_degrees()
}

/// 单位圆经线性变换 `matrix` 后得到的椭圆：返回 (长半轴, 短半轴, 长轴角度)。
///
/// 采用 2×2 矩阵的闭式奇异值分解 `M = R(φ)·diag(σ1, σ2)·R(θ)`，
/// 椭圆即 `R(φ)·diag(σ1, σ2)` 作用于单位圆。
fn ellipse_axes(matrix: DMat2, radius: f64) -> (f64, f64, f64) {
    let (a, c) = (matrix.x_axis.x, matrix.x_axis.y);
    let (b, d) = (matrix.y_axis.x, matrix.y_axis.y);
    let e = (a + d) / 2.0;
    let f = (a - d) / 2.0;
    let g = (c + b) / 2.0;
    let h = (c - b) / 2.0;
    let q = (e * e + h * h).sqrt();
    let r = (f * f + g * g).sqrt();
    let major = (q + r) * radius.abs();
    let minor = (q - r).abs() * radius.abs();
    let phi = (h.atan2(e) + g.atan2(f)) / 2.0;
    let mut rotation = phi.to_degrees();
    if rotation.abs() < 1e-9 || (major - minor).abs() <= 1e-12 * major.max(1.0) {
        // 圆没有方向
        rotation = 0.0;
    }
    (major, minor, normalize_degrees(rotation))
}

fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees % 180.0;
    if wrapped.abs() < 1e-9 {
        0.0
    } else if wrapped < 0.0 {
        wrapped + 180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use cadthumb_core::document::{BlockDefinition, HatchLoop, Layer};
    use cadthumb_core::geometry::Bounds2D;
    use cadthumb_core::units::Unit;

    use super::*;
    use crate::viewport::{ViewportSettings, normalize};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn flip_viewport() -> Viewport {
        normalize(
            &Bounds2D::from_extents(-50.0, -50.0, 50.0, 50.0),
            Unit::Millimeters,
            &ViewportSettings::default(),
        )
    }

    fn render_all(doc: &Document, transform: Transform2) -> Vec<Primitive> {
        let styles = LayerStyles::from_document(doc, 1.0);
        let options = RenderOptions::default();
        let ctx = RenderContext::new(doc, &styles, &options, transform);
        doc.entities()
            .flat_map(|entity| render_entity(entity, &ctx).expect("render"))
            .collect()
    }

    #[test]
    fn arc_flags_account_for_y_flip() {
        let mut doc = Document::new();
        doc.add_arc(Point2::new(0.0, 0.0), 10.0, 0.0, 90.0, "0");
        doc.add_arc(Point2::new(0.0, 0.0), 10.0, 350.0, 10.0, "0");
        doc.add_arc(Point2::new(0.0, 0.0), 10.0, 0.0, 270.0, "0");

        let flipped = render_all(&doc, flip_viewport().transform);
        let flags: Vec<_> = flipped
            .iter()
            .map(|primitive| match primitive {
                Primitive::Arc {
                    large_arc, sweep, ..
                } => (*large_arc, *sweep),
                other => panic!("期望圆弧，得到 {other:?}"),
            })
            .collect();
        assert_eq!(flags, [(false, false), (false, false), (true, false)]);

        // 不翻转时逆时针弧对应正角度方向
        let identity = render_all(&doc, Transform2::IDENTITY);
        let Primitive::Arc { sweep, .. } = &identity[0] else {
            panic!("期望圆弧");
        };
        assert!(*sweep);
    }

    #[test]
    fn arc_endpoints_follow_the_flip() {
        let mut doc = Document::new();
        doc.add_arc(Point2::new(0.0, 0.0), 10.0, 0.0, 90.0, "0");
        let viewport = flip_viewport();
        let rendered = render_all(&doc, viewport.transform);
        let Primitive::Arc { start, end, rx, ry, .. } = &rendered[0] else {
            panic!("期望圆弧");
        };
        // 画布 120×120，中心 (60, 60)
        assert!(close(start.x(), 70.0) && close(start.y(), 60.0));
        assert!(close(end.x(), 60.0) && close(end.y(), 50.0));
        assert!(close(*rx, 10.0) && close(*ry, 10.0));
    }

    #[test]
    fn mirrored_insert_restores_positive_sweep() {
        let mut inner = Document::new();
        inner.add_arc(Point2::new(0.0, 0.0), 10.0, 0.0, 90.0, "0");
        let mut doc = Document::new();
        doc.add_block(BlockDefinition {
            name: "HOOK".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: inner.entities().cloned().collect(),
        });
        doc.add_insert("HOOK", Point2::new(0.0, 0.0), Vector2::new(-1.0, 1.0), 0.0, "0");

        let rendered = render_all(&doc, flip_viewport().transform);
        let Primitive::Arc {
            start,
            end,
            rx,
            ry,
            large_arc,
            sweep,
            ..
        } = &rendered[0]
        else {
            panic!("期望圆弧");
        };
        // X 镜像叠加 Y 翻转，行列式为正
        assert!(*sweep);
        assert!(!*large_arc);
        assert!(close(start.x(), 50.0) && close(start.y(), 60.0));
        assert!(close(end.x(), 60.0) && close(end.y(), 50.0));
        assert!(close(*rx, 10.0) && close(*ry, 10.0));
    }

    #[test]
    fn full_sweep_arc_becomes_ellipse() {
        let mut doc = Document::new();
        doc.add_arc(Point2::new(0.0, 0.0), 4.0, 30.0, 30.0, "0");
        let rendered = render_all(&doc, Transform2::IDENTITY);
        assert!(matches!(rendered[0], Primitive::Ellipse { rx, ry, .. } if close(rx, 4.0) && close(ry, 4.0)));
    }

    #[test]
    fn circle_under_non_uniform_scale_is_an_ellipse() {
        let mut doc = Document::new();
        doc.add_circle(Point2::new(0.0, 0.0), 2.0, "0");
        let transform = Transform2::rotation_degrees(30.0).compose(Transform2::scale(3.0, 1.0));
        let rendered = render_all(&doc, transform);
        let Primitive::Ellipse { rx, ry, rotation, .. } = rendered[0] else {
            panic!("期望椭圆");
        };
        assert!(close(rx, 6.0));
        assert!(close(ry, 2.0));
        assert!((rotation - 30.0).abs() < 1e-6);
    }

    #[test]
    fn bulge_of_one_is_a_half_circle() {
        let vertices = [
            PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 1.0),
            PolylineVertex::new(Point2::new(2.0, 0.0)),
        ];
        let points = flatten_bulges(&vertices, false);
        assert_eq!(points.first(), Some(&Point2::new(0.0, 0.0)));
        assert_eq!(points.last(), Some(&Point2::new(2.0, 0.0)));
        assert!(points.len() > 3);
        for point in &points {
            let distance = (point.as_vec2() - glam::DVec2::new(1.0, 0.0)).length();
            assert!(close(distance, 1.0));
            // 正凸度为逆时针，从 (0,0) 到 (2,0) 经过下方
            assert!(point.y() <= 1e-9);
        }
    }

    #[test]
    fn closing_segment_bulge_is_flattened() {
        let vertices = [
            PolylineVertex::new(Point2::new(0.0, 0.0)),
            PolylineVertex::new(Point2::new(2.0, 0.0)),
            PolylineVertex::with_bulge(Point2::new(2.0, 2.0), 0.5),
        ];
        assert_eq!(flatten_bulges(&vertices, false).len(), 3);
        assert!(flatten_bulges(&vertices, true).len() > 3);
    }

    #[test]
    fn text_rotation_and_size_follow_transform() {
        let mut doc = Document::new();
        doc.add_text(Point2::new(0.0, 0.0), "Hi", 2.0, 30.0, "0");
        let transform = Transform2::scale(2.0, -2.0);
        let rendered = render_all(&doc, transform);
        let Primitive::Text { size, rotation, anchor, .. } = &rendered[0] else {
            panic!("期望文字");
        };
        assert!(close(*size, 4.0));
        assert!((rotation + 30.0).abs() < 1e-9);
        assert_eq!(*anchor, TextAnchor::Start);
    }

    #[test]
    fn mtext_lines_stack_downward() {
        let mut doc = Document::new();
        doc.add_entity(Entity::MText(MText {
            insert: Point2::new(0.0, 10.0),
            content: "one\ntwo\nthree".to_string(),
            height: 2.0,
            rotation: 0.0,
            layer: "0".to_string(),
        }));
        let rendered = render_all(&doc, Transform2::IDENTITY);
        let ys: Vec<_> = rendered
            .iter()
            .map(|primitive| match primitive {
                Primitive::Text { position, .. } => position.y(),
                other => panic!("期望文字，得到 {other:?}"),
            })
            .collect();
        assert_eq!(ys, [10.0, 7.0, 4.0]);
    }

    fn bolt_document() -> Document {
        let mut doc = Document::new();
        doc.upsert_layer(Layer::with_style("PARTS", 1, "CONTINUOUS"));
        let mut block = Document::new();
        block.add_line(Point2::new(1.0, 1.0), Point2::new(2.0, 1.0), "0");
        block.add_line(Point2::new(1.0, 1.0), Point2::new(1.0, 2.0), "GEOM");
        doc.add_block(BlockDefinition {
            name: "BOLT".to_string(),
            base_point: Point2::new(1.0, 1.0),
            entities: block.entities().cloned().collect(),
        });
        doc
    }

    #[test]
    fn insert_composes_placement_and_inherits_layer() {
        let mut doc = bolt_document();
        doc.add_insert("BOLT", Point2::new(10.0, 10.0), Vector2::new(2.0, 2.0), 90.0, "PARTS");
        let rendered = render_all(&doc, Transform2::IDENTITY);
        assert_eq!(rendered.len(), 2);
        let Primitive::Line { start, end, stroke } = &rendered[0] else {
            panic!("期望直线");
        };
        assert!(close(start.x(), 10.0) && close(start.y(), 10.0));
        // (2,1) - base = (1,0)，缩放 2 再旋转 90° 得 (0,2)
        assert!(close(end.x(), 10.0) && close(end.y(), 12.0));
        assert_eq!(stroke.color, "#ff0000");

        let Primitive::Line { stroke, .. } = &rendered[1] else {
            panic!("期望直线");
        };
        assert_eq!(stroke.color, "#000000");
    }

    #[test]
    fn missing_block_and_depth_limit_are_errors() {
        let mut doc = Document::new();
        doc.add_insert("NOPE", Point2::new(0.0, 0.0), Vector2::new(1.0, 1.0), 0.0, "0");
        let styles = LayerStyles::from_document(&doc, 1.0);
        let options = RenderOptions::default();
        let ctx = RenderContext::new(&doc, &styles, &options, Transform2::IDENTITY);
        let entity = doc.entities().next().expect("insert");
        assert!(matches!(
            render_entity(entity, &ctx),
            Err(RenderError::MissingBlock(name)) if name == "NOPE"
        ));

        let mut doc = Document::new();
        let mut inner = Document::new();
        inner.add_insert("SELF", Point2::new(1.0, 0.0), Vector2::new(1.0, 1.0), 0.0, "0");
        doc.add_block(BlockDefinition {
            name: "SELF".to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: inner.entities().cloned().collect(),
        });
        doc.add_insert("SELF", Point2::new(0.0, 0.0), Vector2::new(1.0, 1.0), 0.0, "0");
        doc.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), "0");
        let styles = LayerStyles::from_document(&doc, 1.0);
        let options = RenderOptions {
            max_block_depth: 3,
            ..RenderOptions::default()
        };
        let ctx = RenderContext::new(&doc, &styles, &options, Transform2::IDENTITY);
        let entity = doc.entities().next().expect("insert");
        assert!(matches!(
            render_entity(entity, &ctx),
            Err(RenderError::DepthExceeded { limit: 3, .. })
        ));

        // 文档级渲染隔离失败实体
        let viewport = flip_viewport();
        let primitives = render_document(&doc, &viewport, &styles, &options);
        assert_eq!(primitives.len(), 1);
    }

    #[test]
    fn hatch_loops_become_translucent_polygons() {
        let mut doc = Document::new();
        doc.upsert_layer(Layer::with_style("FILL", 3, "CONTINUOUS"));
        doc.add_entity(Entity::Hatch(Hatch {
            pattern_name: "SOLID".to_string(),
            is_solid: true,
            loops: vec![
                HatchLoop {
                    vertices: vec![
                        Point2::new(0.0, 0.0),
                        Point2::new(1.0, 0.0),
                        Point2::new(1.0, 1.0),
                    ],
                    is_closed: true,
                },
                HatchLoop {
                    vertices: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)],
                    is_closed: true,
                },
            ],
            layer: "FILL".to_string(),
        }));
        let rendered = render_all(&doc, Transform2::IDENTITY);
        assert_eq!(rendered.len(), 1);
        let Primitive::Polyline { closed, fill, .. } = &rendered[0] else {
            panic!("期望多边形");
        };
        assert!(*closed);
        assert_eq!(
            fill.as_ref(),
            Some(&Fill {
                color: "#00ff00".to_string(),
                opacity: 0.3
            })
        );
    }

    #[test]
    fn dimension_draws_dashed_lines_and_label() {
        let mut doc = Document::new();
        doc.add_entity(Entity::Dimension(Dimension {
            definition_point: Some(Point2::new(10.0, 5.0)),
            definition_point2: Some(Point2::new(0.0, 0.0)),
            definition_point3: Some(Point2::new(10.0, 0.0)),
            definition_point4: None,
            definition_point5: None,
            text_midpoint: Some(Point2::new(5.0, 6.0)),
            text: Some("<> mm".to_string()),
            measurement: Some(10.0),
            layer: "DIMS".to_string(),
        }));
        let rendered = render_all(&doc, Transform2::IDENTITY);
        assert_eq!(rendered.len(), 3);
        assert!(rendered[..2]
            .iter()
            .all(|primitive| primitive.stroke().pattern == LinePattern::Dashed));
        let Primitive::Text {
            content,
            position,
            anchor,
            ..
        } = &rendered[2]
        else {
            panic!("期望标注文字");
        };
        assert_eq!(content, "10 mm");
        assert_eq!(*position, Point2::new(5.0, 6.0));
        assert_eq!(*anchor, TextAnchor::Middle);
    }

    #[test]
    fn measurement_formatting_trims_zeros() {
        assert_eq!(format_measurement(10.0), "10");
        assert_eq!(format_measurement(12.5), "12.5");
        assert_eq!(format_measurement(3.14159), "3.14");
        assert_eq!(format_measurement(-0.001), "0");
    }

    #[test]
    fn non_finite_output_is_rejected() {
        let mut doc = Document::new();
        doc.add_line(Point2::new(f64::INFINITY, 0.0), Point2::new(1.0, 0.0), "0");
        let styles = LayerStyles::from_document(&doc, 1.0);
        let options = RenderOptions::default();
        let ctx = RenderContext::new(&doc, &styles, &options, Transform2::IDENTITY);
        let entity = doc.entities().next().expect("line");
        assert!(matches!(
            render_entity(entity, &ctx),
            Err(RenderError::NonFinite(kind)) if kind == "LINE"
        ));
    }
}
