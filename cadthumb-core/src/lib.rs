pub mod geometry {
    use glam::{DAffine2, DVec2};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，保持 DXF 的双精度坐标。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 向量相对 +X 轴的角度（度）。
        #[inline]
        pub fn angle_degrees(self) -> f64 {
            self.0.y.atan2(self.0.x).to_degrees()
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框。`empty()` 以 (+∞, +∞, −∞, −∞) 作为哨兵值。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn from_extents(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
            Self {
                min: Point2::new(min_x, min_y),
                max: Point2::new(max_x, max_y),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        /// 按逆时针顺序返回四个角点（左下、右下、右上、左上）。
        pub fn corners(&self) -> [Point2; 4] {
            [
                self.min,
                Point2::new(self.max.x(), self.min.y()),
                self.max,
                Point2::new(self.min.x(), self.max.y()),
            ]
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }

    /// 二维仿射变换。`outer.compose(inner)` 与矩阵乘法 `outer * inner` 一致，
    /// 点先经过 `inner`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform2(pub DAffine2);

    impl Transform2 {
        pub const IDENTITY: Self = Self(DAffine2::IDENTITY);

        #[inline]
        pub fn translation(offset: Vector2) -> Self {
            Self(DAffine2::from_translation(offset.0))
        }

        /// 逆时针旋转，角度单位为度。
        #[inline]
        pub fn rotation_degrees(angle: f64) -> Self {
            Self(DAffine2::from_angle(angle.to_radians()))
        }

        #[inline]
        pub fn scale(sx: f64, sy: f64) -> Self {
            Self(DAffine2::from_scale(DVec2::new(sx, sy)))
        }

        /// 返回 `self ∘ inner`：点先经过 `inner`，再经过 `self`。
        #[inline]
        pub fn compose(self, inner: Transform2) -> Self {
            Self(self.0 * inner.0)
        }

        #[inline]
        pub fn apply(self, point: Point2) -> Point2 {
            Point2(self.0.transform_point2(point.0))
        }

        #[inline]
        pub fn apply_vector(self, vector: Vector2) -> Vector2 {
            Vector2(self.0.transform_vector2(vector.0))
        }

        #[inline]
        pub fn determinant(self) -> f64 {
            self.0.matrix2.determinant()
        }

        /// 变换是否翻转手性（例如 CAD → SVG 的 Y 轴翻转）。
        #[inline]
        pub fn is_mirroring(self) -> bool {
            self.determinant() < 0.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl Default for Transform2 {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    /// 从 `start` 逆时针转到 `end` 的角度（度），取值 (0, 360]。
    /// `end < start` 时向前补整圈；起止角相同视为整圆。
    pub fn ccw_sweep_degrees(start: f64, end: f64) -> f64 {
        let mut end = end;
        if end < start {
            end += 360.0 * ((start - end) / 360.0).ceil();
        }
        let sweep = (end - start).min(360.0);
        if sweep <= 0.0 { 360.0 } else { sweep }
    }
}

pub mod units {
    use std::fmt;

    use serde::{Serialize, Serializer};

    /// 图纸长度单位，来自 DXF 头部 `$INSUNITS`。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub enum Unit {
        Inches,
        Feet,
        Miles,
        #[default]
        Millimeters,
        Centimeters,
        Meters,
        Kilometers,
        Micrometers,
        Decimeters,
    }

    /// `$INSUNITS` 码表。8/9 与 13/14 均已映射。
    const UNIT_CODES: &[(i32, Unit)] = &[
        (1, Unit::Inches),
        (2, Unit::Feet),
        (3, Unit::Miles),
        (4, Unit::Millimeters),
        (5, Unit::Centimeters),
        (6, Unit::Meters),
        (7, Unit::Kilometers),
        (8, Unit::Micrometers),
        (9, Unit::Decimeters),
        (13, Unit::Micrometers),
        (14, Unit::Decimeters),
    ];

    impl Unit {
        /// 查表解析单位码；缺失或无法识别时返回毫米。
        pub fn from_code(code: Option<i32>) -> Self {
            code.and_then(|code| {
                UNIT_CODES
                    .iter()
                    .find(|(candidate, _)| *candidate == code)
                    .map(|(_, unit)| *unit)
            })
            .unwrap_or_default()
        }

        pub fn symbol(self) -> &'static str {
            match self {
                Unit::Inches => "in",
                Unit::Feet => "ft",
                Unit::Miles => "mi",
                Unit::Millimeters => "mm",
                Unit::Centimeters => "cm",
                Unit::Meters => "m",
                Unit::Kilometers => "km",
                Unit::Micrometers => "µm",
                Unit::Decimeters => "dm",
            }
        }
    }

    impl fmt::Display for Unit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.symbol())
        }
    }

    impl Serialize for Unit {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.symbol())
        }
    }
}

pub mod document {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Vector2};

    pub const DEFAULT_LAYER: &str = "0";
    pub const DEFAULT_LINETYPE: &str = "CONTINUOUS";
    /// AutoCAD 颜色索引 7（白/黑）。
    pub const DEFAULT_COLOR: i16 = 7;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: i16,
        pub linetype: String,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: DEFAULT_COLOR,
                linetype: DEFAULT_LINETYPE.to_string(),
            }
        }

        #[inline]
        pub fn with_style(name: impl Into<String>, color: i16, linetype: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color,
                linetype: linetype.into(),
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
        Text(Text),
        MText(MText),
        Insert(Insert),
        Hatch(Hatch),
        Dimension(Dimension),
        Unsupported(Unsupported),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Text(text) => &text.layer,
                Entity::MText(mtext) => &mtext.layer,
                Entity::Insert(insert) => &insert.layer,
                Entity::Hatch(hatch) => &hatch.layer,
                Entity::Dimension(dimension) => &dimension.layer,
                Entity::Unsupported(other) => &other.layer,
            }
        }

        /// DXF 实体类型名，用于统计与日志。
        pub fn dxf_type(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Polyline(polyline) if polyline.is_lightweight => "LWPOLYLINE",
                Entity::Polyline(_) => "POLYLINE",
                Entity::Text(_) => "TEXT",
                Entity::MText(_) => "MTEXT",
                Entity::Insert(_) => "INSERT",
                Entity::Hatch(_) => "HATCH",
                Entity::Dimension(_) => "DIMENSION",
                Entity::Unsupported(other) => &other.kind,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以度为单位、按逆时针方向，与 DXF 组码 50/51 一致。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    /// POLYLINE 与 LWPOLYLINE 共用的结构，`is_lightweight` 区分来源。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub is_lightweight: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        /// 旋转角（度）。
        pub rotation: f64,
        pub layer: String,
    }

    /// 多行文字；`content` 中的换行已由读取器从 `\P` 解码为 `\n`。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MText {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    impl MText {
        pub fn lines(&self) -> impl Iterator<Item = &str> {
            self.content.split('\n')
        }
    }

    /// 块参照（INSERT）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Insert {
        pub name: String,
        pub insert: Point2,
        pub scale: Vector2,
        pub rotation: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct HatchLoop {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub pattern_name: String,
        pub is_solid: bool,
        pub loops: Vec<HatchLoop>,
        pub layer: String,
    }

    /// 标注实体。定义点 1–5 对应 DXF 组码 10/13/14/15/16。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Dimension {
        pub definition_point: Option<Point2>,
        pub definition_point2: Option<Point2>,
        pub definition_point3: Option<Point2>,
        pub definition_point4: Option<Point2>,
        pub definition_point5: Option<Point2>,
        pub text_midpoint: Option<Point2>,
        pub text: Option<String>,
        pub measurement: Option<f64>,
        pub layer: String,
    }

    impl Dimension {
        pub fn definition_points(&self) -> impl Iterator<Item = Point2> + '_ {
            [
                self.definition_point,
                self.definition_point2,
                self.definition_point3,
                self.definition_point4,
                self.definition_point5,
            ]
            .into_iter()
            .flatten()
        }
    }

    /// 读取器识别但不参与绘制的实体，仅保留类型名与图层。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Unsupported {
        pub kind: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockDefinition {
        pub name: String,
        pub base_point: Point2,
        pub entities: Vec<Entity>,
    }

    impl BlockDefinition {
        /// 模型空间/图纸空间块（`*Model_Space`、`*Paper_Space0` 等）。
        pub fn is_layout(&self) -> bool {
            let lower = self.name.to_ascii_lowercase();
            lower.starts_with("*model_space") || lower.starts_with("*paper_space")
        }
    }

    /// HEADER 段变量，保存原始字符串值。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Header {
        variables: BTreeMap<String, String>,
    }

    impl Header {
        pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
            self.variables.insert(name.into(), value.into());
        }

        pub fn get(&self, name: &str) -> Option<&str> {
            self.variables.get(name).map(String::as_str)
        }

        pub fn get_i32(&self, name: &str) -> Option<i32> {
            self.get(name).and_then(|raw| raw.trim().parse().ok())
        }

        /// `$INSUNITS` 单位码。
        pub fn insertion_units(&self) -> Option<i32> {
            self.get_i32("$INSUNITS")
        }
    }

    /// 一次转换请求对应的只读文档。实体顺序即 DXF 中的出现顺序。
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        #[serde(default)]
        header: Header,
        layers: Vec<Layer>,
        entities: Vec<Entity>,
        #[serde(default)]
        blocks: Vec<BlockDefinition>,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer(DEFAULT_LAYER);
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            if self.layer(key).is_none() {
                self.layers.push(Layer::new(key));
            }
        }

        /// 写入或覆盖图层表中的条目。
        pub fn upsert_layer(&mut self, layer: Layer) {
            match self.layers.iter_mut().find(|existing| existing.name == layer.name) {
                Some(existing) => *existing = layer,
                None => self.layers.push(layer),
            }
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.iter().find(|layer| layer.name == name)
        }

        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        pub fn header(&self) -> &Header {
            &self.header
        }

        pub fn header_mut(&mut self) -> &mut Header {
            &mut self.header
        }

        pub fn add_entity(&mut self, entity: Entity) {
            self.ensure_layer(entity.layer_name().to_string());
            self.entities.push(entity);
        }

        pub fn entities(&self) -> impl Iterator<Item = &Entity> {
            self.entities.iter()
        }

        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        pub fn add_block(&mut self, block: BlockDefinition) {
            match self.blocks.iter_mut().find(|existing| existing.name == block.name) {
                Some(existing) => *existing = block,
                None => self.blocks.push(block),
            }
        }

        pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
            self.blocks.iter().find(|block| block.name == name)
        }

        pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
            self.blocks.iter()
        }

        pub fn add_line(&mut self, start: Point2, end: Point2, layer: impl Into<String>) {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }));
        }

        pub fn add_circle(&mut self, center: Point2, radius: f64, layer: impl Into<String>) {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
            }));
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
            }));
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                layer: layer.into(),
            }));
        }

        pub fn add_insert(
            &mut self,
            name: impl Into<String>,
            insert: Point2,
            scale: Vector2,
            rotation: f64,
            layer: impl Into<String>,
        ) {
            self.add_entity(Entity::Insert(Insert {
                name: name.into(),
                insert,
                scale,
                rotation,
                layer: layer.into(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::document::*;
    use super::geometry::*;
    use super::units::Unit;

    #[test]
    fn document_keeps_insertion_order_and_layers() {
        let mut doc = Document::new();
        doc.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
        doc.add_circle(Point2::new(5.0, 5.0), 2.0, "ANNOT");
        doc.add_arc(Point2::new(5.0, 0.0), 3.5, 0.0, 90.0, "GEOM");

        let kinds: Vec<_> = doc.entities().map(Entity::dxf_type).collect();
        assert_eq!(kinds, ["LINE", "CIRCLE", "ARC"]);

        let layers: Vec<_> = doc.layers().map(|l| l.name.as_str()).collect();
        assert_eq!(layers, ["0", "ANNOT", "GEOM"]);

        // 迭代可重复，结果一致
        assert_eq!(doc.entities().count(), doc.entities().count());
    }

    #[test]
    fn upsert_layer_replaces_style() {
        let mut doc = Document::new();
        doc.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "WALLS");
        doc.upsert_layer(Layer::with_style("WALLS", 1, "DASHED"));
        let layer = doc.layer("WALLS").expect("layer exists");
        assert_eq!(layer.color, 1);
        assert_eq!(layer.linetype, "DASHED");
        assert_eq!(doc.layers().count(), 2);
    }

    #[test]
    fn bounds_accumulate_and_report_extents() {
        let mut bounds = Bounds2D::empty();
        assert!(bounds.is_empty());
        bounds.include_point(Point2::new(3.0, -1.0));
        bounds.include_point(Point2::new(-2.0, 4.0));
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min(), Point2::new(-2.0, -1.0));
        assert_eq!(bounds.max(), Point2::new(3.0, 4.0));
        assert_eq!(bounds.width(), 5.0);
        assert_eq!(bounds.height(), 5.0);
        assert_eq!(bounds.center(), Point2::new(0.5, 1.5));
    }

    #[test]
    fn transform_composition_applies_inner_first() {
        let translate = Transform2::translation(Vector2::new(10.0, 0.0));
        let scale = Transform2::scale(2.0, 2.0);
        let combined = translate.compose(scale);
        let p = combined.apply(Point2::new(1.0, 1.0));
        assert!((p.x() - 12.0).abs() < 1e-12);
        assert!((p.y() - 2.0).abs() < 1e-12);

        let flip = Transform2::scale(1.0, -1.0);
        assert!(flip.is_mirroring());
        assert!(!combined.is_mirroring());

        let rotated = Transform2::rotation_degrees(90.0).apply(Point2::new(1.0, 0.0));
        assert!(rotated.x().abs() < 1e-12);
        assert!((rotated.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sweep_wraps_across_zero_degrees() {
        assert_eq!(ccw_sweep_degrees(350.0, 10.0), 20.0);
        assert_eq!(ccw_sweep_degrees(0.0, 90.0), 90.0);
        assert_eq!(ccw_sweep_degrees(0.0, 360.0), 360.0);
        assert_eq!(ccw_sweep_degrees(10.0, 800.0), 360.0);
        assert_eq!(ccw_sweep_degrees(45.0, 45.0), 360.0);
        assert_eq!(ccw_sweep_degrees(90.0, -270.0), 360.0);
    }

    #[test]
    fn unit_codes_resolve_with_millimeter_default() {
        assert_eq!(Unit::from_code(Some(6)), Unit::Meters);
        assert_eq!(Unit::from_code(Some(6)).symbol(), "m");
        assert_eq!(Unit::from_code(Some(1)).symbol(), "in");
        assert_eq!(Unit::from_code(Some(8)).symbol(), "µm");
        assert_eq!(Unit::from_code(Some(99)), Unit::Millimeters);
        assert_eq!(Unit::from_code(Some(99)).symbol(), "mm");
        assert_eq!(Unit::from_code(None), Unit::Millimeters);
        assert_eq!(Unit::from_code(Some(0)), Unit::Millimeters);
    }

    #[test]
    fn header_parses_integer_units() {
        let mut header = Header::default();
        assert_eq!(header.insertion_units(), None);
        header.set("$INSUNITS", " 4 ");
        assert_eq!(header.insertion_units(), Some(4));
        header.set("$INSUNITS", "metric");
        assert_eq!(header.insertion_units(), None);
    }

    #[test]
    fn layout_blocks_are_detected() {
        let block = |name: &str| BlockDefinition {
            name: name.to_string(),
            base_point: Point2::new(0.0, 0.0),
            entities: Vec::new(),
        };
        assert!(block("*Model_Space").is_layout());
        assert!(block("*PAPER_SPACE0").is_layout());
        assert!(!block("*U12").is_layout());
        assert!(!block("BOLT").is_layout());
    }
}
