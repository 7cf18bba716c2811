use std::convert::TryFrom;

use cadthumb_core::document::{
    Arc, BlockDefinition, Circle, DEFAULT_COLOR, DEFAULT_LAYER, DEFAULT_LINETYPE, Dimension,
    Document, Entity, Hatch, HatchLoop, Insert, Layer, Line, MText, Polyline, PolylineVertex, Text,
    Unsupported,
};
use cadthumb_core::geometry::{Point2, Vector2, ccw_sweep_degrees};
use glam::DVec2;
use thiserror::Error;
use tracing::{debug, warn};

const BINARY_SENTINEL: &str = "AutoCAD Binary DXF";
/// HATCH 边界中圆弧/椭圆弧边的离散段数。
const HATCH_ARC_SEGMENTS: usize = 16;

#[derive(Debug, Error)]
pub(crate) enum DxfError {
    #[error("binary DXF is not supported")]
    Binary,
    /// 组码/值行本身损坏或文件提前结束，整份文件不可读。
    #[error("{0}")]
    Syntax(String),
    /// 单个实体或记录的字段缺失、无法解析。
    #[error("{0}")]
    Invalid(String),
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }
}

pub(crate) struct DxfParser<'a> {
    source: &'a str,
    reader: DxfReader<'a>,
    /// 当前实体是否带有组码 67 = 1（图纸空间）。
    in_paperspace: bool,
}

impl<'a> DxfParser<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            reader: DxfReader::new(source),
            in_paperspace: false,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Document, DxfError> {
        if self.source.starts_with(BINARY_SENTINEL) {
            return Err(DxfError::Binary);
        }
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::syntax("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::syntax(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "TABLES" => self.parse_tables(&mut document)?,
                        "BLOCKS" => self.parse_blocks(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::syntax(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => return Err(DxfError::syntax("SECTION 未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    /// HEADER 段：`9 $NAME` 后紧跟的第一个值即变量值。
    fn parse_header(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let mut current: Option<String> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some((9, name)) => current = Some(name.trim().to_string()),
                Some((_, value)) => {
                    if let Some(name) = current.take() {
                        document.header_mut().set(name, value.trim());
                    }
                }
                None => return Err(DxfError::syntax("HEADER 段未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    /// TABLES 段只关心 LAYER 记录，其余表整体跳过。
    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDSEC" => break,
                    "LAYER" => {
                        if let Some(layer) = self.parse_layer_record()? {
                            document.upsert_layer(layer);
                        }
                    }
                    _ => {}
                },
                Some(_) => continue,
                None => return Err(DxfError::syntax("TABLES 段未找到 ENDSEC 终止标记")),
            }
        }
        Ok(())
    }

    fn parse_layer_record(&mut self) -> Result<Option<Layer>, DxfError> {
        let mut name: Option<String> = None;
        let mut color = DEFAULT_COLOR;
        let mut linetype = DEFAULT_LINETYPE.to_string();
        self.read_fields("LAYER", |code, value| {
            match code {
                2 => name = Some(value.trim().to_string()),
                // 负值表示图层关闭，颜色取绝对值
                62 => color = parse_i16(value, "LAYER 颜色（组码 62）")?.saturating_abs(),
                6 => linetype = value.trim().to_string(),
                _ => {}
            }
            Ok(())
        })?;
        Ok(name
            .filter(|name| !name.is_empty())
            .map(|name| Layer::with_style(name, color, linetype)))
    }

    fn parse_blocks(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::syntax("BLOCKS 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "BLOCKS 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                "BLOCK" => {
                    if let Some(definition) = self.parse_block_definition()? {
                        document.add_block(definition);
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    /// 解析单个 BLOCK…ENDBLK。模型/图纸空间布局块只消费不保留。
    fn parse_block_definition(&mut self) -> Result<Option<BlockDefinition>, DxfError> {
        let mut name: Option<String> = None;
        let mut base_x: f64 = 0.0;
        let mut base_y: f64 = 0.0;
        let mut entities: Vec<Entity> = Vec::new();

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ENDBLK" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    "SEQEND" | "VERTEX" | "ATTRIB" => self.skip_entity_body()?,
                    entity_kind => {
                        if let Some((entity, _)) = self.parse_entity_lenient(entity_kind)? {
                            entities.push(entity);
                        }
                    }
                },
                Some((code, value)) => match code {
                    2 => name = Some(value.trim().to_string()),
                    10 => base_x = parse_f64(&value, "BLOCK 基点 X")?,
                    20 => base_y = parse_f64(&value, "BLOCK 基点 Y")?,
                    _ => {}
                },
                None => return Err(DxfError::syntax("BLOCK 定义未找到 ENDBLK 终止标记")),
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("BLOCK 缺少名称（组码 2）"))?;
        let definition = BlockDefinition {
            name,
            base_point: Point2::new(base_x, base_y),
            entities,
        };
        if definition.is_layout() {
            return Ok(None);
        }
        Ok(Some(definition))
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let mut skipped_paperspace = 0usize;
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::syntax("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::syntax(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                // 失败实体遗留的 VERTEX/ATTRIB 与 SEQEND 一并丢弃
                "SEQEND" | "VERTEX" | "ATTRIB" => self.skip_entity_body()?,
                kind => match self.parse_entity_lenient(kind)? {
                    Some((_, true)) => {
                        skipped_paperspace += 1;
                    }
                    Some((entity, false)) => document.add_entity(entity),
                    None => {}
                },
            }
        }
        if skipped_paperspace > 0 {
            debug!(count = skipped_paperspace, "跳过图纸空间实体");
        }
        Ok(())
    }

    /// 单个实体字段无效时记录警告并跳过该实体，语法错误仍向上传播。
    /// 成功时同时返回实体是否位于图纸空间。
    fn parse_entity_lenient(&mut self, kind: &str) -> Result<Option<(Entity, bool)>, DxfError> {
        self.in_paperspace = false;
        match self.parse_entity(kind) {
            Ok(entity) => Ok(Some((entity, self.in_paperspace))),
            Err(DxfError::Invalid(message)) => {
                warn!(kind, error = %message, "实体无效，已跳过");
                self.skip_entity_body()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "LINE" => self.parse_line(),
            "CIRCLE" => self.parse_circle(),
            "ARC" => self.parse_arc(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "POLYLINE" => self.parse_polyline(),
            "TEXT" => self.parse_text(),
            "MTEXT" => self.parse_mtext(),
            "INSERT" => self.parse_insert(),
            "HATCH" => self.parse_hatch(),
            "DIMENSION" => self.parse_dimension(),
            other => self.parse_unsupported(other),
        }
    }

    fn parse_line(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let (mut start_x, mut start_y, mut end_x, mut end_y) = (None, None, None, None);
        self.read_fields("LINE", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut start_x, value, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start_y, value, "LINE 起点 Y（组码 20）")?,
                11 => assign_coord(&mut end_x, value, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end_y, value, "LINE 终点 Y（组码 21）")?,
                _ => {}
            }
            Ok(())
        })?;

        Ok(Entity::Line(Line {
            start: required_point(start_x, start_y, "LINE 缺少起点（组码 10/20）")?,
            end: required_point(end_x, end_y, "LINE 缺少终点（组码 11/21）")?,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let (mut center_x, mut center_y, mut radius) = (None, None, None);
        self.read_fields("CIRCLE", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center_x, value, "CIRCLE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, value, "CIRCLE 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, value, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
            Ok(())
        })?;

        Ok(Entity::Circle(Circle {
            center: required_point(center_x, center_y, "CIRCLE 缺少圆心（组码 10/20）")?,
            radius: required(radius, "CIRCLE 缺少半径（组码 40）")?,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_arc(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let (mut center_x, mut center_y, mut radius) = (None, None, None);
        let (mut start_angle, mut end_angle) = (None, None);
        self.read_fields("ARC", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center_x, value, "ARC 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center_y, value, "ARC 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, value, "ARC 半径（组码 40）")?,
                50 => assign_coord(&mut start_angle, value, "ARC 起始角（组码 50）")?,
                51 => assign_coord(&mut end_angle, value, "ARC 终止角（组码 51）")?,
                _ => {}
            }
            Ok(())
        })?;

        Ok(Entity::Arc(Arc {
            center: required_point(center_x, center_y, "ARC 缺少圆心（组码 10/20）")?,
            radius: required(radius, "ARC 缺少半径（组码 40）")?,
            start_angle: required(start_angle, "ARC 缺少起始角（组码 50）")?,
            end_angle: required(end_angle, "ARC 缺少终止角（组码 51）")?,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        self.read_fields("LWPOLYLINE", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                70 => is_closed = parse_i32(value, "LWPOLYLINE 标志（组码 70）")? & 0x01 != 0,
                10 => {
                    let x = parse_f64(value, "LWPOLYLINE 顶点 X")?;
                    match pending_y.take() {
                        Some(y) => vertices.push(PolylineVertex::new(Point2::new(x, y))),
                        None => {
                            if pending_x.replace(x).is_some() {
                                return Err(DxfError::invalid(
                                    "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                                ));
                            }
                        }
                    }
                }
                20 => {
                    let y = parse_f64(value, "LWPOLYLINE 顶点 Y")?;
                    match pending_x.take() {
                        Some(x) => vertices.push(PolylineVertex::new(Point2::new(x, y))),
                        None => {
                            if pending_y.replace(y).is_some() {
                                return Err(DxfError::invalid(
                                    "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                                ));
                            }
                        }
                    }
                }
                42 => {
                    let bulge = parse_f64(value, "LWPOLYLINE 顶点 bulge")?;
                    let vertex = vertices.last_mut().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                    })?;
                    vertex.bulge = bulge;
                }
                _ => {}
            }
            Ok(())
        })?;

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }

        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed,
            is_lightweight: true,
            layer: layer_or_default(layer),
        }))
    }

    /// 旧式 POLYLINE：头部之后跟随若干 VERTEX，以 SEQEND 结束。
    fn parse_polyline(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut flags: i32 = 0;
        self.read_fields("POLYLINE", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                70 => flags = parse_i32(value, "POLYLINE 标志（组码 70）")?,
                _ => {}
            }
            Ok(())
        })?;

        let mut vertices = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        if let Some(vertex) = self.parse_vertex()? {
                            vertices.push(vertex);
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }

        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed: flags & 0x01 != 0,
            is_lightweight: false,
            layer: layer_or_default(layer),
        }))
    }

    /// 多面网格的面记录（标志 128 且不含 64）不携带坐标，返回 `None`。
    fn parse_vertex(&mut self) -> Result<Option<PolylineVertex>, DxfError> {
        let (mut x, mut y) = (None, None);
        let mut bulge = 0.0;
        let mut flags: i32 = 0;
        self.read_fields("VERTEX", |code, value| {
            match code {
                10 => assign_coord(&mut x, value, "VERTEX X（组码 10）")?,
                20 => assign_coord(&mut y, value, "VERTEX Y（组码 20）")?,
                42 => bulge = parse_f64(value, "VERTEX bulge（组码 42）")?,
                70 => flags = parse_i32(value, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
            Ok(())
        })?;

        if flags & 0x80 != 0 && flags & 0x40 == 0 {
            return Ok(None);
        }
        let position = required_point(x, y, "VERTEX 缺少坐标（组码 10/20）")?;
        Ok(Some(PolylineVertex::with_bulge(position, bulge)))
    }

    fn parse_text(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let (mut insert_x, mut insert_y, mut height) = (None, None, None);
        let mut rotation = 0.0;
        let mut content = String::new();
        self.read_fields("TEXT", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut insert_x, value, "TEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, value, "TEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, value, "TEXT 高度（组码 40）")?,
                50 => rotation = parse_f64(value, "TEXT 旋转角（组码 50）")?,
                1 => content = decode_text_specials(value),
                _ => {}
            }
            Ok(())
        })?;

        Ok(Entity::Text(Text {
            insert: required_point(insert_x, insert_y, "TEXT 缺少插入点（组码 10/20）")?,
            content,
            height: required(height, "TEXT 缺少文本高度（组码 40）")?,
            rotation,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_mtext(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let (mut insert_x, mut insert_y, mut height) = (None, None, None);
        let mut direction_x: Option<f64> = None;
        let mut direction_y: Option<f64> = None;
        let mut rotation_deg: Option<f64> = None;
        let mut raw = String::new();
        self.read_fields("MTEXT", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut insert_x, value, "MTEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, value, "MTEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, value, "MTEXT 高度（组码 40）")?,
                11 => direction_x = Some(parse_f64(value, "MTEXT 方向向量 X")?),
                21 => direction_y = Some(parse_f64(value, "MTEXT 方向向量 Y")?),
                50 => rotation_deg = Some(parse_f64(value, "MTEXT 旋转角")?),
                // 超长文本先以组码 3 分块，最后一块为组码 1
                1 | 3 => raw.push_str(value),
                _ => {}
            }
            Ok(())
        })?;

        let rotation = match (direction_x, direction_y) {
            (Some(x), Some(y)) if x.abs() > f64::EPSILON || y.abs() > f64::EPSILON => {
                Vector2::new(x, y).angle_degrees()
            }
            _ => rotation_deg.unwrap_or(0.0),
        };

        Ok(Entity::MText(MText {
            insert: required_point(insert_x, insert_y, "MTEXT 缺少插入点（组码 10/20）")?,
            content: decode_mtext_content(&raw),
            height: required(height, "MTEXT 缺少文本高度（组码 40）")?,
            rotation,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_insert(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut name: Option<String> = None;
        let (mut insert_x, mut insert_y) = (None, None);
        let (mut scale_x, mut scale_y) = (1.0, 1.0);
        let mut rotation = 0.0;
        self.read_fields("INSERT", |code, value| {
            match code {
                8 => layer = Some(value.trim().to_string()),
                2 => name = Some(value.trim().to_string()),
                10 => assign_coord(&mut insert_x, value, "INSERT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, value, "INSERT 插入点 Y（组码 20）")?,
                41 => scale_x = parse_f64(value, "INSERT X 比例（组码 41）")?,
                42 => scale_y = parse_f64(value, "INSERT Y 比例（组码 42）")?,
                50 => rotation = parse_f64(value, "INSERT 旋转角（组码 50）")?,
                _ => {}
            }
            Ok(())
        })?;
        self.skip_attributes()?;

        Ok(Entity::Insert(Insert {
            name: required(name, "INSERT 缺少块名（组码 2）")?,
            insert: required_point(insert_x, insert_y, "INSERT 缺少插入点（组码 10/20）")?,
            scale: Vector2::new(scale_x, scale_y),
            rotation,
            layer: layer_or_default(layer),
        }))
    }

    /// 跳过 INSERT 之后的 ATTRIB 序列及其 SEQEND。
    fn skip_attributes(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => self.skip_entity_body()?,
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }

    /// HATCH 组码按阶段解释：91 之前为实体头，91 与 75 之间为边界环，75 之后（图案、种子点）忽略。
    fn parse_hatch(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut pattern_name = String::new();
        let mut is_solid = false;
        let mut stage = HatchStage::Header;
        let mut loops: Vec<HatchLoop> = Vec::new();
        let mut current: Option<BoundaryBuilder> = None;
        self.read_fields("HATCH", |code, value| {
            match (stage, code) {
                (HatchStage::Header, 8) => layer = Some(value.trim().to_string()),
                (HatchStage::Header, 2) => pattern_name = value.trim().to_string(),
                (HatchStage::Header, 70) => {
                    is_solid = parse_i32(value, "HATCH 实心填充标志（组码 70）")? == 1;
                }
                (HatchStage::Header, 91) => stage = HatchStage::Boundary,
                (HatchStage::Boundary, 92) => {
                    let flags = parse_i32(value, "HATCH 边界类型（组码 92）")?;
                    if let Some(builder) = current.replace(BoundaryBuilder::new(flags)) {
                        loops.push(builder.finish()?);
                    }
                }
                (HatchStage::Boundary, 75) => {
                    if let Some(builder) = current.take() {
                        loops.push(builder.finish()?);
                    }
                    stage = HatchStage::Trailer;
                }
                (HatchStage::Boundary, _) => {
                    if let Some(builder) = current.as_mut() {
                        builder.accept(code, value)?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        if let Some(builder) = current.take() {
            loops.push(builder.finish()?);
        }

        Ok(Entity::Hatch(Hatch {
            pattern_name,
            is_solid,
            loops,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_dimension(&mut self) -> Result<Entity, DxfError> {
        let mut layer = None;
        let mut coords: [(Option<f64>, Option<f64>); 6] = [(None, None); 6];
        let mut text: Option<String> = None;
        let mut measurement: Option<f64> = None;
        self.read_fields("DIMENSION", |code, value| {
            // 组码 10/13/14/15/16 为定义点 1–5，11 为文字中点
            let slot = match code {
                10 | 20 => Some(0),
                13 | 23 => Some(1),
                14 | 24 => Some(2),
                15 | 25 => Some(3),
                16 | 26 => Some(4),
                11 | 21 => Some(5),
                _ => None,
            };
            match (slot, code) {
                (Some(index), 10..=16) => {
                    coords[index].0 = Some(parse_f64(value, "DIMENSION 坐标 X")?);
                }
                (Some(index), _) => {
                    coords[index].1 = Some(parse_f64(value, "DIMENSION 坐标 Y")?);
                }
                (None, 8) => layer = Some(value.trim().to_string()),
                (None, 1) => {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        text = Some(decode_mtext_content(trimmed));
                    }
                }
                (None, 42) => measurement = Some(parse_f64(value, "DIMENSION 测量值（组码 42）")?),
                _ => {}
            }
            Ok(())
        })?;

        let point = |index: usize| match coords[index] {
            (Some(x), Some(y)) => Some(Point2::new(x, y)),
            _ => None,
        };
        Ok(Entity::Dimension(Dimension {
            definition_point: point(0),
            definition_point2: point(1),
            definition_point3: point(2),
            definition_point4: point(3),
            definition_point5: point(4),
            text_midpoint: point(5),
            text,
            measurement,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_unsupported(&mut self, kind: &str) -> Result<Entity, DxfError> {
        let mut layer = None;
        self.read_fields(kind, |code, value| {
            if code == 8 {
                layer = Some(value.trim().to_string());
            }
            Ok(())
        })?;
        Ok(Entity::Unsupported(Unsupported {
            kind: kind.to_string(),
            layer: layer_or_default(layer),
        }))
    }

    /// 逐个读取实体体内的组码，遇到下一个 0 组码时回退并结束。
    fn read_fields<F>(&mut self, kind: &str, mut visit: F) -> Result<(), DxfError>
    where
        F: FnMut(i32, &str) -> Result<(), DxfError>,
    {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    return Ok(());
                }
                Some((code, value)) => {
                    if code == 67 {
                        self.in_paperspace = value.trim() == "1";
                    }
                    visit(code, &value)?
                }
                None => return Err(DxfError::syntax(format!("{kind} 未正确结束"))),
            }
        }
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HatchStage {
    Header,
    Boundary,
    Trailer,
}

/// 单个边界环的累积器。多段线环直接收集顶点，边环把每条边离散为点。
struct BoundaryBuilder {
    is_polyline: bool,
    is_closed: bool,
    vertices: Vec<Point2>,
    pending_x: Option<f64>,
    edge: Option<EdgeBuilder>,
}

impl BoundaryBuilder {
    fn new(flags: i32) -> Self {
        let is_polyline = flags & 0x02 != 0;
        Self {
            is_polyline,
            // 边环总是闭合；多段线环以组码 73 为准
            is_closed: !is_polyline,
            vertices: Vec::new(),
            pending_x: None,
            edge: None,
        }
    }

    fn accept(&mut self, code: i32, value: &str) -> Result<(), DxfError> {
        if self.is_polyline {
            match code {
                10 => self.pending_x = Some(parse_f64(value, "HATCH 多段线顶点 X")?),
                20 => {
                    let y = parse_f64(value, "HATCH 多段线顶点 Y")?;
                    let x = self.pending_x.take().ok_or_else(|| {
                        DxfError::invalid("HATCH 多段线顶点缺少对应的 X（组码 10）")
                    })?;
                    self.vertices.push(Point2::new(x, y));
                }
                73 => self.is_closed = parse_i32(value, "HATCH 多段线闭合标志（组码 73）")? != 0,
                _ => {}
            }
            return Ok(());
        }

        if code == 72 {
            if let Some(edge) = self.edge.take() {
                edge.flatten_into(&mut self.vertices);
            }
            self.edge = Some(EdgeBuilder::new(parse_i32(value, "HATCH 边类型（组码 72）")?));
            return Ok(());
        }
        if let Some(edge) = self.edge.as_mut() {
            edge.accept(code, value)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<HatchLoop, DxfError> {
        if self.pending_x.is_some() {
            return Err(DxfError::invalid("HATCH 多段线顶点不完整（组码 10/20）"));
        }
        if let Some(edge) = self.edge.take() {
            edge.flatten_into(&mut self.vertices);
        }
        Ok(HatchLoop {
            vertices: self.vertices,
            is_closed: self.is_closed,
        })
    }
}

const EDGE_LINE: i32 = 1;
const EDGE_ARC: i32 = 2;
const EDGE_ELLIPSE: i32 = 3;
const EDGE_SPLINE: i32 = 4;

/// 边界边：直线、圆弧、椭圆弧取几何参数，样条取控制点与拟合点近似。
struct EdgeBuilder {
    kind: i32,
    first: (Option<f64>, Option<f64>),
    second: (Option<f64>, Option<f64>),
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    ccw: bool,
    spline_points: Vec<Point2>,
}

impl EdgeBuilder {
    fn new(kind: i32) -> Self {
        Self {
            kind,
            first: (None, None),
            second: (None, None),
            radius: 0.0,
            start_angle: 0.0,
            end_angle: 360.0,
            ccw: true,
            spline_points: Vec::new(),
        }
    }

    fn accept(&mut self, code: i32, value: &str) -> Result<(), DxfError> {
        if self.kind == EDGE_SPLINE {
            match code {
                10 | 11 => self.first.0 = Some(parse_f64(value, "HATCH 样条点 X")?),
                20 | 21 => {
                    let y = parse_f64(value, "HATCH 样条点 Y")?;
                    if let Some(x) = self.first.0.take() {
                        self.spline_points.push(Point2::new(x, y));
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        match code {
            10 => self.first.0 = Some(parse_f64(value, "HATCH 边坐标 X（组码 10）")?),
            20 => self.first.1 = Some(parse_f64(value, "HATCH 边坐标 Y（组码 20）")?),
            11 => self.second.0 = Some(parse_f64(value, "HATCH 边坐标 X（组码 11）")?),
            21 => self.second.1 = Some(parse_f64(value, "HATCH 边坐标 Y（组码 21）")?),
            // 圆弧为半径，椭圆弧为短长轴比
            40 => self.radius = parse_f64(value, "HATCH 边半径（组码 40）")?,
            50 => self.start_angle = parse_f64(value, "HATCH 边起始角（组码 50）")?,
            51 => self.end_angle = parse_f64(value, "HATCH 边终止角（组码 51）")?,
            73 => self.ccw = parse_i32(value, "HATCH 边方向（组码 73）")? != 0,
            _ => {}
        }
        Ok(())
    }

    fn flatten_into(self, out: &mut Vec<Point2>) {
        let first = match self.first {
            (Some(x), Some(y)) => Some(DVec2::new(x, y)),
            _ => None,
        };
        let second = match self.second {
            (Some(x), Some(y)) => Some(DVec2::new(x, y)),
            _ => None,
        };
        match (self.kind, first, second) {
            (EDGE_LINE, Some(start), Some(end)) => {
                push_distinct(out, Point2::from_vec(start));
                push_distinct(out, Point2::from_vec(end));
            }
            (EDGE_ARC, Some(center), _) => {
                let major = DVec2::new(self.radius, 0.0);
                self.sample_elliptical(out, center, major, 1.0);
            }
            (EDGE_ELLIPSE, Some(center), Some(major)) => {
                self.sample_elliptical(out, center, major, self.radius);
            }
            (EDGE_SPLINE, _, _) => {
                for point in self.spline_points {
                    push_distinct(out, point);
                }
            }
            _ => {}
        }
    }

    /// 顺时针边的角度按镜像存储，取负后沿顺时针方向采样。
    fn sample_elliptical(&self, out: &mut Vec<Point2>, center: DVec2, major: DVec2, ratio: f64) {
        let minor = major.perp() * ratio;
        let (start, sweep, direction) = if self.ccw {
            (
                self.start_angle,
                ccw_sweep_degrees(self.start_angle, self.end_angle),
                1.0,
            )
        } else {
            (
                -self.start_angle,
                ccw_sweep_degrees(-self.end_angle, -self.start_angle),
                -1.0,
            )
        };
        for step in 0..=HATCH_ARC_SEGMENTS {
            let t = step as f64 / HATCH_ARC_SEGMENTS as f64;
            let angle = (start + direction * sweep * t).to_radians();
            let point = center + major * angle.cos() + minor * angle.sin();
            push_distinct(out, Point2::from_vec(point));
        }
    }
}

fn push_distinct(out: &mut Vec<Point2>, point: Point2) {
    if out.last() != Some(&point) {
        out.push(point);
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    /// 读取下一组 (组码, 值)，跳过 999 注释。
    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        loop {
            let code_line = loop {
                match self.lines.next() {
                    Some(line) => {
                        self.line_number += 1;
                        // 文件末尾的空行不构成组码
                        if !line.trim().is_empty() {
                            break line;
                        }
                    }
                    None => return Ok(None),
                }
            };

            let value_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => {
                    return Err(DxfError::syntax(format!(
                        "文件在第 {} 行结束，缺少与组码对应的值行",
                        self.line_number
                    )));
                }
            };

            let code = code_line.trim().parse::<i32>().map_err(|_| {
                DxfError::syntax(format!(
                    "第 {} 行的组码 \"{}\" 无法解析为整数",
                    self.line_number - 1,
                    code_line.trim()
                ))
            })?;
            if code == 999 {
                continue;
            }
            let value = value_line.trim_end_matches('\r').to_string();
            return Ok(Some((code, value)));
        }
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

fn layer_or_default(layer: Option<String>) -> String {
    layer
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_LAYER.to_string())
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn required<T>(slot: Option<T>, message: &str) -> Result<T, DxfError> {
    slot.ok_or_else(|| DxfError::invalid(message))
}

fn required_point(x: Option<f64>, y: Option<f64>, message: &str) -> Result<Point2, DxfError> {
    match (x, y) {
        (Some(x), Some(y)) => Ok(Point2::new(x, y)),
        _ => Err(DxfError::invalid(message)),
    }
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

/// 解码 MTEXT 内联格式：`\P` 换行、`\~` 不换行空格，字体/高度/颜色等带参数的
/// 控制码整体丢弃，`\S` 堆叠分数保留为 `a/b`，未转义的花括号移除。
pub(crate) fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('P') => result.push('\n'),
                Some('~') => result.push(' '),
                Some(escaped @ ('\\' | '{' | '}')) => result.push(escaped),
                Some('f' | 'F' | 'H' | 'h' | 'C' | 'c' | 'T' | 'Q' | 'W' | 'A' | 'p') => {
                    for skipped in chars.by_ref() {
                        if skipped == ';' {
                            break;
                        }
                    }
                }
                Some('S') => {
                    for stacked in chars.by_ref() {
                        match stacked {
                            ';' => break,
                            '^' | '#' => result.push('/'),
                            other => result.push(other),
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k' | 'N') => {}
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            '{' | '}' => {}
            other => result.push(other),
        }
    }
    result
}

/// 解码 TEXT 中的 `%%` 控制序列。
pub(crate) fn decode_text_specials(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(index) = rest.find("%%") {
        result.push_str(&rest[..index]);
        let tail = &rest[index + 2..];
        let mut chars = tail.chars();
        match chars.next() {
            Some('d' | 'D') => result.push('°'),
            Some('p' | 'P') => result.push('±'),
            Some('c' | 'C') => result.push('⌀'),
            Some('%') => result.push('%'),
            Some('u' | 'U' | 'o' | 'O' | 'k' | 'K') => {}
            Some(other) => {
                result.push_str("%%");
                result.push(other);
            }
            None => result.push_str("%%"),
        }
        rest = chars.as_str();
    }
    result.push_str(rest);
    result
}
