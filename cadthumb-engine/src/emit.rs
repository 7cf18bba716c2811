//! 输出文档：SVG 文本、JSON 元数据记录与出错时的兜底 SVG。

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use cadthumb_core::document::Document;
use serde::Serialize;

use crate::bounds::Resolved;
use crate::render::{Primitive, TextAnchor};
use crate::style::Stroke;
use crate::viewport::Viewport;

pub const DEFAULT_BACKGROUND: &str = "#ffffff";
const FONT_FAMILY: &str = "Arial, sans-serif";

/// 兜底 SVG 的尺寸与每行字符数。
const FALLBACK_SIZE: u32 = 300;
const FALLBACK_LINE_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct SvgEmitter {
    background: String,
}

impl Default for SvgEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND)
    }
}

impl SvgEmitter {
    pub fn new(background: impl Into<String>) -> Self {
        Self {
            background: background.into(),
        }
    }

    /// 按输入顺序输出图元，末尾附带尺寸元数据。
    pub fn emit(&self, primitives: &[Primitive], viewport: &Viewport) -> String {
        let mut out = String::with_capacity(256 + primitives.len() * 96);
        // 写入 String 不会失败
        let _ = self.write_document(&mut out, primitives, viewport);
        out
    }

    fn write_document(
        &self,
        out: &mut String,
        primitives: &[Primitive],
        viewport: &Viewport,
    ) -> fmt::Result {
        let width = fmt_num(viewport.width);
        let height = fmt_num(viewport.height);
        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#)?;
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" preserveAspectRatio="xMidYMid meet">"#
        )?;
        writeln!(
            out,
            r#"  <rect x="0" y="0" width="{width}" height="{height}" fill="{}"/>"#,
            xml_escape(&self.background)
        )?;
        writeln!(
            out,
            r#"  <g id="entities" fill="none" stroke-linecap="round" stroke-linejoin="round">"#
        )?;
        for primitive in primitives {
            out.push_str("    ");
            write_primitive(out, primitive)?;
            out.push('\n');
        }
        writeln!(out, "  </g>")?;
        write_metadata(out, viewport)?;
        writeln!(out, "</svg>")
    }
}

fn write_primitive(out: &mut String, primitive: &Primitive) -> fmt::Result {
    match primitive {
        Primitive::Line { start, end, stroke } => write!(
            out,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}"{}/>"#,
            fmt_num(start.x()),
            fmt_num(start.y()),
            fmt_num(end.x()),
            fmt_num(end.y()),
            stroke_attrs(stroke)
        ),
        Primitive::Ellipse {
            center,
            rx,
            ry,
            rotation,
            stroke,
        } => {
            let (cx, cy) = (fmt_num(center.x()), fmt_num(center.y()));
            if (rx - ry).abs() <= 1e-9 * rx.abs().max(1.0) {
                write!(
                    out,
                    r#"<circle cx="{cx}" cy="{cy}" r="{}"{}/>"#,
                    fmt_num(*rx),
                    stroke_attrs(stroke)
                )
            } else {
                write!(
                    out,
                    r#"<ellipse cx="{cx}" cy="{cy}" rx="{}" ry="{}"{}{}/>"#,
                    fmt_num(*rx),
                    fmt_num(*ry),
                    rotate_attr(*rotation, &cx, &cy),
                    stroke_attrs(stroke)
                )
            }
        }
        Primitive::Arc {
            start,
            end,
            rx,
            ry,
            x_axis_rotation,
            large_arc,
            sweep,
            stroke,
        } => write!(
            out,
            r#"<path d="M {} {} A {} {} {} {} {} {} {}"{}/>"#,
            fmt_num(start.x()),
            fmt_num(start.y()),
            fmt_num(*rx),
            fmt_num(*ry),
            fmt_num(*x_axis_rotation),
            u8::from(*large_arc),
            u8::from(*sweep),
            fmt_num(end.x()),
            fmt_num(end.y()),
            stroke_attrs(stroke)
        ),
        Primitive::Polyline {
            points,
            closed,
            fill,
            stroke,
        } => {
            let tag = if *closed { "polygon" } else { "polyline" };
            let coords = points
                .iter()
                .map(|point| format!("{},{}", fmt_num(point.x()), fmt_num(point.y())))
                .collect::<Vec<_>>()
                .join(" ");
            let fill_attrs = match fill {
                Some(fill) => format!(
                    r#" fill="{}" fill-opacity="{}""#,
                    xml_escape(&fill.color),
                    fmt_num(fill.opacity)
                ),
                None => String::new(),
            };
            write!(
                out,
                r#"<{tag} points="{coords}"{fill_attrs}{}/>"#,
                stroke_attrs(stroke)
            )
        }
        Primitive::Text {
            position,
            content,
            size,
            rotation,
            anchor,
            stroke,
        } => {
            let (x, y) = (fmt_num(position.x()), fmt_num(position.y()));
            let anchor_attr = match anchor {
                TextAnchor::Start => "",
                TextAnchor::Middle => r#" text-anchor="middle""#,
            };
            write!(
                out,
                r#"<text x="{x}" y="{y}" font-family="{FONT_FAMILY}" font-size="{}" fill="{}" stroke="none"{anchor_attr}{}>{}</text>"#,
                fmt_num(*size),
                xml_escape(&stroke.color),
                rotate_attr(*rotation, &x, &y),
                xml_escape(content)
            )
        }
    }
}

fn stroke_attrs(stroke: &Stroke) -> String {
    let mut attrs = format!(
        r#" stroke="{}" stroke-width="{}""#,
        xml_escape(&stroke.color),
        fmt_num(stroke.width)
    );
    if let Some(dashes) = stroke.pattern.dash_array(stroke.width) {
        let joined = dashes.iter().map(|value| fmt_num(*value)).collect::<Vec<_>>().join(" ");
        attrs.push_str(&format!(r#" stroke-dasharray="{joined}""#));
    }
    attrs
}

fn rotate_attr(rotation: f64, x: &str, y: &str) -> String {
    let degrees = fmt_num(rotation);
    if degrees == "0" {
        String::new()
    } else {
        format!(r#" transform="rotate({degrees} {x} {y})""#)
    }
}

fn write_metadata(out: &mut String, viewport: &Viewport) -> fmt::Result {
    let bounds = &viewport.bounds;
    writeln!(out, "  <metadata>")?;
    writeln!(out, "    <dimensions>")?;
    writeln!(out, "      <width>{}</width>", fmt_num(bounds.width()))?;
    writeln!(out, "      <height>{}</height>", fmt_num(bounds.height()))?;
    writeln!(out, "      <minX>{}</minX>", fmt_num(bounds.min().x()))?;
    writeln!(out, "      <minY>{}</minY>", fmt_num(bounds.min().y()))?;
    writeln!(out, "      <maxX>{}</maxX>", fmt_num(bounds.max().x()))?;
    writeln!(out, "      <maxY>{}</maxY>", fmt_num(bounds.max().y()))?;
    writeln!(out, "      <units>{}</units>", xml_escape(viewport.unit.symbol()))?;
    writeln!(out, "    </dimensions>")?;
    writeln!(out, "  </metadata>")
}

/// 固定 300×300 的错误提示 SVG。消息按字符截断为两行，共 100 个字符。
pub fn fallback_svg(message: &str) -> String {
    let first: String = message.chars().take(FALLBACK_LINE_CHARS).collect();
    let second: String = message
        .chars()
        .skip(FALLBACK_LINE_CHARS)
        .take(FALLBACK_LINE_CHARS)
        .collect();
    let size = FALLBACK_SIZE;
    format!(
        r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}" preserveAspectRatio="xMidYMid meet">
  <rect width="{size}" height="{size}" fill="#f8f8f8"/>
  <text x="20" y="80" font-family="Arial" font-size="16" fill="red">Error converting DXF to SVG:</text>
  <text x="20" y="110" font-family="Arial" font-size="12">{}</text>
  <text x="20" y="130" font-family="Arial" font-size="12">{}</text>
</svg>
"##,
        xml_escape(&first),
        xml_escape(&second)
    )
}

pub fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            // XML 1.0 不允许的控制字符直接丢弃
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => escaped.push(c),
        }
    }
    escaped
}

/// 保留三位小数并去掉尾随零，`-0` 输出为 `0`。
pub fn fmt_num(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" || trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub name: String,
    pub color: i16,
    pub linetype: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockInfo {
    pub name: String,
    pub entity_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityCount {
    pub entities: usize,
    pub layers: usize,
    pub entity_types: BTreeMap<String, usize>,
}

/// `json` 输出：文档尺寸、单位、计数、图层与块。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub filesize: u64,
    pub width: f64,
    pub height: f64,
    pub units: String,
    #[serde(rename = "minX")]
    pub min_x: f64,
    #[serde(rename = "minY")]
    pub min_y: f64,
    #[serde(rename = "maxX")]
    pub max_x: f64,
    #[serde(rename = "maxY")]
    pub max_y: f64,
    pub count: EntityCount,
    pub layers: Vec<LayerInfo>,
    pub blocks: Vec<BlockInfo>,
}

impl DocumentInfo {
    pub fn collect(document: &Document, resolved: &Resolved, filename: &str, filesize: u64) -> Self {
        let bounds = &resolved.bounds;
        let layers = layer_infos(document);
        // 匿名块（`*` 开头）不列出
        let blocks = document
            .blocks()
            .filter(|block| !block.name.starts_with('*'))
            .map(|block| BlockInfo {
                name: block.name.clone(),
                entity_count: block.entities.len(),
            })
            .collect();

        Self {
            filename: filename.to_string(),
            filesize,
            width: bounds.width(),
            height: bounds.height(),
            units: resolved.unit.symbol().to_string(),
            min_x: bounds.min().x(),
            min_y: bounds.min().y(),
            max_x: bounds.max().x(),
            max_y: bounds.max().y(),
            count: EntityCount {
                entities: document.entity_count(),
                layers: layers.len(),
                entity_types: entity_type_counts(document),
            },
            layers,
            blocks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundsInfo {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

/// `info` 输出：精简摘要。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoSummary {
    pub filename: String,
    pub layers: Vec<LayerInfo>,
    pub entity_counts: BTreeMap<String, usize>,
    pub total_entities: usize,
    pub bounds: BoundsInfo,
}

impl InfoSummary {
    pub fn collect(document: &Document, resolved: &Resolved, filename: &str) -> Self {
        let bounds = &resolved.bounds;
        let center = bounds.center();
        Self {
            filename: filename.to_string(),
            layers: layer_infos(document),
            entity_counts: entity_type_counts(document),
            total_entities: document.entity_count(),
            bounds: BoundsInfo {
                min_x: bounds.min().x(),
                min_y: bounds.min().y(),
                max_x: bounds.max().x(),
                max_y: bounds.max().y(),
                width: bounds.width(),
                height: bounds.height(),
                center_x: center.x(),
                center_y: center.y(),
            },
        }
    }
}

/// 读取失败时 `json`/`info` 输出的错误记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub error: String,
    pub kind: String,
}

impl ErrorRecord {
    pub fn new(error: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.into(),
        }
    }
}

fn layer_infos(document: &Document) -> Vec<LayerInfo> {
    document
        .layers()
        .map(|layer| LayerInfo {
            name: layer.name.clone(),
            color: layer.color,
            linetype: layer.linetype.clone(),
        })
        .collect()
}

fn entity_type_counts(document: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entity in document.entities() {
        *counts.entry(entity.dxf_type().to_string()).or_insert(0) += 1;
    }
    counts
}
