//! 图层样式：AutoCAD 颜色索引与线型到 SVG 描边的映射。

use std::collections::HashMap;

use cadthumb_core::document::Document;

pub const DEFAULT_STROKE_COLOR: &str = "#000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LinePattern {
    /// 线型名按前缀识别，大小写不敏感；其余一律实线。
    pub fn from_linetype(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        if upper.starts_with("DASHDOT") {
            LinePattern::DashDot
        } else if upper.starts_with("DASHED") || upper.starts_with("HIDDEN") {
            LinePattern::Dashed
        } else if upper.starts_with("DOT") {
            LinePattern::Dotted
        } else {
            LinePattern::Solid
        }
    }

    /// `stroke-dasharray` 数值，随线宽缩放；实线返回 `None`。
    pub fn dash_array(self, width: f64) -> Option<Vec<f64>> {
        match self {
            LinePattern::Solid => None,
            LinePattern::Dashed => Some(vec![6.0 * width, 3.0 * width]),
            LinePattern::Dotted => Some(vec![width, 2.0 * width]),
            LinePattern::DashDot => Some(vec![6.0 * width, 2.0 * width, width, 2.0 * width]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub pattern: LinePattern,
    pub width: f64,
}

impl Stroke {
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            pattern: LinePattern::Solid,
            width,
        }
    }

    pub fn with_pattern(mut self, pattern: LinePattern) -> Self {
        self.pattern = pattern;
        self
    }
}

/// 图层名 → 描边样式。
#[derive(Debug, Clone)]
pub struct LayerStyles {
    strokes: HashMap<String, Stroke>,
    fallback: Stroke,
}

impl LayerStyles {
    pub fn from_document(document: &Document, stroke_width: f64) -> Self {
        let strokes = document
            .layers()
            .map(|layer| {
                let stroke = Stroke::solid(aci_to_hex(layer.color), stroke_width)
                    .with_pattern(LinePattern::from_linetype(&layer.linetype));
                (layer.name.clone(), stroke)
            })
            .collect();
        Self {
            strokes,
            fallback: Stroke::solid(DEFAULT_STROKE_COLOR, stroke_width),
        }
    }

    /// 未知图层返回黑色实线。
    pub fn lookup(&self, layer: &str) -> &Stroke {
        self.strokes.get(layer).unwrap_or(&self.fallback)
    }
}

/// AutoCAD 颜色索引转十六进制颜色。负值（关闭的图层）取绝对值；
/// 0（随块）、7（白/黑）与 256（随层）在白底上统一画成黑色。
pub fn aci_to_hex(index: i16) -> String {
    let index = index.unsigned_abs();
    let fixed = match index {
        1 => Some("#ff0000"),
        2 => Some("#ffff00"),
        3 => Some("#00ff00"),
        4 => Some("#00ffff"),
        5 => Some("#0000ff"),
        6 => Some("#ff00ff"),
        0 | 7 | 256 => Some(DEFAULT_STROKE_COLOR),
        8 => Some("#808080"),
        9 => Some("#c0c0c0"),
        _ => None,
    };
    if let Some(color) = fixed {
        return color.to_string();
    }

    match index {
        250..=255 => {
            let level = 0x33 + (index - 250) * 0x22;
            format!("#{level:02x}{level:02x}{level:02x}")
        }
        10..=249 => format!("#{:06x}", ACI_PALETTE[usize::from(index - 10)]),
        _ => DEFAULT_STROKE_COLOR.to_string(),
    }
}

/// AutoCAD 标准调色板 10–249：每行一个色相（15° 步进），
/// 依次为五档亮度（255/165/127/76/38），每档先纯色后淡色。
#[rustfmt::skip]
const ACI_PALETTE: [u32; 240] = [
    0xff0000, 0xff7f7f, 0xa50000, 0xa55252, 0x7f0000, 0x7f3f3f, 0x4c0000, 0x4c2626, 0x260000, 0x261313,
    0xff3f00, 0xff9f7f, 0xa52900, 0xa56752, 0x7f1f00, 0x7f4f3f, 0x4c1300, 0x4c2f26, 0x260900, 0x261813,
    0xff7f00, 0xffbf7f, 0xa55200, 0xa57c52, 0x7f3f00, 0x7f5f3f, 0x4c2600, 0x4c3926, 0x261300, 0x261c13,
    0xffbf00, 0xffdf7f, 0xa57c00, 0xa59052, 0x7f5f00, 0x7f6f3f, 0x4c3900, 0x4c4226, 0x261c00, 0x262113,
    0xffff00, 0xffff7f, 0xa5a500, 0xa5a552, 0x7f7f00, 0x7f7f3f, 0x4c4c00, 0x4c4c26, 0x262600, 0x262613,
    0xbfff00, 0xdfff7f, 0x7ca500, 0x90a552, 0x5f7f00, 0x6f7f3f, 0x394c00, 0x424c26, 0x1c2600, 0x212613,
    0x7fff00, 0xbfff7f, 0x52a500, 0x7ca552, 0x3f7f00, 0x5f7f3f, 0x264c00, 0x394c26, 0x132600, 0x1c2613,
    0x3fff00, 0x9fff7f, 0x29a500, 0x67a552, 0x1f7f00, 0x4f7f3f, 0x134c00, 0x2f4c26, 0x092600, 0x182613,
    0x00ff00, 0x7fff7f, 0x00a500, 0x52a552, 0x007f00, 0x3f7f3f, 0x004c00, 0x264c26, 0x002600, 0x132613,
    0x00ff3f, 0x7fff9f, 0x00a529, 0x52a567, 0x007f1f, 0x3f7f4f, 0x004c13, 0x264c2f, 0x002609, 0x132618,
    0x00ff7f, 0x7fffbf, 0x00a552, 0x52a57c, 0x007f3f, 0x3f7f5f, 0x004c26, 0x264c39, 0x002613, 0x13261c,
    0x00ffbf, 0x7fffdf, 0x00a57c, 0x52a590, 0x007f5f, 0x3f7f6f, 0x004c39, 0x264c42, 0x00261c, 0x132621,
    0x00ffff, 0x7fffff, 0x00a5a5, 0x52a5a5, 0x007f7f, 0x3f7f7f, 0x004c4c, 0x264c4c, 0x002626, 0x132626,
    0x00bfff, 0x7fdfff, 0x007ca5, 0x5290a5, 0x005f7f, 0x3f6f7f, 0x00394c, 0x26424c, 0x001c26, 0x132126,
    0x007fff, 0x7fbfff, 0x0052a5, 0x527ca5, 0x003f7f, 0x3f5f7f, 0x00264c, 0x26394c, 0x001326, 0x131c26,
    0x003fff, 0x7f9fff, 0x0029a5, 0x5267a5, 0x001f7f, 0x3f4f7f, 0x00134c, 0x262f4c, 0x000926, 0x131826,
    0x0000ff, 0x7f7fff, 0x0000a5, 0x5252a5, 0x00007f, 0x3f3f7f, 0x00004c, 0x26264c, 0x000026, 0x131326,
    0x3f00ff, 0x9f7fff, 0x2900a5, 0x6752a5, 0x1f007f, 0x4f3f7f, 0x13004c, 0x2f264c, 0x090026, 0x181326,
    0x7f00ff, 0xbf7fff, 0x5200a5, 0x7c52a5, 0x3f007f, 0x5f3f7f, 0x26004c, 0x39264c, 0x130026, 0x1c1326,
    0xbf00ff, 0xdf7fff, 0x7c00a5, 0x9052a5, 0x5f007f, 0x6f3f7f, 0x39004c, 0x42264c, 0x1c0026, 0x211326,
    0xff00ff, 0xff7fff, 0xa500a5, 0xa552a5, 0x7f007f, 0x7f3f7f, 0x4c004c, 0x4c264c, 0x260026, 0x261326,
    0xff00bf, 0xff7fdf, 0xa5007c, 0xa55290, 0x7f005f, 0x7f3f6f, 0x4c0039, 0x4c2642, 0x26001c, 0x261321,
    0xff007f, 0xff7fbf, 0xa50052, 0xa5527c, 0x7f003f, 0x7f3f5f, 0x4c0026, 0x4c2639, 0x260013, 0x26131c,
    0xff003f, 0xff7f9f, 0xa50029, 0xa55267, 0x7f001f, 0x7f3f4f, 0x4c0013, 0x4c262f, 0x260009, 0x261318,
];

#[cfg(test)]
mod tests {
    use cadthumb_core::document::Layer;

    use super::*;

    #[test]
    fn standard_colors_map_to_hex() {
        assert_eq!(aci_to_hex(1), "#ff0000");
        assert_eq!(aci_to_hex(5), "#0000ff");
        assert_eq!(aci_to_hex(7), "#000000");
        assert_eq!(aci_to_hex(256), "#000000");
        assert_eq!(aci_to_hex(-1), "#ff0000");
        assert_eq!(aci_to_hex(250), "#333333");
        assert_eq!(aci_to_hex(255), "#dddddd");
        // 色环起点为纯红
        assert_eq!(aci_to_hex(10), "#ff0000");
        assert_eq!(aci_to_hex(11), "#ff7f7f");
        assert_eq!(aci_to_hex(13), "#a55252");
        assert_eq!(aci_to_hex(33), "#a57c52");
        assert_eq!(aci_to_hex(50), "#ffff00");
        assert_eq!(aci_to_hex(140), "#00bfff");
        assert_eq!(aci_to_hex(249), "#261318");
    }

    #[test]
    fn linetype_names_map_to_patterns() {
        assert_eq!(LinePattern::from_linetype("CONTINUOUS"), LinePattern::Solid);
        assert_eq!(LinePattern::from_linetype("dashed2"), LinePattern::Dashed);
        assert_eq!(LinePattern::from_linetype("DOT"), LinePattern::Dotted);
        assert_eq!(LinePattern::from_linetype("DASHDOT"), LinePattern::DashDot);
        assert_eq!(LinePattern::from_linetype("BORDER"), LinePattern::Solid);
        assert_eq!(LinePattern::Solid.dash_array(1.0), None);
        assert_eq!(LinePattern::Dashed.dash_array(2.0), Some(vec![12.0, 6.0]));
    }

    #[test]
    fn unknown_layer_is_solid_black() {
        let mut doc = Document::new();
        doc.upsert_layer(Layer::with_style("WALLS", 1, "DASHED"));
        let styles = LayerStyles::from_document(&doc, 1.0);

        let walls = styles.lookup("WALLS");
        assert_eq!(walls.color, "#ff0000");
        assert_eq!(walls.pattern, LinePattern::Dashed);

        let unknown = styles.lookup("NOT_A_LAYER");
        assert_eq!(unknown.color, "#000000");
        assert_eq!(unknown.pattern, LinePattern::Solid);
        assert_eq!(unknown.width, 1.0);
    }
}
