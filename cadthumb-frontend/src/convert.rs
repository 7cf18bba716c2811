use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use cadthumb_config::{AppConfig, RenderConfig};
use cadthumb_core::document::Document;
use cadthumb_engine::bounds::{ResolveOptions, Resolved, resolve};
use cadthumb_engine::emit::{DocumentInfo, ErrorRecord, InfoSummary, SvgEmitter, fallback_svg};
use cadthumb_engine::render::{RenderOptions, render_document};
use cadthumb_engine::style::LayerStyles;
use cadthumb_engine::viewport::{ViewportSettings, normalize};
use cadthumb_io::{DocumentLoader, IoError, loader_for};
use tracing::{debug, info, warn};

use crate::errors::FrontendError;

const EMPTY_DRAWING_MESSAGE: &str = "drawing contains no renderable entities";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Json,
    Info,
}

impl FromStr for OutputFormat {
    type Err = FrontendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "json" => Ok(OutputFormat::Json),
            "info" => Ok(OutputFormat::Info),
            _ => Err(FrontendError::UnknownFormat(value.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Json => "json",
            OutputFormat::Info => "info",
        })
    }
}

/// 一次转换的产物。`failure` 不为空时产物仍应写出，但进程以失败退出。
#[derive(Debug)]
pub struct Conversion {
    pub content: String,
    pub failure: Option<FrontendError>,
}

impl Conversion {
    fn succeeded(content: String) -> Self {
        Self {
            content,
            failure: None,
        }
    }

    fn failed(content: String, failure: FrontendError) -> Self {
        Self {
            content,
            failure: Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// 转换流程：读取文档 → 包围盒 → 视口 → 渲染 → 输出。
pub struct Converter {
    loader: Box<dyn DocumentLoader>,
    render: RenderConfig,
}

impl Converter {
    /// 读取器在此处按配置一次性选定。
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_loader(loader_for(&config.reader), config.render.clone())
    }

    pub fn with_loader(loader: Box<dyn DocumentLoader>, render: RenderConfig) -> Self {
        Self { loader, render }
    }

    pub fn convert(&self, input: &Path, format: OutputFormat) -> Result<Conversion, FrontendError> {
        info!(input = %input.display(), %format, loader = self.loader.name(), "开始转换");
        match format {
            OutputFormat::Svg => Ok(self.convert_svg(input)),
            OutputFormat::Json | OutputFormat::Info => self.convert_record(input, format),
        }
    }

    fn convert_svg(&self, input: &Path) -> Conversion {
        match self.loader.load(input) {
            Ok(document) => Conversion::succeeded(self.render_svg(&document)),
            Err(err) => {
                warn!(input = %input.display(), error = %err, "读取失败，输出错误提示 SVG");
                let content = fallback_svg(&err.to_string());
                // 输入不存在时仍给出兜底图，但以失败退出
                if matches!(err, IoError::NotFound(_)) {
                    Conversion::failed(content, err.into())
                } else {
                    Conversion::succeeded(content)
                }
            }
        }
    }

    fn convert_record(&self, input: &Path, format: OutputFormat) -> Result<Conversion, FrontendError> {
        let document = match self.loader.load(input) {
            Ok(document) => document,
            Err(err) => {
                warn!(input = %input.display(), error = %err, "读取失败，输出错误记录");
                let record = ErrorRecord::new(err.to_string(), err.kind());
                let content = serde_json::to_string_pretty(&record)?;
                return Ok(Conversion::failed(content, err.into()));
            }
        };

        let content = match format {
            OutputFormat::Info => serde_json::to_string_pretty(&self.info_summary(input, &document))?,
            _ => serde_json::to_string_pretty(&self.document_info(input, &document))?,
        };
        Ok(Conversion::succeeded(content))
    }

    /// 没有任何可绘制实体时输出错误提示图，而不是一张空白画布。
    pub fn render_svg(&self, document: &Document) -> String {
        let resolved = self.resolve(document);
        if resolved.is_default() {
            warn!(entities = document.entity_count(), "图纸没有可绘制的实体");
            return fallback_svg(EMPTY_DRAWING_MESSAGE);
        }
        let viewport = normalize(&resolved.bounds, resolved.unit, &viewport_settings(&self.render));
        let styles = LayerStyles::from_document(document, self.render.stroke_width);
        let primitives = render_document(document, &viewport, &styles, &render_options(&self.render));
        if primitives.is_empty() {
            warn!(entities = document.entity_count(), "图纸渲染结果为空");
            return fallback_svg(EMPTY_DRAWING_MESSAGE);
        }
        debug!(
            width = viewport.width,
            height = viewport.height,
            scale = viewport.scale,
            primitives = primitives.len(),
            "SVG 视口"
        );
        SvgEmitter::new(self.render.background.clone()).emit(&primitives, &viewport)
    }

    pub fn document_info(&self, input: &Path, document: &Document) -> DocumentInfo {
        let resolved = self.resolve(document);
        let filesize = fs::metadata(input).map_or(0, |meta| meta.len());
        DocumentInfo::collect(document, &resolved, &file_name(input), filesize)
    }

    pub fn info_summary(&self, input: &Path, document: &Document) -> InfoSummary {
        let resolved = self.resolve(document);
        InfoSummary::collect(document, &resolved, &file_name(input))
    }

    fn resolve(&self, document: &Document) -> Resolved {
        resolve(
            document,
            &ResolveOptions {
                max_block_depth: self.render.max_block_depth,
            },
        )
    }
}

fn viewport_settings(render: &RenderConfig) -> ViewportSettings {
    ViewportSettings {
        margin_percent: render.margin_percent,
        min_dimension: render.min_dimension,
        max_dimension: render.max_dimension,
    }
}

fn render_options(render: &RenderConfig) -> RenderOptions {
    RenderOptions {
        max_block_depth: render.max_block_depth,
        hatch_opacity: render.hatch_opacity,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use cadthumb_config::{ReaderConfig, ReaderKind};
    use cadthumb_core::geometry::Point2;
    use serde_json::Value;

    use super::*;

    const SQUARE_DXF: &str = "0\nSECTION\n2\nHEADER\n9\n$INSUNITS\n70\n4\n0\nENDSEC\n\
0\nSECTION\n2\nENTITIES\n\
0\nLINE\n8\n0\n10\n0\n20\n0\n11\n10\n21\n0\n\
0\nCIRCLE\n8\n0\n10\n5\n20\n5\n40\n2\n\
0\nENDSEC\n0\nEOF\n";

    fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("写入测试文件");
        path
    }

    fn converter() -> Converter {
        Converter::from_config(&AppConfig::default())
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("SVG".parse::<OutputFormat>().ok(), Some(OutputFormat::Svg));
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
        assert_eq!(" info ".parse::<OutputFormat>().ok(), Some(OutputFormat::Info));
        let err = "png".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, FrontendError::UnknownFormat(ref name) if name == "png"));
        assert_eq!(err.kind(), "unknown_format");
    }

    #[test]
    fn svg_conversion_renders_document() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(&dir, "square.dxf", SQUARE_DXF);
        let conversion = converter().convert(&path, OutputFormat::Svg).expect("convert");
        assert!(conversion.is_success());
        assert!(conversion.content.contains("<line "));
        assert!(conversion.content.contains("<circle "));
        assert!(conversion.content.contains("<units>mm</units>"));
    }

    #[test]
    fn corrupt_input_yields_fallback_svg_without_failure() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(&dir, "broken.dxf", "this is not a drawing\nat all\n");
        let conversion = converter().convert(&path, OutputFormat::Svg).expect("convert");
        assert!(conversion.is_success());
        assert!(conversion.content.contains("Error converting DXF to SVG:"));
    }

    #[test]
    fn empty_drawing_yields_placeholder_svg() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(&dir, "blank.dxf", "0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n");
        let conversion = converter().convert(&path, OutputFormat::Svg).expect("convert");
        assert!(conversion.content.contains("Error converting DXF to SVG:"));
        assert!(conversion.content.contains("no renderable entities"));
        assert!(!conversion.content.contains(r#"<g id="entities">"#));
    }

    #[test]
    fn drawing_with_only_unsupported_entities_yields_placeholder() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(
            &dir,
            "spline.dxf",
            "0\nSECTION\n2\nENTITIES\n0\nSPLINE\n8\n0\n10\n0\n20\n0\n0\nENDSEC\n0\nEOF\n",
        );
        let conversion = converter().convert(&path, OutputFormat::Svg).expect("convert");
        assert!(conversion.is_success());
        assert!(conversion.content.contains("no renderable entities"));
    }

    #[test]
    fn paperspace_entities_stay_out_of_metadata() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(
            &dir,
            "sheet.dxf",
            "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n0\n10\n0\n20\n0\n11\n10\n21\n0\n0\nLINE\n8\n0\n67\n1\n10\n0\n20\n0\n11\n1000\n21\n500\n0\nENDSEC\n0\nEOF\n",
        );
        let json = converter().convert(&path, OutputFormat::Json).expect("convert");
        let value: Value = serde_json::from_str(&json.content).expect("json");
        assert_eq!(value["maxX"], 10.0);
        assert_eq!(value["maxY"], 0.0);
        assert_eq!(value["count"]["entities"], 1);
    }

    #[test]
    fn invalid_entity_still_renders_its_siblings() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(
            &dir,
            "partial.dxf",
            "0\nSECTION\n2\nENTITIES\n0\nLINE\n8\n0\n10\n0\n20\n0\n11\n10\n21\n0\n0\nTEXT\n8\n0\n10\n1\n20\n1\n1\nLABEL\n0\nENDSEC\n0\nEOF\n",
        );
        let conversion = converter().convert(&path, OutputFormat::Svg).expect("convert");
        assert!(conversion.is_success());
        assert!(conversion.content.contains("<line "));
        assert!(!conversion.content.contains("Error converting DXF to SVG:"));
    }

    #[test]
    fn missing_input_fails_for_every_format() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = dir.path().join("absent.dxf");
        for format in [OutputFormat::Svg, OutputFormat::Json, OutputFormat::Info] {
            let conversion = converter().convert(&path, format).expect("convert");
            assert!(!conversion.is_success(), "{format} 应失败");
        }
    }

    #[test]
    fn json_failure_carries_error_record() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(&dir, "empty.dxf", "");
        let conversion = converter().convert(&path, OutputFormat::Json).expect("convert");
        let value: Value = serde_json::from_str(&conversion.content).expect("json");
        assert_eq!(value["kind"], "empty_input");
        assert!(value["error"].as_str().is_some_and(|msg| !msg.is_empty()));
        assert!(matches!(
            conversion.failure,
            Some(FrontendError::Load(IoError::EmptyInput(_)))
        ));
    }

    #[test]
    fn json_and_info_report_bounds() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = write_fixture(&dir, "square.dxf", SQUARE_DXF);

        let json = converter().convert(&path, OutputFormat::Json).expect("convert");
        let value: Value = serde_json::from_str(&json.content).expect("json");
        assert_eq!(value["filename"], "square.dxf");
        assert_eq!(value["filesize"], SQUARE_DXF.len() as u64);
        assert_eq!(value["minX"], 0.0);
        assert_eq!(value["maxX"], 10.0);
        assert_eq!(value["maxY"], 7.0);
        assert_eq!(value["count"]["entities"], 2);

        let info = converter().convert(&path, OutputFormat::Info).expect("convert");
        let value: Value = serde_json::from_str(&info.content).expect("json");
        assert_eq!(value["total_entities"], 2);
        assert_eq!(value["bounds"]["width"], 10.0);
        assert_eq!(value["entity_counts"]["LINE"], 1);
    }

    #[test]
    fn snapshot_reader_is_selected_from_config() {
        let dir = tempfile::tempdir().expect("临时目录");
        let mut document = Document::new();
        document.add_line(Point2::new(0.0, 0.0), Point2::new(50.0, 25.0), "0");
        let path = write_fixture(
            &dir,
            "drawing.json",
            &serde_json::to_string(&document).expect("serialize"),
        );

        let mut config = AppConfig::default();
        config.reader = ReaderConfig {
            kind: ReaderKind::Snapshot,
            ..ReaderConfig::default()
        };
        let conversion = Converter::from_config(&config)
            .convert(&path, OutputFormat::Svg)
            .expect("convert");
        assert!(conversion.content.contains("<maxX>50</maxX>"));
    }

    #[test]
    fn render_settings_flow_into_svg() {
        let mut config = AppConfig::default();
        config.render.background = "#101010".to_string();
        config.render.stroke_width = 2.5;
        let mut document = Document::new();
        document.add_line(Point2::new(0.0, 0.0), Point2::new(1000.0, 0.0), "0");
        let svg = Converter::from_config(&config).render_svg(&document);
        assert!(svg.contains(r##"fill="#101010""##));
        assert!(svg.contains(r#"stroke-width="2.5""#));
    }
}
