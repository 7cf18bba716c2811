use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 覆盖配置路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "CADTHUMB_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `CADTHUMB_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 几何读取器的实现选择，启动时确定一次。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderKind {
    #[default]
    Dxf,
    /// 以 JSON 序列化的文档快照。
    Snapshot,
}

/// DXF 文本的候选编码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin-1", alias = "latin1")]
    Latin1,
    #[serde(rename = "ascii")]
    Ascii,
    #[serde(rename = "cp1250")]
    Cp1250,
    #[serde(rename = "cp1252")]
    Cp1252,
}

impl TextEncoding {
    /// 默认尝试顺序。
    pub const FALLBACK_ORDER: [TextEncoding; 5] = [
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Ascii,
        TextEncoding::Cp1250,
        TextEncoding::Cp1252,
    ];

    /// WHATWG 编码标签，可直接交给 `encoding_rs::Encoding::for_label`。
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Ascii => "ascii",
            TextEncoding::Cp1250 => "windows-1250",
            TextEncoding::Cp1252 => "windows-1252",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    #[serde(default)]
    pub kind: ReaderKind,
    #[serde(default = "ReaderConfig::default_encodings")]
    pub encodings: Vec<TextEncoding>,
}

impl ReaderConfig {
    fn default_encodings() -> Vec<TextEncoding> {
        TextEncoding::FALLBACK_ORDER.to_vec()
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            kind: ReaderKind::default(),
            encodings: Self::default_encodings(),
        }
    }
}

/// 视口与渲染参数。
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_margin_percent")]
    pub margin_percent: f64,
    #[serde(default = "RenderConfig::default_min_dimension")]
    pub min_dimension: f64,
    #[serde(default = "RenderConfig::default_max_dimension")]
    pub max_dimension: f64,
    #[serde(default = "RenderConfig::default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "RenderConfig::default_max_block_depth")]
    pub max_block_depth: usize,
    #[serde(default = "RenderConfig::default_background")]
    pub background: String,
    #[serde(default = "RenderConfig::default_hatch_opacity")]
    pub hatch_opacity: f64,
}

impl RenderConfig {
    fn default_margin_percent() -> f64 {
        0.1
    }

    fn default_min_dimension() -> f64 {
        100.0
    }

    fn default_max_dimension() -> f64 {
        4096.0
    }

    fn default_stroke_width() -> f64 {
        1.0
    }

    fn default_max_block_depth() -> usize {
        16
    }

    fn default_background() -> String {
        "#ffffff".to_string()
    }

    fn default_hatch_opacity() -> f64 {
        0.3
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin_percent: Self::default_margin_percent(),
            min_dimension: Self::default_min_dimension(),
            max_dimension: Self::default_max_dimension(),
            stroke_width: Self::default_stroke_width(),
            max_block_depth: Self::default_max_block_depth(),
            background: Self::default_background(),
            hatch_opacity: Self::default_hatch_opacity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_returned_when_file_missing() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.reader.kind, ReaderKind::Dxf);
        assert_eq!(cfg.reader.encodings, TextEncoding::FALLBACK_ORDER.to_vec());
        assert!((cfg.render.margin_percent - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.render.min_dimension, 100.0);
        assert_eq!(cfg.render.max_dimension, 4096.0);
        assert_eq!(cfg.render.max_block_depth, 16);
        assert_eq!(cfg.render.background, "#ffffff");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [reader]
            kind = "snapshot"
            encodings = ["cp1250", "utf-8"]

            [render]
            margin_percent = 0.05
            max_dimension = 2048.0
            max_block_depth = 4
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.reader.kind, ReaderKind::Snapshot);
        assert_eq!(
            cfg.reader.encodings,
            vec![TextEncoding::Cp1250, TextEncoding::Utf8]
        );
        assert!((cfg.render.margin_percent - 0.05).abs() < f64::EPSILON);
        assert_eq!(cfg.render.max_dimension, 2048.0);
        assert_eq!(cfg.render.min_dimension, 100.0);
        assert_eq!(cfg.render.max_block_depth, 4);
    }

    #[test]
    fn unknown_encoding_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[reader]\nencodings = [\"ebcdic\"]").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
