use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cadthumb_config::{ReaderConfig, ReaderKind, TextEncoding};
use cadthumb_core::document::Document;
use encoding_rs::Encoding;
use thiserror::Error;
use tracing::debug;

mod dxf;

use dxf::DxfParser;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("input file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("input file is empty: {0:?}")]
    EmptyInput(PathBuf),
    #[error("unreadable document {path:?}: {message}")]
    UnreadableFormat { path: PathBuf, message: String },
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl IoError {
    /// 供 JSON 错误记录使用的稳定类别名。
    pub fn kind(&self) -> &'static str {
        match self {
            IoError::NotFound(_) => "not_found",
            IoError::EmptyInput(_) => "empty_input",
            IoError::UnreadableFormat { .. } => "unreadable_format",
            IoError::ReadError { .. } => "read_error",
        }
    }
}

/// 几何读取器的抽象：给定路径，返回只读文档。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;

    /// 读取器名称，用于日志。
    fn name(&self) -> &'static str;
}

/// 按配置选择读取器，整个进程只决定一次。
pub fn loader_for(config: &ReaderConfig) -> Box<dyn DocumentLoader> {
    match config.kind {
        ReaderKind::Dxf => Box::new(DxfFacade::with_encodings(config.encodings.clone())),
        ReaderKind::Snapshot => Box::new(SnapshotFacade::new()),
    }
}

/// DXF 文本读取器，按顺序尝试候选编码直至解析成功。
pub struct DxfFacade {
    encodings: Vec<TextEncoding>,
}

impl DxfFacade {
    pub fn new() -> Self {
        Self::with_encodings(TextEncoding::FALLBACK_ORDER.to_vec())
    }

    pub fn with_encodings(encodings: Vec<TextEncoding>) -> Self {
        Self { encodings }
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let bytes = read_source(path)?;
        let mut last_error: Option<String> = None;
        for &encoding in &self.encodings {
            let Some(text) = decode_strict(&bytes, encoding) else {
                debug!(encoding = encoding.label(), "编码无法严格解码，尝试下一个");
                last_error = Some(format!("bytes are not valid {}", encoding.label()));
                continue;
            };
            match DxfParser::new(&text).parse() {
                Ok(document) => {
                    debug!(
                        encoding = encoding.label(),
                        entities = document.entity_count(),
                        "DXF 解析完成"
                    );
                    return Ok(document);
                }
                Err(err) => {
                    debug!(encoding = encoding.label(), error = %err, "DXF 解析失败，尝试下一个编码");
                    last_error = Some(err.to_string());
                }
            }
        }
        Err(IoError::UnreadableFormat {
            path: path.to_path_buf(),
            message: last_error.unwrap_or_else(|| "no candidate encodings configured".to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "dxf"
    }
}

/// 读取以 JSON 序列化的 `Document` 快照。
pub struct SnapshotFacade;

impl SnapshotFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SnapshotFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for SnapshotFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let bytes = read_source(path)?;
        serde_json::from_slice(&bytes).map_err(|err| IoError::UnreadableFormat {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, IoError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => IoError::NotFound(path.to_path_buf()),
        _ => IoError::ReadError {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if bytes.is_empty() {
        return Err(IoError::EmptyInput(path.to_path_buf()));
    }
    Ok(bytes)
}

/// 严格解码：出现任何替换字符即视为失败。
fn decode_strict(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    if encoding == TextEncoding::Ascii && !bytes.is_ascii() {
        return None;
    }
    let codec = Encoding::for_label(encoding.label().as_bytes())?;
    let (text, had_errors) = codec.decode_with_bom_removal(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_decoding_rejects_invalid_sequences() {
        let bytes = b"0\nSECTION\n\xe6\x0a";
        assert!(decode_strict(bytes, TextEncoding::Utf8).is_none());
        assert!(decode_strict(bytes, TextEncoding::Cp1252).is_some());
    }

    #[test]
    fn ascii_decoding_requires_seven_bit_input() {
        assert_eq!(
            decode_strict(b"0\nEOF\n", TextEncoding::Ascii).as_deref(),
            Some("0\nEOF\n")
        );
        assert!(decode_strict("Łódź".as_bytes(), TextEncoding::Ascii).is_none());
    }

    #[test]
    fn cp1250_maps_central_european_letters() {
        // 0xB3 在 CP1250 中为 'ł'
        let text = decode_strict(&[0x41, 0xB3], TextEncoding::Cp1250).expect("decode");
        assert_eq!(text, "Ał");
    }

    #[test]
    fn error_kinds_are_stable() {
        let path = PathBuf::from("a.dxf");
        assert_eq!(IoError::NotFound(path.clone()).kind(), "not_found");
        assert_eq!(IoError::EmptyInput(path.clone()).kind(), "empty_input");
        assert_eq!(
            IoError::UnreadableFormat {
                path,
                message: String::new()
            }
            .kind(),
            "unreadable_format"
        );
    }

    #[test]
    fn loader_selection_follows_reader_kind() {
        let mut config = ReaderConfig::default();
        assert_eq!(loader_for(&config).name(), "dxf");
        config.kind = ReaderKind::Snapshot;
        assert_eq!(loader_for(&config).name(), "snapshot");
    }
}
