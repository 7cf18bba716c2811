use std::path::Path;

use cadthumb_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("未知的输出格式 `{0}`，可选 svg、json、info")]
    UnknownFormat(String),
    #[error(transparent)]
    Load(#[from] IoError),
    #[error("写入输出 {target} 失败: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("序列化输出失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FrontendError {
    pub(crate) fn write_to(path: Option<&Path>, source: std::io::Error) -> Self {
        let target = path.map_or_else(|| "stdout".to_string(), |path| path.display().to_string());
        FrontendError::Write { target, source }
    }

    /// 错误记录中的类别名。
    pub fn kind(&self) -> &'static str {
        match self {
            FrontendError::UnknownFormat(_) => "unknown_format",
            FrontendError::Load(err) => err.kind(),
            FrontendError::Write { .. } => "write_error",
            FrontendError::Serialize(_) => "serialize_error",
        }
    }
}
