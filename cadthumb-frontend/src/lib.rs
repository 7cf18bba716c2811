pub mod convert;
pub mod errors;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use cadthumb_config::AppConfig;
use errors::FrontendError;
use tracing::info;

pub use convert::{Conversion, Converter, OutputFormat};

/// 写出转换产物：给定路径则写文件，否则写到标准输出。
pub fn write_artifact(content: &str, output: Option<&Path>) -> Result<(), FrontendError> {
    match output {
        Some(path) => {
            fs::write(path, content).map_err(|err| FrontendError::write_to(Some(path), err))?;
            info!(path = %path.display(), bytes = content.len(), "已写出转换结果");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|err| FrontendError::write_to(None, err))?;
        }
    }
    Ok(())
}

/// 完整执行一次转换并写出产物。产物写出后才报告转换失败。
pub fn run_conversion(
    config: &AppConfig,
    input: &Path,
    format: &str,
    output: Option<&Path>,
) -> Result<(), FrontendError> {
    let format: OutputFormat = format.parse()?;
    let conversion = Converter::from_config(config).convert(input, format)?;
    write_artifact(&conversion.content, output)?;
    match conversion.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_is_written_to_file() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = dir.path().join("out.svg");
        write_artifact("<svg/>", Some(&path)).expect("写出");
        assert_eq!(fs::read_to_string(&path).expect("读取"), "<svg/>");
    }

    #[test]
    fn unwritable_target_is_reported() {
        let dir = tempfile::tempdir().expect("临时目录");
        let path = dir.path().join("missing").join("out.svg");
        let err = write_artifact("<svg/>", Some(&path)).unwrap_err();
        assert!(matches!(err, FrontendError::Write { .. }));
        assert_eq!(err.kind(), "write_error");
    }

    #[test]
    fn failed_load_still_writes_error_record() {
        let dir = tempfile::tempdir().expect("临时目录");
        let input = dir.path().join("absent.dxf");
        let output = dir.path().join("absent.json");
        let err = run_conversion(&AppConfig::default(), &input, "json", Some(&output)).unwrap_err();
        assert_eq!(err.kind(), "not_found");
        let written = fs::read_to_string(&output).expect("错误记录");
        assert!(written.contains("\"error\""));
        assert!(written.contains("not_found"));
    }

    #[test]
    fn unknown_format_writes_nothing() {
        let dir = tempfile::tempdir().expect("临时目录");
        let output = dir.path().join("out.png");
        let err = run_conversion(&AppConfig::default(), &output, "png", Some(&output)).unwrap_err();
        assert!(matches!(err, FrontendError::UnknownFormat(_)));
        assert!(!output.exists());
    }
}
