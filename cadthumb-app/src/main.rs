use std::path::PathBuf;
use std::process::ExitCode;

use cadthumb_config::{AppConfig, ConfigError};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// CAD 图纸预览转换工具。
#[derive(Debug, Parser)]
#[command(name = "cadthumb", version, about = "Convert DXF drawings into SVG previews and JSON metadata")]
struct Cli {
    /// 配置文件路径，覆盖自动发现。
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 转换单个图纸文件。
    Convert {
        /// 输入图纸路径。
        input: PathBuf,
        /// 输出格式：svg、json 或 info。
        format: String,
        /// 输出文件路径；省略时写到标准输出。
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = load_configuration(cli.config);
    init_logging(&config);
    // 订阅者安装之后才能看到配置加载失败的警告
    if let Some(err) = config_error {
        report_config_error(&err);
    }
    info!("启动 cadthumb");

    match cli.command {
        Command::Convert {
            input,
            format,
            output,
        } => {
            match cadthumb_frontend::run_conversion(&config, &input, &format, output.as_deref()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(input = %input.display(), kind = err.kind(), error = %err, "转换失败");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// 配置加载失败时回落到默认配置，错误留给调用方在日志就绪后报告。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

/// 日志写到标准错误，标准输出只留给转换产物。
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
