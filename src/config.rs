use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 可选配置文件名 (工作目录下，扩展名自动识别)
pub const CONFIG_FILE: &str = "invoice-flatten";
/// 环境变量前缀，例如 INVOICE_FLATTEN_INPUT__INVOICE_FILE
pub const ENV_PREFIX: &str = "INVOICE_FLATTEN";

/// 应用配置 (仅输入/输出位置)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    pub invoice_file: PathBuf,
    pub expired_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub csv_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                invoice_file: PathBuf::from("invoices.json"),
                expired_file: PathBuf::from("expired_invoices.txt"),
            },
            output: OutputConfig {
                csv_file: PathBuf::from("transformed_invoices.csv"),
            },
        }
    }
}

impl AppConfig {
    /// 从配置文件 + 环境变量加载配置，失败时回退到默认值
    pub fn from_env() -> Self {
        match Self::load(Path::new(CONFIG_FILE), ENV_PREFIX) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Invalid configuration ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// 分层加载: 默认值 < 配置文件 (可选) < 环境变量
    pub fn load(config_file: &Path, env_prefix: &str) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        config::Config::builder()
            .set_default("input.invoice_file", path_str(&defaults.input.invoice_file))?
            .set_default("input.expired_file", path_str(&defaults.input.expired_file))?
            .set_default("output.csv_file", path_str(&defaults.output.csv_file))?
            .add_source(config::File::from(config_file).required(false))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
