use crate::auth::Account;
use crate::guard::GuardPolicy;
use serde::Deserialize;
use std::env;

/// 配置文件路径环境变量（不含扩展名也可以）
const CONFIG_PATH_ENV: &str = "LOGIN_GUARD_CONFIG";
/// 环境变量覆盖前缀，例如 LOGIN_GUARD__SERVER__PORT=8080
const ENV_PREFIX: &str = "LOGIN_GUARD";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 是否信任反向代理传入的 X-Forwarded-For / X-Real-IP，只有部署在代理之后才能打开
    #[serde(default = "default_trust_forwarded_headers")]
    pub trust_forwarded_headers: bool,
}

fn default_trust_forwarded_headers() -> bool {
    false
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            window_minutes: default_window_minutes(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl GuardConfig {
    pub fn policy(&self) -> GuardPolicy {
        GuardPolicy {
            max_attempts: self.max_attempts,
            window_minutes: self.window_minutes,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_window_minutes() -> u32 {
    15
}

fn default_sweep_interval_seconds() -> u64 {
    600 // 10 分钟
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// 日志时间戳的时区偏移（小时）
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i8,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file_prefix: default_file_prefix(),
            max_file_size_mb: default_max_file_size_mb(),
            max_files: default_max_files(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_file_prefix() -> String {
    "login_guard".to_string()
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_max_files() -> usize {
    5
}

fn default_utc_offset_hours() -> i8 {
    8
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // 加载 .env 文件 (如果存在)
        let _ = dotenvy::dotenv();

        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config".to_string());

        // 配置文件 + 环境变量覆盖
        let config: Config = config::Config::builder()
            .add_source(config::File::with_name(&path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 字符串解析（测试与嵌入式场景使用）
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.guard.max_attempts == 0 {
            anyhow::bail!("guard.max_attempts 必须大于 0");
        }
        if self.guard.window_minutes == 0 {
            anyhow::bail!("guard.window_minutes 必须大于 0");
        }
        if self.guard.sweep_interval_seconds == 0 {
            anyhow::bail!("guard.sweep_interval_seconds 必须大于 0");
        }
        if !(-23..=23).contains(&self.logging.utc_offset_hours) {
            anyhow::bail!("logging.utc_offset_hours 超出范围: {}", self.logging.utc_offset_hours);
        }
        Ok(())
    }
}
