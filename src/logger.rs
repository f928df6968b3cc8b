use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 日志目录
    pub log_dir: String,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 单个日志文件最大大小（字节）
    pub max_file_size: u64,
    /// 保留的日志文件数量
    pub max_files: usize,
    /// 时间戳时区偏移（小时）
    pub utc_offset_hours: i8,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::from(&LoggingConfig::default())
    }
}

impl From<&LoggingConfig> for LoggerConfig {
    fn from(cfg: &LoggingConfig) -> Self {
        Self {
            log_dir: cfg.dir.clone(),
            file_prefix: cfg.file_prefix.clone(),
            max_file_size: cfg.max_file_size_mb * 1024 * 1024,
            max_files: cfg.max_files,
            utc_offset_hours: cfg.utc_offset_hours,
        }
    }
}

/// 初始化日志系统
///
/// - 同时输出到控制台和文件
/// - 按日期滚动日志文件
/// - 后台任务定期清理旧日志
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("创建日志目录失败: {}", config.log_dir))?;

    let offset = time::UtcOffset::from_hms(config.utc_offset_hours, 0, 0)
        .context("无效的日志时区偏移")?;
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        offset,
        time::format_description::well_known::Rfc3339,
    );

    // 每日滚动；直接同步写入，避免 non_blocking 的 guard 被提前丢弃
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "login_guard=debug,tower_http=debug,axum=debug".into());

    // 文件中不使用颜色代码
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_timer(timer.clone())
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("日志系统初始化失败")?;

    tokio::spawn(log_rotation_task(config));

    Ok(())
}

/// 后台任务：每分钟检查并清理日志文件
async fn log_rotation_task(config: LoggerConfig) {
    use tokio::time::{interval, Duration};

    let mut interval = interval(Duration::from_secs(60));

    loop {
        interval.tick().await;

        if let Err(e) = manage_log_files(&config).await {
            tracing::warn!(error = %e, "日志文件管理失败");
        }
    }
}

/// 删除超过数量限制或大小限制的旧日志文件，返回删除数量
async fn manage_log_files(config: &LoggerConfig) -> Result<usize> {
    let log_path = Path::new(&config.log_dir);

    if !log_path.exists() {
        return Ok(0);
    }

    let mut read_dir = tokio::fs::read_dir(log_path).await?;
    let mut target_files = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(&config.file_prefix));
        if !matches {
            continue;
        }
        if let Ok(metadata) = tokio::fs::metadata(&path).await {
            if metadata.is_file() {
                target_files.push((path, metadata.len(), metadata.modified().ok()));
            }
        }
    }

    // 最新的在前
    target_files.sort_by(|a, b| b.2.cmp(&a.2));

    let files_to_delete: Vec<_> = target_files
        .iter()
        .enumerate()
        .filter(|(i, (_, size, _))| *i >= config.max_files || (*size > config.max_file_size && *i > 0))
        .map(|(_, (path, _, _))| path.clone())
        .collect();

    let mut deleted = 0;
    for path in files_to_delete {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                deleted += 1;
                tracing::info!("删除旧日志文件: {:?}", path);
            }
            Err(e) => tracing::warn!("删除旧日志文件失败 {:?}: {}", path, e),
        }
    }

    Ok(deleted)
}
