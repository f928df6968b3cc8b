use super::login_guard::LoginAttemptGuard;
use crate::metrics::METRICS;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 后台清理任务句柄，关闭服务时调用 `shutdown`
pub struct SweeperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// 取消清理任务并等待其退出
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "登录守卫清理任务异常退出");
        }
    }
}

/// 启动定期清理过期记录的后台任务
pub fn spawn_sweeper(guard: Arc<LoginAttemptGuard>, every: Duration) -> SweeperHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // 第一次 tick 立即返回，跳过
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("登录守卫清理任务已停止");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = guard.sweep();
                    let remaining = guard.ledger().len();
                    METRICS.guard_swept.inc_by(removed as u64);
                    METRICS.guard_entries.set(remaining as i64);
                    if removed > 0 {
                        tracing::info!("清理了 {} 条过期登录记录，剩余 {} 条", removed, remaining);
                    } else {
                        tracing::debug!("无过期登录记录，当前 {} 条", remaining);
                    }
                }
            }
        }
    });

    SweeperHandle { cancel, join }
}
