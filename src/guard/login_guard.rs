use super::clock::Clock;
use super::ledger::{AttemptLedger, AttemptRecord};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// 调用点上的限流策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// 窗口内允许的最大尝试次数
    pub max_attempts: u32,
    /// 窗口长度（分钟）
    pub window_minutes: u32,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_minutes: 15,
        }
    }
}

impl GuardPolicy {
    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }
}

/// 某个标识符的当前状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatus {
    /// 当前窗口内已记录的次数（窗口过期或不存在时为 0）
    pub attempts: u32,
    pub remaining: u32,
    /// 距离窗口重置的秒数（向上取整）
    pub retry_after_secs: u64,
    pub limited: bool,
}

/// 登录尝试守卫
///
/// 固定窗口计数：同一个 identifier 在窗口内超过 `max_attempts` 次即被限流。
/// 状态只保存在进程内存中，重启即丢失。
pub struct LoginAttemptGuard {
    ledger: AttemptLedger,
    clock: Arc<dyn Clock>,
}

impl LoginAttemptGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: AttemptLedger::new(),
            clock,
        }
    }

    pub fn ledger(&self) -> &AttemptLedger {
        &self.ledger
    }

    /// 计入一次尝试并返回是否已超限
    ///
    /// 注意：每次调用都会消耗一次额度，同一次逻辑尝试调用两次会计两次。
    pub fn is_limited(&self, identifier: &str, policy: &GuardPolicy) -> bool {
        self.consume(identifier, policy).limited
    }

    /// 记录一次失败的查找，不返回限流结论
    pub fn record_failed_attempt(&self, identifier: &str, policy: &GuardPolicy) {
        let status = self.consume(identifier, policy);
        tracing::debug!(
            identifier = identifier,
            attempts = status.attempts,
            "记录失败尝试"
        );
    }

    /// 清除某个标识符的全部记录（认证成功后调用）
    pub fn reset(&self, identifier: &str) {
        self.ledger.delete(identifier);
    }

    /// 计入一次尝试
    ///
    /// - 无记录：创建 attempts = 1 的新窗口
    /// - 窗口已过期：重置为 attempts = 1 的新窗口
    /// - 否则：attempts + 1
    pub fn consume(&self, identifier: &str, policy: &GuardPolicy) -> AttemptStatus {
        let now = self.clock.now();
        let record = self.ledger.update(identifier, |prev| match prev {
            Some(record) if now <= record.reset_at => AttemptRecord {
                attempts: record.attempts.saturating_add(1),
                reset_at: record.reset_at,
            },
            _ => AttemptRecord {
                attempts: 1,
                reset_at: now + policy.window(),
            },
        });

        let status = Self::status_of(Some(record), now, policy);
        tracing::debug!(
            identifier = identifier,
            attempts = status.attempts,
            limited = status.limited,
            "计入登录尝试"
        );
        status
    }

    /// 只读查看当前状态，不消耗额度
    pub fn peek(&self, identifier: &str, policy: &GuardPolicy) -> AttemptStatus {
        let now = self.clock.now();
        Self::status_of(self.ledger.get(identifier), now, policy)
    }

    /// 距离窗口重置的秒数，不存在或已过期返回 0
    pub fn time_until_reset(&self, identifier: &str) -> u64 {
        match self.ledger.get(identifier) {
            Some(record) => seconds_until(record.reset_at, self.clock.now()),
            None => 0,
        }
    }

    /// 当前窗口内剩余的尝试次数
    pub fn remaining_attempts(&self, identifier: &str, policy: &GuardPolicy) -> u32 {
        self.peek(identifier, policy).remaining
    }

    /// 按当前时钟清理过期记录
    pub fn sweep(&self) -> usize {
        self.ledger.sweep(self.clock.now())
    }

    fn status_of(
        record: Option<AttemptRecord>,
        now: DateTime<Utc>,
        policy: &GuardPolicy,
    ) -> AttemptStatus {
        match record {
            Some(record) if now <= record.reset_at => AttemptStatus {
                attempts: record.attempts,
                remaining: policy.max_attempts.saturating_sub(record.attempts),
                retry_after_secs: seconds_until(record.reset_at, now),
                limited: record.attempts > policy.max_attempts,
            },
            _ => AttemptStatus {
                attempts: 0,
                remaining: policy.max_attempts,
                retry_after_secs: 0,
                limited: false,
            },
        }
    }
}

/// 向上取整到秒
fn seconds_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis as u64).div_ceil(1000)
    }
}
