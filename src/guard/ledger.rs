use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// 单个标识符在当前窗口内的尝试记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 当前窗口内的尝试次数
    pub attempts: u32,
    /// 窗口结束时间（窗口开始时间 + 窗口长度）
    pub reset_at: DateTime<Utc>,
}

/// 尝试账本：identifier -> AttemptRecord
///
/// 基于 DashMap 分片加锁，同一个 key 的读改写在 `update` 中是原子的，
/// 清理任务可以与请求并发执行。
#[derive(Debug, Default)]
pub struct AttemptLedger {
    records: DashMap<String, AttemptRecord>,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<AttemptRecord> {
        self.records.get(identifier).map(|r| *r)
    }

    pub fn set(&self, identifier: &str, record: AttemptRecord) {
        self.records.insert(identifier.to_string(), record);
    }

    pub fn delete(&self, identifier: &str) {
        self.records.remove(identifier);
    }

    /// 原子地读改写一条记录，返回写入后的值
    ///
    /// 闭包执行期间持有该 key 所在分片的写锁，闭包内不要再访问账本。
    pub fn update<F>(&self, identifier: &str, f: F) -> AttemptRecord
    where
        F: FnOnce(Option<&AttemptRecord>) -> AttemptRecord,
    {
        match self.records.entry(identifier.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = f(Some(entry.get()));
                *entry.get_mut() = next;
                next
            }
            Entry::Vacant(entry) => {
                let next = f(None);
                entry.insert(next);
                next
            }
        }
    }

    /// 删除所有 `reset_at < now` 的记录，返回删除数量
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = record.reset_at >= now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_get_set_delete() {
        let ledger = AttemptLedger::new();
        assert!(ledger.get("a").is_none());

        let record = AttemptRecord {
            attempts: 3,
            reset_at: t0(),
        };
        ledger.set("a", record);
        assert_eq!(ledger.get("a"), Some(record));

        ledger.delete("a");
        assert!(ledger.get("a").is_none());
        // 删除不存在的 key 是 no-op
        ledger.delete("a");
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let ledger = AttemptLedger::new();
        let now = t0();
        ledger.set("expired", AttemptRecord { attempts: 2, reset_at: now - Duration::seconds(1) });
        ledger.set("boundary", AttemptRecord { attempts: 4, reset_at: now });
        ledger.set("live", AttemptRecord { attempts: 1, reset_at: now + Duration::minutes(5) });

        let removed = ledger.sweep(now);

        assert_eq!(removed, 1);
        assert!(ledger.get("expired").is_none());
        assert_eq!(ledger.get("boundary").map(|r| r.attempts), Some(4));
        assert_eq!(ledger.get("live").map(|r| r.attempts), Some(1));
    }

    #[test]
    fn test_update_inserts_then_modifies() {
        let ledger = AttemptLedger::new();
        let bump = |prev: Option<&AttemptRecord>| AttemptRecord {
            attempts: prev.map_or(1, |r| r.attempts + 1),
            reset_at: t0(),
        };

        assert_eq!(ledger.update("k", bump).attempts, 1);
        assert_eq!(ledger.update("k", bump).attempts, 2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let ledger = Arc::new(AttemptLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.update("shared", |prev| AttemptRecord {
                            attempts: prev.map_or(1, |r| r.attempts + 1),
                            reset_at: t0(),
                        });
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.get("shared").map(|r| r.attempts), Some(2000));
    }

    #[test]
    fn test_sweep_runs_alongside_mutations() {
        let ledger = Arc::new(AttemptLedger::new());
        let now = t0();
        for i in 0..500 {
            ledger.set(&format!("stale:{}", i), AttemptRecord { attempts: 1, reset_at: now - Duration::seconds(1) });
        }

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("live:{}:{}", w, i % 50);
                        ledger.update(&key, |prev| AttemptRecord {
                            attempts: prev.map_or(1, |r| r.attempts + 1),
                            reset_at: now + Duration::minutes(10),
                        });
                        // 与清理任务争抢同一批 key
                        ledger.delete(&format!("stale:{}", (i + w * 125) % 500));
                    }
                })
            })
            .collect();

        let sweeper = {
            let ledger = ledger.clone();
            std::thread::spawn(move || (0..50).map(|_| ledger.sweep(now)).sum::<usize>())
        };

        for handle in writers {
            handle.join().unwrap();
        }
        let swept = sweeper.join().unwrap();

        // 过期记录要么被清理要么被删除，新窗口的记录都保留
        ledger.sweep(now);
        assert!(swept <= 500);
        assert_eq!(ledger.len(), 200);
        assert!(ledger.get("stale:0").is_none());
        assert_eq!(ledger.get("live:0:0").map(|r| r.attempts), Some(10));
    }

    #[test]
    fn test_sweep_count_matches_removed_records() {
        let ledger = AttemptLedger::new();
        let now = t0();
        for i in 0..10 {
            let reset_at = if i % 2 == 0 { now - Duration::seconds(5) } else { now + Duration::seconds(5) };
            ledger.set(&format!("k{}", i), AttemptRecord { attempts: 1, reset_at });
        }

        assert_eq!(ledger.sweep(now), 5);
        assert_eq!(ledger.sweep(now), 0);
        assert_eq!(ledger.len(), 5);
    }
}
