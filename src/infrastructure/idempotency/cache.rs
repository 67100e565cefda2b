use crate::domain::OrderRecord;
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// 缓存条目
///
/// Present 记录已存在订单（长TTL），Absent 为确认不存在的负缓存
/// （短TTL），用于抵挡同键反复穿透。
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Present(Box<OrderRecord>),
    Absent,
}

struct Slot {
    entry: CacheEntry,
    expires_at: Instant,
}

/// 进程级TTL缓存
///
/// 每次写入的TTL叠加随机抖动，避免同批键同时到期造成缓存雪崩。
pub struct TtlCache {
    slots: RwLock<HashMap<String, Slot>>,
    present_ttl: Duration,
    absent_ttl: Duration,
    jitter_ratio: f64,
}

impl TtlCache {
    pub fn new(present_ttl: Duration, absent_ttl: Duration, jitter_ratio: f64) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            present_ttl,
            absent_ttl,
            jitter_ratio: jitter_ratio.clamp(0.0, 0.9),
        }
    }

    fn jittered(&self, base: Duration) -> Duration {
        if self.jitter_ratio <= 0.0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(-self.jitter_ratio..=self.jitter_ratio);
        base.mul_f64(1.0 + jitter)
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        {
            let slots = self.slots.read().await;
            match slots.get(key) {
                Some(slot) if slot.expires_at > Instant::now() => {
                    return Some(slot.entry.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // 过期条目惰性清除；写锁内复查到期时间，避免误删并发写入的新条目
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.get(key) {
            if slot.expires_at > Instant::now() {
                return Some(slot.entry.clone());
            }
            slots.remove(key);
        }
        None
    }

    pub async fn put_present(&self, key: &str, order: OrderRecord) {
        let ttl = self.jittered(self.present_ttl);
        self.slots.write().await.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::Present(Box::new(order)),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub async fn put_absent(&self, key: &str) {
        let ttl = self.jittered(self.absent_ttl);
        self.slots.write().await.insert(
            key.to_string(),
            Slot {
                entry: CacheEntry::Absent,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// 清除所有过期条目（由定时清理任务触发）
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.slots.write().await.retain(|_, slot| slot.expires_at > now);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }
}
