use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// 订单号级互斥锁注册表
///
/// 同一键的并发提交串行化；等待有上界，超时的调用方整体重试
/// 而不是挤进临界区。
pub struct KeyedLockRegistry {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    wait_limit: Duration,
}

impl KeyedLockRegistry {
    pub fn new(wait_limit: Duration) -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
            wait_limit,
        }
    }

    /// 带超时获取键级锁，超时返回 None
    pub async fn acquire(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock registry poisoned");
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        match tokio::time::timeout(self.wait_limit, lock.lock_owned()).await {
            Ok(guard) => Some(guard),
            Err(_) => {
                debug!("lock wait timed out: {}", key);
                None
            }
        }
    }

    /// 回收当前无持有者的键，防止注册表无限增长
    pub fn prune(&self) {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock registry poisoned").len()
    }
}
