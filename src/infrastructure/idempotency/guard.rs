use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::OrderRecord;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::idempotency::bloom::BloomFilter;
use crate::infrastructure::idempotency::cache::{CacheEntry, TtlCache};
use crate::infrastructure::idempotency::lock::KeyedLockRegistry;
use rand::Rng;
use std::future::Future;
use std::sync::RwLock as StdRwLock;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// 准入结论
pub enum Admission {
    /// 首次提交，持有许可（含键级锁）继续下单
    Admitted(AdmissionPermit),
    /// 重复提交，携带首次生成的订单
    Duplicate(Box<OrderRecord>),
    /// 锁等待超时，整体重试
    Retry,
}

/// 准入许可
///
/// 持有期间同键的其他提交全部阻塞在锁上；下单流程结束（成功或失败）
/// 随 drop 释放。
pub struct AdmissionPermit {
    _guard: OwnedMutexGuard<()>,
}

/// 幂等准入守卫
///
/// 两级判重：布隆过滤器未命中即放行（无漏判）；命中后走
/// 精确缓存与存储查证区分真重复与误判。
pub struct IdempotencyGuard {
    filter: StdRwLock<BloomFilter>,
    cache: TtlCache,
    locks: KeyedLockRegistry,
    max_attempts: u32,
}

impl IdempotencyGuard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            filter: StdRwLock::new(BloomFilter::with_rate(
                config.bloom_expected_items,
                config.bloom_fp_rate,
            )),
            cache: TtlCache::new(
                Duration::from_secs(config.cache_present_ttl_secs),
                Duration::from_secs(config.cache_absent_ttl_secs),
                config.ttl_jitter_ratio,
            ),
            locks: KeyedLockRegistry::new(Duration::from_secs(config.lock_wait_secs)),
            max_attempts: config.order_no_max_attempts,
        }
    }

    /// 商户维度幂等键
    pub fn admission_key(merchant_id: &str, merchant_order_no: &str) -> String {
        format!("m:{}:{}", merchant_id, merchant_order_no)
    }

    /// 判重准入
    ///
    /// exact_lookup 仅在过滤器命中且缓存未决时调用（穿透到存储）。
    pub async fn admit<F, Fut>(&self, key: &str, exact_lookup: F) -> DomainResult<Admission>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<Option<OrderRecord>>>,
    {
        let Some(guard) = self.locks.acquire(key).await else {
            return Ok(Admission::Retry);
        };

        // 一级：过滤器未命中保证首次出现
        let filter_hit = {
            let filter = self.filter.read().expect("bloom filter poisoned");
            filter.contains(key)
        };
        if !filter_hit {
            self.filter
                .write()
                .expect("bloom filter poisoned")
                .insert(key);
            return Ok(Admission::Admitted(AdmissionPermit { _guard: guard }));
        }

        // 二级：精确缓存消歧
        match self.cache.get(key).await {
            Some(CacheEntry::Present(order)) => {
                debug!("duplicate submission served from cache: {}", key);
                return Ok(Admission::Duplicate(order));
            }
            Some(CacheEntry::Absent) => {
                // 近期查证过不存在，为过滤器误判
                return Ok(Admission::Admitted(AdmissionPermit { _guard: guard }));
            }
            None => {}
        }

        // 三级：存储查证，结果回填缓存
        match exact_lookup().await? {
            Some(order) => {
                self.cache.put_present(key, order.clone()).await;
                Ok(Admission::Duplicate(Box::new(order)))
            }
            None => {
                self.cache.put_absent(key).await;
                Ok(Admission::Admitted(AdmissionPermit { _guard: guard }))
            }
        }
    }

    /// 订单落库后登记，后续同键提交直接命中缓存
    pub async fn record(&self, key: &str, order: &OrderRecord) {
        self.filter
            .write()
            .expect("bloom filter poisoned")
            .insert(key);
        self.cache.put_present(key, order.clone()).await;
    }

    /// 生成平台订单号：P + 秒级时间戳 + 6位随机数
    ///
    /// 对过滤器重试有预算上限，耗尽返回 OrderNumberExhausted。
    pub fn generate_order_no(&self) -> DomainResult<String> {
        for _ in 0..self.max_attempts {
            let candidate = format!(
                "P{}{:06}",
                chrono::Utc::now().format("%Y%m%d%H%M%S"),
                rand::thread_rng().gen_range(0..1_000_000)
            );

            let mut filter = self.filter.write().expect("bloom filter poisoned");
            if !filter.contains(&candidate) {
                filter.insert(&candidate);
                return Ok(candidate);
            }
        }
        Err(DomainError::OrderNumberExhausted(self.max_attempts))
    }

    /// 以任意键获取串行化锁（回调结算、补单路径复用），超时返回 None
    pub async fn serialize(&self, key: &str) -> Option<OwnedMutexGuard<()>> {
        self.locks.acquire(key).await
    }

    /// 清理过期缓存与空闲锁（定时任务触发）
    pub async fn sweep(&self) {
        self.cache.purge_expired().await;
        self.locks.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Money, ProviderCode};
    use std::sync::Arc;

    fn test_config() -> AppConfig {
        AppConfig {
            lock_wait_secs: 1,
            cache_present_ttl_secs: 60,
            cache_absent_ttl_secs: 60,
            ttl_jitter_ratio: 0.0,
            bloom_expected_items: 10_000,
            bloom_fp_rate: 0.01,
            ..AppConfig::default()
        }
    }

    fn order(merchant_order_no: &str) -> OrderRecord {
        OrderRecord::new(
            "P20250101120000123456".to_string(),
            "M1001".to_string(),
            merchant_order_no.to_string(),
            Money::from_yuan(1),
            ProviderCode::Epay,
            "https://merchant.example.com/notify".to_string(),
            None,
            "127.0.0.1".to_string(),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_submission_admitted() {
        let guard = IdempotencyGuard::new(&test_config());
        let key = IdempotencyGuard::admission_key("M1001", "ORDER_0001");

        let admission = guard
            .admit(&key, || async { Ok(None) })
            .await
            .unwrap();
        assert!(matches!(admission, Admission::Admitted(_)));
    }

    #[tokio::test]
    async fn test_recorded_key_is_duplicate() {
        let guard = IdempotencyGuard::new(&test_config());
        let key = IdempotencyGuard::admission_key("M1001", "ORDER_0001");

        match guard.admit(&key, || async { Ok(None) }).await.unwrap() {
            Admission::Admitted(permit) => {
                guard.record(&key, &order("ORDER_0001")).await;
                drop(permit);
            }
            _ => panic!("expected admission"),
        }

        match guard.admit(&key, || async { Ok(None) }).await.unwrap() {
            Admission::Duplicate(existing) => {
                assert_eq!(existing.merchant_order_no, "ORDER_0001");
            }
            _ => panic!("expected duplicate"),
        }
    }

    #[tokio::test]
    async fn test_filter_false_positive_resolved_by_lookup() {
        // 饱和的极小过滤器：任何键都命中，一律走精确查证
        let config = AppConfig {
            bloom_expected_items: 1,
            bloom_fp_rate: 0.5,
            ..test_config()
        };
        let guard = IdempotencyGuard::new(&config);
        for i in 0..64 {
            guard
                .filter
                .write()
                .unwrap()
                .insert(&format!("warmup_{}", i));
        }

        let key = IdempotencyGuard::admission_key("M1001", "ORDER_FRESH");
        assert!(guard.filter.read().unwrap().contains(&key), "filter not saturated");

        // 存储确认不存在 → 放行
        let admission = guard.admit(&key, || async { Ok(None) }).await.unwrap();
        assert!(matches!(admission, Admission::Admitted(_)));
    }

    #[tokio::test]
    async fn test_lock_contention_yields_retry() {
        let guard = Arc::new(IdempotencyGuard::new(&test_config()));
        let key = IdempotencyGuard::admission_key("M1001", "ORDER_0001");

        let permit = match guard.admit(&key, || async { Ok(None) }).await.unwrap() {
            Admission::Admitted(p) => p,
            _ => panic!("expected admission"),
        };

        // 许可持有期间，同键准入在锁上等到超时
        let admission = guard.admit(&key, || async { Ok(None) }).await.unwrap();
        assert!(matches!(admission, Admission::Retry));
        drop(permit);
    }

    #[tokio::test]
    async fn test_generator_exhaustion() {
        let config = AppConfig {
            bloom_expected_items: 1,
            bloom_fp_rate: 0.5,
            order_no_max_attempts: 10,
            ..test_config()
        };
        let guard = IdempotencyGuard::new(&config);
        // 填满过滤器，任何候选号都命中
        for i in 0..64 {
            guard
                .filter
                .write()
                .unwrap()
                .insert(&format!("warmup_{}", i));
        }

        match guard.generate_order_no() {
            Err(DomainError::OrderNumberExhausted(attempts)) => assert_eq!(attempts, 10),
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_generated_order_nos_unique() {
        let guard = IdempotencyGuard::new(&test_config());
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(guard.generate_order_no().unwrap()));
        }
    }
}
