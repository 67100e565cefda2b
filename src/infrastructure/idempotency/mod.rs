pub mod bloom;
pub mod cache;
pub mod guard;
pub mod lock;

pub use bloom::BloomFilter;
pub use cache::{CacheEntry, TtlCache};
pub use guard::{Admission, AdmissionPermit, IdempotencyGuard};
pub use lock::KeyedLockRegistry;
