use sha2::{Digest, Sha256};

/// 概率型成员过滤器（Bloom filter）
///
/// 无漏判：contains 返回 false 即保证该键从未插入过；
/// 误判率由预期容量与目标错误率共同决定。
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
}

impl BloomFilter {
    /// 按预期容量与误判率上限计算位数与哈希个数
    pub fn with_rate(expected_items: usize, fp_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = fp_rate.clamp(1e-9, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let num_bits = ((-(n * p.ln())) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let num_hashes = (((num_bits as f64) / n) * ln2).round().max(1.0) as u32;

        Self {
            bits: vec![0u64; num_bits.div_ceil(64) as usize],
            num_bits,
            num_hashes,
        }
    }

    /// 双哈希派生 k 个位置：g_i = h1 + i * h2
    fn hash_pair(key: &str) -> (u64, u64) {
        let digest = Sha256::digest(key.as_bytes());
        let h1 = u64::from_be_bytes(digest[0..8].try_into().expect("digest is 32 bytes"));
        let h2 = u64::from_be_bytes(digest[8..16].try_into().expect("digest is 32 bytes"));
        // h2 取奇数，保证步长遍历整个位表
        (h1, h2 | 1)
    }

    fn bit_position(&self, h1: u64, h2: u64, round: u32) -> (usize, u64) {
        let combined = h1.wrapping_add((round as u64).wrapping_mul(h2)) % self.num_bits;
        ((combined / 64) as usize, 1u64 << (combined % 64))
    }

    pub fn insert(&mut self, key: &str) {
        let (h1, h2) = Self::hash_pair(key);
        for i in 0..self.num_hashes {
            let (word, mask) = self.bit_position(h1, h2, i);
            self.bits[word] |= mask;
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let (h1, h2) = Self::hash_pair(key);
        (0..self.num_hashes).all(|i| {
            let (word, mask) = self.bit_position(h1, h2, i);
            self.bits[word] & mask != 0
        })
    }
}
