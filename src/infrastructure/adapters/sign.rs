use crate::domain::errors::{DomainError, DomainResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// 参数按键名升序拼接为 k=v&k=v，sign 字段自身不参与签名
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != "sign")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// HMAC-SHA256 签名，十六进制小写输出
pub fn hmac_sha256_hex(secret: &str, payload: &str) -> DomainResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| DomainError::ConfigError(format!("invalid signing key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 对参数表签名
pub fn sign_params(secret: &str, params: &BTreeMap<String, String>) -> DomainResult<String> {
    hmac_sha256_hex(secret, &canonical_query(params))
}
