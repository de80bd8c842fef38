use sha2::{Digest, Sha256};

pub type HashResult = String;

/// 计算数据的 SHA256 校验和
pub fn compute_hash(data: &[u8]) -> HashResult {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
