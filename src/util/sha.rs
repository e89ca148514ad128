use sha2::{Digest, Sha256};

pub fn bytes_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let sha256 = &hasher.finalize()[..];
    hex::encode(sha256)
}

#[test]
fn empty_sha256() {
    assert_eq!(bytes_sha256(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
}
