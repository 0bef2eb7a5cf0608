use xxhash_rust::xxh3::xxh3_128;

pub fn xxhash_u128(input: &[u8]) -> u128 {
  xxh3_128(input)
}

/// Lowercase hex digest, truncated to `len` characters. Used for
/// content-addressed artifact names, so it must stay stable across releases.
pub fn xxhash_base16(input: &[u8], len: usize) -> String {
  let mut digest = format!("{:032x}", xxh3_128(input));
  digest.truncate(len);
  digest
}

#[test]
fn test_xxhash_base16() {
  assert_eq!(xxhash_base16(b"hello", 8).len(), 8);
  assert_eq!(xxhash_base16(b"hello", 8), xxhash_base16(b"hello", 8));
  assert_ne!(xxhash_base16(b"hello", 8), xxhash_base16(b"hello!", 8));
}
