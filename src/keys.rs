//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! This keeps keys deterministic and lexicographically ordered in RocksDB.

use alloy_primitives::B256;

/// Encode a fee record key.
///
/// Format: byte 'F' (0x46) + transaction hash (32 bytes)
/// Total length: 33 bytes
pub fn encode_fee_key(tx_hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(b'F');
    key.extend_from_slice(tx_hash.as_slice());
    key
}

/// Decode a fee record key back into its transaction hash.
pub fn decode_fee_key(key: &[u8]) -> Option<B256> {
    if key.len() != 33 || key[0] != b'F' {
        return None;
    }
    Some(B256::from_slice(&key[1..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    #[test]
    fn test_fee_key_encoding() {
        let hash = b256!("4809437de726c077dddcd4d8feb0685283baa33966a73dda645a5e32685de090");
        let key = encode_fee_key(hash);
        assert_eq!(key.len(), 33);
        assert_eq!(key[0], b'F');
        assert_eq!(&key[1..], hash.as_slice());
        assert_eq!(decode_fee_key(&key), Some(hash));
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        assert_eq!(decode_fee_key(&[b'M', 0x01]), None);
        let mut key = vec![b'A'];
        key.extend_from_slice(&[0u8; 32]);
        assert_eq!(decode_fee_key(&key), None);
    }
}
