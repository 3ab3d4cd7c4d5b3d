const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

pub fn fnv1a_init() -> u64 {
    FNV1A_OFFSET
}

pub fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV1A_PRIME);
    }
    hash
}

pub fn fnv1a_hash(bytes: &[u8]) -> u64 {
    fnv1a_bytes(fnv1a_init(), bytes)
}

/// Stable digest of a serializable value: FNV-1a over its bincode encoding.
///
/// # Panics
/// If `value` cannot be encoded by bincode; identity types must always encode.
pub fn digest<T: serde::Serialize + ?Sized>(value: &T) -> u64 {
    let bytes = bincode::serialize(value).expect("identity value must encode with bincode");
    fnv1a_hash(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_hash(b""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_hash(b"a"), 0xaf63dc4c8601ec8c);
    }

    struct Unencodable;

    impl serde::Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not encodable"))
        }
    }

    #[test]
    #[should_panic(expected = "identity value must encode")]
    fn digest_rejects_unencodable_values() {
        let _ = digest(&Unencodable);
    }

    #[test]
    fn digest_distinguishes_values() {
        assert_eq!(digest(&("add", 4u32)), digest(&("add", 4u32)));
        assert_ne!(digest(&("add", 4u32)), digest(&("add", 8u32)));
    }

    #[test]
    fn fnv1a_is_incremental() {
        let split = fnv1a_bytes(fnv1a_bytes(fnv1a_init(), b"fused_"), b"add");
        assert_eq!(split, fnv1a_hash(b"fused_add"));
    }
}
