//! Caches the set of valid `JUMPDEST` positions for a piece of code,
//! keyed by code hash, so that re-entering the same contract (a common
//! case for proxies and token contracts called many times per block)
//! doesn't re-scan the bytecode on every frame.

use std::sync::Arc;

use bit_set::BitSet;
use ethereum_types::H256;
use keccak_hash::keccak;
use lru::LruCache;
use parking_lot::Mutex;

use crate::instructions;

/// Number of distinct code hashes kept in the cache at once.
const CACHE_CODE_HASH_NUMBER: usize = 4096;

#[derive(Clone)]
pub struct SharedCache {
    jump_destinations: Arc<Mutex<LruCache<H256, Arc<BitSet>>>>,
}

impl Default for SharedCache {
    fn default() -> Self {
        SharedCache::new()
    }
}

impl SharedCache {
    pub fn new() -> Self {
        SharedCache {
            jump_destinations: Arc::new(Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(CACHE_CODE_HASH_NUMBER).expect("constant is non-zero"),
            ))),
        }
    }

    /// Get the valid jump destinations for `code`, computing and caching
    /// them under `code_hash` if this is the first time we've seen it.
    /// `code_hash` of `None` (e.g. for `CREATE`'s in-flight init code,
    /// which has no settled hash yet) always recomputes and never caches.
    pub fn jump_destinations(&self, code_hash: &Option<H256>, code: &[u8]) -> Arc<BitSet> {
        if code.is_empty() {
            return Arc::new(BitSet::new());
        }

        if let Some(h) = code_hash {
            let mut cache = self.jump_destinations.lock();
            if let Some(d) = cache.get(h) {
                return d.clone();
            }
        }

        let d = Arc::new(Self::find_jump_destinations(code));

        if let Some(h) = code_hash {
            let mut cache = self.jump_destinations.lock();
            cache.put(*h, d.clone());
        }

        d
    }

    fn find_jump_destinations(code: &[u8]) -> BitSet {
        let mut jump_dests = BitSet::with_capacity(code.len());
        let mut position = 0;

        while position < code.len() {
            let instruction = code[position];

            if instruction == instructions::JUMPDEST {
                jump_dests.insert(position);
            } else if instructions::is_push(instruction) {
                position += instructions::push_bytes(instruction);
            }

            position += 1;
        }

        jump_dests
    }
}

/// Hash `code`, the way callers should derive the key passed to
/// `jump_destinations` for already-deployed contracts.
pub fn hash_code(code: &[u8]) -> H256 {
    keccak(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hex::FromHex;

    #[test]
    fn should_mark_jumpdests_correctly() {
        let code: Vec<u8> = "60005b565b".from_hex().unwrap();
        let cache = SharedCache::new();
        let dests = cache.jump_destinations(&None, &code);
        assert!(dests.contains(2));
        assert!(dests.contains(4));
        assert!(!dests.contains(0));
        assert!(!dests.contains(1));
    }

    #[test]
    fn should_not_mark_push_data_as_jumpdest() {
        // PUSH1 0x5b (data byte that looks like JUMPDEST)
        let code: Vec<u8> = "605b".from_hex().unwrap();
        let cache = SharedCache::new();
        let dests = cache.jump_destinations(&None, &code);
        assert!(dests.is_empty());
    }

    #[test]
    fn should_cache_by_hash() {
        let code: Vec<u8> = "5b".from_hex().unwrap();
        let hash = hash_code(&code);
        let cache = SharedCache::new();
        let first = cache.jump_destinations(&Some(hash), &code);
        let second = cache.jump_destinations(&Some(hash), &code);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
