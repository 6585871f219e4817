//! Minimal in-memory account/storage backend with checkpoint/commit/revert,
//! the state half of what `executive::Executive` needs to implement
//! `vm::Ext`. Real deployments back this with a trie; tests and this crate's
//! own scenario suite only need the account-bag semantics, so a plain
//! snapshot stack stands in.

use std::collections::HashMap;
use std::sync::Arc;

use ethereum_types::{Address, H256, U256};

use crate::interpreter::shared_cache::hash_code;

#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    nonce: U256,
    storage: HashMap<H256, H256>,
    code: Option<Arc<Vec<u8>>>,
    code_hash: Option<H256>,
}

/// Everything `Executive` needs from a state backend: balances, storage,
/// code, and nested-checkpoint commit/revert around a `CALL`/`CREATE`.
pub trait StateBackend {
    fn exists(&self, address: &Address) -> bool;
    fn exists_and_not_null(&self, address: &Address) -> bool;
    fn balance(&self, address: &Address) -> U256;
    fn add_balance(&mut self, address: &Address, value: U256);
    fn sub_balance(&mut self, address: &Address, value: U256);
    fn nonce(&self, address: &Address) -> U256;
    fn inc_nonce(&mut self, address: &Address);
    fn storage_at(&self, address: &Address, key: &H256) -> H256;
    fn set_storage(&mut self, address: &Address, key: H256, value: H256);
    fn code(&self, address: &Address) -> Option<Arc<Vec<u8>>>;
    fn code_hash(&self, address: &Address) -> Option<H256>;
    fn init_code(&mut self, address: &Address, code: Vec<u8>);
    fn kill_account(&mut self, address: &Address);

    /// Opens a new revertible layer.
    fn checkpoint(&mut self);
    /// Folds the most recent checkpoint into its parent, keeping its edits.
    fn discard_checkpoint(&mut self);
    /// Throws away every edit made since the most recent checkpoint.
    fn revert_to_checkpoint(&mut self);
}

/// A snapshot-per-checkpoint `StateBackend`. `checkpoint` clones the whole
/// account map; fine for tests and moderate-depth call trees, not for a
/// production trie-backed state.
#[derive(Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    checkpoints: Vec<HashMap<Address, Account>>,
}

impl MemoryState {
    pub fn new() -> Self {
        MemoryState::default()
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.accounts.entry(address).or_default().balance = balance;
    }

    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        self.init_code(&address, code);
    }

    fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.accounts.entry(*address).or_default()
    }
}

impl StateBackend for MemoryState {
    fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn exists_and_not_null(&self, address: &Address) -> bool {
        match self.account(address) {
            Some(a) => !a.balance.is_zero() || !a.nonce.is_zero() || a.code.is_some(),
            None => false,
        }
    }

    fn balance(&self, address: &Address) -> U256 {
        self.account(address).map(|a| a.balance).unwrap_or_default()
    }

    fn add_balance(&mut self, address: &Address, value: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_add(value);
    }

    fn sub_balance(&mut self, address: &Address, value: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.saturating_sub(value);
    }

    fn nonce(&self, address: &Address) -> U256 {
        self.account(address).map(|a| a.nonce).unwrap_or_default()
    }

    fn inc_nonce(&mut self, address: &Address) {
        let account = self.account_mut(address);
        account.nonce = account.nonce.saturating_add(U256::one());
    }

    fn storage_at(&self, address: &Address, key: &H256) -> H256 {
        self.account(address)
            .and_then(|a| a.storage.get(key).cloned())
            .unwrap_or_else(H256::zero)
    }

    fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
        let account = self.account_mut(address);
        if value.is_zero() {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }
    }

    fn code(&self, address: &Address) -> Option<Arc<Vec<u8>>> {
        self.account(address).and_then(|a| a.code.clone())
    }

    fn code_hash(&self, address: &Address) -> Option<H256> {
        self.account(address).and_then(|a| a.code_hash)
    }

    fn init_code(&mut self, address: &Address, code: Vec<u8>) {
        let hash = hash_code(&code);
        let account = self.account_mut(address);
        account.code = Some(Arc::new(code));
        account.code_hash = Some(hash);
    }

    fn kill_account(&mut self, address: &Address) {
        self.accounts.remove(address);
    }

    fn checkpoint(&mut self) {
        self.checkpoints.push(self.accounts.clone());
    }

    fn discard_checkpoint(&mut self) {
        self.checkpoints.pop();
    }

    fn revert_to_checkpoint(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.accounts = snapshot;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_round_trips_through_checkpoint_commit() {
        let mut state = MemoryState::new();
        let addr = Address::from_low_u64_be(1);
        state.set_balance(addr, U256::from(100));
        state.checkpoint();
        state.add_balance(&addr, U256::from(50));
        state.discard_checkpoint();
        assert_eq!(state.balance(&addr), U256::from(150));
    }

    #[test]
    fn revert_to_checkpoint_undoes_edits() {
        let mut state = MemoryState::new();
        let addr = Address::from_low_u64_be(1);
        state.set_balance(addr, U256::from(100));
        state.checkpoint();
        state.add_balance(&addr, U256::from(50));
        state.set_storage(&addr, H256::zero(), H256::from_low_u64_be(9));
        state.revert_to_checkpoint();
        assert_eq!(state.balance(&addr), U256::from(100));
        assert_eq!(state.storage_at(&addr, &H256::zero()), H256::zero());
    }

    #[test]
    fn storing_zero_clears_the_slot() {
        let mut state = MemoryState::new();
        let addr = Address::from_low_u64_be(1);
        state.set_storage(&addr, H256::zero(), H256::from_low_u64_be(9));
        state.set_storage(&addr, H256::zero(), H256::zero());
        assert_eq!(state.storage_at(&addr, &H256::zero()), H256::zero());
    }
}
