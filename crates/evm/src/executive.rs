//! Drives a transaction-level `CALL`/`CREATE` to completion: builds the
//! frame's `ActionParams`, hands it to a fresh `Interpreter` via `Factory`,
//! and implements `vm::Ext` itself so the interpreter's opcode handlers can
//! reach accounts, storage and nested calls without knowing how any of that
//! is stored.
//!
//! Nested `CALL*`/`CREATE` never actually suspend here: `Executive::call`/
//! `create` (the `vm::Ext` methods) run the child frame to completion
//! before returning, recursing directly instead of handing back a
//! `TrapKind` for an outer scheduler to resume later. This keeps the whole
//! call tree on the native stack, bounded by `Schedule::max_depth`, and
//! lets every interpreter in the tree share one `Executive`/state pair.

use std::collections::HashSet;
use std::sync::Arc;

use ethereum_types::{Address, H256, U256};
use log::{debug, trace};

use vm::{
    contract_address, ActionParams, ActionValue, CallType, ContractCreateResult, CreateContractAddress, EnvInfo,
    Ext, GasLeft, MessageCallResult, ReturnData, Schedule, TrapKind,
};

use crate::factory::Factory;
use crate::precompiles::PrecompileRegistry;
use crate::state::StateBackend;

/// A single `LOG0`-`LOG4` emitted during a call/create tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// Outcome of a top-level `Executive::call`/`Executive::create`, collapsing
/// the trap-free `MessageCallResult`/`ContractCreateResult` into one shape
/// a transaction layer can read uniformly. `gas_refund` is the raw,
/// uncapped counter accumulated across the whole call tree: the `gasUsed /
/// 2` cap needs the enclosing transaction's total gas usage, which this
/// crate doesn't model, so applying it is left to whatever calls `call`/
/// `create`.
#[derive(Debug)]
pub struct FrameResult {
    pub gas_left: U256,
    pub output: ReturnData,
    pub apply_state: bool,
    pub created_address: Option<Address>,
    pub gas_refund: U256,
    pub logs: Vec<LogEntry>,
    pub selfdestructed: Vec<Address>,
}

impl FrameResult {
    fn success(gas_left: U256, output: ReturnData) -> Self {
        FrameResult {
            gas_left,
            output,
            apply_state: true,
            created_address: None,
            gas_refund: U256::zero(),
            logs: Vec::new(),
            selfdestructed: Vec::new(),
        }
    }

    fn reverted(gas_left: U256, output: ReturnData) -> Self {
        FrameResult {
            gas_left,
            output,
            apply_state: false,
            created_address: None,
            gas_refund: U256::zero(),
            logs: Vec::new(),
            selfdestructed: Vec::new(),
        }
    }

    /// An exceptional halt (`OutOfGas`, bad jump, stack error, ...): by
    /// convention all gas forwarded to the frame is forfeit and nothing is
    /// returned.
    fn exception() -> Self {
        FrameResult {
            gas_left: U256::zero(),
            output: ReturnData::empty(),
            apply_state: false,
            created_address: None,
            gas_refund: U256::zero(),
            logs: Vec::new(),
            selfdestructed: Vec::new(),
        }
    }
}

/// Owns the account/storage backend and block context for one transaction,
/// and implements `vm::Ext` over it. `address` tracks whichever frame is
/// currently executing, so a nested `CREATE` knows who the creator is
/// without `vm::Ext::create` needing a sender parameter of its own.
///
/// `refund`, `logs` and `selfdestructed` accumulate across the whole
/// call/create tree rooted at the most recent top-level `call`/`create`:
/// every frame shares the same `Executive`, so a nested frame's `LOG*`/
/// `SSTORE`/`SELFDESTRUCT` lands directly in these fields. `do_call`/
/// `do_create` snapshot and restore them around a nested frame so a
/// reverted or failed child's contribution is discarded, matching state
/// checkpointing.
pub struct Executive<'a, B: StateBackend> {
    state: &'a mut B,
    env_info: EnvInfo,
    schedule: Schedule,
    factory: Factory,
    precompiles: PrecompileRegistry,
    origin: Address,
    gas_price: U256,
    depth: usize,
    address: Address,
    is_static: bool,
    refund: u64,
    logs: Vec<LogEntry>,
    selfdestructed: HashSet<Address>,
}

impl<'a, B: StateBackend> Executive<'a, B> {
    pub fn new(state: &'a mut B, env_info: EnvInfo, schedule: Schedule, origin: Address, gas_price: U256) -> Self {
        Executive {
            state,
            env_info,
            schedule,
            factory: Factory::default(),
            precompiles: PrecompileRegistry::default(),
            origin,
            gas_price,
            depth: 0,
            address: origin,
            is_static: false,
            refund: 0,
            logs: Vec::new(),
            selfdestructed: HashSet::new(),
        }
    }

    /// Run a top-level `CALL`/`CALLCODE`/`DELEGATECALL` described by
    /// `params`, exactly as a nested one would run, but without an
    /// enclosing checkpoint to roll back into on failure — that is the
    /// caller's (the transaction layer's) job.
    pub fn call(&mut self, params: ActionParams) -> vm::Result<FrameResult> {
        self.address = params.address;
        let result = self.do_call(
            params.gas,
            &params.sender,
            &params.address,
            params.value,
            params.data.as_deref().unwrap_or(&[]),
            &params.code_address,
            params.call_type,
        );
        Ok(self.finish(Self::collapse_call(result)))
    }

    /// Run a top-level `CREATE` described by `params` (`params.data` holds
    /// the init code; `params.address` is the creator).
    pub fn create(&mut self, params: ActionParams) -> vm::Result<FrameResult> {
        self.address = params.address;
        let value = params.value.value();
        let code = params.data.clone().unwrap_or_default();
        let result = self.do_create(&params.gas, &value, &code, CreateContractAddress::FromSenderAndNonce);
        Ok(self.finish(Self::collapse_create(result)))
    }

    /// Attach this transaction's accumulated refund/logs/selfdestructs to
    /// a top-level result, then reset the accumulators so a second
    /// `call`/`create` on the same `Executive` starts its own transaction
    /// cleanly.
    fn finish(&mut self, mut result: FrameResult) -> FrameResult {
        result.gas_refund = U256::from(self.refund);
        result.logs = std::mem::take(&mut self.logs);
        result.selfdestructed = self.selfdestructed.drain().collect();
        self.refund = 0;
        result
    }

    fn collapse_call(result: MessageCallResult) -> FrameResult {
        match result {
            MessageCallResult::Success(gas_left, data) => FrameResult::success(gas_left, data),
            MessageCallResult::Reverted(gas_left, data) => FrameResult::reverted(gas_left, data),
            MessageCallResult::Failed => FrameResult::exception(),
        }
    }

    fn collapse_create(result: ContractCreateResult) -> FrameResult {
        match result {
            ContractCreateResult::Created(address, gas_left) => {
                let mut r = FrameResult::success(gas_left, ReturnData::empty());
                r.created_address = Some(address);
                r
            }
            ContractCreateResult::Reverted(gas_left, data) => FrameResult::reverted(gas_left, data),
            ContractCreateResult::Failed => FrameResult::exception(),
        }
    }

    /// Snapshot of the refund/log/selfdestruct accumulators, taken right
    /// before recursing into a nested frame so a failed or reverted child
    /// can be undone without touching the parent's own contributions.
    fn checkpoint_substate(&self) -> (u64, usize, HashSet<Address>) {
        (self.refund, self.logs.len(), self.selfdestructed.clone())
    }

    fn restore_substate(&mut self, (refund, logs_len, selfdestructed): (u64, usize, HashSet<Address>)) {
        self.refund = refund;
        self.logs.truncate(logs_len);
        self.selfdestructed = selfdestructed;
    }

    fn do_call(
        &mut self,
        gas: U256,
        sender_address: &Address,
        receive_address: &Address,
        value: ActionValue,
        data: &[u8],
        code_address: &Address,
        call_type: CallType,
    ) -> MessageCallResult {
        if self.depth >= self.schedule.max_depth {
            return MessageCallResult::Failed;
        }

        self.state.checkpoint();

        if let ActionValue::Transfer(transfer) = value {
            if !transfer.is_zero() {
                if self.state.balance(sender_address) < transfer {
                    self.state.revert_to_checkpoint();
                    return MessageCallResult::Failed;
                }
                self.state.sub_balance(sender_address, transfer);
                self.state.add_balance(receive_address, transfer);
            }
        }

        if let Some(precompile) = self.precompiles.get(code_address) {
            let required = U256::from(precompile.required_gas(data));
            if gas < required {
                self.state.revert_to_checkpoint();
                return MessageCallResult::Failed;
            }
            return match precompile.run(data) {
                Ok(output) => {
                    self.state.discard_checkpoint();
                    let len = output.len();
                    MessageCallResult::Success(gas - required, ReturnData::new(output, 0, len))
                }
                Err(e) => {
                    debug!("precompile at {code_address:?} failed: {e}");
                    self.state.revert_to_checkpoint();
                    MessageCallResult::Failed
                }
            };
        }

        let code = match self.state.code(code_address) {
            Some(c) if !c.is_empty() => c,
            _ => {
                self.state.discard_checkpoint();
                return MessageCallResult::Success(gas, ReturnData::empty());
            }
        };
        let code_hash = self.state.code_hash(code_address);

        let params = ActionParams {
            code_address: *code_address,
            code_hash,
            address: *receive_address,
            sender: *sender_address,
            origin: self.origin,
            gas,
            gas_price: self.gas_price,
            value,
            data: Some(data.to_vec()),
            code: Some(code),
            call_type,
            is_static: self.is_static,
        };

        trace!("call depth={} to={receive_address:?} gas={gas}", self.depth);

        let saved_address = self.address;
        self.address = *receive_address;
        self.depth += 1;
        let substate = self.checkpoint_substate();
        let exec = self.factory.create(params);
        let result = exec.exec(self);
        self.depth -= 1;
        self.address = saved_address;

        match result {
            Ok(Ok(GasLeft::Known(gas_left))) => {
                self.state.discard_checkpoint();
                MessageCallResult::Success(gas_left, ReturnData::empty())
            }
            Ok(Ok(GasLeft::NeedsReturn { gas_left, data, apply_state })) => {
                if apply_state {
                    self.state.discard_checkpoint();
                    MessageCallResult::Success(gas_left, data)
                } else {
                    self.state.revert_to_checkpoint();
                    self.restore_substate(substate);
                    MessageCallResult::Reverted(gas_left, data)
                }
            }
            Ok(Err(e)) => {
                debug!("call to {receive_address:?} failed: {e}");
                self.state.revert_to_checkpoint();
                self.restore_substate(substate);
                MessageCallResult::Failed
            }
            Err(_trap) => {
                // Never produced: `Executive::call`/`create` always run the
                // child to completion instead of suspending.
                self.state.revert_to_checkpoint();
                self.restore_substate(substate);
                MessageCallResult::Failed
            }
        }
    }

    fn do_create(
        &mut self,
        gas: &U256,
        value: &U256,
        code: &[u8],
        scheme: CreateContractAddress,
    ) -> ContractCreateResult {
        if self.depth >= self.schedule.max_depth {
            return ContractCreateResult::Failed;
        }

        let creator = self.address;
        if self.state.balance(&creator) < *value {
            return ContractCreateResult::Failed;
        }

        let nonce = self.state.nonce(&creator);
        let new_address = contract_address(scheme, &creator, &nonce);

        self.state.checkpoint();
        self.state.inc_nonce(&creator);

        if !value.is_zero() {
            self.state.sub_balance(&creator, *value);
            self.state.add_balance(&new_address, *value);
        }

        let params = ActionParams {
            code_address: new_address,
            code_hash: None,
            address: new_address,
            sender: creator,
            origin: self.origin,
            gas: *gas,
            gas_price: self.gas_price,
            value: ActionValue::Transfer(*value),
            data: None,
            code: Some(Arc::new(code.to_vec())),
            call_type: CallType::None,
            is_static: self.is_static,
        };

        trace!("create depth={} creator={creator:?} at={new_address:?} gas={gas}", self.depth);

        let saved_address = self.address;
        self.address = new_address;
        self.depth += 1;
        let substate = self.checkpoint_substate();
        let exec = self.factory.create(params);
        let result = exec.exec(self);
        self.depth -= 1;
        self.address = saved_address;

        match result {
            Ok(Ok(GasLeft::Known(gas_left))) => {
                self.state.init_code(&new_address, Vec::new());
                self.state.discard_checkpoint();
                ContractCreateResult::Created(new_address, gas_left)
            }
            Ok(Ok(GasLeft::NeedsReturn { gas_left, data, apply_state })) => {
                if !apply_state {
                    self.state.revert_to_checkpoint();
                    self.restore_substate(substate);
                    return ContractCreateResult::Reverted(gas_left, data);
                }
                if data.len() > self.schedule.create_data_limit {
                    self.state.revert_to_checkpoint();
                    self.restore_substate(substate);
                    return ContractCreateResult::Failed;
                }
                let deploy_cost = U256::from(self.schedule.create_data_gas) * U256::from(data.len());
                if gas_left < deploy_cost {
                    self.state.revert_to_checkpoint();
                    self.restore_substate(substate);
                    return ContractCreateResult::Failed;
                }
                self.state.init_code(&new_address, data.to_vec());
                self.state.discard_checkpoint();
                ContractCreateResult::Created(new_address, gas_left - deploy_cost)
            }
            Ok(Err(e)) => {
                debug!("create at {new_address:?} failed: {e}");
                self.state.revert_to_checkpoint();
                self.restore_substate(substate);
                ContractCreateResult::Failed
            }
            Err(_trap) => {
                self.state.revert_to_checkpoint();
                self.restore_substate(substate);
                ContractCreateResult::Failed
            }
        }
    }
}

impl<'a, B: StateBackend> Ext for Executive<'a, B> {
    fn storage_at(&self, key: &H256) -> vm::Result<H256> {
        Ok(self.state.storage_at(&self.address, key))
    }

    fn set_storage(&mut self, key: H256, value: H256) -> vm::Result<()> {
        self.state.set_storage(&self.address, key, value);
        Ok(())
    }

    fn exists(&self, address: &Address) -> vm::Result<bool> {
        Ok(self.state.exists(address))
    }

    fn exists_and_not_null(&self, address: &Address) -> vm::Result<bool> {
        Ok(self.state.exists_and_not_null(address))
    }

    fn balance(&self, address: &Address) -> vm::Result<U256> {
        Ok(self.state.balance(address))
    }

    fn blockhash(&mut self, number: &U256) -> H256 {
        let current = U256::from(self.env_info.number);
        if *number >= current || current - *number > U256::from(256) {
            return H256::zero();
        }
        // A transaction layer without its own block history (as here)
        // cannot answer this honestly; returning zero matches the
        // "backend failure for ancient/unavailable blocks" rule.
        H256::zero()
    }

    fn create(
        &mut self,
        gas: &U256,
        value: &U256,
        code: &[u8],
        address: CreateContractAddress,
        _trap: bool,
    ) -> Result<ContractCreateResult, TrapKind> {
        Ok(self.do_create(gas, value, code, address))
    }

    fn call(
        &mut self,
        gas: U256,
        sender_address: &Address,
        receive_address: &Address,
        value: ActionValue,
        data: &[u8],
        code_address: &Address,
        call_type: CallType,
        _trap: bool,
    ) -> Result<MessageCallResult, TrapKind> {
        Ok(self.do_call(gas, sender_address, receive_address, value, data, code_address, call_type))
    }

    fn extcode(&self, address: &Address) -> vm::Result<Option<Arc<Vec<u8>>>> {
        Ok(self.state.code(address))
    }

    fn extcodesize(&self, address: &Address) -> vm::Result<Option<usize>> {
        Ok(self.state.code(address).map(|c| c.len()))
    }

    fn log(&mut self, topics: Vec<H256>, data: &[u8]) -> vm::Result<()> {
        trace!("log topics={} bytes={}", topics.len(), data.len());
        self.logs.push(LogEntry {
            address: self.address,
            topics,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn suicide(&mut self, refund_address: &Address) -> vm::Result<()> {
        // Credited on the first selfdestruct of this address in the
        // transaction, regardless of its balance, and never again — the
        // set, not a balance check, is what makes this idempotent.
        if self.selfdestructed.insert(self.address) {
            self.add_refund(self.schedule.suicide_refund_gas);
        }
        let balance = self.state.balance(&self.address);
        if !balance.is_zero() {
            self.state.sub_balance(&self.address, balance);
            self.state.add_balance(refund_address, balance);
        }
        self.state.kill_account(&self.address);
        Ok(())
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn env_info(&self) -> &EnvInfo {
        &self.env_info
    }

    fn depth(&self) -> usize {
        self.depth
    }

    fn add_refund(&mut self, value: usize) {
        self.refund += value as u64;
    }

    fn sub_refund(&mut self, value: usize) {
        self.refund = self.refund.saturating_sub(value as u64);
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MemoryState, StateBackend};
    use rustc_hex::FromHex;

    fn params(address: Address, sender: Address, gas: u64, code: Vec<u8>) -> ActionParams {
        ActionParams {
            code_address: address,
            address,
            sender,
            gas: U256::from(gas),
            code: Some(Arc::new(code)),
            ..ActionParams::default()
        }
    }

    #[test]
    fn call_into_empty_account_succeeds_with_no_output() {
        let mut state = MemoryState::new();
        let to = Address::from_low_u64_be(2);
        let from = Address::from_low_u64_be(1);
        state.set_balance(from, U256::from(1000));
        let mut executive = Executive::new(&mut state, EnvInfo::default(), Schedule::default(), from, U256::zero());
        let result = executive.call(params(to, from, 100_000, Vec::new())).unwrap();
        assert!(result.apply_state);
        assert!(result.output.is_empty());
    }

    #[test]
    fn create_deploys_returned_code_and_charges_per_byte() {
        let mut state = MemoryState::new();
        let creator = Address::from_low_u64_be(1);
        state.set_balance(creator, U256::from(1_000_000));
        let mut executive =
            Executive::new(&mut state, EnvInfo::default(), Schedule::default(), creator, U256::zero());

        // PUSH1 1 PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 RETURN -- deploys one byte of code (0x01)
        let init_code: Vec<u8> = "6001600053600160006000f3".from_hex().unwrap();
        let mut create_params = ActionParams {
            address: creator,
            sender: creator,
            gas: U256::from(200_000),
            data: Some(init_code),
            ..ActionParams::default()
        };
        create_params.value = ActionValue::Transfer(U256::zero());
        let result = executive.create(create_params).unwrap();
        let deployed = result.created_address.expect("contract should have been created");
        assert_eq!(state.code(&deployed).map(|c| (*c).clone()), Some(vec![0x01]));
    }

    #[test]
    fn depth_limit_fails_call_without_touching_balance() {
        let mut state = MemoryState::new();
        let from = Address::from_low_u64_be(1);
        let to = Address::from_low_u64_be(2);
        state.set_balance(from, U256::from(10));
        let mut executive = Executive::new(&mut state, EnvInfo::default(), Schedule::default(), from, U256::zero());
        executive.depth = executive.schedule.max_depth;
        let result = executive.call(params(to, from, 100, Vec::new())).unwrap();
        assert!(!result.apply_state);
        assert_eq!(state.balance(&from), U256::from(10));
    }

    #[test]
    fn suicide_credits_refund_once_per_address() {
        let mut state = MemoryState::new();
        let from = Address::from_low_u64_be(1);
        let refund_target = Address::from_low_u64_be(2);
        let mut executive = Executive::new(&mut state, EnvInfo::default(), Schedule::default(), from, U256::zero());
        executive.address = from;

        Ext::suicide(&mut executive, &refund_target).unwrap();
        Ext::suicide(&mut executive, &refund_target).unwrap();

        assert_eq!(executive.refund, executive.schedule.suicide_refund_gas as u64);
        assert_eq!(executive.selfdestructed.len(), 1);
    }
}
