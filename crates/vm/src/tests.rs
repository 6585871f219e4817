//! In-memory `Ext` stand-in for interpreter unit tests. Never executes a
//! nested call/create; `call`/`create` just record what they were asked
//! to do and hand back a canned result, which is enough to test gas and
//! stack behaviour without a real state backend.

use std::collections::HashMap;
use std::sync::Arc;

use ethereum_types::{Address, H256, U256};

use crate::{
    ActionParams, ActionValue, CallType, ContractCreateResult, CreateContractAddress, EnvInfo, Error, Ext,
    GasLeft, MessageCallResult, Result, Schedule, TrapKind,
};

/// A call or create the code under test asked `FakeExt` to make.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FakeCall {
    pub call_type: FakeCallType,
    pub gas: U256,
    pub sender_address: Option<Address>,
    pub receive_address: Option<Address>,
    pub value: Option<U256>,
    pub data: Vec<u8>,
    pub code_address: Option<Address>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FakeCallType {
    Call,
    Create,
}

/// A single `LOG*` emitted by code under test.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FakeLogEntry {
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

/// In-memory stand-in for a state backend, used only by interpreter unit
/// tests. Not a realistic `Ext`: calls/creates never actually run and
/// always resolve to `fake_call_result`/`fake_create_result`.
pub struct FakeExt {
    pub schedule: Schedule,
    pub store: HashMap<H256, H256>,
    pub balances: HashMap<Address, U256>,
    pub blockhashes: HashMap<U256, H256>,
    pub codes: HashMap<Address, Arc<Vec<u8>>>,
    pub logs: Vec<FakeLogEntry>,
    pub suicides: std::collections::HashSet<Address>,
    pub calls: Vec<FakeCall>,
    pub sstore_refund: i64,
    pub env_info: EnvInfo,
    pub depth: usize,
    pub is_static: bool,
    pub fake_call_result: Option<MessageCallResult>,
    pub fake_create_result: Option<ContractCreateResult>,
}

impl Default for FakeExt {
    fn default() -> Self {
        FakeExt {
            schedule: Schedule::default(),
            store: HashMap::new(),
            balances: HashMap::new(),
            blockhashes: HashMap::new(),
            codes: HashMap::new(),
            logs: Vec::new(),
            suicides: std::collections::HashSet::new(),
            calls: Vec::new(),
            sstore_refund: 0,
            env_info: EnvInfo::default(),
            depth: 0,
            is_static: false,
            fake_call_result: None,
            fake_create_result: None,
        }
    }
}

impl FakeExt {
    pub fn new() -> Self {
        FakeExt::default()
    }

    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }
}

impl Ext for FakeExt {
    fn storage_at(&self, key: &H256) -> Result<H256> {
        Ok(self.store.get(key).cloned().unwrap_or_else(H256::zero))
    }

    fn set_storage(&mut self, key: H256, value: H256) -> Result<()> {
        self.store.insert(key, value);
        Ok(())
    }

    fn exists(&self, address: &Address) -> Result<bool> {
        Ok(self.balances.contains_key(address) || self.codes.contains_key(address))
    }

    fn exists_and_not_null(&self, address: &Address) -> Result<bool> {
        Ok(self
            .balances
            .get(address)
            .map(|b| !b.is_zero())
            .unwrap_or(false)
            || self.codes.contains_key(address))
    }

    fn balance(&self, address: &Address) -> Result<U256> {
        Ok(self.balances.get(address).cloned().unwrap_or_else(U256::zero))
    }

    fn blockhash(&mut self, number: &U256) -> H256 {
        self.blockhashes.get(number).cloned().unwrap_or_else(H256::zero)
    }

    fn create(
        &mut self,
        gas: &U256,
        value: &U256,
        data: &[u8],
        _address: CreateContractAddress,
        _trap: bool,
    ) -> std::result::Result<ContractCreateResult, TrapKind> {
        self.calls.push(FakeCall {
            call_type: FakeCallType::Create,
            gas: *gas,
            sender_address: None,
            receive_address: None,
            value: Some(*value),
            data: data.to_vec(),
            code_address: None,
        });
        Ok(self
            .fake_create_result
            .take()
            .unwrap_or(ContractCreateResult::Failed))
    }

    fn call(
        &mut self,
        gas: U256,
        sender_address: &Address,
        receive_address: &Address,
        value: ActionValue,
        data: &[u8],
        code_address: &Address,
        _call_type: CallType,
        _trap: bool,
    ) -> std::result::Result<MessageCallResult, TrapKind> {
        self.calls.push(FakeCall {
            call_type: FakeCallType::Call,
            gas,
            sender_address: Some(*sender_address),
            receive_address: Some(*receive_address),
            value: Some(value.value()),
            data: data.to_vec(),
            code_address: Some(*code_address),
        });
        Ok(self.fake_call_result.take().unwrap_or(MessageCallResult::Failed))
    }

    fn extcode(&self, address: &Address) -> Result<Option<Arc<Vec<u8>>>> {
        Ok(self.codes.get(address).cloned())
    }

    fn extcodesize(&self, address: &Address) -> Result<Option<usize>> {
        Ok(self.codes.get(address).map(|c| c.len()))
    }

    fn log(&mut self, topics: Vec<H256>, data: &[u8]) -> Result<()> {
        self.logs.push(FakeLogEntry {
            topics,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn suicide(&mut self, refund_address: &Address) -> Result<()> {
        self.suicides.insert(*refund_address);
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
        self.sstore_refund += value as i64;
    }

    fn sub_refund(&mut self, value: usize) {
        self.sstore_refund -= value as i64;
    }

    fn is_static(&self) -> bool {
        self.is_static
    }
}

/// Collapse a frame's `GasLeft` into a plain gas-left number, the way
/// test assertions want it. Dropping the returned data is fine; tests
/// that care about it inspect `GasLeft::NeedsReturn` directly instead.
pub fn test_finalize(result: Result<GasLeft>) -> Result<U256> {
    match result {
        Ok(GasLeft::Known(gas)) => Ok(gas),
        Ok(GasLeft::NeedsReturn { gas_left, .. }) => Ok(gas_left),
        Err(e) => Err(e),
    }
}

/// Build a bare `ActionParams` with `gas` available and the rest zeroed,
/// the common starting point for interpreter tests.
pub fn fake_params(gas: U256, code: Vec<u8>) -> ActionParams {
    ActionParams {
        gas,
        code: Some(Arc::new(code)),
        ..ActionParams::default()
    }
}

#[allow(dead_code)]
fn _assert_error_is_std_error(e: Error) -> Box<dyn std::error::Error> {
    Box::new(e)
}
