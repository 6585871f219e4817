//! Support library consumed by the interpreter: the state-backend trait
//! (`Ext`), frame parameters, the cost schedule, and shared error types.
//!
//! This crate carries no opcode logic of its own; it is the seam between
//! the interpreter (which only knows about stack/memory/gas) and whatever
//! owns accounts, storage and the block context.

pub mod action_params;
pub mod error;
pub mod return_data;
pub mod schedule;

#[cfg(any(test, feature = "test-helpers"))]
pub mod tests;

use std::sync::Arc;

use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use rlp::RlpStream;

pub use action_params::{ActionParams, ActionValue, CreateContractAddress};
pub use error::{Error, ExecTrapError, ExecTrapResult, Result, TrapError, TrapKind, TrapResult};
pub use return_data::ReturnData;
pub use schedule::Schedule;

/// How a frame was entered. `None` marks the synthetic top-level frame of
/// a transaction (neither a `CALL` nor a `CREATE` reached it from EVM
/// code).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CallType {
    /// Not called, i.e. this is the initial call.
    None,
    /// Call `CALL`.
    Call,
    /// Call `CALLCODE`.
    CallCode,
    /// Call `DELEGATECALL`.
    DelegateCall,
}

/// Result of a `CALL`/`CALLCODE`/`DELEGATECALL`.
#[derive(Debug)]
pub enum MessageCallResult {
    /// Returned when message call was successful.
    /// Contains the gas left and output data.
    Success(U256, ReturnData),
    /// Returned when message call failed without explicit revert
    /// (ran out of gas, hit an `Error`).
    Failed,
    /// Returned when message call was reverted.
    /// Contains the gas left and output data.
    Reverted(U256, ReturnData),
}

/// Result of a `CREATE`.
#[derive(Debug)]
pub enum ContractCreateResult {
    /// Returned when the contract was successfully created.
    /// Contains an address of the created contract and the gas left.
    Created(Address, U256),
    /// Returned when contract creation failed.
    /// VM doesn't have to know the reason.
    Failed,
    /// Returned when contract creation was reverted.
    /// Contains the gas left and output data.
    Reverted(U256, ReturnData),
}

/// Gas Left: either it is a known value, or it needs to be computed by
/// the caller (after the stack's been the `RETURN`/`STOP` data has been
/// copied out).
#[derive(Debug)]
pub enum GasLeft {
    /// Known gas left.
    Known(U256),
    /// Return or Revert with provided data and gas left.
    NeedsReturn {
        /// Amount of gas left.
        gas_left: U256,
        /// Data used to compute the final gas left.
        data: ReturnData,
        /// Whether to apply the state changes.
        apply_state: bool,
    },
}

/// Block and chain context visible to opcodes like `COINBASE`/`TIMESTAMP`.
#[derive(Debug, Clone)]
pub struct EnvInfo {
    pub number: u64,
    pub author: Address,
    pub timestamp: u64,
    pub difficulty: U256,
    pub gas_limit: U256,
}

impl Default for EnvInfo {
    fn default() -> Self {
        EnvInfo {
            number: 0,
            author: Address::zero(),
            timestamp: 0,
            difficulty: U256::zero(),
            gas_limit: U256::zero(),
        }
    }
}

/// Resumes a suspended frame once a nested `CALL`/`CALLCODE`/`DELEGATECALL`
/// has produced a result.
pub trait ResumeCall: Send {
    fn resume_call(self: Box<Self>, result: MessageCallResult) -> Box<dyn Exec>;
}

/// Resumes a suspended frame once a nested `CREATE` has produced a result.
pub trait ResumeCreate: Send {
    fn resume_create(self: Box<Self>, result: ContractCreateResult) -> Box<dyn Exec>;
}

/// A runnable (possibly partially executed) frame.
pub trait Exec: Send {
    /// Execute the frame to completion, or until it needs to suspend for
    /// a nested call/create.
    fn exec(self: Box<Self>, ext: &mut dyn Ext) -> ExecTrapResult<GasLeft>;
}

/// The state-backend and host-environment interface the interpreter is
/// generic over. Implementations own accounts, storage and block context;
/// the interpreter only ever sees this trait.
pub trait Ext {
    /// Returns the storage value for a given key if reachable.
    fn storage_at(&self, key: &H256) -> Result<H256>;

    /// Sets storage value for a given key.
    fn set_storage(&mut self, key: H256, value: H256) -> Result<()>;

    /// Determine whether an account exists.
    fn exists(&self, address: &Address) -> Result<bool>;

    /// Determine whether an account exists and is not null (zero balance,
    /// zero nonce, zero code).
    fn exists_and_not_null(&self, address: &Address) -> Result<bool>;

    /// Balance of the current account.
    fn balance(&self, address: &Address) -> Result<U256>;

    /// Returns the hash of one of the 256 most recent complete blocks.
    fn blockhash(&mut self, number: &U256) -> H256;

    /// Creates new contract.
    ///
    /// Returns either the suspend-trap error (which carries the
    /// parameters of the contract to be created) or the create result
    /// for backends that execute synchronously.
    fn create(
        &mut self,
        gas: &U256,
        value: &U256,
        code: &[u8],
        address: CreateContractAddress,
        trap: bool,
    ) -> std::result::Result<ContractCreateResult, TrapKind>;

    /// Message call.
    #[allow(clippy::too_many_arguments)]
    fn call(
        &mut self,
        gas: U256,
        sender_address: &Address,
        receive_address: &Address,
        value: ActionValue,
        data: &[u8],
        code_address: &Address,
        call_type: CallType,
        trap: bool,
    ) -> std::result::Result<MessageCallResult, TrapKind>;

    /// Returns code at given address.
    fn extcode(&self, address: &Address) -> Result<Option<Arc<Vec<u8>>>>;

    /// Returns code size at given address.
    fn extcodesize(&self, address: &Address) -> Result<Option<usize>>;

    /// Creates log entry with given topics and data.
    fn log(&mut self, topics: Vec<H256>, data: &[u8]) -> Result<()>;

    /// Should be called when transaction calls `SELFDESTRUCT`.
    /// Address to which funds should be refunded.
    fn suicide(&mut self, refund_address: &Address) -> Result<()>;

    /// Returns the schedule for the current execution context.
    fn schedule(&self) -> &Schedule;

    /// Returns environment info.
    fn env_info(&self) -> &EnvInfo;

    /// Returns current depth of execution.
    fn depth(&self) -> usize;

    /// Increments the gas refund counter (`SSTORE` clears and
    /// `SELFDESTRUCT` both feed the same counter).
    fn add_refund(&mut self, value: usize);

    /// Decrements the gas refund counter.
    fn sub_refund(&mut self, value: usize);

    /// Decide if any more operations should be traced. Passed the
    /// depth of the context and the gas cost.
    fn trace_next_instruction(&mut self, _pc: usize, _instruction: u8, _current_gas: U256) -> bool {
        false
    }

    /// Prepare to trace an operation. Passed the gas operation cost.
    fn trace_prepare_execute(
        &mut self,
        _pc: usize,
        _instruction: u8,
        _gas_cost: U256,
        _mem_written: Option<(usize, usize)>,
        _store_written: Option<(H256, H256)>,
    ) {
    }

    /// Trace the finalised execution of a single instruction.
    fn trace_executed(&mut self, _gas_used: U256, _stack_push: &[U256], _mem: &[u8]) {}

    /// Check if running in static context.
    fn is_static(&self) -> bool;
}

/// Derive a `CREATE`d contract's address from its sender and nonce:
/// `keccak256(rlp([sender, nonce]))[12..]`. `CREATE2`'s salt-based scheme
/// is outside this schedule's opcode set, so `CreateContractAddress` has
/// only the one variant and this is the only derivation this crate needs.
pub fn contract_address(scheme: CreateContractAddress, sender: &Address, nonce: &U256) -> Address {
    match scheme {
        CreateContractAddress::FromSenderAndNonce => {
            let mut stream = RlpStream::new_list(2);
            stream.append(sender);
            stream.append(nonce);
            Address::from_slice(&keccak(stream.as_raw()).as_bytes()[12..])
        }
    }
}
