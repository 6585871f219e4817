//! Parameters for a single EVM frame (external call/create, or the
//! synthetic top-level frame of a transaction).

use crate::CallType;
use ethereum_types::{Address, H256, U256};
use std::sync::Arc;

/// Where a CREATE's contract address is derived from. CREATE2
/// (`FromSenderSaltAndCodeHash`) is outside this schedule's opcode set.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CreateContractAddress {
    /// Address is calculated from `sender` and `nonce`.
    FromSenderAndNonce,
}

/// How much value a frame carries, and whether the call actually moves
/// balance (`Transfer`) or merely reports a value the callee should see
/// without a corresponding debit (`Apparent`, used by `DELEGATECALL`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ActionValue {
    /// Value transferred alongside the call/create; this amount is
    /// actually debited from the sender and credited to the receiver.
    Transfer(U256),
    /// Value the callee observes via `CALLVALUE` without any balance
    /// movement (`DELEGATECALL` inherits the parent's value this way).
    Apparent(U256),
}

impl ActionValue {
    pub fn value(&self) -> U256 {
        match *self {
            ActionValue::Transfer(x) | ActionValue::Apparent(x) => x,
        }
    }
}

/// Parameters for a single frame of EVM execution.
#[derive(Debug, Clone)]
pub struct ActionParams {
    /// Address of the code currently executing (differs from `address`
    /// for CALLCODE/DELEGATECALL, where code runs under the caller's
    /// storage).
    pub code_address: Address,
    /// Hash of the code currently executing, used to key the jump-dest
    /// validity cache.
    pub code_hash: Option<H256>,
    /// Address whose storage this frame reads/writes.
    pub address: Address,
    /// Sender of this frame (`CALLER`).
    pub sender: Address,
    /// Transaction initiator (`ORIGIN`), unchanged across nested frames.
    pub origin: Address,
    /// Gas available to this frame.
    pub gas: U256,
    /// Gas price of the enclosing transaction.
    pub gas_price: U256,
    /// Value carried by this frame.
    pub value: ActionValue,
    /// Call data / init code input.
    pub data: Option<Vec<u8>>,
    /// Code to execute.
    pub code: Option<Arc<Vec<u8>>>,
    /// How this frame was entered.
    pub call_type: CallType,
    /// Whether the frame may mutate state (always false in this schedule;
    /// kept for the `MutableCallInStaticContext` exception class named in
    /// `spec.md`'s Frame state machine as a "future extension").
    pub is_static: bool,
}

impl Default for ActionParams {
    fn default() -> Self {
        ActionParams {
            code_address: Address::zero(),
            code_hash: None,
            address: Address::zero(),
            sender: Address::zero(),
            origin: Address::zero(),
            gas: U256::zero(),
            gas_price: U256::zero(),
            value: ActionValue::Transfer(U256::zero()),
            data: None,
            code: None,
            call_type: CallType::None,
            is_static: false,
        }
    }
}
