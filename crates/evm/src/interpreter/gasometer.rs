//! Turns an instruction plus the current stack/memory/state into a gas
//! cost, following the formulas pinned by the active `Schedule`.

use ethereum_types::{BigEndianHash, H256, U256};
use vm::{CallType, Error, Ext, Result};

use crate::instructions::{self, Instruction, InstructionInfo};
use crate::interpreter::memory::{align_to_word, word_count};
use crate::interpreter::stack::Stack;

/// A cost representation the gasometer can be generic over: `u64` for the
/// common case, `U256` when a caller needs to track gas past `u64::MAX`
/// (e.g. gas-unmetered test harnesses).
pub trait CostType:
    Sized
    + From<usize>
    + Copy
    + Send
    + Sync
    + std::fmt::Debug
    + Ord
    + std::ops::Add<Output = Self>
    + std::ops::Sub<Output = Self>
    + std::ops::Mul<Output = Self>
    + std::ops::Div<Output = Self>
{
    fn as_u256(&self) -> U256;
    fn from_u256(val: U256) -> Result<Self>;
    fn as_usize(&self) -> usize;
    /// `(self + other, overflowed)`.
    fn overflow_add(self, other: Self) -> (Self, bool);
    /// `(self * other, overflowed)`.
    fn overflow_mul(self, other: Self) -> (Self, bool);
    /// `((self * other) >> shr, overflowed)`, computed without an
    /// intermediate overflow when the shift would otherwise bring the
    /// product back into range.
    fn overflow_mul_shr(self, other: Self, shr: usize) -> (Self, bool);
}

impl CostType for u64 {
    fn as_u256(&self) -> U256 {
        U256::from(*self)
    }

    fn from_u256(val: U256) -> Result<Self> {
        if val <= U256::from(u64::MAX) {
            Ok(val.low_u64())
        } else {
            Err(Error::OutOfGas)
        }
    }

    fn as_usize(&self) -> usize {
        *self as usize
    }

    fn overflow_add(self, other: Self) -> (Self, bool) {
        self.overflowing_add(other)
    }

    fn overflow_mul(self, other: Self) -> (Self, bool) {
        self.overflowing_mul(other)
    }

    fn overflow_mul_shr(self, other: Self, shr: usize) -> (Self, bool) {
        let x = self as u128;
        let y = other as u128;
        let (product, overflow) = x.overflowing_mul(y);
        let shifted = product >> shr;
        if overflow || shifted > u64::MAX as u128 {
            (u64::MAX, true)
        } else {
            (shifted as u64, false)
        }
    }
}

impl CostType for U256 {
    fn as_u256(&self) -> U256 {
        *self
    }

    fn from_u256(val: U256) -> Result<Self> {
        Ok(val)
    }

    fn as_usize(&self) -> usize {
        self.low_u64() as usize
    }

    fn overflow_add(self, other: Self) -> (Self, bool) {
        self.overflowing_add(other)
    }

    fn overflow_mul(self, other: Self) -> (Self, bool) {
        self.overflowing_mul(other)
    }

    fn overflow_mul_shr(self, other: Self, shr: usize) -> (Self, bool) {
        let (product, overflow) = self.overflowing_mul(other);
        (product >> shr, overflow)
    }
}

/// Offsets/sizes above this immediately trigger `OUT_OF_GAS` rather than
/// being truncated into a `usize` (which would panic on any 64-bit host
/// once the value exceeds `usize::MAX`, and silently wrap on fewer bits
/// otherwise). No real memory expansion or gas schedule ever prices a
/// range this large, so nothing valid is rejected by gating on it first.
const MAX_OFFSET: u64 = (1u64 << 53) - 1;

fn checked_offset(value: U256) -> Result<usize> {
    if value > U256::from(MAX_OFFSET) {
        Err(Error::OutOfGas)
    } else {
        Ok(value.as_usize())
    }
}

/// What an instruction needs before it can run: the gas to deduct, how
/// much of it should be forwarded to a nested call/create, and how large
/// memory must grow.
pub struct InstructionRequirements<Gas> {
    pub gas_cost: Gas,
    pub memory_required_size: usize,
    pub memory_total_gas: Gas,
}

/// Tracks the running cost of memory expansion across an execution, since
/// `MSIZE` et al. charge only for the *incremental* growth.
pub struct Gasometer<Gas> {
    pub current_gas: Gas,
    current_mem_gas: Gas,
}

fn mem_gas<Gas: CostType>(schedule_memory_gas: usize, quad_coeff_div: usize, words: usize) -> Gas {
    let words = Gas::from(words);
    let linear = words.overflow_mul(Gas::from(schedule_memory_gas));
    if linear.1 {
        return Gas::from(usize::MAX);
    }
    let quad = words.overflow_mul_shr(words, 0);
    // quad coefficient: words^2 / quad_coeff_div
    let (squared, sq_overflow) = quad;
    if sq_overflow {
        return Gas::from(usize::MAX);
    }
    let quad_term = squared / Gas::from(quad_coeff_div);
    let (total, overflow) = linear.0.overflow_add(quad_term);
    if overflow {
        Gas::from(usize::MAX)
    } else {
        total
    }
}

impl<Gas: CostType> Gasometer<Gas> {
    pub fn new(current_gas: Gas) -> Self {
        Gasometer {
            current_gas,
            current_mem_gas: Gas::from(0),
        }
    }

    pub fn verify_gas(&self, gas_cost: &Gas) -> Result<()> {
        if self.current_gas < *gas_cost {
            Err(Error::OutOfGas)
        } else {
            Ok(())
        }
    }

    /// Gas cost of expanding memory to `size` bytes, charging only the
    /// growth since the last call.
    fn mem_expansion_gas(&mut self, schedule: &vm::Schedule, size: usize) -> Gas {
        if size == 0 {
            return Gas::from(0);
        }
        let words = word_count(align_to_word(size));
        let new_mem_gas = mem_gas::<Gas>(schedule.memory_gas, schedule.quad_coeff_div, words);
        if new_mem_gas > self.current_mem_gas {
            let cost = new_mem_gas - self.current_mem_gas;
            self.current_mem_gas = new_mem_gas;
            cost
        } else {
            Gas::from(0)
        }
    }

    /// Largest memory offset (in bytes) an instruction's stack operands
    /// reach into, or 0 if the instruction doesn't touch memory. Fails
    /// with `OUT_OF_GAS` rather than panicking when an offset is absurdly
    /// large (see `checked_offset`).
    fn mem_written_size(instruction: Instruction, stack: &dyn Stack<U256>) -> Result<usize> {
        use instructions::*;

        let end = |offset: &U256, size: &U256| -> Result<usize> {
            if size.is_zero() {
                Ok(0)
            } else {
                checked_offset(offset.saturating_add(*size))
            }
        };

        match instruction {
            MLOAD => end(stack.peek(0), &U256::from(32)),
            MSTORE => end(stack.peek(0), &U256::from(32)),
            MSTORE8 => end(stack.peek(0), &U256::from(1)),
            SHA3 => end(stack.peek(0), stack.peek(1)),
            CALLDATACOPY | CODECOPY => end(stack.peek(0), stack.peek(2)),
            EXTCODECOPY => end(stack.peek(1), stack.peek(3)),
            RETURN => end(stack.peek(0), stack.peek(1)),
            LOG0 | LOG1 | LOG2 | LOG3 | LOG4 => end(stack.peek(0), stack.peek(1)),
            CREATE => end(stack.peek(1), stack.peek(2)),
            CALL | CALLCODE => {
                let in_end = end(stack.peek(3), stack.peek(4))?;
                let out_end = end(stack.peek(5), stack.peek(6))?;
                Ok(in_end.max(out_end))
            }
            DELEGATECALL => {
                let in_end = end(stack.peek(2), stack.peek(3))?;
                let out_end = end(stack.peek(4), stack.peek(5))?;
                Ok(in_end.max(out_end))
            }
            _ => Ok(0),
        }
    }

    /// Compute the full cost of running `instruction`, given the current
    /// stack (read-only: arguments are peeked, never popped here).
    pub fn requirements(
        &mut self,
        ext: &dyn Ext,
        instruction: Instruction,
        info: &InstructionInfo,
        stack: &dyn Stack<U256>,
    ) -> Result<InstructionRequirements<Gas>> {
        let schedule = ext.schedule();
        let mut gas_cost = Gas::from(info.tier.gas());

        match instruction {
            instructions::SHA3 => {
                let words = word_count(checked_offset(stack.peek(1).saturating_add(U256::from(31)))?);
                gas_cost = Gas::from(schedule.sha3_gas).overflow_add(Gas::from(schedule.sha3_word_gas).overflow_mul(Gas::from(words)).0).0;
            }
            instructions::EXP => {
                let expon = stack.peek(1);
                let bytes = ((expon.bits() + 7) / 8).max(if expon.is_zero() { 0 } else { 1 });
                gas_cost = Gas::from(schedule.exp_gas).overflow_add(Gas::from(schedule.exp_byte_gas).overflow_mul(Gas::from(bytes)).0).0;
            }
            instructions::SLOAD => {
                gas_cost = Gas::from(schedule.sload_gas);
            }
            instructions::SSTORE => {
                let key = H256::from_uint(stack.peek(0));
                let current = ext.storage_at(&key)?;
                let new_is_zero = stack.peek(1).is_zero();
                let current_is_zero = current.is_zero();
                gas_cost = if current_is_zero && !new_is_zero {
                    Gas::from(schedule.sstore_set_gas)
                } else {
                    Gas::from(schedule.sstore_reset_gas)
                };
            }
            instructions::EXTCODESIZE => {
                gas_cost = Gas::from(schedule.extcodesize_gas);
            }
            instructions::EXTCODECOPY => {
                let words = word_count(checked_offset(stack.peek(3).saturating_add(U256::from(31)))?);
                gas_cost = Gas::from(schedule.extcodecopy_base_gas).overflow_add(Gas::from(schedule.copy_gas).overflow_mul(Gas::from(words)).0).0;
            }
            instructions::CALLDATACOPY | instructions::CODECOPY => {
                let words = word_count(checked_offset(stack.peek(2).saturating_add(U256::from(31)))?);
                gas_cost = gas_cost.overflow_add(Gas::from(schedule.copy_gas).overflow_mul(Gas::from(words)).0).0;
            }
            instructions::BALANCE => {
                gas_cost = Gas::from(schedule.balance_gas);
            }
            instructions::BLOCKHASH => {
                gas_cost = Gas::from(schedule.blockhash_gas);
            }
            instructions::LOG0 | instructions::LOG1 | instructions::LOG2 | instructions::LOG3 | instructions::LOG4 => {
                let topics = instructions::log_topics(instruction);
                let data_len = checked_offset(*stack.peek(1))?;
                let cost = schedule.log_gas
                    + topics * schedule.log_topic_gas
                    + data_len * schedule.log_data_gas;
                gas_cost = Gas::from(cost);
            }
            instructions::CREATE => {
                gas_cost = Gas::from(schedule.create_gas);
            }
            instructions::CALL | instructions::CALLCODE | instructions::DELEGATECALL => {
                gas_cost = Gas::from(schedule.call_gas);
            }
            instructions::SUICIDE => {
                gas_cost = Gas::from(schedule.suicide_gas);
            }
            _ => {}
        }

        let memory_required_size = Self::mem_written_size(instruction, stack)?;
        let memory_total_gas = self.mem_expansion_gas(schedule, memory_required_size);

        Ok(InstructionRequirements {
            gas_cost,
            memory_required_size,
            memory_total_gas,
        })
    }

    /// Charge the value-transfer and new-account surcharges for a
    /// `CALL`/`CALLCODE`/`DELEGATECALL` on top of the flat base cost the
    /// generic `requirements()` pass already deducted, and return the
    /// stipend (`0` for `CREATE`, which has none of this) the callee gets
    /// in addition to whatever gas the caller forwards.
    pub fn charge_call_extras(
        &mut self,
        schedule: &vm::Schedule,
        call_type: CallType,
        value_is_transfer: bool,
        target_exists_and_not_null: bool,
    ) -> Result<Gas> {
        let mut extra = Gas::from(0);
        let mut stipend = Gas::from(0);

        if value_is_transfer {
            extra = Gas::from(schedule.call_value_transfer_gas);
            stipend = Gas::from(schedule.call_stipend);
        }
        if call_type == CallType::Call && value_is_transfer && !target_exists_and_not_null {
            let (sum, overflow) = extra.overflow_add(Gas::from(schedule.call_new_account_gas));
            if overflow {
                return Err(Error::OutOfGas);
            }
            extra = sum;
        }

        self.verify_gas(&extra)?;
        self.current_gas = self.current_gas - extra;
        Ok(stipend)
    }

    /// Gas forwarded to a nested call/create under EIP-150's 63/64 rule:
    /// `min(requested, gas_left - gas_left / 64)`, or all of `gas_left -
    /// gas_left / 64` when nothing was explicitly requested (`CREATE`).
    pub fn cap_call_gas(&self, schedule: &vm::Schedule, requested_gas: Option<U256>) -> Gas {
        let cap = self.current_gas - self.current_gas / Gas::from(schedule.sub_gas_cap_divisor);
        match requested_gas {
            Some(req) => {
                let req = Gas::from_u256(req).unwrap_or(cap);
                if req < cap {
                    req
                } else {
                    cap
                }
            }
            None => cap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_gas_is_quadratic() {
        let cheap: u64 = mem_gas(3, 512, 1);
        let costly: u64 = mem_gas(3, 512, 1000);
        assert!(costly > cheap * 100);
    }

    #[test]
    fn verify_gas_rejects_insufficient_gas() {
        let g: Gasometer<u64> = Gasometer::new(10);
        assert!(g.verify_gas(&11).is_err());
        assert!(g.verify_gas(&10).is_ok());
    }

    #[test]
    fn checked_offset_rejects_values_above_the_ceiling() {
        assert!(checked_offset(U256::from(MAX_OFFSET)).is_ok());
        assert!(checked_offset(U256::from(MAX_OFFSET) + 1).is_err());
        assert!(checked_offset(U256::MAX).is_err());
    }
}
