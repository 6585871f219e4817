//! Stack-based bytecode interpreter: fetch-decode-execute loop, one
//! opcode at a time, over the schedule this crate implements (post-EIP-150,
//! pre-Byzantium; see `crate::instructions`).

pub mod gasometer;
mod informant;
pub mod memory;
pub mod shared_cache;
pub mod stack;

use std::sync::Arc;

use bit_set::BitSet;
use ethereum_types::{Address, BigEndianHash, H256, U256};
use num_bigint::BigUint;

use vm::{
    ActionParams, ActionValue, CallType, ContractCreateResult, CreateContractAddress, Error, Exec,
    ExecTrapResult, Ext, GasLeft, MessageCallResult, ReturnData,
};

use crate::instructions::{self, Instruction, InstructionInfo};
use gasometer::{CostType, Gasometer};
use informant::EvmInformant;
use memory::{align_to_word, Memory};
use shared_cache::SharedCache;
use stack::{Stack, VecStack};

/// A cursor over the running code, responsible for fetching opcodes and
/// decoding `PUSH` immediates.
struct CodeReader {
    position: usize,
    code: Arc<Vec<u8>>,
}

impl CodeReader {
    fn new(code: Arc<Vec<u8>>) -> Self {
        CodeReader { position: 0, code }
    }

    fn len(&self) -> usize {
        self.code.len()
    }

    fn at(&self, position: usize) -> u8 {
        self.code.get(position).copied().unwrap_or(0)
    }

    /// Read the next `size` bytes as a big-endian immediate and advance
    /// past them. Reads past the end of the code are zero-padded, per
    /// the yellow paper's implicit `STOP`-padding rule.
    fn read_push(&mut self, size: usize) -> U256 {
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes[32 - size..].iter_mut().enumerate() {
            *byte = self.at(self.position + i);
        }
        self.position += size;
        U256::from_big_endian(&bytes)
    }
}

fn u256_to_address(value: U256) -> Address {
    let bytes = value.to_big_endian();
    Address::from_slice(&bytes[12..])
}

fn address_to_u256(value: Address) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

fn to_biguint(value: U256) -> BigUint {
    let bytes = value.to_big_endian();
    BigUint::from_bytes_be(&bytes)
}

fn from_biguint(value: BigUint) -> U256 {
    let bytes = value.to_bytes_be();
    let mut padded = [0u8; 32];
    let start = 32 - bytes.len().min(32);
    padded[start..].copy_from_slice(&bytes[bytes.len().saturating_sub(32)..]);
    U256::from_big_endian(&padded)
}

/// Two's-complement sign/magnitude split: `(magnitude, was_negative)`.
fn get_and_reset_sign(value: U256) -> (U256, bool) {
    let negative = value.bit(255);
    (set_sign(value, negative), negative)
}

/// Apply (or remove) a two's-complement negative sign.
fn set_sign(value: U256, negative: bool) -> U256 {
    if negative {
        (!value).overflowing_add(U256::one()).0
    } else {
        value
    }
}

fn wrapping_pow(mut base: U256, mut exponent: U256) -> U256 {
    let mut result = U256::one();
    while !exponent.is_zero() {
        if exponent.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        exponent >>= 1;
        base = base.overflowing_mul(base).0;
    }
    result
}

/// Write `data` (truncated to `size` bytes) into `mem` at `offset`. The
/// space for `size` bytes was already paid for and allocated by the
/// gasometer before the call/create was made; a shorter `data` is simply
/// a shorter write, never zero-padded past its own length.
fn write_returned_data(mem: &mut Vec<u8>, offset: usize, size: usize, data: &[u8]) {
    let len = data.len().min(size);
    if len == 0 {
        return;
    }
    mem.write_slice(offset, &data[..len]);
}

/// A runnable frame over one piece of code. Generic over the gas
/// representation (`u64` in production; `U256` for tests that want to
/// exceed `u64::MAX`).
pub struct Interpreter<Cost: CostType> {
    mem: Vec<u8>,
    cache: SharedCache,
    params: ActionParams,
    reader: CodeReader,
    gasometer: Gasometer<Cost>,
    stack: VecStack<U256>,
    return_data: ReturnData,
    valid_jump_destinations: Option<Arc<BitSet>>,
}

impl<Cost: CostType> Interpreter<Cost> {
    pub fn new(params: ActionParams, cache: SharedCache) -> Self {
        let gas = Cost::from_u256(params.gas).unwrap_or_else(|_| Cost::from(usize::MAX));
        let code = params.code.clone().unwrap_or_default();
        Interpreter {
            mem: Vec::new(),
            cache,
            reader: CodeReader::new(code),
            gasometer: Gasometer::new(gas),
            stack: VecStack::with_capacity(1024),
            return_data: ReturnData::empty(),
            valid_jump_destinations: None,
            params,
        }
    }

    fn verify_instruction(&self, ext: &dyn Ext, instruction: Instruction, info: &InstructionInfo) -> vm::Result<()> {
        if !self.stack.has(info.args) {
            return Err(Error::StackUnderflow {
                instruction: info.name,
                wanted: info.args,
                on_stack: self.stack.size(),
            });
        }
        if self.stack.size() - info.args + info.ret > ext.schedule().stack_limit {
            return Err(Error::OutOfStack {
                instruction: info.name,
                wanted: info.ret - info.args,
                limit: ext.schedule().stack_limit,
            });
        }
        if ext.is_static() {
            let mutates = matches!(
                instruction,
                instructions::SSTORE
                    | instructions::LOG0
                    | instructions::LOG1
                    | instructions::LOG2
                    | instructions::LOG3
                    | instructions::LOG4
                    | instructions::CREATE
                    | instructions::CALL
                    | instructions::CALLCODE
                    | instructions::SUICIDE
            );
            if mutates {
                return Err(Error::MutableCallInStaticContext);
            }
        }
        Ok(())
    }

    fn jump_destinations(&mut self) -> Arc<BitSet> {
        if let Some(ref d) = self.valid_jump_destinations {
            return d.clone();
        }
        let d = self.cache.jump_destinations(&self.params.code_hash, &self.reader.code);
        self.valid_jump_destinations = Some(d.clone());
        d
    }

    fn do_jump(&mut self, destination: U256) -> vm::Result<()> {
        if destination > U256::from(usize::MAX) {
            return Err(Error::BadJumpDestination { destination: usize::MAX });
        }
        let dest = destination.low_u64() as usize;
        let dests = self.jump_destinations();
        if dest < self.reader.len() && dests.contains(dest) {
            self.reader.position = dest;
            Ok(())
        } else {
            Err(Error::BadJumpDestination { destination: dest })
        }
    }

    /// Run until `STOP`/`RETURN`/`SUICIDE`/error, driving nested calls
    /// synchronously through `ext`. `ext.call`/`ext.create` run a nested
    /// frame to completion before returning, so this never actually
    /// produces the suspend-trap branch of `Exec::exec`'s result type.
    fn run(&mut self, ext: &mut dyn Ext) -> vm::Result<GasLeft> {
        loop {
            if self.reader.position >= self.reader.len() {
                return Ok(GasLeft::Known(self.gasometer.current_gas.as_u256()));
            }

            let pc = self.reader.position;
            let instruction = self.reader.at(pc);
            self.reader.position += 1;

            EvmInformant::before_instruction(ext, pc, instruction, self.gasometer.current_gas.as_u256());

            let info = instructions::get_info(instruction).ok_or(Error::BadInstruction { instruction })?;
            self.verify_instruction(ext, instruction, &info)?;

            let requirements = self.gasometer.requirements(ext, instruction, &info, &self.stack)?;
            let (total_cost, overflow) = requirements.gas_cost.overflow_add(requirements.memory_total_gas);
            if overflow {
                return Err(Error::OutOfGas);
            }
            self.gasometer.verify_gas(&total_cost)?;
            self.gasometer.current_gas = self.gasometer.current_gas - total_cost;
            self.mem.expand(align_to_word(requirements.memory_required_size));

            if let Some(result) = self.exec_instruction(ext, instruction)? {
                return Ok(result);
            }
        }
    }

    /// Execute one instruction. Returns `Some(GasLeft)` when execution is
    /// finished (`STOP`/`RETURN`/`SUICIDE`), `None` to keep looping.
    fn exec_instruction(&mut self, ext: &mut dyn Ext, instruction: Instruction) -> vm::Result<Option<GasLeft>> {
        use instructions::*;

        match instruction {
            STOP => return Ok(Some(GasLeft::Known(self.gasometer.current_gas.as_u256()))),

            ADD => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a.overflowing_add(b).0);
            }
            MUL => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a.overflowing_mul(b).0);
            }
            SUB => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a.overflowing_sub(b).0);
            }
            DIV => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(if b.is_zero() { U256::zero() } else { a / b });
            }
            SDIV => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                let (a, sign_a) = get_and_reset_sign(a);
                let (b, sign_b) = get_and_reset_sign(b);
                self.stack.push(if b.is_zero() { U256::zero() } else { set_sign(a / b, sign_a != sign_b) });
            }
            MOD => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(if b.is_zero() { U256::zero() } else { a % b });
            }
            SMOD => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                let (a, sign_a) = get_and_reset_sign(a);
                let (b, _) = get_and_reset_sign(b);
                self.stack.push(if b.is_zero() { U256::zero() } else { set_sign(a % b, sign_a) });
            }
            ADDMOD => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                let n = self.stack.pop_back();
                self.stack.push(if n.is_zero() {
                    U256::zero()
                } else {
                    from_biguint((to_biguint(a) + to_biguint(b)) % to_biguint(n))
                });
            }
            MULMOD => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                let n = self.stack.pop_back();
                self.stack.push(if n.is_zero() {
                    U256::zero()
                } else {
                    from_biguint((to_biguint(a) * to_biguint(b)) % to_biguint(n))
                });
            }
            EXP => {
                let base = self.stack.pop_back();
                let exponent = self.stack.pop_back();
                self.stack.push(wrapping_pow(base, exponent));
            }
            SIGNEXTEND => {
                let bit = self.stack.pop_back();
                if bit < U256::from(32) {
                    let number = self.stack.pop_back();
                    let bit_position = (bit.low_u32() * 8 + 7) as usize;
                    let sign_bit = number.bit(bit_position);
                    let mask = (U256::one() << bit_position) - U256::one();
                    self.stack.push(if sign_bit { number | !mask } else { number & mask });
                }
            }

            LT => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(bool_to_u256(a < b));
            }
            GT => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(bool_to_u256(a > b));
            }
            SLT => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(bool_to_u256(signed_compare(a, b) == std::cmp::Ordering::Less));
            }
            SGT => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(bool_to_u256(signed_compare(a, b) == std::cmp::Ordering::Greater));
            }
            EQ => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(bool_to_u256(a == b));
            }
            ISZERO => {
                let a = self.stack.pop_back();
                self.stack.push(bool_to_u256(a.is_zero()));
            }
            AND => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a & b);
            }
            OR => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a | b);
            }
            XOR => {
                let a = self.stack.pop_back();
                let b = self.stack.pop_back();
                self.stack.push(a ^ b);
            }
            NOT => {
                let a = self.stack.pop_back();
                self.stack.push(!a);
            }
            BYTE => {
                let index = self.stack.pop_back();
                let value = self.stack.pop_back();
                self.stack.push(if index >= U256::from(32) {
                    U256::zero()
                } else {
                    let i = index.low_u32() as usize;
                    U256::from(value.byte(31 - i))
                });
            }

            SHA3 => {
                let offset = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let data = self.mem.read_slice(offset, size);
                let hash = keccak_hash::keccak(data);
                self.stack.push(U256::from_big_endian(hash.as_bytes()));
            }

            ADDRESS => self.stack.push(address_to_u256(self.params.address)),
            BALANCE => {
                let address = u256_to_address(self.stack.pop_back());
                self.stack.push(ext.balance(&address)?);
            }
            ORIGIN => self.stack.push(address_to_u256(self.params.origin)),
            CALLER => self.stack.push(address_to_u256(self.params.sender)),
            CALLVALUE => self.stack.push(self.params.value.value()),
            CALLDATALOAD => {
                let offset = self.stack.pop_back().as_usize();
                self.stack.push(read_padded_word(self.params.data.as_deref().unwrap_or(&[]), offset));
            }
            CALLDATASIZE => self.stack.push(U256::from(self.params.data.as_ref().map_or(0, |d| d.len()))),
            CALLDATACOPY => {
                let dest = self.stack.pop_back().as_usize();
                let src = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let data = self.params.data.clone().unwrap_or_default();
                self.mem.copy_from(&data, src, dest, size);
            }
            CODESIZE => self.stack.push(U256::from(self.reader.len())),
            CODECOPY => {
                let dest = self.stack.pop_back().as_usize();
                let src = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let code = self.reader.code.clone();
                self.mem.copy_from(&code, src, dest, size);
            }
            GASPRICE => self.stack.push(self.params.gas_price),
            EXTCODESIZE => {
                let address = u256_to_address(self.stack.pop_back());
                self.stack.push(U256::from(ext.extcodesize(&address)?.unwrap_or(0)));
            }
            EXTCODECOPY => {
                let address = u256_to_address(self.stack.pop_back());
                let dest = self.stack.pop_back().as_usize();
                let src = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let code = ext.extcode(&address)?.unwrap_or_default();
                self.mem.copy_from(&code, src, dest, size);
            }

            BLOCKHASH => {
                let number = self.stack.pop_back();
                self.stack.push(U256::from_big_endian(ext.blockhash(&number).as_bytes()));
            }
            COINBASE => self.stack.push(address_to_u256(ext.env_info().author)),
            TIMESTAMP => self.stack.push(U256::from(ext.env_info().timestamp)),
            NUMBER => self.stack.push(U256::from(ext.env_info().number)),
            DIFFICULTY => self.stack.push(ext.env_info().difficulty),
            GASLIMIT => self.stack.push(ext.env_info().gas_limit),

            POP => {
                self.stack.pop_back();
            }
            MLOAD => {
                let offset = self.stack.pop_back().as_usize();
                self.stack.push(self.mem.read(offset));
            }
            MSTORE => {
                let offset = self.stack.pop_back().as_usize();
                let value = self.stack.pop_back();
                self.mem.write(offset, value);
            }
            MSTORE8 => {
                let offset = self.stack.pop_back().as_usize();
                let value = self.stack.pop_back();
                self.mem.write_byte(offset, value.low_u32() as u8);
            }
            SLOAD => {
                let key = H256::from_uint(&self.stack.pop_back());
                self.stack.push(U256::from_big_endian(ext.storage_at(&key)?.as_bytes()));
            }
            SSTORE => {
                let key = H256::from_uint(&self.stack.pop_back());
                let value = self.stack.pop_back();
                let current = ext.storage_at(&key)?;
                let new_is_zero = value.is_zero();
                if !current.is_zero() && new_is_zero {
                    ext.add_refund(ext.schedule().sstore_refund_gas);
                }
                ext.set_storage(key, H256::from_uint(&value))?;
            }
            JUMP => {
                let dest = self.stack.pop_back();
                self.do_jump(dest)?;
            }
            JUMPI => {
                let dest = self.stack.pop_back();
                let cond = self.stack.pop_back();
                if !cond.is_zero() {
                    self.do_jump(dest)?;
                }
            }
            PC => self.stack.push(U256::from(self.reader.position - 1)),
            MSIZE => self.stack.push(U256::from(self.mem.size())),
            GAS => self.stack.push(self.gasometer.current_gas.as_u256()),
            JUMPDEST => {}

            PUSH1..=PUSH32 => {
                let n = instructions::push_bytes(instruction);
                self.stack.push(self.reader.read_push(n));
            }

            DUP1..=DUP16 => {
                let n = instructions::dup_position(instruction);
                let value = *self.stack.peek(n - 1);
                self.stack.push(value);
            }
            SWAP1..=SWAP16 => {
                let n = instructions::swap_position(instruction);
                self.stack.swap_with_top(n);
            }

            LOG0..=LOG4 => {
                let topic_count = instructions::log_topics(instruction);
                let offset = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    topics.push(H256::from_uint(&self.stack.pop_back()));
                }
                let data = self.mem.read_slice(offset, size).to_vec();
                ext.log(topics, &data)?;
            }

            CREATE => self.exec_create(ext)?,
            CALL => self.exec_call(ext, CallType::Call)?,
            CALLCODE => self.exec_call(ext, CallType::CallCode)?,
            DELEGATECALL => self.exec_call(ext, CallType::DelegateCall)?,

            RETURN => {
                let offset = self.stack.pop_back().as_usize();
                let size = self.stack.pop_back().as_usize();
                let data = self.mem.read_slice(offset, size).to_vec();
                return Ok(Some(GasLeft::NeedsReturn {
                    gas_left: self.gasometer.current_gas.as_u256(),
                    data: ReturnData::new(data, 0, size),
                    apply_state: true,
                }));
            }

            SUICIDE => {
                // Refund bookkeeping and the "once per address" cap live in
                // `Ext::suicide` itself, since only the backend knows
                // whether this address has already self-destructed this
                // transaction.
                let refund_address = u256_to_address(self.stack.pop_back());
                ext.suicide(&refund_address)?;
                return Ok(Some(GasLeft::Known(self.gasometer.current_gas.as_u256())));
            }

            _ => return Err(Error::BadInstruction { instruction }),
        }

        Ok(None)
    }

    fn exec_create(&mut self, ext: &mut dyn Ext) -> vm::Result<()> {
        let value = self.stack.pop_back();
        let init_off = self.stack.pop_back().as_usize();
        let init_size = self.stack.pop_back().as_usize();
        let code = self.mem.read_slice(init_off, init_size).to_vec();

        let can_create = ext.depth() < ext.schedule().max_depth && ext.balance(&self.params.address)? >= value;

        let provide = self.gasometer.cap_call_gas(ext.schedule(), None);

        if !can_create {
            self.stack.push(U256::zero());
            self.return_data = ReturnData::empty();
            return Ok(());
        }

        self.gasometer.current_gas = self.gasometer.current_gas - provide;

        match ext.create(&provide.as_u256(), &value, &code, CreateContractAddress::FromSenderAndNonce, false) {
            Ok(ContractCreateResult::Created(address, gas_left)) => {
                self.gasometer.current_gas = self.gasometer.current_gas + Cost::from_u256(gas_left)?;
                self.stack.push(address_to_u256(address));
                self.return_data = ReturnData::empty();
            }
            Ok(ContractCreateResult::Failed) => {
                self.stack.push(U256::zero());
                self.return_data = ReturnData::empty();
            }
            Ok(ContractCreateResult::Reverted(gas_left, data)) => {
                self.gasometer.current_gas = self.gasometer.current_gas + Cost::from_u256(gas_left)?;
                self.stack.push(U256::zero());
                self.return_data = data;
            }
            Err(_trap) => return Err(Error::Internal("nested create unexpectedly suspended".into())),
        }
        Ok(())
    }

    fn exec_call(&mut self, ext: &mut dyn Ext, call_type: CallType) -> vm::Result<()> {
        let requested_gas = self.stack.pop_back();
        let to = u256_to_address(self.stack.pop_back());

        let (sender_address, receive_address, code_address, value) = match call_type {
            CallType::Call => {
                let value = self.stack.pop_back();
                (self.params.address, to, to, ActionValue::Transfer(value))
            }
            CallType::CallCode => {
                let value = self.stack.pop_back();
                (self.params.address, self.params.address, to, ActionValue::Transfer(value))
            }
            CallType::DelegateCall => (
                self.params.sender,
                self.params.address,
                to,
                ActionValue::Apparent(self.params.value.value()),
            ),
            CallType::None => unreachable!("exec_call is only invoked for CALL/CALLCODE/DELEGATECALL"),
        };

        let in_off = self.stack.pop_back().as_usize();
        let in_size = self.stack.pop_back().as_usize();
        let out_off = self.stack.pop_back().as_usize();
        let out_size = self.stack.pop_back().as_usize();

        let input = self.mem.read_slice(in_off, in_size).to_vec();
        let value_is_transfer = matches!(value, ActionValue::Transfer(v) if !v.is_zero());
        let target_exists = ext.exists_and_not_null(&receive_address)?;

        let stipend = self.gasometer.charge_call_extras(ext.schedule(), call_type, value_is_transfer, target_exists)?;
        let provide = self.gasometer.cap_call_gas(ext.schedule(), Some(requested_gas));

        let can_call = ext.depth() < ext.schedule().max_depth
            && (!value_is_transfer || ext.balance(&self.params.address)? >= value.value());

        if !can_call {
            self.stack.push(U256::zero());
            self.return_data = ReturnData::empty();
            return Ok(());
        }

        self.gasometer.current_gas = self.gasometer.current_gas - provide;
        let (total_provide, overflow) = provide.overflow_add(stipend);
        if overflow {
            return Err(Error::OutOfGas);
        }

        match ext.call(total_provide.as_u256(), &sender_address, &receive_address, value, &input, &code_address, call_type, false) {
            Ok(MessageCallResult::Success(gas_left, data)) => {
                self.gasometer.current_gas = self.gasometer.current_gas + Cost::from_u256(gas_left)?;
                write_returned_data(&mut self.mem, out_off, out_size, &data);
                self.stack.push(U256::one());
                self.return_data = data;
            }
            Ok(MessageCallResult::Reverted(gas_left, data)) => {
                self.gasometer.current_gas = self.gasometer.current_gas + Cost::from_u256(gas_left)?;
                write_returned_data(&mut self.mem, out_off, out_size, &data);
                self.stack.push(U256::zero());
                self.return_data = data;
            }
            Ok(MessageCallResult::Failed) => {
                self.stack.push(U256::zero());
                self.return_data = ReturnData::empty();
            }
            Err(_trap) => return Err(Error::Internal("nested call unexpectedly suspended".into())),
        }
        Ok(())
    }
}

fn bool_to_u256(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

fn signed_compare(a: U256, b: U256) -> std::cmp::Ordering {
    let a_neg = a.bit(255);
    let b_neg = b.bit(255);
    match (a_neg, b_neg) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.cmp(&b),
    }
}

fn read_padded_word(data: &[u8], offset: usize) -> U256 {
    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        if let Some(b) = data.get(offset + i) {
            *byte = *b;
        } else {
            break;
        }
    }
    U256::from_big_endian(&bytes)
}

impl<Cost: CostType> Exec for Interpreter<Cost> {
    fn exec(mut self: Box<Self>, ext: &mut dyn Ext) -> ExecTrapResult<GasLeft> {
        Ok(self.run(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hex::FromHex;
    use vm::tests::{fake_params, test_finalize, FakeExt};

    fn run(code: &str, gas: u64, ext: &mut FakeExt) -> vm::Result<U256> {
        let code: Vec<u8> = code.from_hex().unwrap();
        let params = fake_params(U256::from(gas), code);
        let interpreter = Box::new(Interpreter::<u64>::new(params, SharedCache::new()));
        test_finalize(interpreter.exec(ext).expect("never traps in this harness"))
    }

    #[test]
    fn should_run_stop() {
        let mut ext = FakeExt::new();
        let gas_left = run("00", 100_000, &mut ext).unwrap();
        assert_eq!(gas_left, U256::from(100_000));
    }

    #[test]
    fn should_add_two_numbers_and_return() {
        let mut ext = FakeExt::new();
        // PUSH1 1 PUSH1 2 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let gas_left = run("600160020160005260206000f3", 100_000, &mut ext);
        assert!(gas_left.is_ok());
    }

    #[test]
    fn should_reject_bad_jump_destination() {
        let mut ext = FakeExt::new();
        // PUSH1 5 JUMP
        let err = run("60055600", 100_000, &mut ext).unwrap_err();
        assert!(matches!(err, Error::BadJumpDestination { .. }));
    }

    #[test]
    fn should_jump_to_jumpdest() {
        let mut ext = FakeExt::new();
        // PUSH1 3 JUMP JUMPDEST STOP
        let gas_left = run("6003565b00", 100_000, &mut ext);
        assert!(gas_left.is_ok());
    }

    #[test]
    fn should_run_out_of_gas() {
        let mut ext = FakeExt::new();
        // PUSH1 1 PUSH1 1 ADD
        let err = run("6001600101", 1, &mut ext).unwrap_err();
        assert_eq!(err, Error::OutOfGas);
    }

    #[test]
    fn should_apply_sstore_refund_on_clear() {
        let mut ext = FakeExt::new();
        let key = H256::from_low_u64_be(1);
        ext.store.insert(key, H256::from_low_u64_be(42));
        // PUSH1 0 PUSH1 1 SSTORE
        let _ = run("6000600155", 100_000, &mut ext).unwrap();
        assert_eq!(ext.sstore_refund, ext.schedule.sstore_refund_gas as i64);
    }

    #[test]
    fn should_noop_signextend_for_out_of_range_byte_index() {
        let mut ext = FakeExt::new();
        // PUSH1 0xff PUSH1 32 SIGNEXTEND PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let gas_left = run("60ff60602060000052602060006000f3", 100_000, &mut ext);
        assert!(gas_left.is_ok());
    }
}
