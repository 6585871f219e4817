//! The six numbered scenarios plus the surrounding invariants.
//!
//! All six drive a real `Executive`/`MemoryState` pair, so they exercise
//! call setup, checkpointing and gas accounting together, not just the
//! bare interpreter.

use ethereum_types::{Address, U256};
use evm::interpreter::shared_cache::SharedCache;
use evm::state::MemoryState;
use evm::{Executive, Interpreter};
use rustc_hex::FromHex;
use vm::tests::FakeExt;
use vm::{ActionParams, ActionValue, CallType, EnvInfo, Exec, Schedule};

const GAS_LIMIT: u64 = 100_000;

fn run(code: &str, gas: u64) -> (U256, Vec<u8>, bool) {
    let result = run_full(code, gas);
    (result.gas_left, result.output.to_vec(), result.apply_state)
}

fn run_full(code: &str, gas: u64) -> evm::FrameResult {
    let code: Vec<u8> = code.from_hex().unwrap();
    let contract = Address::from_low_u64_be(0xc0de);
    let sender = Address::from_low_u64_be(0x5e2de2);

    let mut state = MemoryState::new();
    state.set_code(contract, code);
    state.set_balance(sender, U256::from(1_000_000_000u64));

    let mut executive = Executive::new(&mut state, EnvInfo::default(), Schedule::default(), sender, U256::zero());

    let params = ActionParams {
        address: contract,
        code_address: contract,
        sender,
        origin: sender,
        gas: U256::from(gas),
        value: ActionValue::Transfer(U256::zero()),
        call_type: CallType::Call,
        ..ActionParams::default()
    };

    executive.call(params).expect("a standalone Executive::call never errors")
}

#[test]
fn minimal_add_returns_three() {
    // PUSH1 1, PUSH1 2, ADD, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = "600160020160005260206000f3";
    let (_, output, applied) = run(code, GAS_LIMIT);
    assert!(applied);
    let mut expected = [0u8; 32];
    expected[31] = 3;
    assert_eq!(output, expected);
}

#[test]
fn div_by_zero_yields_zero() {
    // PUSH1 0, PUSH1 5, DIV, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = "6000600504600052602060006000f3";
    let (_, output, applied) = run(code, GAS_LIMIT);
    assert!(applied);
    assert_eq!(output, vec![0u8; 32]);
}

#[test]
fn keccak_of_empty_slice() {
    // PUSH1 0, PUSH1 0, SHA3, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = "6000600020600052602060006000f3";
    let (_, output, applied) = run(code, GAS_LIMIT);
    assert!(applied);
    let expected: Vec<u8> =
        "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470".from_hex().unwrap();
    assert_eq!(output, expected);
}

#[test]
fn invalid_jump_forfeits_all_gas() {
    // PUSH1 5, JUMP, JUMPDEST, STOP -- destination 5 lands past the code.
    let code = "6005565b00";
    let (gas_left, output, applied) = run(code, GAS_LIMIT);
    assert!(!applied);
    assert!(output.is_empty());
    assert_eq!(gas_left, U256::zero());
}

#[test]
fn memory_expansion_reuses_already_paid_words() {
    // PUSH1 0, PUSH1 32, MSTORE, STOP -- expands memory to two words.
    let one_store = "600060205200";
    // Same, then a second MSTORE at offset 0, fully inside the already
    // paid-for range.
    let two_stores = "6000602052600060005200";

    let (gas_left_one, _, _) = run(one_store, GAS_LIMIT);
    let (gas_left_two, _, _) = run(two_stores, GAS_LIMIT);

    let used_one = U256::from(GAS_LIMIT) - gas_left_one;
    let used_two = U256::from(GAS_LIMIT) - gas_left_two;

    // memory_gas * words + words^2 / quad_coeff_div = 3*2 + 4/512 = 6.
    assert_eq!(used_one, U256::from(6));
    assert_eq!(used_two, used_one, "reusing already-expanded memory must not be charged again");
}

#[test]
fn selfdestruct_refund_credited_once_per_address() {
    // PUSH20 <refund target>, SELFDESTRUCT
    let code = "73000000000000000000000000000000000000deadff";
    let result = run_full(code, GAS_LIMIT);
    assert!(result.apply_state);
    assert_eq!(result.gas_refund, U256::from(Schedule::default().suicide_refund_gas));
    assert_eq!(result.selfdestructed, vec![Address::from_low_u64_be(0xc0de)]);
}

#[test]
fn call_into_account_with_no_code_is_a_no_op_success() {
    let sender = Address::from_low_u64_be(1);
    let empty = Address::from_low_u64_be(2);
    let mut state = MemoryState::new();
    state.set_balance(sender, U256::from(1_000u64));
    let mut executive = Executive::new(&mut state, EnvInfo::default(), Schedule::default(), sender, U256::zero());

    let params = ActionParams {
        address: empty,
        code_address: empty,
        sender,
        origin: sender,
        gas: U256::from(21_000u64),
        value: ActionValue::Transfer(U256::from(100u64)),
        call_type: CallType::Call,
        ..ActionParams::default()
    };

    let result = executive.call(params).unwrap();
    assert!(result.apply_state);
    assert!(result.output.is_empty());
}

#[test]
fn stack_depth_limit_is_enforced_by_the_interpreter() {
    let cache = SharedCache::new();
    let mut code = Vec::new();
    for _ in 0..1025 {
        code.push(0x60); // PUSH1
        code.push(0x01);
    }
    code.push(0x00); // STOP, never reached -- the 1025th PUSH1 must fail first

    let params = ActionParams {
        gas: U256::from(10_000_000u64),
        code: Some(std::sync::Arc::new(code)),
        ..ActionParams::default()
    };
    let mut ext = FakeExt::new();
    let interpreter = Box::new(Interpreter::<u64>::new(params, cache));
    let result = interpreter.exec(&mut ext).expect("never traps in this harness");
    assert!(result.is_err(), "pushing past 1024 items must fail, not silently succeed");
}
