//! Throughput of the fetch-decode-execute loop on a tight arithmetic/jump
//! loop and on the `SHA3`/`SSTORE` paths, the opcodes most call-heavy
//! contracts spend their gas on.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ethereum_types::U256;
use evm::interpreter::shared_cache::SharedCache;
use evm::Interpreter;
use rustc_hex::FromHex;
use vm::tests::{fake_params, test_finalize, FakeExt};
use vm::Exec;

fn run(code: &str, gas: u64) -> U256 {
    let code: Vec<u8> = code.from_hex().unwrap();
    let params = fake_params(U256::from(gas), code);
    let mut ext = FakeExt::new();
    let interpreter = Box::new(Interpreter::<u64>::new(params, SharedCache::new()));
    test_finalize(interpreter.exec(&mut ext).expect("never traps in this harness")).unwrap()
}

fn counting_loop(c: &mut Criterion) {
    // PUSH1 0; JUMPDEST@2: PUSH1 1 ADD DUP1 PUSH1 100 LT PUSH1 2 JUMPI STOP
    let code = "60005b6001018060641060025700";

    c.bench_function("counting_loop", |b| {
        b.iter(|| black_box(run(code, 1_000_000)));
    });
}

fn sha3_of_memory(c: &mut Criterion) {
    // PUSH1 64 PUSH1 0 SHA3 POP STOP
    let code = "60406000205000";

    c.bench_function("sha3_64_bytes", |b| {
        b.iter(|| black_box(run(code, 1_000_000)));
    });
}

fn sstore_set_and_clear(c: &mut Criterion) {
    // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 SSTORE STOP
    let code = "6001600055600060005500";

    c.bench_function("sstore_set_then_clear", |b| {
        b.iter(|| black_box(run(code, 1_000_000)));
    });
}

criterion_group!(benches, counting_loop, sha3_of_memory, sstore_set_and_clear);
criterion_main!(benches);
