//! Integration tests for collection under a running program

use plume_bytecode::{Comparator, Opcode};
use plume_foundation::Value;
use plume_vm::{Vm, VmConfig};

use crate::Asm;

/// Conses `n` cells onto a list held in global 0, allocating a throwaway
/// string on every step.
fn build_chain(n: i32) -> Asm {
    let mut asm = Asm::new();
    let one = asm.k(1);
    asm.op(Opcode::Special);
    asm.op1(Opcode::StoreGlobal, 0);
    asm.push(n);
    asm.op1(Opcode::StoreGlobal, 1);

    let top = asm.op1(Opcode::LoadGlobal, 1);
    asm.push(0);
    let exit = asm.op2(Opcode::CompareJumpRel, Comparator::Greater.code(), 0);
    asm.push(0.5);
    asm.op(Opcode::TypeOf);
    asm.op1(Opcode::StoreGlobal, 2);
    asm.op1(Opcode::LoadGlobal, 1);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op1(Opcode::MakeList, 2);
    asm.op1(Opcode::StoreGlobal, 0);
    asm.op1(Opcode::LoadGlobal, 1);
    asm.op1(Opcode::SubConst, one);
    asm.op1(Opcode::StoreGlobal, 1);
    let back = asm.op(Opcode::JumpRel);
    asm.program.patch_jump(back, top);
    let end = asm.here();
    asm.program.patch_jump(exit, end);
    asm
}

fn chain_length(vm: &Vm, mut list: Value) -> usize {
    let mut len = 0;
    while !list.is_special() {
        list = vm.heap().list_get(list, 1).unwrap();
        len += 1;
    }
    len
}

#[test]
fn reachable_data_survives_many_collections() {
    let mut asm = build_chain(500);
    asm.op1(Opcode::LoadGlobal, 0);
    let mut vm = Vm::with_config(asm.finish(), VmConfig::default().with_gc_threshold(16));
    let chain = vm.run().unwrap().unwrap();

    assert_eq!(chain_length(&vm, chain), 500);
    assert_eq!(vm.heap().list_get(chain, 0).unwrap(), Value::integer(1));

    let stats = vm.gc_stats();
    assert!(stats.collections > 0);
    assert!(stats.freed > 0);
    assert_eq!(stats.allocated, stats.freed + stats.live as u64);
}

#[test]
fn garbage_is_reclaimed_after_the_run() {
    let mut vm = Vm::with_config(build_chain(50).finish(), VmConfig::default().with_gc_threshold(8));
    vm.run().unwrap();
    // Chain (50 lists), the last type name, and the args list.
    vm.collect_garbage();
    assert_eq!(vm.heap().len(), 52);
}

#[test]
fn string_constants_are_never_collected() {
    let mut asm = build_chain(30);
    asm.push("still here");
    let mut vm = Vm::with_config(asm.finish(), VmConfig::default().with_gc_threshold(4));
    let s = vm.run().unwrap().unwrap();
    assert_eq!(vm.heap().string(s).unwrap(), "still here");
}
