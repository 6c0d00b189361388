//! Integration tests for straight-line programs and branches

use plume_bytecode::{Comparator, Opcode};
use plume_foundation::{ErrorKind, Value};
use plume_vm::{Vm, VmState};

use crate::Asm;

#[test]
fn seven_minus_three() {
    let mut asm = Asm::new();
    asm.push(7);
    asm.push(3);
    asm.op(Opcode::Sub);

    let mut vm = Vm::new(asm.finish());
    assert_eq!(vm.run().unwrap(), Some(Value::integer(4)));
}

#[test]
fn slice_of_four() {
    let mut asm = Asm::new();
    for n in 1..=4 {
        asm.push(n);
    }
    asm.op1(Opcode::MakeList, 4);
    asm.op1(Opcode::Slice, 2);

    let mut vm = Vm::new(asm.finish());
    let result = vm.run().unwrap().unwrap();
    assert_eq!(
        vm.heap().list(result).unwrap(),
        &[Value::integer(3), Value::integer(4)]
    );
    assert_eq!(vm.heap().render(result).unwrap(), "[3, 4]");
}

fn jump_if(condition: i32) -> Vm {
    let mut asm = Asm::new();
    asm.push(condition);
    asm.op1(Opcode::JumpIfRel, 5);
    for _ in 0..4 {
        asm.op(Opcode::Special);
    }
    asm.op(Opcode::Halt);
    Vm::new(asm.finish())
}

#[test]
fn jump_if_zero_moves_by_the_offset() {
    let mut vm = jump_if(0);
    vm.step().unwrap();
    vm.step().unwrap();
    assert_eq!(vm.pc(), 1 + 5);
}

#[test]
fn jump_if_nonzero_falls_through() {
    let mut vm = jump_if(7);
    vm.step().unwrap();
    vm.step().unwrap();
    assert_eq!(vm.pc(), 2);
    vm.run().unwrap();
    assert_eq!(vm.stack().len(), 4);
}

#[test]
fn counting_loop() {
    // g0 = 0; while g0 < 10 { g0 += 1 }
    let mut asm = Asm::new();
    asm.push(0);
    asm.op1(Opcode::StoreGlobal, 0);
    let top = asm.op1(Opcode::LoadGlobal, 0);
    asm.push(10);
    let exit = asm.op2(Opcode::CompareJumpRel, Comparator::Less.code(), 0);
    asm.op1(Opcode::LoadGlobal, 0);
    let one = asm.k(1);
    asm.op1(Opcode::AddConst, one);
    asm.op1(Opcode::StoreGlobal, 0);
    let back = asm.op(Opcode::JumpRel);
    asm.op1(Opcode::LoadGlobal, 0);
    let mut program = asm.finish();
    program.patch_jump(back, top);
    program.patch_jump(exit, back + 1);

    let mut vm = Vm::new(program);
    assert_eq!(vm.run().unwrap(), Some(Value::integer(10)));
    assert_eq!(vm.state(), VmState::Halted);
}

#[test]
fn float_comparison() {
    let mut asm = Asm::new();
    asm.push(0.1);
    asm.push(0.2);
    asm.op(Opcode::Add);
    asm.push(0.3);
    asm.op1(Opcode::Compare, Comparator::GreaterEqual.code());

    let mut vm = Vm::new(asm.finish());
    assert_eq!(vm.run().unwrap(), Some(Value::integer(1)));
}

#[test]
fn comparing_a_string_with_an_integer_faults() {
    let mut asm = Asm::new();
    asm.push("1");
    asm.push(1);
    asm.op1(Opcode::Compare, Comparator::Equal.code());

    let mut vm = Vm::new(asm.finish()).with_source("cmp.plb");
    let err = vm.run().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
    assert_eq!(
        format!("{err}"),
        "type mismatch: expected string, got integer at instruction 2 (Compare) in cmp.plb"
    );
    assert_eq!(vm.state(), VmState::Faulted);
}

#[test]
fn adt_introspection() {
    let mut asm = Asm::new();
    asm.op(Opcode::Special);
    asm.push("Pair");
    asm.push(1);
    asm.push(2);
    asm.op1(Opcode::MakeList, 4);
    asm.op1(Opcode::StoreGlobal, 0);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op(Opcode::TypeOf);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op(Opcode::ConstructorName);

    let mut vm = Vm::new(asm.finish());
    vm.run().unwrap();
    let stack = vm.stack().operands();
    assert_eq!(vm.heap().string(stack[0]).unwrap(), "list");
    assert_eq!(vm.heap().string(stack[1]).unwrap(), "Pair");
}

#[test]
fn stack_overflow() {
    let mut asm = Asm::new();
    let top = asm.op(Opcode::Special);
    let back = asm.op(Opcode::JumpRel);
    let mut program = asm.finish();
    program.patch_jump(back, top);

    let mut vm = Vm::with_config(
        program,
        plume_vm::VmConfig::default().with_stack_capacity(64),
    );
    let err = vm.run().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StackOverflow));
    assert_eq!(vm.stack().sp(), 64);
}
