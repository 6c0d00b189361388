//! Integration tests for bytecode calls
//!
//! Frames live on the value stack; every call must leave the stack exactly
//! one value taller than it found it, minus the arguments.

use plume_bytecode::{Comparator, Opcode};
use plume_foundation::{ErrorKind, Value};
use plume_vm::{Vm, VmConfig};
use proptest::prelude::*;

use crate::Asm;

/// Emits `sum(a, b, c) = a + b + c` into global 0 and returns the VM after
/// calling it with 1, 2, 3 on top of `below` filler values.
fn call_sum(below: usize, locals: i32) -> Vm {
    let mut asm = Asm::new();
    let lambda = asm.op2(Opcode::MakeLambda, 0, locals);
    asm.op1(Opcode::LoadLocal, 0);
    asm.op1(Opcode::LoadLocal, 1);
    asm.op(Opcode::Add);
    asm.op1(Opcode::LoadLocal, 2);
    asm.op(Opcode::Add);
    asm.op(Opcode::Return);
    asm.end_lambda(lambda);
    asm.op1(Opcode::StoreGlobal, 0);

    for _ in 0..below {
        asm.op(Opcode::Special);
    }
    asm.push(1);
    asm.push(2);
    asm.push(3);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op1(Opcode::Call, 3);

    let mut vm = Vm::new(asm.finish());
    vm.run().unwrap();
    vm
}

#[test]
fn call_replaces_arguments_with_the_result() {
    let vm = call_sum(2, 3);
    assert_eq!(vm.stack().len(), 3);
    assert_eq!(vm.stack().peek().unwrap(), Value::integer(6));
    assert_eq!(vm.depth(), 0);
    assert_eq!(vm.bp(), vm.stack().floor());
}

#[test]
fn extra_locals_are_discarded_on_return() {
    let vm = call_sum(0, 10);
    assert_eq!(vm.stack().operands(), &[Value::integer(6)]);
}

#[test]
fn mutual_recursion_even_odd() {
    // even(n) = n == 0 ? 1 : odd(n - 1); odd(n) = n == 0 ? 0 : even(n - 1)
    let mut asm = Asm::new();
    let zero = asm.k(0);
    let one = asm.k(1);

    for (global, base, other) in [(0, one, 1), (1, zero, 0)] {
        let lambda = asm.op2(Opcode::MakeLambda, 0, 1);
        asm.op1(Opcode::LoadLocal, 0);
        asm.op1(Opcode::LoadConstant, zero);
        let recurse = asm.op2(Opcode::CompareJumpRel, Comparator::Equal.code(), 0);
        asm.op1(Opcode::ReturnConst, base);
        let target = asm.op1(Opcode::LoadLocal, 0);
        asm.op1(Opcode::SubConst, one);
        asm.op1(Opcode::LoadGlobal, other);
        asm.op1(Opcode::Call, 1);
        asm.op(Opcode::Return);
        asm.program.patch_jump(recurse, target);
        asm.end_lambda(lambda);
        asm.op1(Opcode::StoreGlobal, global);
    }

    asm.push(41);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op1(Opcode::Call, 1);

    let mut vm = Vm::new(asm.finish());
    assert_eq!(vm.run().unwrap(), Some(Value::integer(0)));
    assert_eq!(vm.stack().len(), 1);
}

#[test]
fn deep_recursion_is_bounded() {
    let mut asm = Asm::new();
    let lambda = asm.op2(Opcode::MakeLambda, 0, 0);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op1(Opcode::Call, 0);
    asm.op(Opcode::Return);
    asm.end_lambda(lambda);
    asm.op1(Opcode::StoreGlobal, 0);
    asm.op1(Opcode::LoadGlobal, 0);
    asm.op1(Opcode::Call, 0);

    let mut vm = Vm::with_config(asm.finish(), VmConfig::default().with_max_frames(100));
    let err = vm.run().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::CallStackOverflow { limit: 100 }));
    assert_eq!(err.context.unwrap().opcode.as_deref(), Some("Call"));
}

#[test]
fn closure_lists_are_callable() {
    // [entry, frame_size] built at run time
    let mut asm = Asm::new();
    let skip = asm.op(Opcode::JumpRel);
    let entry = asm.op1(Opcode::LoadLocal, 0);
    let two = asm.k(2);
    asm.op1(Opcode::MulConst, two);
    asm.op(Opcode::Return);
    let main = asm.here();
    asm.program.patch_jump(skip, main);

    asm.push(21);
    asm.push(i32::try_from(entry).unwrap());
    asm.push(1);
    asm.op1(Opcode::MakeList, 2);
    asm.op1(Opcode::Call, 1);

    let mut vm = Vm::new(asm.finish());
    assert_eq!(vm.run().unwrap(), Some(Value::integer(42)));
}

#[test]
fn malformed_closure_list() {
    let mut asm = Asm::new();
    asm.push(1);
    asm.op1(Opcode::MakeList, 1);
    asm.op1(Opcode::Call, 0);

    let err = Vm::new(asm.finish()).run().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));
}

proptest! {
    #[test]
    fn calls_are_stack_neutral(argc in 0i32..6, locals in 0i32..6, below in 0usize..5) {
        // f(args...) = special, called with `argc` integers
        let mut asm = Asm::new();
        let lambda = asm.op2(Opcode::MakeLambda, 0, locals);
        asm.op(Opcode::Special);
        asm.op(Opcode::Return);
        asm.end_lambda(lambda);
        asm.op1(Opcode::StoreGlobal, 0);
        for _ in 0..below {
            asm.op(Opcode::Special);
        }
        for i in 0..argc {
            asm.push(i);
        }
        asm.op1(Opcode::LoadGlobal, 0);
        asm.op1(Opcode::Call, argc);

        let mut vm = Vm::new(asm.finish());
        vm.run().unwrap();
        prop_assert_eq!(vm.stack().len(), below + 1);
        prop_assert_eq!(vm.depth(), 0);
        prop_assert_eq!(vm.bp(), vm.stack().floor());
    }
}
