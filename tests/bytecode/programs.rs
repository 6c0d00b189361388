//! Integration tests for building programs
//!
//! Tests constant pooling, jump patching, and disassembly.

use plume_bytecode::{Comparator, Constant, Instruction, LibraryEntry, Opcode, Program};

#[test]
fn constants_are_pooled() {
    let mut p = Program::new();
    let a = p.constant(5);
    let b = p.constant("five");
    let c = p.constant(5);
    let d = p.constant(5.0);

    assert_eq!(a, c);
    assert_ne!(a, b);
    assert_ne!(a, d);
    assert_eq!(p.constants.len(), 3);
    assert_eq!(p.constants[1], Constant::String("five".to_string()));
}

#[test]
fn negative_zero_is_its_own_constant() {
    let mut p = Program::new();
    let zero = p.constant(0.0);
    let neg = p.constant(-0.0);
    assert_ne!(zero, neg);
}

#[test]
fn patched_jumps_are_relative() {
    let mut p = Program::new();
    let jump = p.emit(Instruction::new(Opcode::JumpIfRel));
    p.emit(Instruction::new(Opcode::Special));
    let cmp = p.emit(Instruction::with2(Opcode::CompareJumpRel, Comparator::Equal.code(), 0));
    p.emit(Instruction::new(Opcode::Halt));

    p.patch_jump(jump, 3);
    p.patch_jump(cmp, 0);

    assert_eq!(p.instructions[jump].a(), 3);
    assert_eq!(p.instructions[cmp].a(), Comparator::Equal.code());
    assert_eq!(p.instructions[cmp].b(), -2);
}

#[test]
#[should_panic(expected = "non-jump")]
fn patching_a_non_jump_panics() {
    let mut p = Program::new();
    let idx = p.emit(Instruction::new(Opcode::Add));
    p.patch_jump(idx, 0);
}

#[test]
fn libraries_are_indexed_in_order() {
    let mut p = Program::new();
    assert_eq!(p.library(LibraryEntry::new("io", 2, true)), 0);
    assert_eq!(p.library(LibraryEntry::new("local.so", 1, false)), 1);
}

#[test]
fn disassembly_lists_every_instruction() {
    let mut p = Program::new();
    let k = p.constant(1);
    p.emit(Instruction::with1(Opcode::LoadConstant, k));
    p.emit(Instruction::with1(Opcode::JumpRel, -1));

    let text = p.disassemble();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("LoadConstant"));
    assert!(text.contains("-1"));
}
