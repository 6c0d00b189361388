//! Integration tests for the wire format
//!
//! Tests encoder/decoder agreement and rejection of malformed input.

use plume_bytecode::{
    Comparator, Instruction, LibraryEntry, Opcode, Program, decode, encode, read_file, write_to,
};
use plume_foundation::ErrorKind;

/// A small program touching every section: two libraries, all constant
/// kinds, a function, a native call and a conditional jump.
fn realistic() -> Program {
    let mut p = Program::new();
    p.library(LibraryEntry::new("io", 2, true));
    p.library(LibraryEntry::new("libext.so", 1, false));
    let n = p.constant(10);
    let half = p.constant(0.5);
    let print = p.constant("print");

    p.emit(Instruction::with2(Opcode::MakeLambda, 3, 1));
    p.emit(Instruction::with1(Opcode::LoadLocal, 0));
    p.emit(Instruction::with1(Opcode::MulConst, n));
    p.emit(Instruction::new(Opcode::Return));
    p.emit(Instruction::with1(Opcode::StoreGlobal, 0));
    p.emit(Instruction::with1(Opcode::LoadConstant, half));
    p.emit(Instruction::new(Opcode::TypeOf));
    p.emit(Instruction::with3(Opcode::LoadNative, print, 0, 0));
    p.emit(Instruction::with1(Opcode::Call, 1));
    p.emit(Instruction::with2(Opcode::CompareJumpRel, Comparator::NotEqual.code(), 2));
    p.emit(Instruction::new(Opcode::Halt));
    p
}

#[test]
fn encoder_and_decoder_agree() {
    let program = realistic();
    let bytes = encode(&program);
    assert_eq!(decode(&bytes).unwrap(), program);
}

#[test]
fn empty_program_is_twelve_bytes() {
    let bytes = encode(&Program::new());
    assert_eq!(bytes, vec![0; 12]);
    assert!(decode(&bytes).unwrap().is_empty());
}

#[test]
fn every_truncation_is_rejected() {
    let bytes = encode(&realistic());
    for len in 0..bytes.len() {
        let err = decode(&bytes[..len]).unwrap_err();
        assert!(
            matches!(err.kind, ErrorKind::Decode { .. }),
            "prefix of {len} bytes: {err}"
        );
    }
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = encode(&realistic());
    let end = bytes.len();
    bytes.push(0);
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Decode { offset, .. } if offset == end));
}

#[test]
fn unknown_opcode_is_rejected() {
    let mut p = Program::new();
    p.emit(Instruction::new(Opcode::Halt));
    let mut bytes = encode(&p);
    bytes[12] = 0xEE;

    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Decode { offset: 12, .. }));
    assert!(format!("{err}").contains("238"));
}

#[test]
fn files_round_trip() {
    let path = std::env::temp_dir().join(format!("plume-wire-{}.plb", std::process::id()));
    let program = realistic();

    let file = std::fs::File::create(&path).unwrap();
    write_to(&program, file).unwrap();
    let loaded = read_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(loaded, program);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = read_file("/nonexistent/program.plb").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Io(_)));
}
