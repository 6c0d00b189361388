//! Integration tests for `plume_runtime::load`

use std::fs;
use std::path::{Path, PathBuf};

use plume_bytecode::{Instruction, LibraryEntry, Opcode, Program, encode};
use plume_foundation::{ErrorKind, Value};
use plume_runtime::{RuntimeConfig, load};
use plume_vm::VmConfig;

/// A scratch directory removed on drop.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("plume-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, file: &str, program: &Program) -> PathBuf {
        let path = self.0.join(file);
        fs::write(&path, encode(program)).unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn product() -> Program {
    let mut p = Program::new();
    let six = p.constant(6);
    let seven = p.constant(7);
    p.emit(Instruction::with1(Opcode::LoadConstant, six));
    p.emit(Instruction::with1(Opcode::MulConst, seven));
    p
}

#[test]
fn load_and_run() {
    let scratch = Scratch::new("run");
    let path = scratch.write("product.plb", &product());

    let mut vm = load(&path, Vec::<String>::new(), &RuntimeConfig::default()).unwrap();
    assert_eq!(vm.run().unwrap(), Some(Value::integer(42)));
}

#[test]
fn program_arguments_become_strings() {
    let scratch = Scratch::new("args");
    let path = scratch.write("args.plb", &product());

    let vm = load(&path, ["alpha", "beta"], &RuntimeConfig::default()).unwrap();
    let args = vm.heap().list(vm.args()).unwrap();
    assert_eq!(args.len(), 2);
    assert_eq!(vm.heap().string(args[1]).unwrap(), "beta");
}

#[test]
fn vm_settings_are_applied() {
    let scratch = Scratch::new("config");
    let path = scratch.write("cfg.plb", &product());
    let config = RuntimeConfig::default().with_vm(VmConfig::default().with_globals_size(3));

    let vm = load(&path, Vec::<String>::new(), &config).unwrap();
    assert_eq!(vm.stack().floor(), 3);
}

#[test]
fn errors_name_the_file() {
    let scratch = Scratch::new("fault");
    let mut program = Program::new();
    program.emit(Instruction::new(Opcode::Return));
    let path = scratch.write("bad.plb", &program);

    let mut vm = load(&path, Vec::<String>::new(), &RuntimeConfig::default()).unwrap();
    let err = vm.run().unwrap_err();
    let context = err.context.unwrap();
    assert_eq!(context.source.as_deref(), Some(path.display().to_string().as_str()));
}

#[test]
fn standard_library_without_plume_path() {
    let scratch = Scratch::new("std");
    let mut program = product();
    program.library(LibraryEntry::new("libio.so", 2, true));
    let path = scratch.write("std.plb", &program);

    let err = load(&path, Vec::<String>::new(), &RuntimeConfig::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::StandardPathMissing { .. }));
}

#[test]
fn missing_local_library() {
    let scratch = Scratch::new("local");
    let mut program = product();
    program.library(LibraryEntry::new("libmissing.so", 1, false));
    let path = scratch.write("local.plb", &program);

    let err = load(&path, Vec::<String>::new(), &RuntimeConfig::default()).unwrap_err();
    match err.kind {
        ErrorKind::LibraryLoad { path: lib, .. } => {
            assert!(Path::new(&lib).starts_with(&scratch.0));
            assert!(lib.ends_with("libmissing.so"));
        }
        other => panic!("expected LibraryLoad, got {other:?}"),
    }
}

#[test]
fn missing_file() {
    let err = load(
        Path::new("/nonexistent/none.plb"),
        Vec::<String>::new(),
        &RuntimeConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Io(_)));
}

#[test]
fn corrupt_file() {
    let scratch = Scratch::new("corrupt");
    let path = scratch.0.join("corrupt.plb");
    fs::write(&path, [1, 0, 0]).unwrap();

    let err = load(&path, Vec::<String>::new(), &RuntimeConfig::default()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Decode { .. }));
}
