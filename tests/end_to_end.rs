mod common;

use common::{Cpu, fixture, load_vm, unit};
use hack_toolchain::config::Config;
use hack_toolchain::model::{Emit, SourceUnit};
use hack_toolchain::processor::{self, assembler};
use std::fs;
use std::path::PathBuf;

#[test]
fn compiled_class_runs_on_the_cpu() {
    let main = SourceUnit {
        name: "Main".into(),
        path: PathBuf::from("tests/fixtures/Main.jack"),
        source: fixture("Main.jack"),
    };
    let vm = processor::compile_unit(&main, Emit::Vm).unwrap();

    let mut cpu = load_vm(
        &[unit("Main", &vm), unit("Sys", &fixture("Sys.vm"))],
        &Config::default(),
    );
    cpu.run(50_000);

    assert_eq!(cpu.ram[6], 15, "pick(5)");
    assert_eq!(cpu.ram[7], 0, "pick(-3)");
    assert_eq!(cpu.ram[8], 9, "max(9, -4)");
    assert_eq!(cpu.ram[9], 6, "step(5)");
    assert_eq!(cpu.ram[10], 0, "step(-3)");
    assert_eq!(cpu.ram[0], 261, "SP back at the Sys.init frame");
}

#[test]
fn objects_and_arrays_run_on_the_cpu() {
    let class = SourceUnit {
        name: "Vec".into(),
        path: PathBuf::from("tests/fixtures/Vec.jack"),
        source: fixture("Vec.jack"),
    };
    let vm = processor::compile_unit(&class, Emit::Vm).unwrap();
    let sys = "\
function Sys.init 0
push constant 4000
push constant 3000
push constant 3
call Vec.reverse 3
pop temp 0
push constant 2
push constant 5
call Vec.new 2
pop temp 1
push temp 1
push constant 10
push constant 20
call Vec.new 2
call Vec.sum 2
pop temp 2
label HALT
goto HALT
";

    let mut cpu = load_vm(
        &[
            unit("Memory", &fixture("Memory.vm")),
            unit("Sys", sys),
            unit("Vec", &vm),
        ],
        &Config::default(),
    );
    cpu.ram[3000..3003].copy_from_slice(&[7, 8, 9]);
    cpu.run(50_000);

    // each store reads `that` for the source while the target is parked in temp 0
    assert_eq!(&cpu.ram[4000..4003], &[9, 8, 7]);
    assert_eq!(&cpu.ram[3000..3003], &[7, 8, 9]);

    assert_eq!(cpu.ram[6], 2048, "first object");
    assert_eq!(&cpu.ram[2048..2052], &[2, 5, 10, 20], "fields laid out by constructors");
    assert_eq!(cpu.ram[7], 17, "method call through a field and an argument");
    assert_eq!(cpu.ram[0], 261);
}

#[test]
fn assembled_program_runs_on_the_cpu() {
    let words = assembler::assemble(&fixture("Max.asm")).unwrap();
    let test_cases = vec![(3, 7, 7), (9, -2, 9), (-5, -5, -5)];

    for (r0, r1, expected) in test_cases {
        let mut cpu = Cpu::new(words.clone());
        cpu.ram[0] = r0;
        cpu.ram[1] = r1;
        cpu.run(1_000);
        assert_eq!(cpu.ram[2], expected, "max({r0}, {r1})");
    }
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hack-e2e-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn compile_skips_failing_classes() {
    let dir = scratch_dir("compile");
    fs::write(dir.join("Good.jack"), "class Good { function void f() { return; } }").unwrap();
    fs::write(dir.join("Bad.jack"), "class Bad { function void f() { return } }").unwrap();

    let err = hack_toolchain::compile(&dir, Emit::Vm).unwrap_err();
    assert_eq!(err.to_string(), "1 of 2 classes failed to compile");
    assert_eq!(
        fs::read_to_string(dir.join("Good.vm")).unwrap(),
        "function Good.f 0\npush constant 0\nreturn\n"
    );
    assert!(!dir.join("Bad.vm").exists());

    hack_toolchain::compile(&dir.join("Good.jack"), Emit::Tokens).unwrap();
    assert!(dir.join("GoodT.xml").exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn translate_then_assemble_a_directory() {
    let dir = scratch_dir("prog");
    fs::write(dir.join("Sys.vm"), fixture("Sys.vm")).unwrap();
    let main = processor::compile_unit(
        &SourceUnit {
            name: "Main".into(),
            path: dir.join("Main.jack"),
            source: fixture("Main.jack"),
        },
        Emit::Vm,
    )
    .unwrap();
    fs::write(dir.join("Main.vm"), main).unwrap();

    hack_toolchain::translate(&dir, None, false).unwrap();
    let target = hack_toolchain::translate_target(&dir);
    assert_eq!(target.parent(), Some(dir.as_path()));
    let asm = fs::read_to_string(&target).unwrap();
    assert!(asm.starts_with("// bootstrap\n@256\n"));
    assert!(asm.contains("// function Main.pick 1\n"));

    hack_toolchain::assemble(&target).unwrap();
    let hack = fs::read_to_string(target.with_extension("hack")).unwrap();
    assert!(hack.lines().all(|l| l.len() == 16));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn translate_failure_writes_nothing() {
    let dir = scratch_dir("broken");
    fs::write(dir.join("A.vm"), "push constant 1\n").unwrap();
    fs::write(dir.join("B.vm"), "push nowhere 1\n").unwrap();

    assert!(hack_toolchain::translate(&dir, None, true).is_err());
    assert!(!hack_toolchain::translate_target(&dir).exists());
    fs::remove_dir_all(&dir).unwrap();
}
