//! Minimal host for `vm-core`: load a raw binary image, run it to completion
//! or to a step budget, and dump final registers (and, optionally, a memory
//! range) whether the run ended in a clean halt or a trap.
//!
//! This binary is an external collaborator: it depends on `vm-core`, never
//! the other way around.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn, LevelFilter};

use vm_core::{Engine, Instruction, Mnemonic, Trap, INSTRUCTION_WIDTH};

/// Run a raw big-endian bytecode image against the engine.
#[derive(Parser, Debug)]
#[command(name = "vm", version, about)]
struct Args {
    /// Path to the raw program image.
    input: PathBuf,

    /// Address the image is copied to before execution starts.
    #[arg(long, default_value_t = 0)]
    base: u32,

    /// Initial program counter.
    #[arg(long = "pc", default_value_t = 0)]
    initial_pc: u32,

    /// Initial stack pointer.
    #[arg(long = "sp")]
    initial_sp: Option<u32>,

    /// Total memory size in bytes.
    #[arg(long, default_value_t = 1 << 16)]
    memory_size: usize,

    /// Maximum number of instructions to execute before reporting
    /// `BudgetExhausted`.
    #[arg(long, default_value_t = 1_000_000)]
    max_steps: u64,

    /// Start address of an optional memory range to dump after the run.
    #[arg(long, requires = "dump_len")]
    dump_addr: Option<u32>,

    /// Length in bytes of the memory range to dump.
    #[arg(long, requires = "dump_addr")]
    dump_len: Option<u32>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print a mnemonic listing of the loaded image before running it.
    #[arg(long)]
    disassemble: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read program image {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to load program image into memory: {0}")]
    Load(#[from] Trap),

    #[error("memory dump range out of bounds: {0}")]
    DumpRange(Trap),
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(127)
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run(args: &Args) -> Result<u8, CliError> {
    let program = fs::read(&args.input).map_err(|source| CliError::Io {
        path: args.input.clone(),
        source,
    })?;

    if args.disassemble {
        disassemble_image(args.base, &program);
    }

    let initial_sp = args.initial_sp.unwrap_or(args.memory_size as u32);
    let mut engine = Engine::new(
        args.memory_size,
        &program,
        args.base,
        args.initial_pc,
        initial_sp,
    )?;

    let report = engine.run(args.max_steps);
    print_registers(&engine);

    if let (Some(addr), Some(len)) = (args.dump_addr, args.dump_len) {
        print_memory(&engine, addr, len)?;
    }

    match report.outcome {
        Ok(()) => {
            info!("halted cleanly after {} steps", report.steps);
            Ok(0)
        }
        Err(Trap::BudgetExhausted { steps }) => {
            warn!("step budget exhausted after {steps} steps");
            Ok(0)
        }
        Err(trap) => {
            eprintln!(
                "trap at pc={:#010x} ({}): {trap}",
                engine.pc(),
                mnemonic_at(&engine, engine.pc())
            );
            Ok(trap.exit_code() as u8)
        }
    }
}

/// Best-effort mnemonic for the instruction a trap occurred at, for the
/// error line only; falls back to a raw label if the fetch itself is what
/// failed (an out-of-bounds PC has no instruction to name).
fn mnemonic_at(engine: &Engine, pc: u32) -> String {
    match engine.memory_range(pc, INSTRUCTION_WIDTH as u32) {
        Ok(bytes) => {
            let opcode = Instruction::decode(bytes).opcode;
            match Mnemonic::from_opcode(opcode) {
                Some(mnemonic) => mnemonic.to_string(),
                None => format!("opcode {opcode:#06x}"),
            }
        }
        Err(_) => "unfetchable".to_string(),
    }
}

/// Print `addr: MNEMONIC a=.. b=..` for each instruction in a raw image,
/// in the order it appears, with no attempt to follow control flow.
fn disassemble_image(base: u32, image: &[u8]) {
    for (offset, chunk) in image.chunks(INSTRUCTION_WIDTH).enumerate() {
        if chunk.len() < INSTRUCTION_WIDTH {
            break;
        }
        let ins = Instruction::decode(chunk);
        debug_assert_eq!(&ins.encode()[..], chunk, "decode/encode round trip mismatch");
        let addr = base as usize + offset * INSTRUCTION_WIDTH;
        match Mnemonic::from_opcode(ins.opcode) {
            Some(mnemonic) => {
                println!("{addr:#010x}: {mnemonic:<6} a={:#010x} b={:#010x}", ins.a, ins.b)
            }
            None => println!("{addr:#010x}: ??? opcode={:#06x}", ins.opcode),
        }
    }
}

fn print_registers(engine: &Engine) {
    let regs = engine.registers();
    for (i, value) in regs.iter().enumerate() {
        let label = if i == 15 { "r15 (acc)".to_string() } else { format!("r{i}") };
        println!("{label:<10}= {value:#010x}");
    }
    println!("pc        = {:#010x}", engine.pc());
    println!("sp        = {:#010x}", engine.sp());
}

fn print_memory(engine: &Engine, addr: u32, len: u32) -> Result<(), CliError> {
    let bytes = engine
        .memory_range(addr, len)
        .map_err(CliError::DumpRange)?;
    for (offset, chunk) in bytes.chunks(16).enumerate() {
        let line: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{:#010x}: {}", addr as usize + offset * 16, line.join(" "));
    }
    Ok(())
}
