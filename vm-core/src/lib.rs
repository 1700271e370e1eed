//! Execution engine for a fixed-width bytecode over a flat 32-bit
//! byte-addressable memory: a decode-dispatch loop, a 16-entry register file
//! with a read-only accumulator, and a call/data stack.
//!
//! This crate has no opinion on where programs come from (no assembler, no
//! loader beyond a raw byte copy) or how traps are surfaced to a human (that
//! is the `vm-cli` crate's job); it only implements [`Engine::step`] and
//! [`Engine::run`] faithfully.

pub mod engine;
pub mod isa;
pub mod memory;
pub mod registers;
pub mod stack;
pub mod trap;

pub use engine::{Engine, RunReport, StepOutcome};
pub use isa::{Instruction, Mnemonic, INSTRUCTION_WIDTH};
pub use memory::Memory;
pub use registers::RegisterFile;
pub use stack::Stack;
pub use trap::Trap;
