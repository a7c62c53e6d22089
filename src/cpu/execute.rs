//! The execution engine.
//!
//! Drives the fetch-decode-resolve-dispatch cycle over one exclusively
//! owned memory and register file. Nothing here is process-global; any
//! number of machines run independently.

use crate::cpu::bus::{Bus, BusError};
use crate::cpu::decode::{decode, DecodeError, Opcode};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::Registers;
use crate::cpu::resolve::{resolve, Operands, ResolveError};
use crate::cpu::{Diagnostic, Word};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The halt instruction word, checked before any catalog lookup so a bare
/// halt never needs its length resolved.
const HALT_WORD: Word = 99;

/// Machine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// The machine is executing cycles.
    Running,
    /// The machine executed a halt instruction. Normal success.
    Halted,
    /// The machine stopped on a fault; the reason is kept on the machine.
    Faulted,
}

/// One executed instruction: where it was fetched from and the raw words
/// it consisted of. Instructions are transient values reconstructed from
/// memory every cycle, so self-modifying programs behave naturally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instr {
    /// Address the opcode word was fetched from.
    pub at: Word,
    /// The opcode word followed by its raw parameter words.
    pub words: Vec<Word>,
}

/// How a dispatched instruction left the instruction pointer.
enum Outcome {
    /// Advance past the instruction as usual.
    Continue,
    /// The instruction set the pointer itself; do not advance.
    Jumped,
    /// Stop the machine.
    Halted,
}

/// The word machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    /// Machine registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: RunState,
    /// Executed instruction count.
    pub cycles: u64,
    /// Buffered non-fatal diagnostics, oldest first.
    diagnostics: Vec<Diagnostic>,
    /// The fault that stopped the machine, if any.
    #[serde(skip)]
    fault: Option<Fault>,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instr>,
}

impl Machine {
    /// Create a machine with empty memory and zeroed registers.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: RunState::Running,
            cycles: 0,
            diagnostics: Vec::new(),
            fault: None,
            last_instr: None,
        }
    }

    /// Create a machine with a program image loaded at address 0.
    pub fn from_image(image: &[Word]) -> Self {
        let mut machine = Self::new();
        machine.mem.load_image(image);
        machine
    }

    /// Reset registers, memory, and state to a fresh machine.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = RunState::Running;
        self.cycles = 0;
        self.diagnostics.clear();
        self.fault = None;
        self.last_instr = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. On a fatal condition the
    /// machine transitions to [`RunState::Faulted`], records the reason,
    /// and the fault is returned.
    pub fn step(&mut self, bus: &mut dyn Bus) -> Result<Instr, Fault> {
        if self.state != RunState::Running {
            return Err(Fault::NotRunning(self.state));
        }

        match self.cycle(bus) {
            Ok(instr) => {
                self.cycles += 1;
                self.last_instr = Some(instr.clone());
                Ok(instr)
            }
            Err(fault) => {
                self.state = RunState::Faulted;
                self.fault = Some(fault.clone());
                Err(fault)
            }
        }
    }

    /// Run until halt or fault. Returns the number of instructions executed.
    pub fn run(&mut self, bus: &mut dyn Bus) -> Result<u64, Fault> {
        let start_cycles = self.cycles;

        while self.state == RunState::Running {
            self.step(bus)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, bus: &mut dyn Bus, max_cycles: u64) -> Result<u64, Fault> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == RunState::Running && self.cycles < limit {
            self.step(bus)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// One full fetch-decode-resolve-dispatch cycle.
    fn cycle(&mut self, bus: &mut dyn Bus) -> Result<Instr, Fault> {
        let at = self.regs.ip;

        let word = self.fetch(at)?;
        if word == HALT_WORD {
            self.state = RunState::Halted;
            return Ok(Instr { at, words: vec![word] });
        }

        let decoded = decode(word)?;
        let spec = decoded.opcode.spec();

        let mut words = Vec::with_capacity(spec.len as usize);
        words.push(word);
        for offset in 1..spec.len {
            words.push(self.fetch(at + offset)?);
        }

        let Operands { inputs, target, notes } =
            resolve(&words[1..], &decoded, &self.mem, self.regs.relative_base)?;
        self.diagnostics.extend(notes);

        match self.dispatch(decoded.opcode, &inputs, target, bus)? {
            Outcome::Continue => self.regs.advance(spec.len),
            Outcome::Jumped => {}
            Outcome::Halted => self.state = RunState::Halted,
        }

        Ok(Instr { at, words })
    }

    /// Execute one operation over its resolved operands.
    fn dispatch(
        &mut self,
        op: Opcode,
        inputs: &[Word],
        target: Option<Word>,
        bus: &mut dyn Bus,
    ) -> Result<Outcome, Fault> {
        match op {
            Opcode::Add => {
                self.store(target, inputs[0] + inputs[1])?;
                Ok(Outcome::Continue)
            }

            Opcode::Multiply => {
                self.store(target, inputs[0] * inputs[1])?;
                Ok(Outcome::Continue)
            }

            Opcode::Input => {
                let value = bus.input()?;
                self.store(target, value)?;
                Ok(Outcome::Continue)
            }

            Opcode::Output => {
                bus.output(inputs[0]);
                Ok(Outcome::Continue)
            }

            Opcode::JumpIfTrue => {
                if inputs[0] != 0 {
                    self.regs.jump(inputs[1]);
                    Ok(Outcome::Jumped)
                } else {
                    Ok(Outcome::Continue)
                }
            }

            Opcode::JumpIfFalse => {
                if inputs[0] == 0 {
                    self.regs.jump(inputs[1]);
                    Ok(Outcome::Jumped)
                } else {
                    Ok(Outcome::Continue)
                }
            }

            Opcode::LessThan => {
                self.store(target, (inputs[0] < inputs[1]) as Word)?;
                Ok(Outcome::Continue)
            }

            Opcode::Equals => {
                self.store(target, (inputs[0] == inputs[1]) as Word)?;
                Ok(Outcome::Continue)
            }

            Opcode::AdjustBase => {
                let base = self.regs.adjust_base(inputs[0]);
                if base < 0 {
                    self.diagnostics.push(Diagnostic::NegativeRelativeBase(base));
                }
                Ok(Outcome::Continue)
            }

            Opcode::Halt => Ok(Outcome::Halted),
        }
    }

    /// Read one word, noting reads of never-written cells.
    fn fetch(&mut self, addr: Word) -> Result<Word, Fault> {
        if addr >= 0 && !self.mem.is_set(addr) {
            self.diagnostics.push(Diagnostic::UninitializedRead(addr));
        }
        Ok(self.mem.read(addr)?)
    }

    /// Write a result to the resolved target address.
    fn store(&mut self, target: Option<Word>, value: Word) -> Result<(), Fault> {
        match target {
            Some(addr) => Ok(self.mem.write(addr, value)?),
            // The catalog marks every storing opcode as writing, and the
            // resolver fills the target for exactly those
            None => unreachable!("storing opcode resolved without a target"),
        }
    }

    /// The fault that stopped the machine, if it is faulted.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// All diagnostics emitted so far, oldest first.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<&Instr> {
        self.last_instr.as_ref()
    }

    /// Check if the machine halted normally.
    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    /// Check if the machine can execute another cycle.
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fatal conditions that stop a run.
///
/// Every fault carries its taxonomy kind; none is ever folded into an
/// ambiguous status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("machine is not running ({0:?})")]
    NotRunning(RunState),

    #[error("memory fault: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode fault: {0}")]
    Decode(#[from] DecodeError),

    #[error("operand fault: {0}")]
    Resolve(#[from] ResolveError),

    #[error("input fault: {0}")]
    Input(#[from] BusError),
}

impl Fault {
    /// Whether this fault came from the external input channel rather than
    /// the running program. Callers treat these as process-level.
    pub fn is_input(&self) -> bool {
        matches!(self, Fault::Input(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::bus::ScriptedBus;

    fn run_to_halt(image: &[Word], inputs: &[Word]) -> (Machine, Vec<Word>) {
        let mut machine = Machine::from_image(image);
        let mut bus = ScriptedBus::with_inputs(inputs.iter().copied());
        machine.run(&mut bus).unwrap();
        (machine, bus.outputs().to_vec())
    }

    #[test]
    fn test_halt_is_immediate() {
        let mut machine = Machine::from_image(&[99, 1, 0, 0, 0]);
        let mut bus = ScriptedBus::new();

        let executed = machine.run(&mut bus).unwrap();

        assert_eq!(executed, 1);
        assert!(machine.is_halted());
        // No memory mutation after the halt
        assert_eq!(machine.mem.dump(), vec![(0, 99), (1, 1), (2, 0), (3, 0), (4, 0)]);
    }

    #[test]
    fn test_add_multiply_program() {
        let (machine, _) = run_to_halt(&[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50], &[]);

        assert_eq!(machine.mem.read(0).unwrap(), 3500);
        assert_eq!(machine.mem.read(3).unwrap(), 70);
    }

    #[test]
    fn test_immediate_mode_multiply() {
        let (machine, _) = run_to_halt(&[1002, 4, 3, 4, 33], &[]);

        assert_eq!(machine.mem.read(4).unwrap(), 99);
    }

    #[test]
    fn test_negative_immediate_operand() {
        let (machine, _) = run_to_halt(&[1101, 100, -1, 4, 0], &[]);

        assert_eq!(machine.mem.read(4).unwrap(), 99);
    }

    #[test]
    fn test_large_immediate_output() {
        let (_, outputs) = run_to_halt(&[104, 1_125_899_906_842_624, 99], &[]);

        assert_eq!(outputs, vec![1_125_899_906_842_624]);
    }

    #[test]
    fn test_self_reproducing_program() {
        let image = [
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];

        let (_, outputs) = run_to_halt(&image, &[]);

        assert_eq!(outputs, image.to_vec());
    }

    #[test]
    fn test_input_to_output_roundtrip() {
        let (_, outputs) = run_to_halt(&[3, 0, 4, 0, 99], &[7]);

        assert_eq!(outputs, vec![7]);
    }

    #[test]
    fn test_equals_positional() {
        // Outputs 1 when the input equals 8, else 0
        let image = [3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8];

        let (_, equal) = run_to_halt(&image, &[8]);
        let (_, unequal) = run_to_halt(&image, &[5]);

        assert_eq!(equal, vec![1]);
        assert_eq!(unequal, vec![0]);
    }

    #[test]
    fn test_less_than_immediate() {
        // Outputs 1 when the input is less than 8, else 0
        let image = [3, 3, 1107, -1, 8, 3, 4, 3, 99];

        let (_, below) = run_to_halt(&image, &[5]);
        let (_, above) = run_to_halt(&image, &[9]);

        assert_eq!(below, vec![1]);
        assert_eq!(above, vec![0]);
    }

    #[test]
    fn test_jump_if_false_positional() {
        // Outputs 0 for input 0, 1 otherwise
        let image = [3, 12, 6, 12, 15, 1, 13, 14, 13, 4, 13, 99, -1, 0, 1, 9];

        let (_, zero) = run_to_halt(&image, &[0]);
        let (_, nonzero) = run_to_halt(&image, &[14]);

        assert_eq!(zero, vec![0]);
        assert_eq!(nonzero, vec![1]);
    }

    #[test]
    fn test_unknown_opcode_faults() {
        let mut machine = Machine::from_image(&[98, 0, 0]);
        let mut bus = ScriptedBus::new();

        let fault = machine.run(&mut bus).unwrap_err();

        assert_eq!(machine.state, RunState::Faulted);
        assert_eq!(fault, Fault::Decode(DecodeError::UnknownOpcode(98)));
        assert_eq!(machine.fault(), Some(&fault));
    }

    #[test]
    fn test_negative_jump_target_faults() {
        let mut machine = Machine::from_image(&[1105, 1, -4, 99]);
        let mut bus = ScriptedBus::new();

        let fault = machine.run(&mut bus).unwrap_err();

        assert_eq!(machine.state, RunState::Faulted);
        assert_eq!(fault, Fault::Memory(MemoryError::NegativeAddress(-4)));
    }

    #[test]
    fn test_negative_store_address_faults() {
        let mut machine = Machine::from_image(&[1101, 1, 1, -2, 99]);
        let mut bus = ScriptedBus::new();

        let fault = machine.run(&mut bus).unwrap_err();

        assert_eq!(fault, Fault::Memory(MemoryError::NegativeAddress(-2)));
    }

    #[test]
    fn test_immediate_write_target_faults() {
        let mut machine = Machine::from_image(&[11101, 1, 1, 0, 99]);
        let mut bus = ScriptedBus::new();

        let fault = machine.run(&mut bus).unwrap_err();

        assert_eq!(fault, Fault::Resolve(ResolveError::ImmediateTarget(0)));
        assert_eq!(machine.state, RunState::Faulted);
    }

    #[test]
    fn test_negative_relative_base_is_diagnosed_not_fatal() {
        let (machine, _) = run_to_halt(&[109, -5, 99], &[]);

        assert!(machine.is_halted());
        assert!(machine
            .diagnostics()
            .contains(&Diagnostic::NegativeRelativeBase(-5)));
    }

    #[test]
    fn test_uninitialized_read_is_diagnosed_not_fatal() {
        let (machine, outputs) = run_to_halt(&[4, 50, 99], &[]);

        assert_eq!(outputs, vec![0]);
        assert!(machine
            .diagnostics()
            .contains(&Diagnostic::UninitializedRead(50)));
    }

    #[test]
    fn test_input_starvation_faults() {
        let mut machine = Machine::from_image(&[3, 0, 99]);
        let mut bus = ScriptedBus::new();

        let fault = machine.run(&mut bus).unwrap_err();

        assert_eq!(fault, Fault::Input(BusError::Closed));
        assert!(fault.is_input());
    }

    #[test]
    fn test_step_after_halt_is_rejected() {
        let mut machine = Machine::from_image(&[99]);
        let mut bus = ScriptedBus::new();

        machine.run(&mut bus).unwrap();
        let err = machine.step(&mut bus).unwrap_err();

        assert_eq!(err, Fault::NotRunning(RunState::Halted));
        // A rejected step does not overwrite the terminal state
        assert!(machine.is_halted());
    }

    #[test]
    fn test_self_modifying_program() {
        // Rewrites the operand of its own output instruction before
        // reaching it
        let (machine, outputs) = run_to_halt(&[1101, 1, 1, 5, 104, 0, 99], &[]);

        assert!(machine.is_halted());
        assert_eq!(outputs, vec![2]);
    }

    #[test]
    fn test_determinism() {
        let image = [
            109, 1, 204, -1, 1001, 100, 1, 100, 1008, 100, 16, 101, 1006, 101, 0, 99,
        ];

        let (first, first_out) = run_to_halt(&image, &[]);
        let (second, second_out) = run_to_halt(&image, &[]);

        assert_eq!(first.mem.dump(), second.mem.dump());
        assert_eq!(first_out, second_out);
        assert_eq!(first.cycles, second.cycles);
    }

    #[test]
    fn test_run_limited_stops_early() {
        // Infinite loop: jump-if-true back to the start forever
        let mut machine = Machine::from_image(&[1105, 1, 0]);
        let mut bus = ScriptedBus::new();

        let executed = machine.run_limited(&mut bus, 10).unwrap();

        assert_eq!(executed, 10);
        assert!(machine.is_running());
    }

    #[test]
    fn test_decorated_halt_word_halts() {
        // 199 decodes to halt through the catalog even though it is not a
        // bare 99 word
        let (machine, _) = run_to_halt(&[199], &[]);

        assert!(machine.is_halted());
    }
}
