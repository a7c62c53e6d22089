//! The I/O boundary.
//!
//! Two operations talk to the outside world: `input` pulls one signed
//! integer, `output` emits one. The machine only sees the [`Bus`] trait,
//! so programs run against a console, a scripted queue, or anything else
//! a caller wires in.

use crate::cpu::Word;
use std::collections::VecDeque;
use std::io::{BufRead, Write as _};
use thiserror::Error;

/// The channel consumed by the `input` and `output` operations.
pub trait Bus {
    /// Supply one signed integer. Blocks until a value is available.
    fn input(&mut self) -> Result<Word, BusError>;

    /// Receive one signed integer emitted by the running program.
    fn output(&mut self, value: Word);
}

/// Interactive console bus: prompts on stdout, reads one line per input.
///
/// Values queued with [`StdioBus::with_inputs`] are consumed before the
/// console is consulted, so a run can be partially or fully scripted.
#[derive(Debug, Default)]
pub struct StdioBus {
    queued: VecDeque<Word>,
}

impl StdioBus {
    pub fn new() -> Self {
        Self {
            queued: VecDeque::new(),
        }
    }

    /// Console bus with values answered before any prompt is shown.
    pub fn with_inputs<I: IntoIterator<Item = Word>>(values: I) -> Self {
        Self {
            queued: values.into_iter().collect(),
        }
    }
}

impl Bus for StdioBus {
    fn input(&mut self) -> Result<Word, BusError> {
        if let Some(value) = self.queued.pop_front() {
            return Ok(value);
        }

        print!("Provide input: ");
        std::io::stdout()
            .flush()
            .map_err(|e| BusError::Channel(e.to_string()))?;

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| BusError::Channel(e.to_string()))?;
        if read == 0 {
            return Err(BusError::Closed);
        }

        parse_input(&line)
    }

    fn output(&mut self, value: Word) {
        println!("{value}");
    }
}

/// Parse one line of console input as a signed integer.
fn parse_input(line: &str) -> Result<Word, BusError> {
    let token = line.trim();
    token
        .parse::<Word>()
        .map_err(|_| BusError::MalformedInput(token.to_string()))
}

/// Scripted bus for tests and embedding: inputs come from a queue,
/// outputs are recorded in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBus {
    inputs: VecDeque<Word>,
    outputs: Vec<Word>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs<I: IntoIterator<Item = Word>>(values: I) -> Self {
        Self {
            inputs: values.into_iter().collect(),
            outputs: Vec::new(),
        }
    }

    /// Queue another input value.
    pub fn push_input(&mut self, value: Word) {
        self.inputs.push_back(value);
    }

    /// Everything the program has emitted so far, in order.
    pub fn outputs(&self) -> &[Word] {
        &self.outputs
    }
}

impl Bus for ScriptedBus {
    fn input(&mut self) -> Result<Word, BusError> {
        self.inputs.pop_front().ok_or(BusError::Closed)
    }

    fn output(&mut self, value: Word) {
        self.outputs.push(value);
    }
}

/// Errors raised at the I/O boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The supplied input cannot be parsed as a signed integer. This is a
    /// process-level condition, distinct from any fault in the running
    /// program.
    #[error("malformed input value {0:?}: expected a signed integer")]
    MalformedInput(String),

    /// The input channel has no more values to give.
    #[error("input channel closed")]
    Closed,

    /// The underlying channel failed.
    #[error("input channel error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_bus_inputs_in_order() {
        let mut bus = ScriptedBus::with_inputs([7, -3]);

        assert_eq!(bus.input().unwrap(), 7);
        assert_eq!(bus.input().unwrap(), -3);
        assert_eq!(bus.input(), Err(BusError::Closed));
    }

    #[test]
    fn test_scripted_bus_records_outputs() {
        let mut bus = ScriptedBus::new();

        bus.output(1);
        bus.output(1_125_899_906_842_624);
        assert_eq!(bus.outputs(), &[1, 1_125_899_906_842_624]);
    }

    #[test]
    fn test_parse_input_accepts_signed_integers() {
        assert_eq!(parse_input("42\n").unwrap(), 42);
        assert_eq!(parse_input("  -17  \n").unwrap(), -17);
    }

    #[test]
    fn test_parse_input_rejects_garbage() {
        assert_eq!(
            parse_input("seven\n"),
            Err(BusError::MalformedInput("seven".to_string()))
        );
        assert_eq!(parse_input("\n"), Err(BusError::MalformedInput(String::new())));
    }

    #[test]
    fn test_stdio_bus_prefers_queued_values() {
        let mut bus = StdioBus::with_inputs([5]);

        // Consumes the queue without touching the console
        assert_eq!(bus.input().unwrap(), 5);
    }
}
