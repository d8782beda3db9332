//! Reference tape-machine interpreter.
//!
//! Executes genome source text against a byte tape. Execution never fails:
//! malformed programs simply stop early and yield whatever they printed.

use super::Executor;
use serde::{Deserialize, Serialize};

/// Number of cells on the tape.
pub const TAPE_SIZE: usize = 2048;

/// Default instruction budget per execution.
pub const DEFAULT_INSTRUCTION_BUDGET: u64 = 2048 * 2048 * 8;

/// Written bytes are reduced modulo this value (plain ASCII output).
const OUTPUT_MODULO: u8 = 128;

/// Byte tape with a clamped head.
#[derive(Debug, Clone)]
struct Tape {
    cells: Vec<u8>,
    head: usize,
}

impl Tape {
    fn new(size: usize) -> Self {
        Tape {
            cells: vec![0u8; size.max(1)],
            head: 0,
        }
    }

    #[inline]
    fn left(&mut self) {
        self.head = self.head.saturating_sub(1);
    }

    #[inline]
    fn right(&mut self) {
        if self.head + 1 < self.cells.len() {
            self.head += 1;
        }
    }

    #[inline]
    fn get(&self) -> u8 {
        self.cells[self.head]
    }

    #[inline]
    fn set(&mut self, value: u8) {
        self.cells[self.head] = value;
    }
}

/// Matching bracket positions; `None` for an unmatched bracket.
fn match_brackets(program: &[u8]) -> Vec<Option<usize>> {
    let mut jumps = vec![None; program.len()];
    let mut stack = Vec::new();
    for (idx, &op) in program.iter().enumerate() {
        match op {
            b'[' => stack.push(idx),
            b']' => {
                if let Some(open) = stack.pop() {
                    jumps[open] = Some(idx);
                    jumps[idx] = Some(open);
                }
            }
            _ => {}
        }
    }
    jumps
}

/// Configuration for the tape machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeConfig {
    /// Number of tape cells.
    pub tape_size: usize,
    /// Maximum number of instructions executed per run.
    pub instruction_budget: u64,
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            tape_size: TAPE_SIZE,
            instruction_budget: DEFAULT_INSTRUCTION_BUDGET,
        }
    }
}

/// Interpreter for the tape language.
///
/// - cells wrap around on increment and decrement;
/// - the head stays on the tape at both ends;
/// - reading past the end of the input stores zero;
/// - a jump to an unmatched bracket halts the program;
/// - output stops one byte short of `max_output_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TapeMachine {
    config: TapeConfig,
}

impl TapeMachine {
    /// Create a machine with the given configuration.
    #[must_use]
    pub fn new(config: TapeConfig) -> Self {
        Self { config }
    }

    /// Create a machine with a custom instruction budget.
    #[must_use]
    pub fn with_budget(instruction_budget: u64) -> Self {
        Self::new(TapeConfig {
            instruction_budget,
            ..TapeConfig::default()
        })
    }

    /// Run `source` and return the raw output bytes.
    #[must_use]
    pub fn run(&self, source: &str, stdin: &str, max_output_size: usize) -> Vec<u8> {
        let mut output = Vec::new();
        if max_output_size == 0 {
            return output;
        }

        let program = source.as_bytes();
        let jumps = match_brackets(program);
        let input = stdin.as_bytes();
        let mut input_pos = 0usize;
        let mut tape = Tape::new(self.config.tape_size);
        let mut pc = 0usize;
        let mut executed = 0u64;

        while pc < program.len() && executed < self.config.instruction_budget {
            executed += 1;
            match program[pc] {
                b'>' => tape.right(),
                b'<' => tape.left(),
                b'+' => tape.set(tape.get().wrapping_add(1)),
                b'-' => tape.set(tape.get().wrapping_sub(1)),
                b',' => {
                    if let Some(&byte) = input.get(input_pos) {
                        tape.set(byte);
                        input_pos += 1;
                    } else {
                        tape.set(0);
                    }
                }
                b'.' => {
                    output.push(tape.get() % OUTPUT_MODULO);
                    if output.len() + 1 >= max_output_size {
                        break;
                    }
                }
                b'[' if tape.get() == 0 => match jumps[pc] {
                    Some(close) => pc = close,
                    None => break,
                },
                b']' if tape.get() != 0 => match jumps[pc] {
                    Some(open) => pc = open,
                    None => break,
                },
                _ => {}
            }
            pc += 1;
        }

        output
    }
}

impl Executor for TapeMachine {
    fn execute(&self, source: &str, stdin: &str, max_output_size: usize) -> String {
        let mut output = self.run(source, stdin, max_output_size);
        while output.last() == Some(&0) {
            output.pop();
        }
        output.into_iter().map(char::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpret(source: &str, stdin: &str) -> String {
        TapeMachine::default().execute(source, stdin, 1 << 16)
    }

    #[test]
    fn test_basic_ops() {
        for x in 2u8..127 {
            let input = char::from(x).to_string();
            assert_eq!(interpret(",.", &input), input);
            assert_eq!(interpret(",+.", &input), char::from(x + 1).to_string());
            assert_eq!(interpret(",-.", &input), char::from(x - 1).to_string());
        }
    }

    #[test]
    fn test_basic_loop() {
        for x in 1u8..127 {
            let input = char::from(x).to_string();
            assert_eq!(interpret(",[-]+.", &input), "\u{1}");
        }
    }

    #[test]
    fn test_basic_move() {
        assert_eq!(interpret(",>+.", "*"), "\u{1}");
        assert_eq!(interpret("<<<+.", ""), "\u{1}");
    }

    #[test]
    fn test_addition_program() {
        assert_eq!(interpret("++++>,<[->+<]>.", "a"), "e");
    }

    #[test]
    fn test_unbalanced_brackets_halt() {
        for source in ["]", "[", "[]", "+[]", "+]", "+[[,,]-]"] {
            assert_eq!(interpret(source, ""), "", "source {source:?}");
        }
    }

    #[test]
    fn test_output_is_capped() {
        let machine = TapeMachine::default();
        let out = machine.execute("+[.]", "", 32);
        assert_eq!(out.len(), 31);
    }

    #[test]
    fn test_instruction_budget() {
        let machine = TapeMachine::with_budget(1000);
        assert_eq!(machine.execute("+[]", "", 32), "");
        assert_eq!(machine.execute("+.", "", 32), "\u{1}");
    }

    #[test]
    fn test_trailing_nul_trimmed() {
        assert_eq!(interpret("+.-..", ""), "\u{1}");
    }

    #[test]
    fn test_hello() {
        let source = format!("{}.+.>{}.+.", "+".repeat(104), "+".repeat(32));
        assert_eq!(interpret(&source, ""), "hi !");
    }
}
