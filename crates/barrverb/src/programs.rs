//! Microcode programs and program tables

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::engine_constants::{POINTER_MASK, STEPS_PER_PROGRAM};
use crate::opcode::{OpClass, Opcode};

/// The program steps where audio enters or leaves the interpreter.
///
/// These are properties of the program table, the interpreter itself is program agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLayout {
    pub input: u8,
    pub left_output: u8,
    pub right_output: u8,
}

impl StepLayout {
    pub const MIDIVERB: Self = Self {
        input: 0x00,
        right_output: 0x60,
        left_output: 0x70,
    };

    pub const fn is_reserved(&self, step: usize) -> bool {
        step == self.input as usize
            || step == self.left_output as usize
            || step == self.right_output as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    name: &'static str,
    opcodes: [Opcode; STEPS_PER_PROGRAM],
}

impl Program {
    pub const BLANK: Self = Self::new("", [Opcode::from_word(0); STEPS_PER_PROGRAM]);

    pub const fn new(name: &'static str, opcodes: [Opcode; STEPS_PER_PROGRAM]) -> Self {
        Self { name, opcodes }
    }

    pub const fn from_words(name: &'static str, words: &[u16; STEPS_PER_PROGRAM]) -> Self {
        let mut opcodes = [Opcode::from_word(0); STEPS_PER_PROGRAM];

        let mut i = 0;
        while i < STEPS_PER_PROGRAM {
            opcodes[i] = Opcode::from_word(words[i]);
            i += 1;
        }

        Self { name, opcodes }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn opcodes(&self) -> &[Opcode; STEPS_PER_PROGRAM] {
        &self.opcodes
    }

    #[inline]
    pub const fn opcode(&self, step: usize) -> Opcode {
        self.opcodes[step]
    }

    /// Offset of the delay pointer when `step` executes, relative to the pointer at step 0.
    ///
    /// `step_position(STEPS_PER_PROGRAM)` is the pointer offset of the next pass.
    ///
    /// Panics if `step > STEPS_PER_PROGRAM`.
    pub fn step_position(&self, step: usize) -> u16 {
        self.opcodes[..step]
            .iter()
            .fold(0_u16, |p, op| p.wrapping_add(op.advance()) & POINTER_MASK)
    }

    /// Pointer movement of one complete pass (modulo the delay memory size).
    pub fn total_advance(&self) -> u16 {
        self.step_position(STEPS_PER_PROGRAM)
    }

    pub fn count_steps(&self, class: OpClass) -> usize {
        self.opcodes.iter().filter(|op| op.class() == class).count()
    }
}

/// A bank of programs.
///
/// Programs are never copied, the interpreter borrows the selected program.
#[derive(Debug)]
pub struct ProgramTable<'a> {
    programs: &'a [Program],
    layout: StepLayout,
}

impl<'a> ProgramTable<'a> {
    /// Panics if `programs` is empty
    pub const fn new(programs: &'a [Program], layout: StepLayout) -> Self {
        assert!(!programs.is_empty(), "Program table is empty");

        Self { programs, layout }
    }

    pub const fn len(&self) -> usize {
        self.programs.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub const fn layout(&self) -> StepLayout {
        self.layout
    }

    pub fn programs(&self) -> &'a [Program] {
        self.programs
    }

    /// Out of range indexes wrap around
    pub fn wrap_index(&self, index: usize) -> usize {
        index % self.programs.len()
    }

    pub fn program(&self, index: usize) -> &'a Program {
        &self.programs[self.wrap_index(index)]
    }

    pub fn name(&self, index: usize) -> &'static str {
        self.program(index).name()
    }

    /// Converts a 1-based front-panel program number into a program index.
    pub fn index_for_parameter(&self, value: f32) -> usize {
        let n = i64::try_from(self.programs.len()).unwrap_or(i64::MAX);
        let v = value as i64 - 1;

        // rem_euclid is never negative
        usize::try_from(v.rem_euclid(n)).unwrap_or(0)
    }
}

/// Compile-time microcode assembler.
///
/// Instructions are placed at absolute delay positions (relative to the step 0 pointer).
/// `build()` converts the positions into pointer advances and moves the pointer back one
/// cell per pass, so that a value written at position `w` is read at position `r`
/// exactly `r - w` passes later.
///
/// Steps that are not given an instruction read `filler` (the accumulator is not live there).
/// Step 0 (the ADC step) always reads position 0.
pub struct ProgramBuilder {
    layout: StepLayout,
    classes: [OpClass; STEPS_PER_PROGRAM],
    positions: [u16; STEPS_PER_PROGRAM],
    cursor: usize,
}

impl ProgramBuilder {
    pub const fn new(layout: StepLayout, filler: u16) -> Self {
        let mut positions = [filler & POINTER_MASK; STEPS_PER_PROGRAM];
        positions[layout.input as usize] = 0;

        Self {
            layout,
            classes: [OpClass::Read; STEPS_PER_PROGRAM],
            positions,
            cursor: layout.input as usize + 1,
        }
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Adds an instruction at the cursor.
    ///
    /// Panics if the cursor is on an input or output step.
    pub const fn op(mut self, class: OpClass, position: u16) -> Self {
        assert!(self.cursor < STEPS_PER_PROGRAM, "Too many instructions");
        assert!(
            !self.layout.is_reserved(self.cursor),
            "Instruction overlaps an input/output step"
        );

        self.classes[self.cursor] = class;
        self.positions[self.cursor] = position & POINTER_MASK;
        self.cursor += 1;
        self
    }

    /// Moves the cursor forward (the skipped steps are filler).
    pub const fn seek(mut self, step: usize) -> Self {
        assert!(step >= self.cursor, "Cannot seek backwards");
        self.cursor = step;
        self
    }

    /// Sets the instruction of a DAC (output) step.
    pub const fn output(mut self, step: u8, class: OpClass, position: u16) -> Self {
        let step = step as usize;
        assert!(
            step == self.layout.left_output as usize || step == self.layout.right_output as usize,
            "Not an output step"
        );

        self.classes[step] = class;
        self.positions[step] = position & POINTER_MASK;
        self
    }

    pub const fn build(self, name: &'static str) -> Program {
        let mut opcodes = [Opcode::from_word(0); STEPS_PER_PROGRAM];

        let mut i = 0;
        while i < STEPS_PER_PROGRAM {
            let next = if i + 1 < STEPS_PER_PROGRAM {
                self.positions[i + 1]
            } else {
                // Next pass starts one cell before this pass
                self.positions[0].wrapping_sub(1)
            };
            let advance = next.wrapping_sub(self.positions[i]) & POINTER_MASK;

            opcodes[i] = Opcode::new(self.classes[i], advance);
            i += 1;
        }

        Program::new(name, opcodes)
    }
}
