//! Microcode interpreter

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::config::FixedPointScale;
use crate::delay_memory::{DelayMemory, DelayPointer};
use crate::engine_constants::{SAMPLE_MAX, SAMPLE_MIN};
use crate::opcode::OpClass;
use crate::programs::{Program, ProgramTable, StepLayout};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub const SILENCE: Self = Self {
        left: 0.0,
        right: 0.0,
    };
}

/// Fixed-point DAC values of one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DacFrame {
    pub left: i16,
    pub right: i16,
}

#[inline]
fn clamp_sample(value: i16) -> i16 {
    value.clamp(SAMPLE_MIN, SAMPLE_MAX)
}

pub struct MicrocodeInterpreter<'a> {
    table: &'a ProgramTable<'a>,
    layout: StepLayout,
    scale: FixedPointScale,

    program: &'a Program,
    program_index: usize,

    memory: DelayMemory,

    accumulator: i16,
    latch: i16,
    pointer: DelayPointer,
}

impl<'a> MicrocodeInterpreter<'a> {
    /// Starts with program 0, zeroed registers and zeroed delay memory.
    pub fn new(table: &'a ProgramTable<'a>, scale: FixedPointScale) -> Self {
        Self {
            table,
            layout: table.layout(),
            scale,
            program: table.program(0),
            program_index: 0,
            memory: DelayMemory::new(),
            accumulator: 0,
            latch: 0,
            pointer: DelayPointer::ZERO,
        }
    }

    pub fn table(&self) -> &'a ProgramTable<'a> {
        self.table
    }

    pub fn scale(&self) -> FixedPointScale {
        self.scale
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn program_index(&self) -> usize {
        self.program_index
    }

    pub fn accumulator(&self) -> i16 {
        self.accumulator
    }

    pub fn latch(&self) -> i16 {
        self.latch
    }

    pub fn pointer(&self) -> DelayPointer {
        self.pointer
    }

    pub fn memory(&self) -> &DelayMemory {
        &self.memory
    }

    /// Changes the program for the next pass.
    ///
    /// The registers, pointer and delay memory are untouched.
    /// Returns the (wrapped) program index.
    pub fn select_program(&mut self, index: usize) -> usize {
        let index = self.table.wrap_index(index);

        self.program_index = index;
        self.program = self.table.program(index);

        index
    }

    /// Clears the registers and pointer.
    ///
    /// CAUTION: Does not clear the delay memory
    pub fn reset(&mut self) {
        self.accumulator = 0;
        self.latch = 0;
        self.pointer = DelayPointer::ZERO;
    }

    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    /// Executes one pass of the selected program.
    #[inline]
    pub fn run(&mut self, input: f32) -> StereoFrame {
        let dac = self.run_fixed(self.scale.to_fixed(input));

        StereoFrame {
            left: self.scale.to_sample(dac.left),
            right: self.scale.to_sample(dac.right),
        }
    }

    /// Executes one pass of the selected program with a fixed-point input sample.
    ///
    /// The input is stored in the ADC cell unclamped.
    pub fn run_fixed(&mut self, input: i16) -> DacFrame {
        let program = self.program;

        let input_step = usize::from(self.layout.input);
        let left_step = usize::from(self.layout.left_output);
        let right_step = usize::from(self.layout.right_output);

        let mut dac = DacFrame::default();

        for (step, opcode) in program.opcodes().iter().enumerate() {
            // The latch is calculated from the unclamped value.
            // Memory writes and the DAC only see the clamped value.
            let raw = match opcode.class() {
                OpClass::ReadAccumulate => {
                    let raw = self.memory.read(self.pointer);
                    self.latch = self.accumulator.saturating_add(raw >> 1);
                    raw
                }
                OpClass::Read => {
                    let raw = self.memory.read(self.pointer);
                    self.latch = raw >> 1;
                    raw
                }
                OpClass::WriteAccumulate => {
                    let raw = self.accumulator;
                    self.memory.write(self.pointer, clamp_sample(raw));
                    self.latch = self.accumulator.saturating_add(raw >> 1);
                    raw
                }
                OpClass::WriteInvert => {
                    let raw = self.accumulator;
                    self.memory.write(self.pointer, -clamp_sample(raw));
                    // `raw >> 1` is never i16::MIN
                    self.latch = -(raw >> 1);
                    raw
                }
            };
            let ai = clamp_sample(raw);

            if step == input_step {
                // ADC
                self.memory.write(self.pointer, input);
            } else if step == left_step {
                dac.left = ai;
            } else if step == right_step {
                dac.right = ai;
            } else {
                // ADC and DAC steps do not latch the accumulator
                self.accumulator = self.latch;
            }

            self.pointer = self.pointer.advance(opcode.advance());
        }

        dac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_constants::{DELAY_MEMORY_SIZE, POINTER_MASK, STEPS_PER_PROGRAM};
    use crate::opcode::Opcode;
    use crate::programs::ProgramBuilder;
    use crate::rom::MIDIVERB_BANK;

    use crate::opcode::OpClass::{Read, ReadAccumulate, WriteAccumulate, WriteInvert};

    const LAYOUT: StepLayout = StepLayout::MIDIVERB;

    const TAP_DELAY: u16 = 300;
    const FILLER: u16 = 0x2000;

    static TEST_PROGRAMS: [Program; 5] = [
        // Input taps
        ProgramBuilder::new(LAYOUT, FILLER)
            .output(LAYOUT.right_output, Read, 0)
            .output(LAYOUT.left_output, Read, TAP_DELAY)
            .build("taps"),
        // Every operation
        ProgramBuilder::new(LAYOUT, FILLER)
            .op(Read, 0)
            .op(WriteAccumulate, 10)
            .op(WriteInvert, 20)
            .op(ReadAccumulate, 10)
            .op(WriteAccumulate, 30)
            .output(LAYOUT.right_output, Read, 20)
            .output(LAYOUT.left_output, Read, 30)
            .build("operations"),
        // Accumulator overflow
        overflow_program(),
        // Echo with feedback
        ProgramBuilder::new(LAYOUT, FILLER)
            .op(Read, 0)
            .op(ReadAccumulate, 100 + 50)
            .op(WriteAccumulate, 100)
            .output(LAYOUT.right_output, Read, 100 + 50)
            .output(LAYOUT.left_output, Read, 100 + 25)
            .build("echo"),
        // Accumulator above the 12-bit range
        ProgramBuilder::new(LAYOUT, FILLER)
            .op(Read, 0)
            .op(ReadAccumulate, 0)
            .op(ReadAccumulate, 0)
            .op(WriteAccumulate, 1)
            .op(WriteInvert, 2)
            .op(WriteAccumulate, 3)
            .op(WriteInvert, 4)
            .op(WriteAccumulate, 5)
            .output(LAYOUT.right_output, Read, 3)
            .output(LAYOUT.left_output, Read, 5)
            .build("wide accumulator"),
    ];
    static TEST_TABLE: ProgramTable<'static> = ProgramTable::new(&TEST_PROGRAMS, LAYOUT);

    const fn overflow_program() -> Program {
        let mut b = ProgramBuilder::new(LAYOUT, FILLER).op(Read, 0);
        while b.cursor() <= 60 {
            b = b.op(ReadAccumulate, 0);
        }
        b.op(WriteAccumulate, 50)
            .op(WriteInvert, 60)
            .output(LAYOUT.right_output, Read, 60)
            .output(LAYOUT.left_output, Read, 50)
            .build("overflow")
    }

    fn interpreter(program: usize) -> MicrocodeInterpreter<'static> {
        let mut i = MicrocodeInterpreter::new(&TEST_TABLE, FixedPointScale::X2048);
        i.select_program(program);
        i
    }

    #[test]
    fn silence() {
        for p in 0..MIDIVERB_BANK.len() {
            let mut i = MicrocodeInterpreter::new(&MIDIVERB_BANK, FixedPointScale::X2048);
            i.select_program(p);

            for _ in 0..300 {
                assert_eq!(i.run(0.0), StereoFrame::SILENCE);
            }
            assert!(i.memory().is_silent());
        }
    }

    #[test]
    fn input_taps() {
        let mut i = interpreter(0);

        let dac = i.run_fixed(1000);
        assert_eq!(dac, DacFrame { left: 0, right: 1000 });

        for pass in 1..TAP_DELAY {
            let dac = i.run_fixed(0);
            assert_eq!(dac, DacFrame { left: 0, right: 0 }, "pass {pass}");
        }

        assert_eq!(i.run_fixed(0), DacFrame { left: 1000, right: 0 });
        assert_eq!(i.run_fixed(0), DacFrame { left: 0, right: 0 });
    }

    #[test]
    fn operations() {
        let mut i = interpreter(1);

        let dac = i.run_fixed(1000);

        let cells = i.memory().cells();
        assert_eq!(cells[0], 1000);
        // Read: acc = 500, WriteAccumulate: acc = 500 + 250
        assert_eq!(cells[10], 500);
        // WriteInvert: acc = -375
        assert_eq!(cells[20], -750);
        // ReadAccumulate: acc = -375 + 250
        assert_eq!(cells[30], -125);

        assert_eq!(dac, DacFrame { left: -125, right: -750 });

        // ADC cell and 3 writes
        assert_eq!(cells.iter().filter(|&&c| c != 0).count(), 4);
        assert_eq!(i.pointer().address(), POINTER_MASK);

        // Filler steps latch `filler/2` into the accumulator
        assert_eq!(i.accumulator(), 0);
    }

    #[test]
    fn arithmetic_shift_rounds_down() {
        let mut i = interpreter(1);

        let dac = i.run_fixed(-3);
        let cells = i.memory().cells();

        // Read: acc = -3 >> 1 = -2
        assert_eq!(cells[10], -2);
        // WriteAccumulate: acc = -2 + (-1) = -3, WriteInvert stores 3 and acc = -(-3 >> 1) = 2
        assert_eq!(cells[20], 3);
        // ReadAccumulate: 2 + (-2 >> 1)
        assert_eq!(cells[30], 1);

        assert_eq!(dac, DacFrame { left: 1, right: 3 });
    }

    #[test]
    fn accumulator_overflow_is_clamped() {
        let mut i = interpreter(2);

        let dac = i.run_fixed(i16::MAX);

        let cells = i.memory().cells();
        // The ADC cell is not clamped
        assert_eq!(cells[0], i16::MAX);
        assert_eq!(cells[50], SAMPLE_MAX);
        assert_eq!(cells[60], -SAMPLE_MAX);
        assert_eq!(dac, DacFrame { left: SAMPLE_MAX, right: -SAMPLE_MAX });

        let dac = i.run_fixed(i16::MIN);
        assert_eq!(i.memory().cells()[0x3fff], i16::MIN);
        assert_eq!(dac, DacFrame { left: SAMPLE_MIN, right: SAMPLE_MAX });
    }

    #[test]
    fn latch_uses_unclamped_value() {
        let mut i = interpreter(4);

        let dac = i.run_fixed(2000);

        // Read and 2 ReadAccumulates: acc = 1000 + 1000 + 1000
        //
        // WriteAccumulate stores 2047, acc = 3000 + 1500 = 4500
        // WriteInvert stores -2047, acc = -2250
        // WriteAccumulate stores -2047, acc = -2250 + -1125 = -3375
        // WriteInvert stores 2047, acc = -(-3375 >> 1) = 1688
        // WriteAccumulate stores 1688
        assert_eq!(
            i.memory().cells()[..6],
            [2000, SAMPLE_MAX, -SAMPLE_MAX, -SAMPLE_MAX, SAMPLE_MAX, 1688]
        );
        assert_eq!(dac, DacFrame { left: 1688, right: -SAMPLE_MAX });
    }

    #[test]
    fn unclamped_adc_cell_is_halved_into_the_latch() {
        let mut i = interpreter(1);

        // Read: acc = 2048 >> 1
        let dac = i.run_fixed(2048);
        let cells = i.memory().cells();

        assert_eq!(cells[0], 2048);
        assert_eq!(cells[10], 1024);
        // WriteAccumulate: acc = 1024 + 512, WriteInvert: acc = -768
        assert_eq!(cells[20], -1536);
        // ReadAccumulate: acc = -768 + 512
        assert_eq!(cells[30], -256);
        assert_eq!(dac, DacFrame { left: -256, right: -1536 });
    }

    /// xorshift32
    struct Rng(u32);

    impl Rng {
        fn next(&mut self) -> u32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 17;
            self.0 ^= self.0 << 5;
            self.0
        }
    }

    #[test]
    fn random_programs_stay_in_range() {
        let mut rng = Rng(0x1234_5678);

        for _ in 0..20 {
            let words: [u16; STEPS_PER_PROGRAM] = std::array::from_fn(|_| rng.next() as u16);
            let programs = [Program::from_words("random", &words)];
            let table = ProgramTable::new(&programs, LAYOUT);

            let mut i = MicrocodeInterpreter::new(&table, FixedPointScale::X4096);

            for _ in 0..200 {
                // Keeps the ADC cell inside the 12-bit range
                let input = (rng.next() as i32 as f32) / (i32::MAX as f32) * 0.45;
                let out = i.run(input);

                assert!(out.left.abs() <= 2047.0 / 4096.0);
                assert!(out.right.abs() <= 2047.0 / 4096.0);
                assert!(i.pointer().index() < DELAY_MEMORY_SIZE);
            }

            assert!(i
                .memory()
                .cells()
                .iter()
                .all(|&c| (SAMPLE_MIN..=SAMPLE_MAX).contains(&c)));
        }
    }

    #[test]
    fn pointer_follows_program_advances() {
        let words: [u16; STEPS_PER_PROGRAM] =
            std::array::from_fn(|s| Opcode::new(Read, (s as u16) * 37).word());
        let programs = [Program::from_words("advances", &words)];
        let table = ProgramTable::new(&programs, LAYOUT);

        let mut i = MicrocodeInterpreter::new(&table, FixedPointScale::X2048);

        let mut expected = 0_usize;
        for _ in 0..500 {
            i.run(0.0);
            expected = (expected + usize::from(programs[0].total_advance())) % DELAY_MEMORY_SIZE;
            assert_eq!(i.pointer().index(), expected);
        }
    }

    #[test]
    fn program_switch_preserves_state() {
        let mut i = interpreter(3);

        i.run_fixed(1500);
        for _ in 0..100 {
            i.run_fixed(0);
        }

        let memory = *i.memory().cells();
        let pointer = i.pointer();
        let accumulator = i.accumulator();
        let latch = i.latch();

        assert_eq!(i.select_program(0), 0);
        assert_eq!(i.program().name(), "taps");

        assert_eq!(i.memory().cells(), &memory);
        assert_eq!(i.pointer(), pointer);
        assert_eq!(i.accumulator(), accumulator);
        assert_eq!(i.latch(), latch);

        // The echo continues in memory and can be read by the new program
        i.run_fixed(0);
        assert_ne!(i.memory().cells(), &[0; DELAY_MEMORY_SIZE]);
    }

    #[test]
    fn select_program_wraps() {
        let mut i = interpreter(0);

        assert_eq!(i.select_program(6), 1);
        assert_eq!(i.program_index(), 1);
        assert_eq!(i.program().name(), "operations");

        assert_eq!(i.select_program(usize::MAX), usize::MAX % 5);
    }

    #[test]
    fn reset_keeps_memory() {
        let mut i = interpreter(3);

        i.run_fixed(1500);
        i.run_fixed(0);
        assert_ne!(i.pointer(), DelayPointer::ZERO);

        i.reset();
        assert_eq!(i.pointer(), DelayPointer::ZERO);
        assert_eq!(i.accumulator(), 0);
        assert_eq!(i.latch(), 0);
        assert!(!i.memory().is_silent());

        i.clear_memory();
        assert!(i.memory().is_silent());
    }

    #[test]
    fn echo_feedback() {
        let mut i = interpreter(3);

        // line = input/2 + line[50]/2
        let mut left = Vec::new();
        let mut right = Vec::new();

        let dac = i.run_fixed(2000);
        left.push(dac.left);
        right.push(dac.right);

        for _ in 0..200 {
            let dac = i.run_fixed(0);
            left.push(dac.left);
            right.push(dac.right);
        }

        // Right reads 50 passes after the write, left 25
        assert_eq!(right[50], 1000);
        assert_eq!(right[100], 500);
        assert_eq!(right[150], 250);
        assert_eq!(right[200], 125);
        assert_eq!(left[25], 1000);
        assert_eq!(left[75], 500);

        assert_eq!(right.iter().filter(|&&s| s != 0).count(), 4);
        assert_eq!(left.iter().filter(|&&s| s != 0).count(), 4);
    }
}
