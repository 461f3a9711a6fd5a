#![no_main]

use libfuzzer_sys::fuzz_target;

use barrverb::engine_constants::{DELAY_MEMORY_SIZE, SAMPLE_MAX, SAMPLE_MIN, STEPS_PER_PROGRAM};
use barrverb::{FixedPointScale, MicrocodeInterpreter, Program, ProgramTable, StepLayout};

const PROGRAM_SIZE: usize = STEPS_PER_PROGRAM * 2;

fuzz_target!(|data: &[u8]| {
    if data.len() < PROGRAM_SIZE {
        return;
    }
    let (program_bytes, input_bytes) = data.split_at(PROGRAM_SIZE);

    let mut words = [0_u16; STEPS_PER_PROGRAM];
    for (w, b) in words.iter_mut().zip(program_bytes.chunks_exact(2)) {
        *w = u16::from_le_bytes([b[0], b[1]]);
    }

    let programs = [Program::from_words("fuzz", &words)];
    let table = ProgramTable::new(&programs, StepLayout::MIDIVERB);

    let mut interpreter = MicrocodeInterpreter::new(&table, FixedPointScale::X2048);

    let mut expected_pointer = 0;

    for b in input_bytes.chunks_exact(2) {
        // The ADC cell is not clamped, keep it in range for the memory check
        let input = i16::from_le_bytes([b[0], b[1]]).clamp(SAMPLE_MIN, SAMPLE_MAX);

        let dac = interpreter.run_fixed(input);

        assert!((SAMPLE_MIN..=SAMPLE_MAX).contains(&dac.left));
        assert!((SAMPLE_MIN..=SAMPLE_MAX).contains(&dac.right));

        expected_pointer =
            (expected_pointer + usize::from(programs[0].total_advance())) % DELAY_MEMORY_SIZE;
        assert_eq!(interpreter.pointer().index(), expected_pointer);
    }

    assert!(interpreter
        .memory()
        .cells()
        .iter()
        .all(|c| (SAMPLE_MIN..=SAMPLE_MAX).contains(c)));
});
