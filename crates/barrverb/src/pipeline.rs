//! Sample pipeline

// SPDX-FileCopyrightText: © 2024 The BarrVerb authors
//
// SPDX-License-Identifier: ISC

use crate::config::{EngineConfig, FilterCascade};
use crate::errors::ConfigError;
use crate::interpreter::{MicrocodeInterpreter, StereoFrame};
use crate::programs::ProgramTable;
use crate::rom::MIDIVERB_BANK;
use crate::svf::TwoPoleLowpass;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

const MAX_FILTER_STAGES: usize = 2;

/// One or two cascaded lowpass sections in front of the interpreter.
#[derive(Debug, Clone)]
pub struct PreFilter {
    cascade: FilterCascade,
    stages: [TwoPoleLowpass; MAX_FILTER_STAGES],
    n_stages: usize,
}

impl PreFilter {
    pub fn new(cascade: FilterCascade, sample_rate: f32) -> Self {
        let mut f = Self {
            cascade,
            stages: Default::default(),
            n_stages: cascade.stages().len().min(MAX_FILTER_STAGES),
        };
        f.set_sample_rate(sample_rate);
        f
    }

    pub fn n_stages(&self) -> usize {
        self.n_stages
    }

    pub fn stages(&self) -> &[TwoPoleLowpass] {
        &self.stages[..self.n_stages]
    }

    /// Recalculates the coefficients and clears the filter state.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for (filter, stage) in self.stages.iter_mut().zip(self.cascade.stages()) {
            filter.set_coefficients(stage.coefficients(sample_rate));
        }
    }

    pub fn reset(&mut self) {
        self.stages.iter_mut().for_each(TwoPoleLowpass::reset);
    }

    #[inline]
    pub fn step(&mut self, x: f32) -> f32 {
        self.stages[..self.n_stages]
            .iter_mut()
            .fold(x, |x, f| f.step(x))
    }
}

/// Program selection handle that can be sent to a control thread.
///
/// The selection is applied by the pipeline at the start of the next `process` call.
#[derive(Debug, Clone)]
pub struct ProgramSelector {
    index: Arc<AtomicUsize>,
    n_programs: usize,
}

impl ProgramSelector {
    fn new(n_programs: usize) -> Self {
        Self {
            index: Arc::new(AtomicUsize::new(0)),
            n_programs: n_programs.max(1),
        }
    }

    /// Returns the (wrapped) program index.
    pub fn select(&self, index: usize) -> usize {
        let index = index % self.n_programs;
        self.index.store(index, Ordering::Release);
        index
    }

    pub fn selected(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }
}

/// Downmix, pre-filter, interpreter and output cadence.
///
/// All state is allocated by `new()`, processing never allocates.
pub struct SamplePipeline<'a> {
    config: EngineConfig,
    sample_rate: f32,

    pre_filter: PreFilter,
    interpreter: MicrocodeInterpreter<'a>,
    selector: ProgramSelector,

    frames_per_pass: u32,
    phase: u32,
    held: StereoFrame,
}

impl SamplePipeline<'static> {
    /// Creates a pipeline using the built-in program bank.
    pub fn new(config: EngineConfig, sample_rate: f32) -> Result<Self, ConfigError> {
        Self::with_table(&MIDIVERB_BANK, config, sample_rate)
    }
}

impl<'a> SamplePipeline<'a> {
    pub fn with_table(
        table: &'a ProgramTable<'a>,
        config: EngineConfig,
        sample_rate: f32,
    ) -> Result<Self, ConfigError> {
        config.validate(sample_rate)?;

        debug!(
            sample_rate,
            filter_stages = config.pre_filter.stages().len(),
            scale = config.scale.factor(),
            frames_per_pass = config.cadence.frames_per_pass(),
            n_programs = table.len(),
            "Creating sample pipeline"
        );

        Ok(Self {
            config,
            sample_rate,
            pre_filter: PreFilter::new(config.pre_filter, sample_rate),
            interpreter: MicrocodeInterpreter::new(table, config.scale),
            selector: ProgramSelector::new(table.len()),
            frames_per_pass: config.cadence.frames_per_pass(),
            phase: 0,
            held: StereoFrame::SILENCE,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn table(&self) -> &'a ProgramTable<'a> {
        self.interpreter.table()
    }

    pub fn interpreter(&self) -> &MicrocodeInterpreter<'a> {
        &self.interpreter
    }

    pub fn pre_filter(&self) -> &PreFilter {
        &self.pre_filter
    }

    /// The program used by the interpreter.
    ///
    /// Selections made with a `ProgramSelector` are not applied until the next `process` call.
    pub fn program_index(&self) -> usize {
        self.interpreter.program_index()
    }

    pub fn program_selector(&self) -> ProgramSelector {
        self.selector.clone()
    }

    /// Changes the program immediately.
    ///
    /// Delay memory, registers and pointer are untouched.
    pub fn select_program(&mut self, index: usize) -> usize {
        let index = self.selector.select(index);
        self.interpreter.select_program(index);

        debug!(index, name = self.table().name(index), "Program selected");

        index
    }

    /// Recalculates the pre-filter coefficients and clears the filter state.
    pub fn set_sample_rate(&mut self, sample_rate: f32) -> Result<(), ConfigError> {
        self.config.validate(sample_rate)?;

        debug!(sample_rate, "Sample rate changed");

        self.sample_rate = sample_rate;
        self.pre_filter.set_sample_rate(sample_rate);

        Ok(())
    }

    /// Clears the registers, pointer, filter state and output cadence.
    ///
    /// CAUTION: Does not clear the delay memory, the reverb tail can continue after a reset.
    pub fn reset(&mut self) {
        debug!("Reset");

        self.interpreter.reset();
        self.pre_filter.reset();
        self.phase = 0;
        self.held = StereoFrame::SILENCE;
    }

    pub fn clear_memory(&mut self) {
        debug!("Clearing delay memory");

        self.interpreter.clear_memory();
    }

    fn apply_selection(&mut self) {
        let index = self.selector.selected();
        if index != self.interpreter.program_index() {
            self.interpreter.select_program(index);
        }
    }

    #[inline]
    fn tick(&mut self, mono: f32) -> StereoFrame {
        let filtered = self.pre_filter.step(mono);

        if self.phase == 0 {
            self.held = self.interpreter.run(filtered);
        }

        self.phase += 1;
        if self.phase >= self.frames_per_pass {
            self.phase = 0;
        }

        self.held
    }

    /// Processes one stereo buffer.
    ///
    /// Panics if the buffers are not the same length.
    pub fn process(
        &mut self,
        in_left: &[f32],
        in_right: &[f32],
        out_left: &mut [f32],
        out_right: &mut [f32],
    ) {
        let n_frames = in_left.len();
        assert_eq!(in_right.len(), n_frames, "input buffer size mismatch");
        assert_eq!(out_left.len(), n_frames, "output buffer size mismatch");
        assert_eq!(out_right.len(), n_frames, "output buffer size mismatch");

        self.apply_selection();

        let inputs = in_left.iter().zip(in_right);
        let outputs = out_left.iter_mut().zip(out_right.iter_mut());

        for ((&l, &r), (out_l, out_r)) in inputs.zip(outputs) {
            let frame = self.tick((l + r) / 2.0);
            *out_l = frame.left;
            *out_r = frame.right;
        }
    }

    /// Processes one mono buffer.
    ///
    /// Panics if the buffers are not the same length.
    pub fn process_mono(&mut self, input: &[f32], out_left: &mut [f32], out_right: &mut [f32]) {
        let n_frames = input.len();
        assert_eq!(out_left.len(), n_frames, "output buffer size mismatch");
        assert_eq!(out_right.len(), n_frames, "output buffer size mismatch");

        self.apply_selection();

        let outputs = out_left.iter_mut().zip(out_right.iter_mut());

        for (&x, (out_l, out_r)) in input.iter().zip(outputs) {
            let frame = self.tick(x);
            *out_l = frame.left;
            *out_r = frame.right;
        }
    }
}
