use tracing::{debug, info};

use crate::config::LightningConfig;
use crate::rng::Rng;
use crate::types::{Color, LightningView, RuntimeEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyStriking,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Sequence,
    Phase(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: u64,
    pub kind: TaskKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RampStep {
    RampIn,
    Hold,
    RampOut,
}

#[derive(Clone, Debug)]
struct PhaseTask {
    phase: usize,
    exit_speed: f32,
    step: RampStep,
    elapsed: f32,
}

#[derive(Clone, Debug)]
struct StrikeSequence {
    next_phase: usize,
    current: Option<PhaseTask>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseRecord {
    pub phase: usize,
    pub started_tick: u64,
    pub started_secs: f32,
    pub completed_tick: Option<u64>,
    pub completed_secs: Option<f32>,
}

/// Sole owner of the environment tint and the strike state.
#[derive(Clone, Debug)]
pub struct LightningOrchestrator {
    config: LightningConfig,
    striking: bool,
    ticker_secs: f32,
    tint: Color,
    background_tint: Color,
    ambient_light: bool,
    sequence: Option<StrikeSequence>,
    pending_tasks: Vec<TaskHandle>,
    records: Vec<PhaseRecord>,
    events: Vec<RuntimeEvent>,
    tick_count: u64,
    clock_secs: f32,
    next_task_id: u64,
}

impl LightningOrchestrator {
    pub fn new(config: LightningConfig, rng: &mut Rng) -> Self {
        let dark = config.dark_tint;
        let mut orchestrator = Self {
            config,
            striking: false,
            ticker_secs: 0.0,
            tint: dark,
            background_tint: dark,
            ambient_light: false,
            sequence: None,
            pending_tasks: Vec::new(),
            records: Vec::new(),
            events: Vec::new(),
            tick_count: 0,
            clock_secs: 0.0,
            next_task_id: 1,
        };
        orchestrator.reset_ticker(rng);
        orchestrator
    }

    pub fn is_striking(&self) -> bool {
        self.striking
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn background_tint(&self) -> Color {
        self.background_tint
    }

    pub fn ambient_light(&self) -> bool {
        self.ambient_light
    }

    pub fn ticker_secs(&self) -> f32 {
        self.ticker_secs
    }

    pub fn pending_tasks(&self) -> &[TaskHandle] {
        &self.pending_tasks
    }

    pub fn phase_records(&self) -> &[PhaseRecord] {
        &self.records
    }

    pub fn config(&self) -> &LightningConfig {
        &self.config
    }

    pub fn view(&self) -> LightningView {
        LightningView {
            striking: self.striking,
            tint: self.tint,
            background_tint: self.background_tint,
            ambient_light: self.ambient_light,
            ticker_secs: self.ticker_secs,
            pending_tasks: self.pending_tasks.len(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Starts a two-phase strike unless one is already running or lightning is disabled.
    /// A merged trigger creates no task and leaves every field untouched.
    pub fn trigger(&mut self, rng: &mut Rng) -> TriggerOutcome {
        if self.config.all_disabled {
            return TriggerOutcome::Disabled;
        }
        if self.striking {
            debug!("lightning trigger merged into running strike");
            return TriggerOutcome::AlreadyStriking;
        }

        self.striking = true;
        self.reset_ticker(rng);
        self.records.clear();
        self.sequence = Some(StrikeSequence {
            next_phase: 0,
            current: None,
        });
        let handle = self.issue_task(TaskKind::Sequence);
        self.pending_tasks.push(handle);
        self.events.push(RuntimeEvent::LightningStarted);
        info!(next_ticker_secs = self.ticker_secs, "lightning strike started");
        TriggerOutcome::Started
    }

    /// Cancels every outstanding strike task and snaps the scene back to dark.
    /// Returns how many tasks were cancelled; does nothing while idle.
    pub fn interrupt(&mut self) -> usize {
        if !self.striking && self.pending_tasks.is_empty() {
            return 0;
        }
        let cancelled = self.pending_tasks.len();
        self.pending_tasks.clear();
        self.sequence = None;
        self.striking = false;
        self.tint = self.config.dark_tint;
        if !self.config.background_disabled {
            self.background_tint = self.config.dark_tint;
        }
        self.ambient_light = false;
        self.events
            .push(RuntimeEvent::LightningInterrupted { cancelled });
        info!(cancelled, "lightning interrupted");
        cancelled
    }

    pub fn tick(&mut self, dt_secs: f32, rng: &mut Rng) {
        self.tick_count += 1;
        self.clock_secs += dt_secs;

        if !self.striking {
            if !self.config.auto_disabled {
                self.ticker_secs = (self.ticker_secs - dt_secs).max(0.0);
                if self.ticker_secs <= 0.0 {
                    self.trigger(rng);
                }
            }
            if !self.striking {
                self.settle_idle_tint();
                return;
            }
        }

        self.advance_sequence(dt_secs, rng);
    }

    fn advance_sequence(&mut self, dt_secs: f32, rng: &mut Rng) {
        let Some(mut sequence) = self.sequence.take() else {
            self.striking = false;
            return;
        };

        let Some(mut task) = sequence.current.take() else {
            if let Some(exit_speed) = self.config.phase_exit_speeds.get(sequence.next_phase) {
                let task = self.start_phase(sequence.next_phase, *exit_speed);
                sequence.current = Some(task);
                self.sequence = Some(sequence);
                self.advance_sequence(dt_secs, rng);
            } else {
                self.finish_sequence(rng);
            }
            return;
        };

        let done = self.advance_phase(&mut task, dt_secs);
        if done {
            self.complete_phase(task.phase);
            sequence.next_phase += 1;
            if sequence.next_phase >= self.config.phase_exit_speeds.len() {
                self.finish_sequence(rng);
                return;
            }
        } else {
            sequence.current = Some(task);
        }
        self.sequence = Some(sequence);
    }

    fn start_phase(&mut self, phase: usize, exit_speed: f32) -> PhaseTask {
        let handle = self.issue_task(TaskKind::Phase(phase));
        self.pending_tasks.push(handle);
        self.ambient_light = true;
        self.records.push(PhaseRecord {
            phase,
            started_tick: self.tick_count,
            started_secs: self.clock_secs,
            completed_tick: None,
            completed_secs: None,
        });
        self.events
            .push(RuntimeEvent::LightningPhaseStarted { phase });
        debug!(phase, exit_speed, "lightning phase started");
        PhaseTask {
            phase,
            exit_speed,
            step: RampStep::RampIn,
            elapsed: 0.0,
        }
    }

    /// Returns true once the phase has ramped back to the dark baseline.
    fn advance_phase(&mut self, task: &mut PhaseTask, dt_secs: f32) -> bool {
        let dark = self.config.dark_tint;
        let light = self.config.light_tint;
        task.elapsed += dt_secs;
        match task.step {
            RampStep::RampIn => {
                let progress = (task.elapsed * self.config.enter_speed).clamp(0.0, 1.0);
                self.set_tint(dark.lerp(light, progress));
                if progress >= 1.0 {
                    task.step = RampStep::Hold;
                    task.elapsed = 0.0;
                }
                false
            }
            RampStep::Hold => {
                self.set_tint(light);
                if task.elapsed >= self.config.hold_secs {
                    task.step = RampStep::RampOut;
                    task.elapsed = 0.0;
                }
                false
            }
            RampStep::RampOut => {
                let progress = (task.elapsed * task.exit_speed).clamp(0.0, 1.0);
                if progress >= 1.0 {
                    self.set_tint(dark);
                    return true;
                }
                self.set_tint(light.lerp(dark, progress));
                false
            }
        }
    }

    fn complete_phase(&mut self, phase: usize) {
        self.pending_tasks
            .retain(|handle| handle.kind != TaskKind::Phase(phase));
        self.ambient_light = false;
        if let Some(record) = self.records.iter_mut().find(|record| record.phase == phase) {
            record.completed_tick = Some(self.tick_count);
            record.completed_secs = Some(self.clock_secs);
        }
        self.events
            .push(RuntimeEvent::LightningPhaseCompleted { phase });
        debug!(phase, "lightning phase completed");
    }

    fn finish_sequence(&mut self, rng: &mut Rng) {
        self.sequence = None;
        self.pending_tasks.clear();
        self.striking = false;
        self.ambient_light = false;
        self.set_tint(self.config.dark_tint);
        self.reset_ticker(rng);
        self.events.push(RuntimeEvent::LightningFinished);
        info!(next_ticker_secs = self.ticker_secs, "lightning strike finished");
    }

    fn settle_idle_tint(&mut self) {
        let dark = self.config.dark_tint;
        if self.tint != dark {
            self.tint = dark;
        }
        if !self.config.background_disabled && self.background_tint != dark {
            self.background_tint = dark;
        }
    }

    fn set_tint(&mut self, tint: Color) {
        self.tint = tint;
        if !self.config.background_disabled {
            self.background_tint = tint;
        }
    }

    fn reset_ticker(&mut self, rng: &mut Rng) {
        self.ticker_secs = rng.range_f32(self.config.ticker_min_secs, self.config.ticker_max_secs);
    }

    fn issue_task(&mut self, kind: TaskKind) -> TaskHandle {
        let handle = TaskHandle {
            id: self.next_task_id,
            kind,
        };
        self.next_task_id += 1;
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DARK_TINT, LIGHT_TINT};

    const DT: f32 = 0.02;

    fn quiet_config() -> LightningConfig {
        LightningConfig {
            auto_disabled: true,
            ..LightningConfig::default()
        }
    }

    fn orchestrator(config: LightningConfig) -> (LightningOrchestrator, Rng) {
        let mut rng = Rng::new(11);
        let orchestrator = LightningOrchestrator::new(config, &mut rng);
        (orchestrator, rng)
    }

    fn run_until_idle(orchestrator: &mut LightningOrchestrator, rng: &mut Rng) -> usize {
        let mut ticks = 0;
        while orchestrator.is_striking() {
            orchestrator.tick(DT, rng);
            ticks += 1;
            assert!(ticks < 10_000, "strike never finished");
        }
        ticks
    }

    #[test]
    fn trigger_while_striking_changes_nothing() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        assert_eq!(orch.trigger(&mut rng), TriggerOutcome::Started);
        orch.tick(DT, &mut rng);
        let tasks_before = orch.pending_tasks().to_vec();
        let ticker_before = orch.ticker_secs();
        let tint_before = orch.tint();

        assert_eq!(orch.trigger(&mut rng), TriggerOutcome::AlreadyStriking);
        assert_eq!(orch.pending_tasks(), tasks_before.as_slice());
        assert_eq!(orch.ticker_secs(), ticker_before);
        assert_eq!(orch.tint(), tint_before);
    }

    #[test]
    fn disabled_lightning_never_starts() {
        let (mut orch, mut rng) = orchestrator(LightningConfig {
            all_disabled: true,
            ..LightningConfig::default()
        });
        assert_eq!(orch.trigger(&mut rng), TriggerOutcome::Disabled);
        assert!(!orch.is_striking());
        assert!(orch.pending_tasks().is_empty());
    }

    #[test]
    fn interrupt_while_idle_is_a_no_op() {
        let (mut orch, _rng) = orchestrator(quiet_config());
        let view_before = orch.view();
        assert_eq!(orch.interrupt(), 0);
        assert_eq!(orch.tint(), DARK_TINT);
        assert_eq!(orch.view().ticker_secs, view_before.ticker_secs);
        assert!(orch.drain_events().is_empty());
    }

    #[test]
    fn phase_two_starts_strictly_after_phase_one_completes() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        orch.trigger(&mut rng);
        run_until_idle(&mut orch, &mut rng);

        let records = orch.phase_records();
        assert_eq!(records.len(), 2);
        let first_done = records[0].completed_tick.expect("phase 1 completed");
        let first_done_secs = records[0].completed_secs.expect("phase 1 completed");
        assert!(first_done < records[1].started_tick);
        assert!(first_done_secs < records[1].started_secs);
        assert!(records[1].completed_tick.is_some());
        assert_eq!(orch.tint(), DARK_TINT);
        assert!(orch.pending_tasks().is_empty());
        assert!(!orch.ambient_light());
    }

    #[test]
    fn second_phase_afterglow_is_slower() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        orch.trigger(&mut rng);
        run_until_idle(&mut orch, &mut rng);
        let records = orch.phase_records();
        let length = |record: &PhaseRecord| {
            record.completed_tick.unwrap_or(record.started_tick) - record.started_tick
        };
        assert!(length(&records[1]) > length(&records[0]));
    }

    #[test]
    fn tint_reaches_white_during_each_phase() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        orch.trigger(&mut rng);
        let mut white_phases = Vec::new();
        while orch.is_striking() {
            orch.tick(DT, &mut rng);
            if orch.tint() == LIGHT_TINT {
                if let Some(record) = orch.phase_records().last() {
                    if !white_phases.contains(&record.phase) {
                        white_phases.push(record.phase);
                    }
                }
            }
        }
        assert_eq!(white_phases, vec![0, 1]);
    }

    #[test]
    fn interrupt_mid_phase_restores_baseline_immediately() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        orch.trigger(&mut rng);
        for _ in 0..3 {
            orch.tick(DT, &mut rng);
        }
        assert!(orch.ambient_light());
        assert_ne!(orch.tint(), DARK_TINT);

        let cancelled = orch.interrupt();
        assert_eq!(cancelled, 2);
        assert!(!orch.is_striking());
        assert_eq!(orch.tint(), DARK_TINT);
        assert_eq!(orch.background_tint(), DARK_TINT);
        assert!(!orch.ambient_light());
        assert!(orch.pending_tasks().is_empty());

        orch.tick(DT, &mut rng);
        assert_eq!(orch.tint(), DARK_TINT);
        assert_eq!(orch.trigger(&mut rng), TriggerOutcome::Started);
    }

    #[test]
    fn auto_ticker_fires_and_resets() {
        let (mut orch, mut rng) = orchestrator(LightningConfig {
            ticker_min_secs: 0.1,
            ticker_max_secs: 0.1,
            ..LightningConfig::default()
        });
        for _ in 0..6 {
            orch.tick(DT, &mut rng);
        }
        assert!(orch.is_striking());
        assert!((orch.ticker_secs() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn finished_strike_draws_a_fresh_ticker() {
        let (mut orch, mut rng) = orchestrator(LightningConfig {
            ticker_min_secs: 50.0,
            ticker_max_secs: 100.0,
            ..quiet_config()
        });
        orch.trigger(&mut rng);
        let at_trigger = orch.ticker_secs();
        run_until_idle(&mut orch, &mut rng);
        let after = orch.ticker_secs();
        assert_ne!(after, at_trigger);
        assert!((50.0..=100.0).contains(&after));
    }

    #[test]
    fn auto_disabled_freezes_ticker() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        let before = orch.ticker_secs();
        for _ in 0..1_000 {
            orch.tick(DT, &mut rng);
        }
        assert!(!orch.is_striking());
        assert_eq!(orch.ticker_secs(), before);
    }

    #[test]
    fn background_stays_dark_when_disabled() {
        let (mut orch, mut rng) = orchestrator(LightningConfig {
            auto_disabled: true,
            background_disabled: true,
            ..LightningConfig::default()
        });
        orch.trigger(&mut rng);
        for _ in 0..4 {
            orch.tick(DT, &mut rng);
        }
        assert_ne!(orch.tint(), DARK_TINT);
        assert_eq!(orch.background_tint(), DARK_TINT);
    }

    #[test]
    fn journal_orders_strike_events() {
        let (mut orch, mut rng) = orchestrator(quiet_config());
        orch.trigger(&mut rng);
        run_until_idle(&mut orch, &mut rng);
        let kinds: Vec<String> = orch
            .drain_events()
            .iter()
            .map(|event| match event {
                RuntimeEvent::LightningStarted => "start".to_string(),
                RuntimeEvent::LightningPhaseStarted { phase } => format!("begin{phase}"),
                RuntimeEvent::LightningPhaseCompleted { phase } => format!("end{phase}"),
                RuntimeEvent::LightningFinished => "finish".to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec!["start", "begin0", "end0", "begin1", "end1", "finish"]);
    }
}
