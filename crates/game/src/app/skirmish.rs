use rand::rngs::StdRng;
use rand::SeedableRng;
use skirmish_engine::{
    Affine2, AudioCue, AudioSink, Bounds2D, CameraError, Command, EntityView, FloatingOrigin,
    LineKind, LockSubject, LoopMetricsSnapshot, OrderOutcome, PlayerId, RenderSink, Simulation,
    TickReport, Turret, Universe, Vec2, WorldError, LOCAL_PLAYER,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::config::{GameConfig, InputAction, ScriptedInput};

#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    #[error("world setup: {0}")]
    World(#[from] WorldError),
    #[error("camera setup: {0}")]
    Camera(#[from] CameraError),
}

/// Per-frame counts collected by [`TracingRenderer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameTally {
    pub(crate) entities: usize,
    pub(crate) selected: usize,
    pub(crate) lines: usize,
    pub(crate) outlines: usize,
}

/// Render collaborator for a headless run: projects every view through the
/// camera and reports it as trace events.
#[derive(Debug)]
pub(crate) struct TracingRenderer {
    projection: Affine2,
    tally: FrameTally,
}

impl TracingRenderer {
    fn new() -> Self {
        Self {
            projection: Affine2::IDENTITY,
            tally: FrameTally::default(),
        }
    }

    fn begin_frame(&mut self, projection: Affine2) {
        self.projection = projection;
        self.tally = FrameTally::default();
    }

    pub(crate) fn tally(&self) -> FrameTally {
        self.tally
    }
}

impl RenderSink for TracingRenderer {
    fn draw_entity(&mut self, view: &EntityView) {
        let screen = self.projection.apply(view.position);
        self.tally.entities += 1;
        self.tally.selected += usize::from(view.selected);
        trace!(
            entity = view.id.0,
            owner = view.owner.0,
            kind = ?view.kind,
            state = view.state,
            x = screen.x,
            y = screen.y,
            selected = view.selected,
            hull = view.health.map(|health| health.hull),
            "draw_entity"
        );
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, kind: LineKind) {
        let from = self.projection.apply(from);
        let to = self.projection.apply(to);
        self.tally.lines += 1;
        trace!(?kind, from_x = from.x, from_y = from.y, to_x = to.x, to_y = to.y, "draw_line");
    }

    fn draw_bounds(&mut self, _bounds: Bounds2D) {
        self.tally.outlines += 1;
    }
}

/// Audio collaborator that logs each cue instead of playing a clip.
#[derive(Debug, Default)]
pub(crate) struct TracingAudio {
    played: u64,
}

impl AudioSink for TracingAudio {
    fn play(&mut self, cue: AudioCue) {
        self.played = self.played.saturating_add(1);
        info!(cue = cue.phrase(), "audio_cue");
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BattleOutcome {
    Undecided,
    Victory { player: PlayerId, name: String },
    MutualDestruction,
}

/// Headless skirmish: a universe driven by a scripted input feed, watched by
/// a camera, rendered and voiced through tracing.
#[derive(Debug)]
pub(crate) struct SkirmishSimulation {
    universe: Universe,
    camera: FloatingOrigin,
    script: Vec<ScriptedInput>,
    next_input: usize,
    rng: StdRng,
    renderer: TracingRenderer,
    audio: TracingAudio,
    last_report: TickReport,
    metrics: LoopMetricsSnapshot,
    frames_rendered: u64,
    max_frames: u64,
    outcome: BattleOutcome,
    decided: bool,
}

impl SkirmishSimulation {
    pub(crate) fn from_config(config: &GameConfig) -> Result<Self, ScenarioError> {
        let camera = FloatingOrigin::new(config.camera)?;

        let (local, opponents) = match config.players.split_first() {
            Some(split) => split,
            None => return Err(WorldError::UnknownPlayer(LOCAL_PLAYER).into()),
        };
        let mut universe = Universe::new(config.tuning.clone(), local.name.clone(), local.color)?;
        universe.set_debug_bounds(config.debug_bounds);

        let mut roster = vec![(LOCAL_PLAYER, local)];
        for setup in opponents {
            let id = universe.add_player(setup.name.clone(), setup.color);
            roster.push((id, setup));
        }

        for (owner, setup) in roster {
            for unit in &setup.fleet {
                let id = if unit.turrets.is_empty() {
                    universe.spawn_vessel(owner, unit.position)?
                } else {
                    universe.spawn_attack_vessel(owner, unit.position)?
                };
                for kind in &unit.turrets {
                    let turret = Turret::new(*kind, universe.tuning());
                    universe.mount_turret(id, turret)?;
                }
            }
        }

        let mut script = config.script.clone();
        script.sort_by_key(|input| input.tick);

        let seed = config.rng_seed.unwrap_or_else(rand::random);
        info!(
            players = universe.players().len(),
            units = universe.entity_count(),
            scripted_inputs = script.len(),
            seed,
            max_frames = config.max_frames,
            "skirmish_ready"
        );

        Ok(Self {
            universe,
            camera,
            script,
            next_input: 0,
            rng: StdRng::seed_from_u64(seed),
            renderer: TracingRenderer::new(),
            audio: TracingAudio::default(),
            last_report: TickReport::default(),
            metrics: LoopMetricsSnapshot::default(),
            frames_rendered: 0,
            max_frames: config.max_frames,
            outcome: BattleOutcome::Undecided,
            decided: false,
        })
    }

    pub(crate) fn universe(&self) -> &Universe {
        &self.universe
    }

    pub(crate) fn camera(&self) -> &FloatingOrigin {
        &self.camera
    }

    pub(crate) fn renderer(&self) -> &TracingRenderer {
        &self.renderer
    }

    pub(crate) fn outcome(&self) -> &BattleOutcome {
        &self.outcome
    }

    pub(crate) fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub(crate) fn cues_played(&self) -> u64 {
        self.audio.played
    }

    pub(crate) fn latest_metrics(&self) -> LoopMetricsSnapshot {
        self.metrics
    }

    /// Feeds every scripted input due at or before `tick`.
    fn apply_due_inputs(&mut self, tick: u64) {
        while let Some(input) = self.script.get(self.next_input) {
            if input.tick > tick {
                break;
            }
            let action = input.action.clone();
            self.next_input += 1;
            self.apply_input(action);
        }
    }

    fn apply_input(&mut self, action: InputAction) {
        match action {
            InputAction::Click { at } => {
                self.camera.track_cursor(Vec2::ZERO, at);
                let world = self.camera.screen_to_world(at);
                match self.universe.issue_order_at(world, &mut self.rng) {
                    Ok(outcome) => log_order(world, outcome),
                    Err(err) => warn!(error = %err, x = world.x, y = world.y, "order_rejected"),
                }
            }
            InputAction::SelectRect { from, to } => {
                let selected = self.universe.select_in_rect(
                    self.camera.screen_to_world(from),
                    self.camera.screen_to_world(to),
                );
                debug!(selected, "rect_selection");
            }
            InputAction::ClearSelection => {
                let cleared = self.universe.clear_selection();
                debug!(cleared, "selection_cleared");
            }
            InputAction::Zoom { pointer, delta } => {
                self.camera.track_cursor(Vec2::ZERO, pointer);
                let zoomed = self.camera.zoom(delta);
                debug!(delta, zoomed, scale = self.camera.scale(), "camera_zoom");
            }
            InputAction::Pan { from, to } => {
                self.camera.track_cursor(Vec2::ZERO, from);
                self.camera.start_panning();
                self.camera.pointer_moved(Vec2::ZERO, to);
                self.camera.stop_panning();
                let offset = self.camera.offset();
                debug!(offset_x = offset.x, offset_y = offset.y, "camera_pan");
            }
            InputAction::OpponentsEngage => self.opponents_engage(),
        }
    }

    fn opponents_engage(&mut self) {
        let Some(target) = self.universe.local_player().units().first() else {
            return;
        };
        let orders: Vec<Command> = self
            .universe
            .players()
            .iter()
            .filter(|player| player.id() != LOCAL_PLAYER && !player.units().is_empty())
            .map(|player| Command::LockOnTarget {
                subject: LockSubject::Group(player.units().ids().to_vec()),
                target,
            })
            .collect();
        for order in orders {
            if let Err(err) = self.universe.dispatch_command(order) {
                warn!(error = %err, "opponent_order_rejected");
            }
        }
    }

    fn check_outcome(&mut self) {
        if self.decided || self.universe.players().len() < 2 {
            return;
        }
        let mut standing = self
            .universe
            .players()
            .iter()
            .filter(|player| !player.units().is_empty());
        let outcome = match (standing.next(), standing.next()) {
            (Some(_), Some(_)) => return,
            (Some(winner), None) => BattleOutcome::Victory {
                player: winner.id(),
                name: winner.name().to_string(),
            },
            (None, _) => BattleOutcome::MutualDestruction,
        };
        info!(tick = self.universe.tick(), outcome = ?outcome, "battle_decided");
        self.outcome = outcome;
        self.decided = true;
    }
}

fn log_order(world: Vec2, outcome: OrderOutcome) {
    match outcome {
        OrderOutcome::Selected(id) => debug!(entity = id.0, "order_selected_unit"),
        OrderOutcome::LockedOn { target, units } => {
            info!(target = target.0, units, "order_lock_on")
        }
        OrderOutcome::Moved { units } => info!(units, x = world.x, y = world.y, "order_move"),
        OrderOutcome::NoSelection => debug!(x = world.x, y = world.y, "order_without_selection"),
    }
}

impl Simulation for SkirmishSimulation {
    fn update(&mut self) {
        let upcoming = self.universe.tick().saturating_add(1);
        self.apply_due_inputs(upcoming);
        self.last_report = self.universe.update(&mut self.audio);
        trace!(
            tick = self.last_report.tick,
            commands = self.last_report.commands_applied,
            updated = self.last_report.entities_updated,
            "tick"
        );
        self.check_outcome();
    }

    fn render(&mut self) {
        self.renderer.begin_frame(self.camera.projection());
        self.universe.render(&mut self.renderer);
        self.frames_rendered = self.frames_rendered.saturating_add(1);
        let tally = self.renderer.tally();
        debug!(
            frame = self.frames_rendered,
            tick = self.universe.tick(),
            entities = tally.entities,
            selected = tally.selected,
            lines = tally.lines,
            outlines = tally.outlines,
            "frame_rendered"
        );
    }

    fn stats(&mut self, metrics: &LoopMetricsSnapshot) {
        self.metrics = *metrics;
    }

    fn is_finished(&self) -> bool {
        self.decided || self.frames_rendered >= self.max_frames
    }
}
