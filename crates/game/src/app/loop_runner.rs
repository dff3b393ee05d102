use std::process::ExitCode;

use skirmish_engine::run_loop;
use tracing::info;

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut simulation,
    } = app;

    let summary = run_loop(&config, &mut simulation);
    let metrics = simulation.latest_metrics();
    info!(
        frames = simulation.frames_rendered(),
        ticks = simulation.universe().tick(),
        steps_run = summary.steps_run,
        cues_played = simulation.cues_played(),
        fps = metrics.fps,
        camera_scale = simulation.camera().scale(),
        entities_drawn = simulation.renderer().tally().entities,
        outcome = ?simulation.outcome(),
        "skirmish_finished"
    );

    ExitCode::SUCCESS
}
