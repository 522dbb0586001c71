mod blackboard;
mod graphics;
mod settings;

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use ranger_hal::EmergencyStop;
use ranger_localization::{MotionModel, ParticleFilter};
use ranger_navigation::{Canvas, CanvasLog, Fanout, Navigator, PlanReport, SimulatedRobot};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use blackboard::{Blackboard, BlackboardVisualizer, liveness, mark_finished, raise_fault};
use settings::{Settings, WatchdogSettings};

fn main() -> anyhow::Result<()> {
    // stdout carries the canvas line protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = settings::load_settings()?;
    info!(render = settings.render.enabled, "Ranger supervisor started");

    let runtime = tokio::runtime::Runtime::new().context("failed to start the tokio runtime")?;
    let bb: Blackboard = Arc::default();
    let estop = EmergencyStop::new();
    let supervisor = runtime.spawn(supervise(settings.clone(), Arc::clone(&bb), estop.clone()));

    if settings.render.enabled {
        macroquad::Window::from_config(
            graphics::window_conf(&settings.render),
            graphics::run_visualization_loop(Arc::clone(&bb)),
        );
        if !liveness(&bb).1 {
            estop.engage("visualization closed");
        }
    }

    let report = runtime
        .block_on(supervisor)
        .context("supervisor task panicked")??;
    info!(
        reached = report.reached.len(),
        skipped = report.skipped.len(),
        estimate = %report.final_estimate,
        "Supervisor finished"
    );
    Ok(())
}

/// Runs the control thread and watches it until it reports back.
async fn supervise(
    settings: Settings,
    bb: Blackboard,
    estop: EmergencyStop,
) -> anyhow::Result<PlanReport> {
    let (done_tx, mut done_rx) = oneshot::channel();

    info!("Spawning control thread...");
    std::thread::Builder::new()
        .name("control".into())
        .spawn({
            let settings = settings.clone();
            let bb = Arc::clone(&bb);
            let estop = estop.clone();
            move || {
                info!("Control thread started.");
                let result = run_control(&settings, &bb, estop);
                if let Err(e) = &result {
                    error!(error = %format!("{:#}", e), "Control loop failed");
                    raise_fault(&bb, &format!("{:#}", e));
                }
                mark_finished(&bb);
                // The receiver only goes away if the supervisor itself is gone.
                let _ = done_tx.send(result);
            }
        })
        .context("failed to spawn the control thread")?;

    let early = tokio::select! {
        outcome = &mut done_rx => Some(outcome),
        () = watchdog(Arc::clone(&bb), estop, settings.watchdog.clone()) => None,
    };
    let outcome = match early {
        Some(outcome) => outcome,
        None => done_rx.await,
    };
    outcome.context("control thread exited without reporting")?
}

/// Engages the emergency stop when the control loop goes quiet for longer
/// than the configured timeout. Returns once the loop has finished.
async fn watchdog(bb: Blackboard, estop: EmergencyStop, settings: WatchdogSettings) {
    info!(timeout_ms = settings.timeout_ms, "Watchdog task started.");
    let timeout = settings.timeout();
    let mut tick = tokio::time::interval(settings.period());
    let mut tripped = false;
    loop {
        tick.tick().await;
        let (last_progress, finished) = liveness(&bb);
        if finished {
            return;
        }
        let age = Instant::now() - last_progress;
        if age > timeout && !tripped {
            warn!(?age, "Control loop stalled! Triggering E-stop.");
            estop.engage("control loop stalled");
            raise_fault(&bb, "control loop stalled");
            tripped = true;
        }
    }
}

/// Builds the simulated robot and the navigator, then runs the plan.
fn run_control(
    settings: &Settings,
    bb: &Blackboard,
    estop: EmergencyStop,
) -> anyhow::Result<PlanReport> {
    let map = settings.map.build()?;
    let calibration = settings.drive.calibration()?;
    let robot = SimulatedRobot::new(
        map.clone(),
        settings.robot.start(),
        calibration,
        settings.sim.clone(),
        estop,
    )
    .context("invalid [sim] settings")?;

    let motion = MotionModel::new(settings.motion).context("invalid [motion] settings")?;
    let filter = ParticleFilter::new(
        settings.filter.clone(),
        settings.robot.belief(),
        motion,
        settings.sonar.model()?,
    )
    .context("invalid [filter] settings")?;

    let mut plan = settings.plan.build();
    bb.write().waypoints = plan.iter().copied().collect();

    let mut sinks = Fanout::new()
        .with(Box::new(BlackboardVisualizer::new(Arc::clone(bb)).with_truth(robot.clone())));
    if settings.render.canvas_log {
        sinks = sinks.with(Box::new(CanvasLog::new(Canvas::default(), std::io::stdout())));
    }

    let mut navigator = Navigator::new(
        robot.drive(),
        robot.sonar(),
        map,
        filter,
        calibration,
        settings.navigator.clone(),
    )
    .context("failed to start the navigator")?
    .with_visualizer(Box::new(sinks));

    let report = navigator
        .run_plan(&mut plan, settings.plan.failure_policy)
        .context("plan aborted")?;
    let truth = robot.true_pose();
    info!(
        estimate = %report.final_estimate,
        truth = %truth,
        error_cm = report.final_estimate.distance_to(truth.position()),
        "Plan finished"
    );
    Ok(report)
}
