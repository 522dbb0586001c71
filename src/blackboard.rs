use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use ranger_kinematics::{Point, Pose};
use ranger_localization::Segment;
use ranger_navigation::{NavState, ParticleView, SimulatedRobot, Visualizer, Waypoint};

#[derive(Clone)]
pub struct State {
    pub walls: Vec<Segment>,
    pub particles: Vec<ParticleView>,
    pub estimate: Pose,
    pub truth: Option<Pose>,
    pub waypoints: Vec<Waypoint>,
    pub target: Option<Point>,
    pub phase: Option<NavState>,
    pub last_progress: Instant,
    pub faults: Vec<String>,
    pub finished: bool,
}

impl Default for State {
    fn default() -> Self {
        State {
            walls: Vec::new(),
            particles: Vec::new(),
            estimate: Pose::default(),
            truth: None,
            waypoints: Vec::new(),
            target: None,
            phase: None,
            last_progress: Instant::now(),
            faults: Vec::new(),
            finished: false,
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

/// When the control loop last reported progress, and whether it is done.
pub fn liveness(bb: &Blackboard) -> (Instant, bool) {
    let g = bb.read();
    (g.last_progress, g.finished)
}

pub fn mark_finished(bb: &Blackboard) {
    bb.write().finished = true;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

/// Publishes what the navigator draws onto the blackboard. Every call counts
/// as progress for the watchdog.
pub struct BlackboardVisualizer {
    bb: Blackboard,
    truth: Option<SimulatedRobot>,
}

impl BlackboardVisualizer {
    pub fn new(bb: Blackboard) -> Self {
        Self { bb, truth: None }
    }

    /// Also publish the simulator's ground truth.
    pub fn with_truth(mut self, robot: SimulatedRobot) -> Self {
        self.truth = Some(robot);
        self
    }

    fn publish(&self, update: impl FnOnce(&mut State)) {
        let truth = self.truth.as_ref().map(SimulatedRobot::true_pose);
        let mut g = self.bb.write();
        update(&mut g);
        if truth.is_some() {
            g.truth = truth;
        }
        g.last_progress = Instant::now();
    }
}

impl Visualizer for BlackboardVisualizer {
    fn draw_walls(&mut self, walls: &[Segment]) {
        self.publish(|s| s.walls = walls.to_vec());
    }

    fn draw_particles(&mut self, particles: &[ParticleView]) {
        self.publish(|s| s.particles = particles.to_vec());
    }

    fn draw_estimate(&mut self, estimate: &Pose) {
        self.publish(|s| s.estimate = *estimate);
    }

    fn draw_status(&mut self, target: Point, state: NavState) {
        self.publish(|s| {
            s.target = Some(target);
            s.phase = Some(state);
        });
    }
}
