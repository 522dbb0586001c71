//! Diagnostic drawing sink.
//!
//! The navigator reports walls, particles, the pose estimate and its own
//! phase to an optional [`Visualizer`]. Nothing drawn here feeds back into
//! control.

use std::io::Write;

use ranger_kinematics::{Point, Pose};
use ranger_localization::{Particle, Segment};
use tracing::warn;

use crate::navigator::NavState;

/// A particle as handed to a visualizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticleView {
    /// x (cm).
    pub x: f64,
    /// y (cm).
    pub y: f64,
    /// Heading (rad).
    pub theta: f64,
    /// Normalized weight.
    pub weight: f64,
}

impl From<&Particle> for ParticleView {
    fn from(p: &Particle) -> Self {
        Self {
            x: p.pose.x,
            y: p.pose.y,
            theta: p.pose.theta,
            weight: p.weight,
        }
    }
}

/// Output sink for diagnostic drawing.
pub trait Visualizer {
    /// Draw the map.
    fn draw_walls(&mut self, walls: &[Segment]);

    /// Draw the current particle set.
    fn draw_particles(&mut self, particles: &[ParticleView]);

    /// Draw the current pose estimate.
    fn draw_estimate(&mut self, _estimate: &Pose) {}

    /// Report the navigator's phase for `target`.
    fn draw_status(&mut self, _target: Point, _state: NavState) {}
}

/// Forwards every drawing call to each of its sinks in order.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn Visualizer + Send>>,
}

impl Fanout {
    /// An empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with(mut self, sink: Box<dyn Visualizer + Send>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// `true` if no sink is attached.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Visualizer for Fanout {
    fn draw_walls(&mut self, walls: &[Segment]) {
        self.sinks.iter_mut().for_each(|s| s.draw_walls(walls));
    }

    fn draw_particles(&mut self, particles: &[ParticleView]) {
        self.sinks.iter_mut().for_each(|s| s.draw_particles(particles));
    }

    fn draw_estimate(&mut self, estimate: &Pose) {
        self.sinks.iter_mut().for_each(|s| s.draw_estimate(estimate));
    }

    fn draw_status(&mut self, target: Point, state: NavState) {
        self.sinks.iter_mut().for_each(|s| s.draw_status(target, state));
    }
}

/// Map-to-screen transform for a square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    map_size: f64,
    size_px: f64,
    margin: f64,
    scale: f64,
}

impl Canvas {
    /// A canvas of `size_px` pixels showing a `map_size` cm square with a 5 % margin.
    pub fn new(map_size: f64, size_px: f64) -> Self {
        let margin = 0.05 * map_size;
        Self {
            map_size,
            size_px,
            margin,
            scale: size_px / (map_size + 2.0 * margin),
        }
    }

    /// Canvas size in pixels.
    pub fn size_px(&self) -> f64 {
        self.size_px
    }

    /// Pixels per centimeter.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Screen x of map x.
    pub fn screen_x(&self, x: f64) -> f64 {
        (x + self.margin) * self.scale
    }

    /// Screen y of map y; the screen y axis points down.
    pub fn screen_y(&self, y: f64) -> f64 {
        (self.map_size + self.margin - y) * self.scale
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new(210.0, 768.0)
    }
}

/// Writes `drawLine:` and `drawParticles:` lines for the rig's web viewer.
pub struct CanvasLog<W: Write> {
    canvas: Canvas,
    out: W,
}

impl<W: Write> CanvasLog<W> {
    /// Creates a log writing to `out`.
    pub fn new(canvas: Canvas, out: W) -> Self {
        Self { canvas, out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: String) {
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!(error = %e, "Failed to write canvas line");
        }
    }
}

impl<W: Write> Visualizer for CanvasLog<W> {
    fn draw_walls(&mut self, walls: &[Segment]) {
        for s in walls {
            let line = format!(
                "drawLine:({}, {}, {}, {})",
                self.canvas.screen_x(s.x1),
                self.canvas.screen_y(s.y1),
                self.canvas.screen_x(s.x2),
                self.canvas.screen_y(s.y2)
            );
            self.emit(line);
        }
    }

    fn draw_particles(&mut self, particles: &[ParticleView]) {
        let body = particles
            .iter()
            .map(|p| {
                format!(
                    "({}, {}, {}, {})",
                    self.canvas.screen_x(p.x),
                    self.canvas.screen_y(p.y),
                    p.theta,
                    p.weight
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.emit(format!("drawParticles:[{}]", body));
    }
}
