use macroquad::prelude::*;
use tracing::info;

use ranger_kinematics::Pose;
use ranger_navigation::Canvas;

use crate::blackboard::{Blackboard, snapshot};
use crate::settings::RenderSettings;

pub fn window_conf(render: &RenderSettings) -> Conf {
    Conf {
        window_title: "Ranger Localization".to_string(),
        window_width: render.window_size,
        window_height: render.window_size,
        high_dpi: true,
        ..Default::default()
    }
}

/// Map extent used when no walls have been published yet.
const DEFAULT_MAP_SIZE: f64 = 210.0;
const STATUS_FONT: f32 = 20.0;

fn map_size(walls: &[ranger_localization::Segment]) -> f64 {
    walls
        .iter()
        .flat_map(|s| [s.x1, s.x2, s.y1, s.y2])
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
        .filter(|m| *m > 0.0)
        .unwrap_or(DEFAULT_MAP_SIZE)
}

fn draw_robot(canvas: &Canvas, pose: &Pose, size: f32, fill: Color, edge: Color) {
    let x = canvas.screen_x(pose.x) as f32;
    let y = canvas.screen_y(pose.y) as f32;
    // screen y points down, so headings flip sign
    let th = -pose.theta as f32;
    let corner = |offset: f32| {
        Vec2::new(x + size * (th + offset).cos(), y + size * (th + offset).sin())
    };
    let nose = corner(0.0);
    draw_triangle(
        nose,
        corner(2.0 * std::f32::consts::PI / 3.0),
        corner(-2.0 * std::f32::consts::PI / 3.0),
        fill,
    );
    draw_line(x, y, nose.x, nose.y, 2.0, edge);
}

/// Draws the blackboard until the window is closed or Escape is pressed.
pub async fn run_visualization_loop(bb: Blackboard) {
    info!("Visualization loop starting");

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Visualization closed");
            break;
        }
        let state = snapshot(&bb);
        let side = screen_width().min(screen_height()) as f64;
        let canvas = Canvas::new(map_size(&state.walls), side);

        clear_background(LIGHTGRAY);

        for s in &state.walls {
            draw_line(
                canvas.screen_x(s.x1) as f32,
                canvas.screen_y(s.y1) as f32,
                canvas.screen_x(s.x2) as f32,
                canvas.screen_y(s.y2) as f32,
                3.0,
                BLACK,
            );
        }

        for w in &state.waypoints {
            draw_circle_lines(
                canvas.screen_x(w.x) as f32,
                canvas.screen_y(w.y) as f32,
                6.0,
                1.0,
                DARKGRAY,
            );
        }
        if let Some(target) = state.target {
            draw_circle(
                canvas.screen_x(target.x) as f32,
                canvas.screen_y(target.y) as f32,
                6.0,
                RED,
            );
        }

        let heaviest = state
            .particles
            .iter()
            .map(|p| p.weight)
            .fold(0.0_f64, f64::max);
        for p in &state.particles {
            let x = canvas.screen_x(p.x) as f32;
            let y = canvas.screen_y(p.y) as f32;
            let shade = if heaviest > 0.0 { (p.weight / heaviest) as f32 } else { 1.0 };
            let color = Color::new(0.0, 0.4, 0.0, 0.25 + 0.75 * shade);
            draw_circle(x, y, 2.0, color);
            draw_line(
                x,
                y,
                x + 6.0 * (p.theta as f32).cos(),
                y - 6.0 * (p.theta as f32).sin(),
                1.0,
                color,
            );
        }

        if let Some(truth) = state.truth {
            draw_robot(&canvas, &truth, 10.0, ORANGE, BROWN);
        }
        draw_robot(&canvas, &state.estimate, 12.0, BLUE, DARKBLUE);

        let e = state.estimate;
        draw_text(
            &format!("Estimate: x={:.1} y={:.1} th={:.2}", e.x, e.y, e.theta),
            10.0,
            20.0,
            STATUS_FONT,
            BLACK,
        );
        let phase = match (state.target, state.phase) {
            (Some(t), Some(p)) => format!("Target: x={:.1} y={:.1} [{}]", t.x, t.y, p),
            _ if state.finished => "Plan finished".to_string(),
            _ => "Waiting for the control loop".to_string(),
        };
        draw_text(&phase, 10.0, 40.0, STATUS_FONT, BLACK);
        for (i, fault) in state.faults.iter().enumerate() {
            draw_text(fault, 10.0, 60.0 + 20.0 * i as f32, STATUS_FONT, RED);
        }

        next_frame().await
    }
}
