//! Velocity response policies, keyed by surface kind
//!
//! The TOI loop stays generic; everything that makes the game *feel* a
//! particular way lives here. Walls and bricks use mirror reflection. The
//! paddle flat top deliberately does not: the impact offset from the paddle
//! center is remapped to a launch angle so the player gets deterministic
//! directional control, and the incoming direction is discarded entirely.

use glam::Vec2;

use super::state::{Obstacle, Paddle, SurfaceKind};
use crate::consts::{LAUNCH_CURVE_EXPONENT, MAX_LAUNCH_ANGLE};

/// Paddle-top launch tuning
#[derive(Debug, Clone, Copy)]
pub struct PaddleFeel {
    /// Maximum launch angle from straight up, radians
    pub max_launch_angle: f32,
    /// Power-curve exponent applied to the normalized impact offset
    pub curve_exponent: f32,
}

impl Default for PaddleFeel {
    fn default() -> Self {
        Self {
            max_launch_angle: MAX_LAUNCH_ANGLE,
            curve_exponent: LAUNCH_CURVE_EXPONENT,
        }
    }
}

/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Reflect only when actually moving into the surface
#[inline]
fn reflect_into(vel: Vec2, normal: Vec2) -> Vec2 {
    if vel.dot(normal) < 0.0 {
        reflect_velocity(vel, normal)
    } else {
        vel
    }
}

/// Map a paddle-top impact to an outgoing velocity. The horizontal offset
/// from the paddle center is normalized to [-1, 1], shaped by the power
/// curve, and mapped to an angle within `max_launch_angle` of straight up.
/// Speed is preserved exactly; the incoming direction is ignored.
pub fn launch_velocity(speed: f32, impact_x: f32, paddle: &Paddle, feel: &PaddleFeel) -> Vec2 {
    let half_width = (paddle.width * 0.5).max(f32::EPSILON);
    let offset = ((impact_x - paddle.center_x()) / half_width).clamp(-1.0, 1.0);
    let shaped = offset.signum() * offset.abs().powf(feel.curve_exponent);
    let angle = shaped * feel.max_launch_angle;
    Vec2::new(angle.sin(), -angle.cos()) * speed
}

/// Outgoing velocity for a resolved contact, or `None` when the ball
/// passes through (fireball vs destructible brick).
pub fn outgoing_velocity(
    surface: SurfaceKind,
    vel: Vec2,
    fireball: bool,
    normal: Vec2,
    contact: Vec2,
    obstacle: Option<&Obstacle>,
    paddle: &Paddle,
    feel: &PaddleFeel,
) -> Option<Vec2> {
    match surface {
        SurfaceKind::Wall => Some(reflect_into(vel, normal)),
        SurfaceKind::Brick | SurfaceKind::Corner => {
            if fireball && obstacle.is_some_and(Obstacle::passable_by_fireball) {
                None
            } else {
                Some(reflect_into(vel, normal))
            }
        }
        SurfaceKind::PaddleCorner => {
            let mut out = reflect_into(vel, normal);
            // A top-corner or side graze must never leave the ball moving
            // downward, even when raw reflection math would. Underside
            // contacts (normal pointing down) keep the mirror result.
            if normal.y <= 0.0 && out.y > 0.0 {
                out.y = -out.y;
            }
            Some(out)
        }
        SurfaceKind::PaddleTop => Some(launch_velocity(vel.length(), contact.x, paddle, feel)),
    }
}
