//! Paddle collision: rounded-rectangle geometry and the rescue rule
//!
//! The paddle is an axis-aligned rectangle with four rounded corners. The
//! solver sweeps against it twice per surface class: corner circles first
//! (they take priority, so edge-adjacent hits resolve to the curved surface
//! rather than the rectangle), then the flat AABB. The discrete resolver
//! below is the safety net for balls that end a substep overlapping the
//! paddle anyway, including the emergency rescue rule.

use glam::Vec2;

use super::geom::{self, Aabb};
use super::response::{self, PaddleFeel};
use super::solver::Contact;
use super::state::{Ball, CollisionEvent, Paddle, SurfaceKind};
use crate::consts::*;

/// Centers of the four corner circles, inset by the corner radius
fn corner_centers(paddle: &Paddle) -> [Vec2; 4] {
    let r = paddle.corner_radius;
    let a = paddle.aabb();
    [
        Vec2::new(a.min.x + r, a.min.y + r),
        Vec2::new(a.max.x - r, a.min.y + r),
        Vec2::new(a.max.x - r, a.max.y - r),
        Vec2::new(a.min.x + r, a.max.y - r),
    ]
}

/// Swept test against the paddle for a ball moving `start` -> `end`.
///
/// AABB face hits whose normal points up are the flat top (launcher
/// response); any other face is classified as a corner hit so the upward
/// clamp applies and a paddle hit can never send the ball downward.
pub fn swept_hit(start: Vec2, end: Vec2, radius: f32, paddle: &Paddle) -> Option<Contact> {
    // Corner circles first
    let mut best: Option<(f32, Vec2)> = None;
    for center in corner_centers(paddle) {
        if let Some(t) =
            geom::sweep_point_vs_circle(start, end, center, paddle.corner_radius + radius)
            && best.is_none_or(|(bt, _)| t < bt)
        {
            best = Some((t, center));
        }
    }
    if let Some((t, center)) = best {
        let at = start + (end - start) * t;
        let mut normal = (at - center).normalize_or_zero();
        if normal.length_squared() < 0.5 {
            normal = Vec2::NEG_Y;
        }
        return Some(Contact {
            t,
            point: center + normal * paddle.corner_radius,
            normal,
            surface: SurfaceKind::PaddleCorner,
            obstacle_id: Some(paddle.id),
        });
    }

    let aabb = paddle.aabb();
    geom::sweep_circle_vs_aabb(start, end, &aabb, radius).map(|hit| {
        let at = start + (end - start) * hit.t;
        let surface = if hit.normal.y < -0.5 {
            SurfaceKind::PaddleTop
        } else {
            SurfaceKind::PaddleCorner
        };
        Contact {
            t: hit.t,
            point: at - hit.normal * radius,
            normal: hit.normal,
            surface,
            obstacle_id: Some(paddle.id),
        }
    })
}

/// Closest point on the rounded-rect composite shape to `p`.
///
/// The shape decomposes into a "cross" of edge strips and four corner
/// circle regions. Returns the closest boundary point, whether it lies on
/// a corner circle, and whether `p` is inside the shape.
pub fn closest_point(paddle: &Paddle, p: Vec2) -> (Vec2, bool, bool) {
    let a = paddle.aabb();
    let r = paddle.corner_radius;
    let inner_min = a.min + Vec2::splat(r);
    let inner_max = a.max - Vec2::splat(r);

    let in_x_strip = p.x >= inner_min.x && p.x <= inner_max.x;
    let in_y_strip = p.y >= inner_min.y && p.y <= inner_max.y;

    if in_x_strip || in_y_strip {
        // Cross region: nearest point on the rectangle boundary
        if a.contains(p) {
            // Inside: project to the nearest face
            let d_left = p.x - a.min.x;
            let d_right = a.max.x - p.x;
            let d_top = p.y - a.min.y;
            let d_bottom = a.max.y - p.y;
            let min_d = d_left.min(d_right).min(d_top).min(d_bottom);
            let closest = if min_d == d_top {
                Vec2::new(p.x, a.min.y)
            } else if min_d == d_bottom {
                Vec2::new(p.x, a.max.y)
            } else if min_d == d_left {
                Vec2::new(a.min.x, p.y)
            } else {
                Vec2::new(a.max.x, p.y)
            };
            (closest, false, true)
        } else {
            let closest = Vec2::new(
                p.x.clamp(a.min.x, a.max.x),
                p.y.clamp(a.min.y, a.max.y),
            );
            (closest, false, false)
        }
    } else {
        // Corner region: governed by the nearest corner circle
        let cx = if p.x < inner_min.x { inner_min.x } else { inner_max.x };
        let cy = if p.y < inner_min.y { inner_min.y } else { inner_max.y };
        let center = Vec2::new(cx, cy);
        let delta = p - center;
        let dist = delta.length();
        let dir = if dist > 1e-6 { delta / dist } else { Vec2::NEG_Y };
        (center + dir * r, true, dist < r)
    }
}

/// A discrete overlap against the paddle shape
#[derive(Debug, Clone, Copy)]
pub struct Overlap {
    pub closest: Vec2,
    pub normal: Vec2,
    pub penetration: f32,
    pub surface: SurfaceKind,
}

/// Overlap test for a ball resting at `center`. Collision triggers when
/// the distance from the ball center to the composite shape is less than
/// the ball radius.
pub fn resolve_overlap(paddle: &Paddle, center: Vec2, radius: f32) -> Option<Overlap> {
    let (closest, corner, inside) = closest_point(paddle, center);
    let delta = center - closest;
    let dist = delta.length();

    let (normal, penetration) = if inside {
        // Center swallowed by the paddle: push out through the nearest
        // boundary point, carrying the full radius past it
        let n = if dist > 1e-6 { -delta / dist } else { Vec2::NEG_Y };
        (n, radius + dist)
    } else {
        if dist >= radius {
            return None;
        }
        let n = if dist > 1e-6 { delta / dist } else { Vec2::NEG_Y };
        (n, radius - dist)
    };

    let surface = if corner {
        SurfaceKind::PaddleCorner
    } else if normal.y < -0.5 {
        SurfaceKind::PaddleTop
    } else {
        SurfaceKind::PaddleCorner
    };

    Some(Overlap {
        closest,
        normal,
        penetration,
        surface,
    })
}

/// Discrete paddle resolution for a ball that ended a substep overlapping
/// the paddle. Corrects position, applies the surface response, then the
/// emergency rescue rule: when the ball center is horizontally within the
/// paddle span and penetration exceeds a small threshold, force the ball
/// fully above the paddle with a minimum upward speed. The rescue is gated
/// on the normal already pointing up or the previous-frame position being
/// above the paddle, so balls that legitimately approached from below are
/// left alone.
pub fn resolve_discrete(
    ball: &mut Ball,
    prev_pos: Vec2,
    paddle: &Paddle,
    feel: &PaddleFeel,
    tick: u64,
) -> Option<CollisionEvent> {
    let overlap = resolve_overlap(paddle, ball.pos, ball.radius)?;
    let incoming = ball.vel;

    ball.pos += overlap.normal * (overlap.penetration + PADDLE_PUSH_MARGIN);
    if let Some(out) = response::outgoing_velocity(
        overlap.surface,
        ball.vel,
        ball.fireball,
        overlap.normal,
        overlap.closest,
        None,
        paddle,
        feel,
    ) {
        ball.vel = out;
    }

    let span = paddle.aabb();
    let above_before = prev_pos.y < paddle.pos.y;
    if ball.pos.x >= span.min.x
        && ball.pos.x <= span.max.x
        && overlap.penetration > RESCUE_PENETRATION_THRESHOLD
        && (overlap.normal.y < 0.0 || above_before)
    {
        ball.pos.y = paddle.pos.y - ball.radius - PADDLE_PUSH_MARGIN;
        ball.vel.y = ball.vel.y.min(-RESCUE_MIN_UPWARD_SPEED);
    }

    ball.paddle_cooldown_until = tick + PADDLE_COOLDOWN_TICKS;

    Some(CollisionEvent {
        t: 1.0,
        surface: overlap.surface,
        obstacle_id: Some(paddle.id),
        point: overlap.closest,
        normal: overlap.normal,
        incoming_vel: incoming,
    })
}
