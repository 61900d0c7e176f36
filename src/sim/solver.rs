//! Continuous collision detection solver
//!
//! Advances one ball through a frame's worth of motion against walls,
//! bricks, bosses and the paddle without tunneling. The frame dt is split
//! into substeps; each substep runs a bounded time-of-impact loop that
//! finds the earliest hit among all candidate surfaces, resolves position
//! and velocity, and repeats on the remaining time fraction. Obstacle
//! mutation (brick damage, scoring) is the caller's job, applied from the
//! returned events in a separate pass after every ball has been resolved.

use std::time::Instant;

use glam::Vec2;

use super::broadphase::{CandidateSource, obstacle_by_id};
use super::geom::{self, Aabb};
use super::paddle;
use super::response::{self, PaddleFeel};
use super::state::{Ball, CollisionEvent, Obstacle, Paddle, SurfaceKind};
use crate::consts::*;

/// Per-call solver parameters
#[derive(Debug, Clone)]
pub struct CcdConfig {
    /// Whole-frame timestep in seconds
    pub dt: f32,
    /// Substeps the frame is split into, externally computed from ball
    /// speed vs obstacle size (>= 1)
    pub substeps: u32,
    /// TOI iterations per substep
    pub max_toi_iterations: u32,
    /// Base separation distance pushed along the normal after a hit
    pub epsilon: f32,
    /// Smallest obstacle dimension; caps per-substep travel even when the
    /// caller under-provisions substeps
    pub min_obstacle_dim: f32,
    /// Play field. Left/right/top planes are solid walls; the bottom edge
    /// is open and ball loss is a game-rule decision, not the solver's.
    pub bounds: Aabb,
    /// Monotonic tick for cooldown bookkeeping
    pub tick: u64,
}

impl Default for CcdConfig {
    fn default() -> Self {
        Self {
            dt: SIM_DT,
            substeps: 1,
            max_toi_iterations: MAX_TOI_ITERATIONS,
            epsilon: SEPARATION_EPSILON,
            min_obstacle_dim: BRICK_HEIGHT,
            bounds: Aabb::from_rect(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
            tick: 0,
        }
    }
}

/// A candidate hit inside the TOI loop
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Fraction of the current motion segment at first contact
    pub t: f32,
    /// Contact point on the surface
    pub point: Vec2,
    pub normal: Vec2,
    pub surface: SurfaceKind,
    pub obstacle_id: Option<u32>,
}

/// Per-call counters for debug overlays. Observation only; nothing here
/// feeds back into solver behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverStats {
    pub substeps: u32,
    pub toi_iterations: u32,
    pub collisions: u32,
    pub elapsed_us: u64,
}

impl SolverStats {
    pub fn accumulate(&mut self, other: &SolverStats) {
        self.substeps += other.substeps;
        self.toi_iterations += other.toi_iterations;
        self.collisions += other.collisions;
        self.elapsed_us += other.elapsed_us;
    }
}

/// Caller-owned scratch buffers, passed into every call so the solver
/// keeps no hidden cross-call mutable state
#[derive(Debug, Clone, Default)]
pub struct SolverScratch {
    candidates: Vec<u32>,
    /// Obstacles a fireball already passed through this substep
    ignored: Vec<u32>,
}

fn earliest(best: Option<Contact>, candidate: Contact) -> Option<Contact> {
    match best {
        Some(b) if b.t <= candidate.t => Some(b),
        _ => Some(candidate),
    }
}

/// Validate a contact normal: fall back to the contact-to-center
/// direction when it is near zero, and to straight up when that is
/// degenerate too
fn sanitize_normal(normal: Vec2, contact: Vec2, ball_center: Vec2) -> Vec2 {
    if normal.length_squared() > 1e-6 {
        return normal.normalize();
    }
    let alt = (ball_center - contact).normalize_or_zero();
    if alt.length_squared() > 0.5 { alt } else { Vec2::NEG_Y }
}

/// Per-axis plane test against the canvas bounds. The bottom edge is
/// deliberately absent.
fn sweep_walls(start: Vec2, end: Vec2, radius: f32, bounds: &Aabb) -> Option<Contact> {
    let d = end - start;
    let mut best: Option<Contact> = None;

    if d.x < 0.0 && end.x - radius < bounds.min.x {
        let t = ((bounds.min.x + radius) - start.x) / d.x;
        if t <= 1.0 {
            let at = start + d * t.max(0.0);
            best = earliest(
                best,
                Contact {
                    t: t.max(0.0),
                    point: Vec2::new(bounds.min.x, at.y),
                    normal: Vec2::X,
                    surface: SurfaceKind::Wall,
                    obstacle_id: None,
                },
            );
        }
    }
    if d.x > 0.0 && end.x + radius > bounds.max.x {
        let t = ((bounds.max.x - radius) - start.x) / d.x;
        if t <= 1.0 {
            let at = start + d * t.max(0.0);
            best = earliest(
                best,
                Contact {
                    t: t.max(0.0),
                    point: Vec2::new(bounds.max.x, at.y),
                    normal: Vec2::NEG_X,
                    surface: SurfaceKind::Wall,
                    obstacle_id: None,
                },
            );
        }
    }
    if d.y < 0.0 && end.y - radius < bounds.min.y {
        let t = ((bounds.min.y + radius) - start.y) / d.y;
        if t <= 1.0 {
            let at = start + d * t.max(0.0);
            best = earliest(
                best,
                Contact {
                    t: t.max(0.0),
                    point: Vec2::new(at.x, bounds.min.y),
                    normal: Vec2::Y,
                    surface: SurfaceKind::Wall,
                    obstacle_id: None,
                },
            );
        }
    }

    best
}

/// Swept test against one obstacle: expanded-AABB slab test first, then
/// the four corner circles for grazes the slab test misses
fn sweep_obstacle(start: Vec2, end: Vec2, radius: f32, ob: &Obstacle) -> Option<Contact> {
    if let Some(hit) = geom::sweep_circle_vs_aabb(start, end, &ob.aabb, radius) {
        let at = start + (end - start) * hit.t;
        return Some(Contact {
            t: hit.t,
            point: at - hit.normal * radius,
            normal: hit.normal,
            surface: SurfaceKind::Brick,
            obstacle_id: Some(ob.id),
        });
    }

    let mut best: Option<(f32, Vec2)> = None;
    for corner in ob.aabb.corners() {
        if let Some(t) = geom::sweep_point_vs_circle(start, end, corner, radius)
            && best.is_none_or(|(bt, _)| t < bt)
        {
            best = Some((t, corner));
        }
    }
    best.map(|(t, corner)| {
        let at = start + (end - start) * t;
        let mut normal = (at - corner).normalize_or_zero();
        if normal.length_squared() < 0.5 {
            normal = Vec2::NEG_Y;
        }
        Contact {
            t,
            point: corner,
            normal,
            surface: SurfaceKind::Corner,
            obstacle_id: Some(ob.id),
        }
    })
}

/// Resolve one ball through one frame of motion.
///
/// Appends every resolved collision to `events` in resolution order; the
/// event's `t` is the cumulative time fraction within its substep. The
/// ball is mutated in place (position, velocity, cooldown). Obstacles and
/// paddle are read-only: all game-rule side effects happen in the
/// caller's post-pass.
#[allow(clippy::too_many_arguments)]
pub fn resolve_ball<S: CandidateSource>(
    ball: &mut Ball,
    paddle_ref: &Paddle,
    feel: &PaddleFeel,
    source: &S,
    obstacles: &[Obstacle],
    cfg: &CcdConfig,
    scratch: &mut SolverScratch,
    events: &mut Vec<CollisionEvent>,
) -> SolverStats {
    let started = Instant::now();
    let mut stats = SolverStats::default();

    let substeps = cfg.substeps.max(1);
    let sub_dt = cfg.dt / substeps as f32;
    let max_travel = cfg.min_obstacle_dim.max(MIN_OBSTACLE_DIM_FLOOR) * SUBSTEP_TRAVEL_FRACTION;

    for _ in 0..substeps {
        stats.substeps += 1;
        scratch.ignored.clear();
        let prev_pos = ball.pos;
        let mut remaining = 1.0_f32;
        let mut consumed = 0.0_f32;

        for _ in 0..cfg.max_toi_iterations.max(1) {
            // Desired motion for what is left of the slice, velocity
            // re-read each iteration so reflections steer the remainder
            let mut step = ball.vel * sub_dt;
            let step_len = step.length();
            if step_len > max_travel {
                step *= max_travel / step_len;
            }
            let seg = step * remaining;
            if seg.length_squared() < 1e-10 {
                break;
            }
            let target = ball.pos + seg;
            stats.toi_iterations += 1;

            let mut best = sweep_walls(ball.pos, target, ball.radius, &cfg.bounds);

            if cfg.tick >= ball.paddle_cooldown_until
                && let Some(c) = paddle::swept_hit(ball.pos, target, ball.radius, paddle_ref)
            {
                best = earliest(best, c);
            }

            let swept = Aabb::swept_circle(ball.pos, target, ball.radius);
            source.candidates_into(&swept, &mut scratch.candidates);
            for &id in &scratch.candidates {
                if scratch.ignored.contains(&id) {
                    continue;
                }
                let Some(ob) = obstacle_by_id(obstacles, id) else {
                    continue;
                };
                if !ob.visible {
                    continue;
                }
                if let Some(c) = sweep_obstacle(ball.pos, target, ball.radius, ob) {
                    best = earliest(best, c);
                }
            }

            let Some(hit) = best else {
                // Free flight: commit the whole remainder
                ball.pos = target;
                break;
            };

            let travel = seg.length() * hit.t;
            ball.pos += seg * hit.t;
            let normal = sanitize_normal(hit.normal, hit.point, ball.pos);
            let incoming = ball.vel;
            let obstacle = hit.obstacle_id.and_then(|id| obstacle_by_id(obstacles, id));
            let outgoing = response::outgoing_velocity(
                hit.surface,
                ball.vel,
                ball.fireball,
                normal,
                hit.point,
                obstacle,
                paddle_ref,
                feel,
            );

            events.push(CollisionEvent {
                t: consumed + remaining * hit.t,
                surface: hit.surface,
                obstacle_id: hit.obstacle_id,
                point: hit.point,
                normal,
                incoming_vel: incoming,
            });
            stats.collisions += 1;

            match outgoing {
                None => {
                    // Fireball pass-through: no reflection, no separation
                    // push; skip this obstacle for the rest of the substep
                    // so the TOI budget isn't spent rediscovering it
                    if let Some(id) = hit.obstacle_id {
                        scratch.ignored.push(id);
                    }
                }
                Some(v) => {
                    ball.vel = v;
                    // Proportional push-out prevents an immediate
                    // re-collision with the surface just left
                    let sep = cfg.epsilon + ball.radius * 0.02 + travel * 0.001;
                    ball.pos += normal * sep;
                    if matches!(
                        hit.surface,
                        SurfaceKind::PaddleTop | SurfaceKind::PaddleCorner
                    ) {
                        ball.paddle_cooldown_until = cfg.tick + PADDLE_COOLDOWN_TICKS;
                    }
                }
            }

            consumed += remaining * hit.t;
            remaining *= 1.0 - hit.t;
            if remaining <= 1e-4 {
                break;
            }
        }

        // Discrete fallback: anything that ended the substep overlapping
        // the paddle (capped TOI budget, spawn overlap) gets corrected
        // here, including the emergency rescue
        if cfg.tick >= ball.paddle_cooldown_until
            && let Some(event) =
                paddle::resolve_discrete(ball, prev_pos, paddle_ref, feel, cfg.tick)
        {
            events.push(event);
            stats.collisions += 1;
        }
    }

    stats.elapsed_us = started.elapsed().as_micros() as u64;
    stats
}
