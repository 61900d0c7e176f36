//! Brick Rush - a brick-breaker arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (CCD physics, collisions, game state)
//!
//! The simulation is built around a continuous collision detection solver
//! that sweeps each ball through a frame's worth of motion against walls,
//! bricks and the paddle without tunneling, using adaptive substepping and
//! time-of-impact iteration. Rendering, audio and UI are external consumers
//! of the solver's collision events and are not part of this crate.

pub mod sim;

pub use sim::{Ball, CcdConfig, CollisionEvent, GameState, Obstacle, Paddle, SurfaceKind};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Per-substep travel cap as a fraction of the smallest obstacle dimension
    pub const SUBSTEP_TRAVEL_FRACTION: f32 = 0.5;
    /// Floor for the minimum-obstacle-dimension clamp, so a degenerate
    /// obstacle cannot stall the ball entirely
    pub const MIN_OBSTACLE_DIM_FLOOR: f32 = 4.0;
    /// TOI iterations per substep; bounds chained hits (corner then wall)
    pub const MAX_TOI_ITERATIONS: u32 = 3;
    /// Base post-hit separation distance in pixels
    pub const SEPARATION_EPSILON: f32 = 0.05;

    /// Canvas dimensions
    pub const CANVAS_WIDTH: f32 = 640.0;
    pub const CANVAS_HEIGHT: f32 = 480.0;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 100.0;
    pub const PADDLE_HEIGHT: f32 = 15.0;
    pub const PADDLE_Y: f32 = 440.0;
    pub const PADDLE_CORNER_RADIUS: f32 = 6.0;
    pub const PADDLE_SPEED: f32 = 800.0;
    /// Cooldown ticks after a paddle hit (prevents sticking)
    pub const PADDLE_COOLDOWN_TICKS: u64 = 8;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 6.0;
    pub const BALL_START_SPEED: f32 = 300.0;
    pub const BALL_MIN_SPEED: f32 = 150.0;
    pub const BALL_MAX_SPEED: f32 = 900.0;

    /// Launch-angle mapping for paddle-top hits: maximum angle from
    /// straight up, and the power-curve exponent applied to the
    /// normalized impact offset
    pub const MAX_LAUNCH_ANGLE: f32 = 75.0 * std::f32::consts::PI / 180.0;
    pub const LAUNCH_CURVE_EXPONENT: f32 = 1.0;

    /// Emergency paddle rescue thresholds (tuned, not derived)
    pub const RESCUE_PENETRATION_THRESHOLD: f32 = 2.0;
    pub const RESCUE_MIN_UPWARD_SPEED: f32 = 120.0;
    /// Safety margin added on top of penetration depth when pushing the
    /// ball off the paddle
    pub const PADDLE_PUSH_MARGIN: f32 = 1.0;

    /// Brick defaults
    pub const BRICK_WIDTH: f32 = 58.0;
    pub const BRICK_HEIGHT: f32 = 20.0;
    pub const BRICK_PADDING: f32 = 4.0;
    pub const BRICK_TOP_OFFSET: f32 = 40.0;
    pub const BRICK_LEFT_OFFSET: f32 = 27.0;

    /// Broadphase grid cell size, roughly twice the brick width
    pub const SPATIAL_CELL_SIZE: f32 = BRICK_WIDTH * 2.0;
}
