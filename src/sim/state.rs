//! Game state and core simulation types
//!
//! All state that must be persisted for Continue/determinism lives here.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geom::Aabb;
use super::solver::SolverScratch;
use super::spatial_hash::SpatialHash;
use crate::consts::*;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ball attached to paddle, waiting for launch input
    Serve,
    /// Active gameplay
    Playing,
    /// Run ended
    GameOver,
}

/// Obstacle category. Bricks are static and live in the spatial hash;
/// bosses and enemies move every tick and are scanned linearly by the
/// broadphase instead of being reindexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Brick,
    Boss,
    Enemy,
}

/// A rectangular obstacle: brick, boss hitbox or enemy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub aabb: Aabb,
    pub hp: u8,
    /// Hidden obstacles are ignored by the solver and must already be
    /// removed from the spatial hash
    pub visible: bool,
    /// Indestructible obstacles reflect even fireballs and never lose hp
    pub indestructible: bool,
}

impl Obstacle {
    pub fn brick(id: u32, aabb: Aabb, hp: u8) -> Self {
        Self {
            id,
            kind: ObstacleKind::Brick,
            aabb,
            hp,
            visible: true,
            indestructible: false,
        }
    }

    pub fn boss(id: u32, aabb: Aabb, hp: u8) -> Self {
        Self {
            id,
            kind: ObstacleKind::Boss,
            aabb,
            hp,
            visible: true,
            indestructible: false,
        }
    }

    /// True when a fireball should pass through instead of reflecting
    pub fn passable_by_fireball(&self) -> bool {
        self.kind == ObstacleKind::Brick && !self.indestructible
    }
}

/// Ball state - attached to paddle or free-moving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallState {
    /// Ball rides the paddle at a horizontal offset, waiting for launch
    Attached { offset_px: i32 },
    /// Ball is free-moving
    Free,
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub state: BallState,
    /// Fireball mode (passes through destructible bricks without reflecting)
    #[serde(default)]
    pub fireball: bool,
    /// Monotonic tick before which paddle collisions are ignored
    /// (prevents sticking to the paddle across consecutive substeps)
    #[serde(default)]
    pub paddle_cooldown_until: u64,
}

impl Ball {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: BALL_RADIUS,
            state: BallState::Attached { offset_px: 0 },
            fireball: false,
            paddle_cooldown_until: 0,
        }
    }

    /// Update attached ball position based on paddle
    pub fn update_attached(&mut self, paddle: &Paddle) {
        if let BallState::Attached { offset_px } = self.state {
            self.pos = Vec2::new(
                paddle.center_x() + offset_px as f32,
                paddle.pos.y - self.radius - 2.0,
            );
        }
    }

    /// Launch the ball from attached state, `angle` measured from straight
    /// up (negative tilts left)
    pub fn launch(&mut self, speed: f32, angle: f32) {
        if matches!(self.state, BallState::Attached { .. }) {
            self.vel = Vec2::new(angle.sin(), -angle.cos()) * speed;
            self.state = BallState::Free;
        }
    }
}

/// The player's paddle: an axis-aligned rectangle with rounded corners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub id: u32,
    /// Top-left corner
    pub pos: Vec2,
    pub width: f32,
    pub height: f32,
    pub corner_radius: f32,
    /// Horizontal velocity, kept for future spin transfer
    pub vel: Vec2,
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            id: 0,
            pos: Vec2::new(CANVAS_WIDTH / 2.0 - PADDLE_WIDTH / 2.0, PADDLE_Y),
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            corner_radius: PADDLE_CORNER_RADIUS,
            vel: Vec2::ZERO,
        }
    }
}

impl Paddle {
    #[inline]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_rect(self.pos.x, self.pos.y, self.width, self.height)
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.pos.x + self.width / 2.0
    }

    /// Move toward a target center x at bounded speed, clamped to bounds
    pub fn move_toward(&mut self, target_x: f32, dt: f32, max_speed: f32, bounds: &Aabb) {
        let current = self.center_x();
        let delta = (target_x - current).clamp(-max_speed * dt, max_speed * dt);
        self.pos.x = (self.pos.x + delta).clamp(bounds.min.x, bounds.max.x - self.width);
        self.vel = if dt > 0.0 {
            Vec2::new(delta / dt, 0.0)
        } else {
            Vec2::ZERO
        };
    }
}

/// What kind of surface a collision event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Canvas bound (left, right or top plane)
    Wall,
    /// Obstacle face
    Brick,
    /// Paddle flat top (launch-angle response)
    PaddleTop,
    /// Paddle rounded corner
    PaddleCorner,
    /// Obstacle corner (rounded by the ball radius)
    Corner,
}

/// One resolved collision within a solver call. Produced by the solver,
/// consumed once by the game-rule layer; never mutated.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CollisionEvent {
    /// Time fraction within the substep, cumulative across TOI iterations
    pub t: f32,
    pub surface: SurfaceKind,
    /// Identity of what was struck: obstacle id for brick/corner hits,
    /// paddle id for paddle hits, none for walls
    pub obstacle_id: Option<u32>,
    /// Contact point on the surface
    pub point: Vec2,
    /// Unit normal at the contact, pointing toward the ball
    pub normal: Vec2,
    /// Ball velocity immediately before any reflection was applied
    /// (callers need this for sound/analytics)
    pub incoming_vel: Vec2,
}

/// RNG state wrapper for serialization. Draws re-seed a Pcg32 from the
/// run seed plus a draw counter, so a deserialized state continues the
/// exact sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub draws: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    pub fn next_f32(&mut self) -> f32 {
        let mut rng = Pcg32::new(self.seed, self.draws);
        self.draws = self.draws.wrapping_add(1);
        rng.random::<f32>()
    }
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// RNG state (game layer only; the solver is randomness-free)
    pub rng: RngState,
    /// Simulation tick counter
    pub tick: u64,
    pub phase: GamePhase,
    pub lives: u8,
    pub score: u64,
    pub combo: u32,
    /// Play field; bottom edge is open (ball loss)
    pub bounds: Aabb,
    pub paddle: Paddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// All obstacles, sorted by id; destroyed ones are marked invisible
    pub obstacles: Vec<Obstacle>,
    /// Broadphase index over visible bricks. Rebuilt after deserialize.
    #[serde(skip, default = "default_grid")]
    pub grid: SpatialHash,
    /// Reusable solver buffers; transient, not part of the save
    #[serde(skip)]
    pub scratch: SolverScratch,
    /// Next entity ID
    next_id: u32,
}

fn default_grid() -> SpatialHash {
    SpatialHash::new(
        Aabb::from_rect(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT),
        SPATIAL_CELL_SIZE,
    )
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64) -> Self {
        let bounds = Aabb::from_rect(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut state = Self {
            seed,
            rng: RngState::new(seed),
            tick: 0,
            phase: GamePhase::Serve,
            lives: 3,
            score: 0,
            combo: 0,
            bounds,
            paddle: Paddle::default(),
            balls: Vec::new(),
            obstacles: Vec::new(),
            grid: SpatialHash::new(bounds, SPATIAL_CELL_SIZE),
            scratch: SolverScratch::default(),
            next_id: 1,
        };
        state.spawn_ball_attached();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a ball attached to the paddle
    pub fn spawn_ball_attached(&mut self) {
        let id = self.next_entity_id();
        let mut ball = Ball::new(id);
        ball.update_attached(&self.paddle);
        self.balls.push(ball);
    }

    /// Add an obstacle, indexing bricks into the spatial hash.
    /// Ids are allocated in increasing order, keeping `obstacles` sorted
    /// for the by-id binary search.
    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        if obstacle.kind == ObstacleKind::Brick {
            self.grid.insert(obstacle.id, &obstacle.aabb);
        }
        self.obstacles.push(obstacle);
    }

    /// Rebuild the spatial hash from visible bricks (after deserialize)
    pub fn rebuild_grid(&mut self) {
        self.grid = SpatialHash::new(self.bounds, SPATIAL_CELL_SIZE);
        for ob in &self.obstacles {
            if ob.kind == ObstacleKind::Brick && ob.visible {
                self.grid.insert(ob.id, &ob.aabb);
            }
        }
    }

    /// Smallest dimension among visible obstacles, used by the substep
    /// policy and the solver's travel clamp
    pub fn min_obstacle_dimension(&self) -> f32 {
        self.obstacles
            .iter()
            .filter(|o| o.visible)
            .map(|o| o.aabb.min_dimension())
            .fold(f32::INFINITY, f32::min)
            .max(MIN_OBSTACLE_DIM_FLOOR)
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.obstacles.sort_by_key(|o| o.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_replays_after_roundtrip() {
        let mut a = RngState::new(42);
        let first = a.next_f32();
        let snapshot = a.clone();
        let second = a.next_f32();

        let mut restored = snapshot;
        assert_eq!(restored.next_f32(), second);
        assert_ne!(first, second);
    }

    #[test]
    fn test_attached_ball_follows_paddle() {
        let mut state = GameState::new(1);
        state.paddle.pos.x = 200.0;
        for ball in &mut state.balls {
            ball.update_attached(&state.paddle);
        }
        let ball = &state.balls[0];
        assert_eq!(ball.pos.x, state.paddle.center_x());
        assert!(ball.pos.y < state.paddle.pos.y);
    }

    #[test]
    fn test_launch_straight_up() {
        let mut ball = Ball::new(1);
        ball.launch(300.0, 0.0);
        assert_eq!(ball.state, BallState::Free);
        assert!(ball.vel.x.abs() < 1e-4);
        assert!((ball.vel.y + 300.0).abs() < 1e-4);
    }

    #[test]
    fn test_min_obstacle_dimension_has_floor() {
        let state = GameState::new(1);
        // No obstacles at all: the clamp floor applies
        assert_eq!(state.min_obstacle_dimension(), MIN_OBSTACLE_DIM_FLOOR);
    }

    #[test]
    fn test_grid_rebuild_skips_hidden_bricks() {
        let mut state = GameState::new(1);
        let id_a = state.next_entity_id();
        let id_b = state.next_entity_id();
        state.add_obstacle(Obstacle::brick(id_a, Aabb::from_rect(0.0, 0.0, 58.0, 20.0), 1));
        state.add_obstacle(Obstacle::brick(id_b, Aabb::from_rect(100.0, 0.0, 58.0, 20.0), 1));
        state.obstacles[0].visible = false;
        state.rebuild_grid();
        assert!(!state.grid.contains(id_a));
        assert!(state.grid.contains(id_b));
    }
}
