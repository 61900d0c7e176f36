//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (game layer; the solver itself is randomness-free)
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod broadphase;
pub mod geom;
pub mod paddle;
pub mod response;
pub mod solver;
pub mod spatial_hash;
pub mod state;
pub mod tick;

pub use broadphase::{Broadphase, CandidateSource, LinearScan};
pub use geom::Aabb;
pub use response::PaddleFeel;
pub use solver::{CcdConfig, Contact, SolverScratch, SolverStats, resolve_ball};
pub use spatial_hash::SpatialHash;
pub use state::{
    Ball, BallState, CollisionEvent, GamePhase, GameState, Obstacle, ObstacleKind, Paddle,
    SurfaceKind,
};
pub use tick::{FrameStats, TickInput, generate_level, split_balls, substeps_for, tick};
