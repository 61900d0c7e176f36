//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. Each tick
//! resolves every ball through the CCD solver against read-only obstacle
//! state, then applies all game-rule side effects (brick damage, scoring,
//! ball loss) from the returned events in a single post-pass. Deferring the
//! mutation keeps one ball's resolution from altering geometry another ball
//! is mid-sweep against.

use glam::Vec2;

use super::broadphase::Broadphase;
use super::geom::Aabb;
use super::response::PaddleFeel;
use super::solver::{self, CcdConfig};
use super::state::{
    Ball, BallState, CollisionEvent, GamePhase, GameState, Obstacle, ObstacleKind,
};
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Target paddle center x (from mouse/touch position)
    pub target_x: Option<f32>,
    /// Launch ball (click/tap/space)
    pub launch: bool,
}

/// Aggregated per-frame solver counters, read by debug overlays only
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub balls: u32,
    pub substeps: u32,
    pub toi_iterations: u32,
    pub collisions: u32,
    pub elapsed_us: u64,
}

/// Substeps needed so per-substep travel stays under half the smallest
/// obstacle dimension, capped to avoid the spiral of death
pub fn substeps_for(speed: f32, dt: f32, min_obstacle_dim: f32) -> u32 {
    let max_step = (min_obstacle_dim * SUBSTEP_TRAVEL_FRACTION).max(1.0);
    ((speed * dt / max_step).ceil() as u32).clamp(1, MAX_SUBSTEPS)
}

/// Lay out a brick field for testing and the headless soak run: a
/// `rows` x `cols` grid below the top wall, top row armored
pub fn generate_level(state: &mut GameState, rows: usize, cols: usize) {
    for row in 0..rows {
        for col in 0..cols {
            let x = BRICK_LEFT_OFFSET + col as f32 * (BRICK_WIDTH + BRICK_PADDING);
            let y = BRICK_TOP_OFFSET + row as f32 * (BRICK_HEIGHT + BRICK_PADDING);
            let hp = if row == 0 { 2 } else { 1 };
            let id = state.next_entity_id();
            state.add_obstacle(Obstacle::brick(
                id,
                Aabb::from_rect(x, y, BRICK_WIDTH, BRICK_HEIGHT),
                hp,
            ));
        }
    }
}

/// Split the first free ball into three (multiball effect)
pub fn split_balls(state: &mut GameState) {
    let Some(src) = state
        .balls
        .iter()
        .find(|b| b.state == BallState::Free)
        .cloned()
    else {
        return;
    };
    for rot in [0.5_f32, -0.5] {
        let (sin, cos) = rot.sin_cos();
        let vel = Vec2::new(
            src.vel.x * cos - src.vel.y * sin,
            src.vel.x * sin + src.vel.y * cos,
        );
        let id = state.next_entity_id();
        state.balls.push(Ball {
            id,
            pos: src.pos,
            vel,
            radius: src.radius,
            state: BallState::Free,
            fireball: src.fireball,
            paddle_cooldown_until: src.paddle_cooldown_until,
        });
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) -> FrameStats {
    let mut frame = FrameStats::default();

    if state.phase == GamePhase::GameOver {
        return frame;
    }

    state.tick += 1;

    if let Some(target) = input.target_x {
        let bounds = state.bounds;
        state.paddle.move_toward(target, dt, PADDLE_SPEED, &bounds);
    }

    match state.phase {
        GamePhase::Serve => {
            for ball in &mut state.balls {
                ball.update_attached(&state.paddle);
            }
            if input.launch {
                // Small serve jitter so replays of different seeds diverge
                let jitter = (state.rng.next_f32() - 0.5) * 0.2;
                for ball in &mut state.balls {
                    ball.launch(BALL_START_SPEED, jitter);
                }
                state.phase = GamePhase::Playing;
            }
        }

        GamePhase::Playing => {
            // Clamp speeds before solving; effects can slow but not stop
            for ball in &mut state.balls {
                if ball.state != BallState::Free {
                    continue;
                }
                let speed = ball.vel.length();
                if speed > 0.0 && speed < BALL_MIN_SPEED {
                    ball.vel = ball.vel / speed * BALL_MIN_SPEED;
                } else if speed > BALL_MAX_SPEED {
                    ball.vel = ball.vel / speed * BALL_MAX_SPEED;
                }
            }

            let min_dim = state.min_obstacle_dimension();
            let tick_now = state.tick;
            let feel = PaddleFeel::default();

            // Events are collected per ball (the fireball flag travels
            // with them) and applied in one pass afterwards
            let mut pending: Vec<(CollisionEvent, bool)> = Vec::new();
            let mut ball_events: Vec<CollisionEvent> = Vec::new();

            {
                let bounds = state.bounds;
                let paddle = &state.paddle;
                let obstacles = &state.obstacles;
                let grid = &state.grid;
                let scratch = &mut state.scratch;
                let source = Broadphase { grid, obstacles };

                for ball in &mut state.balls {
                    if ball.state != BallState::Free {
                        continue;
                    }
                    let cfg = CcdConfig {
                        dt,
                        substeps: substeps_for(ball.vel.length(), dt, min_dim),
                        min_obstacle_dim: min_dim,
                        bounds,
                        tick: tick_now,
                        ..CcdConfig::default()
                    };
                    ball_events.clear();
                    let stats = solver::resolve_ball(
                        ball,
                        paddle,
                        &feel,
                        &source,
                        obstacles,
                        &cfg,
                        scratch,
                        &mut ball_events,
                    );
                    frame.balls += 1;
                    frame.substeps += stats.substeps;
                    frame.toi_iterations += stats.toi_iterations;
                    frame.collisions += stats.collisions;
                    frame.elapsed_us += stats.elapsed_us;

                    let fireball = ball.fireball;
                    pending.extend(ball_events.drain(..).map(|e| (e, fireball)));
                }
            }

            apply_events(state, &pending);
            handle_ball_loss(state);
        }

        GamePhase::GameOver => {}
    }

    frame
}

/// Apply brick damage and scoring from the frame's collision events
fn apply_events(state: &mut GameState, events: &[(CollisionEvent, bool)]) {
    for (event, fireball) in events {
        let Some(id) = event.obstacle_id else {
            continue;
        };
        let Ok(idx) = state.obstacles.binary_search_by_key(&id, |o| o.id) else {
            continue;
        };
        let ob = &mut state.obstacles[idx];
        if !ob.visible || ob.indestructible {
            continue;
        }

        // A fireball pass-through consumes the brick outright
        if *fireball && ob.passable_by_fireball() {
            ob.hp = 0;
        } else {
            ob.hp = ob.hp.saturating_sub(1);
        }

        if ob.hp == 0 {
            ob.visible = false;
            let kind = ob.kind;
            if kind == ObstacleKind::Brick {
                state.grid.remove(id);
            }
            let base: u64 = match kind {
                ObstacleKind::Brick => 10,
                ObstacleKind::Enemy => 15,
                ObstacleKind::Boss => 50,
            };
            // Combo multiplier: +10% per consecutive hit, capped at 3x
            let multiplier = if state.combo > 0 {
                (1.0 + state.combo as f32 * 0.1).min(3.0)
            } else {
                1.0
            };
            state.score += (base as f32 * multiplier) as u64;
            state.combo += 1;
        }
    }
}

/// Remove balls that fell past the open bottom edge; losing the last one
/// costs a life and re-serves
fn handle_ball_loss(state: &mut GameState) {
    let bottom = state.bounds.max.y;
    let before = state.balls.len();
    state
        .balls
        .retain(|b| !(b.state == BallState::Free && b.pos.y - b.radius > bottom));

    if state.balls.len() < before {
        state.combo = 0;
    }

    if state.balls.is_empty() {
        state.lives = state.lives.saturating_sub(1);
        if state.lives == 0 {
            log::info!("Game over at tick {} with score {}", state.tick, state.score);
            state.phase = GamePhase::GameOver;
        } else {
            log::info!("Ball lost, {} lives remain", state.lives);
            state.spawn_ball_attached();
            state.phase = GamePhase::Serve;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch_input() -> TickInput {
        TickInput {
            launch: true,
            ..TickInput::default()
        }
    }

    #[test]
    fn test_substep_policy_scales_with_speed() {
        // 3000 px/s over 1/60 s is 50 px of travel; half a 20 px brick
        // allows 10 px per substep
        assert_eq!(substeps_for(3000.0, 1.0 / 60.0, 20.0), 5);
        assert_eq!(substeps_for(100.0, 1.0 / 60.0, 20.0), 1);
        // Capped
        assert_eq!(substeps_for(100000.0, 1.0 / 60.0, 20.0), MAX_SUBSTEPS);
    }

    #[test]
    fn test_serve_launch_starts_play() {
        let mut state = GameState::new(3);
        tick(&mut state, &launch_input(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        let ball = &state.balls[0];
        assert_eq!(ball.state, BallState::Free);
        assert!((ball.vel.length() - BALL_START_SPEED).abs() < 1e-2);
        assert!(ball.vel.y < 0.0);
    }

    #[test]
    fn test_brick_destroyed_and_scored() {
        let mut state = GameState::new(1);
        let id = state.next_entity_id();
        state.add_obstacle(Obstacle::brick(
            id,
            Aabb::from_rect(90.0, 110.0, 20.0, 20.0),
            1,
        ));
        state.phase = GamePhase::Playing;
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.pos = Vec2::new(100.0, 102.0);
        ball.vel = Vec2::new(0.0, 300.0);

        let frame = tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(frame.collisions, 1);
        let brick = &state.obstacles[0];
        assert!(!brick.visible);
        assert!(!state.grid.contains(id));
        assert_eq!(state.score, 10);
        assert_eq!(state.combo, 1);
        // The ball bounced rather than vanished
        assert!(state.balls[0].vel.y < 0.0);
    }

    #[test]
    fn test_armored_brick_survives_one_hit() {
        let mut state = GameState::new(1);
        let id = state.next_entity_id();
        state.add_obstacle(Obstacle::brick(
            id,
            Aabb::from_rect(90.0, 110.0, 20.0, 20.0),
            2,
        ));
        state.phase = GamePhase::Playing;
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.pos = Vec2::new(100.0, 102.0);
        ball.vel = Vec2::new(0.0, 300.0);

        tick(&mut state, &TickInput::default(), SIM_DT);

        let brick = &state.obstacles[0];
        assert!(brick.visible);
        assert_eq!(brick.hp, 1);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_indestructible_brick_ignores_damage() {
        let mut state = GameState::new(1);
        let id = state.next_entity_id();
        let mut brick = Obstacle::brick(id, Aabb::from_rect(90.0, 110.0, 20.0, 20.0), 1);
        brick.indestructible = true;
        state.add_obstacle(brick);
        state.phase = GamePhase::Playing;
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.pos = Vec2::new(100.0, 102.0);
        ball.vel = Vec2::new(0.0, 300.0);

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert!(state.obstacles[0].visible);
        assert_eq!(state.obstacles[0].hp, 1);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_ball_loss_costs_a_life_and_reserves() {
        let mut state = GameState::new(1);
        state.phase = GamePhase::Playing;
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.pos = Vec2::new(100.0, 520.0);
        ball.vel = Vec2::new(0.0, 200.0);

        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.lives, 2);
        assert_eq!(state.phase, GamePhase::Serve);
        assert_eq!(state.balls.len(), 1);
        assert!(matches!(state.balls[0].state, BallState::Attached { .. }));
    }

    #[test]
    fn test_last_life_ends_the_game() {
        let mut state = GameState::new(1);
        state.lives = 1;
        state.phase = GamePhase::Playing;
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.pos = Vec2::new(100.0, 520.0);
        ball.vel = Vec2::new(0.0, 200.0);

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::GameOver);

        // Further ticks are no-ops
        let snapshot = state.tick;
        tick(&mut state, &launch_input(), SIM_DT);
        assert_eq!(state.tick, snapshot);
    }

    #[test]
    fn test_split_balls_triples_the_first_free_ball() {
        let mut state = GameState::new(1);
        let ball = &mut state.balls[0];
        ball.state = BallState::Free;
        ball.vel = Vec2::new(0.0, -300.0);
        split_balls(&mut state);

        assert_eq!(state.balls.len(), 3);
        for ball in &state.balls {
            assert!((ball.vel.length() - 300.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_deterministic_replay() {
        let run = |seed: u64| -> String {
            let mut state = GameState::new(seed);
            generate_level(&mut state, 3, 10);
            for i in 0..240 {
                let input = TickInput {
                    target_x: Some(320.0 + (i as f32 * 0.7).sin() * 200.0),
                    launch: i == 3,
                };
                tick(&mut state, &input, SIM_DT);
            }
            serde_json::to_string(&state).expect("state serializes")
        };

        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }
}
