//! Brick Rush entry point
//!
//! Headless soak run: builds a brick field, plays it with a simple
//! ball-tracking controller and logs per-second solver stats. Exercises
//! the CCD core end to end without a renderer attached.

use brick_rush::consts::*;
use brick_rush::sim::{BallState, FrameStats, GamePhase, GameState, TickInput, generate_level, tick};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0xB81C);
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(30);

    log::info!("Brick Rush soak run: seed {seed}, {seconds}s at 120 Hz");

    let mut state = GameState::new(seed);
    generate_level(&mut state, 6, 10);
    let bricks_at_start = state.obstacles.len();

    let mut second_acc = FrameStats::default();

    for i in 0..seconds * 120 {
        // Track the lowest free ball, like a patient human would
        let target_x = state
            .balls
            .iter()
            .filter(|b| b.state == BallState::Free)
            .max_by(|a, b| {
                a.pos
                    .y
                    .partial_cmp(&b.pos.y)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|b| b.pos.x)
            .unwrap_or(CANVAS_WIDTH / 2.0);

        let input = TickInput {
            target_x: Some(target_x),
            launch: state.phase == GamePhase::Serve,
        };
        let frame = tick(&mut state, &input, SIM_DT);

        second_acc.balls += frame.balls;
        second_acc.substeps += frame.substeps;
        second_acc.toi_iterations += frame.toi_iterations;
        second_acc.collisions += frame.collisions;
        second_acc.elapsed_us += frame.elapsed_us;

        if i % 120 == 119 {
            let remaining = state.obstacles.iter().filter(|o| o.visible).count();
            log::info!(
                "t={:>3}s score={:<6} lives={} bricks={:>2}/{} collisions={:>3} substeps={:>4} solver={}us",
                (i + 1) / 120,
                state.score,
                state.lives,
                remaining,
                bricks_at_start,
                second_acc.collisions,
                second_acc.substeps,
                second_acc.elapsed_us,
            );
            second_acc = FrameStats::default();
        }

        if state.phase == GamePhase::GameOver {
            break;
        }
        if state.obstacles.iter().all(|o| !o.visible) {
            log::info!("Level cleared at tick {}", state.tick);
            break;
        }
    }

    log::info!(
        "Finished: score {}, lives {}, tick {}",
        state.score,
        state.lives,
        state.tick
    );

    // Optional snapshot for offline inspection
    if std::env::var_os("BRICK_RUSH_DUMP").is_some() {
        match serde_json::to_string(&state) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Snapshot failed: {e}"),
        }
    }
}
