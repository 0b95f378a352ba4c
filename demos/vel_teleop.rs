// Keyboard teleop: W/S drive, A/D turn, R/F speed, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::info;

const SPEEDS: [f64; 3] = [0.1, 0.25, 0.5]; // m/s
const INPUT_TIMEOUT_MS: u64 = 100; // Reset velocities after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session
        .declare_publisher("diffdrive/cmd/wheel_vel_target")
        .await?;

    info!("Controls: W/S=drive, A/D=turn, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent per-side velocity state
    let mut left_vel = 0.0;
    let mut right_vel = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let speed = SPEEDS[speed_idx];

                match code {
                    // Movement - update velocities and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        left_vel = speed;
                        right_vel = speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        left_vel = -speed;
                        right_vel = -speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        left_vel = -speed;
                        right_vel = speed;
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        left_vel = speed;
                        right_vel = -speed;
                        last_movement_input = Instant::now();
                    }

                    // Speed selection
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(SPEEDS.len() - 1);
                        info!("Speed up: {} m/s", SPEEDS[speed_idx]);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        info!("Speed down: {} m/s", SPEEDS[speed_idx]);
                    }

                    KeyCode::Char('q') if pressed => {
                        info!("Quitting, sending stop");
                        publish_target(publisher, 0.0, 0.0).await?;
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }

        // Stop when no movement key has arrived recently
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            left_vel = 0.0;
            right_vel = 0.0;
        }

        publish_target(publisher, left_vel, right_vel).await?;
    }
}

async fn publish_target(
    publisher: &zenoh::pubsub::Publisher<'_>,
    left: f64,
    right: f64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let msg = json!({
        "left_wheel_velocity": left,
        "right_wheel_velocity": right,
    });
    publisher.put(msg.to_string()).await?;
    Ok(())
}
