// Runtime wiring: subscriber callbacks feed the two pipelines, a
// fixed-rate tick publishes the aggregate encoder pair.
//
// The command pipeline (target -> scale -> dispatch) and the encoder
// pipeline (raw sample -> unwrap -> periodic aggregate) share nothing but
// the configuration; neither waits on the other.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::command::{self, CommandDispatch, PhysicalDispatcher, SimulatedDispatcher};
use crate::config::{
    BackendMode, Config, TOPIC_ENC_LF, TOPIC_ENC_LR, TOPIC_ENC_RF, TOPIC_ENC_RR,
    TOPIC_JOINT_STATES, TOPIC_VEL_TARGET, TOPIC_WHEEL_ENC,
};
use crate::encoder::{EncoderBank, Wheel};
use crate::messages::{JointState, MotorCommandPair, VelocityTarget};

pub async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    // Backend strategy, picked once and never re-branched per call.
    let dispatcher: Arc<dyn CommandDispatch> = match cfg.backend_mode {
        BackendMode::Simulated => Arc::new(SimulatedDispatcher::declare(&session).await?),
        BackendMode::Physical => Arc::new(PhysicalDispatcher::declare(&session).await?),
    };

    // Command pipeline: stateless, one command pair per inbound target.
    let max_speed = cfg.max_speed;
    let cmd_dispatcher = dispatcher.clone();
    let _vel_sub = session
        .declare_subscriber(TOPIC_VEL_TARGET)
        .callback(move |sample| {
            match serde_json::from_slice::<VelocityTarget>(&sample.payload().to_bytes()) {
                Ok(target) => {
                    let pair = command::scale_target(&target, max_speed);
                    if let Err(e) = cmd_dispatcher.dispatch(&pair) {
                        warn!("Failed to dispatch motor command: {}", e);
                    }
                }
                Err(e) => warn!("Failed to parse velocity target: {}", e),
            }
        })
        .await?;

    // Encoder pipeline: one writer callback per inbound stream, the tick
    // loop below is the only reader.
    let bank = Arc::new(EncoderBank::new());
    let mut enc_subs = Vec::new();
    match cfg.backend_mode {
        BackendMode::Simulated => {
            // Joint-state positions are already continuous; this path never
            // runs wrap detection.
            let bank = bank.clone();
            let sub = session
                .declare_subscriber(TOPIC_JOINT_STATES)
                .callback(move |sample| {
                    match serde_json::from_slice::<JointState>(&sample.payload().to_bytes()) {
                        Ok(js) => bank.apply_joint_state(&js.position),
                        Err(e) => warn!("Failed to parse joint state: {}", e),
                    }
                })
                .await?;
            enc_subs.push(sub);
        }
        BackendMode::Physical => {
            let streams = [
                (TOPIC_ENC_LF, Wheel::LeftFront),
                (TOPIC_ENC_LR, Wheel::LeftRear),
                (TOPIC_ENC_RF, Wheel::RightFront),
                (TOPIC_ENC_RR, Wheel::RightRear),
            ];
            for (topic, wheel) in streams {
                let bank = bank.clone();
                let cfg = cfg.clone();
                let sub = session
                    .declare_subscriber(topic)
                    .callback(move |sample| {
                        match serde_json::from_slice::<f64>(&sample.payload().to_bytes()) {
                            Ok(pos) => bank.apply_raw(wheel, pos, &cfg),
                            Err(e) => warn!("Failed to parse {} sample: {}", topic, e),
                        }
                    })
                    .await?;
                enc_subs.push(sub);
            }
        }
    }

    let pub_enc = session.declare_publisher(TOPIC_WHEEL_ENC).await?;

    // The aggregate goes out on a real timer at the configured rate,
    // whether or not new samples arrived since the last tick.
    let mut tick = interval(Duration::from_secs_f64(1.0 / cfg.rate_hz as f64));

    info!(
        "Runtime started: {}Hz encoder publish, {:?} backend",
        cfg.rate_hz, cfg.backend_mode
    );
    info!("Subscribed to: {}", TOPIC_VEL_TARGET);
    info!("Publishing to: {}", TOPIC_WHEEL_ENC);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let pair = bank.aggregate();
                pub_enc.put(serde_json::to_string(&pair)?).await?;
            }
            _ = &mut shutdown => {
                // Safety shutoff: best-effort zero command, no retry.
                info!("Shutdown signal received, stopping motors");
                if let Err(e) = dispatcher.dispatch(&MotorCommandPair::zero()) {
                    warn!("Failed to publish zero command on shutdown: {}", e);
                }
                return Ok(());
            }
        }
    }
}
