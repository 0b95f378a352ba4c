// Prints the unwrapped encoder aggregate as it is published
use diffdrive_runtime::messages::UnwrappedEncoderPair;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let subscriber = session.declare_subscriber("diffdrive/state/wheel_enc").await?;

    info!("Listening on diffdrive/state/wheel_enc (Ctrl+C to quit)");

    while let Ok(sample) = subscriber.recv_async().await {
        let payload = sample.payload().to_bytes();
        match serde_json::from_slice::<UnwrappedEncoderPair>(&payload) {
            Ok(pair) => info!(
                "left_encoder={}, right_encoder={}",
                pair.left_encoder, pair.right_encoder
            ),
            Err(e) => warn!("Failed to parse encoder pair: {}", e),
        }
    }

    Ok(())
}
