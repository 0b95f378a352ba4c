// Topics, command limits, and startup configuration

use clap::Parser;
use thiserror::Error;

// Actuator native command range
pub const UPPER_LIMIT: f64 = 100.0;
pub const LOWER_LIMIT: f64 = -100.0;

// Zenoh topics
pub const TOPIC_VEL_TARGET: &str = "diffdrive/cmd/wheel_vel_target"; // inbound targets
pub const TOPIC_WHEEL_ENC: &str = "diffdrive/state/wheel_enc"; // outbound unwrapped pair

// Physical backend: one raw position stream per wheel sensor,
// two integer command endpoints
pub const TOPIC_ENC_LF: &str = "diffdrive/enc/left_front/position";
pub const TOPIC_ENC_LR: &str = "diffdrive/enc/left_rear/position";
pub const TOPIC_ENC_RF: &str = "diffdrive/enc/right_front/position";
pub const TOPIC_ENC_RR: &str = "diffdrive/enc/right_rear/position";
pub const TOPIC_CMD_LEFT: &str = "diffdrive/cmd/motor_left";
pub const TOPIC_CMD_RIGHT: &str = "diffdrive/cmd/motor_right";

// Simulated backend: one joint-state stream in, six wheel velocity
// controllers out (three per side)
pub const TOPIC_JOINT_STATES: &str = "sim/joint_states";
pub const TOPIC_SIM_CMD_LEFT: [&str; 3] = [
    "sim/left_front_wheel_velocity_controller/command",
    "sim/left_middle_wheel_velocity_controller/command",
    "sim/left_rear_wheel_velocity_controller/command",
];
pub const TOPIC_SIM_CMD_RIGHT: [&str; 3] = [
    "sim/right_front_wheel_velocity_controller/command",
    "sim/right_middle_wheel_velocity_controller/command",
    "sim/right_rear_wheel_velocity_controller/command",
];

/// Command-line options, read once at startup. No hot reload.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "diffdrive-runtime",
    about = "Differential-drive motor velocity controller"
)]
pub struct Options {
    /// Encoder aggregate publish rate in Hz
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate: u64,

    /// Wheel speed in m/s that maps to full-scale command
    #[arg(long, default_value_t = 0.5)]
    pub max_speed: f64,

    /// Lower bound of the raw encoder range
    #[arg(long, default_value_t = -32768.0, allow_hyphen_values = true)]
    pub encoder_min: f64,

    /// Upper bound of the raw encoder range
    #[arg(long, default_value_t = 32768.0)]
    pub encoder_max: f64,

    /// Drive the simulated backend instead of the physical motor endpoints
    #[arg(long)]
    pub simulation: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate must be non-zero")]
    InvalidRate,

    #[error("max_speed must be non-zero")]
    InvalidMaxSpeed,

    #[error("empty encoder range: min {min} >= max {max}")]
    InvalidEncoderRange { min: f64, max: f64 },
}

/// Actuator backend, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Simulated,
    Physical,
}

/// Validated configuration. Immutable after startup; the wrap thresholds
/// are derived here once, never recomputed per-sample.
#[derive(Debug, Clone)]
pub struct Config {
    pub rate_hz: u64,
    pub max_speed: f64,
    pub encoder_min: f64,
    pub encoder_max: f64,
    pub low_wrap_threshold: f64,
    pub high_wrap_threshold: f64,
    pub backend_mode: BackendMode,
}

impl Config {
    /// Validate options and derive the wrap thresholds.
    ///
    /// Fails fast on `max_speed == 0` (the scaler divides by it) and on an
    /// empty encoder range, so neither is ever checked per-sample.
    pub fn from_options(opts: &Options) -> Result<Self, ConfigError> {
        // The clap parser already rejects --rate 0, but the run loop's
        // timer period divides by the rate, so the check lives here too.
        if opts.rate == 0 {
            return Err(ConfigError::InvalidRate);
        }
        if opts.max_speed == 0.0 {
            return Err(ConfigError::InvalidMaxSpeed);
        }
        if opts.encoder_min >= opts.encoder_max {
            return Err(ConfigError::InvalidEncoderRange {
                min: opts.encoder_min,
                max: opts.encoder_max,
            });
        }

        // Thresholds at 30%/70% of the range rather than the exact
        // boundaries, so sensor jitter near the wrap point doesn't
        // false-trigger.
        let range = opts.encoder_max - opts.encoder_min;
        Ok(Self {
            rate_hz: opts.rate,
            max_speed: opts.max_speed,
            encoder_min: opts.encoder_min,
            encoder_max: opts.encoder_max,
            low_wrap_threshold: range * 0.3 + opts.encoder_min,
            high_wrap_threshold: range * 0.7 + opts.encoder_min,
            backend_mode: if opts.simulation {
                BackendMode::Simulated
            } else {
                BackendMode::Physical
            },
        })
    }

    /// Full span of the raw encoder counter, added once per wrap.
    pub fn encoder_range(&self) -> f64 {
        self.encoder_max - self.encoder_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(args: &[&str]) -> Options {
        Options::parse_from(std::iter::once("diffdrive-runtime").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_thresholds() {
        let cfg = Config::from_options(&opts(&[])).unwrap();
        assert_eq!(cfg.rate_hz, 50);
        assert_eq!(cfg.encoder_range(), 65536.0);
        // Compare against the same f64 expressions the derivation uses; the
        // high threshold is not exactly representable as a decimal literal.
        assert_eq!(cfg.low_wrap_threshold, 65536.0 * 0.3 - 32768.0);
        assert_eq!(cfg.high_wrap_threshold, 65536.0 * 0.7 - 32768.0);
        assert!(cfg.low_wrap_threshold < cfg.high_wrap_threshold);
        assert_eq!(cfg.backend_mode, BackendMode::Physical);
    }

    #[test]
    fn test_zero_rate_rejected() {
        // Bypasses the clap-level range check to hit the validation itself.
        let mut o = opts(&[]);
        o.rate = 0;
        let err = Config::from_options(&o).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRate));
    }

    #[test]
    fn test_zero_max_speed_rejected() {
        let err = Config::from_options(&opts(&["--max-speed", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMaxSpeed));
    }

    #[test]
    fn test_empty_encoder_range_rejected() {
        let err = Config::from_options(&opts(&["--encoder-min", "100", "--encoder-max", "100"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEncoderRange { .. }));
    }

    #[test]
    fn test_simulation_flag_selects_backend() {
        let cfg = Config::from_options(&opts(&["--simulation"])).unwrap();
        assert_eq!(cfg.backend_mode, BackendMode::Simulated);
    }
}
