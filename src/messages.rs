// Message types crossing the pub/sub boundary

use serde::{Deserialize, Serialize};

// Wheel velocity targets from the upstream planner -> runtime, in m/s.
// Ephemeral: consumed into a command pair on arrival, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocityTarget {
    pub left_wheel_velocity: f64,
    pub right_wheel_velocity: f64,
}

// Saturated per-side commands in the actuator's native range. Both sides
// are always emitted together, one pair per inbound target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorCommandPair {
    pub left: f64,
    pub right: f64,
}

impl MotorCommandPair {
    /// Safety shutoff value, published on shutdown.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Continuous per-side encoder counts, published at the loop rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnwrappedEncoderPair {
    pub left_encoder: i32,
    pub right_encoder: i32,
}

/// Joint-state sample from the simulator. Positions arrive already
/// unwrapped; only the first four entries (the wheel joints) are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointState {
    pub position: Vec<f64>,
}
