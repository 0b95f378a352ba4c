// Velocity target scaling and backend command dispatch
//
// Open-loop only: targets are scaled into the actuator range and clamped,
// no feedback. The backend sink is picked once at startup.

use tracing::debug;
use zenoh::Wait;
use zenoh::pubsub::Publisher;

use crate::config::{
    LOWER_LIMIT, TOPIC_CMD_LEFT, TOPIC_CMD_RIGHT, TOPIC_SIM_CMD_LEFT, TOPIC_SIM_CMD_RIGHT,
    UPPER_LIMIT,
};
use crate::messages::{MotorCommandPair, VelocityTarget};

/// Map one side's velocity target into the actuator's native range.
///
/// `sign` is -1.0 for the left side and +1.0 for the right: the left
/// motors are mounted mirrored, so forward motion needs a negated command
/// there. Out-of-range values are clamped silently, not reported.
pub fn scale(velocity: f64, sign: f64, max_speed: f64, lower: f64, upper: f64) -> f64 {
    (sign * velocity / max_speed * upper).clamp(lower, upper)
}

/// Scale a full target into the command pair. `max_speed` was validated
/// non-zero at startup, so the division is safe here.
pub fn scale_target(target: &VelocityTarget, max_speed: f64) -> MotorCommandPair {
    MotorCommandPair {
        left: scale(
            target.left_wheel_velocity,
            -1.0,
            max_speed,
            LOWER_LIMIT,
            UPPER_LIMIT,
        ),
        right: scale(
            target.right_wheel_velocity,
            1.0,
            max_speed,
            LOWER_LIMIT,
            UPPER_LIMIT,
        ),
    }
}

/// Backend command sink, chosen once at startup and fixed for the process
/// lifetime. Dispatch is fire-and-forget: transport errors surface to the
/// caller for logging but are never retried or buffered.
pub trait CommandDispatch: Send + Sync {
    fn dispatch(&self, pair: &MotorCommandPair) -> zenoh::Result<()>;
}

/// Physical backend: two integer command endpoints, one per side.
pub struct PhysicalDispatcher {
    left: Publisher<'static>,
    right: Publisher<'static>,
}

impl PhysicalDispatcher {
    pub async fn declare(session: &zenoh::Session) -> zenoh::Result<Self> {
        Ok(Self {
            left: session.declare_publisher(TOPIC_CMD_LEFT).await?,
            right: session.declare_publisher(TOPIC_CMD_RIGHT).await?,
        })
    }
}

impl CommandDispatch for PhysicalDispatcher {
    fn dispatch(&self, pair: &MotorCommandPair) -> zenoh::Result<()> {
        debug!("Physical command: left={}, right={}", pair.left, pair.right);
        // The hardware controllers take integer commands.
        self.left.put(serde_json::to_string(&(pair.left as i32))?).wait()?;
        self.right
            .put(serde_json::to_string(&(pair.right as i32))?)
            .wait()?;
        Ok(())
    }
}

/// Simulated backend: each side's value is broadcast unchanged to that
/// side's three wheel velocity controllers (front, middle, rear).
pub struct SimulatedDispatcher {
    left: [Publisher<'static>; 3],
    right: [Publisher<'static>; 3],
}

impl SimulatedDispatcher {
    pub async fn declare(session: &zenoh::Session) -> zenoh::Result<Self> {
        Ok(Self {
            left: [
                session.declare_publisher(TOPIC_SIM_CMD_LEFT[0]).await?,
                session.declare_publisher(TOPIC_SIM_CMD_LEFT[1]).await?,
                session.declare_publisher(TOPIC_SIM_CMD_LEFT[2]).await?,
            ],
            right: [
                session.declare_publisher(TOPIC_SIM_CMD_RIGHT[0]).await?,
                session.declare_publisher(TOPIC_SIM_CMD_RIGHT[1]).await?,
                session.declare_publisher(TOPIC_SIM_CMD_RIGHT[2]).await?,
            ],
        })
    }
}

impl CommandDispatch for SimulatedDispatcher {
    fn dispatch(&self, pair: &MotorCommandPair) -> zenoh::Result<()> {
        debug!("Simulated command: left={}, right={}", pair.left, pair.right);
        let left = serde_json::to_string(&pair.left)?;
        let right = serde_json::to_string(&pair.right)?;
        for publisher in &self.left {
            publisher.put(left.clone()).wait()?;
        }
        for publisher in &self.right {
            publisher.put(right.clone()).wait()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_SPEED: f64 = 0.5;

    fn target(left: f64, right: f64) -> VelocityTarget {
        VelocityTarget {
            left_wheel_velocity: left,
            right_wheel_velocity: right,
        }
    }

    #[test]
    fn test_zero_target_zero_command() {
        let pair = scale_target(&target(0.0, 0.0), MAX_SPEED);
        assert_eq!(pair, MotorCommandPair::zero());
    }

    #[test]
    fn test_linear_scaling_below_limit() {
        // Half of max_speed maps to half of the command range.
        let pair = scale_target(&target(0.25, 0.25), MAX_SPEED);
        assert_eq!(pair.left, -50.0);
        assert_eq!(pair.right, 50.0);
    }

    #[test]
    fn test_sign_asymmetry() {
        // Equal magnitudes on both sides come out mirrored.
        let pair = scale_target(&target(0.1, 0.1), MAX_SPEED);
        assert_eq!(pair.left, -pair.right);
    }

    #[test]
    fn test_saturation_at_upper_limit() {
        // 1.0 m/s at max_speed 0.5 would be 200; clamps to the range.
        let pair = scale_target(&target(1.0, 1.0), MAX_SPEED);
        assert_eq!(pair.left, LOWER_LIMIT);
        assert_eq!(pair.right, UPPER_LIMIT);
    }

    #[test]
    fn test_saturation_at_lower_limit() {
        let pair = scale_target(&target(-3.0, -3.0), MAX_SPEED);
        assert_eq!(pair.left, UPPER_LIMIT);
        assert_eq!(pair.right, LOWER_LIMIT);
    }

    #[test]
    fn test_full_scale_exactly_at_limit() {
        // max_speed itself maps exactly onto the limit, no clamping needed.
        let pair = scale_target(&target(MAX_SPEED, MAX_SPEED), MAX_SPEED);
        assert_eq!(pair.left, -100.0);
        assert_eq!(pair.right, 100.0);
    }
}
