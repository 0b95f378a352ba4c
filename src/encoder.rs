// Encoder wrap detection and unwrapping
//
// The wheel encoders report positions modulo [encoder_min, encoder_max).
// Each channel tracks how many times its counter has wrapped and offsets
// the raw reading back onto a continuous scale.

use std::sync::Mutex;

use crate::config::Config;
use crate::messages::UnwrappedEncoderPair;

/// Index of each physical wheel sensor in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wheel {
    LeftFront = 0,
    LeftRear = 1,
    RightFront = 2,
    RightRear = 3,
}

/// State for one wheel sensor. All fields start at zero and are only
/// mutated by that sensor's own sample stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderChannel {
    raw_value: f64,
    previous_raw_value: f64,
    wrap_multiplier: i64,
    unwrapped_value: f64,
}

impl EncoderChannel {
    /// Apply a new raw sample, detecting wrap-around at the range boundary.
    ///
    /// A drop from above the high threshold to below the low threshold is a
    /// forward wrap past `encoder_max`; the mirror jump is a backward wrap
    /// past `encoder_min`. Two or more full wraps within one sample
    /// interval are indistinguishable from none; that ambiguity is an
    /// accepted limitation of the threshold heuristic.
    pub fn apply_raw(&mut self, cur: f64, cfg: &Config) {
        let prev = self.previous_raw_value;
        if cur < cfg.low_wrap_threshold && prev > cfg.high_wrap_threshold {
            self.wrap_multiplier += 1;
        } else if cur > cfg.high_wrap_threshold && prev < cfg.low_wrap_threshold {
            self.wrap_multiplier -= 1;
        }
        self.raw_value = cur;
        self.unwrapped_value = cur + self.wrap_multiplier as f64 * cfg.encoder_range();
        self.previous_raw_value = cur;
    }

    /// Apply an already-continuous position. Used by the simulated backend,
    /// where joint-state positions never wrap and detection is bypassed.
    pub fn apply_unwrapped(&mut self, cur: f64) {
        self.raw_value = cur;
        self.previous_raw_value = cur;
        self.unwrapped_value = cur;
    }

    pub fn unwrapped(&self) -> f64 {
        self.unwrapped_value
    }

    pub fn wrap_multiplier(&self) -> i64 {
        self.wrap_multiplier
    }
}

/// The four wheel sensor channels.
///
/// Each channel sits behind its own lock: it has a single writer (its
/// sample callback) but the periodic publisher reads all four, and the
/// (raw, previous, multiplier) tuple must never be observed half-committed.
#[derive(Debug, Default)]
pub struct EncoderBank {
    channels: [Mutex<EncoderChannel>; 4],
}

impl EncoderBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw sample through wrap detection (physical backend).
    pub fn apply_raw(&self, wheel: Wheel, cur: f64, cfg: &Config) {
        self.channels[wheel as usize].lock().unwrap().apply_raw(cur, cfg);
    }

    /// Feed a simulated joint-state sample: the first four positions map to
    /// LF, LR, RF, RR in order and arrive already unwrapped.
    pub fn apply_joint_state(&self, positions: &[f64]) {
        for (channel, &pos) in self.channels.iter().zip(positions.iter().take(4)) {
            channel.lock().unwrap().apply_unwrapped(pos);
        }
    }

    /// Snapshot the aggregate published downstream: per-side mean of the
    /// two redundant sensors, truncated toward zero, left side sign-flipped
    /// by the wiring convention. Pure read; calling twice with no new
    /// samples in between yields the same pair.
    pub fn aggregate(&self) -> UnwrappedEncoderPair {
        let unwrapped: [f64; 4] = std::array::from_fn(|i| self.channels[i].lock().unwrap().unwrapped());

        // `as i32` truncates toward zero, matching downstream consumers
        // that expect the original int-cast behavior (not rounding).
        UnwrappedEncoderPair {
            left_encoder: -(((unwrapped[0] + unwrapped[1]) / 2.0) as i32),
            right_encoder: ((unwrapped[2] + unwrapped[3]) / 2.0) as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use clap::Parser;

    fn default_config() -> Config {
        Config::from_options(&Options::parse_from(["diffdrive-runtime"])).unwrap()
    }

    #[test]
    fn test_wrap_forward() {
        // Counter runs up past encoder_max and restarts near encoder_min.
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        ch.apply_raw(23000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 0);

        ch.apply_raw(-30000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 1);
        assert_eq!(ch.unwrapped(), -30000.0 + 65536.0); // 35536
    }

    #[test]
    fn test_wrap_backward() {
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        ch.apply_raw(-30000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 0);

        ch.apply_raw(23000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), -1);
        assert_eq!(ch.unwrapped(), 23000.0 - 65536.0);
    }

    #[test]
    fn test_no_wrap_within_threshold_band() {
        // Samples that stay between the thresholds never touch the
        // multiplier, however wildly they jump.
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        for &v in &[0.0, 13000.0, -13000.0, 5000.0, -5000.0, 12000.0] {
            ch.apply_raw(v, &cfg);
            assert_eq!(ch.wrap_multiplier(), 0);
            assert_eq!(ch.unwrapped(), v);
        }
    }

    #[test]
    fn test_small_oscillation_near_zero_does_not_trigger() {
        // A sign flip well inside the band is not a wrap.
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        ch.apply_raw(10000.0, &cfg);
        ch.apply_raw(-10000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 0);
    }

    #[test]
    fn test_consecutive_wraps_accumulate() {
        // Two forward wraps with the counter passing back through the
        // in-band region between them.
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        ch.apply_raw(23000.0, &cfg);
        ch.apply_raw(-30000.0, &cfg); // wrap 1
        ch.apply_raw(0.0, &cfg);
        ch.apply_raw(23000.0, &cfg);
        ch.apply_raw(-30000.0, &cfg); // wrap 2
        assert_eq!(ch.wrap_multiplier(), 2);
        assert_eq!(ch.unwrapped(), -30000.0 + 2.0 * 65536.0);
    }

    #[test]
    fn test_return_jump_reverses_wrap() {
        // A direct jump back across both thresholds is a backward wrap and
        // cancels the preceding forward one.
        let cfg = default_config();
        let mut ch = EncoderChannel::default();
        ch.apply_raw(23000.0, &cfg);
        ch.apply_raw(-30000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 1);

        ch.apply_raw(23000.0, &cfg);
        assert_eq!(ch.wrap_multiplier(), 0);
        assert_eq!(ch.unwrapped(), 23000.0);
    }

    #[test]
    fn test_unwrapped_path_bypasses_detection() {
        // Simulated joint-state positions take the no-detection path even
        // across a jump that would look like a wrap to the detector.
        let mut ch = EncoderChannel::default();
        ch.apply_unwrapped(23000.0);
        ch.apply_unwrapped(-30000.0);
        assert_eq!(ch.wrap_multiplier(), 0);
        assert_eq!(ch.unwrapped(), -30000.0);
    }

    #[test]
    fn test_aggregate_end_to_end() {
        // LF wraps forward once, every other channel sits at zero.
        let cfg = default_config();
        let bank = EncoderBank::new();
        bank.apply_raw(Wheel::LeftFront, 23000.0, &cfg);
        bank.apply_raw(Wheel::LeftFront, -30000.0, &cfg);

        let pair = bank.aggregate();
        assert_eq!(pair.left_encoder, -17768); // -(35536 + 0) / 2
        assert_eq!(pair.right_encoder, 0);
    }

    #[test]
    fn test_aggregate_idempotent_without_new_samples() {
        let cfg = default_config();
        let bank = EncoderBank::new();
        bank.apply_raw(Wheel::LeftFront, 100.0, &cfg);
        bank.apply_raw(Wheel::RightRear, -250.0, &cfg);

        let first = bank.aggregate();
        let second = bank.aggregate();
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_truncates_toward_zero() {
        let cfg = default_config();
        let bank = EncoderBank::new();
        // Per-side means of 3.5 and -3.5 must truncate, not round.
        bank.apply_raw(Wheel::LeftFront, 7.0, &cfg);
        bank.apply_raw(Wheel::RightFront, -7.0, &cfg);

        let pair = bank.aggregate();
        assert_eq!(pair.left_encoder, -3);
        assert_eq!(pair.right_encoder, -3);
    }

    #[test]
    fn test_joint_state_extra_positions_ignored() {
        // Six-element joint state: only the first four feed the bank.
        let bank = EncoderBank::new();
        bank.apply_joint_state(&[10.0, 20.0, 30.0, 40.0, 999.0, 999.0]);

        let pair = bank.aggregate();
        assert_eq!(pair.left_encoder, -15); // -(10 + 20) / 2
        assert_eq!(pair.right_encoder, 35);
    }
}
