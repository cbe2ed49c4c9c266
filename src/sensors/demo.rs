use rand::Rng;

use crate::devices::models::Esp32Snapshot;

/// Water level range (inclusive, %) for generated readings.
pub const WATER_LEVEL_RANGE: (u8, u8) = (35, 85);
/// Chance that a generated reading reports motion.
pub const MOTION_PROBABILITY: f64 = 0.1;
/// Generated pump runs below this level.
pub const PUMP_ON_BELOW: f64 = 30.0;

/// A plausible esp32 reading for dashboards with no live board attached.
pub fn synthetic_esp32<R: Rng + ?Sized>(rng: &mut R, now_ms: i64) -> Esp32Snapshot {
    let water_level = f64::from(rng.random_range(WATER_LEVEL_RANGE.0..=WATER_LEVEL_RANGE.1));
    let motion = rng.random_bool(MOTION_PROBABILITY);

    Esp32Snapshot {
        water_level,
        motion: if motion { "1" } else { "0" }.to_owned(),
        pump_state: (water_level < PUMP_ON_BELOW) as u8,
        light_state: motion as u8,
        last_updated: now_ms,
    }
}

/// `true` when the snapshot is older than `stale_after_ms` at `now_ms`.
pub fn is_stale(last_updated: i64, now_ms: i64, stale_after_ms: i64) -> bool {
    now_ms.saturating_sub(last_updated) > stale_after_ms
}
