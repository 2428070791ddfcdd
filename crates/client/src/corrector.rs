//! Adaptive blend/snap corrector shared by every reconciled entity.

/// Above this positional error the corrector gives up on smoothing and
/// snaps to the target outright.
pub const SNAP_THRESHOLD: f64 = 100.0;

const BLEND_BASE: f64 = 0.15;
const BLEND_PER_PX: f64 = 0.005;
const BLEND_MAX: f64 = 0.5;

/// Move `current` toward `target` given the overall positional error of
/// the entity being corrected. The gain rises with error magnitude so
/// large drift resolves visibly fast while small jitter stays smooth;
/// past [`SNAP_THRESHOLD`] the result is `target` verbatim.
///
/// `error` is the entity's full Euclidean error, not the per-axis
/// delta, so both axes of one entity blend with the same gain.
pub fn correct(current: f64, target: f64, error: f64) -> f64 {
    if error > SNAP_THRESHOLD {
        return target;
    }
    let blend = (BLEND_BASE + error * BLEND_PER_PX).min(BLEND_MAX);
    current + (target - current) * blend
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_above_threshold() {
        assert_eq!(correct(0.0, 250.0, 250.0), 250.0);
        assert_eq!(correct(13.0, -500.0, 100.1), -500.0);
    }

    #[test]
    fn test_threshold_itself_still_blends() {
        let out = correct(0.0, 100.0, 100.0);
        // blend = min(0.15 + 0.5, 0.5) = 0.5
        assert_eq!(out, 50.0);
    }

    #[test]
    fn test_blend_strictly_between_endpoints() {
        for error in [16.0, 20.0, 35.0, 50.0] {
            let out = correct(100.0, 100.0 + error, error);
            assert!(out > 100.0 && out < 100.0 + error, "error {error}: {out}");
            let expected = 100.0 + error * (0.15 + 0.005 * error).min(0.5);
            assert!((out - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_error_twenty_blends_quarter() {
        // 0.15 + 20 * 0.005 = 0.25
        assert_eq!(correct(100.0, 120.0, 20.0), 105.0);
    }

    #[test]
    fn test_zero_error_is_identity() {
        assert_eq!(correct(42.0, 42.0, 0.0), 42.0);
    }
}
