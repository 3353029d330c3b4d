//! Biased random walk inside a geofence.
//!
//! One step moves a point in three stages, always in this order:
//!
//! 1. **Jitter**: per axis, `+step` with probability 1/4, otherwise `-step`
//!    (x is drawn before y).
//! 2. **Center-seek**: per axis, `-step` if the jittered value is above the
//!    fence center, otherwise `+step`.
//! 3. **Clamp**: each axis is pulled back inside the fence bounds.
//!
//! The combination drifts towards the center while staying noisy, and the
//! result is always inside the bounds.

use geomark_types::{Coordinates, Geofence};
use rand::Rng;

/// Default step size per axis, in coordinate units.
pub const DEFAULT_STEP: f64 = 0.0003;

/// Advance `position` by one walk step.
pub fn step<R: Rng + ?Sized>(
    position: Coordinates,
    fence: &Geofence,
    step: f64,
    rng: &mut R,
) -> Coordinates {
    let x = jitter(position.x(), step, rng);
    let y = jitter(position.y(), step, rng);

    let center = fence.center();
    let x = seek(x, center.x(), step);
    let y = seek(y, center.y(), step);

    fence.bounds().clamp(&Coordinates::new(x, y))
}

fn jitter<R: Rng + ?Sized>(value: f64, step: f64, rng: &mut R) -> f64 {
    if rng.random_range(0..4_u8) == 0 {
        value + step
    } else {
        value - step
    }
}

fn seek(value: f64, center: f64, step: f64) -> f64 {
    if value > center {
        value - step
    } else {
        value + step
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use geomark_types::Rect;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn fence() -> Geofence {
        Geofence::new(
            Rect::new(-1.0, -1.0, 1.0, 1.0).unwrap(),
            Coordinates::new(0.0, 0.0),
        )
        .unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn one_step_from_center_stays_close() {
        let fence = fence();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let next = step(Coordinates::new(0.0, 0.0), &fence, 0.1, &mut rng);
            assert!(fence.bounds().contains(&next));
            assert!(next.x().abs() <= 0.2 + 1e-12);
            assert!(next.y().abs() <= 0.2 + 1e-12);
        }
    }

    #[test]
    fn seek_cancels_jitter_at_the_center() {
        // Jitter leaves each axis at +0.1 or -0.1; the center-seek then
        // moves it back by 0.1 towards the center in both cases.
        let mut rng = StdRng::seed_from_u64(9);
        let next = step(Coordinates::new(0.0, 0.0), &fence(), 0.1, &mut rng);
        assert!(close(next.x(), 0.0));
        assert!(close(next.y(), 0.0));
    }

    #[test]
    fn never_leaves_the_fence() {
        let fence = fence();
        let mut rng = StdRng::seed_from_u64(42);
        let mut pos = Coordinates::new(1.0, -1.0);
        for _ in 0..10_000 {
            pos = step(pos, &fence, 0.3, &mut rng);
            assert!(fence.bounds().contains(&pos), "escaped to {pos:?}");
        }
    }

    #[test]
    fn corner_start_is_clamped() {
        // From the top-right corner, jitter and seek can only push further
        // out or back in; the clamp keeps the result on the boundary.
        let mut rng = StdRng::seed_from_u64(3);
        let next = step(Coordinates::new(1.0, 1.0), &fence(), 0.5, &mut rng);
        assert!(next.x() <= 1.0 && next.y() <= 1.0);
    }

    #[test]
    fn drifts_towards_the_center() {
        let fence = fence();
        let mut rng = StdRng::seed_from_u64(7);
        let mut pos = Coordinates::new(0.9, 0.9);
        for _ in 0..500 {
            pos = step(pos, &fence, 0.01, &mut rng);
        }
        assert!(pos.x().abs() < 0.5, "x did not drift: {}", pos.x());
        assert!(pos.y().abs() < 0.5, "y did not drift: {}", pos.y());
    }
}
