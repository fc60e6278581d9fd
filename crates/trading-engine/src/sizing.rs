//! Capital and session sizing multipliers.

use governance_core::types::{Direction, Session};

/// Survivorship-score steps for the capital multiplier.
/// (exclusive upper bound, multiplier); scores above the last bound get
/// [`TOP_SURVIVORSHIP_MULTIPLIER`].
const SURVIVORSHIP_STEPS: [(f64, f64); 3] = [(25.0, 0.0), (40.0, 0.5), (60.0, 0.75)];
/// Inclusive upper bound of the neutral band.
const NEUTRAL_SURVIVORSHIP_MAX: f64 = 75.0;
const TOP_SURVIVORSHIP_MULTIPLIER: f64 = 1.2;

/// Step multiplier for a survivorship score. A NaN score maps to zero.
pub fn survivorship_step(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    for (bound, multiplier) in SURVIVORSHIP_STEPS {
        if score < bound {
            return multiplier;
        }
    }
    if score <= NEUTRAL_SURVIVORSHIP_MAX {
        1.0
    } else {
        TOP_SURVIVORSHIP_MULTIPLIER
    }
}

/// Capital multiplier: survivorship step times the agent's size multiplier,
/// with shorts hard-capped at `short_cap`.
pub fn capital_multiplier(
    direction: Direction,
    survivorship_score: f64,
    agent_size_multiplier: f64,
    short_cap: f64,
) -> f64 {
    let size = if agent_size_multiplier.is_finite() {
        agent_size_multiplier.max(0.0)
    } else {
        0.0
    };
    let raw = survivorship_step(survivorship_score) * size;
    match direction {
        Direction::Long => raw,
        Direction::Short => raw.min(short_cap.max(0.0)),
    }
}

/// Session sizing multiplier. Rollover returns zero: no new entries.
pub fn session_multiplier(session: Session) -> f64 {
    match session {
        Session::LondonNewYorkOverlap => 1.1,
        Session::London | Session::NewYork => 1.0,
        Session::Tokyo => 0.8,
        Session::Sydney => 0.7,
        Session::Rollover => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_survivorship_steps() {
        assert_eq!(survivorship_step(24.9), 0.0);
        assert_eq!(survivorship_step(25.0), 0.5);
        assert_eq!(survivorship_step(40.0), 0.75);
        assert_eq!(survivorship_step(60.0), 1.0);
        assert_eq!(survivorship_step(75.0), 1.0);
        assert_eq!(survivorship_step(75.1), 1.2);
        assert_eq!(survivorship_step(f64::NAN), 0.0);
    }

    #[test]
    fn test_short_capital_is_capped() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let score = rng.gen_range(0.0..100.0);
            let size = rng.gen_range(0.0..3.0);
            assert!(capital_multiplier(Direction::Short, score, size, 0.25) <= 0.25);
        }
        assert_eq!(capital_multiplier(Direction::Long, 80.0, 1.0, 0.25), 1.2);
    }

    #[test]
    fn test_invalid_size_multiplier_zeroes_capital() {
        assert_eq!(capital_multiplier(Direction::Long, 80.0, f64::NAN, 0.25), 0.0);
        assert_eq!(capital_multiplier(Direction::Long, 80.0, -1.0, 0.25), 0.0);
    }

    #[test]
    fn test_session_multipliers() {
        assert_eq!(session_multiplier(Session::LondonNewYorkOverlap), 1.1);
        assert_eq!(session_multiplier(Session::Sydney), 0.7);
        assert_eq!(session_multiplier(Session::Rollover), 0.0);
    }
}
