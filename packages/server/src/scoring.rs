use std::str::FromStr;

/// Problem difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Points for a tier nobody recognizes.
pub const DEFAULT_BASE_POINTS: f64 = 10.0;

impl Difficulty {
    pub fn base_points(&self) -> f64 {
        match self {
            Difficulty::Easy => 10.0,
            Difficulty::Medium => 20.0,
            Difficulty::Hard => 30.0,
        }
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(()),
        }
    }
}

/// Base points for a stored tier string.
pub fn base_points(difficulty: &str) -> f64 {
    difficulty
        .parse::<Difficulty>()
        .map(|d| d.base_points())
        .unwrap_or(DEFAULT_BASE_POINTS)
}

/// Difficulty-weighted score for `passed` out of `total_hidden` test cases.
///
/// Equals `(base / total_hidden) * passed`; multiplying first keeps a full
/// pass exactly equal to the base points. Computed for every verdict, not
/// only Accepted.
pub fn score(difficulty: &str, total_hidden: usize, passed: usize) -> f64 {
    if total_hidden == 0 {
        return 0.0;
    }
    base_points(difficulty) * passed as f64 / total_hidden as f64
}
