use serde::{Deserialize, Serialize};

/// Tier thresholds and amounts for converting a daily score into credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPolicyConfig {
    /// Scores strictly below this earn `low_score_credits`.
    pub low_score_threshold: f64,
    /// Scores strictly above this earn `high_score_credits`; the closed range between earns
    /// `mid_score_credits`.
    pub high_score_threshold: f64,
    pub low_score_credits: i64,
    pub mid_score_credits: i64,
    pub high_score_credits: i64,
    pub improvement_bonus: i64,
}

impl Default for CreditPolicyConfig {
    fn default() -> Self {
        Self {
            low_score_threshold: 10.0,
            high_score_threshold: 20.0,
            low_score_credits: 5,
            mid_score_credits: 3,
            high_score_credits: 1,
            improvement_bonus: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditAward {
    pub base: i64,
    pub bonus: i64,
}

impl CreditAward {
    pub fn total(&self) -> i64 {
        self.base + self.bonus
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("score must be a finite number, got {0}")]
    InvalidScore(f64),
}

#[derive(Debug, Clone, Default)]
pub struct CreditPolicy {
    config: CreditPolicyConfig,
}

impl CreditPolicy {
    pub fn new(config: CreditPolicyConfig) -> Self {
        Self { config }
    }

    /// Bonus requires a strict improvement on the most recent earlier score.
    pub fn award(&self, score: f64, previous: Option<f64>) -> Result<CreditAward, PolicyError> {
        if !score.is_finite() {
            return Err(PolicyError::InvalidScore(score));
        }

        let base = if score < self.config.low_score_threshold {
            self.config.low_score_credits
        } else if score <= self.config.high_score_threshold {
            self.config.mid_score_credits
        } else {
            self.config.high_score_credits
        };

        let bonus = match previous {
            Some(previous) if score < previous => self.config.improvement_bonus,
            _ => 0,
        };

        Ok(CreditAward { base, bonus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn award(score: f64, previous: Option<f64>) -> CreditAward {
        CreditPolicy::default()
            .award(score, previous)
            .expect("finite score")
    }

    #[test]
    fn tier_boundaries_belong_to_the_middle_tier() {
        assert_eq!(award(9.99, None).base, 5);
        assert_eq!(award(10.0, None).base, 3);
        assert_eq!(award(20.0, None).base, 3);
        assert_eq!(award(20.01, None).base, 1);
        assert_eq!(award(0.0, None).base, 5);
    }

    #[test]
    fn bonus_requires_strict_improvement() {
        assert_eq!(award(8.0, Some(10.0)), CreditAward { base: 5, bonus: 2 });
        assert_eq!(award(10.0, Some(10.0)), CreditAward { base: 3, bonus: 0 });
        assert_eq!(award(25.0, Some(24.0)), CreditAward { base: 1, bonus: 0 });
        assert_eq!(award(25.0, None).bonus, 0);
        assert_eq!(award(21.0, Some(30.0)).total(), 3);
    }

    #[test]
    fn non_finite_scores_are_rejected() {
        let policy = CreditPolicy::default();
        assert!(matches!(
            policy.award(f64::NAN, None),
            Err(PolicyError::InvalidScore(_))
        ));
        assert!(policy.award(f64::INFINITY, Some(3.0)).is_err());
    }
}
