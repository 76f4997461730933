/// Rounds to one decimal place, the precision every derived column uses.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of plan reached by fact. A zero or negative plan yields 0
/// exactly, never a division error.
pub fn plan_fact_pct(plan: f64, fact: f64) -> f64 {
    if plan > 0.0 {
        round1(fact / plan * 100.0)
    } else {
        0.0
    }
}

/// Field-visit overall score: arithmetic mean of the five sub-ratings.
pub fn overall_score(ratings: [i64; 5]) -> f64 {
    round1(ratings.iter().sum::<i64>() as f64 / 5.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(3.0), 3.0);
        assert_eq!(round1(3.14), 3.1);
        assert_eq!(round1(3.15), 3.2);
        assert_eq!(round1(99.96), 100.0);
    }

    #[test]
    fn plan_fact_pct_handles_zero_plan() {
        assert_eq!(plan_fact_pct(0.0, 25.0), 0.0);
        assert_eq!(plan_fact_pct(50.0, 25.0), 50.0);
        assert_eq!(plan_fact_pct(3.0, 1.0), 33.3);
    }

    #[test]
    fn overall_score_is_rounded_mean() {
        assert_eq!(overall_score([10, 10, 10, 10, 10]), 10.0);
        assert_eq!(overall_score([1, 2, 3, 4, 5]), 3.0);
        assert_eq!(overall_score([1, 1, 1, 1, 2]), 1.2);
    }
}
