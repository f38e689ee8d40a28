use super::band::{round_to_half, MAX_BAND, MIN_BAND};
use crate::models::{OverallScore, PerCriterion};

/// 四项平均后取半分
pub fn overall_band(bands: [f64; 4]) -> f64 {
    let mean = bands.iter().sum::<f64>() / bands.len() as f64;
    round_to_half(mean).clamp(MIN_BAND, MAX_BAND)
}

/// 汇总四个评分项
pub fn aggregate(per_criterion: &PerCriterion) -> OverallScore {
    OverallScore {
        overall: overall_band(per_criterion.bands()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_example() {
        assert_eq!(overall_band([6.0, 7.0, 6.5, 7.5]), 7.0);
    }

    #[test]
    fn test_quarter_means_round_up() {
        // 6.25
        assert_eq!(overall_band([6.0, 6.0, 6.5, 6.5]), 6.5);
        // 6.75
        assert_eq!(overall_band([6.5, 6.5, 7.0, 7.0]), 7.0);
        // 6.125
        assert_eq!(overall_band([6.0, 6.0, 6.0, 6.5]), 6.0);
    }

    #[test]
    fn test_extremes_stay_in_domain() {
        assert_eq!(overall_band([1.0, 1.0, 1.0, 1.0]), 1.0);
        assert_eq!(overall_band([9.0, 9.0, 9.0, 9.0]), 9.0);
        assert_eq!(overall_band([0.0, 0.0, 0.0, 0.0]), 0.0);
    }
}
