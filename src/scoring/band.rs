//! 分数算术

pub const MIN_BAND: f64 = 0.0;
pub const MAX_BAND: f64 = 9.0;

/// 四舍五入到最近的半分
///
/// 使用 `f64::round`（远离零取整），非负输入上等价于"逢半进一"：
/// 6.25 → 6.5，6.75 → 7.0。
pub fn round_to_half(x: f64) -> f64 {
    (x * 2.0).round() / 2.0
}

/// 分数是否合法：0–9 之间且为 0.5 的整数倍
pub fn is_valid_band(band: f64) -> bool {
    band.is_finite() && (MIN_BAND..=MAX_BAND).contains(&band) && (band * 2.0).fract() == 0.0
}

/// 解析锚点分数（"1".."9"）
pub fn parse_anchor(anchor: &str) -> Option<u8> {
    anchor
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|a| (1..=9).contains(a))
}

/// 由分数推导锚点：不高于分数的整数分，最低为 1
pub fn anchor_for(band: f64) -> String {
    let whole = band.floor().clamp(1.0, MAX_BAND) as u8;
    whole.to_string()
}

/// 分数与锚点是否一致（相差不超过半分；0 分允许锚点为 1）
pub fn band_matches_anchor(band: f64, anchor: u8) -> bool {
    (band - f64::from(anchor)).abs() <= 0.5 || (band == MIN_BAND && anchor == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up_at_quarter_boundaries() {
        assert_eq!(round_to_half(6.25), 6.5);
        assert_eq!(round_to_half(6.75), 7.0);
        assert_eq!(round_to_half(6.2), 6.0);
        assert_eq!(round_to_half(6.74), 6.5);
        assert_eq!(round_to_half(0.25), 0.5);
    }

    #[test]
    fn test_round_to_half_is_idempotent() {
        let mut x = 0.0;
        while x <= 9.0 {
            let once = round_to_half(x);
            assert_eq!(round_to_half(once), once, "x = {}", x);
            assert!(is_valid_band(once), "x = {}", x);
            x += 0.01;
        }
    }

    #[test]
    fn test_band_domain() {
        assert!(is_valid_band(0.0));
        assert!(is_valid_band(6.5));
        assert!(is_valid_band(9.0));
        assert!(!is_valid_band(6.3));
        assert!(!is_valid_band(9.5));
        assert!(!is_valid_band(-0.5));
        assert!(!is_valid_band(f64::NAN));
    }

    #[test]
    fn test_anchor_helpers() {
        assert_eq!(parse_anchor("7"), Some(7));
        assert_eq!(parse_anchor(" 9 "), Some(9));
        assert_eq!(parse_anchor("0"), None);
        assert_eq!(parse_anchor("seven"), None);
        assert_eq!(anchor_for(6.5), "6");
        assert_eq!(anchor_for(0.0), "1");
        assert!(band_matches_anchor(6.5, 7));
        assert!(band_matches_anchor(0.0, 1));
        assert!(!band_matches_anchor(5.5, 7));
    }
}
