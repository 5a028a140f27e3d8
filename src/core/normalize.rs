use super::types::RateSchedule;

/// Values in (0, 1] are read as fractions (0.05 -> 5.0); anything else is
/// already a percentage. Non-finite input becomes 0.0.
pub fn normalize_rate_percent(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    if value > 0.0 && value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

pub fn parse_rate_percent(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .map(normalize_rate_percent)
        .unwrap_or(0.0)
}

/// Parses "month:rate" pairs separated by commas, e.g. "13:4.5, 61:5.25".
/// Malformed pairs are skipped; a repeated month keeps the last rate.
pub fn parse_rate_change_list(text: &str) -> RateSchedule {
    let mut schedule = RateSchedule::new();
    for part in text.split(',') {
        let mut fields = part.split(':');
        let (Some(month), Some(rate), None) = (fields.next(), fields.next(), fields.next()) else {
            continue;
        };
        let (Ok(month), Ok(rate)) = (month.trim().parse::<u32>(), rate.trim().parse::<f64>())
        else {
            continue;
        };
        if rate.is_finite() {
            schedule.insert(month, rate);
        }
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_are_scaled_to_percent() {
        assert_eq!(normalize_rate_percent(0.05), 5.0);
        assert_eq!(normalize_rate_percent(1.0), 100.0);
        assert_eq!(normalize_rate_percent(4.5), 4.5);
        assert_eq!(normalize_rate_percent(0.0), 0.0);
        assert_eq!(normalize_rate_percent(-0.5), -0.5);
        assert_eq!(normalize_rate_percent(f64::NAN), 0.0);
    }

    #[test]
    fn rate_text_never_fails() {
        assert!((parse_rate_percent(" 0.035 ") - 3.5).abs() < 1e-12);
        assert_eq!(parse_rate_percent("6"), 6.0);
        assert_eq!(parse_rate_percent("six"), 0.0);
        assert_eq!(parse_rate_percent(""), 0.0);
    }

    #[test]
    fn rate_change_list_skips_malformed_pairs() {
        let schedule = parse_rate_change_list("13:4.5, bad, 25:x, 1:2:3, 61 : 5.25,,-4:3");
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.get(&13), Some(&4.5));
        assert_eq!(schedule.get(&61), Some(&5.25));
    }

    #[test]
    fn rate_change_list_keeps_last_duplicate() {
        let schedule = parse_rate_change_list("12:3,12:4");
        assert_eq!(schedule.get(&12), Some(&4.0));
        assert!(parse_rate_change_list("   ").is_empty());
    }
}
