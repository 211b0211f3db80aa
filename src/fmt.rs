use chrono::NaiveDate;

/// Format a float as an amount with thousands separators: 1,234.56
pub fn amount(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let fixed = format!("{:.2}", abs);
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && abs >= 0.005 {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

pub fn date(val: Option<NaiveDate>) -> String {
    val.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_formatting() {
        assert_eq!(amount(1234.56), "1,234.56");
        assert_eq!(amount(-500.00), "-500.00");
        assert_eq!(amount(0.0), "0.00");
        assert_eq!(amount(-0.001), "0.00");
        assert_eq!(amount(1000000.99), "1,000,000.99");
        assert_eq!(amount(42.10), "42.10");
    }

    #[test]
    fn test_date_formatting() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2024, 1, 10)), "2024-01-10");
        assert_eq!(date(None), "");
    }
}
