use anyhow::Context;
use chrono::{Datelike, NaiveDate};

const FORM_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const FORM_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parses a date typed into the search form (`MM/dd/yyyy`, or ISO from date pickers).
pub fn parse_form_date(raw: Option<&str>) -> anyhow::Result<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .context("date is required")?;

    let date = FORM_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .with_context(|| format!("could not parse date: {raw}"))?;

    anyhow::ensure!(
        FORM_YEARS.contains(&date.year()),
        "date out of range: {raw}"
    );
    Ok(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_us_and_iso_dates() {
        let expected = NaiveDate::from_ymd_opt(2018, 3, 9).unwrap();
        assert_eq!(parse_form_date(Some("03/09/2018")).unwrap(), expected);
        assert_eq!(parse_form_date(Some(" 2018-03-09 ")).unwrap(), expected);
    }

    #[test]
    fn rejects_missing_and_malformed_dates() {
        assert!(parse_form_date(None).is_err());
        assert!(parse_form_date(Some("")).is_err());
        assert!(parse_form_date(Some("13/40/2018")).is_err());

        let err = parse_form_date(Some("yesterday")).unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn rejects_years_outside_four_digits() {
        for raw in ["+262142-12-31", "12/31/10000", "-0001-01-01"] {
            let err = parse_form_date(Some(raw)).unwrap_err();
            assert!(err.to_string().contains(raw), "{raw}");
        }
        assert!(parse_form_date(Some("12/31/9999")).is_ok());
    }
}
