pub const NOT_AVAILABLE: &str = "N/A";

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fixed-point formatting with `,` thousands separators, e.g. `1,234,567.89`.
pub fn grouped(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return NOT_AVAILABLE.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3 + 1);
    let negative = value < 0.0 && fixed.chars().any(|c| ('1'..='9').contains(&c));
    if negative {
        out.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i != 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("${}", grouped(v, 2)),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn whole(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => grouped(v, 0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn count(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| grouped(v as f64, 0))
}

pub fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<a href=\"x\">AT&T's</a>"),
            "&lt;a href=&quot;x&quot;&gt;AT&amp;T&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(grouped(0.0, 2), "0.00");
        assert_eq!(grouped(999.999, 2), "1,000.00");
        assert_eq!(grouped(1234567.891, 2), "1,234,567.89");
        assert_eq!(grouped(123456.0, 0), "123,456");
        assert_eq!(grouped(-98765.4, 1), "-98,765.4");
        assert_eq!(grouped(-0.001, 2), "0.00");
    }

    #[test]
    fn optional_values_render_as_not_available() {
        assert_eq!(money(None), "N/A");
        assert_eq!(money(Some(f64::NAN)), "N/A");
        assert_eq!(money(Some(1520.5)), "$1,520.50");
        assert_eq!(whole(Some(2.5e12)), "2,500,000,000,000");
        assert_eq!(count(Some(41_000_000)), "41,000,000");
        assert_eq!(ratio(Some(6.4321)), "6.43");
    }
}
