use crate::ConsoleError;
use usage_exporter_core::UsageRecord;

/// Parse a cost cell such as `€ 1,234.56` into euros.
///
/// A comma is only accepted as a thousands separator, so `12,50 €` is rejected
/// instead of being read as 1250.
pub fn parse_cost(text: &str) -> Result<f64, ConsoleError> {
    let invalid = || ConsoleError::InvalidCost(text.to_string());
    let amount = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect::<String>();

    let (integer, fraction) = amount.split_once('.').unwrap_or((amount.as_str(), ""));
    if fraction.contains(',') || !has_valid_grouping(integer) {
        return Err(invalid());
    }

    match amount.replace(',', "").parse::<f64>() {
        Ok(total) if total.is_finite() && total >= 0.0 => Ok(total),
        _ => Err(invalid()),
    }
}

/// `1234` or `1,234`, but not `12,5` or `,123`.
fn has_valid_grouping(integer: &str) -> bool {
    if !integer.contains(',') {
        return true;
    }
    let mut groups = integer.split(',');
    let leading = groups.next().unwrap_or_default();
    (1..=3).contains(&leading.len())
        && leading.chars().all(|c| c.is_ascii_digit())
        && groups.all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

pub fn parse_usage_row(project: &str, total: &str) -> Result<UsageRecord, ConsoleError> {
    let project = project.trim();
    if project.is_empty() {
        return Err(ConsoleError::EmptyProjectName);
    }
    Ok(UsageRecord::new(project, parse_cost(total)?))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_console_amounts() {
        assert_eq!(parse_cost("€12.50").unwrap(), 12.5);
        assert_eq!(parse_cost("€ 0.00").unwrap(), 0.0);
        assert_eq!(parse_cost(" 1,234.56 €\n").unwrap(), 1234.56);
        assert_eq!(parse_cost("€\u{a0}3.10").unwrap(), 3.1);
        assert_eq!(parse_cost("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_cost("€ 1,234,567").unwrap(), 1234567.0);
    }

    #[test]
    fn rejects_garbage_and_negative_amounts() {
        assert!(matches!(parse_cost(""), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost("€ —"), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost("€-4.20"), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost("NaN"), Err(ConsoleError::InvalidCost(_))));
    }

    #[test]
    fn rejects_decimal_commas() {
        assert!(matches!(parse_cost("12,50 €"), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost("1.234,56 €"), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost("1234,5678"), Err(ConsoleError::InvalidCost(_))));
        assert!(matches!(parse_cost(",123"), Err(ConsoleError::InvalidCost(_))));
    }

    #[test]
    fn builds_usage_records() {
        assert_eq!(
            parse_usage_row("  proj-a ", "€12.50").unwrap(),
            UsageRecord::new("proj-a", 12.5)
        );
        assert!(matches!(
            parse_usage_row(" ", "€12.50"),
            Err(ConsoleError::EmptyProjectName)
        ));
    }
}
