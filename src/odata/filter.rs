//! `$filter` construction for the WOHeaderSet entity set.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Search criteria accepted by a work-order search. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub vin: Option<String>,
    pub dealer_code: Option<String>,
    pub wo_no: Option<String>,
    /// ISO-8601 calendar date (or date-time), inclusive lower bound on `Credate`.
    pub date_from: Option<String>,
    /// ISO-8601 calendar date (or date-time), inclusive upper bound on `Credate`.
    pub date_to: Option<String>,
    pub strategies: StrategyFlags,
}

/// Business strategies, each standing for a set of countries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyFlags {
    pub temsa_global: bool,
    pub temsa_global_gwk: bool,
    pub germany: bool,
    pub france: bool,
    pub north_america: bool,
}

impl StrategyFlags {
    /// Countries selected by the active strategies, in emission order.
    pub fn countries(&self) -> Vec<&'static str> {
        let mut countries = Vec::new();
        if self.temsa_global || self.temsa_global_gwk {
            countries.push("Turkey");
        }
        if self.germany {
            countries.push("Germany");
        }
        if self.france {
            countries.push("France");
        }
        if self.north_america {
            countries.extend(["United States", "Canada"]);
        }
        countries
    }
}

/// Escape a value for use inside an OData string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build the full `$filter` expression, or an empty string when nothing is set.
pub fn build_filter(criteria: &SearchCriteria) -> String {
    let mut predicates = field_predicates(criteria);
    if let Some(group) = strategy_predicate(&criteria.strategies) {
        predicates.push(group);
    }
    predicates.join(" and ")
}

/// Equality and date-range predicates, in a fixed order.
pub fn field_predicates(criteria: &SearchCriteria) -> Vec<String> {
    let mut predicates = Vec::new();

    let equalities = [
        ("Vin", &criteria.vin),
        ("DealerCode", &criteria.dealer_code),
        ("Wono", &criteria.wo_no),
    ];
    for (field, value) in equalities {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            predicates.push(format!("{field} eq '{}'", escape_literal(value)));
        }
    }

    let bounds = [("ge", "date_from", &criteria.date_from), ("le", "date_to", &criteria.date_to)];
    for (op, name, value) in bounds {
        let Some(raw) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        match parse_timestamp(raw) {
            Some(ts) => predicates.push(format!("Credate {op} datetime'{ts}'")),
            None => debug!(field = name, value = raw, "dropping unparseable date criterion"),
        }
    }

    predicates
}

/// The parenthesized country disjunction, or `None` when no strategy is active.
pub fn strategy_predicate(flags: &StrategyFlags) -> Option<String> {
    let countries = flags.countries();
    if countries.is_empty() {
        return None;
    }
    let terms: Vec<String> = countries
        .iter()
        .map(|country| format!("Landx eq '{}'", escape_literal(country)))
        .collect();
    Some(format!("({})", terms.join(" or ")))
}

/// Parse an ISO date or date-time and render it at second precision.
fn parse_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.format(TIMESTAMP_FORMAT).to_string());
    }
    // an explicit offset keeps its wall-clock time
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local().format(TIMESTAMP_FORMAT).to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria::default()
    }

    #[test]
    fn empty_criteria_yield_empty_filter() {
        assert_eq!(build_filter(&criteria()), "");
    }

    #[test]
    fn vin_becomes_equality_predicate() {
        let c = SearchCriteria { vin: Some("1HGBH41JXMN109186".into()), ..criteria() };
        assert_eq!(build_filter(&c), "Vin eq '1HGBH41JXMN109186'");
    }

    #[test]
    fn empty_strings_are_ignored() {
        let c = SearchCriteria {
            vin: Some(String::new()),
            dealer_code: Some(String::new()),
            date_from: Some(String::new()),
            ..criteria()
        };
        assert_eq!(build_filter(&c), "");
    }

    #[test]
    fn single_quotes_are_doubled() {
        let c = SearchCriteria {
            dealer_code: Some("O'Brien".into()),
            wo_no: Some("' or 1 eq 1 or Vin eq '".into()),
            ..criteria()
        };
        assert_eq!(
            build_filter(&c),
            "DealerCode eq 'O''Brien' and Wono eq ''' or 1 eq 1 or Vin eq '''"
        );
    }

    #[test]
    fn escaped_literals_stay_balanced() {
        for value in ["'", "''", "a'b'c", "'leading", "trailing'"] {
            let c = SearchCriteria { vin: Some(value.into()), ..criteria() };
            let filter = build_filter(&c);
            let literal = filter.strip_prefix("Vin eq '").and_then(|s| s.strip_suffix('\''));
            let literal = literal.expect("literal delimiters");
            // inside the literal every quote is part of a doubled pair
            assert_eq!(literal.replace("''", "").matches('\'').count(), 0, "{filter}");
            assert_eq!(literal.replace("''", "'"), value);
        }
    }

    #[test]
    fn dates_render_at_second_precision() {
        let c = SearchCriteria {
            date_from: Some("2024-01-15".into()),
            date_to: Some("2024-02-01T17:45:30.250".into()),
            ..criteria()
        };
        assert_eq!(
            build_filter(&c),
            "Credate ge datetime'2024-01-15T00:00:00' and Credate le datetime'2024-02-01T17:45:30'"
        );
    }

    #[test]
    fn offsets_and_short_times_are_accepted() {
        let cases = [
            ("2024-01-15T10:00:00Z", "2024-01-15T10:00:00"),
            ("2024-01-15T10:00:00+03:00", "2024-01-15T10:00:00"),
            ("2024-01-15T10:00:00.5-05:00", "2024-01-15T10:00:00"),
            ("2024-01-15 10:00", "2024-01-15T10:00:00"),
            ("2024-01-15T10:00", "2024-01-15T10:00:00"),
        ];
        for (raw, expected) in cases {
            let c = SearchCriteria { date_from: Some(raw.into()), ..criteria() };
            assert_eq!(build_filter(&c), format!("Credate ge datetime'{expected}'"), "{raw}");
        }
    }

    #[test]
    fn unparseable_dates_are_silently_dropped() {
        // Lenient on purpose: a typo in a date widens the search instead of failing it.
        let c = SearchCriteria {
            vin: Some("ABC".into()),
            date_from: Some("15/01/2024".into()),
            date_to: Some("2024-13-40".into()),
            ..criteria()
        };
        assert_eq!(build_filter(&c), "Vin eq 'ABC'");
    }

    #[test]
    fn germany_and_france_form_one_group() {
        let c = SearchCriteria {
            strategies: StrategyFlags { germany: true, france: true, ..Default::default() },
            ..criteria()
        };
        assert_eq!(build_filter(&c), "(Landx eq 'Germany' or Landx eq 'France')");
    }

    #[test]
    fn temsa_flags_collapse_to_turkey() {
        let both = StrategyFlags { temsa_global: true, temsa_global_gwk: true, ..Default::default() };
        let gwk = StrategyFlags { temsa_global_gwk: true, ..Default::default() };
        assert_eq!(strategy_predicate(&both).as_deref(), Some("(Landx eq 'Turkey')"));
        assert_eq!(strategy_predicate(&gwk).as_deref(), Some("(Landx eq 'Turkey')"));
    }

    #[test]
    fn north_america_covers_two_countries() {
        let flags = StrategyFlags { north_america: true, ..Default::default() };
        assert_eq!(
            strategy_predicate(&flags).as_deref(),
            Some("(Landx eq 'United States' or Landx eq 'Canada')")
        );
    }

    #[test]
    fn every_flag_combination_yields_expected_group() {
        for mask in 0u8..32 {
            let flags = StrategyFlags {
                temsa_global: mask & 1 != 0,
                temsa_global_gwk: mask & 2 != 0,
                germany: mask & 4 != 0,
                france: mask & 8 != 0,
                north_america: mask & 16 != 0,
            };
            let mut expected = Vec::new();
            if mask & 3 != 0 {
                expected.push("Landx eq 'Turkey'");
            }
            if flags.germany {
                expected.push("Landx eq 'Germany'");
            }
            if flags.france {
                expected.push("Landx eq 'France'");
            }
            if flags.north_america {
                expected.push("Landx eq 'United States'");
                expected.push("Landx eq 'Canada'");
            }

            let group = strategy_predicate(&flags);
            if expected.is_empty() {
                assert_eq!(group, None, "mask {mask}");
            } else {
                assert_eq!(group, Some(format!("({})", expected.join(" or "))), "mask {mask}");
            }
        }
    }

    #[test]
    fn all_groups_are_and_joined_in_stable_order() {
        let c = SearchCriteria {
            vin: Some("V1".into()),
            dealer_code: Some("D1".into()),
            wo_no: Some("W1".into()),
            date_from: Some("2024-01-01".into()),
            date_to: Some("2024-12-31".into()),
            strategies: StrategyFlags { france: true, ..Default::default() },
        };
        assert_eq!(
            build_filter(&c),
            "Vin eq 'V1' and DealerCode eq 'D1' and Wono eq 'W1' \
             and Credate ge datetime'2024-01-01T00:00:00' \
             and Credate le datetime'2024-12-31T00:00:00' \
             and (Landx eq 'France')"
        );
    }
}
