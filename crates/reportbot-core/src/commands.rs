//! Free-text command classification.
//!
//! Rules are evaluated in table order and the first rule whose keyword matches
//! decides the outcome. The monthly rule sits before the daily one, so
//! "monthly report october 2025" can never be read as a daily lookup.

use std::sync::OnceLock;

use regex::Regex;

/// Which report family a message asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Daily,
    Monthly,
}

/// Calendar month, as accepted in monthly report requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Capitalized English name, as used in stored file names.
    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn parse(s: &str) -> Option<Month> {
        let lower = s.trim().to_lowercase();
        Month::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(&lower))
    }
}

/// Result of classifying one inbound text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandMatch {
    /// Daily report lookup; the key is the digit sequence as typed.
    DailyReport(String),
    MonthlyReport { month: Month, year: u16 },
    /// Anything else; carries the original, non-normalized text.
    AiQuery(String),
    /// The report keyword matched but the arguments did not fit.
    Malformed(ReportKind),
    /// Nothing to act on (blank or non-text message).
    Unrecognized,
}

struct Rule {
    kind: ReportKind,
    keyword: Regex,
    full: Regex,
    build: fn(&regex::Captures<'_>) -> Option<CommandMatch>,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule {
                kind: ReportKind::Monthly,
                keyword: compile(r"^monthly\s+report\b"),
                full: compile(r"^monthly\s+report\s+([a-z]+)\s+([0-9]{4})\b"),
                build: |caps| {
                    let month = Month::parse(caps.get(1)?.as_str())?;
                    let year = caps.get(2)?.as_str().parse().ok()?;
                    Some(CommandMatch::MonthlyReport { month, year })
                },
            },
            Rule {
                kind: ReportKind::Daily,
                keyword: compile(r"^report\b"),
                full: compile(r"^report\s+([0-9]+)\b"),
                build: |caps| Some(CommandMatch::DailyReport(caps.get(1)?.as_str().to_string())),
            },
        ]
    })
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Lowercase, trim, collapse inner whitespace and fold Arabic-Indic digits to ASCII.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(ascii_digit)
        .collect()
}

/// Stored report names use ASCII digits only.
fn ascii_digit(c: char) -> char {
    let zero = match c {
        '\u{0660}'..='\u{0669}' => 0x0660,
        '\u{06F0}'..='\u{06F9}' => 0x06F0,
        _ => return c,
    };
    char::from_digit(c as u32 - zero, 10).unwrap_or(c)
}

/// Classify an inbound message text.
pub fn classify(text: &str) -> CommandMatch {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return CommandMatch::Unrecognized;
    }

    for rule in rules() {
        if !rule.keyword.is_match(&normalized) {
            continue;
        }
        return rule
            .full
            .captures(&normalized)
            .and_then(|caps| (rule.build)(&caps))
            .unwrap_or(CommandMatch::Malformed(rule.kind));
    }

    CommandMatch::AiQuery(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_report_wins_over_daily() {
        assert_eq!(
            classify("monthly report october 2025"),
            CommandMatch::MonthlyReport {
                month: Month::October,
                year: 2025
            }
        );
        assert_eq!(
            classify("  Monthly   REPORT   March 2024 "),
            CommandMatch::MonthlyReport {
                month: Month::March,
                year: 2024
            }
        );
    }

    #[test]
    fn every_month_name_routes_monthly() {
        for m in Month::ALL {
            let text = format!("monthly report {} 2030", m.name().to_uppercase());
            assert_eq!(
                classify(&text),
                CommandMatch::MonthlyReport {
                    month: m,
                    year: 2030
                },
                "{text}"
            );
        }
    }

    #[test]
    fn daily_report_takes_the_digit_sequence() {
        assert_eq!(
            classify("report 27122025"),
            CommandMatch::DailyReport("27122025".to_string())
        );
        assert_eq!(
            classify("REPORT   01012026"),
            CommandMatch::DailyReport("01012026".to_string())
        );
        assert_eq!(
            classify("report 7"),
            CommandMatch::DailyReport("7".to_string())
        );
    }

    #[test]
    fn trailing_text_after_arguments_is_ignored() {
        assert_eq!(
            classify("report 27122025."),
            CommandMatch::DailyReport("27122025".to_string())
        );
        assert_eq!(
            classify("Report 27122025 please"),
            CommandMatch::DailyReport("27122025".to_string())
        );
        assert_eq!(
            classify("monthly report october 2025 please"),
            CommandMatch::MonthlyReport {
                month: Month::October,
                year: 2025
            }
        );
        assert_eq!(
            classify("monthly report october 2025!"),
            CommandMatch::MonthlyReport {
                month: Month::October,
                year: 2025
            }
        );
    }

    #[test]
    fn arabic_indic_digits_become_ascii_keys() {
        assert_eq!(
            classify("report ۲۷۱۲۲۰۲۵"),
            CommandMatch::DailyReport("27122025".to_string())
        );
        assert_eq!(
            classify("report ٢٧١٢٢٠٢٥"),
            CommandMatch::DailyReport("27122025".to_string())
        );
        assert_eq!(
            classify("monthly report october ۲۰۲۵"),
            CommandMatch::MonthlyReport {
                month: Month::October,
                year: 2025
            }
        );
    }

    #[test]
    fn other_unicode_digits_are_not_report_keys() {
        assert_eq!(
            classify("report १२३४"),
            CommandMatch::Malformed(ReportKind::Daily)
        );
    }

    #[test]
    fn malformed_reports_ask_for_usage() {
        assert_eq!(classify("report"), CommandMatch::Malformed(ReportKind::Daily));
        assert_eq!(
            classify("report tomorrow"),
            CommandMatch::Malformed(ReportKind::Daily)
        );
        assert_eq!(
            classify("report 12ab"),
            CommandMatch::Malformed(ReportKind::Daily)
        );
        assert_eq!(
            classify("monthly report"),
            CommandMatch::Malformed(ReportKind::Monthly)
        );
        assert_eq!(
            classify("monthly report smarch 2025"),
            CommandMatch::Malformed(ReportKind::Monthly)
        );
        assert_eq!(
            classify("monthly report october 25"),
            CommandMatch::Malformed(ReportKind::Monthly)
        );
        assert_eq!(
            classify("monthly report october 20251"),
            CommandMatch::Malformed(ReportKind::Monthly)
        );
    }

    #[test]
    fn other_text_goes_to_ai_with_original_casing() {
        assert_eq!(
            classify("  What is a Report? "),
            CommandMatch::AiQuery("  What is a Report? ".to_string())
        );
        assert_eq!(
            classify("reports are late"),
            CommandMatch::AiQuery("reports are late".to_string())
        );
        assert_eq!(
            classify("monthly reports 2025"),
            CommandMatch::AiQuery("monthly reports 2025".to_string())
        );
    }

    #[test]
    fn blank_text_is_unrecognized() {
        assert_eq!(classify(""), CommandMatch::Unrecognized);
        assert_eq!(classify(" \n\t "), CommandMatch::Unrecognized);
    }

    #[test]
    fn month_parse_is_case_insensitive() {
        assert_eq!(Month::parse("DECEMBER"), Some(Month::December));
        assert_eq!(Month::parse("dec"), None);
    }
}
