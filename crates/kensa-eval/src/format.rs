//! Binary checks that an answer obeys an output-shape instruction found in
//! its prompt.

/// One output-shape requirement, triggered by `phrase` in the lower-cased
/// prompt.
#[derive(Debug, Clone, Copy)]
pub struct FormatRule {
    pub phrase: &'static str,
    pub check: fn(&str) -> bool,
}

/// Ordered rule list; the first rule whose phrase occurs in the prompt wins.
pub const FORMAT_RULES: &[FormatRule] = &[
    FormatRule {
        phrase: "answer only true or false",
        check: is_boolean_literal,
    },
    FormatRule {
        phrase: "answer with units",
        check: has_speed_with_units,
    },
];

const SPEED_UNITS: [&str; 3] = ["km/h", "kmh", "km per hour"];

fn is_boolean_literal(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "true" | "false")
}

fn has_speed_with_units(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.chars().any(char::is_numeric) && SPEED_UNITS.iter().any(|u| answer.contains(u))
}

/// 1.0 when `answer` satisfies the format required by `prompt`, else 0.0.
/// Prompts without a recognised instruction always comply.
pub fn format_compliance(prompt: &str, answer: &str) -> f64 {
    let prompt = prompt.to_lowercase();
    match FORMAT_RULES.iter().find(|rule| prompt.contains(rule.phrase)) {
        Some(rule) if (rule.check)(answer) => 1.0,
        Some(_) => 0.0,
        None => 1.0,
    }
}
