//! Parsing of the evaluator's pipe-delimited reply.
//!
//! The evaluation prompt instructs the model to answer on a single line:
//! `ASSESSMENT_TYPE|Explanation|Followup|Score`. The format has no escaping,
//! so a `|` inside the explanation text breaks the field count. This is a
//! known weakness of the wire contract; a reply that does not split into
//! exactly four fields degrades to an `Error` evaluation instead of failing
//! the whole exchange.

/// The verdict category the model assigns to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentKind {
    Good,
    NeedsFollowup,
    /// Synthetic kind for replies that could not be parsed or calls that
    /// failed. An `Error` evaluation is never recorded against a question.
    Error,
}

/// The structured verdict produced per answer. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub kind: AssessmentKind,
    pub explanation: String,
    pub followup: Option<String>,
    pub score: f64,
}

impl Evaluation {
    /// Builds the degraded evaluation used for every failure path:
    /// parse mismatch, missing credential, transport error.
    pub fn error(explanation: impl Into<String>) -> Self {
        Self {
            kind: AssessmentKind::Error,
            explanation: explanation.into(),
            followup: None,
            score: 0.0,
        }
    }

    /// Parses a raw model reply in the `TYPE|explanation|followup|score` format.
    ///
    /// Exactly four `|`-separated fields are required. A followup equal to
    /// "none" (any case) or empty means no follow-up. A malformed score
    /// degrades to 0; an out-of-range score is passed through unvalidated.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.trim().split('|').collect();
        if parts.len() != 4 {
            return Self::error("Invalid response format from evaluation");
        }

        let kind = match parts[0].trim() {
            "GOOD" => AssessmentKind::Good,
            "NEEDS_FOLLOWUP" => AssessmentKind::NeedsFollowup,
            other => {
                return Self::error(format!("Unknown assessment type: {other}"));
            }
        };

        let followup = parts[2].trim();
        let followup = if followup.is_empty() || followup.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(followup.to_string())
        };

        let score = parts[3].trim().parse::<f64>().unwrap_or(0.0);

        Self {
            kind,
            explanation: parts[1].trim().to_string(),
            followup,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let eval = Evaluation::parse("GOOD|Correct|none|9");
        assert_eq!(eval.kind, AssessmentKind::Good);
        assert_eq!(eval.explanation, "Correct");
        assert_eq!(eval.followup, None);
        assert_eq!(eval.score, 9.0);
    }

    #[test]
    fn parses_followup_verbatim() {
        let eval = Evaluation::parse("NEEDS_FOLLOWUP|Partially correct|What about type errors?|5");
        assert_eq!(eval.kind, AssessmentKind::NeedsFollowup);
        assert_eq!(eval.followup.as_deref(), Some("What about type errors?"));
        assert_eq!(eval.score, 5.0);
    }

    #[test]
    fn none_followup_is_case_insensitive() {
        for raw in ["GOOD|ok|none|7", "GOOD|ok|None|7", "GOOD|ok|NONE|7"] {
            assert_eq!(Evaluation::parse(raw).followup, None, "raw: {raw}");
        }
    }

    #[test]
    fn wrong_field_count_degrades_to_error() {
        for raw in ["GOOD|only three|9", "GOOD|a|b|c|9", "just some prose"] {
            let eval = Evaluation::parse(raw);
            assert_eq!(eval.kind, AssessmentKind::Error, "raw: {raw}");
            assert_eq!(eval.explanation, "Invalid response format from evaluation");
            assert_eq!(eval.followup, None);
            assert_eq!(eval.score, 0.0);
        }
    }

    #[test]
    fn unknown_assessment_type_degrades_to_error() {
        let eval = Evaluation::parse("EXCELLENT|great answer|none|10");
        assert_eq!(eval.kind, AssessmentKind::Error);
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn malformed_score_degrades_to_zero() {
        let eval = Evaluation::parse("GOOD|ok|none|ten out of ten");
        assert_eq!(eval.kind, AssessmentKind::Good);
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn out_of_range_score_passes_through() {
        // The score contract is [0, 10] but the parser does not clamp.
        let eval = Evaluation::parse("GOOD|ok|none|15");
        assert_eq!(eval.score, 15.0);
    }

    #[test]
    fn fields_are_trimmed() {
        let eval = Evaluation::parse("  GOOD | Correct answer |  none | 8.5 \n");
        assert_eq!(eval.kind, AssessmentKind::Good);
        assert_eq!(eval.explanation, "Correct answer");
        assert_eq!(eval.followup, None);
        assert_eq!(eval.score, 8.5);
    }

    #[test]
    fn pipe_inside_explanation_breaks_the_field_count() {
        // Documented fragility of the unescaped wire format.
        let eval = Evaluation::parse("GOOD|uses a | b pattern|none|9");
        assert_eq!(eval.kind, AssessmentKind::Error);
    }
}
