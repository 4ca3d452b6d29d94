//! Markdown report rendering for a finished (or in-progress) assessment.

use crate::session::AssessmentSession;
use chrono::Local;

/// Renders the full assessment report: timestamp, the submitted code
/// verbatim, the average score, and one section per recorded result.
/// Pure formatting over the session state; no side effects.
pub fn generate_report(session: &AssessmentSession) -> String {
    let mut report = Vec::new();

    report.push(format!(
        "Date: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    report.push("# Submitted Code\n".to_string());
    report.push(format!("{}\n", session.code));

    report.push("# Overall Score\n".to_string());
    report.push(format!("Average Score: {:.2}/10\n", session.average_score()));

    report.push("# Question-by-Question Breakdown\n".to_string());
    for (i, result) in session.results.iter().enumerate() {
        let n = i + 1;
        report.push(format!("## Question {n}\n"));
        report.push(format!("{n}. {}\n", result.question));
        report.push(format!("Student's Answer: {}\n", result.answer));
        report.push(format!("Evaluation: {}\n", result.evaluation.explanation));
        report.push(format!("Score: {}/10\n", result.evaluation.score));
        if let Some(followup) = &result.evaluation.followup {
            report.push(format!("Follow-up Question: {followup}\n"));
        }
    }

    report.join("\n")
}

/// File name for the downloadable report artifact, local time.
pub fn report_filename() -> String {
    format!(
        "assessment_report_{}.md",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluation;
    use crate::session::{AssessmentSession, Phase, ResultRecord};

    fn session_with_scores(scores: &[f64]) -> AssessmentSession {
        let mut session = AssessmentSession::new();
        session.code = "def add(a,b): return a+b".to_string();
        session.phase = Phase::Complete;
        for (i, score) in scores.iter().enumerate() {
            session.results.push(ResultRecord {
                question: format!("Question number {}?", i + 1),
                answer: format!("Answer number {}", i + 1),
                evaluation: Evaluation::parse(&format!("GOOD|Looks right|none|{score}")),
            });
        }
        session
    }

    #[test]
    fn averages_recorded_scores() {
        let session = session_with_scores(&[8.0, 6.0, 10.0]);
        let report = generate_report(&session);
        assert!(report.contains("Average Score: 8.00/10"), "{report}");
    }

    #[test]
    fn empty_session_averages_to_zero() {
        let session = session_with_scores(&[]);
        let report = generate_report(&session);
        assert!(report.contains("Average Score: 0.00/10"), "{report}");
        assert!(report.contains("# Question-by-Question Breakdown"));
    }

    #[test]
    fn renders_code_and_one_section_per_result() {
        let session = session_with_scores(&[7.0, 3.0]);
        let report = generate_report(&session);
        assert!(report.contains("# Submitted Code"));
        assert!(report.contains("def add(a,b): return a+b"));
        assert!(report.contains("## Question 1"));
        assert!(report.contains("1. Question number 1?"));
        assert!(report.contains("Student's Answer: Answer number 2"));
        assert!(report.contains("Evaluation: Looks right"));
        assert!(report.contains("Score: 7/10"));
        assert!(!report.contains("## Question 3"));
    }

    #[test]
    fn followup_is_rendered_only_when_present() {
        let mut session = session_with_scores(&[9.0]);
        session.results.push(ResultRecord {
            question: "Second?".to_string(),
            answer: "Maybe".to_string(),
            evaluation: Evaluation::parse("NEEDS_FOLLOWUP|Partial|What about edge cases?|4"),
        });

        let report = generate_report(&session);
        assert_eq!(report.matches("Follow-up Question:").count(), 1);
        assert!(report.contains("Follow-up Question: What about edge cases?"));
    }

    #[test]
    fn report_filename_matches_expected_shape() {
        let name = report_filename();
        assert!(name.starts_with("assessment_report_"));
        assert!(name.ends_with(".md"));
        // assessment_report_YYYYMMDD_HHMMSS.md
        assert_eq!(name.len(), "assessment_report_".len() + 15 + ".md".len());
    }
}
