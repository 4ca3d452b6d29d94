use crate::Command;
use crate::evaluation::{AssessmentKind, Evaluation};
use crate::examiner::{ExamError, Examiner};
use std::collections::HashMap;
use tokio::sync::mpsc::Sender;

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No code submitted, or the last submission failed to produce questions.
    Idle,
    /// Questions loaded, the first one is active and unanswered.
    Ready,
    /// At least one answer recorded, more questions remain.
    InProgress,
    /// Every question answered; `current` is `None` and results are final.
    Complete,
}

/// The stored tuple for one completed question. Appended exactly once per
/// accepted answer, in question order, and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub question: String,
    pub answer: String,
    pub evaluation: Evaluation,
}

/// The single mutable unit of state for one assessment run.
///
/// Invariant: `results.len() == current` whenever `current` is `Some` —
/// every recorded result corresponds to a fully answered prior question and
/// the index points at the next unanswered one.
pub struct AssessmentSession {
    pub phase: Phase,
    pub code: String,
    pub aux_files: HashMap<String, String>,
    pub questions: Vec<String>,
    pub current: Option<usize>,
    pub results: Vec<ResultRecord>,
}

impl Default for AssessmentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            code: String::new(),
            aux_files: HashMap::new(),
            questions: Vec::new(),
            current: None,
            results: Vec::new(),
        }
    }

    /// Wholesale reset: a fresh submission discards everything, including
    /// results already recorded by the prior session.
    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.code.clear();
        self.aux_files.clear();
        self.questions.clear();
        self.current = None;
        self.results.clear();
    }

    /// The question the student is expected to answer next.
    pub fn current_question(&self) -> Option<&str> {
        self.current
            .and_then(|idx| self.questions.get(idx))
            .map(String::as_str)
    }

    /// Mean of all recorded scores, 0 when nothing has been recorded.
    pub fn average_score(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let total: f64 = self.results.iter().map(|r| r.evaluation.score).sum();
        total / self.results.len() as f64
    }

    /// Starts a new assessment for the submitted code.
    ///
    /// On success the session is `Ready` with the first question active, and
    /// a `SpeakText` command for it has been issued. On any failure (missing
    /// credential, transport, empty question list) the session stays `Idle`
    /// and the typed error is returned for the caller to surface.
    pub async fn begin<E: Examiner + Send + Sync>(
        &mut self,
        examiner: &E,
        code: String,
        aux_files: HashMap<String, String>,
        command_tx: Sender<Command>,
    ) -> Result<usize, ExamError> {
        self.reset();

        let questions = examiner.generate_questions(&code, &aux_files).await?;
        if questions.is_empty() {
            return Err(ExamError::NoQuestions);
        }

        tracing::info!("Generated {} questions for assessment", questions.len());
        self.code = code;
        self.aux_files = aux_files;
        self.questions = questions;
        self.current = Some(0);
        self.phase = Phase::Ready;

        let first = self.questions[0].clone();
        if command_tx.send(Command::SpeakText(first)).await.is_err() {
            tracing::warn!("Command channel closed before the first question was delivered");
        }
        Ok(self.questions.len())
    }

    /// Grades an answer to the active question and advances the machine.
    ///
    /// An accepted (non-`Error`) evaluation appends a result record and
    /// either activates the next question (`SpeakText`) or completes the
    /// session (`SessionComplete`). An `Error` evaluation leaves the session
    /// untouched: the same question stays active and re-submission is the
    /// only recovery path. Examiner failures never propagate; they are
    /// folded into the returned evaluation.
    pub async fn submit_answer<E: Examiner + Send + Sync>(
        &mut self,
        examiner: &E,
        answer: String,
        command_tx: Sender<Command>,
    ) -> Evaluation {
        let Some(idx) = self.current else {
            return Evaluation::error("No active question to answer");
        };
        let question = self.questions[idx].clone();

        let evaluation = match examiner
            .evaluate_answer(&question, &answer, &self.code, &self.aux_files)
            .await
        {
            Ok(evaluation) => evaluation,
            Err(e) => {
                tracing::error!("Error evaluating answer: {e}");
                Evaluation::error(e.to_string())
            }
        };

        if evaluation.kind == AssessmentKind::Error {
            return evaluation;
        }

        self.results.push(ResultRecord {
            question,
            answer,
            evaluation: evaluation.clone(),
        });

        if idx + 1 < self.questions.len() {
            self.current = Some(idx + 1);
            self.phase = Phase::InProgress;
            let next = self.questions[idx + 1].clone();
            if command_tx.send(Command::SpeakText(next)).await.is_err() {
                tracing::warn!("Command channel closed before the next question was delivered");
            }
        } else {
            self.current = None;
            self.phase = Phase::Complete;
            let message = "Assessment completed! Generating your report.".to_string();
            if command_tx
                .send(Command::SessionComplete(message))
                .await
                .is_err()
            {
                tracing::warn!("Command channel closed before session completion was delivered");
            }
        }

        evaluation
    }
}
