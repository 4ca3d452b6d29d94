pub mod evaluation;
pub mod examiner;
pub mod files;
pub mod report;
pub mod session;

/// Represents commands that the core logic (`AssessmentSession`) issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (like speaking a question).
#[derive(Debug, Clone)]
pub enum Command {
    /// Command the runtime to speak the given question to the student.
    SpeakText(String),
    /// Command indicating the assessment is complete, with a final message.
    /// The runtime is expected to render and persist the report on receipt.
    SessionComplete(String),
}
