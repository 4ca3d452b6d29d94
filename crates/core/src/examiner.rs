use crate::evaluation::Evaluation;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Failures at the examiner boundary. Nothing past this boundary ever sees
/// a raw transport fault: the session converts these into an error-shaped
/// evaluation (for grading) or refuses to start (for generation).
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error("OpenAI API key not found. Please set the OPENAI_API_KEY environment variable.")]
    MissingApiKey,
    #[error("request to the language model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the language model returned an empty reply")]
    EmptyReply,
    #[error("the language model returned no questions")]
    NoQuestions,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

// The `Examiner` trait defines the contract for any service that can turn
// submitted code into comprehension questions and grade spoken answers.
// The session state machine depends on this abstraction rather than on a
// concrete HTTP client, so unit tests drive it with `mockall`'s
// `MockExaminer` instead of a live API.
//
// `#[async_trait]` is used because traits do not natively support async
// functions across object boundaries yet. `#[cfg_attr(test, automock)]`
// generates the mock implementation only in test builds.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Examiner {
    /// Generates 2-3 comprehension questions for the submitted code and
    /// its auxiliary files. Every non-blank line of the model's reply
    /// becomes one question; there is no semantic validation.
    async fn generate_questions(
        &self,
        code: &str,
        aux_files: &HashMap<String, String>,
    ) -> Result<Vec<String>, ExamError>;

    /// Grades a single answer against a question in the context of the
    /// submitted code. Replies that do not match the wire format degrade
    /// to an `Error`-kind evaluation rather than an `Err`.
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        code: &str,
        aux_files: &HashMap<String, String>,
    ) -> Result<Evaluation, ExamError>;
}

/// The OpenAI chat-completions implementation of [`Examiner`].
///
/// The API key is optional: a missing credential is surfaced per call as
/// [`ExamError::MissingApiKey`], which lets the rest of the application run
/// (and render) without it.
pub struct ExaminerClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl ExaminerClient {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn api_key(&self) -> Result<&str, ExamError> {
        self.api_key.as_deref().ok_or(ExamError::MissingApiKey)
    }

    /// Sends one chat-completions request and returns the first choice's
    /// message content.
    async fn complete(&self, prompt: String) -> Result<String, ExamError> {
        let api_key = self.api_key()?;
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<LlmResponse>()
            .await?;

        let content = resp
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or(ExamError::EmptyReply)?;
        Ok(content)
    }
}

/// Builds the shared code-context block embedded in both prompts: the main
/// code followed by a labeled dump of every auxiliary file.
fn build_context(code: &str, aux_files: &HashMap<String, String>) -> String {
    let mut context = format!("Main code:\n{code}\n\n");
    if !aux_files.is_empty() {
        context.push_str("Additional files:\n");
        for (filename, content) in aux_files {
            context.push_str(&format!("\n{filename}:\n{content}\n"));
        }
    }
    context
}

/// Splits a free-text reply into questions: one per non-blank line.
fn split_questions(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Examiner for ExaminerClient {
    async fn generate_questions(
        &self,
        code: &str,
        aux_files: &HashMap<String, String>,
    ) -> Result<Vec<String>, ExamError> {
        let context = build_context(code, aux_files);
        let prompt = format!(
            r#"Analyze this code and related files, then generate 2-3 relevant questions to test the student's understanding:
{context}

Generate questions that test both basic understanding and deeper concepts.
Consider the relationships between files when generating questions.
Output one question per line, with no numbering and no extra commentary."#
        );

        let content = self.complete(prompt).await?;
        Ok(split_questions(&content))
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        code: &str,
        aux_files: &HashMap<String, String>,
    ) -> Result<Evaluation, ExamError> {
        let context = build_context(code, aux_files);
        let prompt = format!(
            r#"Context: Student submitted this code and related files:
{context}

Question asked: {question}
Student's answer: {answer}

Evaluate the answer considering:
1. Correctness
2. Completeness
3. Understanding of concepts
4. Understanding of file relationships (if applicable)

Provide your response in exactly this format (including the score number):
ASSESSMENT_TYPE|Explanation text|Follow-up question text|X
where:
- ASSESSMENT_TYPE is either GOOD or NEEDS_FOLLOWUP
- the follow-up field is the literal word none if no follow-up is needed
- X is a number from 0 to 10"#
        );

        let content = self.complete(prompt).await?;
        Ok(Evaluation::parse(&content))
    }
}
