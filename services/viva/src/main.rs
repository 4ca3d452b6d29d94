mod audio_manager;
mod config;

use crate::audio_manager::AudioManager;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoLocal;
use viva_core::Command;
use viva_core::evaluation::AssessmentKind;
use viva_core::examiner::ExaminerClient;
use viva_core::files;
use viva_core::report::{generate_report, report_filename};
use viva_core::session::AssessmentSession;
use viva_native_utils::device;

#[derive(Parser)]
#[command(about = "Voice-driven code comprehension assessment")]
struct Cli {
    /// Path to the file containing the code under assessment
    code: Option<PathBuf>,
    /// Additional related files to include as context (repeatable)
    #[arg(long = "with", value_name = "FILE")]
    aux_files: Vec<PathBuf>,
    /// List the available audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    if args.list_devices {
        println!("Input devices:\n{}", device::get_available_inputs()?);
        println!("Output devices:\n{}", device::get_available_outputs()?);
        return Ok(());
    }

    let code_path = args
        .code
        .context("A path to the code under assessment is required")?;

    if config.openai_api_key.is_none() {
        tracing::warn!(
            "OPENAI_API_KEY is not set. Add it to a .env file or the environment; \
             the assessment cannot start without it."
        );
    }

    // --- 4. Read the Submission ---
    let code = std::fs::read_to_string(&code_path)
        .with_context(|| format!("Failed to read code file: {}", code_path.display()))?;
    let aux_files = files::load_aux_files(&args.aux_files);
    if !aux_files.is_empty() {
        tracing::info!("Loaded {} additional files", aux_files.len());
    }

    // --- 5. Initialize API Clients ---
    let examiner = ExaminerClient::new(config.openai_api_key.clone(), config.chat_model.clone());
    let audio = AudioManager::new(&config);

    // Create the command channel to decouple core logic from the runtime.
    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel::<Command>(32);

    // --- 6. Start the Assessment ---
    println!("Analyzing code...");
    let mut session = AssessmentSession::new();
    let question_count = match session
        .begin(&examiner, code, aux_files, command_tx.clone())
        .await
    {
        Ok(count) => count,
        Err(e) => {
            eprintln!("Could not start the assessment: {e}");
            return Ok(());
        }
    };
    println!("Assessment started with {question_count} questions.\n");

    // --- 7. Drive the Session ---
    // The session decides what happens next and says so through commands;
    // this loop executes the side effects (speaking, listening, reporting).
    while let Some(command) = command_rx.recv().await {
        match command {
            Command::SpeakText(question) => {
                let number = session.results.len() + 1;
                println!("Question {number}: {question}");
                if let Err(e) = audio.speak(&question).await {
                    tracing::warn!("Failed to speak the question: {e:#}");
                }

                let answer = capture_answer(&audio).await?;
                println!("Your answer: {answer}\n");

                println!("Evaluating answer...");
                let evaluation = session
                    .submit_answer(&examiner, answer, command_tx.clone())
                    .await;
                match evaluation.kind {
                    AssessmentKind::Error => {
                        eprintln!(
                            "Evaluation failed: {}. The question will be repeated.",
                            evaluation.explanation
                        );
                        // No result was recorded; re-enqueue the same question.
                        if let Some(question) = session.current_question() {
                            let _ = command_tx.send(Command::SpeakText(question.to_string())).await;
                        }
                    }
                    _ => {
                        println!("Evaluation: {}", evaluation.explanation);
                        println!("Score: {}/10\n", evaluation.score);
                    }
                }
            }
            Command::SessionComplete(message) => {
                println!("{message}");
                let report = generate_report(&session);
                let filename = report_filename();
                std::fs::write(&filename, &report)
                    .with_context(|| format!("Failed to write report file: {filename}"))?;
                println!("\n{report}");
                println!("Report saved to {filename}");
                break;
            }
        }
    }

    Ok(())
}

/// Captures one spoken answer, prompting the student to retry after a
/// failed or silent capture. Capture failures never abort the assessment.
async fn capture_answer(audio: &AudioManager) -> Result<String> {
    loop {
        println!("Listening... Speak now!");
        if let Some(text) = audio.listen().await {
            return Ok(text);
        }
        println!("Could not capture an answer. Press Enter to try again.");
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
    }
}
