//! Interaction flows: summarize an upload, generate a round, evaluate an answer.
//!
//! Each flow takes the `Session` it acts on plus the shared client; the HTTP
//! handlers only resolve the session, hold its lock and shape the response.

pub mod handlers;

use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::prompts::{
    evaluation_prompt, questions_fingerprint, questions_prompt, summary_fingerprint,
    summary_prompt, QuestionRequest,
};
use crate::llm_client::{Completion, ProgressSink, RetryingClient};
use crate::session::{
    Category, Difficulty, EvaluationEntry, ExperienceLevel, Session, TranscriptEntry,
    TranscriptError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateInput {
    #[serde(default)]
    pub job_or_jd: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub experience_level: ExperienceLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateInput {
    pub question: String,
    pub user_answer: String,
    /// Round to attach the evaluation to. Defaults to the session's current round.
    #[serde(default)]
    pub round_index: Option<usize>,
}

#[derive(Debug)]
pub struct GeneratedRound {
    pub round_index: usize,
    pub completion: Completion,
}

#[derive(Debug)]
pub struct Evaluation {
    pub completion: Completion,
    /// Round the feedback was recorded under; `None` when nothing was recorded.
    pub recorded_in: Option<usize>,
}

/// Summarizes extracted document text and makes it the session's current summary.
pub async fn summarize_document(
    session: &mut Session,
    llm: &RetryingClient,
    document_text: &str,
    progress: &dyn ProgressSink,
) -> Result<Completion, AppError> {
    let fingerprint = summary_fingerprint(document_text);
    let completion = llm
        .invoke(
            &mut session.cache,
            &mut session.limiter,
            &summary_prompt(document_text),
            Some(&fingerprint),
            progress,
        )
        .await?;

    session.document_summary = Some(completion.text.clone());
    Ok(completion)
}

/// Generates one round of questions and appends it to the transcript as the current round.
pub async fn generate_questions(
    session: &mut Session,
    llm: &RetryingClient,
    input: &GenerateInput,
    progress: &dyn ProgressSink,
) -> Result<GeneratedRound, AppError> {
    if input.job_or_jd.trim().is_empty() && session.document_summary.is_none() {
        return Err(AppError::Validation(
            "Please enter a job role/JD or upload a PDF".to_string(),
        ));
    }

    let summary = session.document_summary.clone().unwrap_or_default();
    let request = QuestionRequest {
        job_or_jd: &input.job_or_jd,
        summary: &summary,
        category: input.category,
        difficulty: input.difficulty,
        experience_level: input.experience_level,
    };
    let completion = llm
        .invoke(
            &mut session.cache,
            &mut session.limiter,
            &questions_prompt(&request),
            Some(&questions_fingerprint(&request)),
            progress,
        )
        .await?;

    let entry = TranscriptEntry::new(
        input.job_or_jd.clone(),
        session.document_summary.clone(),
        input.category,
        input.difficulty,
        input.experience_level,
        completion.text.clone(),
    );
    let round_index = session.transcript.append_round(entry);
    session.current_round = Some(round_index);
    info!("Round {round_index} recorded (cached: {})", completion.cached);

    Ok(GeneratedRound {
        round_index,
        completion,
    })
}

/// Evaluates an answer. Feedback is never cached.
pub async fn evaluate_answer(
    session: &mut Session,
    llm: &RetryingClient,
    input: &EvaluateInput,
    progress: &dyn ProgressSink,
) -> Result<Evaluation, AppError> {
    if input.question.trim().is_empty() || input.user_answer.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide both question and answer".to_string(),
        ));
    }
    if let Some(idx) = input.round_index {
        if session.transcript.round(idx).is_none() {
            return Err(TranscriptError::UnknownRound(idx).into());
        }
    }

    let completion = llm
        .invoke(
            &mut session.cache,
            &mut session.limiter,
            &evaluation_prompt(&input.question, &input.user_answer),
            None,
            progress,
        )
        .await?;

    let target = input.round_index.or(session.current_round);
    if let Some(idx) = target {
        session.transcript.append_evaluation(
            idx,
            EvaluationEntry {
                question: input.question.clone(),
                user_answer: input.user_answer.clone(),
                feedback: completion.text.clone(),
            },
        )?;
    }

    Ok(Evaluation {
        completion,
        recorded_in: target,
    })
}
