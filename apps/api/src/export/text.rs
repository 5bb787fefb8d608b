//! Plain-text transcript export.

use std::fmt::{self, Write};

use crate::session::TranscriptEntry;

fn banner() -> String {
    "=".repeat(80)
}

/// Renders the whole transcript. `None` when there is nothing to export.
pub fn export_text(rounds: &[TranscriptEntry], generated_at: &str) -> Option<String> {
    if rounds.is_empty() {
        return None;
    }
    render(rounds, generated_at).ok()
}

fn render(rounds: &[TranscriptEntry], generated_at: &str) -> Result<String, fmt::Error> {
    let rule = banner();
    let mut out = String::new();
    writeln!(out, "{rule}")?;
    writeln!(out, "INTERVIEW Q&A SESSION HISTORY")?;
    writeln!(out, "Generated on: {generated_at}")?;
    writeln!(out, "{rule}\n")?;

    for (idx, entry) in rounds.iter().enumerate() {
        writeln!(out, "\n{rule}")?;
        writeln!(out, "SESSION {}", idx + 1)?;
        writeln!(out, "Timestamp: {}", entry.timestamp)?;
        writeln!(out, "{rule}\n")?;

        writeln!(out, "JOB ROLE/JD:\n{}\n", entry.job_or_jd)?;

        if let Some(summary) = &entry.document_summary {
            writeln!(out, "DOCUMENT SUMMARY:\n{summary}\n")?;
        }

        writeln!(out, "SETTINGS:")?;
        writeln!(out, "- Category: {}", entry.category.label())?;
        writeln!(out, "- Difficulty: {}", entry.difficulty.label())?;
        writeln!(out, "- Experience Level: {}\n", entry.experience_level.label())?;

        writeln!(out, "GENERATED Q&A:\n{}\n", entry.qas)?;

        if !entry.evaluations.is_empty() {
            writeln!(out, "ANSWER EVALUATIONS:")?;
            for (eval_idx, evaluation) in entry.evaluations.iter().enumerate() {
                writeln!(out, "\nEvaluation {}:", eval_idx + 1)?;
                writeln!(out, "Question: {}", evaluation.question)?;
                writeln!(out, "User Answer: {}", evaluation.user_answer)?;
                writeln!(out, "Feedback:\n{}\n", evaluation.feedback)?;
            }
        }
    }

    Ok(out)
}
