//! Append-only log of question-generation rounds for one session.

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Technical,
    Behavioral,
    Situational,
    #[serde(rename = "Domain-specific")]
    DomainSpecific,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Fresher,
    #[serde(rename = "Mid-level")]
    MidLevel,
    Senior,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::Technical => "Technical",
            Category::Behavioral => "Behavioral",
            Category::Situational => "Situational",
            Category::DomainSpecific => "Domain-specific",
        }
    }
}

impl ExperienceLevel {
    pub fn label(self) -> &'static str {
        match self {
            ExperienceLevel::Fresher => "Fresher",
            ExperienceLevel::MidLevel => "Mid-level",
            ExperienceLevel::Senior => "Senior",
        }
    }
}

/// Feedback on one answer. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationEntry {
    pub question: String,
    pub user_answer: String,
    pub feedback: String,
}

/// One completed generation round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub timestamp: String,
    pub job_or_jd: String,
    pub document_summary: Option<String>,
    pub category: Category,
    pub difficulty: Difficulty,
    pub experience_level: ExperienceLevel,
    pub qas: String,
    pub evaluations: Vec<EvaluationEntry>,
}

impl TranscriptEntry {
    /// Stamps the entry with the current local time. Blank summaries are dropped.
    pub fn new(
        job_or_jd: String,
        document_summary: Option<String>,
        category: Category,
        difficulty: Difficulty,
        experience_level: ExperienceLevel,
        qas: String,
    ) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            job_or_jd,
            document_summary: document_summary.filter(|s| !s.trim().is_empty()),
            category,
            difficulty,
            experience_level,
            qas,
            evaluations: Vec::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Unknown transcript round {0}")]
    UnknownRound(usize),
}

#[derive(Debug, Default)]
pub struct Transcript {
    rounds: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Appends a round and returns its index (append order, from zero).
    pub fn append_round(&mut self, entry: TranscriptEntry) -> usize {
        self.rounds.push(entry);
        self.rounds.len() - 1
    }

    pub fn append_evaluation(
        &mut self,
        round_index: usize,
        evaluation: EvaluationEntry,
    ) -> Result<(), TranscriptError> {
        let round = self
            .rounds
            .get_mut(round_index)
            .ok_or(TranscriptError::UnknownRound(round_index))?;
        round.evaluations.push(evaluation);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }

    pub fn all_rounds(&self) -> &[TranscriptEntry] {
        &self.rounds
    }

    pub fn round(&self, index: usize) -> Option<&TranscriptEntry> {
        self.rounds.get(index)
    }
}
