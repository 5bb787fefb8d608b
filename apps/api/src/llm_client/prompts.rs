// Prompt templates for the three tasks, plus the fingerprint each one is cached under.
// Templates use `{placeholder}` markers replaced at build time.

use crate::session::{Category, Difficulty, ExperienceLevel, Fingerprint};

/// Documents longer than this are cut before they reach the summary prompt.
pub const SUMMARY_INPUT_LIMIT: usize = 3500;
pub const SUMMARY_TRUNCATION_MARKER: &str = "\n[Content truncated]";

pub const TASK_SUMMARY: &str = "summary";
pub const TASK_QUESTIONS: &str = "questions";

pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"You are an expert document analyzer. Analyze the provided document and determine if it's a RESUME or JOB DESCRIPTION, then generate an appropriate summary.

IF IT'S A RESUME:
Generate a concise, single-paragraph professional summary including:
1. Full name (in bold)
2. Educational background (degree, institution, graduation year, GPA/CGPA/percentage)
3. Core technical skills (programming languages, frameworks, libraries, tools, platforms, specialized domains)
4. Professional experience (company/organization names, duration, key responsibilities and achievements)
5. Major projects (project names with technologies used and key outcomes)
6. Certifications (list all certifications with issuing organization if mentioned)
7. Publications/Research (if any - title, journal/conference, date)
8. Contact information (email, phone, location)

Output format: **[Name]** is a [Degree] graduate ([Years], [GPA]) from [Institution] with expertise in [Skills]. [They] completed [Experience details with dates and achievements]. Key projects include [Project names with technologies]. [They] hold certifications in [Certifications list] and published [Publication details if any]. Contact: [Email, Phone, Location].

IF IT'S A JOB DESCRIPTION:
Generate a concise, single-paragraph summary including:
1. Job title/position (in bold)
2. Company name (if mentioned)
3. Key responsibilities and duties
4. Required technical skills and qualifications
5. Experience level required
6. Preferred qualifications or nice-to-haves
7. Work location/type (remote, hybrid, onsite)

Output format: **[Job Title]** at [Company] requires [Experience level] with expertise in [Required skills]. Key responsibilities include [Main duties]. Candidates should have [Qualifications and requirements]. Preferred qualifications include [Nice-to-haves]. Location: [Work type/location].

FORMATTING REQUIREMENTS:
- Output must be a SINGLE, well-structured paragraph
- Start with the key identifier (name for resume, job title for JD) in **bold** markdown format
- Be precise and concise - eliminate unnecessary words
- Include specific technical terms, tool names, and keywords exactly as mentioned
- Use commas and brief phrases to separate items within categories
- Maintain professional tone throughout
- Ensure EVERY important detail is captured without omission

Now analyze the following document and provide the appropriate summary:

{document_text}"#;

pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"You are a professional interview coach.

Generate exactly 4 interview questions WITH answers.

Strictly follow:
- Category: {category}
- Difficulty: {difficulty}
- Experience Level: {experience_level}

Context:
Job Role / JD:
{job_or_jd}

Resume Summary:
{summary}

Use numbered markdown.
No intro or conclusion."#;

pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are an interview evaluator.

Evaluate based on:
1. Completeness
2. Technical Accuracy
3. Communication Clarity

Provide:
- Score /10
- Feedback
- Improvements

Question:
{question}

Answer:
{user_answer}"#;

/// Caps document text at `SUMMARY_INPUT_LIMIT` characters.
pub fn clamp_summary_input(document_text: &str) -> String {
    match document_text.char_indices().nth(SUMMARY_INPUT_LIMIT) {
        Some((cut, _)) => format!("{}{}", &document_text[..cut], SUMMARY_TRUNCATION_MARKER),
        None => document_text.to_string(),
    }
}

/// Substitutes `{name}` markers in one left-to-right pass over the template.
///
/// Substituted values are never rescanned, so user text that happens to
/// contain a marker reaches the model verbatim. Unknown markers are kept.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

pub fn summary_prompt(document_text: &str) -> String {
    let clamped = clamp_summary_input(document_text);
    fill_template(SUMMARY_PROMPT_TEMPLATE, &[("document_text", clamped.as_str())])
}

pub fn summary_fingerprint(document_text: &str) -> Fingerprint {
    let clamped = clamp_summary_input(document_text);
    Fingerprint::new(TASK_SUMMARY, &[clamped.as_str()])
}

/// Inputs for one question-generation round.
#[derive(Debug, Clone, Copy)]
pub struct QuestionRequest<'a> {
    pub job_or_jd: &'a str,
    pub summary: &'a str,
    pub category: Category,
    pub difficulty: Difficulty,
    pub experience_level: ExperienceLevel,
}

pub fn questions_prompt(req: &QuestionRequest<'_>) -> String {
    fill_template(
        QUESTIONS_PROMPT_TEMPLATE,
        &[
            ("category", req.category.label()),
            ("difficulty", req.difficulty.label()),
            ("experience_level", req.experience_level.label()),
            ("job_or_jd", req.job_or_jd),
            ("summary", req.summary),
        ],
    )
}

pub fn questions_fingerprint(req: &QuestionRequest<'_>) -> Fingerprint {
    Fingerprint::new(
        TASK_QUESTIONS,
        &[
            req.job_or_jd,
            req.summary,
            req.category.label(),
            req.difficulty.label(),
            req.experience_level.label(),
        ],
    )
}

pub fn evaluation_prompt(question: &str, user_answer: &str) -> String {
    fill_template(
        EVALUATION_PROMPT_TEMPLATE,
        &[("question", question), ("user_answer", user_answer)],
    )
}
