//! PDF transcript export.
//!
//! Layout runs first into a list of pages of positioned lines, then the pages
//! are serialized with lopdf using the Helvetica core fonts (WinAnsi encoding).
//! Text is punctuation-normalized and anything outside Latin-1 becomes `?`.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use super::font_metrics::{get_metrics, Face};
use super::{normalize_punctuation, ExportError};
use crate::session::TranscriptEntry;

// A4 in points, 10mm side/top margins and a 15mm bottom margin.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 28.0;
const MARGIN_TOP: f32 = 28.0;
const MARGIN_BOTTOM: f32 = 43.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X;

#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    face: Face,
    size: f32,
    x: f32,
    /// Baseline, measured from the bottom of the page.
    y: f32,
    text: String,
}

/// Cursor-based flow layout, one column, automatic page breaks.
struct PageFlow {
    pages: Vec<Vec<PlacedLine>>,
    cursor: f32,
}

impl PageFlow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            cursor: MARGIN_TOP,
        }
    }

    fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = MARGIN_TOP;
    }

    fn gap(&mut self, height: f32) {
        self.cursor += height;
    }

    fn place(&mut self, face: Face, size: f32, height: f32, text: String, centered: bool) {
        if self.pages.is_empty() || self.cursor + height > PAGE_HEIGHT - MARGIN_BOTTOM {
            self.add_page();
        }
        let x = if centered {
            let width = get_metrics(face).measure(&text, size);
            ((PAGE_WIDTH - width) / 2.0).max(MARGIN_X)
        } else {
            MARGIN_X
        };
        let y = PAGE_HEIGHT - self.cursor - (height + size) / 2.0;
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                face,
                size,
                x,
                y,
                text,
            });
        }
        self.cursor += height;
    }

    /// A single line that does not wrap.
    fn cell(&mut self, face: Face, size: f32, height: f32, text: &str, centered: bool) {
        self.place(face, size, height, prepare(text), centered);
    }

    /// Wrapped text; explicit newlines start new paragraphs.
    fn multi_cell(&mut self, face: Face, size: f32, height: f32, text: &str) {
        let metrics = get_metrics(face);
        for paragraph in prepare(text).split('\n') {
            for line in metrics.wrap(paragraph, size, TEXT_WIDTH) {
                self.place(face, size, height, line, false);
            }
        }
    }
}

fn prepare(text: &str) -> String {
    normalize_punctuation(text)
        .chars()
        .map(|c| match c {
            '\t' => ' ',
            '\r' => '\n',
            c if (c as u32) > 0xFF => '?',
            c => c,
        })
        .collect()
}

/// Latin-1 bytes for a prepared string; WinAnsi agrees with Latin-1 on printable code points.
fn to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn layout(rounds: &[TranscriptEntry], generated_at: &str) -> Vec<Vec<PlacedLine>> {
    use Face::{Helvetica as Regular, HelveticaBold as Bold};

    let mut flow = PageFlow::new();
    flow.add_page();
    flow.cell(Bold, 20.0, 28.0, "Interview Q&A Session History", true);
    flow.cell(Regular, 12.0, 28.0, &format!("Generated on: {generated_at}"), true);

    for (idx, entry) in rounds.iter().enumerate() {
        flow.add_page();
        flow.cell(Bold, 16.0, 28.0, &format!("Session {}", idx + 1), false);
        flow.cell(Regular, 10.0, 23.0, &format!("Timestamp: {}", entry.timestamp), false);
        flow.gap(14.0);

        flow.cell(Bold, 12.0, 23.0, "Job Role/JD:", false);
        flow.multi_cell(Regular, 10.0, 17.0, &entry.job_or_jd);
        flow.gap(8.0);

        if let Some(summary) = &entry.document_summary {
            flow.cell(Bold, 12.0, 23.0, "Document Summary:", false);
            flow.multi_cell(Regular, 10.0, 17.0, summary);
            flow.gap(8.0);
        }

        flow.cell(Bold, 12.0, 23.0, "Settings:", false);
        flow.multi_cell(
            Regular,
            10.0,
            17.0,
            &format!(
                "Category: {}, Difficulty: {}, Experience: {}",
                entry.category.label(),
                entry.difficulty.label(),
                entry.experience_level.label()
            ),
        );
        flow.gap(8.0);

        flow.cell(Bold, 12.0, 23.0, "Generated Q&A:", false);
        flow.multi_cell(Regular, 10.0, 17.0, &entry.qas);
        flow.gap(8.0);

        if !entry.evaluations.is_empty() {
            flow.cell(Bold, 12.0, 23.0, "Answer Evaluations:", false);
            for (eval_idx, evaluation) in entry.evaluations.iter().enumerate() {
                flow.cell(Bold, 10.0, 17.0, &format!("Evaluation {}:", eval_idx + 1), false);
                flow.multi_cell(Regular, 10.0, 14.0, &format!("Question: {}", evaluation.question));
                flow.multi_cell(
                    Regular,
                    10.0,
                    14.0,
                    &format!("User Answer: {}", evaluation.user_answer),
                );
                flow.multi_cell(Regular, 10.0, 14.0, &format!("Feedback: {}", evaluation.feedback));
                flow.gap(6.0);
            }
        }
    }

    flow.pages
}

fn page_content(lines: &[PlacedLine]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.face.resource_name().into(), Object::Real(line.size.into())],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x.into()), Object::Real(line.y.into())],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(to_latin1(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

fn font_object(doc: &mut Document, face: Face) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => face.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}

fn serialize(pages: &[Vec<PlacedLine>]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = font_object(&mut doc, Face::Helvetica);
    let bold_id = font_object(&mut doc, Face::HelveticaBold);
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Face::Helvetica.resource_name() => regular_id,
            Face::HelveticaBold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let encoded = page_content(lines)
            .encode()
            .map_err(|e| ExportError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH.into()), Object::Real(PAGE_HEIGHT.into())],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ExportError::Pdf(e.to_string()))?;
    Ok(bytes)
}

/// Renders the transcript as a PDF. `Ok(None)` when there is nothing to export.
pub fn export_pdf(
    rounds: &[TranscriptEntry],
    generated_at: &str,
) -> Result<Option<Vec<u8>>, ExportError> {
    if rounds.is_empty() {
        return Ok(None);
    }
    serialize(&layout(rounds, generated_at)).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transcript::tests::{sample_entry, sample_evaluation};

    fn all_text(pages: &[Vec<PlacedLine>]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.iter().map(|l| l.text.clone()))
            .collect()
    }

    #[test]
    fn test_empty_transcript_exports_nothing() {
        assert!(export_pdf(&[], "now").unwrap().is_none());
    }

    #[test]
    fn test_export_produces_pdf_bytes() {
        let mut entry = sample_entry("Backend Engineer");
        entry.evaluations.push(sample_evaluation());
        let bytes = export_pdf(&[entry], "2026-01-01 10:00:00").unwrap().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let tail = String::from_utf8_lossy(&bytes[bytes.len().saturating_sub(32)..]).to_string();
        assert!(tail.contains("%%EOF"));
    }

    #[test]
    fn test_layout_title_page_then_one_page_per_round() {
        let pages = layout(&[sample_entry("a"), sample_entry("b")], "now");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0][0].text, "Interview Q&A Session History");
        assert_eq!(pages[1][0].text, "Session 1");
        assert_eq!(pages[2][0].text, "Session 2");
    }

    #[test]
    fn test_long_answer_overflows_to_new_page() {
        let mut entry = sample_entry("a");
        entry.qas = (0..120)
            .map(|i| format!("{i}. A question line"))
            .collect::<Vec<_>>()
            .join("\n");
        let pages = layout(&[entry], "now");
        assert!(pages.len() > 2);
        for page in &pages {
            for line in page {
                assert!(line.y >= MARGIN_BOTTOM - 28.0, "line below margin: {line:?}");
            }
        }
    }

    #[test]
    fn test_text_normalized_before_layout() {
        let mut entry = sample_entry("Senior \u{2014} \u{201C}Platform\u{201D} \u{2022} \u{4E2D}");
        entry.qas = "It\u{2019}s fine".to_string();
        let text = all_text(&layout(&[entry], "now"));
        assert!(text.contains(&"Senior - \"Platform\" * ?".to_string()));
        assert!(text.contains(&"It's fine".to_string()));
    }

    #[test]
    fn test_latin1_encoding() {
        assert_eq!(to_latin1("café"), vec![b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_centered_title_is_indented() {
        let pages = layout(&[sample_entry("a")], "now");
        assert!(pages[0][0].x > MARGIN_X);
        assert_eq!(pages[1][0].x, MARGIN_X);
    }
}
