//! Renders saved answers into a fresh PDF.
//!
//! Layout mirrors a plain report: a centred title followed by numbered
//! `Q{n}` / `A{n}` blocks, word-wrapped to the page width with automatic page
//! breaks. Courier is used so line widths are exact without font metrics.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

use crate::session::QaRecord;

pub const EXPORT_TITLE: &str = "Saved Q&A from Notes to PDF";

// A4 portrait, in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 57;
const MARGIN_TOP: i64 = 57;
const MARGIN_BOTTOM: i64 = 43; // 15 mm

const BODY_FONT_SIZE: i64 = 11;
const BODY_LEADING: i64 = 15;
const TITLE_FONT_SIZE: i64 = 14;
const TITLE_LEADING: i64 = 28;

// Courier advance width is 600/1000 em
const BODY_CHARS_PER_LINE: usize =
    ((PAGE_WIDTH - 2 * MARGIN_LEFT) * 1000 / (600 * BODY_FONT_SIZE)) as usize;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("PDF generation error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error while writing PDF: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Title(String),
    Body(String),
    Blank,
}

/// Renders `records` and writes them to a new temporary `.pdf` file.
///
/// The returned [`TempPath`] removes the file when dropped; callers deliver the
/// content and then `close()` it to surface removal errors.
pub fn export_answers_to_pdf(records: &[QaRecord]) -> Result<TempPath, ExportError> {
    let bytes = render_answers_pdf(records)?;

    let mut file = tempfile::Builder::new()
        .prefix("saved_answers_")
        .suffix(".pdf")
        .tempfile()?;
    std::io::Write::write_all(file.as_file_mut(), &bytes)?;
    file.as_file_mut().sync_all()?;

    let path = file.into_temp_path();
    info!(path = %path.display(), records = records.len(), size = bytes.len(), "Exported answers to PDF");
    Ok(path)
}

/// Renders `records` into PDF bytes.
pub fn render_answers_pdf(records: &[QaRecord]) -> Result<Vec<u8>, ExportError> {
    let lines = layout_lines(records);
    let pages = paginate(&lines);
    debug!(lines = lines.len(), pages = pages.len(), "Laid out export document");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let title_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font_id,
            "F2" => title_font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in &pages {
        let page_id = add_page(&mut doc, pages_id, resources_id, page)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    lines: &[Line],
) -> Result<ObjectId, ExportError> {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    for line in lines {
        match line {
            Line::Title(text) => {
                let width = text.chars().count() as i64 * 600 * TITLE_FONT_SIZE / 1000;
                let x = ((PAGE_WIDTH - width) / 2).max(MARGIN_LEFT);
                push_text(&mut operations, "F2", TITLE_FONT_SIZE, x, y, text);
                y -= TITLE_LEADING;
            }
            Line::Body(text) => {
                push_text(&mut operations, "F1", BODY_FONT_SIZE, MARGIN_LEFT, y, text);
                y -= BODY_LEADING;
            }
            Line::Blank => y -= BODY_LEADING,
        }
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    });
    Ok(page_id)
}

fn push_text(operations: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, text: &str) {
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new("Tf", vec![font.into(), size.into()]));
    operations.push(Operation::new("Td", vec![x.into(), y.into()]));
    operations.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
    ));
    operations.push(Operation::new("ET", vec![]));
}

/// Flattens records into wrapped lines: title, gap, then one block per record.
fn layout_lines(records: &[QaRecord]) -> Vec<Line> {
    let mut lines = vec![Line::Title(EXPORT_TITLE.to_string()), Line::Blank];

    for (idx, record) in records.iter().enumerate() {
        let n = idx + 1;
        let question = format!("Q{}: {}", n, record.question_or_placeholder());
        let answer = format!("A{}: {}", n, record.answer_or_placeholder());
        for text in [question, answer] {
            lines.extend(
                wrap_text(&text, BODY_CHARS_PER_LINE)
                    .into_iter()
                    .map(Line::Body),
            );
        }
        lines.push(Line::Blank);
    }

    lines
}

/// Splits lines across pages, breaking before the bottom margin.
fn paginate(lines: &[Line]) -> Vec<Vec<Line>> {
    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    for line in lines {
        let leading = match line {
            Line::Title(_) => TITLE_LEADING,
            _ => BODY_LEADING,
        };
        if y - leading < MARGIN_BOTTOM && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            y = PAGE_HEIGHT - MARGIN_TOP;
            // no leading blank line at the top of a page
            if *line == Line::Blank {
                continue;
            }
        }
        current.push(line.clone());
        y -= leading;
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

/// Word-wraps `text` to `width` characters. Explicit newlines are kept and
/// words longer than a line are hard-split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();

    for raw_line in text.lines() {
        let raw_line = raw_line.replace('\t', "    ");
        let mut current = String::new();
        let mut current_len = 0;

        for word in raw_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if current_len > 0 {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                out.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 { word.len() } else { word.len() + 1 };
            if current_len + needed > width {
                out.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }

        out.push(current);
    }

    if out.is_empty() {
        out.push(String::new());
    }
    out
}

/// Encodes text for the standard Type1 fonts. Characters outside WinAnsi become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pdf::extract_document_text;

    fn exported_text(records: &[QaRecord]) -> String {
        let bytes = render_answers_pdf(records).expect("render");
        extract_document_text(&bytes).text
    }

    #[test]
    fn single_record_round_trip() {
        let records: Vec<QaRecord> = serde_json::from_value(serde_json::json!([
            { "question": "What is X?", "answer": "X is Y." }
        ]))
        .expect("records");

        let text = exported_text(&records);
        assert!(text.contains(EXPORT_TITLE));
        assert!(text.contains("Q1: What is X?"));
        assert!(text.contains("A1: X is Y."));
    }

    #[test]
    fn records_are_numbered_in_insertion_order() {
        let records = vec![
            QaRecord::new("alpha?", "first"),
            QaRecord::new("beta?", "second"),
            QaRecord::new("gamma?", "third"),
        ];

        let text = exported_text(&records);
        let q1 = text.find("Q1: alpha?").expect("q1");
        let q2 = text.find("Q2: beta?").expect("q2");
        let q3 = text.find("Q3: gamma?").expect("q3");
        assert!(q1 < q2 && q2 < q3);
        assert!(!text.contains("Q4:"));
        assert!(text.contains("A3: third"));
    }

    #[test]
    fn missing_answer_uses_placeholder() {
        let records: Vec<QaRecord> =
            serde_json::from_value(serde_json::json!([{ "question": "Lonely?" }]))
                .expect("records");

        let text = exported_text(&records);
        assert!(text.contains("Q1: Lonely?"));
        assert!(text.contains("A1: N/A Answer"));
    }

    #[test]
    fn long_ledgers_spill_onto_more_pages() {
        let records: Vec<QaRecord> = (0..60)
            .map(|i| QaRecord::new(format!("question {}", i), "an answer"))
            .collect();
        let pages = paginate(&layout_lines(&records));
        assert!(pages.len() > 1);

        let bytes = render_answers_pdf(&records).expect("render");
        let doc = extract_document_text(&bytes);
        assert_eq!(doc.page_count, pages.len());
        assert!(doc.text.contains("Q60: question 59"));
    }

    #[test]
    fn export_writes_temp_file_that_close_removes() {
        let path = export_answers_to_pdf(&[QaRecord::new("q", "a")]).expect("export");
        let on_disk = path.to_path_buf();
        let bytes = std::fs::read(&on_disk).expect("read");
        assert!(bytes.starts_with(b"%PDF-"));

        path.close().expect("remove");
        assert!(!on_disk.exists());
    }

    #[test]
    fn wraps_on_word_boundaries() {
        assert_eq!(
            wrap_text("the quick brown fox", 9),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("one\n\ntwo", 10), vec!["one", "", "two"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn non_latin_glyphs_degrade_to_question_marks() {
        assert_eq!(encode_win_ansi("café – ok"), b"caf\xe9 \x96 ok".to_vec());
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }
}
