//! DOCX body text: paragraphs from `word/document.xml`, one per line.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::documents::extract::ExtractError;

const BODY_PART: &str = "word/document.xml";

pub fn docx_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Parse(format!("not a docx archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(BODY_PART)
        .map_err(|e| ExtractError::Parse(format!("{BODY_PART} missing: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Parse(format!("{BODY_PART} unreadable: {e}")))?;

    body_text(&xml)
}

/// Collects `w:t` runs; `w:tab` and `w:br` become whitespace, `w:p` ends a line.
fn body_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_run_text => {
                let run = t
                    .unescape()
                    .map_err(|e| ExtractError::Parse(format!("bad text run: {e}")))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Parse(format!(
                    "malformed {BODY_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(text)
}
