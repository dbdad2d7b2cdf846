//! Office Open XML (docx, xlsx, pptx).
//!
//! Each format is a zip archive of XML parts. Text lives in run elements
//! (`w:t`, `t`, `a:t`) grouped into paragraphs (`w:p`, `si`, `a:p`).

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::ExtractionError;

use super::ContentExtractor;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Uncompressed XML read from one archive, across all parts
const MAX_XML_BYTES: u64 = 64 * 1024 * 1024;

/// Element names for one XML dialect.
struct TextTags {
    run: &'static str,
    paragraph: &'static str,
}

const WORD_TAGS: TextTags = TextTags {
    run: "w:t",
    paragraph: "w:p",
};
const SHEET_TAGS: TextTags = TextTags {
    run: "t",
    paragraph: "si",
};
const SLIDE_TAGS: TextTags = TextTags {
    run: "a:t",
    paragraph: "a:p",
};

#[derive(Debug, Default, Clone, Copy)]
pub struct OoxmlExtractor;

impl ContentExtractor for OoxmlExtractor {
    fn name(&self) -> &'static str {
        "ooxml"
    }

    fn supports(&self, mime_type: &str) -> bool {
        matches!(mime_type, DOCX_MIME | XLSX_MIME | PPTX_MIME)
    }

    fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractionError::corrupt("OOXML", format!("invalid archive: {}", e)))?;

        match mime_type {
            DOCX_MIME => {
                let xml = read_part(&mut archive, "word/document.xml", MAX_XML_BYTES)?
                    .ok_or_else(|| ExtractionError::corrupt("DOCX", "no word/document.xml"))?;
                Ok(xml_text(&xml, &WORD_TAGS))
            }
            // A workbook with only numbers has no shared strings part
            XLSX_MIME => Ok(read_part(&mut archive, "xl/sharedStrings.xml", MAX_XML_BYTES)?
                .map(|xml| xml_text(&xml, &SHEET_TAGS))
                .unwrap_or_default()),
            PPTX_MIME => {
                let mut slides: Vec<(u32, String)> = archive
                    .file_names()
                    .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
                    .collect();
                slides.sort();

                let mut text = String::new();
                let mut budget = MAX_XML_BYTES;
                for (_, name) in slides {
                    if let Some(xml) = read_part(&mut archive, &name, budget)? {
                        budget = budget.saturating_sub(xml.len() as u64);
                        let slide = xml_text(&xml, &SLIDE_TAGS);
                        if slide.is_empty() {
                            continue;
                        }
                        if !text.is_empty() {
                            text.push_str("\n\n");
                        }
                        text.push_str(&slide);
                    }
                }
                Ok(text)
            }
            other => Err(ExtractionError::Unsupported(other.to_string())),
        }
    }
}

/// Read one XML part, refusing to inflate more than `limit` bytes.
fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    limit: u64,
) -> Result<Option<String>, ExtractionError> {
    let too_large = || {
        ExtractionError::corrupt(
            "OOXML",
            format!("{} exceeds {} bytes uncompressed", name, limit),
        )
    };
    let part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ExtractionError::corrupt(
                "OOXML",
                format!("{}: {}", name, e),
            ))
        }
    };
    // The declared size can lie, so the read is bounded as well
    if part.size() > limit {
        return Err(too_large());
    }
    let mut xml = String::new();
    part.take(limit.saturating_add(1))
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::corrupt("OOXML", format!("{}: {}", name, e)))?;
    if xml.len() as u64 > limit {
        return Err(too_large());
    }
    Ok(Some(xml))
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect the character data of `run` elements, one line per `paragraph`.
fn xml_text(xml: &str, tags: &TextTags) -> String {
    let mut result = String::new();
    let mut in_run = false;
    let mut chars = xml.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            if in_run {
                result.push(c);
            }
            continue;
        }

        let mut tag = String::new();
        for tc in chars.by_ref() {
            if tc == '>' {
                break;
            }
            tag.push(tc);
        }

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .split(|ch: char| ch.is_whitespace() || ch == '/')
            .next()
            .unwrap_or_default();

        if name == tags.run {
            in_run = !closing && !self_closing;
        } else if name == tags.paragraph && !closing && !result.is_empty() && !result.ends_with('\n')
        {
            result.push('\n');
        }
    }

    decode_entities(result.trim_end())
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_archive(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_docx_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> world</w:t></w:r></w:p>
            <w:p><w:r><w:t>Fish &amp; chips</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
        </w:body></w:document>"#;
        let bytes = build_archive(&[("word/document.xml", xml)]);

        let text = OoxmlExtractor.extract_text(&bytes, DOCX_MIME).unwrap();
        assert_eq!(text, "Hello world\nFish & chips\ncell");
    }

    #[test]
    fn test_docx_without_body_is_corrupt() {
        let bytes = build_archive(&[("word/styles.xml", "<w:styles/>")]);
        let err = OoxmlExtractor.extract_text(&bytes, DOCX_MIME).unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { format: "DOCX", .. }));
    }

    #[test]
    fn test_xlsx_shared_strings() {
        let xml = r#"<sst><si><t>Revenue</t></si><si><r><t>Q1</t></r><r><t> total</t></r></si></sst>"#;
        let bytes = build_archive(&[("xl/sharedStrings.xml", xml)]);
        let text = OoxmlExtractor.extract_text(&bytes, XLSX_MIME).unwrap();
        assert_eq!(text, "Revenue\nQ1 total");

        let numbers_only = build_archive(&[("xl/workbook.xml", "<workbook/>")]);
        assert_eq!(OoxmlExtractor.extract_text(&numbers_only, XLSX_MIME).unwrap(), "");
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let slide = |t: &str| format!("<p:sld><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:sld>", t);
        let s2 = slide("second");
        let s10 = slide("tenth");
        let s1 = slide("first");
        let bytes = build_archive(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
        ]);
        let text = OoxmlExtractor.extract_text(&bytes, PPTX_MIME).unwrap();
        assert_eq!(text, "first\n\nsecond\n\ntenth");
    }

    #[test]
    fn test_oversized_part_is_refused() {
        let body = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", "a".repeat(4096));
        let bytes = build_archive(&[("word/document.xml", body.as_str())]);
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let err = read_part(&mut archive, "word/document.xml", 1024).unwrap_err();
        assert!(err.to_string().contains("exceeds 1024 bytes"));

        let xml = read_part(&mut archive, "word/document.xml", MAX_XML_BYTES)
            .unwrap()
            .unwrap();
        assert_eq!(xml.len(), body.len());
        assert!(read_part(&mut archive, "missing.xml", 1024).unwrap().is_none());
    }

    #[test]
    fn test_not_a_zip() {
        let err = OoxmlExtractor.extract_text(b"plain bytes", DOCX_MIME).unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { .. }));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt;b&gt; &#65;&#x42; & c"), "a <b> AB & c");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }
}
