use crate::xml::xml_escape;

/// Leading indent for every paragraph; numeric so the page stays valid XHTML.
const PARAGRAPH_INDENT: &str = "&#160;&#160;";
const LINE_SEPARATOR: &str = "<br />";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedChapter {
    /// First non-blank line of the chapter, trimmed.
    pub description: String,
    /// One `<p>` per non-blank line, in source order.
    pub body_html: String,
}

/// Turns extracted text lines into a summary and body markup.
///
/// Returns `None` when every line is blank; callers drop such chapters.
pub fn format_lines<I, S>(lines: I) -> Option<FormattedChapter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut description: Option<String> = None;
    let mut paragraphs = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        if description.is_none() {
            description = Some(line.to_owned());
        }
        paragraphs.push(format!("<p>{PARAGRAPH_INDENT}{}</p>", xml_escape(line)));
    }

    let description = description?;
    Some(FormattedChapter {
        description,
        body_html: paragraphs.join(LINE_SEPARATOR),
    })
}
