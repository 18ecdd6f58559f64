//! Plain text from TEI-XML documents

use regex::{Captures, Regex};

/// Tags that end a line of running text
const BLOCK_TAGS: &str = "p|div|head|l|lg|lb|br|ab|item|list|note|opener|closer|salute|signed|dateline|pb";

/// Extracts readable text from TEI-XML
///
/// Takes the content of `<body>`, falling back to `<text>` and then the
/// whole document. Markup is removed, character entities are decoded and
/// whitespace is collapsed to one space per line.
#[derive(Debug, Clone)]
pub struct TeiReader {
    comments: Regex,
    body: Regex,
    text: Regex,
    block_tags: Regex,
    tags: Regex,
    entities: Regex,
}

impl TeiReader {
    /// Compile the patterns
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            comments: Regex::new(r"(?s)<!--.*?-->")?,
            body: Regex::new(r"(?s)<body\b[^>]*>(.*?)</body\s*>")?,
            text: Regex::new(r"(?s)<text\b[^>]*>(.*?)</text\s*>")?,
            block_tags: Regex::new(&format!(r"(?i)</?(?:{})\b[^>]*>", BLOCK_TAGS))?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            entities: Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);")?,
        })
    }

    /// Extract the text of a TEI document
    ///
    /// # Examples
    ///
    /// ```
    /// use triplex_source::TeiReader;
    ///
    /// let reader = TeiReader::new().unwrap();
    /// let xml = "<TEI><teiHeader><title>Kopf</title></teiHeader>\
    ///            <text><body><p>Lieber  Freund,</p><p>Gr&#252;&#223;e &amp; mehr</p></body></text></TEI>";
    /// assert_eq!(reader.extract(xml), "Lieber Freund,\nGrüße & mehr");
    /// ```
    pub fn extract(&self, xml: &str) -> String {
        let xml = self.comments.replace_all(xml, "");

        let section = self
            .body
            .captures(&xml)
            .or_else(|| self.text.captures(&xml))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(xml.as_ref());

        let lines = self.block_tags.replace_all(section, "\n");
        let stripped = self.tags.replace_all(&lines, "");
        let decoded = self.entities.replace_all(&stripped, |caps: &Captures| decode_entity(caps));

        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn decode_entity(caps: &Captures) -> String {
    let whole = &caps[0];
    let name = &caps[1];

    let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => None,
        }
    };

    decoded.map(String::from).unwrap_or_else(|| whole.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader() -> TeiReader {
        TeiReader::new().unwrap()
    }

    #[test]
    fn test_body_preferred_over_header() {
        let xml = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
            <teiHeader><fileDesc><title>Brief 12</title></fileDesc></teiHeader>
            <text><front><p>Vorwort</p></front><body><p>Inhalt</p></body></text>
        </TEI>"#;
        assert_eq!(reader().extract(xml), "Inhalt");
    }

    #[test]
    fn test_text_fallback() {
        let xml = "<TEI><text><p>Nur text</p></text></TEI>";
        assert_eq!(reader().extract(xml), "Nur text");
    }

    #[test]
    fn test_whole_document_fallback() {
        let xml = "<doc><p>Erster</p><p>Zweiter</p></doc>";
        assert_eq!(reader().extract(xml), "Erster\nZweiter");
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let xml = "<body><p>Bay<hi rend=\"i\">reuth</hi> im <persName ref=\"#jp\">Jean Paul</persName></p></body>";
        assert_eq!(reader().extract(xml), "Bayreuth im Jean Paul");
    }

    #[test]
    fn test_line_breaks_and_comments() {
        let xml = "<body><l>Zeile eins<lb/>Zeile zwei</l><!-- <p>versteckt</p> --></body>";
        assert_eq!(reader().extract(xml), "Zeile eins\nZeile zwei");
    }

    #[test]
    fn test_entities() {
        let xml = "<body><p>&lt;a&gt; &quot;b&quot; &#x41; &unknown;</p></body>";
        assert_eq!(reader().extract(xml), "<a> \"b\" A &unknown;");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(reader().extract("<body>   </body>"), "");
    }
}
