pub fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_escapes_ampersand_first() {
        assert_eq!(xml_escape("&lt;"), "&amp;lt;");
        assert_eq!(xml_escape("\"a\" & 'b'"), "&quot;a&quot; &amp; &apos;b&apos;");
    }

    #[test]
    fn xml_escape_preserves_utf8_text() {
        assert_eq!(xml_escape("日本語のテスト"), "日本語のテスト");
    }
}
