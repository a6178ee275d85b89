//! Output Sanitizer
//!
//! Escapes markup in produced answers before they leave the gate, so an
//! answer rendered in a browser or chat client is shown as text.

/// Result of sanitizing one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationResult {
    /// Escaped output
    pub output: String,
    /// Whether any character was escaped
    pub modified: bool,
    /// Number of characters escaped
    pub escaped: usize,
}

/// Markup-escaping sanitizer.
#[derive(Debug, Clone)]
pub struct OutputSanitizer {
    /// Maximum output length in bytes (truncated on a char boundary)
    max_length: usize,
}

impl OutputSanitizer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Escape `& < > " '` and enforce the length limit.
    pub fn sanitize(&self, output: &str) -> SanitizationResult {
        let trimmed = truncate_char_boundary(output, self.max_length);
        let mut escaped = 0;
        let mut result = String::with_capacity(trimmed.len());

        for c in trimmed.chars() {
            match escape_char(c) {
                Some(entity) => {
                    result.push_str(entity);
                    escaped += 1;
                }
                None => result.push(c),
            }
        }

        SanitizationResult {
            modified: escaped > 0 || trimmed.len() != output.len(),
            output: result,
            escaped,
        }
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new(100_000)
    }
}

/// Escape markup characters with default limits.
pub fn escape_markup(text: &str) -> String {
    OutputSanitizer::default().sanitize(text).output
}

fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#x27;"),
        _ => None,
    }
}

fn truncate_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_script_tag() {
        let out = escape_markup("<script>alert('x')</script>");
        assert_eq!(
            out,
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_ampersand_escaped_once() {
        assert_eq!(escape_markup("a & b"), "a &amp; b");
        assert_eq!(escape_markup("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_plain_text_untouched() {
        let result = OutputSanitizer::default().sanitize("Secure AI response: hello");
        assert!(!result.modified);
        assert_eq!(result.escaped, 0);
        assert_eq!(result.output, "Secure AI response: hello");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let sanitizer = OutputSanitizer::new(5);
        let result = sanitizer.sanitize("héllo world");
        assert!(result.modified);
        assert!(result.output.len() <= 5);
        assert!(result.output.starts_with('h'));
    }

    #[test]
    fn test_counts_escapes() {
        let result = OutputSanitizer::default().sanitize("\"<>\"");
        assert_eq!(result.escaped, 4);
        assert_eq!(result.output, "&quot;&lt;&gt;&quot;");
    }
}
