//! HTML body shaping for tool output.
//!
//! Confluence bodies are (X)HTML. Agents read Markdown far more cheaply,
//! so the get-content tool converts first and then truncates.

/// Line width handed to the converter. Wide enough that it never wraps
/// prose; Markdown consumers reflow anyway.
const RENDER_WIDTH: usize = 10_000;

/// Converts an HTML fragment to Markdown-flavoured text.
///
/// Blank input yields an empty string. If the converter rejects the
/// input, the HTML is returned inside a fenced `html` block so nothing is
/// lost.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    match html2text::config::plain().string_from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) => normalize(&text),
        Err(e) => {
            tracing::debug!(error = %e, "html conversion failed; returning fenced html");
            normalize(&format!("````html\n{}\n````", html))
        }
    }
}

/// Cuts `s` to at most `max_chars` characters (not bytes).
///
/// Returns the possibly shortened text and whether anything was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (s[..byte_idx].to_string(), true),
        None => (s.to_string(), false),
    }
}

/// Strips trailing blanks on each line and collapses runs of blank lines.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let (text, cut) = truncate_chars("héllo wörld", 5);
        assert_eq!(text, "héllo");
        assert!(cut);

        let (text, cut) = truncate_chars("日本語テキスト", 3);
        assert_eq!(text, "日本語");
        assert!(cut);
    }

    #[test]
    fn test_truncate_at_exact_length_is_untouched() {
        let (text, cut) = truncate_chars("abcde", 5);
        assert_eq!(text, "abcde");
        assert!(!cut);

        let (text, cut) = truncate_chars("", 10);
        assert_eq!(text, "");
        assert!(!cut);
    }

    #[test]
    fn test_blank_html_is_empty() {
        assert_eq!(html_to_markdown("   \n "), "");
    }

    #[test]
    fn test_html_converts_to_text() {
        let md = html_to_markdown("<h1>Deploy</h1><p>Run the <strong>pipeline</strong>.</p>");
        assert!(md.contains("Deploy"));
        assert!(md.contains("pipeline"));
        assert!(!md.contains("<p>"));
        assert!(!md.contains("<strong>"));
    }

    #[test]
    fn test_normalize_collapses_blank_lines() {
        assert_eq!(normalize("a  \n\n\n\nb\t\n\n"), "a\n\nb");
    }
}
