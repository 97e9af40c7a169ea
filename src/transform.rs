//! Best-effort content minification before framing.
//!
//! Dispatches on file extension to a regex-based comment stripper, then
//! normalizes whitespace: trailing whitespace trimmed, runs of blank
//! lines collapsed to one, leading and trailing blank lines removed.
//! Pure and infallible; pathological inputs (string literals containing
//! comment markers) may come out syntactically altered. The output feeds
//! a language model, not a compiler.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Comment grammar families the minifiers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    /// `//` line comments plus `/* */` blocks (C#, Rust, JS/TS, Go, ...).
    CLike,
    /// Full-line `#` comments (Python, shell, YAML, TOML, ...).
    Hash,
    /// `--` line comments plus `/* */` blocks.
    Sql,
    /// `<!-- -->` blocks (HTML, XML, XAML, csproj, ...).
    Markup,
    /// `/* */` blocks only (CSS and friends).
    BlockOnly,
    /// Whitespace cleanup only.
    Plain,
}

fn style_for(extension: &str) -> CommentStyle {
    match extension {
        "cs" | "c" | "h" | "cpp" | "hpp" | "cc" | "java" | "js" | "jsx" | "mjs" | "cjs" | "ts"
        | "tsx" | "go" | "rs" | "kt" | "kts" | "swift" | "scala" | "dart" => CommentStyle::CLike,
        "py" | "pyi" | "sh" | "bash" | "rb" | "yaml" | "yml" | "toml" | "cfg" | "ini"
        | "properties" | "dockerfile" | "makefile" => CommentStyle::Hash,
        "sql" => CommentStyle::Sql,
        "html" | "htm" | "xml" | "xaml" | "csproj" | "vbproj" | "props" | "targets" | "config"
        | "svg" | "razor" | "cshtml" => CommentStyle::Markup,
        "css" | "scss" | "less" => CommentStyle::BlockOnly,
        _ => CommentStyle::Plain,
    }
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"))
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Requires start-of-line or whitespace before `//` so protocol
    // separators like `https://` survive.
    RE.get_or_init(|| Regex::new(r"(?m)(^|\s)//[^\n]*").expect("valid regex"))
}

fn hash_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*#[^\n]*").expect("valid regex"))
}

fn sql_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(^|\s)--[^\n]*").expect("valid regex"))
}

fn markup_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

/// Transform raw file content for framing.
///
/// Never fails; unknown extensions get whitespace cleanup only.
pub fn transform(path: &Path, raw: &str) -> String {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stripped = strip_comments(raw, style_for(&extension));
    cleanup(&stripped)
}

fn strip_comments(text: &str, style: CommentStyle) -> String {
    match style {
        CommentStyle::CLike => {
            let text = block_comment_re().replace_all(text, "");
            line_comment_re().replace_all(&text, "$1").into_owned()
        }
        CommentStyle::Hash => hash_comment_re().replace_all(text, "").into_owned(),
        CommentStyle::Sql => {
            let text = block_comment_re().replace_all(text, "");
            sql_comment_re().replace_all(&text, "$1").into_owned()
        }
        CommentStyle::Markup => markup_comment_re().replace_all(text, "").into_owned(),
        CommentStyle::BlockOnly => block_comment_re().replace_all(text, "").into_owned(),
        CommentStyle::Plain => text.to_string(),
    }
}

/// Trim trailing whitespace, collapse blank runs, drop edge blanks.
fn cleanup(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = true; // swallows leading blanks
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            if !prev_blank {
                lines.push("");
            }
            prev_blank = true;
        } else {
            lines.push(trimmed);
            prev_blank = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, raw: &str) -> String {
        transform(Path::new(name), raw)
    }

    #[test]
    fn test_clike_comments_stripped() {
        let out = apply(
            "program.cs",
            "// header\nclass P {\n    /* block\n       comment */\n    int x; // trailing\n}\n",
        );
        assert_eq!(out, "class P {\n\n    int x;\n}\n");
    }

    #[test]
    fn test_protocol_separator_survives() {
        let out = apply("config.cs", "var url = \"https://example.com\";\n");
        assert!(out.contains("https://example.com"));
    }

    #[test]
    fn test_hash_comments_full_line_only() {
        let out = apply("script.py", "# module docs\nx = 1\ncolor = \"#fff\"\n");
        assert_eq!(out, "x = 1\ncolor = \"#fff\"\n");
    }

    #[test]
    fn test_sql_comments() {
        let out = apply("schema.sql", "-- drop first\nSELECT 1; -- inline\n/* block */\n");
        assert_eq!(out, "SELECT 1;\n");
    }

    #[test]
    fn test_markup_comments() {
        let out = apply("page.html", "<!-- nav\n bar -->\n<div>hi</div>\n");
        assert_eq!(out, "<div>hi</div>\n");
    }

    #[test]
    fn test_css_block_comments() {
        let out = apply("site.css", "/* reset */\nbody { margin: 0; }\n");
        assert_eq!(out, "body { margin: 0; }\n");
    }

    #[test]
    fn test_unknown_extension_cleanup_only() {
        let out = apply("notes.weird", "// not stripped   \n\n\n\ntext\n");
        assert_eq!(out, "// not stripped\n\ntext\n");
    }

    #[test]
    fn test_blank_runs_collapsed_and_edges_trimmed() {
        let out = apply("a.txt", "\n\n\nfirst\n\n\n\nsecond   \n\n\n");
        assert_eq!(out, "first\n\nsecond\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(apply("a.rs", ""), "");
        assert_eq!(apply("a.rs", "   \n\n  \n"), "");
    }

    #[test]
    fn test_json_untouched_besides_whitespace() {
        let out = apply("data.json", "{\n  \"a\": \"x // y\"\n}\n");
        assert_eq!(out, "{\n  \"a\": \"x // y\"\n}\n");
    }
}
