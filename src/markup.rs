//! Markdown to Confluence wiki-markup conversion.
//!
//! The destination wiki stores page bodies in its own markup dialect, so
//! uploaded Markdown is rewritten before page creation. The conversion is a
//! small set of line-anchored regex passes over the text, each a pure
//! `&str → String` function with no shared state.
//!
//! ## What gets converted
//!
//! | Markdown | Wiki markup |
//! |----------|-------------|
//! | `# Title` / `## Title` / `### Title` | `h1. Title` / `h2. Title` / `h3. Title` |
//! | `- item` | `* item` |
//! | `![alt](url "caption")` | `!url|alt=alt,title=caption!` |
//!
//! ## Known limitations
//!
//! Headings of level 4 and deeper, bold, italic, links, tables, and code
//! blocks pass through unchanged. The wiki renders unconverted Markdown as
//! literal text; pages that rely on those constructs need a richer
//! converter. A second pass over already-converted text leaves the
//! untouched constructs untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Category used when a document carries no `## Category` line.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

// ── Heading conversion ───────────────────────────────────────────────────

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)").unwrap());
static RE_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.*)").unwrap());
static RE_H3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.*)").unwrap());

// ── Bullet lists ─────────────────────────────────────────────────────────

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^- (.*)").unwrap());

// ── Inline images ────────────────────────────────────────────────────────
//
// `![alt](url "caption")` with the caption clause optional. The unmatched
// caption group expands to an empty string in the replacement, which yields
// an empty `title=` attribute exactly when the Markdown had no caption.

static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"!\[([^\]]*)\]\(([^)"\s]+)(?:\s+"([^"]*)")?\)"#).unwrap());

// ── Category line ────────────────────────────────────────────────────────

static RE_CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## Category (.*)").unwrap());

/// Convert Markdown text to Confluence wiki markup.
///
/// Deterministic and side-effect free. Headings of level 1 to 3, `- `
/// bullets, and inline image references are rewritten; every other line is
/// preserved byte for byte.
pub fn to_wiki_markup(markdown: &str) -> String {
    let s = RE_H1.replace_all(markdown, "h1. ${1}");
    let s = RE_H2.replace_all(&s, "h2. ${1}");
    let s = RE_H3.replace_all(&s, "h3. ${1}");
    let s = RE_BULLET.replace_all(&s, "* ${1}");
    RE_IMAGE
        .replace_all(&s, "!${2}|alt=${1},title=${3}!")
        .into_owned()
}

/// Extract the document category from raw Markdown.
///
/// The category is the value of the first `## Category <value>` line,
/// trimmed. Documents without one fall back to [`DEFAULT_CATEGORY`]. Runs
/// on the raw Markdown, before conversion, since conversion rewrites the
/// `##` marker.
pub fn category(markdown: &str) -> String {
    RE_CATEGORY
        .captures(markdown)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_headings_level_1_to_3() {
        assert_eq!(to_wiki_markup("# Title"), "h1. Title");
        assert_eq!(to_wiki_markup("## Title"), "h2. Title");
        assert_eq!(to_wiki_markup("### Title"), "h3. Title");
    }

    #[test]
    fn level_4_heading_passes_through() {
        assert_eq!(to_wiki_markup("#### Title"), "#### Title");
    }

    #[test]
    fn heading_marker_mid_line_is_not_converted() {
        assert_eq!(to_wiki_markup("see # Title"), "see # Title");
    }

    #[test]
    fn converts_bullets() {
        let input = "- first\n- second\nnot a - bullet";
        assert_eq!(to_wiki_markup(input), "* first\n* second\nnot a - bullet");
    }

    #[test]
    fn converts_image_with_caption() {
        assert_eq!(
            to_wiki_markup(r#"![diagram](http://x/a.png "overview")"#),
            "!http://x/a.png|alt=diagram,title=overview!"
        );
    }

    #[test]
    fn converts_image_without_caption_to_empty_title() {
        assert_eq!(
            to_wiki_markup("![diagram](http://x/a.png)"),
            "!http://x/a.png|alt=diagram,title=!"
        );
    }

    #[test]
    fn bold_tables_and_code_pass_through() {
        let input = "**bold** *em* [link](http://x)\n| a | b |\n```\ncode\n```";
        assert_eq!(to_wiki_markup(input), input);
    }

    #[test]
    fn converting_twice_leaves_untouched_constructs_stable() {
        let input = "# T\n#### deep\n**bold**\n- item\n| a | b |";
        let once = to_wiki_markup(input);
        let twice = to_wiki_markup(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn mixed_document() {
        let input = "# Recipe\n\n## Ingredients\n- flour\n- eggs\n\n### Notes\ntext";
        let expected = "h1. Recipe\n\nh2. Ingredients\n* flour\n* eggs\n\nh3. Notes\ntext";
        assert_eq!(to_wiki_markup(input), expected);
    }

    #[test]
    fn category_found() {
        let input = "# Recipe\n## Category Dessert\nbody";
        assert_eq!(category(input), "Dessert");
    }

    #[test]
    fn category_value_is_trimmed() {
        assert_eq!(category("## Category  Main Course  "), "Main Course");
    }

    #[test]
    fn category_defaults_when_absent() {
        assert_eq!(category("# Recipe\nno category here"), "Uncategorized");
    }
}
