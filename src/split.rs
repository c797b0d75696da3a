//! Recipe splitting: one model response, many destination objects.
//!
//! The vision model returns a single Markdown document that may describe
//! several recipes, each introduced by a level-1 heading. The splitter cuts
//! the document at every line that begins a top-level heading and names each
//! piece after its heading.
//!
//! The implementation scans for heading-line boundaries directly instead of
//! splitting on a delimiter and re-prepending the consumed marker. A
//! document that opens with a heading therefore keeps exactly one marker on
//! its first block.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TOP_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)").unwrap());

/// A contiguous Markdown fragment, usually one recipe.
///
/// `heading` is the text of the first level-1 heading inside the block, if
/// any. Blocks are never merged back together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeBlock {
    pub heading: Option<String>,
    pub markdown: String,
}

impl RecipeBlock {
    /// Destination filename for this block.
    ///
    /// Named after the heading with a `.md` suffix; a block without a
    /// heading falls back to `default<position>.md`, where `position` is
    /// the block's zero-based index in the split sequence.
    pub fn filename(&self, position: usize) -> String {
        match &self.heading {
            Some(heading) => format!("{heading}.md"),
            None => format!("default{position}.md"),
        }
    }
}

/// Split a Markdown document at every level-1 heading line.
///
/// Content before the first heading becomes an untitled leading block. A
/// document with no level-1 heading at all yields exactly one untitled
/// block holding the whole document.
pub fn split_recipes(markdown: &str) -> Vec<RecipeBlock> {
    let starts: Vec<usize> = RE_TOP_HEADING
        .find_iter(markdown)
        .map(|m| m.start())
        .collect();

    if starts.is_empty() {
        return vec![block(markdown)];
    }

    let mut blocks = Vec::with_capacity(starts.len() + 1);
    if starts[0] > 0 {
        blocks.push(block(&markdown[..starts[0]]));
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(markdown.len());
        blocks.push(block(&markdown[start..end]));
    }
    blocks
}

fn block(fragment: &str) -> RecipeBlock {
    let heading = RE_TOP_HEADING
        .captures(fragment)
        .map(|caps| caps[1].to_string());
    RecipeBlock {
        heading,
        markdown: fragment.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filenames(blocks: &[RecipeBlock]) -> Vec<String> {
        blocks
            .iter()
            .enumerate()
            .map(|(i, b)| b.filename(i))
            .collect()
    }

    #[test]
    fn splits_at_each_top_level_heading() {
        let blocks = split_recipes("# A\nbody1\n# B\nbody2");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].markdown, "# A\nbody1\n");
        assert_eq!(blocks[1].markdown, "# B\nbody2");
        assert_eq!(filenames(&blocks), vec!["A.md", "B.md"]);
    }

    #[test]
    fn document_opening_with_heading_keeps_single_marker() {
        let blocks = split_recipes("# Solo\nbody");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].markdown.starts_with("# Solo"));
        assert!(!blocks[0].markdown.starts_with("# # "));
    }

    #[test]
    fn leading_content_becomes_untitled_block() {
        let blocks = split_recipes("preamble\n# A\nbody");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].markdown, "preamble\n");
        assert_eq!(blocks[0].heading, None);
        assert_eq!(filenames(&blocks), vec!["default0.md", "A.md"]);
    }

    #[test]
    fn no_heading_yields_one_fallback_block() {
        let blocks = split_recipes("just text\nmore text");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].markdown, "just text\nmore text");
        assert_eq!(filenames(&blocks), vec!["default0.md"]);
    }

    #[test]
    fn deeper_headings_do_not_split() {
        let blocks = split_recipes("# A\n## Ingredients\n### Notes\n# B\nx");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].heading.as_deref(), Some("A"));
        assert_eq!(blocks[1].heading.as_deref(), Some("B"));
    }

    #[test]
    fn empty_document_yields_one_empty_block() {
        let blocks = split_recipes("");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].markdown, "");
        assert_eq!(blocks[0].filename(0), "default0.md");
    }
}
