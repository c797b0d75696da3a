//! Instruction prompt for vision-model recipe extraction.
//!
//! Kept in one place so the extraction behaviour can be tuned without
//! touching request building or retry handling. Callers override it via
//! [`crate::config::ExtractorConfig::prompt`]; the constant is used only
//! when no override is set.

/// Default prompt sent alongside each scanned page image.
///
/// The heading levels it requests are load-bearing: the level-1 recipe name
/// is what [`crate::split::split_recipes`] cuts on and names files by.
pub const RECIPE_EXTRACTION_PROMPT: &str = "\
Attached is a magazine page containing one or more recipes. Please extract the following for each recipe in markdown format:
-Recipe name (with Heading level 1)
-Preparation time (with Heading level 2)
-Servings (with Heading level 2)
-Ingredients (with Heading level 2)
-Instructions (with Heading level 2)
-Cuisine name inferred from recipe (with Heading level 2)
";
