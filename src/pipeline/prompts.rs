//! Prompt templates for each stage

use crate::ai::ToolDefinition;
use crate::types::{FileAnalysis, Result, StructuralFootprint};

pub const VIEW_FILE_TOOL: &str = "view_file";

pub const PREFILTER_SYSTEM: &str = "You are a technical analyst. You must return ONLY a raw JSON array of strings (file paths to retain). No markdown formatting.";

pub const FILE_SYSTEM: &str = "You are a technical analyst extracting product features. Use your tools to read code if the structure isn't descriptive enough. Output ONLY the overview and markdown list of features.";

pub const COMPONENT_SYSTEM: &str = "You are a Lead Software Architect. Synthesize low-level file features into a cohesive high-level component summary with a Mermaid diagram.";

pub const GLOBAL_SYSTEM: &str = "You are a Chief Software Architect. Produce a master architecture and feature document based on component analyses.";

const MERMAID_QUOTING: &str = "CRITICAL INSTRUCTION: When creating Mermaid diagrams, you MUST wrap node labels in double quotes if they contain any special characters (like parentheses, brackets, or strange punctuation). For example, use `NodeID[\"Text with (parentheses)\"]` instead of `NodeID[Text with (parentheses)]`.";

/// Stage 0 prompt for one chunk of relative paths
pub fn prefilter_prompt(paths: &[String], chunk_index: usize, chunk_count: usize) -> Result<String> {
    let listing = serde_json::to_string_pretty(paths)?;
    Ok(format!(
        r#"You are an expert software architect. You are given a list of file paths from a codebase.
Your task is to filter this list by identifying and EXCLUDING any boilerplate, trivial configuration, auto-generated files, lock files, empty files, non-functional UI assets, or generic/non-core test files that would not contribute meaningfully to a high-level architectural summary of the core system.

Return ONLY a raw JSON array of strings containing the file paths that should be KEPT.
Do not include any explanations, markdown formatting, or backticks. Just the raw JSON array.

File paths (Chunk {} of {}):
{}"#,
        chunk_index + 1,
        chunk_count,
        listing
    ))
}

/// Stage 1 opening message
pub fn file_prompt(footprint: &StructuralFootprint) -> Result<String> {
    let structure = serde_json::to_string_pretty(footprint)?;
    Ok(format!(
        r#"You are an expert software architect. Analyze the provided codebase module and determine its exhaustive product-level features.

You are provided with the structural footprint (classes, functions, exports).
CRITICAL INSTRUCTION: You are an agent equipped with a '{}' tool. If the structural data is not enough to confidently extract EXHAUSTIVE, detailed features, you MUST call the '{}' tool to read the raw source code of the file. Do not guess.

Format your final response using the following structure:
1. A brief 1-2 sentence overview of what this module does.
2. A clean Markdown list of high-level features (use bullet points).

Structural Data:
{}"#,
        VIEW_FILE_TOOL, VIEW_FILE_TOOL, structure
    ))
}

pub fn view_file_tool() -> ToolDefinition {
    ToolDefinition {
        name: VIEW_FILE_TOOL.to_string(),
        description: "Reads the raw content of the file being analyzed.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": { "reason": { "type": "string" } },
            "required": ["reason"]
        }),
    }
}

/// Stage 2 prompt for one directory
pub fn component_prompt(dir: &str, files: &[FileAnalysis]) -> String {
    let summaries = files
        .iter()
        .map(|f| format!("### File: {}\n{}", f.path, f.features))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an expert software architect. You are looking at a specific directory/component of a codebase: `{}`

Below are the granular feature summaries for the individual files inside this directory.
Your job is to synthesize these file-level details into a high-level **Component Summary**.

1. What is the overarching purpose of this component?
2. What are the core macro-features it provides to the broader system?
3. Generate a relevant Mermaid.js diagram (e.g., C4 Context, Sequence, or State) showing how the files in this component interact or what flow they represent.
{}

File Summaries:
{}"#,
        dir, MERMAID_QUOTING, summaries
    )
}

/// Stage 3 prompt. `omitted` lists directories whose summary failed.
pub fn global_prompt<'a>(
    components: impl IntoIterator<Item = (&'a String, &'a String)>,
    omitted: &[String],
) -> String {
    let summaries = components
        .into_iter()
        .map(|(dir, summary)| format!("### Component: {}\n{}", dir, summary))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = format!(
        r#"You are an expert software architect. You have analyzed various components of a codebase.
Synthesize the following component summaries into a **Global Architecture Overview** for the entire repository.

1. Write an Executive Summary of what the entire codebase does.
2. Outline the major pillars/domains of the application.
3. Generate a high-level Mermaid.js Architecture Diagram showing how the main components interact.
{}

Component Summaries:
{}"#,
        MERMAID_QUOTING, summaries
    );

    if !omitted.is_empty() {
        prompt.push_str(
            "\n\nNote: the following directories could not be summarized and are missing from the list above:\n",
        );
        for dir in omitted {
            prompt.push_str(&format!("- {}\n", dir));
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_file_prompt_embeds_footprint() {
        let mut fp = StructuralFootprint::new("src/app.ts");
        fp.functions.insert("boot".into());
        let prompt = file_prompt(&fp).unwrap();
        assert!(prompt.contains("\"path\": \"src/app.ts\""));
        assert!(prompt.contains("\"boot\""));
        assert!(!prompt.contains("\"note\""));
    }

    #[test]
    fn test_component_prompt_lists_files() {
        let files = vec![
            FileAnalysis::new("src/a.js", "F_a"),
            FileAnalysis::new("src/b.js", "F_b"),
        ];
        let prompt = component_prompt("src", &files);
        assert!(prompt.contains("codebase: `src`"));
        assert!(prompt.contains("### File: src/a.js\nF_a\n\n### File: src/b.js\nF_b"));
    }

    #[test]
    fn test_global_prompt_mentions_omitted() {
        let mut components = BTreeMap::new();
        components.insert("src".to_string(), "S".to_string());

        let full = global_prompt(&components, &[]);
        assert!(full.contains("### Component: src\nS"));
        assert!(!full.contains("could not be summarized"));

        let partial = global_prompt(&components, &["lib".to_string()]);
        assert!(partial.contains("could not be summarized"));
        assert!(partial.contains("- lib"));
    }

    #[test]
    fn test_prefilter_prompt_numbering() {
        let prompt = prefilter_prompt(&["a.js".to_string()], 0, 3).unwrap();
        assert!(prompt.contains("Chunk 1 of 3"));
        assert!(prompt.contains("\"a.js\""));
    }

    #[test]
    fn test_view_file_schema() {
        let tool = view_file_tool();
        assert_eq!(tool.name, "view_file");
        assert_eq!(tool.input_schema["required"][0], "reason");
    }
}
