//! Markdown assembly of the final feature map

use std::fmt::Write;

use super::context::PipelineContext;

pub const DOCUMENT_TITLE: &str = "# Codebase Architecture & Feature Map";

/// Render the layered document: global overview, components sorted by
/// directory, then files in inventory order.
pub fn render(ctx: &PipelineContext) -> String {
    let mut doc = String::new();
    let _ = write!(doc, "{}\n\n", DOCUMENT_TITLE);

    if ctx.is_partial() {
        doc.push_str(&partial_notice(ctx));
    }

    let _ = write!(
        doc,
        "{}\n\n",
        ctx.global_architecture.as_deref().unwrap_or_default()
    );

    doc.push_str("---\n\n## Component Breakdown\n\n");
    for component in ctx.components() {
        let _ = write!(
            doc,
            "### Directory: `{}`\n{}\n\n",
            component.dir, component.summary
        );
    }

    doc.push_str("---\n\n## File-Level Details\n\n");
    for file in &ctx.file_analyses {
        let _ = write!(doc, "#### `{}`\n{}\n\n", file.path, file.features);
    }

    doc
}

fn partial_notice(ctx: &PipelineContext) -> String {
    let mut notice =
        String::from("> **Partial analysis:** some units failed and are missing from this document.\n");
    if !ctx.failures.files.is_empty() {
        let _ = writeln!(notice, "> - Files: {}", code_list(&ctx.failures.files));
    }
    if !ctx.failures.components.is_empty() {
        let _ = writeln!(
            notice,
            "> - Directories: {}",
            code_list(&ctx.failures.components)
        );
    }
    notice.push('\n');
    notice
}

fn code_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("`{}`", i))
        .collect::<Vec<_>>()
        .join(", ")
}
