use crate::capability::{GenerationRequest, TextGeneration};
use crate::error::{GenerationError, Result};
use crate::prompts;
use serde::Serialize;

/// File content handed to the deep-dive prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Markdown summary of a README.
pub async fn summarize_readme(
    generator: &dyn TextGeneration,
    readme: &str,
    temperature: f32,
) -> Result<String> {
    if readme.trim().is_empty() {
        return Ok(String::new());
    }
    let request = GenerationRequest::new(prompts::README_SUMMARY, readme, temperature);
    Ok(generator.generate(request).await?.text.trim().to_string())
}

/// Plain-text condensation of a longer summary.
pub async fn short_summary(
    generator: &dyn TextGeneration,
    summary: &str,
    temperature: f32,
) -> Result<String> {
    if summary.trim().is_empty() {
        return Ok(String::new());
    }
    let request = GenerationRequest::new(prompts::SHORT_SUMMARY, summary, temperature);
    Ok(generator.generate(request).await?.text.trim().to_string())
}

/// Markdown deep-dive (optionally with a mermaid diagram) for one subsystem.
pub async fn summarize_subsystem(
    generator: &dyn TextGeneration,
    title: &str,
    files: &[SourceFile],
    temperature: f32,
) -> Result<String> {
    if files.is_empty() {
        return Err(GenerationError::NoValidFiles(format!(
            "subsystem '{title}' has no readable files"
        )));
    }

    let payload = serde_json::json!({ "title": title, "files": files });
    let request = GenerationRequest::new(
        prompts::SUBSYSTEM_DEEP_DIVE,
        payload.to_string(),
        temperature,
    );
    let text = generator.generate(request).await?.text;
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text.trim().to_string())
}
