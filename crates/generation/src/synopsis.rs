use crate::capability::{GenerationRequest, TextGeneration};
use crate::error::{GenerationError, Result};
use crate::prompts;

#[derive(Debug, Clone, Copy)]
pub struct SynopsisOptions {
    pub max_words: usize,
    /// Content beyond this many characters is cut before the request
    pub max_input_chars: usize,
    pub temperature: f32,
}

impl Default for SynopsisOptions {
    fn default() -> Self {
        Self {
            max_words: 100,
            max_input_chars: 60_000,
            temperature: 0.2,
        }
    }
}

/// Short natural-language description of one file's content.
pub async fn synopsize(
    generator: &dyn TextGeneration,
    content: &str,
    options: &SynopsisOptions,
) -> Result<String> {
    if content.trim().is_empty() {
        return Err(GenerationError::Other("file is empty".to_string()));
    }

    let request = GenerationRequest::new(
        prompts::file_synopsis(options.max_words),
        truncate_chars(content, options.max_input_chars),
        options.temperature,
    );
    let response = generator.generate(request).await?;
    Ok(clamp_words(response.text.trim(), options.max_words))
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Keeps the first `max_words` words; models overshoot word limits now and then.
fn clamp_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    words[..max_words].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn long_answers_are_clamped() {
        let text = "one two three four five";
        assert_eq!(clamp_words(text, 3), "one two three");
        assert_eq!(clamp_words(text, 10), text);
    }
}
