//! Fenced code-block extraction from model output.
//!
//! Model responses wrap code in markdown fences, usually language-tagged.
//! The extractor returns a typed result so callers can tell "no block"
//! apart from an empty block.

/// Outcome of scanning a response for a fenced code block.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeBlock {
    Found(String),
    NotFound,
}

impl CodeBlock {
    pub fn into_code(self) -> Option<String> {
        match self {
            CodeBlock::Found(code) => Some(code),
            CodeBlock::NotFound => None,
        }
    }
}

/// Extract the first fenced code block, preferring a ```python fence over
/// a generic ``` fence anywhere in the response.
pub fn extract_code_block(content: &str) -> CodeBlock {
    if let Some(code) = tagged_fence(content, "```python") {
        return CodeBlock::Found(code);
    }
    if let Some(code) = generic_fence(content) {
        return CodeBlock::Found(code);
    }
    CodeBlock::NotFound
}

fn tagged_fence(content: &str, marker: &str) -> Option<String> {
    let start = content.find(marker)? + marker.len();
    let rest = &content[start..];
    let end = rest.find("```")?;
    let block = &rest[..end];
    Some(block.strip_prefix('\n').unwrap_or(block).to_string())
}

fn generic_fence(content: &str) -> Option<String> {
    let start = content.find("```")? + 3;
    let rest = &content[start..];
    let end = rest.find("```")?;
    let block = &rest[..end];

    // The fence line may carry a language tag; skip it if it looks like one.
    let code = match block.split_once('\n') {
        Some((first, body)) if is_language_tag(first) => body,
        _ => block.strip_prefix('\n').unwrap_or(block),
    };
    Some(code.to_string())
}

fn is_language_tag(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.len() <= 20
        && line.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-')
}
