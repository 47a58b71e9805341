//! Code synthesis: ask the code-generation model for Manim code satisfying
//! a scene prompt, validate it, and self-repair across a bounded number of
//! attempts using the previous failure's diagnostic as corrective context.

pub mod extract;
pub mod repair;
pub mod validate;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{LlmError, SynthesisError};
use crate::llm::ChatClient;
use crate::prompts::CODE_SYSTEM_PROMPT;
use self::extract::{CodeBlock, extract_code_block};
use self::validate::{CodeValidator, Validation};

/// Full synthesis attempts before giving up on a scene.
pub const MAX_ATTEMPTS: u32 = 20;
/// Transport retries within one attempt.
const TRANSPORT_RETRIES: u32 = 3;
const TRANSPORT_RETRY_DELAY: Duration = Duration::from_secs(5);
const ATTEMPT_BACKOFF: Duration = Duration::from_secs(2);

pub struct CodeSynthesizer {
    chat: ChatClient,
    validator: CodeValidator,
    max_attempts: u32,
}

impl CodeSynthesizer {
    pub fn new(chat: ChatClient, validator: CodeValidator) -> Self {
        Self {
            chat,
            validator,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Produce code for `scene_prompt` that passes validation, or fail
    /// after `max_attempts`. The diagnostic from each failed attempt is
    /// appended to the next request.
    pub async fn generate(&self, scene_prompt: &str) -> Result<String, SynthesisError> {
        let mut last_diagnostic = String::new();

        for attempt in 0..self.max_attempts {
            info!(
                attempt = attempt + 1,
                model = self.chat.model(),
                "requesting scene code"
            );

            let prompt = build_prompt(scene_prompt, &last_diagnostic);
            let content = match self.request_with_retries(&prompt).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "completion request failed");
                    tokio::time::sleep(ATTEMPT_BACKOFF).await;
                    continue;
                }
            };

            let code = match extract_code_block(&content) {
                CodeBlock::Found(code) => code,
                CodeBlock::NotFound => {
                    debug!(attempt = attempt + 1, "response carried no code block");
                    last_diagnostic = "no code block found".to_string();
                    tokio::time::sleep(ATTEMPT_BACKOFF).await;
                    continue;
                }
            };

            match self.validator.validate(&code).await {
                Validation::Passed => match self.gate(code).await {
                    Ok(code) => return Ok(code),
                    Err(diag) => last_diagnostic = diag,
                },
                Validation::Failed(diag) => {
                    debug!(attempt = attempt + 1, diagnostic = %diag, "validation failed");
                    last_diagnostic = diag;
                }
            }

            tokio::time::sleep(ATTEMPT_BACKOFF).await;
        }

        Err(SynthesisError::Exhausted {
            attempts: self.max_attempts,
            last_diagnostic,
        })
    }

    /// Keyword-rename gate applied once per attempt to validated code.
    /// Returns the accepted code, or the diagnostic to carry forward.
    async fn gate(&self, code: String) -> Result<String, String> {
        let code = match repair::axes_height_rewrite(&code) {
            Some(rewritten) => {
                info!("rewrote Axes height= to y_length=");
                if !self.validator.validate(&rewritten).await.passed() {
                    return Err("code no longer compiles after the height= rename".to_string());
                }
                rewritten
            }
            None => code,
        };

        match repair::axes_invalid_keyword(&code) {
            Some(diag) => Err(diag),
            None => Ok(code),
        }
    }

    async fn request_with_retries(&self, prompt: &str) -> Result<String, LlmError> {
        let mut last_err = None;
        for retry in 0..TRANSPORT_RETRIES {
            match self.chat.complete(prompt).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    warn!(retry = retry + 1, error = %e, "transport failure");
                    last_err = Some(e);
                    if retry + 1 < TRANSPORT_RETRIES {
                        tokio::time::sleep(TRANSPORT_RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or(LlmError::EmptyResponse))
    }
}

fn build_prompt(scene_prompt: &str, last_diagnostic: &str) -> String {
    if last_diagnostic.is_empty() {
        format!("{CODE_SYSTEM_PROMPT} {scene_prompt}")
    } else {
        format!(
            "{CODE_SYSTEM_PROMPT} {scene_prompt}\n\nThe previous attempt failed with the following error. Fix it:\n{last_diagnostic}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_prompt_has_no_error_context() {
        let prompt = build_prompt("Parabola plot x^2", "");
        assert!(prompt.contains("Parabola plot x^2"));
        assert!(!prompt.contains("previous attempt"));
    }

    #[test]
    fn retry_prompt_appends_the_diagnostic() {
        let prompt = build_prompt("Parabola plot x^2", "no code block found");
        assert!(prompt.contains("previous attempt failed"));
        assert!(prompt.ends_with("no code block found"));
    }
}
