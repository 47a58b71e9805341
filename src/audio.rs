//! Audio augmentation: rewrite rendered scene code with narration
//! directives. Sequential attempts keep API cost down in the common case;
//! if they all fail, a parallel race of attempts minimizes latency in the
//! degraded case, cancelling the losers on first success.

use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::AudioError;
use crate::llm::GeminiClient;
use crate::prompts::NARRATION_PROMPT;
use crate::synthesis::extract::{CodeBlock, extract_code_block};
use crate::synthesis::validate::CodeValidator;

/// Attempts per phase (sequential, then parallel).
pub const MAX_ATTEMPTS: u32 = 5;
const SEQUENTIAL_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct AudioAugmenter {
    gemini: GeminiClient,
    validator: CodeValidator,
    max_attempts: u32,
}

impl AudioAugmenter {
    pub fn new(gemini: GeminiClient, validator: CodeValidator) -> Self {
        Self {
            gemini,
            validator,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Wrap `code` with narration. Errors only after both phases fail;
    /// the caller keeps the non-audio render in that case.
    pub async fn augment(&self, code: &str) -> Result<String, AudioError> {
        for attempt in 0..self.max_attempts {
            info!(attempt = attempt + 1, "narration attempt");
            if let Some(narrated) = self.attempt(code).await {
                return Ok(narrated);
            }
            tokio::time::sleep(SEQUENTIAL_DELAY).await;
        }

        warn!("sequential narration attempts failed, racing parallel attempts");

        let mut set = JoinSet::new();
        for attempt in 0..self.max_attempts {
            let this = self.clone();
            let code = code.to_string();
            set.spawn(async move {
                debug!(attempt = attempt + 1, "parallel narration attempt");
                this.attempt(&code).await
            });
        }

        match race_first_valid(&mut set).await {
            Some(narrated) => Ok(narrated),
            None => Err(AudioError::Exhausted {
                attempts: self.max_attempts,
            }),
        }
    }

    /// One narration attempt: request, extract, validate.
    async fn attempt(&self, code: &str) -> Option<String> {
        let prompt = format!("{NARRATION_PROMPT}{code}");
        let response = match self.gemini.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "narration request failed");
                return None;
            }
        };

        let narrated = match extract_code_block(&response) {
            CodeBlock::Found(narrated) => narrated,
            CodeBlock::NotFound => {
                warn!("narration response carried no code block");
                return None;
            }
        };

        let validation = self.validator.validate(&narrated).await;
        if validation.passed() {
            Some(narrated)
        } else {
            warn!(
                diagnostic = validation.diagnostic().unwrap_or_default(),
                "narrated code failed validation"
            );
            None
        }
    }
}

/// Await tasks until one yields a value, then cancel the rest.
async fn race_first_valid(set: &mut JoinSet<Option<String>>) -> Option<String> {
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(value)) => {
                set.abort_all();
                return Some(value);
            }
            Ok(None) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => warn!(error = %e, "narration task failed"),
        }
    }
    None
}
