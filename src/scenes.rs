//! Scene decomposition: break one prompt into an ordered list of short
//! scene descriptions via the scene model's structured-JSON mode.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::errors::DecompositionError;
use crate::llm::GeminiClient;
use crate::prompts::SCENE_PLAN_PROMPT;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(3);
/// Upper bound on scenes per job; anything past it is dropped.
pub const MAX_SCENES: usize = 5;

/// One narrative segment of the video. Immutable once produced; list
/// order is playback order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub title: String,
    pub description: String,
}

impl Scene {
    /// The prompt handed to the code synthesizer for this scene.
    pub fn prompt(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

/// The decomposition payload returned by the scene model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenePlan {
    pub video_title: String,
    pub scenes: Vec<Scene>,
}

pub struct SceneDecomposer {
    gemini: GeminiClient,
}

impl SceneDecomposer {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }

    /// Decompose `prompt` into 1–5 scenes, retrying transport and parse
    /// failures up to the attempt bound.
    pub async fn decompose(&self, prompt: &str) -> Result<ScenePlan, DecompositionError> {
        let full_prompt = format!("{SCENE_PLAN_PROMPT}{prompt}");
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            info!(attempt = attempt + 1, "requesting scene decomposition");

            match self
                .gemini
                .generate_json(&full_prompt, scene_plan_schema())
                .await
            {
                Ok(text) => match parse_scene_plan(&text) {
                    Ok(plan) => {
                        info!(
                            scenes = plan.scenes.len(),
                            title = %plan.video_title,
                            "scene plan received"
                        );
                        return Ok(plan);
                    }
                    Err(e) => {
                        warn!(attempt = attempt + 1, error = %e, "scene payload rejected");
                        last_error = e.to_string();
                    }
                },
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "decomposition request failed");
                    last_error = e.to_string();
                }
            }

            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(DecompositionError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }
}

/// Parse the model's JSON payload into a plan, tolerating prose around the
/// object and enforcing the 1–5 scene bound.
pub fn parse_scene_plan(text: &str) -> Result<ScenePlan, DecompositionError> {
    let json_str = extract_json_object(text)
        .ok_or_else(|| DecompositionError::Schema("no JSON object in response".to_string()))?;

    let mut plan: ScenePlan = serde_json::from_str(&json_str)
        .map_err(|e| DecompositionError::Schema(e.to_string()))?;

    if plan.scenes.is_empty() {
        return Err(DecompositionError::Schema(
            "scene list is empty".to_string(),
        ));
    }
    if plan.scenes.len() > MAX_SCENES {
        warn!(
            scenes = plan.scenes.len(),
            "scene plan over the limit, truncating"
        );
        plan.scenes.truncate(MAX_SCENES);
    }

    Ok(plan)
}

/// Gemini response schema for the scene plan.
fn scene_plan_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "video_title": {"type": "STRING"},
            "scenes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {"type": "STRING"},
                        "description": {"type": "STRING"},
                    },
                    "required": ["title", "description"],
                },
            },
        },
        "required": ["video_title", "scenes"],
    })
}

/// Extract a JSON object from text that may contain other content, by
/// brace counting from the first `{`.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0;
    let mut end = start;

    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    if depth == 0 && end > start {
        Some(text[start..end].to_string())
    } else {
        None
    }
}
