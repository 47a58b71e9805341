//! End-to-end job orchestration: decompose the prompt, then for each scene
//! synthesize, render, and narrate, publishing the final asset and cleaning
//! up staging state. Three retry budgets nest here: overall attempts wrap
//! setup + decomposition, scene attempts wrap synthesize + render, and the
//! leaf components carry their own internal retries.

pub mod staging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::audio::AudioAugmenter;
use crate::config::Config;
use crate::errors::PipelineError;
use crate::render::Renderer;
use crate::scenes::{SceneDecomposer, ScenePlan};
use crate::synthesis::CodeSynthesizer;
use crate::synthesis::validate::CodeValidator;

pub const MAX_OVERALL_ATTEMPTS: u32 = 5;
pub const MAX_SCENE_ATTEMPTS: u32 = 5;
const OVERALL_RETRY_DELAY: Duration = Duration::from_secs(5);
const SCENE_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Per-scene outcome of one overall attempt. A skipped scene keeps its
/// slot with no render path so playback order stays visible in logs.
#[derive(Debug, Clone)]
pub struct SceneOutcome {
    pub scene_index: usize,
    pub code: String,
    pub render_path: Option<PathBuf>,
    pub audio_applied: bool,
}

pub struct JobOrchestrator {
    config: Arc<Config>,
    max_overall_attempts: u32,
}

impl JobOrchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            max_overall_attempts: MAX_OVERALL_ATTEMPTS,
        }
    }

    #[cfg(test)]
    pub fn with_max_overall_attempts(mut self, max_overall_attempts: u32) -> Self {
        self.max_overall_attempts = max_overall_attempts;
        self
    }

    /// Drive one job to a terminal result: the published asset path, or
    /// an error once every overall attempt is exhausted.
    pub async fn run(&self, job_id: &str, prompt: &str) -> Result<PathBuf, PipelineError> {
        for attempt in 0..self.max_overall_attempts {
            info!(job_id, attempt = attempt + 1, "overall attempt");

            match self.attempt(job_id, prompt).await {
                Ok(published) => return Ok(published),
                Err(reason) => {
                    warn!(job_id, attempt = attempt + 1, reason = %reason, "overall attempt failed");
                }
            }

            if attempt + 1 < self.max_overall_attempts {
                tokio::time::sleep(OVERALL_RETRY_DELAY).await;
            }
        }

        Err(PipelineError::Exhausted {
            attempts: self.max_overall_attempts,
        })
    }

    /// One overall attempt. Every failure mode reduces to a reason string;
    /// the caller decides whether budget remains.
    async fn attempt(&self, job_id: &str, prompt: &str) -> Result<PathBuf, String> {
        let (chat, gemini) = self.config.clients().map_err(|e| e.to_string())?;
        let validator = CodeValidator::new(&self.config.python_cmd);
        let decomposer = SceneDecomposer::new(gemini.clone());
        let synthesizer = CodeSynthesizer::new(chat, validator.clone());
        let renderer = Renderer::new(&self.config.manim_cmd);
        let augmenter = AudioAugmenter::new(gemini, validator);

        let plan = decomposer.decompose(prompt).await.map_err(|e| e.to_string())?;

        let job_dir = self.config.job_dir(job_id);
        let outcomes = process_scenes(&plan, &synthesizer, &renderer, &augmenter, &job_dir).await;

        let result = match final_artifact(&outcomes) {
            Some(artifact) => staging::publish(artifact, &self.config.publish_dir)
                .await
                .map_err(|e| format!("publish failed: {e}")),
            None => Err("no scene produced a video".to_string()),
        };

        staging::remove_job_dir(&job_dir).await;
        result
    }
}

/// Process scenes strictly in decomposition order. A scene that exhausts
/// its attempts is skipped; the loop continues to the next scene.
async fn process_scenes(
    plan: &ScenePlan,
    synthesizer: &CodeSynthesizer,
    renderer: &Renderer,
    augmenter: &AudioAugmenter,
    job_dir: &std::path::Path,
) -> Vec<SceneOutcome> {
    let mut outcomes = Vec::with_capacity(plan.scenes.len());

    for (scene_index, scene) in plan.scenes.iter().enumerate() {
        info!(scene = scene_index + 1, title = %scene.title, "processing scene");
        let scene_prompt = scene.prompt();

        let mut outcome = SceneOutcome {
            scene_index,
            code: String::new(),
            render_path: None,
            audio_applied: false,
        };

        for attempt in 0..MAX_SCENE_ATTEMPTS {
            let code = match synthesizer.generate(&scene_prompt).await {
                Ok(code) => code,
                Err(e) => {
                    warn!(scene = scene_index + 1, attempt = attempt + 1, error = %e, "synthesis failed");
                    tokio::time::sleep(SCENE_RETRY_DELAY).await;
                    continue;
                }
            };

            match renderer.render(&code, job_dir, None).await {
                Ok(path) => {
                    info!(scene = scene_index + 1, path = %path.display(), "scene rendered");
                    outcome.code = code;
                    outcome.render_path = Some(path);
                    break;
                }
                Err(e) => {
                    warn!(scene = scene_index + 1, attempt = attempt + 1, error = %e, "render failed");
                    if attempt + 1 < MAX_SCENE_ATTEMPTS {
                        tokio::time::sleep(SCENE_RETRY_DELAY).await;
                    }
                }
            }
        }

        if outcome.render_path.is_none() {
            warn!(scene = scene_index + 1, "all attempts failed, skipping scene");
            outcomes.push(outcome);
            continue;
        }

        // Narration is attempted once per rendered scene; its own retries
        // live inside the augmenter. Any failure keeps the silent render.
        match augmenter.augment(&outcome.code).await {
            Ok(narrated) => match renderer.render(&narrated, job_dir, None).await {
                Ok(audio_path) => {
                    info!(scene = scene_index + 1, "narrated render substituted");
                    outcome.render_path = Some(audio_path);
                    outcome.code = narrated;
                    outcome.audio_applied = true;
                }
                Err(e) => {
                    warn!(scene = scene_index + 1, error = %e, "narrated render failed, keeping silent version");
                }
            },
            Err(e) => {
                warn!(scene = scene_index + 1, error = %e, "narration failed, keeping silent version");
            }
        }

        outcomes.push(outcome);
    }

    outcomes
}

/// The published asset comes from the last scene that produced a render.
fn final_artifact(outcomes: &[SceneOutcome]) -> Option<&PathBuf> {
    outcomes.iter().rev().find_map(|o| o.render_path.as_ref())
}
