//! Runtime configuration, sourced from environment variables with CLI
//! overrides applied in `main`.

use std::path::PathBuf;

use crate::errors::SetupError;
use crate::llm::{ChatClient, GeminiClient};

/// Environment variable holding the code-generation model key.
pub const CODE_MODEL_KEY_VAR: &str = "DEEPSEEK_API_KEY";
/// Environment variable holding the scene/narration model key.
pub const SCENE_MODEL_KEY_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the code-generation model. Checked per overall attempt,
    /// not at startup, so a missing key surfaces as a job error rather than
    /// a crash.
    pub code_model_key: Option<String>,
    /// API key for the scene/narration model.
    pub scene_model_key: Option<String>,
    /// Base URL of the OpenAI-compatible code-generation endpoint.
    pub chat_base_url: String,
    pub chat_model: String,
    pub scene_model: String,
    /// Interpreter used to byte-compile candidate code.
    pub python_cmd: String,
    /// Rendering tool invocation.
    pub manim_cmd: String,
    /// Root under which per-job `output_<job_id>/` directories are created.
    pub work_root: PathBuf,
    /// Directory holding the single published asset.
    pub publish_dir: PathBuf,
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            code_model_key: None,
            scene_model_key: None,
            chat_base_url: "https://api.deepseek.com".to_string(),
            chat_model: "deepseek-chat".to_string(),
            scene_model: "gemini-2.0-flash".to_string(),
            python_cmd: "python3".to_string(),
            manim_cmd: "manim".to_string(),
            work_root: PathBuf::from("."),
            publish_dir: PathBuf::from("video_server"),
            workers: 2,
            queue_capacity: 16,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            code_model_key: std::env::var(CODE_MODEL_KEY_VAR).ok(),
            scene_model_key: std::env::var(SCENE_MODEL_KEY_VAR).ok(),
            chat_base_url: env_or("SCENESMITH_CHAT_BASE_URL", defaults.chat_base_url),
            chat_model: env_or("SCENESMITH_CHAT_MODEL", defaults.chat_model),
            scene_model: env_or("SCENESMITH_SCENE_MODEL", defaults.scene_model),
            python_cmd: env_or("SCENESMITH_PYTHON", defaults.python_cmd),
            manim_cmd: env_or("SCENESMITH_MANIM", defaults.manim_cmd),
            work_root: env_or("SCENESMITH_WORK_ROOT", defaults.work_root),
            publish_dir: env_or("SCENESMITH_PUBLISH_DIR", defaults.publish_dir),
            workers: defaults.workers,
            queue_capacity: defaults.queue_capacity,
        }
    }

    /// Construct the model clients, failing on missing credentials.
    /// Called per overall attempt by the orchestrator.
    pub fn clients(&self) -> Result<(ChatClient, GeminiClient), SetupError> {
        let code_key = self
            .code_model_key
            .as_deref()
            .ok_or(SetupError::MissingCredential {
                var: CODE_MODEL_KEY_VAR,
            })?;
        let scene_key = self
            .scene_model_key
            .as_deref()
            .ok_or(SetupError::MissingCredential {
                var: SCENE_MODEL_KEY_VAR,
            })?;

        let chat = ChatClient::new(&self.chat_base_url, code_key, &self.chat_model);
        let gemini = GeminiClient::new(scene_key, &self.scene_model);
        Ok((chat, gemini))
    }

    /// Per-job staging directory under the work root.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.work_root.join(format!("output_{job_id}"))
    }
}

fn env_or<T: From<String>>(var: &str, default: T) -> T {
    std::env::var(var).map(T::from).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_deepseek_and_gemini() {
        let config = Config::default();
        assert_eq!(config.chat_base_url, "https://api.deepseek.com");
        assert_eq!(config.chat_model, "deepseek-chat");
        assert_eq!(config.scene_model, "gemini-2.0-flash");
        assert_eq!(config.publish_dir, PathBuf::from("video_server"));
    }

    #[test]
    fn clients_fails_without_code_model_key() {
        let config = Config {
            scene_model_key: Some("sk-scene".into()),
            ..Config::default()
        };
        let err = config.clients().unwrap_err();
        assert!(err.to_string().contains(CODE_MODEL_KEY_VAR));
    }

    #[test]
    fn clients_fails_without_scene_model_key() {
        let config = Config {
            code_model_key: Some("sk-code".into()),
            ..Config::default()
        };
        let err = config.clients().unwrap_err();
        assert!(err.to_string().contains(SCENE_MODEL_KEY_VAR));
    }

    #[test]
    fn clients_succeeds_with_both_keys() {
        let config = Config {
            code_model_key: Some("sk-code".into()),
            scene_model_key: Some("sk-scene".into()),
            ..Config::default()
        };
        assert!(config.clients().is_ok());
    }

    #[test]
    fn job_dir_is_namespaced_by_job_id() {
        let config = Config {
            work_root: PathBuf::from("/work"),
            ..Config::default()
        };
        assert_eq!(
            config.job_dir("abc-123"),
            PathBuf::from("/work/output_abc-123")
        );
    }
}
