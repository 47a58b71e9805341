//! Typed error hierarchy for the video pipeline.
//!
//! One enum per failure domain, matching the retry level that handles it:
//! - `SetupError` / `DecompositionError` — retried per overall attempt
//! - `SynthesisError` / `RenderError` — scene-level, cause a scene skip
//! - `AudioError` — non-fatal, the non-audio render is kept
//! - `LlmError` — leaf transport/parse failures, converted to diagnostic
//!   strings at the retry loop that issued the call

use thiserror::Error;

/// Errors constructing the generative-model clients.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Missing {var} in environment")]
    MissingCredential { var: &'static str },
}

/// Errors from a single generative-model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Response contained no completion text")]
    EmptyResponse,
}

/// Errors from scene decomposition.
#[derive(Debug, Error)]
pub enum DecompositionError {
    #[error("Scene decomposition failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Scene payload did not match the expected schema: {0}")]
    Schema(String),
}

/// Errors from code synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("No valid code after {attempts} attempts (last diagnostic: {last_diagnostic})")]
    Exhausted {
        attempts: u32,
        last_diagnostic: String,
    },
}

/// Errors from the rendering subprocess.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to create output directory at {path}: {source}")]
    OutputDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write staging file at {path}: {source}")]
    StagingWrite {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No artifact after {attempts} render attempts")]
    Exhausted { attempts: u32 },
}

/// Errors from audio augmentation.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No valid narrated code after {attempts} sequential and {attempts} parallel attempts")]
    Exhausted { attempts: u32 },
}

/// Terminal error for a whole job, surfaced to the status endpoint.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to generate video after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_error_names_the_variable() {
        let err = SetupError::MissingCredential {
            var: "GEMINI_API_KEY",
        };
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn synthesis_exhausted_carries_last_diagnostic() {
        let err = SynthesisError::Exhausted {
            attempts: 20,
            last_diagnostic: "no code block found".to_string(),
        };
        match &err {
            SynthesisError::Exhausted { attempts, .. } => assert_eq!(*attempts, 20),
        }
        assert!(err.to_string().contains("no code block found"));
    }

    #[test]
    fn render_error_staging_write_carries_path() {
        use std::path::PathBuf;
        let path = PathBuf::from("/work/output_abc/scene_0.py");
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = RenderError::StagingWrite {
            path: path.clone(),
            source: io_err,
        };
        match &err {
            RenderError::StagingWrite { path: p, source: s } => {
                assert_eq!(p, &path);
                assert_eq!(s.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected StagingWrite"),
        }
    }

    #[test]
    fn pipeline_exhausted_message_is_nonempty() {
        let err = PipelineError::Exhausted { attempts: 5 };
        assert!(!err.to_string().is_empty());
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&SetupError::MissingCredential { var: "X" });
        assert_std_error(&DecompositionError::Schema("bad".into()));
        assert_std_error(&AudioError::Exhausted { attempts: 5 });
        assert_std_error(&PipelineError::Exhausted { attempts: 5 });
    }
}
