//! Rendering: invoke the external Manim tool on validated code, stream its
//! output, and retry with heuristic keyword repairs when the failure text
//! matches a known API-signature mismatch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::RenderError;
use crate::synthesis::repair::{RENDER_RULES, apply_first_match};

/// Render attempts per scene before reporting failure.
pub const MAX_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct Renderer {
    manim_cmd: String,
    max_retries: u32,
}

impl Renderer {
    pub fn new(manim_cmd: &str) -> Self {
        Self {
            manim_cmd: manim_cmd.to_string(),
            max_retries: MAX_RETRIES,
        }
    }

    #[cfg(test)]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Render `code` into `output_dir`, returning the produced artifact.
    /// Failures matching a repair rule retry with rewritten code; the
    /// final retry falls back to the original code when nothing matched.
    pub async fn render(
        &self,
        code: &str,
        output_dir: &Path,
        scene_class: Option<&str>,
    ) -> Result<PathBuf, RenderError> {
        let original = code.to_string();
        let mut code = code.to_string();

        for attempt in 0..self.max_retries {
            info!(attempt = attempt + 1, dir = %output_dir.display(), "render attempt");

            tokio::fs::create_dir_all(output_dir)
                .await
                .map_err(|e| RenderError::OutputDir {
                    path: output_dir.to_path_buf(),
                    source: e,
                })?;

            let staging = output_dir.join("scene.py");
            tokio::fs::write(&staging, &code)
                .await
                .map_err(|e| RenderError::StagingWrite {
                    path: staging.clone(),
                    source: e,
                })?;

            let scene_class = scene_class
                .map(str::to_string)
                .or_else(|| detect_scene_class(&code));
            match &scene_class {
                Some(name) => debug!(scene_class = %name, "selected entry point"),
                None => debug!("no scene class detected, letting the tool choose"),
            }

            match self
                .invoke(&staging, output_dir, scene_class.as_deref())
                .await
            {
                Ok(()) => {
                    if let Some(artifact) = newest_artifact(output_dir) {
                        info!(artifact = %artifact.display(), "render produced an artifact");
                        return Ok(artifact);
                    }
                    warn!(attempt = attempt + 1, "render exited cleanly but produced no artifact");
                }
                Err(diagnostic) => {
                    warn!(attempt = attempt + 1, diagnostic = %diagnostic, "render failed");
                    match apply_first_match(RENDER_RULES, &code, &diagnostic, attempt) {
                        Some(repair) => {
                            info!(rule = repair.rule, "applying repair rule");
                            code = repair.code;
                        }
                        // Entering the last retry with nothing to try:
                        // fall back to the unmodified code.
                        None if attempt + 2 == self.max_retries => {
                            info!("no repair rule matched, reverting to original code");
                            code = original.clone();
                        }
                        None => {}
                    }
                }
            }

            if attempt + 1 < self.max_retries {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(RenderError::Exhausted {
            attempts: self.max_retries,
        })
    }

    /// Run the tool once, streaming stdout and capturing stderr. Returns
    /// the stderr text as the diagnostic on any failure, including
    /// failure to spawn.
    async fn invoke(
        &self,
        staging: &Path,
        output_dir: &Path,
        scene_class: Option<&str>,
    ) -> Result<(), String> {
        let mut cmd = tokio::process::Command::new(&self.manim_cmd);
        cmd.arg("-ql")
            .arg("--media_dir")
            .arg(output_dir)
            .arg(staging)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        if let Some(name) = scene_class {
            cmd.arg(name);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to spawn {}: {}", self.manim_cmd, e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let stdout_task = async {
            if let Some(out) = stdout {
                let mut lines = BufReader::new(out).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("File ready at") {
                        info!("{line}");
                    } else {
                        debug!("{line}");
                    }
                }
            }
        };
        let stderr_task = async {
            let mut buf = String::new();
            if let Some(mut err) = stderr {
                let _ = err.read_to_string(&mut buf).await;
            }
            buf
        };
        let (_, stderr_text) = tokio::join!(stdout_task, stderr_task);

        let status = child
            .wait()
            .await
            .map_err(|e| format!("Failed to wait for {}: {}", self.manim_cmd, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(stderr_text)
        }
    }
}

/// Pull the entry-point class name out of the code, if one is declared.
pub fn detect_scene_class(code: &str) -> Option<String> {
    static SCENE_CLASS: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"class\s+(\w+)\((?:Voiceover)?Scene\)").expect("valid pattern")
    });
    SCENE_CLASS.captures(code).map(|caps| caps[1].to_string())
}

/// Most recently modified `.mp4` anywhere under `dir`.
fn newest_artifact(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"))
        })
        .max_by_key(|entry| {
            entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        })
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn detects_a_plain_scene_class() {
        let code = "from manim import *\n\nclass Parabola(Scene):\n    def construct(self):\n        pass\n";
        assert_eq!(detect_scene_class(code), Some("Parabola".to_string()));
    }

    #[test]
    fn detects_a_voiceover_scene_class() {
        let code = "class Narrated(VoiceoverScene):\n    pass\n";
        assert_eq!(detect_scene_class(code), Some("Narrated".to_string()));
    }

    #[test]
    fn no_scene_class_yields_none() {
        assert_eq!(detect_scene_class("x = 1\n"), None);
    }

    #[test]
    fn newest_artifact_prefers_latest_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/480p15");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("old.mp4"), b"a").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        std::fs::write(nested.join("new.mp4"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();

        let found = newest_artifact(dir.path()).unwrap();
        assert!(found.ends_with("new.mp4"));
    }

    #[test]
    fn newest_artifact_empty_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(newest_artifact(dir.path()), None);
    }

    #[cfg(unix)]
    fn stub_renderer(dir: &std::path::Path, script: &str) -> String {
        let path = dir.join("manim-stub");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    // Stub arg layout: $1=-ql $2=--media_dir $3=<output_dir> $4=<staging file>

    #[cfg(unix)]
    #[tokio::test]
    async fn render_returns_the_produced_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("media");
        let cmd = stub_renderer(
            dir.path(),
            "mkdir -p \"$3/videos\" && echo x > \"$3/videos/scene.mp4\"; exit 0",
        );

        let renderer = Renderer::new(&cmd);
        let artifact = renderer
            .render("class A(Scene):\n    pass\n", &out, None)
            .await
            .unwrap();
        assert!(artifact.ends_with("videos/scene.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sizing_keyword_failure_is_repaired_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("media");
        // Fails until the staged code carries height=, which only happens
        // after the y_length-rejected rule rewrites it.
        let cmd = stub_renderer(
            dir.path(),
            r#"if grep -q "height=" "$4"; then mkdir -p "$3/videos" && echo x > "$3/videos/fixed.mp4"; exit 0; else echo "AttributeError: 'Axes' object has no attribute 'y_length'" >&2; exit 1; fi"#,
        );

        let renderer = Renderer::new(&cmd);
        let artifact = renderer
            .render("ax = Axes(y_length=4)\n", &out, None)
            .await
            .unwrap();
        assert!(artifact.ends_with("fixed.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn persistent_failure_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("media");
        let cmd = stub_renderer(dir.path(), "echo 'unrelated crash' >&2; exit 1");

        let renderer = Renderer::new(&cmd).with_max_retries(2);
        let err = renderer
            .render("t = Text('hi')\n", &out, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Exhausted { attempts: 2 }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_exit_without_artifact_counts_as_a_failed_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("media");
        let cmd = stub_renderer(dir.path(), "exit 0");

        let renderer = Renderer::new(&cmd).with_max_retries(2);
        let err = renderer
            .render("t = Text('hi')\n", &out, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Exhausted { .. }));
    }
}
