//! Fixed instructions sent to the generative models.

/// System instruction for Manim code synthesis.
pub const CODE_SYSTEM_PROMPT: &str = r#"You write Manim Community Edition code for short explanatory videos.

Rules:
- Output exactly one Python code block fenced with ```python markers.
- Define a single class deriving from Scene with a construct method.
- Keep every element on screen: font_size 30, generous spacing around
  MathTex symbols, and nothing overlapping.
- Prefer ReplacementTransform over .next_to/.move_to chains when moving
  from one step to the next, and call self.clear() before and after any
  visualization so nothing overlaps.
- Keep visualizations small and centered; never show equations and
  visualizations at the same time.
- Prioritize code that runs over elaborate animation.
- Keep the scene short and simple.
"#;

/// Instruction for decomposing a prompt into scenes. The model is invoked
/// in structured-JSON mode with the scene-plan schema, so the output shape
/// is enforced separately.
pub const SCENE_PLAN_PROMPT: &str = r#"Break the request below into scenes for a Manim video.

- Produce between 1 and 5 scenes; prefer a single scene for simple topics.
- Each scene needs a short title and a brief description of what to show.
- Descriptions are a high-level overview: no mathematical derivations, no
  code. Mention clearing the screen before and after any visualization.
- Skip visualizations entirely unless the request asks for them.

Request:
"#;

/// Instruction for wrapping rendered scene code with narration.
pub const NARRATION_PROMPT: &str = r#"Rewrite the Manim code below as a voiceover scene.

Follow this structure exactly:

```python
from manim import *
from manim_voiceover import VoiceoverScene
from manim_voiceover.services.elevenlabs import ElevenLabsService
import ssl
import numpy as np

ssl._create_default_https_context = ssl._create_unverified_context
config.renderer = "cairo"

class Narrated(VoiceoverScene):
    def construct(self):
        self.set_speech_service(
            ElevenLabsService(
                voice_name="Adam",
                voice_settings={"stability": 0.1, "similarity_boost": 0.3},
            )
        )
        title = Text("Hello", font_size=30).to_edge(UP)
        with self.voiceover(text="A short line about the topic.") as tracker:
            self.play(Write(title), run_time=tracker.duration)
        with self.voiceover(text="A closing line."):
            self.play(FadeOut(title))
```

- Wrap each self.play in a voiceover block and pass
  run_time=tracker.duration, except the final play which needs neither.
- Narration text covers the topic, equations, and headings in short
  sentences; never describe transitions or the code itself.
- Return the entire rewritten program in one ```python block.

Code:
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_prompt_demands_a_fenced_block() {
        assert!(CODE_SYSTEM_PROMPT.contains("```python"));
        assert!(CODE_SYSTEM_PROMPT.contains("Scene"));
    }

    #[test]
    fn scene_prompt_bounds_the_scene_count() {
        assert!(SCENE_PLAN_PROMPT.contains("1 and 5"));
    }

    #[test]
    fn narration_prompt_shows_the_voiceover_shape() {
        assert!(NARRATION_PROMPT.contains("VoiceoverScene"));
        assert!(NARRATION_PROMPT.contains("tracker.duration"));
    }
}
