//! Heuristic code repair for known Manim API-signature mismatches.
//!
//! Manim versions disagree on the sizing keywords accepted by `Axes`:
//! some take `height=`/`width=`, others `y_length=`/`x_length=`. A small
//! ordered rule table covering both directions recovers most render
//! failures far more cheaply than re-synthesizing the code.

/// One repair rule: a trigger over (code, diagnostic, retry index) and a
/// rewrite to apply when it is the first match.
pub struct RepairRule {
    pub name: &'static str,
    pub trigger: fn(code: &str, diagnostic: &str, attempt: u32) -> bool,
    pub transform: fn(&str) -> String,
}

/// A rule application: which rule fired and the rewritten code.
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub rule: &'static str,
    pub code: String,
}

/// Apply the first rule whose trigger matches, in table order.
pub fn apply_first_match(
    rules: &[RepairRule],
    code: &str,
    diagnostic: &str,
    attempt: u32,
) -> Option<Repair> {
    rules
        .iter()
        .find(|rule| (rule.trigger)(code, diagnostic, attempt))
        .map(|rule| Repair {
            rule: rule.name,
            code: (rule.transform)(code),
        })
}

/// Render-failure rules, ordered: diagnostic-driven renames first, then
/// code-driven renames, then first-retry-only reverse renames.
pub static RENDER_RULES: &[RepairRule] = &[
    RepairRule {
        name: "y_length-rejected",
        trigger: |code, diag, _| {
            diag.contains("has no attribute 'y_length'") && !code.contains("height")
        },
        transform: |code| code.replace("y_length=", "height="),
    },
    RepairRule {
        name: "x_length-rejected",
        trigger: |code, diag, _| {
            diag.contains("has no attribute 'x_length'") && !code.contains("width")
        },
        transform: |code| code.replace("x_length=", "width="),
    },
    RepairRule {
        name: "y_length-present",
        trigger: |code, _, _| code.contains("y_length"),
        transform: |code| code.replace("y_length=", "height="),
    },
    RepairRule {
        name: "x_length-present",
        trigger: |code, _, _| code.contains("x_length"),
        transform: |code| code.replace("x_length=", "width="),
    },
    RepairRule {
        name: "height-first-retry",
        trigger: |code, _, attempt| code.contains("height=") && attempt == 0,
        transform: |code| code.replace("height=", "y_length="),
    },
    RepairRule {
        name: "width-first-retry",
        trigger: |code, _, attempt| code.contains("width=") && attempt == 0,
        transform: |code| code.replace("width=", "x_length="),
    },
];

/// Synthesis-side gate: `Axes(` rejects `height=` in current Manim, so
/// rewrite it before accepting otherwise-valid code. Returns `None` when
/// no trigger keyword is present (the gate must leave correct code alone).
pub fn axes_height_rewrite(code: &str) -> Option<String> {
    if code.contains("Axes(") && code.contains("height=") {
        Some(code.replace("height=", "y_length="))
    } else {
        None
    }
}

/// Diagnostic for `Axes(` code still carrying a rejected sizing keyword.
pub fn axes_invalid_keyword(code: &str) -> Option<String> {
    if !code.contains("Axes(") {
        return None;
    }
    ["height=", "width="]
        .iter()
        .find(|kw| code.contains(**kw))
        .map(|kw| {
            format!("{kw} is not a valid parameter for Axes; use x_length and y_length instead")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_rule_matches_before_code_rules() {
        let code = "ax = Axes(y_length=4)\n";
        let diag = "AttributeError: 'Axes' object has no attribute 'y_length'";
        let repair = apply_first_match(RENDER_RULES, code, diag, 2).unwrap();
        assert_eq!(repair.rule, "y_length-rejected");
        assert_eq!(repair.code, "ax = Axes(height=4)\n");
    }

    #[test]
    fn diagnostic_rule_skipped_when_height_already_present() {
        // First rule's trigger requires the target keyword to be absent;
        // the code-driven rule fires instead.
        let code = "ax = Axes(y_length=4, height_hint=1)\n";
        let diag = "has no attribute 'y_length'";
        let repair = apply_first_match(RENDER_RULES, code, diag, 2).unwrap();
        assert_eq!(repair.rule, "y_length-present");
    }

    #[test]
    fn code_rule_fires_without_matching_diagnostic() {
        let code = "ax = Axes(x_length=6)\n";
        let repair = apply_first_match(RENDER_RULES, code, "some other error", 3).unwrap();
        assert_eq!(repair.rule, "x_length-present");
        assert_eq!(repair.code, "ax = Axes(width=6)\n");
    }

    #[test]
    fn reverse_rename_only_on_first_retry() {
        let code = "ax = Axes(height=4)\n";
        let first = apply_first_match(RENDER_RULES, code, "boom", 0).unwrap();
        assert_eq!(first.rule, "height-first-retry");
        assert_eq!(first.code, "ax = Axes(y_length=4)\n");

        assert!(apply_first_match(RENDER_RULES, code, "boom", 1).is_none());
    }

    #[test]
    fn no_rule_matches_plain_code() {
        let code = "t = Text('hi')\n";
        assert!(apply_first_match(RENDER_RULES, code, "unrelated failure", 1).is_none());
    }

    #[test]
    fn axes_height_rewrite_renames_and_only_when_triggered() {
        let code = "ax = Axes(height=4)\nself.play(Create(ax))\n";
        assert_eq!(
            axes_height_rewrite(code).unwrap(),
            "ax = Axes(y_length=4)\nself.play(Create(ax))\n"
        );

        // Idempotent on already-correct code: no trigger, no change.
        assert!(axes_height_rewrite("ax = Axes(y_length=4)\n").is_none());
        assert!(axes_height_rewrite("h = Rectangle(height=2)\n").is_none());
    }

    #[test]
    fn axes_invalid_keyword_reports_remaining_sizing_params() {
        assert!(axes_invalid_keyword("ax = Axes(width=3)\n")
            .unwrap()
            .contains("width="));
        assert!(axes_invalid_keyword("ax = Axes(x_length=3)\n").is_none());
        assert!(axes_invalid_keyword("r = Rectangle(width=3)\n").is_none());
    }
}
