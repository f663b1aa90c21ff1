//! Prompt templates and response clean-up.

use crate::refactor::RefactorRequest;

const COMPONENT_TEMPLATE: &str = "\
You are migrating a legacy React codebase from JavaScript to TypeScript.

Convert the React class component below into an idiomatic TypeScript React
function component:
- replace the class with a function component and hooks (useState, useEffect,
  useCallback, useRef) that preserve the lifecycle behaviour;
- declare a `Props` interface (and a `State`-shaped set of hooks where needed)
  instead of PropTypes;
- keep every export, default export and displayed markup unchanged;
- type event handlers and refs precisely, avoid `any`.

Reply with the complete contents of the new .tsx file and nothing else.

File: {path}

{source}
";

const SCRIPT_TEMPLATE: &str = "\
You are migrating a legacy codebase from JavaScript to TypeScript.

Convert the JavaScript module below into idiomatic TypeScript:
- add explicit parameter and return types to every function;
- introduce interfaces or type aliases for object shapes;
- convert `require`/`module.exports` to ES module imports and exports;
- keep behaviour and the public API unchanged, avoid `any`.

Reply with the complete contents of the new .ts file and nothing else.

File: {path}

{source}
";

/// Renders the prompt for one file.
#[must_use]
pub fn build(request: &RefactorRequest) -> String {
    let template = if request.is_component {
        COMPONENT_TEMPLATE
    } else {
        SCRIPT_TEMPLATE
    };
    template
        .replace("{path}", &request.file_path.display().to_string())
        .replace("{source}", &request.source_text)
}

/// Strips a single Markdown code fence wrapping the whole reply and makes
/// sure the text ends with a newline.
#[must_use]
pub fn clean_response(text: &str) -> String {
    let trimmed = text.trim();
    let body = unfence(trimmed).unwrap_or(trimmed);
    let mut out = body.trim_end().to_string();
    out.push('\n');
    out
}

fn unfence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let rest = rest.strip_suffix("```")?;
    // Drop the info string (```tsx) on the opening line.
    let (_, body) = rest.split_once('\n')?;
    if body.contains("\n```") {
        return None;
    }
    Some(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(is_component: bool) -> RefactorRequest {
        RefactorRequest {
            file_path: PathBuf::from("src/Widget.js"),
            source_text: "export default 42;".into(),
            is_component,
        }
    }

    #[test]
    fn component_prompt_asks_for_tsx() {
        let prompt = build(&request(true));
        assert!(prompt.contains(".tsx file"));
        assert!(prompt.contains("File: src/Widget.js"));
        assert!(prompt.ends_with("export default 42;\n"));
    }

    #[test]
    fn script_prompt_asks_for_ts() {
        let prompt = build(&request(false));
        assert!(prompt.contains(".ts file"));
        assert!(!prompt.contains("React"));
    }

    #[test]
    fn source_braces_are_not_template_slots() {
        let mut req = request(false);
        req.source_text = "const o = { path: 1 };".into();
        assert!(build(&req).contains("const o = { path: 1 };"));
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let reply = "```tsx\nconst a: number = 1;\n```";
        assert_eq!(clean_response(reply), "const a: number = 1;\n");
    }

    #[test]
    fn bare_reply_gets_trailing_newline() {
        assert_eq!(clean_response("let b = 2;"), "let b = 2;\n");
    }

    #[test]
    fn multiple_fences_are_left_alone() {
        let reply = "```ts\na\n```\ntext\n```ts\nb\n```";
        assert_eq!(clean_response(reply), format!("{reply}\n"));
    }
}
