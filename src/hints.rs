//! Hint-template registry: a process-wide, load-once table mapping a hint
//! tag to its severity and explanation template (spec.md §4.7/§9 "Global
//! mutable state"). The original engine loads this from a JSON file shipped
//! with the distribution once per process and never reloads it afterwards;
//! we mirror that with a `once_cell::sync::Lazy` static.

use crate::result::Hint;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HintDefinition {
    pub tag: &'static str,
    pub severity: &'static str,
    pub explanation: &'static str,
}

/// The built-in hint templates. A real deployment would load these from a
/// JSON file shipped alongside the binary; this crate ships a small fixed
/// set covering the conditions the engine itself raises.
static HINT_REGISTRY: Lazy<HashMap<&'static str, HintDefinition>> = Lazy::new(|| {
    let defs = [
        HintDefinition {
            tag: "no-metainfo",
            severity: "info",
            explanation: "This package does not ship any AppStream metainfo.",
        },
        HintDefinition {
            tag: "metainfo-parse-error",
            severity: "error",
            explanation: "The package's metainfo file could not be parsed: {error}.",
        },
        HintDefinition {
            tag: "icon-not-found",
            severity: "warning",
            explanation: "The icon referenced by this component, {icon}, could not be found.",
        },
        HintDefinition {
            tag: "component-removed",
            severity: "info",
            explanation: "This component was removed by an injected modification.",
        },
    ];
    defs.into_iter().map(|d| (d.tag, d)).collect()
});

/// Looks up a hint template by tag.
pub fn lookup(tag: &str) -> Option<&'static HintDefinition> {
    HINT_REGISTRY.get(tag)
}

/// Dumps the whole registry as a JSON object `{tag: {severity, explanation}}`,
/// for `hint-definitions.json` (spec.md §4.7 step 5): lets downstream tools
/// resolve a hint's severity/explanation without loading this crate.
pub fn registry_as_json() -> serde_json::Value {
    let mut defs: Vec<&HintDefinition> = HINT_REGISTRY.values().collect();
    defs.sort_by_key(|d| d.tag);
    let map: serde_json::Map<String, serde_json::Value> = defs
        .into_iter()
        .map(|d| {
            (
                d.tag.to_string(),
                serde_json::json!({ "severity": d.severity, "explanation": d.explanation }),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

/// Builds a [`Hint`] from a registered template, substituting `{name}`
/// placeholders in the explanation from `vars`.
///
/// Falls back to an `unknown-hint` severity of `error` if `tag` isn't
/// registered, so a typo in calling code surfaces in the catalog's hint
/// output rather than silently vanishing.
pub fn make_hint(tag: &str, vars: HashMap<String, String>) -> Hint {
    match lookup(tag) {
        Some(def) => {
            let mut explanation = def.explanation.to_string();
            for (key, value) in &vars {
                explanation = explanation.replace(&format!("{{{key}}}"), value);
            }
            Hint {
                tag: def.tag.to_string(),
                severity: def.severity.to_string(),
                explanation,
                vars,
            }
        }
        None => Hint {
            tag: "unknown-hint".to_string(),
            severity: "error".to_string(),
            explanation: format!("No hint template registered for tag '{tag}'."),
            vars,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_builtin_tag() {
        assert!(lookup("no-metainfo").is_some());
        assert!(lookup("does-not-exist").is_none());
    }

    #[test]
    fn registry_dump_contains_every_builtin_tag() {
        let json = registry_as_json();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("no-metainfo"));
        assert!(obj.contains_key("icon-not-found"));
        assert_eq!(obj["no-metainfo"]["severity"], "info");
    }

    #[test]
    fn make_hint_substitutes_placeholders() {
        let mut vars = HashMap::new();
        vars.insert("icon".to_string(), "foo.png".to_string());
        let hint = make_hint("icon-not-found", vars);
        assert_eq!(hint.severity, "warning");
        assert!(hint.explanation.contains("foo.png"));
        assert!(!hint.explanation.contains('{'));
    }

    #[test]
    fn make_hint_falls_back_for_unknown_tag() {
        let hint = make_hint("totally-unregistered", HashMap::new());
        assert_eq!(hint.tag, "unknown-hint");
        assert_eq!(hint.severity, "error");
    }
}
