//! Configuration resolution
//!
//! Settings arrive as JSON trees from three layers: compiled defaults,
//! workspace settings and per-document overrides. Layers are deep-merged
//! (later layer wins per key, nested objects merge key-wise) and then
//! flattened into a [`ResolvedConfig`]. Unknown keys are ignored.

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::warn;

/// Configured problem limits are clamped to this value
pub const MAX_PROBLEMS_CAP: usize = 1000;

pub const DEFAULT_MAX_PROBLEMS: usize = 100;

/// PascalCase model names
pub const DEFAULT_MODEL_NAME_PATTERN: &str = "^[A-Z][a-zA-Z0-9]*$";

/// Flattened record of every recognised option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub validation: ValidationSettings,
    pub format: FormatSettings,
    pub experimental: ExperimentalSettings,
    pub max_number_of_problems: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSettings {
    pub enable: bool,
    /// When false, warnings are kept in the result but not published
    pub strict: bool,
    pub check_naming_conventions: bool,
    pub check_deprecated: bool,
    pub check_performance: bool,
    pub check_security: bool,
    /// Raise a model without layers as an error instead of a warning
    pub empty_layers_as_error: bool,
    pub model_name_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSettings {
    pub enable: bool,
    pub insert_final_newline: bool,
    pub trim_trailing_whitespace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentalSettings {
    pub enable_advanced_validation: bool,
    pub enable_type_checking: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            validation: ValidationSettings {
                enable: true,
                strict: true,
                check_naming_conventions: true,
                check_deprecated: true,
                check_performance: true,
                check_security: true,
                empty_layers_as_error: false,
                model_name_pattern: DEFAULT_MODEL_NAME_PATTERN.to_string(),
            },
            format: FormatSettings {
                enable: true,
                insert_final_newline: true,
                trim_trailing_whitespace: true,
            },
            experimental: ExperimentalSettings {
                enable_advanced_validation: false,
                enable_type_checking: false,
            },
            max_number_of_problems: DEFAULT_MAX_PROBLEMS,
        }
    }
}

impl ResolvedConfig {
    /// Problem limit after clamping
    pub fn problem_limit(&self) -> usize {
        self.max_number_of_problems.min(MAX_PROBLEMS_CAP)
    }
}

/// Compiled defaults as a settings tree, the bottom layer of every resolution.
pub fn default_settings() -> Value {
    let d = ResolvedConfig::default();
    json!({
        "validation": {
            "enable": d.validation.enable,
            "strict": d.validation.strict,
            "checkNamingConventions": d.validation.check_naming_conventions,
            "checkDeprecated": d.validation.check_deprecated,
            "checkPerformance": d.validation.check_performance,
            "checkSecurity": d.validation.check_security,
            "emptyLayersAsError": d.validation.empty_layers_as_error,
            "modelNamePattern": d.validation.model_name_pattern,
        },
        "format": {
            "enable": d.format.enable,
            "insertFinalNewline": d.format.insert_final_newline,
            "trimTrailingWhitespace": d.format.trim_trailing_whitespace,
        },
        "experimental": {
            "enableAdvancedValidation": d.experimental.enable_advanced_validation,
            "enableTypeChecking": d.experimental.enable_type_checking,
        },
        "maxNumberOfProblems": d.max_number_of_problems,
    })
}

/// Merge the three layers and flatten the result.
pub fn resolve(global: &Value, workspace: &Value, resource: &Value) -> ResolvedConfig {
    let mut merged = expand_dotted(global.clone());
    merge(&mut merged, expand_dotted(workspace.clone()));
    merge(&mut merged, expand_dotted(resource.clone()));
    flatten(&merged)
}

/// Expand `"a.b": v` keys into nested objects, recursively.
///
/// When a dotted key and a nested object name the same setting, whichever
/// appears later in the object wins.
pub fn expand_dotted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Value::Object(Map::new());
            for (key, v) in map {
                let v = expand_dotted(v);
                let nested = key.rsplit('.').fold(v, |acc, part| {
                    let mut map = Map::new();
                    map.insert(part.to_string(), acc);
                    Value::Object(map)
                });
                merge(&mut out, nested);
            }
            out
        }
        other => other,
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge key-wise. A scalar whose JSON type differs from the value
/// it would replace is ignored so a malformed layer cannot corrupt a good one.
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => {
                        if compatible(existing, &value) {
                            merge(existing, value);
                        } else {
                            warn!(
                                key = %key,
                                expected = type_name(existing),
                                found = type_name(&value),
                                "ignoring setting with unexpected type"
                            );
                        }
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => {
            // a null or mistyped layer leaves the base alone
            if compatible(base, &overlay) {
                *base = overlay;
            }
        }
    }
}

fn compatible(existing: &Value, incoming: &Value) -> bool {
    existing.is_null()
        || std::mem::discriminant(existing) == std::mem::discriminant(incoming)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn flag(merged: &Value, pointer: &str, default: bool) -> bool {
    match merged.pointer(pointer) {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!(setting = pointer, found = type_name(other), "expected a boolean");
            default
        }
    }
}

fn flatten(merged: &Value) -> ResolvedConfig {
    let d = ResolvedConfig::default();

    let model_name_pattern = match merged.pointer("/validation/modelNamePattern") {
        Some(Value::String(p)) if Regex::new(p).is_ok() => p.clone(),
        Some(Value::String(p)) => {
            warn!(pattern = %p, "invalid model name pattern, using the default");
            d.validation.model_name_pattern.clone()
        }
        _ => d.validation.model_name_pattern.clone(),
    };

    let max_number_of_problems = match merged.pointer("/maxNumberOfProblems") {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) if n > 0 => (n as usize).min(MAX_PROBLEMS_CAP),
            _ => {
                warn!(value = %n, "maxNumberOfProblems must be a positive integer");
                d.max_number_of_problems
            }
        },
        _ => d.max_number_of_problems,
    };

    ResolvedConfig {
        validation: ValidationSettings {
            enable: flag(merged, "/validation/enable", d.validation.enable),
            strict: flag(merged, "/validation/strict", d.validation.strict),
            check_naming_conventions: flag(
                merged,
                "/validation/checkNamingConventions",
                d.validation.check_naming_conventions,
            ),
            check_deprecated: flag(
                merged,
                "/validation/checkDeprecated",
                d.validation.check_deprecated,
            ),
            check_performance: flag(
                merged,
                "/validation/checkPerformance",
                d.validation.check_performance,
            ),
            check_security: flag(merged, "/validation/checkSecurity", d.validation.check_security),
            empty_layers_as_error: flag(
                merged,
                "/validation/emptyLayersAsError",
                d.validation.empty_layers_as_error,
            ),
            model_name_pattern,
        },
        format: FormatSettings {
            enable: flag(merged, "/format/enable", d.format.enable),
            insert_final_newline: flag(
                merged,
                "/format/insertFinalNewline",
                d.format.insert_final_newline,
            ),
            trim_trailing_whitespace: flag(
                merged,
                "/format/trimTrailingWhitespace",
                d.format.trim_trailing_whitespace,
            ),
        },
        experimental: ExperimentalSettings {
            enable_advanced_validation: flag(
                merged,
                "/experimental/enableAdvancedValidation",
                d.experimental.enable_advanced_validation,
            ),
            enable_type_checking: flag(
                merged,
                "/experimental/enableTypeChecking",
                d.experimental.enable_type_checking,
            ),
        },
        max_number_of_problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_round_trip() {
        let resolved = resolve(&default_settings(), &Value::Null, &Value::Null);
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn test_later_layer_wins_per_key() {
        let workspace = json!({"validation": {"strict": false, "checkSecurity": false}});
        let resource = json!({"validation": {"strict": true}});
        let resolved = resolve(&default_settings(), &workspace, &resource);
        assert!(resolved.validation.strict);
        assert!(!resolved.validation.check_security);
        // untouched siblings survive the nested merge
        assert!(resolved.validation.check_deprecated);
    }

    #[test]
    fn test_dotted_keys() {
        let workspace = json!({"validation.strict": false, "experimental.enableTypeChecking": true});
        let resolved = resolve(&default_settings(), &workspace, &Value::Null);
        assert!(!resolved.validation.strict);
        assert!(resolved.experimental.enable_type_checking);
    }

    #[test]
    fn test_wrong_type_keeps_lower_layer() {
        let workspace = json!({"validation": {"strict": false}});
        let resource = json!({"validation": {"strict": "yes"}});
        let resolved = resolve(&default_settings(), &workspace, &resource);
        assert!(!resolved.validation.strict);
    }

    #[test]
    fn test_problem_limit_is_clamped() {
        let resolved = resolve(&default_settings(), &json!({"maxNumberOfProblems": 5000}), &Value::Null);
        assert_eq!(resolved.max_number_of_problems, MAX_PROBLEMS_CAP);

        let resolved = resolve(&default_settings(), &json!({"maxNumberOfProblems": 0}), &Value::Null);
        assert_eq!(resolved.max_number_of_problems, DEFAULT_MAX_PROBLEMS);

        let resolved = resolve(&default_settings(), &json!({"maxNumberOfProblems": 2}), &Value::Null);
        assert_eq!(resolved.problem_limit(), 2);
    }

    #[test]
    fn test_invalid_pattern_falls_back() {
        let workspace = json!({"validation": {"modelNamePattern": "([unclosed"}});
        let resolved = resolve(&default_settings(), &workspace, &Value::Null);
        assert_eq!(resolved.validation.model_name_pattern, DEFAULT_MODEL_NAME_PATTERN);
    }

    #[test]
    fn test_non_object_layer_is_ignored() {
        let resolved = resolve(&default_settings(), &json!("strict"), &json!([1, 2]));
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let workspace = json!({"validation": {"somethingNew": 1}, "trace": {"server": "verbose"}});
        let resolved = resolve(&default_settings(), &workspace, &Value::Null);
        assert_eq!(resolved, ResolvedConfig::default());
    }
}
