//! Document structure rules: the model section, layer shape, naming.

use regex::Regex;

use super::{anchor, Rule, RuleContext};
use crate::config::ResolvedConfig;
use crate::diagnostics::{IssueCode, Severity, SourceRange, ValidationIssue};
use crate::error::RuleFault;
use crate::node::NodeKind;

// ============================================================================
// required-section
// ============================================================================

/// The root must hold a model section, and the model should have layers.
pub struct RequiredSectionRule;

impl Rule for RequiredSectionRule {
    fn name(&self) -> &'static str {
        "required-section"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let Some(model) = &ctx.model else {
            let mut issue = ValidationIssue::error(
                IssueCode::MissingModelSection,
                "Missing required 'model' section",
            )
            .with_range(SourceRange::document_start());
            for stray in ["layers", "train", "training"] {
                if let Some(entry) = ctx.root.entry(stray) {
                    issue = issue.with_related(
                        format!("'{}' is defined outside of a model section", stray),
                        entry.key.range,
                    );
                }
            }
            return Ok(vec![issue]);
        };

        let entries = ctx.layer_entries();
        let has_layers = entries.iter().any(|e| match &e.value.kind {
            NodeKind::Sequence(items) => !items.is_empty(),
            // a malformed `layers` value is reported by layer-shape
            NodeKind::Mapping(_) => true,
            NodeKind::Scalar(_) => !e.value.is_null(),
        });
        if has_layers {
            return Ok(vec![]);
        }

        let severity = if ctx.config.validation.empty_layers_as_error {
            Severity::Error
        } else {
            Severity::Warning
        };
        let message = format!("Model '{}' has no layers defined", model.display_name());
        Ok(vec![
            ValidationIssue::new(severity, IssueCode::NoLayers, message).with_range(model.key.range)
        ])
    }
}

// ============================================================================
// layer-shape
// ============================================================================

/// Every entry of a `layers` sequence is a mapping with a `type`.
pub struct LayerShapeRule;

impl Rule for LayerShapeRule {
    fn name(&self) -> &'static str {
        "layer-shape"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let mut issues = Vec::new();

        for entry in ctx.layer_entries() {
            let layers = &entry.value;
            let items = match &layers.kind {
                NodeKind::Sequence(items) => items,
                _ if layers.is_null() => continue,
                _ => {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::InvalidLayerEntry,
                            format!(
                                "'layers' must be a sequence of layer definitions, found a {}",
                                layers.kind_name()
                            ),
                        )
                        .with_range(anchor(layers, entry.key.range)),
                    );
                    continue;
                }
            };

            for (index, layer) in items.iter().enumerate() {
                let range = anchor(layer, layers.range);
                if layer.as_mapping().is_none() {
                    issues.push(
                        ValidationIssue::error(
                            IssueCode::InvalidLayerEntry,
                            format!(
                                "Layer {} must be a mapping with a 'type' field, found a {}",
                                index,
                                layer.kind_name()
                            ),
                        )
                        .with_range(range),
                    );
                    continue;
                }

                match layer.entry("type") {
                    None => issues.push(
                        ValidationIssue::error(
                            IssueCode::MissingLayerType,
                            format!("Layer {} is missing required field 'type'", index),
                        )
                        .with_range(range),
                    ),
                    Some(ty) if ty.value.as_str().map_or(true, |s| s.trim().is_empty()) => issues
                        .push(
                            ValidationIssue::error(
                                IssueCode::MissingLayerType,
                                format!("Layer {} has an empty or non-string 'type'", index),
                            )
                            .with_range(anchor(&ty.value, ty.key.range)),
                        ),
                    Some(_) => {}
                }
            }
        }

        Ok(issues)
    }
}

// ============================================================================
// naming-convention
// ============================================================================

/// Model names match `validation.modelNamePattern`.
pub struct NamingConventionRule;

impl Rule for NamingConventionRule {
    fn name(&self) -> &'static str {
        "naming-convention"
    }

    fn enabled(&self, config: &ResolvedConfig) -> bool {
        config.validation.check_naming_conventions
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<Vec<ValidationIssue>, RuleFault> {
        let Some(name) = ctx.model.as_ref().and_then(|m| m.name.as_ref()) else {
            return Ok(vec![]);
        };

        let pattern = &ctx.config.validation.model_name_pattern;
        let re = Regex::new(pattern).map_err(|e| RuleFault::failed(self.name(), e.to_string()))?;
        if re.is_match(&name.text) {
            return Ok(vec![]);
        }

        Ok(vec![ValidationIssue::warning(
            IssueCode::NamingConvention,
            format!(
                "Model name '{}' does not follow the naming convention ({})",
                name.text, pattern
            ),
        )
        .with_range(name.range)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Position;
    use crate::loader::load;

    fn run(rule: &dyn Rule, text: &str, config: &ResolvedConfig) -> Vec<ValidationIssue> {
        let root = load(text).unwrap();
        rule.evaluate(&RuleContext::new(&root, config)).unwrap()
    }

    #[test]
    fn test_missing_model_points_at_stray_sections() {
        let issues = run(
            &RequiredSectionRule,
            "layers:\n  - type: dense\ntrain:\n  epochs: 1\n",
            &ResolvedConfig::default(),
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::MissingModelSection);
        assert_eq!(issues[0].related.len(), 2);
        assert_eq!(issues[0].related[1].range.unwrap().start, Position::new(2, 0));
    }

    #[test]
    fn test_empty_layers_policy() {
        let text = "model Net:\n  layers: []\n";
        let issues = run(&RequiredSectionRule, text, &ResolvedConfig::default());
        assert_eq!(issues[0].code, IssueCode::NoLayers);
        assert_eq!(issues[0].severity, Severity::Warning);

        let mut config = ResolvedConfig::default();
        config.validation.empty_layers_as_error = true;
        let issues = run(&RequiredSectionRule, text, &config);
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn test_root_layers_satisfy_model() {
        let text = "model Net:\n  name: Net\nlayers:\n  - type: dense\n";
        assert!(run(&RequiredSectionRule, text, &ResolvedConfig::default()).is_empty());
    }

    #[test]
    fn test_layer_shape_issues() {
        let text = "model Net:\n  layers:\n    - dense\n    - units: 3\n    - type: ''\n    - type: relu\n";
        let issues = run(&LayerShapeRule, text, &ResolvedConfig::default());
        let codes: Vec<_> = issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["E1002", "E1003", "E1003"]);
        assert!(issues[0].message.starts_with("Layer 0"));
        assert_eq!(issues[1].range.unwrap().start, Position::new(3, 6));
    }

    #[test]
    fn test_layers_not_a_sequence() {
        let issues = run(
            &LayerShapeRule,
            "model Net:\n  layers: dense\n",
            &ResolvedConfig::default(),
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::InvalidLayerEntry);
    }

    #[test]
    fn test_naming_convention() {
        let config = ResolvedConfig::default();
        let issues = run(&NamingConventionRule, "model mnist_net:\n  layers: []\n", &config);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].range.unwrap().start, Position::new(0, 6));
        assert!(run(&NamingConventionRule, "model MnistNet:\n", &config).is_empty());
    }
}
