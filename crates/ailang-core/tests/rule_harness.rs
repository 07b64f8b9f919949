//! Rule Test Harness - table-driven validation suite
//!
//! Runs whole documents through the loader and rule engine and checks:
//! - Loader acceptance and syntax faults
//! - Every rule code and its severity
//! - Determinism of issue ordering
//!
//! Run with: cargo test -p ailang-core --test rule_harness

use ailang_core::{
    default_settings, resolve, IssueCode, ResolvedConfig, Severity, Validation, Validator,
};
use pretty_assertions::assert_eq;
use serde_json::json;

// =============================================================================
// TEST CASE DEFINITIONS
// =============================================================================

struct TestCase {
    name: &'static str,
    input: &'static str,
    expected: Expected,
}

#[derive(Debug, Clone, PartialEq)]
enum Expected {
    /// No issues at all
    Clean,
    /// Loads and has no errors (warnings allowed)
    Valid,
    /// Syntax fault whose message contains the text
    ParseError(&'static str),
    /// Exactly these codes, in order
    Codes(&'static [&'static str]),
    /// At least these codes, in any order
    Contains(&'static [&'static str]),
}

// =============================================================================
// LOADER CASES
// =============================================================================

const LOADER_CASES: &[TestCase] = &[
    TestCase {
        name: "header_model_with_layers",
        input: "model MnistNet:\n  layers:\n    - type: dense\n      units: 64\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "model_with_name_field",
        input: "model:\n  name: MnistNet\n  layers:\n    - type: dense\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "document_marker_and_comments",
        input: "---\n# header comment\nmodel Net:   # trailing\n  layers:\n    - type: dense # inline\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "flow_layers",
        input: "model Net:\n  layers: [{type: conv2d, kernel_size: [3, 3]}, {type: dense}]\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "multiline_flow_layers",
        input: "model Net:\n  layers: [\n    {type: dense},  # first\n    {type: dropout, rate: 0.2}\n  ]\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "crlf_line_endings",
        input: "model Net:\r\n  layers:\r\n    - type: dense\r\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "block_scalar_description",
        input: "model Net:\n  description: |\n    A small network.\n    Two lines.\n  layers:\n    - type: dense\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "unicode_values",
        input: "model Net:\n  description: \"réseau 🚀\"\n  layers:\n    - type: dense\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "tab_indentation",
        input: "model Net:\n\tlayers: []\n",
        expected: Expected::ParseError("tab"),
    },
    TestCase {
        name: "duplicate_key",
        input: "model Net:\n  layers: []\n  layers: []\n",
        expected: Expected::ParseError("duplicate key 'layers'"),
    },
    TestCase {
        name: "unterminated_flow",
        input: "model Net:\n  layers: [{type: dense}\n",
        expected: Expected::ParseError("flow sequence"),
    },
    TestCase {
        name: "unterminated_string",
        input: "model Net:\n  name: \"Net\n",
        expected: Expected::ParseError("quoted scalar"),
    },
    TestCase {
        name: "inconsistent_indentation",
        input: "model Net:\n    layers: []\n  train: {}\n",
        expected: Expected::ParseError("expected key"),
    },
    TestCase {
        name: "mixed_sequence_and_mapping",
        input: "model Net:\n  layers: []\n  - type: dense\n",
        expected: Expected::ParseError("expected key"),
    },
    TestCase {
        name: "second_document",
        input: "model Net:\n  layers: []\n---\nmodel Other:\n",
        expected: Expected::ParseError("multiple documents"),
    },
];

// =============================================================================
// RULE CASES
// =============================================================================

const RULE_CASES: &[TestCase] = &[
    TestCase {
        name: "stray_layers_without_model",
        input: "layers:\n  - foo: 1\n",
        expected: Expected::Codes(&["E1001", "E1003"]),
    },
    TestCase {
        name: "flow_training_extremes",
        input: "train: {learning_rate: 5, batch_size: -1}\n",
        expected: Expected::Codes(&["E1001", "W1003", "E1005"]),
    },
    TestCase {
        name: "empty_document",
        input: "",
        expected: Expected::Codes(&["E1001"]),
    },
    TestCase {
        name: "model_without_layers",
        input: "model Net:\n  train:\n    epochs: 3\n",
        expected: Expected::Codes(&["W1001"]),
    },
    TestCase {
        name: "null_model",
        input: "model:\n",
        expected: Expected::Codes(&["W1001"]),
    },
    TestCase {
        name: "non_mapping_layer",
        input: "model Net:\n  layers:\n    - dense\n    - type: dropout\n",
        expected: Expected::Codes(&["E1002"]),
    },
    TestCase {
        name: "layers_is_scalar",
        input: "model Net:\n  layers: dense\n",
        expected: Expected::Codes(&["E1002"]),
    },
    TestCase {
        name: "invalid_learning_rate",
        input: "model Net:\n  layers: [{type: dense}]\n  train:\n    learning_rate: fast\n",
        expected: Expected::Codes(&["E1004"]),
    },
    TestCase {
        name: "low_learning_rate_and_large_batch",
        input: "model Net:\n  layers: [{type: dense}]\n  train:\n    learning_rate: 0.0000001\n    batch_size: 2048\n",
        expected: Expected::Codes(&["W1004", "W1005"]),
    },
    TestCase {
        name: "zero_learning_rate",
        input: "model Net:\n  layers: [{type: dense}]\n  train:\n    learning_rate: 0\n",
        expected: Expected::Codes(&["W1004"]),
    },
    TestCase {
        name: "quoted_numbers_accepted",
        input: "model Net:\n  layers: [{type: dense}]\ntraining:\n  learning_rate: \"0.001\"\n  batch_size: \"32\"\n",
        expected: Expected::Clean,
    },
    TestCase {
        name: "naming_convention",
        input: "model mnist_net:\n  layers: [{type: dense}]\n",
        expected: Expected::Codes(&["W1002"]),
    },
    TestCase {
        name: "deprecated_features",
        input: "model Net:\n  layers:\n    - type: simple_rnn\n  train:\n    optimizer: sgd\n",
        expected: Expected::Codes(&["W1006", "W1007"]),
    },
    TestCase {
        name: "performance_hints",
        input: "model Net:\n  layers:\n    - {type: dense, units: 10000}\n    - {type: dense, units: 10}\n",
        expected: Expected::Codes(&["P1001", "P1100"]),
    },
    TestCase {
        name: "inline_credential",
        input: "model Net:\n  layers: [{type: dense}]\n  dataset:\n    password: hunter2\n",
        expected: Expected::Codes(&["S1001"]),
    },
    TestCase {
        name: "warnings_only_is_valid",
        input: "model Net:\n  layers: [{type: dense}]\n  train: {learning_rate: 0.1}\n",
        expected: Expected::Valid,
    },
    TestCase {
        name: "everything_at_once",
        input: "model bad:\n  layers:\n    - 3\n    - units: 2\ntrain:\n  learning_rate: x\n  batch_size: 0\n",
        expected: Expected::Contains(&["E1002", "E1003", "E1004", "E1005", "W1002"]),
    },
];

// =============================================================================
// RUNNER
// =============================================================================

fn run_test_case(case: &TestCase, config: &ResolvedConfig) {
    let validation = Validator::default().validate(case.input, config);
    let codes: Vec<&str> = validation.issues().iter().map(|i| i.code.as_str()).collect();

    match &case.expected {
        Expected::Clean => {
            assert!(
                validation.issues().is_empty(),
                "Test '{}' expected no issues but got {:?}\n\nInput:\n{}",
                case.name,
                validation.issues(),
                case.input
            );
        }
        Expected::Valid => {
            assert!(
                validation.is_valid(),
                "Test '{}' expected valid but got {:?}\n\nInput:\n{}",
                case.name,
                codes,
                case.input
            );
        }
        Expected::ParseError(fragment) => match &validation {
            Validation::SyntaxFault { fault, issue } => {
                assert_eq!(issue.code, IssueCode::ParseFailure, "Test '{}'", case.name);
                assert!(
                    fault.message.contains(fragment),
                    "Test '{}' expected fault containing '{}' but got '{}'",
                    case.name,
                    fragment,
                    fault.message
                );
            }
            Validation::Parsed(result) => panic!(
                "Test '{}' expected a syntax fault but the document loaded with {:?}",
                case.name,
                result.codes()
            ),
        },
        Expected::Codes(expected) => {
            assert_eq!(&codes[..], *expected, "Test '{}'\n\nInput:\n{}", case.name, case.input);
        }
        Expected::Contains(expected) => {
            for code in *expected {
                assert!(
                    codes.contains(code),
                    "Test '{}' expected {} in {:?}",
                    case.name,
                    code,
                    codes
                );
            }
        }
    }

    eprintln!("✓ {}", case.name);
}

#[test]
fn test_loader_cases() {
    eprintln!("\n=== LOADER CASES ({}) ===", LOADER_CASES.len());
    let config = ResolvedConfig::default();
    for case in LOADER_CASES {
        run_test_case(case, &config);
    }
}

#[test]
fn test_rule_cases() {
    eprintln!("\n=== RULE CASES ({}) ===", RULE_CASES.len());
    let config = ResolvedConfig::default();
    for case in RULE_CASES {
        run_test_case(case, &config);
    }
}

// =============================================================================
// TARGETED CHECKS
// =============================================================================

#[test]
fn test_missing_type_scoped_to_entry() {
    let validation = Validator::default().validate("layers:\n  - foo: 1\n", &ResolvedConfig::default());
    assert!(!validation.is_valid());
    let result = validation.into_result();
    let missing_type = &result.errors()[1];
    assert_eq!(missing_type.code, IssueCode::MissingLayerType);
    assert!(missing_type.message.contains("Layer 0"));
    let range = missing_type.range.unwrap();
    assert_eq!((range.start.line, range.start.character), (1, 4));
}

#[test]
fn test_identical_input_identical_issues() {
    let text = "model bad:\n  layers:\n    - 3\ntrain: {learning_rate: 9, batch_size: 5000}\n";
    let config = ResolvedConfig::default();
    let validator = Validator::default();
    let first = validator.validate(text, &config);
    let second = validator.validate(text, &config);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(first.issues()).unwrap(),
        serde_json::to_string(second.issues()).unwrap()
    );
}

#[test]
fn test_toggles_disable_hooks() {
    let text = "model mnist_net:\n  layers:\n    - type: simple_rnn\n  secret: abc\n";
    let workspace = json!({
        "validation": {
            "checkNamingConventions": false,
            "checkDeprecated": false,
            "checkSecurity": false
        }
    });
    let config = resolve(&default_settings(), &workspace, &json!(null));
    let validation = Validator::default().validate(text, &config);
    assert!(validation.issues().is_empty(), "{:?}", validation.issues());
}

#[test]
fn test_experimental_rules_opt_in() {
    let text = "model Net:\n  layers:\n    - {type: dense, units: -4, activation: wobble}\n";
    let default = Validator::default().validate(text, &ResolvedConfig::default());
    assert!(default.issues().is_empty());

    let workspace = json!({
        "experimental.enableAdvancedValidation": true,
        "experimental.enableTypeChecking": true
    });
    let config = resolve(&default_settings(), &workspace, &json!(null));
    let codes: Vec<_> = Validator::default()
        .validate(text, &config)
        .issues()
        .iter()
        .map(|i| i.code.as_str())
        .collect();
    assert_eq!(codes, vec!["E1006", "W1008"]);
}

#[test]
fn test_empty_layers_as_error_policy() {
    let config = resolve(
        &default_settings(),
        &json!({"validation": {"emptyLayersAsError": true}}),
        &json!(null),
    );
    let validation = Validator::default().validate("model Net:\n  layers: []\n", &config);
    assert!(!validation.is_valid());
    assert_eq!(validation.issues()[0].severity, Severity::Error);
    assert_eq!(validation.issues()[0].code, IssueCode::NoLayers);
}

#[test]
fn test_ranges_are_ordered() {
    let text = "model bad:\n  layers:\n    - 3\n    - units: 2\ntrain:\n  learning_rate: x\n";
    let validation = Validator::default().validate(text, &ResolvedConfig::default());
    let line_count = text.lines().count() as u32 + 1;
    for issue in validation.issues() {
        let range = issue.range.unwrap();
        assert!(range.start <= range.end, "{:?}", issue);
        assert!(range.end.line < line_count, "{:?}", issue);
    }
}
