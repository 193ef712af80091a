//! Filter expression output formatting.

use std::collections::BTreeMap;

use customquery_rs::query::{discriminator_tag, ExtraParams, FilterExpression};
use owo_colors::OwoColorize;
use serde::Serialize;

/// One parsed query and its filter.
#[derive(Debug, Serialize)]
pub struct ParsedEntry {
    pub query: String,
    pub filter: FilterExpression,
}

/// JSON output structure for the parse command.
#[derive(Serialize)]
struct ParseOutput<'a> {
    model: &'a str,
    queries: &'a [ParsedEntry],
    extra_params: &'a ExtraParams,
}

/// Formats parse results as JSON.
pub fn format_parsed_json(
    model: &str,
    entries: &[ParsedEntry],
    extra_params: &ExtraParams,
) -> Result<String, serde_json::Error> {
    let output = ParseOutput {
        model,
        queries: entries,
        extra_params,
    };
    serde_json::to_string_pretty(&output)
}

/// Formats parse results as indented trees, followed by the extension
/// parameters.
pub fn format_parsed_text(
    entries: &[ParsedEntry],
    extra_params: &ExtraParams,
    use_colors: bool,
) -> String {
    let mut output = String::new();

    for (i, entry) in entries.iter().enumerate() {
        if entries.len() > 1 {
            if i > 0 {
                output.push('\n');
            }
            let header = format!("Query {}: {}", i + 1, entry.query);
            if use_colors {
                output.push_str(&format!("{}\n", header.dimmed()));
            } else {
                output.push_str(&header);
                output.push('\n');
            }
        }
        write_node(&mut output, &entry.filter, "", "", "", use_colors);
    }

    if !extra_params.is_empty() {
        let header = "Extension parameters:";
        if use_colors {
            output.push_str(&format!("\n{}\n", header.bold()));
        } else {
            output.push('\n');
            output.push_str(header);
            output.push('\n');
        }

        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for param in extra_params {
            let index = seen.entry(param.extension.as_str()).or_insert(0);
            let key = format!("{}_{}", param.extension, discriminator_tag(*index));
            *index += 1;

            let arguments: Vec<String> = param
                .arguments
                .iter()
                .map(|a| format!("{}={}", a.name, a.value))
                .collect();
            let key = if use_colors {
                key.yellow().to_string()
            } else {
                key
            };
            output.push_str(&format!("  {}: {}\n", key, arguments.join(" ")));
        }
    }

    output
}

fn write_node(
    output: &mut String,
    expr: &FilterExpression,
    prefix: &str,
    connector: &str,
    child_prefix: &str,
    use_colors: bool,
) {
    output.push_str(prefix);
    output.push_str(connector);
    output.push_str(&label(expr, use_colors));
    output.push('\n');

    if let FilterExpression::And(left, right) | FilterExpression::Or(left, right) = expr {
        let next = format!("{prefix}{child_prefix}");
        write_node(output, left, &next, "├── ", "│   ", use_colors);
        write_node(output, right, &next, "└── ", "    ", use_colors);
    }
}

fn label(expr: &FilterExpression, use_colors: bool) -> String {
    match expr {
        FilterExpression::And(_, _) if use_colors => "AND".blue().bold().to_string(),
        FilterExpression::And(_, _) => "AND".to_string(),
        FilterExpression::Or(_, _) if use_colors => "OR".magenta().bold().to_string(),
        FilterExpression::Or(_, _) => "OR".to_string(),
        FilterExpression::Extension { name, tag } => {
            let text = format!("{name}() [{name}_{tag}]");
            if use_colors {
                text.yellow().to_string()
            } else {
                text
            }
        }
        leaf => leaf.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use customquery_rs::query::{ExtensionSpec, PredicateOp, TypedValue};

    fn leaf(field: &str, value: i64) -> FilterExpression {
        FilterExpression::predicate(field.into(), PredicateOp::Eq, TypedValue::Integer(value), false)
    }

    fn entry(filter: FilterExpression) -> ParsedEntry {
        ParsedEntry {
            query: "q".to_string(),
            filter,
        }
    }

    #[test]
    fn test_single_leaf() {
        let text = format_parsed_text(&[entry(leaf("a", 1))], &ExtraParams::new(), false);
        assert_eq!(text, "a = 1\n");
    }

    #[test]
    fn test_tree() {
        let filter = FilterExpression::or(
            leaf("a", 1),
            FilterExpression::and(leaf("b", 2), FilterExpression::is_null("c".into(), false)),
        );
        let text = format_parsed_text(&[entry(filter)], &ExtraParams::new(), false);
        assert_eq!(
            text,
            "OR\n├── a = 1\n└── AND\n    ├── b = 2\n    └── c IS NOT NULL\n"
        );
    }

    #[test]
    fn test_extension_parameters() {
        let cone = ExtensionSpec::cone();
        let mut params = ExtraParams::new();
        for (ra, dec, radius) in [(1.0, 2.0, 3.0), (4.5, -5.0, 6.0)] {
            params.push(customquery_rs::query::ExtraParam {
                extension: cone.name().to_string(),
                arguments: ["ra", "dec", "radius"]
                    .iter()
                    .zip([ra, dec, radius])
                    .map(|(name, value)| customquery_rs::query::Argument {
                        name: name.to_string(),
                        value,
                    })
                    .collect(),
            });
        }
        let filter = FilterExpression::Extension {
            name: "cone".to_string(),
            tag: "query".to_string(),
        };

        let text = format_parsed_text(&[entry(filter)], &params, false);
        assert_eq!(
            text,
            "cone() [cone_query]\n\nExtension parameters:\n  cone_query: ra=1 dec=2 radius=3\n  cone_query1: ra=4.5 dec=-5 radius=6\n"
        );
    }

    #[test]
    fn test_multiple_queries_have_headers() {
        let entries = [
            ParsedEntry {
                query: "a = 1".to_string(),
                filter: leaf("a", 1),
            },
            ParsedEntry {
                query: "b = 2".to_string(),
                filter: leaf("b", 2),
            },
        ];
        let text = format_parsed_text(&entries, &ExtraParams::new(), false);
        assert_eq!(text, "Query 1: a = 1\na = 1\n\nQuery 2: b = 2\nb = 2\n");
    }

    #[test]
    fn test_json_output() {
        let json = format_parsed_json("Main", &[entry(leaf("a", 1))], &ExtraParams::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["model"], "Main");
        assert_eq!(value["queries"][0]["query"], "q");
        assert_eq!(value["queries"][0]["filter"]["predicate"]["field"], "a");
        assert_eq!(value["extra_params"], serde_json::json!([]));
    }
}
