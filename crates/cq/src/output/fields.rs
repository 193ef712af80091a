//! Schema field output formatting.

use customquery_rs::schema::{FieldKind, Model};
use owo_colors::OwoColorize;
use serde::Serialize;

/// JSON output structure for the fields command.
#[derive(Serialize)]
struct FieldsOutput<'a> {
    models: Vec<ModelOutput<'a>>,
}

#[derive(Serialize)]
struct ModelOutput<'a> {
    name: &'a str,
    fields: Vec<FieldOutput<'a>>,
}

#[derive(Serialize)]
struct FieldOutput<'a> {
    name: &'a str,
    kind: &'a FieldKind,
}

/// Formats models and their fields as JSON.
pub fn format_fields_json(models: &[(&str, &Model)]) -> Result<String, serde_json::Error> {
    let output = FieldsOutput {
        models: models
            .iter()
            .map(|(name, model)| ModelOutput {
                name,
                fields: model
                    .fields()
                    .map(|(name, kind)| FieldOutput { name, kind })
                    .collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output)
}

/// Formats models and their fields as tables.
pub fn format_fields_table(models: &[(&str, &Model)], use_colors: bool) -> String {
    if models.is_empty() {
        return "No models found.\n".to_string();
    }

    let mut output = String::new();
    for (i, (name, model)) in models.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        if use_colors {
            output.push_str(&format!("{}\n", name.green().bold()));
        } else {
            output.push_str(name);
            output.push('\n');
        }

        let header = format!("  {:<24} {}", "Field", "Type");
        if use_colors {
            output.push_str(&format!("{}\n", header.dimmed()));
        } else {
            output.push_str(&header);
            output.push('\n');
        }

        let mut empty = true;
        for (field, kind) in model.fields() {
            empty = false;
            output.push_str(&format!("  {:<24} {}\n", field, kind_label(kind)));
        }
        if empty {
            output.push_str("  (no fields)\n");
        }
    }
    output
}

fn kind_label(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Text => "text".to_string(),
        FieldKind::Integer => "integer".to_string(),
        FieldKind::Float => "float".to_string(),
        FieldKind::Date => "date".to_string(),
        FieldKind::Relation(target) => format!("-> {target}"),
        FieldKind::Annotated => "annotated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model::new()
            .field("name", FieldKind::Text)
            .field("site", FieldKind::Relation("Site".to_string()))
    }

    #[test]
    fn test_fields_table() {
        let model = model();
        let text = format_fields_table(&[("Telescope", &model)], false);
        assert_eq!(
            text,
            format!(
                "Telescope\n  {:<24} Type\n  {:<24} text\n  {:<24} -> Site\n",
                "Field", "name", "site"
            )
        );
    }

    #[test]
    fn test_fields_table_empty() {
        assert_eq!(format_fields_table(&[], false), "No models found.\n");
        let empty = Model::new();
        assert!(format_fields_table(&[("Empty", &empty)], false).contains("(no fields)"));
    }

    #[test]
    fn test_fields_json() {
        let model = model();
        let json = format_fields_json(&[("Telescope", &model)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["models"][0]["name"], "Telescope");
        assert_eq!(value["models"][0]["fields"][0]["kind"], "text");
        assert_eq!(
            value["models"][0]["fields"][1]["kind"],
            serde_json::json!({"relation": "Site"})
        );
    }
}
