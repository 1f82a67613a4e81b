use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use probelink::metadata::Value;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FieldOutput<'a> {
    name: &'a str,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    source: &'a str,
    probe_model: Option<&'a str>,
    fields: Vec<FieldOutput<'a>>,
}

/// Print a decoded metadata record.
pub fn print_record(
    source: &str,
    probe_model: Option<&str>,
    fields: &[(&'static str, Option<Value>)],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = RecordOutput {
                source,
                probe_model,
                fields: fields
                    .iter()
                    .map(|(name, value)| FieldOutput {
                        name: *name,
                        value: json_value(value.as_ref()),
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), text_value(value.as_ref())]);
            }
            println!("{source} ({})", probe_model.unwrap_or("unknown model"));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{source}:");
            for (name, value) in fields {
                println!("  {name:<24} {}", text_value(value.as_ref()));
            }
        }
    }
}

#[derive(Serialize)]
struct ModelOutput<'a> {
    model: &'a str,
    uuid: &'a str,
}

/// Print `(model name, internal code)` pairs.
pub fn print_models<'a>(
    models: impl IntoIterator<Item = (&'a str, &'a str)>,
    format: OutputFormat,
) {
    let models: Vec<ModelOutput<'a>> = models
        .into_iter()
        .map(|(model, uuid)| ModelOutput { model, uuid })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&models).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MODEL", "UUID"]);
            for entry in &models {
                table.add_row(vec![entry.model, entry.uuid]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for entry in &models {
                println!("{:<16} {}", entry.model, entry.uuid);
            }
        }
    }
}

fn json_value(value: Option<&Value>) -> serde_json::Value {
    match value {
        None => serde_json::Value::Null,
        Some(Value::Float(v)) => serde_json::Number::from_f64(f64::from(*v))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(other) => serde_json::Value::String(other.to_field_string()),
    }
}

fn text_value(value: Option<&Value>) -> String {
    value.map(Value::to_field_string).unwrap_or_else(|| "-".to_string())
}
