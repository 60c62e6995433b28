// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use rv_engine::BatchResult;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Current wall-clock time in epoch seconds.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One row of a batch status change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn batch_entries(results: &BatchResult) -> Vec<BatchEntry> {
    results
        .iter()
        .map(|(id, result)| match result {
            Ok(relval) => BatchEntry {
                id: id.to_string(),
                status: Some(relval.status.to_string()),
                error: None,
            },
            Err(e) => BatchEntry {
                id: id.to_string(),
                status: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

/// Print a batch result and return how many entries failed.
pub fn print_batch(results: &BatchResult, format: OutputFormat) -> anyhow::Result<usize> {
    let entries = batch_entries(results);
    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    match format {
        OutputFormat::Text => {
            for entry in &entries {
                match (&entry.status, &entry.error) {
                    (_, Some(error)) => println!(
                        "{}  {}",
                        entry.id,
                        crate::color::status(&format!("failed: {}", error))
                    ),
                    (Some(status), None) => {
                        println!("{}  {}", entry.id, crate::color::status(status))
                    }
                    (None, None) => println!("{}", entry.id),
                }
            }
        }
        OutputFormat::Json => print_json(&entries)?,
    }
    Ok(failed)
}
