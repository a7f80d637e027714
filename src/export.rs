//! CSV export of table rows, the blank candidate template, and job descriptions.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::types::Record;

/// Column header of the candidate upload template.
pub const TEMPLATE_HEADER: [&str; 6] = [
  "firstName",
  "lastName",
  "email",
  "techskills",
  "location",
  "yearsOfExperience",
];

pub const ROWS_FILE_NAME: &str = "generated.csv";
pub const TEMPLATE_FILE_NAME: &str = "template.csv";
pub const JOB_DESCRIPTION_FILE_NAME: &str = "Job Description.pdf";

/// Serialize records to CSV.
///
/// The header is the union of the backend's object keys in first-seen order.
/// The job description column is never written.
pub fn rows_to_csv(records: &[Record]) -> Result<String> {
  let mut header: Vec<&str> = Vec::new();
  for record in records {
    for (key, _) in record.export_columns() {
      if !header.contains(&key.as_str()) {
        header.push(key.as_str());
      }
    }
  }

  let mut writer = csv::Writer::from_writer(Vec::new());
  if !header.is_empty() {
    writer.write_record(&header)?;
  }
  for record in records {
    let row: HashMap<&str, &Value> = record
      .export_columns()
      .map(|(key, value)| (key.as_str(), value))
      .collect();
    writer.write_record(header.iter().map(|key| cell(row.get(key).copied())))?;
  }

  finish(writer)
}

/// The blank upload template: header only.
pub fn template_csv() -> Result<String> {
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(TEMPLATE_HEADER)?;
  finish(writer)
}

/// Write selected rows to `<dir>/generated.csv`.
pub fn export_rows(dir: &Path, records: &[Record]) -> Result<PathBuf> {
  let path = dir.join(ROWS_FILE_NAME);
  write_file(&path, rows_to_csv(records)?.as_bytes())?;
  info!(path = %path.display(), rows = records.len(), "exported rows");
  Ok(path)
}

/// Write the template to `<dir>/template.csv`.
pub fn export_template(dir: &Path) -> Result<PathBuf> {
  let path = dir.join(TEMPLATE_FILE_NAME);
  write_file(&path, template_csv()?.as_bytes())?;
  info!(path = %path.display(), "exported template");
  Ok(path)
}

/// Write a record's job description to `<dir>/Job Description.pdf`.
pub fn save_job_description(dir: &Path, record: &Record) -> Result<PathBuf> {
  let bytes = record
    .job_description_bytes()
    .ok_or_else(|| eyre!("{} has no job description", record.display_name()))?;

  let path = dir.join(JOB_DESCRIPTION_FILE_NAME);
  write_file(&path, &bytes)?;
  info!(path = %path.display(), bytes = bytes.len(), "saved job description");
  Ok(path)
}

fn cell(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
  let bytes = writer
    .into_inner()
    .map_err(|e| eyre!("Failed to flush CSV: {}", e))?;
  Ok(String::from_utf8(bytes)?)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .map_err(|e| eyre!("Failed to create directory {}: {}", parent.display(), e))?;
  }
  std::fs::write(path, contents).map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}
