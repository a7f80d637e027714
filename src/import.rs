//! Reading filled-in candidate templates for bulk upload.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::form::FormDraft;

/// One row of the candidate template (see `export::TEMPLATE_HEADER`).
#[derive(Debug, Deserialize)]
struct CandidateRow {
  #[serde(rename = "firstName", default)]
  first_name: String,
  #[serde(rename = "lastName", default)]
  last_name: String,
  #[serde(default)]
  email: String,
  #[serde(rename = "techskills", default)]
  technical_skills: String,
  #[serde(default)]
  location: String,
  #[serde(rename = "yearsOfExperience", default)]
  years_of_experience: String,
}

impl From<CandidateRow> for FormDraft {
  fn from(row: CandidateRow) -> Self {
    FormDraft {
      first_name: row.first_name,
      last_name: row.last_name,
      email: row.email,
      technical_skills: row.technical_skills,
      location: row.location,
      year_of_experience: row.years_of_experience,
      resume: None,
    }
  }
}

pub fn read_candidates_from_path(path: &Path) -> Result<Vec<FormDraft>> {
  let file = std::fs::File::open(path)
    .map_err(|e| eyre!("Failed to open {}: {}", path.display(), e))?;
  let drafts = read_candidates(file)?;
  info!(path = %path.display(), count = drafts.len(), "read candidates");
  Ok(drafts)
}

/// Parse candidate rows, skipping rows with every field empty.
pub fn read_candidates<R: Read>(reader: R) -> Result<Vec<FormDraft>> {
  let mut csv_reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(reader);

  let mut drafts = Vec::new();
  for (line, row) in csv_reader.deserialize::<CandidateRow>().enumerate() {
    // Header is line 1
    let row = row.map_err(|e| eyre!("Invalid candidate on line {}: {}", line + 2, e))?;
    let draft = FormDraft::from(row);
    if !draft.is_blank() {
      drafts.push(draft);
    }
  }

  Ok(drafts)
}
