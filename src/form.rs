//! Application form state and the outgoing application payload.

use color_eyre::{eyre::eyre, Result};
use reqwest::multipart::{Form, Part};
use std::path::Path;

/// Text fields of the apply form, in display and wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  FirstName,
  LastName,
  Email,
  TechnicalSkills,
  Location,
  YearOfExperience,
}

impl FormField {
  pub const ALL: [FormField; 6] = [
    FormField::FirstName,
    FormField::LastName,
    FormField::Email,
    FormField::TechnicalSkills,
    FormField::Location,
    FormField::YearOfExperience,
  ];

  pub fn label(self) -> &'static str {
    match self {
      FormField::FirstName => "First Name",
      FormField::LastName => "Last Name",
      FormField::Email => "Email",
      FormField::TechnicalSkills => "Technical Skills",
      FormField::Location => "Location",
      FormField::YearOfExperience => "Year of Experience",
    }
  }

  /// Multipart field name expected by `/recruiter-apply`.
  pub fn wire_name(self) -> &'static str {
    match self {
      FormField::FirstName => "firstName",
      FormField::LastName => "lastName",
      FormField::Email => "email",
      FormField::TechnicalSkills => "technicalSkills",
      FormField::Location => "location",
      FormField::YearOfExperience => "yearOfExperience",
    }
  }
}

/// A file attached to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
  pub file_name: String,
  pub mime: String,
  pub bytes: Vec<u8>,
}

impl Attachment {
  /// Read a file from disk, guessing its mime type from the extension.
  pub fn from_path(path: &Path) -> Result<Self> {
    let bytes =
      std::fs::read(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .ok_or_else(|| eyre!("Not a file: {}", path.display()))?;
    let mime = mime_guess::from_path(path)
      .first_or_octet_stream()
      .to_string();

    Ok(Self {
      file_name,
      mime,
      bytes,
    })
  }
}

/// In-progress application for one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDraft {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub technical_skills: String,
  pub location: String,
  pub year_of_experience: String,
  pub resume: Option<Attachment>,
}

impl FormDraft {
  pub fn field(&self, field: FormField) -> &str {
    match field {
      FormField::FirstName => &self.first_name,
      FormField::LastName => &self.last_name,
      FormField::Email => &self.email,
      FormField::TechnicalSkills => &self.technical_skills,
      FormField::Location => &self.location,
      FormField::YearOfExperience => &self.year_of_experience,
    }
  }

  pub fn field_mut(&mut self, field: FormField) -> &mut String {
    match field {
      FormField::FirstName => &mut self.first_name,
      FormField::LastName => &mut self.last_name,
      FormField::Email => &mut self.email,
      FormField::TechnicalSkills => &mut self.technical_skills,
      FormField::Location => &mut self.location,
      FormField::YearOfExperience => &mut self.year_of_experience,
    }
  }

  /// True when no text field has content and nothing is attached.
  pub fn is_blank(&self) -> bool {
    self.resume.is_none() && FormField::ALL.iter().all(|f| self.field(*f).trim().is_empty())
  }
}

/// Payload for `POST /recruiter-apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
  pub position_id: String,
  pub fields: Vec<(&'static str, String)>,
  pub resume: Option<Attachment>,
}

impl Application {
  pub fn from_draft(draft: &FormDraft, position_id: &str) -> Self {
    Self {
      position_id: position_id.to_string(),
      fields: FormField::ALL
        .iter()
        .map(|f| (f.wire_name(), draft.field(*f).to_string()))
        .collect(),
      resume: draft.resume.clone(),
    }
  }

  /// Build the multipart body: text fields, then `resume`, then `positionId`.
  pub fn into_multipart(self) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in self.fields {
      form = form.text(name, value);
    }

    if let Some(resume) = self.resume {
      let part = Part::bytes(resume.bytes)
        .file_name(resume.file_name)
        .mime_str(&resume.mime)
        .map_err(|e| eyre!("Invalid resume mime type: {}", e))?;
      form = form.part("resume", part);
    }

    Ok(form.text("positionId", self.position_id))
  }
}
