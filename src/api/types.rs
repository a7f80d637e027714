//! Records returned by the jobs backend.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Key of the job description blob.
pub const JOB_DESCRIPTION_KEY: &str = "JD";

/// A user/position row as returned by `GET /get-jobs`.
///
/// Known columns are typed for display. The object itself is kept as sent,
/// in backend key order, so exports write exactly what the backend returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
  pub id: String,
  pub username: String,
  pub firstname: String,
  pub lastname: String,
  pub role: String,
  pub date_of_admission: String,
  pub start_date: String,
  pub position_name: Option<String>,
  /// Job description blob. Never exported.
  pub job_description: Option<Value>,
  raw: Map<String, Value>,
}

/// Typed view over the known columns.
#[derive(Deserialize)]
struct Columns {
  #[serde(default, deserialize_with = "lenient_string")]
  id: String,
  #[serde(default, deserialize_with = "lenient_string")]
  username: String,
  #[serde(default, deserialize_with = "lenient_string")]
  firstname: String,
  #[serde(default, deserialize_with = "lenient_string")]
  lastname: String,
  #[serde(default, deserialize_with = "lenient_string")]
  role: String,
  #[serde(rename = "dateOfAdmission", default, deserialize_with = "lenient_string")]
  date_of_admission: String,
  #[serde(rename = "startDate", default, deserialize_with = "lenient_string")]
  start_date: String,
  #[serde(rename = "positionName", default, deserialize_with = "lenient_opt_string")]
  position_name: Option<String>,
  #[serde(rename = "JD", default)]
  job_description: Option<Value>,
}

impl<'de> Deserialize<'de> for Record {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = Map::<String, Value>::deserialize(deserializer)?;
    let columns: Columns =
      serde_json::from_value(Value::Object(raw.clone())).map_err(D::Error::custom)?;

    Ok(Self {
      id: columns.id,
      username: columns.username,
      firstname: columns.firstname,
      lastname: columns.lastname,
      role: columns.role,
      date_of_admission: columns.date_of_admission,
      start_date: columns.start_date,
      position_name: columns.position_name,
      job_description: columns.job_description,
      raw,
    })
  }
}

impl Record {
  /// Backend columns in the order they were sent, without the job description.
  pub fn export_columns(&self) -> impl Iterator<Item = (&String, &Value)> {
    self
      .raw
      .iter()
      .filter(|(key, _)| key.as_str() != JOB_DESCRIPTION_KEY)
  }

  /// Name shown in the apply dialog title.
  pub fn display_name(&self) -> String {
    if let Some(name) = self.position_name.as_deref().filter(|n| !n.is_empty()) {
      return name.to_string();
    }

    let full = format!("{} {}", self.firstname, self.lastname);
    let full = full.trim();
    if !full.is_empty() {
      return full.to_string();
    }

    if !self.username.is_empty() {
      return self.username.clone();
    }

    self.id.clone()
  }

  /// Raw bytes of the job description, if present.
  ///
  /// The backend serializes a Node `Buffer` as `{"type":"Buffer","data":[..]}`;
  /// plain strings are accepted too.
  pub fn job_description_bytes(&self) -> Option<Vec<u8>> {
    match self.job_description.as_ref()? {
      Value::String(s) if !s.is_empty() => Some(s.clone().into_bytes()),
      Value::Object(obj) => {
        let data = obj.get("data")?.as_array()?;
        data
          .iter()
          .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
          .collect()
      }
      _ => None,
    }
  }
}

/// Accept strings, numbers or null for text columns.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

/// Like `lenient_string`, but null stays `None`.
fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Value::deserialize(deserializer)? {
    Value::Null => None,
    Value::String(s) => Some(s),
    other => Some(other.to_string()),
  })
}
