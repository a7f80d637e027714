use crate::config::{ApiConfig, Config};
use crate::form::Application;
use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::RequestBuilder;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::types::Record;
use super::JobBoard;

const JOBS_PATH: &str = "get-jobs";
const APPLY_PATH: &str = "recruiter-apply";

/// HTTP client for the jobs backend
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl ApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: parse_base_url(&config.base_url)?,
      token: Config::get_api_token(),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  /// Fetch all job/user records
  pub async fn get_jobs(&self) -> Result<Vec<Record>> {
    let url = self.endpoint(JOBS_PATH)?;
    debug!(%url, "fetching jobs");

    let response = self
      .authorize(self.http.get(url))
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to fetch jobs: {}", e))?;

    let records: Vec<Record> = response
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse jobs: {}", e))?;

    info!(count = records.len(), "jobs loaded");
    Ok(records)
  }

  /// Submit an application as multipart form data
  pub async fn apply(&self, application: Application) -> Result<()> {
    let url = self.endpoint(APPLY_PATH)?;
    let position_id = application.position_id.clone();
    let form = application.into_multipart()?;

    self
      .authorize(self.http.post(url))
      .multipart(form)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to submit application for {}: {}", position_id, e))?;

    info!(%position_id, "application submitted");
    Ok(())
  }
}

impl JobBoard for ApiClient {
  fn list_jobs(&self) -> BoxFuture<'static, Result<Vec<Record>>> {
    let client = self.clone();
    async move { client.get_jobs().await }.boxed()
  }

  fn apply(&self, application: Application) -> BoxFuture<'static, Result<()>> {
    let client = self.clone();
    async move { client.apply(application).await }.boxed()
  }
}

/// Parse the base URL so relative joins append rather than replace the last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw.trim()).map_err(|e| eyre!("Invalid base URL {}: {}", raw, e))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::form::Attachment;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::{TcpListener, TcpStream};
  use tokio::task::JoinHandle;

  fn client_for(base: &str) -> ApiClient {
    ApiClient::new(&ApiConfig {
      base_url: base.to_string(),
      timeout_secs: Some(5),
    })
    .unwrap()
  }

  #[test]
  fn test_endpoint_on_bare_host() {
    let client = client_for("http://localhost:5000");
    assert_eq!(
      client.endpoint(JOBS_PATH).unwrap().as_str(),
      "http://localhost:5000/get-jobs"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let client = client_for("https://example.com/api");
    assert_eq!(
      client.endpoint(APPLY_PATH).unwrap().as_str(),
      "https://example.com/api/recruiter-apply"
    );

    let client = client_for("https://example.com/api/");
    assert_eq!(
      client.endpoint(JOBS_PATH).unwrap().as_str(),
      "https://example.com/api/get-jobs"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let result = ApiClient::new(&ApiConfig {
      base_url: "not a url".to_string(),
      timeout_secs: None,
    });
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_error() {
    // Port 9 (discard) on localhost is reliably closed in test environments
    let client = client_for("http://127.0.0.1:9");
    assert!(client.get_jobs().await.is_err());
  }

  fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
  }

  /// Read one HTTP request: headers plus a Content-Length or chunked body.
  async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
      let n = socket.read(&mut chunk).await.unwrap();
      if n == 0 {
        break;
      }
      buf.extend_from_slice(&chunk[..n]);

      let Some(end) = find(&buf, b"\r\n\r\n") else {
        continue;
      };
      let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
      if head.contains("transfer-encoding: chunked") {
        if buf.ends_with(b"0\r\n\r\n") {
          break;
        }
      } else {
        let expected = head
          .lines()
          .find_map(|line| line.strip_prefix("content-length:"))
          .and_then(|v| v.trim().parse::<usize>().ok())
          .unwrap_or(0);
        if buf.len() - end - 4 >= expected {
          break;
        }
      }
    }
    buf
  }

  /// Serve a single request with a canned response, returning the raw request.
  async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let request = read_request(&mut socket).await;
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      socket.write_all(response.as_bytes()).await.unwrap();
      let _ = socket.shutdown().await;
      request
    });

    (format!("http://{}", addr), handle)
  }

  #[tokio::test]
  async fn test_get_jobs_parses_records() {
    let (base, server) = serve_once(
      "200 OK",
      r#"[{"id":1,"username":"jdoe","positionName":"Engineer"},{"id":"2"}]"#,
    )
    .await;

    let records = client_for(&base).get_jobs().await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].display_name(), "Engineer");
    assert_eq!(records[1].id, "2");

    let request = String::from_utf8(server.await.unwrap()).unwrap();
    assert!(request.starts_with("GET /get-jobs HTTP/1.1\r\n"));
  }

  #[tokio::test]
  async fn test_get_jobs_server_error() {
    let (base, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

    let err = client_for(&base).get_jobs().await.unwrap_err();
    assert!(err.to_string().starts_with("Failed to fetch jobs"));
    server.await.unwrap();
  }

  #[tokio::test]
  async fn test_apply_sends_multipart_in_order() {
    let (base, server) = serve_once("200 OK", "{}").await;

    let application = Application {
      position_id: "42".to_string(),
      fields: vec![
        ("firstName", "Ada".to_string()),
        ("lastName", "Lovelace".to_string()),
        ("email", "ada@example.com".to_string()),
        ("technicalSkills", "rust".to_string()),
        ("location", "London".to_string()),
        ("yearOfExperience", "7".to_string()),
      ],
      resume: Some(Attachment {
        file_name: "cv.pdf".to_string(),
        mime: "application/pdf".to_string(),
        bytes: vec![0xff, 0x00, 0x25, 0x50],
      }),
    };
    client_for(&base).apply(application).await.unwrap();

    let raw = server.await.unwrap();
    let text = String::from_utf8_lossy(&raw).to_lowercase();
    assert!(text.starts_with("post /recruiter-apply http/1.1\r\n"));
    assert!(text.contains("content-type: multipart/form-data; boundary="));

    let names = [
      "name=\"firstname\"",
      "name=\"lastname\"",
      "name=\"email\"",
      "name=\"technicalskills\"",
      "name=\"location\"",
      "name=\"yearofexperience\"",
      "name=\"resume\"; filename=\"cv.pdf\"",
      "name=\"positionid\"",
    ];
    let positions: Vec<usize> = names
      .iter()
      .map(|name| text.find(name).unwrap_or_else(|| panic!("missing part {}", name)))
      .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let resume_at = positions[6];
    let resume_part = &text[resume_at..positions[7]];
    assert!(resume_part.contains("content-type: application/pdf"));
    let bytes_at = find(&raw, &[0xff, 0x00, 0x25, 0x50]).expect("resume bytes sent");
    assert!(bytes_at > resume_at);

    assert!(find(&raw, b"name=\"positionId\"\r\n\r\n42\r\n").is_some());
  }

  #[tokio::test]
  async fn test_apply_without_resume_omits_part() {
    let (base, server) = serve_once("201 Created", "{}").await;

    let application = Application {
      position_id: "7".to_string(),
      fields: vec![("firstName", "Alan".to_string())],
      resume: None,
    };
    client_for(&base).apply(application).await.unwrap();

    let text = String::from_utf8_lossy(&server.await.unwrap()).to_lowercase();
    assert!(text.contains("name=\"firstname\""));
    assert!(!text.contains("name=\"resume\""));
  }

  #[tokio::test]
  async fn test_apply_rejected() {
    let (base, server) = serve_once("400 Bad Request", "{}").await;

    let application = Application {
      position_id: "7".to_string(),
      fields: Vec::new(),
      resume: None,
    };
    let err = client_for(&base).apply(application).await.unwrap_err();
    assert!(err.to_string().contains("Failed to submit application for 7"));
    server.await.unwrap();
  }
}
