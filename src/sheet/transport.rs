//! Wire access to the Sheets v4 `values` API.
//!
//! A transport performs exactly one HTTP request per call and reports raw
//! failures; retry, classification and pacing live in
//! [`TableClient`](super::client::TableClient).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiFailure;

/// Default endpoint of the Sheets API.
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// Credentials and target attached to a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub spreadsheet_id: String,
    pub access_token: String,
}

/// Rows returned by a range read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

/// Outcome of a write or append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated_range: String,
    pub updated_rows: u64,
}

/// The four range operations the sync engine needs.
#[async_trait]
pub trait SheetsTransport: Send + Sync {
    /// Prepares the transport before first use.
    async fn connect(&self) -> Result<(), ApiFailure> {
        Ok(())
    }

    async fn get_values(&self, ctx: CallContext, range: &str) -> Result<ValueRange, ApiFailure>;

    /// Overwrites `range` (`valueInputOption=USER_ENTERED`).
    async fn update_values(
        &self,
        ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure>;

    /// Inserts rows after the table anchored at `range`
    /// (`insertDataOption=INSERT_ROWS`).
    async fn append_values(
        &self,
        ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure>;

    async fn clear_values(&self, ctx: CallContext, range: &str) -> Result<String, ApiFailure>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody {
    #[serde(default)]
    range: String,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateBody {
    updated_range: String,
    updated_rows: u64,
}

#[derive(Debug, Deserialize)]
struct AppendBody {
    #[serde(default)]
    updates: UpdateBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClearBody {
    cleared_range: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// reqwest-backed transport for the real Sheets API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}`
    fn values_url(&self, spreadsheet_id: &str, range: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range),
            suffix
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiFailure> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiFailure::network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown API error")
                    .to_string()
            });
        Err(ApiFailure::status(status.as_u16(), message))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiFailure> {
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            ApiFailure::malformed_body(status, format!("unreadable response body: {}", e))
        })?;
        serde_json::from_slice::<T>(&body).map_err(|e| {
            ApiFailure::malformed_body(status, format!("invalid response body: {}", e))
        })
    }
}

#[async_trait]
impl SheetsTransport for HttpTransport {
    async fn connect(&self) -> Result<(), ApiFailure> {
        reqwest::Url::parse(&self.base_url)
            .map(|_| ())
            .map_err(|e| ApiFailure::network(format!("invalid API base URL: {}", e)))
    }

    async fn get_values(&self, ctx: CallContext, range: &str) -> Result<ValueRange, ApiFailure> {
        let url = self.values_url(&ctx.spreadsheet_id, range, "");
        let response = self
            .send(self.client.get(&url).bearer_auth(&ctx.access_token))
            .await?;
        let body: ValueRangeBody = Self::json(response).await?;

        Ok(ValueRange {
            range: body.range,
            values: body
                .values
                .into_iter()
                .map(|row| row.into_iter().map(cell_to_string).collect())
                .collect(),
        })
    }

    async fn update_values(
        &self,
        ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure> {
        let url = self.values_url(&ctx.spreadsheet_id, range, "");
        let request = self
            .client
            .put(&url)
            .bearer_auth(&ctx.access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&serde_json::json!({ "range": range, "values": rows }));
        let body: UpdateBody = Self::json(self.send(request).await?).await?;

        Ok(UpdateSummary {
            updated_range: body.updated_range,
            updated_rows: body.updated_rows,
        })
    }

    async fn append_values(
        &self,
        ctx: CallContext,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateSummary, ApiFailure> {
        let url = self.values_url(&ctx.spreadsheet_id, range, ":append");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&ctx.access_token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&serde_json::json!({ "values": rows }));
        let body: AppendBody = Self::json(self.send(request).await?).await?;

        Ok(UpdateSummary {
            updated_range: body.updates.updated_range,
            updated_rows: body.updates.updated_rows,
        })
    }

    async fn clear_values(&self, ctx: CallContext, range: &str) -> Result<String, ApiFailure> {
        let url = self.values_url(&ctx.spreadsheet_id, range, ":clear");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&ctx.access_token)
            .json(&serde_json::json!({}));
        let body: ClearBody = Self::json(self.send(request).await?).await?;
        Ok(body.cleared_range)
    }
}

/// Formatted cells arrive as strings; anything else is stringified.
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_url_encodes_range() {
        let transport = HttpTransport::new("https://sheets.googleapis.com/");
        let url = transport.values_url("abc123", "Sheet1!A2:AF", "");
        assert_eq!(
            url,
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/Sheet1%21A2%3AAF"
        );
    }

    #[test]
    fn test_values_url_with_suffix() {
        let transport = HttpTransport::new("http://localhost:9000");
        let url = transport.values_url("id", "'My Words'!A2", ":append");
        assert_eq!(
            url,
            "http://localhost:9000/v4/spreadsheets/id/values/%27My%20Words%27%21A2:append"
        );
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(Value::from("x")), "x");
        assert_eq!(cell_to_string(Value::from(3)), "3");
        assert_eq!(cell_to_string(Value::Bool(true)), "true");
        assert_eq!(cell_to_string(Value::Null), "");
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_base_url() {
        let transport = HttpTransport::new("not a url");
        assert!(transport.connect().await.is_err());
        assert!(HttpTransport::new(DEFAULT_API_BASE_URL)
            .connect()
            .await
            .is_ok());
    }
}
