//! Google Sheets values API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{check_status, GoogleError};

/// Read and overwrite cell ranges of an external spreadsheet.
#[async_trait]
pub trait SpreadsheetClient: Send + Sync {
    /// Rows of the range, each row as cell strings. An empty range yields no rows.
    async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GoogleError>;

    /// Overwrite the range with `values`; returns the number of cells updated.
    async fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<i64, GoogleError>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: i64,
}

/// Sheets v4 client acting with one user's access token.
pub struct GoogleSheetsClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GoogleSheetsClient {
    pub fn new(http: Client, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, GoogleError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GoogleError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| GoogleError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        Ok(url)
    }
}

#[async_trait]
impl SpreadsheetClient for GoogleSheetsClient {
    async fn read_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, GoogleError> {
        let url = self.values_url(spreadsheet_id, range)?;
        tracing::debug!(%spreadsheet_id, %range, "Reading sheet values");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let body: ValueRange = check_status(response).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> Result<i64, GoogleError> {
        let url = self.values_url(spreadsheet_id, range)?;
        tracing::debug!(%spreadsheet_id, %range, rows = values.len(), "Writing sheet values");

        let response = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&ValueRangeBody {
                range,
                major_dimension: "ROWS",
                values,
            })
            .send()
            .await?;
        let body: UpdateValuesResponse = check_status(response).await?.json().await?;

        Ok(body.updated_cells)
    }
}

fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
