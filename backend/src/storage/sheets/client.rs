//! # Google Sheets HTTP Client
//!
//! [`SheetsApi`] over the Sheets v4 and Drive v3 REST APIs using
//! `reqwest::blocking`. Values are written with `valueInputOption=RAW` so text
//! such as timestamps is stored verbatim, and read back as formatted strings.

use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use serde_json::json;
use shared::Value;
use std::sync::Arc;
use std::time::Duration;

use super::a1::A1Range;
use super::api::{SheetsApi, WorksheetProperties};
use super::auth::TokenSource;
use crate::storage::StorageError;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: Option<String>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

impl From<SheetProperties> for WorksheetProperties {
    fn from(properties: SheetProperties) -> Self {
        WorksheetProperties {
            sheet_id: properties.sheet_id,
            title: properties.title,
            row_count: properties.grid_properties.row_count,
            column_count: properties.grid_properties.column_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Sheets/Drive REST client holding one HTTP session for its lifetime
pub struct HttpSheetsApi {
    client: Client,
    tokens: Arc<dyn TokenSource>,
}

/// Blocking HTTP session shared by the Sheets client and token minting
pub fn build_client(timeout: Duration) -> Result<Client, StorageError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| StorageError::Transport {
            endpoint: SHEETS_API_URL.to_string(),
            source,
        })
}

impl HttpSheetsApi {
    pub fn new(client: Client, tokens: Arc<dyn TokenSource>) -> Self {
        Self { client, tokens }
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T, StorageError> {
        let token = self.tokens.access_token()?;
        debug!("Sheets API request: {}", endpoint);

        let response = request
            .bearer_auth(token)
            .send()
            .map_err(|source| StorageError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(StorageError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().map_err(|e| StorageError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn batch_update(&self, spreadsheet_id: &str, requests: serde_json::Value) -> Result<BatchUpdateResponse, StorageError> {
        let url = sheets_url(&[&format!("{}:batchUpdate", spreadsheet_id)])?;
        let endpoint = url.to_string();
        self.send(
            self.client.post(url).json(&json!({ "requests": requests })),
            &endpoint,
        )
    }
}

fn sheets_url(segments: &[&str]) -> Result<Url, StorageError> {
    let mut url = Url::parse(SHEETS_API_URL)
        .map_err(|e| StorageError::Config(format!("invalid Sheets API URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| StorageError::Config("Sheets API URL cannot take a path".to_string()))?
        .extend(segments);
    Ok(url)
}

fn values_url(spreadsheet_id: &str, range: &A1Range, action: Option<&str>) -> Result<Url, StorageError> {
    let range_segment = match action {
        Some(action) => format!("{}:{}", range, action),
        None => range.to_string(),
    };
    sheets_url(&[spreadsheet_id, "values", &range_segment])
}

fn cell_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Empty => json!(""),
        Value::Text(text) => json!(text),
        Value::Number(number) => serde_json::Number::from_f64(*number)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| json!(value.to_cell())),
    }
}

fn rows_json(rows: &[Vec<Value>]) -> Vec<Vec<serde_json::Value>> {
    rows.iter().map(|row| row.iter().map(cell_json).collect()).collect()
}

fn cell_text(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Drive query literal: backslashes and single quotes are escaped
fn drive_literal(name: &str) -> String {
    name.replace('\\', "\\\\").replace('\'', "\\'")
}

impl SheetsApi for HttpSheetsApi {
    fn find_spreadsheet(&self, name: &str) -> Result<Option<String>, StorageError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            drive_literal(name),
            SPREADSHEET_MIME_TYPE
        );
        let request = self.client.get(DRIVE_FILES_URL).query(&[
            ("q", query.as_str()),
            ("fields", "files(id)"),
            ("pageSize", "1"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);
        let list: DriveFileList = self.send(request, DRIVE_FILES_URL)?;
        Ok(list.files.into_iter().next().map(|file| file.id))
    }

    fn create_spreadsheet(&self, name: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .post(SHEETS_API_URL)
            .json(&json!({ "properties": { "title": name } }));
        let created: SpreadsheetResponse = self.send(request, SHEETS_API_URL)?;
        created.spreadsheet_id.ok_or_else(|| StorageError::InvalidResponse {
            endpoint: SHEETS_API_URL.to_string(),
            message: "response has no spreadsheetId".to_string(),
        })
    }

    fn worksheets(&self, spreadsheet_id: &str) -> Result<Vec<WorksheetProperties>, StorageError> {
        let url = sheets_url(&[spreadsheet_id])?;
        let endpoint = url.to_string();
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title,gridProperties)")]);
        let spreadsheet: SpreadsheetResponse = self.send(request, &endpoint)?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|entry| entry.properties.into())
            .collect())
    }

    fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: usize,
        columns: usize,
    ) -> Result<WorksheetProperties, StorageError> {
        let response = self.batch_update(
            spreadsheet_id,
            json!([{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": columns }
                    }
                }
            }]),
        )?;
        response
            .replies
            .into_iter()
            .find_map(|reply| reply.add_sheet)
            .map(|entry| entry.properties.into())
            .ok_or_else(|| StorageError::InvalidResponse {
                endpoint: format!("{}:batchUpdate", spreadsheet_id),
                message: "addSheet reply missing".to_string(),
            })
    }

    fn append_columns(&self, spreadsheet_id: &str, sheet_id: i64, count: usize) -> Result<(), StorageError> {
        self.batch_update(
            spreadsheet_id,
            json!([{
                "appendDimension": { "sheetId": sheet_id, "dimension": "COLUMNS", "length": count }
            }]),
        )?;
        Ok(())
    }

    fn get_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<Vec<Vec<String>>, StorageError> {
        let url = values_url(spreadsheet_id, range, None)?;
        let endpoint = url.to_string();
        let request = self.client.get(url).query(&[
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ]);
        let values: ValueRange = self.send(request, &endpoint)?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn update_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError> {
        let url = values_url(spreadsheet_id, range, None)?;
        let endpoint = url.to_string();
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range.to_string(),
                "majorDimension": "ROWS",
                "values": rows_json(rows),
            }));
        self.send::<IgnoredAny>(request, &endpoint)?;
        Ok(())
    }

    fn append_values(&self, spreadsheet_id: &str, range: &A1Range, rows: &[Vec<Value>]) -> Result<(), StorageError> {
        let url = values_url(spreadsheet_id, range, Some("append"))?;
        let endpoint = url.to_string();
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({
                "range": range.to_string(),
                "majorDimension": "ROWS",
                "values": rows_json(rows),
            }));
        self.send::<IgnoredAny>(request, &endpoint)?;
        Ok(())
    }

    fn clear_values(&self, spreadsheet_id: &str, range: &A1Range) -> Result<(), StorageError> {
        let url = values_url(spreadsheet_id, range, Some("clear"))?;
        let endpoint = url.to_string();
        self.send::<IgnoredAny>(self.client.post(url).json(&json!({})), &endpoint)?;
        Ok(())
    }

    fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        start_index: usize,
        end_index: usize,
    ) -> Result<(), StorageError> {
        self.batch_update(
            spreadsheet_id,
            json!([{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start_index,
                        "endIndex": end_index
                    }
                }
            }]),
        )?;
        Ok(())
    }
}
