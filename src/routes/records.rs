//! CRUD facade over the RFC connector

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

use super::{ApiError, AppState};
use crate::odata::filter::escape_literal;
use crate::rfc::{RfcError, TableRow};

const RECORD_TABLE: &str = "ZPORTAL_RECORDS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SapRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SapResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SapResponse {
    fn ok(message: &str, data: Option<Value>) -> Self {
        Self { success: true, message: message.to_string(), data }
    }
}

fn sample_record(id: &str, name: &str, status: &str) -> SapRecord {
    let mut data = Map::new();
    data.insert("name".into(), name.into());
    data.insert("status".into(), status.into());
    SapRecord { id: Some(id.to_string()), data }
}

fn row_to_record(index: usize, row: TableRow) -> SapRecord {
    let id = row
        .get("ID")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| (index + 1).to_string());
    SapRecord { id: Some(id), data: row }
}

fn internal(action: &str, err: RfcError) -> ApiError {
    error!(action, error = %err, "RFC facade call failed");
    ApiError::internal(format!("Error {action}: {err}"))
}

pub(super) async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<SapRecord>>, ApiError> {
    if !state.rfc.is_connected() {
        return Ok(Json(vec![
            sample_record("1", "Sample Record 1", "Active"),
            sample_record("2", "Sample Record 2", "Inactive"),
        ]));
    }

    let rows = state
        .rfc
        .read_table(RECORD_TABLE, &[], "")
        .await
        .map_err(|e| internal("fetching records", e))?;
    Ok(Json(rows.into_iter().enumerate().map(|(i, row)| row_to_record(i, row)).collect()))
}

pub(super) async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<SapRecord>, ApiError> {
    if !state.rfc.is_connected() {
        return Ok(Json(sample_record(&record_id, &format!("Record {record_id}"), "Active")));
    }

    let where_clause = format!("ID = '{}'", escape_literal(&record_id));
    let rows = state
        .rfc
        .read_table(RECORD_TABLE, &[], &where_clause)
        .await
        .map_err(|e| internal("fetching record", e))?;

    let row = rows.into_iter().next().ok_or_else(|| ApiError::not_found("Record not found"))?;
    let mut record = row_to_record(0, row);
    record.id = Some(record_id);
    Ok(Json(record))
}

pub(super) async fn create_record(
    State(state): State<AppState>,
    payload: Result<Json<SapRecord>, JsonRejection>,
) -> Result<Json<SapResponse>, ApiError> {
    let Json(record) = payload?;
    let id = state
        .rfc
        .create_record(RECORD_TABLE, &Value::Object(record.data))
        .await
        .map_err(|e| internal("creating record", e))?;
    Ok(Json(SapResponse::ok("Record created successfully", Some(json!({ "id": id })))))
}

pub(super) async fn update_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    payload: Result<Json<SapRecord>, JsonRejection>,
) -> Result<Json<SapResponse>, ApiError> {
    let Json(record) = payload?;
    state
        .rfc
        .update_record(RECORD_TABLE, &record_id, &Value::Object(record.data))
        .await
        .map_err(|e| internal("updating record", e))?;
    Ok(Json(SapResponse::ok("Record updated successfully", None)))
}

pub(super) async fn delete_record(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<SapResponse>, ApiError> {
    state
        .rfc
        .delete_record(RECORD_TABLE, &record_id)
        .await
        .map_err(|e| internal("deleting record", e))?;
    Ok(Json(SapResponse::ok("Record deleted successfully", None)))
}
