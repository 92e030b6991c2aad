//! SAP RFC connector
//!
//! No RFC library is wired in yet, so [`MockRfcConnector`] answers every call
//! with development payloads. The connector is built by `main` and shared
//! through the router state.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::config::RfcConfig;

#[derive(Debug, Error)]
pub enum RfcError {
    #[error("no SAP connection available")]
    NotConnected,

    #[error("RFC call {function} failed: {message}")]
    CallFailed { function: String, message: String },
}

/// One row of a table read, field name to value.
pub type TableRow = Map<String, Value>;

/// Operations the CRUD facade needs from an RFC backend.
#[async_trait]
pub trait RfcConnector: Send + Sync {
    /// Open the connection. Returns whether the connector is now usable.
    async fn connect(&self) -> bool;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    async fn call_rfc(&self, function: &str, parameters: Value) -> Result<Value, RfcError>;

    /// Read rows through `RFC_READ_TABLE`.
    async fn read_table(
        &self,
        table: &str,
        fields: &[&str],
        where_clause: &str,
    ) -> Result<Vec<TableRow>, RfcError>;

    async fn create_record(&self, table: &str, data: &Value) -> Result<String, RfcError>;

    async fn update_record(&self, table: &str, id: &str, data: &Value) -> Result<bool, RfcError>;

    async fn delete_record(&self, table: &str, id: &str) -> Result<bool, RfcError>;
}

/// Parameter set for `RFC_READ_TABLE`.
pub fn read_table_parameters(table: &str, fields: &[&str], where_clause: &str) -> Value {
    let mut parameters = json!({
        "QUERY_TABLE": table,
        "DELIMITER": "|",
    });
    if !fields.is_empty() {
        let fields: Vec<Value> = fields.iter().map(|f| json!({ "FIELDNAME": f })).collect();
        parameters["FIELDS"] = Value::Array(fields);
    }
    if !where_clause.is_empty() {
        parameters["OPTIONS"] = json!([{ "TEXT": where_clause }]);
    }
    parameters
}

/// Development stand-in that never talks to SAP.
#[derive(Debug)]
pub struct MockRfcConnector {
    config: RfcConfig,
    connected: AtomicBool,
}

impl MockRfcConnector {
    pub fn new(config: RfcConfig) -> Self {
        Self { config, connected: AtomicBool::new(false) }
    }
}

#[async_trait]
impl RfcConnector for MockRfcConnector {
    async fn connect(&self) -> bool {
        if !self.config.is_complete() {
            info!("SAP RFC logon parameters incomplete, connector stays offline");
            return false;
        }
        self.connected.store(true, Ordering::SeqCst);
        info!(ashost = %self.config.ashost, client = %self.config.client, "SAP connection established");
        true
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("SAP connection closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn call_rfc(&self, function: &str, parameters: Value) -> Result<Value, RfcError> {
        if !self.is_connected() {
            error!(function, "RFC call without connection");
            return Err(RfcError::NotConnected);
        }
        info!(function, "RFC call completed");
        Ok(json!({
            "success": true,
            "data": format!("Mock response for {function}"),
            "parameters": parameters,
        }))
    }

    async fn read_table(
        &self,
        table: &str,
        fields: &[&str],
        where_clause: &str,
    ) -> Result<Vec<TableRow>, RfcError> {
        self.call_rfc("RFC_READ_TABLE", read_table_parameters(table, fields, where_clause))
            .await?;

        let rows = [("Value1", "Value2"), ("Value3", "Value4")]
            .into_iter()
            .map(|(a, b)| {
                let mut row = TableRow::new();
                row.insert("FIELD1".into(), a.into());
                row.insert("FIELD2".into(), b.into());
                row
            })
            .collect();
        Ok(rows)
    }

    async fn create_record(&self, table: &str, data: &Value) -> Result<String, RfcError> {
        info!(table, %data, "creating record");
        Ok("new_record_id".to_string())
    }

    async fn update_record(&self, table: &str, id: &str, data: &Value) -> Result<bool, RfcError> {
        info!(table, id, %data, "updating record");
        Ok(true)
    }

    async fn delete_record(&self, table: &str, id: &str) -> Result<bool, RfcError> {
        info!(table, id, "deleting record");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn config(complete: bool) -> RfcConfig {
        let value = |v: &str| if complete { v.to_string() } else { String::new() };
        RfcConfig {
            ashost: value("sapapp01"),
            sysnr: value("00"),
            client: value("100"),
            user: value("RFC_USER"),
            passwd: Secret::new(value("pw")),
            lang: "EN".into(),
        }
    }

    #[test]
    fn read_table_parameters_include_optional_parts() {
        let params = read_table_parameters("ZWO_HEAD", &["WONO", "VIN"], "WONO = '1'");
        assert_eq!(params["QUERY_TABLE"], "ZWO_HEAD");
        assert_eq!(params["DELIMITER"], "|");
        assert_eq!(params["FIELDS"][1]["FIELDNAME"], "VIN");
        assert_eq!(params["OPTIONS"][0]["TEXT"], "WONO = '1'");

        let bare = read_table_parameters("ZWO_HEAD", &[], "");
        assert!(bare.get("FIELDS").is_none());
        assert!(bare.get("OPTIONS").is_none());
    }

    #[tokio::test]
    async fn incomplete_config_stays_offline() {
        let connector = MockRfcConnector::new(config(false));
        assert!(!connector.connect().await);
        assert!(matches!(
            connector.call_rfc("BAPI_X", Value::Null).await,
            Err(RfcError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connected_mock_answers_calls() {
        let connector = MockRfcConnector::new(config(true));
        assert!(connector.connect().await);

        let result = connector.call_rfc("BAPI_X", json!({"A": 1})).await.unwrap();
        assert_eq!(result["data"], "Mock response for BAPI_X");
        assert_eq!(result["parameters"]["A"], 1);

        let rows = connector.read_table("ZWO_HEAD", &[], "").await.unwrap();
        assert_eq!(rows.len(), 2);

        connector.disconnect().await;
        assert!(!connector.is_connected());
    }
}
