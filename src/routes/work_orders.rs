//! Work-order search endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::odata::{SearchCriteria, StrategyFlags, WorkOrderRecord};

fn default_lang() -> String {
    "EN".to_string()
}

/// Search form as posted by the frontend. Strategy checkboxes may be `null`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkOrderSearchRequest {
    #[serde(default = "default_lang")]
    pub i_lang: String,
    pub i_usercode: String,

    pub vin: Option<String>,
    pub dealer_code: Option<String>,
    pub wo_no: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,

    pub temsa_global: Option<bool>,
    pub temsa_global_gwk: Option<bool>,
    pub germany: Option<bool>,
    pub france: Option<bool>,
    pub north_america: Option<bool>,
}

impl From<WorkOrderSearchRequest> for SearchCriteria {
    fn from(req: WorkOrderSearchRequest) -> Self {
        Self {
            vin: req.vin,
            dealer_code: req.dealer_code,
            wo_no: req.wo_no,
            date_from: req.date_from,
            date_to: req.date_to,
            strategies: StrategyFlags {
                temsa_global: req.temsa_global.unwrap_or(false),
                temsa_global_gwk: req.temsa_global_gwk.unwrap_or(false),
                germany: req.germany.unwrap_or(false),
                france: req.france.unwrap_or(false),
                north_america: req.north_america.unwrap_or(false),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderSearchResponse {
    pub success: bool,
    pub message: String,
    pub work_orders: Vec<WorkOrderRecord>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    /// Stable failure label (`timeout`, `authentication`, ...).
    pub error_code: Option<String>,
}

/// Answers 200 once the request body is read; search failures are reported in
/// the envelope.
pub(super) async fn search(
    State(state): State<AppState>,
    payload: Result<Json<WorkOrderSearchRequest>, JsonRejection>,
) -> Result<Json<WorkOrderSearchResponse>, ApiError> {
    let Json(request) = payload?;
    info!(user = %request.i_usercode, lang = %request.i_lang, "work-order search");
    let criteria = SearchCriteria::from(request);

    let response = match state.work_orders.search(&criteria).await {
        Ok(work_orders) => WorkOrderSearchResponse {
            success: true,
            message: "Search completed successfully".to_string(),
            work_orders,
            error_type: None,
            error_message: None,
            error_code: None,
        },
        Err(err) => {
            warn!(error_code = err.code(), error = %err, "work-order search failed");
            let user_message = err.user_message();
            WorkOrderSearchResponse {
                success: false,
                message: format!("Search failed: {user_message}"),
                work_orders: Vec::new(),
                error_type: Some("E".to_string()),
                error_message: Some(user_message),
                error_code: Some(err.code().to_string()),
            }
        }
    };
    Ok(Json(response))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub value: String,
    pub text: String,
}

/// Dropdown catalogue for the search form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFormData {
    pub wo_types: Vec<DropdownOption>,
    pub wo_statuses: Vec<DropdownOption>,
    pub fg_statuses: Vec<DropdownOption>,
    pub countries: Vec<DropdownOption>,
    pub approval_statuses: Vec<DropdownOption>,
    pub ra_countries: Vec<DropdownOption>,
    pub strategies: Vec<DropdownOption>,
}

fn options(pairs: &[(&str, &str)]) -> Vec<DropdownOption> {
    pairs
        .iter()
        .map(|(value, text)| DropdownOption { value: value.to_string(), text: text.to_string() })
        .collect()
}

// TODO: load these from the value-help entity sets once SAP exposes them
pub(super) async fn form_data() -> Json<SearchFormData> {
    let strategies = ["TG", "TI", "TD", "TF", "TU", "TX", "TY", "TZ"]
        .iter()
        .map(|code| DropdownOption { value: code.to_string(), text: format!("{code} Strategy") })
        .collect();

    Json(SearchFormData {
        wo_types: options(&[
            ("10", "Warranty Repair"),
            ("20", "Customer Paid Repair"),
            ("30", "Internal Repair"),
            ("40", "Recall"),
        ]),
        wo_statuses: options(&[
            ("10", "Created"),
            ("20", "Released"),
            ("30", "In Progress"),
            ("40", "Completed"),
            ("41", "Pending Approval"),
            ("50", "Closed"),
        ]),
        fg_statuses: options(&[("10", "Not Started"), ("20", "In Progress"), ("30", "Completed")]),
        countries: options(&[
            ("TR", "Turkey"),
            ("DE", "Germany"),
            ("FR", "France"),
            ("EG", "Egypt"),
            ("US", "United States"),
        ]),
        approval_statuses: options(&[("A", "Approved"), ("R", "Rejected"), ("P", "Pending")]),
        ra_countries: options(&[("TR", "Turkey"), ("DE", "Germany"), ("EG", "Egypt")]),
        strategies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_strategy_flags_become_false() {
        let request: WorkOrderSearchRequest = serde_json::from_str(
            r#"{"i_usercode":"U1","vin":"V1","germany":true,"france":null}"#,
        )
        .unwrap();
        assert_eq!(request.i_lang, "EN");

        let criteria = SearchCriteria::from(request);
        assert_eq!(criteria.vin.as_deref(), Some("V1"));
        assert!(criteria.strategies.germany);
        assert!(!criteria.strategies.france);
        assert!(!criteria.strategies.north_america);
    }

    #[test]
    fn usercode_is_required() {
        assert!(serde_json::from_str::<WorkOrderSearchRequest>(r#"{"vin":"V1"}"#).is_err());
    }
}
