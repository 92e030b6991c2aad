//! Mapping of raw WOHeaderSet entities onto the frontend's work-order record.

use serde::{Deserialize, Serialize};

use super::parse::RawEntity;

/// Work order as returned to the frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderRecord {
    /// Creation date, date part only (`YYYY-MM-DD`).
    pub credate: String,
    pub dealer_code: String,
    pub vin: String,
    pub wo_status: String,
    pub wo_status_text: String,
    pub wo_type: String,
    pub wo_type_text: String,
    pub fg_status_text: String,
    pub pds: String,
    pub demo: String,
    /// Work-order number.
    pub wono: String,
    pub creuser: String,
    pub ra_country_text: String,
    /// Approval status text.
    pub wo_onay_text: String,
    pub reject_note: String,
    /// Whether the approval action is available (`Wonay == "X"`).
    pub enability_button: bool,
}

impl From<&RawEntity> for WorkOrderRecord {
    fn from(raw: &RawEntity) -> Self {
        let field = |name: &str| raw.get(name).cloned().unwrap_or_default();

        Self {
            credate: date_part(raw.get("Credate").map(String::as_str).unwrap_or_default()),
            dealer_code: field("DealerCode"),
            vin: field("Vin"),
            wo_status: field("WoStatus"),
            wo_status_text: field("WoStatusText"),
            wo_type: field("WoType"),
            wo_type_text: field("WoTypeText"),
            // not exposed by WOHeaderSet
            fg_status_text: String::new(),
            pds: String::new(),
            demo: String::new(),
            wono: field("Wono"),
            creuser: field("Creuser"),
            ra_country_text: field("Landx"),
            wo_onay_text: field("Wonaytext"),
            reject_note: field("Wonot"),
            enability_button: raw.get("Wonay").is_some_and(|v| v == "X"),
        }
    }
}

fn date_part(value: &str) -> String {
    value.split('T').next().unwrap_or_default().to_string()
}

/// Map every raw entity, preserving order.
pub fn map_records(entities: &[RawEntity]) -> Vec<WorkOrderRecord> {
    entities.iter().map(WorkOrderRecord::from).collect()
}
