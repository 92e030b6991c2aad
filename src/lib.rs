//! SAP Portal gateway
//!
//! REST backend for the work-order portal. Searches are forwarded to the
//! `ZTEM_TEST_CATS_SRV` OData service and normalized for the frontend; a small
//! CRUD facade sits on top of the RFC connector.
//!
//! ```no_run
//! use sap_portal::config::SapConfig;
//! use sap_portal::odata::{SapODataClient, SearchCriteria, WorkOrderSearch};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SapConfig::new("https://sap.example.com:44300".parse()?);
//! let client = SapODataClient::new(&config)?;
//!
//! let criteria = SearchCriteria { vin: Some("1HGBH41JXMN109186".into()), ..Default::default() };
//! for order in client.search(&criteria).await? {
//!     println!("{} {}", order.wono, order.wo_status_text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod odata;
pub mod rfc;
pub mod routes;
pub mod telemetry;

pub use error::{Result, SapError};
