//! SAP OData access for work-order searches
//!
//! - [`filter`] turns search criteria into a `$filter` expression
//! - [`client`] issues the request and negotiates Atom vs JSON
//! - [`parse`] reads either body format into raw entities
//! - [`mapping`] maps raw entities onto [`WorkOrderRecord`]

pub mod client;
pub mod filter;
pub mod mapping;
pub mod parse;

pub use client::{SapODataClient, WorkOrderSearch};
pub use filter::{build_filter, SearchCriteria, StrategyFlags};
pub use mapping::WorkOrderRecord;
