//! XBRL parsing for IDX financial report archives.
//!
//! This module provides:
//! - A streaming reader for XBRL instance documents ([`XbrlInstance`])
//! - The concept table mapping IDX and IFRS tags to line items ([`LineItem`])
//! - Lenient numeric parsing for reported values ([`parse_decimal`])
//! - Record building from an extracted archive ([`parse_report`])
//!
//! # Example
//!
//! ```no_run
//! use idx_xbrl_data::xbrl::{XbrlInstance, extract_statement};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let instance = XbrlInstance::parse_file(Path::new("instance.xbrl"))?;
//!     let statement = extract_statement(&instance)?;
//!     println!(
//!         "{}: total assets {} {}",
//!         statement.period.label, statement.items.total_assets, statement.currency
//!     );
//!     Ok(())
//! }
//! ```

pub mod concepts;
pub mod instance;
pub mod numeric;
pub mod report;

pub use concepts::LineItem;
pub use instance::{ContextPeriod, XbrlContext, XbrlFact, XbrlInstance, XbrlUnit};
pub use numeric::parse_decimal;
pub use report::{ReportSource, Statement, extract_statement, parse_report, select_instance};
