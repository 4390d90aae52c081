//! # Domain Models
//!
//! Canonical domain types for lienwatch filings.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Filing`] | Validated secured-lending filing |
//! | [`RawFiling`] | Loosely typed record as returned by a source adapter |
//! | [`FilingIdentity`] | Dedup identity (filing number or debtor + date) |
//! | [`FilingStatus`] | `active`, `terminated`, `lapsed` |
//! | [`FilingType`] | `ucc1` (financing statement) or `ucc3` (amendment) |
//! | [`Jurisdiction`] | Validated jurisdiction code |
//! | [`FilingDate`] | Calendar date of a filing |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Raw records are validated once, at the adapter boundary:
//!
//! ```rust,ignore
//! use lienwatch_core::{Filing, Jurisdiction, RawFiling};
//!
//! let ca = Jurisdiction::parse("ca")?;
//! let filing = Filing::from_raw(raw, "ca-portal", &ca)?;
//! assert_eq!(filing.jurisdiction.as_str(), "CA");
//! ```

mod filing;
mod jurisdiction;
mod timestamp;

pub use filing::{
    normalize_name, Filing, FilingIdentity, FilingStatus, FilingType, RawAmount, RawFiling,
};
pub use jurisdiction::Jurisdiction;
pub use timestamp::{FilingDate, UtcDateTime};
