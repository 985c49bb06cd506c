//! Reading model, classification and session buffering.
//!
//! ## Submodules
//!
//! - [`reading`]: [`Reading`], [`RiskTier`] and the pure [`classify`] function
//! - [`buffer`]: [`SessionBuffer`], the append-only per-session history
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "5s", "250ms")
//!
//! ## Data Flow
//!
//! ```text
//! sensor sample (f64)
//!        │
//!        ▼
//! SessionBuffer::push()
//!        │
//!        ├──▶ Reading (tier derived by classify())
//!        │
//!        └──▶ &[Reading] snapshot (view, store, exporter)
//! ```

pub mod buffer;
pub mod duration;
pub mod reading;

pub use buffer::SessionBuffer;
pub use reading::{classify, Reading, RiskTier, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
