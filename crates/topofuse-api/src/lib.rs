//! Async HTTP clients for the systems `topofuse` fuses into one topology.
//!
//! - [`SourceClient`] talks to the firewall switch-controller and
//!   detected-device monitors, the cloud switch API, and the discovery
//!   scanner, returning raw wire types from [`models`].
//! - [`VendorLookupClient`] resolves an OUI to a manufacturer name through
//!   an external registry.
//!
//! Nothing here knows about the fused graph; `topofuse-core` owns that.

pub mod error;
pub mod models;
pub mod source;
pub mod transport;
pub mod vendor;

pub use error::Error;
pub use source::SourceClient;
pub use transport::{SourceAuth, TlsMode, TransportConfig};
pub use vendor::{DEFAULT_LOOKUP_URL, VendorLookupClient};
