//! Material service abstractions
//!
//! The ingestion core only talks to the processing backend through
//! [`MaterialSubmitter`]; [`MaterialClient`] is the REST implementation.

pub mod auth;
pub mod material_client;
pub mod refresh;
pub mod submitter;

pub use auth::{AuthTokens, TokenStore};
pub use material_client::MaterialClient;
pub use refresh::{PendingRefresh, RefreshCoordinator, RefreshLease, RefreshTicket};
pub use submitter::{wait_until_settled, MaterialSubmitter};
