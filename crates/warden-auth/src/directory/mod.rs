//! Active Directory authentication module
//!
//! Authenticates username/password pairs against a pool of domain
//! controllers and maps directory group memberships to local roles.
//!
//! Features:
//! - Randomized controller selection with TCP liveness probing
//! - Privileged-as-user bind (query rights equal the bound user's)
//! - Group membership to local role resolution
//! - Generic filtered queries over the same pipeline

mod client;
mod identity;
mod pipeline;
mod selector;

pub use client::{
    DirectoryConnection, DirectoryConnector, DirectoryEntry, DirectoryError, LdapConnection,
    LdapConnector, SearchResult,
};
pub use identity::{map_entry, IdentityRecord, AUTH_ATTRIBUTES};
pub use pipeline::{DirectoryAuthenticator, QueryOutput};
pub use selector::{ControllerSelector, SelectedController};
