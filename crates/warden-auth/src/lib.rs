//! Directory authentication for Warden

pub mod directory;

pub use directory::{
    ControllerSelector, DirectoryAuthenticator, DirectoryConnection, DirectoryConnector,
    DirectoryEntry, DirectoryError, IdentityRecord, LdapConnector, QueryOutput, SearchResult,
    SelectedController,
};
