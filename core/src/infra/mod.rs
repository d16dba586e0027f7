//! External collaborators, expressed as traits so the core stays testable:
//! - scripture text repository and verse catalog
//! - remote annotation API
//! - connectivity and identity sources

pub mod connectivity;
pub mod identity;
pub mod remote;
pub mod text;

pub use connectivity::{ConnectionState, Connectivity};
pub use identity::{Identity, UserId};
pub use remote::{RemoteAnnotationApi, RemoteApiError};
pub use text::{Catalog, TextError, TextRepository};
