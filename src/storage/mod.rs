//! File-backed collaborators: the host inventory and the credential store.
//!
//! Both are read-only during a run.

mod credentials;
mod inventory;

pub use credentials::{Capability, CredentialRecord, CredentialResolver, JsonCredentialStore};
pub use inventory::{InventoryStore, JsonInventory};
