//! Portal collaborator boundary.
//!
//! The validator only talks to the portal through this trait; the ArcGIS REST
//! implementation lives in `agol-audit-portal`.

use crate::item::RemoteItem;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    #[error("authentication failed for {user}: {message}")]
    Auth { user: String, message: String },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("portal rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("unknown {kind} `{name}`")]
    Unknown { kind: String, name: String },
}

impl PortalError {
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Reads and writes against the item owner's content.
pub trait Portal {
    /// Every Feature Service item owned by the user, root folder first.
    ///
    /// Group and capability lookups that fail are recorded on the item as
    /// `Lookup::Unavailable`; only enumeration failures are errors.
    fn feature_service_items(&self) -> Result<Vec<RemoteItem>, PortalError>;

    /// Write title and/or tags in a single update. `None` leaves a field as is.
    fn update_details(
        &self,
        item: &RemoteItem,
        title: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<(), PortalError>;

    /// Share with the group titled `group_title` (and with everyone).
    fn share_with_group(&self, item: &RemoteItem, group_title: &str) -> Result<(), PortalError>;

    /// Move into the owner's folder titled `folder_title`.
    fn move_to_folder(&self, item: &RemoteItem, folder_title: &str) -> Result<(), PortalError>;

    fn protect(&self, item: &RemoteItem) -> Result<(), PortalError>;

    /// Add the `Extract` capability to the item's hosted service.
    fn enable_downloads(&self, item: &RemoteItem) -> Result<(), PortalError>;
}
