//! Mapping a folder that discovery has not reached yet
//!
//! [`AncestorMapper`] climbs the remote parent chain of a folder until it
//! meets a mapped folder, then registers the missing chain top-down, every
//! link synced. The new mappings end at the requested folder.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use drivemap_core::domain::{MappingError, MappingRegistry, NodeId, RemoteId};
use drivemap_core::ports::{IRemoteStorage, RemoteItem};

use crate::SyncError;

/// Longest parent chain followed before giving up
const MAX_CHAIN: usize = 256;

pub struct AncestorMapper {
    remote: Arc<dyn IRemoteStorage>,
}

impl AncestorMapper {
    pub fn new(remote: Arc<dyn IRemoteStorage>) -> Self {
        Self { remote }
    }

    /// Maps `remote_id` and each of its unmapped ancestors
    ///
    /// Returns the handle of `remote_id`, which may have been mapped before.
    ///
    /// # Errors
    /// - `Mapping(InvalidArgument)` if `remote_id` is not a folder or does not
    ///   live below a mapped folder
    /// - `Mapping(IllegalState)` if the parent chain does not end
    /// - `Remote` on metadata lookup failures
    #[instrument(skip(self, registry), fields(folder = %remote_id))]
    pub async fn map_with_ancestors(
        &self,
        registry: &mut MappingRegistry,
        remote_id: &RemoteId,
    ) -> Result<NodeId, SyncError> {
        if let Some(id) = registry.handle(remote_id) {
            debug!("Folder already mapped");
            return Ok(id);
        }

        let mut chain: Vec<RemoteItem> = Vec::new();
        let mut current = remote_id.clone();
        let anchor = loop {
            if chain.len() >= MAX_CHAIN {
                return Err(MappingError::IllegalState(format!(
                    "Parent chain of {remote_id} is longer than {MAX_CHAIN} folders"
                ))
                .into());
            }

            let item = self
                .remote
                .get_metadata(&current)
                .await
                .map_err(SyncError::Remote)?;
            if !item.is_folder() {
                return Err(MappingError::InvalidArgument(format!("{current} is not a folder")).into());
            }
            let parent = item.parents.first().cloned().ok_or_else(|| {
                MappingError::InvalidArgument(format!(
                    "{remote_id} is not below the mapped root"
                ))
            })?;
            chain.push(item);

            if registry.is_mapped(&parent) {
                break parent;
            }
            current = parent;
        };

        info!(anchor = %anchor, missing = chain.len(), "Mapping folder with its ancestors");
        let mut parent = anchor;
        let mut last = None;
        for item in chain.into_iter().rev() {
            let outcome = registry.register_child(item.id.clone(), &item.name, true, &parent)?;
            last = Some(outcome.node_id());
            parent = item.id;
        }

        last.ok_or_else(|| {
            MappingError::IllegalState(format!("No mapping created for {remote_id}")).into()
        })
    }
}
