//! Mapping policies: whether a discovered folder is (re)registered

use drivemap_core::domain::{MappingRegistry, RemoteId};

/// Decides whether a discovered remote folder is registered in the registry
pub trait MappingStrategy: Send + Sync {
    fn should_map(&self, remote_id: &RemoteId, registry: &MappingRegistry) -> bool;
}

/// Registers every discovered folder, remapping known ones in place
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysMap;

impl MappingStrategy for AlwaysMap {
    fn should_map(&self, _remote_id: &RemoteId, _registry: &MappingRegistry) -> bool {
        true
    }
}

/// Registers only folders the registry does not know yet
#[derive(Debug, Clone, Copy, Default)]
pub struct MapIfNotAlreadyMapped;

impl MappingStrategy for MapIfNotAlreadyMapped {
    fn should_map(&self, remote_id: &RemoteId, registry: &MappingRegistry) -> bool {
        !registry.is_mapped(remote_id)
    }
}
