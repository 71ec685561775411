//! Collection configuration

/// Synchronization mode, fixed for a collection's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncMode {
    /// No blocking lock; overlapping access is a caller bug and panics
    #[default]
    Unsynchronized,
    /// Every operation runs under one coarse mutual-exclusion lock
    Synchronized,
}

impl SyncMode {
    #[inline]
    pub fn is_synchronized(self) -> bool {
        matches!(self, SyncMode::Synchronized)
    }
}

/// Construction parameters for an indexed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Initial capacity hint for both the sequence and the key index
    pub capacity: usize,
    /// Synchronization mode
    pub sync: SyncMode,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        CollectionConfig {
            capacity: 0,
            sync: SyncMode::Unsynchronized,
        }
    }
}

impl CollectionConfig {
    pub fn new() -> Self {
        CollectionConfig::default()
    }

    /// Lock-protected collection for sharing across threads
    pub fn synchronized() -> Self {
        CollectionConfig {
            capacity: 0,
            sync: SyncMode::Synchronized,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_sync(mut self, sync: SyncMode) -> Self {
        self.sync = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unsynchronized() {
        let config = CollectionConfig::default();
        assert_eq!(config.capacity, 0);
        assert_eq!(config.sync, SyncMode::Unsynchronized);
        assert!(!config.sync.is_synchronized());
    }

    #[test]
    fn test_presets_and_overrides() {
        let config = CollectionConfig::synchronized().with_capacity(64);
        assert!(config.sync.is_synchronized());
        assert_eq!(config.capacity, 64);

        let config = config.with_sync(SyncMode::Unsynchronized);
        assert_eq!(config, CollectionConfig::new().with_capacity(64));
    }
}
