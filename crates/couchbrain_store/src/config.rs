//! Store configuration.

/// Configuration for the reference store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest page the listing endpoint will return.
    pub max_page_size: u32,
    /// Largest batch the bulk endpoint will accept.
    pub max_batch_size: usize,
}

impl ServerConfig {
    /// Creates a new store configuration.
    pub fn new() -> Self {
        Self {
            max_page_size: 1000,
            max_batch_size: 10_000,
        }
    }

    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, size: u32) -> Self {
        self.max_page_size = size;
        self
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
