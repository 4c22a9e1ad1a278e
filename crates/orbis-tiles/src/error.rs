//! Tile provider error types.

/// Errors raised while configuring or starting tile providers.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// A configuration key does not name a texture category.
    #[error("unknown texture category `{0}`")]
    UnknownCategory(String),

    /// A configuration entry names a provider that is not registered.
    #[error("no provider named `{name}` in category {category}")]
    UnknownProvider {
        /// Category that was searched.
        category: &'static str,
        /// Requested provider name.
        name: String,
    },

    /// A background worker thread could not be started.
    #[error("failed to spawn tile worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
