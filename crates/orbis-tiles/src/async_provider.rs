//! Tile provider that loads tiles on a background thread pool.
//!
//! Lookups never block: a missing tile is queued for a worker and reported as
//! loading. Finished loads wait on a bounded channel until the owner calls
//! [`TileProvider::update`], which makes them resident.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use dashmap::DashMap;
use orbis_geodetic::ChunkIndex;
use tracing::{debug, trace, warn};

use crate::error::TileError;
use crate::memory::TexelGrid;
use crate::provider::TileProvider;
use crate::tile::{DepthTransform, TextureHandle, Tile};

/// Produces texel data for a tile index. Runs on worker threads.
pub trait TileSource: Send + Sync + 'static {
    /// Deepest level the source has data for.
    fn max_level(&self) -> u8;

    /// Load the texels of one tile, or `None` if the source has no data.
    fn load(&self, index: ChunkIndex) -> Option<TexelGrid>;

    /// Mapping from raw texels to meters.
    fn depth_transform(&self) -> DepthTransform {
        DepthTransform::IDENTITY
    }
}

#[derive(Clone, Copy, Debug)]
enum CacheEntry {
    Loading,
    Ready(Tile),
    Missing,
}

struct LoadRequest {
    index: ChunkIndex,
    generation: u64,
}

struct LoadResult {
    index: ChunkIndex,
    generation: u64,
    grid: Option<TexelGrid>,
}

/// Background-loading [`TileProvider`].
pub struct AsyncTileProvider {
    request_sender: Sender<LoadRequest>,
    result_receiver: Receiver<LoadResult>,
    cache: DashMap<ChunkIndex, CacheEntry>,
    texels: DashMap<u64, TexelGrid>,
    generation: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    dropped: AtomicU64,
    next_texture_id: u64,
    max_level: u8,
    depth_transform: DepthTransform,
}

impl AsyncTileProvider {
    /// Start `thread_count` workers loading from `source`, with at most
    /// `queue_capacity` requests waiting.
    pub fn new<S: TileSource>(
        source: S,
        thread_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, TileError> {
        let queue_capacity = queue_capacity.max(1);
        let (request_sender, request_receiver) = bounded::<LoadRequest>(queue_capacity);
        let (result_sender, result_receiver) = bounded::<LoadResult>(queue_capacity * 2);
        let max_level = source.max_level();
        let depth_transform = source.depth_transform();
        let source = Arc::new(source);
        let generation = Arc::new(AtomicU64::new(0));
        let in_flight = Arc::new(AtomicU64::new(0));

        for worker in 0..thread_count.max(1) {
            let receiver = request_receiver.clone();
            let sender = result_sender.clone();
            let source = Arc::clone(&source);
            let generation = Arc::clone(&generation);
            let in_flight = Arc::clone(&in_flight);

            let _handle = std::thread::Builder::new()
                .name(format!("tile-worker-{worker}"))
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        // Skip work invalidated by a reset.
                        if request.generation == generation.load(Ordering::Relaxed) {
                            let grid = source.load(request.index);
                            let _ = sender.send(LoadResult {
                                index: request.index,
                                generation: request.generation,
                                grid,
                            });
                        }
                        in_flight.fetch_sub(1, Ordering::Relaxed);
                    }
                })
                .map_err(TileError::WorkerSpawn)?;
        }
        debug!(threads = thread_count.max(1), queue_capacity, max_level, "started tile workers");

        Ok(Self {
            request_sender,
            result_receiver,
            cache: DashMap::new(),
            texels: DashMap::new(),
            generation,
            in_flight,
            dropped: AtomicU64::new(0),
            next_texture_id: 1,
            max_level,
            depth_transform,
        })
    }

    /// Start with a thread count derived from the CPU count.
    pub fn with_defaults<S: TileSource>(source: S, queue_capacity: usize) -> Result<Self, TileError> {
        let cpus = num_cpus::get().max(2);
        Self::new(source, (cpus - 2).max(1), queue_capacity)
    }

    /// Requests queued or being loaded.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Requests dropped because the load queue was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of resident tiles.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.cache
            .iter()
            .filter(|entry| matches!(entry.value(), CacheEntry::Ready(_)))
            .count()
    }

    fn cached(&self, index: ChunkIndex) -> Option<Tile> {
        if index.level > self.max_level {
            return Some(Tile::UNAVAILABLE);
        }
        self.cache.get(&index).map(|entry| match *entry {
            CacheEntry::Loading => Tile::LOADING,
            CacheEntry::Ready(tile) => tile,
            CacheEntry::Missing => Tile::UNAVAILABLE,
        })
    }
}

impl TileProvider for AsyncTileProvider {
    fn tile(&self, index: ChunkIndex) -> Tile {
        if let Some(tile) = self.cached(index) {
            return tile;
        }
        self.cache.insert(index, CacheEntry::Loading);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let request = LoadRequest {
            index,
            generation: self.generation.load(Ordering::Relaxed),
        };
        match self.request_sender.try_send(request) {
            Ok(()) => trace!(%index, "queued tile load"),
            Err(TrySendError::Full(_)) => {
                // Dropped so the next lookup retries.
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.cache.remove(&index);
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!(%index, dropped, "tile load queue full, dropping requests");
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                warn!(%index, "tile workers have stopped");
                self.cache.insert(index, CacheEntry::Missing);
                return Tile::UNAVAILABLE;
            }
        }
        Tile::LOADING
    }

    fn cached_tile(&self, index: ChunkIndex) -> Tile {
        self.cached(index).unwrap_or(Tile::UNAVAILABLE)
    }

    fn depth_transform(&self) -> DepthTransform {
        self.depth_transform
    }

    fn texel(&self, texture: TextureHandle, x: u32, y: u32) -> Option<f32> {
        self.texels.get(&texture.id)?.get(x, y)
    }

    fn update(&mut self) {
        let generation = self.generation.load(Ordering::Relaxed);
        let mut finished = 0usize;
        while let Ok(result) = self.result_receiver.try_recv() {
            if result.generation != generation {
                continue;
            }
            let entry = match result.grid {
                Some(grid) => {
                    let texture = TextureHandle {
                        id: self.next_texture_id,
                        width: grid.width,
                        height: grid.height,
                    };
                    self.next_texture_id += 1;
                    let tile = Tile::ok(texture, grid.metadata());
                    self.texels.insert(texture.id, grid);
                    CacheEntry::Ready(tile)
                }
                None => CacheEntry::Missing,
            };
            self.cache.insert(result.index, entry);
            finished += 1;
        }
        if finished > 0 {
            trace!(finished, in_flight = self.in_flight_count(), "integrated tile loads");
        }
    }

    fn reset(&mut self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
        self.cache.clear();
        self.texels.clear();
        debug!("cleared tile cache");
    }
}
