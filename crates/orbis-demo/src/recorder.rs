//! A headless renderer that tallies what the globe submits.

use orbis_lod::{Camera, ChunkRenderer, DebugBox, LayerTiles, RenderData, RenderedChunk};
use orbis_tiles::TileAndTransform;
use serde::Serialize;
use tracing::trace;

/// Per-frame tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FrameTally {
    /// Chunks drawn.
    pub chunks: usize,
    /// Layers resolved to a resident tile.
    pub resident_layers: usize,
    /// Layers with no data at any ancestor.
    pub missing_layers: usize,
    /// Layers served by an ancestor tile.
    pub fallback_layers: usize,
    /// Debug boxes drawn.
    pub debug_boxes: usize,
}

/// Counts submissions. `update` starts a new frame.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    current: FrameTally,
    frustums: usize,
}

impl RecordingRenderer {
    /// Tallies since the last update.
    pub fn tally(&self) -> FrameTally {
        self.current
    }

    /// Saved camera frustums drawn so far.
    pub fn frustums(&self) -> usize {
        self.frustums
    }

    fn count(&mut self, resolved: &TileAndTransform) {
        if !resolved.tile.is_ok() {
            self.current.missing_layers += 1;
        } else if resolved.uv_transform.scale.x < 1.0 {
            self.current.fallback_layers += 1;
            self.current.resident_layers += 1;
        } else {
            self.current.resident_layers += 1;
        }
    }
}

impl ChunkRenderer for RecordingRenderer {
    fn update(&mut self) {
        self.current = FrameTally::default();
    }

    fn render_chunk(&mut self, chunk: &RenderedChunk, _data: &RenderData) {
        trace!(index = %chunk.index, layers = chunk.layers.len(), "draw chunk");
        self.current.chunks += 1;
        for layer in &chunk.layers {
            match &layer.tiles {
                LayerTiles::Single(resolved) => self.count(resolved),
                // The highest resolution tile decides.
                LayerTiles::Blended(levels) => self.count(&levels[0]),
            }
        }
    }

    fn render_debug_box(&mut self, _debug_box: &DebugBox) {
        self.current.debug_boxes += 1;
    }

    fn render_camera_frustum(&mut self, _camera: &Camera, _data: &RenderData) {
        self.frustums += 1;
    }
}
