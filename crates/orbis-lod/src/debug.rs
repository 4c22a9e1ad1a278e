//! Debug geometry for chunk bounds.

use glam::{DMat4, DVec4};
use orbis_config::LodConfig;
use orbis_geodetic::ChunkIndex;

use crate::chunk::Chunk;
use crate::culling::{Aabb3, ndc};

/// What a [`DebugBox`] outlines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugBoxKind {
    /// The chunk's bounding polyhedron, in clip space.
    Bounds,
    /// The screen-space box the frustum culler tests, in NDC with `w = 1`.
    ScreenAabb,
}

/// Eight corners to be drawn as a wire box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugBox {
    /// What the corners outline.
    pub kind: DebugBoxKind,
    /// Chunk the box belongs to.
    pub index: ChunkIndex,
    /// Corners, in the order of [`Chunk::bounding_corners`] or
    /// [`Aabb3::corners`].
    pub clip_corners: [DVec4; 8],
    /// RGBA line color.
    pub color: [f32; 4],
}

/// Line color for chunks at `level`, cycling through six hues.
#[must_use]
pub fn level_color(level: u8) -> [f32; 4] {
    let bits = 1 + level % 6;
    let channel = |bit: u8| f32::from((bits >> bit) & 1);
    [channel(0), channel(1), channel(2), 0.3]
}

/// Boxes for `chunk` requested by the `show_chunk_bounds` and
/// `show_chunk_aabb` flags.
#[must_use]
pub fn chunk_debug_boxes(
    chunk: &Chunk,
    model_view_projection: DMat4,
    config: &LodConfig,
) -> Vec<DebugBox> {
    if !config.show_chunk_bounds && !config.show_chunk_aabb {
        return Vec::new();
    }
    let clip = chunk
        .bounding_corners()
        .map(|corner| model_view_projection * corner.extend(1.0));
    let color = level_color(chunk.level());
    let mut boxes = Vec::with_capacity(2);
    if config.show_chunk_bounds {
        boxes.push(DebugBox {
            kind: DebugBoxKind::Bounds,
            index: chunk.index(),
            clip_corners: clip,
            color,
        });
    }
    if config.show_chunk_aabb {
        let screen = Aabb3::from_points(clip.map(ndc));
        boxes.push(DebugBox {
            kind: DebugBoxKind::ScreenAabb,
            index: chunk.index(),
            clip_corners: screen.corners().map(|c| c.extend(1.0)),
            color,
        });
    }
    boxes
}

#[cfg(test)]
mod tests {
    use orbis_geodetic::Ellipsoid;

    use super::*;

    #[test]
    fn test_level_colors_cycle() {
        assert_eq!(level_color(0), [1.0, 0.0, 0.0, 0.3]);
        assert_eq!(level_color(1), [0.0, 1.0, 0.0, 0.3]);
        assert_eq!(level_color(2), [1.0, 1.0, 0.0, 0.3]);
        assert_eq!(level_color(5), [0.0, 1.0, 1.0, 0.3]);
        assert_eq!(level_color(6), level_color(0));
    }

    #[test]
    fn test_boxes_follow_flags() {
        let ellipsoid = Ellipsoid::sphere(100.0);
        let chunk = Chunk::new(ChunkIndex::new(3, 1, 3), &ellipsoid);
        let mut config = LodConfig::default();
        assert!(chunk_debug_boxes(&chunk, DMat4::IDENTITY, &config).is_empty());

        config.show_chunk_bounds = true;
        let boxes = chunk_debug_boxes(&chunk, DMat4::IDENTITY, &config);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].kind, DebugBoxKind::Bounds);
        assert_eq!(boxes[0].clip_corners[0].truncate(), chunk.bounding_corners()[0]);

        config.show_chunk_aabb = true;
        let boxes = chunk_debug_boxes(&chunk, DMat4::IDENTITY, &config);
        assert_eq!(boxes.len(), 2);
        let screen = &boxes[1];
        assert_eq!(screen.kind, DebugBoxKind::ScreenAabb);
        assert!(screen.clip_corners.iter().all(|c| c.w == 1.0));
        assert_eq!(screen.color, level_color(3));
    }
}
