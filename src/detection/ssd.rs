//! Anchor generation for Single Shot MultiBox Detectors (SSDs).
//!
//! Note that this is only meant to work for the palm detection network, not for SSDs in general:
//! every anchor is a fixed-size box centered on its feature map cell.

use std::ops::Index;

use crate::image::Resolution;

/// An anchor of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    // values range from 0 to 1
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    pub fn y_center(&self) -> f32 {
        self.y_center
    }
}

/// Describes an output layer of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct LayerInfo {
    /// Number of anchors per feature map cell. Must be non-zero.
    boxes_per_cell: u32,
    /// Feature map resolution of this layer.
    resolution: Resolution,
}

impl LayerInfo {
    /// Creates a new SSD layer description.
    ///
    /// # Parameters
    ///
    /// - `boxes_per_cell`: the number of boxes associated with each cell in this feature map.
    /// - `width`/`height`: size of this layer's feature map, in output cells.
    pub const fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        assert!(boxes_per_cell != 0);
        Self {
            boxes_per_cell,
            resolution: Resolution::new(width, height),
        }
    }
}

pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    /// Computes the anchors of a network with the given output `layers`, in output order.
    pub fn calculate(layers: &[LayerInfo]) -> Self {
        let mut anchors = Vec::new();

        for layer in layers {
            let height = layer.resolution.height();
            let width = layer.resolution.width();

            for y in 0..height {
                for x in 0..width {
                    // Every box of a cell shares its center; the network regresses the size.
                    for _ in 0..layer.boxes_per_cell {
                        let x_center = (x as f32 + 0.5) / width as f32;
                        let y_center = (y as f32 + 0.5) / height as f32;

                        anchors.push(Anchor { x_center, y_center });
                    }
                }
            }
        }

        Self { anchors }
    }

    /// Returns the total number of SSD anchors/priors.
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn palm_anchor_count() {
        let anchors = Anchors::calculate(&[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)]);
        assert_eq!(anchors.anchor_count(), 2016);
    }

    #[test]
    fn anchors_are_cell_centers() {
        let anchors = Anchors::calculate(&[LayerInfo::new(2, 2, 2)]);
        assert_eq!(anchors.anchor_count(), 8);
        assert_relative_eq!(anchors[0].x_center(), 0.25);
        assert_relative_eq!(anchors[1].x_center(), 0.25);
        assert_relative_eq!(anchors[2].x_center(), 0.75);
        assert_relative_eq!(anchors[7].y_center(), 0.75);
    }
}
