//! Anchor generation for Single-Shot MultiBox Detectors (SSD).
//!
//! An SSD network predicts one box per anchor. Each output layer covers the input with a grid of
//! cells, and every cell holds a fixed number of anchors centered on it. Box predictions are
//! offsets relative to their anchor's center.

use std::ops::Index;

/// Describes one output layer of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct LayerInfo {
    boxes_per_cell: u32,
    width: u32,
    height: u32,
}

impl LayerInfo {
    pub const fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        Self {
            boxes_per_cell,
            width,
            height,
        }
    }

    fn anchor_count(&self) -> usize {
        self.boxes_per_cell as usize * self.width as usize * self.height as usize
    }
}

/// Parameters for [`Anchors::calculate`].
#[derive(Debug)]
pub struct AnchorParams<'a> {
    /// The network's output layers, in output order.
    pub layers: &'a [LayerInfo],
}

/// An anchor center, normalized to `[0, 1]` relative to the network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y_center
    }
}

/// The full list of anchors of an SSD network, in the order of the network's outputs.
#[derive(Debug)]
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    pub fn calculate(params: &AnchorParams<'_>) -> Self {
        let count = params.layers.iter().map(LayerInfo::anchor_count).sum();
        let mut anchors = Vec::with_capacity(count);
        for layer in params.layers {
            for y in 0..layer.height {
                for x in 0..layer.width {
                    let anchor = Anchor {
                        x_center: (x as f32 + 0.5) / layer.width as f32,
                        y_center: (y as f32 + 0.5) / layer.height as f32,
                    };
                    anchors.extend((0..layer.boxes_per_cell).map(|_| anchor));
                }
            }
        }

        Self { anchors }
    }

    #[inline]
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
