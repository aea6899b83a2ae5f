use crate::geometry::Vec3;

/// Positions of all CG sites in one trajectory frame, with the periodic box.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub positions: Vec<Vec3>,
    pub half_box: Vec3,
}

impl Frame {
    /// Creates a frame from full box lengths.
    pub fn new(positions: Vec<Vec3>, box_lengths: Vec3) -> Self {
        Self {
            positions,
            half_box: [
                0.5 * box_lengths[0],
                0.5 * box_lengths[1],
                0.5 * box_lengths[2],
            ],
        }
    }

    /// Frame in a box too large for any image shift to apply.
    pub fn open(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            half_box: [f64::MAX; 3],
        }
    }

    #[inline]
    pub fn n_sites(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_half_box_lengths() {
        let frame = Frame::new(vec![[0.0; 3]; 2], [10.0, 20.0, 30.0]);
        assert_eq!(frame.half_box, [5.0, 10.0, 15.0]);
        assert_eq!(frame.n_sites(), 2);
    }
}
