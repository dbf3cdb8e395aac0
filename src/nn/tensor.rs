//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks. Here they carry image data into the
//! hand detection networks, and flat feature vectors into classifiers.

use std::fmt;

use tinyvec::TinyVec;

use crate::error::{Error, Result};
use crate::iter::zip_exact;

/// A dynamically shaped, row-major `f32` tensor.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: TinyVec<[usize; 4]>,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates a tensor of the given shape by calling `f` for each element, in row-major order.
    pub fn from_shape_fn<F: FnMut(&[usize]) -> f32>(shape: &[usize], mut f: F) -> Self {
        let len = shape.iter().product();
        let mut data = Vec::with_capacity(len);
        let mut index: TinyVec<[usize; 4]> = shape.iter().map(|_| 0).collect();
        for _ in 0..len {
            data.push(f(&index[..]));

            // Advance the innermost index, carrying into outer dimensions.
            for (i, &size) in zip_exact(index.iter_mut(), shape.iter()).rev() {
                *i += 1;
                if *i < size {
                    break;
                }
                *i = 0;
            }
        }

        Self {
            shape: shape.iter().copied().collect(),
            data: data.into_boxed_slice(),
        }
    }

    /// Creates a tensor from a shape and its row-major data.
    ///
    /// Returns [`Error::DimensionMismatch`] if the number of elements doesn't match `shape`.
    pub fn from_vec(shape: &[usize], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            shape: shape.iter().copied().collect(),
            data: data.into_boxed_slice(),
        })
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let tract = tract.cast_to::<f32>()?;
        let data = tract.as_slice::<f32>()?.to_vec();
        Ok(Self::from_vec(tract.shape(), data)?)
    }

    pub(super) fn to_tract(&self) -> anyhow::Result<tract_onnx::prelude::Tensor> {
        Ok(tract_onnx::prelude::Tensor::from_shape(
            self.shape(),
            &self.data[..],
        )?)
    }

    /// Returns the shape of this tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns all elements in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Indexes a prefix of the tensor's dimensions, returning the contiguous elements below it.
    ///
    /// For a tensor of shape `[1, 2016, 18]`, `index(&[0, 5])` returns the 18 values of box 5.
    ///
    /// # Panics
    ///
    /// Panics if `indices` has more entries than `self` has dimensions, or if any index is out of
    /// bounds.
    #[track_caller]
    pub fn index(&self, indices: &[usize]) -> &[f32] {
        assert!(
            indices.len() <= self.rank(),
            "attempted to index tensor of shape {:?} with {:?}",
            self.shape(),
            indices
        );

        let mut data = &*self.data;
        for (dim, &index) in indices.iter().enumerate() {
            assert!(
                index < self.shape[dim],
                "attempted to index tensor of shape {:?} with {:?}",
                self.shape(),
                indices
            );
            let stride: usize = self.shape[dim + 1..].iter().product();
            data = &data[index * stride..(index + 1) * stride];
        }
        data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_fn_visits_row_major() {
        let mut seen = Vec::new();
        let t = Tensor::from_shape_fn(&[2, 3], |idx| {
            seen.push([idx[0], idx[1]]);
            (idx[0] * 10 + idx[1]) as f32
        });
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(seen[3], [1, 0]);
    }

    #[test]
    fn index_prefix() {
        let t = Tensor::from_vec(&[1, 2, 3], (0..6).map(|v| v as f32).collect()).unwrap();
        assert_eq!(t.index(&[0, 1]), &[3.0, 4.0, 5.0]);
        assert_eq!(t.index(&[0]).len(), 6);
        assert_eq!(t.index(&[0, 1, 2]), &[5.0]);
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(Tensor::from_vec(&[2, 2], vec![0.0; 3]).is_err());
    }
}
