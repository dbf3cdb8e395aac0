//! Neural Network inference.

pub mod tensor;

use std::{
    ops::{Index, RangeInclusive},
    path::Path,
    sync::Arc,
};

use tensor::Tensor;
use tract_onnx::prelude::{
    DatumExt, Framework, Graph, InferenceModelExt, SimplePlan, TValue, TVec, TypedFact, TypedOp,
};

use crate::image::{Color, Image, Rect, Resolution};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that operates on image data.
///
/// Like the underlying [`NeuralNetwork`], this is a cheaply [`Clone`]able handle to the underlying
/// data.
#[derive(Clone)]
pub struct Cnn {
    nn: NeuralNetwork,
    input_res: Resolution,
    shape: CnnInputShape,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input with a shape that matches the given
    /// [`CnnInputShape`].
    pub fn new(
        nn: NeuralNetwork,
        shape: CnnInputShape,
        color_mapper: ColorMapper,
    ) -> anyhow::Result<Self> {
        let input_res = Self::get_input_res(&nn, shape)?;

        Ok(Self {
            nn,
            input_res,
            shape,
            color_mapper,
        })
    }

    fn get_input_res(nn: &NeuralNetwork, shape: CnnInputShape) -> anyhow::Result<Resolution> {
        let input_shapes = nn.input_shapes()?;
        if input_shapes.len() != 1 {
            anyhow::bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                input_shapes.len(),
            );
        }

        let (w, h) = match (shape, &input_shapes[0][..]) {
            (CnnInputShape::NCHW, &[1, 3, h, w]) | (CnnInputShape::NHWC, &[1, h, w, 3]) => (w, h),
            (_, tensor_shape) => {
                anyhow::bail!(
                    "invalid model input shape for {:?} CNN: {:?}",
                    shape,
                    tensor_shape,
                );
            }
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Resolution::new(w, h))
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on the region `roi` of `image`, returning the estimated outputs.
    ///
    /// `roi` is sampled (nearest neighbor) to create the network's input tensor, so it is
    /// stretched if its aspect ratio does not match the network's. Parts of `roi` outside of
    /// `image` are filled with black.
    pub fn estimate(&self, image: &Image, roi: Rect) -> anyhow::Result<Outputs> {
        let (w, h) = (
            self.input_res.width() as usize,
            self.input_res.height() as usize,
        );
        let (sx, sy) = (roi.width() / w as f32, roi.height() / h as f32);
        let sample = |x: usize, y: usize| {
            image.sample(
                roi.x() + (x as f32 + 0.5) * sx,
                roi.y() + (y as f32 + 0.5) * sy,
            )
        };

        let tensor = match self.shape {
            CnnInputShape::NCHW => Tensor::from_shape_fn(&[1, 3, h, w], |idx| {
                self.color_mapper.map(sample(idx[3], idx[2]))[idx[1]]
            }),
            CnnInputShape::NHWC => Tensor::from_shape_fn(&[1, h, w, 3], |idx| {
                self.color_mapper.map(sample(idx[2], idx[1]))[idx[3]]
            }),
        };

        self.nn.estimate(&Inputs::from(tensor))
    }
}

/// Maps 8-bit sRGB colors to the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Creates a simple color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// Note that this operates on *non-linear* sRGB colors, but maps them linearly to the target
    /// range.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        let start = *self.target_range.start();
        let end = *self.target_range.end();

        let adjust_range = (end - start) / 255.0;
        [color.r(), color.g(), color.b()].map(|col| col as f32 * adjust_range + start)
    }
}

/// Describes in what order a CNN expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum CnnInputShape {
    /// Shape is `[N, C, H, W]`.
    NCHW,
    /// Shape is `[N, H, W, C]`.
    NHWC,
}

/// Neural network loader.
pub struct Loader {
    model_data: Vec<u8>,
    input_shape: Option<Vec<usize>>,
    outputs: Option<Vec<usize>>,
}

impl Loader {
    /// Fixes the shape of the network's first input.
    ///
    /// This is required for networks with symbolic input dimensions (eg. a dynamic batch size),
    /// which is how most exported classifiers declare their input.
    pub fn with_input_shape(mut self, shape: &[usize]) -> Self {
        self.input_shape = Some(shape.to_vec());
        self
    }

    /// Only compute the specified outputs during inference.
    ///
    /// This takes a list of network output indices. The [`Outputs`] returned from
    /// [`NeuralNetwork::estimate`] will then only contain the chosen output tensors, in the given
    /// order.
    pub fn with_output_selection<O>(mut self, outputs: O) -> Self
    where
        O: Into<Vec<usize>>,
    {
        self.outputs = Some(outputs.into());
        self
    }

    /// Loads and optimizes the network.
    ///
    /// Returns an error if the network data is malformed, if the network data is incomplete, or if
    /// the network uses unimplemented operations.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let mut graph = tract_onnx::onnx().model_for_read(&mut &*self.model_data)?;
        if let Some(shape) = self.input_shape {
            graph = graph.with_input_fact(0, f32::fact(shape).into())?;
        }
        let graph = graph.into_optimized()?;
        let outputs = graph.output_outlets()?;
        let selected_outputs = match self.outputs {
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    outputs.get(i).copied().ok_or_else(|| {
                        anyhow::anyhow!("network has no output #{i} ({} outputs)", outputs.len())
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => outputs.to_vec(),
        };
        let model = SimplePlan::new_for_outputs(graph, &selected_outputs)?;

        Ok(NeuralNetwork(Arc::new(model)))
    }
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures. Inference takes
/// `&self`, so a network can be shared between threads.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<Model>);

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Loader> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Loader> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!("neural network file must have `.onnx` extension"),
        }

        let model_data = std::fs::read(path)?;
        Ok(Self::from_onnx(model_data))
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    pub fn from_onnx(raw: Vec<u8>) -> Loader {
        Loader {
            model_data: raw,
            input_shape: None,
            outputs: None,
        }
    }

    /// Returns the concrete shapes of the network's inputs.
    ///
    /// Fails if an input has a symbolic shape. Use [`Loader::with_input_shape`] to fix it.
    pub fn input_shapes(&self) -> anyhow::Result<Vec<Vec<usize>>> {
        let model = self.0.model();
        (0..model.inputs.len())
            .map(|id| {
                let fact = model.input_fact(id)?;
                match fact.shape.as_concrete() {
                    Some(shape) => Ok(shape.to_vec()),
                    None => anyhow::bail!("network input #{id} has symbolic shape {:?}", fact.shape),
                }
            })
            .collect()
    }

    /// Runs the network on a set of [`Inputs`], returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: &Inputs) -> anyhow::Result<Outputs> {
        let inputs = inputs
            .inner
            .iter()
            .map(|t| Ok(TValue::from_const(Arc::new(t.to_tract()?))))
            .collect::<anyhow::Result<TVec<_>>>()?;
        let outputs = self.0.run(inputs)?;
        let inner = outputs
            .iter()
            .map(|tract| Tensor::from_tract(tract))
            .collect::<anyhow::Result<_>>()?;
        Ok(Outputs { inner })
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: Vec<Tensor>,
}

impl Outputs {
    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the output tensors.
    pub fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.inner.iter()
    }
}

impl FromIterator<Tensor> for Outputs {
    fn from_iter<T: IntoIterator<Item = Tensor>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Index<usize> for Outputs {
    type Output = Tensor;

    fn index(&self, index: usize) -> &Tensor {
        &self.inner[index]
    }
}

/// List of input tensors for neural network inference.
#[derive(Debug)]
pub struct Inputs {
    inner: Vec<Tensor>,
}

impl From<Tensor> for Inputs {
    fn from(t: Tensor) -> Self {
        Self { inner: vec![t] }
    }
}

impl FromIterator<Tensor> for Inputs {
    fn from_iter<T: IntoIterator<Item = Tensor>>(iter: T) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mapper() {
        let mapper = ColorMapper::linear(-1.0..=1.0);
        assert_eq!(mapper.map(Color::BLACK), [-1.0, -1.0, -1.0]);
        assert_eq!(mapper.map(Color::WHITE), [1.0, 1.0, 1.0]);

        let mapper = ColorMapper::linear(0.0..=1.0);
        assert_eq!(mapper.map(Color::RED), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_non_onnx_path() {
        assert!(NeuralNetwork::from_path("model.pkl").is_err());
    }

    #[test]
    fn rejects_malformed_onnx() {
        assert!(NeuralNetwork::from_onnx(b"not a network".to_vec())
            .load()
            .is_err());
    }
}
