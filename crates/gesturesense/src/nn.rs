//! Neural network inference with [`tract_onnx`].

use std::{
    fmt,
    ops::{Index, RangeInclusive},
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use tract_onnx::prelude::{
    tract_ndarray::Array4, tvec, Framework, Graph, InferenceModelExt, SimplePlan, TValue,
    TypedFact, TypedOp,
};

use crate::{
    image::{Color, Image, Resolution},
    rect::RotatedRect,
};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that takes a single RGB image as input.
///
/// This is a cheaply [`Clone`]able handle to the optimized network.
#[derive(Clone)]
pub struct Cnn {
    model: Arc<Model>,
    input_res: Resolution,
    shape: CnnInputShape,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Loads and optimizes an ONNX model from a file.
    ///
    /// The network must have exactly one input with a shape that matches `shape`.
    pub fn load(
        path: impl AsRef<Path>,
        shape: CnnInputShape,
        color_mapper: ColorMapper,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read model from '{}'", path.display()))?;
        Self::from_onnx(&data, shape, color_mapper)
            .with_context(|| format!("failed to load model '{}'", path.display()))
    }

    /// Loads and optimizes an in-memory ONNX model.
    pub fn from_onnx(
        data: &[u8],
        shape: CnnInputShape,
        color_mapper: ColorMapper,
    ) -> anyhow::Result<Self> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut &*data)?
            .into_optimized()?;

        if graph.inputs.len() != 1 {
            anyhow::bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                graph.inputs.len(),
            );
        }
        let fact = graph.input_fact(0)?;
        let Some(tensor_shape) = fact.shape.as_concrete() else {
            anyhow::bail!("CNN input shape {:?} is not concrete", fact.shape);
        };
        let (w, h) = match (shape, tensor_shape) {
            (CnnInputShape::NCHW, &[1, 3, h, w]) | (CnnInputShape::NHWC, &[1, h, w, 3]) => (w, h),
            _ => anyhow::bail!(
                "invalid model input shape for {:?} CNN: {:?}",
                shape,
                tensor_shape,
            ),
        };
        let input_res = Resolution::new(w.try_into()?, h.try_into()?);

        let model = SimplePlan::new(graph)?;
        log::debug!(
            "loaded {input_res} {shape:?} CNN with {} outputs",
            model.model().outputs.len()
        );

        Ok(Self {
            model: Arc::new(model),
            input_res,
            shape,
            color_mapper,
        })
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on the part of `image` covered by `roi`.
    ///
    /// The region is resampled to the network's input resolution, so it gets stretched if its
    /// aspect ratio does not match. Parts of `roi` outside of `image` are fed as black.
    pub fn estimate(&self, image: &Image, roi: RotatedRect) -> anyhow::Result<Outputs> {
        let (w, h) = (
            self.input_res.width() as usize,
            self.input_res.height() as usize,
        );
        let mut input = match self.shape {
            CnnInputShape::NCHW => Array4::<f32>::zeros((1, 3, h, w)),
            CnnInputShape::NHWC => Array4::<f32>::zeros((1, h, w, 3)),
        };
        image.sample_grid(roi, w, h, |x, y, color| {
            let rgb = self.color_mapper.map(color);
            for (c, value) in rgb.into_iter().enumerate() {
                match self.shape {
                    CnnInputShape::NCHW => input[[0, c, y, x]] = value,
                    CnnInputShape::NHWC => input[[0, y, x, c]] = value,
                }
            }
        });

        let outputs = self
            .model
            .run(tvec![TValue::from_const(Arc::new(input.into()))])?;
        let inner = outputs
            .into_iter()
            .map(|value| -> anyhow::Result<Tensor> {
                let view = value.to_array_view::<f32>()?;
                Ok(Tensor {
                    shape: view.shape().to_vec(),
                    data: view.iter().copied().collect(),
                })
            })
            .collect::<anyhow::Result<_>>()?;
        Ok(Outputs { inner })
    }
}

/// Maps sRGB colors to the value range a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Creates a color mapper that uniformly maps sRGB values to `target_range`.
    ///
    /// This operates on *non-linear* sRGB colors.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        let start = *self.target_range.start();
        let end = *self.target_range.end();
        let adjust_range = (end - start) / 255.0;
        color.rgb().map(|col| col as f32 * adjust_range + start)
    }
}

/// Describes in what order a CNN expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnnInputShape {
    /// Shape is `[N, C, H, W]`.
    NCHW,
    /// Shape is `[N, H, W, C]`.
    NHWC,
}

/// A dense `f32` output tensor.
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns all elements in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{:?}", self.shape)
    }
}

/// The result of a neural network inference pass, one tensor per network output.
#[derive(Debug)]
pub struct Outputs {
    inner: Vec<Tensor>,
}

impl Outputs {
    pub fn from_tensors(inner: Vec<Tensor>) -> Self {
        Self { inner }
    }

    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the tensor at `index`, failing if the network produced fewer outputs.
    pub fn get(&self, index: usize) -> anyhow::Result<&Tensor> {
        self.inner.get(index).with_context(|| {
            format!(
                "network output {index} requested, but it only has {}",
                self.inner.len()
            )
        })
    }
}

impl Index<usize> for Outputs {
    type Output = Tensor;

    fn index(&self, index: usize) -> &Tensor {
        &self.inner[index]
    }
}
