use crate::error::{DataLayerError, Result};
use std::fmt::Debug;

/// Numeric element types a [`Blob`] can hold.
///
/// Values read from disk are converted through `f64`, so integer types wider
/// than 53 bits lose precision and out-of-range floats saturate.
pub trait Element: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Short type name used in log and error messages.
    const NAME: &'static str;

    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                const NAME: &'static str = $name;

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_element!(
    u8 => "u8",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    f32 => "f32",
    f64 => "f64",
);

/// A dense, row-major n-dimensional buffer.
///
/// `Blob` is the tensor the data layer reads into and writes batches to.
/// Axis 0 is the sample axis: for data loaded from a file it counts rows,
/// for an output it counts batch slots. Everything behind axis 0 is one
/// sample, and [`slot`](Self::slot) / [`slot_mut`](Self::slot_mut) expose it
/// as a contiguous slice.
///
/// # Example
/// ```ignore
/// let mut top = Blob::<f32>::default();
/// top.reshape(&[32, 3, 28, 28]);
/// assert_eq!(top.count(), 32 * 3 * 28 * 28);
/// assert_eq!(top.sample_len(), 3 * 28 * 28);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blob<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T: Element> Blob<T> {
    /// Creates a blob from a shape and its row-major data.
    pub fn from_vec(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DataLayerError::InvalidConfig {
                reason: format!(
                    "shape {:?} needs {} elements but {} were given",
                    shape,
                    expected,
                    data.len()
                ),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a zero-filled blob.
    pub fn zeros(shape: &[usize]) -> Self {
        let mut blob = Self::default();
        blob.reshape(shape);
        blob
    }

    /// Changes the shape, resizing the buffer. Existing values are kept
    /// in row-major order; new elements are `T::default()`.
    pub fn reshape(&mut self, shape: &[usize]) {
        self.shape = shape.to_vec();
        let count = self.count();
        self.data.resize(count, T::default());
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Size of one axis, `None` if the blob has fewer axes.
    pub fn shape_at(&self, axis: usize) -> Option<usize> {
        self.shape.get(axis).copied()
    }

    pub fn num_axes(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements. A blob with no axes holds nothing.
    pub fn count(&self) -> usize {
        if self.shape.is_empty() {
            0
        } else {
            self.shape.iter().product()
        }
    }

    /// Number of samples along axis 0.
    pub fn num_samples(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Elements per sample: `d1 * ... * dk-1`.
    pub fn sample_len(&self) -> usize {
        match self.num_samples() {
            0 => 0,
            n => self.count() / n,
        }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The elements of sample `index`.
    ///
    /// # Panics
    /// If `index` is not below [`num_samples`](Self::num_samples).
    pub fn slot(&self, index: usize) -> &[T] {
        let len = self.sample_len();
        &self.data[index * len..(index + 1) * len]
    }

    /// Mutable view of sample `index`.
    ///
    /// # Panics
    /// If `index` is not below [`num_samples`](Self::num_samples).
    pub fn slot_mut(&mut self, index: usize) -> &mut [T] {
        let len = self.sample_len();
        &mut self.data[index * len..(index + 1) * len]
    }
}

#[cfg(feature = "tch")]
impl<T: Element + tch::kind::Element> Blob<T> {
    /// Copies the blob into a CPU `tch::Tensor` of the same shape.
    pub fn to_tensor(&self) -> tch::Tensor {
        let dims: Vec<i64> = self.shape.iter().map(|&d| d as i64).collect();
        tch::Tensor::from_slice(&self.data).reshape(&dims)
    }
}
