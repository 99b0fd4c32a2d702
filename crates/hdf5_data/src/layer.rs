use crate::assembler::BatchAssembler;
use crate::blob::{Blob, Element};
use crate::config::HdfDataConfig;
use crate::cursor::{Cursor, Step};
use crate::error::{DataLayerError, Result};
use crate::loader::{DatasetLoader, FileBundle};
use crate::manifest::Manifest;
use crate::permutation::Permutation;
use crate::transforms::{DataTransformer, ImageTransformer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Type name under which the layer is known to a network definition.
pub const LAYER_TYPE: &str = "HDF5Data";

/// State that exists between `setup` and `teardown`.
#[derive(Debug)]
struct LayerState<T> {
    manifest: Manifest,
    bundle: FileBundle<T>,
    file_perm: Permutation,
    row_perm: Permutation,
    cursor: Cursor,
}

/// A data source layer that streams fixed-size batches out of a list of
/// data files.
///
/// At setup the layer reads the manifest, loads the first file (in file
/// permutation order) and shapes one output per declared dataset as
/// `(batch_size, d1, ..)`. Every `forward` then fills all outputs with the
/// next `batch_size` rows, moving to the next file when the current one is
/// exhausted and wrapping around forever. With `shuffle` set, file order is
/// reshuffled on every full pass and row order on every file (re)visit.
///
/// Only one file is held in memory at a time.
///
/// # Example
/// ```ignore
/// let config = HdfDataConfig::builder()
///     .source("train_files.txt")
///     .batch_size(64)
///     .top("data")
///     .top("label")
///     .shuffle(true)
///     .seed(7)
///     .build()?;
///
/// let mut layer = HdfDataLayer::<f32>::new(config)?;
/// let mut tops = vec![Blob::default(), Blob::default()];
/// layer.setup(&mut tops)?;
/// for _ in 0..iterations {
///     layer.forward(&mut tops)?;
///     train_step(&tops[0], &tops[1])?;
/// }
/// ```
pub struct HdfDataLayer<T: Element> {
    config: HdfDataConfig,
    loader: DatasetLoader,
    assembler: BatchAssembler<T>,
    rng: StdRng,
    seed: u64,
    state: Option<LayerState<T>>,
}

impl<T: Element> HdfDataLayer<T> {
    /// Creates a layer from a configuration record. When `image` is set and
    /// a `transform_param` is present, output 0 goes through an
    /// [`ImageTransformer`].
    pub fn new(config: HdfDataConfig) -> Result<Self> {
        config.validate()?;

        let assembler = match (&config.transform_param, config.image) {
            (Some(param), true) => {
                let transformer = ImageTransformer::new(param.clone(), config.phase)
                    .map_err(DataLayerError::Transform)?;
                BatchAssembler::with_transformer(Box::new(transformer))
            }
            (Some(_), false) => {
                warn!("transform_param is ignored because image is not set");
                BatchAssembler::new()
            }
            (None, _) => BatchAssembler::new(),
        };

        Ok(Self::from_parts(config, assembler))
    }

    /// Creates an image layer whose output 0 goes through `transformer`
    /// instead of the stock [`ImageTransformer`].
    pub fn with_transformer(
        config: HdfDataConfig,
        transformer: Box<dyn DataTransformer<T>>,
    ) -> Result<Self> {
        config.validate()?;
        if !config.image {
            return Err(DataLayerError::InvalidConfig {
                reason: "a custom transformer requires image = true".to_string(),
            });
        }
        Ok(Self::from_parts(
            config,
            BatchAssembler::with_transformer(transformer),
        ))
    }

    fn from_parts(config: HdfDataConfig, assembler: BatchAssembler<T>) -> Self {
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self {
            loader: DatasetLoader::new(config.tops.clone()),
            assembler,
            rng: StdRng::seed_from_u64(seed),
            seed,
            state: None,
            config,
        }
    }

    /// Reads the manifest, loads the first file and shapes `tops`, one per
    /// declared dataset. Calling it again restarts from the beginning.
    pub fn setup(&mut self, tops: &mut [Blob<T>]) -> Result<()> {
        self.try_setup(tops)
            .inspect_err(|e| error!("HDF5 data layer setup failed: {}", e))
    }

    fn try_setup(&mut self, tops: &mut [Blob<T>]) -> Result<()> {
        check_output_count(&self.config, tops.len())?;
        self.state = None;
        self.rng = StdRng::seed_from_u64(self.seed);
        self.assembler.reseed(self.seed.wrapping_add(1));

        let manifest = Manifest::read(&self.config.source)?;
        let mut file_perm = Permutation::identity(manifest.len());
        if self.config.shuffle {
            file_perm.reshuffle(&mut self.rng);
        }

        let bundle = load_file(&self.loader, &manifest, &file_perm, 0)?;
        let row_perm = row_permutation(bundle.rows(), self.config.shuffle, &mut self.rng);

        for (index, top) in tops.iter_mut().enumerate() {
            let shape = self
                .assembler
                .output_shape(&bundle, index, self.config.batch_size)?;
            info!("Output {} ({}) shape: {:?}", index, self.config.tops[index], shape);
            top.reshape(&shape);
        }

        self.state = Some(LayerState {
            manifest,
            bundle,
            file_perm,
            row_perm,
            cursor: Cursor::new(),
        });
        Ok(())
    }

    /// Fills every output with the next `batch_size` rows.
    ///
    /// Slot `i` of every output holds the same source row. A new file is
    /// loaded eagerly as soon as the current one is exhausted.
    ///
    /// Output count and shapes are checked before anything moves. Any error
    /// after that (a file that fails to load, a transform failure) leaves
    /// the cursor and the loaded file out of step, so the layer drops its
    /// state and every later call returns [`DataLayerError::NotSetUp`] until
    /// `setup` runs again.
    pub fn forward(&mut self, tops: &mut [Blob<T>]) -> Result<()> {
        self.try_forward(tops)
            .inspect_err(|e| error!("HDF5 data layer forward failed: {}", e))
    }

    fn try_forward(&mut self, tops: &mut [Blob<T>]) -> Result<()> {
        let state = self.state.as_ref().ok_or(DataLayerError::NotSetUp)?;
        check_output_count(&self.config, tops.len())?;
        check_batch_dim(&self.config, tops)?;
        check_sample_len(&self.config, &self.assembler, &state.bundle, tops)?;

        if let Err(e) = self.fill_batch(tops) {
            warn!("Dropping HDF5 data layer state; setup must run again");
            self.state = None;
            return Err(e);
        }
        Ok(())
    }

    fn fill_batch(&mut self, tops: &mut [Blob<T>]) -> Result<()> {
        let Self {
            config,
            loader,
            assembler,
            rng,
            state,
            ..
        } = self;
        let state = state.as_mut().ok_or(DataLayerError::NotSetUp)?;

        for slot in 0..config.batch_size {
            let row = state.row_perm.get(state.cursor.row_idx());
            assembler.fill_slot(&state.bundle, row, tops, slot)?;

            match state
                .cursor
                .advance(state.bundle.rows(), state.manifest.len())
            {
                Step::NextRow => {}
                Step::RowWrap => {
                    if config.shuffle {
                        state.row_perm.reshuffle(rng);
                    }
                }
                Step::NextFile { wrapped } => {
                    if wrapped {
                        if config.shuffle {
                            state.file_perm.reshuffle(rng);
                        }
                        debug!("Looping around to first file");
                    }
                    state.bundle = load_file(
                        loader,
                        &state.manifest,
                        &state.file_perm,
                        state.cursor.file_idx(),
                    )?;
                    state.row_perm = row_permutation(state.bundle.rows(), config.shuffle, rng);
                }
            }
        }
        Ok(())
    }

    /// Drops the loaded file and all iteration state.
    pub fn teardown(&mut self) {
        self.state = None;
    }

    pub fn layer_type(&self) -> &'static str {
        LAYER_TYPE
    }

    pub fn config(&self) -> &HdfDataConfig {
        &self.config
    }

    /// Seed of the shuffling RNG, drawn at random when the config has none.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_set_up(&self) -> bool {
        self.state.is_some()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.state.as_ref().map(|s| s.cursor)
    }

    pub fn num_files(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.manifest.len())
    }

    /// Path of the file currently held in memory.
    pub fn current_file(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.bundle.path())
    }

    pub fn bundle(&self) -> Option<&FileBundle<T>> {
        self.state.as_ref().map(|s| &s.bundle)
    }

    pub fn file_permutation(&self) -> Option<&[usize]> {
        self.state.as_ref().map(|s| s.file_perm.as_slice())
    }

    pub fn row_permutation(&self) -> Option<&[usize]> {
        self.state.as_ref().map(|s| s.row_perm.as_slice())
    }
}

fn check_output_count(config: &HdfDataConfig, actual: usize) -> Result<()> {
    if actual != config.tops.len() {
        return Err(DataLayerError::OutputCountMismatch {
            expected: config.tops.len(),
            actual,
        });
    }
    Ok(())
}

/// Every output needs one slot per batch sample along axis 0.
fn check_batch_dim<T: Element>(config: &HdfDataConfig, tops: &[Blob<T>]) -> Result<()> {
    for (name, top) in config.tops.iter().zip(tops) {
        if top.num_samples() != config.batch_size {
            return Err(DataLayerError::ShapeMismatch {
                name: name.clone(),
                expected: config.batch_size,
                actual: top.num_samples(),
            });
        }
    }
    Ok(())
}

/// Every output sample must have the width the current file produces for it.
fn check_sample_len<T: Element>(
    config: &HdfDataConfig,
    assembler: &BatchAssembler<T>,
    bundle: &FileBundle<T>,
    tops: &[Blob<T>],
) -> Result<()> {
    for (index, (name, top)) in config.tops.iter().zip(tops).enumerate() {
        let shape = assembler.output_shape(bundle, index, config.batch_size)?;
        let expected: usize = shape[1..].iter().product();
        if top.sample_len() != expected {
            return Err(DataLayerError::ShapeMismatch {
                name: name.clone(),
                expected,
                actual: top.sample_len(),
            });
        }
    }
    Ok(())
}

/// Loads the file at `position` of the file permutation.
fn load_file<T: Element>(
    loader: &DatasetLoader,
    manifest: &Manifest,
    file_perm: &Permutation,
    position: usize,
) -> Result<FileBundle<T>> {
    let path = manifest
        .get(file_perm.get(position))
        .ok_or_else(|| DataLayerError::ManifestEmpty {
            path: manifest.source().to_path_buf(),
        })?;
    loader.load(path)
}

fn row_permutation(rows: usize, shuffle: bool, rng: &mut StdRng) -> Permutation {
    let mut perm = Permutation::identity(rows);
    if shuffle {
        perm.reshuffle(rng);
        debug!("Shuffled {} rows", rows);
    }
    perm
}
