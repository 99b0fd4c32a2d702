/// Position of the layer in the dataset: which file of the file permutation
/// is loaded and which row of the row permutation is next.
///
/// The cursor only does the arithmetic. Reloading files and reshuffling on
/// wrap are decided by the layer from the returned [`Step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    file_idx: usize,
    row_idx: usize,
}

/// What happened when the cursor moved past a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Still inside the current file
    NextRow,
    /// The current file is exhausted and the cursor is on row 0 of the same file
    RowWrap,
    /// The cursor moved to row 0 of another file position
    NextFile { wrapped: bool },
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_idx(&self) -> usize {
        self.file_idx
    }

    pub fn row_idx(&self) -> usize {
        self.row_idx
    }

    /// Moves past the current row of a file with `rows` rows, in a dataset of
    /// `num_files` files. `wrapped` is set when the file position returns to 0.
    pub fn advance(&mut self, rows: usize, num_files: usize) -> Step {
        self.row_idx += 1;
        if self.row_idx < rows {
            return Step::NextRow;
        }

        self.row_idx = 0;
        if num_files <= 1 {
            return Step::RowWrap;
        }
        self.file_idx = (self.file_idx + 1) % num_files;
        Step::NextFile {
            wrapped: self.file_idx == 0,
        }
    }
}
