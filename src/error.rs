use thiserror::Error;

/// Errors surfaced at the boundaries of the mixture-density routines.
///
/// Shape errors are raised before any numeric work happens; a parameter or
/// target buffer that does not match the `[means | scales | logits]` layout
/// never reaches a distribution constructor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MdnError {
    /// Parameter vector length does not match `2 * num_mixes * output_dim + num_mixes`.
    #[error("parameter vector has {got} entries, expected {expected}")]
    ParamLength { expected: usize, got: usize },

    /// Target vector length does not match `output_dim`.
    #[error("target vector has {got} entries, expected {expected}")]
    TargetLength { expected: usize, got: usize },

    /// A flat buffer cannot be reshaped into rows of the expected length.
    #[error("buffer of {len} entries does not divide into rows of {row_len}")]
    RaggedBatch { len: usize, row_len: usize },

    /// Prediction and target batches disagree on the number of rows.
    #[error("prediction batch has {pred_rows} rows, target batch has {true_rows}")]
    RowCount { pred_rows: usize, true_rows: usize },

    /// Temperature must be strictly positive.
    #[error("temperature must be > 0, got {value}")]
    InvalidTemperature { value: f32 },

    /// A non-positive scale reached a density constructor. The scale
    /// activation upstream guarantees this cannot happen for activated
    /// parameters, so this indicates a raw vector was fed in directly.
    #[error("scale must be > 0, got {value}")]
    InvalidScale { value: f32 },
}

pub type Result<T> = std::result::Result<T, MdnError>;
