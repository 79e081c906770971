use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinStatError {
    /// The table text contained no delimiter-separated rows at all.
    #[error("no delimiter-separated rows found in table text")]
    NoTabularRows,

    /// A value handed to the public amount parser is not a recognizable number.
    #[error("not a recognizable amount: {0:?}")]
    InvalidNumber(String),

    /// Consolidation was invoked without any source statements.
    #[error("consolidation requires at least one source statement")]
    MissingSource,
}

pub type Result<T> = std::result::Result<T, FinStatError>;
