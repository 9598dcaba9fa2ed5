use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A stored single-character code has no matching enum variant.
    #[error("Unknown code '{code}' for {field}")]
    UnknownCode { field: &'static str, code: char },
}
