use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("item id must not be empty")]
    EmptyItemId,
    #[error("pattern key must not be empty")]
    EmptyPatternKey,
    #[error("catalog is empty")]
    EmptyCatalog,
    #[error("invoice has no lines")]
    EmptyInvoice,
    #[error("duplicate catalog item id: {0}")]
    DuplicateItemId(String),
    #[error("catalog item {id} has an empty name")]
    EmptyItemName { id: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
