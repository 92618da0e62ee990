use thiserror::Error;

use crate::model::CardError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    CardValidation(#[from] CardError),
}
