use std::error::Error;
use std::fmt;

use crate::infrastructure::persistence::error::DbError;

/// Error type for accumulation runs
#[derive(Debug)]
pub enum AccumulateError {
    /// Error from the database layer
    Db(DbError),
    /// A pass exceeded its transaction deadline
    Timeout(String),
    /// Processing error
    Processing(String),
}

impl fmt::Display for AccumulateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccumulateError::Db(e) => write!(f, "Database error: {}", e),
            AccumulateError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            AccumulateError::Processing(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl Error for AccumulateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AccumulateError::Db(e) => Some(e),
            AccumulateError::Timeout(_) => None,
            AccumulateError::Processing(_) => None,
        }
    }
}

impl From<DbError> for AccumulateError {
    fn from(error: DbError) -> Self {
        AccumulateError::Db(error)
    }
}

impl From<sea_orm::DbErr> for AccumulateError {
    fn from(error: sea_orm::DbErr) -> Self {
        AccumulateError::Db(DbError::from(error))
    }
}
