use thiserror::Error;

/// Result type for budget operations
pub type BudgetResult<T> = Result<T, BudgetError>;

/// Errors surfaced to callers of the budget domain.
///
/// Exchange-rate failures are absorbed by [`crate::rates::RateProvider`]
/// and never reach this type.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// The catalog backing store could not be reached or queried
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Quantity or duration outside the allowed range
    #[error("Invalid line input: {0}")]
    InvalidLineInput(String),

    /// A selection names an entry the catalog does not hold
    #[error("Resource not found: {provider} / {service_type} / {name}")]
    ResourceNotFound {
        provider: String,
        service_type: String,
        name: String,
    },

    /// PDF encoding failed
    #[error("Report rendering failed: {0}")]
    Render(String),
}

impl From<mongodb::error::Error> for BudgetError {
    fn from(err: mongodb::error::Error) -> Self {
        BudgetError::CatalogUnavailable(err.to_string())
    }
}

impl From<lopdf::Error> for BudgetError {
    fn from(err: lopdf::Error) -> Self {
        BudgetError::Render(err.to_string())
    }
}
