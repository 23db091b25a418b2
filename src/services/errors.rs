use crate::domain::order::{OrderCommandError, OrderError};
use crate::event_sourcing::StoreError;
use super::photo_storage::StorageError;

// ============================================================================
// Service Errors - what callers of the order services can observe
// ============================================================================
//
// Every lower-level failure (domain rule, store, photo storage) collapses
// into one of these kinds. The HTTP layer maps kinds to status codes.
//
// ============================================================================

/// Malformed input, rejected before any store call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid order number: {0}")]
    InvalidOrderNumber(String),

    #[error("photo payload is empty")]
    MissingPhoto,

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("photo is {size} bytes, limit is {max}")]
    PhotoTooLarge { size: usize, max: usize },

    #[error("idempotency key is required")]
    MissingIdempotencyKey,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Temporary backend failure or timeout; the caller may try again
    #[error("temporarily unavailable: {0}")]
    Transient(String),

    /// Lost an optimistic-concurrency race or hit an order-state policy
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Validation(_) => "validation",
            ServiceError::Transient(_) => "transient",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// Customer-facing message (pt-BR)
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::NotFound(_) => {
                "Pedido não encontrado. Verifique o e-mail e o número do pedido.".to_string()
            }
            ServiceError::Validation(e) => match e {
                ValidationError::InvalidEmail(_) => "Informe um e-mail válido.".to_string(),
                ValidationError::InvalidOrderNumber(_) => "Número do pedido inválido.".to_string(),
                ValidationError::MissingPhoto => "Selecione uma foto para enviar.".to_string(),
                ValidationError::UnsupportedContentType(_) => {
                    "Formato não suportado. Envie um arquivo de imagem.".to_string()
                }
                ValidationError::PhotoTooLarge { max, .. } => {
                    format!("A foto deve ter no máximo {}.", format_size(*max))
                }
                ValidationError::MissingIdempotencyKey => {
                    "Requisição sem chave de idempotência.".to_string()
                }
            },
            ServiceError::Transient(_) => {
                "Serviço temporariamente indisponível. Tente novamente em instantes.".to_string()
            }
            ServiceError::Conflict(_) => {
                "Este pedido já possui uma foto ou foi alterado ao mesmo tempo. Atualize e tente novamente."
                    .to_string()
            }
            ServiceError::Internal(_) => "Não foi possível salvar a foto.".to_string(),
        }
    }
}

/// Size limit as shown to users, rounded down so it never overstates the limit
fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;

    let (unit, name) = if bytes >= MB {
        (MB, "MB")
    } else if bytes >= KB {
        (KB, "KB")
    } else {
        return format!("{} bytes", bytes);
    };

    let tenths = bytes * 10 / unit;
    if tenths % 10 == 0 {
        format!("{}{}", tenths / 10, name)
    } else {
        format!("{},{}{}", tenths / 10, tenths % 10, name)
    }
}

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyEmail => ValidationError::InvalidEmail(String::new()).into(),
            OrderError::InvalidEmail(raw) => ValidationError::InvalidEmail(raw).into(),
            OrderError::EmptyOrderNumber => ValidationError::InvalidOrderNumber(String::new()).into(),
            OrderError::InvalidOrderNumber(raw) => ValidationError::InvalidOrderNumber(raw).into(),
            OrderError::EmptyIdempotencyKey => ValidationError::MissingIdempotencyKey.into(),
            e @ (OrderError::AlreadyPlaced(_) | OrderError::AlreadyReady(_)) => {
                ServiceError::Conflict(e.to_string())
            }
            e @ (OrderError::NotInitialized | OrderError::EmptyHistory(_)) => {
                ServiceError::Internal(e.to_string())
            }
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            e @ StoreError::Conflict { .. } => ServiceError::Conflict(e.to_string()),
            e @ StoreError::Unavailable(_) => ServiceError::Transient(e.to_string()),
            e => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<OrderCommandError> for ServiceError {
    fn from(err: OrderCommandError) -> Self {
        match err {
            OrderCommandError::NotFound(number) => {
                ServiceError::NotFound(format!("order {}", number))
            }
            OrderCommandError::Rejected(e) => e.into(),
            OrderCommandError::Store(e) => e.into(),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            e @ StorageError::Unavailable(_) => ServiceError::Transient(e.to_string()),
            e @ StorageError::InvalidKey(_) => ServiceError::Internal(e.to_string()),
        }
    }
}
