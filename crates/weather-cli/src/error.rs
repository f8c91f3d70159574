use crate::model::ValidationError;
use crate::providers::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    User,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

pub const ERROR_CODE_USER_INVALID_INPUT: &str = "user.invalid_input";
pub const ERROR_CODE_USER_OUTPUT_MODE_CONFLICT: &str = "user.output_mode_conflict";
pub const ERROR_CODE_RUNTIME_NETWORK: &str = "runtime.network_failed";
pub const ERROR_CODE_RUNTIME_DECODE: &str = "runtime.decode_failed";
pub const ERROR_CODE_RUNTIME_PROVIDER_INIT: &str = "runtime.provider_init_failed";
pub const ERROR_CODE_RUNTIME_IO: &str = "runtime.io_failed";
pub const ERROR_CODE_RUNTIME_SERIALIZE: &str = "runtime.serialize_failed";

impl AppError {
    pub fn user(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::User,
            code,
            message: message.into(),
        }
    }

    pub fn runtime(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Runtime,
            code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::User => 2,
            ErrorKind::Runtime => 1,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            ErrorKind::User => "user",
            ErrorKind::Runtime => "runtime",
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::user(ERROR_CODE_USER_INVALID_INPUT, value.to_string())
    }
}

impl From<ProviderError> for AppError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::InvalidCoordinates(error) => error.into(),
            ProviderError::Network(_) => {
                Self::runtime(ERROR_CODE_RUNTIME_NETWORK, value.to_string())
            }
            ProviderError::Decode(_) => Self::runtime(ERROR_CODE_RUNTIME_DECODE, value.to_string()),
        }
    }
}
