use crate::{EventType, Serial};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NeoError {
    #[error("RUST-NEO - {0}")]
    Api(EventType),
    #[error("RUST-NEO - device {1}: {0}")]
    Device(EventType, Serial),
    #[error("RUST-NEO - buffer of {provided} bytes is insufficient, {required} bytes required")]
    BufferInsufficient { provided: usize, required: usize },
    #[error("RUST-NEO - configuration error: {0}")]
    Config(String),
}

impl NeoError {
    #[inline]
    pub fn device(kind: EventType, serial: Serial) -> Self {
        Self::Device(kind, serial)
    }

    #[inline]
    pub fn config_error<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// The event code this error is reported under.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Api(kind) |
            Self::Device(kind, _) => *kind,
            Self::BufferInsufficient { .. } => EventType::BufferInsufficient,
            Self::Config(_) => EventType::ParameterOutOfRange,
        }
    }

    /// The device this error belongs to, `None` for API level errors.
    pub fn serial(&self) -> Option<Serial> {
        match self {
            Self::Device(_, serial) => Some(*serial),
            _ => None,
        }
    }
}

impl From<EventType> for NeoError {
    #[inline]
    fn from(kind: EventType) -> Self {
        Self::Api(kind)
    }
}

pub type NeoResult<T> = Result<T, NeoError>;
