use shared::error::ClientError;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerLevel {
    Success,
    Error,
    Info,
}

impl BannerLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            BannerLevel::Success => "✓",
            BannerLevel::Error => "✕",
            BannerLevel::Info => "ℹ",
        }
    }
}

/// Dismissible message shown above a list. Stays until dismissed by id.
#[derive(Clone, Debug, PartialEq)]
pub struct Banner {
    pub id: Uuid,
    pub message: String,
    pub level: BannerLevel,
}

impl Banner {
    pub fn new(message: impl Into<String>, level: BannerLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            level,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, BannerLevel::Error)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, BannerLevel::Success)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, BannerLevel::Info)
    }

    pub fn is_error(&self) -> bool {
        self.level == BannerLevel::Error
    }
}

impl From<&ClientError> for Banner {
    fn from(error: &ClientError) -> Self {
        Banner::error(error.user_message())
    }
}
