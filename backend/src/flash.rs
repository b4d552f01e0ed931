use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{error::AppError, session::SessionManager};

/// FlashCategory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashCategory {
    Success,
    Error,
    GenericError,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashCategory::Success => "success",
            FlashCategory::Error => "error",
            FlashCategory::GenericError => "generic_error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(FlashCategory::Success),
            "error" => Some(FlashCategory::Error),
            "generic_error" => Some(FlashCategory::GenericError),
            _ => None,
        }
    }
}

/// FlashMessages
///
/// Everything drained from a session in one go, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FlashMessages {
    pub success: Vec<String>,
    pub error: Vec<String>,
    pub generic_error: Vec<String>,
}

impl FlashMessages {
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.error.is_empty() && self.generic_error.is_empty()
    }

    pub fn len(&self) -> usize {
        self.success.len() + self.error.len() + self.generic_error.len()
    }
}

impl FromIterator<(FlashCategory, String)> for FlashMessages {
    fn from_iter<I: IntoIterator<Item = (FlashCategory, String)>>(iter: I) -> Self {
        let mut out = FlashMessages::default();
        for (category, message) in iter {
            match category {
                FlashCategory::Success => out.success.push(message),
                FlashCategory::Error => out.error.push(message),
                FlashCategory::GenericError => out.generic_error.push(message),
            }
        }
        out
    }
}

// Delivery is at-most-once: a queue whose session expires or is replaced
// before the next render is simply lost.
impl SessionManager {
    /// push: appends to the session's queue under `category`.
    pub async fn push_flash(
        &self,
        token: &str,
        category: FlashCategory,
        message: &str,
    ) -> Result<(), AppError> {
        self.store().push_flash(token, category, message).await
    }

    /// drainAll: returns every queued message and clears the queue.
    pub async fn drain_flash(&self, token: &str) -> Result<FlashMessages, AppError> {
        let drained = self.store().take_flash(token).await?;
        Ok(drained.into_iter().collect())
    }
}
