// Notification preferences (Telegram + SMTP) and test delivery.

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{MessageResponse, NotificationSettings};

impl ApiClient {
    /// `GET /api/notifications/settings`
    pub async fn notification_settings(&self) -> Result<NotificationSettings, Error> {
        self.get("api/notifications/settings").await
    }

    /// `POST /api/notifications/settings`. Replaces the whole object.
    pub async fn update_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> Result<MessageResponse, Error> {
        self.post("api/notifications/settings", settings).await
    }

    /// `POST /api/notifications/test`: send a test message on every
    /// enabled channel.
    pub async fn test_notifications(&self) -> Result<MessageResponse, Error> {
        self.post_empty("api/notifications/test").await
    }
}
