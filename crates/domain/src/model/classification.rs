use strum_macros::{AsRefStr, Display, EnumString};

/// Which webhook deliveries are allowed to trigger a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfirmationPolicy {
    /// Notify once the provider reports the block as final.
    #[default]
    ConfirmedOnly,
    /// Notify on the first unconfirmed sighting and again on confirmation.
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IgnoreReason {
    /// Connectivity test: the payload carries no entries at all.
    EmptyPing,
    Unconfirmed,
    /// Redelivery of an unconfirmed payload that was already handled.
    DuplicateRetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    FirstUnconfirmed,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Ignored(IgnoreReason),
    Notifiable(NotificationKind),
}

impl NotificationState {
    pub fn is_notifiable(&self) -> bool {
        matches!(self, Self::Notifiable(_))
    }
}
