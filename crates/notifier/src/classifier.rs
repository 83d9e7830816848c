use chainwatch_domain::model::{
    ConfirmationPolicy, IgnoreReason, NotificationKind, NotificationState, WebhookEvent,
};

/// Decides whether a webhook delivery should produce a notification.
///
/// The empty-ping check runs first so that no other field is relied upon for
/// connectivity tests.
pub fn classify(event: &WebhookEvent, policy: ConfirmationPolicy) -> NotificationState {
    if !event.is_substantive() {
        return NotificationState::Ignored(IgnoreReason::EmptyPing);
    }

    if event.confirmed {
        return NotificationState::Notifiable(NotificationKind::Confirmed);
    }

    match policy {
        ConfirmationPolicy::ConfirmedOnly => NotificationState::Ignored(IgnoreReason::Unconfirmed),
        ConfirmationPolicy::LowLatency if event.retries == 0 => {
            NotificationState::Notifiable(NotificationKind::FirstUnconfirmed)
        }
        ConfirmationPolicy::LowLatency => NotificationState::Ignored(IgnoreReason::DuplicateRetry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_domain::model::{ContractLog, Erc20Transfer, NativeTransaction};

    const POLICIES: [ConfirmationPolicy; 2] =
        [ConfirmationPolicy::ConfirmedOnly, ConfirmationPolicy::LowLatency];

    fn with_tx(confirmed: bool, retries: u32) -> WebhookEvent {
        WebhookEvent {
            confirmed,
            retries,
            txs: vec![NativeTransaction::default()],
            ..Default::default()
        }
    }

    #[test]
    fn empty_payload_is_a_ping_under_every_policy() {
        for policy in POLICIES {
            for (confirmed, retries) in [(true, 0), (false, 0), (false, 3), (true, 7)] {
                let event = WebhookEvent {
                    confirmed,
                    retries,
                    tag: "anything".into(),
                    ..Default::default()
                };
                assert_eq!(
                    classify(&event, policy),
                    NotificationState::Ignored(IgnoreReason::EmptyPing)
                );
            }
        }
    }

    #[test]
    fn confirmed_payload_is_notifiable_under_every_policy() {
        for policy in POLICIES {
            for retries in [0, 1, 5] {
                assert_eq!(
                    classify(&with_tx(true, retries), policy),
                    NotificationState::Notifiable(NotificationKind::Confirmed)
                );
            }
        }
    }

    #[test]
    fn any_non_empty_list_counts_as_data() {
        let logs_only = WebhookEvent {
            confirmed: true,
            logs: vec![ContractLog::default()],
            ..Default::default()
        };
        let transfers_only = WebhookEvent {
            confirmed: true,
            erc20_transfers: vec![Erc20Transfer::default()],
            ..Default::default()
        };
        for event in [logs_only, transfers_only] {
            assert!(classify(&event, ConfirmationPolicy::ConfirmedOnly).is_notifiable());
        }
    }

    #[test]
    fn confirmed_only_ignores_unconfirmed() {
        assert_eq!(
            classify(&with_tx(false, 0), ConfirmationPolicy::ConfirmedOnly),
            NotificationState::Ignored(IgnoreReason::Unconfirmed)
        );
    }

    #[test]
    fn low_latency_notifies_first_sighting_only() {
        assert_eq!(
            classify(&with_tx(false, 0), ConfirmationPolicy::LowLatency),
            NotificationState::Notifiable(NotificationKind::FirstUnconfirmed)
        );
        assert_eq!(
            classify(&with_tx(false, 1), ConfirmationPolicy::LowLatency),
            NotificationState::Ignored(IgnoreReason::DuplicateRetry)
        );
    }
}
