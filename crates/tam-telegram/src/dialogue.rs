//! Per-user conversation state for multi-step flows.

use std::collections::HashMap;

use tokio::sync::Mutex;

use tam_core::{domain::UserId, export::ExportFormat};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingPhone,
    /// Number classified; waiting for the user to confirm it.
    AwaitingPhoneConfirm {
        phone: String,
    },
    AwaitingProxy,
    AwaitingExportCount {
        format: ExportFormat,
        manifest: bool,
    },
    AwaitingWhitelistAdd,
    AwaitingWhitelistRemove,
}

impl DialogueState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueState::Idle)
    }
}

#[derive(Default)]
pub struct Dialogues {
    inner: Mutex<HashMap<UserId, DialogueState>>,
}

impl Dialogues {
    pub async fn get(&self, user_id: UserId) -> DialogueState {
        self.inner
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set(&self, user_id: UserId, state: DialogueState) {
        let mut map = self.inner.lock().await;
        if state.is_idle() {
            map.remove(&user_id);
        } else {
            map.insert(user_id, state);
        }
    }

    /// Reset to idle and return whatever state was active.
    pub async fn take(&self, user_id: UserId) -> DialogueState {
        self.inner
            .lock()
            .await
            .remove(&user_id)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn states_are_per_user() {
        let d = Dialogues::default();
        d.set(UserId(1), DialogueState::AwaitingPhone).await;
        assert_eq!(d.get(UserId(1)).await, DialogueState::AwaitingPhone);
        assert_eq!(d.get(UserId(2)).await, DialogueState::Idle);
    }

    #[tokio::test]
    async fn take_resets_to_idle() {
        let d = Dialogues::default();
        d.set(
            UserId(1),
            DialogueState::AwaitingExportCount {
                format: ExportFormat::Pyrogram,
                manifest: true,
            },
        )
        .await;
        let prev = d.take(UserId(1)).await;
        assert!(matches!(prev, DialogueState::AwaitingExportCount { .. }));
        assert!(d.get(UserId(1)).await.is_idle());
        assert!(d.take(UserId(1)).await.is_idle());
    }
}
