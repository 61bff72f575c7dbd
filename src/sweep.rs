// src/sweep.rs

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::state::SharedStore;

/// Periodically clears expired OTPs, verification codes and reset tokens.
///
/// Cleanup only: verification always checks the stored expiry timestamp, so a
/// late or failed sweep never lets an expired code through.
pub fn spawn_expiry_sweep(store: SharedStore, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.clear_expired_codes(Utc::now()).await {
                Ok(0) => {}
                Ok(cleared) => tracing::info!("Expiry sweep cleared codes for {} users", cleared),
                Err(e) => tracing::warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::NewUser,
        store::{MemoryStore, RecordStore},
    };
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    #[tokio::test]
    async fn sweep_clears_expired_otp_in_background() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut user = store
            .insert_user(NewUser {
                name: "S".into(),
                email: "s@example.com".into(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        user.otp = Some("999999".into());
        user.otp_expires_at = Some(Utc::now() - ChronoDuration::seconds(1));
        store.save_user(&user).await.unwrap();

        let handle = spawn_expiry_sweep(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let stored = store.find_user_by_email("s@example.com").await.unwrap().unwrap();
        assert_eq!(stored.otp, None);
        assert_eq!(stored.otp_expires_at, None);
    }
}
