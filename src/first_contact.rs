//! First-contact initialization
//!
//! Launched once per entity per connection. Waits for the entity's
//! equipment to become ready, registers it in the ledger and, on its very
//! first contact, strips it and dresses it in the starter outfit.

use crate::service::GuardState;
use skinguard_host::{Color, EntityHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Poll step while waiting for equipment
pub const READINESS_POLL: Duration = Duration::from_millis(250);

/// Give up on an entity whose equipment is not ready after this long
pub const READINESS_TIMEOUT: Duration = Duration::from_secs(6);

/// Pause between stripping and dressing
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// How a first-contact initialization ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Registered for the first time; first-join handling ran
    FirstContact,
    /// Already in the ledger
    Returning,
    /// Equipment never became ready
    TimedOut,
    /// Entity left before initialization finished
    Disconnected,
    /// Service is shutting down
    Cancelled,
    /// Already initializing or initialized for this connection
    AlreadyInitialized,
}

impl InitOutcome {
    /// Whether the connection counts as initialized
    pub fn is_success(&self) -> bool {
        matches!(self, InitOutcome::FirstContact | InitOutcome::Returning)
    }
}

impl GuardState {
    /// Run initialization for an entity whose launch was already claimed
    pub(crate) async fn first_contact(
        self: Arc<Self>,
        entity: Arc<dyn EntityHandle>,
    ) -> InitOutcome {
        let outcome = self.initialize(entity.as_ref()).await;
        self.lifecycle
            .finish_init(entity.id(), outcome.is_success())
            .await;
        debug!("Initialization of {} finished: {:?}", entity.display_name(), outcome);
        outcome
    }

    async fn initialize(&self, entity: &dyn EntityHandle) -> InitOutcome {
        if let Err(outcome) = self.wait_until_ready(entity).await {
            return outcome;
        }
        if self.shutdown.is_cancelled() {
            return InitOutcome::Cancelled;
        }

        let bypassed = self.is_bypassed(entity).await;
        if self.shutdown.is_cancelled() {
            return InitOutcome::Cancelled;
        }
        if !bypassed {
            self.apply_visual_toggles(entity).await;
        }

        if self.shutdown.is_cancelled() {
            return InitOutcome::Cancelled;
        }
        if !self.ledger.mark_first_contact(entity.id()).await {
            info!("Returning entity connected: {}", entity.display_name());
            return InitOutcome::Returning;
        }

        info!("First contact detected: {}", entity.display_name());
        if bypassed {
            debug!("{} holds the bypass permission, outfit left alone", entity.display_name());
        } else {
            self.handle_first_join(entity).await;
        }
        InitOutcome::FirstContact
    }

    /// Poll until the equipment subsystem is ready
    async fn wait_until_ready(&self, entity: &dyn EntityHandle) -> Result<(), InitOutcome> {
        let deadline = Instant::now() + READINESS_TIMEOUT;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(InitOutcome::Cancelled);
            }
            if !self.host.is_online(entity.id()).await {
                return Err(InitOutcome::Disconnected);
            }
            if self.equipment_of(entity).await.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    "Equipment not available for {} after {:?}, initialization skipped",
                    entity.display_name(),
                    READINESS_TIMEOUT
                );
                return Err(InitOutcome::TimedOut);
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(InitOutcome::Cancelled),
                _ = tokio::time::sleep(READINESS_POLL) => {}
            }
        }
    }

    /// Strip and dress a first-time entity
    ///
    /// Shutdown may stop this before the strip. Once the strip has been
    /// issued the entity is always dressed again, so it never stays naked.
    async fn handle_first_join(&self, entity: &dyn EntityHandle) {
        let template = &self.config.starter_outfit;
        let usable = template.has_any_item() && self.has_any_valid_template_item().await;

        if self.config.remove_wearables_on_first_join && !usable {
            warn!(
                "Starter outfit empty or invalid, stripping skipped to avoid leaving players naked"
            );
        }
        let strip = self.config.remove_wearables_on_first_join && usable;

        if self.shutdown.is_cancelled() {
            return;
        }
        if strip {
            self.strip_all(entity).await;
            tokio::time::sleep(SETTLE_DELAY).await;
        }

        if !self.host.is_online(entity.id()).await {
            return;
        }
        if self.equipment_of(entity).await.is_none() {
            return;
        }

        if usable && (strip || !self.shutdown.is_cancelled()) {
            self.ensure_template_if_naked(entity).await;
        }

        let message = &self.config.first_join_message;
        if !message.trim().is_empty() && !self.shutdown.is_cancelled() {
            if let Err(e) = self.host.notify(entity.id(), message, Color::YELLOW).await {
                debug!("Welcome message to {} failed: {}", entity.id(), e);
            }
        }
    }
}
