//! Composition root
//!
//! [`PlayerRegistry`] mounts players into named slots. Mounting into an
//! occupied slot tears the previous player down first. Every mounted player
//! shares the registry's [`PlaybackCoordinator`](crate::player::PlaybackCoordinator),
//! so at most one of them plays at a time however playback is started.

use crate::modules::Services;
use crate::player::{PlayerConfig, PlayerController, PlayerControllerBuilder, PlayerEvent};
use crate::player::controller::DEFAULT_NAMESPACE;
use crate::storage::PreferenceArea;
use crate::utils::error::{PlayerError, Result};
use log::{debug, info, warn};
use std::sync::Arc;

pub struct PlayerRegistry {
    services: Services,
    storage: Arc<PreferenceArea>,
    namespace: String,
    is_touch: bool,

    /// Mounted players in mount order
    slots: Vec<(String, PlayerController)>,
}

impl PlayerRegistry {
    pub fn new(services: Services, storage: Arc<PreferenceArea>) -> Self {
        Self {
            services,
            storage,
            namespace: DEFAULT_NAMESPACE.to_string(),
            is_touch: false,
            slots: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn touch_device(mut self, is_touch: bool) -> Self {
        self.is_touch = is_touch;
        self
    }

    pub fn storage(&self) -> &Arc<PreferenceArea> {
        &self.storage
    }

    /// Mount a player for video `id` into `slot`.
    ///
    /// A previous player in the slot is destroyed and every other playing
    /// player is paused before the new one becomes ready.
    pub fn mount(&mut self, slot: &str, id: &str, config: PlayerConfig) -> &mut PlayerController {
        if let Some(index) = self.position(slot) {
            let (_, mut previous) = self.slots.remove(index);
            info!("Replacing player {} in slot {}", previous.id(), slot);
            previous.destroy();
        }

        self.pause_all_except(None);

        let player = PlayerControllerBuilder::new()
            .with_config(config)
            .with_services(self.services.clone())
            .with_storage(self.storage.clone())
            .with_namespace(self.namespace.clone())
            .touch_device(self.is_touch)
            .build(id);

        self.slots.push((slot.to_string(), player));
        let last = self.slots.len() - 1;
        &mut self.slots[last].1
    }

    pub fn get(&self, slot: &str) -> Option<&PlayerController> {
        self.slots.iter().find(|(s, _)| s == slot).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, slot: &str) -> Option<&mut PlayerController> {
        self.slots.iter_mut().find(|(s, _)| s == slot).map(|(_, p)| p)
    }

    /// Start the player in `slot`. The others are paused first and their
    /// pause events delivered before this returns.
    pub fn play(&mut self, slot: &str) -> Result<()> {
        let index = self.position(slot).ok_or_else(|| not_mounted(slot))?;
        self.pause_all_except(Some(index));
        self.slots[index].1.play()
    }

    pub fn pause(&mut self, slot: &str) -> Result<()> {
        let player = self.get_mut(slot).ok_or_else(|| not_mounted(slot))?;
        player.pause()
    }

    /// Pump every player. Returns the delivered events per slot.
    pub fn pump(&mut self) -> Vec<(String, PlayerEvent)> {
        self.collect(|player| player.pump())
    }

    /// Tick every player
    pub fn tick(&mut self) -> Vec<(String, PlayerEvent)> {
        self.collect(|player| player.tick())
    }

    /// Destroy the player in `slot`
    pub fn unmount(&mut self, slot: &str) -> bool {
        match self.position(slot) {
            Some(index) => {
                let (_, mut player) = self.slots.remove(index);
                player.destroy();
                true
            }
            None => false,
        }
    }

    /// Unload every player, awaiting their final save-state
    pub async fn unload_all(&mut self) {
        for (slot, mut player) in self.slots.drain(..) {
            debug!("Unloading slot {}", slot);
            player.unload().await;
        }
    }

    /// Slot of the player currently playing
    pub fn active_slot(&self) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, p)| p.is_playing())
            .map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn position(&self, slot: &str) -> Option<usize> {
        self.slots.iter().position(|(s, _)| s == slot)
    }

    fn pause_all_except(&mut self, keep: Option<usize>) {
        for (index, (slot, player)) in self.slots.iter_mut().enumerate() {
            if Some(index) == keep || !player.is_playing() {
                continue;
            }
            debug!("Pausing player in slot {}", slot);
            if let Err(e) = player.pause() {
                warn!("Could not pause slot {}: {}", slot, e);
            }
        }
    }

    fn collect(
        &mut self,
        mut step: impl FnMut(&mut PlayerController) -> Vec<PlayerEvent>,
    ) -> Vec<(String, PlayerEvent)> {
        self.slots
            .iter_mut()
            .flat_map(|(slot, player)| step(player).into_iter().map(move |e| (slot.clone(), e)))
            .collect()
    }
}

impl std::fmt::Debug for PlayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRegistry")
            .field("slots", &self.slots.iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

fn not_mounted(slot: &str) -> PlayerError {
    PlayerError::NotFound(format!("No player mounted in slot {}", slot))
}
