//! Runtime mode switching.
//!
//! Each mode has an activation binding. A mode is selected on the cycle its
//! binding becomes fully held; holding it does not re-trigger. Game modes are
//! checked before keyboard modes, each in config order, and the first match
//! wins.

use config_proto::{binding_mask, ButtonMask, Config, MAX_GAME_MODES, MAX_KEYBOARD_MODES};
use heapless::Vec;

use crate::backend::{BackendSet, CommunicationBackend};
use crate::mode::ControllerMode;

/// Which profile drives the outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeState {
    /// No game mode configured.
    Inactive,
    /// Index into [`Config::game_mode_configs`].
    Game(u8),
    /// Index into [`Config::keyboard_modes`].
    Keyboard(u8),
}

impl ModeState {
    /// Mode the backends start in for the backend config picked by
    /// `boot_held`.
    #[must_use]
    pub fn boot_default(config: &Config, boot_held: ButtonMask) -> Self {
        config
            .select_backend_config(boot_held)
            .map(|c| c.default_mode_config)
            .filter(|&i| (i as usize) < config.game_mode_configs.len())
            .map_or(ModeState::Inactive, ModeState::Game)
    }
}

#[derive(Clone, Copy, Debug)]
struct Trigger {
    index: u8,
    mask: ButtonMask,
}

/// Watches activation bindings and switches modes.
#[derive(Debug)]
pub struct ModeArbiter {
    game: Vec<Trigger, MAX_GAME_MODES>,
    keyboard: Vec<Trigger, MAX_KEYBOARD_MODES>,
    previous: ButtonMask,
    current: ModeState,
}

impl ModeArbiter {
    #[must_use]
    pub fn new(initial: ModeState) -> Self {
        Self {
            game: Vec::new(),
            keyboard: Vec::new(),
            previous: ButtonMask::NONE,
            current: initial,
        }
    }

    /// Register the activation bindings of every mode in `config`.
    ///
    /// Modes with an empty binding can only be entered as the boot default.
    pub fn install_mode_triggers(&mut self, config: &Config) {
        self.game.clear();
        self.keyboard.clear();

        for (index, mode) in config.game_mode_configs.iter().enumerate() {
            let mask = binding_mask(&mode.activation_binding);
            if !mask.is_empty() {
                let _ = self.game.push(Trigger {
                    index: index as u8,
                    mask,
                });
            }
        }
        for (index, mode) in config.keyboard_modes.iter().enumerate() {
            let mask = binding_mask(&mode.activation_binding);
            if !mask.is_empty() {
                let _ = self.keyboard.push(Trigger {
                    index: index as u8,
                    mask,
                });
            }
        }
        debug!(
            "Installed {} game and {} keyboard mode triggers",
            self.game.len(),
            self.keyboard.len()
        );
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> ModeState {
        self.current
    }

    /// Check the bindings against the current snapshot and apply a newly
    /// activated mode to `backends`.
    pub fn select_active_mode<B: CommunicationBackend, const N: usize>(
        &mut self,
        backends: &mut BackendSet<B, N>,
        config: &Config,
    ) -> ModeState {
        let held = backends.inputs().snapshot().buttons;
        let previous = core::mem::replace(&mut self.previous, held);
        let activated = |t: &&Trigger| held.contains_all(t.mask) && !previous.contains_all(t.mask);

        let next = if let Some(trigger) = self.game.iter().find(activated) {
            ModeState::Game(trigger.index)
        } else if let Some(trigger) = self.keyboard.iter().find(activated) {
            ModeState::Keyboard(trigger.index)
        } else {
            return self.current;
        };
        if next == self.current {
            return self.current;
        }

        match next {
            ModeState::Game(index) => {
                let Some(mode_config) = config.game_mode_configs.get(index as usize) else {
                    return self.current;
                };
                info!("Game mode {} ({:?}) selected", index, mode_config.mode_id);
                backends.set_game_mode(Some(&ControllerMode::new(mode_config)));
            }
            ModeState::Keyboard(index) => {
                info!("Keyboard mode {} selected", index);
                backends.set_game_mode(None);
            }
            ModeState::Inactive => {}
        }
        self.current = next;
        self.current
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::{leak_inputs, MockBackend, Recorder};
    use config_proto::{default_config, BackendId, Button, ModeId};
    use std::vec;

    const MELEE: [Button; 3] = [Button::Mb1, Button::Lt1, Button::Lf3];
    const ULTIMATE: [Button; 3] = [Button::Mb1, Button::Lt1, Button::Lf1];
    const KEYBOARD: [Button; 3] = [Button::Mb1, Button::Lt2, Button::Lf1];

    fn setup() -> (BackendSet<MockBackend, 4>, Recorder, ModeArbiter, Config) {
        let inputs = leak_inputs();
        let recorder = Recorder::new();
        let mut set = BackendSet::new(inputs);
        let _ = set.push(MockBackend::new(BackendId::DInput, inputs, &recorder));
        let _ = set.push(MockBackend::new(BackendId::InputViewer, inputs, &recorder));
        let config = default_config();
        let mut arbiter = ModeArbiter::new(ModeState::Game(0));
        arbiter.install_mode_triggers(&config);
        (set, recorder, arbiter, config)
    }

    fn hold(set: &BackendSet<MockBackend, 4>, buttons: &[Button]) {
        for button in Button::ALL {
            set.inputs().set_button(button, buttons.contains(&button));
        }
    }

    #[test]
    fn test_nothing_held_keeps_mode() {
        let (mut set, recorder, mut arbiter, config) = setup();
        assert_eq!(arbiter.select_active_mode(&mut set, &config), ModeState::Game(0));
        assert!(recorder.modes().is_empty());
    }

    #[test]
    fn test_binding_switches_all_backends() {
        let (mut set, recorder, mut arbiter, config) = setup();
        hold(&set, &ULTIMATE);
        assert_eq!(arbiter.select_active_mode(&mut set, &config), ModeState::Game(2));
        assert_eq!(
            recorder.modes(),
            vec![Some(ModeId::Ultimate), Some(ModeId::Ultimate)]
        );
    }

    #[test]
    fn test_activation_is_edge_triggered() {
        let (mut set, recorder, mut arbiter, config) = setup();
        hold(&set, &ULTIMATE);
        arbiter.select_active_mode(&mut set, &config);
        arbiter.select_active_mode(&mut set, &config);
        arbiter.select_active_mode(&mut set, &config);
        assert_eq!(recorder.modes().len(), 2);
    }

    #[test]
    fn test_current_mode_not_reapplied() {
        let (mut set, recorder, mut arbiter, config) = setup();
        hold(&set, &MELEE);
        assert_eq!(arbiter.select_active_mode(&mut set, &config), ModeState::Game(0));
        assert!(recorder.modes().is_empty());
    }

    #[test]
    fn test_keyboard_mode_clears_game_mode() {
        let (mut set, recorder, mut arbiter, config) = setup();
        hold(&set, &KEYBOARD);
        assert_eq!(
            arbiter.select_active_mode(&mut set, &config),
            ModeState::Keyboard(0)
        );
        assert_eq!(recorder.modes(), vec![None, None]);

        hold(&set, &[]);
        arbiter.select_active_mode(&mut set, &config);
        hold(&set, &MELEE);
        assert_eq!(arbiter.select_active_mode(&mut set, &config), ModeState::Game(0));
        assert_eq!(recorder.modes().len(), 4);
    }

    #[test]
    fn test_game_modes_checked_first() {
        let (mut set, _recorder, mut arbiter, config) = setup();
        // Superset of both the Ultimate and keyboard bindings.
        let mut both = vec![Button::Lt2];
        both.extend_from_slice(&ULTIMATE);
        hold(&set, &both);
        assert_eq!(arbiter.select_active_mode(&mut set, &config), ModeState::Game(2));
    }

    #[test]
    fn test_empty_binding_never_triggers() {
        let (mut set, recorder, _, mut config) = setup();
        config.game_mode_configs[1].activation_binding.clear();
        let mut arbiter = ModeArbiter::new(ModeState::Game(0));
        arbiter.install_mode_triggers(&config);

        hold(&set, &[Button::Rt1]);
        arbiter.select_active_mode(&mut set, &config);
        assert!(recorder.modes().is_empty());
    }

    #[test]
    fn test_boot_default_mode() {
        let config = default_config();
        assert_eq!(
            ModeState::boot_default(&config, ButtonMask::NONE),
            ModeState::Game(0)
        );
        assert_eq!(
            ModeState::boot_default(&Config::default(), ButtonMask::NONE),
            ModeState::Inactive
        );
    }
}
