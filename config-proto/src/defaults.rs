//! Compiled default configuration.
//!
//! Used on first boot and whenever the stored configuration cannot be
//! decoded. Every mode binding starts with `Mb1` (Start) so that ordinary
//! gameplay cannot trigger a mode switch by accident.

use heapless::Vec;

use crate::config::{
    Binding, CommunicationBackendConfig, Config, GameModeConfig, KeyMapping, KeyboardModeConfig,
    SocdPair,
};
use crate::types::{BackendId, Button, ModeId, SocdType};

/// HID usage ID of the `A` key; the default keymap counts up from here.
const HID_KEY_A: u8 = 0x04;

fn binding(buttons: &[Button]) -> Binding {
    let mut binding = Binding::new();
    for &b in buttons {
        // Defaults never exceed MAX_BINDING_LEN.
        let _ = binding.push(b);
    }
    binding
}

fn socd(button_dir1: Button, button_dir2: Button, socd_type: SocdType) -> SocdPair {
    SocdPair {
        button_dir1,
        button_dir2,
        socd_type,
    }
}

fn game_mode(mode_id: ModeId, activation: &[Button], pairs: &[SocdPair]) -> GameModeConfig {
    let mut mode = GameModeConfig::new(mode_id);
    mode.activation_binding = binding(activation);
    for &pair in pairs {
        let _ = mode.socd_pairs.push(pair);
    }
    mode
}

fn backend(
    backend_id: BackendId,
    activation: &[Button],
    secondary: &[BackendId],
) -> CommunicationBackendConfig {
    let mut secondary_backends = Vec::new();
    for &id in secondary {
        let _ = secondary_backends.push(id);
    }
    CommunicationBackendConfig {
        backend_id,
        default_mode_config: 0,
        activation_binding: binding(activation),
        secondary_backends,
    }
}

/// Build the compiled default configuration.
#[must_use]
pub fn default_config() -> Config {
    use Button::*;

    let stick_2ip_nr = [
        socd(Lf3, Lf1, SocdType::SecondInputPriorityNoReactivation),
        socd(Lf2, Rf4, SocdType::SecondInputPriorityNoReactivation),
        socd(Rt3, Rt5, SocdType::SecondInputPriority),
        socd(Rt2, Rt4, SocdType::SecondInputPriority),
    ];
    let stick_2ip = [
        socd(Lf3, Lf1, SocdType::SecondInputPriority),
        socd(Lf2, Rf4, SocdType::SecondInputPriority),
        socd(Rt3, Rt5, SocdType::SecondInputPriority),
        socd(Rt2, Rt4, SocdType::SecondInputPriority),
    ];
    let hitbox = [
        socd(Lf3, Lf1, SocdType::Neutral),
        socd(Lf2, Rf4, SocdType::DirTwoPriority),
    ];

    let mut config = Config::default();
    for mode in [
        game_mode(ModeId::Melee, &[Mb1, Lt1, Lf3], &stick_2ip_nr),
        game_mode(ModeId::ProjectM, &[Mb1, Lt1, Lf2], &stick_2ip_nr),
        game_mode(ModeId::Ultimate, &[Mb1, Lt1, Lf1], &stick_2ip),
        game_mode(ModeId::Fgc, &[Mb1, Lt2, Lf3], &hitbox),
        game_mode(ModeId::RivalsOfAether, &[Mb1, Lt1, Lf4], &stick_2ip),
    ] {
        let _ = config.game_mode_configs.push(mode);
    }

    let mut keymap = Vec::new();
    for (offset, &button) in Button::ALL.iter().enumerate() {
        let _ = keymap.push(KeyMapping {
            button,
            keycode: HID_KEY_A + offset as u8,
        });
    }
    let _ = config.keyboard_modes.push(KeyboardModeConfig {
        id: 1,
        activation_binding: binding(&[Mb1, Lt2, Lf1]),
        keymap,
    });

    for backend_config in [
        backend(BackendId::DInput, &[], &[BackendId::InputViewer]),
        backend(BackendId::XInput, &[Rf1], &[]),
        backend(BackendId::GamecubeConsole, &[Rf2], &[]),
        backend(BackendId::N64Console, &[Rf3], &[]),
    ] {
        let _ = config.communication_backend_configs.push(backend_config);
    }
    config.default_backend_config = 0;

    config
}
