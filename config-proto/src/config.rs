//! Configuration records.
//!
//! All collections are fixed-capacity [`heapless::Vec`]s so a [`Config`] can
//! live in a `static` on targets without an allocator.

use heapless::Vec;

use crate::types::{BackendId, Button, ButtonMask, ModeId, SocdType};

/// Maximum buttons in one activation binding.
pub const MAX_BINDING_LEN: usize = 4;
/// Maximum game modes.
pub const MAX_GAME_MODES: usize = 8;
/// Maximum keyboard modes.
pub const MAX_KEYBOARD_MODES: usize = 4;
/// Maximum backend configurations.
pub const MAX_BACKEND_CONFIGS: usize = 4;
/// Maximum button remaps per game mode.
pub const MAX_REMAPS: usize = 8;
/// Maximum SOCD pairs per game mode.
pub const MAX_SOCD_PAIRS: usize = 6;
/// Maximum keymap entries per keyboard mode.
pub const MAX_KEYMAP_LEN: usize = Button::COUNT;
/// Maximum secondary backends started alongside a primary backend.
pub const MAX_SECONDARY_BACKENDS: usize = 2;

/// Buttons that must all be held to trigger something.
pub type Binding = Vec<Button, MAX_BINDING_LEN>;

/// Convert a binding to a mask. An empty binding yields an empty mask.
#[must_use]
pub fn binding_mask(binding: &Binding) -> ButtonMask {
    ButtonMask::from_buttons(binding)
}

/// Make `physical` behave as `activates`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonRemap {
    pub physical: Button,
    pub activates: Button,
}

/// An opposing pair of directional buttons and how conflicts resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocdPair {
    pub button_dir1: Button,
    pub button_dir2: Button,
    pub socd_type: SocdType,
}

/// A selectable controller mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameModeConfig {
    pub mode_id: ModeId,
    /// Held together at runtime to switch to this mode.
    pub activation_binding: Binding,
    pub button_remapping: Vec<ButtonRemap, MAX_REMAPS>,
    pub socd_pairs: Vec<SocdPair, MAX_SOCD_PAIRS>,
}

impl GameModeConfig {
    #[must_use]
    pub fn new(mode_id: ModeId) -> Self {
        Self {
            mode_id,
            activation_binding: Vec::new(),
            button_remapping: Vec::new(),
            socd_pairs: Vec::new(),
        }
    }
}

/// One keyboard key produced by one button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMapping {
    pub button: Button,
    /// HID keyboard usage ID.
    pub keycode: u8,
}

/// A keyboard-emulation mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardModeConfig {
    pub id: u8,
    pub activation_binding: Binding,
    pub keymap: Vec<KeyMapping, MAX_KEYMAP_LEN>,
}

/// Which output protocol to start and with what defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommunicationBackendConfig {
    pub backend_id: BackendId,
    /// Index into [`Config::game_mode_configs`] applied at boot.
    pub default_mode_config: u8,
    /// Held at boot to pick this backend config over the default one.
    pub activation_binding: Binding,
    /// Extra backends started after the primary one, in order.
    pub secondary_backends: Vec<BackendId, MAX_SECONDARY_BACKENDS>,
}

/// Complete runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Config {
    pub game_mode_configs: Vec<GameModeConfig, MAX_GAME_MODES>,
    pub keyboard_modes: Vec<KeyboardModeConfig, MAX_KEYBOARD_MODES>,
    pub communication_backend_configs: Vec<CommunicationBackendConfig, MAX_BACKEND_CONFIGS>,
    /// Index into [`Config::communication_backend_configs`] used when no
    /// backend activation binding is held at boot.
    pub default_backend_config: u8,
}

impl Config {
    /// Pick the backend config for this boot.
    ///
    /// The first config whose non-empty activation binding is fully held
    /// wins; otherwise the default index is used, falling back to the first
    /// entry when the index is out of range.
    #[must_use]
    pub fn select_backend_config(&self, held: ButtonMask) -> Option<&CommunicationBackendConfig> {
        self.communication_backend_configs
            .iter()
            .find(|c| {
                let mask = binding_mask(&c.activation_binding);
                !mask.is_empty() && held.contains_all(mask)
            })
            .or_else(|| {
                self.communication_backend_configs
                    .get(self.default_backend_config as usize)
            })
            .or_else(|| self.communication_backend_configs.first())
    }
}
