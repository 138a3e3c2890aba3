//! Boot sequence of the primary core.
//!
//! ```text
//! SafetyCheck -> ConfigLoad -> BackendConstruct -> ModeBindingSetup -> Run
//! ```
//!
//! The safety check runs before storage or any output peripheral is touched:
//! if the reprogramming hold is down, control passes to the bootloader and
//! nothing else is constructed. The backend set is published to the
//! secondary core as soon as it is sealed, then the mode triggers are
//! installed before the first cycle.

use config_proto::Button;

use crate::app::App;
use crate::arbiter::{ModeArbiter, ModeState};
use crate::backend::{initialize_backends, BackendFactory, BackendHandle};
use crate::input::InputSource;
use crate::persistence::{load_config, ConfigStore};
use crate::pinout::Pinout;
use crate::publish::Publication;
use crate::snapshot::{FieldSet, SharedInputs};

/// Control over the chip's boot ROM.
pub trait Bootloader {
    /// Reboot into the reprogramming (USB mass storage) bootloader.
    fn reboot_to_bootloader(&mut self) -> !;

    /// Called once the reprogramming hold was found released.
    fn safety_check_passed(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootStage {
    SafetyCheck,
    ConfigLoad,
    BackendConstruct,
    ModeBindingSetup,
    Run,
}

/// Everything the primary core needs to start.
pub struct Bootstrap<'a, S, C, F, L, const N: usize> {
    /// Primary input source, also used for the boot-time checks.
    pub source: S,
    pub store: &'a mut C,
    pub factory: &'a mut F,
    pub bootloader: &'a mut L,
    pub inputs: &'static SharedInputs,
    pub publication: &'a Publication<BackendHandle<N>>,
    /// Optional peripheral pins handed to the backend factory.
    pub pinout: &'a Pinout,
    /// Buttons that must all be held to enter the bootloader. Empty disables
    /// the check.
    pub reprogram_hold: &'a [Button],
    /// Fields written by the secondary core's source.
    pub secondary_fields: FieldSet,
}

impl<'a, S, C, F, L, const N: usize> Bootstrap<'a, S, C, F, L, N>
where
    S: InputSource,
    C: ConfigStore,
    F: BackendFactory,
    L: Bootloader,
{
    /// Run the boot sequence and hand back the running application.
    ///
    /// Does not return if the reprogramming hold is down.
    pub fn run(mut self) -> App<S, F::Backend, F::Keyboard, N> {
        stage(BootStage::SafetyCheck);
        debug_assert!(
            FieldSet::ensure_disjoint(&[self.source.owned_fields(), self.secondary_fields]),
            "input sources write overlapping fields"
        );
        self.source.refresh(self.inputs);
        let boot_held = self.inputs.snapshot().buttons;
        let hold = config_proto::ButtonMask::from_buttons(self.reprogram_hold);
        if !hold.is_empty() && boot_held.contains_all(hold) {
            info!("Reprogramming hold detected, entering bootloader");
            self.bootloader.reboot_to_bootloader();
        }
        self.bootloader.safety_check_passed();

        stage(BootStage::ConfigLoad);
        let loaded = load_config(self.store);

        stage(BootStage::BackendConstruct);
        let backends = initialize_backends(
            self.factory,
            &loaded.config,
            self.pinout,
            boot_held,
            self.inputs,
        );
        let keyboard = if loaded.config.keyboard_modes.is_empty() {
            None
        } else {
            self.factory.build_keyboard(&loaded.config)
        };
        match self.publication.publish(backends.handle()) {
            Ok(()) => info!("Published {} backends", backends.len()),
            Err(e) => warn!("Backend set not published: {:?}", e),
        }

        stage(BootStage::ModeBindingSetup);
        let mut arbiter = ModeArbiter::new(ModeState::boot_default(&loaded.config, boot_held));
        arbiter.install_mode_triggers(&loaded.config);

        stage(BootStage::Run);
        App::new(loaded, backends, arbiter, self.source, keyboard)
    }
}

fn stage(stage: BootStage) {
    debug!("Boot stage {:?}", stage);
}
