//! The primary core's dispatch loop.

use config_proto::Config;

use crate::arbiter::{ModeArbiter, ModeState};
use crate::backend::{BackendSet, CommunicationBackend};
use crate::input::InputSource;
use crate::keyboard::{keyboard_report, KeyboardOverlay};
use crate::persistence::{ConfigSource, LoadedConfig};

/// Running application state, built by [`Bootstrap`](crate::Bootstrap).
pub struct App<S, B, K, const N: usize> {
    config: Config,
    config_source: ConfigSource,
    backends: BackendSet<B, N>,
    arbiter: ModeArbiter,
    source: S,
    keyboard: Option<K>,
}

impl<S, B, K, const N: usize> App<S, B, K, N>
where
    S: InputSource,
    B: CommunicationBackend,
    K: KeyboardOverlay,
{
    pub(crate) fn new(
        loaded: LoadedConfig,
        backends: BackendSet<B, N>,
        arbiter: ModeArbiter,
        source: S,
        keyboard: Option<K>,
    ) -> Self {
        Self {
            config: loaded.config,
            config_source: loaded.source,
            backends,
            arbiter,
            source,
            keyboard,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn config_source(&self) -> ConfigSource {
        self.config_source
    }

    #[inline]
    pub fn backends(&self) -> &BackendSet<B, N> {
        &self.backends
    }

    #[inline]
    pub fn mode(&self) -> ModeState {
        self.arbiter.current()
    }

    /// One pass: scan, pick the mode, report on every backend, then the
    /// keyboard overlay if a keyboard mode is active.
    pub async fn run_cycle(&mut self) -> ModeState {
        self.source.refresh(self.backends.inputs());

        let mode = self
            .arbiter
            .select_active_mode(&mut self.backends, &self.config);

        self.backends.send_reports().await;

        if let ModeState::Keyboard(index) = mode {
            let keymap = self.config.keyboard_modes.get(index as usize);
            if let (Some(keyboard), Some(first), Some(keymap)) =
                (self.keyboard.as_mut(), self.backends.first(), keymap)
            {
                let report = keyboard_report(keymap, &first.inputs().snapshot());
                if let Err(e) = keyboard.send_report(&report).await {
                    warn!("Keyboard report failed: {:?}", e);
                }
            }
        }

        mode
    }

    /// Cycle forever, yielding to the executor between passes.
    pub async fn run(&mut self) -> ! {
        info!("Dispatch loop started with {} backends", self.backends.len());
        loop {
            self.run_cycle().await;
            embassy_futures::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::keyboard::{KeyboardReport, NoKeyboard};
    use crate::testing::{block_on, leak_inputs, MockBackend, MockKeyboard, MockPin, Recorder};
    use crate::GpioButtonInput;
    use config_proto::{default_config, BackendId, Button};
    use std::vec;

    const KEYBOARD_BINDING: [Button; 3] = [Button::Mb1, Button::Lt2, Button::Lf1];

    struct Rig {
        pins: std::vec::Vec<(Button, MockPin)>,
        recorder: Recorder,
    }

    impl Rig {
        fn new(buttons: &[Button]) -> Self {
            Self {
                pins: buttons.iter().map(|&b| (b, MockPin::new())).collect(),
                recorder: Recorder::new(),
            }
        }

        fn press(&self, buttons: &[Button]) {
            for (button, pin) in &self.pins {
                pin.set_low(buttons.contains(button));
            }
        }

        fn app<K: KeyboardOverlay>(
            &self,
            ids: &[BackendId],
            keyboard: Option<K>,
        ) -> App<GpioButtonInput<MockPin>, MockBackend, K, 4> {
            let inputs = leak_inputs();
            let mut set = BackendSet::new(inputs);
            for &id in ids {
                let _ = set.push(MockBackend::new(id, inputs, &self.recorder));
            }
            let config = default_config();
            let mut arbiter = ModeArbiter::new(ModeState::Game(0));
            arbiter.install_mode_triggers(&config);
            let source = self.pins.iter().cloned().collect();
            let loaded = LoadedConfig {
                config,
                source: ConfigSource::Loaded,
            };
            App::new(loaded, set, arbiter, source, keyboard)
        }
    }

    #[test]
    fn test_every_backend_once_per_cycle_in_order() {
        let rig = Rig::new(&[]);
        let mut app = rig.app::<NoKeyboard>(
            &[BackendId::DInput, BackendId::InputViewer, BackendId::XInput],
            None,
        );

        block_on(app.run_cycle());
        block_on(app.run_cycle());

        let order = [BackendId::DInput, BackendId::InputViewer, BackendId::XInput];
        let mut expected = vec![];
        expected.extend_from_slice(&order);
        expected.extend_from_slice(&order);
        assert_eq!(rig.recorder.reports(), expected);
    }

    #[test]
    fn test_pressed_pin_reaches_next_report() {
        let rig = Rig::new(&[Button::Rt1]);
        let mut app = rig.app::<NoKeyboard>(&[BackendId::DInput], None);

        block_on(app.run_cycle());
        rig.press(&[Button::Rt1]);
        block_on(app.run_cycle());

        let snapshots = rig.recorder.snapshots();
        assert!(!snapshots[0].is_pressed(Button::Rt1));
        assert!(snapshots[1].is_pressed(Button::Rt1));
    }

    #[test]
    fn test_zero_backends_no_emission() {
        let rig = Rig::new(&KEYBOARD_BINDING);
        let keyboard = MockKeyboard::new(&rig.recorder);
        let mut app = rig.app(&[], Some(keyboard));

        rig.press(&KEYBOARD_BINDING);
        for _ in 0..3 {
            block_on(app.run_cycle());
        }

        assert_eq!(app.mode(), ModeState::Keyboard(0));
        assert!(rig.recorder.reports().is_empty());
        assert!(rig.recorder.keyboard_reports().is_empty());
    }

    #[test]
    fn test_keyboard_overlay_in_keyboard_mode() {
        let rig = Rig::new(&KEYBOARD_BINDING);
        let keyboard = MockKeyboard::new(&rig.recorder);
        let mut app = rig.app(&[BackendId::DInput], Some(keyboard));

        assert_eq!(block_on(app.run_cycle()), ModeState::Game(0));
        assert!(rig.recorder.keyboard_reports().is_empty());

        rig.press(&KEYBOARD_BINDING);
        assert_eq!(block_on(app.run_cycle()), ModeState::Keyboard(0));

        let reports = rig.recorder.keyboard_reports();
        assert_eq!(reports.len(), 1);
        // Lf1, Lt2 and Mb1 map to A + index.
        let expected = KeyboardReport {
            modifier: 0,
            keycodes: [0x04, 0x09, 0x0A, 0, 0, 0],
        };
        assert_eq!(reports[0], expected);
        assert_eq!(rig.recorder.modes(), vec![None]);
    }

    #[test]
    fn test_no_overlay_configured_never_emits() {
        let rig = Rig::new(&KEYBOARD_BINDING);
        let mut app = rig.app::<MockKeyboard>(&[BackendId::DInput], None);

        rig.press(&KEYBOARD_BINDING);
        block_on(app.run_cycle());
        block_on(app.run_cycle());

        assert_eq!(app.mode(), ModeState::Keyboard(0));
        assert!(rig.recorder.keyboard_reports().is_empty());
        assert_eq!(rig.recorder.reports().len(), 2);
    }

    #[test]
    fn test_backend_failure_does_not_stop_cycle() {
        let rig = Rig::new(&[]);
        let inputs = leak_inputs();
        let mut set: BackendSet<MockBackend, 4> = BackendSet::new(inputs);
        let _ = set.push(MockBackend::new(BackendId::DInput, inputs, &rig.recorder).failing());
        let _ = set.push(MockBackend::new(BackendId::XInput, inputs, &rig.recorder));
        let config = default_config();
        let loaded = LoadedConfig {
            config,
            source: ConfigSource::Loaded,
        };
        let source: GpioButtonInput<MockPin> = GpioButtonInput::new();
        let mut app: App<_, _, NoKeyboard, 4> =
            App::new(loaded, set, ModeArbiter::new(ModeState::Game(0)), source, None);

        block_on(app.run_cycle());

        assert_eq!(
            rig.recorder.reports(),
            vec![BackendId::DInput, BackendId::XInput]
        );
        assert_eq!(app.backends().len(), 2);
    }
}
