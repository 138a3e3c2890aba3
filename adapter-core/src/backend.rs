//! Communication backends and the fixed set built at boot.
//!
//! A backend turns the shared snapshot into one output protocol (USB HID,
//! console port, ...). The set of backends is decided once from the config
//! and the buttons held at power-on, then sealed: [`BackendSet`] has no way
//! to add, remove or replace an entry, so its length and the identity of
//! each entry hold for the rest of the run.

use core::future::Future;

use config_proto::{BackendId, ButtonMask, Config};
use heapless::Vec;

use crate::keyboard::KeyboardOverlay;
use crate::mode::ControllerMode;
use crate::pinout::Pinout;
use crate::snapshot::SharedInputs;

/// Error type for backend operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackendError {
    /// Bus or endpoint I/O error.
    Io,
    /// Host has not enumerated / console not polling.
    NotReady,
    /// Endpoint busy.
    Busy,
    /// Operation not available on this backend.
    Unsupported,
}

/// An output protocol endpoint.
pub trait CommunicationBackend {
    fn id(&self) -> BackendId;

    /// The snapshot this backend reports from.
    fn inputs(&self) -> &'static SharedInputs;

    /// Switch the controller mode. `None` reports a neutral controller
    /// (used while a keyboard mode is active).
    fn set_game_mode(&mut self, mode: Option<ControllerMode>);

    /// Build and send one report from the current snapshot.
    fn send_report(&mut self) -> impl Future<Output = Result<(), BackendError>>;
}

/// Creates backends for the firmware's supported protocols.
pub trait BackendFactory {
    type Backend: CommunicationBackend;
    type Keyboard: KeyboardOverlay;

    /// Build a backend, or `None` if `id` is not supported on this board.
    ///
    /// Console backends drive `pinout.joybus_data`.
    fn build(
        &mut self,
        id: BackendId,
        pinout: &Pinout,
        inputs: &'static SharedInputs,
    ) -> Option<Self::Backend>;

    /// Build the keyboard overlay transport, if the board has one.
    fn build_keyboard(&mut self, config: &Config) -> Option<Self::Keyboard>;
}

/// Immutable description of a sealed [`BackendSet`], shared with the
/// secondary core.
#[derive(Clone)]
pub struct BackendHandle<const N: usize> {
    ids: Vec<BackendId, N>,
    inputs: &'static SharedInputs,
}

impl<const N: usize> BackendHandle<N> {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[BackendId] {
        &self.ids
    }

    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &'static SharedInputs {
        self.inputs
    }
}

impl<const N: usize> core::fmt::Debug for BackendHandle<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendHandle").field("ids", &self.ids).finish()
    }
}

/// Ordered, fixed set of active backends.
pub struct BackendSet<B, const N: usize> {
    backends: Vec<B, N>,
    /// Whether the last report of each backend failed.
    failing: Vec<bool, N>,
    inputs: &'static SharedInputs,
}

impl<B: CommunicationBackend, const N: usize> BackendSet<B, N> {
    pub(crate) fn new(inputs: &'static SharedInputs) -> Self {
        Self {
            backends: Vec::new(),
            failing: Vec::new(),
            inputs,
        }
    }

    pub(crate) fn push(&mut self, backend: B) -> Result<(), B> {
        self.backends.push(backend)?;
        let _ = self.failing.push(false);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&B> {
        self.backends.first()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&B> {
        self.backends.get(index)
    }

    /// Whether the last report of backend `index` failed.
    #[inline]
    #[must_use]
    pub fn is_failing(&self, index: usize) -> bool {
        self.failing.get(index).copied().unwrap_or(false)
    }

    /// The snapshot shared by every backend of the set.
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &'static SharedInputs {
        self.inputs
    }

    #[must_use]
    pub fn ids(&self) -> Vec<BackendId, N> {
        self.backends.iter().map(CommunicationBackend::id).collect()
    }

    #[must_use]
    pub fn handle(&self) -> BackendHandle<N> {
        BackendHandle {
            ids: self.ids(),
            inputs: self.inputs,
        }
    }

    /// Send one report on every backend, in order.
    ///
    /// A failing backend does not stop the others. Only the first failure
    /// of a run of failures is a warning, the rest go to `debug!`.
    pub async fn send_reports(&mut self) {
        let backends = self.backends.iter_mut();
        for (index, (backend, failing)) in backends.zip(self.failing.iter_mut()).enumerate() {
            match backend.send_report().await {
                Ok(()) => {
                    if *failing {
                        info!("Backend {} ({:?}) recovered", index, backend.id());
                        *failing = false;
                    }
                }
                Err(e) if *failing => {
                    debug!("Backend {} ({:?}) still failing: {:?}", index, backend.id(), e);
                }
                Err(e) => {
                    warn!("Backend {} ({:?}) report failed: {:?}", index, backend.id(), e);
                    *failing = true;
                }
            }
        }
    }

    /// Give every backend its own copy of `mode`.
    pub fn set_game_mode(&mut self, mode: Option<&ControllerMode>) {
        for backend in &mut self.backends {
            backend.set_game_mode(mode.cloned());
        }
    }
}

/// Build the backend set for this boot.
///
/// Picks the backend config from `boot_held`, builds its primary backend and
/// then its secondaries. Ids the factory cannot build are skipped. Every
/// backend starts in the config's default game mode.
pub fn initialize_backends<F: BackendFactory, const N: usize>(
    factory: &mut F,
    config: &Config,
    pinout: &Pinout,
    boot_held: ButtonMask,
    inputs: &'static SharedInputs,
) -> BackendSet<F::Backend, N> {
    let mut set = BackendSet::new(inputs);

    let Some(backend_config) = config.select_backend_config(boot_held) else {
        warn!("No backend configured");
        return set;
    };

    let ids = core::iter::once(backend_config.backend_id)
        .chain(backend_config.secondary_backends.iter().copied());
    for id in ids {
        let Some(backend) = factory.build(id, pinout, inputs) else {
            warn!("Backend {:?} not supported, skipped", id);
            continue;
        };
        if set.push(backend).is_err() {
            warn!("Backend set full, {:?} dropped", id);
            break;
        }
        info!("Backend {:?} started", id);
    }

    let default_mode = config
        .game_mode_configs
        .get(backend_config.default_mode_config as usize);
    match default_mode {
        Some(mode_config) => {
            let mode = ControllerMode::new(mode_config);
            set.set_game_mode(Some(&mode));
        }
        None => warn!(
            "Default game mode {} missing",
            backend_config.default_mode_config
        ),
    }

    set
}
