//! Host-side mocks shared by the unit tests.

extern crate std;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::boxed::Box;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::vec;
use std::vec::Vec;

use config_proto::{BackendId, Config, ModeId};
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin};
use embedded_hal_async::delay::DelayNs;

use crate::backend::{BackendError, BackendFactory, CommunicationBackend};
use crate::bootstrap::Bootloader;
use crate::input::{JoybusError, JoybusHost};
use crate::keyboard::{KeyboardOverlay, KeyboardReport};
use crate::mode::ControllerMode;
use crate::persistence::{ConfigMedium, PersistenceError};
use crate::pinout::Pinout;
use crate::snapshot::{InputState, SharedInputs};

fn noop_waker() -> Waker {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    unsafe { Waker::from_raw(noop_raw_waker()) }
}

/// Run a future that must complete without waiting on anything.
pub fn block_on<F: Future>(f: F) -> F::Output {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    let mut f = core::pin::pin!(f);

    // Futures here may yield (wake themselves) a bounded number of times.
    for _ in 0..1000 {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
    panic!("future did not complete");
}

/// Poll a future once.
pub fn poll_once<F: Future>(f: Pin<&mut F>) -> Option<F::Output> {
    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    match f.poll(&mut cx) {
        Poll::Ready(result) => Some(result),
        Poll::Pending => None,
    }
}

/// A fresh snapshot with `'static` lifetime.
pub fn leak_inputs() -> &'static SharedInputs {
    Box::leak(Box::new(SharedInputs::new()))
}

#[derive(Default)]
struct Records {
    built: Vec<BackendId>,
    reports: Vec<BackendId>,
    snapshots: Vec<InputState>,
    modes: Vec<Option<ModeId>>,
    keyboard: Vec<KeyboardReport>,
}

/// Shared log of everything the mocks were asked to do.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Records>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend ids in construction order.
    pub fn built(&self) -> Vec<BackendId> {
        self.0.lock().unwrap().built.clone()
    }

    /// Backend ids in `send_report` call order.
    pub fn reports(&self) -> Vec<BackendId> {
        self.0.lock().unwrap().reports.clone()
    }

    /// Snapshot seen by each `send_report`.
    pub fn snapshots(&self) -> Vec<InputState> {
        self.0.lock().unwrap().snapshots.clone()
    }

    /// Every `set_game_mode` call, as the mode id.
    pub fn modes(&self) -> Vec<Option<ModeId>> {
        self.0.lock().unwrap().modes.clone()
    }

    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.0.lock().unwrap().keyboard.clone()
    }
}

pub struct MockBackend {
    id: BackendId,
    inputs: &'static SharedInputs,
    recorder: Recorder,
    mode: Option<ControllerMode>,
    failing: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new(id: BackendId, inputs: &'static SharedInputs, recorder: &Recorder) -> Self {
        Self {
            id,
            inputs,
            recorder: recorder.clone(),
            mode: None,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Every report fails with [`BackendError::Io`].
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Flag turning report failures on and off after the backend is moved
    /// into a set.
    pub fn failure_switch(&self) -> Arc<AtomicBool> {
        self.failing.clone()
    }
}

impl CommunicationBackend for MockBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    fn inputs(&self) -> &'static SharedInputs {
        self.inputs
    }

    fn set_game_mode(&mut self, mode: Option<ControllerMode>) {
        self.recorder
            .0
            .lock()
            .unwrap()
            .modes
            .push(mode.as_ref().map(ControllerMode::mode_id));
        self.mode = mode;
    }

    fn send_report(&mut self) -> impl Future<Output = Result<(), BackendError>> {
        let snapshot = self.inputs.snapshot();
        if let Some(mode) = self.mode.as_mut() {
            let _ = mode.update(&snapshot);
        }
        let mut records = self.recorder.0.lock().unwrap();
        records.reports.push(self.id);
        records.snapshots.push(snapshot);
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(BackendError::Io)
        } else {
            Ok(())
        };
        core::future::ready(result)
    }
}

pub struct MockKeyboard {
    recorder: Recorder,
}

impl MockKeyboard {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
        }
    }
}

impl KeyboardOverlay for MockKeyboard {
    fn send_report(
        &mut self,
        report: &KeyboardReport,
    ) -> impl Future<Output = Result<(), BackendError>> {
        self.recorder.0.lock().unwrap().keyboard.push(*report);
        core::future::ready(Ok(()))
    }
}

pub struct MockFactory {
    recorder: Recorder,
    unsupported: Vec<BackendId>,
}

impl MockFactory {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            unsupported: Vec::new(),
        }
    }

    pub fn unsupported(mut self, id: BackendId) -> Self {
        self.unsupported.push(id);
        self
    }
}

impl BackendFactory for MockFactory {
    type Backend = MockBackend;
    type Keyboard = MockKeyboard;

    fn build(
        &mut self,
        id: BackendId,
        pinout: &Pinout,
        inputs: &'static SharedInputs,
    ) -> Option<MockBackend> {
        if self.unsupported.contains(&id) {
            return None;
        }
        let console = matches!(id, BackendId::GamecubeConsole | BackendId::N64Console);
        if console && pinout.joybus_data.is_none() {
            return None;
        }
        self.recorder.0.lock().unwrap().built.push(id);
        Some(MockBackend::new(id, inputs, &self.recorder))
    }

    fn build_keyboard(&mut self, _config: &Config) -> Option<MockKeyboard> {
        Some(MockKeyboard::new(&self.recorder))
    }
}

/// GPIO whose level is set from the test.
#[derive(Clone, Default)]
pub struct MockPin {
    low: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_low(&self, low: bool) {
        self.low.store(low, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, ErrorKind> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, ErrorKind> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ErrorKind::Other);
        }
        Ok(self.low.load(Ordering::SeqCst))
    }
}

/// Joybus line answering from a queue of canned responses.
#[derive(Clone, Default)]
pub struct MockJoybus {
    responses: Arc<Mutex<VecDeque<Result<Vec<u8>, JoybusError>>>>,
    commands: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockJoybus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Result<&[u8], JoybusError>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.map(<[u8]>::to_vec));
    }

    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.commands.lock().unwrap().clone()
    }
}

impl JoybusHost for MockJoybus {
    fn transfer(&mut self, command: &[u8], response: &mut [u8]) -> Result<usize, JoybusError> {
        self.commands.lock().unwrap().push(command.to_vec());
        let bytes = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(JoybusError::NoResponse))?;
        let len = bytes.len().min(response.len());
        response[..len].copy_from_slice(&bytes[..len]);
        Ok(len)
    }
}

/// In-memory flash sector.
#[derive(Clone)]
pub struct MemoryMedium {
    data: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryMedium {
    /// Erased storage.
    pub fn blank() -> Self {
        Self {
            data: Arc::new(Mutex::new(vec![0xFF; 4096])),
            writes: Arc::new(Mutex::new(0)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    /// Flip the bits of one stored byte.
    pub fn corrupt(&self, offset: usize) {
        self.data.lock().unwrap()[offset] ^= 0xFF;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ConfigMedium for MemoryMedium {
    fn read(&mut self, buf: &mut [u8]) -> Result<(), PersistenceError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Storage);
        }
        let data = self.data.lock().unwrap();
        buf.copy_from_slice(&data[..buf.len()]);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Storage);
        }
        let mut data = self.data.lock().unwrap();
        data.fill(0xFF);
        data[..bytes.len()].copy_from_slice(bytes);
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

/// Bootloader that panics instead of rebooting.
#[derive(Default)]
pub struct MockBootloader {
    rebooted: bool,
    safety_passed: bool,
}

impl MockBootloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebooted(&self) -> bool {
        self.rebooted
    }

    pub fn safety_passed(&self) -> bool {
        self.safety_passed
    }
}

impl Bootloader for MockBootloader {
    fn reboot_to_bootloader(&mut self) -> ! {
        self.rebooted = true;
        panic!("rebooted to bootloader");
    }

    fn safety_check_passed(&mut self) {
        self.safety_passed = true;
    }
}

/// Delay that returns immediately and adds up the requested time.
#[derive(Clone, Default)]
pub struct MockDelay {
    total_ns: Arc<Mutex<u64>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_us(&self) -> u64 {
        *self.total_ns.lock().unwrap() / 1000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.lock().unwrap() += u64::from(ns);
    }
}
