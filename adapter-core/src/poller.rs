//! Secondary core: keep the controller fields of the snapshot fresh.
//!
//! ```text
//! WaitForPublication -> InitializeControllerSource -> PollForever
//! ```
//!
//! The poller does nothing until the primary core has published its backend
//! set. It then builds its input source and refreshes it at a fixed period.

use embedded_hal_async::delay::DelayNs;

use crate::backend::BackendHandle;
use crate::input::InputSource;
use crate::publish::Publication;
use crate::snapshot::SharedInputs;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollerState {
    WaitForPublication,
    InitializeControllerSource,
    PollForever,
}

/// Drives an input source on the secondary core.
pub struct SecondaryPoller<'a, M, S, D, const N: usize> {
    publication: &'a Publication<BackendHandle<N>>,
    make_source: Option<M>,
    source: Option<S>,
    inputs: Option<&'static SharedInputs>,
    delay: D,
    period_us: u32,
    state: PollerState,
}

impl<'a, M, S, D, const N: usize> SecondaryPoller<'a, M, S, D, N>
where
    M: FnOnce() -> S,
    S: InputSource,
    D: DelayNs,
{
    /// `make_source` runs once, after publication, on the polling core.
    pub fn new(
        publication: &'a Publication<BackendHandle<N>>,
        make_source: M,
        delay: D,
        period_us: u32,
    ) -> Self {
        Self {
            publication,
            make_source: Some(make_source),
            source: None,
            inputs: None,
            delay,
            period_us,
            state: PollerState::WaitForPublication,
        }
    }

    #[inline]
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Advance by one step and return the new state.
    ///
    /// In [`PollerState::WaitForPublication`] this only completes once the
    /// backend set is published.
    pub async fn step(&mut self) -> PollerState {
        match self.state {
            PollerState::WaitForPublication => {
                let handle = self.publication.wait().await;
                debug!("Secondary poller sees {} backends", handle.len());
                self.inputs = Some(handle.inputs());
                self.state = PollerState::InitializeControllerSource;
            }
            PollerState::InitializeControllerSource => {
                if let Some(make_source) = self.make_source.take() {
                    self.source = Some(make_source());
                }
                info!("Secondary poller running every {} us", self.period_us);
                self.state = PollerState::PollForever;
            }
            PollerState::PollForever => {
                if let (Some(source), Some(inputs)) = (self.source.as_mut(), self.inputs) {
                    source.refresh(inputs);
                }
                self.delay.delay_us(self.period_us).await;
            }
        }
        self.state
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.step().await;
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::backend::BackendSet;
    use crate::input::{GamecubeControllerInput, GAMECUBE_FIELDS};
    use crate::snapshot::Axis;
    use crate::testing::{
        block_on, leak_inputs, poll_once, MockBackend, MockDelay, MockJoybus, Recorder,
    };
    use config_proto::BackendId;
    use std::cell::Cell;

    fn publish(publication: &Publication<BackendHandle<4>>, inputs: &'static SharedInputs) {
        let recorder = Recorder::new();
        let mut set: BackendSet<MockBackend, 4> = BackendSet::new(inputs);
        let _ = set.push(MockBackend::new(BackendId::DInput, inputs, &recorder));
        assert!(publication.publish(set.handle()).is_ok());
    }

    #[test]
    fn test_waits_for_publication() {
        let publication = Publication::new();
        let inputs = leak_inputs();
        let built = Cell::new(false);
        let mut poller = SecondaryPoller::new(
            &publication,
            || {
                built.set(true);
                GamecubeControllerInput::new(MockJoybus::new())
            },
            MockDelay::new(),
            400,
        );

        for _ in 0..3 {
            let mut step = core::pin::pin!(poller.step());
            assert!(poll_once(step.as_mut()).is_none());
        }
        assert_eq!(poller.state(), PollerState::WaitForPublication);
        assert!(!built.get());

        publish(&publication, inputs);
        assert_eq!(block_on(poller.step()), PollerState::InitializeControllerSource);
        assert!(!built.get());
        assert_eq!(block_on(poller.step()), PollerState::PollForever);
        assert!(built.get());
    }

    #[test]
    fn test_polls_into_published_snapshot() {
        let publication = Publication::new();
        let inputs = leak_inputs();
        publish(&publication, inputs);

        let bus = MockJoybus::new();
        bus.respond(Ok(&[0x09, 0x00, 0x03]));
        bus.respond(Ok(&[0, 0x80, 10, 20, 30, 40, 50, 60]));
        let delay = MockDelay::new();
        let mut poller = SecondaryPoller::new(
            &publication,
            || GamecubeControllerInput::new(bus.clone()),
            delay.clone(),
            400,
        );

        block_on(poller.step());
        block_on(poller.step());
        assert_eq!(block_on(poller.step()), PollerState::PollForever);

        assert!(inputs.controller_connected());
        assert_eq!(inputs.axis(Axis::StickX), 10);
        assert_eq!(inputs.axis(Axis::TriggerR), 60);
        assert_eq!(delay.total_us(), 400);
        assert!(GAMECUBE_FIELDS.contains(crate::snapshot::Field::ControllerConnected));
    }
}
