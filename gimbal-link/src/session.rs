use gimbal_core::command::{self, FeatureCommand, ME_CALIBRATE};
use gimbal_core::packet::MAX_PAYLOAD_SIZE;
use gimbal_core::report::{self, ControlResponse, SensorReportId};
use gimbal_core::{Channel, Packet, SequenceNumbers};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::frame::{self, Inbound, InboundPacket};
use crate::state::{ReportKind, SessionState};
use crate::transport::Transport;

/// Lifecycle of a hub session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Resetting,
    AwaitingHandshake,
    Ready,
}

/// Outcome of one [`Session::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// The hub had nothing to say.
    Quiet,
    /// A reading was refreshed; the session state holds the new value.
    Updated(ReportKind),
    /// A packet arrived but carried nothing this session tracks.
    Skipped,
}

/// One conversation with a motion hub over an owned bus.
///
/// [`Session::open`] resets the hub and performs the product id
/// handshake, after which the caller enables the report streams it
/// wants and drives the session with [`Session::poll`]. Consecutive
/// bus failures past the configured threshold trigger an automatic
/// reset that replays every feature request made so far.
pub struct Session<T: Transport> {
    bus: T,
    config: SessionConfig,
    sequence: SequenceNumbers,
    payload: [u8; MAX_PAYLOAD_SIZE],
    phase: SessionPhase,
    state: SessionState,
    features: Vec<FeatureCommand>,
    failures: u32,
}

impl<T: Transport> Session<T> {
    pub fn new(bus: T, config: SessionConfig) -> Self {
        Self {
            bus,
            config,
            sequence: SequenceNumbers::new(),
            payload: [0; MAX_PAYLOAD_SIZE],
            phase: SessionPhase::Uninitialized,
            state: SessionState::default(),
            features: Vec::new(),
            failures: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Latest decoded readings.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Feature requests made so far, as replayed after a reset.
    pub fn features(&self) -> &[FeatureCommand] {
        &self.features
    }

    pub fn into_inner(self) -> T {
        self.bus
    }

    /// Resets the hub and performs the product id handshake.
    #[instrument(name = "session_open", skip(self))]
    pub fn open(&mut self) -> Result<(), SessionError<T::Error>> {
        self.soft_reset()?;
        self.handshake()?;
        self.phase = SessionPhase::Ready;
        self.failures = 0;
        if !self.features.is_empty() {
            self.replay_features()?;
        }
        info!("session ready");
        Ok(())
    }

    /// Sends the soft reset request and drains the hub's announcements.
    ///
    /// All sequence counters restart at zero afterwards, matching the
    /// hub's own counters after its reboot.
    pub fn soft_reset(&mut self) -> Result<(), SessionError<T::Error>> {
        self.phase = SessionPhase::Resetting;
        self.send(Channel::Executable, &command::soft_reset())?;
        self.sequence.reset();

        // the hub announces itself after a reset; swallow everything
        // until the bus reads empty twice in a row
        let mut quiet = 0;
        while quiet < 2 {
            match self.read()? {
                Inbound::Empty => quiet += 1,
                Inbound::Packet(packet) => {
                    quiet = 0;
                    trace!(
                        channel = packet.channel,
                        len = packet.payload_len,
                        "drained reset announcement"
                    );
                }
            }
        }
        Ok(())
    }

    fn handshake(&mut self) -> Result<(), SessionError<T::Error>> {
        self.phase = SessionPhase::AwaitingHandshake;
        self.send(Channel::Control, &command::product_id_request())?;

        for attempt in 1..=self.config.handshake_attempts {
            if let Inbound::Packet(packet) = self.read()?
                && packet.channel == Channel::Control as u8
                && packet.payload_len > 0
                && self.payload[0] == report::PRODUCT_ID_RESPONSE
            {
                debug!(attempt, "product id response received");
                return Ok(());
            }
        }

        warn!(
            attempts = self.config.handshake_attempts,
            "hub never answered the product id request"
        );
        Err(SessionError::HandshakeFailed {
            attempts: self.config.handshake_attempts,
        })
    }

    /// Asks the hub to stream one report at the given interval.
    ///
    /// The request is recorded before it is sent, so a request lost to
    /// a bus fault is still replayed once the session recovers.
    pub fn enable(
        &mut self,
        report: SensorReportId,
        interval_ms: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable_feature(FeatureCommand::new(report, interval_ms))
    }

    /// Like [`Session::enable`] with a sensor-specific config word.
    pub fn enable_with_config(
        &mut self,
        report: SensorReportId,
        interval_ms: u32,
        specific_config: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable_feature(FeatureCommand::with_config(
            report,
            interval_ms,
            specific_config,
        ))
    }

    pub fn enable_accelerometer(&mut self, interval_ms: u32) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::Accelerometer, interval_ms)
    }

    pub fn enable_linear_accelerometer(
        &mut self,
        interval_ms: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::LinearAcceleration, interval_ms)
    }

    pub fn enable_gyroscope(&mut self, interval_ms: u32) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::Gyroscope, interval_ms)
    }

    pub fn enable_magnetometer(&mut self, interval_ms: u32) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::MagneticField, interval_ms)
    }

    pub fn enable_rotation_vector(
        &mut self,
        interval_ms: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::RotationVector, interval_ms)
    }

    pub fn enable_game_rotation_vector(
        &mut self,
        interval_ms: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::GameRotationVector, interval_ms)
    }

    pub fn enable_step_counter(&mut self, interval_ms: u32) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::StepCounter, interval_ms)
    }

    pub fn enable_stability_classifier(
        &mut self,
        interval_ms: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable(SensorReportId::StabilityClassifier, interval_ms)
    }

    /// Enables the activity classifier. `activities` is the bitmask of
    /// activity classes the hub should report on.
    pub fn enable_activity_classifier(
        &mut self,
        interval_ms: u32,
        activities: u32,
    ) -> Result<(), SessionError<T::Error>> {
        self.enable_with_config(
            SensorReportId::PersonalActivityClassifier,
            interval_ms,
            activities,
        )
    }

    /// Attempts one receive and folds whatever arrives into the state.
    ///
    /// Bus failures below the reset threshold are absorbed and reported
    /// as [`Poll::Quiet`]. At the threshold the session resets the hub,
    /// replays its feature requests and hands the original error back.
    pub fn poll(&mut self) -> Result<Poll, SessionError<T::Error>> {
        let inbound = match self.read() {
            Ok(inbound) => inbound,
            Err(error) => {
                self.note_failure(error)?;
                return Ok(Poll::Quiet);
            }
        };

        self.failures = 0;
        match inbound {
            Inbound::Empty => Ok(Poll::Quiet),
            Inbound::Packet(packet) => Ok(self.dispatch(packet)),
        }
    }

    fn dispatch(&mut self, packet: InboundPacket) -> Poll {
        if packet.overflow {
            warn!(
                channel = packet.channel,
                kept = packet.payload_len,
                "packet exceeded the payload buffer, trailing cargo dropped"
            );
        }

        let Ok(channel) = Channel::try_from(packet.channel) else {
            trace!(channel = packet.channel, "ignoring unknown channel");
            return Poll::Skipped;
        };

        let payload = &self.payload[..packet.payload_len];
        match channel {
            Channel::Reports => {
                if payload.first() != Some(&report::BASE_TIMESTAMP) {
                    trace!("report packet without a base timestamp");
                    return Poll::Skipped;
                }
                let input = match report::parse_input_report(payload) {
                    Ok(input) => input,
                    Err(error) => {
                        warn!(error = ?error, "malformed input report");
                        return Poll::Skipped;
                    }
                };
                match self.state.apply_input(&input, &self.config.q_points) {
                    Some(kind) => Poll::Updated(kind),
                    None => Poll::Skipped,
                }
            }
            Channel::Control => {
                let response = match report::parse_control_response(payload) {
                    Ok(response) => response,
                    Err(error) => {
                        warn!(error = ?error, "malformed control response");
                        return Poll::Skipped;
                    }
                };
                match response {
                    ControlResponse::ProductId => {
                        debug!("unsolicited product id response");
                        Poll::Skipped
                    }
                    ControlResponse::Command { command, r0 } if command == ME_CALIBRATE => {
                        self.state.calibration_status = Some(r0);
                        Poll::Updated(ReportKind::CalibrationStatus)
                    }
                    ControlResponse::Command { command, .. } => {
                        trace!(command, "untracked command response");
                        Poll::Skipped
                    }
                    ControlResponse::Unrecognized { report_id } => {
                        trace!(report_id, "unrecognized control report");
                        Poll::Skipped
                    }
                }
            }
            // the hub advertises on its command channel; none of it is data
            Channel::Command => Poll::Quiet,
            Channel::Executable | Channel::WakeReports | Channel::GyroRotationVector => {
                Poll::Skipped
            }
        }
    }

    fn enable_feature(&mut self, feature: FeatureCommand) -> Result<(), SessionError<T::Error>> {
        self.remember(feature);
        match self.send(Channel::Control, &feature.to_bytes()) {
            Ok(()) => {
                self.failures = 0;
                Ok(())
            }
            Err(error @ SessionError::Bus(_)) => self.note_failure(error),
            Err(other) => Err(other),
        }
    }

    fn remember(&mut self, feature: FeatureCommand) {
        if let Some(slot) = self
            .features
            .iter_mut()
            .find(|entry| entry.report_id == feature.report_id)
        {
            *slot = feature;
        } else {
            self.features.push(feature);
        }
    }

    fn note_failure(&mut self, error: SessionError<T::Error>) -> Result<(), SessionError<T::Error>> {
        self.failures += 1;
        if self.failures < self.config.reset_threshold {
            warn!(
                failures = self.failures,
                threshold = self.config.reset_threshold,
                error = %error,
                "bus failure absorbed"
            );
            return Ok(());
        }

        warn!(
            failures = self.failures,
            "failure threshold reached, resetting the hub"
        );
        self.recover()?;
        Err(error)
    }

    #[instrument(name = "session_recover", skip(self))]
    fn recover(&mut self) -> Result<(), SessionError<T::Error>> {
        self.failures = 0;
        self.soft_reset()?;
        self.handshake()?;
        self.phase = SessionPhase::Ready;
        self.replay_features()?;
        info!(features = self.features.len(), "session recovered");
        Ok(())
    }

    fn replay_features(&mut self) -> Result<(), SessionError<T::Error>> {
        let ledger = self.features.clone();
        for feature in &ledger {
            debug!(
                report = ?feature.report_id,
                interval_ms = feature.interval_ms,
                "replaying feature request"
            );
            self.send(Channel::Control, &feature.to_bytes())?;
        }
        Ok(())
    }

    fn send(&mut self, channel: Channel, payload: &[u8]) -> Result<(), SessionError<T::Error>> {
        // the counter advances when the packet is built, delivered or not
        let sequence = self.sequence.next(channel);
        let packet = Packet::new(channel, sequence, payload).map_err(SessionError::Protocol)?;
        trace!(channel = ?channel, sequence, len = payload.len(), "sending packet");
        frame::write_packet(&mut self.bus, &packet)
    }

    fn read(&mut self) -> Result<Inbound, SessionError<T::Error>> {
        frame::read_packet(
            &mut self.bus,
            self.config.transaction_limit,
            &mut self.payload,
        )
    }
}
