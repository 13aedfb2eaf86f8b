//! Connection establishment and steady-state dispatch.
//!
//! ```text
//! Idle --connected--> AwaitingPeerHandshake --server Handshake--> Establishing
//!      --Exec Result--> Established --terminated--> Terminated
//! ```
//! Entering `Establishing` sends, in order: Client Information, the
//! application's initial system parameters, then Execute.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use railchan_pdu::order::{EXEC_FLAG_EXPAND_ARGUMENTS, EXEC_FLAG_EXPAND_WORKINGDIRECTORY};
use railchan_pdu::{
    decode_server_pdu, decode_window_order, exec_result_name, order_name, ActivatePdu,
    ClientInformationPdu, ClientPdu, ClientSysParam, ExecPdu, ExecResultPdu, GetAppIdRequestPdu,
    GetAppIdResponsePdu, HandshakePdu, LangbarInfoPdu, NotifyEventPdu, Rect16, ServerPdu,
    SysCommandPdu, SystemMenuPdu, UnicodeString, WindowMovePdu,
};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::event::{EventSink, SysParamPusher};
use crate::session::Session;
use crate::text::TextCodec;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeState {
    Idle,
    AwaitingPeerHandshake,
    Establishing,
    Established,
    Terminated,
}

impl HandshakeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingPeerHandshake => "awaiting_peer_handshake",
            Self::Establishing => "establishing",
            Self::Established => "established",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client-side RAIL state machine for one connection.
pub struct Handshake {
    session: Session,
    config: SessionConfig,
    text: Arc<dyn TextCodec>,
    state: HandshakeState,
    peer_build_number: Option<u32>,
}

impl Handshake {
    pub fn new(session: Session, config: SessionConfig, text: Arc<dyn TextCodec>) -> Self {
        Self {
            session,
            config,
            text,
            state: HandshakeState::Idle,
            peer_build_number: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable access for capability negotiation and sink attachment.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Build number from the server's Handshake PDU, once received.
    pub fn peer_build_number(&self) -> Option<u32> {
        self.peer_build_number
    }

    /// The channel is open: send the client Handshake.
    pub fn on_channel_connected(&mut self) -> Result<()> {
        self.expect_state(&[HandshakeState::Idle], "channel connected")?;
        self.transition(HandshakeState::AwaitingPeerHandshake);

        self.session.send_pdu(&ClientPdu::Handshake(HandshakePdu {
            build_number: self.config.client_build_number,
        }))?;
        if let Some(sink) = self.session.event_sink() {
            sink.on_handshake_sent();
        }
        Ok(())
    }

    /// The server's Handshake arrived: run the establishment sequence.
    ///
    /// A send failure, including one during the initial system parameter
    /// push, stops the sequence; the state stays `Establishing`.
    pub fn on_peer_handshake(&mut self, build_number: u32) -> Result<()> {
        self.expect_state(&[HandshakeState::AwaitingPeerHandshake], "server handshake")?;
        tracing::debug!(build_number, "server handshake received");
        self.peer_build_number = Some(build_number);
        self.transition(HandshakeState::Establishing);

        let sink = self.session.event_sink().cloned();
        if let Some(sink) = &sink {
            sink.on_handshake_received(build_number);
        }

        self.session
            .send_pdu(&ClientPdu::ClientStatus(ClientInformationPdu {
                flags: self.config.client_status_flags,
            }))?;

        if let Some(sink) = &sink {
            let mut pusher = SysParamPusher::new(&self.session);
            sink.on_push_initial_sysparams(&mut pusher);
            let pushed = pusher.pushed();
            if let Some(err) = pusher.into_failure() {
                tracing::warn!(
                    pushed,
                    error = %err,
                    "initial system parameters failed, not sending exec"
                );
                return Err(err);
            }
            tracing::debug!(pushed, "initial system parameters sent");
        }

        self.send_exec()
    }

    /// The server answered Execute. Any result completes establishment.
    pub fn on_exec_result(&mut self, pdu: &ExecResultPdu) -> Result<()> {
        self.expect_state(&[HandshakeState::Establishing], "exec result")?;

        tracing::trace!(
            flags = pdu.flags,
            exec_result = pdu.exec_result,
            raw_result = pdu.raw_result,
            exe_or_file = %hex::encode(pdu.exe_or_file.as_bytes()),
            "exec result"
        );
        if !pdu.succeeded() {
            tracing::warn!(
                exec_result = pdu.exec_result,
                result = exec_result_name(pdu.exec_result),
                raw_result = pdu.raw_result,
                exe_or_file = %self.text.from_wire(pdu.exe_or_file.as_bytes()),
                "server failed to launch application"
            );
        }

        self.transition(HandshakeState::Established);
        if let Some(sink) = self.session.event_sink() {
            sink.on_exec_result(pdu.exec_result, pdu.raw_result);
            sink.on_established();
        }
        Ok(())
    }

    /// The channel was torn down. Later PDUs are ignored.
    pub fn on_channel_terminated(&mut self) {
        if self.state == HandshakeState::Terminated {
            return;
        }
        self.transition(HandshakeState::Terminated);
        if let Some(sink) = self.session.event_sink() {
            sink.on_terminated();
        }
    }

    /// Decode and dispatch one complete channel PDU.
    ///
    /// Failures are logged here; the returned error lets callers count them.
    /// Decode failures and protocol mismatches leave the state unchanged.
    pub fn process_pdu(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state == HandshakeState::Terminated {
            tracing::debug!(len = bytes.len(), "ignoring PDU after termination");
            return Err(self.invalid_state("channel PDU"));
        }

        let pdu = match decode_server_pdu(bytes) {
            Ok(pdu) => pdu,
            Err(err) => {
                tracing::warn!(len = bytes.len(), error = %err, "dropping undecodable PDU");
                return Err(err.into());
            }
        };
        let order_type = pdu.order_type();
        tracing::debug!(
            order_type,
            order = order_name(order_type),
            len = bytes.len(),
            "received PDU"
        );

        let result = self.dispatch(pdu);
        if let Err(SessionError::InvalidState { state, event }) = &result {
            tracing::warn!(
                order_type,
                %state,
                event,
                "protocol mismatch, ignoring PDU"
            );
        }
        result
    }

    /// Decode and dispatch one windowing alternate secondary order.
    pub fn process_window_order(&mut self, bytes: &[u8]) -> Result<()> {
        if self.state == HandshakeState::Terminated {
            tracing::debug!(len = bytes.len(), "ignoring window order after termination");
            return Err(self.invalid_state("window order"));
        }

        let order = match decode_window_order(bytes) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(len = bytes.len(), error = %err, "dropping undecodable window order");
                return Err(err.into());
            }
        };
        tracing::debug!(
            fields_present = order.fields_present(),
            len = bytes.len(),
            "received window order"
        );

        if let Err(err) = self.expect_state(&[HandshakeState::Established], "window order") {
            tracing::warn!(state = %self.state, "protocol mismatch, ignoring window order");
            return Err(err);
        }
        if let Some(sink) = self.session.event_sink() {
            sink.on_window_order(&order);
        }
        Ok(())
    }

    pub fn send_sysparam(&self, param: ClientSysParam) -> Result<()> {
        self.send_command(ClientPdu::SysParam(param))
    }

    pub fn send_activate(&self, window_id: u32, enabled: bool) -> Result<()> {
        self.send_command(ClientPdu::Activate(ActivatePdu {
            window_id,
            enabled: u8::from(enabled),
        }))
    }

    pub fn send_syscommand(&self, window_id: u32, command: u16) -> Result<()> {
        self.send_command(ClientPdu::SysCommand(SysCommandPdu { window_id, command }))
    }

    pub fn send_notify_event(&self, window_id: u32, notify_icon_id: u32, message: u32) -> Result<()> {
        self.send_command(ClientPdu::NotifyEvent(NotifyEventPdu {
            window_id,
            notify_icon_id,
            message,
        }))
    }

    pub fn send_window_move(&self, window_id: u32, position: Rect16) -> Result<()> {
        self.send_command(ClientPdu::WindowMove(WindowMovePdu { window_id, position }))
    }

    pub fn send_system_menu(&self, window_id: u32, left: u16, top: u16) -> Result<()> {
        self.send_command(ClientPdu::SystemMenu(SystemMenuPdu {
            window_id,
            left,
            top,
        }))
    }

    pub fn send_langbar_info(&self, status: u32) -> Result<()> {
        self.send_command(ClientPdu::LangbarInfo(LangbarInfoPdu { status }))
    }

    pub fn send_get_appid_request(&self, window_id: u32) -> Result<()> {
        self.send_command(ClientPdu::GetAppIdRequest(GetAppIdRequestPdu { window_id }))
    }

    fn send_command(&self, pdu: ClientPdu) -> Result<()> {
        if self.state == HandshakeState::Terminated {
            return Err(self.invalid_state(order_name(pdu.order_type())));
        }
        self.session.send_pdu(&pdu)
    }

    fn send_exec(&self) -> Result<()> {
        let to_wire = |text: &str| UnicodeString::new(self.text.to_wire(text));
        let pdu = ExecPdu {
            flags: EXEC_FLAG_EXPAND_WORKINGDIRECTORY | EXEC_FLAG_EXPAND_ARGUMENTS,
            exe_or_file: to_wire(&self.config.exe_or_file),
            working_dir: to_wire(&self.config.working_dir),
            arguments: to_wire(&self.config.arguments),
        };
        tracing::debug!(
            exe_or_file = %self.config.exe_or_file,
            working_dir = %self.config.working_dir,
            "sending execute request"
        );
        self.session.send_pdu(&ClientPdu::Exec(pdu))
    }

    fn dispatch(&mut self, pdu: ServerPdu) -> Result<()> {
        use HandshakeState::{Established, Establishing};

        match pdu {
            ServerPdu::Handshake(handshake) => self.on_peer_handshake(handshake.build_number),
            ServerPdu::ExecResult(result) => self.on_exec_result(&result),
            ServerPdu::SysParam(param) => {
                // Servers send these before answering Execute.
                self.expect_state(&[Establishing, Established], "server sysparam")?;
                tracing::debug!(kind = param.kind(), enabled = param.enabled(), "server sysparam");
                self.notify(|sink| sink.on_server_sysparam(param));
                Ok(())
            }
            ServerPdu::MoveSize(move_size) => {
                self.expect_state(&[Established], "move/size")?;
                self.notify(|sink| sink.on_move_size(&move_size));
                Ok(())
            }
            ServerPdu::MinMaxInfo(info) => {
                self.expect_state(&[Established], "min/max info")?;
                self.notify(|sink| sink.on_min_max_info(&info));
                Ok(())
            }
            ServerPdu::LangbarInfo(langbar) => {
                self.expect_state(&[Established], "langbar info")?;
                self.notify(|sink| sink.on_langbar_info(langbar.status));
                Ok(())
            }
            ServerPdu::GetAppIdResponse(response) => {
                self.expect_state(&[Established], "app id response")?;
                log_app_id(&response);
                self.notify(|sink| sink.on_app_id_response(&response));
                Ok(())
            }
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn EventSink)) {
        if let Some(sink) = self.session.event_sink() {
            f(sink.as_ref());
        }
    }

    fn expect_state(&self, allowed: &[HandshakeState], event: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid_state(event))
        }
    }

    fn invalid_state(&self, event: &'static str) -> SessionError {
        SessionError::InvalidState {
            state: self.state,
            event,
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        tracing::info!(from = %self.state, to = %next, "rail session state change");
        self.state = next;
    }
}

impl fmt::Debug for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("state", &self.state)
            .field("peer_build_number", &self.peer_build_number)
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}

fn log_app_id(response: &GetAppIdResponsePdu) {
    tracing::trace!(
        window_id = response.window_id,
        app_id = %hex::encode(response.app_id.as_bytes()),
        "app id response"
    );
}
