//! The application-facing side of a session.
//!
//! The UI layer implements [`EventSink`] to observe the handshake and the
//! server's notifications. Every callback runs on the processing thread
//! and must not block for long.

use railchan_pdu::{
    ClientPdu, ClientSysParam, GetAppIdResponsePdu, MinMaxInfoPdu, MoveSizePdu, ServerSysParam,
    WindowOrder,
};

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Callbacks for inbound session events. All default to no-ops.
pub trait EventSink: Send + Sync {
    /// The client Handshake PDU was sent.
    fn on_handshake_sent(&self) {}

    /// The server's Handshake PDU arrived.
    fn on_handshake_received(&self, _build_number: u32) {}

    /// Push the client's initial system parameters.
    ///
    /// Called once during establishment, between the Client Information and
    /// Execute PDUs. Each [`SysParamPusher::push`] sends one PDU immediately.
    /// A failed push ends establishment before Execute is sent.
    fn on_push_initial_sysparams(&self, _pusher: &mut SysParamPusher<'_>) {}

    /// The server answered the Execute request.
    fn on_exec_result(&self, _exec_result: u16, _raw_result: u32) {}

    /// The session reached the established state.
    fn on_established(&self) {}

    fn on_server_sysparam(&self, _param: ServerSysParam) {}

    fn on_move_size(&self, _pdu: &MoveSizePdu) {}

    fn on_min_max_info(&self, _pdu: &MinMaxInfoPdu) {}

    fn on_langbar_info(&self, _status: u32) {}

    fn on_app_id_response(&self, _pdu: &GetAppIdResponsePdu) {}

    /// A windowing, notification icon or desktop order arrived.
    fn on_window_order(&self, _order: &WindowOrder) {}

    /// The byte sink rejected an outbound PDU.
    fn on_send_failed(&self, _order_type: u16, _error: &SessionError) {}

    /// The channel was torn down.
    fn on_terminated(&self) {}
}

/// Handle passed to [`EventSink::on_push_initial_sysparams`].
pub struct SysParamPusher<'a> {
    session: &'a Session,
    pushed: usize,
    failed: Option<SessionError>,
}

impl<'a> SysParamPusher<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self {
            session,
            pushed: 0,
            failed: None,
        }
    }

    /// Encode and send one Client System Parameters Update PDU.
    ///
    /// The send error itself goes to [`EventSink::on_send_failed`]. Once a
    /// push has failed, it and every later push return
    /// [`SessionError::SysParamPushAborted`] without sending.
    pub fn push(&mut self, param: ClientSysParam) -> Result<()> {
        if self.failed.is_some() {
            return Err(SessionError::SysParamPushAborted);
        }
        if let Err(err) = self.session.send_pdu(&ClientPdu::SysParam(param)) {
            self.failed = Some(err);
            return Err(SessionError::SysParamPushAborted);
        }
        self.pushed += 1;
        Ok(())
    }

    /// Number of parameters sent successfully.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// The error that stopped the push sequence, if any.
    pub(crate) fn into_failure(self) -> Option<SessionError> {
        self.failed
    }
}
