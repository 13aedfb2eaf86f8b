use std::fmt;
use std::sync::{Arc, Weak};

use railchan_pdu::{encode_client_pdu, order_name, ClientPdu};
use railchan_transport::ByteSink;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::event::EventSink;

/// Per-connection state: negotiated capabilities and the two sinks.
///
/// The session never owns the byte sink; once its owner drops it, sends
/// fail with [`SessionError::SinkDetached`].
pub struct Session {
    pub(crate) rail_mode_supported: bool,
    pub(crate) docked_langbar_supported: bool,
    pub(crate) window_level_supported: bool,
    pub(crate) window_level_ex_supported: bool,
    pub(crate) icon_cache_count: u8,
    pub(crate) icon_cache_entries: u16,
    byte_sink: Weak<dyn ByteSink>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Session {
    /// Session with no negotiated capabilities and the configured icon
    /// cache proposal.
    pub fn new(config: &SessionConfig, byte_sink: &Arc<dyn ByteSink>) -> Self {
        Self {
            rail_mode_supported: false,
            docked_langbar_supported: false,
            window_level_supported: false,
            window_level_ex_supported: false,
            icon_cache_count: config.icon_cache_count,
            icon_cache_entries: config.icon_cache_entries,
            byte_sink: Arc::downgrade(byte_sink),
            event_sink: None,
        }
    }

    pub fn rail_mode_supported(&self) -> bool {
        self.rail_mode_supported
    }

    pub fn docked_langbar_supported(&self) -> bool {
        self.docked_langbar_supported
    }

    pub fn window_level_supported(&self) -> bool {
        self.window_level_supported
    }

    pub fn window_level_ex_supported(&self) -> bool {
        self.window_level_ex_supported
    }

    pub fn icon_cache_count(&self) -> u8 {
        self.icon_cache_count
    }

    pub fn icon_cache_entries(&self) -> u16 {
        self.icon_cache_entries
    }

    /// Install the event listener.
    ///
    /// Attaching the listener that is already installed is a no-op; any
    /// other listener replaces it.
    pub fn attach_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        match &self.event_sink {
            Some(current) if Arc::ptr_eq(current, &sink) => {}
            Some(_) => {
                tracing::warn!("replacing attached event sink");
                self.event_sink = Some(sink);
            }
            None => self.event_sink = Some(sink),
        }
    }

    pub fn event_sink(&self) -> Option<&Arc<dyn EventSink>> {
        self.event_sink.as_ref()
    }

    /// Encode and send one client PDU.
    ///
    /// Encode failures are returned only. Sink failures are also reported
    /// through [`EventSink::on_send_failed`].
    pub fn send_pdu(&self, pdu: &ClientPdu) -> Result<()> {
        let order_type = pdu.order_type();
        let bytes = encode_client_pdu(pdu)?;
        let len = bytes.len();

        let result = match self.byte_sink.upgrade() {
            Some(sink) => sink.send(bytes).map_err(SessionError::from),
            None => Err(SessionError::SinkDetached),
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    order_type,
                    order = order_name(order_type),
                    len,
                    "sent PDU"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    order_type,
                    order = order_name(order_type),
                    error = %err,
                    "failed to send PDU"
                );
                if let Some(sink) = &self.event_sink {
                    sink.on_send_failed(order_type, &err);
                }
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("rail_mode_supported", &self.rail_mode_supported)
            .field("docked_langbar_supported", &self.docked_langbar_supported)
            .field("window_level_supported", &self.window_level_supported)
            .field("window_level_ex_supported", &self.window_level_ex_supported)
            .field("icon_cache_count", &self.icon_cache_count)
            .field("icon_cache_entries", &self.icon_cache_entries)
            .field("byte_sink_attached", &(self.byte_sink.strong_count() > 0))
            .field("event_sink_attached", &self.event_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use railchan_pdu::{decode_client_pdu, ActivatePdu};
    use railchan_transport::VecSink;

    use super::*;

    #[derive(Default)]
    struct FailureLog(Mutex<Vec<u16>>);

    impl EventSink for FailureLog {
        fn on_send_failed(&self, order_type: u16, _error: &SessionError) {
            self.0.lock().unwrap().push(order_type);
        }
    }

    fn activate() -> ClientPdu {
        ClientPdu::Activate(ActivatePdu {
            window_id: 1,
            enabled: 1,
        })
    }

    #[test]
    fn fresh_session_has_safe_defaults() {
        let sink: Arc<dyn ByteSink> = Arc::new(VecSink::new());
        let session = Session::new(&SessionConfig::default(), &sink);
        assert!(!session.rail_mode_supported());
        assert!(!session.docked_langbar_supported());
        assert!(!session.window_level_supported());
        assert!(!session.window_level_ex_supported());
        assert_eq!(session.icon_cache_count(), 2);
        assert_eq!(session.icon_cache_entries(), 10);
        assert!(session.event_sink().is_none());
    }

    #[test]
    fn send_pdu_writes_encoded_bytes() {
        let vec_sink = Arc::new(VecSink::new());
        let sink: Arc<dyn ByteSink> = vec_sink.clone();
        let session = Session::new(&SessionConfig::default(), &sink);

        session.send_pdu(&activate()).unwrap();

        let sent = vec_sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(decode_client_pdu(&sent[0]).unwrap(), activate());
    }

    #[test]
    fn dropped_sink_is_reported() {
        let sink: Arc<dyn ByteSink> = Arc::new(VecSink::new());
        let mut session = Session::new(&SessionConfig::default(), &sink);
        let log = Arc::new(FailureLog::default());
        session.attach_event_sink(log.clone());
        drop(sink);

        let err = session.send_pdu(&activate()).unwrap_err();
        assert!(matches!(err, SessionError::SinkDetached));
        assert_eq!(*log.0.lock().unwrap(), vec![railchan_pdu::order::ACTIVATE]);
    }

    #[test]
    fn closed_sink_surfaces_transport_error() {
        let vec_sink = Arc::new(VecSink::new());
        let sink: Arc<dyn ByteSink> = vec_sink.clone();
        let session = Session::new(&SessionConfig::default(), &sink);
        vec_sink.close();

        let err = session.send_pdu(&activate()).unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn attach_same_sink_is_idempotent() {
        let sink: Arc<dyn ByteSink> = Arc::new(VecSink::new());
        let mut session = Session::new(&SessionConfig::default(), &sink);
        let first: Arc<dyn EventSink> = Arc::new(FailureLog::default());
        session.attach_event_sink(first.clone());
        session.attach_event_sink(first.clone());
        assert!(Arc::ptr_eq(session.event_sink().unwrap(), &first));

        let second: Arc<dyn EventSink> = Arc::new(FailureLog::default());
        session.attach_event_sink(second.clone());
        assert!(Arc::ptr_eq(session.event_sink().unwrap(), &second));
    }
}
