use std::sync::Mutex;

use railchan_pdu::{default_initial_sysparams, ServerSysParam, WindowOrder};

use crate::error::SessionError;
use crate::event::{EventSink, SysParamPusher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    HandshakeSent,
    HandshakeReceived(u32),
    InitialSysParams(usize),
    ExecResult(u16, u32),
    Established,
    ServerSysParam(ServerSysParam),
    LangbarInfo(u32),
    WindowOrder(WindowOrder),
    SendFailed(u16),
    Terminated,
}

/// Event sink that records every callback it receives.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    initial_params: usize,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub(crate) fn with_initial_params(initial_params: usize) -> Self {
        Self {
            initial_params,
            events: Mutex::default(),
        }
    }

    pub(crate) fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl EventSink for Recorder {
    fn on_handshake_sent(&self) {
        self.record(Event::HandshakeSent);
    }

    fn on_handshake_received(&self, build_number: u32) {
        self.record(Event::HandshakeReceived(build_number));
    }

    fn on_push_initial_sysparams(&self, pusher: &mut SysParamPusher<'_>) {
        for param in default_initial_sysparams()
            .into_iter()
            .cycle()
            .take(self.initial_params)
        {
            if pusher.push(param).is_err() {
                break;
            }
        }
        self.record(Event::InitialSysParams(pusher.pushed()));
    }

    fn on_exec_result(&self, exec_result: u16, raw_result: u32) {
        self.record(Event::ExecResult(exec_result, raw_result));
    }

    fn on_established(&self) {
        self.record(Event::Established);
    }

    fn on_server_sysparam(&self, param: ServerSysParam) {
        self.record(Event::ServerSysParam(param));
    }

    fn on_langbar_info(&self, status: u32) {
        self.record(Event::LangbarInfo(status));
    }

    fn on_window_order(&self, order: &WindowOrder) {
        self.record(Event::WindowOrder(order.clone()));
    }

    fn on_send_failed(&self, order_type: u16, _error: &SessionError) {
        self.record(Event::SendFailed(order_type));
    }

    fn on_terminated(&self) {
        self.record(Event::Terminated);
    }
}
