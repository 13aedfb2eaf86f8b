//! Channel lifecycle: the host-facing entry point of a RAIL connection.
//!
//! [`RailChannel`] wires the inbound pipeline, the queue worker and the
//! handshake together. The host calls it from its read callback and its
//! connect/disconnect notifications; the handshake itself only runs on the
//! worker thread, or after the worker has stopped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use railchan_transport::{
    ByteSink, InboundPipeline, InboundQueue, QueueConfig, QueueWorker, ShutdownOutcome,
};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::event::EventSink;
use crate::handshake::{Handshake, HandshakeState};
use crate::session::Session;
use crate::text::TextCodec;

/// One item for the processing thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The transport reported the channel open.
    Connected,
    /// A complete RAIL channel PDU.
    ChannelPdu(Bytes),
    /// A windowing order from the graphics update stream.
    WindowOrder(Bytes),
}

impl From<Bytes> for Inbound {
    fn from(pdu: Bytes) -> Self {
        Self::ChannelPdu(pdu)
    }
}

/// A running RAIL channel.
pub struct RailChannel {
    pipeline: InboundPipeline<Inbound>,
    worker: Option<QueueWorker<Inbound>>,
    handshake: Arc<Mutex<Handshake>>,
    queued: AtomicUsize,
    processed: Arc<AtomicUsize>,
    queue_config: QueueConfig,
}

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

impl RailChannel {
    /// Open a channel with the default queue timings.
    pub fn open(
        config: SessionConfig,
        byte_sink: &Arc<dyn ByteSink>,
        event_sink: Arc<dyn EventSink>,
        text_codec: Arc<dyn TextCodec>,
    ) -> Result<Self> {
        Self::open_with_queue_config(
            config,
            QueueConfig::default(),
            byte_sink,
            event_sink,
            text_codec,
        )
    }

    /// Open a channel and start its processing thread.
    pub fn open_with_queue_config(
        config: SessionConfig,
        queue_config: QueueConfig,
        byte_sink: &Arc<dyn ByteSink>,
        event_sink: Arc<dyn EventSink>,
        text_codec: Arc<dyn TextCodec>,
    ) -> Result<Self> {
        let mut session = Session::new(&config, byte_sink);
        session.attach_event_sink(event_sink);
        let handshake = Arc::new(Mutex::new(Handshake::new(session, config, text_codec)));

        let queue = Arc::new(InboundQueue::new());
        let processed = Arc::new(AtomicUsize::new(0));
        let worker = {
            let handshake = Arc::clone(&handshake);
            let processed = Arc::clone(&processed);
            QueueWorker::spawn(Arc::clone(&queue), queue_config.clone(), move |item| {
                process(&mut lock(&handshake), item);
                processed.fetch_add(1, Ordering::AcqRel);
            })?
        };

        tracing::debug!("rail channel opened");
        Ok(Self {
            pipeline: InboundPipeline::new(queue),
            worker: Some(worker),
            handshake,
            queued: AtomicUsize::new(0),
            processed,
            queue_config,
        })
    }

    /// The transport finished connecting. The client Handshake is sent from
    /// the processing thread.
    pub fn connected(&self) -> Result<()> {
        self.pipeline.push(Inbound::Connected)?;
        self.queued.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Hand one chunk from the transport's read callback.
    ///
    /// Returns true when the chunk completed a PDU and it was queued.
    pub fn deliver_chunk(
        &mut self,
        chunk: &[u8],
        total_length: usize,
        is_first: bool,
        is_last: bool,
    ) -> Result<bool> {
        let complete = self
            .pipeline
            .deliver_chunk(chunk, total_length, is_first, is_last)?;
        if complete {
            self.queued.fetch_add(1, Ordering::AcqRel);
        }
        Ok(complete)
    }

    /// Queue one windowing order, starting at its OrderSize field.
    pub fn deliver_window_order(&self, order: &[u8]) -> Result<()> {
        self.pipeline
            .push(Inbound::WindowOrder(Bytes::copy_from_slice(order)))?;
        self.queued.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Wait until the worker has processed everything queued so far.
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.processed.load(Ordering::Acquire) >= self.queued.load(Ordering::Acquire) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    pub fn state(&self) -> HandshakeState {
        lock(&self.handshake).state()
    }

    /// Run `f` against the handshake, e.g. to issue commands or apply
    /// capability sets. Blocks while the worker is processing an item.
    pub fn with_handshake<R>(&self, f: impl FnOnce(&mut Handshake) -> R) -> R {
        f(&mut lock(&self.handshake))
    }

    /// Stop the worker, discarding anything still queued, then notify the
    /// event sink that the channel terminated.
    ///
    /// If the worker timed out while still holding the handshake, the
    /// notification is skipped once the shutdown poll budget runs out again.
    pub fn close(mut self) -> ShutdownOutcome {
        let outcome = self.stop();
        tracing::debug!(?outcome, "rail channel closed");
        outcome
    }

    fn stop(&mut self) -> ShutdownOutcome {
        let outcome = match self.worker.take() {
            Some(worker) => worker.shutdown(),
            None => ShutdownOutcome::Joined { discarded: 0 },
        };
        match outcome {
            ShutdownOutcome::Joined { .. } => lock(&self.handshake).on_channel_terminated(),
            ShutdownOutcome::TimedOut { .. } => match self.try_lock_detached() {
                Some(mut handshake) => handshake.on_channel_terminated(),
                None => tracing::warn!(
                    retries = self.queue_config.shutdown_retries,
                    "detached worker still holds the handshake, termination not reported"
                ),
            },
        }
        outcome
    }

    fn try_lock_detached(&self) -> Option<MutexGuard<'_, Handshake>> {
        let retries = self.queue_config.shutdown_retries;
        for attempt in 0..=retries {
            match self.handshake.try_lock() {
                Ok(guard) => return Some(guard),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) if attempt < retries => {
                    thread::sleep(self.queue_config.shutdown_poll_interval);
                }
                Err(TryLockError::WouldBlock) => {}
            }
        }
        None
    }
}

impl Drop for RailChannel {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

fn process(handshake: &mut Handshake, item: Inbound) {
    let (kind, result) = match item {
        Inbound::Connected => ("connected", handshake.on_channel_connected()),
        Inbound::ChannelPdu(pdu) => ("channel pdu", handshake.process_pdu(&pdu)),
        Inbound::WindowOrder(order) => ("window order", handshake.process_window_order(&order)),
    };
    if let Err(err) = result {
        tracing::warn!(kind, error = %err, "inbound item rejected");
    }
}

fn lock(handshake: &Mutex<Handshake>) -> MutexGuard<'_, Handshake> {
    handshake.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use railchan_pdu::order;
    use railchan_pdu::{
        decode_client_pdu, encode_server_pdu, encode_window_order, ExecResultPdu, HandshakePdu,
        LangbarInfoPdu, ServerPdu, WindowOrder, WindowRecord,
    };
    use railchan_transport::VecSink;

    use super::*;
    use crate::test_support::{Event, Recorder};
    use crate::text::Utf16Codec;

    fn open(initial_params: usize) -> (RailChannel, Arc<VecSink>, Arc<Recorder>) {
        let sink = Arc::new(VecSink::new());
        let byte_sink: Arc<dyn ByteSink> = sink.clone();
        let recorder = Arc::new(Recorder::with_initial_params(initial_params));
        let queue_config = QueueConfig {
            wait_timeout: Duration::from_millis(20),
            shutdown_retries: 100,
            shutdown_poll_interval: Duration::from_millis(10),
        };
        let channel = RailChannel::open_with_queue_config(
            SessionConfig::default(),
            queue_config,
            &byte_sink,
            recorder.clone(),
            Arc::new(Utf16Codec),
        )
        .unwrap();
        (channel, sink, recorder)
    }

    fn deliver(channel: &mut RailChannel, pdu: ServerPdu) {
        let bytes = encode_server_pdu(&pdu).unwrap();
        assert!(channel.deliver_chunk(&bytes, bytes.len(), true, true).unwrap());
    }

    fn deliver_in_two_chunks(channel: &mut RailChannel, pdu: ServerPdu) {
        let bytes = encode_server_pdu(&pdu).unwrap();
        let (head, tail) = bytes.split_at(3);
        assert!(!channel
            .deliver_chunk(head, bytes.len(), true, false)
            .unwrap());
        assert!(channel.deliver_chunk(tail, bytes.len(), false, true).unwrap());
    }

    fn drain(channel: &RailChannel) {
        assert!(channel.wait_idle(Duration::from_secs(5)), "worker did not drain");
    }

    fn establish(channel: &mut RailChannel) {
        channel.connected().unwrap();
        deliver_in_two_chunks(
            channel,
            ServerPdu::Handshake(HandshakePdu {
                build_number: 0x1771,
            }),
        );
        deliver(
            channel,
            ServerPdu::ExecResult(ExecResultPdu {
                exe_or_file: railchan_pdu::UnicodeString::from_utf16("||calc"),
                ..Default::default()
            }),
        );
        drain(channel);
        assert_eq!(channel.state(), HandshakeState::Established);
    }

    #[test]
    fn full_establishment_through_the_queue() {
        let (mut channel, sink, recorder) = open(2);
        establish(&mut channel);

        let orders: Vec<u16> = sink
            .sent()
            .iter()
            .map(|bytes| decode_client_pdu(bytes).unwrap().order_type())
            .collect();
        assert_eq!(
            orders,
            vec![
                order::HANDSHAKE,
                order::CLIENTSTATUS,
                order::SYSPARAM,
                order::SYSPARAM,
                order::EXEC,
            ]
        );
        assert_eq!(
            recorder.take(),
            vec![
                Event::HandshakeSent,
                Event::HandshakeReceived(0x1771),
                Event::InitialSysParams(2),
                Event::ExecResult(order::EXEC_S_OK, 0),
                Event::Established,
            ]
        );

        assert!(matches!(channel.close(), ShutdownOutcome::Joined { .. }));
        assert_eq!(recorder.take(), vec![Event::Terminated]);
    }

    #[test]
    fn channel_pdus_and_window_orders_keep_arrival_order() {
        let (mut channel, _sink, recorder) = open(0);
        establish(&mut channel);
        recorder.take();

        let order = WindowOrder::Window(WindowRecord::deleted(7));
        let order_bytes = encode_window_order(&order).unwrap();
        for status in 0..3 {
            deliver(&mut channel, ServerPdu::LangbarInfo(LangbarInfoPdu { status }));
            channel.deliver_window_order(&order_bytes).unwrap();
        }

        drain(&channel);
        let seen = recorder.take();
        let expected: Vec<Event> = (0..3)
            .flat_map(|status| [Event::LangbarInfo(status), Event::WindowOrder(order.clone())])
            .collect();
        assert_eq!(seen, expected);
        channel.close();
    }

    #[test]
    fn malformed_pdu_does_not_stop_the_worker() {
        let (mut channel, _sink, recorder) = open(0);
        establish(&mut channel);
        recorder.take();

        let garbage = [0x03u8, 0x00, 0x09, 0x00, 0xEF, 0xBE, 0x00, 0x00, 0x01];
        assert!(channel
            .deliver_chunk(&garbage, garbage.len(), true, true)
            .unwrap());
        deliver(&mut channel, ServerPdu::LangbarInfo(LangbarInfoPdu { status: 9 }));

        drain(&channel);
        assert_eq!(recorder.take(), vec![Event::LangbarInfo(9)]);
        channel.close();
    }

    #[test]
    fn commands_run_against_the_live_handshake() {
        let (mut channel, sink, _recorder) = open(0);
        establish(&mut channel);
        sink.take();

        channel
            .with_handshake(|handshake| handshake.send_get_appid_request(0x42))
            .unwrap();
        let sent = sink.take();
        assert_eq!(
            decode_client_pdu(&sent[0]).unwrap().order_type(),
            order::GET_APPID_REQ
        );
        channel.close();
    }

    #[test]
    fn reassembly_errors_surface_to_the_host() {
        let (mut channel, _sink, _recorder) = open(0);
        let err = channel.deliver_chunk(&[1, 2], 4, false, true).unwrap_err();
        assert!(matches!(err, crate::SessionError::Transport(_)));
        channel.close();
    }

    struct StuckLangbar {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl EventSink for StuckLangbar {
        fn on_langbar_info(&self, _status: u32) {
            let _ = self.entered.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
        }
    }

    #[test]
    fn close_returns_while_a_callback_holds_the_handshake() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let byte_sink: Arc<dyn ByteSink> = Arc::new(VecSink::new());
        let mut channel = RailChannel::open_with_queue_config(
            SessionConfig::default(),
            QueueConfig {
                wait_timeout: Duration::from_millis(20),
                shutdown_retries: 3,
                shutdown_poll_interval: Duration::from_millis(10),
            },
            &byte_sink,
            Arc::new(StuckLangbar {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            Arc::new(Utf16Codec),
        )
        .unwrap();
        establish(&mut channel);

        deliver(&mut channel, ServerPdu::LangbarInfo(LangbarInfoPdu { status: 1 }));
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || done_tx.send(channel.close()).unwrap());
        let outcome = done_rx
            .recv_timeout(Duration::from_secs(3))
            .expect("close blocked on the handshake");
        assert!(matches!(outcome, ShutdownOutcome::TimedOut { .. }));

        release_tx.send(()).unwrap();
    }

    #[test]
    fn duplicate_connect_is_rejected_without_stopping_the_worker() {
        let (mut channel, sink, recorder) = open(0);
        establish(&mut channel);
        recorder.take();
        sink.take();

        channel.connected().unwrap();
        deliver(&mut channel, ServerPdu::LangbarInfo(LangbarInfoPdu { status: 4 }));
        drain(&channel);

        assert!(sink.take().is_empty());
        assert_eq!(recorder.take(), vec![Event::LangbarInfo(4)]);
        assert_eq!(channel.state(), HandshakeState::Established);
        channel.close();
    }

    #[test]
    fn drop_terminates_the_session() {
        let (channel, _sink, recorder) = open(0);
        drop(channel);
        assert_eq!(recorder.take(), vec![Event::Terminated]);
    }
}
