//! Realtime voice session: microphone frames up, provider audio down.
//!
//! The session is an explicit state machine (`Idle → Connecting →
//! Active → Closed`) driven by a channel of inbound [`LiveEvent`]s
//! from a [`LiveTransport`]. Teardown is one transition: any state can
//! reach `Closed`, and reaching it closes the sender and the playback
//! queue exactly once.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::audio::{base64, pcm16_from_f32, PcmPlayback};
use crate::error::GatewayError;

/// MIME tag for upstream microphone frames.
pub const MIC_MIME: &str = "audio/pcm;rate=16000";

/// Model serving the bidirectional voice endpoint.
pub const LIVE_VOICE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Prebuilt voice identity requested at session setup.
pub const DEFAULT_VOICE_NAME: &str = "Puck";

/// Instructional reply when voice is started without a credential.
pub const VOICE_MISSING_KEY_MESSAGE: &str =
    "Voice mode requires GEMINI_API_KEY (aistudio.google.com). \
     Set it in the environment and restart.";

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/\
    google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Connecting,
    Active,
    Closed,
}

/// Inbound session events, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Setup acknowledged; the session is live.
    Open,
    /// One inline media part from a server turn. `data` is base64.
    InlineAudio { mime_type: String, data: String },
    /// Transport or protocol failure. Terminal, no reconnect.
    Error(String),
    /// Orderly close from the peer. Terminal.
    Closed,
}

/// What the session declares when it connects.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: String,
    pub voice_name: String,
}

impl SessionConfig {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            model: LIVE_VOICE_MODEL.to_string(),
            system_instruction: system_instruction.into(),
            voice_name: DEFAULT_VOICE_NAME.to_string(),
        }
    }
}

/// Upstream half of a live session.
pub trait LiveSender: Send {
    /// Queue one realtime input frame. Best-effort: callers drop the
    /// frame on failure rather than aborting the session.
    fn send_realtime_input(&self, mime_type: &str, data_b64: &str) -> Result<(), GatewayError>;

    /// Request an orderly close. Must tolerate repeat calls.
    fn close(&mut self);
}

/// Connection factory. The production implementation speaks the
/// provider websocket; tests script the event stream.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    async fn connect(
        &self,
        api_key: &str,
        config: &SessionConfig,
    ) -> Result<(Box<dyn LiveSender>, mpsc::Receiver<LiveEvent>), GatewayError>;
}

/// One live session: sender, event stream, playback, state.
pub struct VoiceSession {
    sender: Box<dyn LiveSender>,
    events: mpsc::Receiver<LiveEvent>,
    playback: PcmPlayback,
    state: VoiceState,
}

impl VoiceSession {
    fn new(
        sender: Box<dyn LiveSender>,
        events: mpsc::Receiver<LiveEvent>,
        playback: PcmPlayback,
    ) -> Self {
        Self {
            sender,
            events,
            playback,
            state: VoiceState::Connecting,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Ship one captured microphone frame (f32 samples, 16 kHz mono).
    /// Send failures are swallowed; one dropped frame must not abort
    /// the session.
    pub fn send_mic_frame(&self, samples: &[f32]) {
        if self.state == VoiceState::Closed {
            return;
        }
        let encoded = base64::encode(&pcm16_from_f32(samples));
        if let Err(err) = self.sender.send_realtime_input(MIC_MIME, &encoded) {
            tracing::debug!(%err, "dropping mic frame");
        }
    }

    /// Await the next inbound event and apply it. Returns the state
    /// after the transition; a closed channel counts as `Closed`.
    pub async fn drive(&mut self) -> VoiceState {
        match self.events.recv().await {
            Some(event) => self.handle_event(event),
            None => self.close(),
        }
    }

    /// Apply every event already queued without blocking.
    pub fn pump(&mut self) -> VoiceState {
        while let Ok(event) = self.events.try_recv() {
            if self.handle_event(event) == VoiceState::Closed {
                break;
            }
        }
        self.state
    }

    fn handle_event(&mut self, event: LiveEvent) -> VoiceState {
        match event {
            LiveEvent::Open => {
                if self.state == VoiceState::Connecting {
                    self.state = VoiceState::Active;
                }
            }
            LiveEvent::InlineAudio { mime_type, data } => {
                if self.state == VoiceState::Closed || !mime_type.starts_with("audio/") {
                    return self.state;
                }
                match base64::decode(&data) {
                    Ok(bytes) => {
                        self.playback.play_pcm(&bytes);
                    }
                    Err(err) => tracing::warn!(%err, "discarding undecodable audio frame"),
                }
            }
            LiveEvent::Error(detail) => {
                tracing::warn!(%detail, "live session error");
                self.close();
            }
            LiveEvent::Closed => {
                self.close();
            }
        }
        self.state
    }

    /// Transition to `Closed` from any state: close the sender, close
    /// playback, stop accepting frames. Safe to call repeatedly.
    pub fn close(&mut self) -> VoiceState {
        if self.state != VoiceState::Closed {
            self.sender.close();
            self.playback.close();
            self.state = VoiceState::Closed;
        }
        self.state
    }
}

/// Owns at most one live session and the credential needed to open it.
pub struct VoiceController {
    transport: Box<dyn LiveTransport>,
    api_key: Option<String>,
    config: SessionConfig,
    session: Option<VoiceSession>,
}

impl VoiceController {
    pub fn new(
        transport: Box<dyn LiveTransport>,
        api_key: Option<String>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            api_key,
            config,
            session: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.state() != VoiceState::Closed)
    }

    /// Open a session. A session already running is closed first, so
    /// the microphone and output device never have two owners. With no
    /// credential configured this fails immediately with the
    /// instructional message and attempts no connection.
    pub async fn start(&mut self, playback: PcmPlayback) -> Result<&mut VoiceSession, String> {
        if self.is_active() {
            tracing::info!("closing previous voice session before starting a new one");
            self.stop();
        }
        let Some(api_key) = self.api_key.clone() else {
            return Err(VOICE_MISSING_KEY_MESSAGE.to_string());
        };

        let (sender, events) = self
            .transport
            .connect(&api_key, &self.config)
            .await
            .map_err(|err| err.user_message(crate::error::NETWORK_MESSAGE))?;
        Ok(self.session.insert(VoiceSession::new(sender, events, playback)))
    }

    pub fn session_mut(&mut self) -> Option<&mut VoiceSession> {
        self.session.as_mut()
    }

    /// Tear down the current session, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}

/// Production transport: the provider's bidirectional websocket.
///
/// After the socket opens, a setup frame declares the model, AUDIO
/// output modality, system instruction and voice identity. A reader
/// task translates server frames into [`LiveEvent`]s; a writer task
/// drains an unbounded outbound queue so `send_realtime_input` never
/// blocks the capture path.
pub struct GeminiLiveTransport {
    endpoint: String,
}

impl GeminiLiveTransport {
    pub fn new() -> Self {
        Self {
            endpoint: LIVE_ENDPOINT.to_string(),
        }
    }
}

impl Default for GeminiLiveTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveTransport for GeminiLiveTransport {
    async fn connect(
        &self,
        api_key: &str,
        config: &SessionConfig,
    ) -> Result<(Box<dyn LiveSender>, mpsc::Receiver<LiveEvent>), GatewayError> {
        let url = format!("{}?key={}", self.endpoint, api_key);
        let (socket, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|err| GatewayError::Network {
                detail: err.to_string(),
            })?;
        let (mut write, mut read) = socket.split();

        let setup = json!({
            "setup": {
                "model": config.model,
                "generationConfig": {
                    "responseModalities": ["AUDIO"],
                    "speechConfig": {
                        "voiceConfig": {
                            "prebuiltVoiceConfig": { "voiceName": config.voice_name }
                        }
                    }
                },
                "systemInstruction": {
                    "role": "user",
                    "parts": [{ "text": config.system_instruction }]
                }
            }
        });
        write
            .send(Message::Text(setup.to_string()))
            .await
            .map_err(|err| GatewayError::Network {
                detail: err.to_string(),
            })?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let closing = matches!(frame, Message::Close(_));
                if write.send(frame).await.is_err() || closing {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let events = match frame {
                    Ok(Message::Text(text)) => server_frame_events(text.as_bytes()),
                    // The endpoint ships JSON in binary frames too.
                    Ok(Message::Binary(bytes)) => server_frame_events(&bytes),
                    Ok(Message::Close(_)) => vec![LiveEvent::Closed],
                    Ok(_) => Vec::new(),
                    Err(err) => vec![LiveEvent::Error(err.to_string())],
                };
                for event in events {
                    let terminal = matches!(event, LiveEvent::Closed | LiveEvent::Error(_));
                    if event_tx.send(event).await.is_err() || terminal {
                        return;
                    }
                }
            }
            let _ = event_tx.send(LiveEvent::Closed).await;
        });

        Ok((Box::new(WsSender { out: out_tx }), event_rx))
    }
}

/// Translate one server frame into session events: `setupComplete`
/// acknowledges the session, `serverContent.modelTurn.parts[*]
/// .inlineData` carries audio. Unrecognized frames produce nothing.
fn server_frame_events(raw: &[u8]) -> Vec<LiveEvent> {
    let Ok(value) = serde_json::from_slice::<Value>(raw) else {
        return Vec::new();
    };
    if value.get("setupComplete").is_some() {
        return vec![LiveEvent::Open];
    }
    let Some(parts) = value
        .pointer("/serverContent/modelTurn/parts")
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    parts
        .iter()
        .filter_map(|part| {
            let blob = part.get("inlineData")?;
            Some(LiveEvent::InlineAudio {
                mime_type: blob.get("mimeType")?.as_str()?.to_string(),
                data: blob.get("data")?.as_str()?.to_string(),
            })
        })
        .collect()
}

struct WsSender {
    out: mpsc::UnboundedSender<Message>,
}

impl LiveSender for WsSender {
    fn send_realtime_input(&self, mime_type: &str, data_b64: &str) -> Result<(), GatewayError> {
        let frame = json!({
            "realtimeInput": {
                "audio": { "mimeType": mime_type, "data": data_b64 }
            }
        });
        self.out
            .send(Message::Text(frame.to_string()))
            .map_err(|_| GatewayError::Network {
                detail: "live session writer is gone".into(),
            })
    }

    fn close(&mut self) {
        let _ = self.out.send(Message::Close(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSink, Clock};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct NullClock;
    impl Clock for NullClock {
        fn now(&self) -> f64 {
            0.0
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        played: Arc<Mutex<Vec<Vec<f32>>>>,
        closed: Arc<AtomicBool>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, samples: Vec<f32>, _start: f64) {
            self.played.lock().unwrap().push(samples);
        }
        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct StubSender {
        frames: Arc<Mutex<Vec<(String, String)>>>,
        closed: Arc<AtomicBool>,
        fail: Arc<AtomicBool>,
    }

    impl LiveSender for StubSender {
        fn send_realtime_input(&self, mime: &str, data: &str) -> Result<(), GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Network {
                    detail: "socket gone".into(),
                });
            }
            self.frames.lock().unwrap().push((mime.into(), data.into()));
            Ok(())
        }
        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct StubTransport {
        sender: StubSender,
        script: Mutex<Vec<LiveEvent>>,
        connects: Arc<Mutex<usize>>,
    }

    impl StubTransport {
        fn new(sender: StubSender, script: Vec<LiveEvent>) -> Self {
            Self {
                sender,
                script: Mutex::new(script),
                connects: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl LiveTransport for StubTransport {
        async fn connect(
            &self,
            _api_key: &str,
            _config: &SessionConfig,
        ) -> Result<(Box<dyn LiveSender>, mpsc::Receiver<LiveEvent>), GatewayError> {
            *self.connects.lock().unwrap() += 1;
            let (tx, rx) = mpsc::channel(16);
            for event in self.script.lock().unwrap().drain(..) {
                tx.try_send(event).unwrap();
            }
            Ok((Box::new(self.sender.clone()), rx))
        }
    }

    fn playback(sink: &RecordingSink) -> PcmPlayback {
        PcmPlayback::new(Box::new(sink.clone()), Box::new(NullClock), 24_000)
    }

    #[tokio::test]
    async fn missing_key_rejects_without_connecting() {
        let sender = StubSender::default();
        let transport = StubTransport::new(sender, vec![]);
        let connects = transport.connects.clone();
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            None,
            SessionConfig::new("be helpful"),
        );

        let err = controller.start(playback(&sink)).await.err().unwrap();
        assert_eq!(err, VOICE_MISSING_KEY_MESSAGE);
        assert_eq!(*connects.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn open_then_audio_reaches_playback() {
        let sender = StubSender::default();
        let pcm = base64::encode(&[0x34, 0x12, 0x00, 0x80]);
        let transport = StubTransport::new(
            sender,
            vec![
                LiveEvent::Open,
                LiveEvent::InlineAudio {
                    mime_type: "audio/pcm;rate=24000".into(),
                    data: pcm,
                },
            ],
        );
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            Some("k".into()),
            SessionConfig::new("be helpful"),
        );

        let session = controller.start(playback(&sink)).await.unwrap();
        assert_eq!(session.state(), VoiceState::Connecting);
        assert_eq!(session.drive().await, VoiceState::Active);
        assert_eq!(session.drive().await, VoiceState::Active);

        let played = sink.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].len(), 2);
    }

    #[tokio::test]
    async fn non_audio_inline_data_is_ignored() {
        let sender = StubSender::default();
        let transport = StubTransport::new(
            sender,
            vec![
                LiveEvent::Open,
                LiveEvent::InlineAudio {
                    mime_type: "image/png".into(),
                    data: base64::encode(b"not audio"),
                },
            ],
        );
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            Some("k".into()),
            SessionConfig::new("x"),
        );
        let session = controller.start(playback(&sink)).await.unwrap();
        session.drive().await;
        session.drive().await;
        assert!(sink.played.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn error_event_closes_sender_and_playback() {
        let sender = StubSender::default();
        let sender_closed = sender.closed.clone();
        let transport =
            StubTransport::new(sender, vec![LiveEvent::Open, LiveEvent::Error("boom".into())]);
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            Some("k".into()),
            SessionConfig::new("x"),
        );
        let session = controller.start(playback(&sink)).await.unwrap();
        session.drive().await;
        assert_eq!(session.drive().await, VoiceState::Closed);
        assert!(sender_closed.load(Ordering::SeqCst));
        assert!(sink.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn mic_frames_are_base64_pcm_and_failures_are_swallowed() {
        let sender = StubSender::default();
        let frames = sender.frames.clone();
        let fail = sender.fail.clone();
        let transport = StubTransport::new(sender, vec![LiveEvent::Open]);
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            Some("k".into()),
            SessionConfig::new("x"),
        );
        let session = controller.start(playback(&sink)).await.unwrap();
        session.drive().await;

        session.send_mic_frame(&[0.0, 0.5, -0.5]);
        fail.store(true, Ordering::SeqCst);
        session.send_mic_frame(&[0.1]); // dropped, no panic

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, MIC_MIME);
        let bytes = base64::decode(&frames[0].1).unwrap();
        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 16384);
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_start_closes_previous_session() {
        let sender = StubSender::default();
        let sender_closed = sender.closed.clone();
        let transport =
            StubTransport::new(sender, vec![LiveEvent::Open, LiveEvent::Open]);
        let connects = transport.connects.clone();
        let sink = RecordingSink::default();
        let mut controller = VoiceController::new(
            Box::new(transport),
            Some("k".into()),
            SessionConfig::new("x"),
        );

        controller.stop(); // nothing open yet
        controller.start(playback(&sink)).await.unwrap();
        assert!(controller.is_active());

        // Second start tears down the first session before connecting.
        controller.start(playback(&sink)).await.unwrap();
        assert!(sender_closed.load(Ordering::SeqCst));
        assert_eq!(*connects.lock().unwrap(), 2);

        controller.stop();
        controller.stop();
        assert!(!controller.is_active());
    }

    #[test]
    fn server_frames_translate_to_events() {
        assert_eq!(
            server_frame_events(br#"{"setupComplete":{}}"#),
            vec![LiveEvent::Open]
        );

        let frame = json!({
            "serverContent": {
                "modelTurn": {
                    "parts": [
                        { "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": "AAAA" } },
                        { "text": "transcript fragment" }
                    ]
                }
            }
        });
        let events = server_frame_events(frame.to_string().as_bytes());
        assert_eq!(
            events,
            vec![LiveEvent::InlineAudio {
                mime_type: "audio/pcm;rate=24000".into(),
                data: "AAAA".into(),
            }]
        );

        assert!(server_frame_events(b"not json").is_empty());
        assert!(server_frame_events(br#"{"usageMetadata":{}}"#).is_empty());
    }
}
