// ============================================================
// Layer 2 — ServeUseCase
// ============================================================
// Blocking TCP inference server.
//
//   bind ──► accept ──► read message ──► classify ──► reply
//              ▲              │                          │
//              │              └──── repeat until EOF ◄───┘
//              └──── next connection
//
// One connection is handled to completion before the next is
// accepted. A missing or mismatched model does not stop the
// server: it keeps answering with the "no model" sentinel.
// A broken connection only ends that connection.

use anyhow::{Context, Result};
use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    path::PathBuf,
};

use crate::domain::architecture::Architecture;
use crate::domain::traits::Classifier;
use crate::infra::wire::{format_response, Message, MessageReader, WireFormat, CLASSIFY_ERROR_RESPONSE};
use crate::ml::inferencer::Inferencer;

/// Address the gesture capture client connects to.
pub const DEFAULT_ADDR: &str = "127.0.0.1:65432";

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub addr:            String,
    pub model_path:      PathBuf,
    pub architecture:    Architecture,
    pub wire:            WireFormat,
    /// Stop after this many connections (`None` = serve forever)
    pub max_connections: Option<usize>,
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub classified: usize,
    pub discarded:  usize,
    pub failed:     usize,
}

pub struct ServeUseCase {
    config: ServeConfig,
}

impl ServeUseCase {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        let inferencer = match Inferencer::from_checkpoint(&cfg.model_path, cfg.architecture) {
            Ok(inferencer) => inferencer,
            Err(e) => {
                tracing::warn!("No model loaded ({:#}); every request gets the sentinel reply", e);
                Inferencer::empty(cfg.architecture)
            }
        };

        let listener = TcpListener::bind(&cfg.addr).with_context(|| format!("Cannot bind '{}'", cfg.addr))?;
        tracing::info!(
            "Listening on {} ({:?} wire, {} values per window, model loaded: {})",
            listener.local_addr()?,
            cfg.wire,
            inferencer.window_len(),
            inferencer.is_loaded()
        );
        self.serve(&listener, &inferencer)
    }

    /// Accept loop over an already-bound listener.
    pub fn serve<C: Classifier>(&self, listener: &TcpListener, classifier: &C) -> Result<()> {
        let mut handled = 0usize;
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "unknown".into());
                    tracing::info!("Connection from {}", peer);
                    match handle_connection(stream, classifier, self.config.wire) {
                        Ok(stats) => tracing::info!(
                            "{} closed: {} classified, {} discarded, {} failed",
                            peer,
                            stats.classified,
                            stats.discarded,
                            stats.failed
                        ),
                        Err(e) => tracing::warn!("{} ended with error: {:#}", peer, e),
                    }
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }

            handled += 1;
            if self.config.max_connections.map_or(false, |max| handled >= max) {
                break;
            }
        }
        Ok(())
    }
}

fn handle_connection<C: Classifier>(stream: TcpStream, classifier: &C, wire: WireFormat) -> Result<SessionStats> {
    let reader = BufReader::new(stream.try_clone().context("Cannot clone connection")?);
    handle_session(reader, stream, classifier, wire)
}

/// Answer every message on one connection until the peer closes it.
pub fn handle_session<C, R, W>(reader: R, mut writer: W, classifier: &C, wire: WireFormat) -> Result<SessionStats>
where
    C: Classifier + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut messages = MessageReader::new(reader, wire, classifier.window_len());
    let mut stats = SessionStats::default();

    while let Some(message) = messages.next_message()? {
        match message {
            Message::Window(values) => {
                let response = match classifier.classify(&values) {
                    Ok(result) => {
                        stats.classified += 1;
                        format_response(result.as_ref())
                    }
                    Err(e) => {
                        tracing::warn!("Classification failed: {}", e);
                        stats.failed += 1;
                        CLASSIFY_ERROR_RESPONSE.to_string()
                    }
                };
                writer.write_all(response.as_bytes())?;
                writer.flush()?;
            }
            Message::Discarded { declared, expected } => {
                tracing::warn!("Discarded a {}-byte message, expected {} bytes", declared, expected);
                stats.discarded += 1;
            }
        }
    }
    Ok(stats)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{TcnError, TcnResult};
    use crate::domain::sample::Classification;
    use crate::infra::wire::tests::encode_window;
    use std::io::{Cursor, Read};

    /// Picks class = number of positive values, confidence 0.5.
    struct CountingClassifier;

    impl Classifier for CountingClassifier {
        fn window_len(&self) -> usize {
            3
        }

        fn classify(&self, window: &[f32]) -> TcnResult<Option<Classification>> {
            let positives = window.iter().filter(|&&v| v > 0.0).count();
            Ok(Some(Classification { class_index: positives, confidence: 0.5 }))
        }
    }

    /// A loaded model that rejects every window.
    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn window_len(&self) -> usize {
            3
        }

        fn classify(&self, window: &[f32]) -> TcnResult<Option<Classification>> {
            Err(TcnError::DimensionMismatch { expected: 4, actual: window.len() })
        }
    }

    #[test]
    fn test_session_answers_each_window() {
        let mut input = encode_window(&[1.0, 1.0, -1.0]);
        input.extend(encode_window(&[0.0, 0.0]));
        input.extend(encode_window(&[1.0, 1.0, 1.0]));

        let mut output = Vec::new();
        let stats = handle_session(Cursor::new(input), &mut output, &CountingClassifier, WireFormat::Binary).unwrap();

        assert_eq!(stats, SessionStats { classified: 2, discarded: 1, failed: 0 });
        assert_eq!(String::from_utf8(output).unwrap(), "2,0.5000\n3,0.5000\n");
    }

    #[test]
    fn test_text_session() {
        let mut output = Vec::new();
        handle_session(Cursor::new("1,2,3\n-1 0 5\n"), &mut output, &CountingClassifier, WireFormat::Text).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "3,0.5000\n1,0.5000\n");
    }

    #[test]
    fn test_unloaded_model_answers_sentinel() {
        let arch = Architecture::new(1, 3, 1, 1, 2, 1).unwrap();
        let mut output = Vec::new();
        let input = encode_window(&[0.1, 0.2, 0.3]);
        handle_session(Cursor::new(input), &mut output, &Inferencer::empty(arch), WireFormat::Binary).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "-1,0.0000\n");
    }

    #[test]
    fn test_classification_error_is_not_the_no_model_reply() {
        let mut output = Vec::new();
        let input = encode_window(&[0.1, 0.2, 0.3]);
        let stats = handle_session(Cursor::new(input), &mut output, &FailingClassifier, WireFormat::Binary).unwrap();

        assert_eq!(stats, SessionStats { classified: 0, discarded: 0, failed: 1 });
        assert_eq!(String::from_utf8(output).unwrap(), "-2,0.0000\n");
    }

    #[test]
    fn test_tcp_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ServeUseCase::new(ServeConfig {
            addr: addr.to_string(),
            model_path: PathBuf::from("unused"),
            architecture: Architecture::default(),
            wire: WireFormat::Binary,
            max_connections: Some(1),
        });

        let handle = std::thread::spawn(move || server.serve(&listener, &CountingClassifier));

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(&encode_window(&[1.0, -1.0, 1.0])).unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();
        let mut reply = String::new();
        client.read_to_string(&mut reply).unwrap();

        assert_eq!(reply, "2,0.5000\n");
        handle.join().unwrap().unwrap();
    }
}
