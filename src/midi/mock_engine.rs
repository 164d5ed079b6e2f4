use crate::midi::{MidiEngine, MidiError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory engine. Plays back a scripted inbound queue and records
/// everything sent.
#[derive(Default)]
pub struct MockMidiEngine {
    inbound: VecDeque<Vec<u8>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockMidiEngine {
    pub fn new(_device_name: Option<String>) -> Result<Self> {
        Ok(MockMidiEngine::default())
    }

    pub fn with_inbound<I>(messages: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        MockMidiEngine {
            inbound: messages.into_iter().collect(),
            sent: Arc::default(),
        }
    }

    /// Shared view of the sent messages, usable after the engine moves.
    pub fn sent(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.sent.clone()
    }
}

impl MidiEngine for MockMidiEngine {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| MidiError::SendError("mock output poisoned".into()))?
            .push(bytes.to_vec());
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        self.inbound
            .pop_front()
            .ok_or_else(|| MidiError::RecvError("No more scripted messages".into()))
    }

    fn list_devices(&self) -> Vec<String> {
        vec!["Mock Device 1".to_string(), "Mock Device 2".to_string()]
    }
}
