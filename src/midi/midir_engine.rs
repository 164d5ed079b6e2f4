use crate::midi::{MidiEngine, MidiError, Result};
use crossbeam::channel::{unbounded, Receiver};
use log::info;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

const CLIENT_NAME: &str = "mtcsyncrs";

pub struct MidirEngine {
    // held to keep the input callback alive
    _input: Option<MidiInputConnection<()>>,
    output: Option<MidiOutputConnection>,
    rx: Option<Receiver<Vec<u8>>>,
}

impl MidirEngine {
    /// Connects to the first input and output ports whose names contain the
    /// given strings. Either side may be omitted.
    pub fn new(input_device: Option<String>, output_device: Option<String>) -> Result<Self> {
        let (input, rx) = match &input_device {
            Some(name) => {
                let mut midi_in = MidiInput::new(&format!("{}-in", CLIENT_NAME))?;
                // MTC quarter-frames and SysEx are filtered by default
                midi_in.ignore(Ignore::None);

                let in_ports = midi_in.ports();
                let in_port = in_ports
                    .iter()
                    .find(|p| midi_in.port_name(p).unwrap_or_default().contains(name.as_str()))
                    .ok_or_else(|| {
                        MidiError::ConnectionError(format!("Input device '{}' not found", name))
                    })?;

                let (tx, rx) = unbounded();
                let input = midi_in.connect(
                    in_port,
                    &format!("{}-input", CLIENT_NAME),
                    move |_stamp, message, _| {
                        let _ = tx.send(message.to_vec());
                    },
                    (),
                )?;
                info!("Listening for MTC on '{}'", name);
                (Some(input), Some(rx))
            }
            None => (None, None),
        };

        let output = match &output_device {
            Some(name) => {
                let midi_out = MidiOutput::new(&format!("{}-out", CLIENT_NAME))?;

                let out_ports = midi_out.ports();
                let out_port = out_ports
                    .iter()
                    .find(|p| midi_out.port_name(p).unwrap_or_default().contains(name.as_str()))
                    .ok_or_else(|| {
                        MidiError::ConnectionError(format!("Output device '{}' not found", name))
                    })?;
                info!("Sending MTC to '{}'", name);
                Some(midi_out.connect(out_port, &format!("{}-output", CLIENT_NAME))?)
            }
            None => None,
        };

        Ok(MidirEngine {
            _input: input,
            output,
            rx,
        })
    }

    /// Input and output port names, without duplicates.
    pub fn available_devices() -> Vec<String> {
        let mut devices = Vec::new();

        if let Ok(midi_in) = MidiInput::new(&format!("{}-list", CLIENT_NAME)) {
            for port in midi_in.ports() {
                if let Ok(name) = midi_in.port_name(&port) {
                    devices.push(name);
                }
            }
        }

        if let Ok(midi_out) = MidiOutput::new(&format!("{}-list", CLIENT_NAME)) {
            for port in midi_out.ports() {
                if let Ok(name) = midi_out.port_name(&port) {
                    if !devices.contains(&name) {
                        devices.push(name);
                    }
                }
            }
        }

        devices
    }
}

impl MidiEngine for MidirEngine {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.output {
            Some(output) => Ok(output.send(bytes)?),
            None => Err(MidiError::SendError("No output connection".into())),
        }
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        match &self.rx {
            Some(rx) => rx
                .recv()
                .map_err(|e| MidiError::RecvError(e.to_string())),
            None => Err(MidiError::RecvError("No input connection".into())),
        }
    }

    fn list_devices(&self) -> Vec<String> {
        Self::available_devices()
    }
}
