//! Playback backends — the capability seam between the synthesis
//! engine and whatever actually makes sound.
//!
//! The host selects one backend at startup (explicit configuration, no
//! runtime type checks): the synthesized backend renders WAV data-URI
//! assets and hands them to a host [`AudioSink`] (e.g. an HTML audio
//! element), the native MIDI backend forwards note on/off to a host
//! [`MidiOut`] plugin, and the file-sample backend plays pre-rendered
//! assets from a pitch-indexed table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::dsp::harmonics::Synth;
use crate::dsp::renderer::{AudioAsset, encode_asset};
use crate::dsp::tuning::{midi_to_frequency, velocity_to_amplitude};
use crate::error::SynthError;

/// Host-side seam for sounding an encoded asset.
///
/// Handles identify one playing asset; the sink owns the element
/// lifecycle (created on play, released on stop or natural completion).
pub trait AudioSink: Send {
    /// Does the platform support audio playback at all?
    fn is_available(&self) -> bool {
        true
    }
    /// Begin playback of `asset` under `handle`.
    fn play(&mut self, handle: u64, asset: &AudioAsset) -> Result<(), SynthError>;
    /// Halt playback of `handle`. Unknown handles are a no-op.
    fn stop(&mut self, handle: u64);
    /// Scale the gain of all current and future assets. `level` is
    /// already clamped to [0, 1] by the player.
    fn set_volume(&mut self, level: f64);
}

/// Host-side seam for a native MIDI output plugin.
pub trait MidiOut: Send {
    fn is_available(&self) -> bool {
        true
    }
    fn note_on(&mut self, pitch: u8, velocity: u8) -> Result<(), SynthError>;
    fn note_off(&mut self, pitch: u8);
    /// Channel volume change. Plugins without volume control may ignore it.
    fn channel_volume(&mut self, _level: f64) {}
}

/// Which playback capability a host configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Synthesized,
    NativeMidi,
    FileSample,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Synthesized => "synthesized",
            BackendKind::NativeMidi => "native-midi",
            BackendKind::FileSample => "file-sample",
        }
    }
}

/// A playback capability. One implementation is selected at startup;
/// the player never branches on the concrete type afterwards.
pub trait PlaybackBackend: Send {
    fn kind(&self) -> BackendKind;
    fn is_available(&self) -> bool;
    /// Start one note for `duration` seconds.
    fn start_note(&mut self, pitch: u8, velocity: u8, duration: f64) -> Result<(), SynthError>;
    /// Start all pitches as one simultaneous chord.
    fn start_chord(&mut self, pitches: &[u8], velocity: u8, duration: f64)
    -> Result<(), SynthError>;
    /// Halt a pitch (and any chord it belongs to). Unknown pitches are a no-op.
    fn stop_note(&mut self, pitch: u8);
    fn stop_all(&mut self);
    fn set_volume(&mut self, level: f64);
}

/// Startup selection of a backend, with whatever host seams it needs.
pub enum BackendSpec {
    /// Render notes procedurally and play them through an [`AudioSink`].
    Synthesized {
        config: SynthConfig,
        sink: Box<dyn AudioSink>,
    },
    /// Forward note on/off to a native MIDI plugin.
    NativeMidi { out: Box<dyn MidiOut> },
    /// Play pre-rendered assets, keyed by pitch, through an [`AudioSink`].
    FileSample {
        sink: Box<dyn AudioSink>,
        table: HashMap<u8, AudioAsset>,
    },
}

impl BackendSpec {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendSpec::Synthesized { .. } => BackendKind::Synthesized,
            BackendSpec::NativeMidi { .. } => BackendKind::NativeMidi,
            BackendSpec::FileSample { .. } => BackendKind::FileSample,
        }
    }

    pub fn build(self) -> Box<dyn PlaybackBackend> {
        match self {
            BackendSpec::Synthesized { config, sink } => {
                Box::new(SynthesizedBackend::new(config, sink))
            }
            BackendSpec::NativeMidi { out } => Box::new(NativeMidiBackend::new(out)),
            BackendSpec::FileSample { sink, table } => {
                Box::new(FileSampleBackend::new(sink, table))
            }
        }
    }
}

// ── Synthesized backend ─────────────────────────────────────

/// Renders notes and chords on the fly and plays the encoded assets
/// through the host sink.
pub struct SynthesizedBackend {
    synth: Synth,
    sink: Box<dyn AudioSink>,
    /// Sink handle per sounding single note.
    notes: HashMap<u8, u64>,
    /// Sink handle and member pitches per sounding chord.
    chords: Vec<(u64, Vec<u8>)>,
    next_handle: u64,
}

impl SynthesizedBackend {
    pub fn new(config: SynthConfig, sink: Box<dyn AudioSink>) -> Self {
        SynthesizedBackend {
            synth: Synth::new(config),
            sink,
            notes: HashMap::new(),
            chords: Vec::new(),
            next_handle: 0,
        }
    }

    fn alloc_handle(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }
}

impl PlaybackBackend for SynthesizedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Synthesized
    }

    fn is_available(&self) -> bool {
        self.sink.is_available()
    }

    fn start_note(&mut self, pitch: u8, velocity: u8, duration: f64) -> Result<(), SynthError> {
        let config = self.synth.config();
        let frequency = midi_to_frequency(pitch, config.tuning_pitch);
        let amplitude = velocity_to_amplitude(velocity);
        let sample_rate = config.sample_rate;

        let samples = self.synth.synthesize_note(frequency, duration, amplitude)?;
        let asset = encode_asset(&samples, sample_rate)?;

        let handle = self.alloc_handle();
        self.sink.play(handle, &asset)?;
        if let Some(old) = self.notes.insert(pitch, handle) {
            self.sink.stop(old);
        }
        Ok(())
    }

    fn start_chord(
        &mut self,
        pitches: &[u8],
        velocity: u8,
        duration: f64,
    ) -> Result<(), SynthError> {
        let config = self.synth.config();
        let tuning = config.tuning_pitch;
        let sample_rate = config.sample_rate;
        let frequencies: Vec<f64> = pitches
            .iter()
            .map(|&p| midi_to_frequency(p, tuning))
            .collect();
        let amplitude = velocity_to_amplitude(velocity);

        let samples = self
            .synth
            .synthesize_chord(&frequencies, duration, amplitude)?;
        let asset = encode_asset(&samples, sample_rate)?;

        let handle = self.alloc_handle();
        self.sink.play(handle, &asset)?;
        self.chords.push((handle, pitches.to_vec()));
        Ok(())
    }

    fn stop_note(&mut self, pitch: u8) {
        if let Some(handle) = self.notes.remove(&pitch) {
            self.sink.stop(handle);
        }
        // A chord is one asset; stopping any member halts the whole asset.
        let sink = &mut self.sink;
        self.chords.retain(|(handle, members)| {
            if members.contains(&pitch) {
                sink.stop(*handle);
                false
            } else {
                true
            }
        });
    }

    fn stop_all(&mut self) {
        for (_, handle) in self.notes.drain() {
            self.sink.stop(handle);
        }
        for (handle, _) in self.chords.drain(..) {
            self.sink.stop(handle);
        }
    }

    fn set_volume(&mut self, level: f64) {
        self.sink.set_volume(level);
    }
}

// ── Native MIDI backend ─────────────────────────────────────

/// Forwards note on/off to a host MIDI plugin. Durations are enforced
/// by the player's timers, not by the plugin.
pub struct NativeMidiBackend {
    out: Box<dyn MidiOut>,
}

impl NativeMidiBackend {
    pub fn new(out: Box<dyn MidiOut>) -> Self {
        NativeMidiBackend { out }
    }
}

impl PlaybackBackend for NativeMidiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeMidi
    }

    fn is_available(&self) -> bool {
        self.out.is_available()
    }

    fn start_note(&mut self, pitch: u8, velocity: u8, _duration: f64) -> Result<(), SynthError> {
        self.out.note_on(pitch, velocity)
    }

    fn start_chord(
        &mut self,
        pitches: &[u8],
        velocity: u8,
        _duration: f64,
    ) -> Result<(), SynthError> {
        for (i, &pitch) in pitches.iter().enumerate() {
            if let Err(e) = self.out.note_on(pitch, velocity) {
                // Roll back the members already sounding so a failed
                // chord leaves nothing ringing.
                for &started in &pitches[..i] {
                    self.out.note_off(started);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn stop_note(&mut self, pitch: u8) {
        self.out.note_off(pitch);
    }

    fn stop_all(&mut self) {
        for pitch in 0..=127 {
            self.out.note_off(pitch);
        }
    }

    fn set_volume(&mut self, level: f64) {
        self.out.channel_volume(level);
    }
}

// ── File-sample backend ─────────────────────────────────────

/// Plays pre-rendered per-pitch assets through the host sink. Chords
/// are layered from the individual per-pitch assets.
pub struct FileSampleBackend {
    sink: Box<dyn AudioSink>,
    table: HashMap<u8, AudioAsset>,
    notes: HashMap<u8, u64>,
    next_handle: u64,
}

impl FileSampleBackend {
    pub fn new(sink: Box<dyn AudioSink>, table: HashMap<u8, AudioAsset>) -> Self {
        FileSampleBackend {
            sink,
            table,
            notes: HashMap::new(),
            next_handle: 0,
        }
    }

    fn play_pitch(&mut self, pitch: u8) -> Result<(), SynthError> {
        let asset = self.table.get(&pitch).ok_or(SynthError::Playback {
            pitch,
            detail: "no sample loaded for pitch".to_string(),
        })?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.sink.play(handle, asset)?;
        if let Some(old) = self.notes.insert(pitch, handle) {
            self.sink.stop(old);
        }
        Ok(())
    }
}

impl PlaybackBackend for FileSampleBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::FileSample
    }

    fn is_available(&self) -> bool {
        self.sink.is_available()
    }

    fn start_note(&mut self, pitch: u8, _velocity: u8, _duration: f64) -> Result<(), SynthError> {
        self.play_pitch(pitch)
    }

    fn start_chord(
        &mut self,
        pitches: &[u8],
        _velocity: u8,
        _duration: f64,
    ) -> Result<(), SynthError> {
        // Validate first so a missing sample cannot leave a partial chord.
        for &pitch in pitches {
            if !self.table.contains_key(&pitch) {
                return Err(SynthError::Playback {
                    pitch,
                    detail: "no sample loaded for pitch".to_string(),
                });
            }
        }
        for &pitch in pitches {
            self.play_pitch(pitch)?;
        }
        Ok(())
    }

    fn stop_note(&mut self, pitch: u8) {
        if let Some(handle) = self.notes.remove(&pitch) {
            self.sink.stop(handle);
        }
    }

    fn stop_all(&mut self) {
        for (_, handle) in self.notes.drain() {
            self.sink.stop(handle);
        }
    }

    fn set_volume(&mut self, level: f64) {
        self.sink.set_volume(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum SinkEvent {
        Play { handle: u64, sample_count: usize, uri_prefix_ok: bool },
        Stop { handle: u64 },
        Volume(f64),
    }

    /// Test double capturing every sink call.
    #[derive(Clone)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<SinkEvent>>>,
        available: bool,
    }

    impl RecordingSink {
        fn new() -> (Self, Arc<Mutex<Vec<SinkEvent>>>) {
            let events = Arc::new(Mutex::new(Vec::new()));
            (
                RecordingSink { events: Arc::clone(&events), available: true },
                events,
            )
        }
    }

    impl AudioSink for RecordingSink {
        fn is_available(&self) -> bool {
            self.available
        }

        fn play(&mut self, handle: u64, asset: &AudioAsset) -> Result<(), SynthError> {
            self.events.lock().expect("lock").push(SinkEvent::Play {
                handle,
                sample_count: asset.sample_count(),
                uri_prefix_ok: asset.data_uri().starts_with("data:audio/wav;base64,"),
            });
            Ok(())
        }

        fn stop(&mut self, handle: u64) {
            self.events.lock().expect("lock").push(SinkEvent::Stop { handle });
        }

        fn set_volume(&mut self, level: f64) {
            self.events.lock().expect("lock").push(SinkEvent::Volume(level));
        }
    }

    #[test]
    fn synthesized_note_reaches_sink() {
        let (sink, events) = RecordingSink::new();
        let mut backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));

        backend.start_note(69, 100, 0.5).expect("start");

        let events = events.lock().expect("lock");
        assert_eq!(events.len(), 1);
        match &events[0] {
            SinkEvent::Play { sample_count, uri_prefix_ok, .. } => {
                assert_eq!(*sample_count, 22050);
                assert!(uri_prefix_ok);
            }
            other => panic!("Expected play event, got {other:?}"),
        }
    }

    #[test]
    fn stop_note_releases_sink_handle() {
        let (sink, events) = RecordingSink::new();
        let mut backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));

        backend.start_note(60, 100, 0.1).expect("start");
        backend.stop_note(60);
        backend.stop_note(60); // idempotent at the backend level too

        let events = events.lock().expect("lock");
        assert_eq!(events.len(), 2, "One play and exactly one stop: {events:?}");
        assert!(matches!(events[1], SinkEvent::Stop { handle: 0 }));
    }

    #[test]
    fn stopping_chord_member_halts_whole_chord() {
        let (sink, events) = RecordingSink::new();
        let mut backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));

        backend.start_chord(&[60, 64, 67], 100, 0.2).expect("start chord");
        backend.stop_note(64);

        let events = events.lock().expect("lock");
        assert!(matches!(events[0], SinkEvent::Play { handle: 0, .. }));
        assert!(matches!(events[1], SinkEvent::Stop { handle: 0 }));
    }

    #[test]
    fn stop_all_halts_notes_and_chords() {
        let (sink, events) = RecordingSink::new();
        let mut backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));

        backend.start_note(48, 100, 0.1).expect("start");
        backend.start_chord(&[60, 64], 100, 0.1).expect("start chord");
        backend.stop_all();

        let events = events.lock().expect("lock");
        let stops = events.iter().filter(|e| matches!(e, SinkEvent::Stop { .. })).count();
        assert_eq!(stops, 2);
    }

    #[test]
    fn volume_forwarded_to_sink() {
        let (sink, events) = RecordingSink::new();
        let mut backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));
        backend.set_volume(0.25);
        let events = events.lock().expect("lock");
        assert_eq!(events[0], SinkEvent::Volume(0.25));
    }

    #[test]
    fn unavailable_sink_reported() {
        let (mut sink, _) = RecordingSink::new();
        sink.available = false;
        let backend = SynthesizedBackend::new(SynthConfig::default(), Box::new(sink));
        assert!(!backend.is_available());
    }

    #[test]
    fn file_sample_backend_plays_loaded_pitch() {
        use crate::dsp::renderer::encode_asset;

        let (sink, events) = RecordingSink::new();
        let asset = encode_asset(&vec![0i16; 100], 44100).expect("encode");
        let table = HashMap::from([(60u8, asset)]);
        let mut backend = FileSampleBackend::new(Box::new(sink), table);

        backend.start_note(60, 100, 0.1).expect("start");
        assert!(matches!(
            backend.start_note(61, 100, 0.1),
            Err(SynthError::Playback { pitch: 61, .. })
        ));

        let events = events.lock().expect("lock");
        assert_eq!(events.len(), 1, "Only the loaded pitch should play");
    }

    #[test]
    fn file_sample_chord_rejects_missing_member_up_front() {
        use crate::dsp::renderer::encode_asset;

        let (sink, events) = RecordingSink::new();
        let asset = encode_asset(&vec![0i16; 100], 44100).expect("encode");
        let table = HashMap::from([(60u8, asset)]);
        let mut backend = FileSampleBackend::new(Box::new(sink), table);

        let result = backend.start_chord(&[60, 64], 100, 0.1);
        assert!(matches!(result, Err(SynthError::Playback { pitch: 64, .. })));
        assert!(events.lock().expect("lock").is_empty(), "No partial chord");
    }

    struct RecordingMidi {
        on: Vec<(u8, u8)>,
        off: Vec<u8>,
        fail_on: Option<u8>,
    }

    impl MidiOut for RecordingMidi {
        fn note_on(&mut self, pitch: u8, velocity: u8) -> Result<(), SynthError> {
            if self.fail_on == Some(pitch) {
                return Err(SynthError::Playback {
                    pitch,
                    detail: "device rejected note".to_string(),
                });
            }
            self.on.push((pitch, velocity));
            Ok(())
        }

        fn note_off(&mut self, pitch: u8) {
            self.off.push(pitch);
        }
    }

    #[test]
    fn midi_backend_forwards_notes_and_rolls_back_failed_chord() {
        struct SharedMidi(Arc<Mutex<RecordingMidi>>);
        impl MidiOut for SharedMidi {
            fn note_on(&mut self, pitch: u8, velocity: u8) -> Result<(), SynthError> {
                self.0.lock().expect("lock").note_on(pitch, velocity)
            }
            fn note_off(&mut self, pitch: u8) {
                self.0.lock().expect("lock").note_off(pitch);
            }
        }

        let recorder = Arc::new(Mutex::new(RecordingMidi {
            on: Vec::new(),
            off: Vec::new(),
            fail_on: Some(67),
        }));
        let mut backend = NativeMidiBackend::new(Box::new(SharedMidi(Arc::clone(&recorder))));

        backend.start_note(60, 90, 0.5).expect("start");
        backend.stop_note(60);
        assert!(backend.start_chord(&[62, 64, 67], 80, 0.5).is_err());

        let rec = recorder.lock().expect("lock");
        assert_eq!(rec.on, vec![(60, 90), (62, 80), (64, 80)]);
        // 60 stopped explicitly, 62 and 64 rolled back after 67 failed.
        assert_eq!(rec.off, vec![60, 62, 64]);
    }

    #[test]
    fn backend_spec_builds_requested_kind() {
        let (sink, _) = RecordingSink::new();
        let spec = BackendSpec::Synthesized {
            config: SynthConfig::default(),
            sink: Box::new(sink),
        };
        assert_eq!(spec.kind(), BackendKind::Synthesized);
        let backend = spec.build();
        assert_eq!(backend.kind(), BackendKind::Synthesized);
    }
}
