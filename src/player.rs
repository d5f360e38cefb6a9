//! Note/chord playback orchestration.
//!
//! [`Player`] is the stateful layer over the pure DSP code: it clamps
//! input, tracks which pitches are sounding, schedules cancellable
//! auto-stop timers, and sequences melodies. It is an explicit object —
//! hosts hold a reference, and independent players can coexist.
//!
//! Synthesis runs synchronously inside each call; the only suspension
//! points are the melody's inter-note waits and the auto-stop timers,
//! both of which run on the ambient Tokio runtime. Methods that
//! schedule timers must therefore be called from within a runtime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::{BackendSpec, PlaybackBackend};
use crate::dsp::tuning::{DEFAULT_VELOCITY, clamp_pitch, clamp_velocity};
use crate::error::SynthError;

/// How long a note rings when the caller gives no duration: long enough
/// that it is effectively "until stopped".
pub const DEFAULT_RING_SECONDS: f64 = 30.0;

/// One entry in the active note set.
struct ActiveNote {
    /// Monotonic token distinguishing this play from any later play of
    /// the same pitch, so an expired timer cannot stop a reused pitch.
    generation: u64,
    /// Pending auto-stop task, if the note was given a duration.
    auto_stop: Option<JoinHandle<()>>,
}

struct PlayerInner {
    backend: Box<dyn PlaybackBackend>,
    active: HashMap<u8, ActiveNote>,
    next_generation: u64,
    disposed: bool,
}

impl PlayerInner {
    /// Remove a pitch from the active set, cancelling its timer and
    /// halting its playback. No-op for inactive pitches.
    fn stop_pitch(&mut self, pitch: u8) {
        if let Some(note) = self.active.remove(&pitch) {
            if let Some(task) = note.auto_stop {
                task.abort();
            }
            self.backend.stop_note(pitch);
            log::debug!("stopped pitch {pitch}");
        }
    }

    fn stop_everything(&mut self) {
        for (_, note) in self.active.drain() {
            if let Some(task) = note.auto_stop {
                task.abort();
            }
        }
        self.backend.stop_all();
    }
}

/// Polyphonic playback orchestrator.
pub struct Player {
    inner: Arc<Mutex<PlayerInner>>,
}

fn lock(inner: &Mutex<PlayerInner>) -> MutexGuard<'_, PlayerInner> {
    // A panic while holding the lock poisons it; the note set is still
    // structurally sound, so recover rather than cascade.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Player {
    /// Build a player for the backend the host selected at startup.
    ///
    /// Fails with [`SynthError::BackendUnavailable`] when the platform
    /// lacks the capability (e.g. no audio element support); the host
    /// is expected to degrade to silence rather than crash.
    pub fn new(spec: BackendSpec) -> Result<Self, SynthError> {
        let kind = spec.kind();
        let backend = spec.build();
        if !backend.is_available() {
            return Err(SynthError::BackendUnavailable { backend: kind.name() });
        }
        Ok(Player {
            inner: Arc::new(Mutex::new(PlayerInner {
                backend,
                active: HashMap::new(),
                next_generation: 0,
                disposed: false,
            })),
        })
    }

    /// Start one note. Pitch and velocity are clamped, never rejected.
    ///
    /// Retriggering a pitch that is still sounding performs an implicit
    /// stop first — a stop-then-start, not layered playback. If
    /// `duration` is given, the note is stopped automatically once it
    /// elapses; otherwise it rings until stopped explicitly.
    pub fn play_note(
        &self,
        pitch: i32,
        velocity: i32,
        duration: Option<Duration>,
    ) -> Result<(), SynthError> {
        let pitch = clamp_pitch(pitch);
        let velocity = clamp_velocity(velocity);

        let mut inner = lock(&self.inner);
        if inner.disposed {
            return Err(SynthError::Disposed);
        }
        inner.stop_pitch(pitch);

        let seconds = duration.map(|d| d.as_secs_f64()).unwrap_or(DEFAULT_RING_SECONDS);
        if let Err(e) = inner.backend.start_note(pitch, velocity, seconds) {
            log::warn!("failed to start pitch {pitch}: {e}");
            return Err(e);
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let auto_stop =
            duration.map(|d| spawn_auto_stop(Arc::clone(&self.inner), pitch, generation, d));
        inner.active.insert(pitch, ActiveNote { generation, auto_stop });
        log::debug!("started pitch {pitch} (velocity {velocity}, {seconds}s)");
        Ok(())
    }

    /// [`play_note`](Self::play_note) at the standard velocity of 100,
    /// for callers that don't track how hard a key was struck.
    pub fn play_note_default(
        &self,
        pitch: i32,
        duration: Option<Duration>,
    ) -> Result<(), SynthError> {
        self.play_note(pitch, DEFAULT_VELOCITY as i32, duration)
    }

    /// Halt one pitch. Idempotent: stopping an already-stopped or
    /// never-played pitch is a no-op.
    pub fn stop_note(&self, pitch: i32) {
        let pitch = clamp_pitch(pitch);
        let mut inner = lock(&self.inner);
        if inner.disposed {
            return;
        }
        inner.stop_pitch(pitch);
    }

    /// Play pitches one after another, each sounding `note_duration`,
    /// with the next note starting `note_duration + gap_duration` after
    /// the previous one started.
    ///
    /// A note that fails to play is logged and skipped so the rest of
    /// the melody continues; only disposal aborts the sequence.
    pub async fn play_melody(
        &self,
        pitches: &[i32],
        note_duration: Duration,
        gap_duration: Duration,
        velocity: i32,
    ) {
        for &pitch in pitches {
            match self.play_note(pitch, velocity, Some(note_duration)) {
                Err(SynthError::Disposed) => return,
                Err(e) => log::warn!("melody note {pitch} failed: {e}"),
                Ok(()) => {}
            }
            tokio::time::sleep(note_duration + gap_duration).await;
        }
    }

    /// Sound all pitches simultaneously as one combined chord asset,
    /// stopping them automatically after `duration`.
    pub fn play_harmony(
        &self,
        pitches: &[i32],
        duration: Duration,
        velocity: i32,
    ) -> Result<(), SynthError> {
        let velocity = clamp_velocity(velocity);
        let mut clamped: Vec<u8> = pitches.iter().map(|&p| clamp_pitch(p)).collect();
        clamped.sort_unstable();
        clamped.dedup();

        let mut inner = lock(&self.inner);
        if inner.disposed {
            return Err(SynthError::Disposed);
        }
        for &pitch in &clamped {
            inner.stop_pitch(pitch);
        }

        if let Err(e) = inner.backend.start_chord(&clamped, velocity, duration.as_secs_f64()) {
            log::warn!("failed to start chord {clamped:?}: {e}");
            return Err(e);
        }

        for &pitch in &clamped {
            let generation = inner.next_generation;
            inner.next_generation += 1;
            let auto_stop = spawn_auto_stop(Arc::clone(&self.inner), pitch, generation, duration);
            inner
                .active
                .insert(pitch, ActiveNote { generation, auto_stop: Some(auto_stop) });
        }
        Ok(())
    }

    /// Stop every sounding pitch and cancel all pending timers.
    pub fn stop_all(&self) {
        let mut inner = lock(&self.inner);
        if inner.disposed {
            return;
        }
        inner.stop_everything();
    }

    /// Scale playback gain of all current and future assets. Clamped to [0, 1].
    pub fn set_volume(&self, level: f64) {
        let mut inner = lock(&self.inner);
        if inner.disposed {
            return;
        }
        inner.backend.set_volume(level.clamp(0.0, 1.0));
    }

    /// Pitches currently sounding, in ascending order. Useful for hosts
    /// highlighting keys or frets.
    pub fn active_pitches(&self) -> Vec<u8> {
        let inner = lock(&self.inner);
        let mut pitches: Vec<u8> = inner.active.keys().copied().collect();
        pitches.sort_unstable();
        pitches
    }

    /// Release all playback resources. Safe to call more than once;
    /// everything except further `dispose` calls fails or no-ops after.
    pub fn dispose(&self) {
        let mut inner = lock(&self.inner);
        if inner.disposed {
            return;
        }
        inner.stop_everything();
        inner.disposed = true;
        log::debug!("player disposed");
    }
}

/// Schedule the automatic stop for one play of `pitch`. The generation
/// check makes an expired timer a no-op if the pitch was stopped or
/// retriggered in the meantime.
fn spawn_auto_stop(
    inner: Arc<Mutex<PlayerInner>>,
    pitch: u8,
    generation: u64,
    duration: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let mut inner = lock(&inner);
        let current = inner.active.get(&pitch).map(|n| n.generation);
        if current == Some(generation) {
            inner.stop_pitch(pitch);
        }
    })
}
