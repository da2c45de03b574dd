/// Sound engine: procedural chiptune cues via rodio.
///
/// All cues are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::domain::route::EndingKind;
use crate::sim::event::StoryEvent;

/// One-shot cue triggered by a story event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Page,
    ChoiceAppear,
    ChoiceMade,
    Rewind,
    Ending(EndingKind),
}

/// Map an engine event to the cue it should play, if any.
/// Plain line reveals are covered by the typewriter blip instead.
pub fn cue_for(event: &StoryEvent) -> Option<Cue> {
    match event {
        StoryEvent::BlockEntered { .. } => Some(Cue::Page),
        StoryEvent::ChoiceShown { .. } => Some(Cue::ChoiceAppear),
        StoryEvent::ChoiceMade { .. } => Some(Cue::ChoiceMade),
        StoryEvent::SteppedBack => Some(Cue::Rewind),
        StoryEvent::EndingReached { kind, .. } => Some(Cue::Ending(*kind)),
        StoryEvent::LineShown { .. } | StoryEvent::ClearRecorded { .. } => None,
    }
}

/// The single most important cue of a batch. An ending drowns out
/// everything else; otherwise the last cue wins.
pub fn pick_cue(events: &[StoryEvent]) -> Option<Cue> {
    let cues: Vec<Cue> = events.iter().filter_map(cue_for).collect();
    cues.iter()
        .copied()
        .find(|c| matches!(c, Cue::Ending(_)))
        .or_else(|| cues.last().copied())
}

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;
    use crate::domain::route::EndingKind;

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_blip: Arc<Vec<u8>>,
        sfx_page: Arc<Vec<u8>>,
        sfx_choice: Arc<Vec<u8>>,
        sfx_select: Arc<Vec<u8>>,
        sfx_rewind: Arc<Vec<u8>>,
        sfx_true: Arc<Vec<u8>>,
        sfx_normal: Arc<Vec<u8>>,
        sfx_bad: Arc<Vec<u8>>,
        sfx_hidden: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("audio output unavailable: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_blip: Arc::new(make_wav(&gen_blip(880.0, 0.018, 0.12))),
                sfx_page: Arc::new(make_wav(&gen_page())),
                sfx_choice: Arc::new(make_wav(&gen_arpeggio(&[659.0, 784.0], 0.06, 0.22))),
                sfx_select: Arc::new(make_wav(&gen_arpeggio(&[784.0, 1047.0], 0.05, 0.25))),
                sfx_rewind: Arc::new(make_wav(&gen_rewind())),
                sfx_true: Arc::new(make_wav(&gen_fanfare(&[523.0, 659.0, 784.0, 1047.0]))),
                sfx_normal: Arc::new(make_wav(&gen_fanfare(&[523.0, 659.0, 784.0]))),
                sfx_bad: Arc::new(make_wav(&gen_lament())),
                sfx_hidden: Arc::new(make_wav(&gen_fanfare(&[587.0, 740.0, 880.0, 1175.0, 1480.0]))),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        /// Tick for typewriter reveals. One blip per frame, however many
        /// characters appeared in it.
        pub fn play_type_blip(&self, revealed: usize) {
            if revealed > 0 {
                self.play(&self.sfx_blip);
            }
        }

        pub fn play_cue(&self, cue: Cue) {
            let buf = match cue {
                Cue::Page => &self.sfx_page,
                Cue::ChoiceAppear => &self.sfx_choice,
                Cue::ChoiceMade => &self.sfx_select,
                Cue::Rewind => &self.sfx_rewind,
                Cue::Ending(EndingKind::True) => &self.sfx_true,
                Cue::Ending(EndingKind::Normal) => &self.sfx_normal,
                Cue::Ending(EndingKind::Bad) => &self.sfx_bad,
                Cue::Ending(EndingKind::Hidden) => &self.sfx_hidden,
            };
            self.play(buf);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    fn gen_arpeggio(notes: &[f32], note_dur: f32, volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    /// Page turn: short filtered noise swish
    fn gen_page() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.09) as usize;
        let mut rng: u32 = 2024;
        let mut prev = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                prev = prev * 0.8 + noise * 0.2;
                let env = (t * (1.0 - t) * 4.0).max(0.0);
                prev * env * 0.5
            })
            .collect()
    }

    /// Back one line: quick descending sweep
    fn gen_rewind() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.1) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 900.0 - t * 500.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                (ti * freq * TAU).sin() * (1.0 - t) * 0.2
            })
            .collect()
    }

    /// Ending fanfare: ascending notes with a sustained last one
    fn gen_fanfare(notes: &[f32]) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * 0.12) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        if let Some(&last) = notes.last() {
            let n = (SAMPLE_RATE as f32 * 0.4) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                samples.push((t * last * TAU).sin() * env * 0.3);
            }
        }
        samples
    }

    /// Bad ending: slow descending minor line
    fn gen_lament() -> Vec<f32> {
        let notes = [440.0_f32, 370.0, 311.0, 261.0]; // A4→F#4→Eb4→C4
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * 0.2) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                samples.push((t * freq * TAU).sin() * env * 0.3);
            }
        }
        let total = samples.len();
        let fade_len = total / 4;
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&gen_blip(440.0, 0.01, 0.5));
            let n = (SAMPLE_RATE as f32 * 0.01) as usize;
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + n * 2);
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_type_blip(&self, _revealed: usize) {}
    pub fn play_cue(&self, _cue: Cue) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::EndingReason;

    #[test]
    fn ending_outranks_other_cues() {
        let events = vec![
            StoryEvent::BlockEntered { block: "ending_true".into(), via: "ending" },
            StoryEvent::EndingReached { kind: EndingKind::True, reason: EndingReason::Designed },
            StoryEvent::ClearRecorded { protagonist: "A".into() },
        ];
        assert_eq!(pick_cue(&events), Some(Cue::Ending(EndingKind::True)));
    }

    #[test]
    fn last_cue_wins_otherwise() {
        let events = vec![
            StoryEvent::ChoiceMade { score_delta: 2, total_score: 2 },
            StoryEvent::BlockEntered { block: "b".into(), via: "chapter" },
            StoryEvent::LineShown { block: "b".into(), index: 0 },
        ];
        assert_eq!(pick_cue(&events), Some(Cue::Page));
        assert_eq!(pick_cue(&[StoryEvent::LineShown { block: "b".into(), index: 1 }]), None);
    }
}
