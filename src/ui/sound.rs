/// Sound engine: procedural 8-bit style effects via rodio.
///
/// Every cue is synthesized into an in-memory WAV buffer at init time and
/// looked up by name. Unknown names play nothing. Playback is
/// fire-and-forget through a detached rodio `Sink`.
///
/// Built without the "sound" feature, `SoundEngine` is a silent stub.

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::rc::Rc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use blastgrid::sim::event::AudioSink;

    const SAMPLE_RATE: u32 = 22050;

    /// Cheap to clone: every match gets its own handle to the same device.
    #[derive(Clone)]
    pub struct SoundEngine {
        _stream: Rc<OutputStream>,
        handle: OutputStreamHandle,
        cues: Rc<HashMap<&'static str, Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            let mut cues = HashMap::new();
            cues.insert("bomb_place", make_wav(&gen_place()));
            cues.insert("explosion", make_wav(&gen_explosion()));
            cues.insert("wall_break", make_wav(&gen_crumble()));
            cues.insert("powerup", make_wav(&gen_powerup()));
            cues.insert("death", make_wav(&gen_death()));
            cues.insert("victory", make_wav(&gen_victory()));
            cues.insert("game_over", make_wav(&gen_game_over()));

            Some(SoundEngine { _stream: Rc::new(stream), handle, cues: Rc::new(cues) })
        }

        fn play(&self, buf: &[u8], volume: f32) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.to_vec())) {
                    sink.set_volume(volume);
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    impl AudioSink for SoundEngine {
        fn play_sound(&mut self, name: &str, volume: f32) {
            match self.cues.get(name) {
                Some(buf) => self.play(buf, volume),
                None => log::trace!("no sound named {name}"),
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Sequence of notes, each a sine with a linear tail.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in seq {
            let n = samples_for(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.4;
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                out.push(wave * env * volume);
            }
        }
        out
    }

    /// LCG noise in [-1, 1]
    fn noise(state: &mut u32) -> f32 {
        *state = state.wrapping_mul(1103515245).wrapping_add(12345);
        (*state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    /// Bomb placed: short low thunk
    fn gen_place() -> Vec<f32> {
        let n = samples_for(0.08);
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 180.0 - t * 80.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                (ti * freq * TAU).sin() * (1.0 - t).powf(1.5) * 0.4
            })
            .collect()
    }

    /// Explosion: noise burst over a falling rumble
    fn gen_explosion() -> Vec<f32> {
        let n = samples_for(0.45);
        let mut rng: u32 = 4242;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let rumble = (ti * (90.0 - t * 50.0) * TAU).sin();
                let env = (1.0 - t).powf(2.0);
                (noise(&mut rng) * 0.7 + rumble * 0.3) * env * 0.5
            })
            .collect()
    }

    /// Wall break: crackly descending noise
    fn gen_crumble() -> Vec<f32> {
        let n = samples_for(0.18);
        let mut rng: u32 = 777;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * (400.0 - t * 250.0) * TAU).sin();
                (tone * 0.3 + noise(&mut rng) * 0.7) * (1.0 - t) * 0.3
            })
            .collect()
    }

    /// Pickup: quick ascending arpeggio C6→E6→G6
    fn gen_powerup() -> Vec<f32> {
        notes(&[(1047.0, 0.045), (1319.0, 0.045), (1568.0, 0.06)], 0.25)
    }

    /// Death: descending A4→F#4→Eb4→C4 with a fade
    fn gen_death() -> Vec<f32> {
        let mut s = notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.12)], 0.3);
        let fade = s.len() / 4;
        let total = s.len();
        for (k, v) in s[total - fade..].iter_mut().enumerate() {
            *v *= 1.0 - k as f32 / fade as f32;
        }
        s
    }

    /// Victory: C5→E5→G5→C6 fanfare
    fn gen_victory() -> Vec<f32> {
        notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.3)], 0.3)
    }

    fn gen_game_over() -> Vec<f32> {
        notes(&[(392.0, 0.2), (330.0, 0.2), (262.0, 0.4)], 0.3)
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let channels: u16 = 1;
        let bits: u16 = 16;
        let byte_rate = SAMPLE_RATE * channels as u32 * bits as u32 / 8;
        let block_align = channels * bits / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

}

// ════════════════════════════════════════════════════════════
//  Public API: silent when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
#[derive(Clone)]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> {
        Some(SoundEngine)
    }
}

#[cfg(not(feature = "sound"))]
impl blastgrid::sim::event::AudioSink for SoundEngine {
    fn play_sound(&mut self, _name: &str, _volume: f32) {}
}
