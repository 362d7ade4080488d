//! The MJ2 playback engine (§4.7): frame-accurate seek, bidirectional and
//! ping-pong playback, an LRU frame cache with byte-budget eviction, and
//! predictive prefetch.

use lru::LruCache;
use std::num::NonZeroUsize;

use jpc::{Codec, ImageSummary};
use log::{debug, warn};

use crate::error::Jp2Error;
use crate::mj2::moov::{find_and_read_moov, MovieBox};
use crate::mj2::sample_table::{derive_samples, SampleInfo};

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Forward,
    Reverse,
    StepForward,
    StepBackward,
}

/// What happens when playback runs off either end of the frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    None,
    Loop,
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Stopped,
    Playing,
    Paused,
}

/// Running counters surfaced by [`MJ2Player::statistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStatistics {
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub average_decode_time_ms: f64,
    pub cache_hit_rate: f64,
    pub memory_usage: u64,
}

struct CachedFrame {
    image: ImageSummary,
    samples: Vec<u8>,
    byte_size: u64,
}

/// A frame-accurate MJ2 player over a decoded movie box plus its backing
/// buffer. Single-threaded: every method call runs to completion before
/// the next is accepted.
pub struct MJ2Player<'a> {
    codec: &'a dyn Codec,
    buffer: Vec<u8>,
    movie: MovieBox,
    samples: Vec<SampleInfo>,
    timescale: u32,

    cache: LruCache<usize, CachedFrame>,
    max_cache_bytes: u64,
    memory_usage: u64,

    current_index: Option<usize>,
    mode: PlayMode,
    loop_mode: LoopMode,
    speed: f64,
    state: RunState,
    prefetch_reverse_half_count: usize,

    frames_decoded: u64,
    frames_dropped: u64,
    cache_hits: u64,
    cache_lookups: u64,
    total_decode_time_ms: f64,
}

const MIN_SPEED: f64 = 0.1;
const MAX_SPEED: f64 = 10.0;
const DEFAULT_CACHE_SLOTS: usize = 64;
const DEFAULT_MAX_CACHE_BYTES: u64 = 64 * 1024 * 1024;

impl<'a> MJ2Player<'a> {
    /// Parses the `moov` box out of `buffer` and builds the per-sample
    /// offset/duration table, but decodes nothing yet.
    pub fn load(codec: &'a dyn Codec, buffer: Vec<u8>) -> Result<Self, Jp2Error> {
        debug!("MJ2Player::load: {} byte buffer", buffer.len());
        let movie = find_and_read_moov(&buffer)?;
        let tables = movie.video_track.media.media_info.sample_table.tables();
        let samples = derive_samples(&tables)?;
        let timescale = movie.video_track.media.media_header.timescale;

        Ok(MJ2Player {
            codec,
            buffer,
            movie,
            samples,
            timescale,
            cache: LruCache::new(NonZeroUsize::new(DEFAULT_CACHE_SLOTS).unwrap()),
            max_cache_bytes: DEFAULT_MAX_CACHE_BYTES,
            memory_usage: 0,
            current_index: None,
            mode: PlayMode::Forward,
            loop_mode: LoopMode::None,
            speed: 1.0,
            state: RunState::Stopped,
            prefetch_reverse_half_count: 0,
            frames_decoded: 0,
            frames_dropped: 0,
            cache_hits: 0,
            cache_lookups: 0,
            total_decode_time_ms: 0.0,
        })
    }

    pub fn with_cache_limits(mut self, max_slots: usize, max_bytes: u64) -> Self {
        self.cache = LruCache::new(NonZeroUsize::new(max_slots.max(1)).unwrap());
        self.max_cache_bytes = max_bytes;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len()
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn play(&mut self) -> Result<(), Jp2Error> {
        if self.samples.is_empty() {
            return Err(Jp2Error::NoVideoTracks);
        }
        if self.current_index.is_none() {
            self.seek_to(0)?;
        }
        self.state = RunState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == RunState::Playing {
            self.state = RunState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = RunState::Stopped;
        self.current_index = None;
    }

    pub fn is_playing(&self) -> bool {
        self.state == RunState::Playing
    }

    /// Decodes (or pulls from cache) the frame at `index`, prefetches its
    /// neighbours, and sets it as current.
    pub fn seek_to(&mut self, index: usize) -> Result<(ImageSummary, Vec<u8>), Jp2Error> {
        if index >= self.samples.len() {
            return Err(Jp2Error::SeekFailed(format!(
                "frame index {index} out of range (have {})",
                self.samples.len()
            )));
        }
        let frame = self.decode_frame(index)?;
        self.current_index = Some(index);
        self.prefetch_around(index);
        Ok(frame)
    }

    /// Seeks to the sample whose timestamp is nearest `timestamp` (in the
    /// track's timescale units), breaking ties toward the earliest index.
    pub fn seek_to_timestamp(&mut self, timestamp: u64) -> Result<(ImageSummary, Vec<u8>), Jp2Error> {
        let mut best: Option<(usize, u64)> = None;
        for (i, s) in self.samples.iter().enumerate() {
            let distance = timestamp.abs_diff(s.timestamp);
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((i, distance));
            }
        }
        let (index, _) = best.ok_or(Jp2Error::NoVideoTracks)?;
        self.seek_to(index)
    }

    pub fn current_frame(&mut self) -> Result<Option<(ImageSummary, Vec<u8>)>, Jp2Error> {
        match self.current_index {
            Some(index) => Ok(Some(self.decode_frame(index)?)),
            None => Ok(None),
        }
    }

    pub fn timescale(&self) -> u32 {
        self.timescale
    }

    /// Advances playback by one logical step according to `mode`, handling
    /// the `loop_mode` boundary rule when the step runs off either end.
    /// Returns `None` when playback has stopped (boundary hit under
    /// `LoopMode::None`).
    pub fn next_frame(&mut self) -> Result<Option<(ImageSummary, Vec<u8>)>, Jp2Error> {
        if self.state != RunState::Playing {
            return Ok(None);
        }
        let current = match self.current_index {
            Some(i) => i,
            None => return self.seek_to(0).map(Some),
        };
        let forward = matches!(self.mode, PlayMode::Forward | PlayMode::StepForward);
        let next = if forward {
            current.checked_add(1)
        } else {
            current.checked_sub(1)
        };

        let len = self.samples.len();
        let resolved = match next {
            Some(i) if i < len => Some(i),
            _ => match self.loop_mode {
                LoopMode::None => {
                    self.state = RunState::Stopped;
                    None
                }
                LoopMode::Loop => Some(if forward { 0 } else { len - 1 }),
                LoopMode::PingPong => {
                    self.mode = if forward { PlayMode::Reverse } else { PlayMode::Forward };
                    Some(if forward { current.saturating_sub(1) } else { (current + 1).min(len - 1) })
                }
            },
        };

        match resolved {
            Some(i) => self.seek_to(i).map(Some),
            None => Ok(None),
        }
    }

    pub fn statistics(&self) -> PlayerStatistics {
        let cache_hit_rate = if self.cache_lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.cache_lookups as f64
        };
        let average_decode_time_ms = if self.frames_decoded == 0 {
            0.0
        } else {
            self.total_decode_time_ms / self.frames_decoded as f64
        };
        PlayerStatistics {
            frames_decoded: self.frames_decoded,
            frames_dropped: self.frames_dropped,
            average_decode_time_ms,
            cache_hit_rate,
            memory_usage: self.memory_usage,
        }
    }

    fn decode_frame(&mut self, index: usize) -> Result<(ImageSummary, Vec<u8>), Jp2Error> {
        self.cache_lookups += 1;
        if let Some(cached) = self.cache.get(&index) {
            self.cache_hits += 1;
            return Ok((cached.image.clone(), cached.samples.clone()));
        }

        let info = self.samples[index].clone();
        let start = info.offset as usize;
        let end = start + info.size as usize;
        if end > self.buffer.len() {
            return Err(Jp2Error::Truncated(format!(
                "frame {index} extends past end of buffer ({end} > {})",
                self.buffer.len()
            )));
        }
        let codestream = &self.buffer[start..end];

        let decode_start = std::time::Instant::now();
        let decoded = self.codec.decode(codestream);
        let elapsed_ms = decode_start.elapsed().as_secs_f64() * 1000.0;

        let (image, samples) = match decoded {
            Ok(pair) => pair,
            Err(cause) => {
                self.frames_dropped += 1;
                warn!("MJ2Player: decode failed for frame {index}: {cause}");
                return Err(Jp2Error::DecodeFailed { frame_index: index, cause: cause.to_string() });
            }
        };

        self.frames_decoded += 1;
        self.total_decode_time_ms += elapsed_ms;
        self.insert_into_cache(index, image.clone(), samples.clone());
        Ok((image, samples))
    }

    fn insert_into_cache(&mut self, index: usize, image: ImageSummary, samples: Vec<u8>) {
        let byte_size = samples.len() as u64;
        while self.memory_usage + byte_size > self.max_cache_bytes {
            match self.cache.pop_lru() {
                Some((_, evicted)) => self.memory_usage -= evicted.byte_size,
                None => break,
            }
        }
        if let Some(evicted) = self.cache.put(index, CachedFrame { image, samples, byte_size }) {
            self.memory_usage -= evicted.byte_size;
        }
        self.memory_usage += byte_size;
    }

    fn prefetch_around(&mut self, index: usize) {
        let forward = matches!(self.mode, PlayMode::Forward | PlayMode::StepForward);
        let step: i64 = if forward { 1 } else { -1 };
        let mut targets = vec![index as i64 + step];
        for i in 1..=self.prefetch_reverse_half_count as i64 {
            targets.push(index as i64 - step * i);
        }
        for target in targets {
            if target < 0 || target as usize >= self.samples.len() {
                continue;
            }
            let target = target as usize;
            if self.cache.contains(&target) {
                continue;
            }
            if let Err(err) = self.decode_frame(target) {
                debug!("MJ2Player: prefetch of frame {target} failed: {err}");
            }
        }
    }

    pub fn set_prefetch_reverse_half_count(&mut self, count: usize) {
        self.prefetch_reverse_half_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mj2::writer::{CreatorFrame, MJ2Creator};
    use jpc::{ComponentSummary, JpcError};
    use std::io::Cursor;

    struct IdentityCodec;
    impl Codec for IdentityCodec {
        fn encode(&self, _image: &ImageSummary, samples: &[u8]) -> Result<Vec<u8>, JpcError> {
            Ok(samples.to_vec())
        }
        fn decode(&self, codestream: &[u8]) -> Result<(ImageSummary, Vec<u8>), JpcError> {
            Ok((
                ImageSummary {
                    width: 4,
                    height: 4,
                    components: vec![ComponentSummary {
                        bit_depth: 8,
                        signed: false,
                        subsampling_x: 1,
                        subsampling_y: 1,
                        width: 4,
                        height: 4,
                    }],
                },
                codestream.to_vec(),
            ))
        }
    }

    fn sample_image() -> ImageSummary {
        ImageSummary {
            width: 4,
            height: 4,
            components: vec![ComponentSummary {
                bit_depth: 8,
                signed: false,
                subsampling_x: 1,
                subsampling_y: 1,
                width: 4,
                height: 4,
            }],
        }
    }

    fn make_buffer(frame_count: usize) -> Vec<u8> {
        let codec = IdentityCodec;
        let creator = MJ2Creator::new(&codec);
        let frames: Vec<CreatorFrame> = (0..frame_count)
            .map(|i| CreatorFrame {
                image: sample_image(),
                samples: vec![i as u8; 16],
                duration: 40,
                is_sync: true,
            })
            .collect();
        let cursor = creator.create(frames, Cursor::new(Vec::new()), false, 1000, false).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn seeks_to_each_frame_in_order() {
        let codec = IdentityCodec;
        let buffer = make_buffer(3);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        for i in 0..3 {
            let (_image, samples) = player.seek_to(i).unwrap();
            assert_eq!(samples, vec![i as u8; 16]);
        }
    }

    #[test]
    fn seek_past_end_raises_seek_failed() {
        let codec = IdentityCodec;
        let buffer = make_buffer(2);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        assert!(matches!(player.seek_to(99), Err(Jp2Error::SeekFailed(_))));
    }

    #[test]
    fn none_loop_mode_stops_at_the_last_frame() {
        let codec = IdentityCodec;
        let buffer = make_buffer(3);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        player.set_loop_mode(LoopMode::None);
        player.play().unwrap();
        player.seek_to(2).unwrap();
        assert!(player.next_frame().unwrap().is_none());
        assert!(!player.is_playing());
    }

    #[test]
    fn loop_mode_wraps_to_the_first_frame() {
        let codec = IdentityCodec;
        let buffer = make_buffer(3);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        player.set_loop_mode(LoopMode::Loop);
        player.play().unwrap();
        player.seek_to(2).unwrap();
        let (_image, samples) = player.next_frame().unwrap().unwrap();
        assert_eq!(samples, vec![0u8; 16]);
    }

    #[test]
    fn ping_pong_reverses_direction_at_the_boundary() {
        let codec = IdentityCodec;
        let buffer = make_buffer(3);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        player.set_loop_mode(LoopMode::PingPong);
        player.set_mode(PlayMode::Forward);
        player.play().unwrap();
        player.seek_to(2).unwrap();
        let (_image, samples) = player.next_frame().unwrap().unwrap();
        assert_eq!(samples, vec![1u8; 16]);
        assert_eq!(player.mode, PlayMode::Reverse);
    }

    #[test]
    fn set_speed_clamps_to_the_valid_range() {
        let codec = IdentityCodec;
        let buffer = make_buffer(1);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        player.set_speed(50.0);
        assert_eq!(player.speed(), MAX_SPEED);
        player.set_speed(0.0001);
        assert_eq!(player.speed(), MIN_SPEED);
    }

    #[test]
    fn cache_eviction_respects_the_byte_budget() {
        let codec = IdentityCodec;
        let buffer = make_buffer(4);
        let mut player = MJ2Player::load(&codec, buffer).unwrap().with_cache_limits(64, 32);
        for i in 0..4 {
            player.seek_to(i).unwrap();
        }
        assert!(player.statistics().memory_usage <= 32);
    }

    #[test]
    fn repeated_seeks_to_the_same_frame_are_cache_hits() {
        let codec = IdentityCodec;
        let buffer = make_buffer(2);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        player.seek_to(0).unwrap();
        player.seek_to(0).unwrap();
        let stats = player.statistics();
        assert!(stats.cache_hit_rate > 0.0);
    }

    #[test]
    fn seek_to_timestamp_locates_the_covering_sample() {
        let codec = IdentityCodec;
        let buffer = make_buffer(3);
        let mut player = MJ2Player::load(&codec, buffer).unwrap();
        let (_image, samples) = player.seek_to_timestamp(45).unwrap();
        assert_eq!(samples, vec![1u8; 16]);
    }
}
