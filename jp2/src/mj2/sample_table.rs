//! The MJ2 sample table: `SampleTableBuilder` on the write side, and the
//! five-step read-side derivation of `(sample_offset, duration, timestamp,
//! is_sync)` from `stsc`/`stco`|`co64`/`stts`/`stss` (§4.5).

use crate::boxes::JBox;
use crate::boxing::BoxType;
use crate::error::Jp2Error;
use crate::mj2::boxes::{
    BOX_TYPE_CHUNK_OFFSET, BOX_TYPE_CHUNK_OFFSET_64, BOX_TYPE_SAMPLE_SIZE, BOX_TYPE_SAMPLE_TO_CHUNK,
    BOX_TYPE_SYNC_SAMPLE, BOX_TYPE_TIME_TO_SAMPLE,
};

fn need(content: &[u8], len: usize, what: &str) -> Result<(), Jp2Error> {
    if content.len() < len {
        Err(Jp2Error::Truncated(format!("{what} needs {len} bytes, got {}", content.len())))
    } else {
        Ok(())
    }
}

/// `stsz` -- sample sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSizeBox {
    Uniform { sample_size: u32, sample_count: u32 },
    PerSample { sizes: Vec<u32> },
}

impl SampleSizeBox {
    pub fn sample_count(&self) -> u32 {
        match self {
            SampleSizeBox::Uniform { sample_count, .. } => *sample_count,
            SampleSizeBox::PerSample { sizes } => sizes.len() as u32,
        }
    }

    pub fn size(&self, index: usize) -> Option<u32> {
        match self {
            SampleSizeBox::Uniform { sample_size, sample_count } => {
                if (index as u32) < *sample_count {
                    Some(*sample_size)
                } else {
                    None
                }
            }
            SampleSizeBox::PerSample { sizes } => sizes.get(index).copied(),
        }
    }
}

impl JBox for SampleSizeBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SAMPLE_SIZE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 12, "stsz")?;
        let sample_size = u32::from_be_bytes(content[4..8].try_into().unwrap());
        let sample_count = u32::from_be_bytes(content[8..12].try_into().unwrap());
        if sample_size != 0 {
            return Ok(SampleSizeBox::Uniform { sample_size, sample_count });
        }
        need(content, 12 + 4 * sample_count as usize, "stsz sizes")?;
        let sizes = content[12..]
            .chunks_exact(4)
            .take(sample_count as usize)
            .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
            .collect();
        Ok(SampleSizeBox::PerSample { sizes })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![0u8; 4];
        match self {
            SampleSizeBox::Uniform { sample_size, sample_count } => {
                out.extend_from_slice(&sample_size.to_be_bytes());
                out.extend_from_slice(&sample_count.to_be_bytes());
            }
            SampleSizeBox::PerSample { sizes } => {
                out.extend_from_slice(&0u32.to_be_bytes());
                out.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
                for size in sizes {
                    out.extend_from_slice(&size.to_be_bytes());
                }
            }
        }
        Ok(out)
    }
}

/// One `stsc` entry: `first_chunk` is 1-based; the grouping applies from
/// this chunk until (excluding) the next entry's `first_chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunkEntry {
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// `stsc` -- sample-to-chunk mapping, inverse-run encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleToChunkBox {
    pub entries: Vec<SampleToChunkEntry>,
}

impl JBox for SampleToChunkBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SAMPLE_TO_CHUNK
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 8, "stsc")?;
        let count = u32::from_be_bytes(content[4..8].try_into().unwrap()) as usize;
        need(content, 8 + 12 * count, "stsc entries")?;
        let entries = content[8..]
            .chunks_exact(12)
            .take(count)
            .map(|c| SampleToChunkEntry {
                first_chunk: u32::from_be_bytes(c[0..4].try_into().unwrap()),
                samples_per_chunk: u32::from_be_bytes(c[4..8].try_into().unwrap()),
                sample_description_index: u32::from_be_bytes(c[8..12].try_into().unwrap()),
            })
            .collect();
        Ok(SampleToChunkBox { entries })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![0u8; 4];
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.first_chunk.to_be_bytes());
            out.extend_from_slice(&entry.samples_per_chunk.to_be_bytes());
            out.extend_from_slice(&entry.sample_description_index.to_be_bytes());
        }
        Ok(out)
    }
}

/// `stco`/`co64` -- chunk offsets, 32- or 64-bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOffsetBox {
    pub offsets: Vec<u64>,
    pub use_64_bit: bool,
}

impl ChunkOffsetBox {
    pub fn box_type_for(&self) -> BoxType {
        if self.use_64_bit {
            BOX_TYPE_CHUNK_OFFSET_64
        } else {
            BOX_TYPE_CHUNK_OFFSET
        }
    }

    pub fn read(box_type: BoxType, content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 4, "stco/co64")?;
        let count = u32::from_be_bytes(content[0..4].try_into().unwrap()) as usize;
        let use_64_bit = box_type == BOX_TYPE_CHUNK_OFFSET_64;
        let entry_size = if use_64_bit { 8 } else { 4 };
        need(content, 4 + entry_size * count, "stco/co64 entries")?;
        let offsets = content[4..]
            .chunks_exact(entry_size)
            .take(count)
            .map(|c| {
                if use_64_bit {
                    u64::from_be_bytes(c.try_into().unwrap())
                } else {
                    u32::from_be_bytes(c.try_into().unwrap()) as u64
                }
            })
            .collect();
        Ok(ChunkOffsetBox { offsets, use_64_bit })
    }

    pub fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![0u8; 4];
        out.extend_from_slice(&(self.offsets.len() as u32).to_be_bytes());
        for offset in &self.offsets {
            if self.use_64_bit {
                out.extend_from_slice(&offset.to_be_bytes());
            } else {
                out.extend_from_slice(&(*offset as u32).to_be_bytes());
            }
        }
        Ok(out)
    }
}

/// One `stts` run: `count` consecutive samples share `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeToSampleEntry {
    pub count: u32,
    pub delta: u32,
}

/// `stts` -- run-length-compressed sample durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeToSampleBox {
    pub entries: Vec<TimeToSampleEntry>,
}

impl TimeToSampleBox {
    pub fn durations(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend(std::iter::repeat(entry.delta).take(entry.count as usize));
        }
        out
    }
}

impl JBox for TimeToSampleBox {
    fn box_type() -> BoxType {
        BOX_TYPE_TIME_TO_SAMPLE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 8, "stts")?;
        let count = u32::from_be_bytes(content[4..8].try_into().unwrap()) as usize;
        need(content, 8 + 8 * count, "stts entries")?;
        let entries = content[8..]
            .chunks_exact(8)
            .take(count)
            .map(|c| TimeToSampleEntry {
                count: u32::from_be_bytes(c[0..4].try_into().unwrap()),
                delta: u32::from_be_bytes(c[4..8].try_into().unwrap()),
            })
            .collect();
        Ok(TimeToSampleBox { entries })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![0u8; 4];
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.count.to_be_bytes());
            out.extend_from_slice(&entry.delta.to_be_bytes());
        }
        Ok(out)
    }
}

/// `stss` -- 1-based indices of sync samples. Absent entirely when every
/// sample is a sync sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSampleBox {
    pub sync_sample_numbers: Vec<u32>,
}

impl JBox for SyncSampleBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SYNC_SAMPLE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 4, "stss")?;
        let count = u32::from_be_bytes(content[0..4].try_into().unwrap()) as usize;
        need(content, 4 + 4 * count, "stss entries")?;
        let sync_sample_numbers = content[4..]
            .chunks_exact(4)
            .take(count)
            .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
            .collect();
        Ok(SyncSampleBox { sync_sample_numbers })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(4 + 4 * self.sync_sample_numbers.len());
        out.extend_from_slice(&(self.sync_sample_numbers.len() as u32).to_be_bytes());
        for n in &self.sync_sample_numbers {
            out.extend_from_slice(&n.to_be_bytes());
        }
        Ok(out)
    }
}

/// A single sample as accumulated by the write-side builder.
#[derive(Debug, Clone, Copy)]
struct FrameInfo {
    size: u32,
    offset: u64,
    duration: u32,
    is_sync: bool,
}

/// The five boxes a complete sample table is built from.
pub struct SampleTableBoxes {
    pub sample_size: SampleSizeBox,
    pub sample_to_chunk: SampleToChunkBox,
    pub chunk_offset: ChunkOffsetBox,
    pub time_to_sample: TimeToSampleBox,
    pub sync_sample: Option<SyncSampleBox>,
}

/// Accumulates per-sample `(size, offset, duration, is_sync)` and produces
/// the box set in one pass. One sample per chunk on write (§4.5
/// simplification); reading accepts arbitrary `stsc` groupings.
#[derive(Debug, Default)]
pub struct SampleTableBuilder {
    frames: Vec<FrameInfo>,
    use_64_bit_offsets: bool,
}

impl SampleTableBuilder {
    pub fn new(use_64_bit_offsets: bool) -> Self {
        SampleTableBuilder {
            frames: Vec::new(),
            use_64_bit_offsets,
        }
    }

    pub fn add_sample(&mut self, size: u32, offset: u64, duration: u32, is_sync: bool) {
        self.frames.push(FrameInfo { size, offset, duration, is_sync });
        if offset > u32::MAX as u64 {
            self.use_64_bit_offsets = true;
        }
    }

    pub fn build_stsz(&self) -> SampleSizeBox {
        let sample_count = self.frames.len() as u32;
        if let Some(first) = self.frames.first() {
            if self.frames.iter().all(|f| f.size == first.size) {
                return SampleSizeBox::Uniform { sample_size: first.size, sample_count };
            }
        }
        SampleSizeBox::PerSample {
            sizes: self.frames.iter().map(|f| f.size).collect(),
        }
    }

    pub fn build_stsc(&self) -> SampleToChunkBox {
        SampleToChunkBox {
            entries: vec![SampleToChunkEntry {
                first_chunk: 1,
                samples_per_chunk: 1,
                sample_description_index: 1,
            }],
        }
    }

    pub fn build_chunk_offsets(&self) -> ChunkOffsetBox {
        ChunkOffsetBox {
            offsets: self.frames.iter().map(|f| f.offset).collect(),
            use_64_bit: self.use_64_bit_offsets,
        }
    }

    pub fn build_stts(&self) -> TimeToSampleBox {
        let mut entries: Vec<TimeToSampleEntry> = Vec::new();
        for frame in &self.frames {
            if let Some(last) = entries.last_mut() {
                if last.delta == frame.duration {
                    last.count += 1;
                    continue;
                }
            }
            entries.push(TimeToSampleEntry { count: 1, delta: frame.duration });
        }
        TimeToSampleBox { entries }
    }

    pub fn build_stss(&self) -> Option<SyncSampleBox> {
        if self.frames.iter().all(|f| f.is_sync) {
            return None;
        }
        Some(SyncSampleBox {
            sync_sample_numbers: self
                .frames
                .iter()
                .enumerate()
                .filter(|(_, f)| f.is_sync)
                .map(|(i, _)| (i + 1) as u32)
                .collect(),
        })
    }

    pub fn build_all(&self) -> SampleTableBoxes {
        SampleTableBoxes {
            sample_size: self.build_stsz(),
            sample_to_chunk: self.build_stsc(),
            chunk_offset: self.build_chunk_offsets(),
            time_to_sample: self.build_stts(),
            sync_sample: self.build_stss(),
        }
    }
}

/// One decoded sample's derived position/timing/sync status (§4.5 read side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    pub offset: u64,
    pub size: u32,
    pub duration: u32,
    pub timestamp: u64,
    pub is_sync: bool,
}

/// Derives per-sample `(offset, duration, timestamp, is_sync)` for every
/// sample in `sample_size`, by walking `stsc` in its inverse-run form along
/// with `chunk_offset`/`time_to_sample`/`sync_sample`.
pub fn derive_samples(tables: &SampleTableBoxes) -> Result<Vec<SampleInfo>, Jp2Error> {
    let sample_count = tables.sample_size.sample_count() as usize;
    let durations = tables.time_to_sample.durations();
    if durations.len() != sample_count {
        return Err(Jp2Error::FileFormat(
            "stts duration count does not match stsz sample count".to_string(),
        ));
    }

    // Step 1: linearize stsc's inverse-run form into one samples-per-chunk
    // value for every actual chunk index present in chunk_offset.
    let chunk_count = tables.chunk_offset.offsets.len();
    let mut samples_per_chunk = vec![0u32; chunk_count];
    let entries = &tables.sample_to_chunk.entries;
    for (i, entry) in entries.iter().enumerate() {
        let first = entry.first_chunk as usize;
        let last = entries
            .get(i + 1)
            .map(|next| next.first_chunk as usize)
            .unwrap_or(chunk_count + 1);
        if first == 0 || first > chunk_count + 1 {
            return Err(Jp2Error::FileFormat("stsc first_chunk out of range".to_string()));
        }
        for chunk in first..last.min(chunk_count + 1) {
            samples_per_chunk[chunk - 1] = entry.samples_per_chunk;
        }
    }

    let mut samples = Vec::with_capacity(sample_count);
    let mut sample_index = 0usize;
    let mut timestamp = 0u64;
    let sync = tables.sync_sample.as_ref();

    for (chunk_index, &chunk_offset) in tables.chunk_offset.offsets.iter().enumerate() {
        let mut running_offset = chunk_offset;
        for _ in 0..samples_per_chunk[chunk_index] {
            if sample_index >= sample_count {
                break;
            }
            let size = tables
                .sample_size
                .size(sample_index)
                .ok_or_else(|| Jp2Error::FileFormat("stsz size index out of range".to_string()))?;
            let duration = durations[sample_index];
            let is_sync = sync
                .map(|s| s.sync_sample_numbers.contains(&((sample_index + 1) as u32)))
                .unwrap_or(true);
            samples.push(SampleInfo {
                offset: running_offset,
                size,
                duration,
                timestamp,
                is_sync,
            });
            running_offset += size as u64;
            timestamp += duration as u64;
            sample_index += 1;
        }
    }

    if sample_index != sample_count {
        return Err(Jp2Error::FileFormat(
            "stsc/stco chunk layout does not account for every sample".to_string(),
        ));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stts_compresses_consecutive_equal_durations() {
        let mut builder = SampleTableBuilder::new(false);
        for i in 0..5u64 {
            builder.add_sample(100, i * 100, 40, true);
        }
        let stts = builder.build_stts();
        assert_eq!(stts.entries, vec![TimeToSampleEntry { count: 5, delta: 40 }]);
    }

    #[test]
    fn stss_omitted_when_all_samples_are_sync() {
        let mut builder = SampleTableBuilder::new(false);
        builder.add_sample(10, 0, 40, true);
        builder.add_sample(10, 10, 40, true);
        assert!(builder.build_stss().is_none());
    }

    #[test]
    fn stss_present_when_some_samples_are_not_sync() {
        let mut builder = SampleTableBuilder::new(false);
        builder.add_sample(10, 0, 40, true);
        builder.add_sample(10, 10, 40, false);
        builder.add_sample(10, 20, 40, true);
        let stss = builder.build_stss().unwrap();
        assert_eq!(stss.sync_sample_numbers, vec![1, 3]);
    }

    #[test]
    fn derive_samples_round_trips_builder_output() {
        let mut builder = SampleTableBuilder::new(false);
        builder.add_sample(100, 0, 40, true);
        builder.add_sample(120, 100, 40, false);
        builder.add_sample(90, 220, 40, true);
        let tables = builder.build_all();
        let samples = derive_samples(&tables).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], SampleInfo { offset: 0, size: 100, duration: 40, timestamp: 0, is_sync: true });
        assert_eq!(samples[1], SampleInfo { offset: 100, size: 120, duration: 40, timestamp: 40, is_sync: false });
        assert_eq!(samples[2], SampleInfo { offset: 220, size: 90, duration: 40, timestamp: 80, is_sync: true });
    }

    #[test]
    fn chunk_offset_switches_to_64_bit_when_offset_exceeds_u32_max() {
        let mut builder = SampleTableBuilder::new(false);
        builder.add_sample(10, u32::MAX as u64 + 1, 40, true);
        let stco = builder.build_chunk_offsets();
        assert!(stco.use_64_bit);
        assert_eq!(stco.box_type_for(), BOX_TYPE_CHUNK_OFFSET_64);
    }
}
