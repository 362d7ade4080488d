//! MJ2 stream writer and creator (§4.6): a single-writer actor that
//! back-patches the `mdat` header once every frame is known, then appends
//! the `moov` trailer built from the accumulated sample table.

use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::boxes::signature::{FileTypeBox, SignatureBox};
use crate::boxes::JBox;
use crate::boxing::BoxWriter;
use crate::error::Jp2Error;
use crate::mj2::boxes::{
    DataEntryUrlBox, DataInfoBox, DataReferenceBox, HandlerBox, MediaHeaderBox, MovieHeaderBox,
    SampleDescriptionBox, TrackHeaderBox, VideoMediaHeaderBox, VisualSampleEntry,
    BOX_TYPE_MEDIA_DATA, HANDLER_TYPE_VIDEO,
};
use crate::mj2::moov::{MediaBox, MediaInfoBox, MovieBox, SampleTableBox, TrackBox};
use crate::mj2::sample_table::SampleTableBuilder;
use jpc::{Codec, ImageSummary};

const MJ2_BRAND: [u8; 4] = *b"mjp2";
const MJ2_STREAMING_BRAND: [u8; 4] = *b"mj2s";

/// MJ2 Simple Profile limits; `MJ2Creator::validate` checks these before
/// any bytes are written.
pub const SIMPLE_PROFILE_MAX_WIDTH: u32 = 1920;
pub const SIMPLE_PROFILE_MAX_HEIGHT: u32 = 1080;
pub const SIMPLE_PROFILE_MAX_FRAME_RATE: f64 = 30.0;

pub fn validate_simple_profile(width: u32, height: u32, frame_rate: f64) -> Result<(), Jp2Error> {
    if width > SIMPLE_PROFILE_MAX_WIDTH
        || height > SIMPLE_PROFILE_MAX_HEIGHT
        || frame_rate > SIMPLE_PROFILE_MAX_FRAME_RATE
    {
        return Err(Jp2Error::InvalidParameter(format!(
            "MJ2 Simple Profile requires width <= {SIMPLE_PROFILE_MAX_WIDTH}, height <= {SIMPLE_PROFILE_MAX_HEIGHT}, frame_rate <= {SIMPLE_PROFILE_MAX_FRAME_RATE}; got {width}x{height}@{frame_rate}"
        )));
    }
    Ok(())
}

/// Low-level single-writer stream writer: signature, `ftyp`, a 16-byte
/// `mdat` placeholder, then per-frame appends. `finalize()` back-patches
/// the placeholder and appends `moov`.
pub struct StreamWriter<W: Write + Seek> {
    writer: W,
    mdat_header_offset: u64,
    mdat_content_size: u64,
    sample_table: SampleTableBuilder,
    width: u32,
    height: u32,
    timescale: u32,
}

impl<W: Write + Seek> StreamWriter<W> {
    pub fn new(mut writer: W, streaming: bool, width: u32, height: u32, timescale: u32) -> Result<Self, Jp2Error> {
        debug!("StreamWriter::new: {width}x{height}, timescale={timescale}, streaming={streaming}");
        let mut boxes = BoxWriter::new();
        boxes.write_box(SignatureBox::box_type(), &SignatureBox.write()?);
        let brand = if streaming { MJ2_STREAMING_BRAND } else { MJ2_BRAND };
        boxes.write_box(
            FileTypeBox::box_type(),
            &FileTypeBox {
                brand,
                minor_version: 0,
                compatible: vec![brand],
            }
            .write()?,
        );
        writer.write_all(boxes.bytes())?;

        let mdat_header_offset = writer.stream_position()?;
        // 16-byte placeholder: length=1, type="mdat", extended_length=0 (patched later).
        writer.write_all(&1u32.to_be_bytes())?;
        writer.write_all(&BOX_TYPE_MEDIA_DATA)?;
        writer.write_all(&0u64.to_be_bytes())?;

        Ok(StreamWriter {
            writer,
            mdat_header_offset,
            mdat_content_size: 0,
            sample_table: SampleTableBuilder::new(false),
            width,
            height,
            timescale,
        })
    }

    /// Appends one frame's codestream bytes and records its sample-table entry.
    pub fn write_frame(&mut self, bytes: &[u8], duration: u32, is_sync: bool) -> Result<(), Jp2Error> {
        let offset = self.writer.stream_position()?;
        self.writer.write_all(bytes)?;
        self.sample_table.add_sample(bytes.len() as u32, offset, duration, is_sync);
        self.mdat_content_size += bytes.len() as u64;
        Ok(())
    }

    /// Back-patches the `mdat` header and appends the `moov` trailer.
    pub fn finalize(mut self) -> Result<W, Jp2Error> {
        debug!("StreamWriter::finalize: mdat content size = {}", self.mdat_content_size);
        let end_offset = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(self.mdat_header_offset))?;
        self.writer.write_all(&1u32.to_be_bytes())?;
        self.writer.write_all(&BOX_TYPE_MEDIA_DATA)?;
        self.writer
            .write_all(&(16u64 + self.mdat_content_size).to_be_bytes())?;
        self.writer.seek(SeekFrom::Start(end_offset))?;

        let tables = self.sample_table.build_all();
        let stbl = SampleTableBox::from_boxes(
            SampleDescriptionBox {
                entry: VisualSampleEntry {
                    width: self.width as u16,
                    height: self.height as u16,
                    ..Default::default()
                },
            },
            tables,
        );
        let duration = stbl.time_to_sample.durations().iter().map(|&d| d as u64).sum::<u64>() as u32;

        let movie = MovieBox {
            movie_header: MovieHeaderBox {
                timescale: self.timescale,
                duration,
                next_track_id: 2,
                ..Default::default()
            },
            video_track: TrackBox {
                track_header: TrackHeaderBox {
                    version: 0,
                    flags: [0, 0, 1],
                    creation_time: 0,
                    modification_time: 0,
                    track_id: 1,
                    duration,
                    layer: 0,
                    alternate_group: 0,
                    volume: 0,
                    width: self.width << 16,
                    height: self.height << 16,
                },
                media: MediaBox {
                    media_header: MediaHeaderBox {
                        version: 0,
                        flags: [0; 3],
                        creation_time: 0,
                        modification_time: 0,
                        timescale: self.timescale,
                        duration,
                        language: 0,
                        pre_defined: 0,
                    },
                    handler: HandlerBox {
                        version: 0,
                        flags: [0; 3],
                        handler_type: HANDLER_TYPE_VIDEO,
                        name: "video handler".to_string(),
                    },
                    media_info: MediaInfoBox {
                        video_media_header: VideoMediaHeaderBox::default(),
                        data_info: DataInfoBox {
                            data_reference: DataReferenceBox {
                                entries: vec![DataEntryUrlBox { self_contained: true }],
                            },
                        },
                        sample_table: stbl,
                        unknown: Vec::new(),
                    },
                    unknown: Vec::new(),
                },
                unknown: Vec::new(),
            },
            unknown: Vec::new(),
        };

        let mut writer = BoxWriter::new();
        writer.write_box(MovieBox::box_type(), &movie.write()?);
        self.writer.write_all(writer.bytes())?;
        Ok(self.writer)
    }
}

/// One input frame to [`MJ2Creator`].
pub struct CreatorFrame {
    pub image: ImageSummary,
    pub samples: Vec<u8>,
    pub duration: u32,
    pub is_sync: bool,
}

/// Encodes and writes a sequence of frames through an external [`Codec`].
/// Sequential or bounded-parallel (order-preserving) encoding; cooperative
/// cancellation checked at each frame/batch boundary.
pub struct MJ2Creator<'a> {
    codec: &'a dyn Codec,
    cancelled: AtomicBool,
    parallel_encoding_count: Option<usize>,
}

impl<'a> MJ2Creator<'a> {
    pub fn new(codec: &'a dyn Codec) -> Self {
        MJ2Creator {
            codec,
            cancelled: AtomicBool::new(false),
            parallel_encoding_count: None,
        }
    }

    pub fn with_parallel_encoding_count(mut self, count: usize) -> Self {
        self.parallel_encoding_count = Some(count);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_dimensions(frames: &[CreatorFrame]) -> Result<(), Jp2Error> {
        let first = frames.first().ok_or_else(|| {
            Jp2Error::InvalidParameter("MJ2Creator::create requires at least one frame".to_string())
        })?;
        for frame in &frames[1..] {
            if frame.image.width != first.image.width || frame.image.height != first.image.height {
                return Err(Jp2Error::InconsistentDimensions);
            }
            if frame.image.components.len() != first.image.components.len() {
                return Err(Jp2Error::InconsistentComponents);
            }
        }
        Ok(())
    }

    /// Encodes and writes every frame, then finalizes. `timescale` is the
    /// movie/media timescale `duration` values are expressed in. When
    /// `enforce_simple_profile` is set, validates width/height/frame-rate
    /// against the MJ2 Simple Profile before writing any bytes.
    pub fn create<W: Write + Seek>(
        &self,
        frames: Vec<CreatorFrame>,
        writer: W,
        streaming: bool,
        timescale: u32,
        enforce_simple_profile: bool,
    ) -> Result<W, Jp2Error> {
        debug!("MJ2Creator::create: {} frame(s)", frames.len());
        Self::check_dimensions(&frames)?;
        let first = &frames[0];
        if enforce_simple_profile {
            validate_simple_profile(
                first.image.width,
                first.image.height,
                timescale as f64 / first.duration.max(1) as f64,
            )?;
        }

        let mut stream = StreamWriter::new(writer, streaming, first.image.width, first.image.height, timescale)?;

        #[cfg(feature = "parallel")]
        let batch_size = self.parallel_encoding_count.unwrap_or_else(rayon::current_num_threads);
        #[cfg(not(feature = "parallel"))]
        let batch_size = 1usize;

        let mut index = 0;
        while index < frames.len() {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(Jp2Error::Cancelled);
            }
            let end = (index + batch_size.max(1)).min(frames.len());
            let batch = &frames[index..end];
            let encoded = self.encode_batch(batch, index)?;
            for (offset, bytes) in encoded.into_iter().enumerate() {
                let frame = &batch[offset];
                stream.write_frame(&bytes, frame.duration, frame.is_sync)?;
            }
            index = end;
        }

        if self.cancelled.load(Ordering::SeqCst) {
            return Err(Jp2Error::Cancelled);
        }
        stream.finalize()
    }

    #[cfg(feature = "parallel")]
    fn encode_batch(&self, batch: &[CreatorFrame], base_index: usize) -> Result<Vec<Vec<u8>>, Jp2Error> {
        use rayon::prelude::*;
        let results: Vec<Result<Vec<u8>, Jp2Error>> = batch
            .par_iter()
            .enumerate()
            .map(|(offset, frame)| {
                self.codec
                    .encode(&frame.image, &frame.samples)
                    .map_err(|cause| Jp2Error::DecodeFailed {
                        frame_index: base_index + offset,
                        cause: cause.to_string(),
                    })
            })
            .collect();
        results.into_iter().collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn encode_batch(&self, batch: &[CreatorFrame], base_index: usize) -> Result<Vec<Vec<u8>>, Jp2Error> {
        batch
            .iter()
            .enumerate()
            .map(|(offset, frame)| {
                self.codec
                    .encode(&frame.image, &frame.samples)
                    .map_err(|cause| Jp2Error::DecodeFailed {
                        frame_index: base_index + offset,
                        cause: cause.to_string(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jpc::{ComponentSummary, JpcError};
    use std::io::Cursor;

    struct IdentityCodec;
    impl Codec for IdentityCodec {
        fn encode(&self, _image: &ImageSummary, samples: &[u8]) -> Result<Vec<u8>, JpcError> {
            let mut out = jpc::MARKER_SYMBOL_SOC.to_vec();
            out.extend_from_slice(samples);
            Ok(out)
        }
        fn decode(&self, codestream: &[u8]) -> Result<(ImageSummary, Vec<u8>), JpcError> {
            Ok((
                ImageSummary { width: 0, height: 0, components: Vec::new() },
                codestream.to_vec(),
            ))
        }
    }

    fn sample_image() -> ImageSummary {
        ImageSummary {
            width: 64,
            height: 32,
            components: vec![ComponentSummary {
                bit_depth: 8,
                signed: false,
                subsampling_x: 1,
                subsampling_y: 1,
                width: 64,
                height: 32,
            }],
        }
    }

    #[test]
    fn creator_writes_frames_in_order_and_finalizes() {
        let codec = IdentityCodec;
        let creator = MJ2Creator::new(&codec);
        let frames = vec![
            CreatorFrame { image: sample_image(), samples: vec![1, 2, 3], duration: 40, is_sync: true },
            CreatorFrame { image: sample_image(), samples: vec![4, 5], duration: 40, is_sync: false },
        ];
        let buffer = creator.create(frames, Cursor::new(Vec::new()), false, 1000, false).unwrap();
        let bytes = buffer.into_inner();
        assert_eq!(&bytes[8..12], &SignatureBox.write().unwrap()[..]);

        let movie = crate::mj2::moov::find_and_read_moov(&bytes[12..]).unwrap();
        assert_eq!(movie.video_track.media.media_info.sample_table.sample_size.sample_count(), 2);
    }

    #[test]
    fn creator_rejects_inconsistent_dimensions() {
        let codec = IdentityCodec;
        let creator = MJ2Creator::new(&codec);
        let mut mismatched = sample_image();
        mismatched.width = 32;
        let frames = vec![
            CreatorFrame { image: sample_image(), samples: vec![1], duration: 40, is_sync: true },
            CreatorFrame { image: mismatched, samples: vec![2], duration: 40, is_sync: true },
        ];
        assert!(matches!(
            creator.create(frames, Cursor::new(Vec::new()), false, 1000, false),
            Err(Jp2Error::InconsistentDimensions)
        ));
    }

    #[test]
    fn cancellation_before_finalize_raises_cancelled() {
        let codec = IdentityCodec;
        let creator = MJ2Creator::new(&codec);
        creator.cancel();
        let frames = vec![CreatorFrame { image: sample_image(), samples: vec![1], duration: 40, is_sync: true }];
        assert!(matches!(
            creator.create(frames, Cursor::new(Vec::new()), false, 1000, false),
            Err(Jp2Error::Cancelled)
        ));
    }
}
