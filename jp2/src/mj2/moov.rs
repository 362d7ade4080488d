//! The super-box hierarchy that assembles the leaf boxes of [`super::boxes`]
//! and [`super::sample_table`] into `moov` (§4.5.1). Unknown children of
//! every super-box level are preserved as [`RawBox`], as elsewhere.

use crate::boxes::{JBox, RawBox};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;
use crate::mj2::boxes::{
    split_children, DataInfoBox, HandlerBox, MediaHeaderBox, MovieHeaderBox, SampleDescriptionBox,
    TrackHeaderBox, VideoMediaHeaderBox, BOX_TYPE_DATA_INFO, BOX_TYPE_HANDLER, BOX_TYPE_MEDIA,
    BOX_TYPE_MEDIA_HEADER, BOX_TYPE_MEDIA_INFO, BOX_TYPE_MOVIE, BOX_TYPE_MOVIE_HEADER,
    BOX_TYPE_SAMPLE_DESCRIPTION, BOX_TYPE_SAMPLE_TABLE, BOX_TYPE_TRACK, BOX_TYPE_TRACK_HEADER,
    BOX_TYPE_VIDEO_MEDIA_HEADER,
};
use crate::mj2::sample_table::{
    ChunkOffsetBox, SampleSizeBox, SampleTableBoxes, SampleToChunkBox, SyncSampleBox, TimeToSampleBox,
};

/// `stbl` -- sample table super-box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTableBox {
    pub sample_description: SampleDescriptionBox,
    pub time_to_sample: TimeToSampleBox,
    pub sample_to_chunk: SampleToChunkBox,
    pub sample_size: SampleSizeBox,
    pub chunk_offset: ChunkOffsetBox,
    pub sync_sample: Option<SyncSampleBox>,
    pub unknown: Vec<RawBox>,
}

impl SampleTableBox {
    pub fn from_boxes(sample_description: SampleDescriptionBox, tables: SampleTableBoxes) -> Self {
        SampleTableBox {
            sample_description,
            time_to_sample: tables.time_to_sample,
            sample_to_chunk: tables.sample_to_chunk,
            sample_size: tables.sample_size,
            chunk_offset: tables.chunk_offset,
            sync_sample: tables.sync_sample,
            unknown: Vec::new(),
        }
    }

    pub fn tables(&self) -> SampleTableBoxes {
        SampleTableBoxes {
            sample_size: self.sample_size.clone(),
            sample_to_chunk: self.sample_to_chunk.clone(),
            chunk_offset: self.chunk_offset.clone(),
            time_to_sample: self.time_to_sample.clone(),
            sync_sample: self.sync_sample.clone(),
        }
    }
}

impl JBox for SampleTableBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SAMPLE_TABLE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        use crate::mj2::boxes::{
            BOX_TYPE_CHUNK_OFFSET, BOX_TYPE_CHUNK_OFFSET_64, BOX_TYPE_SAMPLE_SIZE,
            BOX_TYPE_SAMPLE_TO_CHUNK, BOX_TYPE_SYNC_SAMPLE, BOX_TYPE_TIME_TO_SAMPLE,
        };

        let mut sample_description = None;
        let mut time_to_sample = None;
        let mut sample_to_chunk = None;
        let mut sample_size = None;
        let mut chunk_offset = None;
        let mut sync_sample = None;
        let mut unknown = Vec::new();

        for (box_type, child) in split_children(content)? {
            match box_type {
                t if t == BOX_TYPE_SAMPLE_DESCRIPTION => {
                    sample_description = Some(SampleDescriptionBox::read(&child)?)
                }
                t if t == BOX_TYPE_TIME_TO_SAMPLE => time_to_sample = Some(TimeToSampleBox::read(&child)?),
                t if t == BOX_TYPE_SAMPLE_TO_CHUNK => sample_to_chunk = Some(SampleToChunkBox::read(&child)?),
                t if t == BOX_TYPE_SAMPLE_SIZE => sample_size = Some(SampleSizeBox::read(&child)?),
                t if t == BOX_TYPE_CHUNK_OFFSET || t == BOX_TYPE_CHUNK_OFFSET_64 => {
                    chunk_offset = Some(ChunkOffsetBox::read(box_type, &child)?)
                }
                t if t == BOX_TYPE_SYNC_SAMPLE => sync_sample = Some(SyncSampleBox::read(&child)?),
                other => unknown.push(RawBox::new(other, child)),
            }
        }

        Ok(SampleTableBox {
            sample_description: sample_description
                .ok_or_else(|| Jp2Error::FileFormat("stbl is missing stsd".to_string()))?,
            time_to_sample: time_to_sample
                .ok_or_else(|| Jp2Error::FileFormat("stbl is missing stts".to_string()))?,
            sample_to_chunk: sample_to_chunk
                .ok_or_else(|| Jp2Error::FileFormat("stbl is missing stsc".to_string()))?,
            sample_size: sample_size
                .ok_or_else(|| Jp2Error::FileFormat("stbl is missing stsz".to_string()))?,
            chunk_offset: chunk_offset
                .ok_or_else(|| Jp2Error::FileFormat("stbl is missing stco/co64".to_string()))?,
            sync_sample,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(SampleDescriptionBox::box_type(), &self.sample_description.write()?);
        writer.write_box(TimeToSampleBox::box_type(), &self.time_to_sample.write()?);
        writer.write_box(SampleToChunkBox::box_type(), &self.sample_to_chunk.write()?);
        writer.write_box(SampleSizeBox::box_type(), &self.sample_size.write()?);
        writer.write_box(self.chunk_offset.box_type_for(), &self.chunk_offset.write()?);
        if let Some(stss) = &self.sync_sample {
            writer.write_box(SyncSampleBox::box_type(), &stss.write()?);
        }
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

/// `minf` -- media information super-box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfoBox {
    pub video_media_header: VideoMediaHeaderBox,
    pub data_info: DataInfoBox,
    pub sample_table: SampleTableBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for MediaInfoBox {
    fn box_type() -> BoxType {
        BOX_TYPE_MEDIA_INFO
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut video_media_header = None;
        let mut data_info = None;
        let mut sample_table = None;
        let mut unknown = Vec::new();

        for (box_type, child) in split_children(content)? {
            match box_type {
                t if t == BOX_TYPE_VIDEO_MEDIA_HEADER => {
                    video_media_header = Some(VideoMediaHeaderBox::read(&child)?)
                }
                t if t == BOX_TYPE_DATA_INFO => data_info = Some(DataInfoBox::read(&child)?),
                t if t == BOX_TYPE_SAMPLE_TABLE => sample_table = Some(SampleTableBox::read(&child)?),
                other => unknown.push(RawBox::new(other, child)),
            }
        }

        Ok(MediaInfoBox {
            video_media_header: video_media_header
                .ok_or_else(|| Jp2Error::FileFormat("minf is missing vmhd".to_string()))?,
            data_info: data_info.ok_or_else(|| Jp2Error::FileFormat("minf is missing dinf".to_string()))?,
            sample_table: sample_table
                .ok_or_else(|| Jp2Error::FileFormat("minf is missing stbl".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(VideoMediaHeaderBox::box_type(), &self.video_media_header.write()?);
        writer.write_box(DataInfoBox::box_type(), &self.data_info.write()?);
        writer.write_box(SampleTableBox::box_type(), &self.sample_table.write()?);
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

/// `mdia` -- media super-box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBox {
    pub media_header: MediaHeaderBox,
    pub handler: HandlerBox,
    pub media_info: MediaInfoBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for MediaBox {
    fn box_type() -> BoxType {
        BOX_TYPE_MEDIA
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut media_header = None;
        let mut handler = None;
        let mut media_info = None;
        let mut unknown = Vec::new();

        for (box_type, child) in split_children(content)? {
            match box_type {
                t if t == BOX_TYPE_MEDIA_HEADER => media_header = Some(MediaHeaderBox::read(&child)?),
                t if t == BOX_TYPE_HANDLER => handler = Some(HandlerBox::read(&child)?),
                t if t == BOX_TYPE_MEDIA_INFO => media_info = Some(MediaInfoBox::read(&child)?),
                other => unknown.push(RawBox::new(other, child)),
            }
        }

        Ok(MediaBox {
            media_header: media_header
                .ok_or_else(|| Jp2Error::FileFormat("mdia is missing mdhd".to_string()))?,
            handler: handler.ok_or_else(|| Jp2Error::FileFormat("mdia is missing hdlr".to_string()))?,
            media_info: media_info
                .ok_or_else(|| Jp2Error::FileFormat("mdia is missing minf".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(MediaHeaderBox::box_type(), &self.media_header.write()?);
        writer.write_box(HandlerBox::box_type(), &self.handler.write()?);
        writer.write_box(MediaInfoBox::box_type(), &self.media_info.write()?);
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

/// `trak` -- track super-box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackBox {
    pub track_header: TrackHeaderBox,
    pub media: MediaBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for TrackBox {
    fn box_type() -> BoxType {
        BOX_TYPE_TRACK
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut track_header = None;
        let mut media = None;
        let mut unknown = Vec::new();

        for (box_type, child) in split_children(content)? {
            match box_type {
                t if t == BOX_TYPE_TRACK_HEADER => track_header = Some(TrackHeaderBox::read(&child)?),
                t if t == BOX_TYPE_MEDIA => media = Some(MediaBox::read(&child)?),
                other => unknown.push(RawBox::new(other, child)),
            }
        }

        Ok(TrackBox {
            track_header: track_header
                .ok_or_else(|| Jp2Error::FileFormat("trak is missing tkhd".to_string()))?,
            media: media.ok_or_else(|| Jp2Error::FileFormat("trak is missing mdia".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(TrackHeaderBox::box_type(), &self.track_header.write()?);
        writer.write_box(MediaBox::box_type(), &self.media.write()?);
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

/// `moov` -- movie super-box. This engine models single-video-track MJ2;
/// any other top-level tracks (e.g. a reserved audio track) are preserved
/// as opaque `Raw` children on read but never synthesized on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieBox {
    pub movie_header: MovieHeaderBox,
    pub video_track: TrackBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for MovieBox {
    fn box_type() -> BoxType {
        BOX_TYPE_MOVIE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut movie_header = None;
        let mut video_track = None;
        let mut unknown = Vec::new();

        for (box_type, child) in split_children(content)? {
            match box_type {
                t if t == BOX_TYPE_MOVIE_HEADER => movie_header = Some(MovieHeaderBox::read(&child)?),
                t if t == BOX_TYPE_TRACK => {
                    let track = TrackBox::read(&child)?;
                    if track.media.handler.handler_type == crate::mj2::boxes::HANDLER_TYPE_VIDEO
                        && video_track.is_none()
                    {
                        video_track = Some(track);
                    } else {
                        unknown.push(RawBox::new(box_type, child));
                    }
                }
                other => unknown.push(RawBox::new(other, child)),
            }
        }

        Ok(MovieBox {
            movie_header: movie_header
                .ok_or_else(|| Jp2Error::FileFormat("moov is missing mvhd".to_string()))?,
            video_track: video_track
                .ok_or_else(|| Jp2Error::FileFormat("moov has no video track".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(MovieHeaderBox::box_type(), &self.movie_header.write()?);
        writer.write_box(TrackBox::box_type(), &self.video_track.write()?);
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

/// Reads a top-level `moov` box out of a full MJ2 buffer (past the
/// signature/`ftyp`/`mdat`).
pub fn find_and_read_moov(buffer: &[u8]) -> Result<MovieBox, Jp2Error> {
    let mut reader = BoxReader::new(buffer);
    while let Some(info) = reader.read_next()? {
        if info.box_type == BOX_TYPE_MOVIE {
            return MovieBox::read(reader.extract_content(&info));
        }
    }
    Err(Jp2Error::FileFormat("no moov box found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mj2::boxes::{DataEntryUrlBox, DataReferenceBox, VisualSampleEntry, HANDLER_TYPE_VIDEO};
    use crate::mj2::sample_table::SampleTableBuilder;

    fn sample_movie_box() -> MovieBox {
        let mut builder = SampleTableBuilder::new(false);
        builder.add_sample(100, 0, 40, true);
        builder.add_sample(90, 100, 40, true);
        let tables = builder.build_all();

        let stbl = SampleTableBox::from_boxes(
            SampleDescriptionBox {
                entry: VisualSampleEntry { width: 64, height: 32, ..Default::default() },
            },
            tables,
        );

        MovieBox {
            movie_header: MovieHeaderBox { timescale: 1000, duration: 80, ..Default::default() },
            video_track: TrackBox {
                track_header: TrackHeaderBox {
                    version: 0,
                    flags: [0, 0, 1],
                    creation_time: 0,
                    modification_time: 0,
                    track_id: 1,
                    duration: 80,
                    layer: 0,
                    alternate_group: 0,
                    volume: 0,
                    width: 64 << 16,
                    height: 32 << 16,
                },
                media: MediaBox {
                    media_header: MediaHeaderBox {
                        version: 0,
                        flags: [0; 3],
                        creation_time: 0,
                        modification_time: 0,
                        timescale: 1000,
                        duration: 80,
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
        }
    }

    #[test]
    fn moov_round_trips() {
        let movie = sample_movie_box();
        let content = movie.write().unwrap();
        let read_back = MovieBox::read(&content).unwrap();
        assert_eq!(read_back, movie);
    }

    #[test]
    fn find_and_read_moov_locates_the_box_among_siblings() {
        let movie = sample_movie_box();
        let mut writer = BoxWriter::new();
        writer.write_box(*b"free", &[1, 2, 3]);
        writer.write_box(MovieBox::box_type(), &movie.write().unwrap());
        let buffer = writer.into_bytes();
        let read_back = find_and_read_moov(&buffer).unwrap();
        assert_eq!(read_back, movie);
    }
}
