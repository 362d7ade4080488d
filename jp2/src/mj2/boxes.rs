//! The subset of the ISO base media box hierarchy MJ2 requires (§4.5.1):
//! `moov/mvhd/trak/tkhd/mdia/mdhd/hdlr/minf/vmhd/dinf/dref/stbl/stsd`.
//! Each follows the same `read`/`write` pair as the JP2 payload codecs.

use crate::boxes::{JBox, RawBox};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

pub const BOX_TYPE_MOVIE: BoxType = *b"moov";
pub const BOX_TYPE_MOVIE_HEADER: BoxType = *b"mvhd";
pub const BOX_TYPE_TRACK: BoxType = *b"trak";
pub const BOX_TYPE_TRACK_HEADER: BoxType = *b"tkhd";
pub const BOX_TYPE_MEDIA: BoxType = *b"mdia";
pub const BOX_TYPE_MEDIA_HEADER: BoxType = *b"mdhd";
pub const BOX_TYPE_HANDLER: BoxType = *b"hdlr";
pub const BOX_TYPE_MEDIA_INFO: BoxType = *b"minf";
pub const BOX_TYPE_VIDEO_MEDIA_HEADER: BoxType = *b"vmhd";
pub const BOX_TYPE_SOUND_MEDIA_HEADER: BoxType = *b"smhd";
pub const BOX_TYPE_DATA_INFO: BoxType = *b"dinf";
pub const BOX_TYPE_DATA_REFERENCE: BoxType = *b"dref";
pub const BOX_TYPE_DATA_ENTRY_URL_MJ2: BoxType = *b"url ";
pub const BOX_TYPE_SAMPLE_TABLE: BoxType = *b"stbl";
pub const BOX_TYPE_SAMPLE_DESCRIPTION: BoxType = *b"stsd";
pub const BOX_TYPE_TIME_TO_SAMPLE: BoxType = *b"stts";
pub const BOX_TYPE_SAMPLE_TO_CHUNK: BoxType = *b"stsc";
pub const BOX_TYPE_SAMPLE_SIZE: BoxType = *b"stsz";
pub const BOX_TYPE_CHUNK_OFFSET: BoxType = *b"stco";
pub const BOX_TYPE_CHUNK_OFFSET_64: BoxType = *b"co64";
pub const BOX_TYPE_SYNC_SAMPLE: BoxType = *b"stss";
pub const BOX_TYPE_MEDIA_DATA: BoxType = *b"mdat";

fn need(content: &[u8], len: usize, what: &str) -> Result<(), Jp2Error> {
    if content.len() < len {
        Err(Jp2Error::Truncated(format!("{what} needs {len} bytes, got {}", content.len())))
    } else {
        Ok(())
    }
}

/// `mvhd` -- movie header: timescale/duration and default presentation rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieHeaderBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub creation_time: u32,
    pub modification_time: u32,
    pub timescale: u32,
    pub duration: u32,
    pub rate: i32,
    pub volume: i16,
    pub next_track_id: u32,
}

impl Default for MovieHeaderBox {
    fn default() -> Self {
        MovieHeaderBox {
            version: 0,
            flags: [0; 3],
            creation_time: 0,
            modification_time: 0,
            timescale: 0,
            duration: 0,
            rate: 0x0001_0000,
            volume: 0x0100,
            next_track_id: 2,
        }
    }
}

impl JBox for MovieHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_MOVIE_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 24, "mvhd")?;
        Ok(MovieHeaderBox {
            version: content[0],
            flags: [content[1], content[2], content[3]],
            creation_time: u32::from_be_bytes(content[4..8].try_into().unwrap()),
            modification_time: u32::from_be_bytes(content[8..12].try_into().unwrap()),
            timescale: u32::from_be_bytes(content[12..16].try_into().unwrap()),
            duration: u32::from_be_bytes(content[16..20].try_into().unwrap()),
            rate: i32::from_be_bytes(content[20..24].try_into().unwrap()),
            volume: if content.len() >= 26 {
                i16::from_be_bytes(content[24..26].try_into().unwrap())
            } else {
                0x0100
            },
            next_track_id: if content.len() >= 36 {
                u32::from_be_bytes(content[32..36].try_into().unwrap())
            } else {
                2
            },
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(36);
        out.push(self.version);
        out.extend_from_slice(&self.flags);
        out.extend_from_slice(&self.creation_time.to_be_bytes());
        out.extend_from_slice(&self.modification_time.to_be_bytes());
        out.extend_from_slice(&self.timescale.to_be_bytes());
        out.extend_from_slice(&self.duration.to_be_bytes());
        out.extend_from_slice(&self.rate.to_be_bytes());
        out.extend_from_slice(&self.volume.to_be_bytes());
        out.extend_from_slice(&[0u8; 10]); // reserved
        out.extend_from_slice(&self.next_track_id.to_be_bytes());
        Ok(out)
    }
}

/// `tkhd` -- track header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHeaderBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub creation_time: u32,
    pub modification_time: u32,
    pub track_id: u32,
    pub duration: u32,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: i16,
    pub width: u32,
    pub height: u32,
}

impl TrackHeaderBox {
    pub fn enabled(&self) -> bool {
        self.flags[2] & 0x01 == 0x01
    }
}

impl JBox for TrackHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_TRACK_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 84, "tkhd")?;
        Ok(TrackHeaderBox {
            version: content[0],
            flags: [content[1], content[2], content[3]],
            creation_time: u32::from_be_bytes(content[4..8].try_into().unwrap()),
            modification_time: u32::from_be_bytes(content[8..12].try_into().unwrap()),
            track_id: u32::from_be_bytes(content[12..16].try_into().unwrap()),
            duration: u32::from_be_bytes(content[20..24].try_into().unwrap()),
            layer: i16::from_be_bytes(content[32..34].try_into().unwrap()),
            alternate_group: i16::from_be_bytes(content[34..36].try_into().unwrap()),
            volume: i16::from_be_bytes(content[36..38].try_into().unwrap()),
            width: u32::from_be_bytes(content[76..80].try_into().unwrap()),
            height: u32::from_be_bytes(content[80..84].try_into().unwrap()),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![0u8; 84];
        out[0] = self.version;
        out[1..4].copy_from_slice(&self.flags);
        out[4..8].copy_from_slice(&self.creation_time.to_be_bytes());
        out[8..12].copy_from_slice(&self.modification_time.to_be_bytes());
        out[12..16].copy_from_slice(&self.track_id.to_be_bytes());
        out[20..24].copy_from_slice(&self.duration.to_be_bytes());
        out[32..34].copy_from_slice(&self.layer.to_be_bytes());
        out[34..36].copy_from_slice(&self.alternate_group.to_be_bytes());
        out[36..38].copy_from_slice(&self.volume.to_be_bytes());
        // bytes 40..76: unity 3x3 transformation matrix, identity by default.
        out[40..44].copy_from_slice(&0x0001_0000i32.to_be_bytes());
        out[56..60].copy_from_slice(&0x0001_0000i32.to_be_bytes());
        out[72..76].copy_from_slice(&0x4000_0000i32.to_be_bytes());
        out[76..80].copy_from_slice(&self.width.to_be_bytes());
        out[80..84].copy_from_slice(&self.height.to_be_bytes());
        Ok(out)
    }
}

/// `mdhd` -- media header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaHeaderBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub creation_time: u32,
    pub modification_time: u32,
    pub timescale: u32,
    pub duration: u32,
    pub language: u16,
    pub pre_defined: u16,
}

impl JBox for MediaHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_MEDIA_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 24, "mdhd")?;
        Ok(MediaHeaderBox {
            version: content[0],
            flags: [content[1], content[2], content[3]],
            creation_time: u32::from_be_bytes(content[4..8].try_into().unwrap()),
            modification_time: u32::from_be_bytes(content[8..12].try_into().unwrap()),
            timescale: u32::from_be_bytes(content[12..16].try_into().unwrap()),
            duration: u32::from_be_bytes(content[16..20].try_into().unwrap()),
            language: u16::from_be_bytes(content[20..22].try_into().unwrap()),
            pre_defined: u16::from_be_bytes(content[22..24].try_into().unwrap()),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(24);
        out.push(self.version);
        out.extend_from_slice(&self.flags);
        out.extend_from_slice(&self.creation_time.to_be_bytes());
        out.extend_from_slice(&self.modification_time.to_be_bytes());
        out.extend_from_slice(&self.timescale.to_be_bytes());
        out.extend_from_slice(&self.duration.to_be_bytes());
        out.extend_from_slice(&self.language.to_be_bytes());
        out.extend_from_slice(&self.pre_defined.to_be_bytes());
        Ok(out)
    }
}

pub const HANDLER_TYPE_VIDEO: [u8; 4] = *b"vide";

/// `hdlr` -- handler reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub handler_type: [u8; 4],
    pub name: String,
}

impl JBox for HandlerBox {
    fn box_type() -> BoxType {
        BOX_TYPE_HANDLER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 24, "hdlr")?;
        let handler_type: [u8; 4] = content[8..12].try_into().unwrap();
        let name_bytes = &content[24..];
        let name = String::from_utf8(
            name_bytes
                .iter()
                .copied()
                .take_while(|&b| b != 0)
                .collect(),
        )
        .map_err(|e| Jp2Error::FileFormat(format!("hdlr name is not UTF-8: {e}")))?;
        Ok(HandlerBox {
            version: content[0],
            flags: [content[1], content[2], content[3]],
            handler_type,
            name,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(25 + self.name.len());
        out.push(self.version);
        out.extend_from_slice(&self.flags);
        out.extend_from_slice(&[0u8; 4]); // pre_defined
        out.extend_from_slice(&self.handler_type);
        out.extend_from_slice(&[0u8; 12]); // reserved
        out.extend_from_slice(self.name.as_bytes());
        out.push(0);
        Ok(out)
    }
}

/// `vmhd` -- video media header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMediaHeaderBox {
    pub graphics_mode: u16,
    pub opcolor: [u16; 3],
}

impl Default for VideoMediaHeaderBox {
    fn default() -> Self {
        VideoMediaHeaderBox {
            graphics_mode: 0,
            opcolor: [0; 3],
        }
    }
}

impl JBox for VideoMediaHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_VIDEO_MEDIA_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 12, "vmhd")?;
        Ok(VideoMediaHeaderBox {
            graphics_mode: u16::from_be_bytes(content[4..6].try_into().unwrap()),
            opcolor: [
                u16::from_be_bytes(content[6..8].try_into().unwrap()),
                u16::from_be_bytes(content[8..10].try_into().unwrap()),
                u16::from_be_bytes(content[10..12].try_into().unwrap()),
            ],
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(12);
        out.push(0); // version
        out.extend_from_slice(&[0, 0, 1]); // flags, always 1
        out.extend_from_slice(&self.graphics_mode.to_be_bytes());
        for c in &self.opcolor {
            out.extend_from_slice(&c.to_be_bytes());
        }
        Ok(out)
    }
}

/// `url ` as a `dref` entry: this engine always writes the self-contained
/// form (flag bit 0 set, no string body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEntryUrlBox {
    pub self_contained: bool,
}

impl JBox for DataEntryUrlBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DATA_ENTRY_URL_MJ2
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 4, "url ")?;
        Ok(DataEntryUrlBox {
            self_contained: content[3] & 0x01 == 0x01,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(vec![0, 0, 0, if self.self_contained { 1 } else { 0 }])
    }
}

/// `dref` -- data reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataReferenceBox {
    pub entries: Vec<DataEntryUrlBox>,
}

impl JBox for DataReferenceBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DATA_REFERENCE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 4, "dref")?;
        let mut reader = BoxReader::new(&content[4..]);
        let mut entries = Vec::new();
        while let Some(info) = reader.read_next()? {
            entries.push(DataEntryUrlBox::read(reader.extract_content(&info))?);
        }
        Ok(DataReferenceBox { entries })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::new();
        out.extend_from_slice(&[0u8; 3]); // version + flags
        out.push(0);
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());
        let mut writer = BoxWriter::new();
        for entry in &self.entries {
            writer.write_box(DataEntryUrlBox::box_type(), &entry.write()?);
        }
        out.extend_from_slice(writer.bytes());
        Ok(out)
    }
}

/// `dinf` -- data information super-box, wrapping a single `dref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataInfoBox {
    pub data_reference: DataReferenceBox,
}

impl JBox for DataInfoBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DATA_INFO
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut reader = BoxReader::new(content);
        let info = reader
            .read_next()?
            .ok_or_else(|| Jp2Error::FileFormat("dinf is missing dref".to_string()))?;
        Ok(DataInfoBox {
            data_reference: DataReferenceBox::read(reader.extract_content(&info))?,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(DataReferenceBox::box_type(), &self.data_reference.write()?);
        Ok(writer.into_bytes())
    }
}

impl Default for DataInfoBox {
    fn default() -> Self {
        DataInfoBox {
            data_reference: DataReferenceBox {
                entries: vec![DataEntryUrlBox { self_contained: true }],
            },
        }
    }
}

/// `stsd` -- sample description: this engine always writes exactly one
/// entry, tagged `mjp2`, with the ISO visual sample description header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualSampleEntry {
    pub width: u16,
    pub height: u16,
    pub horiz_resolution: u32,
    pub vert_resolution: u32,
    pub compressor_name: [u8; 32],
    pub depth: u16,
}

impl Default for VisualSampleEntry {
    fn default() -> Self {
        VisualSampleEntry {
            width: 0,
            height: 0,
            horiz_resolution: 0x0048_0000, // 72 dpi, 16.16 fixed
            vert_resolution: 0x0048_0000,
            compressor_name: [0; 32],
            depth: 0x18,
        }
    }
}

impl VisualSampleEntry {
    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 78, "mjp2 sample entry")?;
        Ok(VisualSampleEntry {
            width: u16::from_be_bytes(content[24..26].try_into().unwrap()),
            height: u16::from_be_bytes(content[26..28].try_into().unwrap()),
            horiz_resolution: u32::from_be_bytes(content[28..32].try_into().unwrap()),
            vert_resolution: u32::from_be_bytes(content[32..36].try_into().unwrap()),
            compressor_name: content[40..72].try_into().unwrap(),
            depth: u16::from_be_bytes(content[72..74].try_into().unwrap()),
        })
    }

    fn write(&self) -> Vec<u8> {
        let mut out = vec![0u8; 78];
        out[6..8].copy_from_slice(&1u16.to_be_bytes()); // data_reference_index
        out[24..26].copy_from_slice(&self.width.to_be_bytes());
        out[26..28].copy_from_slice(&self.height.to_be_bytes());
        out[28..32].copy_from_slice(&self.horiz_resolution.to_be_bytes());
        out[32..36].copy_from_slice(&self.vert_resolution.to_be_bytes());
        out[38..40].copy_from_slice(&1u16.to_be_bytes()); // frame_count
        out[40..72].copy_from_slice(&self.compressor_name);
        out[72..74].copy_from_slice(&self.depth.to_be_bytes());
        out[74..76].copy_from_slice(&0xFFFFu16.to_be_bytes()); // pre_defined = -1
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescriptionBox {
    pub entry: VisualSampleEntry,
}

impl JBox for SampleDescriptionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SAMPLE_DESCRIPTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        need(content, 8, "stsd")?;
        let mut reader = BoxReader::new(&content[8..]);
        let info = reader
            .read_next()?
            .ok_or_else(|| Jp2Error::FileFormat("stsd has no sample entry".to_string()))?;
        Ok(SampleDescriptionBox {
            entry: VisualSampleEntry::read(reader.extract_content(&info))?,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::new();
        out.extend_from_slice(&[0u8; 4]); // version + flags
        out.extend_from_slice(&1u32.to_be_bytes()); // entry_count
        let mut writer = BoxWriter::new();
        writer.write_box(*b"mjp2", &self.entry.write());
        out.extend_from_slice(writer.bytes());
        Ok(out)
    }
}

/// Reads any super-box's immediate children into the recognized-vs-unknown
/// split every MJ2 super-box uses.
pub(crate) fn split_children(content: &[u8]) -> Result<Vec<(BoxType, Vec<u8>)>, Jp2Error> {
    let mut reader = BoxReader::new(content);
    let mut out = Vec::new();
    while let Some(info) = reader.read_next()? {
        out.push((info.box_type, reader.extract_content(&info).to_vec()));
    }
    Ok(out)
}

pub(crate) fn raw(box_type: BoxType, content: Vec<u8>) -> RawBox {
    RawBox::new(box_type, content)
}
