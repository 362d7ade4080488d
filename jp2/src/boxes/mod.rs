//! One module per family of standardized box payloads (§4.3 / §4.3.1 of
//! the design document). Every payload type implements [`JBox`]: a pure,
//! allocation-owning `read`/`write` pair keyed by a fixed [`BoxType`]
//! constant.

pub mod codestream;
pub mod composition;
pub mod fragment;
pub mod header;
pub mod jpm;
pub mod metadata;
pub mod reader_requirements;
pub mod resolution;
pub mod signature;
pub mod uuid;
pub mod xml;

use crate::boxing::BoxType;
use crate::error::Jp2Error;

pub const BOX_TYPE_SIGNATURE: BoxType = *b"jP  ";
pub const BOX_TYPE_FILE_TYPE: BoxType = *b"ftyp";
pub const BOX_TYPE_HEADER: BoxType = *b"jp2h";
pub const BOX_TYPE_IMAGE_HEADER: BoxType = *b"ihdr";
pub const BOX_TYPE_BITS_PER_COMPONENT: BoxType = *b"bpcc";
pub const BOX_TYPE_COLOUR_SPECIFICATION: BoxType = *b"colr";
pub const BOX_TYPE_PALETTE: BoxType = *b"pclr";
pub const BOX_TYPE_COMPONENT_MAPPING: BoxType = *b"cmap";
pub const BOX_TYPE_CHANNEL_DEFINITION: BoxType = *b"cdef";
pub const BOX_TYPE_RESOLUTION: BoxType = *b"res ";
pub const BOX_TYPE_CAPTURE_RESOLUTION: BoxType = *b"resc";
pub const BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION: BoxType = *b"resd";
pub const BOX_TYPE_CONTIGUOUS_CODESTREAM: BoxType = *b"jp2c";
pub const BOX_TYPE_INTELLECTUAL_PROPERTY: BoxType = *b"jp2i";
pub const BOX_TYPE_XML: BoxType = *b"xml ";
pub const BOX_TYPE_UUID: BoxType = *b"uuid";
pub const BOX_TYPE_UUID_INFO: BoxType = *b"uinf";
pub const BOX_TYPE_UUID_LIST: BoxType = *b"ulst";
pub const BOX_TYPE_DATA_ENTRY_URL: BoxType = *b"url ";
pub const BOX_TYPE_FRAGMENT_TABLE: BoxType = *b"ftbl";
pub const BOX_TYPE_FRAGMENT_LIST: BoxType = *b"flst";
pub const BOX_TYPE_COMPOSITION: BoxType = *b"comp";
pub const BOX_TYPE_COMPOSITING_LAYER_HEADER: BoxType = *b"jplh";
pub const BOX_TYPE_INSTRUCTION_SET: BoxType = *b"inst";
pub const BOX_TYPE_OPACITY: BoxType = *b"opct";
pub const BOX_TYPE_CODESTREAM_REGISTRATION: BoxType = *b"creg";
pub const BOX_TYPE_COLOUR_GROUP: BoxType = *b"cgrp";
pub const BOX_TYPE_PAGE_COLLECTION: BoxType = *b"pcol";
pub const BOX_TYPE_PAGE: BoxType = *b"page";
pub const BOX_TYPE_LAYOUT_OBJECT: BoxType = *b"lobj";
pub const BOX_TYPE_READER_REQUIREMENTS: BoxType = *b"rreq";
pub const BOX_TYPE_DIGITAL_SIGNATURE: BoxType = *b"dsig";
pub const BOX_TYPE_ROI_DESCRIPTION: BoxType = *b"roid";
pub const BOX_TYPE_LABEL: BoxType = *b"lbl ";
pub const BOX_TYPE_ASSOCIATION: BoxType = *b"asoc";
pub const BOX_TYPE_NUMBER_LIST: BoxType = *b"nlst";
pub const BOX_TYPE_CROSS_REFERENCE: BoxType = *b"cref";

/// A box payload codec: a fixed type tag plus a pure `read`/`write` pair.
/// `read` takes the box *content* (header already stripped by
/// [`crate::boxing::BoxReader`]); `write` produces the content only, with
/// the header applied by [`crate::boxing::BoxWriter`].
pub trait JBox: Sized {
    fn box_type() -> BoxType;
    fn read(content: &[u8]) -> Result<Self, Jp2Error>;
    fn write(&self) -> Result<Vec<u8>, Jp2Error>;
}

/// An unrecognized child of a super-box, preserved byte-for-byte so that a
/// read/modify/write round trip never silently drops information (§8
/// scenario F).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBox {
    pub box_type: BoxType,
    pub content: Vec<u8>,
}

impl RawBox {
    pub fn new(box_type: BoxType, content: Vec<u8>) -> Self {
        RawBox { box_type, content }
    }
}
