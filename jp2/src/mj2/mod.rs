//! Motion JPEG 2000 (ISO/IEC 15444-3): the ISO-base-media box hierarchy
//! (§4.5.1), sample-table algorithms (§4.5), the streaming writer/creator
//! (§4.6), and the playback engine (§4.7).

pub mod boxes;
pub mod moov;
pub mod player;
pub mod sample_table;
pub mod writer;
