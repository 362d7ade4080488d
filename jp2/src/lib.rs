#![allow(dead_code)]

//! The JPEG 2000 family container engine (JP2/JPX/MJ2/JPM/JPH): box
//! framing, the standardized box payload codecs, container assembly,
//! the MJ2 ISO-base-media subsystem (sample tables, streaming writer,
//! player), and JPX reader-requirements negotiation.
//!
//! This crate understands the file format only -- wavelet
//! compression/decompression is delegated to an external [`jpc::Codec`].

pub mod boxes;
pub mod boxing;
pub mod bytes;
pub mod container;
pub mod error;
pub mod jpx;
pub mod mj2;

pub use boxing::{BoxInfo, BoxReader, BoxType, BoxWriter};
pub use container::{read_container, write_container, Brand, ComponentDescriptor, ContainerImage, detect_format};
pub use error::Jp2Error;
pub use mj2::player::{LoopMode, MJ2Player, PlayMode, PlayerStatistics};
pub use mj2::writer::{validate_simple_profile, CreatorFrame, MJ2Creator, StreamWriter};
pub use jpx::{validate_combination, validate_decoder, Compatibility, Feature, RReq, ValidationIssue};
