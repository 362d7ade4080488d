use std::io::Cursor;

use jp2::{detect_format, read_container, write_container, Brand, ComponentDescriptor};
use jp2::{CreatorFrame, MJ2Creator};
use jp2::MJ2Player;
use jpc::{Codec, ComponentSummary, ImageSummary, JpcError};

struct IdentityCodec;

impl Codec for IdentityCodec {
    fn encode(&self, _image: &ImageSummary, samples: &[u8]) -> Result<Vec<u8>, JpcError> {
        Ok(samples.to_vec())
    }
    fn decode(&self, codestream: &[u8]) -> Result<(ImageSummary, Vec<u8>), JpcError> {
        Ok((
            ImageSummary {
                width: 8,
                height: 8,
                components: vec![ComponentSummary {
                    bit_depth: 8,
                    signed: false,
                    subsampling_x: 1,
                    subsampling_y: 1,
                    width: 8,
                    height: 8,
                }],
            },
            codestream.to_vec(),
        ))
    }
}

fn sample_codestream(components: u16) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&jpc::MARKER_SYMBOL_SOC);
    bytes.extend_from_slice(&jpc::MARKER_SYMBOL_SIZ);
    bytes.extend_from_slice(&(38 + 3 * components).to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&64u32.to_be_bytes());
    bytes.extend_from_slice(&128u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&64u32.to_be_bytes());
    bytes.extend_from_slice(&128u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&components.to_be_bytes());
    for _ in 0..components {
        bytes.push(7);
        bytes.push(1);
        bytes.push(1);
    }
    bytes
}

#[test]
fn writes_and_reads_back_a_jp2_file() {
    let codestream = sample_codestream(3);
    let components = vec![
        ComponentDescriptor { bit_depth: 8, signed: false },
        ComponentDescriptor { bit_depth: 8, signed: false },
        ComponentDescriptor { bit_depth: 8, signed: false },
    ];
    let bytes = write_container(Brand::Jp2, 128, 64, &components, &codestream).unwrap();

    assert_eq!(detect_format(&bytes).unwrap(), Brand::Jp2);

    let container = read_container(&bytes).unwrap();
    assert_eq!(container.codestream, codestream);
    assert_eq!(container.image_info.reference_grid_width(), 64);
    assert_eq!(container.image_info.reference_grid_height(), 128);
}

#[test]
fn detects_a_raw_codestream_by_its_marker_prefix() {
    let codestream = sample_codestream(1);
    assert_eq!(detect_format(&codestream).unwrap(), Brand::J2k);
}

#[test]
fn mj2_round_trip_through_creator_and_player() {
    let codec = IdentityCodec;
    let creator = MJ2Creator::new(&codec);
    let image = ImageSummary {
        width: 8,
        height: 8,
        components: vec![ComponentSummary {
            bit_depth: 8,
            signed: false,
            subsampling_x: 1,
            subsampling_y: 1,
            width: 8,
            height: 8,
        }],
    };
    let frames = vec![
        CreatorFrame { image: image.clone(), samples: vec![0u8; 64], duration: 40, is_sync: true },
        CreatorFrame { image: image.clone(), samples: vec![1u8; 64], duration: 40, is_sync: true },
        CreatorFrame { image, samples: vec![2u8; 64], duration: 40, is_sync: true },
    ];

    let cursor = creator.create(frames, Cursor::new(Vec::new()), false, 1000, false).unwrap();
    let buffer = cursor.into_inner();
    assert_eq!(detect_format(&buffer).unwrap(), Brand::Mj2 { streaming: false });

    let mut player = MJ2Player::load(&codec, buffer).unwrap();
    assert_eq!(player.frame_count(), 3);
    let (_image, samples) = player.seek_to(1).unwrap();
    assert_eq!(samples, vec![1u8; 64]);
}
