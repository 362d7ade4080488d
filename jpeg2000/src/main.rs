#![allow(dead_code)]

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jp2::{
    detect_format, read_container, write_container, Brand, ComponentDescriptor, CreatorFrame, MJ2Creator,
    MJ2Player,
};
use jpc::{Codec, ComponentSummary, ImageSummary, JpcError};
use log::info;

/// Treats input bytes as an already-encoded codestream: `encode` is the
/// identity on `samples`, `decode` hands the codestream straight back with
/// a placeholder [`ImageSummary`]. Used by the CLI's `mj2` subcommands,
/// which stitch together pre-compressed per-frame codestreams rather than
/// performing wavelet compression themselves (out of scope; see the real
/// `Codec` collaborator an embedding application provides).
struct PassthroughCodec {
    width: u32,
    height: u32,
}

impl Codec for PassthroughCodec {
    fn encode(&self, _image: &ImageSummary, samples: &[u8]) -> Result<Vec<u8>, JpcError> {
        Ok(samples.to_vec())
    }

    fn decode(&self, codestream: &[u8]) -> Result<(ImageSummary, Vec<u8>), JpcError> {
        Ok((
            ImageSummary {
                width: self.width,
                height: self.height,
                components: vec![ComponentSummary {
                    bit_depth: 8,
                    signed: false,
                    subsampling_x: 1,
                    subsampling_y: 1,
                    width: self.width,
                    height: self.height,
                }],
            },
            codestream.to_vec(),
        ))
    }
}

#[derive(Parser)]
#[command(author, version, about = "JPEG 2000 family container inspector")]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify a file's brand (JP2/JPX/JPM/JPH/MJ2/raw codestream).
    Detect { input: PathBuf },
    /// Read a JP2/JPH/JPX/JPM file and print its codestream geometry.
    Read { input: PathBuf },
    /// Wrap a raw codestream in a minimal JP2 container.
    Write {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 8)]
        bit_depth: u8,
        #[arg(long)]
        signed: bool,
    },
    /// Build an MJ2 movie from a sequence of pre-encoded codestream files.
    Mj2Create {
        output: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, default_value_t = 1000)]
        timescale: u32,
        #[arg(long, default_value_t = 40)]
        frame_duration: u32,
        #[arg(long)]
        streaming: bool,
        frames: Vec<PathBuf>,
    },
    /// Extract one frame's codestream bytes from an MJ2 movie.
    Mj2Extract {
        input: PathBuf,
        frame_index: usize,
        output: PathBuf,
    },
}

fn run() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let opts = Opts::parse();

    match opts.command {
        Command::Detect { input } => {
            let bytes = fs::read(input)?;
            println!("{:?}", detect_format(&bytes)?);
        }
        Command::Read { input } => {
            let bytes = fs::read(input)?;
            let container = read_container(&bytes)?;
            println!(
                "{}x{}, {} byte codestream",
                container.image_info.reference_grid_width(),
                container.image_info.reference_grid_height(),
                container.codestream.len()
            );
        }
        Command::Write { input, output, width, height, bit_depth, signed } => {
            let codestream = fs::read(input)?;
            let components = vec![ComponentDescriptor { bit_depth, signed }];
            let bytes = write_container(Brand::Jp2, height, width, &components, &codestream)?;
            fs::write(output, bytes)?;
        }
        Command::Mj2Create { output, width, height, timescale, frame_duration, streaming, frames } => {
            let codec = PassthroughCodec { width, height };
            let creator = MJ2Creator::new(&codec);
            let image = ImageSummary {
                width,
                height,
                components: vec![ComponentSummary {
                    bit_depth: 8,
                    signed: false,
                    subsampling_x: 1,
                    subsampling_y: 1,
                    width,
                    height,
                }],
            };
            let creator_frames = frames
                .iter()
                .map(|path| {
                    Ok(CreatorFrame {
                        image: image.clone(),
                        samples: fs::read(path)?,
                        duration: frame_duration,
                        is_sync: true,
                    })
                })
                .collect::<Result<Vec<_>, std::io::Error>>()?;
            info!("mj2-create: {} frame(s) -> {}", creator_frames.len(), output.display());
            let file = fs::File::create(&output)?;
            creator.create(creator_frames, file, streaming, timescale, false)?;
        }
        Command::Mj2Extract { input, frame_index, output } => {
            let bytes = fs::read(input)?;
            let codec = PassthroughCodec { width: 0, height: 0 };
            let mut player = MJ2Player::load(&codec, bytes)?;
            let (_image, samples) = player.seek_to(frame_index)?;
            fs::write(output, samples)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    match run() {
        Err(e) => Err(e.to_string().into()),
        Ok(()) => Ok(()),
    }
}
