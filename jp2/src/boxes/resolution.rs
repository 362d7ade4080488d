use super::{JBox, RawBox, BOX_TYPE_CAPTURE_RESOLUTION, BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION, BOX_TYPE_RESOLUTION};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionUnit {
    Unknown,
    Metres,
    Inches,
}

impl ResolutionUnit {
    fn code(self) -> u8 {
        match self {
            ResolutionUnit::Unknown => 0,
            ResolutionUnit::Metres => 1,
            ResolutionUnit::Inches => 2,
        }
    }

    fn from_code(code: u8) -> Result<Self, Jp2Error> {
        match code {
            0 => Ok(ResolutionUnit::Unknown),
            1 => Ok(ResolutionUnit::Metres),
            2 => Ok(ResolutionUnit::Inches),
            other => Err(Jp2Error::FileFormat(format!(
                "resolution unit must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

/// A `(num, den, exp)` fixed-point resolution value: `num/den x 10^exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionValue {
    pub numerator: u32,
    pub denominator: u32,
    pub exponent: i8,
}

impl ResolutionValue {
    pub fn as_f64(self) -> f64 {
        (self.numerator as f64 / self.denominator as f64) * 10f64.powi(self.exponent as i32)
    }
}

// The standard's wire format for `resc`/`resd` has no unit byte of its own
// -- capture/display resolution is always expressed per metre. `unit` is
// kept on the Rust types only as a documented constant, not serialized.
fn read_resolution_payload(content: &[u8]) -> Result<(ResolutionValue, ResolutionValue, ResolutionUnit), Jp2Error> {
    if content.len() != 18 {
        return Err(Jp2Error::FileFormat(format!(
            "resc/resd payload must be 18 bytes, got {}",
            content.len()
        )));
    }
    let vertical = ResolutionValue {
        numerator: u32::from_be_bytes(content[0..4].try_into().unwrap()),
        denominator: u32::from_be_bytes(content[4..8].try_into().unwrap()),
        exponent: content[16] as i8,
    };
    let horizontal = ResolutionValue {
        numerator: u32::from_be_bytes(content[8..12].try_into().unwrap()),
        denominator: u32::from_be_bytes(content[12..16].try_into().unwrap()),
        exponent: content[17] as i8,
    };
    Ok((horizontal, vertical, ResolutionUnit::Metres))
}

fn write_resolution_payload(horizontal: ResolutionValue, vertical: ResolutionValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(18);
    out.extend_from_slice(&vertical.numerator.to_be_bytes());
    out.extend_from_slice(&vertical.denominator.to_be_bytes());
    out.extend_from_slice(&horizontal.numerator.to_be_bytes());
    out.extend_from_slice(&horizontal.denominator.to_be_bytes());
    out.push(vertical.exponent as u8);
    out.push(horizontal.exponent as u8);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureResolutionBox {
    pub horizontal: ResolutionValue,
    pub vertical: ResolutionValue,
    pub unit: ResolutionUnit,
}

impl JBox for CaptureResolutionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_CAPTURE_RESOLUTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let (horizontal, vertical, unit) = read_resolution_payload(content)?;
        Ok(CaptureResolutionBox {
            horizontal,
            vertical,
            unit,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(write_resolution_payload(self.horizontal, self.vertical))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDisplayResolutionBox {
    pub horizontal: ResolutionValue,
    pub vertical: ResolutionValue,
    pub unit: ResolutionUnit,
}

impl JBox for DefaultDisplayResolutionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let (horizontal, vertical, unit) = read_resolution_payload(content)?;
        Ok(DefaultDisplayResolutionBox {
            horizontal,
            vertical,
            unit,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(write_resolution_payload(self.horizontal, self.vertical))
    }
}

/// `res ` -- the Resolution super-box, containing `resc` and/or `resd`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionSuperBox {
    pub capture: Option<CaptureResolutionBox>,
    pub default_display: Option<DefaultDisplayResolutionBox>,
    pub unknown: Vec<RawBox>,
}

impl JBox for ResolutionSuperBox {
    fn box_type() -> BoxType {
        BOX_TYPE_RESOLUTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut out = ResolutionSuperBox::default();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            match info.box_type {
                t if t == BOX_TYPE_CAPTURE_RESOLUTION => {
                    out.capture = Some(CaptureResolutionBox::read(child)?);
                }
                t if t == BOX_TYPE_DEFAULT_DISPLAY_RESOLUTION => {
                    out.default_display = Some(DefaultDisplayResolutionBox::read(child)?);
                }
                other => out.unknown.push(RawBox::new(other, child.to_vec())),
            }
        }
        Ok(out)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        if let Some(capture) = &self.capture {
            writer.write_box(CaptureResolutionBox::box_type(), &capture.write()?);
        }
        if let Some(display) = &self.default_display {
            writer.write_box(DefaultDisplayResolutionBox::box_type(), &display.write()?);
        }
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_round_trips() {
        let capture = CaptureResolutionBox {
            horizontal: ResolutionValue {
                numerator: 300,
                denominator: 1,
                exponent: 0,
            },
            vertical: ResolutionValue {
                numerator: 300,
                denominator: 1,
                exponent: 0,
            },
            unit: ResolutionUnit::Inches,
        };
        let content = capture.write().unwrap();
        let read_back = CaptureResolutionBox::read(&content).unwrap();
        assert_eq!(read_back.horizontal, capture.horizontal);
        assert_eq!(read_back.vertical, capture.vertical);
    }
}
