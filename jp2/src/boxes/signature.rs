use super::{JBox, BOX_TYPE_SIGNATURE};
use crate::boxing::BoxType;
use crate::error::Jp2Error;

pub const SIGNATURE_PAYLOAD: [u8; 4] = [0x0D, 0x0A, 0x87, 0x0A];

/// The JP2 Signature box (`jP  `). Always exactly 12 bytes framed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignatureBox;

impl JBox for SignatureBox {
    fn box_type() -> BoxType {
        BOX_TYPE_SIGNATURE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content != SIGNATURE_PAYLOAD {
            return Err(Jp2Error::FileFormat(format!(
                "bad JP2 signature payload: {content:02X?}"
            )));
        }
        Ok(SignatureBox)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(SIGNATURE_PAYLOAD.to_vec())
    }
}

/// The File Type box (`ftyp`). `brand` and each entry of `compatible` are
/// exactly four ASCII bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    pub brand: BoxType,
    pub minor_version: u32,
    pub compatible: Vec<BoxType>,
}

impl JBox for FileTypeBox {
    fn box_type() -> BoxType {
        super::BOX_TYPE_FILE_TYPE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 8 || content.len() % 4 != 0 {
            return Err(Jp2Error::FileFormat(format!(
                "ftyp payload length {} is not 8 + 4N",
                content.len()
            )));
        }
        let brand: BoxType = content[0..4].try_into().unwrap();
        let minor_version = u32::from_be_bytes(content[4..8].try_into().unwrap());
        let compatible = content[8..]
            .chunks_exact(4)
            .map(|chunk| chunk.try_into().unwrap())
            .collect();
        Ok(FileTypeBox {
            brand,
            minor_version,
            compatible,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(8 + 4 * self.compatible.len());
        out.extend_from_slice(&self.brand);
        out.extend_from_slice(&self.minor_version.to_be_bytes());
        for c in &self.compatible {
            out.extend_from_slice(c);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_payload_is_the_fixed_four_bytes() {
        let sig = SignatureBox;
        assert_eq!(sig.write().unwrap(), SIGNATURE_PAYLOAD.to_vec());
    }

    #[test]
    fn signature_rejects_wrong_payload() {
        assert!(SignatureBox::read(&[0, 0, 0, 0]).is_err());
    }

    #[test]
    fn ftyp_round_trips() {
        let ftyp = FileTypeBox {
            brand: *b"jp2 ",
            minor_version: 0,
            compatible: vec![*b"jp2 ", *b"isom"],
        };
        let content = ftyp.write().unwrap();
        assert_eq!(content.len() % 4, 0);
        let read_back = FileTypeBox::read(&content).unwrap();
        assert_eq!(read_back, ftyp);
    }
}
