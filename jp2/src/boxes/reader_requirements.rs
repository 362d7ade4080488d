use super::{JBox, BOX_TYPE_READER_REQUIREMENTS};
use crate::boxing::BoxType;
use crate::error::Jp2Error;

/// One standard-feature entry in a `rreq` box: the feature's numeric id
/// (`SF`) paired with its `ML`-byte mask (`SM`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFeatureEntry {
    pub feature: u16,
    pub mask: Vec<u8>,
}

/// One vendor-feature entry: a 16-byte UUID paired with its `ML`-byte mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFeatureEntry {
    pub uuid: [u8; 16],
    pub mask: Vec<u8>,
}

/// `rreq` -- Reader Requirements box. Mask length `ML` is 1, 2, 4 or 8 bytes;
/// `fuam`/`dcm` and every entry's mask are exactly `ML` bytes, MSB-justified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderRequirementsBox {
    pub mask_length: u8,
    pub fuam: Vec<u8>,
    pub dcm: Vec<u8>,
    pub standard_features: Vec<StandardFeatureEntry>,
    pub vendor_features: Vec<VendorFeatureEntry>,
}

impl ReaderRequirementsBox {
    pub fn new(
        mask_length: u8,
        fuam: Vec<u8>,
        dcm: Vec<u8>,
        standard_features: Vec<StandardFeatureEntry>,
        vendor_features: Vec<VendorFeatureEntry>,
    ) -> Result<Self, Jp2Error> {
        if !matches!(mask_length, 1 | 2 | 4 | 8) {
            return Err(Jp2Error::InvalidParameter(format!(
                "rreq mask length must be 1, 2, 4 or 8, got {mask_length}"
            )));
        }
        let ml = mask_length as usize;
        if fuam.len() != ml || dcm.len() != ml {
            return Err(Jp2Error::InvalidParameter(
                "rreq fuam/dcm must each be ML bytes".to_string(),
            ));
        }
        if standard_features.iter().any(|e| e.mask.len() != ml)
            || vendor_features.iter().any(|e| e.mask.len() != ml)
        {
            return Err(Jp2Error::InvalidParameter(
                "rreq feature masks must each be ML bytes".to_string(),
            ));
        }
        Ok(ReaderRequirementsBox {
            mask_length,
            fuam,
            dcm,
            standard_features,
            vendor_features,
        })
    }
}

impl JBox for ReaderRequirementsBox {
    fn box_type() -> BoxType {
        BOX_TYPE_READER_REQUIREMENTS
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.is_empty() {
            return Err(Jp2Error::Truncated("rreq mask length byte".to_string()));
        }
        let mask_length = content[0];
        let ml = mask_length as usize;
        if !matches!(mask_length, 1 | 2 | 4 | 8) {
            return Err(Jp2Error::FileFormat(format!(
                "rreq mask length must be 1, 2, 4 or 8, got {mask_length}"
            )));
        }
        let mut cursor = 1usize;
        let need = |cursor: usize, n: usize| -> Result<(), Jp2Error> {
            if cursor + n > content.len() {
                Err(Jp2Error::Truncated("rreq payload".to_string()))
            } else {
                Ok(())
            }
        };

        need(cursor, ml)?;
        let fuam = content[cursor..cursor + ml].to_vec();
        cursor += ml;

        need(cursor, ml)?;
        let dcm = content[cursor..cursor + ml].to_vec();
        cursor += ml;

        need(cursor, 2)?;
        let nsf = u16::from_be_bytes(content[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;

        let mut standard_features = Vec::with_capacity(nsf);
        for _ in 0..nsf {
            need(cursor, 2)?;
            let feature = u16::from_be_bytes(content[cursor..cursor + 2].try_into().unwrap());
            cursor += 2;
            need(cursor, ml)?;
            let mask = content[cursor..cursor + ml].to_vec();
            cursor += ml;
            standard_features.push(StandardFeatureEntry { feature, mask });
        }

        need(cursor, 2)?;
        let nvf = u16::from_be_bytes(content[cursor..cursor + 2].try_into().unwrap()) as usize;
        cursor += 2;

        let mut vendor_features = Vec::with_capacity(nvf);
        for _ in 0..nvf {
            need(cursor, 16)?;
            let uuid: [u8; 16] = content[cursor..cursor + 16].try_into().unwrap();
            cursor += 16;
            need(cursor, ml)?;
            let mask = content[cursor..cursor + ml].to_vec();
            cursor += ml;
            vendor_features.push(VendorFeatureEntry { uuid, mask });
        }

        ReaderRequirementsBox::new(mask_length, fuam, dcm, standard_features, vendor_features)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let ml = self.mask_length as usize;
        let mut out = Vec::with_capacity(
            1 + 2 * ml
                + 2
                + self.standard_features.len() * (2 + ml)
                + 2
                + self.vendor_features.len() * (16 + ml),
        );
        out.push(self.mask_length);
        out.extend_from_slice(&self.fuam);
        out.extend_from_slice(&self.dcm);
        out.extend_from_slice(&(self.standard_features.len() as u16).to_be_bytes());
        for entry in &self.standard_features {
            out.extend_from_slice(&entry.feature.to_be_bytes());
            out.extend_from_slice(&entry.mask);
        }
        out.extend_from_slice(&(self.vendor_features.len() as u16).to_be_bytes());
        for entry in &self.vendor_features {
            out.extend_from_slice(&entry.uuid);
            out.extend_from_slice(&entry.mask);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_requirements_round_trips_with_one_byte_masks() {
        let rreq = ReaderRequirementsBox::new(
            1,
            vec![0b1100_0000],
            vec![0b0100_0000],
            vec![
                StandardFeatureEntry {
                    feature: 1,
                    mask: vec![0b1000_0000],
                },
                StandardFeatureEntry {
                    feature: 18,
                    mask: vec![0b0100_0000],
                },
            ],
            Vec::new(),
        )
        .unwrap();
        let content = rreq.write().unwrap();
        assert_eq!(ReaderRequirementsBox::read(&content).unwrap(), rreq);
    }

    #[test]
    fn reader_requirements_rejects_bad_mask_length() {
        assert!(ReaderRequirementsBox::new(3, vec![0, 0, 0], vec![0, 0, 0], Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn reader_requirements_round_trips_vendor_feature() {
        let rreq = ReaderRequirementsBox::new(
            2,
            vec![0x80, 0x00],
            vec![0x00, 0x00],
            Vec::new(),
            vec![VendorFeatureEntry {
                uuid: [7; 16],
                mask: vec![0x80, 0x00],
            }],
        )
        .unwrap();
        let content = rreq.write().unwrap();
        assert_eq!(ReaderRequirementsBox::read(&content).unwrap(), rreq);
    }
}
