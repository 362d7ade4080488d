//! JPX reader-requirements construction and feature-combination/decoder
//! validation (§4.8). Builds on the `rreq` wire codec in
//! [`crate::boxes::reader_requirements`].

use std::collections::BTreeSet;

use crate::boxes::reader_requirements::{ReaderRequirementsBox, StandardFeatureEntry};
use crate::error::Jp2Error;

/// A standard JPX feature identifier. Values `>= PART2_THRESHOLD` are
/// "Part-2 features" per the standard; this is a property of the numeric
/// value, not a separate bit of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    NoExtensions,
    NeedsJpxReader,
    MultipleCompositionLayers,
    FragmentedCodestream,
    Compositing,
    Animation,
    MultiComponentTransform,
    NonLinearTransform,
    ArbitraryWavelets,
    TrellisQuantization,
    ExtendedRoi,
    ExtendedPrecision,
    DcOffset,
    VisualMasking,
    PerceptualEncoding,
}

const PART2_THRESHOLD: u16 = 18;

impl Feature {
    /// The numeric identifier the standard assigns this feature (§3 `rreq`
    /// NSF entries carry exactly this value as `SF`).
    pub fn value(self) -> u16 {
        match self {
            Feature::NoExtensions => 1,
            Feature::NeedsJpxReader => 2,
            Feature::MultipleCompositionLayers => 3,
            Feature::FragmentedCodestream => 4,
            Feature::Compositing => 12,
            Feature::Animation => 16,
            Feature::MultiComponentTransform => 18,
            Feature::NonLinearTransform => 19,
            Feature::ArbitraryWavelets => 20,
            Feature::TrellisQuantization => 21,
            Feature::ExtendedRoi => 22,
            Feature::ExtendedPrecision => 23,
            Feature::DcOffset => 24,
            Feature::VisualMasking => 25,
            Feature::PerceptualEncoding => 26,
        }
    }

    pub fn is_part2(self) -> bool {
        self.value() >= PART2_THRESHOLD
    }

    /// The set of co-features this feature's presence requires, per the
    /// dependency graph.
    pub fn dependencies(self) -> &'static [Feature] {
        match self {
            Feature::MultiComponentTransform
            | Feature::NonLinearTransform
            | Feature::ArbitraryWavelets
            | Feature::TrellisQuantization
            | Feature::ExtendedRoi
            | Feature::ExtendedPrecision
            | Feature::DcOffset
            | Feature::VisualMasking
            | Feature::PerceptualEncoding => &[Feature::NeedsJpxReader],
            Feature::Compositing | Feature::Animation => &[Feature::MultipleCompositionLayers],
            _ => &[],
        }
    }
}

/// A single feature-combination validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Warning(String),
    Error(String),
}

/// Validates a candidate feature set against the dependency/combination
/// rules (§4.8), independent of any `rreq` construction.
pub fn validate_combination(features: &BTreeSet<Feature>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for &feature in features {
        if feature.is_part2() && !features.contains(&Feature::NeedsJpxReader) {
            issues.push(ValidationIssue::Warning(format!(
                "{feature:?} is a Part-2 feature but needsJPXReader is not present"
            )));
        }
    }

    if features.contains(&Feature::NoExtensions) && features.len() > 1 {
        issues.push(ValidationIssue::Error(
            "noExtensions cannot be combined with any other feature".to_string(),
        ));
    }

    if features.contains(&Feature::VisualMasking) && !features.contains(&Feature::PerceptualEncoding) {
        issues.push(ValidationIssue::Warning(
            "visualMasking without perceptualEncoding".to_string(),
        ));
    }

    for &feature in features {
        for &dep in feature.dependencies() {
            if !features.contains(&dep) {
                issues.push(ValidationIssue::Error(format!(
                    "{feature:?} requires {dep:?}, which is not present"
                )));
            }
        }
    }

    issues
}

fn mask_length_for(count: usize) -> u8 {
    if count <= 8 {
        1
    } else if count <= 16 {
        2
    } else if count <= 32 {
        4
    } else {
        8
    }
}

fn set_bit(mask: &mut [u8], bit_index: usize) {
    let byte = bit_index / 8;
    let bit_in_byte = 7 - (bit_index % 8);
    mask[byte] |= 1 << bit_in_byte;
}

/// Reader-requirements negotiation over a candidate feature set: builds
/// the `rreq` box content and validates a decoder's supported set against
/// it.
pub struct RReq;

impl RReq {
    /// Builds an `rreq` box from `features`, sorted ascending by numeric
    /// value and assigned bits from the MSB down, per §4.8's construction
    /// rule. Vendor features are never produced by this builder.
    pub fn build_from(features: &BTreeSet<Feature>) -> Result<ReaderRequirementsBox, Jp2Error> {
        let mut sorted: Vec<Feature> = features.iter().copied().collect();
        sorted.sort_by_key(|f| f.value());

        let ml = mask_length_for(sorted.len());
        let total_bits = ml as usize * 8;

        let mut fuam = vec![0u8; ml as usize];
        let mut dcm = vec![0u8; ml as usize];
        let mut standard_features = Vec::with_capacity(sorted.len());

        for (i, feature) in sorted.iter().enumerate() {
            let bit_index = total_bits - 1 - i;
            let mut entry_mask = vec![0u8; ml as usize];
            set_bit(&mut entry_mask, bit_index);
            set_bit(&mut fuam, bit_index);
            if feature.is_part2() {
                set_bit(&mut dcm, bit_index);
            }
            standard_features.push(StandardFeatureEntry {
                feature: feature.value(),
                mask: entry_mask,
            });
        }

        ReaderRequirementsBox::new(ml, fuam, dcm, standard_features, Vec::new())
    }
}

/// The outcome of validating a decoder's supported feature set against a
/// parsed `rreq` box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    PartiallyCompatible { missing: BTreeSet<u16> },
    Incompatible { missing: BTreeSet<u16> },
}

fn needed(rreq: &ReaderRequirementsBox, mask: &[u8]) -> BTreeSet<u16> {
    rreq.standard_features
        .iter()
        .filter(|entry| entry.mask.iter().zip(mask).any(|(a, b)| a & b != 0))
        .map(|entry| entry.feature)
        .collect()
}

/// Validates `supported` (a decoder's supported standard-feature id set)
/// against `rreq`'s `FUAM`/`DCM` masks, per §4.8's decoder-validation rule.
pub fn validate_decoder(rreq: &ReaderRequirementsBox, supported: &BTreeSet<u16>) -> Compatibility {
    let needed_fuam = needed(rreq, &rreq.fuam);
    if needed_fuam.is_subset(supported) {
        return Compatibility::Compatible;
    }

    let needed_dcm = needed(rreq, &rreq.dcm);
    if needed_dcm.is_subset(supported) {
        let missing = needed_fuam.difference(supported).copied().collect();
        return Compatibility::PartiallyCompatible { missing };
    }

    let missing = needed_fuam.difference(supported).copied().collect();
    Compatibility::Incompatible { missing }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(features: &[Feature]) -> BTreeSet<Feature> {
        features.iter().copied().collect()
    }

    #[test]
    fn rreq_mask_assignment_matches_sorted_ascending_order() {
        let features = set(&[Feature::NoExtensions, Feature::Compositing, Feature::Animation]);
        let rreq = RReq::build_from(&features).unwrap();
        assert_eq!(rreq.mask_length, 1);
        assert_eq!(rreq.fuam, vec![0b1110_0000]);

        let by_feature: std::collections::HashMap<u16, &StandardFeatureEntry> = rreq
            .standard_features
            .iter()
            .map(|e| (e.feature, e))
            .collect();
        assert_eq!(by_feature[&Feature::NoExtensions.value()].mask, vec![0b1000_0000]);
        assert_eq!(by_feature[&Feature::Compositing.value()].mask, vec![0b0100_0000]);
        assert_eq!(by_feature[&Feature::Animation.value()].mask, vec![0b0010_0000]);
    }

    #[test]
    fn part2_features_set_dcm_bits() {
        let features = set(&[Feature::NeedsJpxReader, Feature::MultiComponentTransform]);
        let rreq = RReq::build_from(&features).unwrap();
        // Sorted: NeedsJpxReader(2) bit 7, MultiComponentTransform(18) bit 6.
        assert_eq!(rreq.fuam, vec![0b1100_0000]);
        assert_eq!(rreq.dcm, vec![0b0100_0000]);
    }

    #[test]
    fn decoder_validation_reports_incompatible_when_fuam_and_dcm_both_fail() {
        let features = set(&[Feature::NeedsJpxReader, Feature::MultiComponentTransform]);
        let rreq = RReq::build_from(&features).unwrap();
        let part1_only: BTreeSet<u16> = BTreeSet::new();
        match validate_decoder(&rreq, &part1_only) {
            Compatibility::Incompatible { missing } => {
                assert!(missing.contains(&Feature::MultiComponentTransform.value()));
            }
            other => panic!("expected Incompatible, got {other:?}"),
        }
    }

    #[test]
    fn decoder_validation_reports_compatible_when_part2_decoder_supports_everything() {
        let features = set(&[Feature::NeedsJpxReader, Feature::MultiComponentTransform]);
        let rreq = RReq::build_from(&features).unwrap();
        let part2_decoder: BTreeSet<u16> =
            [Feature::NeedsJpxReader.value(), Feature::MultiComponentTransform.value()]
                .into_iter()
                .collect();
        assert_eq!(validate_decoder(&rreq, &part2_decoder), Compatibility::Compatible);
    }

    #[test]
    fn no_extensions_combined_with_another_feature_is_an_error() {
        let features = set(&[Feature::NoExtensions, Feature::Compositing]);
        let issues = validate_combination(&features);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::Error(msg) if msg.contains("noExtensions"))));
    }

    #[test]
    fn multi_component_transform_without_needs_jpx_reader_yields_warning_and_error() {
        let features = set(&[Feature::MultiComponentTransform]);
        let issues = validate_combination(&features);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::Warning(_))));
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::Error(_))));
    }

    #[test]
    fn visual_masking_without_perceptual_encoding_is_a_warning() {
        let features = set(&[Feature::NeedsJpxReader, Feature::VisualMasking]);
        let issues = validate_combination(&features);
        assert!(issues.iter().any(|i| matches!(i, ValidationIssue::Warning(msg) if msg.contains("visualMasking"))));
    }

    #[test]
    fn fully_satisfied_combination_has_no_issues() {
        let features = set(&[
            Feature::NeedsJpxReader,
            Feature::VisualMasking,
            Feature::PerceptualEncoding,
        ]);
        assert!(validate_combination(&features).is_empty());
    }
}
