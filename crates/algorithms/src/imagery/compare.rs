//! Binary mask comparison
//!
//! Set algebra between a permanent-water mask `P` and a spectral water
//! mask `S` on the same grid:
//! - `lost = P ∧ ¬S` (water that receded)
//! - `gained = ¬P ∧ S` (newly flooded)
//! - `persistent = P ∧ S`
//!
//! plus agreement statistics between the two masks.

use floodscope_core::raster::Mask;
use floodscope_core::{Error, Result};
use ndarray::{Array2, Zip};

/// Difference map code where both masks agree
pub const DIFF_AGREE: u8 = 0;
/// Difference map code for `S ∧ ¬P`
pub const DIFF_FALSE_POSITIVE: u8 = 1;
/// Difference map code for `P ∧ ¬S`
pub const DIFF_FALSE_NEGATIVE: u8 = 2;

/// The three pairwise-disjoint classes whose union is `P ∪ S`
#[derive(Debug, Clone)]
pub struct ClassifiedRegions {
    pub lost: Mask,
    pub gained: Mask,
    pub persistent: Mask,
}

/// Agreement between a reference mask `P` and a candidate mask `S`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgreementStats {
    pub intersection: usize,
    pub union: usize,
    /// `intersection / union`, 0 when both masks are empty
    pub iou: f64,
    /// Cells in `S` but not `P`
    pub false_positives: usize,
    /// Cells in `P` but not `S`
    pub false_negatives: usize,
}

fn check_same_shape(p: &Mask, s: &Mask) -> Result<()> {
    if p.shape() != s.shape() {
        return Err(Error::SizeMismatch {
            er: p.rows(),
            ec: p.cols(),
            ar: s.rows(),
            ac: s.cols(),
        });
    }
    Ok(())
}

fn from_array(template: &Mask, data: Array2<u8>) -> Mask {
    let mut out = template.with_same_meta::<u8>(data.nrows(), data.ncols());
    *out.data_mut() = data;
    out
}

/// Split `permanent` and `spectral` into lost, gained and persistent water.
///
/// Any non-zero cell counts as set. Outputs inherit the spectral mask's grid.
pub fn classify_regions(permanent: &Mask, spectral: &Mask) -> Result<ClassifiedRegions> {
    check_same_shape(permanent, spectral)?;
    let shape = spectral.shape();

    let mut lost = Array2::<u8>::zeros(shape);
    let mut gained = Array2::<u8>::zeros(shape);
    let mut persistent = Array2::<u8>::zeros(shape);

    Zip::from(&mut lost)
        .and(&mut gained)
        .and(&mut persistent)
        .and(permanent.data())
        .and(spectral.data())
        .for_each(|l, g, b, &p, &s| {
            let (p, s) = (p != 0, s != 0);
            *l = u8::from(p && !s);
            *g = u8::from(!p && s);
            *b = u8::from(p && s);
        });

    Ok(ClassifiedRegions {
        lost: from_array(spectral, lost),
        gained: from_array(spectral, gained),
        persistent: from_array(spectral, persistent),
    })
}

/// IoU and error counts of `candidate` against `reference`.
pub fn agreement_stats(reference: &Mask, candidate: &Mask) -> Result<AgreementStats> {
    check_same_shape(reference, candidate)?;

    let mut intersection = 0;
    let mut union = 0;
    let mut false_positives = 0;
    let mut false_negatives = 0;

    Zip::from(reference.data())
        .and(candidate.data())
        .for_each(|&p, &s| match (p != 0, s != 0) {
            (true, true) => {
                intersection += 1;
                union += 1;
            }
            (false, true) => {
                false_positives += 1;
                union += 1;
            }
            (true, false) => {
                false_negatives += 1;
                union += 1;
            }
            (false, false) => {}
        });

    let iou = if union > 0 {
        intersection as f64 / union as f64
    } else {
        0.0
    };

    Ok(AgreementStats {
        intersection,
        union,
        iou,
        false_positives,
        false_negatives,
    })
}

/// Per-cell disagreement: 0 agree, 1 false positive, 2 false negative.
pub fn difference_map(reference: &Mask, candidate: &Mask) -> Result<Mask> {
    check_same_shape(reference, candidate)?;

    let data = Zip::from(reference.data())
        .and(candidate.data())
        .map_collect(|&p, &s| match (p != 0, s != 0) {
            (false, true) => DIFF_FALSE_POSITIVE,
            (true, false) => DIFF_FALSE_NEGATIVE,
            _ => DIFF_AGREE,
        });

    Ok(from_array(candidate, data))
}
