//! Quadrant mirroring and surface-anchored subsampling

/// Map position `i` of a mirrored axis of length `2n` back onto the quadrant.
///
/// The first half runs surface-to-centre (`n-1-i`), the second half
/// centre-to-surface (`i-n`).
#[inline]
pub fn mirror_index(i: usize, n: usize) -> usize {
    if i < n {
        n - 1 - i
    } else {
        i - n
    }
}

/// Every `step`-th sample of an axis of `n` samples, anchored at the surface.
///
/// Sample `n-1` is always kept; no averaging takes place.
#[derive(Debug, Clone, Copy)]
pub struct Subsample {
    n: usize,
    step: usize,
}

impl Subsample {
    pub fn new(n: usize, step: usize) -> Self {
        Self {
            n,
            step: step.max(1),
        }
    }

    /// Number of kept samples on the quadrant axis
    pub fn len(&self) -> usize {
        self.n / self.step
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the mirrored axis
    pub fn mirrored_len(&self) -> usize {
        2 * self.len()
    }

    /// Quadrant index of kept sample `j`
    #[inline]
    pub fn source(&self, j: usize) -> usize {
        self.n - 1 - (self.len() - 1 - j) * self.step
    }

    /// Quadrant index for position `i` of the mirrored axis
    #[inline]
    pub fn mirrored(&self, i: usize) -> usize {
        self.source(mirror_index(i, self.len()))
    }
}
