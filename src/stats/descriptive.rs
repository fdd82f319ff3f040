use serde::Serialize;

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// count / mean / std / min / quartiles / max of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator). NaN when count < 2.
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    /// Label/value pairs in display order.
    pub fn rows(&self) -> [(&'static str, f64); 8] {
        [
            ("count", self.count as f64),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.q1),
            ("50%", self.median),
            ("75%", self.q3),
            ("max", self.max),
        ]
    }
}

/// Describe a column. Non-finite values are skipped, like nulls.
pub fn describe(values: &[f64]) -> Summary {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n == 0 {
        return Summary {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
        };
    }

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n < 2 {
        f64::NAN
    } else {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };

    Summary {
        count: n,
        mean,
        std,
        min: sorted[0],
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    }
}

/// Linear interpolation between order statistics. `sorted` must be non-empty.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width binned frequencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    /// One count per bin.
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    pub fn centers(&self) -> impl Iterator<Item = f64> + '_ {
        self.edges.windows(2).map(|w| 0.5 * (w[0] + w[1]))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Bin values into `bins` equal-width bins spanning `[min, max]`.
///
/// Every bin is half-open except the last, which includes `max`. A constant
/// column is binned over `[v − 0.5, v + 0.5]`; an empty one over `[0, 1]`.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

    let (mut lo, mut hi) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if finite.is_empty() {
        (lo, hi) = (0.0, 1.0);
    } else if lo == hi {
        (lo, hi) = (lo - 0.5, hi + 0.5);
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram { edges, counts }
}
