//! Writes `sample_panel.csv`: five years of monthly counts for four regions,
//! in the same two-header-row layout as the input template.

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Marsaglia–Tsang; shapes below 1 are boosted by `U^(1/shape)`.
    fn gamma(&mut self, shape: f64, scale: f64) -> f64 {
        if shape < 1.0 {
            let u = self.next_f64().max(1e-15);
            return self.gamma(shape + 1.0, scale) * u.powf(1.0 / shape);
        }
        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        loop {
            let z = self.gauss(0.0, 1.0);
            let v = (1.0 + c * z).powi(3);
            if v <= 0.0 {
                continue;
            }
            let u = self.next_f64().max(1e-15);
            if u.ln() < 0.5 * z * z + d - d * v + d * v.ln() {
                return d * v * scale;
            }
        }
    }

    /// Knuth's multiplication method; normal approximation for large means.
    fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda > 30.0 {
            return self.gauss(lambda, lambda.sqrt()).round().max(0.0) as u64;
        }
        let limit = (-lambda).exp();
        let mut k = 0;
        let mut p = self.next_f64();
        while p > limit {
            k += 1;
            p *= self.next_f64();
        }
        k
    }

    /// NB2 draw as a gamma–Poisson mixture.
    fn negative_binomial(&mut self, mu: f64, alpha: f64) -> u64 {
        let lambda = self.gamma(1.0 / alpha, alpha * mu);
        self.poisson(lambda)
    }
}

struct Region {
    code: &'static str,
    zone: &'static str,
    density: f64,
}

const REGIONS: [Region; 4] = [
    Region { code: "3304557", zone: "urbana", density: 5.3 },
    Region { code: "3550308", zone: "urbana", density: 7.4 },
    Region { code: "3106200", zone: "rural", density: 1.1 },
    Region { code: "5300108", zone: "rural", density: 0.6 },
];

const ALPHA: f64 = 0.6;
const ZERO_INFLATION: f64 = 0.25;

fn main() {
    let mut rng = SimpleRng::new(42);

    let output_path = "sample_panel.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");

    writer
        .write_record(["indice", "ocorrencias", "precipitacao", "temperatura", "densidade", "zona"])
        .expect("Failed to write header");
    writer
        .write_record(["", "nao", "nao", "nao", "nao", "sim"])
        .expect("Failed to write factor flags");

    let mut rows = 0;
    let mut zeros = 0;
    for year in 2019..2024 {
        for month in 1..=12u32 {
            // Wet, hot season peaks in January.
            let season = (2.0 * std::f64::consts::PI * (month as f64 - 1.0) / 12.0).cos();
            for region in &REGIONS {
                let rain = (120.0 + 90.0 * season + rng.gauss(0.0, 25.0)).max(0.0);
                let temp = 24.0 + 4.0 * season + rng.gauss(0.0, 1.5);

                let mu = (0.2 + 0.006 * rain + 0.08 * (temp - 24.0) + 0.15 * region.density).exp();
                let count = if rng.next_f64() < ZERO_INFLATION {
                    0
                } else {
                    rng.negative_binomial(mu, ALPHA)
                };
                if count == 0 {
                    zeros += 1;
                }

                writer
                    .write_record([
                        format!("{year}{month:02}{}", region.code),
                        count.to_string(),
                        format!("{rain:.1}"),
                        format!("{temp:.1}"),
                        format!("{:.1}", region.density),
                        region.zone.to_string(),
                    ])
                    .expect("Failed to write row");
                rows += 1;
            }
        }
    }
    writer.flush().expect("Failed to flush writer");

    println!("Wrote {rows} observations ({zeros} zeros) to {output_path}");
}
