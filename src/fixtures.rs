//! Sheets shared by tests across modules.

/// Multiplicative noise that makes the counts overdispersed.
const MULTIPLIERS: [f64; 7] = [0.15, 0.45, 0.8, 1.0, 1.3, 1.9, 2.6];

/// Panel sheet with zero-inflated, overdispersed counts in `cases`, two
/// covariates and a constant column. Indices cycle through four regions.
pub fn panel_csv(n: usize) -> String {
    let mut out = String::from("indice,cases,rain,density,constant\n,nao,nao,nao,nao\n");
    for i in 0..n {
        let rain = (i % 6) as f64 * 0.5;
        let density = ((i / 6) % 4) as f64;
        let mu = (0.8 + 0.35 * rain - 0.25 * density).exp();
        let cases = if i % 5 == 2 {
            0.0
        } else {
            (mu * MULTIPLIERS[i % 7]).round()
        };
        let index = format!("{}{:02}{}", 2015 + i / 48, i % 12 + 1, 3304557 + i % 4);
        out.push_str(&format!("{index},{cases},{rain},{density},1\n"));
    }
    out
}
