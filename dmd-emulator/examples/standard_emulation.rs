//! Standard DMD example: emulate a relaxing flow from its first snapshots.

use dmd_emulator::{compare, time_range, DmdConfig, StandardDmd, Truncation};

fn main() {
    // E(s) relaxes towards -2 with two decay rates; three further observables
    let ds = 0.1;
    let n = 60;
    let mut data = faer::Mat::<f64>::zeros(4, n);
    for k in 0..n {
        let s = k as f64 * ds;
        let fast = (-1.5 * s).exp();
        let slow = (-0.4 * s).exp();
        data[(0, k)] = -2.0 + 0.8 * slow + 0.3 * fast;
        data[(1, k)] = 0.5 * slow - fast;
        data[(2, k)] = 1.0 + 0.2 * fast;
        data[(3, k)] = slow + fast;
    }

    let mut emu = StandardDmd::new(DmdConfig {
        nobs: 15,
        truncation: Truncation::Rank(3),
        enforce_physics: true,
        ..Default::default()
    });
    let result = emu.fit(&data).unwrap();

    println!("Standard DMD");
    println!("  Rank: {}", result.rank);
    println!(
        "  Training window: {} vars x {} snapshots",
        result.data_dim.0, result.data_dim.1
    );
    println!("\nEigenvalues:");
    for (j, ev) in result.modes.eigenvalues.iter().enumerate() {
        println!("  λ{j} = {:.6}", ev.re);
    }

    let s_range = time_range(0.0, (n - 1) as f64 * ds, ds).unwrap();
    let pred = emu.predict(&s_range, ds).unwrap();

    println!("\n{:<10} | {:<12} | {:<12}", "s", "E (DMD)", "E (data)");
    for k in (0..n).step_by(10) {
        println!(
            "{:10.4} | {:12.8} | {:12.8}",
            s_range[k],
            pred[(0, k)],
            data[(0, k)]
        );
    }

    let report = compare(&pred, &data).unwrap();
    println!("\nRMSE over the full trajectory: {:.3e}", report.rmse);
    println!(
        "Max relative error:            {:.3e}",
        report.max_relative_error
    );
}
