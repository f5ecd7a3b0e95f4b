//! Final console summary.

use pfetch_core::report::RunSummary;

pub fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Fetched {} entr{} in {:.1}s: {}.",
        summary.total,
        if summary.total == 1 { "y" } else { "ies" },
        summary.elapsed_secs,
        summary.tally()
    );
    let failures: Vec<_> = summary.failures().collect();
    if failures.is_empty() {
        return;
    }
    println!("{:<6} {:<10} {:<6} {}", "JOB", "STATUS", "EXIT", "ENTRY");
    for j in failures {
        let exit = j
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<6} {:<10} {:<6} {}", j.id, j.status, exit, j.entry);
    }
}
