use crate::align::ScoreComponents;
use crate::utils::{open_text_writer, Result};
use std::io::Write;

fn signed_percent(rate: f64) -> String {
    format!("{:.1}%", 100.0 * rate)
}

/// Side-by-side summary of the phonetically refined score against the plain
/// word error rate, with the per-component differences.
pub fn write_comparison(
    path: &str,
    hyp_name: &str,
    ref_name: &str,
    line_count: usize,
    power: &ScoreComponents,
    wer: &ScoreComponents,
) -> Result<()> {
    let diff = |a: usize, b: usize| a as i64 - b as i64;
    let diff_rate = power.error_rate() - wer.error_rate();

    let mut body = String::new();
    body.push_str(&format!("System name: {}\n", hyp_name));
    body.push_str(&format!("Ref file   : {}\n", ref_name));
    body.push_str(&format!("Hyp file   : {}\n", hyp_name));
    body.push('\n');
    body.push_str(",---------------------------------------------------------.\n");
    body.push_str(&format!("|{:^57}|\n", hyp_name));
    body.push_str("|---------------------------------------------------------|\n");
    body.push_str("| Metric | # Snt # Wrd |  Corr   Sub    Del    Ins    Err |\n");
    body.push_str("|--------+-------------+----------------------------------|\n");
    body.push_str(&format!(
        "| POWER  | {:5} {:5} | {:5} {:5}  {:5}  {:5}  {:>5} |\n",
        line_count,
        power.ref_length,
        power.correct,
        power.substitution,
        power.deletion,
        power.insertion,
        signed_percent(power.error_rate())
    ));
    body.push_str(&format!(
        "| WER    | {:5} {:5} | {:5} {:5}  {:5}  {:5}  {:>5} |\n",
        line_count,
        wer.ref_length,
        wer.correct,
        wer.substitution,
        wer.deletion,
        wer.insertion,
        signed_percent(wer.error_rate())
    ));
    body.push_str("|=========================================================|\n");
    body.push_str(&format!(
        "| Diff   | {:5} {:5} | {:5} {:5}  {:5}  {:5}  {:>5} |\n",
        line_count,
        wer.ref_length,
        diff(power.correct, wer.correct),
        diff(power.substitution, wer.substitution),
        diff(power.deletion, wer.deletion),
        diff(power.insertion, wer.insertion),
        signed_percent(diff_rate)
    ));
    body.push_str("`---------------------------------------------------------'\n");

    let mut out = open_text_writer(path)?;
    out.write_all(body.as_bytes())
        .map_err(|e| format!("Failed to write {}: {}", path, e))?;
    out.flush()
        .map_err(|e| format!("Failed to flush {}: {}", path, e))?;
    log::info!("File written to {}", path);
    Ok(())
}
