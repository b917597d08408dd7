use crate::utils::{open_text_writer, Result};
use std::collections::BTreeMap;
use std::io::Write;

pub type ConfusionCounts = BTreeMap<String, BTreeMap<String, usize>>;

/// Tab-separated `ref ==> hyp count` lines, sorted by reference then
/// hypothesis token.
pub fn write_confusions_text(
    path: &str,
    hyp_name: &str,
    ref_name: &str,
    confusions: &ConfusionCounts,
) -> Result<()> {
    let mut out = open_text_writer(path)?;
    let mut body = String::new();
    body.push_str(&format!("System name: {}\n", hyp_name));
    body.push_str(&format!("Ref file   : {}\n", ref_name));
    for (ref_tok, hyps) in confusions {
        for (hyp_tok, count) in hyps {
            body.push_str(&format!("{}\t==>\t{}\t{}\n", ref_tok, hyp_tok, count));
        }
    }
    out.write_all(body.as_bytes())
        .map_err(|e| format!("Failed to write {}: {}", path, e))?;
    out.flush()
        .map_err(|e| format!("Failed to flush {}: {}", path, e))?;
    log::info!("File written to {}", path);
    Ok(())
}

pub fn write_confusions_json(path: &str, confusions: &ConfusionCounts) -> Result<()> {
    let mut out = open_text_writer(path)?;
    let line = serde_json::to_string(confusions)
        .map_err(|e| format!("Failed to serialize confusions: {}", e))?;
    writeln!(out, "{}", line).map_err(|e| format!("Failed to write {}: {}", path, e))?;
    out.flush()
        .map_err(|e| format!("Failed to flush {}: {}", path, e))?;
    log::info!("File written to {}", path);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfusionFormat {
    Txt,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfusionCounts {
        let mut counts = ConfusionCounts::new();
        counts
            .entry("an".to_string())
            .or_default()
            .insert("on".to_string(), 2);
        counts
            .entry("asked".to_string())
            .or_default()
            .insert("ask".to_string(), 1);
        counts
    }

    #[test]
    fn text_output_is_sorted_and_tab_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.power.conf");
        let path = path.to_str().unwrap().to_string();
        write_confusions_text(&path, "hyp.txt", "ref.txt", &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "System name: hyp.txt\nRef file   : ref.txt\nan\t==>\ton\t2\nasked\t==>\task\t1\n"
        );
    }

    #[test]
    fn json_output_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.power.conf.json");
        let path = path.to_str().unwrap().to_string();
        write_confusions_json(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: ConfusionCounts = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed, sample());
    }
}
