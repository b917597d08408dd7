use crate::align::ScoreComponents;
use crate::cli::ScoreArgs;
use crate::power::{LexiconPronouncer, NaivePronouncer, PowerAligner, PowerConfig, Pronouncer};
use crate::score::writers::{
    write_comparison, write_confusions_json, write_confusions_text, ConfusionCounts,
    ConfusionFormat, ReportWriter,
};
use crate::score::{SegmentOutcome, SegmentScore};
use crate::utils::{create_writer, open_text_reader, Result};
use crossbeam_channel::{bounded, Sender};
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{
    collections::BTreeMap,
    io::BufRead,
    sync::Arc,
    thread::{self},
};

const CHANNEL_BUFFER_SIZE: usize = 2048;

struct Totals {
    line_count: usize,
    failures: usize,
    power: ScoreComponents,
    wer: ScoreComponents,
    power_confusions: ConfusionCounts,
    wer_confusions: ConfusionCounts,
}

pub fn score(args: ScoreArgs) -> Result<()> {
    let ref_lines = read_lines(&args.ref_path)?;
    let hyp_lines = read_lines(&args.hyp_path)?;
    if ref_lines.len() != hyp_lines.len() {
        return Err(format!(
            "Line count mismatch: {} has {} lines, {} has {}",
            args.ref_path.display(),
            ref_lines.len(),
            args.hyp_path.display(),
            hyp_lines.len()
        ));
    }

    let pronouncer: Arc<dyn Pronouncer> = match &args.lexicon_path {
        Some(path) => Arc::new(LexiconPronouncer::from_json_file(path).map_err(|e| e.to_string())?),
        None => {
            log::warn!("No lexicon given, using letters as pseudo-phonemes");
            Arc::new(NaivePronouncer)
        }
    };
    let config = Arc::new(PowerConfig {
        lowercase: !args.case_sensitive,
        word_align_weights: args.word_align_weights,
    });

    let hyp_name = args.hyp_path.display().to_string();
    let ref_name = args.ref_path.display().to_string();
    let mut power_writers: Vec<Box<dyn ReportWriter>> = Vec::new();
    let mut wer_writers: Vec<Box<dyn ReportWriter>> = Vec::new();
    for format in &args.formats {
        power_writers.push(create_writer(
            &args.output_prefix,
            &format!("power.{}", format.suffix()),
            |path| format.create_writer(path, &hyp_name),
        )?);
        if args.print_wer {
            wer_writers.push(create_writer(
                &args.output_prefix,
                &format!("wer.{}", format.suffix()),
                |path| format.create_writer(path, &hyp_name),
            )?);
        }
    }

    let (sender_pair, receiver_pair) = bounded(CHANNEL_BUFFER_SIZE);
    let pair_stream_thread = thread::spawn(move || {
        for (index, pair) in ref_lines.into_iter().zip(hyp_lines).enumerate() {
            if sender_pair.send((index + 1, pair)).is_err() {
                break;
            }
        }
    });

    let (sender_result, receiver_result) = bounded::<(usize, SegmentOutcome)>(CHANNEL_BUFFER_SIZE);
    let show_phonemes = args.show_phonemes;
    let track_confusions = args.show_confusions.is_some();
    let print_wer = args.print_wer;
    let writer_thread = thread::spawn(move || -> Result<Totals> {
        let mut totals = Totals {
            line_count: 0,
            failures: 0,
            power: ScoreComponents::default(),
            wer: ScoreComponents::default(),
            power_confusions: ConfusionCounts::new(),
            wer_confusions: ConfusionCounts::new(),
        };
        // Workers finish out of order; hold results until their turn.
        let mut pending: BTreeMap<usize, SegmentOutcome> = BTreeMap::new();
        let mut next_id = 1;
        for (id, outcome) in &receiver_result {
            pending.insert(id, outcome);
            while let Some(outcome) = pending.remove(&next_id) {
                write_outcome(
                    next_id,
                    outcome,
                    &mut power_writers,
                    &mut wer_writers,
                    show_phonemes,
                    track_confusions,
                    print_wer,
                    &mut totals,
                )?;
                next_id += 1;
            }
        }
        for writer in power_writers.iter_mut().chain(wer_writers.iter_mut()) {
            writer.finalize()?;
        }
        Ok(totals)
    });

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = ThreadPoolBuilder::new()
        .num_threads(args.num_threads)
        .thread_name(|idx| format!("power-{}", idx))
        .build()
        .map_err(|e| e.to_string())?;
    pool.install(|| {
        receiver_pair
            .into_iter()
            .par_bridge()
            .for_each_with(&sender_result, |s, (id, (ref_line, hyp_line))| {
                process_pair(id, &ref_line, &hyp_line, &config, &pronouncer, s);
            });
    });

    drop(sender_result);
    let totals = writer_thread.join().expect("Writer thread panicked")?;
    pair_stream_thread
        .join()
        .expect("Pair stream thread panicked");

    if totals.failures > 0 {
        log::warn!("{} segment(s) could not be scored", totals.failures);
    }
    println!("Scored {} segment pairs", totals.line_count);
    println!(
        "POWER: {:.3} (#C {} #S {} #D {} #I {} / {})",
        totals.power.error_rate(),
        totals.power.correct,
        totals.power.substitution,
        totals.power.deletion,
        totals.power.insertion,
        totals.power.ref_length
    );
    println!(
        "WER:   {:.3} (#C {} #S {} #D {} #I {} / {})",
        totals.wer.error_rate(),
        totals.wer.correct,
        totals.wer.substitution,
        totals.wer.deletion,
        totals.wer.insertion,
        totals.wer.ref_length
    );

    if args.compare {
        write_comparison(
            &format!("{}.rsum", args.output_prefix),
            &hyp_name,
            &ref_name,
            totals.line_count,
            &totals.power,
            &totals.wer,
        )?;
    }
    if let Some(formats) = &args.show_confusions {
        if formats.contains(&ConfusionFormat::Txt) {
            write_confusions_text(
                &format!("{}.power.conf", args.output_prefix),
                &hyp_name,
                &ref_name,
                &totals.power_confusions,
            )?;
            if args.print_wer {
                write_confusions_text(
                    &format!("{}.wer.conf", args.output_prefix),
                    &hyp_name,
                    &ref_name,
                    &totals.wer_confusions,
                )?;
            }
        }
        if formats.contains(&ConfusionFormat::Json) {
            write_confusions_json(
                &format!("{}.power.conf.json", args.output_prefix),
                &totals.power_confusions,
            )?;
            if args.print_wer {
                write_confusions_json(
                    &format!("{}.wer.conf.json", args.output_prefix),
                    &totals.wer_confusions,
                )?;
            }
        }
    }

    Ok(())
}

fn read_lines(path: &std::path::Path) -> Result<Vec<String>> {
    let reader = open_text_reader(path)?;
    reader
        .lines()
        .map(|line| {
            line.map(|l| l.trim().to_string())
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
        })
        .collect()
}

fn process_pair(
    id: usize,
    ref_line: &str,
    hyp_line: &str,
    config: &Arc<PowerConfig>,
    pronouncer: &Arc<dyn Pronouncer>,
    sender: &Sender<(usize, SegmentOutcome)>,
) {
    let outcome = score_pair(ref_line, hyp_line, config, pronouncer.as_ref());
    if let Err(e) = sender.send((id, outcome)) {
        log::error!("Failed to send result of segment {}: {}", id, e);
    }
}

fn score_pair(
    ref_line: &str,
    hyp_line: &str,
    config: &PowerConfig,
    pronouncer: &dyn Pronouncer,
) -> SegmentOutcome {
    if ref_line.is_empty() && hyp_line.is_empty() {
        return SegmentOutcome::Blank;
    }
    let scored = (|| {
        let mut aligner = PowerAligner::new(ref_line, hyp_line, config, pronouncer)?;
        aligner.align()?;
        let power_alignment = aligner
            .power_alignment
            .take()
            .ok_or_else(|| crate::utils::AlignError::inconsistency("missing refined alignment"))?;
        let (_, power_components) = power_alignment.error_rate();
        Ok::<SegmentScore, crate::utils::AlignError>(SegmentScore {
            wer_components: aligner.wer_components,
            wer_alignment: aligner.wer_alignment,
            power_components,
            power_alignment,
            phonetic_alignments: aligner.phonetic_alignments,
        })
    })();
    match scored {
        Ok(score) => SegmentOutcome::Scored(Box::new(score)),
        Err(e) => SegmentOutcome::Failed(e.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_outcome(
    id: usize,
    outcome: SegmentOutcome,
    power_writers: &mut [Box<dyn ReportWriter>],
    wer_writers: &mut [Box<dyn ReportWriter>],
    show_phonemes: bool,
    track_confusions: bool,
    print_wer: bool,
    totals: &mut Totals,
) -> Result<()> {
    totals.line_count += 1;
    match outcome {
        SegmentOutcome::Scored(score) => {
            for writer in power_writers.iter_mut() {
                let phonetic = if show_phonemes {
                    Some(score.phonetic_alignments.as_slice())
                } else {
                    None
                };
                writer.write(id, &score.power_components, &score.power_alignment, phonetic)?;
            }
            for writer in wer_writers.iter_mut() {
                writer.write(id, &score.wer_components, &score.wer_alignment, None)?;
            }
            totals.power += score.power_components;
            totals.wer += score.wer_components;
            if track_confusions {
                merge_confusions(
                    &mut totals.power_confusions,
                    score.power_alignment.confusion_pairs(),
                );
                if print_wer {
                    merge_confusions(
                        &mut totals.wer_confusions,
                        score.wer_alignment.confusion_pairs(),
                    );
                }
            }
        }
        SegmentOutcome::Blank => {
            for writer in power_writers.iter_mut().chain(wer_writers.iter_mut()) {
                writer.write_blank()?;
            }
        }
        SegmentOutcome::Failed(message) => {
            log::error!("Segment {}: {}", id, message);
            totals.failures += 1;
            for writer in power_writers.iter_mut().chain(wer_writers.iter_mut()) {
                writer.write_blank()?;
            }
        }
    }
    Ok(())
}

fn merge_confusions(into: &mut ConfusionCounts, from: ConfusionCounts) {
    for (ref_tok, hyps) in from {
        let entry = into.entry(ref_tok).or_default();
        for (hyp_tok, count) in hyps {
            *entry.entry(hyp_tok).or_insert(0) += count;
        }
    }
}
