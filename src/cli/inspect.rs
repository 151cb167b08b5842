use crate::config::Config;
use crate::fragment::FragmentSet;
use crate::media::{SourceProbe, WavProbe};
use crate::timeline::{self, DurationEntry, DurationLedger};
use anyhow::{bail, Result};
use tracing::{info, warn};

use super::args::{InspectCliArgs, LocateCliArgs, SourceArgs};

pub fn load_fragments(source: &SourceArgs) -> Result<FragmentSet> {
    match (&source.manifest, &source.src) {
        (Some(path), _) => FragmentSet::load_manifest(path),
        (None, Some(src)) => Ok(FragmentSet::single(src.clone())),
        (None, None) => bail!("Either --manifest or --src is required"),
    }
}

pub async fn handle_inspect_command(args: InspectCliArgs) -> Result<()> {
    let fragments = load_fragments(&args.source)?;
    let ledger = build_ledger(&fragments, args.probe).await?;

    for line in timeline_report(&fragments, &ledger) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn handle_locate_command(args: LocateCliArgs) -> Result<()> {
    if !args.time.is_finite() || args.time < 0.0 {
        bail!("--time must be a finite, non-negative number of seconds");
    }

    let fragments = load_fragments(&args.source)?;
    if fragments.is_empty() {
        println!("The manifest lists no fragments.");
        return Ok(());
    }
    let ledger = build_ledger(&fragments, args.probe).await?;

    if let Some(position) = timeline::to_fragment_local(&ledger, args.time) {
        let source = fragments.source(position.index).unwrap_or("?");
        println!(
            "{:.3}s is fragment #{} at {:.3}s ({})",
            args.time, position.index, position.local_time, source
        );
        if args.time > ledger.total_duration() {
            println!(
                "Note: past the known end of the recording ({:.3}s)",
                ledger.total_duration()
            );
        }
    }
    Ok(())
}

/// Seed a ledger from the manifest, then optionally replace each entry with
/// the duration read from the recording itself.
async fn build_ledger(fragments: &FragmentSet, probe: bool) -> Result<DurationLedger> {
    let mut ledger = DurationLedger::seeded(fragments);
    if !probe {
        return Ok(ledger);
    }

    let config = Config::load()?;
    let prober = WavProbe::new(config.source.request_timeout())?;
    for (index, fragment) in fragments.iter().enumerate() {
        match prober.probe(&fragment.source).await {
            Ok(duration) => {
                ledger.record(index, duration);
                info!("Fragment {} is {:.3}s", index, duration);
            }
            Err(e) => warn!("Could not probe fragment {}: {}", index, e),
        }
    }
    Ok(ledger)
}

fn describe(entry: DurationEntry) -> String {
    match entry {
        DurationEntry::Unknown => "unknown".to_string(),
        DurationEntry::Declared(seconds) => format!("{:.3}s (declared)", seconds),
        DurationEntry::Observed(seconds) => format!("{:.3}s (observed)", seconds),
    }
}

pub fn timeline_report(fragments: &FragmentSet, ledger: &DurationLedger) -> Vec<String> {
    if fragments.is_empty() {
        return vec!["The manifest lists no fragments.".to_string()];
    }

    let mut lines = vec![format!("Fragments: {}", fragments.len())];
    for (index, fragment) in fragments.iter().enumerate() {
        let entry = ledger.entry(index).unwrap_or(DurationEntry::Unknown);
        lines.push(format!(
            "  #{:<3} offset {:>10.3}s  duration {:<22} {}",
            index,
            ledger.offset_of(index),
            describe(entry),
            fragment.source
        ));
    }

    let boundaries = ledger
        .boundaries()
        .iter()
        .map(|b| format!("{:.3}s", b))
        .collect::<Vec<_>>();
    if !boundaries.is_empty() {
        lines.push(format!("Boundaries: {}", boundaries.join(", ")));
    }

    let unknown = ledger
        .entries()
        .iter()
        .filter(|entry| entry.known_seconds().is_none())
        .count();
    if unknown > 0 {
        lines.push(format!(
            "Total: {:.3}s ({} fragment(s) with unknown duration)",
            ledger.total_duration(),
            unknown
        ));
    } else {
        lines.push(format!("Total: {:.3}s", ledger.total_duration()));
    }
    lines
}
