use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;
use trellis_renderer::tags::{li, ul};
use trellis_renderer::{
    children, key, Child, CommitStats, Document, MemoryDocument, RootBuilder, RootOptions, VNode,
};

#[derive(Args, Debug)]
pub struct ShuffleArgs {
    /// Number of keyed rows
    #[arg(short, long)]
    pub items: Option<usize>,

    /// Number of shuffled re-renders
    #[arg(short, long)]
    pub rounds: Option<usize>,

    /// Seed for the shuffle sequence
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleReport {
    pub items: usize,
    pub rounds: usize,
    pub seed: u64,
    pub mount_ms: f64,
    pub shuffle_ms: f64,
    pub totals: CommitStats,
}

pub fn shuffle(args: ShuffleArgs, config: &Config) -> Result<()> {
    let items = args.items.unwrap_or(config.shuffle.items);
    let rounds = args.rounds.unwrap_or(config.shuffle.rounds);
    let seed = args.seed.unwrap_or(config.shuffle.seed);

    if !args.json {
        println!("🔀 {} keyed shuffle benchmark", "Starting".green().bold());
        println!("   Items:  {}", items);
        println!("   Rounds: {}", rounds);
        println!();
    }

    let report = run_shuffle(items, rounds, seed, &config.root)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let totals = &report.totals;
    println!("   Mount:    {:.2} ms", report.mount_ms);
    println!(
        "   Shuffles: {:.2} ms ({:.3} ms/round)",
        report.shuffle_ms,
        report.shuffle_ms / rounds.max(1) as f64
    );
    println!(
        "   Moves: {}  Creates: {}  Removes: {}",
        totals.moved,
        totals.created(),
        totals.removed
    );
    if totals.failures > 0 {
        println!("   {} {}", "Failures:".red(), totals.failures);
    }
    println!();
    println!("✨ {} Shuffle complete!", "Done".green().bold());
    Ok(())
}

/// Mounts `items` keyed rows, then re-renders `rounds` random permutations.
pub fn run_shuffle(
    items: usize,
    rounds: usize,
    seed: u64,
    options: &RootOptions,
) -> Result<ShuffleReport> {
    let mut document = MemoryDocument::new();
    let body = document.create_element("body");
    let root = RootBuilder::new(Arc::new(Mutex::new(document)), body)
        .options(RootOptions {
            background: false,
            ..options.clone()
        })
        .build();

    debug!(items, rounds, seed, "running shuffle benchmark");
    let mut order: Vec<usize> = (0..items).collect();
    let started = Instant::now();
    root.render(rows(&order))?;
    let mount_ms = started.elapsed().as_secs_f64() * 1000.0;

    root.reset_stats();
    let mut rng = XorShift::new(seed);
    let started = Instant::now();
    for _ in 0..rounds {
        rng.shuffle(&mut order);
        root.render(rows(&order))?;
    }
    let shuffle_ms = started.elapsed().as_secs_f64() * 1000.0;

    Ok(ShuffleReport {
        items,
        rounds,
        seed,
        mount_ms,
        shuffle_ms,
        totals: root.stats(),
    })
}

fn rows(order: &[usize]) -> VNode {
    ul(order
        .iter()
        .map(|i| li(children![key(i.to_string()), *i]).into())
        .collect::<Vec<Child>>())
}

/// Small deterministic generator for reproducible shuffles.
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn shuffle<T>(&mut self, values: &mut [T]) {
        for i in (1..values.len()).rev() {
            let j = (self.next_u64() % (i as u64 + 1)) as usize;
            values.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shuffle_keeps_rows() {
        let report = run_shuffle(50, 5, 7, &RootOptions::default()).unwrap();
        assert_eq!(report.totals.created(), 0);
        assert_eq!(report.totals.removed, 0);
        assert_eq!(report.totals.failures, 0);
    }

    #[test]
    fn test_xorshift_is_deterministic() {
        let mut a = XorShift::new(42);
        let mut b = XorShift::new(42);
        let mut left: Vec<u32> = (0..20).collect();
        let mut right = left.clone();
        a.shuffle(&mut left);
        b.shuffle(&mut right);
        assert_eq!(left, right);

        let mut sorted = left.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<u32>>());
    }
}
