// src/main.rs
//
// Minimal line-at-a-time demo of the canonicalization pipeline: read
// collector strings from stdin, one per line, run each through
// `PipelineDriver`, and print what it resolved to. A real ingestion run
// would drive `PipelineDriver::process_batch` against a file or a stream
// instead of this interactive loop.

use std::io::{self, BufRead, Write};

use chrono::Utc;
use coletores_canon::{CanonicalStore, Config, InMemoryStore};
use coletores_canon::ner::NullNerAdapter;
use coletores_canon::pipeline::{PipelineDriver, PipelineOutcome};

fn main() {
    let config = Config::default();
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let driver = PipelineDriver::new(config, InMemoryStore::new(), NullNerAdapter);

    println!("coletores-canon — enter collector strings, one per line (Ctrl-D to finish):");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let raw = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("failed to read line: {e}");
                continue;
            }
        };
        if raw.trim().is_empty() {
            print!("> ");
            io::stdout().flush().ok();
            continue;
        }

        let now = Utc::now();
        for outcome in driver.process_one(&raw, now) {
            match outcome {
                PipelineOutcome::Canonicalized { entity, match_score, .. } => match match_score {
                    Some(score) => println!("  -> merged into \"{}\" (score {:.2})", entity.canonical_name, score),
                    None => println!("  -> new canonical entity \"{}\"", entity.canonical_name),
                },
                PipelineOutcome::Discarded { reason, .. } => {
                    eprintln!("  -> discarded: {reason}");
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    let entities = driver.store().all();
    println!("\n{} canonical entities resolved this run.", entities.len());
}
