//! # CLI — StrataKV Interactive Shell
//!
//! A REPL-style command-line interface for the StrataKV engine. Reads
//! commands from stdin, executes them against the database, and prints
//! results to stdout — usable interactively or scripted via a pipe.
//!
//! ## Commands
//!
//! ```text
//! SET key value        Insert or update a key/value pair
//! GET key              Look up a key (prints value or "(nil)")
//! DEL key              Delete a key (writes a tombstone)
//! RANGE start end      Scan a key range within one segment
//! STATS                Print database debug info
//! EXIT / QUIT          Shut down cleanly
//! ```
//!
//! ## Offline compaction
//!
//! ```text
//! $ strata compact <dir>
//! ```
//!
//! runs the compactor against a quiesced database directory (it refuses to
//! run while a writable database holds the directory lock).
//!
//! ## Configuration
//!
//! All settings are environment variables:
//!
//! ```text
//! STRATA_DIR        Database directory       (default: "data/db")
//! STRATA_SYNC       fsync every WAL append   (default: "false")
//! STRATA_READONLY   Open read-only           (default: "false")
//! ```

use anyhow::Result;
use engine::{Compactor, Database, Error, Options};
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to
/// `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "compact" {
        let dir = args
            .get(2)
            .cloned()
            .unwrap_or_else(|| env_or("STRATA_DIR", "data/db"));
        return run_compaction(&dir);
    }

    let dir = env_or("STRATA_DIR", "data/db");
    let sync_write: bool = env_or("STRATA_SYNC", "false").parse().unwrap_or(false);
    let read_only: bool = env_or("STRATA_READONLY", "false").parse().unwrap_or(false);

    let options = Options {
        read_only,
        use_compression: true,
        sync_write,
    };
    let mut db = Database::open(&dir, options)?;
    println!(
        "StrataKV started (dir={}, read_only={}, sync={})",
        dir, read_only, sync_write
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let mut parts = line.trim().splitn(3, ' ');
        let command = parts.next().unwrap_or("").to_ascii_uppercase();

        match command.as_str() {
            "" => {}
            "SET" => {
                let (key, value) = (parts.next(), parts.next());
                match (key, value) {
                    (Some(k), Some(v)) => report(db.put(k.as_bytes(), v.as_bytes()).map(|_| None)),
                    _ => println!("usage: SET key value"),
                }
            }
            "GET" => match parts.next() {
                Some(k) => report(db.get(k.as_bytes()).map(Some)),
                None => println!("usage: GET key"),
            },
            "DEL" => match parts.next() {
                Some(k) => report(db.delete(k.as_bytes()).map(|_| None)),
                None => println!("usage: DEL key"),
            },
            "RANGE" => {
                let (start, end) = (parts.next(), parts.next());
                match (start, end) {
                    (Some(s), Some(e)) => match db.range(s.as_bytes(), e.as_bytes()) {
                        Ok(mut cursor) => {
                            let mut count = 0usize;
                            while cursor.next() {
                                println!(
                                    "{} -> {}",
                                    String::from_utf8_lossy(cursor.key()),
                                    String::from_utf8_lossy(cursor.value())
                                );
                                count += 1;
                            }
                            cursor.close();
                            println!("({} entries)", count);
                        }
                        Err(e) => println!("(error) {}", e),
                    },
                    _ => println!("usage: RANGE start end"),
                }
            }
            "STATS" => println!("{:?}", db),
            "EXIT" | "QUIT" => break,
            other => println!("unknown command: {}", other),
        }
    }

    db.close()?;
    println!("bye");
    Ok(())
}

/// Prints the outcome of a database call: a value, `OK`, `(nil)` for a
/// missing key, or the error.
fn report(result: engine::Result<Option<Vec<u8>>>) {
    match result {
        Ok(Some(value)) => println!("{}", String::from_utf8_lossy(&value)),
        Ok(None) => println!("OK"),
        Err(Error::KeyNotFound) => println!("(nil)"),
        Err(e) => println!("(error) {}", e),
    }
}

fn run_compaction(dir: &str) -> Result<()> {
    let mut compactor = Compactor::new(dir)?;
    println!("compacting {} ({} segments)", dir, compactor.segment_count());
    let stats = compactor.compact()?;
    for (i, s) in stats.iter().enumerate() {
        println!(
            "bucket {}: {} -> {} files, {} -> {} keys in {:?}{}",
            i,
            s.files_before,
            s.files_after,
            s.keys_before,
            s.keys_after,
            s.elapsed,
            match &s.error {
                Some(e) => format!(" (FAILED: {})", e),
                None => String::new(),
            }
        );
    }
    println!("done ({} buckets)", stats.len());
    Ok(())
}
