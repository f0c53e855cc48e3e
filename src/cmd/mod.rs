pub mod project;
pub mod rules;
pub mod run;
pub mod schema;
pub mod trace;
pub mod validate;

use crate::rules::RuleStore;
use crate::scenario::Scenario;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read a scenario document (JSON file, or stdin with "-")
pub fn read_scenario(path: &Path) -> anyhow::Result<Scenario> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        read_from_file(path)
    }
}

fn read_from_file(path: &Path) -> anyhow::Result<Scenario> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Scenario::read_json(reader)
}

fn read_from_stdin() -> anyhow::Result<Scenario> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    let cursor = io::Cursor::new(buffer);
    Scenario::read_json(cursor)
}

/// Rule sets from a directory, or the built-in set
pub fn load_rules(dir: Option<&Path>) -> anyhow::Result<RuleStore> {
    match dir {
        Some(dir) => RuleStore::load(dir),
        None => RuleStore::builtin(),
    }
}
