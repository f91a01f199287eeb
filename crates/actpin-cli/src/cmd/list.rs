use super::Selection;
use crate::output::{display_path, print_json, print_table};
use actpin_core::config::Config;
use actpin_core::extract::extract;
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::Path;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    select: Selection,
}

#[derive(Serialize)]
struct ListEntry {
    file: String,
    identity: String,
    tag: String,
    line: usize,
}

pub fn run(root: &Path, cwd: &Path, args: ListArgs, json: bool) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    args.select.apply(&mut config);

    let mut entries = Vec::new();
    for path in args.select.candidates(cwd, &config)? {
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        let file = display_path(cwd, &path);
        for (line_no, line) in content.lines().enumerate() {
            for reference in extract(line) {
                entries.push(ListEntry {
                    file: file.clone(),
                    identity: reference.identity,
                    tag: reference.tag,
                    line: line_no + 1,
                });
            }
        }
    }

    if json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No action references pinned to a version tag.");
        return Ok(());
    }

    let rows = entries
        .into_iter()
        .map(|e| vec![format!("{}:{}", e.file, e.line), e.identity, e.tag])
        .collect();
    print_table(&["FILE", "ACTION", "TAG"], rows)
}
