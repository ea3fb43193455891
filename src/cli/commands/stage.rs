//! stage command - Stage edits against a fixture's root record
//!
//! # Flow
//!
//! 1. Load the fixture and build its records
//! 2. Wrap the root record in a change proxy
//! 3. Stage `--set`, `--push` and `--remove` edits, in that order
//! 4. Report staged values against the record's values
//! 5. Optionally apply or save, then write the records with `--output`

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context as _, Result};
use serde::Serialize;

use crate::cli::fixture::{self, Fixture, Workspace};
use crate::cli::Context;
use crate::core::value::{EntityRef, Value};
use crate::model::Model;
use crate::proxy::{ChangeProxy, SaveOutcome};

/// Arguments of one `stage` invocation.
#[derive(Debug, Default)]
pub struct StageRequest {
    pub fixture: PathBuf,
    pub set: Vec<String>,
    pub push: Vec<String>,
    pub remove: Vec<String>,
    pub apply: bool,
    pub save: bool,
    pub json: bool,
    pub output: Option<PathBuf>,
}

/// What happened to the staged edits at the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Edits were only staged
    Staged,
    /// Edits were copied onto the record
    Applied,
    /// Edits were applied and the record committed
    Saved,
    /// Save was requested but nothing differed from the record
    Clean,
}

/// One staged key in the report.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: serde_json::Value,
    pub was: serde_json::Value,
    pub changed: bool,
}

/// Report printed by `stage`.
#[derive(Debug, Serialize)]
pub struct Report {
    pub dirty: bool,
    pub changed: Vec<String>,
    pub entries: Vec<Entry>,
    pub outcome: Outcome,
}

/// Stage edits and print the report.
pub fn stage(ctx: &Context, req: StageRequest) -> Result<()> {
    let workspace = Fixture::load(&req.fixture)?
        .build()
        .with_context(|| format!("invalid fixture '{}'", req.fixture.display()))?;

    let shared = workspace
        .root()
        .shared()
        .ok_or_else(|| anyhow!("fixture root is not a record"))?;

    let report = {
        let mut guard = shared
            .try_borrow_mut()
            .map_err(|_| anyhow!("fixture root is already in use"))?;
        let mut proxy = ChangeProxy::with_options(&mut *guard, ctx.config.staging_options());
        run_edits(&mut proxy, &workspace, &req)?
    };

    if req.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = &req.output {
        workspace.capture().write(path)?;
        tracing::debug!(path = %path.display(), "records written");
    }
    Ok(())
}

fn run_edits(
    proxy: &mut ChangeProxy<'_, dyn Model>,
    workspace: &Workspace,
    req: &StageRequest,
) -> Result<Report> {
    for edit in &req.set {
        let (key, raw) = split_assignment(edit)?;
        let value = parse_value(workspace, raw)?;
        tracing::debug!(key, value = %value, "set");
        proxy.set(key, value);
    }
    for edit in &req.push {
        let (key, raw) = split_assignment(edit)?;
        let members = parse_members(workspace, raw)?;
        collection(proxy, key)?.push_objects(members);
    }
    for edit in &req.remove {
        let (key, raw) = split_assignment(edit)?;
        let members = parse_members(workspace, raw)?;
        collection(proxy, key)?.remove_objects(&members);
    }

    let changed: Vec<String> = proxy.changed_keys().into_iter().map(String::from).collect();
    let entries = proxy
        .staged_keys()
        .map(|key| Entry {
            key: key.to_string(),
            value: fixture::to_json(&proxy.get(key)),
            was: fixture::to_json(&proxy.model().get(key)),
            changed: changed.iter().any(|c| c == key),
        })
        .collect();
    let dirty = !changed.is_empty();

    let outcome = if req.save {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start runtime")?;
        match runtime.block_on(proxy.save())? {
            SaveOutcome::Saved => Outcome::Saved,
            SaveOutcome::Clean => Outcome::Clean,
        }
    } else if req.apply {
        proxy.apply_changes();
        Outcome::Applied
    } else {
        Outcome::Staged
    };

    Ok(Report {
        dirty,
        changed,
        entries,
        outcome,
    })
}

fn collection<'p>(
    proxy: &'p mut ChangeProxy<'_, dyn Model>,
    key: &str,
) -> Result<&'p mut crate::proxy::CollectionChange> {
    proxy
        .collection_mut(key)
        .ok_or_else(|| anyhow!("'{key}' is not a to-many relationship"))
}

fn split_assignment(edit: &str) -> Result<(&str, &str)> {
    match edit.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("expected KEY=VALUE, got '{edit}'"),
    }
}

/// `null`, `@id`, `@id,@id...`, or text.
fn parse_value(workspace: &Workspace, raw: &str) -> Result<Value> {
    if raw == "null" {
        return Ok(Value::Null);
    }
    if !raw.starts_with('@') {
        return Ok(Value::from(raw));
    }
    let mut members = parse_members(workspace, raw)?;
    if members.len() == 1 {
        return Ok(Value::Entity(members.remove(0)));
    }
    Ok(Value::Entities(members))
}

fn parse_members(workspace: &Workspace, raw: &str) -> Result<Vec<EntityRef>> {
    raw.split(',')
        .map(|part| -> Result<EntityRef> {
            let id = part
                .trim()
                .strip_prefix('@')
                .ok_or_else(|| anyhow!("expected @ID, got '{part}'"))?;
            Ok(workspace.resolve(id)?)
        })
        .collect()
}

fn print_report(report: &Report) {
    for entry in &report.entries {
        let value = render(&entry.value);
        if entry.changed {
            println!("{}: {} (was {})", entry.key, value, render(&entry.was));
        } else {
            println!("{}: {}", entry.key, value);
        }
    }
    println!("dirty: {}", report.dirty);
    if !report.changed.is_empty() {
        println!("changed: {}", report.changed.join(", "));
    }
    match report.outcome {
        Outcome::Staged => {}
        Outcome::Applied => println!("applied"),
        Outcome::Saved => println!("saved"),
        Outcome::Clean => println!("nothing to save"),
    }
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}
