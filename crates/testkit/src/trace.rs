//! Tick traces for determinism checks.
//!
//! A trace steps a small simulation for a fixed number of ticks and records a
//! serializable snapshot after each step. Two runs of the same setup must
//! produce identical canonical JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use xrscene_core::SimTick;

/// Single snapshot captured at a given tick.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

/// Step `state` for `ticks` ticks, snapshotting the initial state and every step.
///
/// The result holds `ticks + 1` frames.
pub fn run_trace<State, Snapshot, StepFn, SnapFn>(
    ticks: u64,
    mut state: State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> Vec<TraceFrame<Snapshot>>
where
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(TraceFrame {
        tick: tick.0,
        snapshot: snapshot(tick, &state),
    });

    for _ in 0..ticks {
        step(tick, &mut state);
        tick = tick.advance(1);
        frames.push(TraceFrame {
            tick: tick.0,
            snapshot: snapshot(tick, &state),
        });
    }
    frames
}

/// Serialize `value` as pretty JSON with object keys sorted.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize trace value")?;
    let mut s = serde_json::to_string_pretty(&canonicalize(value))
        .context("Failed to format trace JSON")?;
    s.push('\n');
    Ok(s)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (k, v) in entries {
                out.insert(k, canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Fail when two traces differ after canonicalization.
pub fn assert_traces_match<T: Serialize>(left: &T, right: &T) -> Result<()> {
    let left = canonical_json(left)?;
    let right = canonical_json(right)?;
    if left != right {
        let line = left
            .lines()
            .zip(right.lines())
            .position(|(a, b)| a != b)
            .map_or(0, |i| i + 1);
        anyhow::bail!("Traces diverge near line {line}");
    }
    Ok(())
}
