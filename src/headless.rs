use crate::config::SceneFile;
use crate::script::ScriptPlayer;
use crate::stage::Stage;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use xrscene_audio::AudioMixer;
use xrscene_testkit::{EventLog, EventSink, JsonlSink};

pub struct HeadlessConfig {
    pub scene: PathBuf,
    pub script: Option<PathBuf>,
    pub event_log: Option<PathBuf>,
    pub dt: Option<f32>,
    pub max_ticks: Option<u64>,
    pub audio: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub ticks: u64,
    pub events: usize,
    pub disabled: Vec<String>,
}

pub fn run(cfg: HeadlessConfig) -> Result<RunSummary> {
    let file = SceneFile::load(&cfg.scene)?;
    let mut script = match &cfg.script {
        Some(path) => ScriptPlayer::from_path(path)
            .with_context(|| format!("Failed to load script {}", path.display()))?,
        None => ScriptPlayer::idle(),
    };
    let mixer = if cfg.audio {
        AudioMixer::new()?
    } else {
        AudioMixer::stub()
    };
    let mut stage = Stage::build(&file, mixer)?;
    let dt = cfg.dt.unwrap_or(file.settings.dt);
    let limits = RunLimits {
        dt,
        settle_ticks: file.settings.settle_ticks,
        max_ticks: cfg.max_ticks,
    };

    let (ticks, events) = match &cfg.event_log {
        Some(path) => {
            let mut sink = JsonlSink::create(path)?;
            let result = drive(&mut stage, &mut script, limits, &mut sink)?;
            sink.flush()?;
            info!(path = %path.display(), "event log written");
            result
        }
        None => drive(&mut stage, &mut script, limits, &mut EventLog::new())?,
    };

    Ok(RunSummary {
        ticks,
        events,
        disabled: stage.disabled().to_vec(),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub dt: f32,
    pub settle_ticks: u64,
    pub max_ticks: Option<u64>,
}

/// Tick until the script is done and the scene has settled, or the tick cap hits.
pub fn drive(
    stage: &mut Stage,
    script: &mut ScriptPlayer,
    limits: RunLimits,
    sink: &mut dyn EventSink,
) -> Result<(u64, usize)> {
    let mut ticks = 0u64;
    let mut events = 0usize;
    let mut settled = 0u64;
    loop {
        if limits.max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
        if script.is_finished() {
            if settled >= limits.settle_ticks {
                break;
            }
            settled += 1;
        }
        events += stage.tick(script.advance(), limits.dt, sink)?;
        ticks += 1;
    }
    Ok((ticks, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptStep;

    fn limits(settle_ticks: u64, max_ticks: Option<u64>) -> RunLimits {
        RunLimits {
            dt: 1.0 / 72.0,
            settle_ticks,
            max_ticks,
        }
    }

    #[test]
    fn runs_script_then_settles() {
        let mut stage = Stage::build(&SceneFile::default(), AudioMixer::stub()).unwrap();
        let mut script = ScriptPlayer::new(vec![ScriptStep::Wait { ticks: 5 }]);
        let (ticks, events) = drive(&mut stage, &mut script, limits(10, None), &mut EventLog::new()).unwrap();
        assert_eq!(ticks, 15);
        assert_eq!(events, 0);
        assert_eq!(stage.current_tick().0, 15);
    }

    #[test]
    fn max_ticks_caps_the_run() {
        let mut stage = Stage::build(&SceneFile::default(), AudioMixer::stub()).unwrap();
        let mut script = ScriptPlayer::new(vec![ScriptStep::Wait { ticks: 500 }]);
        let (ticks, _) = drive(&mut stage, &mut script, limits(10, Some(20)), &mut EventLog::new()).unwrap();
        assert_eq!(ticks, 20);
    }
}
