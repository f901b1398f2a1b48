use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use saferound_core::sobriety::PipelineStage;
use saferound_core::{AssessmentClient, Config, SobrietyPipeline};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{api_client, is_quit, print_event, CmdResult};
use crate::hardware::SimulatedSensor;

#[derive(Subcommand)]
pub enum SobrietyAction {
    /// Run the steadiness, reaction and typing tests, then get a score
    Run {
        /// Seed for the simulated accelerometer and target placement
        #[arg(long)]
        seed: Option<u64>,
        /// Simulated hand tremor, in g
        #[arg(long, default_value_t = 0.05, value_parser = parse_tremor)]
        tremor: f64,
    },
}

fn parse_tremor(raw: &str) -> Result<f64, String> {
    let amplitude: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !amplitude.is_finite() || amplitude < 0.0 {
        return Err(format!("expected a finite amplitude >= 0, got {raw}"));
    }
    Ok(amplitude)
}

pub async fn run(action: SobrietyAction) -> CmdResult {
    match action {
        SobrietyAction::Run { seed, tremor } => run_test(seed, tremor).await,
    }
}

async fn run_test(seed: Option<u64>, tremor: f64) -> CmdResult {
    let config = Config::load()?;
    let service = AssessmentClient::new(api_client(&config)?);
    let mut pipeline = match seed {
        Some(seed) => SobrietyPipeline::with_seed(config.sobriety.clone(), seed),
        None => SobrietyPipeline::new(config.sobriety.clone()),
    };
    let mut sensor = SimulatedSensor::new(seed, tremor);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    print_event(&pipeline.start(&mut sensor, Utc::now())?)?;
    eprintln!("Hold the phone steady. Type q + Enter to quit.");

    // Steadiness: sample until the stage completes; stdin only matters for quitting.
    let period = Duration::from_millis(pipeline.config().sample_period_ms.max(1));
    let mut ticker = tokio::time::interval(period);
    let mut stdin_open = true;
    while pipeline.stage() == PipelineStage::Steadiness {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(sample) = sensor.sample() else { break };
                if let Some(event) = pipeline.record_motion(sample, Utc::now())? {
                    print_event(&event)?;
                }
            }
            line = input.next_line(), if stdin_open => {
                match line? {
                    Some(line) if is_quit(&line) => return cancel(&mut pipeline),
                    Some(_) => {}
                    None => stdin_open = false,
                }
            }
        }
    }

    while pipeline.stage() == PipelineStage::Reaction {
        if let Some(target) = pipeline.target() {
            eprintln!("Tap the target at ({:.0}, {:.0}): press Enter", target.x, target.y);
        }
        match input.next_line().await? {
            Some(line) if !is_quit(&line) => {
                if let Some(event) = pipeline.acknowledge_target(Utc::now())? {
                    print_event(&event)?;
                }
            }
            _ => return cancel(&mut pipeline),
        }
    }

    eprintln!("Type this sentence:\n  {}", pipeline.config().reference_sentence);
    while !pipeline.can_submit() {
        let Some(line) = input.next_line().await? else {
            return cancel(&mut pipeline);
        };
        if is_quit(&line) {
            return cancel(&mut pipeline);
        }
        pipeline.set_typed_text(&line)?;
        if !pipeline.can_submit() {
            eprintln!("Too short. Type the whole sentence.");
        }
    }

    eprintln!("Scoring...");
    print_event(&pipeline.submit(&service, Utc::now()).await?)?;
    if let Some(result) = pipeline.result() {
        let marker = if result.is_emergency { "!! " } else { "" };
        eprintln!("{marker}Score {}/100. {}", result.score, result.recommendation);
    }
    Ok(())
}

fn cancel(pipeline: &mut SobrietyPipeline) -> CmdResult {
    if let Some(event) = pipeline.cancel(Utc::now()) {
        print_event(&event)?;
    }
    Ok(())
}
