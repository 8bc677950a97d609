//! Process startup and shutdown sequence

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing::{error, info};
use vat_core::{
    AnnotationEvent, AnnotationPipeline, MessageBus, PipelineError, PipelineOptions, PipelineStats,
};
use vat_platform_linux::FrameChannel;
use vat_transport::Od4Session;
use vat_viewer::ViewerOptions;

use crate::cli::{Cli, RequiredSettings, StartupError};
use crate::config::Config;
use crate::ExitCode;

/// Line printed for each annotation when echo is on
pub fn echo_line(event: &AnnotationEvent) -> String {
    format!("({};{})", event.x, event.y)
}

/// Exit code for a joined pipeline thread.
///
/// A loop that stopped with an error or panicked is a failed session even
/// though the viewer closed normally.
pub fn loop_exit_code(joined: thread::Result<Result<PipelineStats, PipelineError>>) -> ExitCode {
    match joined {
        Ok(Ok(stats)) => {
            info!(
                frames = stats.frames,
                annotations = stats.annotations,
                "annotation loop ended"
            );
            ExitCode::Success
        }
        Ok(Err(e)) => {
            error!("annotation loop failed: {}", e);
            ExitCode::GeneralError
        }
        Err(_) => {
            error!("pipeline thread panicked");
            ExitCode::GeneralError
        }
    }
}

/// Attach to the frame region, reporting failure as a startup error
pub fn attach(settings: &RequiredSettings) -> Result<FrameChannel, StartupError> {
    FrameChannel::attach(&settings.name, settings.width, settings.height).map_err(|source| {
        StartupError::RegionUnavailable {
            name: settings.name.clone(),
            source,
        }
    })
}

/// Run the annotator until the viewer closes or the session ends.
///
/// Logging must already be initialised.
pub fn run(settings: RequiredSettings, config: Config) -> anyhow::Result<ExitCode> {
    let frames = match attach(&settings) {
        Ok(frames) => frames,
        Err(e) => {
            error!("{}", e);
            return Ok(ExitCode::GeneralError);
        }
    };
    info!("attached to shared memory '{}' ({} bytes)", frames.name(), frames.size());

    let session = Arc::new(
        Od4Session::connect(settings.cid, config.session_options())
            .with_context(|| format!("failed to open session {}", settings.cid))?,
    );

    let (display, receiver) = vat_viewer::channel(config.viewer.queue_depth);
    let mut pipeline = AnnotationPipeline::new(
        frames,
        Arc::new(display),
        Arc::clone(&session) as Arc<dyn MessageBus>,
        PipelineOptions {
            wait_slice: config.wait_slice(),
        },
    );
    if config.pipeline.echo {
        pipeline = pipeline.with_emit_hook(Box::new(|event| println!("{}", echo_line(event))));
    }

    let pipeline_thread = {
        let session = Arc::clone(&session);
        thread::Builder::new()
            .name("vat-pipeline".to_string())
            .spawn(move || {
                let result = pipeline.run();
                if result.is_err() {
                    session.close();
                }
                result
            })
            .context("failed to spawn pipeline thread")?
    };

    let viewer_result = {
        let active = Arc::clone(&session);
        let closing = Arc::clone(&session);
        vat_viewer::run(
            ViewerOptions {
                title: settings.name.clone(),
                width: settings.width,
                height: settings.height,
            },
            receiver,
            Arc::new(move || active.is_session_active()),
            move || closing.close(),
        )
    };

    let code = loop_exit_code(pipeline_thread.join());
    viewer_result?;

    info!(
        code = code.name(),
        status = i32::from(code),
        "session ended: {}",
        code.description()
    );
    Ok(code)
}

/// Full startup from parsed arguments: settings, config, logging, then [`run`]
pub fn start(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = match cli.required() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", Cli::usage());
            return Ok(ExitCode::GeneralError);
        }
    };

    let config = cli.resolve_config();
    crate::init_logging(&config);
    run(settings, config)
}
