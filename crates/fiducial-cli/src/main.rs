//! `fiducial`: print ArUco markers and track them live.
//!
//! Takes no arguments. Settings come from `fiducial.json` in the working
//! directory when present; the log level from `FIDUCIAL_LOG`.

#[cfg(not(feature = "opencv"))]
mod headless;

use std::io;

use fiducial_session::{Session, SessionConfig, SessionController, DEFAULT_CONFIG_PATH};

#[cfg(feature = "tracing")]
use fiducial_core::init_tracing;
#[cfg(not(feature = "tracing"))]
use fiducial_core::{init_with_level, level_from_env};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    init_with_level(level_from_env(log::LevelFilter::Info))?;

    let config = SessionConfig::load_or_default(DEFAULT_CONFIG_PATH)?;
    let backend = backend(&config);
    let session = Session::new(config, backend)?;

    let mut stdout = io::stdout().lock();
    let exit = SessionController::new(session).run(io::stdin().lock(), &mut stdout)?;
    log::debug!("menu finished: {exit:?}");
    Ok(())
}

#[cfg(feature = "opencv")]
fn backend(_config: &SessionConfig) -> fiducial_opencv::OpenCvVision {
    fiducial_opencv::OpenCvVision::new()
}

#[cfg(not(feature = "opencv"))]
fn backend(config: &SessionConfig) -> headless::HeadlessVision {
    log::info!("built without OpenCV: video is unavailable");
    headless::HeadlessVision::new(config.code_table_path.clone())
}
