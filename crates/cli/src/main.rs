use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use api_shared::{IssueShareLinkRes, ValidateShareLinkRes};
use medlink_core::render::{render_svg, render_text};
use medlink_core::scan::{
    Frame, FrameOutcome, InversionMode, Navigator, PixelFormat, QrFrameDecoder, ScanSession,
    ScanState, StillImageScanner,
};
use medlink_core::{Clock, CoreConfig, ManualClock, PatientId, ShareLinkService, SystemClock};
use medlink_flows::{FlowClient, HttpModelTransport, ModelApiConfig};

/// Minimum edge length, in pixels, of SVG codes written with `render --svg`.
const SVG_MIN_SIZE: u32 = 512;

#[derive(Parser)]
#[command(name = "medlink")]
#[command(about = "MedLink profile sharing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a share link for a patient
    Issue {
        /// Patient identifier
        patient_id: String,
    },
    /// Issue a share link and render it as a QR code
    Render {
        /// Patient identifier
        patient_id: String,
        /// Write an SVG file instead of printing to the terminal
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Validate a decoded QR payload
    Validate {
        /// Decoded QR text
        payload: String,
        /// Validate as of this epoch-millisecond instant instead of now
        #[arg(long)]
        at: Option<i64>,
    },
    /// Read a share link from an image file
    ScanImage {
        /// PNG or JPEG image
        file: PathBuf,
        /// dont-invert, only-invert, attempt-both or invert-first
        #[arg(long, default_value = "attempt-both")]
        inversion: InversionMode,
    },
    /// Invoke an AI flow
    Flow {
        /// symptom_triage, prescription_suggestion, research_summary or health_trends
        name: String,
        /// Flow input as JSON
        input: String,
    },
}

/// Prints the route a successful scan opens.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&mut self, path: &str) {
        println!("Open: {}", path);
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let lookup = |key: &str| std::env::var(key).ok();

    match cli.command {
        Some(Commands::Issue { patient_id }) => {
            let cfg = CoreConfig::from_lookup(lookup)?;
            let patient_id = PatientId::parse(&patient_id)?;
            let token = ShareLinkService::new(&cfg).issue(&patient_id);
            println!(
                "{}",
                serde_json::to_string_pretty(&IssueShareLinkRes::from(&token))?
            );
        }
        Some(Commands::Render { patient_id, svg }) => {
            let cfg = CoreConfig::from_lookup(lookup)?;
            let patient_id = PatientId::parse(&patient_id)?;
            let token = ShareLinkService::new(&cfg).issue(&patient_id);
            match svg {
                Some(path) => {
                    let doc = render_svg(token.url().as_str(), SVG_MIN_SIZE)?;
                    std::fs::write(&path, doc)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {} ({})", path.display(), token.url());
                }
                None => {
                    println!("{}", render_text(token.url().as_str())?);
                    println!("{}", token.url());
                }
            }
            println!("Valid until {}", token.expires_at_ms());
        }
        Some(Commands::Validate { payload, at }) => {
            let cfg = CoreConfig::from_lookup(lookup)?;
            let clock = clock_at(at);
            let result = ShareLinkService::with_clock(&cfg, clock).validate(&payload);
            let res = ValidateShareLinkRes::from(result);
            println!("{}", serde_json::to_string_pretty(&res)?);
        }
        Some(Commands::ScanImage { file, inversion }) => {
            let cfg = CoreConfig::from_lookup(lookup)?;
            let state = scan_image(&cfg, &file, inversion, Arc::new(SystemClock))?;
            match state.message() {
                Some(message) => println!("{}: {}", state.name(), message),
                None => println!("{}", state.name()),
            }
        }
        Some(Commands::Flow { name, input }) => {
            let input: serde_json::Value =
                serde_json::from_str(&input).context("flow input is not valid JSON")?;
            let model_cfg = ModelApiConfig::from_lookup(lookup)?.ok_or_else(|| {
                anyhow::anyhow!("AI flows need {}", medlink_flows::config::ENV_MODEL_API_URL)
            })?;
            let client = FlowClient::new(HttpModelTransport::new(model_cfg)?);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let output = runtime.block_on(client.invoke_named(&name, input))?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => {
            println!("Use 'medlink --help' for commands");
        }
    }

    Ok(())
}

fn clock_at(at: Option<i64>) -> Arc<dyn Clock> {
    match at {
        Some(ms) => Arc::new(ManualClock::new(ms)),
        None => Arc::new(SystemClock),
    }
}

/// Load an image file as a luminance frame.
fn load_frame(path: &Path) -> anyhow::Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to read image {}", path.display()))?
        .to_luma8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(width, height, PixelFormat::Luma8, image.into_raw())?)
}

/// Run one still-image scan of `path` and return the state it leaves the session in.
fn scan_image(
    cfg: &CoreConfig,
    path: &Path,
    inversion: InversionMode,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<ScanState> {
    let frame = load_frame(path)?;
    let service = ShareLinkService::with_clock(cfg, clock.clone());
    let mut session = ScanSession::still_image(service.validator().clone());
    let mut scanner =
        StillImageScanner::new(QrFrameDecoder, PrintNavigator, clock).with_inversion(inversion);

    match scanner.submit(&mut session, &frame) {
        FrameOutcome::NotFound { notice } => println!("{}", notice),
        FrameOutcome::Finished(_) | FrameOutcome::Ignored => {}
    }
    Ok(session.into_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medlink_core::render::render_frame;
    use std::time::Duration;

    const ISSUED_MS: i64 = 1_700_000_000_000;

    fn cfg() -> CoreConfig {
        CoreConfig::new(
            "https://medlink.example",
            true,
            30_000,
            false,
            Duration::from_millis(33),
        )
        .unwrap()
    }

    fn write_png(dir: &Path, payload: &str, invert: bool) -> PathBuf {
        let frame = render_frame(payload, 6, invert).unwrap();
        let luma = frame.luminance().into_owned();
        let image = image::GrayImage::from_raw(frame.width(), frame.height(), luma).unwrap();
        let path = dir.join("code.png");
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_image_opens_fresh_link() {
        let dir = tempfile::tempdir().unwrap();
        let payload = format!("https://medlink.example/patient/profile/p-7?ts={ISSUED_MS}");
        let path = write_png(dir.path(), &payload, false);

        let clock = Arc::new(ManualClock::new(ISSUED_MS + 5_000));
        let state = scan_image(&cfg(), &path, InversionMode::AttemptBoth, clock).unwrap();

        assert_eq!(
            state,
            ScanState::DecodedValid {
                navigate_to: "/patient/profile/p-7".into()
            }
        );
    }

    #[test]
    fn scan_image_reports_expired_link() {
        let dir = tempfile::tempdir().unwrap();
        let payload = format!("https://medlink.example/patient/profile/p-7?ts={ISSUED_MS}");
        let path = write_png(dir.path(), &payload, true);

        let clock = Arc::new(ManualClock::new(ISSUED_MS + 120_001));
        let state = scan_image(&cfg(), &path, InversionMode::AttemptBoth, clock).unwrap();

        assert!(matches!(state, ScanState::DecodedExpired { .. }));
    }

    #[test]
    fn blank_image_keeps_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        image::GrayImage::from_pixel(64, 64, image::Luma([255u8]))
            .save(&path)
            .unwrap();

        let state = scan_image(&cfg(), &path, InversionMode::AttemptBoth, Arc::new(SystemClock))
            .unwrap();
        assert_eq!(state, ScanState::Scanning);
    }

    #[test]
    fn missing_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_image(
            &cfg(),
            &dir.path().join("nope.png"),
            InversionMode::default(),
            Arc::new(SystemClock),
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to read image"));
    }
}
