use clap::Parser;
use truvis_frame::frame_settings::FrameSettings;
use truvis_winit_app::app::WinitApp;
use truvis_winit_app::cli::CliArgs;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    truvis_crate_tools::init_log::init_log("info");

    let settings: FrameSettings = truvis_crate_tools::config::load_toml_or_default(args.config.as_deref())?;
    log::info!("frame settings: {:?}", settings);

    WinitApp::run(settings)
}
