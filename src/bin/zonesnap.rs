use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use zonesnap::common::config::{Config, config_file};
use zonesnap::common::log;
use zonesnap::layout_engine::SnapPosition;
use zonesnap::model::layout::Layout;
use zonesnap::model::layout_store::LayoutStore;
use zonesnap::sys::geometry::{Rect, Size};
use zonesnap::sys::window_server::WindowHandle;

#[derive(Parser)]
#[command(name = "zonesnap", version, about = "Named zone layouts and hotkey snapping")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register hotkeys and stay in the background.
    Run,
    /// List the windows layouts would be applied to, in application order.
    Windows {
        #[arg(long)]
        json: bool,
    },
    /// Snap the frontmost window. Without --position it advances the cycle.
    Snap {
        #[arg(long)]
        position: Option<SnapPosition>,
    },
    /// Apply a stored layout to every listed window, or to just one.
    Apply {
        name: String,
        /// Handle as printed by `windows`.
        #[arg(long, value_name = "HANDLE")]
        window: Option<WindowHandle>,
    },
    /// Manage stored layouts.
    Layouts {
        #[command(subcommand)]
        command: LayoutCommands,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum LayoutCommands {
    List {
        #[arg(long)]
        json: bool,
    },
    Show {
        name: String,
    },
    /// Store an evenly divided grid of zones.
    Create {
        name: String,
        #[arg(long, default_value_t = 2)]
        columns: u32,
        #[arg(long, default_value_t = 1)]
        rows: u32,
        /// Screen size as WIDTHxHEIGHT. Defaults to the primary display's work area.
        #[arg(long, value_parser = parse_size)]
        size: Option<Size>,
    },
    Delete {
        name: String,
    },
    /// Print the directory layouts are stored in.
    Path,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Check the config file and report every problem found.
    Validate,
    /// Print the built-in default config.
    Default,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(format!("size must be positive, got {s:?}"));
    }
    Ok(Size::new(width, height))
}

fn main() {
    sigpipe::reset();
    let cli = Cli::parse();
    log::init_logging();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config_file);

    if let Commands::Config { command } = &cli.command {
        return match command {
            ConfigCommands::Default => {
                print!("{}", Config::default_text());
                Ok(())
            }
            ConfigCommands::Validate => validate_config(&config_path),
        };
    }

    let config = Config::load_or_default(&config_path)?;
    if !matches!(cli.command, Commands::Layouts { .. }) {
        check_issues(config.validate(), &config_path)?;
    }
    match cli.command {
        Commands::Layouts { command } => layouts(config.settings.layout_store(), command),
        Commands::Run => platform::run_daemon(config, config_path),
        Commands::Windows { json } => platform::windows(config, json),
        Commands::Snap { position } => platform::snap(config, position),
        Commands::Apply { name, window } => platform::apply(config, &name, window),
        Commands::Config { .. } => Ok(()),
    }
}

fn validate_config(path: &std::path::Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!("No config at {}; built-in defaults are in use", path.display());
        return Ok(());
    }
    check_issues(Config::read(path)?.validate(), path)?;
    println!("Config validation passed");
    Ok(())
}

/// Window commands and the daemon refuse to start on a config with problems.
fn check_issues(issues: Vec<String>, path: &std::path::Path) -> anyhow::Result<()> {
    if issues.is_empty() {
        return Ok(());
    }
    for issue in &issues {
        eprintln!("{issue}");
    }
    bail!("{} problem(s) in {}", issues.len(), path.display())
}

fn layouts(store: LayoutStore, command: LayoutCommands) -> anyhow::Result<()> {
    match command {
        LayoutCommands::List { json } => {
            let layouts = store.load_all();
            if json {
                println!("{}", serde_json::to_string_pretty(&layouts)?);
            } else {
                for layout in &layouts {
                    println!("{}\t{} zones", layout.name, layout.zones.len());
                }
            }
        }
        LayoutCommands::Show { name } => {
            let layout = store.load(&name)?.with_context(|| format!("no layout named {name:?}"))?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        LayoutCommands::Create { name, columns, rows, size } => {
            let (area, screen) = match size {
                Some(size) => {
                    let screen = Rect::new(0.0, 0.0, size.width, size.height);
                    (screen, screen)
                }
                None => platform::reference_area()?,
            };
            let layout = Layout::grid(name, area, screen, columns, rows);
            let path = store.save(&layout)?;
            println!("Saved {} ({} zones) to {}", layout.name, layout.zones.len(), path.display());
        }
        LayoutCommands::Delete { name } => {
            if store.delete(&name)? {
                println!("Deleted {name}");
            } else {
                println!("No layout named {name:?}");
            }
        }
        LayoutCommands::Path => println!("{}", store.dir().display()),
    }
    Ok(())
}

#[cfg(target_os = "macos")]
mod platform {
    use std::path::PathBuf;
    use std::{process, thread};

    use anyhow::{Context, bail};
    use objc2::MainThreadMarker;
    use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
    use tracing::{info, warn};
    use zonesnap::actor::controller::{Controller, Event};
    use zonesnap::actor::file_watcher::FileWatcher;
    use zonesnap::actor::hotkeys::Hotkeys;
    use zonesnap::common::config::Config;
    use zonesnap::layout_engine::SnapPosition;
    use zonesnap::sys::geometry::Rect;
    use zonesnap::sys::native::NativeWindowServer;
    use zonesnap::sys::window_directory::WindowDirectory;
    use zonesnap::sys::window_server::{WindowHandle, WindowServer};

    fn server() -> anyhow::Result<NativeWindowServer> {
        if !NativeWindowServer::accessibility_trusted() {
            bail!(
                "zonesnap needs Accessibility access. Grant it in System Settings > \
Privacy & Security > Accessibility and try again."
            );
        }
        Ok(NativeWindowServer::new())
    }

    pub fn reference_area() -> anyhow::Result<(Rect, Rect)> {
        let server = NativeWindowServer::new();
        Ok((server.work_area(), server.screen_bounds()))
    }

    pub fn windows(config: Config, json: bool) -> anyhow::Result<()> {
        let server = server()?;
        let windows =
            WindowDirectory::new(config.settings.exclusion_rules()).list_windows(&server);
        if json {
            println!("{}", serde_json::to_string_pretty(&windows)?);
            return Ok(());
        }
        for w in &windows {
            println!("{}\t{}\t{}\t{}", w.handle, w.class, w.bounds, w.title);
        }
        Ok(())
    }

    pub fn snap(config: Config, position: Option<SnapPosition>) -> anyhow::Result<()> {
        let (controller, _tx) = Controller::new(server()?, config);
        let outcome = match position {
            Some(position) => controller.snap_focused(position)?,
            None => controller.cycle_focused()?,
        };
        println!("{} {}", outcome.position, outcome.frame);
        Ok(())
    }

    pub fn apply(config: Config, name: &str, window: Option<WindowHandle>) -> anyhow::Result<()> {
        let (mut controller, _tx) = Controller::new(server()?, config);
        let report = controller.apply_layout(name, window)?;
        println!(
            "Applied {}: {} moved, {} skipped",
            report.layout,
            report.moved,
            report.skipped()
        );
        for failure in &report.failures {
            println!("  {} ({}): {}", failure.title, failure.handle, failure.reason);
        }
        Ok(())
    }

    pub fn run_daemon(config: Config, config_path: PathBuf) -> anyhow::Result<()> {
        let mtm = MainThreadMarker::new().context("the daemon must start on the main thread")?;
        let app = NSApplication::sharedApplication(mtm);
        let _ = app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);

        let (controller, events_tx) = Controller::new(server()?, config.clone());
        thread::Builder::new()
            .name("controller".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        warn!("controller: no runtime: {e}");
                        process::exit(1);
                    }
                };
                rt.block_on(controller.run());
                process::exit(0);
            })
            .context("spawning controller thread")?;

        FileWatcher::spawn(events_tx.clone(), &config, config_path)
            .context("spawning file watcher")?;
        let _hotkeys = Hotkeys::register(&config.keys, events_tx.clone()).map_err(anyhow::Error::msg)?;

        let shutdown_tx = events_tx.clone();
        ctrlc::set_handler(move || shutdown_tx.send(Event::Shutdown))
            .context("installing Ctrl+C handler")?;

        info!("zonesnap running");
        app.run();
        Ok(())
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use std::path::PathBuf;

    use anyhow::bail;
    use zonesnap::common::config::Config;
    use zonesnap::layout_engine::SnapPosition;
    use zonesnap::sys::geometry::Rect;
    use zonesnap::sys::window_server::WindowHandle;

    const UNSUPPORTED: &str = "window control is only available on macOS";

    pub fn reference_area() -> anyhow::Result<(Rect, Rect)> {
        bail!("pass --size WIDTHxHEIGHT; {UNSUPPORTED}")
    }

    pub fn windows(_: Config, _: bool) -> anyhow::Result<()> { bail!(UNSUPPORTED) }

    pub fn snap(_: Config, _: Option<SnapPosition>) -> anyhow::Result<()> { bail!(UNSUPPORTED) }

    pub fn apply(_: Config, _: &str, _: Option<WindowHandle>) -> anyhow::Result<()> {
        bail!(UNSUPPORTED)
    }

    pub fn run_daemon(_: Config, _: PathBuf) -> anyhow::Result<()> { bail!(UNSUPPORTED) }
}
