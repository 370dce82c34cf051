//! traylink demo
//!
//! Puts an icon in the system tray with a small menu, shows a desktop
//! notification on request and exits on "Quit" or Ctrl+C.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use traylink::config::Config;
use traylink::ui::notifier_from_config;
use traylink::{logging, MenuItemHandle, Notification, Notifier, Tray};

/// Main entry point, runs tray on main thread (required for macOS)
fn main() -> Result<()> {
    let _log_guard = logging::init_logging()?;

    info!("traylink starting...");

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config_override = args
        .iter()
        .position(|a| a == "--config" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let config = match &config_override {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Configuration loaded from {:?}", config.config_path()?);

    // Runtime for click handling and blocking notification calls
    let runtime = tokio::runtime::Runtime::new()?;

    let notifier: Arc<dyn Notifier> = Arc::from(notifier_from_config(&config.notifications));

    let tray = Tray::with_default_backend(&config.tray.app_id);
    apply_appearance(&tray, &config);

    // Ctrl+C asks the native loop to stop
    let ctrl_c_tray = tray.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        ctrl_c_tray.quit();
    })?;

    let ready_tray = tray.clone();
    let runtime_handle = runtime.handle().clone();
    let app_name = config.tray.title.clone();

    tray.run(
        move || {
            if let Err(e) = build_menu(ready_tray, notifier, runtime_handle, app_name) {
                error!("Failed to build tray menu: {}", e);
            }
        },
        || info!("Tray torn down"),
    );

    runtime.shutdown_timeout(std::time::Duration::from_secs(2));
    info!("Shutdown complete");
    Ok(())
}

fn apply_appearance(tray: &Tray, config: &Config) {
    tray.set_title(&config.tray.title);
    tray.set_tooltip(&config.tray.tooltip);
    tray.set_removal_allowed(config.tray.removal_allowed);

    let regular = config.tray.icon_path.as_ref().map(std::fs::read);
    let template = config.tray.template_icon_path.as_ref().map(std::fs::read);

    let result = match (template, regular) {
        (Some(Ok(template)), Some(Ok(regular))) => tray.set_template_icon(&template, &regular),
        (_, Some(Ok(regular))) => tray.set_icon(&regular),
        (_, Some(Err(e))) => {
            warn!("Failed to read tray icon {:?}: {}", config.tray.icon_path, e);
            Ok(())
        }
        (Some(Ok(template)), None) => tray.set_template_icon(&template, &template),
        _ => Ok(()),
    };

    if let Err(e) = result {
        warn!("Failed to set tray icon: {}", e);
    }
}

/// Build the demo menu and spawn the task reacting to it.
///
/// Runs on the ready thread once the native tray is up.
fn build_menu(
    tray: Tray,
    notifier: Arc<dyn Notifier>,
    runtime: Handle,
    app_name: String,
) -> traylink::Result<()> {
    let about = tray.add_menu_item(&format!("{} demo", app_name), "")?;
    about.disable();
    tray.add_separator()?;

    let notify = tray.add_menu_item("Show Notification", "Send a desktop notification")?;
    let quiet = tray.add_menu_item_checkbox("Quiet Mode", "Suppress notifications", false)?;

    let more = tray.add_menu_item("More", "")?;
    let hide_quiet = more.add_sub_menu_item("Hide Quiet Mode", "")?;
    let show_quiet = more.add_sub_menu_item("Show Quiet Mode", "")?;
    more.add_separator()?;
    let rename = more.add_sub_menu_item("Rename Tray", "")?;

    tray.add_separator()?;
    let quit = tray.add_menu_item("Quit", "Exit traylink")?;

    let (
        Some(mut notify_rx),
        Some(mut quiet_rx),
        Some(mut hide_rx),
        Some(mut show_rx),
        Some(mut rename_rx),
        Some(mut quit_rx),
    ) = (
        notify.clicked(),
        quiet.clicked(),
        hide_quiet.clicked(),
        show_quiet.clicked(),
        rename.clicked(),
        quit.clicked(),
    )
    else {
        error!("Menu click channels already taken");
        return Ok(());
    };
    let mut opened_rx = tray.tray_opened();

    runtime.spawn(async move {
        let mut renamed = false;
        loop {
            tokio::select! {
                Some(()) = notify_rx.recv() => {
                    send_notification(&notifier, &quiet, &app_name).await;
                }
                Some(()) = quiet_rx.recv() => {
                    toggle(&quiet);
                }
                Some(()) = hide_rx.recv() => quiet.hide(),
                Some(()) = show_rx.recv() => quiet.show(),
                Some(()) = rename_rx.recv() => {
                    renamed = !renamed;
                    let title = if renamed { "traylink (renamed)" } else { app_name.as_str() };
                    tray.set_title(title);
                }
                Some(()) = recv_opened(&mut opened_rx) => debug!("Tray menu opened"),
                Some(()) = quit_rx.recv() => {
                    info!("Quit requested via tray");
                    tray.quit();
                    break;
                }
                else => break,
            }
        }
    });

    Ok(())
}

async fn recv_opened(rx: &mut Option<tokio::sync::mpsc::Receiver<()>>) -> Option<()> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

fn toggle(item: &MenuItemHandle) {
    if item.is_checked() {
        item.uncheck();
    } else {
        item.check();
    }
    let state = if item.is_checked() { "on" } else { "off" };
    info!("{} is now {}", item.title(), state);
}

async fn send_notification(
    notifier: &Arc<dyn Notifier>,
    quiet: &MenuItemHandle,
    app_name: &str,
) {
    if quiet.is_checked() {
        debug!("Quiet mode on, notification skipped");
        return;
    }

    let notifier = notifier.clone();
    let notification = Notification::new(
        app_name,
        "Hello from the tray",
        "Notifications are working.",
    );
    // Subprocess and bus calls block
    if let Err(e) = tokio::task::spawn_blocking(move || notifier.show(&notification)).await {
        error!("Notification task failed: {}", e);
    }
}

fn print_help() {
    println!("traylink - system tray demo");
    println!();
    println!("USAGE:");
    println!("    traylink [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help           Print this help message");
    println!("    -c, --config <PATH>  Use this config file instead of the default");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG             Set log level (e.g., debug, info, warn)");
    println!("    TRAYLINK_LOG_PATH    Write log files to this directory");
}
