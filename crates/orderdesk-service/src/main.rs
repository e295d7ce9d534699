//! Main entry point for the OrderDesk service.
//!
//! Loads the configuration, wires the configured storage, notification and
//! refund implementations into an order desk, keeps its live order set
//! current and optionally serves the HTTP API.

use clap::Parser;
use orderdesk_config::Config;
use orderdesk_core::EventBus;
use orderdesk_types::NoticeLevel;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the order desk service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order desk");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.desk.id);

	let desk = Arc::new(factory_registry::build_desk_from_config(config.clone())?);
	let notices = spawn_notice_logger(desk.event_bus());

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			let desk_task = desk.run();
			let api_task = server::start_server(api_config, Arc::clone(&desk));

			tokio::select! {
				result = desk_task => {
					tracing::info!("Order desk finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
			}
		},
		None => {
			tracing::info!("Starting order desk only");
			desk.run().await?;
		},
	}

	notices.abort();
	tracing::info!("Stopped order desk");
	Ok(())
}

/// Logs the operator notice of every desk event.
fn spawn_notice_logger(event_bus: &EventBus) -> JoinHandle<()> {
	let mut receiver = event_bus.subscribe();
	tokio::spawn(async move {
		loop {
			match receiver.recv().await {
				Ok(event) => {
					let Some(notice) = event.notice() else {
						continue;
					};
					match notice.level {
						NoticeLevel::Info | NoticeLevel::Success => {
							tracing::info!(target: "orderdesk::notice", "{}", notice.message)
						},
						NoticeLevel::Warning => {
							tracing::warn!(target: "orderdesk::notice", "{}", notice.message)
						},
						NoticeLevel::Error => {
							tracing::error!(target: "orderdesk::notice", "{}", notice.message)
						},
					}
				},
				Err(RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Notice logger lagged behind");
				},
				Err(RecvError::Closed) => break,
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_default_values() {
		let args = Args::parse_from(["orderdesk"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["orderdesk", "--config", "custom.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_build_desk_from_config_file() {
		let temp_dir = tempdir().expect("Failed to create temp dir");
		let config_path = temp_dir.path().join("desk.toml");
		let storage_path = temp_dir.path().join("data");

		let config_content = format!(
			r#"
[desk]
id = "file-desk"
order_window_hours = 12

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "{}"

[notification]
primary = "log"
[notification.implementations.log]

[payment]
primary = "mock"
[payment.implementations.mock]

[api]
enabled = true
port = 3100
"#,
			storage_path.display()
		);
		std::fs::write(&config_path, config_content).expect("Failed to write config");

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.expect("Failed to load config");
		assert_eq!(config.desk.order_window_hours, 12);
		assert_eq!(config.api.as_ref().map(|api| api.port), Some(3100));

		let desk = factory_registry::build_desk_from_config(config).expect("Failed to build desk");
		assert_eq!(desk.config().desk.id, "file-desk");
		assert_eq!(desk.refresh().await.unwrap(), 0);
	}
}
