//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Porta configuration file.

use crate::adapters::jobstore::postgres::redact_connection_string;
use crate::config::load_config;
use crate::config::schema::JobStoreBackend;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// `load_config` validates as part of loading, so any failure here is a
    /// configuration error.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Worker ID: {}",
            config.worker.worker_id.as_deref().unwrap_or("(generated)")
        );
        println!("  Poll Interval: {}ms", config.worker.poll_interval_ms);
        println!(
            "  Max Jobs: {}",
            match config.worker.max_jobs {
                0 => "unlimited".to_string(),
                n => n.to_string(),
            }
        );
        println!("  Max Export Pages: {}", config.transfer.max_export_pages);
        println!(
            "  Max Job Duration: {}s",
            config.transfer.max_job_duration_secs
        );

        match config.job_store.backend {
            JobStoreBackend::Memory => println!("  Job Store: in-memory"),
            JobStoreBackend::PostgreSQL => {
                println!("  Job Store: PostgreSQL");
                if let Some(ref pg_config) = config.postgresql {
                    println!(
                        "  PostgreSQL Connection: {}",
                        redact_connection_string(pg_config.connection_string.expose_secret().as_ref())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }
        println!(
            "  Stream Directory: {}",
            config.job_store.stream_dir.display()
        );
        println!("  Credential Encryption: {}", config.crypto.transformation);

        if let Some(ref generic) = config.generic {
            println!(
                "  Generic Importer: {} -> {}",
                generic.service_name, generic.base_url
            );
        }
        println!();
        Ok(0)
    }
}
