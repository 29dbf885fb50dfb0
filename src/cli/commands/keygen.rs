//! Keygen command implementation
//!
//! Prints fresh key material for the `[crypto]` section.

use crate::crypto::{generate_key_pair, generate_symmetric_key, CryptoTransformation};
use clap::Args;

/// Arguments for the keygen command
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Generate an X25519 key pair instead of a shared AES-256-GCM key
    #[arg(long)]
    pub asymmetric: bool,
}

impl KeygenArgs {
    /// Execute the keygen command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        if self.asymmetric {
            let pair = generate_key_pair();
            println!("# Worker configuration (keep private)");
            println!("[crypto]");
            println!("transformation = \"{}\"", CryptoTransformation::X25519);
            println!("key = \"{}\"", pair.private_key_encoded());
            println!();
            println!("# Public key, advertised on claim and used to seal credentials");
            println!("# {}", pair.public_key_encoded());
        } else {
            let key = generate_symmetric_key();
            println!("[crypto]");
            println!("transformation = \"{}\"", CryptoTransformation::Aes256Gcm);
            println!("key = \"{}\"", key.to_encoded());
        }

        tracing::debug!(asymmetric = self.asymmetric, "Generated key material");
        Ok(0)
    }
}
