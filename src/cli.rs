//! Command-line interface
//!
//! The CLI is the administrative surface: everything the original
//! settings screen did (configure the instance, authorize, revoke,
//! reset) plus one-shot and daemon modes for the pipeline itself.

use clap::{Parser, Subcommand};

use crate::AppState;
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "fedimirror", version, about = "Mirror a Mastodon timeline into a local content store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the daemon: scheduled imports plus token-health checks
    Run,
    /// Run one import pass and exit
    Sync,
    /// Set or replace the remote instance URL and register the app
    Configure {
        /// Instance URL, e.g. "example.social"; https:// is assumed
        instance_url: String,
    },
    /// Print the authorization URL, or exchange an authorization code
    Authorize {
        /// Authorization code shown by the instance; omit to print the
        /// URL to obtain one
        code: Option<String>,
    },
    /// Revoke access and forget the token
    Revoke,
    /// Reset all stored credentials and the cursor (local only)
    Reset,
    /// Show credential state, cursor, and store counts
    Status,
}

/// Execute a one-shot command. `Run` is handled by the binary's
/// scheduler loop, not here.
pub async fn execute(command: &Command, state: &AppState) -> Result<()> {
    match command {
        Command::Run => unreachable!("Run is dispatched by main"),

        Command::Sync => {
            let outcome = state.importer.sync().await?;
            println!(
                "Fetched {}, imported {}, skipped {} (media: {} stored, {} failed)",
                outcome.fetched,
                outcome.imported,
                outcome.skipped,
                outcome.media_stored,
                outcome.media_failed
            );
        }

        Command::Configure { instance_url } => {
            state.credentials.configure(instance_url).await?;

            // Registration is retried on any later configure/authorize
            // run, so a failure here is not fatal.
            match state.credentials.register_app().await {
                Ok(()) => {
                    println!("Instance configured and app registered.");
                    println!("Next, authorize access:\n  {}", state.credentials.authorize_url().await?);
                }
                Err(error) => {
                    println!("Instance configured, but app registration failed: {error}");
                    println!("Run `fedimirror configure` again to retry.");
                }
            }
        }

        Command::Authorize { code } => match code {
            None => {
                state.credentials.register_app().await?;
                println!("Visit this URL, authorize access, then run `fedimirror authorize <code>`:");
                println!("  {}", state.credentials.authorize_url().await?);
            }
            Some(code) => {
                state.credentials.exchange_code(code).await?;
                println!("Access granted.");
            }
        },

        Command::Revoke => {
            let remote_ok = state.credentials.revoke().await?;
            if remote_ok {
                println!("Access revoked.");
            } else {
                println!(
                    "Token forgotten locally, but the instance did not confirm revocation; \
                     you can still revoke it under your account's authorized apps."
                );
            }
        }

        Command::Reset => {
            state.credentials.reset().await?;
            println!(
                "Settings reset. Note: previously issued tokens stay valid on the instance \
                 until revoked there."
            );
        }

        Command::Status => {
            let credential = state.credentials.current().await?;
            println!("State:     {}", credential.state().as_str());
            println!(
                "Instance:  {}",
                if credential.instance_url.is_empty() {
                    "(not configured)"
                } else {
                    &credential.instance_url
                }
            );
            println!(
                "Cursor:    {}",
                credential.latest_remote_id.as_deref().unwrap_or("(none)")
            );
            println!("Entries:   {}", state.db.count_entries().await?);
            println!("Media:     {}", state.db.count_media().await?);
        }
    }

    Ok(())
}
