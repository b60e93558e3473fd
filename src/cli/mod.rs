//! # SMBCTL CLI
//!
//! Command-line interface for the Service Manager Bridge.
//!
//! Resolves a broker tenant from its credential secret and runs one broker or
//! binding operation against it. Results are printed as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Browse the catalog of the default tenant
//! smbctl offerings
//! smbctl offering 2c4f2a4b-...
//!
//! # Use another tenant's credential secret
//! smbctl --sm-secret-name team-a-sm --sm-secret-namespace team-a instances
//!
//! # Create a binding and write its credentials to a secret
//! smbctl create-binding --name my-binding --instance-id a7e240d6-... \
//!     --secret-name my-binding-creds --secret-namespace apps
//!
//! # Re-create a lost credential secret
//! smbctl restore-binding 318a16c3-... --secret-name my-binding-creds --secret-namespace apps
//!
//! # Delete a binding and its secrets
//! smbctl delete-binding 318a16c3-...
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use k8s_openapi::api::core::v1::Secret;
use kube::Client;
use serde::Serialize;
use tracing::{debug, info};

use service_manager_bridge::auth::{AuthManager, BrokerSession};
use service_manager_bridge::bindings::BindingManager;
use service_manager_bridge::broker::{BrokerClient, ServiceBroker, WriteOutcome};
use service_manager_bridge::cluster::{CredentialStore, KubeObjectProvider, ObjectProvider};
use service_manager_bridge::config::BridgeConfig;
use service_manager_bridge::observability::{init_tracing, metrics};

mod bindings;
mod catalog;

/// Service Manager Bridge CLI
#[derive(Parser)]
#[command(name = "smbctl")]
#[command(
    about = "Service Manager Bridge CLI",
    long_about = None,
    after_help = "\
Examples:
  smbctl offerings
  smbctl instance a7e240d6-e348-4fc0-a54c-7b7bfe9b9da6
  smbctl bindings --instance-id a7e240d6-e348-4fc0-a54c-7b7bfe9b9da6
  smbctl delete-binding 318a16c3-7c80-485f-b55c-918629012c9a
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Name of the tenant credential secret (defaults to SM_SECRET_NAME)
    #[arg(long, global = true, requires = "sm_secret_namespace")]
    sm_secret_name: Option<String>,

    /// Namespace of the tenant credential secret (defaults to SM_SECRET_NAMESPACE)
    #[arg(long, global = true, requires = "sm_secret_name")]
    sm_secret_namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List service offerings
    Offerings,
    /// Show one service offering with its plans
    Offering {
        #[arg(value_name = "OFFERING_ID")]
        id: String,
    },
    /// List service instances
    Instances,
    /// Show one service instance with its plan name
    Instance {
        #[arg(value_name = "INSTANCE_ID")]
        id: String,

        /// Print the instance parameters instead
        #[arg(long)]
        parameters: bool,
    },
    /// List service bindings with the secrets holding their credentials
    Bindings {
        /// Only bindings of this service instance
        #[arg(long)]
        instance_id: Option<String>,
    },
    /// Create a service binding and store its credentials in a secret
    #[command(name = "create-binding")]
    CreateBinding {
        /// Binding name
        #[arg(long)]
        name: String,

        /// Service instance to bind
        #[arg(long)]
        instance_id: String,

        /// Binding parameters as a JSON object
        #[arg(long)]
        parameters: Option<String>,

        /// Target secret name (defaults to <binding-id>-secret)
        #[arg(long)]
        secret_name: Option<String>,

        /// Target secret namespace (defaults to DEFAULT_BINDING_SECRET_NAMESPACE)
        #[arg(long)]
        secret_namespace: Option<String>,
    },
    /// Re-create the credential secret of an existing binding
    #[command(name = "restore-binding")]
    RestoreBinding {
        #[arg(value_name = "BINDING_ID")]
        id: String,

        #[arg(long)]
        secret_name: Option<String>,

        #[arg(long)]
        secret_namespace: Option<String>,
    },
    /// Delete a service binding and every secret holding its credentials
    #[command(name = "delete-binding")]
    DeleteBinding {
        #[arg(value_name = "BINDING_ID")]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before anything touches rustls
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let config = BridgeConfig::from_env();
    init_tracing(&config.log_level, &config.log_format);
    debug!(
        "smbctl build {} ({})",
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    if config.enable_metrics {
        metrics::register_metrics().context("Failed to register metrics")?;
    }

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    let secrets: Arc<dyn ObjectProvider<Secret>> =
        Arc::new(KubeObjectProvider::<Secret>::new(client));

    let session = resolve_session(&cli, &config, Arc::clone(&secrets)).await?;
    let broker: Arc<dyn ServiceBroker> = Arc::new(BrokerClient::new(session));
    let bindings = BindingManager::new(
        Arc::clone(&broker),
        CredentialStore::new(secrets),
        config.default_binding_secret_namespace.clone(),
    );

    match cli.command {
        Commands::Offerings => catalog::offerings_command(broker.as_ref()).await,
        Commands::Offering { id } => catalog::offering_command(broker.as_ref(), &id).await,
        Commands::Instances => catalog::instances_command(broker.as_ref()).await,
        Commands::Instance { id, parameters } => {
            catalog::instance_command(broker.as_ref(), &id, parameters).await
        }
        Commands::Bindings { instance_id } => {
            bindings::list_command(&bindings, instance_id.as_deref()).await
        }
        Commands::CreateBinding {
            name,
            instance_id,
            parameters,
            secret_name,
            secret_namespace,
        } => {
            bindings::create_command(
                &bindings,
                name,
                instance_id,
                parameters.as_deref(),
                secret_name,
                secret_namespace,
            )
            .await
        }
        Commands::RestoreBinding {
            id,
            secret_name,
            secret_namespace,
        } => {
            bindings::restore_command(
                &bindings,
                &id,
                secret_name.as_deref(),
                secret_namespace.as_deref(),
            )
            .await
        }
        Commands::DeleteBinding { id } => bindings::delete_command(&bindings, &id).await,
    }
}

/// Explicitly named tenants must exist; the default tenant may be absent
async fn resolve_session(
    cli: &Cli,
    config: &BridgeConfig,
    secrets: Arc<dyn ObjectProvider<Secret>>,
) -> Result<BrokerSession> {
    let auth = AuthManager::new(secrets, config);

    if let (Some(name), Some(namespace)) = (&cli.sm_secret_name, &cli.sm_secret_namespace) {
        info!("Using tenant credential secret {}/{}", namespace, name);
        return auth
            .resolve(name, namespace)
            .await
            .with_context(|| format!("Failed to resolve tenant from secret {namespace}/{name}"));
    }

    auth.resolve_default()
        .await
        .context("Failed to resolve default tenant")?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No broker tenant configured: secret {}/{} not found.\n\
                Create it or pass --sm-secret-name and --sm-secret-namespace.",
                config.sm_secret_namespace,
                config.sm_secret_name
            )
        })
}

/// Print a result as pretty JSON
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{rendered}");
    Ok(())
}

/// Print a write result; accepted operations have no resource to show
fn print_outcome<T: Serialize>(outcome: &WriteOutcome<T>) -> Result<()> {
    match outcome {
        WriteOutcome::Completed(value) => print_json(value),
        WriteOutcome::Accepted => print_json(&serde_json::json!({ "status": "accepted" })),
    }
}
