//! node-reaper - Kubernetes node decommission service
//!
//! This is the main entry point for the service. It receives termination
//! notifications over HTTP and removes the matching nodes from the cluster.

use std::sync::Arc;

use node_reaper_cluster::{ClusterConfig, KubeClusterControl};
use node_reaper_credentials::HttpSecretProvider;
use node_reaper_inventory::HttpInventoryResolver;
use node_reaper_workflow::{
    create_router, AppState, DecommissionWorkflow, ServiceConfig, WorkflowConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,node_reaper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting node-reaper");

    // Load configuration from environment
    let service = ServiceConfig::from_env()?;
    let workflow_config = WorkflowConfig::from_env()?;
    let cluster_config = ClusterConfig::from_env();
    tracing::debug!(
        service = ?service,
        workflow = ?workflow_config,
        cluster = ?cluster_config,
        "Loaded configuration"
    );

    // Initialize collaborators
    let inventory = Arc::new(HttpInventoryResolver::new(&service.inventory_config())?);
    let credentials = Arc::new(HttpSecretProvider::new(&service.credential_config())?);
    let cluster = Arc::new(KubeClusterControl::new(cluster_config));

    let workflow = Arc::new(DecommissionWorkflow::new(
        inventory,
        credentials,
        cluster,
        workflow_config,
    ));

    // Create router
    let app = create_router(AppState::new(workflow, service.max_body_bytes));

    // Start server
    tracing::info!(listen_addr = %service.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&service.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
