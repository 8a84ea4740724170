use std::net::SocketAddr;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use crate::account::AccountId;
use crate::host::Host;
use crate::store::MemoryStore;

pub mod client;
pub mod executor;
pub mod routes;

use client::ExecutorClient;
use executor::{execute_clear, ClearCommand, ClearOutcome};
use routes::AppData;

#[derive(Parser)]
#[command(author, version, about = "host the privileged clear-messages endpoint", long_about = None)]
pub struct ServeArgs {
    /// address to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    host: Host,
}

pub fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    log::info!("store starts empty; run `couplet demo --http` for a populated instance");
    serve_store(store, args.host)
}

/// Hosts the privileged endpoint over `store`. Blocks until shutdown.
pub fn serve_store(store: MemoryStore, host: Host) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let data = web::Data::new(AppData { store });
        log::info!("privileged endpoint listening on {}", host);
        HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(data.clone())
                .configure(routes::configure)
        })
        .bind(SocketAddr::from(&host))?
        .run()
        .await
    })?;
    Ok(())
}

/// Transport the reconfirming step uses to reach the privileged executor.
pub enum ClearExecutor {
    /// In-process invocation against the shared store.
    Local {
        store: MemoryStore,
        caller: AccountId,
    },
    /// Invocation over HTTP with the caller's session attached.
    Remote { client: ExecutorClient },
}

impl ClearExecutor {
    pub fn invoke(&self, command: &ClearCommand) -> anyhow::Result<ClearOutcome> {
        match self {
            ClearExecutor::Local { store, caller } => {
                Ok(execute_clear(store, *caller, command)?)
            }
            ClearExecutor::Remote { client } => {
                let response = client.invoke(command)?;
                if !response.success {
                    anyhow::bail!(response.message);
                }
                Ok(ClearOutcome {
                    deleted: response.deleted_count.unwrap_or_default(),
                })
            }
        }
    }
}
