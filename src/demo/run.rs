use std::{net::SocketAddr, thread, time::Duration};

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    account::Profile,
    api::{self, client::ExecutorClient, ClearExecutor},
    demo::client::PortalClient,
    host::Host,
    records::message::{MessageDraft, MessageKind, Mood, Priority},
    states::clear::{self, ClearEvent, Decision, Prompt, ReceiverOutcome, RequesterOutcome},
    store::MemoryStore,
};

#[derive(Parser)]
#[command(author, version, about = "run the mutual-consent clear protocol end to end", long_about = None)]
#[group()]
pub struct DemoArgs {
    /// deny the clear request instead of accepting it
    #[arg(long)]
    pub deny: bool,

    /// pair a single account with itself instead of two partners
    #[arg(long = "self-paired")]
    pub self_paired: bool,

    /// note attached to the clear request
    #[arg(long, default_value = "fresh start?")]
    pub note: String,

    /// response note from the partner
    #[arg(long, default_value = "ok, wiping it")]
    pub response: String,

    /// messages seeded in each direction before clearing
    #[arg(short, long, default_value = "3")]
    pub messages: usize,

    /// route the deletion through a local instance of the HTTP endpoint
    #[arg(long)]
    pub http: bool,

    /// bind address used with --http
    #[arg(long, default_value = "127.0.0.1:8099")]
    pub host: Host,
}

pub fn run_demo(args: DemoArgs) -> Result<()> {
    let store = MemoryStore::new();

    let (requester, responder) = if args.self_paired {
        let morgan = store.register(
            Profile::new("morgan@example.com")
                .with_username("morgan")
                .with_partner_email("morgan@example.com"),
        );
        (morgan.clone(), morgan)
    } else {
        let ana = store.register(
            Profile::new("ana@example.com")
                .with_username("ana")
                .with_partner_email("bo@example.com"),
        );
        let bo = store.register(
            Profile::new("bo@example.com")
                .with_username("bo")
                .with_partner_email("ana@example.com"),
        );
        (ana, bo)
    };

    let requester_client = PortalClient::new(store.clone(), requester.clone());
    let responder_client = PortalClient::new(store.clone(), responder.clone());

    seed_conversation(&requester_client, &responder_client, args.messages)?;
    let before = store.conversation_len(requester.id, responder.id)?;
    log::info!("seeded conversation holds {} messages", before);

    // composing a new request is only legal from the idle prompt
    match clear::reconcile(&store, requester.id)? {
        Prompt::Compose => {}
        prompt => bail!("cannot open a clear request, another step is active: {:?}", prompt),
    }

    let executor = if args.http {
        let server_store = store.clone();
        let server_host = args.host.clone();
        thread::spawn(move || {
            if let Err(e) = api::serve_store(server_store, server_host) {
                log::error!("endpoint thread failed: {}", e);
            }
        });
        wait_until_reachable(&args.host)?;
        ClearExecutor::Remote {
            client: ExecutorClient::new(&args.host.http_base(), requester.id)?,
        }
    } else {
        ClearExecutor::Local {
            store: store.clone(),
            caller: requester.id,
        }
    };

    let decision = Decision {
        accept: !args.deny,
        note: Some(args.response.clone()),
    };
    let responder_session = thread::spawn(move || responder_client.run_receiver(decision));

    let outcome = requester_client.run_requester(
        Some(args.note.clone()),
        executor,
        vec![ClearEvent::ConfirmClear],
    )?;

    let response = responder_session
        .join()
        .map_err(|_| anyhow::Error::msg("responder session panicked"))??;

    let after = store.conversation_len(requester.id, responder.id)?;
    summarize(&requester, &responder, &outcome, &response, before, after)?;
    Ok(())
}

fn seed_conversation(
    requester: &PortalClient,
    responder: &PortalClient,
    count: usize,
) -> Result<()> {
    let kinds = [
        MessageKind::Grievance,
        MessageKind::Compliment,
        MessageKind::GoodMemory,
        MessageKind::HowIFeel,
    ];
    for i in 0..count {
        requester.compose(
            MessageDraft::new(responder.id(), format!("note {i}"))
                .with_kind(kinds[i % kinds.len()])
                .with_priority(Priority::Low)
                .with_mood(Mood::Neutral),
        )?;
    }
    // the self-paired conversation has a single direction
    if requester.id() != responder.id() {
        for i in 0..count {
            responder.compose(
                MessageDraft::new(requester.id(), format!("reply {i}"))
                    .with_kind(kinds[(i + 1) % kinds.len()])
                    .with_mood(Mood::Grateful),
            )?;
        }
    }
    Ok(())
}

fn wait_until_reachable(host: &Host) -> Result<()> {
    let address = SocketAddr::from(host);
    for _ in 0..50 {
        if std::net::TcpStream::connect_timeout(&address, Duration::from_millis(100)).is_ok() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(100));
    }
    bail!("privileged endpoint at {} did not come up", host)
}

fn summarize(
    requester: &Profile,
    responder: &Profile,
    outcome: &RequesterOutcome,
    response: &ReceiverOutcome,
    before: usize,
    after: usize,
) -> Result<()> {
    let ReceiverOutcome::Responded { accepted } = response;
    println!(
        "{} answered the request from {}: {}",
        responder.display_name(),
        requester.display_name(),
        if *accepted {
            "accepted".green()
        } else {
            "denied".red()
        }
    );

    match outcome {
        RequesterOutcome::Cleared { deleted } => {
            println!(
                "{} ({} deleted, {} -> {} messages)",
                "conversation cleared".green(),
                deleted,
                before,
                after
            );
            if *deleted != before || after != 0 {
                bail!(
                    "deletion accounting is off: {} before, {} reported, {} left",
                    before,
                    deleted,
                    after
                );
            }
        }
        RequesterOutcome::Denied { note } => {
            println!(
                "{}: \"{}\"",
                "request denied".red(),
                note.as_deref().unwrap_or("no message provided")
            );
            if after != before {
                bail!("denial must leave the conversation intact");
            }
        }
        RequesterOutcome::Rejected { reason } => {
            bail!("privileged executor rejected the request: {}", reason)
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DemoArgs {
        DemoArgs {
            deny: false,
            self_paired: false,
            note: "fresh start?".to_owned(),
            response: "ok".to_owned(),
            messages: 3,
            http: false,
            host: "127.0.0.1:8099".parse().unwrap(),
        }
    }

    #[test]
    fn accept_flow_clears_the_conversation() -> Result<()> {
        run_demo(args())
    }

    #[test]
    fn deny_flow_keeps_the_conversation() -> Result<()> {
        run_demo(DemoArgs {
            deny: true,
            ..args()
        })
    }

    #[test]
    fn self_paired_flow_clears_the_single_direction() -> Result<()> {
        run_demo(DemoArgs {
            self_paired: true,
            ..args()
        })
    }
}
