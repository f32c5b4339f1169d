//! Command execution against a local ledger.

use std::io::{self, Write};

use inkvault_client::{ClientError, Entry, EntryOrder, JournalClient, Keyring, Listed};
use inkvault_core::{EventCursor, RecordView};
use inkvault_ledger::{
    EventFilter, Ledger, LedgerError, LedgerService, RedbStorage, StorageError, SystemEnv,
};
use thiserror::Error;

use crate::cli::{Args, Command};

type Service = LedgerService<SystemEnv, RedbStorage>;

/// Failures reported to the user.
#[derive(Error, Debug)]
pub enum CliError {
    /// Command needs a password and none was given
    #[error("password required: pass --password or set INKVAULT_PASSWORD")]
    MissingPassword,

    /// Database could not be opened
    #[error("cannot open ledger database: {0}")]
    Storage(#[from] StorageError),

    /// Ledger failed outside a transaction outcome
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Journal operation failed
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Writing output failed
    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

/// Open the ledger at `args.db`, run the command, and shut the ledger down.
pub async fn run(args: Args) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    run_with_output(args, &mut stdout).await
}

/// [`run`] writing results to `out`.
pub async fn run_with_output<W: Write>(args: Args, out: &mut W) -> Result<(), CliError> {
    let config = args.ledger_config();
    let storage = RedbStorage::open(&args.db)?;
    let ledger = Ledger::open(SystemEnv::new(), storage, &config)?;
    let service = LedgerService::start(ledger, &config);

    tracing::debug!(db = %args.db.display(), account = %args.account, "ledger opened");

    let result = dispatch(&args, &service, out).await;
    service.shutdown().await;
    result
}

async fn dispatch<W: Write>(args: &Args, service: &Service, out: &mut W) -> Result<(), CliError> {
    match &args.command {
        Command::Add { text } => {
            let index = session(args, service)?.add_entry(&text.join(" ")).await?;
            writeln!(out, "added entry {index}")?;
        },
        Command::List { oldest_first, include_deleted } => {
            let order =
                if *oldest_first { EntryOrder::OldestFirst } else { EntryOrder::NewestFirst };
            let listed = session(args, service)?.entries(order).await?;
            let mut shown = 0usize;
            for slot in listed.iter().filter(|l| *include_deleted || !l.is_deleted()) {
                write_summary(out, slot)?;
                shown += 1;
            }
            if shown == 0 {
                writeln!(out, "no entries")?;
            }
        },
        Command::Show { index, owner, raw: true } => {
            let view = service.read(args.account, owner.unwrap_or(args.account), *index).await?;
            write_raw(out, &view)?;
        },
        Command::Show { index, owner, raw: false } => {
            let mut client = session(args, service)?;
            let entry = client.read_entry(owner.unwrap_or(args.account), *index).await?;
            write_entry(out, &entry)?;
        },
        Command::Edit { index, text, expected_version } => {
            let mut client = session(args, service)?;
            let text = text.join(" ");
            let version = match expected_version {
                Some(expected) => client.edit_entry_from(*index, &text, *expected).await,
                None => client.edit_entry(*index, &text).await,
            };
            match version {
                Ok(version) => writeln!(out, "entry {index} now at version {version}")?,
                Err(ClientError::Conflict { index, remote, .. }) => {
                    writeln!(out, "conflict: entry {index} changed since you read it")?;
                    write_entry(out, &remote)?;
                    writeln!(out, "retry with --expected-version {}", remote.version)?;
                    return Err(CliError::Client(ClientError::Conflict {
                        index,
                        local: text,
                        remote,
                    }));
                },
                Err(e) => return Err(e.into()),
            }
        },
        Command::Delete { index } => {
            session(args, service)?.delete_entry(*index).await?;
            writeln!(out, "deleted entry {index}")?;
        },
        Command::Grant { index, delegate } => {
            let changed = session(args, service)?.grant(*index, *delegate).await?;
            let note = if changed { "granted" } else { "already granted" };
            writeln!(out, "{note}: {delegate} on entry {index}")?;
        },
        Command::Revoke { index, delegate } => {
            let changed = session(args, service)?.revoke(*index, *delegate).await?;
            let note = if changed { "revoked" } else { "was not a delegate" };
            writeln!(out, "{note}: {delegate} on entry {index}")?;
        },
        Command::Delegates { index, owner } => {
            let owner = owner.unwrap_or(args.account);
            let delegates = service.delegates(args.account, owner, *index).await?;
            for delegate in &delegates {
                writeln!(out, "{delegate}")?;
            }
            if delegates.is_empty() {
                writeln!(out, "no delegates")?;
            }
        },
        Command::Count { owner } => {
            let count = service.record_count(owner.unwrap_or(args.account)).await?;
            writeln!(out, "{count}")?;
        },
        Command::Events { from, limit, owner } => {
            let filter = owner.map_or(EventFilter::All, EventFilter::Owner);
            let (events, next) = service.events_since(EventCursor(*from), filter, *limit).await?;
            for sequenced in &events {
                let event = &sequenced.event;
                writeln!(
                    out,
                    "{:>6}  {}  #{:<4} {}  {}",
                    sequenced.seq, event.owner, event.index, event.timestamp, event.content_hash
                )?;
            }
            writeln!(out, "next cursor: {}", next.0)?;
        },
    }

    Ok(())
}

/// Unlock a journal session for commands that seal or open envelopes.
fn session(args: &Args, service: &Service) -> Result<JournalClient<Service, SystemEnv>, CliError> {
    let password = args.password.as_deref().ok_or(CliError::MissingPassword)?;
    let keyring = Keyring::with_iterations(SystemEnv::new(), password, args.iterations)?;
    Ok(JournalClient::new(service.clone(), args.account, keyring))
}

fn write_summary<W: Write>(out: &mut W, slot: &Listed) -> io::Result<()> {
    let marker = if slot.is_deleted() { " [deleted]" } else { "" };
    match slot {
        Listed::Open(entry) => {
            let first_line = entry.text.lines().next().unwrap_or_default();
            writeln!(
                out,
                "#{:<4} v{:<3} {}{marker}  {first_line}",
                entry.index, entry.version, entry.timestamp
            )
        },
        Listed::Locked { view, .. } => writeln!(
            out,
            "#{:<4} v{:<3} {}{marker}  [locked]",
            view.index, view.version, view.timestamp
        ),
    }
}

fn write_entry<W: Write>(out: &mut W, entry: &Entry) -> io::Result<()> {
    writeln!(out, "entry:   {} #{}", entry.owner, entry.index)?;
    writeln!(out, "version: {}", entry.version)?;
    writeln!(out, "created: {}", entry.timestamp)?;
    if entry.deleted {
        writeln!(out, "status:  deleted")?;
    }
    writeln!(out)?;
    writeln!(out, "{}", entry.text)
}

fn write_raw<W: Write>(out: &mut W, view: &RecordView) -> io::Result<()> {
    writeln!(out, "entry:   {} #{}", view.owner, view.index)?;
    writeln!(out, "version: {}", view.version)?;
    writeln!(out, "created: {}", view.timestamp)?;
    writeln!(out, "hash:    {}", view.content_hash)?;
    writeln!(out, "deleted: {}", view.deleted)?;
    writeln!(out)?;
    writeln!(out, "{}", String::from_utf8_lossy(&view.ciphertext))
}
