//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use inkvault_core::{AccessPolicy, Account, DeletedRecordAccess};
use inkvault_crypto::DEFAULT_ITERATIONS;
use inkvault_ledger::{DEFAULT_MAX_CIPHERTEXT_LEN, LedgerConfig};

/// Encrypted personal journal
#[derive(Parser, Debug)]
#[command(name = "inkvault")]
#[command(about = "Encrypted personal journal on a local ledger")]
#[command(version)]
pub struct Args {
    /// Path to the ledger database
    #[arg(long, default_value = "inkvault.redb")]
    pub db: PathBuf,

    /// Account to act as (0x-prefixed, 20 bytes hex)
    #[arg(long = "as", value_name = "ACCOUNT")]
    pub account: Account,

    /// Journal password
    #[arg(long, env = "INKVAULT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// PBKDF2 iterations for entries written in this session
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Largest accepted envelope, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_CIPHERTEXT_LEN)]
    pub max_ciphertext_len: usize,

    /// Who may read a deleted entry
    #[arg(long, value_enum, default_value_t = DeletedRecords::RetainDelegates)]
    pub deleted_records: DeletedRecords,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Ledger configuration with command-line overrides applied.
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            max_ciphertext_len: self.max_ciphertext_len,
            access: AccessPolicy { deleted_records: self.deleted_records.into() },
            ..LedgerConfig::default()
        }
    }
}

/// Read access to deleted entries.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletedRecords {
    /// Delegates keep reading deleted entries
    RetainDelegates,
    /// Only the owner reads deleted entries
    OwnerOnly,
}

impl From<DeletedRecords> for DeletedRecordAccess {
    fn from(value: DeletedRecords) -> Self {
        match value {
            DeletedRecords::RetainDelegates => Self::RetainDelegates,
            DeletedRecords::OwnerOnly => Self::OwnerOnly,
        }
    }
}

/// Journal operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write a new entry
    Add {
        /// Entry text (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List entries, newest first
    List {
        /// Oldest first instead
        #[arg(long)]
        oldest_first: bool,

        /// Include deleted entries
        #[arg(long)]
        include_deleted: bool,
    },

    /// Show one entry
    Show {
        /// Entry index
        index: u64,

        /// Journal owner, when reading as a delegate
        #[arg(long)]
        owner: Option<Account>,

        /// Print the stored envelope and metadata without decrypting
        #[arg(long)]
        raw: bool,
    },

    /// Replace an entry's text
    Edit {
        /// Entry index
        index: u64,

        /// New text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Version the edit is based on; defaults to the current one
        #[arg(long)]
        expected_version: Option<u64>,
    },

    /// Delete an entry
    Delete {
        /// Entry index
        index: u64,
    },

    /// Let another account read an entry
    Grant {
        /// Entry index
        index: u64,

        /// Account to grant
        delegate: Account,
    },

    /// Withdraw another account's read access
    Revoke {
        /// Entry index
        index: u64,

        /// Account to revoke
        delegate: Account,
    },

    /// Accounts that may read an entry
    Delegates {
        /// Entry index
        index: u64,

        /// Journal owner; defaults to `--as`
        #[arg(long)]
        owner: Option<Account>,
    },

    /// Number of entries ever written
    Count {
        /// Journal owner; defaults to `--as`
        #[arg(long)]
        owner: Option<Account>,
    },

    /// Creation events from the ledger log
    Events {
        /// First event sequence number to return
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// Maximum number of events
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Only events in this owner's journal
        #[arg(long)]
        owner: Option<Account>,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";
    const BOB: &str = "0x00000000000000000000000000000000000000b0";

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_edit_with_expected_version() {
        let args = Args::try_parse_from([
            "inkvault",
            "--as",
            ALICE,
            "edit",
            "3",
            "--expected-version",
            "2",
            "new",
            "text",
        ])
        .unwrap();

        assert_eq!(
            args.command,
            Command::Edit {
                index: 3,
                text: vec!["new".to_string(), "text".to_string()],
                expected_version: Some(2),
            }
        );
    }

    #[test]
    fn rejects_malformed_account() {
        assert!(Args::try_parse_from(["inkvault", "--as", "alice", "count"]).is_err());
    }

    #[test]
    fn overrides_reach_ledger_config() {
        let args = Args::try_parse_from([
            "inkvault",
            "--as",
            ALICE,
            "--max-ciphertext-len",
            "512",
            "--deleted-records",
            "owner-only",
            "count",
        ])
        .unwrap();

        let config = args.ledger_config();
        assert_eq!(config.max_ciphertext_len, 512);
        assert_eq!(config.access.deleted_records, DeletedRecordAccess::OwnerOnly);
    }

    #[test]
    fn parses_raw_show_for_another_owner() {
        let args =
            Args::try_parse_from(["inkvault", "--as", ALICE, "show", "2", "--raw", "--owner", BOB])
                .unwrap();

        assert_eq!(
            args.command,
            Command::Show { index: 2, owner: Some(BOB.parse().unwrap()), raw: true }
        );
    }
}
