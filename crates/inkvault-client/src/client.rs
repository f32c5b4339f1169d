//! Journal client over a [`LedgerApi`].

use inkvault_core::{Account, ContentHash, Environment, RecordView, StoreError, Timestamp};
use inkvault_ledger::{Call, CallOutput, Receipt};

use crate::{api::LedgerApi, error::ClientError, keyring::Keyring};

/// A decrypted journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Account that wrote the entry
    pub owner: Account,
    /// Position in the owner's journal
    pub index: u64,
    /// Decrypted text
    pub text: String,
    /// Version the text was read at
    pub version: u64,
    /// Ledger time of creation
    pub timestamp: Timestamp,
    /// Hash of the stored envelope
    pub content_hash: ContentHash,
    /// Whether the owner deleted the entry
    pub deleted: bool,
}

/// One slot of a journal listing.
///
/// A listing never fails because of a single envelope: entries that do not
/// open under this keyring come back [`Listed::Locked`] next to the ones that
/// do.
#[derive(Debug)]
pub enum Listed {
    /// Envelope opened under this keyring
    Open(Entry),
    /// Envelope did not open; the stored record is returned as-is
    Locked {
        /// Stored record, ciphertext untouched
        view: RecordView,
        /// Why the envelope stayed shut
        reason: ClientError,
    },
}

impl Listed {
    /// Position in the owner's journal.
    pub fn index(&self) -> u64 {
        match self {
            Self::Open(entry) => entry.index,
            Self::Locked { view, .. } => view.index,
        }
    }

    /// Whether the owner deleted the entry.
    pub fn is_deleted(&self) -> bool {
        match self {
            Self::Open(entry) => entry.deleted,
            Self::Locked { view, .. } => view.deleted,
        }
    }

    /// The decrypted entry, unless locked.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Self::Open(entry) => Some(entry),
            Self::Locked { .. } => None,
        }
    }
}

/// Listing order for [`JournalClient::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryOrder {
    /// Index order
    OldestFirst,
    /// Reverse index order
    #[default]
    NewestFirst,
}

/// One account's view of its journal.
///
/// Text is sealed with the session [`Keyring`] before it is submitted and
/// opened after it is read. Edits are optimistic: they carry the version the
/// caller last saw, and a concurrent change comes back as
/// [`ClientError::Conflict`] rather than being overwritten.
pub struct JournalClient<L: LedgerApi, E: Environment> {
    ledger: L,
    account: Account,
    keyring: Keyring<E>,
}

impl<L: LedgerApi, E: Environment> JournalClient<L, E> {
    /// Client acting as `account`.
    pub fn new(ledger: L, account: Account, keyring: Keyring<E>) -> Self {
        Self { ledger, account, keyring }
    }

    /// Account this client acts as.
    pub fn account(&self) -> Account {
        self.account
    }

    /// Underlying ledger handle.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Encrypt and store a new entry, returning its index.
    ///
    /// Surrounding whitespace is trimmed first.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: text is empty after trimming
    /// - `Store`: the ledger rejected the record (e.g. too large)
    /// - `Ledger`: no outcome (backpressure, timeout, shutdown)
    pub async fn add_entry(&mut self, text: &str) -> Result<u64, ClientError> {
        let sealed = self.seal(text)?;
        let receipt = self.ledger.execute(self.account, Call::Create { ciphertext: sealed }).await?;

        match outcome(receipt)? {
            CallOutput::Created { index } => {
                tracing::info!(account = %self.account, index, "entry added");
                Ok(index)
            },
            other => Err(unexpected(&other)),
        }
    }

    /// Read every entry of this account, opening each one it can.
    ///
    /// Deleted entries are included with `deleted` set; filtering is up to
    /// the caller. An entry whose envelope does not open (written under
    /// another password, or not an envelope at all) is listed as
    /// [`Listed::Locked`].
    ///
    /// # Errors
    ///
    /// Only when the ledger read itself fails.
    pub async fn entries(&mut self, order: EntryOrder) -> Result<Vec<Listed>, ClientError> {
        let views = self.ledger.read_all(self.account, self.account).await?;

        let mut entries: Vec<Listed> = views
            .into_iter()
            .map(|view| match self.open_view(&view) {
                Ok(entry) => Listed::Open(entry),
                Err(reason) => {
                    tracing::debug!(
                        account = %self.account,
                        index = view.index,
                        error = %reason,
                        "entry locked"
                    );
                    Listed::Locked { view, reason }
                },
            })
            .collect();
        if order == EntryOrder::NewestFirst {
            entries.reverse();
        }

        Ok(entries)
    }

    /// Read and decrypt one entry of `owner`.
    ///
    /// Reading another account's entry needs a delegate grant from it, and
    /// this keyring must have been unlocked with that journal's password.
    pub async fn read_entry(&mut self, owner: Account, index: u64) -> Result<Entry, ClientError> {
        let view = self.ledger.read(self.account, owner, index).await?;
        self.open_view(&view)
    }

    /// Number of entries ever created by this account.
    pub async fn count(&self) -> Result<u64, ClientError> {
        Ok(self.ledger.record_count(self.account).await?)
    }

    /// Replace the text of entry `index`, based on its current version.
    ///
    /// Reads the entry first; a change landing between that read and the
    /// update is reported as a conflict.
    pub async fn edit_entry(&mut self, index: u64, text: &str) -> Result<u64, ClientError> {
        let current = self.ledger.read(self.account, self.account, index).await?;
        self.edit_entry_from(index, text, current.version).await
    }

    /// Replace the text of entry `index` if it is still at `expected_version`.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `Conflict`: the entry moved past `expected_version`; carries the
    ///   remote entry and the text that was not written
    /// - `Store(NotFound)`: no such entry, or it was deleted
    pub async fn edit_entry_from(
        &mut self,
        index: u64,
        text: &str,
        expected_version: u64,
    ) -> Result<u64, ClientError> {
        let sealed = self.seal(text)?;
        let call = Call::Update { index, ciphertext: sealed, expected_version };
        let receipt = self.ledger.execute(self.account, call).await?;

        match receipt.outcome {
            Ok(CallOutput::Updated { version }) => {
                tracing::info!(account = %self.account, index, version, "entry edited");
                Ok(version)
            },
            Ok(other) => Err(unexpected(&other)),
            Err(StoreError::VersionConflict { actual, .. }) => {
                tracing::warn!(
                    account = %self.account,
                    index,
                    expected_version,
                    actual,
                    "edit conflict"
                );
                let remote = self.read_entry(self.account, index).await?;
                Err(ClientError::Conflict {
                    index,
                    local: text.trim().to_string(),
                    remote: Box::new(remote),
                })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Soft-delete entry `index`.
    pub async fn delete_entry(&mut self, index: u64) -> Result<(), ClientError> {
        let receipt = self.ledger.execute(self.account, Call::Delete { index }).await?;

        match outcome(receipt)? {
            CallOutput::Deleted => {
                tracing::info!(account = %self.account, index, "entry deleted");
                Ok(())
            },
            other => Err(unexpected(&other)),
        }
    }

    /// Let `delegate` read entry `index`. Returns whether the grant is new.
    pub async fn grant(&mut self, index: u64, delegate: Account) -> Result<bool, ClientError> {
        let receipt =
            self.ledger.execute(self.account, Call::GrantDelegate { index, delegate }).await?;

        match outcome(receipt)? {
            CallOutput::DelegateGranted { changed } => Ok(changed),
            other => Err(unexpected(&other)),
        }
    }

    /// Withdraw `delegate`'s read access to entry `index`.
    pub async fn revoke(&mut self, index: u64, delegate: Account) -> Result<bool, ClientError> {
        let receipt =
            self.ledger.execute(self.account, Call::RevokeDelegate { index, delegate }).await?;

        match outcome(receipt)? {
            CallOutput::DelegateRevoked { changed } => Ok(changed),
            other => Err(unexpected(&other)),
        }
    }

    fn seal(&self, text: &str) -> Result<Vec<u8>, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::InvalidInput("entry text must not be empty".to_string()));
        }
        Ok(self.keyring.encrypt(text.as_bytes()).into_bytes())
    }

    fn open_view(&mut self, view: &RecordView) -> Result<Entry, ClientError> {
        let envelope = std::str::from_utf8(&view.ciphertext)
            .map_err(|e| ClientError::Encoding(format!("stored envelope is not UTF-8: {e}")))?;
        let plaintext = self.keyring.decrypt(envelope)?;
        let text = String::from_utf8(plaintext)
            .map_err(|e| ClientError::Encoding(format!("entry text is not UTF-8: {e}")))?;

        Ok(Entry {
            owner: view.owner,
            index: view.index,
            text,
            version: view.version,
            timestamp: view.timestamp,
            content_hash: view.content_hash,
            deleted: view.deleted,
        })
    }
}

fn outcome(receipt: Receipt) -> Result<CallOutput, ClientError> {
    receipt.outcome.map_err(ClientError::Store)
}

fn unexpected(output: &CallOutput) -> ClientError {
    ClientError::UnexpectedOutput(format!("{output:?}"))
}
