//! Actor-based concurrency for the pond
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One task owns the ledger, verifier and journal, so every deposit,
//!   period rollover, commitment and claim is a single indivisible step
//! - Each request is a typed message with a typed `oneshot` reply
//! - Bounded mailbox gives backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                PondHandle (Clone)                     │
//! │         Sends messages to actor mailbox               │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               PondActor (Single Task)                 │
//! │   check ──► Storage::append_event ──► apply           │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! A request is validated against current state, journaled, and only then
//! applied. A rejected or unjournaled request changes nothing.

use crate::{
    ledger::DepositLedger,
    types::{
        Address, Amount, ClaimReceipt, Commitment, Deposit, DepositReceipt, Hash, Period,
        PeriodIndex, PondEvent,
    },
    verifier::ClaimVerifier,
    Error, Result, Storage,
};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the pond actor
#[derive(Debug)]
pub enum PondMessage {
    /// Record a deposit
    Deposit {
        depositor: Address,
        amount: Amount,
        response: oneshot::Sender<Result<DepositReceipt>>,
    },

    /// Get a period snapshot
    GetPeriod {
        index: PeriodIndex,
        response: oneshot::Sender<Result<Period>>,
    },

    /// Get a period's depositors
    GetDepositors {
        index: PeriodIndex,
        response: oneshot::Sender<Result<Vec<Deposit>>>,
    },

    /// Count periods ever created
    GetTotalPeriods {
        response: oneshot::Sender<u64>,
    },

    /// Get the open period
    GetCurrentPeriod {
        response: oneshot::Sender<Period>,
    },

    /// Publish a commitment for a closed period
    RegisterCommitment {
        caller: Address,
        commitment: Commitment,
        response: oneshot::Sender<Result<()>>,
    },

    /// Get a registered commitment
    GetCommitment {
        period_index: PeriodIndex,
        response: oneshot::Sender<Option<Commitment>>,
    },

    /// Top up the payout reserve
    Fund {
        amount: Amount,
        response: oneshot::Sender<Result<Amount>>,
    },

    /// Verify and pay a claim
    Claim {
        period_index: PeriodIndex,
        depositor: Address,
        proof: Vec<Hash>,
        entitlement: Amount,
        response: oneshot::Sender<Result<ClaimReceipt>>,
    },

    /// Check a claim record
    IsClaimed {
        period_index: PeriodIndex,
        depositor: Address,
        response: oneshot::Sender<bool>,
    },

    /// Balance credited to an account
    BalanceOf {
        account: Address,
        response: oneshot::Sender<Amount>,
    },

    /// Undistributed reserve
    GetReserve {
        response: oneshot::Sender<Amount>,
    },

    /// Shutdown actor
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

/// In-memory pond state rebuilt from the journal
#[derive(Debug, Clone)]
pub struct PondState {
    /// Deposit ledger
    pub ledger: DepositLedger,

    /// Claim verifier with its treasury
    pub verifier: ClaimVerifier,
}

impl PondState {
    /// Empty state
    pub fn new(threshold: Amount, operator: Address, token: Address) -> Result<Self> {
        Ok(Self {
            ledger: DepositLedger::new(threshold)?,
            verifier: ClaimVerifier::new(operator, token),
        })
    }

    /// Re-apply journaled events in order
    pub fn replay(&mut self, events: &[PondEvent]) -> Result<()> {
        for event in events {
            self.apply(event)?;
        }
        tracing::info!(
            events = events.len(),
            total_periods = self.ledger.total_periods(),
            "Journal replayed"
        );
        Ok(())
    }

    /// Apply one event that was accepted when it was journaled
    pub fn apply(&mut self, event: &PondEvent) -> Result<()> {
        match event {
            PondEvent::Deposited {
                depositor,
                amount,
                at,
            } => {
                self.ledger.check_deposit(depositor, *amount)?;
                self.ledger.apply_deposit(*depositor, *amount, *at);
            }
            PondEvent::Funded { amount } => {
                self.verifier.fund(*amount)?;
            }
            PondEvent::CommitmentRegistered { commitment } => {
                // Period boundaries must match the ones the commitment was built over
                let period = self.ledger.get_period(commitment.period_index)?;
                if period.is_open() {
                    return Err(Error::PeriodOpen(period.index));
                }
                self.verifier.apply_commitment(*commitment);
            }
            PondEvent::Claimed {
                period_index,
                depositor,
                amount,
            } => {
                if self.verifier.commitment(*period_index).is_none() {
                    return Err(Error::NoCommitment(*period_index));
                }
                self.verifier.apply_claim(*period_index, *depositor, *amount)?;
            }
        }
        Ok(())
    }
}

/// Actor that processes pond messages
#[derive(Debug)]
pub struct PondActor {
    /// Ledger and verifier
    state: PondState,

    /// Journal backend (absent when persistence is disabled)
    storage: Option<Storage>,

    /// Sequence number of the next journaled event
    next_sequence: u64,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<PondMessage>,
}

impl PondActor {
    /// Create new actor
    pub fn new(
        state: PondState,
        storage: Option<Storage>,
        next_sequence: u64,
        mailbox: mpsc::Receiver<PondMessage>,
    ) -> Self {
        Self {
            state,
            storage,
            next_sequence,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let PondMessage::Shutdown { response } = msg {
                self.close_storage();
                let _ = response.send(());
                return;
            }
            self.handle_message(msg);
        }

        // Mailbox closed: every handle was dropped
        self.close_storage();
    }

    fn close_storage(&mut self) {
        if let Some(storage) = self.storage.take() {
            if let Err(e) = storage.close() {
                tracing::error!("Error closing journal: {}", e);
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: PondMessage) {
        match msg {
            PondMessage::Deposit {
                depositor,
                amount,
                response,
            } => {
                let result = self.deposit(depositor, amount);
                reply(response, result);
            }

            PondMessage::GetPeriod { index, response } => {
                let result = self.state.ledger.get_period(index).cloned();
                reply(response, result);
            }

            PondMessage::GetDepositors { index, response } => {
                let result = self.state.ledger.get_depositors(index).map(<[Deposit]>::to_vec);
                reply(response, result);
            }

            PondMessage::GetTotalPeriods { response } => {
                reply(response, self.state.ledger.total_periods());
            }

            PondMessage::GetCurrentPeriod { response } => {
                reply(response, self.state.ledger.current_period().clone());
            }

            PondMessage::RegisterCommitment {
                caller,
                commitment,
                response,
            } => {
                let result = self.register_commitment(&caller, commitment);
                reply(response, result);
            }

            PondMessage::GetCommitment {
                period_index,
                response,
            } => {
                reply(response, self.state.verifier.commitment(period_index).copied());
            }

            PondMessage::Fund { amount, response } => {
                let result = self.fund(amount);
                reply(response, result);
            }

            PondMessage::Claim {
                period_index,
                depositor,
                proof,
                entitlement,
                response,
            } => {
                let result = self.claim(period_index, depositor, &proof, entitlement);
                reply(response, result);
            }

            PondMessage::IsClaimed {
                period_index,
                depositor,
                response,
            } => {
                reply(
                    response,
                    self.state.verifier.is_claimed(period_index, &depositor),
                );
            }

            PondMessage::BalanceOf { account, response } => {
                reply(response, self.state.verifier.treasury().balance_of(&account));
            }

            PondMessage::GetReserve { response } => {
                reply(response, self.state.verifier.treasury().reserve());
            }

            PondMessage::Shutdown { response } => {
                // Handled in run loop
                let _ = response.send(());
            }
        }
    }

    fn deposit(&mut self, depositor: Address, amount: Amount) -> Result<DepositReceipt> {
        self.state.ledger.check_deposit(&depositor, amount)?;

        let at = Utc::now();
        self.journal(&PondEvent::Deposited {
            depositor,
            amount,
            at,
        })?;

        Ok(self.state.ledger.apply_deposit(depositor, amount, at))
    }

    fn register_commitment(&mut self, caller: &Address, commitment: Commitment) -> Result<()> {
        self.state.verifier.check_commitment(caller, &commitment)?;

        let period = self.state.ledger.get_period(commitment.period_index)?;
        if period.is_open() {
            return Err(Error::PeriodOpen(period.index));
        }

        self.journal(&PondEvent::CommitmentRegistered { commitment })?;
        self.state.verifier.apply_commitment(commitment);
        Ok(())
    }

    fn fund(&mut self, amount: Amount) -> Result<Amount> {
        self.state.verifier.treasury().check_fund(amount)?;
        self.journal(&PondEvent::Funded { amount })?;

        let reserve = self.state.verifier.fund(amount)?;
        tracing::info!(amount, reserve, "Treasury funded");
        Ok(reserve)
    }

    fn claim(
        &mut self,
        period_index: PeriodIndex,
        depositor: Address,
        proof: &[Hash],
        entitlement: Amount,
    ) -> Result<ClaimReceipt> {
        self.state
            .verifier
            .check_claim(period_index, &depositor, proof, entitlement)?;

        self.journal(&PondEvent::Claimed {
            period_index,
            depositor,
            amount: entitlement,
        })?;

        self.state
            .verifier
            .apply_claim(period_index, depositor, entitlement)
    }

    /// Write an event to the journal before it is applied
    fn journal(&mut self, event: &PondEvent) -> Result<()> {
        if let Some(storage) = &self.storage {
            storage.append_event(self.next_sequence, event)?;
        }
        self.next_sequence += 1;
        Ok(())
    }
}

fn reply<T>(response: oneshot::Sender<T>, value: T) {
    if response.send(value).is_err() {
        tracing::error!("Response channel closed before reply");
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct PondHandle {
    sender: mpsc::Sender<PondMessage>,
}

impl PondHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<PondMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PondMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Record a deposit
    pub async fn deposit(&self, depositor: Address, amount: Amount) -> Result<DepositReceipt> {
        self.request(|response| PondMessage::Deposit {
            depositor,
            amount,
            response,
        })
        .await?
    }

    /// Get a period snapshot
    pub async fn get_period(&self, index: PeriodIndex) -> Result<Period> {
        self.request(|response| PondMessage::GetPeriod { index, response })
            .await?
    }

    /// Get a period's depositors
    pub async fn get_depositors(&self, index: PeriodIndex) -> Result<Vec<Deposit>> {
        self.request(|response| PondMessage::GetDepositors { index, response })
            .await?
    }

    /// Count periods ever created
    pub async fn get_total_periods(&self) -> Result<u64> {
        self.request(|response| PondMessage::GetTotalPeriods { response })
            .await
    }

    /// Get the open period
    pub async fn current_period(&self) -> Result<Period> {
        self.request(|response| PondMessage::GetCurrentPeriod { response })
            .await
    }

    /// Publish a commitment
    pub async fn register_commitment(&self, caller: Address, commitment: Commitment) -> Result<()> {
        self.request(|response| PondMessage::RegisterCommitment {
            caller,
            commitment,
            response,
        })
        .await?
    }

    /// Get a registered commitment
    pub async fn commitment(&self, period_index: PeriodIndex) -> Result<Option<Commitment>> {
        self.request(|response| PondMessage::GetCommitment {
            period_index,
            response,
        })
        .await
    }

    /// Top up the payout reserve
    pub async fn fund(&self, amount: Amount) -> Result<Amount> {
        self.request(|response| PondMessage::Fund { amount, response })
            .await?
    }

    /// Verify and pay a claim
    pub async fn claim(
        &self,
        period_index: PeriodIndex,
        depositor: Address,
        proof: Vec<Hash>,
        entitlement: Amount,
    ) -> Result<ClaimReceipt> {
        self.request(|response| PondMessage::Claim {
            period_index,
            depositor,
            proof,
            entitlement,
            response,
        })
        .await?
    }

    /// Check a claim record
    pub async fn is_claimed(&self, period_index: PeriodIndex, depositor: Address) -> Result<bool> {
        self.request(|response| PondMessage::IsClaimed {
            period_index,
            depositor,
            response,
        })
        .await
    }

    /// Balance credited to an account
    pub async fn balance_of(&self, account: Address) -> Result<Amount> {
        self.request(|response| PondMessage::BalanceOf { account, response })
            .await
    }

    /// Undistributed reserve
    pub async fn reserve(&self) -> Result<Amount> {
        self.request(|response| PondMessage::GetReserve { response })
            .await
    }

    /// Shutdown actor and close the journal
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|response| PondMessage::Shutdown { response })
            .await
    }
}

/// Spawn the pond actor
pub fn spawn_pond_actor(
    state: PondState,
    storage: Option<Storage>,
    next_sequence: u64,
    mailbox_capacity: usize,
) -> PondHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = PondActor::new(state, storage, next_sequence, rx);

    tokio::spawn(actor.run());

    PondHandle::new(tx)
}
