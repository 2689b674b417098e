//! Ledger Engine
//!
//! Implements the money-movement operations on top of the store traits.
//!
//! Every operation follows the same shape:
//! 1. validate amounts against the policy (no store access),
//! 2. open one unit of work,
//! 3. lock every involved account in `AccountRef` order and check existence
//!    and sufficiency,
//! 4. issue the mutations,
//! 5. commit, or roll back and report `TransactionFailed`.
//!
//! Failures in steps 1-3 are reported precisely and leave the store as it was.

use rust_decimal::Decimal;

use crate::domain::{
    new_transaction_id, AccountRef, Amount, Balance, BillRecord, BillStatus, HistoryFilter,
    LedgerError, NewBill, OperationType, Policy,
};
use crate::store::{AccountStore, BillStore, LedgerStore, StoreError, UnitOfWork};

use super::{PayBillCommand, Receipt, SplitBillCommand, SplitBillReceipt, TransferCommand};

/// An immediately-settled movement between two accounts
struct Settlement {
    operation: OperationType,
    transaction_id: String,
    sender: AccountRef,
    destination: AccountRef,
    /// Amount recorded on the bill
    amount: Amount,
    /// `None` when the sender is an external funding source: it must exist
    /// but its balance is neither checked nor debited
    debit: Option<Amount>,
    credit: Amount,
}

/// Map a store error raised while checking preconditions
fn precondition(err: StoreError) -> LedgerError {
    match err {
        StoreError::AccountNotFound(account) => LedgerError::AccountNotFound(account),
        StoreError::BillNotFound(transaction_id) => LedgerError::BillNotFound(transaction_id),
        other => LedgerError::PersistenceFailure(other.to_string()),
    }
}

fn ensure_sufficient(
    account: &AccountRef,
    available: Decimal,
    required: &Amount,
) -> Result<(), LedgerError> {
    let balance = Balance::new(available).map_err(|e| {
        LedgerError::PersistenceFailure(format!("stored balance of {} is invalid: {}", account, e))
    })?;

    if !balance.is_sufficient_for(required) {
        return Err(LedgerError::insufficient_balance(required.value(), available));
    }
    Ok(())
}

/// Read and lock balances, issuing the locks in `AccountRef` order so two
/// operations over the same accounts cannot deadlock. Results come back in
/// the order of `accounts`.
async fn lock_accounts<W: UnitOfWork>(
    work: &mut W,
    accounts: &[&AccountRef],
) -> Vec<Result<Decimal, StoreError>> {
    let mut order: Vec<usize> = (0..accounts.len()).collect();
    order.sort_by(|&a, &b| accounts[a].cmp(accounts[b]));

    let mut locked = Vec::with_capacity(accounts.len());
    for idx in order {
        let balance = work.get_balance(accounts[idx]).await;
        locked.push((idx, balance));
    }

    locked.sort_by_key(|(idx, _)| *idx);
    locked.into_iter().map(|(_, balance)| balance).collect()
}

fn transaction_id_or_new(requested: Option<String>) -> String {
    requested
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_transaction_id)
}

// =========================================================================
// LedgerEngine
// =========================================================================

/// Ledger transaction engine
#[derive(Debug, Clone)]
pub struct LedgerEngine<S: LedgerStore> {
    store: S,
    policy: Policy,
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: S, policy: Policy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Pay a merchant from a user's balance
    pub async fn transfer_to_merchant(&self, command: TransferCommand) -> Result<Receipt, LedgerError> {
        let amount = self.checked_amount(command.amount)?;

        self.settle(Settlement {
            operation: OperationType::MerchantPayment,
            transaction_id: transaction_id_or_new(command.transaction_id),
            sender: AccountRef::user(command.sender),
            destination: AccountRef::merchant(command.destination),
            amount,
            debit: Some(amount),
            credit: amount,
        })
        .await
    }

    /// Withdraw from a user's balance to a bank; the user also pays the
    /// withdrawal fee
    pub async fn withdraw_to_bank(&self, command: TransferCommand) -> Result<Receipt, LedgerError> {
        let amount = self.checked_amount(command.amount)?;
        let gross = self.policy.withdrawal_gross(&amount)?;

        self.settle(Settlement {
            operation: OperationType::BankWithdrawal,
            transaction_id: transaction_id_or_new(command.transaction_id),
            sender: AccountRef::user(command.sender),
            destination: AccountRef::bank(command.destination),
            amount,
            debit: Some(gross),
            credit: amount,
        })
        .await
    }

    /// Move money from one user to another
    pub async fn transfer_between_users(
        &self,
        command: TransferCommand,
    ) -> Result<Receipt, LedgerError> {
        let amount = self.checked_amount(command.amount)?;

        self.settle(Settlement {
            operation: OperationType::UserTransfer,
            transaction_id: transaction_id_or_new(command.transaction_id),
            sender: AccountRef::user(command.sender),
            destination: AccountRef::user(command.destination),
            amount,
            debit: Some(amount),
            credit: amount,
        })
        .await
    }

    /// Top up a user's balance from a bank; the top-up fee is kept from the
    /// credited amount. The bank only has to exist, its balance is untouched.
    pub async fn top_up_from_bank(&self, command: TransferCommand) -> Result<Receipt, LedgerError> {
        let amount = self.checked_amount(command.amount)?;
        let net = self.policy.top_up_net(&amount)?;

        self.settle(Settlement {
            operation: OperationType::TopUp,
            transaction_id: transaction_id_or_new(command.transaction_id),
            sender: AccountRef::bank(command.sender),
            destination: AccountRef::user(command.destination),
            amount,
            debit: None,
            credit: net,
        })
        .await
    }

    /// Record one outstanding share per receiver.
    ///
    /// No balance moves at split time: each share is a claim the receiver
    /// settles later with `pay_bill`. The sender must still be able to cover
    /// the whole bill.
    pub async fn split_bill(&self, command: SplitBillCommand) -> Result<SplitBillReceipt, LedgerError> {
        if command.receivers.is_empty() {
            return Err(LedgerError::InvalidSplit(
                "at least one receiver is required".to_string(),
            ));
        }
        if command.receivers.len() != command.amounts.len() {
            return Err(LedgerError::InvalidSplit(format!(
                "{} receivers but {} amounts",
                command.receivers.len(),
                command.amounts.len()
            )));
        }

        let sender = AccountRef::user(command.sender);
        let receivers: Vec<AccountRef> = command.receivers.into_iter().map(AccountRef::user).collect();
        if receivers.contains(&sender) {
            return Err(LedgerError::SameAccount);
        }

        let shares = command
            .amounts
            .into_iter()
            .map(|amount| self.checked_amount(amount))
            .collect::<Result<Vec<Amount>, LedgerError>>()?;
        let total = Amount::sum(&shares)?;

        let mut work = self.begin().await?;

        let mut involved: Vec<&AccountRef> = Vec::with_capacity(receivers.len() + 1);
        involved.push(&sender);
        involved.extend(receivers.iter());
        let mut balances = lock_accounts(&mut work, &involved).await.into_iter();

        let available = balances
            .next()
            .unwrap_or_else(|| Err(StoreError::AccountNotFound(sender.clone())))
            .map_err(precondition)?;
        if let Err(err) = ensure_sufficient(&sender, available, &total) {
            tracing::info!(sender = %sender, total = %total, "Split bill rejected");
            return Err(err);
        }
        for balance in balances {
            balance.map_err(precondition)?;
        }

        let bills: Vec<NewBill> = receivers
            .iter()
            .zip(shares.iter())
            .map(|(receiver, share)| {
                NewBill::new(
                    new_transaction_id(),
                    sender.clone(),
                    OperationType::SplitShare,
                    *share,
                    receiver.clone(),
                    BillStatus::Created,
                )
            })
            .collect();

        let outcome: Result<Vec<BillRecord>, StoreError> = async {
            let mut records = Vec::with_capacity(bills.len());
            for bill in &bills {
                let id = work.insert_bill(bill).await?;
                records.push(bill.clone().into_record(id));
            }
            Ok(records)
        }
        .await;

        let shares = self.finish(work, OperationType::SplitShare, sender.to_string(), outcome).await?;

        tracing::info!(
            sender = %sender,
            total = %total,
            shares = shares.len(),
            "Bill split"
        );

        Ok(SplitBillReceipt {
            sender,
            total: total.value(),
            shares,
        })
    }

    /// Settle an outstanding bill: the payer (the bill's destination) pays
    /// the bill's sender and the bill moves to `Paid`
    pub async fn pay_bill(&self, command: PayBillCommand) -> Result<Receipt, LedgerError> {
        let payer = AccountRef::user(command.payer);
        let transaction_id = command.transaction_id;

        let mut work = self.begin().await?;

        let bill = work.find_bill(&transaction_id).await.map_err(precondition)?;
        if bill.destination != payer {
            tracing::warn!(
                transaction_id = %transaction_id,
                payer = %payer,
                "Bill is not addressed to payer"
            );
            return Err(LedgerError::BillNotFound(transaction_id));
        }
        if !bill.status.can_transition_to(BillStatus::Paid) {
            return Err(match bill.status {
                BillStatus::Paid => LedgerError::BillAlreadyPaid(transaction_id),
                status => LedgerError::BillNotPayable {
                    transaction_id,
                    status,
                },
            });
        }

        let amount = Amount::new(bill.amount).map_err(|e| {
            LedgerError::PersistenceFailure(format!("bill {} has invalid amount: {}", transaction_id, e))
        })?;
        let creditor = bill.sender;

        let balances = lock_accounts(&mut work, &[&payer, &creditor]).await;
        let mut balances = balances.into_iter();
        let available = balances
            .next()
            .unwrap_or_else(|| Err(StoreError::AccountNotFound(payer.clone())))
            .map_err(precondition)?;
        ensure_sufficient(&payer, available, &amount)?;
        balances
            .next()
            .unwrap_or_else(|| Err(StoreError::AccountNotFound(creditor.clone())))
            .map_err(precondition)?;

        let outcome: Result<(), StoreError> = async {
            work.apply_delta(&payer, -amount.value()).await?;
            work.apply_delta(&creditor, amount.value()).await?;
            work.update_bill_status(&transaction_id, BillStatus::Paid).await?;
            Ok(())
        }
        .await;

        self.finish(work, bill.operation, transaction_id.clone(), outcome).await?;

        tracing::info!(
            transaction_id = %transaction_id,
            payer = %payer,
            creditor = %creditor,
            amount = %amount,
            "Bill paid"
        );

        Ok(Receipt {
            transaction_id,
            operation: bill.operation,
            sender: payer,
            destination: creditor,
            amount: amount.value(),
            debited: amount.value(),
            credited: amount.value(),
            status: BillStatus::Paid,
        })
    }

    /// Current balance of an account
    pub async fn balance(&self, account: &AccountRef) -> Result<Decimal, LedgerError> {
        let mut work = self.begin().await?;
        let balance = work.get_balance(account).await.map_err(precondition)?;
        work.commit()
            .await
            .map_err(|e| LedgerError::PersistenceFailure(e.to_string()))?;
        Ok(balance)
    }

    /// Bills the account sent or received, newest first
    pub async fn history(
        &self,
        account: &AccountRef,
        filter: &HistoryFilter,
    ) -> Result<Vec<BillRecord>, LedgerError> {
        let mut work = self.begin().await?;
        let bills = work
            .bill_history(account, filter)
            .await
            .map_err(precondition)?;
        work.commit()
            .await
            .map_err(|e| LedgerError::PersistenceFailure(e.to_string()))?;
        Ok(bills)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Validate a requested amount: positive, well-formed, over the minimum
    fn checked_amount(&self, value: Decimal) -> Result<Amount, LedgerError> {
        let amount = Amount::new(value)?;
        self.policy.check_minimum(&amount)?;
        Ok(amount)
    }

    async fn begin(&self) -> Result<S::Work, LedgerError> {
        self.store.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Could not open unit of work");
            LedgerError::PersistenceFailure(e.to_string())
        })
    }

    /// Debit one account, credit another, record the bill as paid
    async fn settle(&self, settlement: Settlement) -> Result<Receipt, LedgerError> {
        let Settlement {
            operation,
            transaction_id,
            sender,
            destination,
            amount,
            debit,
            credit,
        } = settlement;

        if sender == destination {
            return Err(LedgerError::SameAccount);
        }

        let mut work = self.begin().await?;

        let balances = lock_accounts(&mut work, &[&sender, &destination]).await;
        let mut balances = balances.into_iter();
        let available = balances
            .next()
            .unwrap_or_else(|| Err(StoreError::AccountNotFound(sender.clone())))
            .map_err(precondition)?;
        if let Some(debit) = &debit {
            ensure_sufficient(&sender, available, debit)?;
        }
        balances
            .next()
            .unwrap_or_else(|| Err(StoreError::AccountNotFound(destination.clone())))
            .map_err(precondition)?;

        let bill = NewBill::new(
            transaction_id.clone(),
            sender.clone(),
            operation,
            amount,
            destination.clone(),
            BillStatus::Paid,
        );

        let outcome: Result<(), StoreError> = async {
            work.insert_bill(&bill).await?;
            if let Some(debit) = &debit {
                work.apply_delta(&sender, -debit.value()).await?;
            }
            work.apply_delta(&destination, credit.value()).await?;
            Ok(())
        }
        .await;

        self.finish(work, operation, transaction_id.clone(), outcome).await?;

        let debited = debit.map(|debit| debit.value()).unwrap_or(Decimal::ZERO);
        tracing::info!(
            operation = %operation,
            transaction_id = %transaction_id,
            sender = %sender,
            destination = %destination,
            debited = %debited,
            credited = %credit,
            "Transaction committed"
        );

        Ok(Receipt {
            transaction_id,
            operation,
            sender,
            destination,
            amount: amount.value(),
            debited,
            credited: credit.value(),
            status: BillStatus::Paid,
        })
    }

    /// Commit on success; otherwise roll back and report `TransactionFailed`.
    ///
    /// The storage cause is logged here and not returned to the caller.
    async fn finish<T>(
        &self,
        work: S::Work,
        operation: OperationType,
        reference: String,
        outcome: Result<T, StoreError>,
    ) -> Result<T, LedgerError> {
        match outcome {
            Ok(value) => match work.commit().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    tracing::error!(
                        operation = %operation,
                        reference = %reference,
                        error = %err,
                        "Commit failed"
                    );
                    Err(LedgerError::TransactionFailed)
                }
            },
            Err(err) => {
                tracing::error!(
                    operation = %operation,
                    reference = %reference,
                    error = %err,
                    "Mutation failed, rolling back"
                );
                if let Err(rollback_err) = work.rollback().await {
                    tracing::error!(
                        reference = %reference,
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                Err(LedgerError::TransactionFailed)
            }
        }
    }
}
