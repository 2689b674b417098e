//! API Routes
//!
//! HTTP endpoint definitions. Every money-movement route maps to exactly one
//! ledger engine operation.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountKind, AccountRef, BillRecord, BillStatus, HistoryFilter, OperationType,
};
use crate::error::AppError;
use crate::ledger::{
    LedgerEngine, PayBillCommand, Receipt, SplitBillCommand, SplitBillReceipt, TransferCommand,
};
use crate::store::LedgerStore;

/// Shared router state
pub type EngineState<S> = Arc<LedgerEngine<S>>;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_id: String,
    pub destination_id: String,
    /// Decimal string, e.g. "15000.00"
    pub amount: String,
    #[serde(default)]
    pub id_transaction: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitBillRequest {
    pub sender_id: String,
    pub destination_id: Vec<String>,
    pub amount: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayBillRequest {
    pub payer_id: String,
    pub id_transaction: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub counterparty_kind: Option<String>,
    #[serde(default)]
    pub more_than: Option<String>,
    #[serde(default)]
    pub less_than: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id_transaction: String,
    pub operation: OperationType,
    pub sender: AccountRef,
    pub destination: AccountRef,
    pub amount: Decimal,
    pub debited: Decimal,
    pub credited: Decimal,
    pub status: BillStatus,
}

impl From<Receipt> for TransactionResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            id_transaction: receipt.transaction_id,
            operation: receipt.operation,
            sender: receipt.sender,
            destination: receipt.destination,
            amount: receipt.amount,
            debited: receipt.debited,
            credited: receipt.credited,
            status: receipt.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillResponse {
    pub id: i64,
    pub id_transaction: String,
    pub sender: AccountRef,
    pub operation: OperationType,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub destination: AccountRef,
    pub status: BillStatus,
}

impl From<BillRecord> for BillResponse {
    fn from(bill: BillRecord) -> Self {
        Self {
            id: bill.id,
            id_transaction: bill.transaction_id,
            sender: bill.sender,
            operation: bill.operation,
            amount: bill.amount,
            date: bill.date,
            destination: bill.destination,
            status: bill.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SplitBillResponse {
    pub sender: AccountRef,
    pub total: Decimal,
    pub shares: Vec<BillResponse>,
}

impl From<SplitBillReceipt> for SplitBillResponse {
    fn from(receipt: SplitBillReceipt) -> Self {
        Self {
            sender: receipt.sender,
            total: receipt.total,
            shares: receipt.shares.into_iter().map(BillResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: AccountRef,
    pub balance: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub account: AccountRef,
    pub bills: Vec<BillResponse>,
}

// =========================================================================
// Request parsing
// =========================================================================

fn parse_amount(field: &str, value: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(value.trim())
        .map_err(|_| AppError::InvalidRequest(format!("{} is not a decimal: {:?}", field, value)))
}

fn parse_account(kind: &str, reference: String) -> Result<AccountRef, AppError> {
    let kind = AccountKind::from_str(kind).map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    Ok(AccountRef::new(kind, reference))
}

impl TransferRequest {
    fn into_command(self) -> Result<TransferCommand, AppError> {
        let amount = parse_amount("amount", &self.amount)?;
        let command = TransferCommand::new(self.sender_id, self.destination_id, amount);

        Ok(match self.id_transaction {
            Some(id) => command.with_transaction_id(id),
            None => command,
        })
    }
}

impl SplitBillRequest {
    fn into_command(self) -> Result<SplitBillCommand, AppError> {
        let amounts = self
            .amount
            .iter()
            .map(|value| parse_amount("amount", value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SplitBillCommand::new(self.sender_id, self.destination_id, amounts))
    }
}

impl HistoryQuery {
    fn into_filter(self) -> Result<HistoryFilter, AppError> {
        let mut filter = HistoryFilter::new();

        if let Some(operation) = self.operation {
            let operation = OperationType::from_str(&operation)
                .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
            filter = filter.with_operation(operation);
        }
        if let Some(kind) = self.counterparty_kind {
            let kind =
                AccountKind::from_str(&kind).map_err(|e| AppError::InvalidRequest(e.to_string()))?;
            filter = filter.with_counterparty_kind(kind);
        }
        if let Some(value) = self.more_than {
            filter.more_than = Some(parse_amount("more_than", &value)?);
        }
        if let Some(value) = self.less_than {
            filter.less_than = Some(parse_amount("less_than", &value)?);
        }

        Ok(filter)
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router<S: LedgerStore>() -> Router<EngineState<S>> {
    Router::new()
        // Money movement
        .route("/merchant", post(transfer_to_merchant::<S>))
        .route("/transfer/bank", post(withdraw_to_bank::<S>))
        .route("/transfer/user", post(transfer_between_users::<S>))
        .route("/topup", post(top_up_from_bank::<S>))
        .route("/split-bill", post(split_bill::<S>))
        .route("/pay-bill", post(pay_bill::<S>))
        // Read side
        .route("/accounts/:kind/:reference/balance", get(get_balance::<S>))
        .route("/accounts/:kind/:reference/history", get(get_history::<S>))
}

// =========================================================================
// Money movement
// =========================================================================

/// POST /merchant
async fn transfer_to_merchant<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let receipt = engine.transfer_to_merchant(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /transfer/bank
async fn withdraw_to_bank<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let receipt = engine.withdraw_to_bank(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /transfer/user
async fn transfer_between_users<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let receipt = engine.transfer_between_users(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /topup
async fn top_up_from_bank<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let receipt = engine.top_up_from_bank(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /split-bill
async fn split_bill<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<SplitBillRequest>,
) -> Result<(StatusCode, Json<SplitBillResponse>), AppError> {
    let receipt = engine.split_bill(request.into_command()?).await?;
    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// POST /pay-bill
async fn pay_bill<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Json(request): Json<PayBillRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let command = PayBillCommand::new(request.payer_id, request.id_transaction);
    let receipt = engine.pay_bill(command).await?;
    Ok(Json(receipt.into()))
}

// =========================================================================
// Read side
// =========================================================================

/// GET /accounts/:kind/:reference/balance
async fn get_balance<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Path((kind, reference)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = parse_account(&kind, reference)?;
    let balance = engine.balance(&account).await?;

    Ok(Json(BalanceResponse { account, balance }))
}

/// GET /accounts/:kind/:reference/history
async fn get_history<S: LedgerStore>(
    State(engine): State<EngineState<S>>,
    Path((kind, reference)): Path<(String, String)>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let account = parse_account(&kind, reference)?;
    let filter = query.into_filter()?;
    let bills = engine.history(&account, &filter).await?;

    Ok(Json(HistoryResponse {
        account,
        bills: bills.into_iter().map(BillResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_request_deserialize() {
        let json = r#"{
            "sender_id": "081100000001",
            "destination_id": "MRC-001",
            "amount": "15000.50"
        }"#;

        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert!(request.id_transaction.is_none());

        let command = request.into_command().unwrap();
        assert_eq!(command.amount, dec!(15000.50));
        assert_eq!(command.destination, "MRC-001");
    }

    #[test]
    fn test_transfer_request_bad_amount() {
        let request = TransferRequest {
            sender_id: "0811".to_string(),
            destination_id: "0812".to_string(),
            amount: "ten thousand".to_string(),
            id_transaction: None,
        };

        assert!(matches!(request.into_command(), Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_split_bill_request_deserialize() {
        let json = r#"{
            "sender_id": "0811",
            "destination_id": ["0812", "0813"],
            "amount": ["20000", "40000"]
        }"#;

        let request: SplitBillRequest = serde_json::from_str(json).unwrap();
        let command = request.into_command().unwrap();
        assert_eq!(command.receivers, vec!["0812", "0813"]);
        assert_eq!(command.amounts, vec![dec!(20000), dec!(40000)]);
    }

    #[test]
    fn test_history_query_filter() {
        let query = HistoryQuery {
            operation: Some("user_transfer".to_string()),
            counterparty_kind: Some("bank".to_string()),
            more_than: Some("100".to_string()),
            less_than: None,
        };

        let filter = query.into_filter().unwrap();
        assert_eq!(filter.operation, Some(OperationType::UserTransfer));
        assert_eq!(filter.counterparty_kind, Some(AccountKind::Bank));
        assert_eq!(filter.more_than, Some(dec!(100)));
        assert!(filter.less_than.is_none());

        let query = HistoryQuery {
            operation: Some("refund".to_string()),
            ..HistoryQuery::default()
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn test_parse_account_kind() {
        assert_eq!(
            parse_account("merchant", "MRC-001".to_string()).unwrap(),
            AccountRef::merchant("MRC-001")
        );
        assert!(parse_account("wallet", "x".to_string()).is_err());
    }
}
