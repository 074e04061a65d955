use crate::domain::money::Amount;
use crate::domain::payment::{
    BankDepositReceipt, BankDetails, Confirmation, ConfirmationStatus, MobilePushReceipt,
    MobilePushStatus,
};
use crate::domain::ports::PaymentGateway;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

const TRANSACTION_DESC: &str = "Payment for services";

/// Payment gateway reached over the backend REST API.
///
/// The bearer token is fixed at construction; nothing is read from the
/// environment.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MobilePushResponse {
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultCode {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(rename = "ResultCode")]
    result_code: Option<ResultCode>,
    #[serde(rename = "ResultDesc")]
    result_desc: Option<String>,
}

impl From<StatusResponse> for MobilePushStatus {
    fn from(response: StatusResponse) -> Self {
        MobilePushStatus {
            result_code: response.result_code.map(|code| match code {
                ResultCode::Text(text) => text,
                ResultCode::Number(number) => number.to_string(),
            }),
            result_desc: response.result_desc,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositResponse {
    payment_id: String,
}

fn gateway_error(e: reqwest::Error) -> PaymentError {
    PaymentError::GatewayError(e.to_string())
}

fn amount_value(amount: Amount) -> Result<f64> {
    amount.value().to_f64().ok_or_else(|| {
        PaymentError::ValidationError(format!("Amount {amount} cannot be sent to the gateway"))
    })
}

fn mobile_push_body(amount: Amount, phone_number: &str, reference: &str) -> Result<Value> {
    Ok(json!({
        "amount": amount_value(amount)?,
        "phoneNumber": phone_number,
        "accountReference": reference,
        "transactionDesc": TRANSACTION_DESC,
    }))
}

fn bank_deposit_body(amount: Amount, details: &BankDetails, reference: &str) -> Result<Value> {
    Ok(json!({
        "amount": amount_value(amount)?,
        "bankName": details.bank_name,
        "accountNumber": details.account_number,
        "accountName": details.account_name,
        "reference": reference,
    }))
}

fn confirmation_body(
    payment_id: &str,
    status: ConfirmationStatus,
    timestamp: DateTime<Utc>,
) -> (Value, String) {
    let transaction_id = format!("TRX-{}", timestamp.timestamp_millis());
    let body = json!({
        "paymentId": payment_id,
        "status": status,
        "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        "transactionId": transaction_id,
    });
    (body, transaction_id)
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(gateway_error)?
            .json()
            .await
            .map_err(gateway_error)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(gateway_error)?
            .json()
            .await
            .map_err(gateway_error)
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn initiate_mobile_push(
        &self,
        amount: Amount,
        phone_number: &str,
        reference: &str,
    ) -> Result<MobilePushReceipt> {
        let body = mobile_push_body(amount, phone_number, reference)?;
        let response: MobilePushResponse = self.post("/payments/mpesa/initiate", &body).await?;
        Ok(MobilePushReceipt {
            checkout_reference: response.checkout_request_id,
        })
    }

    async fn check_mobile_push_status(&self, checkout_reference: &str) -> Result<MobilePushStatus> {
        let response: StatusResponse = self
            .get(&format!("/payments/mpesa/status/{checkout_reference}"))
            .await?;
        Ok(response.into())
    }

    async fn initiate_bank_deposit(
        &self,
        amount: Amount,
        details: &BankDetails,
        reference: &str,
    ) -> Result<BankDepositReceipt> {
        let body = bank_deposit_body(amount, details, reference)?;
        let response: DepositResponse = self.post("/payments/bank/deposit", &body).await?;
        Ok(BankDepositReceipt {
            payment_id: response.payment_id,
        })
    }

    async fn confirm_payment(
        &self,
        payment_id: &str,
        status: ConfirmationStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<Confirmation> {
        let (body, transaction_id) = confirmation_body(payment_id, status, timestamp);
        let _acknowledgement: Value = self.post("/payments/confirm", &body).await?;
        Ok(Confirmation {
            payment_id: payment_id.to_string(),
            transaction_id: Some(transaction_id),
        })
    }
}
