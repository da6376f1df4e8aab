//! Transaction capture (§4.H): a single-call RPC over a transaction id.

use interactive_protocol::method_names::client_to_server;

use crate::error::InteractiveError;
use crate::resources::SessionHandle;

pub struct Transactions {
    session: SessionHandle,
}

impl Transactions {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Transactions { session }
    }

    pub async fn capture(&self, transaction_id: impl Into<String>) -> Result<(), InteractiveError> {
        self.session
            .call(
                client_to_server::CAPTURE,
                serde_json::json!({ "transactionID": transaction_id.into() }),
            )
            .await?;
        Ok(())
    }
}
