//! Resource service modules (§4.H): compose RPC calls into domain
//! operations over scenes, controls, groups, participants, transactions.

pub mod controls;
pub mod groups;
pub mod participants;
pub mod scenes;
pub mod transactions;

use std::sync::Arc;

use serde_json::Value;

use crate::controller::ConnectedSession;
use crate::error::InteractiveError;

/// Cheap-to-clone handle every resource module calls through. Keeps the
/// transport/engine pair together without each module re-deriving it.
#[derive(Clone)]
pub(crate) struct SessionHandle(pub(crate) Arc<ConnectedSession>);

impl SessionHandle {
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, InteractiveError> {
        self.0.engine.call(&self.0.transport, method, params).await
    }
}

pub use controls::Controls;
pub use groups::Groups;
pub use participants::Participants;
pub use scenes::Scenes;
pub use transactions::Transactions;
