// interactive-test-utils: mock interactive-overlay service for integration
// testing `interactive-client`'s session layer.

pub mod mock_client;
pub mod mock_server;

pub use mock_client::MockClient;
pub use mock_server::{Handler, MockInteractiveServer};
