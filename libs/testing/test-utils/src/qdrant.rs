//! Qdrant test infrastructure
//!
//! Provides a `TestQdrant` helper that starts a Qdrant container for testing.

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const QDRANT_IMAGE: &str = "qdrant/qdrant";
const QDRANT_TAG: &str = "v1.15.1";

/// Qdrant gRPC port inside the container
const GRPC_PORT: u16 = 6334;

/// Qdrant image exposing the gRPC port, ready once the gRPC server logs
fn qdrant_image() -> GenericImage {
    GenericImage::new(QDRANT_IMAGE, QDRANT_TAG)
        .with_exposed_port(GRPC_PORT.tcp())
        .with_wait_for(WaitFor::message_on_stdout("gRPC listening on"))
}

/// Test Qdrant wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestQdrant;
///
/// # async fn example() {
/// let qdrant = TestQdrant::new().await;
/// // Point your client at the gRPC endpoint
/// let url = qdrant.url();
/// # }
/// ```
pub struct TestQdrant {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    pub url: String,
}

impl TestQdrant {
    /// Create a new test Qdrant instance
    pub async fn new() -> Self {
        let container = qdrant_image()
            .start()
            .await
            .expect("Failed to start Qdrant container");

        let host_port = container
            .get_host_port_ipv4(GRPC_PORT.tcp())
            .await
            .expect("Failed to get Qdrant gRPC port");

        let url = format!("http://127.0.0.1:{}", host_port);

        tracing::info!(port = host_port, "Test Qdrant ready");

        Self { container, url }
    }

    /// gRPC endpoint of the running container
    pub fn url(&self) -> &str {
        &self.url
    }
}

// Container is automatically cleaned up when TestQdrant is dropped
impl Drop for TestQdrant {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Qdrant container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testcontainers::Image;

    #[test]
    fn test_image_exposes_grpc_port() {
        let image = qdrant_image();

        assert_eq!(image.name(), "qdrant/qdrant");
        assert_eq!(image.tag(), QDRANT_TAG);
        assert_eq!(image.expose_ports(), &[GRPC_PORT.tcp()]);
        assert!(!image.ready_conditions().is_empty());
    }
}
