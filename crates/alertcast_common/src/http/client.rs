use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;

/// Creates a new HTTP client with explicit connect and read timeouts.
///
/// # Arguments
///
/// * `connect_timeout` - Maximum time to establish a connection
/// * `read_timeout` - Maximum time between successful reads of the response
pub fn create_client_with_timeouts(
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, ReqwestError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .build()
}
