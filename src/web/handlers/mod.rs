pub mod database;
pub mod query;
pub mod system;

use serde::Serialize;

/// `{success: true, data}` envelope shared by most endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data }
    }
}
