pub mod envelope;
pub mod request;
pub mod user;

pub use envelope::ApiResponse;
pub use request::{ApiRequest, MultipartBody, RequestBody};
pub use user::{LoginCredentials, LoginResponse, LoginUser, Role, UserInfo};
