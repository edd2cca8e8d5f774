pub mod backend;
pub mod s3;
pub mod types;

pub use backend::{AccessPolicy, ByteStream, ListPage, ObjectStore, PutRequest};
pub use s3::S3Store;
pub use types::*;
