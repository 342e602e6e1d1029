pub mod client;
pub mod counting_stream;
pub mod response;
