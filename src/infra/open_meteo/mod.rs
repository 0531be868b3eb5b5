mod client;

pub use client::OpenMeteoArchiveClient;
