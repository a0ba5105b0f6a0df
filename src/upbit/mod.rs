pub mod client;

pub use client::UpbitClient;
