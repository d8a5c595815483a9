//! augur-client - Client library for the augur prediction API.
//!
//! # Example
//!
//! ```ignore
//! use augur_client::PredictorClient;
//! use augur_core::Observation;
//! use chrono::Utc;
//!
//! let client = PredictorClient::new("http://127.0.0.1:8080");
//! client.learn(&Observation::new(Utc::now(), "Sleep", 480)).await?;
//! let prediction = client.predict(None).await?;
//! println!("next: {}", prediction.predicted_action);
//! ```

mod client;

pub use client::{LearnResult, PredictorClient, TrainResult};
