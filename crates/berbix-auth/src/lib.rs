//! Berbix API client
//!
//! Manages short-lived bearer credentials and the requests made with them.
//! A library with no dependency on any binary; the HTTP layer is the
//! `transport` crate's `Transport` trait.
//!
//! Credential flow:
//! 1. `Client::create_transaction()` or `Client::exchange_code()` returns a `Credential`
//! 2. Caller passes `&mut Credential` to `fetch_transaction()`, `update_transaction()`, ...
//! 3. The client refreshes the credential in place when it has expired
//! 4. A stored refresh token can be revived with `Credential::from_refresh()`

pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;
pub mod transactions;

pub use client::{Client, ClientBuilder};
pub use constants::Environment;
pub use credentials::{AccessGrant, Credential};
pub use error::{Error, Result};
pub use token::{CreateTransactionOptions, HostedOptions, TokenExchanger, TokenResponse};
pub use transactions::{OverrideTransactionOptions, UpdateTransactionOptions};
