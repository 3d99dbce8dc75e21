//! Configuration Module
//!
//! Builds the explicit [`ApiConfig`] a storage area is bound to.
//!
//! ## Credential resolution order
//! 1. Credentials passed inline.
//! 2. A key file path passed explicitly.
//! 3. A key file path in `CF_KEYFILENAME`.
//! 4. The `CF_EMAIL` + `CF_ID` + `CF_KEY` environment triple (all three required).
//! 5. `cf-credentials.json` in the working directory.
//!
//! Choosing a source is a pure function over an [`EnvSnapshot`]; only
//! [`load_credentials`] touches the filesystem.

pub mod loader;
pub mod types;

pub use loader::{CredentialPlan, load_credentials, plan_credentials};
pub use types::*;
